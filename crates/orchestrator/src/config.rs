//! Configuration source and per-turn snapshot.
//!
//! The orchestrator never holds configuration itself. Every turn reads each
//! value once from a [`ConfigSource`] into a [`TurnConfig`], so an update that
//! lands mid-turn is seen by the next turn rather than half of this one.

use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;

use agent_tools::ToolPolicy;
use async_trait::async_trait;
use brain_core::{ModelParameters, ModelSlot};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::OrchestratorError;
use crate::strategy::{Strategy, StrategyAxis, StrategyRule};

/// Default primary model.
pub const DEFAULT_PRIMARY_MODEL: &str = "qwen3-next-80b-a3b-instruct";

/// Default classifier model.
pub const DEFAULT_CLASSIFIER_MODEL: &str = "qwen-turbo";

/// Default fast-track router model.
pub const DEFAULT_ROUTER_MODEL: &str = "qwen-turbo";

pub const DEFAULT_OPENING_LINE: &str = "您好，我是您的智能业务助理，请问有什么可以帮您？";

pub const DEFAULT_FALLBACK_TEXT: &str = "抱歉，我没太听明白您的意思，您可以换个说法再说一遍吗？";

pub const DEFAULT_SENSITIVE_TEXT: &str = "我们换个话题吧。";

pub const DEFAULT_TASKS: &[&str] = &[
    "1. 产品介绍*",
    "2. 确认身份",
    "3. 套餐推荐",
    "4. 办理确认",
    "5. 结束语",
];

pub const DEFAULT_DEPENDENCIES: &str = "2 -> 1\n3 -> 2\n4 -> 3\n5 -> 4";

/// Default persona template. `{code}`, `{tasks}` and `{workflow}` are filled per turn.
pub const DEFAULT_PERSONA_TEMPLATE: &str = r#"你是一名专业的电信业务办理专员，语气热情、专业，像真人顾问一样通过电话与客户自然交流。
请遵循以下原则：
1. 始终保持礼貌，回答简洁明了，口语化表达，不堆砌技术术语。
2. 当你从工具获得JSON数据后，要用自己的话组织成自然语言，绝对不要直接输出JSON。
3. 在完成某个明确的沟通环节后，你的回复中必须包含短语 '我已完成流程[流程名]' 来告知系统推进流程。
4. 当前对话状态是 '{code}'。如果是 'interrupted'，说明用户刚刚打断了你，请停止长篇介绍并友好回应；如果是 'silence'，说明用户一段时间没有说话。

当前可执行的任务：{tasks}
完整工作流参考：{workflow}"#;

/// Default classifier instruction; the utterance is appended to it.
pub const DEFAULT_CLASSIFIER_PROMPT: &str = r#"你是一个智能意图分析助手。你的任务是分析用户输入的核心意图、情绪和敏感词。
请严格遵守以下规则，并只输出 JSON 格式结果。

### 1. 分析目标
- intent: 用户的核心意图 (闲聊, 投诉, 比较套餐, 查询FAQ, 办理业务, 查询数据)。
- emotion: 用户情绪 (高兴, 生气, 困惑, 中性)。
- is_sensitive: 是否包含辱骂、色情等敏感词 (true/false)。
- tool_name: 如果用户只是想查询天气或时间，填写工具名 getWeather 或 getCurrentTimeByCity，否则留空 ""。
- tool_args: 对应工具所需的参数（JSON字符串形式），否则留空 ""。

输出示例：{"intent": "比较套餐", "emotion": "中性", "is_sensitive": "false", "tool_name": "", "tool_args": ""}

请分析下面的输入：
"#;

/// Default router instruction. `{tools}` lists the fast-track tools on offer;
/// the utterance is appended.
pub const DEFAULT_ROUTER_PROMPT: &str = r#"你是一个高速工具路由助手。你的任务是判断用户是否可以直接通过调用工具解决问题，并给出调用指令。
请严格遵守以下规则，并只输出 JSON 格式结果。

### 1. 任务目标
- tool_name: 匹配到的工具名称。如果没有匹配到，则留空 ""。
- tool_args: 对应工具所需的参数（JSON字符串形式）。

### 2. 高速工具通道 (Fast Track)
仅当用户意图匹配以下【简单数据查询】工具时，才在 "tool_name" 和 "tool_args" 生成指令。
【支持的高速工具】:
{tools}
【绝对禁止】(必须留空 tool_name，交给主模型):
- compareTwoPlans, queryMcpFaq, webSearch -> 留空！

输出示例：{"tool_name": "getWeather", "tool_args": "{\"city\": \"北京\"}"}

请分析下面的输入：
"#;

/// Lines the agent must never cross, appended to every persona.
pub const DEFAULT_SAFETY_REDLINES: &str = "1. 严禁辱骂或嘲讽客户。
2. 严禁承诺具体的退款金额或赔偿金额。
3. 涉及政治、暴力、色情话题直接拒绝。
4. 遇到无法回答的问题，请引导客户转人工。";

/// Optional pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Strategy selection and the unknown-intent gate.
    pub strategy: bool,
    /// Emotion contributes to strategy selection.
    pub emotion: bool,
    /// Task tracking: persona task lists, completion scan and the finished-workflow reply.
    pub workflow: bool,
    /// Tool definitions are offered to the primary model.
    pub tools: bool,
    /// A router model may answer simple data questions with a tool before the primary call.
    pub router: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            strategy: true,
            emotion: true,
            workflow: true,
            tools: true,
            router: false,
        }
    }
}

/// Which strategy selector a turn uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyPolicy {
    /// Per-axis lookup, intent text then emotion text.
    PerAxis,
    /// Prioritized rule rows, one strategy at most.
    RuleEngine,
    /// Rule engine when rule rows exist, else per-axis.
    #[default]
    Auto,
}

/// Read side of the configuration store.
///
/// Implementations may change values at any time; the orchestrator reads each
/// value once per turn through [`TurnConfig::load`].
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn task_list(&self) -> Vec<String>;

    /// Dependency lines of the form `A -> B, C`.
    async fn dependency_text(&self) -> String;

    async fn persona_template(&self) -> String;

    async fn opening_line(&self) -> String;

    async fn classifier_prompt(&self) -> String;

    /// Router instruction with an optional `{tools}` placeholder.
    async fn router_prompt(&self) -> String;

    /// Appended to the persona on every turn. Blank means none.
    async fn safety_redlines(&self) -> String;

    /// Per-tool switches, description overrides and time limit.
    async fn tool_policy(&self) -> ToolPolicy;

    async fn model_params(&self, slot: ModelSlot) -> ModelParameters;

    /// Active strategies of one axis, keyed by intent or emotion.
    async fn active_strategies(&self, axis: StrategyAxis) -> HashMap<String, String>;

    async fn fallback_text(&self) -> String;

    async fn sensitive_text(&self) -> String;

    async fn strategy_rules(&self) -> Vec<StrategyRule>;

    async fn strategies(&self) -> Vec<Strategy>;

    async fn features(&self) -> FeatureFlags;

    async fn strategy_policy(&self) -> StrategyPolicy;
}

/// All configuration one turn needs, read once.
#[derive(Debug, Clone)]
pub struct TurnConfig {
    pub tasks: Vec<String>,
    /// Raw `A -> B` lines, parsed against each session's own task list.
    pub dependency_text: String,
    pub persona_template: String,
    pub opening_line: String,
    pub classifier_prompt: String,
    pub router_prompt: String,
    pub safety_redlines: String,
    pub primary_params: ModelParameters,
    pub classifier_params: ModelParameters,
    pub router_params: ModelParameters,
    pub tool_policy: ToolPolicy,
    pub intent_strategies: HashMap<String, String>,
    pub emotion_strategies: HashMap<String, String>,
    pub strategy_rules: Vec<StrategyRule>,
    pub strategies: Vec<Strategy>,
    pub fallback_text: String,
    pub sensitive_text: String,
    pub features: FeatureFlags,
    pub policy: StrategyPolicy,
}

impl TurnConfig {
    /// Snapshot every value from `source`.
    ///
    /// Fails when any model profile has out-of-range parameters.
    pub async fn load(source: &dyn ConfigSource) -> Result<Self, OrchestratorError> {
        let primary_params = source.model_params(ModelSlot::Primary).await;
        let classifier_params = source.model_params(ModelSlot::Classifier).await;
        let router_params = source.model_params(ModelSlot::Router).await;
        for params in [&primary_params, &classifier_params, &router_params] {
            params
                .validate()
                .map_err(|e| OrchestratorError::Config(e.to_string()))?;
        }

        Ok(Self {
            tasks: source.task_list().await,
            dependency_text: source.dependency_text().await,
            persona_template: source.persona_template().await,
            opening_line: source.opening_line().await,
            classifier_prompt: source.classifier_prompt().await,
            router_prompt: source.router_prompt().await,
            safety_redlines: source.safety_redlines().await,
            primary_params,
            classifier_params,
            router_params,
            tool_policy: source.tool_policy().await,
            intent_strategies: source.active_strategies(StrategyAxis::Intent).await,
            emotion_strategies: source.active_strategies(StrategyAxis::Emotion).await,
            strategy_rules: source.strategy_rules().await,
            strategies: source.strategies().await,
            fallback_text: source.fallback_text().await,
            sensitive_text: source.sensitive_text().await,
            features: source.features().await,
            policy: source.strategy_policy().await,
        })
    }
}

/// Plain configuration values held by [`StaticConfigSource`].
#[derive(Debug, Clone)]
pub struct ConfigValues {
    pub tasks: Vec<String>,
    pub dependencies: String,
    pub persona_template: String,
    pub opening_line: String,
    pub classifier_prompt: String,
    pub router_prompt: String,
    pub safety_redlines: String,
    pub primary_params: ModelParameters,
    pub classifier_params: ModelParameters,
    pub router_params: ModelParameters,
    pub tool_policy: ToolPolicy,
    pub strategies: Vec<Strategy>,
    pub strategy_rules: Vec<StrategyRule>,
    pub fallback_text: String,
    pub sensitive_text: String,
    pub features: FeatureFlags,
    pub policy: StrategyPolicy,
}

impl Default for ConfigValues {
    fn default() -> Self {
        Self {
            tasks: DEFAULT_TASKS.iter().map(|t| t.to_string()).collect(),
            dependencies: DEFAULT_DEPENDENCIES.to_string(),
            persona_template: DEFAULT_PERSONA_TEMPLATE.to_string(),
            opening_line: DEFAULT_OPENING_LINE.to_string(),
            classifier_prompt: DEFAULT_CLASSIFIER_PROMPT.to_string(),
            router_prompt: DEFAULT_ROUTER_PROMPT.to_string(),
            safety_redlines: DEFAULT_SAFETY_REDLINES.to_string(),
            primary_params: ModelParameters::new(DEFAULT_PRIMARY_MODEL)
                .with_temperature(0.7)
                .with_top_p(0.8),
            classifier_params: ModelParameters::new(DEFAULT_CLASSIFIER_MODEL)
                .with_temperature(0.1)
                .with_top_p(0.7)
                .with_max_tokens(512),
            router_params: ModelParameters::new(DEFAULT_ROUTER_MODEL)
                .with_temperature(0.1)
                .with_top_p(0.7)
                .with_max_tokens(512),
            tool_policy: ToolPolicy::default(),
            strategies: default_strategies(),
            strategy_rules: Vec::new(),
            fallback_text: DEFAULT_FALLBACK_TEXT.to_string(),
            sensitive_text: DEFAULT_SENSITIVE_TEXT.to_string(),
            features: FeatureFlags::default(),
            policy: StrategyPolicy::default(),
        }
    }
}

/// Strategy cards for the intents and emotions the default classifier prompt emits.
pub fn default_strategies() -> Vec<Strategy> {
    let intent = |key: &str, value: &str| Strategy::new(StrategyAxis::Intent, key, value);
    let emotion = |key: &str, value: &str| Strategy::new(StrategyAxis::Emotion, key, value);
    vec![
        intent("闲聊", "简短回应用户的闲聊，然后自然地把话题引回当前任务。"),
        intent("投诉", "先真诚致歉并确认问题，再说明处理方式，不要推诿。"),
        intent("比较套餐", "调用套餐工具获取数据，先总结核心差异，再结合用户需求给出建议。"),
        intent("查询FAQ", "调用FAQ工具获取标准答案，用口语化的方式转述。"),
        intent("办理业务", "确认用户身份和办理意向，逐步推进办理流程。"),
        intent("查询数据", "调用合适的查询工具，基于返回结果简洁回答。"),
        emotion("生气", "用户情绪激动，语气要格外耐心温和，先安抚情绪。"),
        emotion("困惑", "用户有些困惑，放慢节奏，用更简单的话解释。"),
    ]
}

/// In-process [`ConfigSource`] that can be updated while turns run.
///
/// # Example
///
/// ```rust
/// use orchestrator::StaticConfigSource;
///
/// let config = StaticConfigSource::builder()
///     .tasks(["1. 产品介绍*", "2. 确认身份"])
///     .dependencies("2 -> 1")
///     .opening_line("您好！")
///     .build();
///
/// config.update(|values| values.fallback_text = "请再说一遍。".to_string());
/// assert_eq!(config.values().tasks.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct StaticConfigSource {
    values: RwLock<ConfigValues>,
}

impl StaticConfigSource {
    pub fn new(values: ConfigValues) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    pub fn builder() -> StaticConfigBuilder {
        StaticConfigBuilder::default()
    }

    /// A copy of the current values.
    pub fn values(&self) -> ConfigValues {
        self.values
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Modify values in place.
    pub fn update(&self, apply: impl FnOnce(&mut ConfigValues)) {
        let mut values = self
            .values
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        apply(&mut values);
    }

    fn read<T>(&self, get: impl FnOnce(&ConfigValues) -> T) -> T {
        let values = self
            .values
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        get(&values)
    }

    /// Build from environment variables, falling back to the embedded defaults.
    ///
    /// Reads `AGENT_TASKS` (newline- or `|`-separated), `AGENT_DEPENDENCIES`,
    /// `AGENT_PERSONA_TEMPLATE` / `AGENT_PERSONA_FILE`,
    /// `AGENT_CLASSIFIER_PROMPT` / `AGENT_CLASSIFIER_PROMPT_FILE`,
    /// `AGENT_ROUTER_PROMPT` / `AGENT_ROUTER_PROMPT_FILE`, `AGENT_SAFETY_REDLINES`,
    /// `AGENT_OPENING_LINE`, `AGENT_FALLBACK_TEXT`, `AGENT_SENSITIVE_TEXT`,
    /// `AGENT_PRIMARY_MODEL`, `AGENT_CLASSIFIER_MODEL`, `AGENT_ROUTER_MODEL`,
    /// `AGENT_PRIMARY_TEMPERATURE`, `AGENT_CLASSIFIER_TEMPERATURE`, the
    /// `AGENT_ENABLE_{STRATEGY,EMOTION,WORKFLOW,TOOLS,ROUTER}` switches, and
    /// for tools `AGENT_DISABLED_TOOLS` (comma-, newline- or `|`-separated),
    /// `AGENT_TOOL_DESCRIPTION_<toolName>` and `AGENT_TOOL_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, OrchestratorError> {
        let mut values = ConfigValues::default();

        if let Ok(tasks) = env::var("AGENT_TASKS") {
            values.tasks = split_task_list(&tasks);
        }
        if let Ok(dependencies) = env::var("AGENT_DEPENDENCIES") {
            values.dependencies = dependencies.replace("\\n", "\n");
        }

        values.persona_template = load_prompt(
            "AGENT_PERSONA_TEMPLATE",
            "AGENT_PERSONA_FILE",
            DEFAULT_PERSONA_TEMPLATE,
        );
        values.classifier_prompt = load_prompt(
            "AGENT_CLASSIFIER_PROMPT",
            "AGENT_CLASSIFIER_PROMPT_FILE",
            DEFAULT_CLASSIFIER_PROMPT,
        );
        values.router_prompt = load_prompt(
            "AGENT_ROUTER_PROMPT",
            "AGENT_ROUTER_PROMPT_FILE",
            DEFAULT_ROUTER_PROMPT,
        );
        if let Ok(text) = env::var("AGENT_SAFETY_REDLINES") {
            values.safety_redlines = text.replace("\\n", "\n");
        }

        if let Ok(text) = env::var("AGENT_OPENING_LINE") {
            values.opening_line = text;
        }
        if let Ok(text) = env::var("AGENT_FALLBACK_TEXT") {
            values.fallback_text = text;
        }
        if let Ok(text) = env::var("AGENT_SENSITIVE_TEXT") {
            values.sensitive_text = text;
        }

        if let Ok(model) = env::var("AGENT_PRIMARY_MODEL") {
            values.primary_params.model_name = model;
        }
        if let Ok(model) = env::var("AGENT_CLASSIFIER_MODEL") {
            values.classifier_params.model_name = model;
        }
        if let Ok(model) = env::var("AGENT_ROUTER_MODEL") {
            values.router_params.model_name = model;
        }
        if let Some(t) = parse_env::<f32>("AGENT_PRIMARY_TEMPERATURE")? {
            values.primary_params.temperature = t;
        }
        if let Some(t) = parse_env::<f32>("AGENT_CLASSIFIER_TEMPERATURE")? {
            values.classifier_params.temperature = t;
        }

        let flags = &mut values.features;
        for (var, flag) in [
            ("AGENT_ENABLE_STRATEGY", &mut flags.strategy),
            ("AGENT_ENABLE_EMOTION", &mut flags.emotion),
            ("AGENT_ENABLE_WORKFLOW", &mut flags.workflow),
            ("AGENT_ENABLE_TOOLS", &mut flags.tools),
            ("AGENT_ENABLE_ROUTER", &mut flags.router),
        ] {
            if let Some(enabled) = parse_env::<bool>(var)? {
                *flag = enabled;
            }
        }

        values.tool_policy = tool_policy_from_env()?;

        for params in [&values.primary_params, &values.classifier_params, &values.router_params] {
            params
                .validate()
                .map_err(|e| OrchestratorError::Config(e.to_string()))?;
        }

        info!(
            tasks = values.tasks.len(),
            primary = %values.primary_params.model_name,
            classifier = %values.classifier_params.model_name,
            router = values.features.router,
            disabled_tools = values.tool_policy.disabled.len(),
            "Loaded agent configuration from environment"
        );
        Ok(Self::new(values))
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn task_list(&self) -> Vec<String> {
        self.read(|v| v.tasks.clone())
    }

    async fn dependency_text(&self) -> String {
        self.read(|v| v.dependencies.clone())
    }

    async fn persona_template(&self) -> String {
        self.read(|v| v.persona_template.clone())
    }

    async fn opening_line(&self) -> String {
        self.read(|v| v.opening_line.clone())
    }

    async fn classifier_prompt(&self) -> String {
        self.read(|v| v.classifier_prompt.clone())
    }

    async fn router_prompt(&self) -> String {
        self.read(|v| v.router_prompt.clone())
    }

    async fn safety_redlines(&self) -> String {
        self.read(|v| v.safety_redlines.clone())
    }

    async fn tool_policy(&self) -> ToolPolicy {
        self.read(|v| v.tool_policy.clone())
    }

    async fn model_params(&self, slot: ModelSlot) -> ModelParameters {
        self.read(|v| match slot {
            ModelSlot::Primary => v.primary_params.clone(),
            ModelSlot::Classifier => v.classifier_params.clone(),
            ModelSlot::Router => v.router_params.clone(),
        })
    }

    async fn active_strategies(&self, axis: StrategyAxis) -> HashMap<String, String> {
        self.read(|v| {
            v.strategies
                .iter()
                .filter(|s| s.axis == axis && s.is_active)
                .map(|s| (s.key.clone(), s.value.clone()))
                .collect()
        })
    }

    async fn fallback_text(&self) -> String {
        self.read(|v| v.fallback_text.clone())
    }

    async fn sensitive_text(&self) -> String {
        self.read(|v| v.sensitive_text.clone())
    }

    async fn strategy_rules(&self) -> Vec<StrategyRule> {
        self.read(|v| v.strategy_rules.clone())
    }

    async fn strategies(&self) -> Vec<Strategy> {
        self.read(|v| v.strategies.clone())
    }

    async fn features(&self) -> FeatureFlags {
        self.read(|v| v.features)
    }

    async fn strategy_policy(&self) -> StrategyPolicy {
        self.read(|v| v.policy)
    }
}

/// Builder for [`StaticConfigSource`].
#[derive(Debug, Default)]
pub struct StaticConfigBuilder {
    values: ConfigValues,
}

impl StaticConfigBuilder {
    pub fn tasks<I, S>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values.tasks = tasks.into_iter().map(Into::into).collect();
        self
    }

    pub fn dependencies(mut self, text: impl Into<String>) -> Self {
        self.values.dependencies = text.into();
        self
    }

    pub fn persona_template(mut self, template: impl Into<String>) -> Self {
        self.values.persona_template = template.into();
        self
    }

    pub fn opening_line(mut self, text: impl Into<String>) -> Self {
        self.values.opening_line = text.into();
        self
    }

    pub fn classifier_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.values.classifier_prompt = prompt.into();
        self
    }

    pub fn primary_params(mut self, params: ModelParameters) -> Self {
        self.values.primary_params = params;
        self
    }

    pub fn classifier_params(mut self, params: ModelParameters) -> Self {
        self.values.classifier_params = params;
        self
    }

    pub fn router_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.values.router_prompt = prompt.into();
        self
    }

    pub fn router_params(mut self, params: ModelParameters) -> Self {
        self.values.router_params = params;
        self
    }

    pub fn safety_redlines(mut self, text: impl Into<String>) -> Self {
        self.values.safety_redlines = text.into();
        self
    }

    pub fn tool_policy(mut self, policy: ToolPolicy) -> Self {
        self.values.tool_policy = policy;
        self
    }

    /// Replace all strategy cards.
    pub fn strategies(mut self, strategies: Vec<Strategy>) -> Self {
        self.values.strategies = strategies;
        self
    }

    pub fn strategy_rules(mut self, rules: Vec<StrategyRule>) -> Self {
        self.values.strategy_rules = rules;
        self
    }

    pub fn fallback_text(mut self, text: impl Into<String>) -> Self {
        self.values.fallback_text = text.into();
        self
    }

    pub fn sensitive_text(mut self, text: impl Into<String>) -> Self {
        self.values.sensitive_text = text.into();
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.values.features = features;
        self
    }

    pub fn policy(mut self, policy: StrategyPolicy) -> Self {
        self.values.policy = policy;
        self
    }

    pub fn build(self) -> StaticConfigSource {
        StaticConfigSource::new(self.values)
    }
}

/// Split a task list on newlines or `|`, dropping blanks.
pub fn split_task_list(text: &str) -> Vec<String> {
    text.split(['\n', '|'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Prefix of the per-tool description override variables.
const TOOL_DESCRIPTION_PREFIX: &str = "AGENT_TOOL_DESCRIPTION_";

fn tool_policy_from_env() -> Result<ToolPolicy, OrchestratorError> {
    let mut policy = ToolPolicy::default();

    if let Ok(list) = env::var("AGENT_DISABLED_TOOLS") {
        policy = policy.disable_tools(split_tool_list(&list));
    }
    for (var, text) in env::vars() {
        if let Some(tool) = var.strip_prefix(TOOL_DESCRIPTION_PREFIX) {
            if !tool.is_empty() && !text.trim().is_empty() {
                debug!(tool, "Tool description overridden from environment");
                policy = policy.describe(tool, text);
            }
        }
    }
    if let Some(secs) = parse_env::<u64>("AGENT_TOOL_TIMEOUT_SECS")? {
        if secs > 0 {
            policy = policy.with_timeout(Duration::from_secs(secs));
        }
    }
    Ok(policy)
}

/// Split a tool list on commas, newlines or `|`, dropping blanks.
pub fn split_tool_list(text: &str) -> Vec<String> {
    text.split([',', '\n', '|'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_env<T: std::str::FromStr>(var: &str) -> Result<Option<T>, OrchestratorError> {
    match env::var(var) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| OrchestratorError::Config(format!("{} has invalid value '{}'", var, raw))),
        Err(_) => Ok(None),
    }
}

/// Inline env var, then file named by `file_var`, then `default`.
fn load_prompt(inline_var: &str, file_var: &str, default: &str) -> String {
    if let Ok(prompt) = env::var(inline_var) {
        if !prompt.trim().is_empty() {
            info!("Using prompt from {} env var", inline_var);
            return prompt;
        }
    }

    if let Ok(path) = env::var(file_var) {
        match load_prompt_file(&path) {
            Some(prompt) => {
                info!("Loaded prompt from {}", path);
                return prompt;
            }
            None => warn!("Prompt file {} is missing or empty; using default", path),
        }
    }

    debug!("Using embedded default for {}", inline_var);
    default.to_string()
}

fn load_prompt_file(path: impl AsRef<Path>) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "AGENT_TASKS",
        "AGENT_DEPENDENCIES",
        "AGENT_PERSONA_TEMPLATE",
        "AGENT_PERSONA_FILE",
        "AGENT_CLASSIFIER_PROMPT",
        "AGENT_CLASSIFIER_PROMPT_FILE",
        "AGENT_OPENING_LINE",
        "AGENT_PRIMARY_MODEL",
        "AGENT_PRIMARY_TEMPERATURE",
        "AGENT_ENABLE_TOOLS",
        "AGENT_ENABLE_ROUTER",
        "AGENT_ROUTER_MODEL",
        "AGENT_SAFETY_REDLINES",
        "AGENT_DISABLED_TOOLS",
        "AGENT_TOOL_DESCRIPTION_getWeather",
        "AGENT_TOOL_TIMEOUT_SECS",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_split_task_list() {
        assert_eq!(
            split_task_list("1. a*| 2. b\n\n3. c "),
            vec!["1. a*", "2. b", "3. c"]
        );
    }

    #[test]
    fn test_from_env_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        let values = StaticConfigSource::from_env().unwrap().values();
        assert_eq!(values.tasks.len(), 5);
        assert_eq!(values.primary_params.model_name, DEFAULT_PRIMARY_MODEL);
        assert_eq!(values.classifier_params.temperature, 0.1);
        assert_eq!(values.sensitive_text, "我们换个话题吧。");
        assert!(values.features.tools);
        assert!(!values.features.router);
        assert_eq!(values.router_params.model_name, DEFAULT_ROUTER_MODEL);
        assert!(values.router_prompt.contains("{tools}"));
        assert!(values.safety_redlines.contains("转人工"));
        assert_eq!(values.tool_policy, ToolPolicy::default());
    }

    #[test]
    fn test_from_env_tool_switches() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        env::set_var("AGENT_ENABLE_ROUTER", "true");
        env::set_var("AGENT_ROUTER_MODEL", "doubao-lite-4k");
        env::set_var("AGENT_DISABLED_TOOLS", "webSearch, getNews|");
        env::set_var("AGENT_TOOL_DESCRIPTION_getWeather", "查询天气");
        env::set_var("AGENT_TOOL_TIMEOUT_SECS", "8");
        env::set_var("AGENT_SAFETY_REDLINES", "1. 不骂人\\n2. 不承诺赔偿");

        let values = StaticConfigSource::from_env().unwrap().values();
        clear_env();

        assert!(values.features.router);
        assert_eq!(values.router_params.model_name, "doubao-lite-4k");
        let policy = values.tool_policy;
        assert!(!policy.allows("webSearch"));
        assert!(!policy.allows("getNews"));
        assert!(policy.allows("getWeather"));
        assert_eq!(policy.descriptions.get("getWeather").map(String::as_str), Some("查询天气"));
        assert_eq!(policy.timeout, Some(Duration::from_secs(8)));
        assert_eq!(values.safety_redlines, "1. 不骂人\n2. 不承诺赔偿");
    }

    #[test]
    fn test_from_env_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        let dir = tempfile::tempdir().unwrap();
        let persona = dir.path().join("persona.md");
        std::fs::write(&persona, "  文件人设 {tasks}  \n").unwrap();

        env::set_var("AGENT_TASKS", "1. 开场*|2. 收尾");
        env::set_var("AGENT_DEPENDENCIES", "2 -> 1");
        env::set_var("AGENT_PERSONA_FILE", &persona);
        env::set_var("AGENT_PRIMARY_MODEL", "doubao-pro-32k");
        env::set_var("AGENT_PRIMARY_TEMPERATURE", "0.3");
        env::set_var("AGENT_ENABLE_TOOLS", "false");

        let values = StaticConfigSource::from_env().unwrap().values();
        clear_env();

        assert_eq!(values.tasks, vec!["1. 开场*", "2. 收尾"]);
        assert_eq!(values.persona_template, "文件人设 {tasks}");
        assert_eq!(values.primary_params.model_name, "doubao-pro-32k");
        assert_eq!(values.primary_params.temperature, 0.3);
        assert!(!values.features.tools);
    }

    #[test]
    fn test_from_env_inline_prompt_beats_file() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        env::set_var("AGENT_CLASSIFIER_PROMPT", "inline");
        env::set_var("AGENT_CLASSIFIER_PROMPT_FILE", "/nonexistent/prompt.md");
        let values = StaticConfigSource::from_env().unwrap().values();
        clear_env();

        assert_eq!(values.classifier_prompt, "inline");
    }

    #[test]
    fn test_from_env_rejects_bad_values() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        env::set_var("AGENT_PRIMARY_TEMPERATURE", "hot");
        assert!(matches!(StaticConfigSource::from_env(), Err(OrchestratorError::Config(_))));

        env::set_var("AGENT_PRIMARY_TEMPERATURE", "3.5");
        assert!(matches!(StaticConfigSource::from_env(), Err(OrchestratorError::Config(_))));
        clear_env();
    }

    #[tokio::test]
    async fn test_turn_config_snapshot() {
        let source = StaticConfigSource::builder()
            .tasks(["1. a*", "2. b"])
            .dependencies("2 -> 1")
            .build();

        let snapshot = TurnConfig::load(&source).await.unwrap();
        source.update(|v| v.tasks.clear());

        assert_eq!(snapshot.tasks.len(), 2);
        assert_eq!(snapshot.dependency_text, "2 -> 1");
        assert_eq!(snapshot.router_params.model_name, DEFAULT_ROUTER_MODEL);
        assert!(snapshot.intent_strategies.contains_key("比较套餐"));
        assert!(snapshot.emotion_strategies.contains_key("生气"));
        assert!(TurnConfig::load(&source).await.unwrap().tasks.is_empty());
    }

    #[tokio::test]
    async fn test_inactive_strategies_are_hidden() {
        let mut inactive = Strategy::new(StrategyAxis::Intent, "投诉", "x");
        inactive.is_active = false;
        let source = StaticConfigSource::builder()
            .strategies(vec![inactive, Strategy::new(StrategyAxis::Intent, "闲聊", "y")])
            .build();

        let active = source.active_strategies(StrategyAxis::Intent).await;
        assert_eq!(active.len(), 1);
        assert!(active.contains_key("闲聊"));
    }
}
