//! Configuration for CompatBrain.

use brain_core::{BrainError, ModelPattern};
use std::env;
use std::time::Duration;

/// Hosted provider profile behind an OpenAI-compatible endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Alibaba DashScope (compatible mode), Qwen models.
    Qwen,
    /// Volcengine Ark, Doubao models and `ep-` endpoint ids.
    Doubao,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Qwen => "qwen",
            Provider::Doubao => "doubao",
        }
    }

    /// Prefix for this provider's environment variables.
    fn env_prefix(&self) -> &'static str {
        match self {
            Provider::Qwen => "QWEN",
            Provider::Doubao => "DOUBAO",
        }
    }

    pub fn default_api_url(&self) -> &'static str {
        match self {
            Provider::Qwen => "https://dashscope.aliyuncs.com/compatible-mode/v1",
            Provider::Doubao => "https://ark.cn-beijing.volces.com/api/v3",
        }
    }

    pub fn default_patterns(&self) -> Vec<ModelPattern> {
        match self {
            Provider::Qwen => vec![ModelPattern::prefix("qwen")],
            Provider::Doubao => vec![ModelPattern::prefix("doubao"), ModelPattern::prefix("ep-")],
        }
    }

    /// Whether the provider understands DashScope-only request fields.
    pub fn supports_dashscope_extensions(&self) -> bool {
        matches!(self, Provider::Qwen)
    }
}

/// Qwen models that think by default and must be told not to.
const NON_THINKING_MODELS: &[&str] = &[
    "qwen3-0.6b",
    "qwen3-1.7b",
    "qwen3-8b",
    "qwen3-14b",
    "qwen3-30b-a3b",
    "qwen3-32b",
    "qwen3-235b-a22b",
    "qwen1.5-0.5b-chat",
    "qwen1.5-1.8b-chat",
    "qwen1.5-7b-chat",
    "qwen1.5-14b-chat",
    "qwen1.5-72b-chat",
];

/// Whether requests for `model` must carry `enable_thinking: false`.
pub fn disables_thinking(model: &str) -> bool {
    NON_THINKING_MODELS.contains(&model)
}

/// Configuration for CompatBrain.
#[derive(Debug, Clone)]
pub struct CompatBrainConfig {
    pub provider: Provider,

    /// Base URL; `/chat/completions` is appended.
    pub api_url: String,

    /// API key for authentication.
    pub api_key: String,

    /// Model names this adapter claims.
    pub model_patterns: Vec<ModelPattern>,

    /// Maximum messages kept per session (0 keeps everything).
    pub max_history_messages: usize,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl CompatBrainConfig {
    /// Defaults for a provider, without an API key.
    pub fn for_provider(provider: Provider) -> Self {
        Self {
            provider,
            api_url: provider.default_api_url().to_string(),
            api_key: String::new(),
            model_patterns: provider.default_patterns(),
            max_history_messages: 0,
            timeout: Duration::from_secs(60),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// For `Provider::Qwen` the variables are prefixed `QWEN_`, for
    /// `Provider::Doubao` they are prefixed `DOUBAO_`:
    /// - `<P>_API_KEY` - API key (required)
    /// - `<P>_API_URL` - Base URL (default: provider endpoint)
    /// - `<P>_MAX_HISTORY_MESSAGES` - History cap per session (default: 0, unlimited)
    /// - `<P>_TIMEOUT_SECS` - Request timeout (default: 60)
    pub fn from_env(provider: Provider) -> Result<Self, BrainError> {
        let prefix = provider.env_prefix();
        let defaults = Self::for_provider(provider);

        let key_var = format!("{}_API_KEY", prefix);
        let api_key = env::var(&key_var)
            .map_err(|_| BrainError::Configuration(format!("{} not set", key_var)))?;

        let api_url = env::var(format!("{}_API_URL", prefix)).unwrap_or(defaults.api_url);

        let max_history_messages = env::var(format!("{}_MAX_HISTORY_MESSAGES", prefix))
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_history_messages);

        let timeout = env::var(format!("{}_TIMEOUT_SECS", prefix))
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        Ok(Self {
            provider,
            api_url,
            api_key,
            model_patterns: defaults.model_patterns,
            max_history_messages,
            timeout,
        })
    }

    /// Create a new config builder.
    pub fn builder(provider: Provider) -> CompatBrainConfigBuilder {
        CompatBrainConfigBuilder {
            config: Self::for_provider(provider),
        }
    }
}

/// Builder for CompatBrainConfig.
#[derive(Debug)]
pub struct CompatBrainConfigBuilder {
    config: CompatBrainConfig,
}

impl CompatBrainConfigBuilder {
    /// Set the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    /// Set the API URL.
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    /// Replace the claimed model patterns.
    pub fn model_patterns(mut self, patterns: Vec<ModelPattern>) -> Self {
        self.config.model_patterns = patterns;
        self
    }

    pub fn max_history_messages(mut self, max: usize) -> Self {
        self.config.max_history_messages = max;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> CompatBrainConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_defaults() {
        let qwen = CompatBrainConfig::for_provider(Provider::Qwen);
        assert_eq!(qwen.api_url, "https://dashscope.aliyuncs.com/compatible-mode/v1");
        assert!(qwen.model_patterns[0].matches("qwen-turbo"));

        let doubao = CompatBrainConfig::for_provider(Provider::Doubao);
        assert!(doubao.model_patterns.iter().any(|p| p.matches("ep-20240601")));
        assert!(!doubao.model_patterns.iter().any(|p| p.matches("qwen-turbo")));
    }

    #[test]
    fn test_builder_all_options() {
        let config = CompatBrainConfig::builder(Provider::Doubao)
            .api_key("my-key")
            .api_url("https://custom.api.com/v3")
            .model_patterns(vec![ModelPattern::exact("doubao-lite")])
            .max_history_messages(40)
            .timeout(Duration::from_secs(5))
            .build();

        assert_eq!(config.api_key, "my-key");
        assert_eq!(config.api_url, "https://custom.api.com/v3");
        assert_eq!(config.model_patterns, vec![ModelPattern::exact("doubao-lite")]);
        assert_eq!(config.max_history_messages, 40);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_thinking_models() {
        assert!(disables_thinking("qwen3-32b"));
        assert!(!disables_thinking("qwen3-next-80b-a3b-instruct"));
        assert!(!disables_thinking("qwen-turbo"));
    }

    // Environment-based tests are combined into a single test to avoid
    // race conditions when tests run in parallel (env vars are process-global).
    #[test]
    fn test_from_env_scenarios() {
        use std::sync::Mutex;
        static ENV_LOCK: Mutex<()> = Mutex::new(());
        let _guard = ENV_LOCK.lock().unwrap();

        fn clear_all_qwen_vars() {
            std::env::remove_var("QWEN_API_KEY");
            std::env::remove_var("QWEN_API_URL");
            std::env::remove_var("QWEN_MAX_HISTORY_MESSAGES");
            std::env::remove_var("QWEN_TIMEOUT_SECS");
        }

        // Missing key
        clear_all_qwen_vars();
        match CompatBrainConfig::from_env(Provider::Qwen) {
            Err(BrainError::Configuration(msg)) => assert!(msg.contains("QWEN_API_KEY")),
            other => panic!("Expected Configuration error, got {:?}", other),
        }

        // Key only
        std::env::set_var("QWEN_API_KEY", "test-env-key");
        let config = CompatBrainConfig::from_env(Provider::Qwen).unwrap();
        assert_eq!(config.api_key, "test-env-key");
        assert_eq!(config.api_url, Provider::Qwen.default_api_url());
        assert_eq!(config.timeout, Duration::from_secs(60));

        // Overrides, with an unparsable timeout falling back
        std::env::set_var("QWEN_API_URL", "http://localhost:9000/v1");
        std::env::set_var("QWEN_MAX_HISTORY_MESSAGES", "30");
        std::env::set_var("QWEN_TIMEOUT_SECS", "soon");
        let config = CompatBrainConfig::from_env(Provider::Qwen).unwrap();
        assert_eq!(config.api_url, "http://localhost:9000/v1");
        assert_eq!(config.max_history_messages, 30);
        assert_eq!(config.timeout, Duration::from_secs(60));

        clear_all_qwen_vars();
    }
}
