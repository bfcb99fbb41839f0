//! Completion markers in model replies.
//!
//! The persona asks the model to say `我已完成流程[流程名]` when it finishes a
//! step. The name may follow an arrow, dash or colon, and may be bracketed.

use std::sync::OnceLock;

use regex::Regex;

/// Phrase that opens a completion marker.
pub const COMPLETION_MARKER: &str = "我已完成流程";

fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"我已完成流程\s*(?:->|→|—|-|:|：)?\s*(?:\[([^\]]+)\]|【([^】]+)】|([^\s，。,！!；;]+))")
            .expect("completion marker pattern is valid")
    })
}

/// Task names announced in `text`, in order of appearance.
///
/// ```rust
/// use orchestrator::completed_task_names;
///
/// let names = completed_task_names("好的，我已完成流程[2. 确认身份]，接下来为您推荐套餐。");
/// assert_eq!(names, vec!["2. 确认身份"]);
/// ```
pub fn completed_task_names(text: &str) -> Vec<String> {
    marker_pattern()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracketed_and_separators() {
        assert_eq!(completed_task_names("我已完成流程[确认身份]"), vec!["确认身份"]);
        assert_eq!(completed_task_names("我已完成流程 -> [3. 套餐推荐]"), vec!["3. 套餐推荐"]);
        assert_eq!(completed_task_names("我已完成流程：【产品介绍】"), vec!["产品介绍"]);
        assert_eq!(completed_task_names("我已完成流程→结束语。再见"), vec!["结束语"]);
    }

    #[test]
    fn test_multiple_markers() {
        let text = "我已完成流程[产品介绍]，也我已完成流程[确认身份]";
        assert_eq!(completed_task_names(text), vec!["产品介绍", "确认身份"]);
    }

    #[test]
    fn test_absent_marker() {
        assert!(completed_task_names("好的，请问您的手机号是多少？").is_empty());
        assert!(completed_task_names("我已完成流程").is_empty());
        assert!(completed_task_names("我已完成流程[ ]").is_empty());
    }
}
