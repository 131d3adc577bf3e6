//! Pulling JSON documents out of model output.
//!
//! Hosted runtimes that honour the declared output format return bare JSON.
//! Others wrap it in a fenced block or a `<finish>` tag, sometimes with
//! prose around it, so we try those shapes in order.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Match <finish>...</finish> blocks
static FINISH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<finish>\s*([\s\S]*?)</finish>").expect("valid finish regex"));

/// Match ```json...``` or bare ``` fences
static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json|JSON)?[ \t]*\r?\n([\s\S]*?)```").expect("valid fence regex")
});

/// Find the first JSON document in `text`.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    for re in [&*FINISH_RE, &*FENCE_RE] {
        if let Some(value) = re
            .captures(text)
            .and_then(|cap| cap.get(1))
            .and_then(|m| serde_json::from_str::<Value>(m.as_str().trim()).ok())
        {
            return Some(value);
        }
    }

    // Outermost braces, for objects embedded in prose
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end]).ok()
}
