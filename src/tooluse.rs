use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

static TOOL_USE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<use tool="(.+?)">(.+?)</use>"#).expect("tool-use pattern compiles")
});

const CALL_ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CALL_ID_LEN: usize = 24;

/// A `<use tool="NAME">ARGS</use>` span found in generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolUse {
    pub name: String,
    /// Trimmed span body; not validated as JSON.
    pub arguments: String,
}

/// Collect every tool-use span in `text`, left to right. Each span ends at the
/// nearest closing tag; text outside spans is dropped.
pub fn extract(text: &str) -> Vec<ToolUse> {
    TOOL_USE
        .captures_iter(text)
        .map(|caps| ToolUse {
            name: caps[1].to_string(),
            arguments: caps[2].trim().to_string(),
        })
        .collect()
}

/// `call_` followed by 24 random alphanumerics.
pub fn new_call_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..CALL_ID_LEN)
        .map(|_| CALL_ID_CHARSET[rng.gen_range(0..CALL_ID_CHARSET.len())] as char)
        .collect();
    format!("call_{suffix}")
}
