/// One recorded observation in the ring buffer (§4.5).
///
/// Produced from a `ToolResult` or `AgentError` event; never constructed
/// directly by a caller outside this crate.
#[derive(Debug, Clone)]
pub struct RecentAction {
    pub source: String,
    pub success: bool,
    pub summary: String,
}

const SUMMARY_CHAR_LIMIT: usize = 200;

pub(crate) fn truncate_summary(text: &str) -> String {
    if text.chars().count() <= SUMMARY_CHAR_LIMIT {
        return text.to_string();
    }
    let cut: String = text.chars().take(SUMMARY_CHAR_LIMIT).collect();
    format!("{cut}…")
}
