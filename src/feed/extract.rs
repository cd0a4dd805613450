use crate::core::{CollateError, Result};
use serde_json::Value;

/// Pull the JSON array out of an input file.
///
/// Input files wrap the array in a named envelope (`{"orders": [...]}`,
/// `{"order_items": [...]}` and so on) whose name is not reliable, so
/// everything before the first `[` and after the last `]` is dropped.
pub fn extract_elements(text: &str) -> Result<Vec<Value>> {
    let start = text
        .find('[')
        .ok_or_else(|| CollateError::MalformedInput("no '[' in input".to_string()))?;
    let end = text
        .rfind(']')
        .filter(|end| *end > start)
        .ok_or_else(|| CollateError::MalformedInput("no closing ']' in input".to_string()))?;

    Ok(serde_json::from_str(&text[start..=end])?)
}
