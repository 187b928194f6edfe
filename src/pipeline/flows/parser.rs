use serde_json::Value;

use super::FlowError;

/// Extract the JSON object from a model reply.
///
/// Structured-output models normally return bare JSON, but some wrap it in a
/// ```json fence or add a sentence around it. Anything that does not yield a
/// JSON object is a contract violation.
pub fn extract_json_object(flow: &'static str, content: &str) -> Result<Value, FlowError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(FlowError::contract(flow, "empty model response"));
    }

    let candidate = fenced_block(trimmed)
        .or_else(|| outer_braces(trimmed))
        .unwrap_or(trimmed);

    let value: Value = serde_json::from_str(candidate)
        .map_err(|e| FlowError::contract(flow, format!("response is not valid JSON: {e}")))?;

    if !value.is_object() {
        return Err(FlowError::contract(flow, "response is not a JSON object"));
    }
    Ok(value)
}

fn fenced_block(response: &str) -> Option<&str> {
    let start = response.find("```json")? + 7;
    let end = response[start..].find("```")?;
    Some(response[start..start + end].trim())
}

fn outer_braces(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}
