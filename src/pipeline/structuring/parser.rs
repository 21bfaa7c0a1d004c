use serde_json::Value;

use super::ExtractionError;

pub type JsonMap = serde_json::Map<String, Value>;

/// Recover the JSON object embedded in a model response.
///
/// Tries a strict parse of the whole text first, then the span from the
/// first `{` to the last `}`. Models routinely wrap output in commentary or
/// code fences, which the second pass tolerates. Key order is preserved.
pub fn extract_json_object(text: &str) -> Result<JsonMap, ExtractionError> {
    if text.trim().is_empty() {
        return Err(ExtractionError::Empty);
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        return Ok(map);
    }

    let start = text.find('{');
    let end = text.rfind('}');

    match (start, end) {
        (None, _) => Err(ExtractionError::NotJson(
            "no opening brace in response".into(),
        )),
        (Some(_), None) => Err(ExtractionError::Truncated(
            "no closing brace in response".into(),
        )),
        (Some(start), Some(end)) if end < start => Err(ExtractionError::Truncated(
            "no closing brace after the first opening brace".into(),
        )),
        (Some(start), Some(end)) => parse_candidate(&text[start..=end]),
    }
}

fn parse_candidate(candidate: &str) -> Result<JsonMap, ExtractionError> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ExtractionError::NotJson(
            "embedded JSON is not an object".into(),
        )),
        Err(e) if e.is_eof() => Err(ExtractionError::Truncated(e.to_string())),
        Err(e) => Err(ExtractionError::NotJson(e.to_string())),
    }
}
