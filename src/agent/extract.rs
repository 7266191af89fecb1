use regex::Regex;
use serde_json::Value;

/// How a model response was turned into JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// The whole response was one JSON object.
    Parsed(Value),
    /// The object was cut out of surrounding text (first `{` to last `}`).
    ExtractedFallback(Value),
    /// Neither phase produced an object. Carries the last parse error.
    Failed(String),
}

/// Which phase succeeded, for logging and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    Strict,
    Extracted,
}

impl ParseOutcome {
    pub fn into_value(self) -> Result<(Value, ParseMode), String> {
        match self {
            ParseOutcome::Parsed(v) => Ok((v, ParseMode::Strict)),
            ParseOutcome::ExtractedFallback(v) => Ok((v, ParseMode::Extracted)),
            ParseOutcome::Failed(reason) => Err(reason),
        }
    }
}

/// Parse a model response in two phases:
///
/// 1. Strict parse of the trimmed response.
/// 2. Greedy extraction of the outermost `{...}` span and a parse of that.
///
/// Only JSON objects count as success. There is no third attempt.
pub fn parse_model_response(response: &str) -> ParseOutcome {
    let strict_error = match serde_json::from_str::<Value>(response.trim()) {
        Ok(value @ Value::Object(_)) => return ParseOutcome::Parsed(value),
        Ok(other) => format!("expected a JSON object, got {}", kind(&other)),
        Err(e) => e.to_string(),
    };

    let Some(span) = outer_object_span(response) else {
        tracing::debug!(chars = response.len(), "no JSON object delimiters in model response");
        return ParseOutcome::Failed(strict_error);
    };

    match serde_json::from_str::<Value>(span) {
        Ok(value @ Value::Object(_)) => {
            tracing::debug!(
                skipped = response.len() - span.len(),
                "recovered JSON object from surrounding text"
            );
            ParseOutcome::ExtractedFallback(value)
        }
        Ok(other) => ParseOutcome::Failed(format!("expected a JSON object, got {}", kind(&other))),
        Err(e) => ParseOutcome::Failed(e.to_string()),
    }
}

/// Greedy `\{[\s\S]*\}` match: from the first `{` to the last `}`.
fn outer_object_span(response: &str) -> Option<&str> {
    let re = Regex::new(r"\{[\s\S]*\}").ok()?;
    re.find(response).map(|m| m.as_str())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strict_parse() {
        let outcome = parse_model_response("  {\"plans\": []}\n");
        assert_eq!(outcome, ParseOutcome::Parsed(json!({"plans": []})));
    }

    #[test]
    fn test_fallback_extracts_from_preamble_and_trailer() {
        let outcome = parse_model_response("some preamble {\"plans\":[]} trailing text");
        assert_eq!(outcome, ParseOutcome::ExtractedFallback(json!({"plans": []})));
    }

    #[test]
    fn test_fallback_spans_nested_objects() {
        let text = "<think>plan it</think>\n```json\n{\"plans\":[{\"nom\":\"A\",\"parcelles\":[{\"id_culture\":1}]}]}\n```";
        let (value, mode) = parse_model_response(text).into_value().unwrap();
        assert_eq!(mode, ParseMode::Extracted);
        assert_eq!(value["plans"][0]["parcelles"][0]["id_culture"], 1);
    }

    #[test]
    fn test_no_brace_fails() {
        assert!(matches!(
            parse_model_response("I cannot help with that."),
            ParseOutcome::Failed(_)
        ));
    }

    #[test]
    fn test_greedy_span_with_two_objects_fails() {
        // First `{` to last `}` covers both objects, which is not valid JSON.
        let outcome = parse_model_response("a {\"x\":1} b {\"y\":2} c");
        assert!(matches!(outcome, ParseOutcome::Failed(_)));
    }

    #[test]
    fn test_top_level_array_is_not_accepted() {
        let outcome = parse_model_response("[{\"plans\":[]}]");
        // The strict phase rejects the array; the fallback then finds the inner object.
        assert_eq!(outcome, ParseOutcome::ExtractedFallback(json!({"plans": []})));
        assert!(matches!(parse_model_response("42"), ParseOutcome::Failed(_)));
    }
}
