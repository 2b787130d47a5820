//! Built-in response parsing.

use std::sync::LazyLock;

use behavior_tree::Blackboard;
use regex::Regex;
use serde_json::Value;

use crate::error::ParseError;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```(?:json)?\s*\n?(.*?)\n?\s*```\s*$").expect("valid code fence pattern")
});

/// Returns the content inside a surrounding Markdown code fence, or the text
/// unchanged when it is not fenced.
pub fn strip_code_fences(text: &str) -> &str {
    CODE_FENCE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text, |inner| inner.as_str())
}

/// Parses a JSON object and shallow-merges its members into the blackboard's
/// strategy entry.
pub fn default_json_parser(response: &str, blackboard: &mut Blackboard) -> Result<(), ParseError> {
    let parsed: Value = serde_json::from_str(strip_code_fences(response))?;
    let Value::Object(members) = parsed else {
        return Err(ParseError::NotAnObject(type_name(&parsed)));
    };

    blackboard.strategy_mut().extend(members);
    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn strips_json_and_bare_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  ```\n[1]\n```  "), "[1]");
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn merges_into_existing_strategy() {
        let mut bb = Blackboard::new();
        bb.strategy_mut().insert("goal".into(), json!("hold"));
        bb.strategy_mut().insert("target".into(), json!(3));

        default_json_parser("```json\n{\"goal\": \"flee\", \"speed\": 2}\n```", &mut bb).unwrap();

        assert_eq!(
            bb.get(Blackboard::STRATEGY_KEY),
            Some(&json!({"goal": "flee", "target": 3, "speed": 2}))
        );
    }

    #[test]
    fn rejects_non_objects_and_bad_json() {
        let mut bb = Blackboard::new();

        let err = default_json_parser("[1, 2]", &mut bb).unwrap_err();
        assert!(matches!(err, ParseError::NotAnObject("array")));

        let err = default_json_parser("not json", &mut bb).unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));

        assert!(bb.strategy().is_none());
    }
}
