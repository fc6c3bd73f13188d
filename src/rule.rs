//! # Rule source
//!
//! Declarative, pre-validation representation of a rule and its wire
//! format (§6): a JSON document, array or JSONL, of objects shaped like
//!
//! ```json
//! { "rule_code": "R1", "priority": 50,
//!   "conditions": [ { "field": "country", "operator": "EQUAL_TO", "value": "US" } ] }
//! ```

use crate::error::CompilationError;
use crate::value::ConditionValue;
use serde::{Deserialize, Serialize};

/// One `(field, operator, value)` triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: String,
    #[serde(default)]
    pub value: Option<ConditionValue>,
}

/// A declarative rule as authored: a conjunction of conditions with a
/// code, priority, description, and enabled flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub rule_code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub labels: serde_json::Map<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}

/// Parse a rule source document. Array form (`[{...}, {...}]`) and JSONL
/// form (one rule object per line) are both accepted, dispatched on the
/// first non-whitespace byte.
pub fn parse_rule_source(source: &str) -> Result<Vec<RuleDefinition>, CompilationError> {
    let trimmed = source.trim_start();
    if trimmed.starts_with('[') {
        let rules: Vec<RuleDefinition> = serde_json::from_str(trimmed)?;
        Ok(rules)
    } else {
        let mut rules = Vec::new();
        for line in source.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let rule: RuleDefinition = serde_json::from_str(line)?;
            rules.push(rule);
        }
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_array_form() {
        let src = r#"[
            {"rule_code": "R1", "priority": 50, "conditions": []}
        ]"#;
        let rules = parse_rule_source(src).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].rule_code, "R1");
        assert!(rules[0].enabled);
    }

    #[test]
    fn parses_jsonl_form() {
        let src = "{\"rule_code\": \"R1\", \"conditions\": []}\n{\"rule_code\": \"R2\", \"conditions\": []}\n";
        let rules = parse_rule_source(src).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].rule_code, "R2");
    }

    #[test]
    fn enabled_defaults_true_and_is_overridable() {
        let src = r#"[{"rule_code": "R1", "enabled": false, "conditions": []}]"#;
        let rules = parse_rule_source(src).unwrap();
        assert!(!rules[0].enabled);
    }

    #[test]
    fn condition_parses_operator_as_raw_string_for_later_validation() {
        let src = r#"[{"rule_code": "R1", "conditions": [
            {"field": "country", "operator": "EQUAL_TO", "value": "US"}
        ]}]"#;
        let rules = parse_rule_source(src).unwrap();
        assert_eq!(rules[0].conditions[0].operator, "EQUAL_TO");
    }
}
