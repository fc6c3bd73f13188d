//! The closed operator set rule conditions and predicates are built
//! from, plus the fixed selectivity-factor and cost tables §4.3 derives
//! weights from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    EqualTo,
    NotEqualTo,
    IsAnyOf,
    IsNoneOf,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Between,
    Contains,
    StartsWith,
    EndsWith,
    Regex,
    IsNull,
    IsNotNull,
}

impl Operator {
    /// Operators that require a non-null `value` on the condition.
    pub fn requires_value(self) -> bool {
        !matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    pub fn is_list_valued(self) -> bool {
        matches!(self, Operator::IsAnyOf | Operator::IsNoneOf | Operator::Between)
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Operator::GreaterThan
                | Operator::GreaterThanOrEqual
                | Operator::LessThan
                | Operator::LessThanOrEqual
                | Operator::Between
        )
    }

    pub fn is_string(self) -> bool {
        matches!(
            self,
            Operator::Contains | Operator::StartsWith | Operator::EndsWith | Operator::Regex
        )
    }

    pub fn is_null_check(self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    /// Base selectivity factor from §4.3's fixed table. `list_len` is
    /// only consulted for `IS_ANY_OF`/`IS_NONE_OF`.
    pub fn selectivity_factor(self, list_len: usize) -> f64 {
        match self {
            Operator::EqualTo | Operator::NotEqualTo => 0.10,
            Operator::GreaterThan | Operator::LessThan => 0.30,
            Operator::GreaterThanOrEqual | Operator::LessThanOrEqual => 0.35,
            Operator::IsAnyOf | Operator::IsNoneOf => (0.15 * list_len as f64).min(1.0),
            Operator::Contains | Operator::StartsWith | Operator::EndsWith => 0.40,
            Operator::Regex => 0.50,
            Operator::IsNull | Operator::IsNotNull => 0.05,
            Operator::Between => 0.50,
        }
    }

    /// Evaluation cost from §4.3's fixed table.
    pub fn cost(self) -> f64 {
        match self {
            Operator::EqualTo | Operator::NotEqualTo | Operator::IsNull | Operator::IsNotNull => 1.0,
            Operator::GreaterThan
            | Operator::GreaterThanOrEqual
            | Operator::LessThan
            | Operator::LessThanOrEqual
            | Operator::Between => 1.5,
            Operator::IsAnyOf | Operator::IsNoneOf => 2.0,
            Operator::Contains | Operator::StartsWith | Operator::EndsWith => 3.0,
            Operator::Regex => 10.0,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::EqualTo => "EQUAL_TO",
            Operator::NotEqualTo => "NOT_EQUAL_TO",
            Operator::IsAnyOf => "IS_ANY_OF",
            Operator::IsNoneOf => "IS_NONE_OF",
            Operator::GreaterThan => "GREATER_THAN",
            Operator::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
            Operator::LessThan => "LESS_THAN",
            Operator::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
            Operator::Between => "BETWEEN",
            Operator::Contains => "CONTAINS",
            Operator::StartsWith => "STARTS_WITH",
            Operator::EndsWith => "ENDS_WITH",
            Operator::Regex => "REGEX",
            Operator::IsNull => "IS_NULL",
            Operator::IsNotNull => "IS_NOT_NULL",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EQUAL_TO" => Ok(Operator::EqualTo),
            "NOT_EQUAL_TO" => Ok(Operator::NotEqualTo),
            "IS_ANY_OF" => Ok(Operator::IsAnyOf),
            "IS_NONE_OF" => Ok(Operator::IsNoneOf),
            "GREATER_THAN" => Ok(Operator::GreaterThan),
            "GREATER_THAN_OR_EQUAL" => Ok(Operator::GreaterThanOrEqual),
            "LESS_THAN" => Ok(Operator::LessThan),
            "LESS_THAN_OR_EQUAL" => Ok(Operator::LessThanOrEqual),
            "BETWEEN" => Ok(Operator::Between),
            "CONTAINS" => Ok(Operator::Contains),
            "STARTS_WITH" => Ok(Operator::StartsWith),
            "ENDS_WITH" => Ok(Operator::EndsWith),
            "REGEX" => Ok(Operator::Regex),
            "IS_NULL" => Ok(Operator::IsNull),
            "IS_NOT_NULL" => Ok(Operator::IsNotNull),
            other => Err(other.to_string()),
        }
    }
}
