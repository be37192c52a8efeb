//! FILENAME: core/pivot-engine/src/condition.rs
//! Condition fragments - abstract boolean predicates over result fields.
//!
//! The engine never executes conditions. It builds a small predicate tree
//! and renders it to the SQL-flavoured text the results backend accepts.
//! Rendering rules:
//! - equality `col='v'`, inequality `col != 'v'`, null test `col IS NULL`
//! - label membership `FIND_IN_SET('v', col)`
//! - AND parenthesizes raw and OR operands; OR parenthesizes every operand

use std::fmt;

use results_model::TestIndex;
use serde::{Deserialize, Serialize};

/// Column holding the test index.
pub const TEST_INDEX_FIELD: &str = "test_idx";

/// A composable predicate over the results table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// Free-form condition text (user input or a previously rendered condition).
    Raw(String),
    /// `column = value`.
    Equals { column: String, value: String },
    /// `column != value`.
    NotEquals { column: String, value: String },
    /// `column IS NULL`.
    IsNull { column: String },
    /// `value` is a member of the comma-separated set stored in `column`.
    Contains { column: String, value: String },
    /// The test index is one of the listed indices.
    TestIndexIn(Vec<TestIndex>),
    Not(Box<Condition>),
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

impl Condition {
    /// The condition that constrains nothing.
    pub fn always() -> Self {
        Condition::And(Vec::new())
    }

    /// Wraps free-form text. Blank text becomes `always()`.
    pub fn raw(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            Condition::always()
        } else {
            Condition::Raw(text.trim().to_string())
        }
    }

    pub fn equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        Condition::Equals {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn not_equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        Condition::NotEquals {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Condition::IsNull {
            column: column.into(),
        }
    }

    pub fn contains(column: impl Into<String>, value: impl Into<String>) -> Self {
        Condition::Contains {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn test_index(index: TestIndex) -> Self {
        Condition::TestIndexIn(vec![index])
    }

    pub fn negate(condition: Condition) -> Self {
        Condition::Not(Box::new(condition))
    }

    /// Conjunction of `parts`. Nested conjunctions are flattened and
    /// unconstrained parts dropped; a single remaining part is returned as is.
    pub fn and<I: IntoIterator<Item = Condition>>(parts: I) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Condition::And(inner) => flat.extend(inner.into_iter().filter(|c| !c.is_empty())),
                other if other.is_empty() => {}
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.pop().unwrap_or_else(Condition::always)
        } else {
            Condition::And(flat)
        }
    }

    /// Disjunction of `parts`. An unconstrained part makes the whole
    /// disjunction unconstrained; a single part is returned as is.
    pub fn or<I: IntoIterator<Item = Condition>>(parts: I) -> Self {
        let mut parts: Vec<Condition> = parts.into_iter().collect();
        if parts.iter().any(Condition::is_empty) {
            return Condition::always();
        }
        if parts.len() == 1 {
            return parts.pop().unwrap_or_else(Condition::always);
        }
        Condition::Or(parts)
    }

    /// Narrows free-form `base` text by `extra`.
    pub fn refine(base: &str, extra: Condition) -> Self {
        Condition::and([Condition::raw(base), extra])
    }

    /// True when the condition constrains nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Condition::Raw(text) => text.trim().is_empty(),
            Condition::And(parts) => parts.iter().all(Condition::is_empty),
            _ => false,
        }
    }

    /// Renders the condition text.
    pub fn to_sql(&self) -> String {
        self.to_string()
    }

    fn needs_parens_in_and(&self) -> bool {
        matches!(self, Condition::Raw(_) | Condition::Or(_))
    }
}

impl Default for Condition {
    fn default() -> Self {
        Condition::always()
    }
}

/// Backslash-escapes `\` and `'` for use inside a single-quoted literal.
pub fn escape_sql_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Raw(text) => f.write_str(text.trim()),
            Condition::Equals { column, value } => {
                write!(f, "{}='{}'", column, escape_sql_value(value))
            }
            Condition::NotEquals { column, value } => {
                write!(f, "{} != '{}'", column, escape_sql_value(value))
            }
            Condition::IsNull { column } => write!(f, "{} IS NULL", column),
            Condition::Contains { column, value } => {
                write!(f, "FIND_IN_SET('{}', {})", escape_sql_value(value), column)
            }
            Condition::TestIndexIn(indices) => match indices.as_slice() {
                [] => f.write_str("FALSE"),
                [single] => write!(f, "{}={}", TEST_INDEX_FIELD, single),
                many => {
                    let list: Vec<String> = many.iter().map(|i| i.to_string()).collect();
                    write!(f, "{} IN ({})", TEST_INDEX_FIELD, list.join(","))
                }
            },
            Condition::Not(inner) => write!(f, "NOT ({})", inner),
            Condition::And(parts) => {
                let mut first = true;
                for part in parts.iter().filter(|p| !p.is_empty()) {
                    if !first {
                        f.write_str(" AND ")?;
                    }
                    first = false;
                    if part.needs_parens_in_and() {
                        write!(f, "({})", part)?;
                    } else {
                        write!(f, "{}", part)?;
                    }
                }
                Ok(())
            }
            Condition::Or(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" OR ")?;
                    }
                    write!(f, "({})", part)?;
                }
                Ok(())
            }
        }
    }
}
