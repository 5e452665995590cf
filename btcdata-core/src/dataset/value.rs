//! Cell values of the persisted table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A present cell value. Missing cells are `None` (see [`Cell`]).
///
/// `Text` holds any field whose stored spelling is not the shortest decimal
/// form of a finite number (`59000.0`, `1e3`, `inf`, long integers). It is
/// written back verbatim and still reads numerically through [`as_f64`].
///
/// [`as_f64`]: Value::as_f64
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

/// One cell of a row; `None` is a missing value (empty in the CSV).
pub type Cell = Option<Value>;

impl Value {
    /// Parse a raw CSV field. Only empty fields are missing.
    pub fn parse(raw: &str) -> Cell {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.parse::<f64>() {
            Ok(x) if x.is_finite() && x.to_string() == trimmed => Some(Value::Number(x)),
            _ => Some(Value::Text(trimmed.to_string())),
        }
    }

    /// A numeric cell, or missing when `x` is NaN or infinite.
    pub fn number(x: f64) -> Cell {
        x.is_finite().then_some(Value::Number(x))
    }

    /// Numeric reading of the cell; text counts when it is a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(x) => Some(*x),
            Value::Text(s) => s.parse::<f64>().ok().filter(|x| x.is_finite()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_text_and_missing() {
        assert_eq!(Value::parse("42.5"), Some(Value::Number(42.5)));
        assert_eq!(Value::parse(" 7 "), Some(Value::Number(7.0)));
        assert_eq!(Value::parse("buy"), Some(Value::Text("buy".into())));
        assert_eq!(Value::parse(""), None);
        assert_eq!(Value::parse("  "), None);
    }

    #[test]
    fn stored_spelling_survives_rewrite() {
        for raw in ["59000.0", "1e3", "inf", "nan", "NaN", "12345678901234567891", "+5"] {
            let cell = Value::parse(raw).unwrap();
            assert_eq!(cell.to_string(), raw, "rewrote {raw}");
        }
    }

    #[test]
    fn text_numbers_still_read_numerically() {
        assert_eq!(Value::parse("59000.0").unwrap().as_f64(), Some(59000.0));
        assert_eq!(Value::parse("1e3").unwrap().as_f64(), Some(1000.0));
        assert_eq!(Value::parse("inf").unwrap().as_f64(), None);
        assert_eq!(Value::parse("nan").unwrap().as_f64(), None);
        assert_eq!(Value::parse("buy").unwrap().as_f64(), None);
    }

    #[test]
    fn non_finite_number_is_missing() {
        assert_eq!(Value::number(f64::NAN), None);
        assert_eq!(Value::number(f64::INFINITY), None);
        assert_eq!(Value::number(1.5), Some(Value::Number(1.5)));
    }

    #[test]
    fn display_uses_shortest_float_form() {
        assert_eq!(Value::Number(1.0).to_string(), "1");
        assert_eq!(Value::Number(0.25).to_string(), "0.25");
        assert_eq!(Value::Text("x".into()).to_string(), "x");
    }
}
