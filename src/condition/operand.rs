//! Runtime values of condition expressions

use super::ConditionError;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// A value produced while evaluating a condition
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(Vec<Value>),
    Object(Map<String, Value>),
}

impl From<&Value> for Operand {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Operand::Null,
            Value::Bool(b) => Operand::Bool(*b),
            Value::Number(n) => Operand::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => Operand::Str(s.clone()),
            Value::Array(items) => Operand::Array(items.clone()),
            Value::Object(map) => Operand::Object(map.clone()),
        }
    }
}

impl Operand {
    pub fn is_truthy(&self) -> bool {
        match self {
            Operand::Undefined | Operand::Null => false,
            Operand::Bool(b) => *b,
            Operand::Number(n) => *n != 0.0 && !n.is_nan(),
            Operand::Str(s) => !s.is_empty(),
            Operand::Array(_) | Operand::Object(_) => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Operand::Undefined => f64::NAN,
            Operand::Null => 0.0,
            Operand::Bool(b) => f64::from(u8::from(*b)),
            Operand::Number(n) => *n,
            Operand::Str(s) => parse_number(s),
            Operand::Array(_) => parse_number(&self.to_display_string()),
            Operand::Object(_) => f64::NAN,
        }
    }

    pub fn to_display_string(&self) -> String {
        match self {
            Operand::Undefined => "undefined".to_string(),
            Operand::Null => "null".to_string(),
            Operand::Bool(b) => b.to_string(),
            Operand::Number(n) => format_number(*n),
            Operand::Str(s) => s.clone(),
            Operand::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Null => String::new(),
                    other => Operand::from(other).to_display_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Operand::Object(_) => "[object Object]".to_string(),
        }
    }

    /// `===`. Arrays and objects compare structurally.
    pub fn strict_eq(&self, other: &Operand) -> bool {
        match (self, other) {
            (Operand::Undefined, Operand::Undefined) | (Operand::Null, Operand::Null) => true,
            (Operand::Bool(a), Operand::Bool(b)) => a == b,
            (Operand::Number(a), Operand::Number(b)) => a == b,
            (Operand::Str(a), Operand::Str(b)) => a == b,
            (Operand::Array(a), Operand::Array(b)) => a == b,
            (Operand::Object(a), Operand::Object(b)) => a == b,
            _ => false,
        }
    }

    /// `==` with coercion between numbers, strings and booleans
    pub fn loose_eq(&self, other: &Operand) -> bool {
        use Operand::*;
        match (self, other) {
            (Undefined | Null, Undefined | Null) => true,
            (Undefined | Null, _) | (_, Undefined | Null) => false,
            (Bool(_), _) => Number(self.to_number()).loose_eq(other),
            (_, Bool(_)) => self.loose_eq(&Number(other.to_number())),
            (Number(a), Str(_)) => *a == other.to_number(),
            (Str(_), Number(b)) => self.to_number() == *b,
            (Array(_) | Object(_), Number(_) | Str(_)) => {
                Str(self.to_display_string()).loose_eq(other)
            }
            (Number(_) | Str(_), Array(_) | Object(_)) => {
                self.loose_eq(&Str(other.to_display_string()))
            }
            _ => self.strict_eq(other),
        }
    }

    /// Ordering for `<`, `<=`, `>`, `>=`; `None` when either side is NaN
    pub fn compare(&self, other: &Operand) -> Option<Ordering> {
        match (self, other) {
            (Operand::Str(a), Operand::Str(b)) => Some(a.cmp(b)),
            _ => self.to_number().partial_cmp(&other.to_number()),
        }
    }

    /// `+`: concatenation if either side is string-like, otherwise addition
    pub fn add(&self, other: &Operand) -> Operand {
        let stringy = |o: &Operand| {
            matches!(o, Operand::Str(_) | Operand::Array(_) | Operand::Object(_))
        };
        if stringy(self) || stringy(other) {
            Operand::Str(self.to_display_string() + &other.to_display_string())
        } else {
            Operand::Number(self.to_number() + other.to_number())
        }
    }

    /// Property access (`a.b`, `a["b"]`, `a[0]`)
    pub fn member(&self, key: &str) -> Result<Operand, ConditionError> {
        let nothing = |target| ConditionError::PropertyOfNothing {
            property: key.to_string(),
            target,
        };

        Ok(match self {
            Operand::Undefined => return Err(nothing("undefined")),
            Operand::Null => return Err(nothing("null")),
            Operand::Object(map) => map.get(key).map_or(Operand::Undefined, Operand::from),
            Operand::Array(items) if key == "length" => Operand::Number(items.len() as f64),
            Operand::Array(items) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .map_or(Operand::Undefined, Operand::from),
            Operand::Str(s) if key == "length" => Operand::Number(s.chars().count() as f64),
            Operand::Str(s) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map_or(Operand::Undefined, |c| Operand::Str(c.to_string())),
            Operand::Bool(_) | Operand::Number(_) => Operand::Undefined,
        })
    }
}

fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim();
    match trimmed {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts "inf" and "nan" spellings that scripts do not
        t if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        t => t.parse().unwrap_or(f64::NAN),
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
