use std::fmt;

use serde::Deserialize;

/// A leaf experiment-config value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(value) => f.write_str(value),
            Scalar::Int(value) => write!(f, "{value}"),
            Scalar::Float(value) => write!(f, "{value}"),
            Scalar::Bool(value) => write!(f, "{value}"),
        }
    }
}

/// A mapping entry's value, after classification. Replaces dynamically-typed dispatch on the
/// raw YAML value with a tagged variant decided once, at the parsing boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Scalar(Scalar),
    List(Vec<Scalar>),
    /// The value bound to a compound key `[k1,...,kN]`: a list of N-tuples, each an atomic
    /// choice binding all N keys at once.
    CompoundList(Vec<Vec<Scalar>>),
}

/// A single key, either a plain identifier or a compound key `[k1,k2,...,kN]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Plain(String),
    Compound(Vec<String>),
}

impl Key {
    pub fn parse(raw: &str) -> Key {
        let trimmed = raw.trim();
        if let Some(inner) = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            Key::Compound(inner.split(',').map(|part| part.trim().to_string()).collect())
        } else {
            Key::Plain(trimmed.to_string())
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Key::Plain(_) => 1,
            Key::Compound(keys) => keys.len(),
        }
    }
}

/// One mapping in the experiment-config document: an ordered sequence of `(key, entry)` pairs,
/// order preserved exactly as declared (argument materialization order depends on it).
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    pub entries: Vec<(Key, Entry)>,
}

/// The whole experiment-config document: either a single mapping or an ordered list of mappings.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub mappings: Vec<Mapping>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_parse_plain() {
        assert_eq!(Key::parse("epochs"), Key::Plain("epochs".to_string()));
    }

    #[test]
    fn key_parse_compound() {
        assert_eq!(
            Key::parse("[a,b,c]"),
            Key::Compound(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(Key::parse("[a,b,c]").arity(), 3);
    }

    #[test]
    fn scalar_display() {
        assert_eq!(Scalar::Bool(true).to_string(), "true");
        assert_eq!(Scalar::Int(3).to_string(), "3");
    }
}
