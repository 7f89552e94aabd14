use serde_yaml::Value;

use crate::error::CalibanError;

use super::value::{Document, Entry, Key, Mapping, Scalar};

/// Parses an experiment-config document (YAML, a strict superset of JSON; `#`-prefixed line
/// comments are tolerated by the underlying YAML parser) into a [`Document`].
///
/// An empty or absent document yields a [`Document`] with exactly one empty [`Mapping`].
pub fn parse(input: &str) -> Result<Document, CalibanError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Document {
            mappings: vec![Mapping::default()],
        });
    }

    let value: Value = serde_yaml::from_str(input)?;
    match value {
        Value::Null => Ok(Document {
            mappings: vec![Mapping::default()],
        }),
        Value::Mapping(_) => Ok(Document {
            mappings: vec![parse_mapping(value)?],
        }),
        Value::Sequence(items) => {
            let mappings = items
                .into_iter()
                .map(parse_mapping)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Document { mappings })
        }
        other => Err(CalibanError::ConfigInvalid(format!(
            "expected a mapping or a list of mappings, got {other:?}"
        ))),
    }
}

fn parse_mapping(value: Value) -> Result<Mapping, CalibanError> {
    let Value::Mapping(map) = value else {
        return Err(CalibanError::ConfigInvalid(
            "expected a mapping entry in the experiment-config document".to_string(),
        ));
    };

    let mut entries = Vec::with_capacity(map.len());
    for (raw_key, raw_value) in map {
        let key_str = raw_key
            .as_str()
            .ok_or_else(|| CalibanError::ConfigInvalid("mapping keys must be strings".to_string()))?;
        let key = Key::parse(key_str);
        let entry = parse_entry(&key, raw_value)?;
        entries.push((key, entry));
    }
    Ok(Mapping { entries })
}

fn parse_entry(key: &Key, value: Value) -> Result<Entry, CalibanError> {
    match key {
        Key::Plain(_) => match value {
            Value::Sequence(items) => Ok(Entry::List(
                items
                    .into_iter()
                    .map(parse_scalar)
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            other => Ok(Entry::Scalar(parse_scalar(other)?)),
        },
        Key::Compound(keys) => {
            let Value::Sequence(items) = value else {
                return Err(CalibanError::ConfigInvalid(format!(
                    "compound key {keys:?} must be bound to a list of {n}-tuples",
                    n = keys.len()
                )));
            };
            let mut tuples = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let Value::Sequence(tuple) = item else {
                    return Err(CalibanError::ConfigInvalid(format!(
                        "compound key {keys:?} element {index} is not a tuple"
                    )));
                };
                if tuple.len() != keys.len() {
                    return Err(CalibanError::ConfigInvalid(format!(
                        "compound key {keys:?} element {index} has arity {actual}, expected {expected}",
                        actual = tuple.len(),
                        expected = keys.len()
                    )));
                }
                tuples.push(
                    tuple
                        .into_iter()
                        .map(parse_scalar)
                        .collect::<Result<Vec<_>, _>>()?,
                );
            }
            Ok(Entry::CompoundList(tuples))
        }
    }
}

fn parse_scalar(value: Value) -> Result<Scalar, CalibanError> {
    match value {
        Value::String(value) => Ok(Scalar::Str(value)),
        Value::Bool(value) => Ok(Scalar::Bool(value)),
        Value::Number(value) => {
            if let Some(value) = value.as_i64() {
                Ok(Scalar::Int(value))
            } else if let Some(value) = value.as_f64() {
                Ok(Scalar::Float(value))
            } else {
                Err(CalibanError::ConfigInvalid(format!("unsupported number {value:?}")))
            }
        }
        other => Err(CalibanError::ConfigInvalid(format!(
            "unsupported experiment-config value: {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_one_empty_mapping() {
        let document = parse("").unwrap();
        assert_eq!(document.mappings.len(), 1);
        assert!(document.mappings[0].entries.is_empty());
    }

    #[test]
    fn parses_single_mapping_with_scalars_and_lists() {
        let document = parse("epochs: [2, 3]\nlr: 0.1\nuse_bn: true\n").unwrap();
        assert_eq!(document.mappings.len(), 1);
        assert_eq!(document.mappings[0].entries.len(), 3);
    }

    #[test]
    fn parses_list_of_mappings() {
        let document = parse("- a: [1, 2]\n  b: [10, 20]\n- c: [5]\n- d: 7\n").unwrap();
        assert_eq!(document.mappings.len(), 3);
    }

    #[test]
    fn compound_key_wrong_arity_is_config_invalid() {
        let err = parse("\"[a,b]\":\n  - [1, 2, 3]\n").unwrap_err();
        assert!(matches!(err, CalibanError::ConfigInvalid(_)));
    }

    #[test]
    fn compound_key_parses_tuples() {
        let document = parse("\"[a,b]\":\n  - [a1, b1]\n  - [a2, b2]\n").unwrap();
        let (key, entry) = &document.mappings[0].entries[0];
        assert_eq!(*key, Key::Compound(vec!["a".to_string(), "b".to_string()]));
        match entry {
            Entry::CompoundList(tuples) => assert_eq!(tuples.len(), 2),
            _ => panic!("expected a compound list"),
        }
    }
}
