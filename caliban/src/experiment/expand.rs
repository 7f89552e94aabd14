use itertools::Itertools;

use super::value::{Document, Entry, Key, Mapping, Scalar};

/// One enumerated choice of bindings, in the declaration order of the mapping that produced it.
pub type Binding = (Key, Vec<Scalar>);

/// One fully bound tuple: the ordered sequence of bindings chosen for every entry of a mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgTuple {
    pub bindings: Vec<Binding>,
}

/// Expands a [`Document`] into the deterministic, ordered sequence of argument-tuples: the
/// per-mapping cartesian product of list-valued entries (scalars appended to every tuple),
/// concatenated across mappings in declaration order.
pub fn expand(document: &Document) -> Vec<ArgTuple> {
    document.mappings.iter().flat_map(expand_mapping).collect()
}

fn expand_mapping(mapping: &Mapping) -> Vec<ArgTuple> {
    let scalars: Vec<Binding> = mapping
        .entries
        .iter()
        .filter_map(|(key, entry)| match entry {
            Entry::Scalar(value) => Some((key.clone(), vec![value.clone()])),
            _ => None,
        })
        .collect();

    let list_entries: Vec<(&Key, Vec<Vec<Scalar>>)> = mapping
        .entries
        .iter()
        .filter_map(|(key, entry)| match entry {
            Entry::List(values) => Some((key, values.iter().map(|v| vec![v.clone()]).collect())),
            Entry::CompoundList(tuples) => Some((key, tuples.clone())),
            Entry::Scalar(_) => None,
        })
        .collect();

    if list_entries.is_empty() {
        return vec![ArgTuple {
            bindings: scalars,
        }];
    }

    list_entries
        .iter()
        .map(|(_, choices)| choices.iter().enumerate().collect::<Vec<_>>())
        .multi_cartesian_product()
        .map(|combination| {
            let mut bindings = Vec::with_capacity(scalars.len() + combination.len());
            for (entry_index, (_, choice)) in combination.into_iter().enumerate() {
                let key = list_entries[entry_index].0.clone();
                bindings.push((key, choice.clone()));
            }
            bindings.extend(scalars.iter().cloned());
            ArgTuple { bindings }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::parser::parse;

    #[test]
    fn simple_sweep_four_tuples_in_declaration_order() {
        let document = parse("epochs: [2, 3]\nbatch_size: [64, 128]\nlr: 0.1\nuse_bn: true\n").unwrap();
        let tuples = expand(&document);
        assert_eq!(tuples.len(), 4);
    }

    #[test]
    fn list_of_mappings_sums_products() {
        let document = parse("- a: [1, 2]\n  b: [10, 20]\n- c: [5]\n- d: 7\n").unwrap();
        assert_eq!(expand(&document).len(), 4 + 1 + 1);
    }

    #[test]
    fn compound_key_yields_one_tuple_per_element() {
        let document = parse("\"[a,b]\":\n  - [a1, b1]\n  - [a2, b2]\n").unwrap();
        assert_eq!(expand(&document).len(), 2);
    }

    #[test]
    fn empty_document_yields_one_empty_tuple() {
        let document = parse("").unwrap();
        let tuples = expand(&document);
        assert_eq!(tuples.len(), 1);
        assert!(tuples[0].bindings.is_empty());
    }
}
