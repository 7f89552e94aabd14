//! ExperimentExpander: expands an experiment-config document into a deterministic, ordered
//! sequence of argument-tuples.

mod argv;
mod expand;
mod parser;
mod value;

pub use argv::materialize;
pub use expand::{expand, ArgTuple};
pub use parser::parse;
pub use value::{Document, Entry, Key, Mapping, Scalar};

use crate::error::CalibanError;

/// Parses an experiment-config document and expands it, then materializes argv for each tuple
/// with `prefix` prepended. This is the single entry point `Dispatcher` calls.
pub fn expand_to_argv(document_text: &str, prefix: &[String]) -> Result<Vec<Vec<String>>, CalibanError> {
    let document = parse(document_text)?;
    let tuples = expand(&document);
    Ok(tuples.iter().map(|tuple| materialize(prefix, tuple)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_expand_to_argv() {
        let argvs = expand_to_argv("epochs: [2, 3]\n", &[]).unwrap();
        assert_eq!(argvs, vec![vec!["--epochs", "2"], vec!["--epochs", "3"]]);
    }

    #[test]
    fn empty_document_plus_prefix() {
        let argvs = expand_to_argv("", &["run.py".to_string()]).unwrap();
        assert_eq!(argvs, vec![vec!["run.py".to_string()]]);
    }
}
