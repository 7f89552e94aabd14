use super::expand::ArgTuple;
use super::value::{Key, Scalar};

/// Materializes an [`ArgTuple`] into argv: `key=value` becomes
/// `--key value`; `true` becomes the bare flag `--key`; `false` omits the flag entirely; numeric
/// and string values pass through as-is. `prefix` (anything the user supplied after the module
/// token) is prepended verbatim.
pub fn materialize(prefix: &[String], tuple: &ArgTuple) -> Vec<String> {
    let mut argv = prefix.to_vec();
    for (key, values) in &tuple.bindings {
        match key {
            Key::Plain(name) => push_binding(&mut argv, name, &values[0]),
            Key::Compound(names) => {
                for (name, value) in names.iter().zip(values.iter()) {
                    push_binding(&mut argv, name, value);
                }
            }
        }
    }
    argv
}

fn push_binding(argv: &mut Vec<String>, name: &str, value: &Scalar) {
    match value {
        Scalar::Bool(true) => argv.push(format!("--{name}")),
        Scalar::Bool(false) => {}
        other => {
            argv.push(format!("--{name}"));
            argv.push(other.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::{expand::expand, parser::parse};

    #[test]
    fn scenario_one_argv_sequence() {
        let document =
            parse("epochs: [2, 3]\nbatch_size: [64, 128]\nlr: 0.1\nuse_bn: true\n").unwrap();
        let tuples = expand(&document);
        let argvs: Vec<Vec<String>> = tuples.iter().map(|t| materialize(&[], t)).collect();
        assert_eq!(
            argvs[0],
            vec!["--epochs", "2", "--batch_size", "64", "--lr", "0.1", "--use_bn"]
        );
        assert_eq!(argvs.len(), 4);
    }

    #[test]
    fn boolean_false_suppresses_flag() {
        let document = parse("verbose: [true, false]\n").unwrap();
        let tuples = expand(&document);
        let argvs: Vec<Vec<String>> = tuples.iter().map(|t| materialize(&[], t)).collect();
        assert_eq!(argvs[0], vec!["--verbose"]);
        assert!(argvs[1].is_empty());
    }

    #[test]
    fn compound_key_materializes_both_names() {
        let document = parse("\"[a,b]\":\n  - [a1, b1]\n  - [a2, b2]\n").unwrap();
        let tuples = expand(&document);
        let argvs: Vec<Vec<String>> = tuples.iter().map(|t| materialize(&[], t)).collect();
        assert_eq!(argvs[0], vec!["--a", "a1", "--b", "b1"]);
        assert_eq!(argvs[1], vec!["--a", "a2", "--b", "b2"]);
    }

    #[test]
    fn prefix_args_are_prepended() {
        let document = parse("x: 1\n").unwrap();
        let tuples = expand(&document);
        let argv = materialize(&["--base".to_string()], &tuples[0]);
        assert_eq!(argv, vec!["--base", "--x", "1"]);
    }
}
