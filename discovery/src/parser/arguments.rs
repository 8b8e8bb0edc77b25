//! Positional argument extraction.
//!
//! A small tokenizer over description and usage text. `<name>` is a required
//! argument, `[<name>]` and `[name]` are optional ones. Nothing beyond
//! required/optional is inferred.

use std::collections::HashSet;

use shell_catalog_core::ArgumentSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Angle(&'a str),
    Bracket(&'a str),
    Open,
    Close,
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = text;

    while let Some(pos) = rest.find(['<', '[', ']']) {
        let tail = &rest[pos..];
        match tail.as_bytes()[0] {
            b'<' => match tail[1..].find('>') {
                Some(end) => {
                    tokens.push(Token::Angle(&tail[1..1 + end]));
                    rest = &tail[end + 2..];
                    continue;
                }
                None => break,
            },
            b'[' => {
                // `[name]` with no nested markup is a bare optional token.
                if let Some(end) = tail[1..].find(']') {
                    let inner = &tail[1..1 + end];
                    if !inner.contains(['<', '[']) {
                        tokens.push(Token::Bracket(inner));
                        rest = &tail[end + 2..];
                        continue;
                    }
                }
                tokens.push(Token::Open);
            }
            _ => tokens.push(Token::Close),
        }
        rest = &tail[1..];
    }

    tokens
}

fn clean_name(raw: &str) -> Option<&str> {
    let name = raw.trim().trim_end_matches("...").trim();
    let valid = !name.is_empty()
        && !name.starts_with('-')
        && !name.contains(char::is_whitespace)
        && name
            .chars()
            .all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.'));
    valid.then_some(name)
}

/// Extracts positional arguments from help text, in first-seen order.
///
/// # Examples
///
/// ```
/// use shell_catalog_discovery::parser::extract_arguments;
///
/// let args = extract_arguments("devmem <address> [<width>]");
/// assert_eq!(args.len(), 2);
/// assert_eq!((args[0].name.as_str(), args[0].required), ("address", true));
/// assert_eq!((args[1].name.as_str(), args[1].required), ("width", false));
/// ```
pub fn extract_arguments(text: &str) -> Vec<ArgumentSpec> {
    let mut args = Vec::new();
    let mut seen = HashSet::new();
    let mut depth = 0usize;

    for token in tokenize(text) {
        let (raw, required) = match token {
            Token::Open => {
                depth += 1;
                continue;
            }
            Token::Close => {
                depth = depth.saturating_sub(1);
                continue;
            }
            Token::Angle(raw) => (raw, depth == 0),
            Token::Bracket(raw) => (raw, false),
        };

        let Some(name) = clean_name(raw) else {
            continue;
        };
        if seen.insert(name.to_string()) {
            args.push(if required {
                ArgumentSpec::required(name)
            } else {
                ArgumentSpec::optional(name)
            });
        }
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(text: &str) -> Vec<(String, bool)> {
        extract_arguments(text)
            .into_iter()
            .map(|a| (a.name, a.required))
            .collect()
    }

    #[test]
    fn test_required_then_optional() {
        assert_eq!(
            summary("devmem <address> [<width>]"),
            vec![("address".into(), true), ("width".into(), false)]
        );
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let text = "devmem <address> [<width>]\ndevmem <address> <width> <value>";
        assert_eq!(
            summary(text),
            vec![
                ("address".into(), true),
                ("width".into(), false),
                ("value".into(), true),
            ]
        );
    }

    #[test]
    fn test_bare_bracket_is_optional() {
        assert_eq!(
            summary("kernel sleep [ms]"),
            vec![("ms".into(), false)]
        );
    }

    #[test]
    fn test_nested_optional_group() {
        assert_eq!(
            summary("i2c read <device> <addr> [<reg> [<bytes>]]"),
            vec![
                ("device".into(), true),
                ("addr".into(), true),
                ("reg".into(), false),
                ("bytes".into(), false),
            ]
        );
    }

    #[test]
    fn test_skips_flags_and_prose() {
        assert_eq!(
            summary("You can try to call commands with <-h> or <--help> parameter"),
            Vec::<(String, bool)>::new()
        );
        assert_eq!(
            summary("'log enable <level> <module_0> ...  <module_n>' enables logs"),
            vec![
                ("level".into(), true),
                ("module_0".into(), true),
                ("module_n".into(), true),
            ]
        );
        assert_eq!(summary("[a key from: bf]"), Vec::<(String, bool)>::new());
        assert_eq!(summary("unterminated <addr"), Vec::<(String, bool)>::new());
    }

    #[test]
    fn test_every_argument_is_string_typed() {
        let args = extract_arguments("<a> [b]");
        assert!(args.iter().all(|a| a.value_type == shell_catalog_core::ArgumentType::String));
    }
}
