//! The `name(arg1,arg2,...)` codec used for every stored question and
//! scoring-function encoding. Arguments are CSV-escaped so option labels may
//! contain commas or quotes.

use crate::errors::FormatError;

/// Encodes a function name and arguments into a single flat string,
/// e.g. `("multi", ["a", "b", "c"])` -> `"multi(a,b,c)"`.
pub fn encode_function(name: &str, args: &[String]) -> String {
    if args.is_empty() {
        return format!("{}()", name);
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(args)
        .expect("writing a record to an in-memory buffer cannot fail");
    let bytes = writer
        .into_inner()
        .expect("flushing an in-memory buffer cannot fail");
    let line = String::from_utf8(bytes).expect("csv output of UTF-8 fields is UTF-8");

    format!("{}({})", name, line.trim_end())
}

/// Parses an encoded function string into its name and arguments,
/// e.g. `"multi(a,b,c)"` -> `("multi", ["a", "b", "c"])`.
///
/// The bracketed shorthand `[a,b,c]` is accepted as sugar for `multi(a,b,c)`.
/// Numeric coercion of the returned arguments is left to the caller. This
/// never panics: stored encodings are written by one user and re-parsed for
/// every later viewer, so corrupt input must surface as a typed error.
pub fn parse_function(encoded: &str) -> Result<(String, Vec<String>), FormatError> {
    let desugared;
    let encoded = if encoded.len() >= 2 && encoded.starts_with('[') && encoded.ends_with(']') {
        desugared = format!("multi({})", &encoded[1..encoded.len() - 1]);
        &desugared
    } else {
        encoded
    };

    let opening = encoded
        .find('(')
        .ok_or_else(|| FormatError::MissingOpeningBracket(encoded.to_string()))?;
    let closing = encoded
        .find(')')
        .ok_or_else(|| FormatError::MissingClosingBracket(encoded.to_string()))?;
    if closing != encoded.len() - 1 {
        return Err(FormatError::TrailingText(encoded[closing + 1..].to_string()));
    }

    let name = encoded[..opening].to_string();
    let args = decode_args(&encoded[opening + 1..closing]);
    Ok((name, args))
}

/// Decodes a CSV-escaped argument list. Lenient by design: input that is not
/// well-formed CSV degrades to a single raw argument instead of failing.
fn decode_args(args_str: &str) -> Vec<String> {
    if args_str.is_empty() {
        return Vec::new();
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(args_str.as_bytes());
    match reader.records().next() {
        Some(Ok(record)) => record.iter().map(|field| field.to_string()).collect(),
        _ => vec![args_str.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_parse_plain_args() {
        let encoded = encode_function("multi", &["a".into(), "b".into(), "c".into()]);
        assert_eq!(encoded, "multi(a,b,c)");

        let (name, args) = parse_function(&encoded).unwrap();
        assert_eq!(name, "multi");
        assert_eq!(args, vec!["a", "b", "c"]);
    }

    #[test]
    fn encode_escapes_commas_and_quotes() {
        let args = vec![",".to_string(), "3".to_string()];
        let encoded = encode_function("multi", &args);

        let (name, parsed) = parse_function(&encoded).unwrap();
        assert_eq!(name, "multi");
        assert_eq!(parsed, args);

        // Re-encoding yields the same stored string.
        assert_eq!(encode_function("multi", &parsed), encoded);

        let args = vec!["say \"hi\"".to_string(), "b".to_string()];
        let encoded = encode_function("multi", &args);
        let (_, parsed) = parse_function(&encoded).unwrap();
        assert_eq!(parsed, args);
    }

    #[test]
    fn empty_argument_list_round_trips() {
        let encoded = encode_function("multi", &[]);
        assert_eq!(encoded, "multi()");

        let (name, args) = parse_function(&encoded).unwrap();
        assert_eq!(name, "multi");
        assert!(args.is_empty());
    }

    #[test]
    fn bracket_shorthand_desugars_to_multi() {
        let (name, args) = parse_function("[1,2,3]").unwrap();
        assert_eq!(name, "multi");
        assert_eq!(args, vec!["1", "2", "3"]);

        let (name, args) = parse_function("[]").unwrap();
        assert_eq!(name, "multi");
        assert!(args.is_empty());
    }

    #[test]
    fn missing_opening_bracket() {
        let err = parse_function("apple").unwrap_err();
        assert_eq!(err, FormatError::MissingOpeningBracket("apple".into()));
    }

    #[test]
    fn missing_closing_bracket() {
        let err = parse_function("apple(").unwrap_err();
        assert_eq!(err, FormatError::MissingClosingBracket("apple(".into()));
    }

    #[test]
    fn trailing_text_after_closing_bracket() {
        let err = parse_function("apple(a,b)c").unwrap_err();
        assert_eq!(err, FormatError::TrailingText("c".into()));
    }
}
