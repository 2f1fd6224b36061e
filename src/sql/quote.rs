//! Identifier and literal quoting

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Redshift identifiers are limited to 127 bytes
pub const MAX_IDENT_BYTES: usize = 127;

static SIMPLE_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_$]*$").expect("identifier regex is valid"));

/// Check that a name can be used as an identifier at all
pub fn validate_ident(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_ident(name, "identifier cannot be empty"));
    }
    if name.len() > MAX_IDENT_BYTES {
        return Err(Error::invalid_ident(
            name,
            format!("identifier longer than {MAX_IDENT_BYTES} bytes"),
        ));
    }
    if name.contains('\0') {
        return Err(Error::invalid_ident(name, "identifier contains NUL"));
    }
    Ok(())
}

/// Quote an identifier only when it needs it
///
/// Lowercase names made of letters, digits, `_` and `$` are emitted bare;
/// anything else is wrapped in double quotes with embedded quotes doubled.
pub fn quote_ident(name: &str) -> String {
    if SIMPLE_IDENT.is_match(name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Validate then quote an identifier
pub fn ident(name: &str) -> Result<String> {
    validate_ident(name)?;
    Ok(quote_ident(name))
}

/// Validate and quote a possibly schema-qualified name (`schema.table`)
pub fn qualified(name: &str) -> Result<String> {
    Ok(name
        .split('.')
        .map(ident)
        .collect::<Result<Vec<_>>>()?
        .join("."))
}

/// Quote a string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("swiper", "swiper")]
    #[test_case("test$outgoing", "test$outgoing")]
    #[test_case("_tmp1", "_tmp1")]
    #[test_case("Swiper", "\"Swiper\"")]
    #[test_case("group", "group" ; "keywords are not special cased")]
    #[test_case("has space", "\"has space\"")]
    #[test_case("quo\"te", "\"quo\"\"te\"")]
    #[test_case("1abc", "\"1abc\"")]
    fn test_quote_ident(input: &str, expected: &str) {
        assert_eq!(quote_ident(input), expected);
    }

    #[test]
    fn test_validate_ident() {
        assert!(validate_ident("ok").is_ok());
        assert!(validate_ident("").is_err());
        assert!(validate_ident(&"a".repeat(128)).is_err());
        assert!(validate_ident(&"a".repeat(127)).is_ok());
    }

    #[test]
    fn test_qualified() {
        assert_eq!(qualified("foo_table").unwrap(), "foo_table");
        assert_eq!(qualified("analytics.Events").unwrap(), "analytics.\"Events\"");
        assert!(qualified("analytics.").is_err());
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("swiperpass"), "'swiperpass'");
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal(r"back\slash"), r"'back\\slash'");
    }
}
