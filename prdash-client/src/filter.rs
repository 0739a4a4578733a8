//! Section filter text to an expression.

use prdash_dsl::{parse_filter, validate_filter, Expr, FilterResult};

/// Parse a section filter. Blank text means "no filter" and yields `None`.
/// With `validate`, legacy `qualifier:value` syntax is rejected first.
pub fn parse_section_filter(filter: &str, validate: bool) -> FilterResult<Option<Expr>> {
    if validate {
        validate_filter(filter)?;
    }
    if filter.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(parse_filter(filter)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prdash_dsl::FilterError;

    #[test]
    fn test_blank_filter_is_none() {
        assert_eq!(parse_section_filter("   ", true).unwrap(), None);
        assert_eq!(parse_section_filter("", false).unwrap(), None);
    }

    #[test]
    fn test_validation_is_optional() {
        assert!(matches!(
            parse_section_filter("is:open", true),
            Err(FilterError::Validation(_))
        ));
        assert!(matches!(
            parse_section_filter("is:open", false),
            Err(FilterError::Parse(_))
        ));
    }

    #[test]
    fn test_parses_dsl() {
        let expr = parse_section_filter(r#"state = "open""#, true).unwrap().unwrap();
        assert_eq!(expr.to_string(), r#"state = "open""#);
    }
}
