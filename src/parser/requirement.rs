use thiserror::Error;

use crate::cursor::Cursor;
use crate::model::Requirement;
use crate::pep440::{Operator, Specifier};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line holds no requirement")]
    Empty,

    #[error("invalid project name at {0:?}")]
    InvalidName(String),

    #[error("unterminated extras list")]
    UnterminatedExtras,

    #[error("invalid extra {0:?}")]
    InvalidExtra(String),

    #[error("unknown operator at {0:?}")]
    InvalidOperator(String),

    #[error("missing version after '{0}'")]
    MissingVersion(Operator),

    #[error("invalid version {0:?}")]
    InvalidVersion(String),

    #[error("unclosed parenthesis in version list")]
    UnclosedParen,

    #[error("missing URL after '@'")]
    MissingUrl,

    #[error("empty environment marker")]
    EmptyMarker,

    #[error("unexpected trailing input {0:?}")]
    TrailingInput(String),
}

/// Extracts exactly one requirement from a logical requirements line.
///
/// Editable and URL lines (`-e …`, `http(s)://…`) carrying an `#egg=`
/// fragment are reduced to the fragment. Inline ` #` comments are dropped.
/// Anything that is not a single `name [extras] (specifiers | @ url)
/// [; marker]` is an error, including lines naming several packages.
pub fn parse_line(line: &str) -> Result<Requirement, ParseError> {
    let mut line = line;
    let is_reference =
        line.starts_with("-e") || line.starts_with("http://") || line.starts_with("https://");
    if is_reference {
        if let Some((_, egg)) = line.rsplit_once("#egg=") {
            line = egg;
        }
    }
    if let Some(idx) = line.find(" #") {
        line = &line[..idx];
    }

    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Err(ParseError::Empty);
    }

    let mut cursor = Cursor::new(line);
    let name = name(&mut cursor)?;
    cursor.skip_ws();

    let extras = if cursor.eat('[') {
        extras(&mut cursor)?
    } else {
        Vec::new()
    };
    cursor.skip_ws();

    let mut url = None;
    let mut specs = Vec::new();
    if cursor.eat('@') {
        cursor.skip_ws();
        let found = cursor.take_while(|c| !c.is_whitespace());
        if found.is_empty() {
            return Err(ParseError::MissingUrl);
        }
        url = Some(found.to_string());
    } else if cursor.eat('(') {
        specs = specifiers(&mut cursor)?;
        cursor.skip_ws();
        if !cursor.eat(')') {
            return Err(ParseError::UnclosedParen);
        }
    } else {
        specs = specifiers(&mut cursor)?;
    }
    cursor.skip_ws();

    let mut marker = None;
    if cursor.eat(';') {
        let text = cursor.rest().trim();
        if text.is_empty() {
            return Err(ParseError::EmptyMarker);
        }
        marker = Some(text.to_string());
        cursor.finish();
    }

    if !cursor.is_done() {
        return Err(ParseError::TrailingInput(cursor.rest().to_string()));
    }

    let mut requirement = Requirement::new(name, specs).with_extras(extras);
    if let Some(url) = url {
        requirement = requirement.with_url(url);
    }
    if let Some(marker) = marker {
        requirement = requirement.with_marker(marker);
    }
    Ok(requirement)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}

fn is_version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+' | '!' | '*')
}

fn is_operator_start(c: char) -> bool {
    matches!(c, '<' | '>' | '=' | '!' | '~')
}

/// Checks the PEP 508 identifier shape: alphanumeric at both ends.
fn valid_identifier(s: &str) -> bool {
    let alnum = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    alnum(s.chars().next()) && alnum(s.chars().last())
}

fn name<'a>(cursor: &mut Cursor<'a>) -> Result<&'a str, ParseError> {
    let name = cursor.take_while(is_name_char);
    if !valid_identifier(name) {
        return Err(ParseError::InvalidName(cursor.input().to_string()));
    }
    Ok(name)
}

fn extras(cursor: &mut Cursor) -> Result<Vec<String>, ParseError> {
    let rest = cursor.rest();
    let close = rest.find(']').ok_or(ParseError::UnterminatedExtras)?;
    let list = &rest[..close];
    cursor.skip_to(&rest[close + 1..]);

    let mut extras = Vec::new();
    for extra in list.split(',').map(str::trim) {
        if extra.is_empty() && extras.is_empty() && list.trim().is_empty() {
            break;
        }
        if !valid_identifier(extra) || !extra.chars().all(is_name_char) {
            return Err(ParseError::InvalidExtra(extra.to_string()));
        }
        extras.push(extra.to_ascii_lowercase());
    }
    Ok(extras)
}

/// Reads a comma-separated specifier list. Every version must be valid for
/// its operator: PEP 440 syntax, `.*` only on `==`/`!=`, at least two
/// release segments for `~=`, no local label on ordered comparisons.
fn specifiers(cursor: &mut Cursor) -> Result<Vec<Specifier>, ParseError> {
    let mut specs = Vec::new();
    cursor.skip_ws();
    if !cursor.peek().is_some_and(is_operator_start) {
        return Ok(specs);
    }

    loop {
        cursor.skip_ws();
        let (operator, rest) = Operator::strip_prefix(cursor.rest())
            .ok_or_else(|| ParseError::InvalidOperator(cursor.rest().to_string()))?;
        cursor.skip_to(rest);
        cursor.skip_ws();

        let version = cursor.take_while(|c| !c.is_whitespace() && !matches!(c, ',' | ';' | ')'));
        if version.is_empty() {
            return Err(ParseError::MissingVersion(operator));
        }
        let spec = Specifier::new(operator, version);
        if !version.chars().all(is_version_char) || spec.validate().is_err() {
            return Err(ParseError::InvalidVersion(version.to_string()));
        }
        specs.push(spec);

        cursor.skip_ws();
        if !cursor.eat(',') {
            return Ok(specs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(pairs: &[(Operator, &str)]) -> Vec<Specifier> {
        pairs
            .iter()
            .map(|(op, v)| Specifier::new(*op, *v))
            .collect()
    }

    #[test]
    fn test_single_constraint() {
        let req = parse_line("django>=1.2").unwrap();
        assert_eq!(req.name, "django");
        assert_eq!(req.specs, specs(&[(Operator::GreaterThanEqual, "1.2")]));
    }

    #[test]
    fn test_unpinned() {
        let req = parse_line("requests").unwrap();
        assert_eq!(req.name, "requests");
        assert!(req.specs.is_empty());
    }

    #[test]
    fn test_name_is_normalized() {
        assert_eq!(parse_line("Flask_SQLAlchemy==2.1").unwrap().name, "flask-sqlalchemy");
    }

    #[test]
    fn test_multiple_constraints_keep_order() {
        let req = parse_line("celery >= 3.1, < 4.0 , !=3.1.2").unwrap();
        assert_eq!(
            req.specs,
            specs(&[
                (Operator::GreaterThanEqual, "3.1"),
                (Operator::LessThan, "4.0"),
                (Operator::NotEqual, "3.1.2"),
            ])
        );
        assert_eq!(req.spec_key(), ">=3.1,<4.0,!=3.1.2");
    }

    #[test]
    fn test_parenthesized_constraints() {
        let req = parse_line("six (>=1.9,<2)").unwrap();
        assert_eq!(req.spec_key(), ">=1.9,<2");
    }

    #[test]
    fn test_extras_and_marker() {
        let req = parse_line("requests[Security, socks]==2.18.4; python_version < '3.7'").unwrap();
        assert_eq!(req.extras, vec!["security", "socks"]);
        assert_eq!(req.spec_key(), "==2.18.4");
        assert_eq!(req.marker.as_deref(), Some("python_version < '3.7'"));
    }

    #[test]
    fn test_url_requirement() {
        let req = parse_line("pip @ https://github.com/pypa/pip/archive/1.3.1.zip").unwrap();
        assert_eq!(req.name, "pip");
        assert!(req.specs.is_empty());
        assert_eq!(
            req.url.as_deref(),
            Some("https://github.com/pypa/pip/archive/1.3.1.zip")
        );
    }

    #[test]
    fn test_egg_fragment() {
        let req = parse_line("-e git+https://github.com/org/repo.git#egg=MyPackage").unwrap();
        assert_eq!(req.name, "mypackage");
        let req = parse_line("https://example.com/pkg.tar.gz#egg=pkg").unwrap();
        assert_eq!(req.name, "pkg");
    }

    #[test]
    fn test_editable_without_egg_fails() {
        assert!(parse_line("-e .").is_err());
        assert!(parse_line("-e git+https://github.com/org/repo.git").is_err());
    }

    #[test]
    fn test_inline_comment() {
        let req = parse_line("django==1.11 # LTS").unwrap();
        assert_eq!(req.spec_key(), "==1.11");
    }

    #[test]
    fn test_wildcard_and_arbitrary_equality() {
        assert_eq!(parse_line("django==1.11.*").unwrap().spec_key(), "==1.11.*");
        assert_eq!(parse_line("foo===1.0-custom").unwrap().spec_key(), "===1.0-custom");
        assert!(matches!(
            parse_line("django>=1.*"),
            Err(ParseError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_comment_line_is_empty() {
        assert_eq!(parse_line("# comment"), Err(ParseError::Empty));
        assert_eq!(parse_line("   "), Err(ParseError::Empty));
    }

    #[test]
    fn test_multiple_requirements_rejected() {
        assert!(matches!(
            parse_line("flask django"),
            Err(ParseError::TrailingInput(_))
        ));
        assert!(matches!(
            parse_line("flask==1.0 django==1.2"),
            Err(ParseError::TrailingInput(_))
        ));
    }

    #[test]
    fn test_hash_options_rejected() {
        assert!(parse_line("requests==2.0 --hash=sha256:abcd").is_err());
    }

    #[test]
    fn test_invalid_versions_rejected() {
        for line in ["foo==banana", "bar~=1", "baz>=1.0.x", "qux<1.*", "quux>=1.0+local"] {
            assert!(
                matches!(parse_line(line), Err(ParseError::InvalidVersion(_))),
                "{} should be rejected",
                line
            );
        }
        assert_eq!(parse_line("bar~=1.4").unwrap().spec_key(), "~=1.4");
        assert_eq!(parse_line("foo==1.0+local").unwrap().spec_key(), "==1.0+local");
    }

    #[test]
    fn test_malformed_lines() {
        assert!(matches!(parse_line("-foo"), Err(ParseError::InvalidName(_))));
        assert!(matches!(parse_line("foo-"), Err(ParseError::InvalidName(_))));
        assert!(matches!(parse_line("foo=1.0"), Err(ParseError::InvalidOperator(_))));
        assert!(matches!(
            parse_line("foo=="),
            Err(ParseError::MissingVersion(Operator::Equal))
        ));
        assert!(matches!(parse_line("foo[bar"), Err(ParseError::UnterminatedExtras)));
        assert!(matches!(parse_line("foo (>=1.0"), Err(ParseError::UnclosedParen)));
        assert!(matches!(parse_line("foo @ "), Err(ParseError::MissingUrl)));
        assert!(matches!(parse_line("foo==1.0;"), Err(ParseError::EmptyMarker)));
        assert!(matches!(parse_line("foo>=1.0,"), Err(ParseError::InvalidOperator(_))));
    }
}
