use crate::error::RoutingError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
    Terminator,
}

/// Parse a route template into its segments. Grammar:
/// - starts with `/`; segments are `/`-separated.
/// - a segment is a literal `[A-Za-z0-9_-]+`, a parameter `:name` where
///   `name` matches `[A-Za-z][A-Za-z0-9_]*`, a single-segment wildcard
///   `*`, or a terminator `**` (only as the final segment).
/// - `/` alone (root, zero segments) is allowed.
pub fn parse_template(template: &str) -> Result<Vec<Segment>, RoutingError> {
    if !template.starts_with('/') {
        return Err(RoutingError::InvalidTemplate(template.to_string()));
    }
    if template == "/" {
        return Ok(Vec::new());
    }

    let parts: Vec<&str> = template[1..].split('/').collect();
    let last = parts.len() - 1;
    let mut segments = Vec::with_capacity(parts.len());

    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            return Err(RoutingError::InvalidTemplate(template.to_string()));
        }
        let segment = if *part == "**" {
            if i != last {
                return Err(RoutingError::TerminatorNotFinal(template.to_string()));
            }
            Segment::Terminator
        } else if *part == "*" {
            Segment::Wildcard
        } else if let Some(name) = part.strip_prefix(':') {
            if !is_valid_param_name(name) {
                return Err(RoutingError::InvalidTemplate(template.to_string()));
            }
            Segment::Param(name.to_string())
        } else if is_valid_literal(part) {
            Segment::Literal(part.to_string())
        } else {
            return Err(RoutingError::InvalidTemplate(template.to_string()));
        };
        segments.push(segment);
    }

    Ok(segments)
}

fn is_valid_literal(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn is_valid_param_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_root_as_empty_segments() {
        assert_eq!(parse_template("/").unwrap(), Vec::new());
    }

    #[test]
    fn parses_mixed_segment_kinds() {
        let segments = parse_template("/path/ends/with/:variable").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Literal("path".to_string()),
                Segment::Literal("ends".to_string()),
                Segment::Literal("with".to_string()),
                Segment::Param("variable".to_string()),
            ]
        );
    }

    #[test]
    fn terminator_alone_at_root_is_allowed() {
        assert_eq!(parse_template("/**").unwrap(), vec![Segment::Terminator]);
    }

    #[test]
    fn terminator_in_interior_position_is_rejected() {
        assert!(matches!(
            parse_template("/**/x"),
            Err(RoutingError::TerminatorNotFinal(_))
        ));
    }

    #[test]
    fn missing_leading_slash_is_rejected() {
        assert!(matches!(parse_template("hello"), Err(RoutingError::InvalidTemplate(_))));
    }

    #[test]
    fn invalid_param_name_is_rejected() {
        assert!(matches!(parse_template("/:1abc"), Err(RoutingError::InvalidTemplate(_))));
    }

    #[test]
    fn double_slash_is_rejected() {
        assert!(matches!(parse_template("/a//b"), Err(RoutingError::InvalidTemplate(_))));
    }
}
