//! Path template parsing and normalization.
//!
//! # Syntax
//! - `users`: literal segment
//! - `{id}` / `:id`: single-segment placeholder
//! - `*`: unnamed single-segment placeholder (`_0`, `_1`, ...)
//! - `**`, `**:rest`, `*rest`: trailing wildcard capturing the remainder
//!
//! # Design Decisions
//! - Malformed templates are rejected when parsed, never at match time
//! - Literal segments are case folded unless the matcher is case-sensitive;
//!   parameter names keep their spelling

use std::collections::HashSet;

use thiserror::Error;

use super::table::MatcherOptions;
use super::Params;

/// Trie key shared by every placeholder child of a node.
pub(crate) const PLACEHOLDER_KEY: &str = ":";
/// Trie key shared by every wildcard child of a node.
pub(crate) const WILDCARD_KEY: &str = "**";

/// Errors raised for malformed path templates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template {template:?} contains more than one wildcard")]
    MultipleWildcards { template: String },

    #[error("wildcard must be the last segment in {template:?}")]
    WildcardNotLast { template: String },

    #[error("malformed segment {segment:?} in {template:?}")]
    MalformedSegment { template: String, segment: String },

    #[error("parameter {name:?} appears twice in {template:?}")]
    DuplicateParam { template: String, name: String },
}

/// One parsed segment of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Static(String),
    Placeholder(String),
    Wildcard(String),
}

impl Segment {
    /// Key of this segment inside a trie node's children map.
    pub(crate) fn key(&self) -> &str {
        match self {
            Segment::Static(s) => s,
            Segment::Placeholder(_) => PLACEHOLDER_KEY,
            Segment::Wildcard(_) => WILDCARD_KEY,
        }
    }

    pub fn param_name(&self) -> Option<&str> {
        match self {
            Segment::Static(_) => None,
            Segment::Placeholder(name) | Segment::Wildcard(name) => Some(name),
        }
    }
}

/// A parsed, normalized route path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    normalized: String,
    segments: Vec<Segment>,
    case_sensitive: bool,
}

impl PathTemplate {
    pub fn parse(path: &str, options: &MatcherOptions) -> Result<Self, TemplateError> {
        let trimmed = trim_path(path, options);
        let mut segments = Vec::new();
        let mut rendered = Vec::new();
        let mut seen = HashSet::new();
        let mut unnamed = 0usize;
        let mut wildcards = 0usize;

        let raw: Vec<&str> = split_segments(&trimmed).collect();
        for (i, part) in raw.iter().enumerate() {
            let segment = classify(part, &trimmed, &mut unnamed)?;
            match &segment {
                Segment::Static(lit) => {
                    rendered.push(fold_case(lit, options));
                    segments.push(Segment::Static(fold_case(lit, options)));
                    continue;
                }
                Segment::Wildcard(_) => {
                    wildcards += 1;
                    if wildcards > 1 {
                        return Err(TemplateError::MultipleWildcards { template: path.to_string() });
                    }
                }
                Segment::Placeholder(_) => {}
            }
            if let Some(name) = segment.param_name() {
                if !seen.insert(name.to_string()) {
                    return Err(TemplateError::DuplicateParam {
                        template: path.to_string(),
                        name: name.to_string(),
                    });
                }
            }
            rendered.push(part.to_string());
            segments.push(segment);
            // Checked after counting so `/a/**/b/**` reports the duplicate wildcard.
            if matches!(segments.last(), Some(Segment::Wildcard(_))) && i + 1 < raw.len() {
                let rest_has_wildcard = raw[i + 1..].iter().any(|s| s.starts_with('*') && *s != "*");
                if rest_has_wildcard {
                    return Err(TemplateError::MultipleWildcards { template: path.to_string() });
                }
                return Err(TemplateError::WildcardNotLast { template: path.to_string() });
            }
        }

        Ok(Self {
            normalized: format!("/{}", rendered.join("/")),
            segments,
            case_sensitive: options.case_sensitive,
        })
    }

    /// Normalized template text, e.g. `/users/{id}`.
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder and wildcard names in declaration order.
    pub fn param_names(&self) -> Vec<String> {
        self.segments
            .iter()
            .filter_map(|s| s.param_name().map(str::to_string))
            .collect()
    }

    /// True when the template has no placeholder or wildcard segments.
    pub fn is_static(&self) -> bool {
        self.segments.iter().all(|s| matches!(s, Segment::Static(_)))
    }

    /// Match a concrete path against this template without a trie.
    ///
    /// Used by the linear fallback engine. Captured values keep the
    /// request's original spelling.
    pub fn capture(&self, path: &str, options: &MatcherOptions) -> Option<Params> {
        let trimmed = trim_path(path, options);
        let parts: Vec<&str> = split_segments(&trimmed).collect();
        let mut params = Params::new();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Static(lit) => {
                    let part = parts.get(i)?;
                    let equal = if self.case_sensitive {
                        part == lit
                    } else {
                        part.eq_ignore_ascii_case(lit)
                    };
                    if !equal {
                        return None;
                    }
                }
                Segment::Placeholder(name) => {
                    let part = parts.get(i)?;
                    params.insert(name.clone(), (*part).to_string());
                }
                Segment::Wildcard(name) => {
                    let rest = parts.get(i..).map(|r| r.join("/")).unwrap_or_default();
                    params.insert(name.clone(), rest);
                    return Some(params);
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }
}

fn classify(part: &str, template: &str, unnamed: &mut usize) -> Result<Segment, TemplateError> {
    let malformed = || TemplateError::MalformedSegment {
        template: template.to_string(),
        segment: part.to_string(),
    };
    let mut auto_name = || {
        let name = format!("_{}", *unnamed);
        *unnamed += 1;
        name
    };

    if let Some(rest) = part.strip_prefix("**") {
        return match rest {
            "" => Ok(Segment::Wildcard(auto_name())),
            _ => match rest.strip_prefix(':') {
                Some(name) if is_param_name(name) => Ok(Segment::Wildcard(name.to_string())),
                _ => Err(malformed()),
            },
        };
    }
    if part == "*" {
        return Ok(Segment::Placeholder(auto_name()));
    }
    if let Some(name) = part.strip_prefix('*') {
        return if is_param_name(name) {
            Ok(Segment::Wildcard(name.to_string()))
        } else {
            Err(malformed())
        };
    }
    if let Some(name) = part.strip_prefix(':') {
        return if is_param_name(name) {
            Ok(Segment::Placeholder(name.to_string()))
        } else {
            Err(malformed())
        };
    }
    if part.starts_with('{') || part.ends_with('}') {
        return match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
            Some(name) if is_param_name(name) => Ok(Segment::Placeholder(name.to_string())),
            _ => Err(malformed()),
        };
    }
    if part.contains('{') || part.contains('}') {
        return Err(malformed());
    }
    Ok(Segment::Static(part.to_string()))
}

fn is_param_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// Ensure a leading slash and drop the trailing one unless strict mode is on.
/// Case is preserved.
pub(crate) fn trim_path(path: &str, options: &MatcherOptions) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let mut out = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    if !options.strict_trailing_slash {
        while out.len() > 1 && out.ends_with('/') {
            out.pop();
        }
    }
    out
}

pub(crate) fn fold_case(path: &str, options: &MatcherOptions) -> String {
    if options.case_sensitive {
        path.to_string()
    } else {
        path.to_lowercase()
    }
}

/// Segments after the leading slash; the root path yields none.
pub(crate) fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    let body = path.strip_prefix('/').unwrap_or(path);
    body.split('/').filter(move |_| !body.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> MatcherOptions {
        MatcherOptions::default()
    }

    #[test]
    fn test_parse_mixed_segments() {
        let t = PathTemplate::parse("/Users/{id}/files/**:rest", &opts()).unwrap();
        assert_eq!(t.as_str(), "/users/{id}/files/**:rest");
        assert_eq!(t.param_names(), vec!["id", "rest"]);
        assert!(!t.is_static());
        assert_eq!(t.segments()[0], Segment::Static("users".into()));
    }

    #[test]
    fn test_unnamed_segments_get_generated_names() {
        let t = PathTemplate::parse("/a/*/b/**", &opts()).unwrap();
        assert_eq!(t.param_names(), vec!["_0", "_1"]);
    }

    #[test]
    fn test_colon_and_star_names() {
        let t = PathTemplate::parse("/a/:id/*rest", &opts()).unwrap();
        assert_eq!(
            t.segments()[1..],
            [Segment::Placeholder("id".into()), Segment::Wildcard("rest".into())]
        );
    }

    #[test]
    fn test_rejects_two_wildcards() {
        let err = PathTemplate::parse("/a/**/b/**", &opts()).unwrap_err();
        assert!(matches!(err, TemplateError::MultipleWildcards { .. }));
    }

    #[test]
    fn test_rejects_wildcard_in_middle() {
        let err = PathTemplate::parse("/a/**/b", &opts()).unwrap_err();
        assert!(matches!(err, TemplateError::WildcardNotLast { .. }));
    }

    #[test]
    fn test_rejects_malformed_placeholders() {
        for bad in ["/a/{id", "/a/{}", "/a/:", "/a/file.{ext}", "/a/**x"] {
            assert!(PathTemplate::parse(bad, &opts()).is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn test_rejects_duplicate_param() {
        let err = PathTemplate::parse("/a/{id}/b/:id", &opts()).unwrap_err();
        assert!(matches!(err, TemplateError::DuplicateParam { .. }));
    }

    #[test]
    fn test_trailing_slash_handling() {
        assert_eq!(trim_path("/a/b/", &opts()), "/a/b");
        assert_eq!(trim_path("/", &opts()), "/");
        assert_eq!(trim_path("a?x=1", &opts()), "/a");

        let strict = MatcherOptions {
            strict_trailing_slash: true,
            ..opts()
        };
        assert_eq!(trim_path("/a/b/", &strict), "/a/b/");
    }

    #[test]
    fn test_capture_linear() {
        let t = PathTemplate::parse("/search/{name}/**", &opts()).unwrap();
        let params = t.capture("/Search/ABC/x/y", &opts()).unwrap();
        assert_eq!(params.get("name").unwrap(), "ABC");
        assert_eq!(params.get("_0").unwrap(), "x/y");

        assert!(t.capture("/other/abc", &opts()).is_none());
    }

    #[test]
    fn test_capture_requires_exact_length() {
        let t = PathTemplate::parse("/a/{x}", &opts()).unwrap();
        assert!(t.capture("/a", &opts()).is_none());
        assert!(t.capture("/a/1/2", &opts()).is_none());
        assert!(t.capture("/a/1", &opts()).is_some());
    }
}
