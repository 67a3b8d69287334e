//! Path patterns used to route inbound requests to services
//!
//! A pattern is a `/`-separated list of segments. A literal segment matches
//! the same text (ASCII case-insensitive), `*` matches exactly one non-empty
//! segment, and a trailing `*` matches the rest of the path.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("route pattern '{0}' must start with '/'")]
    MissingLeadingSlash(String),

    #[error("route pattern '{0}' contains an empty segment")]
    EmptySegment(String),

    #[error("route pattern '{0}' mixes '*' with literal text inside a segment")]
    PartialWildcard(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Any,
    Rest,
}

/// A parsed route pattern such as `/api/*/shop/*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

/// Result of matching a path against a [`RoutePattern`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteMatch {
    prefix_len: usize,
}

impl RouteMatch {
    /// Byte length of the path prefix covered by the pattern's fixed part
    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    /// Remove the matched prefix, keeping everything after it
    ///
    /// A fully consumed path becomes `/`.
    pub fn strip<'a>(&self, path: &'a str) -> &'a str {
        match path.get(self.prefix_len..) {
            Some(rest) if !rest.is_empty() => rest,
            _ => "/",
        }
    }
}

impl RoutePattern {
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let body = raw
            .strip_prefix('/')
            .ok_or_else(|| PatternError::MissingLeadingSlash(raw.to_string()))?;

        let parts: Vec<&str> = body.split('/').collect();
        let last = parts.len() - 1;
        let mut segments = Vec::with_capacity(parts.len());

        for (index, part) in parts.into_iter().enumerate() {
            let segment = match part {
                "" => return Err(PatternError::EmptySegment(raw.to_string())),
                "*" if index == last => Segment::Rest,
                "*" => Segment::Any,
                literal if literal.contains('*') => {
                    return Err(PatternError::PartialWildcard(raw.to_string()))
                }
                literal => Segment::Literal(literal.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a concrete request path (no query string)
    pub fn matches(&self, path: &str) -> Option<RouteMatch> {
        let body = path.strip_prefix('/')?;

        // (start offset, text) for each path segment
        let mut offset = 1;
        let path_segments: Vec<(usize, &str)> = body
            .split('/')
            .map(|segment| {
                let start = offset;
                offset += segment.len() + 1;
                (start, segment)
            })
            .collect();

        for (index, segment) in self.segments.iter().enumerate() {
            let (start, text) = *path_segments.get(index)?;
            match segment {
                Segment::Literal(literal) if literal.eq_ignore_ascii_case(text) => {}
                Segment::Literal(_) => return None,
                Segment::Any if !text.is_empty() => {}
                Segment::Any => return None,
                Segment::Rest => {
                    return Some(RouteMatch {
                        prefix_len: start - 1,
                    })
                }
            }
        }

        (path_segments.len() == self.segments.len()).then_some(RouteMatch {
            prefix_len: path.len(),
        })
    }

    /// Whether some concrete path is matched by both patterns
    pub fn overlaps(&self, other: &RoutePattern) -> bool {
        segments_overlap(&self.segments, &other.segments)
    }
}

fn segments_overlap(left: &[Segment], right: &[Segment]) -> bool {
    match (left.split_first(), right.split_first()) {
        (None, None) => true,
        (Some((Segment::Rest, _)), Some(_)) | (Some(_), Some((Segment::Rest, _))) => true,
        (None, Some(_)) | (Some(_), None) => false,
        (Some((a, left_rest)), Some((b, right_rest))) => {
            let compatible = match (a, b) {
                (Segment::Literal(a), Segment::Literal(b)) => a.eq_ignore_ascii_case(b),
                _ => true,
            };
            compatible && segments_overlap(left_rest, right_rest)
        }
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for RoutePattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
