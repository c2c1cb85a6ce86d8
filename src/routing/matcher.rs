//! Route matching logic.
//!
//! # Responsibilities
//! - Match the request path against Ant-style globs
//! - Match the request method against a route's method set
//! - Rank matched patterns by specificity
//!
//! # Design Decisions
//! - Path matching is case-sensitive and segment based
//! - `?` and `*` never cross a `/`; `**` spans zero or more whole segments
//! - Empty method set = always matches (wildcard)
//! - No regex; patterns are compiled into segments once at startup

use axum::http::Method;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern must start with `/`")]
    NotAbsolute,

    #[error("`**` must be a whole path segment")]
    PartialDoubleStar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// Segment containing `*` or `?`.
    Glob(String),
    /// `**`
    AnyDepth,
}

impl Segment {
    fn matches(&self, text: &str) -> bool {
        match self {
            Segment::Literal(literal) => literal == text,
            Segment::Glob(glob) => glob_match(glob.as_bytes(), text.as_bytes()),
            Segment::AnyDepth => true,
        }
    }
}

/// How narrowly a pattern describes a path. Greater is more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    literal_segments: usize,
    bounded_segments: usize,
    length: usize,
}

/// A compiled path glob such as `/api/books/**` or `/api/*/reviews`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if !pattern.starts_with('/') {
            return Err(PatternError::NotAbsolute);
        }

        let segments = split_path(pattern)
            .map(|segment| {
                if segment == "**" {
                    Ok(Segment::AnyDepth)
                } else if segment.contains("**") {
                    Err(PatternError::PartialDoubleStar)
                } else if segment.contains(['*', '?']) {
                    Ok(Segment::Glob(segment.to_string()))
                } else {
                    Ok(Segment::Literal(segment.to_string()))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        let path: Vec<&str> = split_path(path).collect();
        match_segments(&self.segments, &path)
    }

    pub fn specificity(&self) -> Specificity {
        Specificity {
            literal_segments: self
                .segments
                .iter()
                .filter(|s| matches!(s, Segment::Literal(_)))
                .count(),
            bounded_segments: self
                .segments
                .iter()
                .filter(|s| !matches!(s, Segment::AnyDepth))
                .count(),
            length: self.raw.len(),
        }
    }
}

/// Accepted request methods for a route.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MethodMatcher {
    #[default]
    Any,
    OneOf(Vec<Method>),
}

impl MethodMatcher {
    pub fn new(methods: Vec<Method>) -> Self {
        if methods.is_empty() {
            MethodMatcher::Any
        } else {
            MethodMatcher::OneOf(methods)
        }
    }

    pub fn matches(&self, method: &Method) -> bool {
        match self {
            MethodMatcher::Any => true,
            MethodMatcher::OneOf(methods) => methods.contains(method),
        }
    }

    /// True when the route names explicit methods.
    pub fn is_qualified(&self) -> bool {
        matches!(self, MethodMatcher::OneOf(_))
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::AnyDepth, rest)) => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((segment, rest)) => match path.split_first() {
            Some((head, tail)) => segment.matches(head) && match_segments(rest, tail),
            None => false,
        },
    }
}

/// Wildcard match within one segment: `*` = any run, `?` = one byte.
fn glob_match(glob: &[u8], text: &[u8]) -> bool {
    let (mut g, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if g < glob.len() && (glob[g] == b'?' || glob[g] == text[t]) {
            g += 1;
            t += 1;
        } else if g < glob.len() && glob[g] == b'*' {
            backtrack = Some((g, t));
            g += 1;
        } else if let Some((star, consumed)) = backtrack {
            g = star + 1;
            t = consumed + 1;
            backtrack = Some((star, consumed + 1));
        } else {
            return false;
        }
    }

    glob[g..].iter().all(|&c| c == b'*')
}
