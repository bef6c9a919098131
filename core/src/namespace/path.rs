//! Slash-delimited parameter names.
//!
//! Parses graph names like `/point_cloud_filter/x_max` or
//! `/pcl_filters/psx/filter_limit_min` into a canonical segment list, and
//! provides the namespace arithmetic the store backends need: joining a
//! relative key onto a namespace, and stripping a namespace prefix back off.

use std::fmt;

use crate::error::NameError;


/// An absolute parameter name. The root namespace `/` has no segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamPath {
    segments: Vec<String>,
}

impl ParamPath {
    /// The root namespace `/`.
    pub fn root() -> Self {
        ParamPath { segments: Vec::new() }
    }

    /// Parse an absolute name such as `/pcl_filters/psx/filter_limit_max`.
    ///
    /// A single trailing slash is tolerated (`/pcl_filters/` is the same
    /// namespace as `/pcl_filters`). Empty segments are rejected.
    pub fn parse(input: &str) -> Result<Self, NameError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(NameError::new(input, "empty name"));
        }
        let body = trimmed
            .strip_prefix('/')
            .ok_or_else(|| NameError::new(input, "name must start with '/'"))?;
        let body = body.strip_suffix('/').unwrap_or(body);
        if body.is_empty() {
            return Ok(ParamPath::root());
        }
        let segments = parse_segments(input, body)?;
        Ok(ParamPath { segments })
    }

    /// Append a relative name (`psx/filter_limit_max`) to this namespace.
    pub fn join(&self, relative: &str) -> Result<Self, NameError> {
        let body = relative.trim();
        if body.is_empty() {
            return Err(NameError::new(relative, "empty relative name"));
        }
        if body.starts_with('/') {
            return Err(NameError::new(relative, "relative name must not start with '/'"));
        }
        let mut segments = self.segments.clone();
        segments.extend(parse_segments(relative, body)?);
        Ok(ParamPath { segments })
    }

    /// The enclosing namespace, or `None` for the root.
    pub fn parent(&self) -> Option<ParamPath> {
        if self.segments.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(ParamPath { segments })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The final segment, if any.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True if `self` equals `namespace` or lies somewhere beneath it.
    pub fn starts_with(&self, namespace: &ParamPath) -> bool {
        self.segments.starts_with(&namespace.segments)
    }

    /// Segments of `self` below `namespace`, or `None` if `self` is outside it.
    pub fn relative_to(&self, namespace: &ParamPath) -> Option<&[String]> {
        if self.starts_with(namespace) {
            Some(&self.segments[namespace.segments.len()..])
        } else {
            None
        }
    }
}

impl fmt::Display for ParamPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for seg in &self.segments {
            write!(f, "/{}", seg)?;
        }
        Ok(())
    }
}


// ---------------------------------------------------------------------------
// Internal: segment validation
// ---------------------------------------------------------------------------

fn parse_segments(input: &str, body: &str) -> Result<Vec<String>, NameError> {
    let mut segments = Vec::new();
    for part in body.split('/') {
        validate_segment(input, part)?;
        segments.push(part.to_string());
    }
    Ok(segments)
}

fn validate_segment(input: &str, seg: &str) -> Result<(), NameError> {
    let mut chars = seg.chars();
    match chars.next() {
        None => return Err(NameError::new(input, "empty segment")),
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        Some(c) => {
            return Err(NameError::new(
                input,
                format!("segment '{}' starts with invalid character '{}'", seg, c),
            ))
        }
    }
    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(NameError::new(
            input,
            format!("segment '{}' contains invalid character '{}'", seg, bad),
        ));
    }
    Ok(())
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
