//! Route path patterns: segments, validation, and request-path normalization.

use std::fmt::{Display, Formatter};

/// One element of a route's path pattern.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Segment {
  /// A literal segment, e.g. `users` in `/users/:id`.
  Static(String),
  /// A single-path-element parameter, e.g. `:id`.
  Single(String),
  /// A catch-all parameter consuming the remainder of the path, e.g. `*path`.
  /// Only valid as the last segment.
  CatchAll(String),
}

impl Segment {
  /// The parameter name for `Single`/`CatchAll`, `None` for `Static`.
  pub fn param_name(&self) -> Option<&str> {
    match self {
      Segment::Static(_) => None,
      Segment::Single(name) | Segment::CatchAll(name) => Some(name.as_str()),
    }
  }
}

impl Display for Segment {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Segment::Static(v) => f.write_str(v),
      Segment::Single(name) => write!(f, ":{name}"),
      Segment::CatchAll(name) => write!(f, "*{name}"),
    }
  }
}

/// Error produced while parsing or validating a route pattern string. These
/// are synchronous, build-time errors — they never reach the error-handler
/// chain (only registry collisions and request-time exceptions do).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathPatternError {
  /// The pattern did not start with `/`.
  MissingLeadingSlash,
  /// A segment was empty (e.g. `//`, or a bare `:`/`*`).
  EmptySegment,
  /// A `CatchAll` segment was followed by further segments.
  SegmentsAfterCatchAll,
  /// The same parameter name was used more than once in the pattern.
  DuplicateParameterName(String),
}

impl Display for PathPatternError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      PathPatternError::MissingLeadingSlash => f.write_str("route pattern must start with '/'"),
      PathPatternError::EmptySegment => f.write_str("route pattern contains an empty segment"),
      PathPatternError::SegmentsAfterCatchAll => {
        f.write_str("route pattern has segments after a catch-all")
      }
      PathPatternError::DuplicateParameterName(name) => {
        write!(f, "parameter name '{name}' used more than once")
      }
    }
  }
}

impl std::error::Error for PathPatternError {}

/// Parses a route pattern (`/users/:id/file/*path`) into its segments.
pub fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, PathPatternError> {
  let rest = pattern.strip_prefix('/').ok_or(PathPatternError::MissingLeadingSlash)?;

  let mut segments = Vec::new();
  let mut names = std::collections::HashSet::new();

  if rest.is_empty() {
    return Ok(segments);
  }

  for part in rest.split('/') {
    if !segments.is_empty() {
      if let Some(Segment::CatchAll(_)) = segments.last() {
        return Err(PathPatternError::SegmentsAfterCatchAll);
      }
    }

    if part.is_empty() {
      return Err(PathPatternError::EmptySegment);
    }

    let segment = if let Some(name) = part.strip_prefix(':') {
      if name.is_empty() {
        return Err(PathPatternError::EmptySegment);
      }
      Segment::Single(name.to_string())
    } else if let Some(name) = part.strip_prefix('*') {
      if name.is_empty() {
        return Err(PathPatternError::EmptySegment);
      }
      Segment::CatchAll(name.to_string())
    } else {
      Segment::Static(part.to_string())
    };

    if let Some(name) = segment.param_name() {
      if !names.insert(name.to_string()) {
        return Err(PathPatternError::DuplicateParameterName(name.to_string()));
      }
    }

    segments.push(segment);
  }

  Ok(segments)
}

/// Renders segments back into the canonical pattern string form, usable to
/// reconstruct an equivalent route (`Route::builder(route.to_string())...`).
pub fn pattern_to_string(segments: &[Segment]) -> String {
  let mut out = String::from("/");
  for (i, segment) in segments.iter().enumerate() {
    if i > 0 {
      out.push('/');
    }
    out.push_str(&segment.to_string());
  }
  out
}

/// Normalizes a raw request path per the boundary rules: consecutive `/`
/// collapsed, trailing `/` truncated, empty path becomes `/`, dot segments
/// (`.`/`..`) resolved as for URI normalization.
pub fn normalize_path(raw: &str) -> String {
  let mut out: Vec<&str> = Vec::new();
  for part in raw.split('/') {
    match part {
      "" | "." => continue,
      ".." => {
        out.pop();
      }
      other => out.push(other),
    }
  }

  if out.is_empty() {
    return "/".to_string();
  }

  let mut result = String::with_capacity(raw.len());
  for part in out {
    result.push('/');
    result.push_str(part);
  }
  result
}

/// Splits an already-normalized path into its raw (still percent-encoded)
/// segments.
pub fn raw_segments(normalized: &str) -> Vec<&str> {
  normalized.split('/').filter(|s| !s.is_empty()).collect()
}

/// Percent-decodes a single path segment as UTF-8. `+` is *not* remapped to
/// space (that is a form-encoding convention, not a URI one).
pub fn percent_decode_segment(segment: &str) -> Option<String> {
  let mut decoded = Vec::with_capacity(segment.len());
  let mut bytes = segment.bytes();

  while let Some(byte) = bytes.next() {
    if byte == b'%' {
      let hi = bytes.next()?;
      let lo = bytes.next()?;
      let hex = [hi, lo];
      let hex = std::str::from_utf8(&hex).ok()?;
      let value = u8::from_str_radix(hex, 16).ok()?;
      decoded.push(value);
    } else {
      decoded.push(byte);
    }
  }

  String::from_utf8(decoded).ok()
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn parses_static_single_catchall() {
    let segments = parse_pattern("/users/:id/file/*path").unwrap();
    assert_eq!(
      segments,
      vec![
        Segment::Static("users".to_string()),
        Segment::Single("id".to_string()),
        Segment::Static("file".to_string()),
        Segment::CatchAll("path".to_string()),
      ]
    );
  }

  #[test]
  fn root_is_empty_segments() {
    assert_eq!(parse_pattern("/").unwrap(), Vec::new());
  }

  #[test]
  fn requires_leading_slash() {
    assert_eq!(parse_pattern("users"), Err(PathPatternError::MissingLeadingSlash));
  }

  #[test]
  fn rejects_segments_after_catchall() {
    assert_eq!(parse_pattern("/*rest/more"), Err(PathPatternError::SegmentsAfterCatchAll));
  }

  #[test]
  fn rejects_duplicate_param_names() {
    assert_eq!(
      parse_pattern("/a/:x/b/:x"),
      Err(PathPatternError::DuplicateParameterName("x".to_string()))
    );
  }

  #[test]
  fn round_trips_pattern_string() {
    let segments = parse_pattern("/users/:id/file/*path").unwrap();
    assert_eq!(pattern_to_string(&segments), "/users/:id/file/*path");
    let reparsed = parse_pattern(&pattern_to_string(&segments)).unwrap();
    assert_eq!(reparsed, segments);
  }

  #[test]
  fn normalizes_slashes_and_dots() {
    assert_eq!(normalize_path(""), "/");
    assert_eq!(normalize_path("/a//b/"), "/a/b");
    assert_eq!(normalize_path("/a/./b/../c"), "/a/c");
  }

  #[test]
  fn percent_decodes_without_remapping_plus() {
    assert_eq!(percent_decode_segment("b%20c").as_deref(), Some("b c"));
    assert_eq!(percent_decode_segment("a+b").as_deref(), Some("a+b"));
  }
}
