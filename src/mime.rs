//! Media types: parsing, specificity and compatibility scoring for proactive
//! content negotiation (`Content-Type` / `Accept`).

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// `QValue` is a fixed point number with up to 3 digits after the comma,
/// ranging from 0 to 1. Represented as a `u16` from 0 to 1000.
#[derive(Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Debug, Hash)]
#[repr(transparent)]
pub struct QValue(u16);

impl QValue {
  /// q=1.0
  pub const MAX: QValue = QValue(1000);
  /// q=0.0
  pub const MIN: QValue = QValue(0);

  /// Parses a QValue in http header representation (without the `q=` prefix).
  pub fn parse(qvalue: impl AsRef<str>) -> Option<QValue> {
    let qvalue = qvalue.as_ref();
    match qvalue.len() {
      1 => match qvalue {
        "1" => Some(QValue(1000)),
        "0" => Some(QValue(0)),
        _ => None,
      },
      3 => {
        if !qvalue.starts_with("0.") {
          return (qvalue == "1.0").then_some(QValue(1000));
        }
        qvalue.get(2..)?.parse::<u16>().ok().map(|v| QValue(v * 100))
      }
      4 => {
        if !qvalue.starts_with("0.") {
          return (qvalue == "1.00").then_some(QValue(1000));
        }
        qvalue.get(2..)?.parse::<u16>().ok().map(|v| QValue(v * 10))
      }
      5 => {
        if !qvalue.starts_with("0.") {
          return (qvalue == "1.000").then_some(QValue(1000));
        }
        qvalue.get(2..)?.parse::<u16>().ok().map(QValue)
      }
      _ => None,
    }
  }

  /// Returns this QValue as a `u16` in `0..=1000`; 1000 corresponds to 1.0.
  pub const fn as_u16(&self) -> u16 {
    self.0
  }

  /// Builds a QValue from a raw `u16`, clamping values above 1000 to 1000.
  pub const fn from_clamped(qvalue: u16) -> QValue {
    if qvalue > 1000 {
      return QValue(1000);
    }
    QValue(qvalue)
  }

  /// True if this is `q=0`, which eliminates an otherwise-compatible handler.
  pub const fn is_zero(&self) -> bool {
    self.0 == 0
  }
}

impl Default for QValue {
  fn default() -> Self {
    QValue(1000)
  }
}

impl Display for QValue {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    if self.0 == 0 {
      return f.write_str("0.0");
    }
    if self.0 == 1000 {
      return f.write_str("1.0");
    }

    let mut digits = format!("{:03}", self.0);
    while digits.ends_with('0') {
      digits.pop();
    }
    write!(f, "0.{digits}")
  }
}

/// Degree to which two media types match.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Compatibility {
  /// Neither type, subtype nor wildcards line up.
  Nope,
  /// A wildcard on one side makes the match partial.
  Partial,
  /// Type and subtype (and any handler-declared parameters) match exactly.
  Exact,
}

fn is_token(value: &str) -> bool {
  !value.is_empty() && value.bytes().all(|b| !b.is_ascii_whitespace() && b != b'/' && b != b';')
}

/// A concrete or wildcard media type: `type/subtype ; parameters`, with an
/// optional quality weight used on the request (`Accept`) side.
///
/// Two sentinel values exist conceptually at the boundary of this type and
/// are represented by [`Consumes`] rather than by `MediaType` itself, since
/// they only ever appear on a handler's `consumes` side: **NOTHING** (the
/// request carries no `Content-Type`) and **NOTHING_AND_ALL** (the handler
/// accepts with or without one). **ALL** is the literal `*/*` and *is* a
/// regular `MediaType` value ([`MediaType::ALL`]).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MediaType {
  type_: String,
  subtype: String,
  parameters: Vec<(String, String)>,
  quality: QValue,
}

impl MediaType {
  /// Builds a media type from already-validated parts. `type_`/`subtype`
  /// must be lowercase ASCII tokens or `"*"`; parameter names are lowercased.
  pub fn new(
    type_: impl Into<String>,
    subtype: impl Into<String>,
    parameters: Vec<(String, String)>,
    quality: QValue,
  ) -> Option<Self> {
    let type_ = type_.into();
    let subtype = subtype.into();
    if !is_token(&type_) || !is_token(&subtype) {
      return None;
    }
    if type_ == "*" && subtype != "*" {
      return None;
    }
    let parameters =
      parameters.into_iter().map(|(k, v)| (k.to_ascii_lowercase(), v)).collect();
    Some(MediaType { type_, subtype, parameters, quality })
  }

  /// `*/*`
  pub fn all() -> Self {
    MediaType::new("*", "*", Vec::new(), QValue::MAX).expect("*/* is always valid")
  }

  /// Parses `type "/" subtype (";" parameter)*` with optional whitespace
  /// around separators. A `q` parameter, if present and numeric in `[0,1]`,
  /// is stripped from `parameters` and stored as `quality`.
  pub fn parse(value: impl AsRef<str>) -> Option<Self> {
    let value = value.as_ref();
    let mut parts = value.split(';');
    let type_subtype = parts.next()?.trim();
    let (type_, subtype) = type_subtype.split_once('/')?;
    let type_ = type_.trim();
    let subtype = subtype.trim();

    if !is_token(type_) || !is_token(subtype) {
      return None;
    }
    if type_ == "*" && subtype != "*" {
      // `*/foo` is rejected.
      return None;
    }

    let mut parameters = Vec::new();
    let mut quality = QValue::default();
    for param in parts {
      let param = param.trim();
      if param.is_empty() {
        continue;
      }
      let (name, raw_value) = param.split_once('=')?;
      let name = name.trim();
      let raw_value = raw_value.trim();
      if name.eq_ignore_ascii_case("q") {
        quality = QValue::parse(raw_value)?;
        continue;
      }
      parameters.push((name.to_ascii_lowercase(), raw_value.to_string()));
    }

    Some(MediaType { type_: type_.to_string(), subtype: subtype.to_string(), parameters, quality })
  }

  /// The type token (e.g. `"text"`, or `"*"`).
  pub fn type_(&self) -> &str {
    &self.type_
  }

  /// The subtype token (e.g. `"plain"`, or `"*"`).
  pub fn subtype(&self) -> &str {
    &self.subtype
  }

  /// The declared parameters, name lowercased, value as given.
  pub fn parameters(&self) -> &[(String, String)] {
    &self.parameters
  }

  /// The quality weight; meaningful only on the request (`Accept`) side.
  pub fn quality(&self) -> QValue {
    self.quality
  }

  /// Returns the same media type with a different quality weight.
  pub fn with_quality(mut self, quality: QValue) -> Self {
    self.quality = quality;
    self
  }

  fn lookup_param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
  }

  fn param_value_matches(&self, name: &str, mine: &str, theirs: &str) -> bool {
    // charset under text/* is case-insensitive; everything else is case-sensitive.
    if name == "charset" && self.type_ == "text" {
      mine.eq_ignore_ascii_case(theirs)
    } else {
      mine == theirs
    }
  }

  /// Specificity: smaller is more specific. Concrete type+subtype+N
  /// parameters < concrete type+subtype < `type/*` < `*/*`.
  pub fn specificity(&self) -> i64 {
    let mut score: i64 = 0;
    if self.type_ == "*" {
      score += 4;
    }
    if self.subtype == "*" {
      score += 2;
    }
    score -= self.parameters.len() as i64;
    score
  }

  /// Compatibility score between `self` (the handler-declared side) and
  /// `other` (the request-declared side). Parameter semantics apply only
  /// when `self` (the receiver) declares parameters: every one of them must
  /// then match on `other`, or the result is [`Compatibility::Nope`].
  pub fn compatibility(&self, other: &MediaType) -> Compatibility {
    let base = if self.type_ == other.type_ && self.subtype == other.subtype {
      Compatibility::Exact
    } else if self.type_ == "*" || other.type_ == "*" {
      Compatibility::Partial
    } else if self.type_ != other.type_ {
      Compatibility::Nope
    } else if self.subtype == "*" || other.subtype == "*" {
      Compatibility::Partial
    } else {
      Compatibility::Nope
    };

    if matches!(base, Compatibility::Nope) {
      return Compatibility::Nope;
    }

    for (name, mine) in &self.parameters {
      match Self::lookup_param(&other.parameters, name) {
        Some(theirs) if self.param_value_matches(name, mine, theirs) => {}
        _ => return Compatibility::Nope,
      }
    }

    base
  }
}

impl Display for MediaType {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}", self.type_, self.subtype)?;
    for (name, value) in &self.parameters {
      write!(f, ";{name}={value}")?;
    }
    if self.quality.as_u16() != 1000 {
      write!(f, ";q={}", self.quality)?;
    }
    Ok(())
  }
}

/// What a handler declares it is willing to consume. `MediaType` never
/// carries the two sentinel meanings on its own; this wraps it for the
/// `consumes` side of a handler declaration (see spec §3 MediaType).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Consumes {
  /// The handler only matches a request that carries no `Content-Type`.
  Nothing,
  /// The handler matches with or without a `Content-Type`.
  NothingAndAll,
  /// The handler only matches a request whose `Content-Type` is compatible
  /// with this concrete or wildcard media type. Quality must be 1.
  MediaType(MediaType),
}

impl Display for Consumes {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Consumes::Nothing => f.write_str("<nothing>"),
      Consumes::NothingAndAll => f.write_str("<nothing-and-all>"),
      Consumes::MediaType(m) => Display::fmt(m, f),
    }
  }
}

/// Parses an `Accept` header value into a quality-sorted list (highest
/// quality first). Returns `None` on malformed input.
pub fn parse_accept_list(value: impl AsRef<str>) -> Option<Vec<MediaType>> {
  let mut out = Vec::new();
  for entry in value.as_ref().split(',') {
    let entry = entry.trim();
    if entry.is_empty() {
      continue;
    }
    out.push(MediaType::parse(entry)?);
  }
  out.sort_by_key(|m| std::cmp::Reverse(m.quality));
  Some(out)
}

/// Serializes a quality-sorted accept list back into a header value.
pub fn accept_list_to_header_value(list: &[MediaType]) -> String {
  list.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

impl PartialOrd for MediaType {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.specificity().cmp(&other.specificity()))
  }
}
