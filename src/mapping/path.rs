//! Location strings: parsing `root::a::b[]::c` into path segments.

use crate::error::{CrunchError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Literal first token of every location string
pub const ROOT_MARKER: &str = "root";

/// Default separator between segments
pub const DEFAULT_DELIMITER: &str = "::";

// `name[]` marks a list descent, `name[3]` picks one element
static BRACKET_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>.+?)\[(?P<index>\d*)\]$").unwrap()
});

/// How a segment descends into the structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Plain key lookup in a mapping
    Key,
    /// Key whose value is a sequence; every element becomes its own row
    List,
    /// Key whose value is a sequence; only the given element is kept
    Index(usize),
}

/// One step of a parsed location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub kind: SegmentKind,
}

impl Segment {
    pub fn key(name: impl Into<String>) -> Self {
        Segment { name: name.into(), kind: SegmentKind::Key }
    }

    pub fn list(name: impl Into<String>) -> Self {
        Segment { name: name.into(), kind: SegmentKind::List }
    }

    pub fn index(name: impl Into<String>, index: usize) -> Self {
        Segment { name: name.into(), kind: SegmentKind::Index(index) }
    }

    pub fn is_list(&self) -> bool {
        self.kind == SegmentKind::List
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SegmentKind::Key => write!(f, "{}", self.name),
            SegmentKind::List => write!(f, "{}[]", self.name),
            SegmentKind::Index(i) => write!(f, "{}[{}]", self.name, i),
        }
    }
}

/// A parsed location string. The root marker is consumed during parsing,
/// so `segments` only holds data keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpression {
    location: String,
    delimiter: String,
    segments: Vec<Segment>,
}

impl PathExpression {
    /// Parse a location using the default `::` delimiter
    pub fn parse(location: &str) -> Result<Self> {
        Self::parse_with_delimiter(location, DEFAULT_DELIMITER)
    }

    pub fn parse_with_delimiter(location: &str, delimiter: &str) -> Result<Self> {
        if location.is_empty() {
            return Err(CrunchError::malformed(location, "location is empty"));
        }
        if delimiter.is_empty() {
            return Err(CrunchError::malformed(location, "delimiter is empty"));
        }

        let mut raw = location.split(delimiter);
        if raw.next() != Some(ROOT_MARKER) {
            return Err(CrunchError::malformed(
                location,
                format!("location must start with '{}'", ROOT_MARKER),
            ));
        }

        let mut segments = Vec::new();
        for part in raw {
            segments.push(parse_segment(location, part)?);
        }

        if segments.is_empty() {
            return Err(CrunchError::malformed(location, "no segments after root"));
        }

        let lists = segments.iter().filter(|s| s.is_list()).count();
        if lists > 1 {
            return Err(CrunchError::unsupported(
                location,
                format!("only one list segment is supported, found {}", lists),
            ));
        }

        Ok(PathExpression {
            location: location.to_string(),
            delimiter: delimiter.to_string(),
            segments,
        })
    }

    /// The location string this expression was parsed from
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Position of the list segment, if the path expands a list
    pub fn list_position(&self) -> Option<usize> {
        self.segments.iter().position(Segment::is_list)
    }

    pub fn has_list(&self) -> bool {
        self.list_position().is_some()
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", ROOT_MARKER)?;
        for segment in &self.segments {
            write!(f, "{}{}", self.delimiter, segment)?;
        }
        Ok(())
    }
}

fn parse_segment(location: &str, part: &str) -> Result<Segment> {
    if part.is_empty() {
        return Err(CrunchError::malformed(location, "empty segment"));
    }
    if part == "[]" {
        return Err(CrunchError::malformed(location, "list segment without a key"));
    }

    let Some(caps) = BRACKET_REGEX.captures(part) else {
        return Ok(Segment::key(part));
    };

    let name = &caps["name"];
    match &caps["index"] {
        "" => Ok(Segment::list(name)),
        digits => {
            let index = digits.parse::<usize>().map_err(|_| {
                CrunchError::malformed(location, format!("index out of range in '{}'", part))
            })?;
            Ok(Segment::index(name, index))
        }
    }
}
