//! Dotted key patterns with single-segment wildcards
//!
//! `"a.*.c"` matches `"a.b.c"` but not `"a.b.b.c"` or `"a.c"`: a pattern
//! matches a key only when both have the same number of segments and every
//! pattern segment is either `*` or identical to the key segment.

use fabric_core::{FabricError, FabricResult, KEY_SEPARATOR};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// One pattern segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Must equal the key segment exactly
    Literal(String),
    /// Matches any single key segment
    Wildcard,
}

impl Segment {
    #[inline]
    fn matches(&self, part: &str) -> bool {
        match self {
            Segment::Literal(lit) => lit == part,
            Segment::Wildcard => true,
        }
    }
}

/// A compiled subscription pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    raw: String,
    segments: SmallVec<[Segment; 8]>,
}

impl Pattern {
    /// Compile a pattern.
    ///
    /// Rejects empty patterns, empty segments (`"a..b"`, `".a"`), and
    /// segments that mix `*` with other characters (`"a*"`, `"**"`).
    pub fn parse(pattern: &str) -> FabricResult<Self> {
        if pattern.is_empty() {
            return Err(FabricError::pattern_syntax(pattern, "pattern is empty"));
        }

        let mut segments = SmallVec::new();
        for (index, part) in pattern.split(KEY_SEPARATOR).enumerate() {
            let segment = match part {
                "" => {
                    return Err(FabricError::pattern_syntax(
                        pattern,
                        format!("segment {} is empty", index),
                    ))
                }
                "*" => Segment::Wildcard,
                p if p.contains('*') => {
                    return Err(FabricError::pattern_syntax(
                        pattern,
                        format!("wildcard must be a whole segment, found '{}'", p),
                    ))
                }
                p => Segment::Literal(p.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// Whether `key` matches.
    pub fn matches(&self, key: &str) -> bool {
        let mut parts = key.split(KEY_SEPARATOR);
        for segment in &self.segments {
            match parts.next() {
                Some(part) if segment.matches(part) => {}
                _ => return false,
            }
        }
        parts.next().is_none()
    }

    /// Source text.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Compiled segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the pattern has no wildcard.
    pub fn is_exact(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }
}

impl FromStr for Pattern {
    type Err = FabricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::parse(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
