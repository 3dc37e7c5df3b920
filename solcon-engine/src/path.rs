//! Path templates
//!
//! A path is a delimiter-joined string such as `topology_template;node_templates;{};type`.
//! Each segment is either a literal key, a list index (a segment made only of ASCII
//! digits) or a `{}` placeholder that is filled in from a correspondence chain.
//!
//! Placeholder resolution walks the chain from the most specific correspondence to the
//! root and fills the *last* unresolved placeholder first:
//!
//! ```text
//!     template:  vnfd;vdu;{};int-cpd;{};id
//!     chain:     c1_nic0 -> 1, parent=(c1 -> 0)
//!     by slot:   vnfd;vdu;0;int-cpd;1;id
//!     by name:   vnfd;vdu;c1;int-cpd;c1_nic0;id
//! ```
//!
//! A level whose selected field is absent (no slot when resolving by slot, no name when
//! resolving by name) is consumed without filling anything, so the next level up fills
//! the same placeholder. Once the chain runs out, the remaining placeholders are left in
//! place.

use crate::correspondence::{CorrId, CorrespondenceArena};
use std::fmt;

pub const DEFAULT_DELIMITER: char = '.';
pub const PLACEHOLDER: &str = "{}";

/// One step of a [`Path`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
    Placeholder,
}

impl Segment {
    /// Classify a single segment of text
    pub fn parse(text: &str) -> Self {
        if text == PLACEHOLDER {
            return Segment::Placeholder;
        }
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = text.parse::<usize>() {
                return Segment::Index(index);
            }
        }
        Segment::Key(text.to_string())
    }

    pub fn is_index(&self) -> bool {
        matches!(self, Segment::Index(_))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Segment::Placeholder)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "{}", key),
            Segment::Index(index) => write!(f, "{}", index),
            Segment::Placeholder => write!(f, "{}", PLACEHOLDER),
        }
    }
}

/// Which field of a correspondence fills a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolve {
    /// Use the ordinal slot
    Slot,
    /// Use the identifier name
    Name,
}

/// A parsed path template
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<Segment>,
    delimiter: char,
}

impl Path {
    /// Parse using the default `.` delimiter
    pub fn parse(text: &str) -> Self {
        Self::parse_with(text, DEFAULT_DELIMITER)
    }

    pub fn parse_with(text: &str, delimiter: char) -> Self {
        let segments = if text.is_empty() {
            Vec::new()
        } else {
            text.split(delimiter).map(Segment::parse).collect()
        };
        Path {
            segments,
            delimiter,
        }
    }

    pub fn from_segments(segments: Vec<Segment>, delimiter: char) -> Self {
        Path {
            segments,
            delimiter,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments
    pub fn level(&self) -> usize {
        self.segments.len()
    }

    pub fn placeholder_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_placeholder()).count()
    }

    pub fn has_placeholders(&self) -> bool {
        self.segments.iter().any(Segment::is_placeholder)
    }

    pub fn last_segment(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// The last `n` segments
    pub fn last(&self, n: usize) -> Path {
        let start = self.segments.len().saturating_sub(n);
        self.with_segments(self.segments[start..].to_vec())
    }

    /// Drop the first `n` segments
    pub fn without_first(&self, n: usize) -> Path {
        let start = n.min(self.segments.len());
        self.with_segments(self.segments[start..].to_vec())
    }

    /// Drop the last `n` segments
    pub fn without_last(&self, n: usize) -> Path {
        let end = self.segments.len().saturating_sub(n);
        self.with_segments(self.segments[..end].to_vec())
    }

    /// Drop as many leading segments as `prefix` has
    ///
    /// Used to make a document-wide path relative to a node that was already looked up.
    pub fn without_prefix_level(&self, prefix: &Path) -> Path {
        self.without_first(prefix.level())
    }

    /// Remove the segment at `index`, if present
    pub fn without_segment(&self, index: usize) -> Path {
        let mut segments = self.segments.clone();
        if index < segments.len() {
            segments.remove(index);
        }
        self.with_segments(segments)
    }

    /// Append a segment
    pub fn child(&self, segment: Segment) -> Path {
        let mut segments = self.segments.clone();
        segments.push(segment);
        self.with_segments(segments)
    }

    /// Append all segments of `other`
    pub fn join(&self, other: &Path) -> Path {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        self.with_segments(segments)
    }

    /// Fill placeholders from the correspondence chain starting at `elem`
    pub fn resolve(&self, arena: &CorrespondenceArena, elem: Option<CorrId>, by: Resolve) -> Path {
        let mut segments = self.segments.clone();
        let mut current = elem;

        while let Some(id) = current {
            let Some(slot) = segments.iter().rposition(Segment::is_placeholder) else {
                break;
            };
            let corr = arena.get(id);
            let fill = match by {
                Resolve::Slot => corr.slot.map(Segment::Index),
                Resolve::Name => corr.name.as_deref().map(Segment::parse),
            };
            if let Some(fill) = fill {
                segments[slot] = fill;
            }
            current = corr.parent;
        }

        self.with_segments(segments)
    }

    fn with_segments(&self, segments: Vec<Segment>) -> Path {
        Path {
            segments,
            delimiter: self.delimiter,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", self.delimiter)?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}
