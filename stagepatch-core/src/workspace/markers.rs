//! Build-output markers
//!
//! A marker is the name of a directory that an upstream build stage exports
//! into (e.g. `UnityBuild`). A path is relativized at the first segment equal
//! to a marker; everything after that segment becomes the relative suffix.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::WorkspaceError;
use crate::path_utils::{join_segments, path_segments};

/// Export roots of the two engine stages, in priority order
pub const DEFAULT_MARKERS: [&str; 2] = ["UnityBuild", "CocosBuild"];

/// A single directory-name token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildOutputMarker(String);

impl BuildOutputMarker {
    /// A marker must be one non-empty path segment
    pub fn new(name: impl Into<String>) -> Result<Self, WorkspaceError> {
        let name = name.into();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(WorkspaceError::InvalidMarker(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildOutputMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What to do when a path contains more than one marker
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TieBreak {
    /// The marker declared first in the set wins
    #[default]
    DeclarationOrder,

    /// The marker closest to the filesystem root wins (longest suffix)
    LongestSuffix,

    /// Fail with `AmbiguousMarker`
    Reject,
}

/// Where a marker was found in a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerMatch {
    pub marker: BuildOutputMarker,
    /// Index of the marker segment in the split path
    pub segment: usize,
    /// Segments after the marker, joined with `/`
    pub suffix: String,
}

/// Ordered, de-duplicated set of markers plus the tie-break policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSet {
    markers: Vec<BuildOutputMarker>,
    tie_break: TieBreak,
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self {
            markers: DEFAULT_MARKERS
                .iter()
                .map(|name| BuildOutputMarker(name.to_string()))
                .collect(),
            tie_break: TieBreak::default(),
        }
    }
}

impl MarkerSet {
    /// Build a set from marker names; later duplicates are dropped
    pub fn new<I, S>(names: I) -> Result<Self, WorkspaceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut markers: Vec<BuildOutputMarker> = Vec::new();
        for name in names {
            let marker = BuildOutputMarker::new(name)?;
            if !markers.contains(&marker) {
                markers.push(marker);
            }
        }
        Ok(Self {
            markers,
            tie_break: TieBreak::default(),
        })
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    pub fn markers(&self) -> &[BuildOutputMarker] {
        &self.markers
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Find the marker to relativize `path` at, if any.
    ///
    /// For each marker only its first occurrence counts, and it must be
    /// preceded by a separator and followed by at least one non-empty
    /// segment. When several markers match, the tie-break policy decides.
    pub fn locate(&self, path: &str) -> Result<Option<MarkerMatch>, WorkspaceError> {
        let segments = path_segments(path);
        let mut found: Vec<MarkerMatch> = self
            .markers
            .iter()
            .filter_map(|marker| first_occurrence(&segments, marker))
            .collect();

        if found.len() < 2 {
            return Ok(found.pop());
        }

        match self.tie_break {
            TieBreak::DeclarationOrder => Ok(found.into_iter().next()),
            TieBreak::LongestSuffix => Ok(found.into_iter().min_by_key(|m| m.segment)),
            TieBreak::Reject => Err(WorkspaceError::AmbiguousMarker {
                path: path.to_string(),
                markers: found.iter().map(|m| m.marker.to_string()).collect(),
            }),
        }
    }
}

fn first_occurrence(segments: &[&str], marker: &BuildOutputMarker) -> Option<MarkerMatch> {
    segments
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, segment)| **segment == marker.as_str())
        .find_map(|(index, _)| {
            let suffix = join_segments(&segments[index + 1..]);
            (!suffix.is_empty()).then(|| MarkerMatch {
                marker: marker.clone(),
                segment: index,
                suffix,
            })
        })
}
