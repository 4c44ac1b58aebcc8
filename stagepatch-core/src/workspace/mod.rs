//! Xcode workspace composition and path normalization
//!
//! A workspace descriptor (`contents.xcworkspacedata`) lists the native
//! projects that make up one composite workspace. The composer creates one
//! pointing at two independently exported project trees using absolute paths;
//! the normalizer later rewrites those absolute paths into `container:`
//! references anchored at a known build-output directory, so the tree can be
//! moved to another machine.
//!
//! `container:` references resolve against the directory that holds the
//! `.xcworkspace` bundle, so `container:../sub` points at `<product>/sub` for
//! a workspace stored in `<product>/XcodeWorkspace/`.

mod compose;
mod descriptor;
mod discover;
mod markers;
mod normalize;

use std::path::{Path, PathBuf};

pub use compose::{add_project, compose, WorkspaceLayout};
pub use descriptor::{FileReference, LocationKind, WorkspaceDescriptor, WORKSPACE_VERSION};
pub use discover::{find_workspace_descriptor, find_xcodeproj};
pub use markers::{BuildOutputMarker, MarkerMatch, MarkerSet, TieBreak, DEFAULT_MARKERS};
pub use normalize::{normalize, relativize};

/// Errors raised while composing or rewriting workspace descriptors
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("Required project directory not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Workspace descriptor not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed workspace descriptor: {0}")]
    MalformedDocument(String),

    #[error("Cannot derive a product root from {}", .0.display())]
    NoProductRoot(PathBuf),

    #[error("Path {path} matches several build-output markers: {}", markers.join(", "))]
    AmbiguousMarker { path: String, markers: Vec<String> },

    #[error("Invalid build-output marker: {0:?}")]
    InvalidMarker(String),

    #[error("No .xcodeproj found directly in {}", .0.display())]
    NoProjectFound(PathBuf),

    #[error("No .xcworkspace found under {}", .0.display())]
    NoWorkspaceFound(PathBuf),
}

impl WorkspaceError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn malformed(err: impl std::fmt::Display) -> Self {
        Self::MalformedDocument(err.to_string())
    }
}
