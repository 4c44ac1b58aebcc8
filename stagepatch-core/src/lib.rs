//! Stagepatch Core Library
//!
//! Helpers run between stages of the iOS build pipeline that composes a Unity
//! export and a Cocos export into one Xcode workspace:
//! - Workspace descriptor composition and path relativization
//! - Cocos builder settings patching
//! - Constant injection into generated sources
//! - Pipeline configuration

pub mod builder_settings;
pub mod config;
pub mod inject;
pub mod path_utils;
pub mod workspace;

// Re-export commonly used types
pub use builder_settings::{patch_builder_settings, BuilderPatch, BuilderSettingsError, BuilderSettingsReport};
pub use config::{ConfigError, PipelineConfig, WorkspaceConfig, CONFIG_FILE_NAME};
pub use inject::{Injector, InjectionReport, RuleOutcome, RuleSetConfig, PRESETS};
pub use path_utils::{normalize_path, path_to_string, sanitize_name};
pub use workspace::{
    add_project, compose, find_workspace_descriptor, find_xcodeproj, normalize, relativize,
    BuildOutputMarker, FileReference, LocationKind, MarkerSet, TieBreak, WorkspaceDescriptor,
    WorkspaceError, WorkspaceLayout,
};
