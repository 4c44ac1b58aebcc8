//! Creating workspace descriptors and adding projects to them

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{FileReference, WorkspaceDescriptor, WorkspaceError};
use crate::path_utils::{path_to_string, sanitize_name};

/// Where the composed workspace lands relative to the product root
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceLayout {
    /// Folder created next to the engine export folders
    #[serde(default = "default_folder_name")]
    pub folder_name: String,

    /// Appended to the sanitized product name
    #[serde(default = "default_name_suffix")]
    pub name_suffix: String,

    /// Bundle extension of the workspace directory
    #[serde(default = "default_bundle_extension")]
    pub bundle_extension: String,

    /// Descriptor file inside the bundle
    #[serde(default = "default_descriptor_file")]
    pub descriptor_file: String,
}

fn default_folder_name() -> String {
    "XcodeWorkspace".to_string()
}

fn default_name_suffix() -> String {
    "WS".to_string()
}

fn default_bundle_extension() -> String {
    "xcworkspace".to_string()
}

fn default_descriptor_file() -> String {
    "contents.xcworkspacedata".to_string()
}

impl Default for WorkspaceLayout {
    fn default() -> Self {
        Self {
            folder_name: default_folder_name(),
            name_suffix: default_name_suffix(),
            bundle_extension: default_bundle_extension(),
            descriptor_file: default_descriptor_file(),
        }
    }
}

impl WorkspaceLayout {
    /// Workspace name for a product directory name: `Fact or Fib!` -> `FactorFibWS`
    pub fn workspace_name(&self, product_name: &str) -> String {
        format!("{}{}", sanitize_name(product_name), self.name_suffix)
    }

    /// `<productRoot>/<folder>/<name>.<ext>/<descriptor>`
    pub fn descriptor_path(&self, product_root: &Path, workspace_name: &str) -> PathBuf {
        product_root
            .join(&self.folder_name)
            .join(format!("{}.{}", workspace_name, self.bundle_extension))
            .join(&self.descriptor_file)
    }
}

/// Compose a workspace referencing `primary` and `secondary` by absolute path.
///
/// The product root is the grandparent of `primary`; the descriptor is
/// written under `<productRoot>/XcodeWorkspace/`, replacing any previous one.
/// Both inputs are checked before anything is created.
pub fn compose(
    primary: &Path,
    secondary: &Path,
    layout: &WorkspaceLayout,
) -> Result<PathBuf, WorkspaceError> {
    let primary = canonical_project_dir(primary)?;
    let secondary = canonical_project_dir(secondary)?;

    let product_root = primary
        .parent()
        .and_then(Path::parent)
        .ok_or_else(|| WorkspaceError::NoProductRoot(primary.clone()))?;
    let product_name = product_root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| WorkspaceError::NoProductRoot(primary.clone()))?;

    let workspace_name = layout.workspace_name(&product_name);
    let descriptor_path = layout.descriptor_path(product_root, &workspace_name);
    tracing::info!("Creating workspace at {}", descriptor_path.display());

    if let Some(bundle_dir) = descriptor_path.parent() {
        fs::create_dir_all(bundle_dir).map_err(|e| WorkspaceError::io(bundle_dir, e))?;
    }

    let descriptor = WorkspaceDescriptor::new(vec![
        FileReference::absolute(path_to_string(&primary)),
        FileReference::absolute(path_to_string(&secondary)),
    ]);
    descriptor.store(&descriptor_path)?;

    tracing::info!("Workspace {} references {} projects", workspace_name, descriptor.references.len());
    Ok(descriptor_path)
}

/// Append an absolute reference to `project_dir` unless it is already listed.
///
/// Returns whether the descriptor changed; it is only rewritten if so.
pub fn add_project(descriptor_path: &Path, project_dir: &Path) -> Result<bool, WorkspaceError> {
    let project_dir = canonical_project_dir(project_dir)?;
    let mut descriptor = WorkspaceDescriptor::load(descriptor_path)?;

    let reference = FileReference::absolute(path_to_string(&project_dir));
    if descriptor.contains(&reference) {
        tracing::info!("{} already present in {}", reference, descriptor_path.display());
        return Ok(false);
    }

    descriptor.references.push(reference);
    descriptor.store(descriptor_path)?;
    tracing::info!("Added {} to {}", project_dir.display(), descriptor_path.display());
    Ok(true)
}

fn canonical_project_dir(dir: &Path) -> Result<PathBuf, WorkspaceError> {
    if !dir.is_dir() {
        return Err(WorkspaceError::MissingInput(dir.to_path_buf()));
    }
    fs::canonicalize(dir).map_err(|e| WorkspaceError::io(dir, e))
}
