//! Locating exported projects and existing workspaces on disk

use std::fs;
use std::path::{Path, PathBuf};

use super::{WorkspaceError, WorkspaceLayout};

const PROJECT_EXTENSION: &str = "xcodeproj";

/// Find the first `.xcodeproj` directly inside `dir` (by name)
pub fn find_xcodeproj(dir: &Path) -> Result<PathBuf, WorkspaceError> {
    sorted_subdirs(dir)?
        .into_iter()
        .find(|path| has_extension(path, PROJECT_EXTENSION))
        .ok_or_else(|| WorkspaceError::NoProjectFound(dir.to_path_buf()))
}

/// Find the descriptor of the first workspace bundle under `dir`.
///
/// Searches depth-first in name order and does not look inside a workspace
/// bundle once one is found. Symlinked directories are not followed.
pub fn find_workspace_descriptor(dir: &Path, layout: &WorkspaceLayout) -> Result<PathBuf, WorkspaceError> {
    search_workspace(dir, layout)?.ok_or_else(|| WorkspaceError::NoWorkspaceFound(dir.to_path_buf()))
}

fn search_workspace(dir: &Path, layout: &WorkspaceLayout) -> Result<Option<PathBuf>, WorkspaceError> {
    for path in sorted_subdirs(dir)? {
        if has_extension(&path, &layout.bundle_extension) {
            return Ok(Some(path.join(&layout.descriptor_file)));
        }
        if let Some(found) = search_workspace(&path, layout)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

/// Real (non-symlink) subdirectories of `dir`, sorted by path
fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>, WorkspaceError> {
    if !dir.is_dir() {
        return Err(WorkspaceError::MissingInput(dir.to_path_buf()));
    }

    let mut subdirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| WorkspaceError::io(dir, e))? {
        let entry = entry.map_err(|e| WorkspaceError::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| WorkspaceError::io(&entry.path(), e))?;
        if file_type.is_dir() {
            subdirs.push(entry.path());
        }
    }
    subdirs.sort();
    Ok(subdirs)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_xcodeproj_picks_first_by_name() {
        let temp_dir = TempDir::new().unwrap();
        let proj = temp_dir.path().join("build").join("ios").join("proj");
        fs::create_dir_all(proj.join("Zeta.xcodeproj")).unwrap();
        fs::create_dir_all(proj.join("Alpha.xcodeproj")).unwrap();
        fs::create_dir_all(proj.join("Sources")).unwrap();
        fs::write(proj.join("Fake.xcodeproj.txt"), "").unwrap();

        let found = find_xcodeproj(&proj).unwrap();
        assert_eq!(found, proj.join("Alpha.xcodeproj"));
    }

    #[test]
    fn test_find_xcodeproj_ignores_files_and_nesting() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("Loose.xcodeproj"), "").unwrap();
        fs::create_dir_all(temp_dir.path().join("nested").join("Deep.xcodeproj")).unwrap();

        assert!(matches!(
            find_xcodeproj(temp_dir.path()),
            Err(WorkspaceError::NoProjectFound(_))
        ));
    }

    #[test]
    fn test_find_xcodeproj_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            find_xcodeproj(&temp_dir.path().join("missing")),
            Err(WorkspaceError::MissingInput(_))
        ));
    }

    #[test]
    fn test_find_workspace_descriptor() {
        let temp_dir = TempDir::new().unwrap();
        let ws_dir = temp_dir.path().join("XcodeWorkspace");
        fs::create_dir_all(ws_dir.join("b").join("GameWS.xcworkspace")).unwrap();
        fs::create_dir_all(ws_dir.join("a").join("Other").join("AppWS.xcworkspace")).unwrap();

        let found = find_workspace_descriptor(&ws_dir, &WorkspaceLayout::default()).unwrap();
        assert_eq!(
            found,
            ws_dir
                .join("a")
                .join("Other")
                .join("AppWS.xcworkspace")
                .join("contents.xcworkspacedata")
        );
    }

    #[test]
    fn test_find_workspace_descriptor_none() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("empty")).unwrap();
        assert!(matches!(
            find_workspace_descriptor(temp_dir.path(), &WorkspaceLayout::default()),
            Err(WorkspaceError::NoWorkspaceFound(_))
        ));
    }
}
