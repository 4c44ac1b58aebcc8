//! Rewriting absolute references into container-relative ones

use std::path::Path;

use super::{FileReference, LocationKind, MarkerSet, WorkspaceDescriptor, WorkspaceError};

/// Relativize every absolute reference that contains a build-output marker.
///
/// `/a/b/MarkerX/sub/file.proj` becomes `container:../sub/file.proj`.
/// References without a marker, and references that are already
/// container-relative, are left as they are. Returns the rewritten descriptor
/// and the number of references changed.
pub fn relativize(
    mut descriptor: WorkspaceDescriptor,
    markers: &MarkerSet,
) -> Result<(WorkspaceDescriptor, usize), WorkspaceError> {
    let mut rewritten = 0;

    for reference in descriptor.references.iter_mut() {
        if reference.kind != LocationKind::Absolute {
            continue;
        }

        match markers.locate(&reference.path)? {
            Some(found) => {
                let relative = FileReference::container(format!("../{}", found.suffix));
                tracing::debug!("{} -> {} (marker {})", reference, relative, found.marker);
                *reference = relative;
                rewritten += 1;
            }
            None => {
                tracing::debug!("No build-output marker in {}, keeping absolute", reference.path);
            }
        }
    }

    Ok((descriptor, rewritten))
}

/// Relativize the descriptor at `path` in place.
///
/// The file is only rewritten when at least one reference changed, so an
/// already-normalized descriptor keeps its bytes and mtime.
pub fn normalize(path: &Path, markers: &MarkerSet) -> Result<usize, WorkspaceError> {
    let descriptor = WorkspaceDescriptor::load(path)?;
    let (descriptor, rewritten) = relativize(descriptor, markers)?;

    if rewritten == 0 {
        tracing::info!("No references to relativize in {}", path.display());
        return Ok(0);
    }

    descriptor.store(path)?;
    tracing::info!("Relativized {} reference(s) in {}", rewritten, path.display());
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_descriptor(dir: &Path, xml: &str) -> std::path::PathBuf {
        let path = dir.join("contents.xcworkspacedata");
        fs::write(&path, xml).unwrap();
        path
    }

    #[test]
    fn test_relativize_single_reference() {
        let descriptor = WorkspaceDescriptor::new(vec![FileReference::absolute("/a/b/MarkerX/sub/file.proj")]);
        let markers = MarkerSet::new(["MarkerX"]).unwrap();

        let (result, count) = relativize(descriptor, &markers).unwrap();
        assert_eq!(count, 1);
        assert_eq!(result.references[0].kind, LocationKind::Container);
        assert_eq!(result.references[0].location(), "container:../sub/file.proj");
    }

    #[test]
    fn test_relativize_keeps_order_and_unmatched() {
        let descriptor = WorkspaceDescriptor::new(vec![
            FileReference::absolute("/ci/App/UnityBuild/Unity-iPhone.xcodeproj"),
            FileReference::absolute("/opt/shared/Tools.xcodeproj"),
            FileReference::container("../already/there.xcodeproj"),
            FileReference::absolute("/ci/App/CocosBuild/jsb-default/proj.ios_mac/App.xcodeproj"),
        ]);

        let (result, count) = relativize(descriptor, &MarkerSet::default()).unwrap();
        assert_eq!(count, 2);
        let locations: Vec<String> = result.references.iter().map(|r| r.location()).collect();
        assert_eq!(
            locations,
            vec![
                "container:../Unity-iPhone.xcodeproj",
                "absolute:/opt/shared/Tools.xcodeproj",
                "container:../already/there.xcodeproj",
                "container:../jsb-default/proj.ios_mac/App.xcodeproj",
            ]
        );
    }

    #[test]
    fn test_relativize_is_idempotent() {
        let descriptor = WorkspaceDescriptor::new(vec![
            FileReference::absolute("/ci/CocosBuild/x/UnityBuild/y.xcodeproj"),
            FileReference::absolute("/elsewhere/z.xcodeproj"),
        ]);
        let markers = MarkerSet::default();

        let (once, first) = relativize(descriptor, &markers).unwrap();
        let (twice, second) = relativize(once.clone(), &markers).unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_relativize_ambiguous_is_stable() {
        let path = "/ci/CocosBuild/export/UnityBuild/Unity-iPhone.xcodeproj";
        let markers = MarkerSet::default();

        let results: Vec<WorkspaceDescriptor> = (0..3)
            .map(|_| {
                let descriptor = WorkspaceDescriptor::new(vec![FileReference::absolute(path)]);
                relativize(descriptor, &markers).unwrap().0
            })
            .collect();

        assert_eq!(results[0].references[0].path, "../Unity-iPhone.xcodeproj");
        assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn test_relativize_reject_leaves_input_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let original = WorkspaceDescriptor::new(vec![
            FileReference::absolute("/ci/UnityBuild/a.xcodeproj"),
            FileReference::absolute("/ci/CocosBuild/x/UnityBuild/b.xcodeproj"),
        ]);
        let path = write_descriptor(temp_dir.path(), &original.to_xml());
        let markers = MarkerSet::default().with_tie_break(crate::workspace::TieBreak::Reject);

        assert!(matches!(
            normalize(&path, &markers),
            Err(WorkspaceError::AmbiguousMarker { .. })
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), original.to_xml());
    }

    #[test]
    fn test_normalize_rewrites_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_descriptor(
            temp_dir.path(),
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Workspace version="1.0">
   <FileRef location="absolute:/a/b/MarkerX/sub/file.proj" />
</Workspace>"#,
        );
        let markers = MarkerSet::new(["MarkerX"]).unwrap();

        assert_eq!(normalize(&path, &markers).unwrap(), 1);
        let descriptor = WorkspaceDescriptor::load(&path).unwrap();
        assert_eq!(descriptor.references, vec![FileReference::container("../sub/file.proj")]);

        // Second run is a no-op
        let before = fs::read(&path).unwrap();
        assert_eq!(normalize(&path, &markers).unwrap(), 0);
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_normalize_without_matches_leaves_bytes() {
        let temp_dir = TempDir::new().unwrap();
        // Non-canonical formatting on purpose: any rewrite would change it
        let xml = "<Workspace version='1.0'><FileRef location='absolute:/opt/Other/x.xcodeproj'/></Workspace>";
        let path = write_descriptor(temp_dir.path(), xml);

        assert_eq!(normalize(&path, &MarkerSet::default()).unwrap(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), xml);
    }

    #[test]
    fn test_normalize_missing_descriptor() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.xcworkspacedata");
        assert!(matches!(
            normalize(&path, &MarkerSet::default()),
            Err(WorkspaceError::NotFound(_))
        ));
    }

    #[test]
    fn test_normalize_malformed_descriptor() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_descriptor(temp_dir.path(), "<Workspace><FileRef");
        assert!(matches!(
            normalize(&path, &MarkerSet::default()),
            Err(WorkspaceError::MalformedDocument(_))
        ));
    }
}
