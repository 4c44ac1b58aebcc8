//! The `contents.xcworkspacedata` document model

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tempfile::NamedTempFile;

use super::WorkspaceError;

/// Format version written on the `Workspace` root element
pub const WORKSPACE_VERSION: &str = "1.0";

/// How a file reference's path is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationKind {
    /// Full filesystem path on the machine that wrote the descriptor
    Absolute,
    /// Relative to the directory holding the `.xcworkspace` bundle
    Container,
}

impl LocationKind {
    /// Prefix used in the `location` attribute
    pub fn prefix(self) -> &'static str {
        match self {
            LocationKind::Absolute => "absolute",
            LocationKind::Container => "container",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "absolute" => Some(LocationKind::Absolute),
            "container" => Some(LocationKind::Container),
            _ => None,
        }
    }
}

/// One `FileRef` entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileReference {
    pub kind: LocationKind,
    pub path: String,
}

impl FileReference {
    pub fn absolute(path: impl Into<String>) -> Self {
        Self {
            kind: LocationKind::Absolute,
            path: path.into(),
        }
    }

    pub fn container(path: impl Into<String>) -> Self {
        Self {
            kind: LocationKind::Container,
            path: path.into(),
        }
    }

    /// Parse a `location` attribute value such as `absolute:/a/b.xcodeproj`
    pub fn parse_location(location: &str) -> Result<Self, WorkspaceError> {
        let (prefix, path) = location.split_once(':').ok_or_else(|| {
            WorkspaceError::MalformedDocument(format!("location without a kind prefix: {location:?}"))
        })?;
        let kind = LocationKind::from_prefix(prefix).ok_or_else(|| {
            WorkspaceError::MalformedDocument(format!("unsupported location kind {prefix:?} in {location:?}"))
        })?;
        Ok(Self {
            kind,
            path: path.to_string(),
        })
    }

    /// Render as a `location` attribute value
    pub fn location(&self) -> String {
        format!("{}:{}", self.kind.prefix(), self.path)
    }
}

impl fmt::Display for FileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.prefix(), self.path)
    }
}

/// A workspace descriptor: a version-tagged root holding ordered file references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceDescriptor {
    pub version: String,
    pub references: Vec<FileReference>,
}

impl Default for WorkspaceDescriptor {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl WorkspaceDescriptor {
    pub fn new(references: Vec<FileReference>) -> Self {
        Self {
            version: WORKSPACE_VERSION.to_string(),
            references,
        }
    }

    pub fn contains(&self, reference: &FileReference) -> bool {
        self.references.contains(reference)
    }

    /// Parse descriptor XML.
    ///
    /// Only `FileRef` elements directly under the `Workspace` root are
    /// accepted. Anything else (Xcode `Group` elements, stray text) is
    /// rejected so that rewriting a descriptor never silently drops content.
    pub fn from_xml(xml: &str) -> Result<Self, WorkspaceError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut version: Option<String> = None;
        let mut references = Vec::new();
        let mut depth = 0usize;

        loop {
            match reader.read_event().map_err(WorkspaceError::malformed)? {
                Event::Start(element) => {
                    read_element(&element, depth, &mut version, &mut references)?;
                    depth += 1;
                }
                Event::Empty(element) => {
                    read_element(&element, depth, &mut version, &mut references)?;
                }
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                }
                Event::Text(_) | Event::CData(_) => {
                    return Err(WorkspaceError::MalformedDocument(
                        "unexpected text content".to_string(),
                    ));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if depth != 0 {
            return Err(WorkspaceError::MalformedDocument(
                "document ended inside an open element".to_string(),
            ));
        }

        let version = version.ok_or_else(|| {
            WorkspaceError::MalformedDocument("missing <Workspace> root element".to_string())
        })?;

        Ok(Self {
            version,
            references,
        })
    }

    /// Serialize using the same layout Xcode writes, so re-saving from the
    /// IDE does not produce a diff.
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str("<Workspace\n");
        out.push_str(&format!(
            "   version = \"{}\">\n",
            quick_xml::escape::escape(self.version.as_str())
        ));
        for reference in &self.references {
            out.push_str("   <FileRef\n");
            out.push_str(&format!(
                "      location = \"{}\">\n",
                quick_xml::escape::escape(reference.location().as_str())
            ));
            out.push_str("   </FileRef>\n");
        }
        out.push_str("</Workspace>\n");
        out
    }

    /// Load a descriptor from disk
    pub fn load(path: &Path) -> Result<Self, WorkspaceError> {
        if !path.is_file() {
            return Err(WorkspaceError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|e| WorkspaceError::io(path, e))?;
        Self::from_xml(&content)
    }

    /// Write the descriptor to `path`, replacing any existing file.
    ///
    /// The document is written to a temporary file in the same directory and
    /// renamed into place, so an interrupted run never leaves a truncated
    /// descriptor behind.
    pub fn store(&self, path: &Path) -> Result<(), WorkspaceError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = NamedTempFile::new_in(dir).map_err(|e| WorkspaceError::io(dir, e))?;
        temp.write_all(self.to_xml().as_bytes())
            .map_err(|e| WorkspaceError::io(temp.path(), e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| WorkspaceError::io(temp.path(), e))?;
        carry_permissions(&temp, path)?;

        temp.persist(path)
            .map_err(|e| WorkspaceError::io(path, e.error))?;
        Ok(())
    }
}

/// Temp files are created 0600; keep the target's mode (or 0644 for a new file).
fn carry_permissions(temp: &NamedTempFile, target: &Path) -> Result<(), WorkspaceError> {
    let permissions = match fs::metadata(target) {
        Ok(metadata) => Some(metadata.permissions()),
        Err(_) => default_permissions(),
    };
    if let Some(permissions) = permissions {
        temp.as_file()
            .set_permissions(permissions)
            .map_err(|e| WorkspaceError::io(temp.path(), e))?;
    }
    Ok(())
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

fn read_element(
    element: &BytesStart<'_>,
    depth: usize,
    version: &mut Option<String>,
    references: &mut Vec<FileReference>,
) -> Result<(), WorkspaceError> {
    let name = element.name();
    match (depth, name.as_ref()) {
        (0, b"Workspace") => {
            if version.is_some() {
                return Err(WorkspaceError::MalformedDocument(
                    "more than one <Workspace> root element".to_string(),
                ));
            }
            *version = Some(
                attribute(element, b"version")?.unwrap_or_else(|| WORKSPACE_VERSION.to_string()),
            );
            Ok(())
        }
        (1, b"FileRef") => {
            let location = attribute(element, b"location")?.ok_or_else(|| {
                WorkspaceError::MalformedDocument("<FileRef> without a location".to_string())
            })?;
            references.push(FileReference::parse_location(&location)?);
            Ok(())
        }
        (_, other) => Err(WorkspaceError::MalformedDocument(format!(
            "unexpected <{}> element at depth {}",
            String::from_utf8_lossy(other),
            depth
        ))),
    }
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, WorkspaceError> {
    for attr in element.attributes() {
        let attr = attr.map_err(WorkspaceError::malformed)?;
        if attr.key.as_ref() == key {
            let value = attr.unescape_value().map_err(WorkspaceError::malformed)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> WorkspaceDescriptor {
        WorkspaceDescriptor::new(vec![
            FileReference::absolute("/ci/Fact or Fib!/UnityBuild/Unity-iPhone.xcodeproj"),
            FileReference::container("../proj.ios_mac/FactorFib.xcodeproj"),
        ])
    }

    #[test]
    fn test_parse_location() {
        let reference = FileReference::parse_location("absolute:/a/b.xcodeproj").unwrap();
        assert_eq!(reference, FileReference::absolute("/a/b.xcodeproj"));

        let reference = FileReference::parse_location("container:../sub/file.proj").unwrap();
        assert_eq!(reference.kind, LocationKind::Container);
        assert_eq!(reference.path, "../sub/file.proj");
    }

    #[test]
    fn test_parse_location_rejects_unknown_kind() {
        assert!(matches!(
            FileReference::parse_location("group:Pods/Pods.xcodeproj"),
            Err(WorkspaceError::MalformedDocument(_))
        ));
        assert!(matches!(
            FileReference::parse_location("no-prefix"),
            Err(WorkspaceError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let descriptor = sample();
        let xml = descriptor.to_xml();
        let parsed = WorkspaceDescriptor::from_xml(&xml).unwrap();
        assert_eq!(parsed, descriptor);
    }

    #[test]
    fn test_to_xml_layout() {
        let xml = WorkspaceDescriptor::new(vec![FileReference::absolute("/a/b.xcodeproj")]).to_xml();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <Workspace\n   version = \"1.0\">\n   <FileRef\n      location = \"absolute:/a/b.xcodeproj\">\n   </FileRef>\n</Workspace>\n"
        );
    }

    #[test]
    fn test_escapes_special_characters() {
        let descriptor = WorkspaceDescriptor::new(vec![FileReference::absolute("/ci/R&D \"beta\"/<x>.xcodeproj")]);
        let xml = descriptor.to_xml();
        assert!(xml.contains("R&amp;D"));
        assert_eq!(WorkspaceDescriptor::from_xml(&xml).unwrap(), descriptor);
    }

    #[test]
    fn test_parse_compact_layout() {
        let xml = "<?xml version='1.0' encoding='utf-8'?>\n\
                   <Workspace version=\"1.0\">\n   \
                   <FileRef location=\"absolute:/x/UnityBuild/Unity-iPhone.xcodeproj\" />\n   \
                   <FileRef location=\"absolute:/x/CocosBuild/App.xcodeproj\" />\n\
                   </Workspace>";
        let descriptor = WorkspaceDescriptor::from_xml(xml).unwrap();
        assert_eq!(descriptor.version, "1.0");
        assert_eq!(descriptor.references.len(), 2);
        assert_eq!(descriptor.references[1].path, "/x/CocosBuild/App.xcodeproj");
    }

    #[test]
    fn test_rejects_groups() {
        let xml = r#"<Workspace version="1.0">
            <Group location="container:" name="Engines">
                <FileRef location="absolute:/a/b.xcodeproj"/>
            </Group>
        </Workspace>"#;
        assert!(matches!(
            WorkspaceDescriptor::from_xml(xml),
            Err(WorkspaceError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_rejects_missing_root_and_garbage() {
        assert!(matches!(
            WorkspaceDescriptor::from_xml(""),
            Err(WorkspaceError::MalformedDocument(_))
        ));
        assert!(matches!(
            WorkspaceDescriptor::from_xml("<Project/>"),
            Err(WorkspaceError::MalformedDocument(_))
        ));
        assert!(matches!(
            WorkspaceDescriptor::from_xml("<Workspace version=\"1.0\"><FileRef location=\"absolute:/a\">"),
            Err(WorkspaceError::MalformedDocument(_))
        ));
        assert!(matches!(
            WorkspaceDescriptor::from_xml("not xml at all"),
            Err(WorkspaceError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("contents.xcworkspacedata");
        assert!(matches!(
            WorkspaceDescriptor::load(&path),
            Err(WorkspaceError::NotFound(p)) if p == path
        ));
    }

    #[test]
    fn test_store_replaces_file_without_leftovers() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("contents.xcworkspacedata");
        fs::write(&path, "stale").unwrap();

        let descriptor = sample();
        descriptor.store(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), descriptor.to_xml());
        assert_eq!(WorkspaceDescriptor::load(&path).unwrap(), descriptor);
        let entries = fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_store_new_file_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("contents.xcworkspacedata");
        sample().store(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
