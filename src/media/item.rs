//! Attachment reference representation.

use crate::api::FileDescriptor;
use crate::fs::naming::{sanitize_filename, slugify};

/// Longest suffix still treated as a file extension.
const MAX_EXTENSION_LEN: usize = 5;

/// One downloadable file belonging to a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    /// Server-declared filename, reduced to its last path segment.
    pub name: String,

    /// Server path used to build the download URL.
    pub remote_path: String,

    /// Owning post id.
    pub post_id: String,

    /// Owning post title.
    pub post_title: String,

    /// Position within the owning post.
    pub index: usize,

    /// Whether the declared name pointed at an external link.
    pub external: bool,

    /// Slug the base name when building the default filename.
    pub sluglify: bool,

    /// Explicit on-disk filename (set by the filename formatter).
    filename_override: Option<String>,
}

impl AttachmentRef {
    /// Create a reference from a server name and path.
    pub fn new(name: &str, remote_path: &str) -> Self {
        let external = name.contains("//");
        let name = last_segment(name).unwrap_or(name).to_string();

        Self {
            name,
            remote_path: remote_path.to_string(),
            post_id: String::new(),
            post_title: String::new(),
            index: 0,
            external,
            sluglify: false,
            filename_override: None,
        }
    }

    /// Build from an API descriptor; descriptors without a path yield `None`.
    ///
    /// A missing name falls back to the last segment of the path.
    pub fn from_descriptor(descriptor: &FileDescriptor) -> Option<Self> {
        if !descriptor.is_present() {
            return None;
        }
        let path = descriptor.path.as_deref()?;
        let name = descriptor
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| last_segment(path))
            .unwrap_or(path);

        Some(Self::new(name, path))
    }

    /// File extension, derived from the name or, failing that, from the
    /// server path. `jpe` is normalised to `jpg`.
    pub fn extension(&self) -> Option<String> {
        let ext = split_extension(&self.name)
            .map(|(_, ext)| ext)
            .or_else(|| {
                let segment = last_segment(&self.remote_path)?;
                // Re-parse the name with the path segment appended.
                let combined = format!("{}{}", self.name, segment);
                split_extension(&combined).map(|(_, ext)| ext.to_string())
            })?;

        if ext.eq_ignore_ascii_case("jpe") {
            Some("jpg".to_string())
        } else {
            Some(ext)
        }
    }

    /// Name without its extension.
    pub fn base_name(&self) -> &str {
        split_extension(&self.name)
            .map(|(base, _)| base)
            .unwrap_or(&self.name)
    }

    /// `{base_name}.{extension}`, slugged when requested.
    pub fn default_filename(&self) -> String {
        let base = if self.sluglify {
            slugify(self.base_name())
        } else {
            self.base_name().to_string()
        };

        let filename = match self.extension() {
            Some(ext) => format!("{}.{}", base, ext),
            None => base,
        };
        sanitize_filename(&filename)
    }

    /// Final on-disk filename. Never contains a path separator.
    pub fn filename(&self) -> String {
        match &self.filename_override {
            Some(name) => sanitize_filename(name),
            None => self.default_filename(),
        }
    }

    /// Override the on-disk filename.
    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.filename_override = Some(filename.into());
    }
}

fn last_segment(value: &str) -> Option<&str> {
    value
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .last()
        .map(|s| s.split(['?', '#']).next().unwrap_or(s))
        .filter(|s| !s.is_empty())
}

/// Split `name` into `(base, extension)` when it ends in a plausible extension.
fn split_extension(name: &str) -> Option<(&str, String)> {
    let dot = name.rfind('.')?;
    let (base, ext) = (&name[..dot], &name[dot + 1..]);

    let plausible = !base.is_empty()
        && !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric());

    plausible.then(|| (base, ext.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_normalised_to_last_segment() {
        let a = AttachmentRef::new("folder/sub/picture.png", "/ab/cd/abcd.png");
        assert_eq!(a.name, "picture.png");
        assert_eq!(a.filename(), "picture.png");
        assert!(!a.external);
    }

    #[test]
    fn test_external_link_detected() {
        let a = AttachmentRef::new("https://mega.nz/file/xyz", "/ab/cd/abcd.bin");
        assert!(a.external);
        assert_eq!(a.name, "xyz");
    }

    #[test]
    fn test_extension_from_name() {
        let a = AttachmentRef::new("archive.tar.gz", "/x/y.gz");
        assert_eq!(a.extension().as_deref(), Some("gz"));
        assert_eq!(a.base_name(), "archive.tar");
    }

    #[test]
    fn test_extension_fallback_to_path() {
        let a = AttachmentRef::new("untitled", "/ab/cd/0a1b2c.png");
        assert_eq!(a.extension().as_deref(), Some("png"));
        assert_eq!(a.filename(), "untitled.png");
    }

    #[test]
    fn test_jpe_becomes_jpg() {
        let a = AttachmentRef::new("scan.jpe", "/ab/cd/abcd.jpe");
        assert_eq!(a.extension().as_deref(), Some("jpg"));
        assert_eq!(a.filename(), "scan.jpg");
    }

    #[test]
    fn test_no_extension_anywhere() {
        let a = AttachmentRef::new("README", "/ab/cd/README");
        assert_eq!(a.extension(), None);
        assert_eq!(a.filename(), "README");
    }

    #[test]
    fn test_sluglify() {
        let mut a = AttachmentRef::new("My Great Pic!.PNG", "/x.png");
        a.sluglify = true;
        assert_eq!(a.filename(), "my-great-pic.PNG");
    }

    #[test]
    fn test_override_is_sanitised() {
        let mut a = AttachmentRef::new("a.png", "/x.png");
        a.set_filename("evil/../name.png");
        assert!(!a.filename().contains('/'));
    }

    #[test]
    fn test_from_descriptor() {
        let desc = FileDescriptor {
            name: None,
            path: Some("/ab/cd/hash.mp4".to_string()),
        };
        let a = AttachmentRef::from_descriptor(&desc).unwrap();
        assert_eq!(a.name, "hash.mp4");

        let empty = FileDescriptor::default();
        assert!(AttachmentRef::from_descriptor(&empty).is_none());
    }
}
