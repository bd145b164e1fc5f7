use std::path::PathBuf;

/// Where a managed file's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// Rendered text.
    Inline(String),
    /// A location to copy from: a local path or a `file://` URL.
    Source(String),
}

/// One file the writer must put in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedFile {
    pub path: PathBuf, // absolute destination, e.g. "/etc/nsd/example.com.zone"
    pub content: FileContent,
    pub mode: u32,  // 0o644, 0o640
    pub owner: u32, // uid
    pub group: u32, // gid
}

impl ManagedFile {
    /// Rendered text owned by root.
    pub fn inline(path: impl Into<PathBuf>, text: impl Into<String>, mode: u32) -> Self {
        Self {
            path: path.into(),
            content: FileContent::Inline(text.into()),
            mode,
            owner: 0,
            group: 0,
        }
    }

    /// A file copied from `location`, owned by root.
    pub fn sourced(path: impl Into<PathBuf>, location: impl Into<String>, mode: u32) -> Self {
        Self {
            path: path.into(),
            content: FileContent::Source(location.into()),
            mode,
            owner: 0,
            group: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
}
