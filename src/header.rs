use bstr::BString;

use crate::wire;
use crate::Error;

/// The type of a filesystem entry in an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Regular,
    Directory,
    Symlink,
}

/// A single entry in a NAR archive.
///
/// Some fields are only meaningful for some kinds: `executable` and `size`
/// for regular files, `link_target` for symlinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Unrooted, slash-separated sequence of path elements, like
    /// `"bin/hello"`. The root of the archive uses the empty string.
    pub path: String,
    pub kind: NodeKind,
    pub executable: bool,
    /// Size of a regular file in bytes.
    pub size: u64,
    /// Target of a symlink. Not required to be UTF-8.
    pub link_target: BString,
    /// Position in the NAR file at which a regular file's data begins.
    ///
    /// Populated by [`Reader`](crate::Reader); ignored by
    /// [`Writer::write_header`](crate::Writer::write_header).
    pub content_offset: u64,
}

impl Header {
    /// A regular file at `path`.
    pub fn regular(path: impl Into<String>, executable: bool, size: u64) -> Self {
        Header {
            path: path.into(),
            kind: NodeKind::Regular,
            executable,
            size,
            link_target: BString::default(),
            content_offset: 0,
        }
    }

    /// A directory at `path`.
    pub fn directory(path: impl Into<String>) -> Self {
        Header {
            path: path.into(),
            kind: NodeKind::Directory,
            executable: false,
            size: 0,
            link_target: BString::default(),
            content_offset: 0,
        }
    }

    /// A symlink at `path` pointing to `target`.
    pub fn symlink(path: impl Into<String>, target: impl Into<BString>) -> Self {
        Header {
            path: path.into(),
            kind: NodeKind::Symlink,
            executable: false,
            size: 0,
            link_target: target.into(),
            content_offset: 0,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    /// Checks the field invariants enforced at the codec boundary.
    pub fn validate(&self) -> Result<(), Error> {
        validate_path(&self.path)?;
        match self.kind {
            NodeKind::Regular => {
                if !self.link_target.is_empty() {
                    return Err(Error::invalid(format!(
                        "{:?}: link target set on regular file",
                        self.path
                    )));
                }
                if self.size >= 1 << 63 {
                    return Err(Error::UnsupportedSize(self.size));
                }
            }
            NodeKind::Directory => {
                if self.size != 0 {
                    return Err(Error::invalid(format!(
                        "{:?}: size set on directory",
                        self.path
                    )));
                }
                if !self.link_target.is_empty() {
                    return Err(Error::invalid(format!(
                        "{:?}: link target set on directory",
                        self.path
                    )));
                }
            }
            NodeKind::Symlink => {
                if self.size != 0 {
                    return Err(Error::invalid(format!(
                        "{:?}: size set on symlink",
                        self.path
                    )));
                }
                validate_link_target(&self.link_target)
                    .map_err(|e| Error::invalid(format!("{:?}: {e}", self.path)))?;
            }
        }
        Ok(())
    }
}

/// Checks a single path element against the entry name rules.
pub(crate) fn validate_filename(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("empty filename".into());
    }
    if name.len() > wire::MAX_NAME_LEN {
        return Err(format!("filename longer than {} bytes", wire::MAX_NAME_LEN));
    }
    if name == "." || name == ".." {
        return Err(format!("filename {name:?} is reserved"));
    }
    if let Some(c) = name.chars().find(|&c| c == '/' || c == '\0') {
        return Err(format!("{c:?} not allowed in filename"));
    }
    Ok(())
}

/// Checks every element of an unrooted slash-separated path.
/// The empty path denotes the archive root and is always valid.
pub(crate) fn validate_path(path: &str) -> Result<(), Error> {
    if path.is_empty() {
        return Ok(());
    }
    for elem in path.split('/') {
        validate_filename(elem).map_err(|e| Error::invalid(format!("{path:?}: {e}")))?;
    }
    Ok(())
}

pub(crate) fn validate_link_target(target: &[u8]) -> Result<(), String> {
    if target.is_empty() {
        return Err("empty link target".into());
    }
    if target.len() > wire::MAX_TARGET_LEN {
        return Err(format!(
            "link target longer than {} bytes",
            wire::MAX_TARGET_LEN
        ));
    }
    if target.contains(&0) {
        return Err("NUL not allowed in link target".into());
    }
    Ok(())
}
