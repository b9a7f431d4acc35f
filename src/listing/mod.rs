//! NAR listings, aka `.ls` files.
//!
//! A listing is the tree-shaped index of a NAR file: one node per entry,
//! with each regular file annotated with the offset of its contents in the
//! archive (`narOffset`). Binary caches serve listings next to their NAR
//! files so that clients can read single files without streaming the whole
//! archive; see [`crate::NarFs`] for the reading side.
//!
//! Note that a listing offers no integrity information. Validating the
//! bytes found at an offset is the caller's responsibility.

use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::header::validate_filename;
use crate::writer::delta::{components, parent};
use crate::{Error, Header, NodeKind, Reader};

#[cfg(test)]
mod test;

/// The parsed representation of a listing.
///
/// Serializes to and from the version-1 JSON form
/// `{"version":1,"root":{…}}`. Unknown fields and versions are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Listing {
    version: ListingVersion<1>,
    pub root: ListingNode,
}

impl Listing {
    pub fn new(root: ListingNode) -> Self {
        Listing {
            version: ListingVersion,
            root,
        }
    }

    /// Locates the node for a relative slash-separated path, without
    /// following symlinks. `""` and `"."` name the root.
    pub fn locate(&self, path: &str) -> Option<&ListingNode> {
        let mut cur = &self.root;
        for comp in components(path) {
            match comp {
                "." => continue,
                ".." => return None,
                name => match cur {
                    ListingNode::Directory { entries } => cur = entries.get(name)?,
                    _ => return None,
                },
            }
        }
        Some(cur)
    }
}

/// One node of a [`Listing`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ListingNode {
    Regular {
        executable: bool,
        size: u64,
        #[serde(rename = "narOffset")]
        nar_offset: u64,
    },
    Directory {
        entries: BTreeMap<String, ListingNode>,
    },
    Symlink {
        target: String,
    },
}

impl ListingNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            ListingNode::Regular { .. } => NodeKind::Regular,
            ListingNode::Directory { .. } => NodeKind::Directory,
            ListingNode::Symlink { .. } => NodeKind::Symlink,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, ListingNode::Directory { .. })
    }
}

/// Indexes a NAR file, reading it from start to end.
pub fn list<R: Read>(r: R) -> Result<Listing, Error> {
    let mut nr = Reader::new(r);

    let root_hdr = match nr.next()? {
        Some(hdr) => hdr,
        None => return Err(Error::invalid("empty archive")),
    };
    if !root_hdr.path.is_empty() {
        return Err(Error::invalid("first entry is not the root"));
    }
    let mut root = node_for(&root_hdr)?;

    while let Some(hdr) = nr.next()? {
        let node = node_for(&hdr)?;
        let name = hdr.path.rsplit('/').next().unwrap_or(&hdr.path);
        match lookup_mut(&mut root, parent(&hdr.path)) {
            Some(ListingNode::Directory { entries }) => {
                entries.insert(name.to_owned(), node);
            }
            // The decoder only yields entries below directories it has
            // already yielded.
            _ => return Err(Error::invalid(format!("{:?}: parent missing", hdr.path))),
        }
    }
    Ok(Listing::new(root))
}

fn node_for(hdr: &Header) -> Result<ListingNode, Error> {
    Ok(match hdr.kind {
        NodeKind::Regular => ListingNode::Regular {
            executable: hdr.executable,
            size: hdr.size,
            nar_offset: hdr.content_offset,
        },
        NodeKind::Directory => ListingNode::Directory {
            entries: BTreeMap::new(),
        },
        NodeKind::Symlink => ListingNode::Symlink {
            target: String::from_utf8(hdr.link_target.to_vec()).map_err(|_| {
                Error::invalid(format!("{:?}: symlink target is not UTF-8", hdr.path))
            })?,
        },
    })
}

fn lookup_mut<'a>(root: &'a mut ListingNode, path: &str) -> Option<&'a mut ListingNode> {
    let mut cur = root;
    for comp in components(path) {
        match cur {
            ListingNode::Directory { entries } => cur = entries.get_mut(comp)?,
            _ => return None,
        }
    }
    Some(cur)
}

/// Version witness: (de)serializes as the integer `V` and rejects
/// everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListingVersion<const V: u8>;

impl<const V: u8> Serialize for ListingVersion<V> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(V)
    }
}

impl<'de, const V: u8> Deserialize<'de> for ListingVersion<V> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        if value == V {
            Ok(ListingVersion::<V>)
        } else {
            Err(serde::de::Error::custom(format!("unsupported version {value}")))
        }
    }
}

/// All fields of any node type, for strict decoding: serde cannot reject
/// unknown fields on an internally tagged enum, so nodes deserialize
/// through this and [`TryFrom`] checks the field/type combinations.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawNode {
    #[serde(rename = "type")]
    kind: RawKind,
    executable: Option<bool>,
    size: Option<u64>,
    #[serde(rename = "narOffset")]
    nar_offset: Option<u64>,
    entries: Option<BTreeMap<String, ListingNode>>,
    target: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawKind {
    Regular,
    Directory,
    Symlink,
}

impl TryFrom<RawNode> for ListingNode {
    type Error = String;

    fn try_from(raw: RawNode) -> Result<Self, String> {
        let kind = match raw.kind {
            RawKind::Regular => "regular",
            RawKind::Directory => "directory",
            RawKind::Symlink => "symlink",
        };
        let disallow = |field: &str, set: bool| {
            if set {
                Err(format!("{field} set on {kind}"))
            } else {
                Ok(())
            }
        };

        match raw.kind {
            RawKind::Regular => {
                disallow("entries", raw.entries.is_some())?;
                disallow("target", raw.target.is_some())?;
                let size = raw.size.ok_or("missing size")?;
                if size >= 1 << 63 {
                    return Err(format!("file too large ({size} bytes)"));
                }
                Ok(ListingNode::Regular {
                    executable: raw.executable.unwrap_or(false),
                    size,
                    nar_offset: raw.nar_offset.ok_or("missing narOffset")?,
                })
            }
            RawKind::Directory => {
                disallow("executable", raw.executable.is_some())?;
                disallow("size", raw.size.is_some())?;
                disallow("narOffset", raw.nar_offset.is_some())?;
                disallow("target", raw.target.is_some())?;
                let entries = raw.entries.ok_or("missing entries")?;
                for name in entries.keys() {
                    validate_filename(name).map_err(|e| format!("entries: {e}"))?;
                }
                Ok(ListingNode::Directory { entries })
            }
            RawKind::Symlink => {
                disallow("executable", raw.executable.is_some())?;
                disallow("size", raw.size.is_some())?;
                disallow("narOffset", raw.nar_offset.is_some())?;
                disallow("entries", raw.entries.is_some())?;
                let target = raw.target.ok_or("missing target")?;
                if target.is_empty() {
                    return Err("symlink target empty".into());
                }
                Ok(ListingNode::Symlink { target })
            }
        }
    }
}

impl<'de> Deserialize<'de> for ListingNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawNode::deserialize(deserializer)?;
        raw.try_into().map_err(serde::de::Error::custom)
    }
}
