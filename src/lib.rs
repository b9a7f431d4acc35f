//! Access to Nix Archive (NAR) files.
//!
//! NAR is the canonical serialization of a filesystem tree used by Nix to
//! hash and distribute build results. It stores regular files, directories
//! and symlinks in a reproducible binary form, without timestamps or any
//! other filesystem metadata, so that two trees with identical content
//! produce bit-identical archives. Archives can be read and written in a
//! streaming manner.
//!
//! The crate is built around four pieces:
//!
//! * [`Reader`] — a pull parser yielding one [`Header`] per entry, with the
//!   current regular file's contents readable through [`std::io::Read`],
//! * [`Writer`] — a push encoder accepting headers in sorted traversal
//!   order, materializing intermediate directories automatically,
//! * [`list`] — an indexer producing a [`Listing`], the offset-annotated
//!   tree that permits random access into a NAR file via [`NarFs`],
//! * [`dump_path`] — a filesystem adapter serializing an on-disk tree.

pub mod dump;
mod error;
pub mod fs;
mod header;
pub mod listing;
pub mod reader;
#[cfg(test)]
mod testutil;
pub mod wire;
pub mod writer;

pub use dump::{dump_path, dump_path_filter};
pub use error::Error;
pub use fs::NarFs;
pub use header::{Header, NodeKind};
pub use listing::{list, Listing, ListingNode};
pub use reader::Reader;
pub use writer::Writer;

/// The file extension for a file containing a Nix Archive.
pub const EXTENSION: &str = ".nar";

/// The MIME content type for a Nix Archive file.
pub const MIME_TYPE: &str = "application/x-nix-nar";
