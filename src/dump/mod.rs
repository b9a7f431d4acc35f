//! Serialization of an on-disk tree to the NAR format.
//!
//! The walk visits entries in lexicographic name order at every level, so
//! the produced archive is canonical: dumping the same tree twice yields
//! bit-identical bytes. Only the executable bit survives; timestamps,
//! ownership and other metadata are not represented in the format.

use std::fs::{File, Metadata};
use std::io::{Read, Write};
use std::os::unix::ffi::OsStringExt;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::{Error, Header, Writer};


/// Serializes the tree rooted at `path` to `w` in NAR format.
pub fn dump_path<W: Write, P: AsRef<Path>>(w: W, path: P) -> Result<(), Error> {
    dump_filtered(w, path.as_ref(), |_, _| true)
}

/// Like [`dump_path`], with a source filter.
///
/// The filter receives each entry's on-disk path and metadata; returning
/// `false` omits the entry, and for a directory its entire subtree. This
/// mimics the behaviour of the Nix function `builtins.filterSource`.
pub fn dump_path_filter<W, P, F>(w: W, path: P, filter: F) -> Result<(), Error>
where
    W: Write,
    P: AsRef<Path>,
    F: FnMut(&Path, &Metadata) -> bool,
{
    dump_filtered(w, path.as_ref(), filter)
}

#[instrument(skip(w, filter), err)]
fn dump_filtered<W: Write>(
    w: W,
    path: &Path,
    mut filter: impl FnMut(&Path, &Metadata) -> bool,
) -> Result<(), Error> {
    let mut nar = Writer::new(w);
    let mut it = WalkDir::new(path)
        .follow_links(false)
        .follow_root_links(false)
        .sort_by_file_name()
        .into_iter();
    let mut wrote = false;

    while let Some(entry) = it.next() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let out_path = entry
            .path()
            .strip_prefix(path)
            .expect("walkdir yielded an entry outside the root")
            .to_str()
            .ok_or_else(|| Error::invalid(format!("{:?}: filename is not UTF-8", entry.path())))?
            .to_owned();
        let meta = entry.metadata().map_err(|e| Error::Io(e.into()))?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if !filter(entry.path(), &meta) {
                debug!(path = %entry.path().display(), "directory filtered out");
                it.skip_current_dir();
                continue;
            }
            nar.write_header(&Header::directory(out_path))?;
        } else if file_type.is_file() {
            if !filter(entry.path(), &meta) {
                debug!(path = %entry.path().display(), "file filtered out");
                continue;
            }
            let executable = meta.permissions().mode() & 0o111 != 0;
            nar.write_header(&Header::regular(out_path, executable, meta.len()))?;

            let mut f = File::open(entry.path())?;
            let mut buf = [0u8; 8192];
            loop {
                let n = f.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                nar.write(&buf[..n])?;
            }
        } else if file_type.is_symlink() {
            if !filter(entry.path(), &meta) {
                debug!(path = %entry.path().display(), "symlink filtered out");
                continue;
            }
            let target = std::fs::read_link(entry.path())?;
            nar.write_header(&Header::symlink(
                out_path,
                target.into_os_string().into_vec(),
            ))?;
        } else {
            return Err(Error::UnknownFileType(
                entry.path().to_path_buf(),
                file_type,
            ));
        }
        wrote = true;
    }

    if !wrote {
        return Err(Error::invalid("entire path is excluded"));
    }
    nar.close()
}
