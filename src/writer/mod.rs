//! Streaming serializer for the Nix archive format, aka NAR.
//!
//! [`Writer::write_header`] begins a new entry with the provided
//! [`Header`]; for regular files the writer then accepts that file's data
//! through [`Write`]. The caller provides entries in sorted depth-first
//! traversal order and calls [`Writer::close`] at the end to finish the
//! stream; intermediate directories are materialized automatically.
//!
//! ```rust
//! use nix_nar::{Header, Writer};
//!
//! let mut sink: Vec<u8> = Vec::new();
//! let mut nar = Writer::new(&mut sink);
//! nar.write_header(&Header::directory(""))?;
//! nar.write_header(&Header::regular("hello.txt", false, 6))?;
//! nar.write(b"hello\n")?;
//! nar.close()?;
//! # Ok::<(), nix_nar::Error>(())
//! ```

use std::io::{self, BufWriter, Write};

use crate::wire;
use crate::{Error, Header, NodeKind};

pub(crate) mod delta;

use delta::{components, tree_delta};

enum State {
    /// Nothing written yet.
    Init,
    /// Inside a regular file's contents.
    InFile { remaining: u64, padding: usize },
    /// A node was completed; the cursor sits at `last_path`.
    Node,
    /// The archive is closed.
    End,
}

/// Sequential writing of a NAR archive.
///
/// Small token writes are coalesced in an internal buffer and flushed
/// through to the sink on [`Writer::close`].
pub struct Writer<W: Write> {
    inner: BufWriter<W>,
    state: State,
    /// Path of the last header written.
    last_path: String,
    last_is_dir: bool,
    /// Bytes emitted so far (including any still buffered).
    offset: u64,
    /// Once set, every call replays this error.
    err: Option<Error>,
}

impl<W: Write> Writer<W> {
    pub fn new(w: W) -> Self {
        Writer {
            inner: BufWriter::new(w),
            state: State::Init,
            last_path: String::new(),
            last_is_dir: false,
            offset: 0,
            err: None,
        }
    }

    /// Write `hdr` and prepare to accept the entry's contents.
    ///
    /// `hdr.size` determines how many bytes can be written for a regular
    /// file. Any parent directories named in `hdr.path` that have not been
    /// written yet are written automatically; when the first header has a
    /// non-empty path, the root directory itself is synthesized. Paths must
    /// be strictly greater than all previously written paths in traversal
    /// order, or [`Error::OutOfOrder`] is returned.
    pub fn write_header(&mut self, hdr: &Header) -> Result<(), Error> {
        if let Some(e) = &self.err {
            return Err(e.clone());
        }
        match self.write_header_inner(hdr) {
            Err(e) => {
                self.err = Some(e.clone());
                Err(e)
            }
            ok => ok,
        }
    }

    fn write_header_inner(&mut self, hdr: &Header) -> Result<(), Error> {
        if let State::End = self.state {
            return Err(Error::invalid("archive already closed"));
        }
        hdr.validate()?;

        if let State::Init = self.state {
            self.write_all(&wire::TOK_NAR)?;
            if hdr.path.is_empty() {
                self.node_body(hdr)?;
                self.last_is_dir = hdr.is_dir();
                return Ok(());
            }
            // The first entry is below the root: synthesize the
            // root directory.
            self.write_all(&wire::TOK_DIR)?;
            self.state = State::Node;
            self.last_is_dir = true;
        } else {
            if hdr.path.is_empty() {
                return Err(Error::OutOfOrder {
                    path: hdr.path.clone(),
                    prev: self.last_path.clone(),
                });
            }
            self.finish_file()?;
        }

        let (pop, new_dirs) = tree_delta(&self.last_path, self.last_is_dir, &hdr.path)?;

        if !(self.last_is_dir && delta::descends(&self.last_path, &hdr.path)) {
            // The previous node is done: close it (directories still have
            // their node open) and its enclosing entry.
            if self.last_is_dir {
                self.write_all(&wire::TOK_PAR)?;
            }
            if !self.last_path.is_empty() {
                self.write_all(&wire::TOK_PAR)?;
            }
        }
        for _ in 0..pop {
            // Close a directory node and its entry.
            self.write_all(&wire::TOK_PAR)?;
            self.write_all(&wire::TOK_PAR)?;
        }
        for dir in components(new_dirs) {
            self.write_all(&wire::TOK_ENT)?;
            self.write_str(dir.as_bytes())?;
            self.write_all(&wire::TOK_NOD)?;
        }

        let name = hdr.path.rsplit('/').next().unwrap_or(&hdr.path);
        self.write_all(&wire::TOK_ENT)?;
        self.write_str(name.as_bytes())?;
        self.write_all(&wire::TOK_NOD)?;
        self.node_body(hdr)?;

        self.last_path.clear();
        self.last_path.push_str(&hdr.path);
        self.last_is_dir = hdr.is_dir();
        Ok(())
    }

    /// Emit the node body for `hdr`, minus its wrapping tokens.
    fn node_body(&mut self, hdr: &Header) -> Result<(), Error> {
        match hdr.kind {
            NodeKind::Regular => {
                self.write_all(if hdr.executable {
                    &wire::TOK_EXE
                } else {
                    &wire::TOK_REG
                })?;
                self.write_all(&hdr.size.to_le_bytes())?;
                self.state = State::InFile {
                    remaining: hdr.size,
                    padding: wire::padding_len(hdr.size),
                };
            }
            NodeKind::Directory => {
                self.write_all(&wire::TOK_DIR)?;
                self.state = State::Node;
            }
            NodeKind::Symlink => {
                self.write_all(&wire::TOK_SYM)?;
                self.write_str(&hdr.link_target)?;
                self.write_all(&wire::TOK_PAR)?;
                self.state = State::Node;
            }
        }
        Ok(())
    }

    /// Write to the current regular file's contents.
    ///
    /// Returns [`Error::WriteTooLong`] when more than `size` bytes are
    /// written after [`Writer::write_header`], and also when the current
    /// entry is not a regular file.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        if let Some(e) = &self.err {
            return Err(e.clone());
        }
        let remaining = match &mut self.state {
            State::InFile { remaining, .. } => remaining,
            _ => {
                let e = Error::WriteTooLong;
                self.err = Some(e.clone());
                return Err(e);
            }
        };
        if buf.len() as u64 > *remaining {
            let e = Error::WriteTooLong;
            self.err = Some(e.clone());
            return Err(e);
        }
        *remaining -= buf.len() as u64;

        match self.inner.write_all(buf) {
            Ok(()) => {
                self.offset += buf.len() as u64;
                Ok(buf.len())
            }
            Err(e) => {
                let e = Error::Io(e);
                self.err = Some(e.clone());
                Err(e)
            }
        }
    }

    /// The number of bytes of archive emitted so far.
    ///
    /// Right after a regular file's header has been written, this is the
    /// offset its contents begin at.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Close the archive by writing the footer and flushing the sink.
    ///
    /// Errors if the current file is not fully written, or if no header
    /// was ever written.
    pub fn close(&mut self) -> Result<(), Error> {
        if let Some(e) = &self.err {
            return Err(e.clone());
        }
        match self.close_inner() {
            Err(e) => {
                self.err = Some(e.clone());
                Err(e)
            }
            ok => ok,
        }
    }

    fn close_inner(&mut self) -> Result<(), Error> {
        match self.state {
            State::Init => return Err(Error::invalid("empty archive")),
            State::End => return Err(Error::invalid("archive already closed")),
            _ => {}
        }
        self.finish_file()?;

        // Balance the entry of the last node, every open directory,
        // and the root.
        let open_dir = if self.last_is_dir {
            self.last_path.as_str()
        } else {
            delta::parent(&self.last_path)
        };
        let mut closers = 2 * components(open_dir).count();
        if self.last_is_dir || !self.last_path.is_empty() {
            closers += 1;
        }
        if !self.last_path.is_empty() && !self.last_is_dir {
            closers += 1;
        }
        for _ in 0..closers {
            self.write_all(&wire::TOK_PAR)?;
        }

        self.state = State::End;
        self.inner.flush().map_err(Error::Io)
    }

    /// Close out an in-progress regular file node.
    fn finish_file(&mut self) -> Result<(), Error> {
        if let State::InFile { remaining, padding } = self.state {
            if remaining > 0 {
                return Err(Error::invalid(format!(
                    "{:?}: file contents short by {remaining} bytes",
                    self.last_path
                )));
            }
            self.pad(padding)?;
            self.write_all(&wire::TOK_PAR)?;
            self.state = State::Node;
        }
        Ok(())
    }

    /// Emit a length-prefixed, padded byte string.
    fn write_str(&mut self, s: &[u8]) -> Result<(), Error> {
        self.write_all(&(s.len() as u64).to_le_bytes())?;
        self.write_all(s)?;
        self.pad(wire::padding_len(s.len() as u64))
    }

    fn pad(&mut self, n: usize) -> Result<(), Error> {
        match n {
            0 => Ok(()),
            n => self.write_all(&[0u8; 8][..n]),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), Error> {
        self.inner.write_all(buf).map_err(Error::Io)?;
        self.offset += buf.len() as u64;
        Ok(())
    }
}

impl<W: Write> Write for Writer<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Writer::write(self, buf).map_err(Into::into)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
