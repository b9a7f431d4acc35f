//! Streaming parser for the Nix archive format, aka NAR.
//!
//! [`Reader::next`] advances to the next entry in the archive (including
//! the first) and returns its [`Header`]; between calls, the reader serves
//! the current regular file's contents through [`Read`]. Entries arrive in
//! the archive's canonical depth-first order, with directory children
//! strictly ascending by name.

use std::io::{self, ErrorKind, Read};

use crate::header::{validate_filename, validate_link_target};
use crate::wire;
use crate::{Error, Header};

mod read;

enum State {
    /// Nothing consumed yet; the magic comes first.
    Start,
    /// Inside a regular file's contents.
    InFile { remaining: u64, padding: usize },
    /// Just entered a directory; the next token is `entry` or `)`.
    DirFresh,
    /// Just finished an entry; its closing `)` is still pending.
    DirBetween,
    /// The root node is complete; only EOF may follow.
    AtEof,
    /// Clean end of stream.
    Done,
}

/// Sequential access to the contents of a NAR archive.
pub struct Reader<R> {
    inner: R,
    state: State,
    /// Current directory's path including a trailing slash
    /// (empty at root level).
    prefix: String,
    /// Previous entry name per open directory, for ordering enforcement.
    prev_names: Vec<Option<String>>,
    /// Bytes consumed from the source so far.
    offset: u64,
    scratch: [u8; wire::MAX_TOKEN_LEN],
    /// Once set, every call replays this error.
    err: Option<Error>,
}

impl<R: Read> Reader<R> {
    pub fn new(inner: R) -> Self {
        Reader {
            inner,
            state: State::Start,
            prefix: String::new(),
            prev_names: Vec::new(),
            offset: 0,
            scratch: [0; wire::MAX_TOKEN_LEN],
            err: None,
        }
    }

    /// Advance to the next entry in the archive.
    ///
    /// Any unread data of the current regular file is discarded. Returns
    /// `Ok(None)` at the clean end of the archive; a stream that merely
    /// stops early surfaces as [`Error::UnexpectedEof`], and bytes after
    /// the root node's closer as [`Error::TrailingData`].
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<Header>, Error> {
        if let Some(e) = &self.err {
            return Err(e.clone());
        }
        match self.next_inner() {
            Err(e) => {
                self.err = Some(e.clone());
                Err(e)
            }
            ok => ok,
        }
    }

    /// Read up to `buf.len()` bytes of the current regular file's body.
    ///
    /// Returns `Ok(0)` once the body is exhausted, and also when the
    /// current entry is not a regular file. EOF from the source inside a
    /// body is [`Error::UnexpectedEof`].
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if let Some(e) = &self.err {
            return Err(e.clone());
        }
        let remaining = match self.state {
            State::InFile { remaining, .. } => remaining,
            _ => return Ok(0),
        };
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = buf.len().min(remaining.min(usize::MAX as u64) as usize);
        let n = loop {
            match self.inner.read(&mut buf[..want]) {
                Ok(0) => {
                    let e = Error::UnexpectedEof;
                    self.err = Some(e.clone());
                    return Err(e);
                }
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    let e = Error::Io(e);
                    self.err = Some(e.clone());
                    return Err(e);
                }
            }
        };

        self.offset += n as u64;
        if let State::InFile { remaining, .. } = &mut self.state {
            *remaining -= n as u64;
        }
        Ok(n)
    }

    fn next_inner(&mut self) -> Result<Option<Header>, Error> {
        match self.state {
            State::Start => {
                self.expect("nix-archive-1")?;
                return Ok(Some(self.parse_node(String::new())?));
            }
            State::InFile { remaining, padding } => {
                self.discard(remaining + padding as u64)?;
                self.expect(")")?;
                if self.prev_names.is_empty() {
                    // The root was a single file.
                    self.state = State::AtEof;
                } else {
                    self.state = State::DirBetween;
                }
            }
            State::DirFresh | State::DirBetween | State::AtEof => {}
            State::Done => return Ok(None),
        }

        if let State::DirBetween = self.state {
            // Close out the finished entry's parenthesis.
            self.expect(")")?;
            self.state = State::DirFresh;
        }

        while let State::DirFresh = self.state {
            let tok = read::small_string(&mut self.inner, &mut self.offset, &mut self.scratch)?;
            match tok {
                b")" => {
                    // The current directory node is closed.
                    self.prev_names.pop();
                    if self.prev_names.is_empty() {
                        // That was the root directory.
                        self.state = State::AtEof;
                    } else {
                        // Also close the directory's own entry,
                        // and continue in the parent.
                        self.expect(")")?;
                        self.pop_prefix();
                    }
                }
                b"entry" => {
                    self.expect("(")?;
                    self.expect("name")?;
                    let name = read::bytes(&mut self.inner, &mut self.offset, wire::MAX_NAME_LEN)?;
                    let name = String::from_utf8(name)
                        .map_err(|_| Error::invalid("entry name is not UTF-8"))?;
                    validate_filename(&name)
                        .map_err(|e| Error::invalid(format!("entry name: {e}")))?;
                    self.check_order(&name)?;
                    self.expect("node")?;
                    let path = format!("{}{}", self.prefix, name);
                    return Ok(Some(self.parse_node(path)?));
                }
                tok => {
                    return Err(Error::invalid(format!(
                        "directory: got {:?} token (expected \")\" or \"entry\")",
                        String::from_utf8_lossy(tok)
                    )));
                }
            }
        }

        // Only EOF may follow the root node.
        let mut probe = [0u8; 1];
        loop {
            match self.inner.read(&mut probe) {
                Ok(0) => {
                    self.state = State::Done;
                    return Ok(None);
                }
                Ok(_) => return Err(Error::TrailingData),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }

    /// Parse one `node`, after its wrapping tokens have been consumed.
    fn parse_node(&mut self, path: String) -> Result<Header, Error> {
        self.expect("(")?;
        self.expect("type")?;
        let tok = read::small_string(&mut self.inner, &mut self.offset, &mut self.scratch)?;
        match tok {
            b"regular" => {
                let tok =
                    read::small_string(&mut self.inner, &mut self.offset, &mut self.scratch)?;
                let executable = match tok {
                    b"executable" => {
                        self.expect("")?;
                        self.expect("contents")?;
                        true
                    }
                    b"contents" => false,
                    tok => {
                        return Err(Error::invalid(format!(
                            "regular: got {:?} token (expected \"executable\" or \"contents\")",
                            String::from_utf8_lossy(tok)
                        )));
                    }
                };
                let size = read::u64(&mut self.inner, &mut self.offset)?;
                if size >= 1 << 63 {
                    return Err(Error::UnsupportedSize(size));
                }
                let mut hdr = Header::regular(path, executable, size);
                hdr.content_offset = self.offset;
                self.state = State::InFile {
                    remaining: size,
                    padding: wire::padding_len(size),
                };
                Ok(hdr)
            }
            b"directory" => {
                if !path.is_empty() {
                    self.prefix = format!("{path}/");
                }
                self.prev_names.push(None);
                self.state = State::DirFresh;
                Ok(Header::directory(path))
            }
            b"symlink" => {
                self.expect("target")?;
                let target =
                    read::bytes(&mut self.inner, &mut self.offset, wire::MAX_TARGET_LEN)?;
                validate_link_target(&target)
                    .map_err(|e| Error::invalid(format!("symlink target: {e}")))?;
                self.expect(")")?;
                self.state = if self.prev_names.is_empty() {
                    State::AtEof
                } else {
                    State::DirBetween
                };
                Ok(Header::symlink(path, target))
            }
            tok => Err(Error::invalid(format!(
                "invalid node type {:?}",
                String::from_utf8_lossy(tok)
            ))),
        }
    }

    /// Enforce strict monotonicity of entry names within the
    /// current directory.
    fn check_order(&mut self, name: &str) -> Result<(), Error> {
        let slot = self
            .prev_names
            .last_mut()
            .expect("entry outside any directory");
        if let Some(prev) = slot {
            if prev.as_str() >= name {
                return Err(Error::OutOfOrder {
                    path: format!("{}{}", self.prefix, name),
                    prev: format!("{}{}", self.prefix, prev),
                });
            }
        }
        *slot = Some(name.to_owned());
        Ok(())
    }

    /// Drop the last component (and its slash) from the directory prefix.
    fn pop_prefix(&mut self) {
        let trimmed = &self.prefix[..self.prefix.len() - 1];
        let keep = trimmed.rfind('/').map_or(0, |i| i + 1);
        self.prefix.truncate(keep);
    }

    fn discard(&mut self, n: u64) -> Result<(), Error> {
        let copied = io::copy(&mut (&mut self.inner).take(n), &mut io::sink())?;
        self.offset += copied;
        if copied < n {
            return Err(Error::UnexpectedEof);
        }
        Ok(())
    }

    fn expect(&mut self, token: &str) -> Result<(), Error> {
        read::expect(&mut self.inner, &mut self.offset, &mut self.scratch, token)
    }
}

impl<R: Read> Read for Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Reader::read(self, buf).map_err(Into::into)
    }
}
