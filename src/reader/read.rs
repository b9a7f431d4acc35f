//! Helpers for consuming [`crate::wire`] format.
//!
//! Every helper advances `offset` by the number of bytes consumed, keeping
//! the reader's monotone byte counter accurate.

use std::io::{ErrorKind, Read};

use bstr::ByteSlice;

use crate::wire;
use crate::Error;

/// Fill `buf` from the reader, treating EOF as [`Error::UnexpectedEof`].
/// Inside the archive grammar, a short read is never a clean end.
pub fn exact<R: Read>(r: &mut R, offset: &mut u64, buf: &mut [u8]) -> Result<(), Error> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => Error::UnexpectedEof,
        _ => Error::Io(e),
    })?;
    *offset += buf.len() as u64;
    Ok(())
}

/// Consume a little-endian u64.
pub fn u64<R: Read>(r: &mut R, offset: &mut u64) -> Result<u64, Error> {
    let mut buf = [0; 8];
    exact(r, offset, &mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Consume a byte string whose payload fits `scratch`, returning the
/// payload. All purely syntactic tokens go through here.
pub fn small_string<'a, R: Read>(
    r: &mut R,
    offset: &mut u64,
    scratch: &'a mut [u8; wire::MAX_TOKEN_LEN],
) -> Result<&'a [u8], Error> {
    let len = self::u64(r, offset)?;
    if len > wire::MAX_TOKEN_LEN as u64 {
        return Err(Error::invalid(format!(
            "got string of length {len} (max {} in this context)",
            wire::MAX_TOKEN_LEN
        )));
    }
    let len = len as usize;
    let padded = len + wire::padding_len(len as u64);

    exact(r, offset, &mut scratch[..padded])?;
    if scratch[len..padded].iter().any(|&b| b != 0) {
        return Err(Error::invalid("padding is not all zeroes"));
    }
    Ok(&scratch[..len])
}

/// Consume a byte string of up to `max_len` payload bytes.
pub fn bytes<R: Read>(r: &mut R, offset: &mut u64, max_len: usize) -> Result<Vec<u8>, Error> {
    let len = self::u64(r, offset)?;
    if len > max_len as u64 {
        return Err(Error::invalid(format!(
            "got string of length {len} (max {max_len} in this context)"
        )));
    }
    let len = len as usize;

    // read the payload and padding in one go
    let mut buf = vec![0; len + wire::padding_len(len as u64)];
    exact(r, offset, &mut buf)?;

    // verify that the padding is all zeroes
    for b in buf.drain(len..) {
        if b != 0 {
            return Err(Error::invalid("padding is not all zeroes"));
        }
    }
    Ok(buf)
}

/// Consume a known token.
pub fn expect<R: Read>(
    r: &mut R,
    offset: &mut u64,
    scratch: &mut [u8; wire::MAX_TOKEN_LEN],
    token: &str,
) -> Result<(), Error> {
    let got = small_string(r, offset, scratch)?;
    if got != token.as_bytes() {
        return Err(Error::invalid(format!(
            "got {:?} token (expected {token:?} token)",
            got.as_bstr()
        )));
    }
    Ok(())
}
