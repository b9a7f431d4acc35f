//! Shared fixtures for the test suite.
//!
//! Archives are built from their token sequence rather than shipped as
//! binary files; [`nar`] applies the wire encoding (length prefix plus
//! 8-byte zero padding) to each payload.

use crate::wire;

pub const HELLO_WORLD: &[u8] = b"Hello, World!\n";
pub const HELLO_SCRIPT: &[u8] = b"#!/bin/sh\ncat \"$(dirname \"$0\")/../hello.txt\"\n";

/// Encode a sequence of byte-string payloads in the wire format.
pub fn nar(tokens: &[&[u8]]) -> Vec<u8> {
    let mut out = vec![];
    for t in tokens {
        out.extend_from_slice(&(t.len() as u64).to_le_bytes());
        out.extend_from_slice(t);
        out.extend_from_slice(&[0u8; 8][..wire::padding_len(t.len() as u64)]);
    }
    out
}

/// An archive holding a single regular file with the given contents.
pub fn file_nar(executable: bool, contents: &[u8]) -> Vec<u8> {
    let mut tokens: Vec<&[u8]> = vec![b"nix-archive-1", b"(", b"type", b"regular"];
    if executable {
        tokens.push(b"executable");
        tokens.push(b"");
    }
    tokens.extend_from_slice(&[b"contents", contents, b")"]);
    nar(&tokens)
}

/// The tree `{a.txt: "AAA\n", bin/hello.sh: <script, executable>,
/// hello.txt: "Hello, World!\n"}`.
pub fn mini_drv() -> Vec<u8> {
    nar(&[
        b"nix-archive-1",
        b"(",
        b"type",
        b"directory",
        // a.txt
        b"entry",
        b"(",
        b"name",
        b"a.txt",
        b"node",
        b"(",
        b"type",
        b"regular",
        b"contents",
        b"AAA\n",
        b")",
        b")",
        // bin/
        b"entry",
        b"(",
        b"name",
        b"bin",
        b"node",
        b"(",
        b"type",
        b"directory",
        // bin/hello.sh
        b"entry",
        b"(",
        b"name",
        b"hello.sh",
        b"node",
        b"(",
        b"type",
        b"regular",
        b"executable",
        b"",
        b"contents",
        HELLO_SCRIPT,
        b")",
        b")",
        b")",
        b")",
        // hello.txt
        b"entry",
        b"(",
        b"name",
        b"hello.txt",
        b"node",
        b"(",
        b"type",
        b"regular",
        b"contents",
        HELLO_WORLD,
        b")",
        b")",
        b")",
    ])
}

/// `{foo: {b: symlink to foo}, foo-a: symlink to foo}` — the name `foo-a`
/// sorts after `foo`, so closing `foo` must not close the root.
pub fn common_prefix() -> Vec<u8> {
    nar(&[
        b"nix-archive-1",
        b"(",
        b"type",
        b"directory",
        b"entry",
        b"(",
        b"name",
        b"foo",
        b"node",
        b"(",
        b"type",
        b"directory",
        b"entry",
        b"(",
        b"name",
        b"b",
        b"node",
        b"(",
        b"type",
        b"symlink",
        b"target",
        b"foo",
        b")",
        b")",
        b")",
        b")",
        b"entry",
        b"(",
        b"name",
        b"foo-a",
        b"node",
        b"(",
        b"type",
        b"symlink",
        b"target",
        b"foo",
        b")",
        b")",
        b")",
    ])
}

/// Byte offset of `needle` within `haystack`; the fixture contents are
/// chosen to be unique within their archives.
pub fn offset_of(haystack: &[u8], needle: &[u8]) -> u64 {
    assert!(!needle.is_empty());
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
        .expect("needle not present in archive") as u64
}
