//! The NAR wire format.
//!
//! # Encoding
//!
//! The only primitive on the wire is the byte string: a 64-bit unsigned
//! little-endian length, the payload, and zero bytes padding the payload to
//! 8-byte alignment. Integers are byte strings of length 8 and carry no
//! padding. There is no framing beyond token concatenation; the grammar
//! alone delimits entries.
//!
//! # Grammar
//!
//! ```plain
//! archive ::= "nix-archive-1" node
//!
//! node ::= "(" "type" "symlink" "target" string ")"
//!      ||= "(" "type" "regular" ("executable" "")? "contents" string ")"
//!      ||= "(" "type" "directory" entry* ")"
//!
//! entry ::= "entry" "(" "name" string "node" node ")"
//! ```
//!
//! The purely syntactic runs of the grammar collapse into fixed byte
//! sequences, which is how both sides of the codec handle them:
//!
//! ```plain
//! archive ::= TOK_NAR node
//! node ::= TOK_SYM string             TOK_PAR
//!      ||= (TOK_REG | TOK_EXE) string TOK_PAR
//!      ||= TOK_DIR entry*             TOK_PAR
//!
//! entry ::= TOK_ENT string TOK_NOD node TOK_PAR
//! ```
//!
//! # Restrictions
//!
//! These are enforced by [`crate::reader`] and [`crate::writer`], not here:
//! directory entry names are 1 to [`MAX_NAME_LEN`] bytes, contain neither
//! `/` nor NUL, are not `.` or `..`, and appear in strictly ascending byte
//! order within a directory. Symlink targets are 1 to [`MAX_TARGET_LEN`]
//! non-NUL bytes.

/// Maximum length of a directory entry name (Linux `NAME_MAX`).
pub const MAX_NAME_LEN: usize = 255;

/// Maximum length of a symlink target (Linux `PATH_MAX - 1`).
pub const MAX_TARGET_LEN: usize = 4095;

/// Maximum payload length of any other token the grammar knows.
/// Everything from `"("` to `"nix-archive-1"` fits in a 16-byte scratch
/// buffer, so token dispatch never allocates.
pub const MAX_TOKEN_LEN: usize = 16;

pub const TOK_NAR: [u8; 56] = *b"\x0d\0\0\0\0\0\0\0nix-archive-1\0\0\0\x01\0\0\0\0\0\0\0(\0\0\0\0\0\0\0\x04\0\0\0\0\0\0\0type\0\0\0\0";
pub const TOK_SYM: [u8; 32] = *b"\x07\0\0\0\0\0\0\0symlink\0\x06\0\0\0\0\0\0\0target\0\0";
pub const TOK_REG: [u8; 32] = *b"\x07\0\0\0\0\0\0\0regular\0\x08\0\0\0\0\0\0\0contents";
pub const TOK_EXE: [u8; 64] = *b"\x07\0\0\0\0\0\0\0regular\0\x0a\0\0\0\0\0\0\0executable\0\0\0\0\0\0\0\0\0\0\0\0\0\0\x08\0\0\0\0\0\0\0contents";
pub const TOK_DIR: [u8; 24] = *b"\x09\0\0\0\0\0\0\0directory\0\0\0\0\0\0\0";
pub const TOK_ENT: [u8; 48] = *b"\x05\0\0\0\0\0\0\0entry\0\0\0\x01\0\0\0\0\0\0\0(\0\0\0\0\0\0\0\x04\0\0\0\0\0\0\0name\0\0\0\0";
pub const TOK_NOD: [u8; 48] = *b"\x04\0\0\0\0\0\0\0node\0\0\0\0\x01\0\0\0\0\0\0\0(\0\0\0\0\0\0\0\x04\0\0\0\0\0\0\0type\0\0\0\0";
pub const TOK_PAR: [u8; 16] = *b"\x01\0\0\0\0\0\0\0)\0\0\0\0\0\0\0";

/// Number of zero bytes following a payload of `n` bytes.
pub const fn padding_len(n: u64) -> usize {
    (8 - n % 8) as usize % 8
}
