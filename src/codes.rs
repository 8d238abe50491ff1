//! Numeric error codes for `wasm-gas-meter`.
//!
//! Codes are grouped by [`crate::error::ErrorCategory`] in disjoint hundred
//! blocks, the way `wrt-error`'s `codes` module groups by category.

/// The module ended before the preamble's 8 bytes were read.
pub const TRUNCATED_PREAMBLE: u16 = 100;
/// The magic bytes were present but did not read `\0asm`.
pub const BAD_MAGIC: u16 = 101;
/// The version bytes were present but did not read `\1\0\0\0`.
pub const BAD_VERSION: u16 = 102;
/// A section id byte was not one of the 11 standard ids (0 is custom).
pub const UNKNOWN_SECTION_ID: u16 = 103;
/// A LEB128 sequence ran past the end of the available bytes.
pub const LEB128_TRUNCATED: u16 = 104;
/// A LEB128 sequence used more bytes than the target width allows.
pub const LEB128_OVERFLOW: u16 = 105;
/// An opcode byte had no entry in the opcode table.
pub const UNKNOWN_OPCODE: u16 = 106;
/// A section's parser consumed a different number of bytes than its
/// declared payload size.
pub const SECTION_SIZE_MISMATCH: u16 = 107;
/// A code body's op stream did not exactly fill its declared body size.
pub const CODE_BODY_SIZE_MISMATCH: u16 = 108;
/// A byte-level read ran past the end of the input.
pub const UNEXPECTED_EOF: u16 = 109;
/// A string field's declared length ran past the end of its section.
pub const STRING_OUT_OF_BOUNDS: u16 = 110;

/// The module already imports a function with the configured
/// `(module_str, field_str)` pair.
pub const DUPLICATE_METER_IMPORT: u16 = 200;
/// A function-type index referenced by a function entry has no matching
/// type-section entry.
pub const DANGLING_TYPE_INDEX: u16 = 201;

/// An op carries a `return_type` outside the four numeric types, or a
/// `const` op is missing its `return_type`.
pub const MISSING_RETURN_TYPE: u16 = 300;
/// An entity's field value cannot be represented by its declared kind.
pub const INCONSISTENT_ENTITY: u16 = 301;
