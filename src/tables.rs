//! Opcode and immediate tables (spec.md §4.2): bidirectional mappings
//! between binary bytes and their mnemonic/name form.
//!
//! Grounded on `wrt-format/src/binary.rs`'s opcode/section/type byte
//! constants for the general shape, and
//! `examples/original_source/toolkit/wasm2json.go` /
//! `examples/original_source/toolkit/types.go` for the exact old-MVP
//! mnemonic set (`get_local`, `current_memory`, `grow_memory`, ...) that
//! spec.md's branch-op list depends on. A `match` replaces the teacher's
//! flat maps, per spec.md §9's note on reflection/name-based dispatch.

use crate::codes;
use crate::error::{Error, Result};

/// A WebAssembly MVP language type byte, as used for value types, table
/// element types, the `func` type-form marker, and the `block_type`
/// immediate's "no result" marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LangType {
    I32,
    I64,
    F32,
    F64,
    AnyFunc,
    Func,
    /// The `0x40` byte: an empty block type (no params, no result).
    BlockTypeVoid,
}

impl LangType {
    /// Decode a language-type byte.
    pub fn from_byte(byte: u8) -> Result<Self> {
        Ok(match byte {
            0x7f => Self::I32,
            0x7e => Self::I64,
            0x7d => Self::F32,
            0x7c => Self::F64,
            0x70 => Self::AnyFunc,
            0x60 => Self::Func,
            0x40 => Self::BlockTypeVoid,
            other => {
                return Err(Error::decode(
                    codes::UNKNOWN_OPCODE,
                    format!("unknown language type byte 0x{other:02x}"),
                ))
            }
        })
    }

    /// Encode as a language-type byte.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::I32 => 0x7f,
            Self::I64 => 0x7e,
            Self::F32 => 0x7d,
            Self::F64 => 0x7c,
            Self::AnyFunc => 0x70,
            Self::Func => 0x60,
            Self::BlockTypeVoid => 0x40,
        }
    }

    /// The mnemonic name used in typed-opcode prefixes and JSON/text forms.
    pub fn name(self) -> &'static str {
        match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::AnyFunc => "anyFunc",
            Self::Func => "func",
            Self::BlockTypeVoid => "block_type",
        }
    }

    /// Parse a mnemonic name back into a language type.
    pub fn from_name(name: &str) -> Result<Self> {
        Ok(match name {
            "i32" => Self::I32,
            "i64" => Self::I64,
            "f32" => Self::F32,
            "f64" => Self::F64,
            "anyFunc" => Self::AnyFunc,
            "func" => Self::Func,
            "block_type" => Self::BlockTypeVoid,
            other => {
                return Err(Error::decode(
                    codes::UNKNOWN_OPCODE,
                    format!("unknown language type name {other:?}"),
                ))
            }
        })
    }
}

/// `external_kind`: the kind of definition an import or export refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalKind {
    Function,
    Table,
    Memory,
    Global,
}

impl ExternalKind {
    /// Decode an external-kind byte.
    pub fn from_byte(byte: u8) -> Result<Self> {
        Ok(match byte {
            0x00 => Self::Function,
            0x01 => Self::Table,
            0x02 => Self::Memory,
            0x03 => Self::Global,
            other => {
                return Err(Error::decode(
                    codes::UNKNOWN_OPCODE,
                    format!("unknown external_kind byte 0x{other:02x}"),
                ))
            }
        })
    }

    /// Encode as an external-kind byte.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Function => 0x00,
            Self::Table => 0x01,
            Self::Memory => 0x02,
            Self::Global => 0x03,
        }
    }

    /// The name used in the data model (`"function"`, `"table"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Table => "table",
            Self::Memory => "memory",
            Self::Global => "global",
        }
    }
}

/// One of the 11 standard Wasm section ids, plus `Custom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionId {
    Custom,
    Type,
    Import,
    Function,
    Table,
    Memory,
    Global,
    Export,
    Start,
    Element,
    Code,
    Data,
}

impl SectionId {
    /// Decode a section id byte.
    pub fn from_byte(byte: u8) -> Result<Self> {
        Ok(match byte {
            0 => Self::Custom,
            1 => Self::Type,
            2 => Self::Import,
            3 => Self::Function,
            4 => Self::Table,
            5 => Self::Memory,
            6 => Self::Global,
            7 => Self::Export,
            8 => Self::Start,
            9 => Self::Element,
            10 => Self::Code,
            11 => Self::Data,
            other => {
                return Err(Error::decode(
                    codes::UNKNOWN_SECTION_ID,
                    format!("unknown section id {other}"),
                ))
            }
        })
    }

    /// Encode as a section id byte.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Custom => 0,
            Self::Type => 1,
            Self::Import => 2,
            Self::Function => 3,
            Self::Table => 4,
            Self::Memory => 5,
            Self::Global => 6,
            Self::Export => 7,
            Self::Start => 8,
            Self::Element => 9,
            Self::Code => 10,
            Self::Data => 11,
        }
    }
}

/// The shape of an op's immediate operand, keyed by mnemonic (spec.md
/// §4.2). `const` ops are looked up by their `return_type` instead of
/// their name — callers pass the effective key, not the raw name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmediateKind {
    BlockType,
    Varuint1,
    Varuint32,
    Varint32,
    Varint64,
    Uint32,
    Uint64,
    BrTable,
    CallIndirect,
    MemoryImmediate,
}

/// Look up the immediate kind for an op, given its effective key: its
/// `name`, except when `name == "const"`, in which case the caller passes
/// the op's `return_type` name instead (spec.md §4.2).
pub fn immediate_kind(key: &str) -> Option<ImmediateKind> {
    use ImmediateKind::*;
    Some(match key {
        "block" | "loop" | "if" => BlockType,
        "br" | "br_if" => Varuint32,
        "br_table" => BrTable,
        "call" => Varuint32,
        "call_indirect" => CallIndirect,
        "get_local" | "set_local" | "tee_local" => Varuint32,
        "get_global" | "set_global" => Varuint32,
        "load" | "load8_s" | "load8_u" | "load16_s" | "load16_u" | "load32_s" | "load32_u"
        | "store" | "store8" | "store16" | "store32" => MemoryImmediate,
        "current_memory" | "grow_memory" => Varuint1,
        "i32" => Varint32,
        "i64" => Varint64,
        "f32" => Uint32,
        "f64" => Uint64,
        _ => return None,
    })
}

/// Decode an opcode byte into `(return_type, name)`. Typed opcodes (e.g.
/// `i32.add`) return `Some(type) `for the prefix; untyped opcodes (e.g.
/// `call`) return `None`.
pub fn opcode_from_byte(byte: u8) -> Result<(Option<&'static str>, &'static str)> {
    let mnemonic = mnemonic_for_byte(byte).ok_or_else(|| {
        Error::decode(codes::UNKNOWN_OPCODE, format!("unknown opcode byte 0x{byte:02x}"))
    })?;
    Ok(split_mnemonic(mnemonic))
}

/// Split a (possibly typed) mnemonic `"i32.add"` into `(Some("i32"),
/// "add")`, or `"drop"` into `(None, "drop")`.
pub fn split_mnemonic(mnemonic: &'static str) -> (Option<&'static str>, &'static str) {
    match mnemonic.split_once('.') {
        Some((ty, name)) => (Some(ty), name),
        None => (None, mnemonic),
    }
}

/// Look up the opcode byte for a `(return_type, name)` pair.
pub fn opcode_to_byte(return_type: Option<&str>, name: &str) -> Result<u8> {
    let mnemonic = match return_type {
        Some(ty) => format!("{ty}.{name}"),
        None => name.to_string(),
    };
    byte_for_mnemonic(&mnemonic).ok_or_else(|| {
        Error::encode(codes::UNKNOWN_OPCODE, format!("unknown mnemonic {mnemonic:?}"))
    })
}

fn mnemonic_for_byte(byte: u8) -> Option<&'static str> {
    Some(match byte {
        0x00 => "unreachable",
        0x01 => "nop",
        0x02 => "block",
        0x03 => "loop",
        0x04 => "if",
        0x05 => "else",
        0x0b => "end",
        0x0c => "br",
        0x0d => "br_if",
        0x0e => "br_table",
        0x0f => "return",
        0x10 => "call",
        0x11 => "call_indirect",
        0x1a => "drop",
        0x1b => "select",
        0x20 => "get_local",
        0x21 => "set_local",
        0x22 => "tee_local",
        0x23 => "get_global",
        0x24 => "set_global",
        0x28 => "i32.load",
        0x29 => "i64.load",
        0x2a => "f32.load",
        0x2b => "f64.load",
        0x2c => "i32.load8_s",
        0x2d => "i32.load8_u",
        0x2e => "i32.load16_s",
        0x2f => "i32.load16_u",
        0x30 => "i64.load8_s",
        0x31 => "i64.load8_u",
        0x32 => "i64.load16_s",
        0x33 => "i64.load16_u",
        0x34 => "i64.load32_s",
        0x35 => "i64.load32_u",
        0x36 => "i32.store",
        0x37 => "i64.store",
        0x38 => "f32.store",
        0x39 => "f64.store",
        0x3a => "i32.store8",
        0x3b => "i32.store16",
        0x3c => "i64.store8",
        0x3d => "i64.store16",
        0x3e => "i64.store32",
        0x3f => "current_memory",
        0x40 => "grow_memory",
        0x41 => "i32.const",
        0x42 => "i64.const",
        0x43 => "f32.const",
        0x44 => "f64.const",
        0x45 => "i32.eqz",
        0x46 => "i32.eq",
        0x47 => "i32.ne",
        0x48 => "i32.lt_s",
        0x49 => "i32.lt_u",
        0x4a => "i32.gt_s",
        0x4b => "i32.gt_u",
        0x4c => "i32.le_s",
        0x4d => "i32.le_u",
        0x4e => "i32.ge_s",
        0x4f => "i32.ge_u",
        0x50 => "i64.eqz",
        0x51 => "i64.eq",
        0x52 => "i64.ne",
        0x53 => "i64.lt_s",
        0x54 => "i64.lt_u",
        0x55 => "i64.gt_s",
        0x56 => "i64.gt_u",
        0x57 => "i64.le_s",
        0x58 => "i64.le_u",
        0x59 => "i64.ge_s",
        0x5a => "i64.ge_u",
        0x5b => "f32.eq",
        0x5c => "f32.ne",
        0x5d => "f32.lt",
        0x5e => "f32.gt",
        0x5f => "f32.le",
        0x60 => "f32.ge",
        0x61 => "f64.eq",
        0x62 => "f64.ne",
        0x63 => "f64.lt",
        0x64 => "f64.gt",
        0x65 => "f64.le",
        0x66 => "f64.ge",
        0x67 => "i32.clz",
        0x68 => "i32.ctz",
        0x69 => "i32.popcnt",
        0x6a => "i32.add",
        0x6b => "i32.sub",
        0x6c => "i32.mul",
        0x6d => "i32.div_s",
        0x6e => "i32.div_u",
        0x6f => "i32.rem_s",
        0x70 => "i32.rem_u",
        0x71 => "i32.and",
        0x72 => "i32.or",
        0x73 => "i32.xor",
        0x74 => "i32.shl",
        0x75 => "i32.shr_s",
        0x76 => "i32.shr_u",
        0x77 => "i32.rotl",
        0x78 => "i32.rotr",
        0x79 => "i64.clz",
        0x7a => "i64.ctz",
        0x7b => "i64.popcnt",
        0x7c => "i64.add",
        0x7d => "i64.sub",
        0x7e => "i64.mul",
        0x7f => "i64.div_s",
        0x80 => "i64.div_u",
        0x81 => "i64.rem_s",
        0x82 => "i64.rem_u",
        0x83 => "i64.and",
        0x84 => "i64.or",
        0x85 => "i64.xor",
        0x86 => "i64.shl",
        0x87 => "i64.shr_s",
        0x88 => "i64.shr_u",
        0x89 => "i64.rotl",
        0x8a => "i64.rotr",
        0x8b => "f32.abs",
        0x8c => "f32.neg",
        0x8d => "f32.ceil",
        0x8e => "f32.floor",
        0x8f => "f32.trunc",
        0x90 => "f32.nearest",
        0x91 => "f32.sqrt",
        0x92 => "f32.add",
        0x93 => "f32.sub",
        0x94 => "f32.mul",
        0x95 => "f32.div",
        0x96 => "f32.min",
        0x97 => "f32.max",
        0x98 => "f32.copysign",
        0x99 => "f64.abs",
        0x9a => "f64.neg",
        0x9b => "f64.ceil",
        0x9c => "f64.floor",
        0x9d => "f64.trunc",
        0x9e => "f64.nearest",
        0x9f => "f64.sqrt",
        0xa0 => "f64.add",
        0xa1 => "f64.sub",
        0xa2 => "f64.mul",
        0xa3 => "f64.div",
        0xa4 => "f64.min",
        0xa5 => "f64.max",
        0xa6 => "f64.copysign",
        0xa7 => "i32.wrap/i64",
        0xa8 => "i32.trunc_s/f32",
        0xa9 => "i32.trunc_u/f32",
        0xaa => "i32.trunc_s/f64",
        0xab => "i32.trunc_u/f64",
        0xac => "i64.extend_s/i32",
        0xad => "i64.extend_u/i32",
        0xae => "i64.trunc_s/f32",
        0xaf => "i64.trunc_u/f32",
        0xb0 => "i64.trunc_s/f64",
        0xb1 => "i64.trunc_u/f64",
        0xb2 => "f32.convert_s/i32",
        0xb3 => "f32.convert_u/i32",
        0xb4 => "f32.convert_s/i64",
        0xb5 => "f32.convert_u/i64",
        0xb6 => "f32.demote/f64",
        0xb7 => "f64.convert_s/i32",
        0xb8 => "f64.convert_u/i32",
        0xb9 => "f64.convert_s/i64",
        0xba => "f64.convert_u/i64",
        0xbb => "f64.promote/f32",
        0xbc => "i32.reinterpret/f32",
        0xbd => "i64.reinterpret/f64",
        0xbe => "f32.reinterpret/i32",
        0xbf => "f64.reinterpret/i64",
        _ => return None,
    })
}

fn byte_for_mnemonic(mnemonic: &str) -> Option<u8> {
    // Linear scan over the same table `mnemonic_for_byte` uses, keeping a
    // single source of truth for the opcode set instead of a second
    // hand-maintained reverse table.
    (0u8..=0xbf).find(|&b| mnemonic_for_byte(b) == Some(mnemonic))
}
