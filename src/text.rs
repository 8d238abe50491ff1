//! The text mini-parser (spec.md §4.5): converts a whitespace-separated
//! mnemonic sequence into `Op`s. Used only to synthesize the metering
//! prelude — it is not a general Wasm text-format parser.
//!
//! Grounded on `examples/original_source/toolkit/text2json.go`
//! (`Text2Json`, `immediataryParser`, the `queue` token cursor): this is a
//! direct Rust rendering of that file's token-consumption rules.

use crate::codes;
use crate::error::{Error, Result};
use crate::module::{Immediates, Op};
use crate::tables::{self, ImmediateKind, LangType};

struct Tokens<'a> {
    tokens: std::iter::Peekable<std::str::SplitWhitespace<'a>>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self { tokens: text.split_whitespace().peekable() }
    }

    fn shift(&mut self) -> Option<&'a str> {
        self.tokens.next()
    }

    fn peek(&mut self) -> Option<&&'a str> {
        self.tokens.peek()
    }

    fn shift_required(&mut self, what: &str) -> Result<&'a str> {
        self.shift()
            .ok_or_else(|| Error::decode(codes::UNEXPECTED_EOF, format!("missing {what} token")))
    }
}

fn looks_like_integer(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() || c == '-' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_digit())
}

/// Parse a whitespace-separated mnemonic sequence into ops (spec.md §4.5).
pub fn text_to_ops(text: &str) -> Result<Vec<Op>> {
    let mut tokens = Tokens::new(text);
    let mut ops = Vec::new();

    while let Some(tok) = tokens.shift() {
        let (return_type, name) = match tok.split_once('.') {
            Some((ty, name)) => (Some(LangType::from_name(ty)?), name),
            None => (None, tok),
        };

        let key = if name == "const" {
            return_type.map(LangType::name).ok_or_else(|| {
                Error::encode(codes::MISSING_RETURN_TYPE, "const op without a type prefix")
            })?
        } else {
            name
        };

        let immediates = match tables::immediate_kind(key) {
            Some(kind) => Some(parse_immediate(kind, &mut tokens)?),
            None => None,
        };

        ops.push(Op { name: name.to_string(), return_type, immediates });
    }

    Ok(ops)
}

fn parse_immediate(kind: ImmediateKind, tokens: &mut Tokens<'_>) -> Result<Immediates> {
    Ok(match kind {
        ImmediateKind::BlockType => {
            Immediates::BlockType(LangType::from_name(tokens.shift_required("block_type")?)?)
        }
        ImmediateKind::Varuint1 => Immediates::Varuint1(parse_token(tokens, "varuint1")?),
        ImmediateKind::Varuint32 => Immediates::Varuint32(parse_token(tokens, "varuint32")?),
        ImmediateKind::Varint32 => Immediates::Varint32(parse_token(tokens, "varint32")?),
        ImmediateKind::Varint64 => Immediates::Varint64(parse_token(tokens, "varint64")?),
        ImmediateKind::Uint32 => {
            let v: u32 = parse_token(tokens, "uint32")?;
            Immediates::Uint32(v.to_le_bytes())
        }
        ImmediateKind::Uint64 => {
            let v: u64 = parse_token(tokens, "uint64")?;
            Immediates::Uint64(v.to_le_bytes())
        }
        ImmediateKind::BrTable => {
            let mut targets = Vec::new();
            while let Some(&tok) = tokens.peek() {
                if !looks_like_integer(tok) {
                    break;
                }
                targets.push(parse_token(tokens, "br_table target")?);
            }
            let default_target = targets.pop().ok_or_else(|| {
                Error::decode(codes::UNEXPECTED_EOF, "br_table requires a default target")
            })?;
            Immediates::BrTable { targets, default_target }
        }
        ImmediateKind::CallIndirect => {
            let type_index = parse_token(tokens, "call_indirect index")?;
            Immediates::CallIndirect { type_index, reserved: 0 }
        }
        ImmediateKind::MemoryImmediate => {
            let flags = parse_token(tokens, "memory_immediate flags")?;
            let offset = parse_token(tokens, "memory_immediate offset")?;
            Immediates::MemoryImmediate { flags, offset }
        }
    })
}

fn parse_token<T: std::str::FromStr>(tokens: &mut Tokens<'_>, what: &str) -> Result<T> {
    let tok = tokens.shift_required(what)?;
    tok.parse().map_err(|_| Error::decode(codes::UNEXPECTED_EOF, format!("bad {what} token {tok:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn const_then_drop() {
        let ops = text_to_ops("i32.const 32 drop").unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].name, "const");
        assert_eq!(ops[0].return_type, Some(LangType::I32));
        assert_eq!(ops[0].immediates, Some(Immediates::Varint32(32)));
        assert_eq!(ops[1].name, "drop");
        assert_eq!(ops[1].immediates, None);
    }

    #[test]
    fn metering_prelude_shape() {
        let ops = text_to_ops("i64.const 7 call 3").unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].immediates, Some(Immediates::Varint64(7)));
        assert_eq!(ops[1].immediates, Some(Immediates::Varuint32(3)));
    }

    #[test]
    fn br_table_consumes_trailing_default() {
        let ops = text_to_ops("br_table 0 1 2 3").unwrap();
        assert_eq!(
            ops[0].immediates,
            Some(Immediates::BrTable { targets: vec![0, 1, 2], default_target: 3 })
        );
    }
}
