//! Binary decoder (spec.md §4.3): turns a byte slice into a [`Module`].
//!
//! Grounded on `wrt-decoder/src/core/decode.rs` and
//! `wrt-decoder/src/sections.rs` for the top-level dispatch shape, and
//! `examples/original_source/toolkit/wasm2json.go` (`Wasm2Json`,
//! `ParsePreramble`, `ParseSectionHeader`, `sectionParsers`, `ParseOp`) for
//! the exact per-section and per-op parsing order.

use crate::codes;
use crate::error::{Error, Result};
use crate::leb128::ByteReader;
use crate::module::*;
use crate::tables::{self, ExternalKind, LangType, SectionId};

/// Decode a complete Wasm MVP binary into its module representation.
pub fn decode(bytes: &[u8]) -> Result<Module> {
    let mut r = ByteReader::new(bytes);
    let preamble = decode_preamble(&mut r)?;

    let mut sections = Vec::new();
    while r.remaining() > 0 {
        let section = decode_section(&mut r)?;
        #[cfg(feature = "logging")]
        log::trace!("decoded section {:?} at offset {}", section.id(), r.bytes_read());
        sections.push(section);
    }

    Ok(Module { preamble, sections })
}

fn decode_preamble(r: &mut ByteReader<'_>) -> Result<Preamble> {
    let read = |r: &mut ByteReader<'_>| -> Result<[u8; 4]> {
        let bytes = r
            .read_n(4)
            .map_err(|_| Error::decode(codes::TRUNCATED_PREAMBLE, "truncated preamble"))?;
        Ok(bytes.try_into().expect("read_n(4) returns 4 bytes"))
    };
    let magic = read(r)?;
    if magic != Preamble::WASM.magic {
        return Err(Error::decode(codes::BAD_MAGIC, "bad magic bytes"));
    }
    let version = read(r)?;
    if version != Preamble::WASM.version {
        return Err(Error::decode(codes::BAD_VERSION, "unsupported version"));
    }
    Ok(Preamble { magic, version })
}

fn decode_section(r: &mut ByteReader<'_>) -> Result<Section> {
    let id_byte = r.read_byte()?;
    let payload_len = r.read_uleb128_u32()? as usize;
    let payload = r
        .read_n(payload_len)
        .map_err(|_| Error::decode(codes::UNEXPECTED_EOF, "section payload exceeds input"))?;
    let mut body = ByteReader::new(payload);

    let section = if id_byte == SectionId::Custom.to_byte() {
        let section_name = body.read_string()?;
        let rest = body.read_n(body.remaining())?.to_vec();
        Section::Custom(CustomSec { section_name, payload: rest })
    } else {
        let id = SectionId::from_byte(id_byte)?;
        decode_known_section(id, &mut body)?
    };

    if body.remaining() != 0 {
        return Err(Error::decode(
            codes::SECTION_SIZE_MISMATCH,
            format!("section id {id_byte} left {} unconsumed bytes", body.remaining()),
        ));
    }
    Ok(section)
}

fn decode_known_section(id: SectionId, body: &mut ByteReader<'_>) -> Result<Section> {
    Ok(match id {
        SectionId::Custom => unreachable!("custom sections are handled by caller"),
        SectionId::Type => Section::Type(decode_vec(body, decode_type_entry)?),
        SectionId::Import => Section::Import(decode_vec(body, decode_import_entry)?),
        SectionId::Function => {
            Section::Function(decode_vec(body, |b| b.read_uleb128_u32())?)
        }
        SectionId::Table => Section::Table(decode_vec(body, decode_table)?),
        SectionId::Memory => Section::Memory(decode_vec(body, decode_mem_limits)?),
        SectionId::Global => Section::Global(decode_vec(body, decode_global_entry)?),
        SectionId::Export => Section::Export(decode_vec(body, decode_export_entry)?),
        SectionId::Start => Section::Start(StartSec { index: body.read_uleb128_u32()? }),
        SectionId::Element => Section::Element(decode_vec(body, decode_element_entry)?),
        SectionId::Code => Section::Code(decode_vec(body, decode_code_body)?),
        SectionId::Data => Section::Data(decode_vec(body, decode_data_segment)?),
    })
}

fn decode_vec<T>(
    r: &mut ByteReader<'_>,
    mut one: impl FnMut(&mut ByteReader<'_>) -> Result<T>,
) -> Result<Vec<T>> {
    let count = r.read_uleb128_u32()?;
    (0..count).map(|_| one(r)).collect()
}

fn decode_lang_type(r: &mut ByteReader<'_>) -> Result<LangType> {
    LangType::from_byte(r.read_byte()?)
}

fn decode_type_entry(r: &mut ByteReader<'_>) -> Result<TypeEntry> {
    let form = decode_lang_type(r)?;
    let param_count = r.read_uleb128_u32()?;
    let params = (0..param_count).map(|_| decode_lang_type(r)).collect::<Result<_>>()?;
    let return_count = r.read_uleb128_u32()?;
    let return_type = match return_count {
        0 => None,
        1 => Some(decode_lang_type(r)?),
        n => {
            return Err(Error::decode(
                codes::INCONSISTENT_ENTITY,
                format!("type entry declares {n} return values, MVP allows at most 1"),
            ))
        }
    };
    Ok(TypeEntry { form, params, return_type })
}

fn decode_mem_limits(r: &mut ByteReader<'_>) -> Result<MemLimits> {
    let flags = r.read_byte()?;
    let initial = r.read_uleb128_u64()?;
    let maximum = if flags & 0x01 != 0 { Some(r.read_uleb128_u64()?) } else { None };
    Ok(MemLimits { flags, initial, maximum })
}

fn decode_table(r: &mut ByteReader<'_>) -> Result<Table> {
    let element_type = decode_lang_type(r)?;
    let limits = decode_mem_limits(r)?;
    Ok(Table { element_type, limits })
}

fn decode_global(r: &mut ByteReader<'_>) -> Result<Global> {
    let content_type = decode_lang_type(r)?;
    let mutability = r.read_byte()?;
    Ok(Global { content_type, mutability })
}

fn decode_global_entry(r: &mut ByteReader<'_>) -> Result<GlobalEntry> {
    let ty = decode_global(r)?;
    let init = decode_init_expr(r)?;
    Ok(GlobalEntry { ty, init })
}

fn decode_import_entry(r: &mut ByteReader<'_>) -> Result<ImportEntry> {
    let module_str = r.read_string()?;
    let field_str = r.read_string()?;
    let ty = match ExternalKind::from_byte(r.read_byte()?)? {
        ExternalKind::Function => ImportType::Function(r.read_uleb128_u32()?),
        ExternalKind::Table => ImportType::Table(decode_table(r)?),
        ExternalKind::Memory => ImportType::Memory(decode_mem_limits(r)?),
        ExternalKind::Global => ImportType::Global(decode_global(r)?),
    };
    Ok(ImportEntry { module_str, field_str, ty })
}

fn decode_export_entry(r: &mut ByteReader<'_>) -> Result<ExportEntry> {
    let field_str = r.read_string()?;
    let kind = ExternalKind::from_byte(r.read_byte()?)?;
    let index = r.read_uleb128_u32()?;
    Ok(ExportEntry { field_str, kind, index })
}

fn decode_element_entry(r: &mut ByteReader<'_>) -> Result<ElementEntry> {
    let index = r.read_uleb128_u32()?;
    let offset = decode_init_expr(r)?;
    let count = r.read_uleb128_u32()?;
    let elements = (0..count).map(|_| r.read_uleb128_u32().map(u64::from)).collect::<Result<_>>()?;
    Ok(ElementEntry { index, offset, elements })
}

fn decode_data_segment(r: &mut ByteReader<'_>) -> Result<DataSegment> {
    let index = r.read_uleb128_u32()?;
    let offset = decode_init_expr(r)?;
    let len = r.read_uleb128_u32()? as usize;
    let data = r.read_n(len)?.to_vec();
    Ok(DataSegment { index, offset, data })
}

/// A constant init expression: exactly one op followed by the `end` byte
/// (spec.md §3's element/data/global offset/init fields).
fn decode_init_expr(r: &mut ByteReader<'_>) -> Result<Op> {
    let op = decode_op(r)?;
    let end = r.read_byte()?;
    if end != 0x0b {
        return Err(Error::decode(
            codes::INCONSISTENT_ENTITY,
            format!("init expression not terminated by end, found 0x{end:02x}"),
        ));
    }
    Ok(op)
}

fn decode_op(r: &mut ByteReader<'_>) -> Result<Op> {
    let byte = r.read_byte()?;
    let (return_type, name) = tables::opcode_from_byte(byte)?;
    let return_type = return_type.map(LangType::from_name).transpose()?;
    let key = if name == "const" { return_type.map(LangType::name) } else { Some(name) };
    let immediates = match key.and_then(tables::immediate_kind) {
        Some(kind) => Some(decode_immediate(kind, r)?),
        None => None,
    };
    Ok(Op { name: name.to_string(), return_type, immediates })
}

fn decode_immediate(kind: tables::ImmediateKind, r: &mut ByteReader<'_>) -> Result<Immediates> {
    use tables::ImmediateKind as K;
    Ok(match kind {
        K::BlockType => Immediates::BlockType(decode_lang_type(r)?),
        K::Varuint1 => Immediates::Varuint1(r.read_byte()?),
        K::Varuint32 => Immediates::Varuint32(r.read_uleb128_u32()?),
        K::Varint32 => Immediates::Varint32(r.read_sleb128_i32()?),
        K::Varint64 => Immediates::Varint64(r.read_sleb128_i64()?),
        K::Uint32 => Immediates::Uint32(r.read_n(4)?.try_into().expect("read_n(4) is 4 bytes")),
        K::Uint64 => Immediates::Uint64(r.read_n(8)?.try_into().expect("read_n(8) is 8 bytes")),
        K::BrTable => {
            let count = r.read_uleb128_u32()?;
            let targets = (0..count).map(|_| r.read_uleb128_u32()).collect::<Result<_>>()?;
            let default_target = r.read_uleb128_u32()?;
            Immediates::BrTable { targets, default_target }
        }
        K::CallIndirect => {
            let type_index = r.read_uleb128_u32()?;
            let reserved = r.read_byte()?;
            Immediates::CallIndirect { type_index, reserved }
        }
        K::MemoryImmediate => {
            let flags = r.read_uleb128_u32()?;
            let offset = r.read_uleb128_u32()?;
            Immediates::MemoryImmediate { flags, offset }
        }
    })
}

fn decode_local_entry(r: &mut ByteReader<'_>) -> Result<LocalEntry> {
    let count = r.read_uleb128_u32()?;
    let ty = decode_lang_type(r)?;
    Ok(LocalEntry { count, ty })
}

fn decode_code_body(r: &mut ByteReader<'_>) -> Result<CodeBody> {
    let body_size = r.read_uleb128_u32()? as usize;
    let start = r.bytes_read();
    let local_count = r.read_uleb128_u32()?;
    let locals = (0..local_count).map(|_| decode_local_entry(r)).collect::<Result<Vec<_>>>()?;

    let mut code = Vec::new();
    loop {
        let consumed = r.bytes_read() - start;
        if consumed == body_size {
            break;
        }
        if consumed > body_size {
            return Err(Error::decode(
                codes::CODE_BODY_SIZE_MISMATCH,
                "code body op stream overran its declared size",
            ));
        }
        code.push(decode_op(r)?);
    }
    Ok(CodeBody { locals, code })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_empty_module() {
        let bytes = wat::parse_str("(module)").unwrap();
        let module = decode(&bytes).unwrap();
        assert_eq!(module.preamble, Preamble::WASM);
        assert!(module.sections.is_empty());
    }

    #[test]
    fn decode_simple_function() {
        let bytes = wat::parse_str(
            r#"(module
                (func (export "add") (param i32 i32) (result i32)
                    local.get 0
                    local.get 1
                    i32.add))"#,
        )
        .unwrap();
        let module = decode(&bytes).unwrap();

        let Section::Type(types) = module
            .sections
            .iter()
            .find(|s| s.id() == Some(SectionId::Type))
            .unwrap()
        else {
            panic!("expected type section")
        };
        assert_eq!(types[0].params, vec![LangType::I32, LangType::I32]);
        assert_eq!(types[0].return_type, Some(LangType::I32));

        let Section::Code(bodies) =
            module.sections.iter().find(|s| s.id() == Some(SectionId::Code)).unwrap()
        else {
            panic!("expected code section")
        };
        let names: Vec<&str> = bodies[0].code.iter().map(|op| op.name.as_str()).collect();
        assert_eq!(names, vec!["get_local", "get_local", "add"]);
    }

    #[test]
    fn custom_section_roundtrips_name_and_payload() {
        // preamble, then a custom section: id 0x00, body len 0x24, name len
        // 0x10 + "a custom section", then "this is the payload".
        let bytes = hex::decode(
            "0061736d010000000024106120637573746f6d2073656374696f6e\
             7468697320697320746865207061796c6f6164",
        )
        .unwrap();

        let module = decode(&bytes).unwrap();
        let Section::Custom(custom) = &module.sections[0] else {
            panic!("expected custom section")
        };
        assert_eq!(custom.section_name, "a custom section");
        assert_eq!(custom.payload, b"this is the payload");
    }

    #[test]
    fn truncated_preamble_is_rejected() {
        let bytes = hex::decode("006173").unwrap();
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.code, codes::TRUNCATED_PREAMBLE);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let bytes = hex::decode("7878787801000000").unwrap();
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.code, codes::BAD_MAGIC);
    }
}
