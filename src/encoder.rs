//! Binary encoder (spec.md §4.4): re-emits a [`Module`] as bytes.
//!
//! Grounded on `wrt-decoder/src/core/encode.rs` for the section-buffer
//! shape, and `examples/original_source/toolkit/json2wasm.go`
//! (`GenerateSection`, `GenerateOP`, the `J2W_*` reverse tables) for the
//! exact inner-buffer-then-length-prefix encoding: every section is built
//! into its own buffer first so its byte length can be written as a
//! ULEB128 prefix before the payload.

use crate::error::Result;
use crate::leb128::ByteWriter;
use crate::module::*;
use crate::tables::{self, LangType, SectionId};

/// Encode a module back into a spec-conformant Wasm MVP binary.
pub fn encode(module: &Module) -> Result<Vec<u8>> {
    let mut w = ByteWriter::new();
    w.write_bytes(&module.preamble.magic);
    w.write_bytes(&module.preamble.version);
    for section in &module.sections {
        #[cfg(feature = "logging")]
        log::trace!("encoding section {:?}", section.id());
        encode_section(section, &mut w)?;
    }
    Ok(w.into_bytes())
}

fn encode_section(section: &Section, out: &mut ByteWriter) -> Result<()> {
    let id_byte = section.id().map_or(SectionId::Custom.to_byte(), SectionId::to_byte);
    let mut body = ByteWriter::new();
    match section {
        Section::Custom(custom) => {
            body.write_string(&custom.section_name);
            body.write_bytes(&custom.payload);
        }
        Section::Type(entries) => encode_vec(entries, &mut body, encode_type_entry)?,
        Section::Import(entries) => encode_vec(entries, &mut body, encode_import_entry)?,
        Section::Function(entries) => {
            encode_vec(entries, &mut body, |e, w| {
                w.write_uleb128_u32(*e);
                Ok(())
            })?
        }
        Section::Table(entries) => encode_vec(entries, &mut body, encode_table)?,
        Section::Memory(entries) => encode_vec(entries, &mut body, encode_mem_limits)?,
        Section::Global(entries) => encode_vec(entries, &mut body, encode_global_entry)?,
        Section::Export(entries) => encode_vec(entries, &mut body, encode_export_entry)?,
        Section::Start(start) => body.write_uleb128_u32(start.index),
        Section::Element(entries) => encode_vec(entries, &mut body, encode_element_entry)?,
        Section::Code(entries) => encode_vec(entries, &mut body, encode_code_body)?,
        Section::Data(entries) => encode_vec(entries, &mut body, encode_data_segment)?,
    }
    let payload = body.into_bytes();
    out.write_byte(id_byte);
    out.write_uleb128_u32(payload.len() as u32);
    out.write_bytes(&payload);
    Ok(())
}

fn encode_vec<T>(
    entries: &[T],
    w: &mut ByteWriter,
    mut one: impl FnMut(&T, &mut ByteWriter) -> Result<()>,
) -> Result<()> {
    w.write_uleb128_u32(entries.len() as u32);
    for entry in entries {
        one(entry, w)?;
    }
    Ok(())
}

fn encode_lang_type(ty: LangType, w: &mut ByteWriter) {
    w.write_byte(ty.to_byte());
}

fn encode_type_entry(entry: &TypeEntry, w: &mut ByteWriter) -> Result<()> {
    encode_lang_type(entry.form, w);
    w.write_uleb128_u32(entry.params.len() as u32);
    for p in &entry.params {
        encode_lang_type(*p, w);
    }
    match entry.return_type {
        Some(ty) => {
            w.write_uleb128_u32(1);
            encode_lang_type(ty, w);
        }
        None => w.write_uleb128_u32(0),
    }
    Ok(())
}

fn encode_mem_limits(limits: &MemLimits, w: &mut ByteWriter) -> Result<()> {
    w.write_byte(limits.flags);
    w.write_uleb128_u64(limits.initial);
    if let Some(max) = limits.maximum {
        w.write_uleb128_u64(max);
    }
    Ok(())
}

fn encode_table(table: &Table, w: &mut ByteWriter) -> Result<()> {
    encode_lang_type(table.element_type, w);
    encode_mem_limits(&table.limits, w)
}

fn encode_global(global: &Global, w: &mut ByteWriter) {
    encode_lang_type(global.content_type, w);
    w.write_byte(global.mutability);
}

fn encode_global_entry(entry: &GlobalEntry, w: &mut ByteWriter) -> Result<()> {
    encode_global(&entry.ty, w);
    encode_init_expr(&entry.init, w)
}

fn encode_import_entry(entry: &ImportEntry, w: &mut ByteWriter) -> Result<()> {
    w.write_string(&entry.module_str);
    w.write_string(&entry.field_str);
    match &entry.ty {
        ImportType::Function(type_index) => {
            w.write_byte(tables::ExternalKind::Function.to_byte());
            w.write_uleb128_u32(*type_index);
        }
        ImportType::Table(table) => {
            w.write_byte(tables::ExternalKind::Table.to_byte());
            encode_table(table, w)?;
        }
        ImportType::Memory(limits) => {
            w.write_byte(tables::ExternalKind::Memory.to_byte());
            encode_mem_limits(limits, w)?;
        }
        ImportType::Global(global) => {
            w.write_byte(tables::ExternalKind::Global.to_byte());
            encode_global(global, w);
        }
    }
    Ok(())
}

fn encode_export_entry(entry: &ExportEntry, w: &mut ByteWriter) -> Result<()> {
    w.write_string(&entry.field_str);
    w.write_byte(entry.kind.to_byte());
    w.write_uleb128_u32(entry.index);
    Ok(())
}

fn encode_element_entry(entry: &ElementEntry, w: &mut ByteWriter) -> Result<()> {
    w.write_uleb128_u32(entry.index);
    encode_init_expr(&entry.offset, w)?;
    w.write_uleb128_u32(entry.elements.len() as u32);
    for &e in &entry.elements {
        w.write_uleb128_u32(e as u32);
    }
    Ok(())
}

fn encode_data_segment(entry: &DataSegment, w: &mut ByteWriter) -> Result<()> {
    w.write_uleb128_u32(entry.index);
    encode_init_expr(&entry.offset, w)?;
    w.write_uleb128_u32(entry.data.len() as u32);
    w.write_bytes(&entry.data);
    Ok(())
}

fn encode_init_expr(op: &Op, w: &mut ByteWriter) -> Result<()> {
    encode_op(op, w)?;
    w.write_byte(0x0b);
    Ok(())
}

fn encode_op(op: &Op, w: &mut ByteWriter) -> Result<()> {
    let byte = tables::opcode_to_byte(op.return_type.map(LangType::name), &op.name)?;
    w.write_byte(byte);
    if let Some(immediates) = &op.immediates {
        encode_immediate(immediates, w);
    }
    Ok(())
}

fn encode_immediate(immediates: &Immediates, w: &mut ByteWriter) {
    match immediates {
        Immediates::BlockType(ty) => encode_lang_type(*ty, w),
        Immediates::Varuint1(v) => w.write_byte(*v),
        Immediates::Varuint32(v) => w.write_uleb128_u32(*v),
        Immediates::Varint32(v) => w.write_sleb128_i32(*v),
        Immediates::Varint64(v) => w.write_sleb128_i64(*v),
        Immediates::Uint32(bytes) => w.write_bytes(bytes),
        Immediates::Uint64(bytes) => w.write_bytes(bytes),
        Immediates::BrTable { targets, default_target } => {
            w.write_uleb128_u32(targets.len() as u32);
            for t in targets {
                w.write_uleb128_u32(*t);
            }
            w.write_uleb128_u32(*default_target);
        }
        Immediates::CallIndirect { type_index, reserved } => {
            w.write_uleb128_u32(*type_index);
            w.write_byte(*reserved);
        }
        Immediates::MemoryImmediate { flags, offset } => {
            w.write_uleb128_u32(*flags);
            w.write_uleb128_u32(*offset);
        }
    }
}

fn encode_local_entry(entry: &LocalEntry, w: &mut ByteWriter) {
    w.write_uleb128_u32(entry.count);
    encode_lang_type(entry.ty, w);
}

fn encode_code_body(body: &CodeBody, w: &mut ByteWriter) -> Result<()> {
    let mut inner = ByteWriter::new();
    inner.write_uleb128_u32(body.locals.len() as u32);
    for local in &body.locals {
        encode_local_entry(local, &mut inner);
    }
    for op in &body.code {
        encode_op(op, &mut inner)?;
    }
    let bytes = inner.into_bytes();
    w.write_uleb128_u32(bytes.len() as u32);
    w.write_bytes(&bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;

    #[test]
    fn roundtrips_a_real_module() {
        let bytes = wat::parse_str(
            r#"(module
                (func (export "add") (param i32 i32) (result i32)
                    local.get 0
                    local.get 1
                    i32.add))"#,
        )
        .unwrap();
        let module = decode(&bytes).unwrap();
        let re_encoded = encode(&module).unwrap();
        assert_eq!(re_encoded, bytes);
    }

    #[test]
    fn roundtrips_empty_module() {
        let bytes = wat::parse_str("(module)").unwrap();
        let module = decode(&bytes).unwrap();
        assert_eq!(encode(&module).unwrap(), bytes);
    }

    #[test]
    fn roundtrips_custom_section() {
        // preamble, then a custom section: id 0x00, body len 0x24, name len
        // 0x10 + "a custom section", then "this is the payload".
        let bytes = hex::decode(
            "0061736d010000000024106120637573746f6d2073656374696f6e\
             7468697320697320746865207061796c6f6164",
        )
        .unwrap();

        let module = decode(&bytes).unwrap();
        assert_eq!(encode(&module).unwrap(), bytes);
    }
}
