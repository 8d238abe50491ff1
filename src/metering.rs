//! The gas-metering transform (spec.md §4.6–§4.7).
//!
//! Grounded on `examples/original_source/metering.go` (`MeterWASM`,
//! `newMetring`, `meterJSON`, `meterCodeEntry`) for the step ordering and
//! segmentation algorithm, and `wrt-format/src/module.rs`'s in-place
//! mutating-pass style for how the transform walks `Module`.

use crate::codes;
use crate::cost::{self, CostValue};
use crate::error::{Error, ErrorCategory, Result};
use crate::module::*;
use crate::tables::{ExternalKind, LangType, SectionId};
use crate::text;

/// The counter's numeric type (spec.md §4.6's `meter_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeterType {
    I32,
    #[default]
    I64,
    F32,
    F64,
}

impl MeterType {
    fn lang_type(self) -> LangType {
        match self {
            Self::I32 => LangType::I32,
            Self::I64 => LangType::I64,
            Self::F32 => LangType::F32,
            Self::F64 => LangType::F64,
        }
    }

    fn name(self) -> &'static str {
        self.lang_type().name()
    }
}

/// Parameters of the metering transform (spec.md §6.3).
#[derive(Debug, Clone)]
pub struct Options {
    /// A tree of named cost weights; see spec.md §6.4.
    pub cost_table: CostValue,
    /// Import module name for the meter function. Default `"metering"`.
    pub module_str: String,
    /// Import field name for the meter function. Default `"usegas"`.
    pub field_str: String,
    /// Numeric type of the gas counter. Default `i64`.
    pub meter_type: MeterType,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            cost_table: CostValue::default(),
            module_str: "metering".to_string(),
            field_str: "usegas".to_string(),
            meter_type: MeterType::default(),
        }
    }
}

/// The branch-op set that terminates a metering segment (spec.md §4.7).
/// `block` is deliberately excluded.
fn is_branch_op(name: &str) -> bool {
    matches!(
        name,
        "br" | "br_if" | "br_table" | "if" | "else" | "end" | "loop" | "return" | "grow_memory"
    )
}

/// Apply the metering transform to `module` in place (spec.md §4.6).
pub fn transform(module: &mut Module, options: &Options) -> Result<()> {
    let type_idx = ensure_list_section(module, SectionId::Type);
    let import_idx = ensure_list_section(module, SectionId::Import);

    let meter_type_index = {
        let Section::Type(types) = &mut module.sections[type_idx] else {
            unreachable!("ensure_list_section(Type) always yields Section::Type")
        };
        let index = types.len() as u32;
        types.push(TypeEntry {
            form: LangType::Func,
            params: vec![options.meter_type.lang_type()],
            return_type: None,
        });
        index
    };

    let func_index = {
        let Section::Import(imports) = &module.sections[import_idx] else {
            unreachable!("ensure_list_section(Import) always yields Section::Import")
        };
        imports.iter().filter(|i| i.is_function()).count() as u32
    };

    {
        let Section::Import(imports) = &module.sections[import_idx] else {
            unreachable!("ensure_list_section(Import) always yields Section::Import")
        };
        if imports.iter().any(|i| i.module_str == options.module_str && i.field_str == options.field_str)
        {
            return Err(Error::duplicate_meter_import(&options.module_str, &options.field_str));
        }
    }

    {
        let Section::Import(imports) = &mut module.sections[import_idx] else {
            unreachable!("ensure_list_section(Import) always yields Section::Import")
        };
        imports.push(ImportEntry {
            module_str: options.module_str.clone(),
            field_str: options.field_str.clone(),
            ty: ImportType::Function(meter_type_index),
        });
    }

    #[cfg(feature = "logging")]
    log::debug!("func_index={func_index} meter_type_index={meter_type_index}");

    renumber_function_references(module, func_index);
    meter_code_bodies(module, options, func_index)?;

    Ok(())
}

/// Return the index of the named list-shaped section, inserting an empty
/// one at the lowest index that preserves ascending id order if absent
/// (spec.md §4.6 step 1).
fn ensure_list_section(module: &mut Module, id: SectionId) -> usize {
    if let Some(idx) = module.find_section_index(id) {
        return idx;
    }
    let insert_at = module
        .sections
        .iter()
        .position(|s| matches!(s.id(), Some(other) if other > id))
        .unwrap_or(module.sections.len());
    module.sections.insert(insert_at, empty_list_section(id));
    insert_at
}

fn empty_list_section(id: SectionId) -> Section {
    match id {
        SectionId::Type => Section::Type(Vec::new()),
        SectionId::Import => Section::Import(Vec::new()),
        SectionId::Function => Section::Function(Vec::new()),
        SectionId::Table => Section::Table(Vec::new()),
        SectionId::Memory => Section::Memory(Vec::new()),
        SectionId::Global => Section::Global(Vec::new()),
        SectionId::Export => Section::Export(Vec::new()),
        SectionId::Element => Section::Element(Vec::new()),
        SectionId::Code => Section::Code(Vec::new()),
        SectionId::Data => Section::Data(Vec::new()),
        SectionId::Start | SectionId::Custom => {
            unreachable!("start/custom sections are never auto-inserted")
        }
    }
}

/// Shift every function-index reference `>= func_index` up by one
/// (spec.md §4.6 step 6). `call_indirect`'s type-index immediate is left
/// untouched.
fn renumber_function_references(module: &mut Module, func_index: u32) {
    for section in &mut module.sections {
        match section {
            Section::Export(exports) => {
                for e in exports {
                    if e.kind == ExternalKind::Function && e.index >= func_index {
                        e.index += 1;
                    }
                }
            }
            Section::Element(elements) => {
                for el in elements {
                    for e in &mut el.elements {
                        if *e >= u64::from(func_index) {
                            *e += 1;
                        }
                    }
                }
            }
            Section::Start(start) => {
                if start.index >= func_index {
                    start.index += 1;
                }
            }
            Section::Code(bodies) => {
                for body in bodies {
                    for op in &mut body.code {
                        if let Some(target) = op.call_target() {
                            if target >= func_index {
                                op.set_call_target(target + 1);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

fn section_clone<T: Clone>(
    module: &Module,
    id: SectionId,
    project: impl Fn(&Section) -> Option<&Vec<T>>,
) -> Vec<T> {
    module
        .find_section_index(id)
        .and_then(|i| project(&module.sections[i]))
        .cloned()
        .unwrap_or_default()
}

/// Meter every code body (spec.md §4.7).
fn meter_code_bodies(module: &mut Module, options: &Options, func_index: u32) -> Result<()> {
    let functions: Vec<u32> =
        section_clone(module, SectionId::Function, |s| match s {
            Section::Function(v) => Some(v),
            _ => None,
        });
    let types: Vec<TypeEntry> = section_clone(module, SectionId::Type, |s| match s {
        Section::Type(v) => Some(v),
        _ => None,
    });

    let Some(code_idx) = module.find_section_index(SectionId::Code) else { return Ok(()) };

    let empty = CostValue::default();
    let code_table = options.cost_table.field("code").unwrap_or(&empty).clone();
    let type_table = options.cost_table.field("type").unwrap_or(&empty).clone();
    let locals_table = options.cost_table.field("locals").unwrap_or(&empty).clone();

    let meter_cost: u64 = metering_statement(0, 0, options.meter_type)?
        .iter()
        .map(|op| cost::get_cost(&op.name, &code_table))
        .sum();

    let Section::Code(bodies) = &mut module.sections[code_idx] else {
        unreachable!("code_idx was found via find_section_index(Code)")
    };

    for (i, body) in bodies.iter_mut().enumerate() {
        let type_index = functions.get(i).copied().unwrap_or(0) as usize;
        let type_entry = types.get(type_index).ok_or_else(|| {
            Error::new(
                ErrorCategory::Transform,
                codes::DANGLING_TYPE_INDEX,
                format!("function {i} declares type index {type_index}, which has no type-section entry"),
            )
        })?;
        let base_cost =
            cost::type_cost(type_entry, &type_table) + cost::locals_cost(&body.locals, &locals_table);

        body.code =
            meter_one_body(&body.code, base_cost, meter_cost, func_index, options, &code_table)?;

        #[cfg(feature = "logging")]
        log::debug!("function {i}: base_cost={base_cost} metered_op_count={}", body.code.len());
    }
    Ok(())
}

fn meter_one_body(
    code: &[Op],
    base_cost: u64,
    meter_cost: u64,
    meter_idx: u32,
    options: &Options,
    code_table: &CostValue,
) -> Result<Vec<Op>> {
    let mut out = Vec::new();
    let mut idx = 0;
    let mut first_segment = true;

    while idx < code.len() {
        let mut segment_cost = if first_segment { base_cost } else { 0 };
        first_segment = false;
        let seg_start = idx;

        loop {
            segment_cost += cost::get_cost(&code[idx].name, code_table);
            let branch = is_branch_op(&code[idx].name);
            idx += 1;
            if branch || idx == code.len() {
                break;
            }
        }

        if segment_cost != 0 {
            out.extend(metering_statement(segment_cost + meter_cost, meter_idx, options.meter_type)?);
        }
        out.extend_from_slice(&code[seg_start..idx]);
    }

    Ok(out)
}

/// Synthesize the metering prelude: `"<meter_type>.const <cost> call
/// <meter_idx>"`, parsed by the text mini-parser (spec.md §4.7).
fn metering_statement(cost: u64, meter_idx: u32, meter_type: MeterType) -> Result<Vec<Op>> {
    text::text_to_ops(&format!("{}.const {cost} call {meter_idx}", meter_type.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;
    use crate::encoder::encode;
    use std::collections::HashMap;

    fn flat_code_table(pairs: &[(&str, u64)]) -> CostValue {
        let mut code = HashMap::new();
        for (k, v) in pairs {
            code.insert((*k).to_string(), CostValue::Flat(*v));
        }
        let mut root = HashMap::new();
        root.insert("code".to_string(), CostValue::Table(code));
        CostValue::Table(root)
    }

    #[test]
    fn zero_cost_table_inserts_no_prelude() {
        let bytes = wat::parse_str(
            r#"(module (func (export "f") (result i32) i32.const 1))"#,
        )
        .unwrap();
        let mut module = decode(&bytes).unwrap();
        let options = Options { cost_table: CostValue::default(), ..Options::default() };
        transform(&mut module, &options).unwrap();

        let Section::Code(bodies) =
            module.sections.iter().find(|s| s.id() == Some(SectionId::Code)).unwrap()
        else {
            panic!("expected code section")
        };
        assert!(!bodies[0].code.iter().any(|op| op.name == "call"));
    }

    #[test]
    fn default_cost_inserts_expected_prelude() {
        let bytes =
            wat::parse_str(r#"(module (func (export "f") (param i32) local.get 0 drop))"#)
                .unwrap();
        let mut module = decode(&bytes).unwrap();
        let options = Options { cost_table: flat_code_table(&[("DEFAULT", 1)]), ..Options::default() };
        transform(&mut module, &options).unwrap();

        let Section::Import(imports) =
            module.sections.iter().find(|s| s.id() == Some(SectionId::Import)).unwrap()
        else {
            panic!("expected import section")
        };
        let meter_idx = (imports.len() - 1) as u32;

        let Section::Code(bodies) =
            module.sections.iter().find(|s| s.id() == Some(SectionId::Code)).unwrap()
        else {
            panic!("expected code section")
        };
        let code = &bodies[0].code;
        assert_eq!(code[0].name, "const");
        assert_eq!(code[0].return_type, Some(LangType::I64));
        assert_eq!(code[1].name, "call");
        assert_eq!(code[1].call_target(), Some(meter_idx));
    }

    #[test]
    fn duplicate_import_is_rejected() {
        let bytes = wat::parse_str(
            r#"(module (import "metering" "usegas" (func (param i64))))"#,
        )
        .unwrap();
        let mut module = decode(&bytes).unwrap();
        let options = Options::default();
        let err = transform(&mut module, &options).unwrap_err();
        assert_eq!(err.code, crate::codes::DUPLICATE_METER_IMPORT);
    }

    #[test]
    fn dangling_type_index_is_rejected() {
        let bytes = wat::parse_str(r#"(module (func (result i32) i32.const 1))"#).unwrap();
        let mut module = decode(&bytes).unwrap();
        let Section::Function(functions) =
            module.sections.iter_mut().find(|s| s.id() == Some(SectionId::Function)).unwrap()
        else {
            panic!("expected function section")
        };
        functions[0] = 99;

        let options = Options::default();
        let err = transform(&mut module, &options).unwrap_err();
        assert_eq!(err.code, crate::codes::DANGLING_TYPE_INDEX);
    }

    #[test]
    fn renumbers_existing_call_targets() {
        let bytes = wat::parse_str(
            r#"(module
                (import "env" "log" (func $log))
                (func $a (call $log))
                (export "a" (func $a)))"#,
        )
        .unwrap();
        let mut module = decode(&bytes).unwrap();
        let options = Options::default();
        transform(&mut module, &options).unwrap();

        let Section::Export(exports) =
            module.sections.iter().find(|s| s.id() == Some(SectionId::Export)).unwrap()
        else {
            panic!("expected export section")
        };
        // $a was function index 1 (after the one import); now 2 since the
        // meter import was inserted at index 1.
        assert_eq!(exports[0].index, 2);

        let _ = encode(&module).unwrap();
    }
}
