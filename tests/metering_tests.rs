use wasm_gas_meter::cost::CostValue;
use wasm_gas_meter::decoder::decode;
use wasm_gas_meter::encoder::encode;
use wasm_gas_meter::metering::{transform, Options};
use wasm_gas_meter::module::Section;
use wasm_gas_meter::{meter_wasm, tables::SectionId as Id};

fn flat_code_default(cost: u64) -> CostValue {
    use std::collections::HashMap;
    let mut code = HashMap::new();
    code.insert("DEFAULT".to_string(), CostValue::Flat(cost));
    let mut root = HashMap::new();
    root.insert("code".to_string(), CostValue::Table(code));
    CostValue::Table(root)
}

#[test]
fn element_segment_indices_are_renumbered() {
    let wasm_bytes = wat::parse_str(
        r#"(module
            (import "env" "a" (func))
            (import "env" "b" (func))
            (import "env" "c" (func))
            (table 10 funcref)
            (func $f0)
            (func $f1)
            (elem (i32.const 0) 0 4))"#,
    )
    .unwrap();

    let mut module = decode(&wasm_bytes).unwrap();
    transform(&mut module, &Options::default()).unwrap();

    let Section::Element(elements) =
        module.sections.iter().find(|s| s.id() == Some(Id::Element)).unwrap()
    else {
        panic!("expected element section")
    };
    // 3 pre-existing function imports; indices >= 3 shift by one: 0 is an
    // import (unaffected), 4 is $f1 (shifts to 5).
    assert_eq!(elements[0].elements, vec![0, 5]);
}

#[test]
fn import_then_defined_function_export_is_renumbered() {
    let wasm_bytes = wat::parse_str(
        r#"(module
            (import "env" "log" (func $log))
            (func $a (result i32) i32.const 0)
            (export "a" (func $a)))"#,
    )
    .unwrap();

    let mut module = decode(&wasm_bytes).unwrap();
    transform(&mut module, &Options::default()).unwrap();

    let Section::Export(exports) =
        module.sections.iter().find(|s| s.id() == Some(Id::Export)).unwrap()
    else {
        panic!("expected export section")
    };
    assert_eq!(exports[0].index, 2);
}

#[test]
fn metering_adds_an_import_and_type_entry() {
    let wasm_bytes = wat::parse_str(
        r#"(module (func (export "f") (param i32) local.get 0 drop))"#,
    )
    .unwrap();

    let options = Options { cost_table: flat_code_default(1), ..Options::default() };
    let metered = meter_wasm(&wasm_bytes, Some(&options)).unwrap();
    let module = decode(&metered).unwrap();

    let Section::Import(imports) =
        module.sections.iter().find(|s| s.id() == Some(Id::Import)).unwrap()
    else {
        panic!("expected import section")
    };
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].module_str, "metering");
    assert_eq!(imports[0].field_str, "usegas");

    let Section::Type(types) =
        module.sections.iter().find(|s| s.id() == Some(Id::Type)).unwrap()
    else {
        panic!("expected type section")
    };
    assert!(types.iter().any(|t| t.params.len() == 1 && t.return_type.is_none()));
}

#[test]
fn re_encoding_an_unmodified_module_is_byte_identical() {
    let wasm_bytes = wat::parse_str(
        r#"(module
            (import "env" "log" (func $log (param i32)))
            (memory (export "memory") 1)
            (global (export "global") (mut i32) (i32.const 42))
            (func (export "add") (param i32 i32) (result i32)
                local.get 0
                local.get 1
                i32.add)
            (data (i32.const 0) "hello"))"#,
    )
    .unwrap();

    let module = decode(&wasm_bytes).unwrap();
    assert_eq!(encode(&module).unwrap(), wasm_bytes);
}

#[test]
fn duplicate_meter_import_fails_without_mutating_the_module() {
    let wasm_bytes = wat::parse_str(
        r#"(module (import "metering" "usegas" (func (param i64))))"#,
    )
    .unwrap();

    let mut module = decode(&wasm_bytes).unwrap();
    let before = module.clone();
    let err = transform(&mut module, &Options::default()).unwrap_err();
    assert_eq!(err.code, wasm_gas_meter::codes::DUPLICATE_METER_IMPORT);

    // The type section gained the meter signature before the duplicate
    // check ran (steps 1-2 precede step 4), but the import section itself
    // is untouched since the rejected import was never appended.
    let import_section = |m: &wasm_gas_meter::Module| {
        m.sections.iter().find(|s| s.id() == Some(Id::Import)).cloned()
    };
    assert_eq!(import_section(&before), import_section(&module));
}
