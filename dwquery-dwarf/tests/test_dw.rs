//! End-to-end DWARF queries over a unit synthesized in memory.

use std::collections::BTreeMap;
use std::sync::Arc;

use fallible_iterator::FallibleIterator;
use gimli::write::{Address, AttributeValue, DwarfUnit, EndianVec, Sections};
use similar_asserts::assert_eq;

use dwquery_dwarf::{dwarf_vocabulary, Doneness, DwarfContext, DwarfValue, Reader};
use dwquery_lang::value::Brevity;
use dwquery_lang::{core_vocabulary, Expr, Stack, Vocabulary};

/// Builds a small compilation unit:
///
/// ```text
/// DW_TAG_compile_unit "test.c" (C99)
/// ├── DW_TAG_subprogram "main" [0x1000, 0x1020)
/// ├── DW_TAG_base_type "int" (signed, 4 bytes)
/// └── DW_TAG_variable "answer" : int = 42
/// ```
fn synthetic_context() -> Arc<DwarfContext> {
    let encoding = gimli::Encoding {
        format: gimli::Format::Dwarf32,
        version: 4,
        address_size: 8,
    };
    let mut dwarf = DwarfUnit::new(encoding);

    let root = dwarf.unit.root();
    {
        let entry = dwarf.unit.get_mut(root);
        entry.set(
            gimli::DW_AT_name,
            AttributeValue::String(b"test.c".to_vec()),
        );
        entry.set(
            gimli::DW_AT_language,
            AttributeValue::Language(gimli::DW_LANG_C99),
        );
    }

    let subprogram = dwarf.unit.add(root, gimli::DW_TAG_subprogram);
    {
        let entry = dwarf.unit.get_mut(subprogram);
        entry.set(gimli::DW_AT_name, AttributeValue::String(b"main".to_vec()));
        entry.set(
            gimli::DW_AT_low_pc,
            AttributeValue::Address(Address::Constant(0x1000)),
        );
        entry.set(gimli::DW_AT_high_pc, AttributeValue::Udata(0x20));
        entry.set(gimli::DW_AT_external, AttributeValue::Flag(true));
    }

    let base_type = dwarf.unit.add(root, gimli::DW_TAG_base_type);
    {
        let entry = dwarf.unit.get_mut(base_type);
        entry.set(gimli::DW_AT_name, AttributeValue::String(b"int".to_vec()));
        entry.set(
            gimli::DW_AT_encoding,
            AttributeValue::Encoding(gimli::DW_ATE_signed),
        );
        entry.set(gimli::DW_AT_byte_size, AttributeValue::Udata(4));
    }

    let variable = dwarf.unit.add(root, gimli::DW_TAG_variable);
    {
        let entry = dwarf.unit.get_mut(variable);
        entry.set(
            gimli::DW_AT_name,
            AttributeValue::String(b"answer".to_vec()),
        );
        entry.set(gimli::DW_AT_type, AttributeValue::UnitRef(base_type));
        entry.set(gimli::DW_AT_const_value, AttributeValue::Data4(42));
    }

    let mut sections = Sections::new(EndianVec::new(gimli::LittleEndian));
    dwarf.write(&mut sections).expect("writes sections");

    let mut bytes: BTreeMap<&'static str, Vec<u8>> = BTreeMap::new();
    sections
        .for_each(|id, data| {
            bytes.insert(id.name(), data.slice().to_vec());
            Ok::<(), gimli::Error>(())
        })
        .expect("collects sections");

    let dwarf = gimli::Dwarf::load(|id| -> Result<Reader, gimli::Error> {
        let data = bytes.get(id.name()).cloned().unwrap_or_default();
        Ok(Reader::new(
            Arc::from(data),
            gimli::RunTimeEndian::Little,
        ))
    })
    .expect("loads sections");

    DwarfContext::from_dwarf(dwarf, "<synthetic>".to_string()).expect("builds context")
}

fn vocabulary() -> Vocabulary {
    let mut voc = core_vocabulary();
    voc.extend(dwarf_vocabulary());
    voc
}

fn run(query: &str) -> Vec<String> {
    let voc = vocabulary();
    let expr = Expr::parse(query, &voc).expect("query parses");

    let mut seed = Stack::new();
    seed.push(Box::new(DwarfValue::new(
        synthetic_context(),
        Doneness::Cooked,
        0,
    )));

    let mut results = expr.query(seed).expect("query lowers");
    let mut out = Vec::new();
    while let Some(stk) = results.next().expect("query evaluates") {
        out.push(format!("{}", stk.top().display(Brevity::Brief)));
    }
    out
}

#[test]
fn units_and_entries() {
    assert_eq!(run("unit offset"), ["0x0"]);
    assert_eq!(run("[entry] length"), ["4"]);
    assert_eq!(run("entry ?root offset"), ["0xb"]);
    assert_eq!(run("entry ?root label"), ["DW_TAG_compile_unit"]);
}

#[test]
fn names_and_tags() {
    assert_eq!(run("entry ?TAG_subprogram name"), ["main"]);
    assert_eq!(run("entry ?TAG_base_type name"), ["int"]);
    assert_eq!(
        run("[entry label]"),
        ["[DW_TAG_compile_unit, DW_TAG_subprogram, DW_TAG_base_type, DW_TAG_variable]"]
    );
    assert_eq!(run("entry !TAG_compile_unit name"), ["main", "int", "answer"]);
}

#[test]
fn children_and_parents() {
    assert_eq!(run("[entry ?root child] length"), ["3"]);
    assert_eq!(run("entry ?TAG_variable parent label"), ["DW_TAG_compile_unit"]);
    assert_eq!(run("[entry ?root parent]"), ["[]"]);
}

#[test]
fn attribute_values() {
    assert_eq!(run("entry @AT_language"), ["DW_LANG_C99"]);
    assert_eq!(run("entry @AT_encoding"), ["DW_ATE_signed"]);
    assert_eq!(run("entry ?TAG_subprogram @AT_low_pc"), ["0x1000"]);
    // A data-form high_pc is the offset from low_pc.
    assert_eq!(run("entry ?TAG_subprogram @AT_high_pc"), ["0x1020"]);
    assert_eq!(run("entry ?TAG_subprogram @AT_external"), ["true"]);
    // Signedness of the constant comes from the variable's type.
    assert_eq!(run("entry ?TAG_variable @AT_const_value"), ["42"]);
    // Reference attributes traverse to the target entry.
    assert_eq!(run("entry ?TAG_variable @AT_type name"), ["int"]);
}

#[test]
fn attribute_words() {
    assert_eq!(run("[entry ?TAG_base_type attribute] length"), ["3"]);

    let forms = run("entry ?TAG_base_type attribute (label == DW_AT_encoding) form");
    assert_eq!(forms.len(), 1);
    assert!(forms[0].starts_with("DW_FORM_"), "got {forms:?}");

    assert_eq!(run("entry ?AT_const_value name"), ["answer"]);
    assert_eq!(run("entry (name == \"main\") @AT_low_pc hex"), ["0x1000"]);
}

#[test]
fn address_sets() {
    assert_eq!(
        run("entry ?TAG_subprogram address"),
        ["[0x1000, 0x1020)"]
    );
    assert_eq!(run("entry ?TAG_subprogram address length"), ["32"]);
    assert_eq!(
        run("entry ?TAG_subprogram address 0x1010 ?contains").len(),
        1
    );
    assert_eq!(
        run("entry ?TAG_subprogram address 0x2000 ?contains").len(),
        0
    );
    assert_eq!(run("entry ?TAG_subprogram address low"), ["0x1000"]);
    assert_eq!(run("entry ?TAG_subprogram address high"), ["0x1020"]);
    assert_eq!(run("0x10 0x14 aset length"), ["4"]);
    assert_eq!(run("0x10 0x20 aset 0x14 sub length"), ["15"]);
}

#[test]
fn abbreviations() {
    assert_eq!(run("[unit abbrev entry] length"), ["4"]);
    assert_eq!(run("[unit abbrev entry code]"), ["[1, 2, 3, 4]"]);
    assert_eq!(
        run("entry ?root abbrev label"),
        ["DW_TAG_compile_unit"]
    );
    assert_eq!(run("entry ?root abbrev ?haschildren code"), ["1"]);
}

#[test]
fn doneness_casts() {
    assert_eq!(run("raw entry name"), run("cooked entry name"));
    assert_eq!(run("[raw entry] length"), ["4"]);
}

#[test]
fn format_over_entries() {
    assert_eq!(
        run("entry ?TAG_subprogram \"func %( name %) at %( @AT_low_pc %)\""),
        ["func main at 0x1000"]
    );
}

#[test]
fn captures_and_counts() {
    assert_eq!(run("[entry name] length"), ["4"]);
    assert_eq!(
        run("[entry name]"),
        ["[test.c, main, int, answer]"]
    );
}

#[test]
fn dwarf_handle() {
    assert_eq!(run("name"), ["<synthetic>"]);
    assert_eq!(run("type"), ["T_DWARF"]);
}
