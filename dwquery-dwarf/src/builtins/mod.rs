//! The DWARF and ELF vocabulary.
//!
//! Merged on top of the core vocabulary with
//! [`Vocabulary::extend`](dwquery_lang::Vocabulary::extend): words that are
//! overloaded on both sides (`add`, `sub`, `length`, `elem`, `relem`,
//! `value`, `?empty`) grow the overloads registered here.

pub mod aset;
pub mod dw;
pub mod elf;

use std::cell::RefCell;
use std::rc::Rc;

use dwquery_lang::builtin::{add_constant, add_type_constant, Builtin, Vocabulary};
use dwquery_lang::cst::Constant;
use dwquery_lang::overload::{OverloadTab, OverloadedOpBuiltin, OverloadedPredBuiltin, Selector};

use crate::cst::{enum_constants, DW_AT_DOM, DW_TAG_DOM, KNOWN_ATTRS, KNOWN_TAGS};
use crate::value::{
    AbbrevAttrValue, AbbrevUnitValue, AbbrevValue, AsetValue, AttrValue, CuValue, DieValue,
    DwarfValue, ElfSectionValue, ElfValue, LoclistElemValue, LoclistOpValue, RelocationValue,
    SymbolValue,
};

type Overloads = Vec<(Selector, Rc<dyn Builtin>)>;

fn tab_of(entries: Overloads) -> Rc<RefCell<OverloadTab>> {
    let tab = Rc::new(RefCell::new(OverloadTab::new()));
    {
        let mut t = tab.borrow_mut();
        for (sel, builtin) in entries {
            t.add_overload(sel, builtin);
        }
    }
    tab
}

fn add_op_word(voc: &mut Vocabulary, word: impl Into<String>, entries: Overloads) {
    voc.add(Rc::new(OverloadedOpBuiltin::new(word, tab_of(entries))));
}

fn add_pred_word(voc: &mut Vocabulary, base: &str, entries: Overloads) {
    let tab = tab_of(entries);
    voc.add(Rc::new(OverloadedPredBuiltin::new(
        format!("?{base}"),
        true,
        Rc::clone(&tab),
    )));
    voc.add(Rc::new(OverloadedPredBuiltin::new(
        format!("!{base}"),
        false,
        tab,
    )));
}

/// Builds the DWARF/ELF vocabulary.
pub fn dwarf_vocabulary() -> Vocabulary {
    let mut voc = Vocabulary::new();

    add_type_constant(&mut voc, DwarfValue::VTYPE);
    add_type_constant(&mut voc, CuValue::VTYPE);
    add_type_constant(&mut voc, DieValue::VTYPE);
    add_type_constant(&mut voc, AttrValue::VTYPE);
    add_type_constant(&mut voc, AbbrevUnitValue::VTYPE);
    add_type_constant(&mut voc, AbbrevValue::VTYPE);
    add_type_constant(&mut voc, AbbrevAttrValue::VTYPE);
    add_type_constant(&mut voc, LoclistElemValue::VTYPE);
    add_type_constant(&mut voc, LoclistOpValue::VTYPE);
    add_type_constant(&mut voc, AsetValue::VTYPE);
    add_type_constant(&mut voc, SymbolValue::VTYPE);
    add_type_constant(&mut voc, ElfValue::VTYPE);
    add_type_constant(&mut voc, ElfSectionValue::VTYPE);
    add_type_constant(&mut voc, RelocationValue::VTYPE);

    // File handles and doneness.
    add_op_word(&mut voc, "dwopen", dw::dwopen_overloads());
    add_op_word(&mut voc, "raw", dw::raw_overloads());
    add_op_word(&mut voc, "cooked", dw::cooked_overloads());

    // Tree traversal.
    add_op_word(&mut voc, "unit", dw::unit_overloads());
    add_op_word(&mut voc, "entry", dw::entry_overloads());
    add_op_word(&mut voc, "root", dw::root_overloads());
    add_pred_word(&mut voc, "root", dw::root_pred_overloads());
    add_op_word(&mut voc, "child", dw::child_overloads());
    add_op_word(&mut voc, "parent", dw::parent_overloads());
    add_op_word(&mut voc, "attribute", dw::attribute_overloads());

    // Projections.
    let mut label = dw::label_overloads();
    label.extend(elf::label_overloads());
    add_op_word(&mut voc, "label", label);

    let mut offset = dw::offset_overloads();
    offset.extend(elf::offset_overloads());
    add_op_word(&mut voc, "offset", offset);

    let mut name = dw::name_overloads();
    name.extend(elf::name_overloads());
    add_op_word(&mut voc, "name", name);

    let mut address = dw::address_overloads();
    address.extend(elf::address_overloads());
    add_op_word(&mut voc, "address", address);

    add_op_word(&mut voc, "value", dw::value_overloads());
    add_op_word(&mut voc, "form", dw::form_overloads());

    // Abbreviations.
    add_op_word(&mut voc, "abbrev", dw::abbrev_overloads());
    add_op_word(&mut voc, "code", dw::code_overloads());
    add_pred_word(&mut voc, "haschildren", dw::haschildren_pred_overloads());

    // Address sets. `add`, `sub`, `length`, `elem`, `relem` and `?empty`
    // fold into the core words of the same name when the vocabularies are
    // merged.
    add_op_word(&mut voc, "aset", aset::aset_overloads());
    add_op_word(&mut voc, "add", aset::add_overloads());
    add_op_word(&mut voc, "sub", aset::sub_overloads());
    add_op_word(&mut voc, "length", aset::length_overloads());
    add_pred_word(&mut voc, "empty", aset::empty_pred_overloads());
    add_pred_word(&mut voc, "contains", aset::contains_pred_overloads());
    add_pred_word(&mut voc, "overlaps", aset::overlaps_pred_overloads());
    add_op_word(&mut voc, "overlap", aset::overlap_overloads());
    add_op_word(&mut voc, "range", aset::range_overloads());
    add_op_word(&mut voc, "low", aset::low_overloads());
    add_op_word(&mut voc, "high", aset::high_overloads());

    let mut elem = aset::elem_overloads();
    elem.extend(dw::loclist_elem_overloads());
    add_op_word(&mut voc, "elem", elem);

    let mut relem = aset::relem_overloads();
    relem.extend(dw::loclist_relem_overloads());
    add_op_word(&mut voc, "relem", relem);

    // ELF.
    add_op_word(&mut voc, "elf", elf::elf_overloads());
    add_op_word(&mut voc, "section", elf::section_overloads());
    add_op_word(&mut voc, "reloc", elf::reloc_overloads());
    add_op_word(&mut voc, "size", elf::size_overloads());
    add_op_word(&mut voc, "binding", elf::binding_overloads());
    add_op_word(&mut voc, "visibility", elf::visibility_overloads());

    let mut symbol = elf::symbol_overloads();
    symbol.extend(elf::reloc_symbol_overloads());
    add_op_word(&mut voc, "symbol", symbol);

    // Per-tag assertions and tag constants.
    for &tag in KNOWN_TAGS {
        let Some(full) = tag.static_string() else {
            continue;
        };
        let Some(suffix) = full.strip_prefix("DW_TAG_") else {
            continue;
        };

        add_constant(&mut voc, Constant::new(tag.0 as i128, &DW_TAG_DOM), full);

        let tab = tab_of(dw::tag_pred_overloads(tag));
        voc.add(Rc::new(OverloadedPredBuiltin::new(
            format!("?TAG_{suffix}"),
            true,
            Rc::clone(&tab),
        )));
        voc.add(Rc::new(OverloadedPredBuiltin::new(
            format!("!TAG_{suffix}"),
            false,
            tab,
        )));
    }

    // Per-attribute traversals, assertions, and attribute constants.
    for &at in KNOWN_ATTRS {
        let Some(full) = at.static_string() else {
            continue;
        };
        let Some(suffix) = full.strip_prefix("DW_AT_") else {
            continue;
        };

        add_constant(&mut voc, Constant::new(at.0 as i128, &DW_AT_DOM), full);
        add_op_word(&mut voc, format!("@AT_{suffix}"), dw::atval_overloads(at));

        let tab = tab_of(dw::at_pred_overloads(at));
        voc.add(Rc::new(OverloadedPredBuiltin::new(
            format!("?AT_{suffix}"),
            true,
            Rc::clone(&tab),
        )));
        voc.add(Rc::new(OverloadedPredBuiltin::new(
            format!("!AT_{suffix}"),
            false,
            tab,
        )));
    }

    // Other enumeration members.
    for (dom, value, name) in enum_constants() {
        add_constant(&mut voc, Constant::new(value as i128, dom), name);
    }

    voc
}
