//! Interpretation of attribute values.
//!
//! `value` on an attribute (and the `@AT_*` traversals) produce typed
//! values: strings, DIE references, addresses, flags, enumeration
//! constants, source file paths, location list elements, and address sets.

use std::sync::Arc;

use dwquery_lang::cst::{Constant, BOOL_DOM, DEC_DOM};
use dwquery_lang::error::EvalError;
use dwquery_lang::value::{Brevity, CstValue, SeqValue, StrValue, Value};
use gimli::read::AttributeValue;
use gimli::Reader as _;

use crate::context::{DwarfContext, Reader};
use crate::coverage::Coverage;
use crate::cst::{
    ADDRESS_DOM, DW_ACCESS_DOM, DW_ADDR_DOM, DW_ATE_DOM, DW_CC_DOM, DW_DS_DOM, DW_END_DOM,
    DW_ID_DOM, DW_INL_DOM, DW_LANG_DOM, DW_ORD_DOM, DW_VIRTUALITY_DOM, DW_VIS_DOM, OFFSET_DOM,
};
use crate::error::fatal;
use crate::value::{AttrValue, DieValue, LocOpRecord, LoclistElemValue};

fn cst(value: impl Into<i128>, dom: &'static dyn dwquery_lang::cst::ConstantDom) -> Box<dyn Value> {
    Box::new(CstValue::new(Constant::new(value, dom), 0))
}

fn string(s: impl Into<String>) -> Box<dyn Value> {
    Box::new(StrValue::new(s, 0))
}

/// Resolves a reference-class attribute to (unit index, unit offset).
pub fn resolve_die_ref(
    ctx: &Arc<DwarfContext>,
    unit: usize,
    attr: &gimli::read::Attribute<Reader>,
) -> Result<Option<(usize, usize)>, EvalError> {
    match attr.value() {
        AttributeValue::UnitRef(off) => Ok(Some((unit, off.0))),
        AttributeValue::DebugInfoRef(off) => {
            let global = off.0 as u64;
            let unit = ctx.unit_index_of_offset(global).map_err(fatal)?;
            let local = (global - ctx.unit_offset(unit)) as usize;
            Ok(Some((unit, local)))
        }
        _ => Ok(None),
    }
}

/// Decodes the opcodes of a location expression. Offsets are relative to
/// the start of the expression.
pub fn parse_ops(unit: &gimli::Unit<Reader>, expr: &gimli::Expression<Reader>) -> Vec<LocOpRecord> {
    let mut out = Vec::new();
    let mut reader = expr.0.clone();
    let total = reader.len();

    while !reader.is_empty() {
        let offset = (total - reader.len()) as u64;
        let atom = {
            let mut peek = reader.clone();
            match peek.read_u8() {
                Ok(atom) => atom,
                Err(_) => break,
            }
        };
        match gimli::read::Operation::parse(&mut reader, unit.encoding()) {
            Ok(_) => out.push(LocOpRecord { offset, atom }),
            Err(_) => break,
        }
    }

    out
}

fn location_attr(name: gimli::DwAt) -> bool {
    matches!(
        name,
        gimli::DW_AT_location
            | gimli::DW_AT_frame_base
            | gimli::DW_AT_data_member_location
            | gimli::DW_AT_vtable_elem_location
            | gimli::DW_AT_use_location
            | gimli::DW_AT_string_length
            | gimli::DW_AT_return_addr
            | gimli::DW_AT_static_link
            | gimli::DW_AT_segment
    )
}

fn loclist_values(
    ctx: &Arc<DwarfContext>,
    unit_idx: usize,
    name: gimli::DwAt,
    offset: gimli::LocationListsOffset<usize>,
) -> Result<Vec<Box<dyn Value>>, EvalError> {
    let unit = ctx.unit(unit_idx);
    let mut iter = ctx.dwarf().locations(unit, offset).map_err(fatal)?;

    let mut out: Vec<Box<dyn Value>> = Vec::new();
    while let Some(entry) = iter.next().map_err(fatal)? {
        let ops = parse_ops(unit, &entry.data);
        out.push(Box::new(LoclistElemValue::new(
            Arc::clone(ctx),
            name,
            entry.range.begin,
            entry.range.end,
            ops,
            0,
        )));
    }
    Ok(out)
}

fn range_values(
    ctx: &Arc<DwarfContext>,
    unit_idx: usize,
    offset: gimli::RangeListsOffset<usize>,
) -> Result<Vec<Box<dyn Value>>, EvalError> {
    let unit = ctx.unit(unit_idx);
    let mut iter = ctx.dwarf().ranges(unit, offset).map_err(fatal)?;

    let mut cov = Coverage::new();
    while let Some(range) = iter.next().map_err(fatal)? {
        cov.add(range.begin, range.end);
    }
    Ok(vec![Box::new(crate::value::AsetValue::new(cov, 0))])
}

/// Looks up a sibling attribute of the same entry.
fn sibling_attr(
    av: &AttrValue,
    name: gimli::DwAt,
) -> Result<Option<gimli::read::Attribute<Reader>>, EvalError> {
    let attrs = av
        .ctx()
        .attributes(av.unit(), av.die_offset())
        .map_err(fatal)?;
    Ok(attrs
        .into_iter()
        .map(|(attr, _)| attr)
        .find(|attr| attr.name() == name))
}

/// Signedness inference for `DW_AT_const_value` with an ambiguous data
/// form: consult the type's encoding, otherwise fall back to signed with a
/// warning.
fn const_value_signed(av: &AttrValue) -> Result<bool, EvalError> {
    if let Some(type_attr) = sibling_attr(av, gimli::DW_AT_type)? {
        if let Some((unit, offset)) = resolve_die_ref(av.ctx(), av.unit(), &type_attr)? {
            let mut cursor = Some((unit, offset));
            // Strip typedefs and qualifiers down to a base type.
            for _ in 0..16 {
                let Some((u, o)) = cursor else { break };
                let attrs = av.ctx().attributes(u, o).map_err(fatal)?;
                let encoding = attrs.iter().find_map(|(attr, _)| {
                    if attr.name() != gimli::DW_AT_encoding {
                        return None;
                    }
                    match attr.value() {
                        AttributeValue::Encoding(ate) => Some(ate),
                        _ => None,
                    }
                });
                if let Some(ate) = encoding {
                    return Ok(matches!(
                        ate,
                        gimli::DW_ATE_signed | gimli::DW_ATE_signed_char
                    ));
                }
                cursor = attrs
                    .iter()
                    .find(|(attr, _)| attr.name() == gimli::DW_AT_type)
                    .map(|(attr, _)| resolve_die_ref(av.ctx(), u, attr))
                    .transpose()?
                    .flatten();
            }
        }
    }

    eprintln!("Can't decide signedness of DW_AT_const_value; assuming signed.");
    Ok(true)
}

/// The typed interpretation of one attribute. An attribute may yield
/// several values (a location list) or none.
pub fn attribute_values(av: &AttrValue) -> Result<Vec<Box<dyn Value>>, EvalError> {
    let ctx = av.ctx();
    let unit_idx = av.unit();
    let unit = ctx.unit(unit_idx);
    let name = av.attr().name();
    let doneness = av.doneness();

    let one = |v: Box<dyn Value>| Ok(vec![v]);

    match av.attr().value() {
        AttributeValue::String(_)
        | AttributeValue::DebugStrRef(_)
        | AttributeValue::DebugLineStrRef(_)
        | AttributeValue::DebugStrRefSup(_) => {
            let s = ctx
                .dwarf()
                .attr_string(unit, av.attr().value())
                .map_err(fatal)?;
            one(string(s.to_string_lossy().map_err(fatal)?.into_owned()))
        }

        AttributeValue::Addr(addr) => one(cst(addr, &ADDRESS_DOM)),

        AttributeValue::DebugAddrIndex(index) => {
            let addr = ctx.dwarf().address(unit, index).map_err(fatal)?;
            one(cst(addr, &ADDRESS_DOM))
        }

        AttributeValue::UnitRef(_) | AttributeValue::DebugInfoRef(_) => {
            let (unit, offset) = resolve_die_ref(ctx, unit_idx, av.attr())?
                .expect("reference attribute resolves");
            one(Box::new(DieValue::new(
                Arc::clone(ctx),
                unit,
                offset,
                doneness,
                0,
            )))
        }

        AttributeValue::Flag(flag) => one(cst(flag as i128, &BOOL_DOM)),

        AttributeValue::Encoding(v) => one(cst(v.0 as i128, &DW_ATE_DOM)),
        AttributeValue::Language(v) => one(cst(v.0 as i128, &DW_LANG_DOM)),
        AttributeValue::Accessibility(v) => one(cst(v.0 as i128, &DW_ACCESS_DOM)),
        AttributeValue::Visibility(v) => one(cst(v.0 as i128, &DW_VIS_DOM)),
        AttributeValue::Virtuality(v) => one(cst(v.0 as i128, &DW_VIRTUALITY_DOM)),
        AttributeValue::IdentifierCase(v) => one(cst(v.0 as i128, &DW_ID_DOM)),
        AttributeValue::CallingConvention(v) => one(cst(v.0 as i128, &DW_CC_DOM)),
        AttributeValue::Inline(v) => one(cst(v.0 as i128, &DW_INL_DOM)),
        AttributeValue::Ordering(v) => one(cst(v.0 as i128, &DW_ORD_DOM)),
        AttributeValue::DecimalSign(v) => one(cst(v.0 as i128, &DW_DS_DOM)),
        AttributeValue::Endianity(v) => one(cst(v.0 as i128, &DW_END_DOM)),
        AttributeValue::AddressClass(v) => one(cst(v.0 as i128, &DW_ADDR_DOM)),

        AttributeValue::FileIndex(index) => {
            match ctx.file_path(unit_idx, index).map_err(fatal)? {
                Some(path) => one(string(path)),
                None => one(cst(index, &DEC_DOM)),
            }
        }

        AttributeValue::Exprloc(expr) => {
            let ops = parse_ops(unit, &expr);
            one(Box::new(LoclistElemValue::new(
                Arc::clone(ctx),
                name,
                0,
                u64::MAX,
                ops,
                0,
            )))
        }

        AttributeValue::LocationListsRef(offset) => loclist_values(ctx, unit_idx, name, offset),

        AttributeValue::RangeListsRef(raw) => {
            let offset = ctx.dwarf().ranges_offset_from_raw(unit, raw);
            range_values(ctx, unit_idx, offset)
        }

        AttributeValue::SecOffset(offset) => {
            if name == gimli::DW_AT_ranges {
                range_values(ctx, unit_idx, gimli::RangeListsOffset(offset))
            } else if location_attr(name) {
                loclist_values(ctx, unit_idx, name, gimli::LocationListsOffset(offset))
            } else {
                one(cst(offset as i128, &OFFSET_DOM))
            }
        }

        AttributeValue::Block(block) => {
            let bytes = block.to_slice().map_err(fatal)?;
            let elements = bytes
                .iter()
                .map(|&b| cst(b, &DEC_DOM))
                .collect::<Vec<_>>();
            one(Box::new(SeqValue::new(elements, 0)))
        }

        AttributeValue::Sdata(v) => one(cst(v, &DEC_DOM)),

        AttributeValue::Udata(v) => {
            if name == gimli::DW_AT_high_pc || name == gimli::DW_AT_entry_pc {
                // A data-form high_pc is an offset from the entry's low_pc.
                if let Some(low) = sibling_attr(av, gimli::DW_AT_low_pc)?
                    .and_then(|attr| match attr.value() {
                        AttributeValue::Addr(a) => Some(a),
                        _ => None,
                    })
                {
                    return one(cst(low + v, &ADDRESS_DOM));
                }
            }
            one(cst(v, &DEC_DOM))
        }

        AttributeValue::Data1(v) => data_value(av, v as u64, 1),
        AttributeValue::Data2(v) => data_value(av, v as u64, 2),
        AttributeValue::Data4(v) => data_value(av, v as u64, 4),
        AttributeValue::Data8(v) => data_value(av, v, 8),

        AttributeValue::DebugTypesRef(sig) => one(cst(sig.0, &OFFSET_DOM)),
        AttributeValue::DebugLineRef(offset) => one(cst(offset.0 as i128, &OFFSET_DOM)),

        other => match other.udata_value() {
            Some(v) => one(cst(v, &DEC_DOM)),
            None => one(string(format!("{other:?}"))),
        },
    }
}

/// Fixed-size data: most attributes take these as plain unsigned numbers,
/// but `DW_AT_const_value` needs a signedness decision.
fn data_value(av: &AttrValue, v: u64, size: u32) -> Result<Vec<Box<dyn Value>>, EvalError> {
    let name = av.attr().name();

    if name == gimli::DW_AT_high_pc {
        if let Some(low) = sibling_attr(av, gimli::DW_AT_low_pc)?.and_then(|attr| {
            match attr.value() {
                AttributeValue::Addr(a) => Some(a),
                _ => None,
            }
        }) {
            return Ok(vec![cst(low + v, &ADDRESS_DOM)]);
        }
    }

    if name == gimli::DW_AT_const_value && const_value_signed(av)? {
        let bits = size * 8;
        let signed = if bits < 64 {
            let mask = 1u64 << (bits - 1);
            ((v ^ mask).wrapping_sub(mask)) as i64
        } else {
            v as i64
        };
        return Ok(vec![cst(signed, &DEC_DOM)]);
    }

    Ok(vec![cst(v, &DEC_DOM)])
}

/// The integrated attributes of an entry. Cooked entries pull in the
/// attributes of their `DW_AT_specification` and `DW_AT_abstract_origin`
/// targets, first declaration wins.
pub fn die_attributes(die: &DieValue) -> Result<Vec<AttrValue>, EvalError> {
    let ctx = die.ctx();
    let cooked = die.doneness().is_cooked();

    let mut out = Vec::new();
    let mut seen: Vec<u16> = Vec::new();
    let mut visited: Vec<(usize, usize)> = Vec::new();
    let mut frontier: Vec<(usize, usize)> = vec![(die.unit(), die.offset())];
    let mut pos = 0;

    while let Some((unit, offset)) = frontier.pop() {
        if visited.contains(&(unit, offset)) {
            continue;
        }
        visited.push((unit, offset));

        for (attr, form) in ctx.attributes(unit, offset).map_err(fatal)? {
            let name = attr.name();
            if seen.contains(&name.0) {
                continue;
            }
            seen.push(name.0);

            if cooked
                && (name == gimli::DW_AT_specification || name == gimli::DW_AT_abstract_origin)
            {
                if let Some(target) = resolve_die_ref(ctx, unit, &attr)? {
                    frontier.push(target);
                }
            }

            out.push(AttrValue::new(
                Arc::clone(ctx),
                unit,
                offset,
                attr,
                form,
                die.doneness(),
                pos,
            ));
            pos += 1;
        }
    }

    Ok(out)
}

/// Finds one attribute of an entry, following integration in cooked mode.
pub fn find_attribute(die: &DieValue, name: gimli::DwAt) -> Result<Option<AttrValue>, EvalError> {
    Ok(die_attributes(die)?
        .into_iter()
        .find(|av| av.attr().name() == name))
}

/// The name of an entry, if it has one.
pub fn die_name(die: &DieValue) -> Result<Option<String>, EvalError> {
    let Some(av) = find_attribute(die, gimli::DW_AT_name)? else {
        return Ok(None);
    };
    for value in attribute_values(&av)? {
        if let Some(s) = value.downcast_ref::<StrValue>() {
            return Ok(Some(s.string().to_string()));
        }
    }
    Ok(None)
}

/// The address ranges covered by an entry.
pub fn die_ranges(die: &DieValue) -> Result<Coverage, EvalError> {
    let ctx = die.ctx();
    let unit = ctx.unit(die.unit());
    let entry = ctx.entry(die.unit(), die.offset()).map_err(fatal)?;

    let mut cov = Coverage::new();
    let mut iter = ctx.dwarf().die_ranges(unit, &entry).map_err(fatal)?;
    while let Some(range) = iter.next().map_err(fatal)? {
        cov.add(range.begin, range.end);
    }
    Ok(cov)
}

/// Renders the first interpreted value of an attribute, for display.
pub fn render_value_brief(av: &AttrValue) -> String {
    match attribute_values(av) {
        Ok(values) => match values.first() {
            Some(v) => {
                let mut s = String::new();
                let _ = v.show(&mut s, Brevity::Brief);
                s
            }
            None => String::new(),
        },
        Err(_) => "???".to_string(),
    }
}

/// One line per attribute, used by the full rendering of an entry.
pub fn attribute_lines(die: &DieValue) -> Vec<String> {
    match die_attributes(die) {
        Ok(attrs) => attrs
            .iter()
            .map(|av| {
                let mut s = String::new();
                let _ = av.show(&mut s, Brevity::Brief);
                s
            })
            .collect(),
        Err(_) => vec!["???".to_string()],
    }
}
