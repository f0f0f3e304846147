//! DWARF words: file handles, units, entry traversal, attributes.

use std::rc::Rc;
use std::sync::Arc;

use dwquery_lang::builtin::Builtin;
use dwquery_lang::cst::{Constant, DEC_DOM};
use dwquery_lang::error::EvalError;
use dwquery_lang::op::{ValueProducer, VecValueProducer};
use dwquery_lang::overload::{
    once_overload_1, pred_overload_1, yielding_overload_1, Selector,
};
use dwquery_lang::pred::PredResult;
use dwquery_lang::value::{CstValue, StrValue, Value};

use crate::atval;
use crate::context::DwarfContext;
use crate::cst::{ADDRESS_DOM, DW_AT_DOM, DW_FORM_DOM, DW_OP_DOM, DW_TAG_DOM, OFFSET_DOM};
use crate::error::fatal;
use crate::value::{
    AbbrevAttrValue, AbbrevUnitValue, AbbrevValue, AsetValue, AttrValue, CuValue, DieValue,
    Doneness, DwarfValue, ElfValue, LoclistElemValue, LoclistOpValue, SymbolValue,
};

type Overload = (Selector, Rc<dyn Builtin>);

fn produce(items: Vec<Box<dyn Value>>) -> Box<dyn ValueProducer> {
    Box::new(VecValueProducer::new(items))
}

fn cst(value: impl Into<i128>, dom: &'static dyn dwquery_lang::cst::ConstantDom) -> Box<dyn Value> {
    Box::new(CstValue::new(Constant::new(value, dom), 0))
}

/// Children of an entry. In cooked mode, `DW_TAG_imported_unit` entries
/// are traversed transparently: the imported unit's children are spliced
/// in, each carrying a back-link to the importing entry.
pub(crate) fn die_children(die: &DieValue) -> Result<Vec<Box<dyn Value>>, EvalError> {
    fn push_children(
        ctx: &Arc<DwarfContext>,
        unit: usize,
        offset: usize,
        doneness: Doneness,
        import: Option<Rc<DieValue>>,
        out: &mut Vec<Box<dyn Value>>,
    ) -> Result<(), EvalError> {
        for child in ctx.children(unit, offset).map_err(fatal)? {
            if doneness.is_cooked()
                && ctx.die_tag(unit, child).map_err(fatal)? == gimli::DW_TAG_imported_unit
            {
                let attrs = ctx.attributes(unit, child).map_err(fatal)?;
                let target = attrs
                    .iter()
                    .find(|(attr, _)| attr.name() == gimli::DW_AT_import)
                    .map(|(attr, _)| atval::resolve_die_ref(ctx, unit, attr))
                    .transpose()?
                    .flatten();

                if let Some((tu, to)) = target {
                    let importer = Rc::new(
                        DieValue::new(Arc::clone(ctx), unit, child, doneness, 0)
                            .with_import(import.clone()),
                    );
                    push_children(ctx, tu, to, doneness, Some(importer), out)?;
                    continue;
                }
            }

            out.push(Box::new(
                DieValue::new(Arc::clone(ctx), unit, child, doneness, 0)
                    .with_import(import.clone()),
            ));
        }
        Ok(())
    }

    let mut out = Vec::new();
    push_children(
        die.ctx(),
        die.unit(),
        die.offset(),
        die.doneness(),
        die.import().cloned(),
        &mut out,
    )?;
    Ok(out)
}

fn descendants(die: &DieValue, out: &mut Vec<Box<dyn Value>>) -> Result<(), EvalError> {
    out.push(Box::new(die.clone()));
    for child in die_children(die)? {
        let child_die = child
            .downcast_ref::<DieValue>()
            .expect("children are entries")
            .clone();
        descendants(&child_die, out)?;
    }
    Ok(())
}

fn unit_entries(
    ctx: &Arc<DwarfContext>,
    unit: usize,
    doneness: Doneness,
) -> Result<Vec<Box<dyn Value>>, EvalError> {
    let root = DieValue::new(Arc::clone(ctx), unit, ctx.unit_root(unit), doneness, 0);
    let mut out = Vec::new();
    descendants(&root, &mut out)?;
    Ok(out)
}

pub fn dwopen_overloads() -> Vec<Overload> {
    vec![once_overload_1::<StrValue, _>(|s| {
        let ctx = DwarfContext::open(s.string()).map_err(fatal)?;
        Ok(Some(
            Box::new(DwarfValue::new(ctx, Doneness::Cooked, 0)) as Box<dyn Value>
        ))
    })]
}

fn doneness_overloads(doneness: Doneness) -> Vec<Overload> {
    vec![
        once_overload_1::<DwarfValue, _>(move |v| {
            Ok(Some(Box::new(v.with_doneness(doneness)) as Box<dyn Value>))
        }),
        once_overload_1::<CuValue, _>(move |v| {
            Ok(Some(Box::new(v.with_doneness(doneness)) as Box<dyn Value>))
        }),
        once_overload_1::<DieValue, _>(move |v| {
            Ok(Some(Box::new(v.with_doneness(doneness)) as Box<dyn Value>))
        }),
        once_overload_1::<AttrValue, _>(move |v| {
            Ok(Some(Box::new(v.with_doneness(doneness)) as Box<dyn Value>))
        }),
        once_overload_1::<SymbolValue, _>(move |v| {
            Ok(Some(Box::new(v.with_doneness(doneness)) as Box<dyn Value>))
        }),
    ]
}

pub fn raw_overloads() -> Vec<Overload> {
    doneness_overloads(Doneness::Raw)
}

pub fn cooked_overloads() -> Vec<Overload> {
    doneness_overloads(Doneness::Cooked)
}

pub fn unit_overloads() -> Vec<Overload> {
    vec![
        yielding_overload_1::<DwarfValue, _>(|dw| {
            let ctx = dw.ctx();
            let units: Vec<Box<dyn Value>> = (0..ctx.num_units())
                .map(|i| {
                    Box::new(CuValue::new(Arc::clone(ctx), i, dw.doneness(), 0)) as Box<dyn Value>
                })
                .collect();
            Ok(produce(units))
        }),
        once_overload_1::<DieValue, _>(|die| {
            Ok(Some(Box::new(CuValue::new(
                Arc::clone(die.ctx()),
                die.unit(),
                die.doneness(),
                0,
            )) as Box<dyn Value>))
        }),
        once_overload_1::<AttrValue, _>(|attr| {
            Ok(Some(Box::new(CuValue::new(
                Arc::clone(attr.ctx()),
                attr.unit(),
                attr.doneness(),
                0,
            )) as Box<dyn Value>))
        }),
    ]
}

pub fn entry_overloads() -> Vec<Overload> {
    vec![
        yielding_overload_1::<DwarfValue, _>(|dw| {
            let ctx = dw.ctx();
            let mut out = Vec::new();
            for unit in 0..ctx.num_units() {
                // Partial units are only reachable through their import
                // points in cooked mode.
                if dw.doneness().is_cooked()
                    && ctx
                        .die_tag(unit, ctx.unit_root(unit))
                        .map_err(fatal)?
                        == gimli::DW_TAG_partial_unit
                {
                    continue;
                }
                out.extend(unit_entries(ctx, unit, dw.doneness())?);
            }
            Ok(produce(out))
        }),
        yielding_overload_1::<CuValue, _>(|cu| {
            Ok(produce(unit_entries(cu.ctx(), cu.unit(), cu.doneness())?))
        }),
        yielding_overload_1::<AbbrevUnitValue, _>(|au| {
            let ctx = au.ctx();
            let decls: Vec<Box<dyn Value>> = ctx
                .abbrev_decls(au.unit())
                .into_iter()
                .map(|decl| {
                    Box::new(AbbrevValue::new(Arc::clone(ctx), au.unit(), decl, 0))
                        as Box<dyn Value>
                })
                .collect();
            Ok(produce(decls))
        }),
    ]
}

pub fn root_overloads() -> Vec<Overload> {
    vec![
        once_overload_1::<CuValue, _>(|cu| {
            Ok(Some(Box::new(DieValue::new(
                Arc::clone(cu.ctx()),
                cu.unit(),
                cu.ctx().unit_root(cu.unit()),
                cu.doneness(),
                0,
            )) as Box<dyn Value>))
        }),
        once_overload_1::<DieValue, _>(|die| {
            Ok(Some(Box::new(DieValue::new(
                Arc::clone(die.ctx()),
                die.unit(),
                die.ctx().unit_root(die.unit()),
                die.doneness(),
                0,
            )) as Box<dyn Value>))
        }),
    ]
}

pub fn root_pred_overloads() -> Vec<Overload> {
    vec![pred_overload_1::<DieValue, _>(|die| {
        Ok(PredResult::from(
            die.offset() == die.ctx().unit_root(die.unit()),
        ))
    })]
}

pub fn child_overloads() -> Vec<Overload> {
    vec![yielding_overload_1::<DieValue, _>(|die| {
        Ok(produce(die_children(&die)?))
    })]
}

/// The cooked parent of an entry reached through an import point is found
/// by returning through the importing entry.
fn die_parent(die: &DieValue) -> Result<Option<DieValue>, EvalError> {
    let ctx = die.ctx();
    match ctx.parent_of(die.unit(), die.offset()).map_err(fatal)? {
        Some(parent) => {
            // A parent inside the imported unit is reached through the
            // same import chain.
            Ok(Some(
                DieValue::new(Arc::clone(ctx), die.unit(), parent, die.doneness(), 0)
                    .with_import(die.import().cloned()),
            ))
        }
        None => match die.import() {
            Some(importer) if die.doneness().is_cooked() => die_parent(importer),
            _ => Ok(None),
        },
    }
}

pub fn parent_overloads() -> Vec<Overload> {
    vec![yielding_overload_1::<DieValue, _>(|die| {
        let parent = die_parent(&die)?;
        Ok(produce(
            parent
                .into_iter()
                .map(|p| Box::new(p) as Box<dyn Value>)
                .collect(),
        ))
    })]
}

pub fn attribute_overloads() -> Vec<Overload> {
    vec![
        yielding_overload_1::<DieValue, _>(|die| {
            let attrs = atval::die_attributes(&die)?;
            Ok(produce(
                attrs
                    .into_iter()
                    .map(|a| Box::new(a) as Box<dyn Value>)
                    .collect(),
            ))
        }),
        yielding_overload_1::<AbbrevValue, _>(|abbrev| {
            let specs: Vec<Box<dyn Value>> = abbrev
                .decl()
                .attrs
                .iter()
                .map(|&(name, form)| Box::new(AbbrevAttrValue::new(name, form, 0)) as Box<dyn Value>)
                .collect();
            Ok(produce(specs))
        }),
    ]
}

pub fn label_overloads() -> Vec<Overload> {
    vec![
        once_overload_1::<DieValue, _>(|die| {
            let tag = die.ctx().die_tag(die.unit(), die.offset()).map_err(fatal)?;
            Ok(Some(cst(tag.0 as i128, &DW_TAG_DOM)))
        }),
        once_overload_1::<AttrValue, _>(|attr| {
            Ok(Some(cst(attr.attr().name().0 as i128, &DW_AT_DOM)))
        }),
        once_overload_1::<AbbrevValue, _>(|abbrev| {
            Ok(Some(cst(abbrev.decl().tag.0 as i128, &DW_TAG_DOM)))
        }),
        once_overload_1::<AbbrevAttrValue, _>(|spec| {
            Ok(Some(cst(spec.name.0 as i128, &DW_AT_DOM)))
        }),
        once_overload_1::<LoclistOpValue, _>(|op| {
            Ok(Some(cst(op.op().atom as i128, &DW_OP_DOM)))
        }),
        once_overload_1::<SymbolValue, _>(|sym| {
            Ok(Some(cst(
                sym.record().sym_type() as i128,
                &crate::cst::STT_DOM,
            )))
        }),
    ]
}

pub fn offset_overloads() -> Vec<Overload> {
    vec![
        once_overload_1::<CuValue, _>(|cu| Ok(Some(cst(cu.offset(), &OFFSET_DOM)))),
        once_overload_1::<DieValue, _>(|die| Ok(Some(cst(die.global_offset(), &OFFSET_DOM)))),
        once_overload_1::<AbbrevUnitValue, _>(|au| {
            let offset = au.ctx().unit(au.unit()).header.debug_abbrev_offset().0;
            Ok(Some(cst(offset as i128, &OFFSET_DOM)))
        }),
        once_overload_1::<LoclistOpValue, _>(|op| Ok(Some(cst(op.op().offset, &OFFSET_DOM)))),
    ]
}

pub fn name_overloads() -> Vec<Overload> {
    vec![
        once_overload_1::<DwarfValue, _>(|dw| {
            Ok(Some(
                Box::new(StrValue::new(dw.ctx().path(), 0)) as Box<dyn Value>
            ))
        }),
        once_overload_1::<ElfValue, _>(|elf| {
            Ok(Some(
                Box::new(StrValue::new(elf.ctx().path(), 0)) as Box<dyn Value>
            ))
        }),
        yielding_overload_1::<DieValue, _>(|die| {
            let name = atval::die_name(&die)?;
            Ok(produce(
                name.into_iter()
                    .map(|n| Box::new(StrValue::new(n, 0)) as Box<dyn Value>)
                    .collect(),
            ))
        }),
        once_overload_1::<SymbolValue, _>(|sym| {
            Ok(Some(
                Box::new(StrValue::new(sym.record().name.clone(), 0)) as Box<dyn Value>
            ))
        }),
    ]
}

pub fn value_overloads() -> Vec<Overload> {
    vec![
        yielding_overload_1::<AttrValue, _>(|attr| Ok(produce(atval::attribute_values(&attr)?))),
        once_overload_1::<SymbolValue, _>(|sym| {
            Ok(Some(cst(sym.record().value, &ADDRESS_DOM)))
        }),
    ]
}

pub fn form_overloads() -> Vec<Overload> {
    vec![
        once_overload_1::<AttrValue, _>(|attr| {
            Ok(Some(cst(attr.form().0 as i128, &DW_FORM_DOM)))
        }),
        once_overload_1::<AbbrevAttrValue, _>(|spec| {
            Ok(Some(cst(spec.form.0 as i128, &DW_FORM_DOM)))
        }),
    ]
}

pub fn address_overloads() -> Vec<Overload> {
    vec![
        once_overload_1::<DieValue, _>(|die| {
            let cov = atval::die_ranges(&die)?;
            Ok(Some(Box::new(AsetValue::new(cov, 0)) as Box<dyn Value>))
        }),
        once_overload_1::<AttrValue, _>(|attr| {
            for value in atval::attribute_values(&attr)? {
                if value.is::<CstValue>() {
                    return Ok(Some(value));
                }
            }
            eprintln!("Error: `address': attribute has no address value.");
            Ok(None)
        }),
        once_overload_1::<LoclistElemValue, _>(|elem| {
            Ok(Some(Box::new(AsetValue::new(
                crate::coverage::Coverage::of(elem.low(), elem.high()),
                0,
            )) as Box<dyn Value>))
        }),
        once_overload_1::<SymbolValue, _>(|sym| {
            Ok(Some(cst(sym.record().value, &ADDRESS_DOM)))
        }),
    ]
}

pub fn abbrev_overloads() -> Vec<Overload> {
    vec![
        once_overload_1::<CuValue, _>(|cu| {
            Ok(Some(Box::new(AbbrevUnitValue::new(
                Arc::clone(cu.ctx()),
                cu.unit(),
                0,
            )) as Box<dyn Value>))
        }),
        yielding_overload_1::<DwarfValue, _>(|dw| {
            let ctx = dw.ctx();
            // One abbreviation unit per distinct table offset.
            let mut seen = Vec::new();
            let mut out: Vec<Box<dyn Value>> = Vec::new();
            for unit in 0..ctx.num_units() {
                let offset = ctx.unit(unit).header.debug_abbrev_offset().0;
                if seen.contains(&offset) {
                    continue;
                }
                seen.push(offset);
                out.push(Box::new(AbbrevUnitValue::new(Arc::clone(ctx), unit, 0)));
            }
            Ok(produce(out))
        }),
        once_overload_1::<DieValue, _>(|die| {
            match die
                .ctx()
                .die_abbrev(die.unit(), die.offset())
                .map_err(fatal)?
            {
                Some(decl) => Ok(Some(Box::new(AbbrevValue::new(
                    Arc::clone(die.ctx()),
                    die.unit(),
                    decl,
                    0,
                )) as Box<dyn Value>)),
                None => {
                    eprintln!("Error: `abbrev': no abbreviation for entry.");
                    Ok(None)
                }
            }
        }),
    ]
}

pub fn code_overloads() -> Vec<Overload> {
    vec![once_overload_1::<AbbrevValue, _>(|abbrev| {
        Ok(Some(cst(abbrev.decl().code, &DEC_DOM)))
    })]
}

pub fn haschildren_pred_overloads() -> Vec<Overload> {
    vec![
        pred_overload_1::<AbbrevValue, _>(|abbrev| {
            Ok(PredResult::from(abbrev.decl().has_children))
        }),
        pred_overload_1::<DieValue, _>(|die| {
            Ok(PredResult::from(
                !die.ctx()
                    .children(die.unit(), die.offset())
                    .map_err(fatal)?
                    .is_empty(),
            ))
        }),
    ]
}

/// `elem` over a location list element: its opcodes in order.
pub fn loclist_elem_overloads() -> Vec<Overload> {
    vec![yielding_overload_1::<LoclistElemValue, _>(|elem| {
        let ops: Vec<Box<dyn Value>> = elem
            .ops()
            .iter()
            .map(|&op| Box::new(LoclistOpValue::new(Arc::clone(elem.ctx()), op, 0)) as Box<dyn Value>)
            .collect();
        Ok(produce(ops))
    })]
}

pub fn loclist_relem_overloads() -> Vec<Overload> {
    vec![yielding_overload_1::<LoclistElemValue, _>(|elem| {
        let mut ops: Vec<Box<dyn Value>> = elem
            .ops()
            .iter()
            .map(|&op| Box::new(LoclistOpValue::new(Arc::clone(elem.ctx()), op, 0)) as Box<dyn Value>)
            .collect();
        ops.reverse();
        Ok(produce(ops))
    })]
}

/// The `@AT_*` traversal for one attribute.
pub fn atval_overloads(at: gimli::DwAt) -> Vec<Overload> {
    vec![yielding_overload_1::<DieValue, _>(move |die| {
        match atval::find_attribute(&die, at)? {
            Some(attr) => Ok(produce(atval::attribute_values(&attr)?)),
            None => Ok(produce(Vec::new())),
        }
    })]
}

/// The `?AT_*` assertion for one attribute.
pub fn at_pred_overloads(at: gimli::DwAt) -> Vec<Overload> {
    vec![
        pred_overload_1::<DieValue, _>(move |die| {
            Ok(PredResult::from(
                atval::find_attribute(die, at)?.is_some(),
            ))
        }),
        pred_overload_1::<AttrValue, _>(move |attr| {
            Ok(PredResult::from(attr.attr().name() == at))
        }),
    ]
}

/// The `?TAG_*` assertion for one tag.
pub fn tag_pred_overloads(tag: gimli::DwTag) -> Vec<Overload> {
    vec![
        pred_overload_1::<DieValue, _>(move |die| {
            Ok(PredResult::from(
                die.ctx().die_tag(die.unit(), die.offset()).map_err(fatal)? == tag,
            ))
        }),
        pred_overload_1::<AbbrevValue, _>(move |abbrev| {
            Ok(PredResult::from(abbrev.decl().tag == tag))
        }),
    ]
}
