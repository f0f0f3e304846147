//! ELF words: the container, sections, symbols, and relocations.

use std::rc::Rc;
use std::sync::Arc;

use dwquery_lang::builtin::Builtin;
use dwquery_lang::cst::{Constant, DEC_DOM};
use dwquery_lang::op::{ValueProducer, VecValueProducer};
use dwquery_lang::overload::{once_overload_1, yielding_overload_1, Selector};
use dwquery_lang::value::{CstValue, StrValue, Value};

use crate::cst::{ADDRESS_DOM, OFFSET_DOM, SHT_DOM, STB_DOM, STV_DOM};
use crate::value::{Doneness, DwarfValue, ElfSectionValue, ElfValue, RelocationValue, SymbolValue};

type Overload = (Selector, Rc<dyn Builtin>);

fn produce(items: Vec<Box<dyn Value>>) -> Box<dyn ValueProducer> {
    Box::new(VecValueProducer::new(items))
}

fn cst(value: impl Into<i128>, dom: &'static dyn dwquery_lang::cst::ConstantDom) -> Box<dyn Value> {
    Box::new(CstValue::new(Constant::new(value, dom), 0))
}

/// `elf` — the container of a DWARF file.
pub fn elf_overloads() -> Vec<Overload> {
    vec![once_overload_1::<DwarfValue, _>(|dw| {
        Ok(Some(
            Box::new(ElfValue::new(Arc::clone(dw.ctx()), 0)) as Box<dyn Value>
        ))
    })]
}

pub fn section_overloads() -> Vec<Overload> {
    vec![yielding_overload_1::<ElfValue, _>(|elf| {
        let ctx = elf.ctx();
        let sections: Vec<Box<dyn Value>> = (0..ctx.sections().len())
            .map(|i| Box::new(ElfSectionValue::new(Arc::clone(ctx), i, 0)) as Box<dyn Value>)
            .collect();
        Ok(produce(sections))
    })]
}

pub fn symbol_overloads() -> Vec<Overload> {
    vec![
        yielding_overload_1::<DwarfValue, _>(|dw| {
            let ctx = dw.ctx();
            let doneness = dw.doneness();
            let symbols: Vec<Box<dyn Value>> = (0..ctx.symbols().len())
                .map(|i| {
                    Box::new(SymbolValue::new(Arc::clone(ctx), i, doneness, 0)) as Box<dyn Value>
                })
                .collect();
            Ok(produce(symbols))
        }),
        yielding_overload_1::<ElfValue, _>(|elf| {
            let ctx = elf.ctx();
            let symbols: Vec<Box<dyn Value>> = (0..ctx.symbols().len())
                .map(|i| {
                    Box::new(SymbolValue::new(Arc::clone(ctx), i, Doneness::Cooked, 0))
                        as Box<dyn Value>
                })
                .collect();
            Ok(produce(symbols))
        }),
    ]
}

/// `reloc` — the relocations that patch a section.
pub fn reloc_overloads() -> Vec<Overload> {
    vec![yielding_overload_1::<ElfSectionValue, _>(|section| {
        let ctx = section.ctx();
        let relocs: Vec<Box<dyn Value>> = ctx
            .relocations()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.target_section == section.index())
            .map(|(i, _)| Box::new(RelocationValue::new(Arc::clone(ctx), i, 0)) as Box<dyn Value>)
            .collect();
        Ok(produce(relocs))
    })]
}

pub fn name_overloads() -> Vec<Overload> {
    vec![once_overload_1::<ElfSectionValue, _>(|section| {
        Ok(Some(
            Box::new(StrValue::new(section.record().name.clone(), 0)) as Box<dyn Value>,
        ))
    })]
}

pub fn label_overloads() -> Vec<Overload> {
    vec![
        once_overload_1::<ElfSectionValue, _>(|section| {
            Ok(Some(cst(section.record().sh_type, &SHT_DOM)))
        }),
        once_overload_1::<RelocationValue, _>(|reloc| {
            Ok(Some(cst(reloc.record().rtype, &DEC_DOM)))
        }),
    ]
}

pub fn address_overloads() -> Vec<Overload> {
    vec![once_overload_1::<ElfSectionValue, _>(|section| {
        Ok(Some(cst(section.record().address, &ADDRESS_DOM)))
    })]
}

pub fn offset_overloads() -> Vec<Overload> {
    vec![
        once_overload_1::<ElfSectionValue, _>(|section| {
            Ok(Some(cst(section.record().offset, &OFFSET_DOM)))
        }),
        once_overload_1::<RelocationValue, _>(|reloc| {
            Ok(Some(cst(reloc.record().offset, &ADDRESS_DOM)))
        }),
    ]
}

pub fn size_overloads() -> Vec<Overload> {
    vec![
        once_overload_1::<ElfSectionValue, _>(|section| {
            Ok(Some(cst(section.record().size, &DEC_DOM)))
        }),
        once_overload_1::<SymbolValue, _>(|sym| Ok(Some(cst(sym.record().size, &DEC_DOM)))),
    ]
}

pub fn binding_overloads() -> Vec<Overload> {
    vec![once_overload_1::<SymbolValue, _>(|sym| {
        Ok(Some(cst(sym.record().binding(), &STB_DOM)))
    })]
}

pub fn visibility_overloads() -> Vec<Overload> {
    vec![once_overload_1::<SymbolValue, _>(|sym| {
        Ok(Some(cst(sym.record().visibility(), &STV_DOM)))
    })]
}

/// `symbol` on a relocation: the symbol the relocation refers to.
pub fn reloc_symbol_overloads() -> Vec<Overload> {
    vec![yielding_overload_1::<RelocationValue, _>(|reloc| {
        let ctx = reloc.ctx();
        let out: Vec<Box<dyn Value>> = ctx
            .symbols()
            .get(reloc.record().sym_index)
            .map(|rec| {
                Box::new(SymbolValue::new(Arc::clone(ctx), rec.index, Doneness::Cooked, 0))
                    as Box<dyn Value>
            })
            .into_iter()
            .collect();
        Ok(produce(out))
    })]
}
