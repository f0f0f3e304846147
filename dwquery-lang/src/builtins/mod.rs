//! The core vocabulary.
//!
//! The vocabulary is assembled explicitly and passed to the parser; there
//! is no global registration. DWARF-aware front ends merge their own
//! vocabulary on top with [`crate::builtin::Vocabulary::extend`], which
//! folds additional overloads into the words registered here.

pub mod arith;
pub mod closure;
pub mod cmp;
pub mod cst;
pub mod seq;
pub mod shf;
pub mod string;

use std::cell::RefCell;
use std::rc::Rc;

use crate::builtin::{add_constant, add_type_constant, Vocabulary};
use crate::cst::{Constant, BIN_DOM, BOOL_DOM, DEC_DOM, HEX_DOM, OCT_DOM};
use crate::overload::{OverloadTab, OverloadedOpBuiltin, OverloadedPredBuiltin};
use crate::value::{ClosureValue, CstValue, SeqValue, StrValue};

fn overload_tab(
    entries: Vec<(crate::overload::Selector, Rc<dyn crate::builtin::Builtin>)>,
) -> Rc<RefCell<OverloadTab>> {
    let tab = Rc::new(RefCell::new(OverloadTab::new()));
    {
        let mut t = tab.borrow_mut();
        for (sel, builtin) in entries {
            t.add_overload(sel, builtin);
        }
    }
    tab
}

/// Builds the vocabulary of the language core.
pub fn core_vocabulary() -> Vocabulary {
    let mut voc = Vocabulary::new();

    add_type_constant(&mut voc, CstValue::VTYPE);
    add_type_constant(&mut voc, StrValue::VTYPE);
    add_type_constant(&mut voc, SeqValue::VTYPE);
    add_type_constant(&mut voc, ClosureValue::VTYPE);

    // Arithmetic. Each word is overloaded so other value kinds can join
    // in; `add` gains the string and sequence concatenations below.
    {
        let tab = overload_tab(vec![arith::sub_cst_overload()]);
        voc.add(Rc::new(OverloadedOpBuiltin::new("sub", tab)));
    }
    {
        let tab = overload_tab(vec![arith::mul_cst_overload()]);
        voc.add(Rc::new(OverloadedOpBuiltin::new("mul", tab)));
    }
    {
        let tab = overload_tab(vec![arith::div_cst_overload()]);
        voc.add(Rc::new(OverloadedOpBuiltin::new("div", tab)));
    }
    {
        let tab = overload_tab(vec![arith::mod_cst_overload()]);
        voc.add(Rc::new(OverloadedOpBuiltin::new("mod", tab)));
    }

    voc.add(Rc::new(closure::ApplyBuiltin));

    // Comparison assertions, including the aliased spellings.
    for builtin in cmp::comparison_builtins() {
        voc.add(Rc::new(builtin));
    }

    // Display-domain casts and boolean constants.
    voc.add(Rc::new(cst::CastBuiltin::new("hex", &HEX_DOM)));
    voc.add(Rc::new(cst::CastBuiltin::new("dec", &DEC_DOM)));
    voc.add(Rc::new(cst::CastBuiltin::new("oct", &OCT_DOM)));
    voc.add(Rc::new(cst::CastBuiltin::new("bin", &BIN_DOM)));
    add_constant(&mut voc, Constant::new(0, &BOOL_DOM), "false");
    add_constant(&mut voc, Constant::new(1, &BOOL_DOM), "true");

    voc.add(Rc::new(cst::TypeBuiltin));
    voc.add(Rc::new(cst::PosBuiltin));

    // Stack shuffling.
    voc.add(Rc::new(shf::ShfBuiltin::drop()));
    voc.add(Rc::new(shf::ShfBuiltin::swap()));
    voc.add(Rc::new(shf::ShfBuiltin::dup()));
    voc.add(Rc::new(shf::ShfBuiltin::over()));
    voc.add(Rc::new(shf::ShfBuiltin::rot()));

    // Regex matching.
    {
        let tab = overload_tab(vec![string::match_str_overload()]);
        voc.add(Rc::new(OverloadedPredBuiltin::new(
            "?match",
            true,
            Rc::clone(&tab),
        )));
        voc.add(Rc::new(OverloadedPredBuiltin::new("!match", false, tab)));
    }

    // "add"
    {
        let tab = overload_tab(vec![
            arith::add_cst_overload(),
            string::add_str_overload(),
            seq::add_seq_overload(),
        ]);
        voc.add(Rc::new(OverloadedOpBuiltin::new("add", tab)));
    }

    // "elem" / "relem"
    {
        let tab = overload_tab(vec![string::elem_str_overload(), seq::elem_seq_overload()]);
        voc.add(Rc::new(OverloadedOpBuiltin::new("elem", tab)));
    }
    {
        let tab = overload_tab(vec![string::relem_str_overload(), seq::relem_seq_overload()]);
        voc.add(Rc::new(OverloadedOpBuiltin::new("relem", tab)));
    }

    // "empty" — the table is shared between the two spellings.
    {
        let tab = overload_tab(vec![string::empty_str_overload(), seq::empty_seq_overload()]);
        voc.add(Rc::new(OverloadedPredBuiltin::new(
            "?empty",
            true,
            Rc::clone(&tab),
        )));
        voc.add(Rc::new(OverloadedPredBuiltin::new("!empty", false, tab)));
    }

    // "find"
    {
        let tab = overload_tab(vec![string::find_str_overload(), seq::find_seq_overload()]);
        voc.add(Rc::new(OverloadedPredBuiltin::new(
            "?find",
            true,
            Rc::clone(&tab),
        )));
        voc.add(Rc::new(OverloadedPredBuiltin::new("!find", false, tab)));
    }

    // "length"
    {
        let tab = overload_tab(vec![
            string::length_str_overload(),
            seq::length_seq_overload(),
        ]);
        voc.add(Rc::new(OverloadedOpBuiltin::new("length", tab)));
    }

    // "value"
    {
        let tab = overload_tab(vec![cst::value_cst_overload()]);
        voc.add(Rc::new(OverloadedOpBuiltin::new("value", tab)));
    }

    voc
}
