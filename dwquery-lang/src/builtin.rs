//! Builtin words and the vocabulary that holds them.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::cst::{register_type_name, Constant, TYPE_DOM};
use crate::error::EvalError;
use crate::op::{op_ref, OpConst, OpRef};
use crate::overload::{OverloadKind, OverloadTab};
use crate::pred::Pred;
use crate::value::{CstValue, ValueType};

/// A named word of the query language. A builtin lowers either to a
/// predicate (assertion words), to an operator, or to both, in which case
/// the predicate wins and is wrapped in an assert.
pub trait Builtin {
    fn build_pred(&self) -> Result<Option<Box<dyn Pred>>, EvalError> {
        Ok(None)
    }

    fn build_exec(&self, upstream: OpRef) -> Result<Option<OpRef>, EvalError> {
        let _ = upstream;
        Ok(None)
    }

    fn name(&self) -> &str;

    /// The overload table of an overloaded word, used when vocabularies are
    /// merged.
    fn overload_tab(&self) -> Option<(OverloadKind, Rc<RefCell<OverloadTab>>)> {
        None
    }
}

/// The dictionary of words available to a query. Vocabularies are built
/// explicitly at startup and passed in; there is no global registration.
#[derive(Default)]
pub struct Vocabulary {
    map: BTreeMap<String, Rc<dyn Builtin>>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Vocabulary::default()
    }

    pub fn add(&mut self, builtin: Rc<dyn Builtin>) {
        let name = builtin.name().to_string();
        self.add_named(builtin, name);
    }

    pub fn add_named(&mut self, builtin: Rc<dyn Builtin>, name: impl Into<String>) {
        self.map.insert(name.into(), builtin);
    }

    pub fn find(&self, name: &str) -> Option<Rc<dyn Builtin>> {
        self.map.get(name).cloned()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    /// Merges another vocabulary into this one. A word that is overloaded
    /// on both sides keeps this vocabulary's builtin, with the other side's
    /// overloads folded into its table; any other collision is won by the
    /// other side.
    pub fn extend(&mut self, other: Vocabulary) {
        // Positive and negative assertion words share one table, so track
        // which table pairs were already merged.
        let mut merged: Vec<(usize, usize)> = Vec::new();

        for (name, theirs) in other.map {
            let ours = self.map.get(&name).cloned();
            match (
                ours.as_ref().and_then(|b| b.overload_tab()),
                theirs.overload_tab(),
            ) {
                (Some((our_kind, our_tab)), Some((their_kind, their_tab)))
                    if our_kind == their_kind && !Rc::ptr_eq(&our_tab, &their_tab) =>
                {
                    let pair = (
                        Rc::as_ptr(&our_tab) as usize,
                        Rc::as_ptr(&their_tab) as usize,
                    );
                    if !merged.contains(&pair) {
                        merged.push(pair);
                        let mut our_tab = our_tab.borrow_mut();
                        for (sel, builtin) in their_tab.borrow().entries() {
                            our_tab.add_overload(sel.clone(), Rc::clone(builtin));
                        }
                    }
                }
                _ => {
                    self.map.insert(name, theirs);
                }
            }
        }
    }
}

/// A word that pushes a constant.
pub struct ConstBuiltin {
    word: String,
    cst: Constant,
}

impl ConstBuiltin {
    pub fn new(word: impl Into<String>, cst: Constant) -> Self {
        ConstBuiltin {
            word: word.into(),
            cst,
        }
    }
}

impl Builtin for ConstBuiltin {
    fn build_exec(&self, upstream: OpRef) -> Result<Option<OpRef>, EvalError> {
        Ok(Some(op_ref(OpConst::new(
            upstream,
            Box::new(CstValue::new(self.cst, 0)),
        ))))
    }

    fn name(&self) -> &str {
        &self.word
    }
}

/// Registers a named constant.
pub fn add_constant(voc: &mut Vocabulary, cst: Constant, name: &str) {
    voc.add(Rc::new(ConstBuiltin::new(name, cst)));
}

/// Registers the type constant of a value kind, e.g. `T_CONST`.
pub fn add_type_constant(voc: &mut Vocabulary, vt: ValueType) {
    register_type_name(vt);
    add_constant(
        voc,
        Constant::new(vt.code() as i128, &TYPE_DOM),
        vt.name(),
    );
}
