//! Overload dispatch.
//!
//! Some operators are generically applicable; to allow new value types to
//! reuse them, every such operator carries an overload table. Each entry
//! specializes the operator to a tuple of value types at the top of the
//! stack. The table is instantiated at lowering time into one inner
//! sub-graph (or predicate) per overload; at execution time the dispatching
//! op inspects the stack profile, selects the matching overload, and
//! forwards its results. A stack with no matching overload is reported and
//! skipped.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::builtin::Builtin;
use crate::error::EvalError;
use crate::op::{op_ref, origin_as_op, origin_ref, Op, OpRef, Origin, OriginRef, ValueProducer};
use crate::pred::{Pred, PredResult};
use crate::stack::Stack;
use crate::value::{Value, ValueKind, ValueType};

/// A tuple of up to four value-type tags, applied to the top stack slots.
/// The first tag is the deepest, the last is the top of the stack.
#[derive(Clone)]
pub struct Selector {
    vts: SmallVec<[ValueType; 4]>,
    imprint: u32,
    mask: u32,
}

impl Selector {
    pub const WIDTH: usize = 4;

    pub fn new(vts: &[ValueType]) -> Self {
        assert!(vts.len() <= Self::WIDTH);
        let mut imprint = 0u32;
        let mut mask = 0u32;
        // Top of the stack lands in the low byte.
        for (i, vt) in vts.iter().rev().enumerate() {
            imprint |= (vt.code() as u32) << (8 * i);
            mask |= 0xff << (8 * i);
        }
        Selector {
            vts: SmallVec::from_slice(vts),
            imprint,
            mask,
        }
    }

    /// The profile of a stack: the type codes of its top slots.
    pub fn profile(stk: &Stack) -> u32 {
        let mut imprint = 0u32;
        for i in 0..Self::WIDTH.min(stk.len()) {
            imprint |= (stk.get(i).vtype().code() as u32) << (8 * i);
        }
        imprint
    }

    pub fn matches(&self, profile: u32) -> bool {
        profile & self.mask == self.imprint
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, vt) in self.vts.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{vt}")?;
        }
        Ok(())
    }
}

/// Reports what types an operator needs on the top of the stack.
pub fn show_expects(name: &str, vts: &[ValueType]) {
    let sels: Vec<Selector> = vts.iter().map(|vt| Selector::new(&[*vt])).collect();
    show_expects_selectors(name, &sels);
}

pub fn show_expects_selectors(name: &str, sels: &[Selector]) {
    if sels.is_empty() {
        eprintln!("Error: `{name}' has no registered overloads.");
        return;
    }

    let mut list = String::new();
    for (i, sel) in sels.iter().enumerate() {
        if i > 0 {
            list.push_str(if i == sels.len() - 1 { " or " } else { ", " });
        }
        list.push_str(&sel.to_string());
    }
    eprintln!("Error: `{name}' expects {list} on TOS.");
}

/// Whether an overloaded word dispatches to ops or to predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverloadKind {
    Op,
    Pred,
}

/// The public, extensible table mapping selectors to overload builtins.
#[derive(Default)]
pub struct OverloadTab {
    entries: Vec<(Selector, Rc<dyn Builtin>)>,
}

impl OverloadTab {
    pub fn new() -> Self {
        OverloadTab::default()
    }

    pub fn add_overload(&mut self, sel: Selector, builtin: Rc<dyn Builtin>) {
        assert!(
            !self
                .entries
                .iter()
                .any(|(s, _)| s.imprint == sel.imprint && s.mask == sel.mask),
            "duplicate overload for selector"
        );
        self.entries.push((sel, builtin));
    }

    pub fn entries(&self) -> &[(Selector, Rc<dyn Builtin>)] {
        &self.entries
    }

    pub fn instantiate(&self) -> Result<OverloadInstance, EvalError> {
        let mut execs = Vec::new();
        let mut preds = Vec::new();

        for (sel, builtin) in &self.entries {
            let pred = builtin.build_pred()?;
            let origin = origin_ref(Origin::new());
            let op = builtin.build_exec(origin_as_op(&origin))?;

            assert!(
                op.is_some() || pred.is_some(),
                "overload builtin builds neither an op nor a pred"
            );

            if let Some(op) = op {
                execs.push((sel.clone(), origin.clone(), op));
            }
            if let Some(pred) = pred {
                preds.push((sel.clone(), pred));
            }
        }

        Ok(OverloadInstance { execs, preds })
    }
}

/// One lowering-time instantiation of an overload table.
pub struct OverloadInstance {
    execs: Vec<(Selector, OriginRef, OpRef)>,
    preds: Vec<(Selector, Box<dyn Pred>)>,
}

impl OverloadInstance {
    fn find_exec(&self, stk: &Stack) -> Option<(OriginRef, OpRef)> {
        let profile = Selector::profile(stk);
        self.execs
            .iter()
            .find(|(sel, _, _)| sel.matches(profile))
            .map(|(_, origin, op)| (origin.clone(), op.clone()))
    }

    fn find_pred(&self, stk: &Stack) -> Option<usize> {
        let profile = Selector::profile(stk);
        self.preds
            .iter()
            .position(|(sel, _)| sel.matches(profile))
    }

    fn show_error(&self, name: &str) {
        let sels: Vec<Selector> = self
            .execs
            .iter()
            .map(|(sel, _, _)| sel.clone())
            .chain(self.preds.iter().map(|(sel, _)| sel.clone()))
            .collect();
        show_expects_selectors(name, &sels);
    }

    fn reset_all(&mut self) {
        for (_, _, op) in &self.execs {
            op.borrow_mut().reset();
        }
        for (_, pred) in &mut self.preds {
            pred.reset();
        }
    }
}

/// The dispatching operator of an overloaded word.
pub struct OverloadOp {
    upstream: OpRef,
    inst: OverloadInstance,
    word: String,
    cur: Option<OpRef>,
}

impl OverloadOp {
    pub fn new(upstream: OpRef, inst: OverloadInstance, word: impl Into<String>) -> Self {
        OverloadOp {
            upstream,
            inst,
            word: word.into(),
            cur: None,
        }
    }
}

impl Op for OverloadOp {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        loop {
            while self.cur.is_none() {
                match self.upstream.borrow_mut().next()? {
                    Some(stk) => match self.inst.find_exec(&stk) {
                        Some((origin, op)) => {
                            op.borrow_mut().reset();
                            origin.borrow_mut().set_next(stk);
                            self.cur = Some(op);
                        }
                        None => self.inst.show_error(&self.word),
                    },
                    None => return Ok(None),
                }
            }

            if let Some(stk) = self.cur.as_ref().unwrap().borrow_mut().next()? {
                return Ok(Some(stk));
            }

            self.cur = None;
        }
    }

    fn reset(&mut self) {
        self.cur = None;
        self.inst.reset_all();
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        self.word.clone()
    }
}

/// The dispatching predicate of an overloaded word.
pub struct OverloadPred {
    inst: OverloadInstance,
    word: String,
}

impl OverloadPred {
    pub fn new(inst: OverloadInstance, word: impl Into<String>) -> Self {
        OverloadPred {
            inst,
            word: word.into(),
        }
    }
}

impl Pred for OverloadPred {
    fn result(&mut self, stk: &mut Stack) -> Result<PredResult, EvalError> {
        match self.inst.find_pred(stk) {
            Some(i) => self.inst.preds[i].1.result(stk),
            None => {
                self.inst.show_error(&self.word);
                Ok(PredResult::Fail)
            }
        }
    }

    fn name(&self) -> String {
        self.word.clone()
    }

    fn reset(&mut self) {}
}

/// An overloaded word that lowers to a dispatching op.
pub struct OverloadedOpBuiltin {
    word: String,
    tab: Rc<RefCell<OverloadTab>>,
}

impl OverloadedOpBuiltin {
    pub fn new(word: impl Into<String>, tab: Rc<RefCell<OverloadTab>>) -> Self {
        OverloadedOpBuiltin {
            word: word.into(),
            tab,
        }
    }
}

impl Builtin for OverloadedOpBuiltin {
    fn build_exec(&self, upstream: OpRef) -> Result<Option<OpRef>, EvalError> {
        let inst = self.tab.borrow().instantiate()?;
        Ok(Some(op_ref(OverloadOp::new(
            upstream,
            inst,
            self.word.clone(),
        ))))
    }

    fn name(&self) -> &str {
        &self.word
    }

    fn overload_tab(&self) -> Option<(OverloadKind, Rc<RefCell<OverloadTab>>)> {
        Some((OverloadKind::Op, Rc::clone(&self.tab)))
    }
}

/// An overloaded word that lowers to a dispatching predicate, optionally
/// inverted (the `!word` form).
pub struct OverloadedPredBuiltin {
    word: String,
    positive: bool,
    tab: Rc<RefCell<OverloadTab>>,
}

impl OverloadedPredBuiltin {
    pub fn new(word: impl Into<String>, positive: bool, tab: Rc<RefCell<OverloadTab>>) -> Self {
        OverloadedPredBuiltin {
            word: word.into(),
            positive,
            tab,
        }
    }
}

impl Builtin for OverloadedPredBuiltin {
    fn build_pred(&self) -> Result<Option<Box<dyn Pred>>, EvalError> {
        let inst = self.tab.borrow().instantiate()?;
        let base = self.word.trim_start_matches(['?', '!']);
        Ok(Some(crate::pred::maybe_invert(
            self.positive,
            Box::new(OverloadPred::new(inst, base)),
        )))
    }

    fn name(&self) -> &str {
        &self.word
    }

    fn overload_tab(&self) -> Option<(OverloadKind, Rc<RefCell<OverloadTab>>)> {
        Some((OverloadKind::Pred, Rc::clone(&self.tab)))
    }
}

// Adapters for the three overload patterns. Each builds a small builtin
// around a closure, so individual overloads stay one registration line.

struct OnceOp1<A, F> {
    upstream: OpRef,
    f: Rc<F>,
    _ty: PhantomData<A>,
}

impl<A, F> Op for OnceOp1<A, F>
where
    A: ValueKind,
    F: Fn(Box<A>) -> Result<Option<Box<dyn Value>>, EvalError> + 'static,
{
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        while let Some(mut stk) = self.upstream.borrow_mut().next()? {
            let a = stk.pop_as::<A>();
            if let Some(nv) = (self.f)(a)? {
                stk.push(nv);
                return Ok(Some(stk));
            }
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        "overload".to_string()
    }
}

struct Once1Builtin<A, F> {
    f: Rc<F>,
    _ty: PhantomData<A>,
}

impl<A, F> Builtin for Once1Builtin<A, F>
where
    A: ValueKind,
    F: Fn(Box<A>) -> Result<Option<Box<dyn Value>>, EvalError> + 'static,
{
    fn build_exec(&self, upstream: OpRef) -> Result<Option<OpRef>, EvalError> {
        Ok(Some(op_ref(OnceOp1 {
            upstream,
            f: Rc::clone(&self.f),
            _ty: PhantomData::<A>,
        })))
    }

    fn name(&self) -> &str {
        "overload"
    }
}

/// A once-overload of one operand: consumes an `A` from the top of the
/// stack and pushes the single produced value. `Ok(None)` drops the stack
/// after the closure has reported a diagnostic.
pub fn once_overload_1<A, F>(f: F) -> (Selector, Rc<dyn Builtin>)
where
    A: ValueKind,
    F: Fn(Box<A>) -> Result<Option<Box<dyn Value>>, EvalError> + 'static,
{
    (
        Selector::new(&[A::KIND]),
        Rc::new(Once1Builtin {
            f: Rc::new(f),
            _ty: PhantomData::<A>,
        }),
    )
}

struct OnceOp2<A, B, F> {
    upstream: OpRef,
    f: Rc<F>,
    _ty: PhantomData<(A, B)>,
}

impl<A, B, F> Op for OnceOp2<A, B, F>
where
    A: ValueKind,
    B: ValueKind,
    F: Fn(Box<A>, Box<B>) -> Result<Option<Box<dyn Value>>, EvalError> + 'static,
{
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        while let Some(mut stk) = self.upstream.borrow_mut().next()? {
            let b = stk.pop_as::<B>();
            let a = stk.pop_as::<A>();
            if let Some(nv) = (self.f)(a, b)? {
                stk.push(nv);
                return Ok(Some(stk));
            }
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        "overload".to_string()
    }
}

struct Once2Builtin<A, B, F> {
    f: Rc<F>,
    _ty: PhantomData<(A, B)>,
}

impl<A, B, F> Builtin for Once2Builtin<A, B, F>
where
    A: ValueKind,
    B: ValueKind,
    F: Fn(Box<A>, Box<B>) -> Result<Option<Box<dyn Value>>, EvalError> + 'static,
{
    fn build_exec(&self, upstream: OpRef) -> Result<Option<OpRef>, EvalError> {
        Ok(Some(op_ref(OnceOp2 {
            upstream,
            f: Rc::clone(&self.f),
            _ty: PhantomData::<(A, B)>,
        })))
    }

    fn name(&self) -> &str {
        "overload"
    }
}

/// A once-overload of two operands; `a` sits below `b`, which is the top of
/// the stack.
pub fn once_overload_2<A, B, F>(f: F) -> (Selector, Rc<dyn Builtin>)
where
    A: ValueKind,
    B: ValueKind,
    F: Fn(Box<A>, Box<B>) -> Result<Option<Box<dyn Value>>, EvalError> + 'static,
{
    (
        Selector::new(&[A::KIND, B::KIND]),
        Rc::new(Once2Builtin {
            f: Rc::new(f),
            _ty: PhantomData::<(A, B)>,
        }),
    )
}

struct YieldOp1<A, F> {
    upstream: OpRef,
    f: Rc<F>,
    stk: Option<Stack>,
    producer: Option<Box<dyn ValueProducer>>,
    _ty: PhantomData<A>,
}

impl<A, F> Op for YieldOp1<A, F>
where
    A: ValueKind,
    F: Fn(Box<A>) -> Result<Box<dyn ValueProducer>, EvalError> + 'static,
{
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        loop {
            while self.producer.is_none() {
                match self.upstream.borrow_mut().next()? {
                    Some(mut stk) => {
                        let a = stk.pop_as::<A>();
                        self.producer = Some((self.f)(a)?);
                        self.stk = Some(stk);
                    }
                    None => return Ok(None),
                }
            }

            if let Some(v) = self.producer.as_mut().unwrap().next()? {
                let mut ret = self.stk.as_ref().unwrap().clone();
                ret.push(v);
                return Ok(Some(ret));
            }

            self.producer = None;
            self.stk = None;
        }
    }

    fn reset(&mut self) {
        self.producer = None;
        self.stk = None;
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        "overload".to_string()
    }
}

struct Yield1Builtin<A, F> {
    f: Rc<F>,
    _ty: PhantomData<A>,
}

impl<A, F> Builtin for Yield1Builtin<A, F>
where
    A: ValueKind,
    F: Fn(Box<A>) -> Result<Box<dyn ValueProducer>, EvalError> + 'static,
{
    fn build_exec(&self, upstream: OpRef) -> Result<Option<OpRef>, EvalError> {
        Ok(Some(op_ref(YieldOp1 {
            upstream,
            f: Rc::clone(&self.f),
            stk: None,
            producer: None,
            _ty: PhantomData::<A>,
        })))
    }

    fn name(&self) -> &str {
        "overload"
    }
}

/// A yielding overload: consumes an `A` and re-emits the input stack once
/// per value of the returned producer.
pub fn yielding_overload_1<A, F>(f: F) -> (Selector, Rc<dyn Builtin>)
where
    A: ValueKind,
    F: Fn(Box<A>) -> Result<Box<dyn ValueProducer>, EvalError> + 'static,
{
    (
        Selector::new(&[A::KIND]),
        Rc::new(Yield1Builtin {
            f: Rc::new(f),
            _ty: PhantomData::<A>,
        }),
    )
}

struct PredOverload1<A, F> {
    f: Rc<F>,
    _ty: PhantomData<A>,
}

impl<A, F> Pred for PredOverload1<A, F>
where
    A: ValueKind,
    F: Fn(&A) -> Result<PredResult, EvalError> + 'static,
{
    fn result(&mut self, stk: &mut Stack) -> Result<PredResult, EvalError> {
        let a = stk.top_as::<A>().expect("dispatch checked the profile");
        (self.f)(a)
    }

    fn name(&self) -> String {
        "overload".to_string()
    }

    fn reset(&mut self) {}
}

struct PredOverload1Builtin<A, F> {
    f: Rc<F>,
    _ty: PhantomData<A>,
}

impl<A, F> Builtin for PredOverload1Builtin<A, F>
where
    A: ValueKind,
    F: Fn(&A) -> Result<PredResult, EvalError> + 'static,
{
    fn build_pred(&self) -> Result<Option<Box<dyn Pred>>, EvalError> {
        Ok(Some(Box::new(PredOverload1 {
            f: Rc::clone(&self.f),
            _ty: PhantomData::<A>,
        })))
    }

    fn name(&self) -> &str {
        "overload"
    }
}

/// A predicate overload of one operand, inspecting the top of the stack by
/// reference only.
pub fn pred_overload_1<A, F>(f: F) -> (Selector, Rc<dyn Builtin>)
where
    A: ValueKind,
    F: Fn(&A) -> Result<PredResult, EvalError> + 'static,
{
    (
        Selector::new(&[A::KIND]),
        Rc::new(PredOverload1Builtin {
            f: Rc::new(f),
            _ty: PhantomData::<A>,
        }),
    )
}

struct PredOverload2<A, B, F> {
    f: Rc<F>,
    _ty: PhantomData<(A, B)>,
}

impl<A, B, F> Pred for PredOverload2<A, B, F>
where
    A: ValueKind,
    B: ValueKind,
    F: Fn(&A, &B) -> Result<PredResult, EvalError> + 'static,
{
    fn result(&mut self, stk: &mut Stack) -> Result<PredResult, EvalError> {
        let a = stk.get_as::<A>(1).expect("dispatch checked the profile");
        let b = stk.get_as::<B>(0).expect("dispatch checked the profile");
        (self.f)(a, b)
    }

    fn name(&self) -> String {
        "overload".to_string()
    }

    fn reset(&mut self) {}
}

struct PredOverload2Builtin<A, B, F> {
    f: Rc<F>,
    _ty: PhantomData<(A, B)>,
}

impl<A, B, F> Builtin for PredOverload2Builtin<A, B, F>
where
    A: ValueKind,
    B: ValueKind,
    F: Fn(&A, &B) -> Result<PredResult, EvalError> + 'static,
{
    fn build_pred(&self) -> Result<Option<Box<dyn Pred>>, EvalError> {
        Ok(Some(Box::new(PredOverload2 {
            f: Rc::clone(&self.f),
            _ty: PhantomData::<(A, B)>,
        })))
    }

    fn name(&self) -> &str {
        "overload"
    }
}

/// A predicate overload of two operands; `a` sits below `b`.
pub fn pred_overload_2<A, B, F>(f: F) -> (Selector, Rc<dyn Builtin>)
where
    A: ValueKind,
    B: ValueKind,
    F: Fn(&A, &B) -> Result<PredResult, EvalError> + 'static,
{
    (
        Selector::new(&[A::KIND, B::KIND]),
        Rc::new(PredOverload2Builtin {
            f: Rc::new(f),
            _ty: PhantomData::<(A, B)>,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{CstValue, SeqValue, StrValue};

    #[test]
    fn selector_matching() {
        let mut stk = Stack::new();
        stk.push(crate::value::dec_value(1, 0));
        stk.push(Box::new(StrValue::new("x", 0)));

        let profile = Selector::profile(&stk);

        // Top of the stack only.
        assert!(Selector::new(&[StrValue::VTYPE]).matches(profile));
        assert!(!Selector::new(&[CstValue::VTYPE]).matches(profile));

        // Two slots, deepest first.
        assert!(Selector::new(&[CstValue::VTYPE, StrValue::VTYPE]).matches(profile));
        assert!(!Selector::new(&[StrValue::VTYPE, CstValue::VTYPE]).matches(profile));

        // Deeper than the stack is never matched.
        assert!(
            !Selector::new(&[SeqValue::VTYPE, CstValue::VTYPE, StrValue::VTYPE]).matches(profile)
        );
    }

    #[test]
    fn selector_display() {
        let sel = Selector::new(&[CstValue::VTYPE, StrValue::VTYPE]);
        assert_eq!(sel.to_string(), "T_CONST T_STR");
    }
}
