//! Tri-state predicates over stacks.

use crate::cst::{constants_comparable, Constant};
use crate::error::EvalError;
use crate::op::{OpRef, OriginRef};
use crate::overload::show_expects;
use crate::stack::Stack;
use crate::value::CstValue;

/// The verdict of a predicate: yes, no, or a type failure. A failure is an
/// error to the enclosing assertion but transparent to `not`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PredResult {
    No,
    Yes,
    Fail,
}

impl From<bool> for PredResult {
    fn from(b: bool) -> Self {
        if b {
            PredResult::Yes
        } else {
            PredResult::No
        }
    }
}

impl std::ops::Not for PredResult {
    type Output = PredResult;

    fn not(self) -> PredResult {
        match self {
            PredResult::No => PredResult::Yes,
            PredResult::Yes => PredResult::No,
            PredResult::Fail => PredResult::Fail,
        }
    }
}

/// A boolean test over a stack. Predicates never alter the computation.
pub trait Pred {
    fn result(&mut self, stk: &mut Stack) -> Result<PredResult, EvalError>;
    fn name(&self) -> String;
    fn reset(&mut self);
}

pub struct PredNot {
    a: Box<dyn Pred>,
}

impl PredNot {
    pub fn new(a: Box<dyn Pred>) -> Self {
        PredNot { a }
    }
}

impl Pred for PredNot {
    fn result(&mut self, stk: &mut Stack) -> Result<PredResult, EvalError> {
        Ok(!self.a.result(stk)?)
    }

    fn name(&self) -> String {
        format!("not<{}>", self.a.name())
    }

    fn reset(&mut self) {
        self.a.reset();
    }
}

pub struct PredAnd {
    a: Box<dyn Pred>,
    b: Box<dyn Pred>,
}

impl PredAnd {
    pub fn new(a: Box<dyn Pred>, b: Box<dyn Pred>) -> Self {
        PredAnd { a, b }
    }
}

impl Pred for PredAnd {
    fn result(&mut self, stk: &mut Stack) -> Result<PredResult, EvalError> {
        // Short-circuits: the second arm only runs on a yes.
        match self.a.result(stk)? {
            PredResult::Yes => self.b.result(stk),
            other => Ok(other),
        }
    }

    fn name(&self) -> String {
        format!("and<{}><{}>", self.a.name(), self.b.name())
    }

    fn reset(&mut self) {
        self.a.reset();
        self.b.reset();
    }
}

pub struct PredOr {
    a: Box<dyn Pred>,
    b: Box<dyn Pred>,
}

impl PredOr {
    pub fn new(a: Box<dyn Pred>, b: Box<dyn Pred>) -> Self {
        PredOr { a, b }
    }
}

impl Pred for PredOr {
    fn result(&mut self, stk: &mut Stack) -> Result<PredResult, EvalError> {
        match self.a.result(stk)? {
            PredResult::No => self.b.result(stk),
            other => Ok(other),
        }
    }

    fn name(&self) -> String {
        format!("or<{}><{}>", self.a.name(), self.b.name())
    }

    fn reset(&mut self) {
        self.a.reset();
        self.b.reset();
    }
}

/// Yes iff the inner sub-graph produces at least one result on a copy of
/// the stack.
pub struct PredSubxAny {
    op: OpRef,
    origin: OriginRef,
}

impl PredSubxAny {
    pub fn new(op: OpRef, origin: OriginRef) -> Self {
        PredSubxAny { op, origin }
    }
}

impl Pred for PredSubxAny {
    fn result(&mut self, stk: &mut Stack) -> Result<PredResult, EvalError> {
        self.op.borrow_mut().reset();
        self.origin.borrow_mut().set_next(stk.clone());
        Ok(PredResult::from(self.op.borrow_mut().next()?.is_some()))
    }

    fn name(&self) -> String {
        format!("pred_subx_any<{}>", self.op.borrow().name())
    }

    fn reset(&mut self) {
        self.op.borrow_mut().reset();
    }
}

/// Compares the values produced by two sub-graphs pairwise against an inner
/// predicate; yes iff any pair satisfies it. Both sub-graphs feed from one
/// shared origin.
pub struct PredSubxCompare {
    op1: OpRef,
    op2: OpRef,
    origin: OriginRef,
    pred: Box<dyn Pred>,
}

impl PredSubxCompare {
    pub fn new(op1: OpRef, op2: OpRef, origin: OriginRef, pred: Box<dyn Pred>) -> Self {
        PredSubxCompare {
            op1,
            op2,
            origin,
            pred,
        }
    }
}

impl Pred for PredSubxCompare {
    fn result(&mut self, stk: &mut Stack) -> Result<PredResult, EvalError> {
        self.op1.borrow_mut().reset();
        self.origin.borrow_mut().set_next(stk.clone());

        while let Some(mut stk1) = self.op1.borrow_mut().next()? {
            self.op2.borrow_mut().reset();
            self.origin.borrow_mut().set_next(stk.clone());

            while let Some(mut stk2) = self.op2.borrow_mut().next()? {
                stk1.push(stk2.pop());

                if self.pred.result(&mut stk1)? == PredResult::Yes {
                    return Ok(PredResult::Yes);
                }

                stk1.pop();
            }
        }

        Ok(PredResult::No)
    }

    fn name(&self) -> String {
        format!(
            "pred_subx_compare<{}><{}><{}>",
            self.op1.borrow().name(),
            self.op2.borrow().name(),
            self.pred.name()
        )
    }

    fn reset(&mut self) {
        self.op1.borrow_mut().reset();
        self.op2.borrow_mut().reset();
        self.pred.reset();
    }
}

/// Tests the top of the stack against a literal constant.
pub struct PredConstant {
    cst: Constant,
}

impl PredConstant {
    pub fn new(cst: Constant) -> Self {
        PredConstant { cst }
    }
}

impl Pred for PredConstant {
    fn result(&mut self, stk: &mut Stack) -> Result<PredResult, EvalError> {
        match stk.top_as::<CstValue>() {
            Some(v) => {
                if !constants_comparable(&self.cst, v.constant()) {
                    eprintln!(
                        "Error: Can't compare `{}' to `{}'.",
                        self.cst,
                        v.constant()
                    );
                    return Ok(PredResult::Fail);
                }
                Ok(PredResult::from(self.cst == *v.constant()))
            }
            None => {
                show_expects(&self.name(), &[CstValue::VTYPE]);
                Ok(PredResult::Fail)
            }
        }
    }

    fn name(&self) -> String {
        format!("?{}", self.cst)
    }

    fn reset(&mut self) {}
}

/// Wraps a predicate in its negation when `positive` is false.
pub fn maybe_invert(positive: bool, pred: Box<dyn Pred>) -> Box<dyn Pred> {
    if positive {
        pred
    } else {
        Box::new(PredNot::new(pred))
    }
}
