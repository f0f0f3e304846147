//! Constant-related words: display-domain casts, `value`, `type`, `pos`.

use std::rc::Rc;

use crate::builtin::Builtin;
use crate::cst::{Constant, ConstantDom, DEC_DOM, TYPE_DOM};
use crate::error::EvalError;
use crate::op::{op_ref, Op, OpRef};
use crate::overload::{once_overload_1, Selector};
use crate::stack::Stack;
use crate::value::{CstValue, Value};

struct CastOp {
    upstream: OpRef,
    dom: &'static dyn ConstantDom,
}

impl Op for CastOp {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        while let Some(mut stk) = self.upstream.borrow_mut().next()? {
            let value = stk.pop();
            match value.downcast_ref::<CstValue>() {
                Some(v) => {
                    let cst = v.constant().cast(self.dom);
                    stk.push(Box::new(CstValue::new(cst, 0)));
                    return Ok(Some(stk));
                }
                None => {
                    eprintln!(
                        "Error: cast to {} expects a constant on TOS.",
                        self.dom.name()
                    );
                }
            }
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        format!("f_cast<{}>", self.dom.name())
    }
}

/// A display-domain cast word: `hex`, `dec`, `oct`, `bin`.
pub struct CastBuiltin {
    word: &'static str,
    dom: &'static dyn ConstantDom,
}

impl CastBuiltin {
    pub fn new(word: &'static str, dom: &'static dyn ConstantDom) -> Self {
        CastBuiltin { word, dom }
    }
}

impl Builtin for CastBuiltin {
    fn build_exec(&self, upstream: OpRef) -> Result<Option<OpRef>, EvalError> {
        Ok(Some(op_ref(CastOp {
            upstream,
            dom: self.dom,
        })))
    }

    fn name(&self) -> &str {
        self.word
    }
}

/// The constant overload of `value`: strip the domain down to plain
/// decimal.
pub fn value_cst_overload() -> (Selector, Rc<dyn Builtin>) {
    once_overload_1::<CstValue, _>(|v| {
        let cst = v.constant().cast(&DEC_DOM);
        Ok(Some(Box::new(CstValue::new(cst, 0)) as Box<dyn Value>))
    })
}

struct PosOp {
    upstream: OpRef,
}

impl Op for PosOp {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        while let Some(mut stk) = self.upstream.borrow_mut().next()? {
            if stk.is_empty() {
                eprintln!("Error: `pos' expects a value on TOS.");
                continue;
            }
            let value = stk.pop();
            let cst = Constant::new(value.pos() as i128, &DEC_DOM);
            stk.push(Box::new(CstValue::new(cst, 0)));
            return Ok(Some(stk));
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        "pos".to_string()
    }
}

/// Replaces the top value with its position within the producing
/// sub-expression.
pub struct PosBuiltin;

impl Builtin for PosBuiltin {
    fn build_exec(&self, upstream: OpRef) -> Result<Option<OpRef>, EvalError> {
        Ok(Some(op_ref(PosOp { upstream })))
    }

    fn name(&self) -> &str {
        "pos"
    }
}

struct TypeOp {
    upstream: OpRef,
}

impl Op for TypeOp {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        while let Some(mut stk) = self.upstream.borrow_mut().next()? {
            if stk.is_empty() {
                eprintln!("Error: `type' expects a value on TOS.");
                continue;
            }
            let value = stk.pop();
            let cst = Constant::new(value.vtype().code() as i128, &TYPE_DOM);
            stk.push(Box::new(CstValue::new(cst, 0)));
            return Ok(Some(stk));
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        "type".to_string()
    }
}

/// Replaces the top value with its type constant.
pub struct TypeBuiltin;

impl Builtin for TypeBuiltin {
    fn build_exec(&self, upstream: OpRef) -> Result<Option<OpRef>, EvalError> {
        Ok(Some(op_ref(TypeOp { upstream })))
    }

    fn name(&self) -> &str {
        "type"
    }
}
