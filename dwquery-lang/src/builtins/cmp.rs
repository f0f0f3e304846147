//! Comparison assertions over the top two stack slots.

use crate::builtin::Builtin;
use crate::cst::constants_comparable;
use crate::error::EvalError;
use crate::pred::{maybe_invert, Pred, PredResult};
use crate::stack::Stack;
use crate::value::{Brevity, CmpResult, CstValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpWant {
    Eq,
    Lt,
    Gt,
}

struct CmpPred {
    want: CmpWant,
}

impl Pred for CmpPred {
    fn result(&mut self, stk: &mut Stack) -> Result<PredResult, EvalError> {
        if stk.len() < 2 {
            eprintln!("Error: comparison needs two values on the stack.");
            return Ok(PredResult::Fail);
        }

        if let (Some(va), Some(vb)) = (stk.get_as::<CstValue>(0), stk.get_as::<CstValue>(1)) {
            if !constants_comparable(va.constant(), vb.constant()) {
                eprintln!(
                    "Error: Can't compare `{}' to `{}'.",
                    va.constant(),
                    vb.constant()
                );
                return Ok(PredResult::Fail);
            }
        }

        let va = stk.get(0);
        let vb = stk.get(1);
        let r = vb.cmp_value(va);
        if r == CmpResult::Fail {
            eprintln!(
                "Error: Can't compare `{}' to `{}'.",
                va.display(Brevity::Brief),
                vb.display(Brevity::Brief)
            );
            return Ok(PredResult::Fail);
        }

        let hit = match self.want {
            CmpWant::Eq => r == CmpResult::Equal,
            CmpWant::Lt => r == CmpResult::Less,
            CmpWant::Gt => r == CmpResult::Greater,
        };
        Ok(PredResult::from(hit))
    }

    fn name(&self) -> String {
        match self.want {
            CmpWant::Eq => "eq",
            CmpWant::Lt => "lt",
            CmpWant::Gt => "gt",
        }
        .to_string()
    }

    fn reset(&mut self) {}
}

/// One comparison word, e.g. `?le` (the negation of `gt`).
pub struct CmpBuiltin {
    word: &'static str,
    want: CmpWant,
    positive: bool,
}

impl CmpBuiltin {
    pub fn new(word: &'static str, want: CmpWant, positive: bool) -> Self {
        CmpBuiltin {
            word,
            want,
            positive,
        }
    }
}

impl Builtin for CmpBuiltin {
    fn build_pred(&self) -> Result<Option<Box<dyn Pred>>, EvalError> {
        Ok(Some(maybe_invert(
            self.positive,
            Box::new(CmpPred { want: self.want }),
        )))
    }

    fn name(&self) -> &str {
        self.word
    }
}

/// All twelve comparison words.
pub fn comparison_builtins() -> Vec<CmpBuiltin> {
    vec![
        CmpBuiltin::new("?eq", CmpWant::Eq, true),
        CmpBuiltin::new("!eq", CmpWant::Eq, false),
        CmpBuiltin::new("?ne", CmpWant::Eq, false),
        CmpBuiltin::new("!ne", CmpWant::Eq, true),
        CmpBuiltin::new("?lt", CmpWant::Lt, true),
        CmpBuiltin::new("!lt", CmpWant::Lt, false),
        CmpBuiltin::new("?gt", CmpWant::Gt, true),
        CmpBuiltin::new("!gt", CmpWant::Gt, false),
        CmpBuiltin::new("?le", CmpWant::Gt, false),
        CmpBuiltin::new("!le", CmpWant::Gt, true),
        CmpBuiltin::new("?ge", CmpWant::Lt, false),
        CmpBuiltin::new("!ge", CmpWant::Lt, true),
    ]
}
