//! Closure application.

use crate::builtin::Builtin;
use crate::error::EvalError;
use crate::op::{op_ref, OpApply, OpRef};

/// `apply` — pops a closure from the top of the stack and executes it.
pub struct ApplyBuiltin;

impl Builtin for ApplyBuiltin {
    fn build_exec(&self, upstream: OpRef) -> Result<Option<OpRef>, EvalError> {
        Ok(Some(op_ref(OpApply::new(upstream))))
    }

    fn name(&self) -> &str {
        "apply"
    }
}
