//! Stack shuffling words.

use crate::builtin::Builtin;
use crate::error::EvalError;
use crate::op::{op_ref, Op, OpRef};
use crate::stack::Stack;

#[derive(Clone, Copy, Debug)]
enum Shuffle {
    Drop,
    Swap,
    Dup,
    Over,
    Rot,
}

impl Shuffle {
    fn word(self) -> &'static str {
        match self {
            Shuffle::Drop => "drop",
            Shuffle::Swap => "swap",
            Shuffle::Dup => "dup",
            Shuffle::Over => "over",
            Shuffle::Rot => "rot",
        }
    }

    fn depth(self) -> usize {
        match self {
            Shuffle::Drop | Shuffle::Dup => 1,
            Shuffle::Swap | Shuffle::Over => 2,
            Shuffle::Rot => 3,
        }
    }

    fn run(self, stk: &mut Stack) {
        match self {
            Shuffle::Drop => {
                stk.pop();
            }
            Shuffle::Swap => {
                let a = stk.pop();
                let b = stk.pop();
                stk.push(a);
                stk.push(b);
            }
            Shuffle::Dup => {
                stk.push(stk.top().clone_value());
            }
            Shuffle::Over => {
                stk.push(stk.get(1).clone_value());
            }
            Shuffle::Rot => {
                let a = stk.pop();
                let b = stk.pop();
                let c = stk.pop();
                stk.push(b);
                stk.push(c);
                stk.push(a);
            }
        }
    }
}

struct ShfOp {
    upstream: OpRef,
    shuffle: Shuffle,
}

impl Op for ShfOp {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        while let Some(mut stk) = self.upstream.borrow_mut().next()? {
            if stk.len() < self.shuffle.depth() {
                eprintln!(
                    "Error: `{}' needs at least {} stack slots.",
                    self.shuffle.word(),
                    self.shuffle.depth()
                );
                continue;
            }
            self.shuffle.run(&mut stk);
            return Ok(Some(stk));
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        self.shuffle.word().to_string()
    }
}

pub struct ShfBuiltin {
    shuffle: Shuffle,
}

impl ShfBuiltin {
    pub fn drop() -> Self {
        ShfBuiltin {
            shuffle: Shuffle::Drop,
        }
    }

    pub fn swap() -> Self {
        ShfBuiltin {
            shuffle: Shuffle::Swap,
        }
    }

    pub fn dup() -> Self {
        ShfBuiltin {
            shuffle: Shuffle::Dup,
        }
    }

    pub fn over() -> Self {
        ShfBuiltin {
            shuffle: Shuffle::Over,
        }
    }

    pub fn rot() -> Self {
        ShfBuiltin {
            shuffle: Shuffle::Rot,
        }
    }
}

impl Builtin for ShfBuiltin {
    fn build_exec(&self, upstream: OpRef) -> Result<Option<OpRef>, EvalError> {
        Ok(Some(op_ref(ShfOp {
            upstream,
            shuffle: self.shuffle,
        })))
    }

    fn name(&self) -> &str {
        self.shuffle.word()
    }
}
