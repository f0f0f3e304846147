//! The top-level driver: parse once, lower per seed stack, pull results.

use fallible_iterator::FallibleIterator;

use crate::builtin::Vocabulary;
use crate::error::EvalError;
use crate::op::{op_ref, OpRef, Origin};
use crate::parse::{parse_query, ParseError};
use crate::stack::Stack;
use crate::tree::Tree;

/// A parsed query expression. One `Expr` can be lowered and run any number
/// of times, typically once per input file.
pub struct Expr {
    tree: Tree,
}

impl Expr {
    /// Parses `query` against a vocabulary.
    pub fn parse(query: &str, voc: &Vocabulary) -> Result<Expr, ParseError> {
        Ok(Expr {
            tree: parse_query(query, voc)?,
        })
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Lowers the expression over a seed stack and returns the cold result
    /// iterator. Nothing runs until the iterator is pulled.
    pub fn query(&self, seed: Stack) -> Result<Results, EvalError> {
        let origin: OpRef = op_ref(Origin::with_stack(seed));
        let op = self.tree.build_exec(origin, None)?;
        Ok(Results { op })
    }
}

/// The pull iterator over result stacks.
pub struct Results {
    op: OpRef,
}

impl FallibleIterator for Results {
    type Item = Stack;
    type Error = EvalError;

    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        self.op.borrow_mut().next()
    }
}
