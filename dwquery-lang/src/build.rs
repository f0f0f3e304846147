//! Lowering of query trees into operator graphs.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::EvalError;
use crate::op::{
    op_ref, origin_as_op, origin_ref, AltFile, OpAssert, OpBind, OpCapture, OpConst, OpFDebug,
    OpFormat, OpIfElse, OpLexClosure, OpMerge, OpNop, OpOr, OpRead, OpRef, OpScope, OpSubx,
    OpTine, OpTrClosure, Origin, OriginRef, StringerLit, StringerOp, StringerOrigin, StringerRef,
};
use crate::pred::{Pred, PredAnd, PredNot, PredOr, PredSubxAny, PredSubxCompare};
use crate::tree::{Scope, Tree, TreeKind};
use crate::value::{CstValue, SeqValue, StrValue};

fn sub_graph(
    tree: &Tree,
    scope: Option<&Rc<Scope>>,
) -> Result<(OriginRef, OpRef), EvalError> {
    let origin = origin_ref(Origin::new());
    let op = tree.build_exec(origin_as_op(&origin), scope)?;
    Ok((origin, op))
}

/// Resolves a name to frame access coordinates. Stack frames form a chain;
/// this finds how deeply nested the accessing op is inside `SCOPE`s and at
/// which slot the name lives.
fn resolve_name(
    name: &str,
    scope: Option<&Rc<Scope>>,
) -> Result<(usize, usize), EvalError> {
    let mut depth = 0;
    let mut scp = scope.cloned();
    while let Some(s) = scp {
        if let Some(index) = s.index(name) {
            return Ok((depth, index));
        }
        scp = s.parent();
        depth += 1;
    }
    Err(EvalError::UnknownIdentifier(name.to_string()))
}

impl Tree {
    /// Builds the predicate of a predicate node.
    pub fn build_pred(&self, scope: Option<&Rc<Scope>>) -> Result<Box<dyn Pred>, EvalError> {
        match self.kind() {
            TreeKind::PredNot => Ok(Box::new(PredNot::new(self.child(0).build_pred(scope)?))),

            TreeKind::PredOr => Ok(Box::new(PredOr::new(
                self.child(0).build_pred(scope)?,
                self.child(1).build_pred(scope)?,
            ))),

            TreeKind::PredAnd => Ok(Box::new(PredAnd::new(
                self.child(0).build_pred(scope)?,
                self.child(1).build_pred(scope)?,
            ))),

            TreeKind::PredSubxAny => {
                let (origin, op) = sub_graph(self.child(0), scope)?;
                Ok(Box::new(PredSubxAny::new(op, origin)))
            }

            TreeKind::PredSubxCmp => {
                // Both sub-expressions feed from one shared origin.
                let origin = origin_ref(Origin::new());
                let op1 = self.child(0).build_exec(origin_as_op(&origin), scope)?;
                let op2 = self.child(1).build_exec(origin_as_op(&origin), scope)?;
                let pred = self
                    .builtin()
                    .build_pred()?
                    .expect("comparison word lowers to a predicate");
                Ok(Box::new(PredSubxCompare::new(op1, op2, origin, pred)))
            }

            TreeKind::Builtin => Ok(self
                .builtin()
                .build_pred()?
                .expect("builtin used as a predicate")),

            _ => unreachable!("not a predicate node: {:?}", self.kind()),
        }
    }

    /// Builds the operator graph of an expression node, feeding from
    /// `upstream`.
    pub fn build_exec(
        &self,
        upstream: OpRef,
        scope: Option<&Rc<Scope>>,
    ) -> Result<OpRef, EvalError> {
        match self.kind() {
            TreeKind::Cat => {
                let mut upstream = upstream;
                for child in self.children() {
                    upstream = child.build_exec(upstream, scope)?;
                }
                Ok(upstream)
            }

            TreeKind::Alt => {
                let done = Rc::new(Cell::new(false));
                let file: AltFile =
                    Rc::new(RefCell::new(vec![None; self.children().len()]));

                let mut branches = Vec::with_capacity(self.children().len());
                for (i, child) in self.children().iter().enumerate() {
                    let tine = op_ref(OpTine::new(
                        upstream.clone(),
                        Rc::clone(&file),
                        Rc::clone(&done),
                        i,
                    ));
                    branches.push(child.build_exec(tine, scope)?);
                }

                Ok(op_ref(OpMerge::new(branches, done)))
            }

            TreeKind::Or => {
                let mut or = OpOr::new(upstream);
                for child in self.children() {
                    let (origin, op) = sub_graph(child, scope)?;
                    or.add_branch(origin, op);
                }
                Ok(op_ref(or))
            }

            TreeKind::Nop => Ok(op_ref(OpNop::new(upstream))),

            TreeKind::Builtin => {
                if let Some(pred) = self.builtin().build_pred()? {
                    return Ok(op_ref(OpAssert::new(upstream, pred)));
                }
                Ok(self
                    .builtin()
                    .build_exec(upstream)?
                    .expect("builtin lowers to neither an op nor a pred"))
            }

            TreeKind::Assert => Ok(op_ref(OpAssert::new(
                upstream,
                self.child(0).build_pred(scope)?,
            ))),

            TreeKind::Format => {
                let s_origin = Rc::new(RefCell::new(StringerOrigin::new()));
                let mut stringer: StringerRef = s_origin.clone();
                for child in self.children() {
                    if child.kind() == TreeKind::Str {
                        stringer = Rc::new(RefCell::new(StringerLit::new(stringer, child.str())));
                    } else {
                        let (origin, op) = sub_graph(child, scope)?;
                        stringer = Rc::new(RefCell::new(StringerOp::new(stringer, origin, op)));
                    }
                }
                Ok(op_ref(OpFormat::new(upstream, s_origin, stringer)))
            }

            TreeKind::Const => Ok(op_ref(OpConst::new(
                upstream,
                Box::new(CstValue::new(*self.cst(), 0)),
            ))),

            TreeKind::Str => Ok(op_ref(OpConst::new(
                upstream,
                Box::new(StrValue::new(self.str(), 0)),
            ))),

            TreeKind::EmptyList => Ok(op_ref(OpConst::new(
                upstream,
                Box::new(SeqValue::new(Vec::new(), 0)),
            ))),

            TreeKind::Capture => {
                let (origin, op) = sub_graph(self.child(0), scope)?;
                Ok(op_ref(OpCapture::new(upstream, origin, op)))
            }

            TreeKind::SubxEval => {
                let (origin, op) = sub_graph(self.child(0), scope)?;
                let keep = self.cst().value() as usize;
                Ok(op_ref(OpSubx::new(upstream, origin, op, keep)))
            }

            TreeKind::CloseStar => {
                let (origin, op) = sub_graph(self.child(0), scope)?;
                Ok(op_ref(OpTrClosure::new(upstream, origin, op)))
            }

            TreeKind::Scope => {
                let scope = self.scp();
                let origin = origin_ref(Origin::new());
                let op = self
                    .child(0)
                    .build_exec(origin_as_op(&origin), Some(scope))?;
                Ok(op_ref(OpScope::new(
                    upstream,
                    origin,
                    op,
                    scope.num_names(),
                )))
            }

            TreeKind::Block => Ok(op_ref(OpLexClosure::new(
                upstream,
                Rc::new(self.child(0).clone()),
                scope.cloned(),
            ))),

            TreeKind::Bind => {
                let (depth, index) = resolve_name(self.str(), scope)?;
                Ok(op_ref(OpBind::new(upstream, depth, index)))
            }

            TreeKind::Read => {
                let (depth, index) = resolve_name(self.str(), scope)?;
                Ok(op_ref(OpRead::new(upstream, depth, index)))
            }

            TreeKind::Debug => Ok(op_ref(OpFDebug::new(upstream))),

            TreeKind::IfElse => {
                let cond = sub_graph(self.child(0), scope)?;
                let then_branch = sub_graph(self.child(1), scope)?;
                let else_branch = sub_graph(self.child(2), scope)?;
                Ok(op_ref(OpIfElse::new(
                    upstream,
                    cond,
                    then_branch,
                    else_branch,
                )))
            }

            TreeKind::PredNot
            | TreeKind::PredOr
            | TreeKind::PredAnd
            | TreeKind::PredSubxAny
            | TreeKind::PredSubxCmp => {
                unreachable!("predicate node in expression position")
            }
        }
    }
}
