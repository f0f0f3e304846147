//! Lazy stack producers.
//!
//! Subclasses of [`Op`] represent computations. An op node is typically
//! constructed so that it feeds directly from another op node, called its
//! upstream (see `Tree::build_exec`). Producers are pull-driven: one call
//! to `next` may pull from upstream zero or more times before yielding, and
//! `reset` returns the whole chain to its pre-first-call state.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::error::EvalError;
use crate::pred::{Pred, PredResult};
use crate::stack::{Frame, Stack, VarId};
use crate::tree::{Scope, Tree};
use crate::value::{Brevity, ClosureValue, SeqValue, StrValue, Value};

pub trait Op {
    /// Produces the next stack, or `None` when exhausted.
    fn next(&mut self) -> Result<Option<Stack>, EvalError>;

    /// Returns to the pre-first-call state, propagating to every upstream
    /// producer that was ever pulled.
    fn reset(&mut self);

    fn name(&self) -> String;
}

/// Ops are shared: alternation branches feed from one upstream, and outer
/// operators keep handles to the origins of their inner sub-graphs.
pub type OpRef = Rc<RefCell<dyn Op>>;

pub fn op_ref<T: Op + 'static>(op: T) -> OpRef {
    Rc::new(RefCell::new(op))
}

/// A lazy iterator of single values, as returned by yielding overloads.
pub trait ValueProducer {
    fn next(&mut self) -> Result<Option<Box<dyn Value>>, EvalError>;
}

/// Yields the values of several producers in turn.
pub struct ValueProducerCat {
    producers: Vec<Box<dyn ValueProducer>>,
    i: usize,
}

impl ValueProducerCat {
    pub fn new(producers: Vec<Box<dyn ValueProducer>>) -> Self {
        ValueProducerCat { producers, i: 0 }
    }
}

impl ValueProducer for ValueProducerCat {
    fn next(&mut self) -> Result<Option<Box<dyn Value>>, EvalError> {
        while self.i < self.producers.len() {
            if let Some(v) = self.producers[self.i].next()? {
                return Ok(Some(v));
            }
            self.i += 1;
        }
        Ok(None)
    }
}

/// Yields values from a vector, assigning consecutive positions.
pub struct VecValueProducer {
    iter: std::iter::Enumerate<std::vec::IntoIter<Box<dyn Value>>>,
}

impl VecValueProducer {
    pub fn new(items: Vec<Box<dyn Value>>) -> Self {
        VecValueProducer {
            iter: items.into_iter().enumerate(),
        }
    }
}

impl ValueProducer for VecValueProducer {
    fn next(&mut self) -> Result<Option<Box<dyn Value>>, EvalError> {
        Ok(self.iter.next().map(|(pos, mut v)| {
            v.set_pos(pos);
            v
        }))
    }
}

/// The upstream-less head of a (sub-)graph. It hands out the one stack it
/// was primed with and then runs dry until it is reset and primed again.
///
/// The chain is moved to its initial state by calling `reset`, which
/// eventually percolates here; `set_next` insists on that, to catch ops
/// that fail to forward resets.
pub struct Origin {
    stk: Option<Stack>,
    was_reset: bool,
}

impl Origin {
    pub fn new() -> Self {
        Origin {
            stk: None,
            was_reset: false,
        }
    }

    pub fn with_stack(stk: Stack) -> Self {
        Origin {
            stk: Some(stk),
            was_reset: false,
        }
    }

    pub fn set_next(&mut self, stk: Stack) {
        assert!(self.stk.is_none());
        assert!(
            self.was_reset,
            "origin primed without a preceding reset; some op failed to forward it"
        );
        self.was_reset = false;
        self.stk = Some(stk);
    }
}

impl Default for Origin {
    fn default() -> Self {
        Origin::new()
    }
}

impl Op for Origin {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        Ok(self.stk.take())
    }

    fn reset(&mut self) {
        self.stk = None;
        self.was_reset = true;
    }

    fn name(&self) -> String {
        "origin".to_string()
    }
}

pub type OriginRef = Rc<RefCell<Origin>>;

pub fn origin_ref(origin: Origin) -> OriginRef {
    Rc::new(RefCell::new(origin))
}

/// Views an origin handle as a generic op handle.
pub fn origin_as_op(origin: &OriginRef) -> OpRef {
    origin.clone()
}

pub struct OpNop {
    upstream: OpRef,
}

impl OpNop {
    pub fn new(upstream: OpRef) -> Self {
        OpNop { upstream }
    }
}

impl Op for OpNop {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        self.upstream.borrow_mut().next()
    }

    fn reset(&mut self) {
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        "nop".to_string()
    }
}

pub struct OpAssert {
    upstream: OpRef,
    pred: Box<dyn Pred>,
}

impl OpAssert {
    pub fn new(upstream: OpRef, pred: Box<dyn Pred>) -> Self {
        OpAssert { upstream, pred }
    }
}

impl Op for OpAssert {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        while let Some(mut stk) = self.upstream.borrow_mut().next()? {
            match self.pred.result(&mut stk)? {
                PredResult::Yes => return Ok(Some(stk)),
                PredResult::No => continue,
                PredResult::Fail => {
                    return Err(EvalError::PredicateFailure(self.pred.name()));
                }
            }
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        format!("assert<{}>", self.pred.name())
    }
}

pub struct OpConst {
    upstream: OpRef,
    value: Box<dyn Value>,
}

impl OpConst {
    pub fn new(upstream: OpRef, value: Box<dyn Value>) -> Self {
        OpConst { upstream, value }
    }
}

impl Op for OpConst {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        match self.upstream.borrow_mut().next()? {
            Some(mut stk) => {
                stk.push(self.value.clone_value());
                Ok(Some(stk))
            }
            None => Ok(None),
        }
    }

    fn reset(&mut self) {
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        format!("const<{}>", self.value.display(Brevity::Brief))
    }
}

/// The shared per-alternation state: one stack slot per branch.
pub type AltFile = Rc<RefCell<Vec<Option<Stack>>>>;

/// A tine sits at the head of one alternation branch. All tines of an ALT
/// share a file and a done flag. A tine hands out its own file slot exactly
/// once per refill; the file is only refilled from upstream when every slot
/// has been fetched, so all branches see the same upstream stacks without
/// duplicating upstream work.
pub struct OpTine {
    upstream: OpRef,
    file: AltFile,
    done: Rc<Cell<bool>>,
    branch: usize,
}

impl OpTine {
    pub fn new(upstream: OpRef, file: AltFile, done: Rc<Cell<bool>>, branch: usize) -> Self {
        assert!(branch < file.borrow().len());
        OpTine {
            upstream,
            file,
            done,
            branch,
        }
    }
}

impl Op for OpTine {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        if self.done.get() {
            return Ok(None);
        }

        if self.file.borrow().iter().all(|slot| slot.is_none()) {
            match self.upstream.borrow_mut().next()? {
                Some(stk) => {
                    for slot in self.file.borrow_mut().iter_mut() {
                        *slot = Some(stk.clone());
                    }
                }
                None => {
                    self.done.set(true);
                    return Ok(None);
                }
            }
        }

        Ok(self.file.borrow_mut()[self.branch].take())
    }

    fn reset(&mut self) {
        for slot in self.file.borrow_mut().iter_mut() {
            *slot = None;
        }
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        "tine".to_string()
    }
}

/// The fair round-robin collector closing an ALT. Its cursor advances on
/// every `None` and it stops only when all branches return `None` without
/// refilling the file.
pub struct OpMerge {
    ops: Vec<OpRef>,
    idx: usize,
    done: Rc<Cell<bool>>,
}

impl OpMerge {
    pub fn new(ops: Vec<OpRef>, done: Rc<Cell<bool>>) -> Self {
        done.set(false);
        OpMerge { ops, idx: 0, done }
    }
}

impl Op for OpMerge {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        while !self.done.get() {
            if let Some(stk) = self.ops[self.idx].borrow_mut().next()? {
                return Ok(Some(stk));
            }
            self.idx = (self.idx + 1) % self.ops.len();
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.done.set(false);
        self.idx = 0;
        for op in &self.ops {
            op.borrow_mut().reset();
        }
    }

    fn name(&self) -> String {
        "merge".to_string()
    }
}

/// First-match choice: branches are tried in declaration order, each primed
/// with the same upstream stack; the first branch with results is drained,
/// then the next upstream stack restarts the scan.
pub struct OpOr {
    upstream: OpRef,
    branches: Vec<(OriginRef, OpRef)>,
    cur: Option<usize>,
}

impl OpOr {
    pub fn new(upstream: OpRef) -> Self {
        OpOr {
            upstream,
            branches: Vec::new(),
            cur: None,
        }
    }

    pub fn add_branch(&mut self, origin: OriginRef, op: OpRef) {
        assert!(self.cur.is_none());
        self.branches.push((origin, op));
    }

    fn reset_me(&mut self) {
        self.cur = None;
        for (_, op) in &self.branches {
            op.borrow_mut().reset();
        }
    }
}

impl Op for OpOr {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        loop {
            if let Some(i) = self.cur {
                if let Some(stk) = self.branches[i].1.borrow_mut().next()? {
                    return Ok(Some(stk));
                }
                self.reset_me();
                continue;
            }

            match self.upstream.borrow_mut().next()? {
                Some(stk) => {
                    for i in 0..self.branches.len() {
                        let (origin, op) = &self.branches[i];
                        op.borrow_mut().reset();
                        origin.borrow_mut().set_next(stk.clone());
                        if let Some(stk2) = op.borrow_mut().next()? {
                            self.cur = Some(i);
                            return Ok(Some(stk2));
                        }
                    }
                }
                None => return Ok(None),
            }
        }
    }

    fn reset(&mut self) {
        self.reset_me();
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        let branches = self
            .branches
            .iter()
            .map(|(_, op)| op.borrow().name())
            .collect::<Vec<_>>()
            .join(" || ");
        format!("or<{branches}>")
    }
}

/// Drains an inner sub-graph on a copy of each upstream stack and pushes the
/// collected top values as one sequence.
pub struct OpCapture {
    upstream: OpRef,
    origin: OriginRef,
    op: OpRef,
}

impl OpCapture {
    pub fn new(upstream: OpRef, origin: OriginRef, op: OpRef) -> Self {
        OpCapture {
            upstream,
            origin,
            op,
        }
    }
}

impl Op for OpCapture {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        match self.upstream.borrow_mut().next()? {
            Some(mut stk) => {
                self.op.borrow_mut().reset();
                self.origin.borrow_mut().set_next(stk.clone());

                let mut elements = Vec::new();
                while let Some(mut stk2) = self.op.borrow_mut().next()? {
                    elements.push(stk2.pop());
                }

                stk.push(Box::new(SeqValue::new(elements, 0)));
                Ok(Some(stk))
            }
            None => Ok(None),
        }
    }

    fn reset(&mut self) {
        self.op.borrow_mut().reset();
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        format!("capture<{}>", self.op.borrow().name())
    }
}

/// Applies a sub-expression zero or more times, yielding every distinct
/// intermediate state. The seen set is keyed by lexicographic stack
/// equality; the emitted set is the reflexive-transitive closure of the
/// sub-expression's pull relation, provided that closure is finite.
pub struct OpTrClosure {
    upstream: OpRef,
    origin: OriginRef,
    op: OpRef,
    seen: BTreeSet<Rc<Stack>>,
    worklist: Vec<Rc<Stack>>,
}

impl OpTrClosure {
    pub fn new(upstream: OpRef, origin: OriginRef, op: OpRef) -> Self {
        OpTrClosure {
            upstream,
            origin,
            op,
            seen: BTreeSet::new(),
            worklist: Vec::new(),
        }
    }

    fn reset_me(&mut self) {
        self.worklist.clear();
        self.seen.clear();
    }
}

impl Op for OpTrClosure {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        if self.worklist.is_empty() {
            self.reset_me();
            match self.upstream.borrow_mut().next()? {
                Some(stk) => {
                    let stk = Rc::new(stk);
                    self.worklist.push(Rc::clone(&stk));
                    self.seen.insert(stk);
                }
                None => return Ok(None),
            }
        }

        let stk = self.worklist.pop().unwrap();

        self.op.borrow_mut().reset();
        self.origin.borrow_mut().set_next((*stk).clone());

        while let Some(stk2) = self.op.borrow_mut().next()? {
            let stk2 = Rc::new(stk2);
            if !self.seen.contains(&stk2) {
                self.worklist.push(Rc::clone(&stk2));
                self.seen.insert(stk2);
            }
        }

        Ok(Some((*stk).clone()))
    }

    fn reset(&mut self) {
        self.reset_me();
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        format!("close<{}>", self.op.borrow().name())
    }
}

/// Runs an inner sub-graph and yields once per inner result, lifting the
/// top `keep` values onto a fresh copy of the upstream stack in order.
pub struct OpSubx {
    upstream: OpRef,
    origin: OriginRef,
    op: OpRef,
    stk: Option<Stack>,
    keep: usize,
}

impl OpSubx {
    pub fn new(upstream: OpRef, origin: OriginRef, op: OpRef, keep: usize) -> Self {
        OpSubx {
            upstream,
            origin,
            op,
            stk: None,
            keep,
        }
    }
}

impl Op for OpSubx {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        loop {
            while self.stk.is_none() {
                match self.upstream.borrow_mut().next()? {
                    Some(stk) => {
                        self.op.borrow_mut().reset();
                        self.origin.borrow_mut().set_next(stk.clone());
                        self.stk = Some(stk);
                    }
                    None => return Ok(None),
                }
            }

            if let Some(mut stk) = self.op.borrow_mut().next()? {
                let mut ret = self.stk.as_ref().unwrap().clone();
                let mut kept = Vec::with_capacity(self.keep);
                for _ in 0..self.keep {
                    kept.push(stk.pop());
                }
                while let Some(v) = kept.pop() {
                    ret.push(v);
                }
                return Ok(Some(ret));
            }

            self.stk = None;
        }
    }

    fn reset(&mut self) {
        self.stk = None;
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        format!("subx<{}>", self.op.borrow().name())
    }
}

fn debug_stack(stk: &Stack) {
    let mut line = format!("{stk:?} (");
    let mut frame = stk.frame();
    while let Some(f) = frame {
        line.push_str(&format!("{f:?}  "));
        frame = f.parent();
    }
    eprintln!("{line})");
}

/// Pass-through that prints the stack and its frames to standard error.
pub struct OpFDebug {
    upstream: OpRef,
}

impl OpFDebug {
    pub fn new(upstream: OpRef) -> Self {
        OpFDebug { upstream }
    }
}

impl Op for OpFDebug {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        match self.upstream.borrow_mut().next()? {
            Some(stk) => {
                debug_stack(&stk);
                Ok(Some(stk))
            }
            None => Ok(None),
        }
    }

    fn reset(&mut self) {
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        "f_debug".to_string()
    }
}

/// Pushes a fresh frame for each upstream stack, runs the inner sub-graph,
/// and pops back to the parent frame on each inner result.
pub struct OpScope {
    upstream: OpRef,
    origin: OriginRef,
    op: OpRef,
    num_vars: usize,
    primed: bool,
}

impl OpScope {
    pub fn new(upstream: OpRef, origin: OriginRef, op: OpRef, num_vars: usize) -> Self {
        OpScope {
            upstream,
            origin,
            op,
            num_vars,
            primed: false,
        }
    }
}

impl Op for OpScope {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        loop {
            while !self.primed {
                match self.upstream.borrow_mut().next()? {
                    Some(mut stk) => {
                        stk.set_frame(Some(Frame::new(stk.frame(), self.num_vars)));
                        self.op.borrow_mut().reset();
                        self.origin.borrow_mut().set_next(stk);
                        self.primed = true;
                    }
                    None => return Ok(None),
                }
            }

            if let Some(mut stk) = self.op.borrow_mut().next()? {
                let parent = stk.frame().and_then(|f| f.parent());
                stk.set_frame(parent);
                return Ok(Some(stk));
            }

            self.primed = false;
        }
    }

    fn reset(&mut self) {
        self.primed = false;
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        format!(
            "scope<vars={}, {}>",
            self.num_vars,
            self.op.borrow().name()
        )
    }
}

/// Pops the top value into a frame slot.
pub struct OpBind {
    upstream: OpRef,
    depth: usize,
    index: VarId,
}

impl OpBind {
    pub fn new(upstream: OpRef, depth: usize, index: VarId) -> Self {
        OpBind {
            upstream,
            depth,
            index,
        }
    }
}

impl Op for OpBind {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        match self.upstream.borrow_mut().next()? {
            Some(mut stk) => {
                let frame = stk.nth_frame(self.depth);
                let value = stk.pop();
                frame.bind_value(self.index, value)?;
                Ok(Some(stk))
            }
            None => Ok(None),
        }
    }

    fn reset(&mut self) {
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        format!("bind<{}@{}>", self.index, self.depth)
    }
}

/// Executes a closure value: swaps in the closure's captured frame, runs
/// its body, and restores the caller's frame on every result. The closure
/// is popped from the top of the stack.
pub struct OpApply {
    upstream: OpRef,
    state: Option<(OpRef, Option<Rc<Frame>>)>,
}

impl OpApply {
    pub fn new(upstream: OpRef) -> Self {
        OpApply {
            upstream,
            state: None,
        }
    }
}

impl Op for OpApply {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        loop {
            while self.state.is_none() {
                match self.upstream.borrow_mut().next()? {
                    Some(mut stk) => {
                        if !stk.top().is::<ClosureValue>() {
                            eprintln!("Error: `apply' expects a T_CLOSURE on TOS.");
                            continue;
                        }

                        let closure = stk.pop_as::<ClosureValue>();
                        let old_frame = stk.frame();
                        stk.set_frame(closure.frame().cloned());

                        let origin: OpRef = op_ref(Origin::with_stack(stk));
                        let op = closure.tree().build_exec(origin, closure.scope())?;
                        self.state = Some((op, old_frame));
                    }
                    None => return Ok(None),
                }
            }

            let (op, old_frame) = self.state.as_ref().unwrap();
            if let Some(mut stk) = op.borrow_mut().next()? {
                stk.set_frame(old_frame.clone());
                return Ok(Some(stk));
            }

            self.state = None;
        }
    }

    fn reset(&mut self) {
        self.state = None;
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        "apply".to_string()
    }
}

/// Reads a frame slot. A closure held in the slot is implicitly applied;
/// any other value is cloned and pushed.
pub struct OpRead {
    upstream: OpRef,
    depth: usize,
    index: VarId,
    apply: Option<OpApply>,
}

impl OpRead {
    pub fn new(upstream: OpRef, depth: usize, index: VarId) -> Self {
        OpRead {
            upstream,
            depth,
            index,
            apply: None,
        }
    }
}

impl Op for OpRead {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        loop {
            if self.apply.is_none() {
                match self.upstream.borrow_mut().next()? {
                    Some(mut stk) => {
                        let frame = stk.nth_frame(self.depth);
                        let value = frame.read_value(self.index)?;
                        let is_closure = value.is::<ClosureValue>();
                        stk.push(value);

                        if !is_closure {
                            return Ok(Some(stk));
                        }

                        // A closure in a slot is a function reference; run
                        // it and fetch all the values.
                        let origin: OpRef = op_ref(Origin::with_stack(stk));
                        self.apply = Some(OpApply::new(origin));
                    }
                    None => return Ok(None),
                }
            }

            if let Some(stk) = self.apply.as_mut().unwrap().next()? {
                return Ok(Some(stk));
            }

            self.apply = None;
        }
    }

    fn reset(&mut self) {
        self.apply = None;
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        format!("read<{}@{}>", self.index, self.depth)
    }
}

/// Pushes a closure value capturing the tree sub-root, the current stack's
/// top frame, and the lexical scope.
pub struct OpLexClosure {
    upstream: OpRef,
    tree: Rc<Tree>,
    scope: Option<Rc<Scope>>,
}

impl OpLexClosure {
    pub fn new(upstream: OpRef, tree: Rc<Tree>, scope: Option<Rc<Scope>>) -> Self {
        OpLexClosure {
            upstream,
            tree,
            scope,
        }
    }
}

impl Op for OpLexClosure {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        match self.upstream.borrow_mut().next()? {
            Some(mut stk) => {
                let frame = stk.frame();
                stk.push(Box::new(ClosureValue::new(
                    Rc::clone(&self.tree),
                    self.scope.clone(),
                    frame,
                    0,
                )));
                Ok(Some(stk))
            }
            None => Ok(None),
        }
    }

    fn reset(&mut self) {
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        "lex_closure".to_string()
    }
}

/// Evaluates a condition sub-graph on a copy of each upstream stack and
/// runs exactly one of the two body sub-graphs on the original.
pub struct OpIfElse {
    upstream: OpRef,
    cond: (OriginRef, OpRef),
    then_branch: (OriginRef, OpRef),
    else_branch: (OriginRef, OpRef),
    sel: Option<bool>,
}

impl OpIfElse {
    pub fn new(
        upstream: OpRef,
        cond: (OriginRef, OpRef),
        then_branch: (OriginRef, OpRef),
        else_branch: (OriginRef, OpRef),
    ) -> Self {
        OpIfElse {
            upstream,
            cond,
            then_branch,
            else_branch,
            sel: None,
        }
    }
}

impl Op for OpIfElse {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        loop {
            if self.sel.is_none() {
                match self.upstream.borrow_mut().next()? {
                    Some(stk) => {
                        self.cond.1.borrow_mut().reset();
                        self.cond.0.borrow_mut().set_next(stk.clone());
                        let taken = self.cond.1.borrow_mut().next()?.is_some();

                        let (origin, op) = if taken {
                            &self.then_branch
                        } else {
                            &self.else_branch
                        };
                        op.borrow_mut().reset();
                        origin.borrow_mut().set_next(stk);
                        self.sel = Some(taken);
                    }
                    None => return Ok(None),
                }
            }

            let op = if self.sel.unwrap() {
                &self.then_branch.1
            } else {
                &self.else_branch.1
            };
            if let Some(stk) = op.borrow_mut().next()? {
                return Ok(Some(stk));
            }

            self.sel = None;
        }
    }

    fn reset(&mut self) {
        self.sel = None;
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        "ifelse".to_string()
    }
}

/// The stringer hierarchy supports `OpFormat`. Stringers parallel ops,
/// except they send a work-in-progress string along with each stack.
pub trait Stringer {
    fn next(&mut self) -> Result<Option<(Stack, String)>, EvalError>;
    fn reset(&mut self);
}

pub type StringerRef = Rc<RefCell<dyn Stringer>>;

pub fn stringer_ref<T: Stringer + 'static>(s: T) -> StringerRef {
    Rc::new(RefCell::new(s))
}

/// Head of a stringer chain; the same reset-then-prime protocol as
/// [`Origin`].
pub struct StringerOrigin {
    stk: Option<Stack>,
    was_reset: bool,
}

impl StringerOrigin {
    pub fn new() -> Self {
        StringerOrigin {
            stk: None,
            was_reset: false,
        }
    }

    pub fn set_next(&mut self, stk: Stack) {
        assert!(self.stk.is_none());
        assert!(self.was_reset);
        self.was_reset = false;
        self.stk = Some(stk);
    }
}

impl Default for StringerOrigin {
    fn default() -> Self {
        StringerOrigin::new()
    }
}

impl Stringer for StringerOrigin {
    fn next(&mut self) -> Result<Option<(Stack, String)>, EvalError> {
        Ok(self.stk.take().map(|stk| (stk, String::new())))
    }

    fn reset(&mut self) {
        self.stk = None;
        self.was_reset = true;
    }
}

/// A literal fragment of a format string.
pub struct StringerLit {
    upstream: StringerRef,
    lit: String,
}

impl StringerLit {
    pub fn new(upstream: StringerRef, lit: impl Into<String>) -> Self {
        StringerLit {
            upstream,
            lit: lit.into(),
        }
    }
}

impl Stringer for StringerLit {
    fn next(&mut self) -> Result<Option<(Stack, String)>, EvalError> {
        match self.upstream.borrow_mut().next()? {
            Some((stk, mut s)) => {
                s.push_str(&self.lit);
                Ok(Some((stk, s)))
            }
            None => Ok(None),
        }
    }

    fn reset(&mut self) {
        self.upstream.borrow_mut().reset();
    }
}

/// An embedded sub-expression of a format string: pulls one value per inner
/// result, stringifies it, and appends it.
pub struct StringerOp {
    upstream: StringerRef,
    origin: OriginRef,
    op: OpRef,
    partial: String,
    have: bool,
}

impl StringerOp {
    pub fn new(upstream: StringerRef, origin: OriginRef, op: OpRef) -> Self {
        StringerOp {
            upstream,
            origin,
            op,
            partial: String::new(),
            have: false,
        }
    }
}

impl Stringer for StringerOp {
    fn next(&mut self) -> Result<Option<(Stack, String)>, EvalError> {
        loop {
            if !self.have {
                match self.upstream.borrow_mut().next()? {
                    Some((stk, s)) => {
                        self.op.borrow_mut().reset();
                        self.origin.borrow_mut().set_next(stk);
                        self.partial = s;
                        self.have = true;
                    }
                    None => return Ok(None),
                }
            }

            if let Some(mut stk) = self.op.borrow_mut().next()? {
                let value = stk.pop();
                let mut s = self.partial.clone();
                let mut rendered = String::new();
                value
                    .show(&mut rendered, Brevity::Brief)
                    .expect("value failed to format");
                s.push_str(&rendered);
                return Ok(Some((stk, s)));
            }

            self.have = false;
        }
    }

    fn reset(&mut self) {
        self.have = false;
        self.op.borrow_mut().reset();
        self.upstream.borrow_mut().reset();
    }
}

/// Top of a format chain: pushes the completed string onto the stack.
pub struct OpFormat {
    upstream: OpRef,
    origin: Rc<RefCell<StringerOrigin>>,
    stringer: StringerRef,
    pos: usize,
}

impl OpFormat {
    pub fn new(
        upstream: OpRef,
        origin: Rc<RefCell<StringerOrigin>>,
        stringer: StringerRef,
    ) -> Self {
        OpFormat {
            upstream,
            origin,
            stringer,
            pos: 0,
        }
    }

    fn reset_me(&mut self) {
        self.stringer.borrow_mut().reset();
        self.pos = 0;
    }
}

impl Op for OpFormat {
    fn next(&mut self) -> Result<Option<Stack>, EvalError> {
        loop {
            if let Some((mut stk, s)) = self.stringer.borrow_mut().next()? {
                stk.push(Box::new(StrValue::new(s, self.pos)));
                self.pos += 1;
                return Ok(Some(stk));
            }

            let next_stk = self.upstream.borrow_mut().next()?;
            match next_stk {
                Some(stk) => {
                    self.reset_me();
                    self.origin.borrow_mut().set_next(stk);
                }
                None => return Ok(None),
            }
        }
    }

    fn reset(&mut self) {
        self.reset_me();
        self.upstream.borrow_mut().reset();
    }

    fn name(&self) -> String {
        "format".to_string()
    }
}
