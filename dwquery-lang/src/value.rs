//! The polymorphic value model.
//!
//! Values flow through operand stacks as boxed trait objects. Every value
//! has a type tag used by overload dispatch, a position index denoting its
//! order within the producing sub-expression, a formatted printout, a deep
//! clone, and a three-way comparison that fails across unrelated types.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::cst::{Constant, DEC_DOM};
use crate::stack::Frame;
use crate::tree::{Scope, Tree};

/// A value type tag. The code takes part in overload selectors; the name
/// shows up in diagnostics and type constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueType {
    code: u8,
    name: &'static str,
}

impl ValueType {
    pub const fn new(code: u8, name: &'static str) -> Self {
        ValueType { code, name }
    }

    pub fn code(self) -> u8 {
        self.code
    }

    pub fn name(self) -> &'static str {
        self.name
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// How much detail `show` should produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Brevity {
    Brief,
    Full,
}

/// Outcome of a three-way value comparison. `Fail` means the two values are
/// not comparable at all; lexicographic stack comparison never sees it
/// because it orders type tags first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpResult {
    Less,
    Equal,
    Greater,
    Fail,
}

impl CmpResult {
    pub fn from_ord(ord: std::cmp::Ordering) -> Self {
        match ord {
            std::cmp::Ordering::Less => CmpResult::Less,
            std::cmp::Ordering::Equal => CmpResult::Equal,
            std::cmp::Ordering::Greater => CmpResult::Greater,
        }
    }
}

/// A value on the operand stack.
pub trait Value: fmt::Debug + 'static {
    /// The type tag used for overload dispatch.
    fn vtype(&self) -> ValueType;

    /// 0-based index of this value within the sub-expression that produced
    /// it. Recomputed when a downstream producer re-emits it in a new order.
    fn pos(&self) -> usize;

    fn set_pos(&mut self, pos: usize);

    /// Formats the value into `w`.
    fn show(&self, w: &mut dyn fmt::Write, brv: Brevity) -> fmt::Result;

    /// An independent copy. Shared substructure (sequence backing, DWARF
    /// contexts, frames) is retained by reference count.
    fn clone_value(&self) -> Box<dyn Value>;

    /// Three-way comparison. Implementations return `Fail` when `other` is
    /// of a different concrete type.
    fn cmp_value(&self, other: &dyn Value) -> CmpResult;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// A concrete value kind with a statically known type tag, as required by
/// the generic overload adapters.
pub trait ValueKind: Value {
    const KIND: ValueType;
}

impl dyn Value {
    pub fn is<T: Value>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Value>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Value>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// An adapter rendering the value through [`fmt::Display`].
    pub fn display(&self, brv: Brevity) -> ValueDisplay<'_> {
        ValueDisplay { value: self, brv }
    }
}

/// Moves a boxed value into its concrete type, or hands it back.
pub fn downcast_value<T: Value>(value: Box<dyn Value>) -> Result<Box<T>, Box<dyn Value>> {
    if value.is::<T>() {
        Ok(value.into_any().downcast::<T>().unwrap())
    } else {
        Err(value)
    }
}

impl Clone for Box<dyn Value> {
    fn clone(&self) -> Self {
        self.clone_value()
    }
}

/// See [`Value::display`].
pub struct ValueDisplay<'a> {
    value: &'a dyn Value,
    brv: Brevity,
}

impl fmt::Display for ValueDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.show(f, self.brv)
    }
}

/// Implements the mechanical parts of [`Value`] for a type with a `pos`
/// field and an associated `VTYPE` constant.
#[macro_export]
macro_rules! value_impl_common {
    () => {
        fn vtype(&self) -> $crate::value::ValueType {
            Self::VTYPE
        }

        fn pos(&self) -> usize {
            self.pos
        }

        fn set_pos(&mut self, pos: usize) {
            self.pos = pos;
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }

        fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
            self
        }
    };
}

// Core type codes. DWARF value kinds take 8 and up.

/// A constant with a typed domain.
#[derive(Debug, Clone)]
pub struct CstValue {
    cst: Constant,
    pos: usize,
}

impl CstValue {
    pub const VTYPE: ValueType = ValueType::new(1, "T_CONST");

    pub fn new(cst: Constant, pos: usize) -> Self {
        CstValue { cst, pos }
    }

    pub fn constant(&self) -> &Constant {
        &self.cst
    }
}

impl Value for CstValue {
    value_impl_common!();

    fn show(&self, w: &mut dyn fmt::Write, brv: Brevity) -> fmt::Result {
        self.cst.dom().show(self.cst.value(), w, brv)
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn cmp_value(&self, other: &dyn Value) -> CmpResult {
        match other.downcast_ref::<CstValue>() {
            // Domains do not gate this comparison; predicates check
            // comparability before calling in. Ordering by bits first keeps
            // the relation total, which the seen set relies on.
            Some(that) => CmpResult::from_ord(
                self.cst
                    .value()
                    .cmp(&that.cst.value())
                    .then_with(|| self.cst.dom().name().cmp(that.cst.dom().name())),
            ),
            None => CmpResult::Fail,
        }
    }
}

/// A UTF-8 string.
#[derive(Debug, Clone)]
pub struct StrValue {
    str: String,
    pos: usize,
}

impl StrValue {
    pub const VTYPE: ValueType = ValueType::new(2, "T_STR");

    pub fn new(str: impl Into<String>, pos: usize) -> Self {
        StrValue {
            str: str.into(),
            pos,
        }
    }

    pub fn string(&self) -> &str {
        &self.str
    }
}

impl Value for StrValue {
    value_impl_common!();

    fn show(&self, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
        w.write_str(&self.str)
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn cmp_value(&self, other: &dyn Value) -> CmpResult {
        match other.downcast_ref::<StrValue>() {
            Some(that) => CmpResult::from_ord(self.str.cmp(&that.str)),
            None => CmpResult::Fail,
        }
    }
}

/// An ordered sequence of values. The backing storage is shared between
/// clones and only copied when a mutation needs it.
#[derive(Debug, Clone)]
pub struct SeqValue {
    seq: Rc<Vec<Box<dyn Value>>>,
    pos: usize,
}

impl SeqValue {
    pub const VTYPE: ValueType = ValueType::new(3, "T_SEQ");

    pub fn new(seq: Vec<Box<dyn Value>>, pos: usize) -> Self {
        SeqValue {
            seq: Rc::new(seq),
            pos,
        }
    }

    pub fn from_shared(seq: Rc<Vec<Box<dyn Value>>>, pos: usize) -> Self {
        SeqValue { seq, pos }
    }

    pub fn elements(&self) -> &[Box<dyn Value>] {
        &self.seq
    }

    pub fn shared(&self) -> Rc<Vec<Box<dyn Value>>> {
        Rc::clone(&self.seq)
    }
}

impl Value for SeqValue {
    value_impl_common!();

    fn show(&self, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
        w.write_str("[")?;
        for (i, elem) in self.seq.iter().enumerate() {
            if i > 0 {
                w.write_str(", ")?;
            }
            elem.show(w, Brevity::Brief)?;
        }
        w.write_str("]")
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn cmp_value(&self, other: &dyn Value) -> CmpResult {
        let that = match other.downcast_ref::<SeqValue>() {
            Some(that) => that,
            None => return CmpResult::Fail,
        };

        if self.seq.len() != that.seq.len() {
            return CmpResult::from_ord(self.seq.len().cmp(&that.seq.len()));
        }

        for (a, b) in self.seq.iter().zip(that.seq.iter()) {
            let tags = a.vtype().code().cmp(&b.vtype().code());
            if tags != std::cmp::Ordering::Equal {
                return CmpResult::from_ord(tags);
            }
            match a.cmp_value(b.as_ref()) {
                CmpResult::Equal => continue,
                other => return other,
            }
        }

        CmpResult::Equal
    }
}

/// A lexical closure: a tree sub-root together with the frame and scope it
/// captured. Closures capture lexically enclosing frames, which exist
/// strictly before the closure, so the value graph stays acyclic.
#[derive(Clone)]
pub struct ClosureValue {
    tree: Rc<Tree>,
    scope: Option<Rc<Scope>>,
    frame: Option<Rc<Frame>>,
    pos: usize,
}

impl ClosureValue {
    pub const VTYPE: ValueType = ValueType::new(4, "T_CLOSURE");

    pub fn new(
        tree: Rc<Tree>,
        scope: Option<Rc<Scope>>,
        frame: Option<Rc<Frame>>,
        pos: usize,
    ) -> Self {
        ClosureValue {
            tree,
            scope,
            frame,
            pos,
        }
    }

    pub fn tree(&self) -> &Rc<Tree> {
        &self.tree
    }

    pub fn scope(&self) -> Option<&Rc<Scope>> {
        self.scope.as_ref()
    }

    pub fn frame(&self) -> Option<&Rc<Frame>> {
        self.frame.as_ref()
    }
}

impl fmt::Debug for ClosureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosureValue")
            .field("tree", &self.tree)
            .field("pos", &self.pos)
            .finish_non_exhaustive()
    }
}

fn opt_rc_ptr<T>(rc: &Option<Rc<T>>) -> usize {
    rc.as_ref().map_or(0, |rc| Rc::as_ptr(rc) as usize)
}

impl Value for ClosureValue {
    value_impl_common!();

    fn show(&self, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
        w.write_str("closure")
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }

    fn cmp_value(&self, other: &dyn Value) -> CmpResult {
        let that = match other.downcast_ref::<ClosureValue>() {
            Some(that) => that,
            None => return CmpResult::Fail,
        };

        // Structural equality on the body, identity on frames and scopes.
        let frames_eq = opt_rc_ptr(&self.frame) == opt_rc_ptr(&that.frame);
        let scopes_eq = opt_rc_ptr(&self.scope) == opt_rc_ptr(&that.scope);
        if frames_eq && scopes_eq && *self.tree == *that.tree {
            return CmpResult::Equal;
        }

        let key = |c: &ClosureValue| {
            (
                opt_rc_ptr(&c.frame),
                opt_rc_ptr(&c.scope),
                Rc::as_ptr(&c.tree) as usize,
            )
        };
        CmpResult::from_ord(key(self).cmp(&key(that)))
    }
}


impl ValueKind for CstValue {
    const KIND: ValueType = CstValue::VTYPE;
}

impl ValueKind for StrValue {
    const KIND: ValueType = StrValue::VTYPE;
}

impl ValueKind for SeqValue {
    const KIND: ValueType = SeqValue::VTYPE;
}

impl ValueKind for ClosureValue {
    const KIND: ValueType = ClosureValue::VTYPE;
}

/// Shorthand for a plain decimal constant value.
pub fn dec_value(n: impl Into<i128>, pos: usize) -> Box<dyn Value> {
    Box::new(CstValue::new(Constant::new(n, &DEC_DOM), pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_compares_equal() {
        let values: Vec<Box<dyn Value>> = vec![
            dec_value(42, 0),
            Box::new(StrValue::new("hello", 1)),
            Box::new(SeqValue::new(vec![dec_value(1, 0), dec_value(2, 1)], 0)),
        ];

        for v in &values {
            let c = v.clone_value();
            assert_eq!(v.cmp_value(c.as_ref()), CmpResult::Equal);
        }
    }

    #[test]
    fn cross_type_comparison_fails() {
        let a = dec_value(1, 0);
        let b: Box<dyn Value> = Box::new(StrValue::new("1", 0));
        assert_eq!(a.cmp_value(b.as_ref()), CmpResult::Fail);
    }

    #[test]
    fn sequence_ordering() {
        let a = SeqValue::new(vec![dec_value(1, 0), dec_value(2, 1)], 0);
        let b = SeqValue::new(vec![dec_value(1, 0), dec_value(3, 1)], 0);
        assert_eq!(a.cmp_value(&b), CmpResult::Less);
        assert_eq!(b.cmp_value(&a), CmpResult::Greater);
    }

    #[test]
    fn downcasting() {
        let v: Box<dyn Value> = Box::new(StrValue::new("x", 0));
        assert!(v.is::<StrValue>());
        assert!(v.downcast_ref::<CstValue>().is_none());
        let s = downcast_value::<StrValue>(v).unwrap();
        assert_eq!(s.string(), "x");
    }
}
