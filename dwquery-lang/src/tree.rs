//! The intermediate representation of a parsed query.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::builtin::Builtin;
use crate::cst::Constant;
use crate::stack::VarId;

/// The closed set of tree node kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeKind {
    Cat,
    Alt,
    Or,
    Nop,
    Assert,
    PredNot,
    PredOr,
    PredAnd,
    PredSubxAny,
    PredSubxCmp,
    Capture,
    SubxEval,
    EmptyList,
    CloseStar,
    Const,
    Str,
    Format,
    Bind,
    Read,
    Scope,
    Block,
    IfElse,
    Builtin,
    Debug,
}

impl TreeKind {
    fn dump_name(self) -> &'static str {
        match self {
            TreeKind::Cat => "CAT",
            TreeKind::Alt => "ALT",
            TreeKind::Or => "OR",
            TreeKind::Nop => "NOP",
            TreeKind::Assert => "ASSERT",
            TreeKind::PredNot => "PRED_NOT",
            TreeKind::PredOr => "PRED_OR",
            TreeKind::PredAnd => "PRED_AND",
            TreeKind::PredSubxAny => "PRED_SUBX_ANY",
            TreeKind::PredSubxCmp => "PRED_SUBX_CMP",
            TreeKind::Capture => "CAPTURE",
            TreeKind::SubxEval => "SUBX_EVAL",
            TreeKind::EmptyList => "EMPTY_LIST",
            TreeKind::CloseStar => "CLOSE_STAR",
            TreeKind::Const => "CONST",
            TreeKind::Str => "STR",
            TreeKind::Format => "FORMAT",
            TreeKind::Bind => "BIND",
            TreeKind::Read => "READ",
            TreeKind::Scope => "SCOPE",
            TreeKind::Block => "BLOCK",
            TreeKind::IfElse => "IFELSE",
            TreeKind::Builtin => "F_BUILTIN",
            TreeKind::Debug => "F_DEBUG",
        }
    }
}

/// A lexical scope: the set of variable names visible at one nesting level,
/// linked to its parent. Built by the parser; walked by lowering to resolve
/// names to `(depth, index)` coordinates.
#[derive(Default)]
pub struct Scope {
    parent: Option<Rc<Scope>>,
    vars: RefCell<Vec<String>>,
}

impl Scope {
    pub fn new(parent: Option<Rc<Scope>>) -> Rc<Scope> {
        Rc::new(Scope {
            parent,
            vars: RefCell::new(Vec::new()),
        })
    }

    pub fn parent(&self) -> Option<Rc<Scope>> {
        self.parent.clone()
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.vars.borrow().iter().any(|v| v == name)
    }

    pub fn add_name(&self, name: &str) {
        assert!(!self.has_name(name));
        self.vars.borrow_mut().push(name.to_string());
    }

    pub fn index(&self, name: &str) -> Option<VarId> {
        self.vars.borrow().iter().position(|v| v == name)
    }

    pub fn num_names(&self) -> usize {
        self.vars.borrow().len()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope({:?})", self.vars.borrow())
    }
}

/// A node of the query tree: a kind, children, and optional payloads.
#[derive(Clone)]
pub struct Tree {
    kind: TreeKind,
    children: Vec<Tree>,
    str: Option<String>,
    cst: Option<Constant>,
    scope: Option<Rc<Scope>>,
    builtin: Option<Rc<dyn Builtin>>,
}

impl Tree {
    pub fn new(kind: TreeKind) -> Self {
        Tree {
            kind,
            children: Vec::new(),
            str: None,
            cst: None,
            scope: None,
            builtin: None,
        }
    }

    pub fn with_str(kind: TreeKind, str: impl Into<String>) -> Self {
        let mut t = Tree::new(kind);
        t.str = Some(str.into());
        t
    }

    pub fn with_cst(kind: TreeKind, cst: Constant) -> Self {
        let mut t = Tree::new(kind);
        t.cst = Some(cst);
        t
    }

    pub fn with_builtin(kind: TreeKind, builtin: Rc<dyn Builtin>) -> Self {
        let mut t = Tree::new(kind);
        t.builtin = Some(builtin);
        t
    }

    pub fn with_scope(kind: TreeKind, scope: Rc<Scope>) -> Self {
        let mut t = Tree::new(kind);
        t.scope = Some(scope);
        t
    }

    pub fn kind(&self) -> TreeKind {
        self.kind
    }

    pub fn push_child(&mut self, child: Tree) {
        self.children.push(child);
    }

    pub fn child(&self, idx: usize) -> &Tree {
        &self.children[idx]
    }

    pub fn children(&self) -> &[Tree] {
        &self.children
    }

    pub fn str(&self) -> &str {
        self.str.as_deref().expect("tree node has no string payload")
    }

    pub fn cst(&self) -> &Constant {
        self.cst.as_ref().expect("tree node has no constant payload")
    }

    pub fn set_cst(&mut self, cst: Constant) {
        self.cst = Some(cst);
    }

    pub fn scp(&self) -> &Rc<Scope> {
        self.scope.as_ref().expect("tree node has no scope")
    }

    pub fn builtin(&self) -> &Rc<dyn Builtin> {
        self.builtin.as_ref().expect("tree node has no builtin")
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.kind.dump_name())?;

        if let Some(str) = &self.str {
            write!(f, "<{str}>")?;
        }
        if let Some(cst) = &self.cst {
            write!(f, "<{cst}>")?;
        }
        if let Some(builtin) = &self.builtin {
            write!(f, "<{}>", builtin.name())?;
        }

        for child in &self.children {
            write!(f, " {child:?}")?;
        }

        write!(f, ")")
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.str == other.str
            && self.cst == other.cst
            && match (&self.builtin, &other.builtin) {
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
            && match (&self.scope, &other.scope) {
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
            && self.children == other.children
    }
}

impl Eq for Tree {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cst::{Constant, DEC_DOM};

    #[test]
    fn dump_format() {
        let mut cat = Tree::new(TreeKind::Cat);
        cat.push_child(Tree::with_cst(TreeKind::Const, Constant::new(17, &DEC_DOM)));
        cat.push_child(Tree::new(TreeKind::Nop));
        assert_eq!(format!("{cat:?}"), "(CAT (CONST<17>) (NOP))");
    }

    #[test]
    fn scope_names() {
        let outer = Scope::new(None);
        outer.add_name("A");
        let inner = Scope::new(Some(outer.clone()));
        inner.add_name("B");

        assert_eq!(inner.index("B"), Some(0));
        assert!(inner.index("A").is_none());
        assert_eq!(inner.parent().unwrap().index("A"), Some(0));
        assert_eq!(outer.num_names(), 1);
    }
}
