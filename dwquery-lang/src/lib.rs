//! The core of the dwquery language.
//!
//! A query is a terse, stack-oriented expression over an implicit operand
//! stack. This crate owns the language itself: the polymorphic value model,
//! the expression tree produced by the parser, its lowering to a graph of
//! lazy stack producers, overload dispatch by value type, predicates,
//! lexical scopes and closures, and the pull-based driver.
//!
//! The language core knows nothing about DWARF. Domain value kinds and
//! vocabularies (such as the DWARF one in `dwquery-dwarf`) plug in through
//! [`Value`], [`Vocabulary::extend`], and overload tables.
//!
//! ```
//! use dwquery_lang::{core_vocabulary, Expr, Stack};
//! use fallible_iterator::FallibleIterator;
//!
//! let voc = core_vocabulary();
//! let expr = Expr::parse("1 2 add", &voc).unwrap();
//! let mut results = expr.query(Stack::new()).unwrap();
//!
//! let stack = results.next().unwrap().unwrap();
//! assert_eq!(format!("{:?}", stack), "< 3 >");
//! ```

pub mod builtin;
pub mod builtins;
pub mod cst;
pub mod error;
pub mod op;
pub mod overload;
pub mod parse;
pub mod pred;
pub mod query;
pub mod stack;
pub mod tree;
pub mod value;

mod build;

pub use builtin::{add_constant, add_type_constant, Builtin, Vocabulary};
pub use builtins::core_vocabulary;
pub use cst::{Constant, ConstantDom};
pub use error::EvalError;
pub use parse::ParseError;
pub use query::{Expr, Results};
pub use stack::{Frame, Stack};
pub use tree::{Scope, Tree, TreeKind};
pub use value::{Brevity, CmpResult, Value, ValueKind, ValueType};
