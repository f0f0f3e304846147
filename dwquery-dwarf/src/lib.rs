//! DWARF and ELF value kinds and vocabulary for the dwquery language.
//!
//! This crate supplies everything the language core treats as a foreign
//! capability: per-file [`DwarfContext`]s built on `gimli` and `goblin`,
//! the DWARF value kinds (units, entries, attributes, abbreviations,
//! location expressions, address sets), the ELF value kinds (symbols,
//! sections, relocations), typed attribute interpretation, and the word
//! vocabulary operating over them.
//!
//! The usual setup merges the two vocabularies and seeds a query with a
//! file handle:
//!
//! ```no_run
//! use dwquery_dwarf::{dwarf_vocabulary, DwarfContext, DwarfValue, Doneness};
//! use dwquery_lang::{core_vocabulary, Expr, Stack};
//!
//! let mut voc = core_vocabulary();
//! voc.extend(dwarf_vocabulary());
//!
//! let expr = Expr::parse("entry ?TAG_subprogram name", &voc)?;
//! let ctx = DwarfContext::open("./a.out")?;
//!
//! let mut seed = Stack::new();
//! seed.push(Box::new(DwarfValue::new(ctx, Doneness::Cooked, 0)));
//! let results = expr.query(seed)?;
//! # let _ = results;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod atval;
pub mod builtins;
pub mod context;
pub mod coverage;
pub mod cst;
pub mod error;
pub mod value;

pub use builtins::dwarf_vocabulary;
pub use context::{DwarfContext, Reader};
pub use coverage::Coverage;
pub use error::{DwarfError, DwarfErrorKind};
pub use value::{
    AsetValue, AttrValue, CuValue, DieValue, Doneness, DwarfValue, ElfSectionValue, ElfValue,
    LoclistElemValue, LoclistOpValue, RelocationValue, SymbolValue,
};
