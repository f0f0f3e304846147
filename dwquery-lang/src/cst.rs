//! Typed integer constants.
//!
//! Every [`Constant`] carries a reference to a *domain* that knows how to
//! print it and which other domains it may be compared against. Plain
//! domains (anonymous numeric literals) intermix freely; enumeration
//! domains, such as the DWARF tag namespace, only compare within themselves.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::value::{Brevity, ValueType};

/// Metadata about a constant's interpretation.
pub trait ConstantDom: Sync {
    /// Formats `value` into `w`.
    fn show(&self, value: i128, w: &mut dyn fmt::Write, brv: Brevity) -> fmt::Result;

    /// The domain's name, used in diagnostics.
    fn name(&self) -> &'static str;

    /// Whether values of this domain are free numbers on which arithmetic
    /// is meaningful.
    fn safe_arith(&self) -> bool {
        false
    }

    /// Whether this is an anonymous literal domain. In arithmetic, a plain
    /// domain is absorbed by the other operand's domain.
    fn plain(&self) -> bool {
        false
    }
}

/// Two domains may be compared if they are the same domain, or if both are
/// numeric.
pub fn domains_comparable(a: &dyn ConstantDom, b: &dyn ConstantDom) -> bool {
    a.name() == b.name() || (a.safe_arith() && b.safe_arith())
}

/// An integer constant paired with its domain.
#[derive(Clone, Copy)]
pub struct Constant {
    bits: i128,
    dom: &'static dyn ConstantDom,
}

impl Constant {
    pub fn new(bits: impl Into<i128>, dom: &'static dyn ConstantDom) -> Self {
        Constant {
            bits: bits.into(),
            dom,
        }
    }

    pub fn value(&self) -> i128 {
        self.bits
    }

    pub fn dom(&self) -> &'static dyn ConstantDom {
        self.dom
    }

    /// The same bits reinterpreted in another domain.
    pub fn cast(&self, dom: &'static dyn ConstantDom) -> Constant {
        Constant {
            bits: self.bits,
            dom,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dom.show(self.bits, f, Brevity::Brief)
    }
}

impl fmt::Debug for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constant({self})")
    }
}

impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl Eq for Constant {}

impl PartialOrd for Constant {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Constant {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.bits.cmp(&other.bits)
    }
}

/// Checks that two constants live in comparable domains.
pub fn constants_comparable(a: &Constant, b: &Constant) -> bool {
    domains_comparable(a.dom(), b.dom())
}

/// Checks that arithmetic between two constants is meaningful: comparable
/// domains, and each domain either numeric or plain.
pub fn constants_arith(a: &Constant, b: &Constant) -> bool {
    constants_comparable(a, b) && a.dom().safe_arith() && b.dom().safe_arith()
}

/// Selects the result domain of an arithmetic operation: the non-plain
/// operand wins, the left one on a tie.
pub fn arith_result_dom(a: &Constant, b: &Constant) -> &'static dyn ConstantDom {
    if a.dom().plain() {
        b.dom()
    } else {
        a.dom()
    }
}

macro_rules! radix_dom {
    ($name:ident, $dom_name:literal, $fmt_pos:literal, $fmt_neg:literal) => {
        pub struct $name;

        impl ConstantDom for $name {
            fn show(&self, value: i128, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
                if value < 0 {
                    write!(w, $fmt_neg, value.unsigned_abs())
                } else {
                    write!(w, $fmt_pos, value)
                }
            }

            fn name(&self) -> &'static str {
                $dom_name
            }

            fn safe_arith(&self) -> bool {
                true
            }

            fn plain(&self) -> bool {
                true
            }
        }
    };
}

radix_dom!(DecDom, "dec", "{}", "-{}");
radix_dom!(HexDom, "hex", "0x{:x}", "-0x{:x}");
radix_dom!(OctDom, "oct", "0{:o}", "-0{:o}");
radix_dom!(BinDom, "bin", "0b{:b}", "-0b{:b}");

pub static DEC_DOM: DecDom = DecDom;
pub static HEX_DOM: HexDom = HexDom;
pub static OCT_DOM: OctDom = OctDom;
pub static BIN_DOM: BinDom = BinDom;

/// The domain of `true` and `false`.
pub struct BoolDom;

impl ConstantDom for BoolDom {
    fn show(&self, value: i128, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
        w.write_str(if value != 0 { "true" } else { "false" })
    }

    fn name(&self) -> &'static str {
        "bool"
    }
}

pub static BOOL_DOM: BoolDom = BoolDom;

static TYPE_NAMES: Lazy<RwLock<BTreeMap<u8, &'static str>>> =
    Lazy::new(|| RwLock::new(BTreeMap::new()));

/// Records a value type so that type constants can print its name. Called
/// when a vocabulary registers its type constants.
pub fn register_type_name(vt: ValueType) {
    TYPE_NAMES.write().unwrap().insert(vt.code(), vt.name());
}

/// The domain of value-type constants, as produced by the `type` word.
pub struct TypeDom;

impl ConstantDom for TypeDom {
    fn show(&self, value: i128, w: &mut dyn fmt::Write, _brv: Brevity) -> fmt::Result {
        match TYPE_NAMES.read().unwrap().get(&(value as u8)) {
            Some(name) => w.write_str(name),
            None => write!(w, "T_?{value}"),
        }
    }

    fn name(&self) -> &'static str {
        "type"
    }
}

pub static TYPE_DOM: TypeDom = TypeDom;

#[cfg(test)]
mod tests {
    use super::*;

    fn shown(cst: Constant) -> String {
        format!("{cst}")
    }

    #[test]
    fn radix_display() {
        assert_eq!(shown(Constant::new(23, &DEC_DOM)), "23");
        assert_eq!(shown(Constant::new(23, &HEX_DOM)), "0x17");
        assert_eq!(shown(Constant::new(23, &OCT_DOM)), "027");
        assert_eq!(shown(Constant::new(5, &BIN_DOM)), "0b101");
        assert_eq!(shown(Constant::new(-23, &HEX_DOM)), "-0x17");
    }

    #[test]
    fn bool_display() {
        assert_eq!(shown(Constant::new(0, &BOOL_DOM)), "false");
        assert_eq!(shown(Constant::new(1, &BOOL_DOM)), "true");
    }

    #[test]
    fn comparability() {
        let dec = Constant::new(1, &DEC_DOM);
        let hex = Constant::new(1, &HEX_DOM);
        let yes = Constant::new(1, &BOOL_DOM);

        // All numeric literal domains intermix.
        assert!(constants_comparable(&dec, &hex));
        assert!(constants_arith(&dec, &hex));

        // Enumeration-like domains only compare within themselves.
        assert!(!constants_comparable(&dec, &yes));
        assert!(constants_comparable(&yes, &yes));
        assert!(!constants_arith(&yes, &yes));
    }

    #[test]
    fn plain_absorption() {
        let dec = Constant::new(1, &DEC_DOM);
        let yes = Constant::new(1, &BOOL_DOM);
        assert_eq!(arith_result_dom(&dec, &yes).name(), "bool");
        assert_eq!(arith_result_dom(&yes, &dec).name(), "bool");
        assert_eq!(arith_result_dom(&dec, &dec).name(), "dec");
    }
}
