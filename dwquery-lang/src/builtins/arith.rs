//! Arithmetic overloads over constants. The words themselves are
//! overloaded, so other vocabularies can extend them to their own types
//! (strings and sequences concatenate under `add`, address sets form
//! unions and differences).

use std::rc::Rc;

use crate::builtin::Builtin;
use crate::cst::{arith_result_dom, constants_arith, Constant};
use crate::overload::{once_overload_2, Selector};
use crate::value::{CstValue, Value};

type ArithFn = fn(i128, i128) -> Result<i128, String>;

fn arith_overload(word: &'static str, apply: ArithFn) -> (Selector, Rc<dyn Builtin>) {
    once_overload_2::<CstValue, CstValue, _>(move |a, b| {
        let (a, b) = (a.constant(), b.constant());
        if !constants_arith(a, b) {
            eprintln!("Error: `{word}': operands are not comparable.");
            return Ok(None);
        }

        let dom = arith_result_dom(a, b);
        match apply(a.value(), b.value()) {
            Ok(v) => Ok(Some(
                Box::new(CstValue::new(Constant::new(v, dom), 0)) as Box<dyn Value>
            )),
            Err(msg) => {
                eprintln!("{msg}");
                Ok(None)
            }
        }
    })
}

fn do_add(a: i128, b: i128) -> Result<i128, String> {
    a.checked_add(b)
        .ok_or_else(|| "Error: `add': arithmetic overflow.".to_string())
}

fn do_sub(a: i128, b: i128) -> Result<i128, String> {
    a.checked_sub(b)
        .ok_or_else(|| "Error: `sub': arithmetic overflow.".to_string())
}

fn do_mul(a: i128, b: i128) -> Result<i128, String> {
    a.checked_mul(b)
        .ok_or_else(|| "Error: `mul': arithmetic overflow.".to_string())
}

fn do_div(a: i128, b: i128) -> Result<i128, String> {
    if b == 0 {
        return Err("Error: `div': division by zero.".to_string());
    }
    a.checked_div(b)
        .ok_or_else(|| "Error: `div': arithmetic overflow.".to_string())
}

fn do_mod(a: i128, b: i128) -> Result<i128, String> {
    if b == 0 {
        return Err("Error: `mod': division by zero.".to_string());
    }
    a.checked_rem(b)
        .ok_or_else(|| "Error: `mod': arithmetic overflow.".to_string())
}

pub fn add_cst_overload() -> (Selector, Rc<dyn Builtin>) {
    arith_overload("add", do_add)
}

pub fn sub_cst_overload() -> (Selector, Rc<dyn Builtin>) {
    arith_overload("sub", do_sub)
}

pub fn mul_cst_overload() -> (Selector, Rc<dyn Builtin>) {
    arith_overload("mul", do_mul)
}

pub fn div_cst_overload() -> (Selector, Rc<dyn Builtin>) {
    arith_overload("div", do_div)
}

pub fn mod_cst_overload() -> (Selector, Rc<dyn Builtin>) {
    arith_overload("mod", do_mod)
}
