//! String overloads: concatenation, length, element iteration, emptiness,
//! substring search, and regex matching.

use std::rc::Rc;

use regex::Regex;

use crate::builtin::Builtin;
use crate::cst::{Constant, DEC_DOM};
use crate::op::VecValueProducer;
use crate::overload::{
    once_overload_1, once_overload_2, pred_overload_1, pred_overload_2, yielding_overload_1,
    Selector,
};
use crate::pred::PredResult;
use crate::value::{CstValue, StrValue, Value};

pub fn add_str_overload() -> (Selector, Rc<dyn Builtin>) {
    once_overload_2::<StrValue, StrValue, _>(|a, b| {
        let mut s = a.string().to_string();
        s.push_str(b.string());
        Ok(Some(Box::new(StrValue::new(s, 0)) as Box<dyn Value>))
    })
}

pub fn length_str_overload() -> (Selector, Rc<dyn Builtin>) {
    once_overload_1::<StrValue, _>(|a| {
        let cst = Constant::new(a.string().len() as i128, &DEC_DOM);
        Ok(Some(Box::new(CstValue::new(cst, 0)) as Box<dyn Value>))
    })
}

pub fn elem_str_overload() -> (Selector, Rc<dyn Builtin>) {
    yielding_overload_1::<StrValue, _>(|a| {
        let chars: Vec<Box<dyn Value>> = a
            .string()
            .chars()
            .map(|c| Box::new(StrValue::new(c.to_string(), 0)) as Box<dyn Value>)
            .collect();
        Ok(Box::new(VecValueProducer::new(chars)) as _)
    })
}

pub fn relem_str_overload() -> (Selector, Rc<dyn Builtin>) {
    yielding_overload_1::<StrValue, _>(|a| {
        let chars: Vec<Box<dyn Value>> = a
            .string()
            .chars()
            .rev()
            .map(|c| Box::new(StrValue::new(c.to_string(), 0)) as Box<dyn Value>)
            .collect();
        Ok(Box::new(VecValueProducer::new(chars)) as _)
    })
}

pub fn empty_str_overload() -> (Selector, Rc<dyn Builtin>) {
    pred_overload_1::<StrValue, _>(|a| Ok(PredResult::from(a.string().is_empty())))
}

/// `haystack needle ?find` — substring search.
pub fn find_str_overload() -> (Selector, Rc<dyn Builtin>) {
    pred_overload_2::<StrValue, StrValue, _>(|a, b| {
        Ok(PredResult::from(a.string().contains(b.string())))
    })
}

/// `string pattern ?match` — the pattern must match the entire string.
pub fn match_str_overload() -> (Selector, Rc<dyn Builtin>) {
    pred_overload_2::<StrValue, StrValue, _>(|a, b| {
        match Regex::new(&format!("^(?:{})$", b.string())) {
            Ok(re) => Ok(PredResult::from(re.is_match(a.string()))),
            Err(err) => {
                eprintln!("Error: `match': invalid regular expression: {err}");
                Ok(PredResult::Fail)
            }
        }
    })
}
