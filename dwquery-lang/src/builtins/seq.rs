//! Sequence overloads.

use std::rc::Rc;

use crate::builtin::Builtin;
use crate::cst::{Constant, DEC_DOM};
use crate::op::VecValueProducer;
use crate::overload::{
    once_overload_1, once_overload_2, pred_overload_1, pred_overload_2, yielding_overload_1,
    Selector,
};
use crate::pred::PredResult;
use crate::value::{CmpResult, CstValue, SeqValue, Value};

pub fn add_seq_overload() -> (Selector, Rc<dyn Builtin>) {
    once_overload_2::<SeqValue, SeqValue, _>(|a, b| {
        let mut elements: Vec<Box<dyn Value>> = a.elements().to_vec();
        elements.extend(b.elements().iter().cloned());
        Ok(Some(Box::new(SeqValue::new(elements, 0)) as Box<dyn Value>))
    })
}

pub fn length_seq_overload() -> (Selector, Rc<dyn Builtin>) {
    once_overload_1::<SeqValue, _>(|a| {
        let cst = Constant::new(a.elements().len() as i128, &DEC_DOM);
        Ok(Some(Box::new(CstValue::new(cst, 0)) as Box<dyn Value>))
    })
}

pub fn elem_seq_overload() -> (Selector, Rc<dyn Builtin>) {
    yielding_overload_1::<SeqValue, _>(|a| {
        Ok(Box::new(VecValueProducer::new(a.elements().to_vec())) as _)
    })
}

pub fn relem_seq_overload() -> (Selector, Rc<dyn Builtin>) {
    yielding_overload_1::<SeqValue, _>(|a| {
        let mut elements = a.elements().to_vec();
        elements.reverse();
        Ok(Box::new(VecValueProducer::new(elements)) as _)
    })
}

pub fn empty_seq_overload() -> (Selector, Rc<dyn Builtin>) {
    pred_overload_1::<SeqValue, _>(|a| Ok(PredResult::from(a.elements().is_empty())))
}

fn values_equal(a: &dyn Value, b: &dyn Value) -> bool {
    a.vtype() == b.vtype() && a.cmp_value(b) == CmpResult::Equal
}

/// `seq sub ?find` — contiguous subsequence search.
pub fn find_seq_overload() -> (Selector, Rc<dyn Builtin>) {
    pred_overload_2::<SeqValue, SeqValue, _>(|a, b| {
        let hay = a.elements();
        let needle = b.elements();

        if needle.is_empty() {
            return Ok(PredResult::Yes);
        }
        if needle.len() > hay.len() {
            return Ok(PredResult::No);
        }

        let found = (0..=hay.len() - needle.len()).any(|i| {
            needle
                .iter()
                .enumerate()
                .all(|(j, n)| values_equal(hay[i + j].as_ref(), n.as_ref()))
        });
        Ok(PredResult::from(found))
    })
}
