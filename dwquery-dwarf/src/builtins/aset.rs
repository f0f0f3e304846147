//! Address set words.

use std::rc::Rc;

use dwquery_lang::builtin::Builtin;
use dwquery_lang::cst::{Constant, DEC_DOM};
use dwquery_lang::op::{ValueProducer, VecValueProducer};
use dwquery_lang::overload::{
    once_overload_1, once_overload_2, pred_overload_1, pred_overload_2, yielding_overload_1,
    Selector,
};
use dwquery_lang::pred::PredResult;
use dwquery_lang::value::{CstValue, Value};

use crate::coverage::Coverage;
use crate::cst::ADDRESS_DOM;
use crate::value::AsetValue;

type Overload = (Selector, Rc<dyn Builtin>);

fn produce(items: Vec<Box<dyn Value>>) -> Box<dyn ValueProducer> {
    Box::new(VecValueProducer::new(items))
}

fn aset(cov: Coverage) -> Box<dyn Value> {
    Box::new(AsetValue::new(cov, 0))
}

/// `aset` — constructs a set from two addresses.
pub fn aset_overloads() -> Vec<Overload> {
    vec![once_overload_2::<CstValue, CstValue, _>(|a, b| {
        let begin = a.constant().value() as u64;
        let end = b.constant().value() as u64;
        Ok(Some(aset(Coverage::of(begin, end))))
    })]
}

pub fn add_overloads() -> Vec<Overload> {
    vec![
        once_overload_2::<AsetValue, CstValue, _>(|a, b| {
            let mut cov = a.coverage().clone();
            let addr = b.constant().value() as u64;
            cov.add(addr, addr + 1);
            Ok(Some(aset(cov)))
        }),
        once_overload_2::<AsetValue, AsetValue, _>(|a, b| {
            let mut cov = a.coverage().clone();
            cov.add_all(b.coverage());
            Ok(Some(aset(cov)))
        }),
    ]
}

pub fn sub_overloads() -> Vec<Overload> {
    vec![
        once_overload_2::<AsetValue, CstValue, _>(|a, b| {
            let mut cov = a.coverage().clone();
            let addr = b.constant().value() as u64;
            cov.remove(addr, addr + 1);
            Ok(Some(aset(cov)))
        }),
        once_overload_2::<AsetValue, AsetValue, _>(|a, b| {
            let mut cov = a.coverage().clone();
            cov.remove_all(b.coverage());
            Ok(Some(aset(cov)))
        }),
    ]
}

pub fn length_overloads() -> Vec<Overload> {
    vec![once_overload_1::<AsetValue, _>(|a| {
        Ok(Some(Box::new(CstValue::new(
            Constant::new(a.coverage().length() as i128, &DEC_DOM),
            0,
        )) as Box<dyn Value>))
    })]
}

/// `elem` over a set yields every covered address in ascending order;
/// `relem` in descending order.
pub fn elem_overloads() -> Vec<Overload> {
    vec![yielding_overload_1::<AsetValue, _>(|a| {
        let addrs: Vec<Box<dyn Value>> = a
            .coverage()
            .ranges()
            .flat_map(|(b, e)| (b..e))
            .map(|addr| {
                Box::new(CstValue::new(Constant::new(addr, &ADDRESS_DOM), 0)) as Box<dyn Value>
            })
            .collect();
        Ok(produce(addrs))
    })]
}

pub fn relem_overloads() -> Vec<Overload> {
    vec![yielding_overload_1::<AsetValue, _>(|a| {
        let mut addrs: Vec<Box<dyn Value>> = a
            .coverage()
            .ranges()
            .flat_map(|(b, e)| (b..e))
            .map(|addr| {
                Box::new(CstValue::new(Constant::new(addr, &ADDRESS_DOM), 0)) as Box<dyn Value>
            })
            .collect();
        addrs.reverse();
        Ok(produce(addrs))
    })]
}

pub fn empty_pred_overloads() -> Vec<Overload> {
    vec![pred_overload_1::<AsetValue, _>(|a| {
        Ok(PredResult::from(a.coverage().is_empty()))
    })]
}

pub fn contains_pred_overloads() -> Vec<Overload> {
    vec![
        pred_overload_2::<AsetValue, CstValue, _>(|a, b| {
            Ok(PredResult::from(
                a.coverage().contains_point(b.constant().value() as u64),
            ))
        }),
        pred_overload_2::<AsetValue, AsetValue, _>(|a, b| {
            Ok(PredResult::from(a.coverage().contains_all(b.coverage())))
        }),
    ]
}

pub fn overlaps_pred_overloads() -> Vec<Overload> {
    vec![pred_overload_2::<AsetValue, AsetValue, _>(|a, b| {
        Ok(PredResult::from(a.coverage().overlaps(b.coverage())))
    })]
}

/// `overlap` — the intersection of two sets.
pub fn overlap_overloads() -> Vec<Overload> {
    vec![once_overload_2::<AsetValue, AsetValue, _>(|a, b| {
        Ok(Some(aset(a.coverage().intersect(b.coverage()))))
    })]
}

/// `range` — each contiguous range as its own set.
pub fn range_overloads() -> Vec<Overload> {
    vec![yielding_overload_1::<AsetValue, _>(|a| {
        let ranges: Vec<Box<dyn Value>> = a
            .coverage()
            .ranges()
            .map(|(b, e)| aset(Coverage::of(b, e)))
            .collect();
        Ok(produce(ranges))
    })]
}

/// `low` / `high` — the boundary addresses, when the set is not empty.
pub fn low_overloads() -> Vec<Overload> {
    vec![yielding_overload_1::<AsetValue, _>(|a| {
        let out: Vec<Box<dyn Value>> = a
            .coverage()
            .low()
            .map(|addr| {
                Box::new(CstValue::new(Constant::new(addr, &ADDRESS_DOM), 0)) as Box<dyn Value>
            })
            .into_iter()
            .collect();
        Ok(produce(out))
    })]
}

pub fn high_overloads() -> Vec<Overload> {
    vec![yielding_overload_1::<AsetValue, _>(|a| {
        let out: Vec<Box<dyn Value>> = a
            .coverage()
            .high()
            .map(|addr| {
                Box::new(CstValue::new(Constant::new(addr, &ADDRESS_DOM), 0)) as Box<dyn Value>
            })
            .into_iter()
            .collect();
        Ok(produce(out))
    })]
}
