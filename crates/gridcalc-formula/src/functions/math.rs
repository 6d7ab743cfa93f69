//! Math and aggregation functions

use super::flattened;
use crate::context::EvalContext;
use crate::error::EngineResult;
use crate::value::Value;
use gridcalc_core::ErrorKind;

/// SUM function
pub fn fn_sum(args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    let mut sum = 0.0;
    for (nested, v) in flattened(args) {
        match v {
            Value::Number(n) => sum += n,
            Value::Error(e) => return Ok(Value::Error(*e)),
            Value::Empty => {}
            // Text and booleans inside ranges don't count
            _ if nested => {}
            other => match other.to_number() {
                Ok(n) => sum += n,
                Err(e) => return Ok(Value::Error(e)),
            },
        }
    }
    Ok(Value::Number(sum))
}

/// PRODUCT function
///
/// Blank cells and non-numeric text in ranges are skipped; with nothing
/// numeric at all the result is 0.
pub fn fn_product(args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    let mut product: Option<f64> = None;
    for (nested, v) in flattened(args) {
        match v {
            Value::Number(n) => product = Some(product.unwrap_or(1.0) * n),
            Value::Error(e) => return Ok(Value::Error(*e)),
            Value::Empty => {}
            _ if nested => {}
            other => match other.to_number() {
                Ok(n) => product = Some(product.unwrap_or(1.0) * n),
                Err(e) => return Ok(Value::Error(e)),
            },
        }
    }
    Ok(Value::Number(product.unwrap_or(0.0)))
}

/// AVERAGE function
pub fn fn_average(args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    let mut sum = 0.0;
    let mut count = 0u64;
    for (nested, v) in flattened(args) {
        match v {
            Value::Number(n) => {
                sum += n;
                count += 1;
            }
            Value::Error(e) => return Ok(Value::Error(*e)),
            Value::Empty => {}
            _ if nested => {}
            other => match other.to_number() {
                Ok(n) => {
                    sum += n;
                    count += 1;
                }
                Err(e) => return Ok(Value::Error(e)),
            },
        }
    }
    if count == 0 {
        Ok(Value::Error(ErrorKind::Div0))
    } else {
        Ok(Value::Number(sum / count as f64))
    }
}

/// MIN function
pub fn fn_min(args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    fold_extremum(args, f64::min)
}

/// MAX function
pub fn fn_max(args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    fold_extremum(args, f64::max)
}

fn fold_extremum(args: &[Value], pick: fn(f64, f64) -> f64) -> EngineResult<Value> {
    let mut best: Option<f64> = None;
    for (nested, v) in flattened(args) {
        match v {
            Value::Number(n) => best = Some(best.map_or(*n, |b| pick(b, *n))),
            Value::Error(e) => return Ok(Value::Error(*e)),
            Value::Empty => {}
            _ if nested => {}
            other => match other.to_number() {
                Ok(n) => best = Some(best.map_or(n, |b| pick(b, n))),
                Err(e) => return Ok(Value::Error(e)),
            },
        }
    }
    Ok(Value::Number(best.unwrap_or(0.0)))
}

/// COUNT function: numeric values only, errors count for nothing
pub fn fn_count(args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    let mut count = 0u64;
    for (nested, v) in flattened(args) {
        match v {
            Value::Number(_) => count += 1,
            Value::Empty | Value::Error(_) => {}
            _ if nested => {}
            // Literal booleans and numeric text count
            other => {
                if other.to_number().is_ok() {
                    count += 1;
                }
            }
        }
    }
    Ok(Value::Number(count as f64))
}

/// COUNTA function: anything non-empty counts, errors included
pub fn fn_counta(args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    let count = flattened(args)
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .count();
    Ok(Value::Number(count as f64))
}

/// ABS function
pub fn fn_abs(args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    match args[0].to_number() {
        Ok(n) => Ok(Value::Number(n.abs())),
        Err(e) => Ok(Value::Error(e)),
    }
}
