//! Logical functions
//!
//! Arguments arrive eagerly evaluated, so IF and IFERROR register with
//! error propagation off and decide themselves which argument's error is
//! allowed to surface.

use super::flattened;
use crate::context::EvalContext;
use crate::error::EngineResult;
use crate::value::Value;
use gridcalc_core::ErrorKind;

/// IF function: a missing third argument defaults to FALSE
pub fn fn_if(args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    let chosen = match args[0].to_bool() {
        Err(e) => return Ok(Value::Error(e)),
        Ok(true) => args[1].clone(),
        Ok(false) => args.get(2).cloned().unwrap_or(Value::Bool(false)),
    };
    Ok(chosen)
}

/// AND function
pub fn fn_and(args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    combine(args, |acc, b| acc && b)
}

/// OR function
pub fn fn_or(args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    combine(args, |acc, b| acc || b)
}

fn combine(args: &[Value], fold: fn(bool, bool) -> bool) -> EngineResult<Value> {
    let mut acc: Option<bool> = None;
    for (nested, v) in flattened(args) {
        match v {
            Value::Error(e) => return Ok(Value::Error(*e)),
            Value::Empty => {}
            // Text inside ranges is ignored; a literal that won't coerce
            // is a #VALUE!
            Value::Text(_) if nested => {}
            other => match other.to_bool() {
                Ok(b) => acc = Some(fold(acc.unwrap_or(b), b)),
                Err(e) => return Ok(Value::Error(e)),
            },
        }
    }
    match acc {
        Some(b) => Ok(Value::Bool(b)),
        None => Ok(Value::Error(ErrorKind::Value)),
    }
}

/// NOT function
pub fn fn_not(args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    match args[0].to_bool() {
        Ok(b) => Ok(Value::Bool(!b)),
        Err(e) => Ok(Value::Error(e)),
    }
}

/// IFERROR function
pub fn fn_iferror(args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    if args[0].is_error() {
        Ok(args[1].clone())
    } else {
        Ok(args[0].clone())
    }
}

/// TRUE function
pub fn fn_true(_args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    Ok(Value::Bool(true))
}

/// FALSE function
pub fn fn_false(_args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    Ok(Value::Bool(false))
}
