//! Type-inspection functions

use crate::context::EvalContext;
use crate::error::EngineResult;
use crate::value::Value;
use gridcalc_core::ErrorKind;

/// ISEVEN function: truncate toward zero, then test parity
pub fn fn_iseven(args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    Ok(parity(&args[0], 0))
}

/// ISODD function
pub fn fn_isodd(args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    Ok(parity(&args[0], 1))
}

fn parity(v: &Value, remainder: i64) -> Value {
    match v.to_number() {
        Ok(n) => Value::Bool((n.trunc() as i64 % 2).abs() == remainder),
        Err(e) => Value::Error(e),
    }
}

/// ISBLANK function
pub fn fn_isblank(args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    Ok(Value::Bool(args[0].is_empty()))
}

/// ISNUMBER function: no coercion, a numeric string is still text
pub fn fn_isnumber(args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    Ok(Value::Bool(matches!(args[0], Value::Number(_))))
}

/// ISTEXT function
pub fn fn_istext(args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    Ok(Value::Bool(matches!(args[0], Value::Text(_))))
}

/// ISERROR function
pub fn fn_iserror(args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    Ok(Value::Bool(args[0].is_error()))
}

/// NA function
pub fn fn_na(_args: &[Value], _ctx: &EvalContext) -> EngineResult<Value> {
    Ok(Value::Error(ErrorKind::Na))
}
