//! Postfix program execution
//!
//! A straight stack machine over [`Instr`] code. Spreadsheet error codes
//! are pushed as values and flow through operators; an `Err` from this
//! module always means an engine fault (bad bytecode, runaway recursion),
//! never a user-visible formula error.

use crate::context::EvalContext;
use crate::error::{EngineError, EngineResult};
use crate::functions;
use crate::program::{BinaryOp, Instr, ParsedFormula, UnaryOp};
use crate::resolver;
use crate::value::{compare_values, Array, Value};
use gridcalc_core::ErrorKind;
use std::cmp::Ordering;

/// Evaluate a compiled formula in the given context
pub fn run(program: &ParsedFormula, ctx: &EvalContext) -> EngineResult<Value> {
    ctx.enter_eval()?;
    let result = exec(program, ctx);
    ctx.leave_eval();
    result
}

fn exec(program: &ParsedFormula, ctx: &EvalContext) -> EngineResult<Value> {
    let mut stack: Vec<Value> = Vec::new();
    for instr in program.code() {
        match instr {
            Instr::PushNumber(n) => stack.push(Value::Number(*n)),
            Instr::PushText(s) => stack.push(Value::Text(s.clone())),
            Instr::PushBool(b) => stack.push(Value::Bool(*b)),
            Instr::PushError(e) => stack.push(Value::Error(*e)),
            Instr::PushEmpty => stack.push(Value::Empty),
            Instr::PushCell(r) => stack.push(resolver::resolve_cell(ctx, r)?),
            Instr::PushRange(r) => stack.push(resolver::resolve_range(ctx, r)?),
            Instr::PushName(name) => stack.push(resolver::resolve_name(ctx, name)?),
            Instr::BuildArray { rows, cols } => {
                let count = rows * cols;
                if stack.len() < count {
                    return Err(stack_fault());
                }
                let data = stack.split_off(stack.len() - count);
                // A nested evaluation that produced an array inside an
                // array literal has no scalar slot to fill
                if data.iter().any(|v| matches!(v, Value::Array(_))) {
                    stack.push(Value::Error(ErrorKind::Value));
                } else {
                    match Array::new(*rows, *cols, data) {
                        Some(arr) => stack.push(Value::Array(arr)),
                        None => return Err(stack_fault()),
                    }
                }
            }
            Instr::Unary(op) => {
                let v = stack.pop().ok_or_else(stack_fault)?;
                stack.push(apply_unary(*op, &v));
            }
            Instr::Binary(op) => {
                let right = stack.pop().ok_or_else(stack_fault)?;
                let left = stack.pop().ok_or_else(stack_fault)?;
                stack.push(apply_binary(*op, &left, &right)?);
            }
            Instr::Call { name, argc } => {
                if stack.len() < *argc {
                    return Err(stack_fault());
                }
                let args = stack.split_off(stack.len() - argc);
                stack.push(functions::dispatch(name, &args, ctx)?);
            }
        }
    }
    if stack.len() == 1 {
        stack.pop().ok_or_else(stack_fault)
    } else {
        Err(stack_fault())
    }
}

fn stack_fault() -> EngineError {
    EngineError::Internal("operand stack out of balance".to_string())
}

fn apply_unary(op: UnaryOp, v: &Value) -> Value {
    if let Value::Array(arr) = v {
        return Value::Array(arr.map(|elem| apply_unary(op, elem)));
    }
    match v.to_number() {
        Err(e) => Value::Error(e),
        Ok(n) => match op {
            UnaryOp::Neg => Value::Number(-n),
            UnaryOp::Percent => Value::Number(n / 100.0),
        },
    }
}

fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> EngineResult<Value> {
    if matches!(left, Value::Array(_)) || matches!(right, Value::Array(_)) {
        return broadcast(op, left, right);
    }
    Ok(apply_binary_scalar(op, left, right))
}

/// Element-wise application over arrays; length-1 axes broadcast, and
/// positions outside a smaller operand read as `#N/A`
fn broadcast(op: BinaryOp, left: &Value, right: &Value) -> EngineResult<Value> {
    fn shape(v: &Value) -> (usize, usize) {
        match v {
            Value::Array(a) => (a.rows(), a.cols()),
            _ => (1, 1),
        }
    }
    fn elem<'v>(v: &'v Value, row: usize, col: usize) -> &'v Value {
        static NA: Value = Value::Error(ErrorKind::Na);
        match v {
            Value::Array(a) => {
                let r = if a.rows() == 1 { 0 } else { row };
                let c = if a.cols() == 1 { 0 } else { col };
                if r < a.rows() && c < a.cols() {
                    a.get(r, c)
                } else {
                    &NA
                }
            }
            scalar => scalar,
        }
    }

    let (lr, lc) = shape(left);
    let (rr, rc) = shape(right);
    let rows = lr.max(rr);
    let cols = lc.max(rc);
    let mut data = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            data.push(apply_binary_scalar(
                op,
                elem(left, row, col),
                elem(right, row, col),
            ));
        }
    }
    Array::new(rows, cols, data)
        .map(Value::Array)
        .ok_or_else(|| EngineError::Internal("broadcast shape mismatch".to_string()))
}

fn apply_binary_scalar(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            // Left operand's error wins when both are errors
            if let Some(e) = left.as_error() {
                return Value::Error(e);
            }
            if let Some(e) = right.as_error() {
                return Value::Error(e);
            }
            let ord = compare_values(left, right);
            let result = match op {
                BinaryOp::Eq => ord == Ordering::Equal,
                BinaryOp::Ne => ord != Ordering::Equal,
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::Le => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                BinaryOp::Ge => ord != Ordering::Less,
                _ => unreachable!("non-comparison op in comparison arm"),
            };
            Value::Bool(result)
        }
        BinaryOp::Concat => match (left.to_text(), right.to_text()) {
            (Ok(a), Ok(b)) => Value::Text(a + &b),
            (Err(e), _) => Value::Error(e),
            (_, Err(e)) => Value::Error(e),
        },
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Pow => {
            let a = match left.to_number() {
                Ok(a) => a,
                Err(e) => return Value::Error(e),
            };
            let b = match right.to_number() {
                Ok(b) => b,
                Err(e) => return Value::Error(e),
            };
            let n = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => {
                    if b == 0.0 {
                        return Value::Error(ErrorKind::Div0);
                    }
                    a / b
                }
                BinaryOp::Pow => {
                    if a == 0.0 && b == 0.0 {
                        return Value::Error(ErrorKind::Num);
                    }
                    a.powf(b)
                }
                _ => unreachable!("non-arithmetic op in arithmetic arm"),
            };
            if n.is_finite() {
                Value::Number(n)
            } else {
                Value::Error(ErrorKind::Num)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::context::CellId;
    use gridcalc_core::{CellAddress, Workbook};
    use pretty_assertions::assert_eq;

    fn eval(text: &str) -> Value {
        let engine = Engine::new();
        let wb = Workbook::new();
        engine
            .evaluate(text, &wb, CellId::new("Sheet1", 0, 0))
            .unwrap()
    }

    // Origin far from the cells the tests write, so it never joins a cycle
    fn eval_in(wb: &Workbook, text: &str) -> Value {
        Engine::new()
            .evaluate(text, wb, CellId::new("Sheet1", 99, 9))
            .unwrap()
    }

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(eval("1+2*3"), Value::Number(7.0));
        assert_eq!(eval("(1+2)*3"), Value::Number(9.0));
        assert_eq!(eval("2^3^2"), Value::Number(512.0));
        assert_eq!(eval("-2^2"), Value::Number(4.0));
        assert_eq!(eval("50%*2"), Value::Number(1.0));
    }

    #[test]
    fn text_coercion_in_arithmetic() {
        assert_eq!(eval("\"3\"+4"), Value::Number(7.0));
        assert_eq!(eval("\"abc\"+1"), Value::Error(ErrorKind::Value));
        assert_eq!(eval("TRUE+TRUE"), Value::Number(2.0));
    }

    #[test]
    fn concat_coerces_to_text() {
        assert_eq!(eval("\"v=\"&1.5"), Value::Text("v=1.5".to_string()));
        assert_eq!(eval("1&2"), Value::Text("12".to_string()));
        assert_eq!(eval("\"is \"&TRUE"), Value::Text("is TRUE".to_string()));
    }

    #[test]
    fn division_and_power_edge_cases() {
        assert_eq!(eval("1/0"), Value::Error(ErrorKind::Div0));
        assert_eq!(eval("0^0"), Value::Error(ErrorKind::Num));
        assert_eq!(eval("0^-1"), Value::Error(ErrorKind::Num));
        assert_eq!(eval("1e308*10"), Value::Error(ErrorKind::Num));
    }

    #[test]
    fn left_error_wins() {
        assert_eq!(eval("#REF!+#NUM!"), Value::Error(ErrorKind::Ref));
        assert_eq!(eval("#NUM!=#REF!"), Value::Error(ErrorKind::Num));
        assert_eq!(eval("1+#NAME?"), Value::Error(ErrorKind::Name));
    }

    #[test]
    fn comparisons_use_cross_type_order() {
        assert_eq!(eval("1<2"), Value::Bool(true));
        assert_eq!(eval("\"a\"=\"A\""), Value::Bool(true));
        assert_eq!(eval("99999>\"text\""), Value::Bool(false));
        assert_eq!(eval("TRUE>\"zzz\""), Value::Bool(true));
        assert_eq!(eval("\"\"=0"), Value::Bool(false));
    }

    #[test]
    fn array_broadcasting() {
        assert_eq!(
            eval("{1,2,3}*2"),
            Value::Array(
                Array::from_rows(vec![vec![
                    Value::Number(2.0),
                    Value::Number(4.0),
                    Value::Number(6.0),
                ]])
                .unwrap()
            )
        );
        assert_eq!(
            eval("{1,2}+{10;20}"),
            Value::Array(
                Array::from_rows(vec![
                    vec![Value::Number(11.0), Value::Number(12.0)],
                    vec![Value::Number(21.0), Value::Number(22.0)],
                ])
                .unwrap()
            )
        );
    }

    #[test]
    fn mismatched_shapes_pad_with_na() {
        assert_eq!(
            eval("{1,2,3}+{10,20}"),
            Value::Array(
                Array::from_rows(vec![vec![
                    Value::Number(11.0),
                    Value::Number(22.0),
                    Value::Error(ErrorKind::Na),
                ]])
                .unwrap()
            )
        );
    }

    #[test]
    fn unary_ops_map_over_arrays() {
        assert_eq!(
            eval("-{1,2}"),
            Value::Array(
                Array::from_rows(vec![vec![Value::Number(-1.0), Value::Number(-2.0)]])
                    .unwrap()
            )
        );
    }

    #[test]
    fn cell_and_range_references() {
        let mut wb = Workbook::new();
        let sheet = wb.sheet_mut("Sheet1").unwrap();
        sheet.set_value(addr("A1"), 10.0).unwrap();
        sheet.set_value(addr("A2"), 20.0).unwrap();
        sheet.set_formula(addr("B1"), "A1+A2").unwrap();

        assert_eq!(eval_in(&wb, "A1*2"), Value::Number(20.0));
        assert_eq!(eval_in(&wb, "B1+1"), Value::Number(31.0));
        assert_eq!(eval_in(&wb, "SUM(A1:A2)"), Value::Number(30.0));
        assert_eq!(eval_in(&wb, "C7"), Value::Empty);
        assert_eq!(eval_in(&wb, "Missing!A1"), Value::Error(ErrorKind::Ref));
    }

    #[test]
    fn three_d_ranges_stack_sheets() {
        let mut wb = Workbook::new();
        wb.add_worksheet("S2").unwrap();
        wb.add_worksheet("S3").unwrap();
        wb.sheet_mut("Sheet1")
            .unwrap()
            .set_value(addr("A1"), 1.0)
            .unwrap();
        wb.sheet_mut("S2").unwrap().set_value(addr("A1"), 2.0).unwrap();
        wb.sheet_mut("S3").unwrap().set_value(addr("A1"), 4.0).unwrap();

        assert_eq!(eval_in(&wb, "SUM(Sheet1:S3!A1)"), Value::Number(7.0));
        assert_eq!(
            eval_in(&wb, "SUM(Sheet1:Nope!A1)"),
            Value::Error(ErrorKind::Ref)
        );
    }

    #[test]
    fn circular_references_yield_calc_error() {
        let mut wb = Workbook::new();
        let sheet = wb.sheet_mut("Sheet1").unwrap();
        sheet.set_formula(addr("A1"), "B1+1").unwrap();
        sheet.set_formula(addr("B1"), "A1+1").unwrap();

        assert_eq!(eval_in(&wb, "A1"), Value::Error(ErrorKind::Calc));
        assert_eq!(eval_in(&wb, "B1"), Value::Error(ErrorKind::Calc));
    }

    #[test]
    fn self_reference_is_circular() {
        let mut wb = Workbook::new();
        wb.sheet_mut("Sheet1")
            .unwrap()
            .set_formula(addr("A1"), "A1")
            .unwrap();
        let engine = Engine::new();
        let result = engine
            .evaluate("A1", &wb, CellId::new("Sheet1", 0, 0))
            .unwrap();
        assert_eq!(result, Value::Error(ErrorKind::Calc));
    }

    #[test]
    fn sibling_branches_may_reuse_a_cell() {
        let mut wb = Workbook::new();
        let sheet = wb.sheet_mut("Sheet1").unwrap();
        sheet.set_formula(addr("A1"), "2*2").unwrap();
        assert_eq!(eval_in(&wb, "A1+A1"), Value::Number(8.0));
    }

    #[test]
    fn deep_nesting_hits_recursion_limit() {
        let mut wb = Workbook::new();
        let sheet = wb.sheet_mut("Sheet1").unwrap();
        // A1 = A2+1, A2 = A3+1, ... a chain longer than the depth cap
        for row in 0..400u32 {
            sheet
                .set_formula(
                    CellAddress::new(row, 0),
                    format!("A{}+1", row + 2),
                )
                .unwrap();
        }
        let engine = Engine::new();
        let err = engine
            .evaluate("A1", &wb, CellId::new("Sheet1", 500, 5))
            .unwrap_err();
        assert_eq!(err, EngineError::RecursionLimit);
    }

    #[test]
    fn named_ranges_resolve_through_their_target() {
        let mut wb = Workbook::new();
        wb.define_name("Rate", "Sheet1!B1").unwrap();
        wb.sheet_mut("Sheet1")
            .unwrap()
            .set_value(addr("B1"), 0.2)
            .unwrap();
        assert_eq!(eval_in(&wb, "Rate*100"), Value::Number(20.0));
        assert_eq!(eval_in(&wb, "Unknown*2"), Value::Error(ErrorKind::Name));
    }

    #[test]
    fn empty_cell_vs_empty_string() {
        let mut wb = Workbook::new();
        wb.sheet_mut("Sheet1")
            .unwrap()
            .set_value(addr("B2"), "")
            .unwrap();
        // Unset cell concatenates as "" and adds as 0
        assert_eq!(eval_in(&wb, "A9&\"x\""), Value::Text("x".to_string()));
        assert_eq!(eval_in(&wb, "A9+1"), Value::Number(1.0));
        assert_eq!(eval_in(&wb, "B2+1"), Value::Number(1.0));
    }
}
