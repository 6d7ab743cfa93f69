//! Engine facade
//!
//! Owns the dialect and a parse cache keyed by formula text. Compiled
//! programs are immutable, so a cache hit hands out the same `Rc` and
//! re-evaluation never re-parses. The engine is single-threaded;
//! concurrent recalculation uses one engine per worker over shared sheet
//! data.

use crate::context::{CellId, EvalContext};
use crate::error::EngineResult;
use crate::evaluator;
use crate::parser::{self, Dialect};
use crate::program::ParsedFormula;
use crate::resolver::SheetAccess;
use crate::value::Value;
use ahash::AHashMap;
use log::{debug, trace};
use std::cell::RefCell;
use std::rc::Rc;

/// Formula compilation and evaluation entry point
pub struct Engine {
    dialect: Dialect,
    cache: RefCell<AHashMap<String, Rc<ParsedFormula>>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_dialect(Dialect::default())
    }

    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            cache: RefCell::new(AHashMap::new()),
        }
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Compile formula text (without a leading `=`), reusing a cached
    /// program when the same text was parsed before
    pub fn parse(&self, text: &str) -> EngineResult<Rc<ParsedFormula>> {
        if let Some(hit) = self.cache.borrow().get(text) {
            trace!("parse cache hit for {text:?}");
            return Ok(Rc::clone(hit));
        }
        let program = Rc::new(parser::parse(text, &self.dialect)?);
        debug!(
            "compiled {text:?} to {} instructions",
            program.code().len()
        );
        self.cache
            .borrow_mut()
            .insert(text.to_string(), Rc::clone(&program));
        Ok(program)
    }

    /// Parse and evaluate formula text against sheet data
    ///
    /// `origin` is the cell the formula notionally lives in: unqualified
    /// references resolve against its sheet and it seeds cycle detection.
    pub fn evaluate(
        &self,
        text: &str,
        sheets: &dyn SheetAccess,
        origin: CellId,
    ) -> EngineResult<Value> {
        let program = self.parse(text)?;
        self.evaluate_parsed(&program, sheets, origin)
    }

    /// Evaluate an already compiled program
    pub fn evaluate_parsed(
        &self,
        program: &ParsedFormula,
        sheets: &dyn SheetAccess,
        origin: CellId,
    ) -> EngineResult<Value> {
        let ctx = EvalContext::new(self, sheets, origin);
        evaluator::run(program, &ctx)
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use gridcalc_core::{CellAddress, ErrorKind, Workbook};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn eval(text: &str) -> Value {
        let engine = Engine::new();
        let wb = Workbook::new();
        engine
            .evaluate(text, &wb, CellId::new("Sheet1", 99, 9))
            .unwrap()
    }

    #[test]
    fn parse_cache_returns_the_same_program() {
        let engine = Engine::new();
        let first = engine.parse("A1+1").unwrap();
        let second = engine.parse("A1+1").unwrap();
        assert!(Rc::ptr_eq(&first, &second));

        engine.clear_cache();
        let third = engine.parse("A1+1").unwrap();
        assert!(!Rc::ptr_eq(&first, &third));
    }

    #[test]
    fn reevaluation_without_reparsing_sees_new_data() {
        let engine = Engine::new();
        let mut wb = Workbook::new();
        let a1 = CellAddress::parse("A1").unwrap();
        wb.sheet_mut("Sheet1").unwrap().set_value(a1, 1.0).unwrap();

        let program = engine.parse("A1*10").unwrap();
        let origin = CellId::new("Sheet1", 99, 9);
        assert_eq!(
            engine.evaluate_parsed(&program, &wb, origin.clone()).unwrap(),
            Value::Number(10.0)
        );

        wb.sheet_mut("Sheet1").unwrap().set_value(a1, 5.0).unwrap();
        assert_eq!(
            engine.evaluate_parsed(&program, &wb, origin).unwrap(),
            Value::Number(50.0)
        );
    }

    #[test]
    fn unknown_function_is_a_name_error_value() {
        assert_eq!(eval("NOSUCHFN(1)"), Value::Error(ErrorKind::Name));
    }

    #[test]
    fn iseven_and_isodd() {
        assert_eq!(eval("ISEVEN(2)"), Value::Bool(true));
        assert_eq!(eval("ISEVEN(3)"), Value::Bool(false));
        assert_eq!(eval("ISEVEN(2.5)"), Value::Bool(true));
        assert_eq!(eval("ISEVEN(-3.7)"), Value::Bool(false));
        assert_eq!(eval("ISODD(-3)"), Value::Bool(true));
        assert_eq!(eval("ISODD(0)"), Value::Bool(false));
        assert_eq!(eval("ISEVEN(\"x\")"), Value::Error(ErrorKind::Value));
        // Misuse surfaces as #NAME?, unlike most arity failures
        assert_eq!(eval("ISEVEN()"), Value::Error(ErrorKind::Name));
        assert_eq!(eval("ISODD(1,2)"), Value::Error(ErrorKind::Name));
    }

    #[test]
    fn iseven_maps_over_arrays() {
        let result = eval("ISEVEN({-2,-1,0,1,2})");
        let Value::Array(arr) = result else {
            panic!("expected array, got {result:?}");
        };
        let flags: Vec<&Value> = arr.iter().collect();
        assert_eq!(
            flags,
            vec![
                &Value::Bool(true),
                &Value::Bool(false),
                &Value::Bool(true),
                &Value::Bool(false),
                &Value::Bool(true),
            ]
        );
    }

    #[test]
    fn aggregations_skip_non_numeric_range_cells() {
        let engine = Engine::new();
        let mut wb = Workbook::new();
        let sheet = wb.sheet_mut("Sheet1").unwrap();
        sheet.set_value(CellAddress::parse("A1").unwrap(), 2.0).unwrap();
        sheet.set_value(CellAddress::parse("A2").unwrap(), "skip").unwrap();
        sheet.set_value(CellAddress::parse("A3").unwrap(), 3.0).unwrap();
        // A4 left blank

        let origin = CellId::new("Sheet1", 99, 9);
        let eval = |text: &str| engine.evaluate(text, &wb, origin.clone()).unwrap();
        assert_eq!(eval("PRODUCT(A1:A4)"), Value::Number(6.0));
        assert_eq!(eval("SUM(A1:A4)"), Value::Number(5.0));
        assert_eq!(eval("AVERAGE(A1:A4)"), Value::Number(2.5));
        assert_eq!(eval("COUNT(A1:A4)"), Value::Number(2.0));
        assert_eq!(eval("COUNTA(A1:A4)"), Value::Number(3.0));
        assert_eq!(eval("MIN(A1:A4)"), Value::Number(2.0));
        assert_eq!(eval("MAX(A1:A4)"), Value::Number(3.0));
    }

    #[test]
    fn product_of_nothing_numeric_is_zero() {
        assert_eq!(eval("PRODUCT({\"a\",\"b\"})"), Value::Number(0.0));
        assert_eq!(eval("PRODUCT(3,\"4\")"), Value::Number(12.0));
    }

    #[test]
    fn average_of_nothing_is_div0() {
        assert_eq!(eval("AVERAGE({\"x\"})"), Value::Error(ErrorKind::Div0));
    }

    #[test]
    fn errors_propagate_through_aggregations() {
        assert_eq!(eval("SUM(1,{2,#REF!})"), Value::Error(ErrorKind::Ref));
        assert_eq!(eval("SUM(#NULL!,#NUM!)"), Value::Error(ErrorKind::Null));
        // COUNT treats errors as uncountable, not contagious
        assert_eq!(eval("COUNT({1,#REF!,2})"), Value::Number(2.0));
    }

    #[test]
    fn logical_functions() {
        assert_eq!(eval("IF(1<2,\"yes\",\"no\")"), Value::Text("yes".into()));
        assert_eq!(eval("IF(FALSE,1)"), Value::Bool(false));
        assert_eq!(eval("IF(A1,,2)"), Value::Empty);
        assert_eq!(eval("IF(#REF!,1,2)"), Value::Error(ErrorKind::Ref));
        assert_eq!(eval("AND(TRUE,1)"), Value::Bool(true));
        assert_eq!(eval("AND(TRUE,0)"), Value::Bool(false));
        assert_eq!(eval("OR(FALSE,0,1)"), Value::Bool(true));
        assert_eq!(eval("NOT(0)"), Value::Bool(true));
        assert_eq!(eval("AND(\"nope\")"), Value::Error(ErrorKind::Value));
        assert_eq!(eval("TRUE()"), Value::Bool(true));
    }

    #[test]
    fn iferror_swallows_only_its_first_argument() {
        assert_eq!(eval("IFERROR(1/0,42)"), Value::Number(42.0));
        assert_eq!(eval("IFERROR(7,42)"), Value::Number(7.0));
        assert_eq!(eval("IFERROR(1,#REF!)"), Value::Number(1.0));
    }

    #[test]
    fn info_predicates() {
        assert_eq!(eval("ISBLANK(A1)"), Value::Bool(true));
        assert_eq!(eval("ISNUMBER(1)"), Value::Bool(true));
        assert_eq!(eval("ISNUMBER(\"1\")"), Value::Bool(false));
        assert_eq!(eval("ISTEXT(\"x\")"), Value::Bool(true));
        assert_eq!(eval("ISERROR(1/0)"), Value::Bool(true));
        assert_eq!(eval("ISERROR(1)"), Value::Bool(false));
        assert_eq!(eval("NA()"), Value::Error(ErrorKind::Na));
    }

    #[test]
    fn dialect_changes_the_argument_separator() {
        let engine = Engine::with_dialect(Dialect { arg_separator: ';' });
        let wb = Workbook::new();
        let result = engine
            .evaluate("SUM(1;2;3)", &wb, CellId::new("Sheet1", 0, 0))
            .unwrap();
        assert_eq!(result, Value::Number(6.0));
        assert!(matches!(
            engine.evaluate("SUM(1,2)", &wb, CellId::new("Sheet1", 0, 0)),
            Err(EngineError::Syntax(_))
        ));
    }

    proptest! {
        #[test]
        fn iseven_isodd_partition_the_integers(n in -100_000i64..100_000i64) {
            let even = eval(&format!("ISEVEN({n})"));
            let odd = eval(&format!("ISODD({n})"));
            prop_assert_eq!(even, Value::Bool(n % 2 == 0));
            prop_assert_eq!(odd, Value::Bool(n % 2 != 0));
        }

        #[test]
        fn truncation_ignores_the_fraction(n in -1000i64..1000i64, frac in 0.01f64..0.99f64) {
            // Parity of n.frac follows n, toward zero
            let text = format!("ISEVEN({})", n as f64 + frac.copysign(n as f64));
            prop_assert_eq!(eval(&text), Value::Bool(n % 2 == 0));
        }
    }
}
