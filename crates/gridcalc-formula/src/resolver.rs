//! Reference resolution
//!
//! Bridges compiled references to actual sheet data through the
//! [`SheetAccess`] trait. Reading a formula cell re-evaluates it through
//! the cycle tracker; nothing is memoized here, result caching belongs to
//! the document-level calculation pass.

use crate::context::{CellId, EvalContext, Frame};
use crate::engine::Engine;
use crate::evaluator;
use crate::program::{CellRef, Instr, ParsedFormula, RangeRef, SheetSpan};
use crate::value::{Array, Value};
use ahash::AHashSet;
use gridcalc_core::{CellRange, CellValue, ErrorKind, Workbook};

/// Read access to sheet data, as consumed by the evaluator
///
/// Implementations return owned values; the engine never writes through
/// this trait.
pub trait SheetAccess {
    /// Stored content of a cell; `CellValue::Empty` when never set
    fn cell_value(&self, sheet: &str, row: u32, col: u16) -> CellValue;

    /// Formula text of a cell, if it holds one
    fn cell_formula(&self, sheet: &str, row: u32, col: u16) -> Option<String>;

    /// The refers-to text of a defined name
    fn named_range(&self, name: &str) -> Option<String>;

    fn sheet_exists(&self, name: &str) -> bool;

    /// Sheet names in workbook order, for 3-D span expansion
    fn sheet_names(&self) -> Vec<String>;
}

impl SheetAccess for Workbook {
    fn cell_value(&self, sheet: &str, row: u32, col: u16) -> CellValue {
        self.sheet(sheet)
            .map(|s| s.value_at(row, col).clone())
            .unwrap_or(CellValue::Empty)
    }

    fn cell_formula(&self, sheet: &str, row: u32, col: u16) -> Option<String> {
        self.sheet(sheet)
            .and_then(|s| s.value_at(row, col).formula_text().map(str::to_string))
    }

    fn named_range(&self, name: &str) -> Option<String> {
        self.defined_name(name).map(|n| n.refers_to.clone())
    }

    fn sheet_exists(&self, name: &str) -> bool {
        self.sheet_index(name).is_some()
    }

    fn sheet_names(&self) -> Vec<String> {
        Workbook::sheet_names(self)
    }
}

/// Strip the formula marker users conventionally store with the text
pub(crate) fn formula_body(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed.strip_prefix('=').unwrap_or(trimmed)
}

fn convert(stored: CellValue) -> Value {
    match stored {
        CellValue::Empty => Value::Empty,
        CellValue::Boolean(b) => Value::Bool(b),
        CellValue::Number(n) => Value::Number(n),
        CellValue::Text(s) => Value::Text(s),
        CellValue::Error(e) => Value::Error(e),
        // Callers route formula cells through cell_at first
        CellValue::Formula { .. } => Value::Empty,
    }
}

/// Resolve a single-cell reference
pub(crate) fn resolve_cell(ctx: &EvalContext, r: &CellRef) -> crate::EngineResult<Value> {
    let sheet = match &r.sheet {
        Some(s) => s.clone(),
        None => ctx.current_sheet(),
    };
    if !ctx.sheets.sheet_exists(&sheet) {
        return Ok(Value::Error(ErrorKind::Ref));
    }
    cell_at(ctx, &sheet, r.addr.row, r.addr.col)
}

/// Resolve one cell's current value, re-evaluating formula cells through
/// the cycle tracker
fn cell_at(ctx: &EvalContext, sheet: &str, row: u32, col: u16) -> crate::EngineResult<Value> {
    match ctx.sheets.cell_value(sheet, row, col) {
        CellValue::Formula { text, .. } => {
            let id = CellId::new(sheet, row, col);
            match ctx.enter_cell(&id)? {
                Frame::Cycle => Ok(Value::Error(ErrorKind::Calc)),
                Frame::Entered => {
                    let result = ctx
                        .engine
                        .parse(formula_body(&text))
                        .and_then(|program| evaluator::run(&program, ctx));
                    ctx.leave_cell();
                    result
                }
            }
        }
        stored => Ok(convert(stored)),
    }
}

/// Resolve a range reference into an array; 3-D spans stack each sheet's
/// rectangle vertically
pub(crate) fn resolve_range(ctx: &EvalContext, r: &RangeRef) -> crate::EngineResult<Value> {
    let sheets = match span_sheets(ctx, &r.sheets) {
        Some(list) => list,
        None => return Ok(Value::Error(ErrorKind::Ref)),
    };
    let range = r.range.normalized();
    let height = range.height() as usize;
    let width = range.width() as usize;
    let mut data = Vec::with_capacity(height * width * sheets.len());
    for sheet in &sheets {
        for addr in range.cells() {
            data.push(cell_at(ctx, sheet, addr.row, addr.col)?);
        }
    }
    match Array::new(height * sheets.len(), width, data) {
        Some(arr) => Ok(Value::Array(arr)),
        None => Err(crate::EngineError::Internal(
            "range did not fill its rectangle".to_string(),
        )),
    }
}

/// The ordered sheet list a reference qualifier covers; `None` when a
/// named sheet is missing
fn span_sheets(ctx: &EvalContext, span: &Option<SheetSpan>) -> Option<Vec<String>> {
    match span {
        None => Some(vec![ctx.current_sheet()]),
        Some(SheetSpan::Single(name)) => {
            if ctx.sheets.sheet_exists(name) {
                Some(vec![name.clone()])
            } else {
                None
            }
        }
        Some(SheetSpan::Span(first, last)) => {
            let names = ctx.sheets.sheet_names();
            let a = names.iter().position(|n| n.eq_ignore_ascii_case(first))?;
            let b = names.iter().position(|n| n.eq_ignore_ascii_case(last))?;
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            Some(names[lo..=hi].to_vec())
        }
    }
}

/// Resolve a defined name through one level of indirection: its refers-to
/// text is itself parsed and evaluated
pub(crate) fn resolve_name(ctx: &EvalContext, name: &str) -> crate::EngineResult<Value> {
    let Some(refers_to) = ctx.sheets.named_range(name) else {
        return Ok(Value::Error(ErrorKind::Name));
    };
    let program = match ctx.engine.parse(formula_body(&refers_to)) {
        Ok(p) => p,
        // A defined name with unparseable target behaves as a broken
        // reference, not an engine fault
        Err(_) => return Ok(Value::Error(ErrorKind::Ref)),
    };
    evaluator::run(&program, ctx)
}

/// A cell or rectangle a formula reads
#[derive(Debug, Clone, PartialEq)]
pub enum Precedent {
    Cell(CellId),
    Range { sheet: String, range: CellRange },
}

/// Collect the cells and ranges a compiled formula reads, expanding 3-D
/// spans against the workbook's sheet order and following defined names
pub fn precedents(
    program: &ParsedFormula,
    default_sheet: &str,
    sheets: &dyn SheetAccess,
    engine: &Engine,
) -> Vec<Precedent> {
    let mut out = Vec::new();
    let mut seen_names = AHashSet::new();
    collect(program, default_sheet, sheets, engine, &mut out, &mut seen_names);
    out
}

fn collect(
    program: &ParsedFormula,
    default_sheet: &str,
    sheets: &dyn SheetAccess,
    engine: &Engine,
    out: &mut Vec<Precedent>,
    seen_names: &mut AHashSet<String>,
) {
    for instr in program.reference_instrs() {
        match instr {
            Instr::PushCell(r) => {
                let sheet = r.sheet.clone().unwrap_or_else(|| default_sheet.to_string());
                out.push(Precedent::Cell(CellId::new(sheet, r.addr.row, r.addr.col)));
            }
            Instr::PushRange(r) => {
                let list = match &r.sheets {
                    None => vec![default_sheet.to_string()],
                    Some(SheetSpan::Single(name)) => vec![name.clone()],
                    Some(SheetSpan::Span(first, last)) => {
                        let names = sheets.sheet_names();
                        let a = names.iter().position(|n| n.eq_ignore_ascii_case(first));
                        let b = names.iter().position(|n| n.eq_ignore_ascii_case(last));
                        match (a, b) {
                            (Some(a), Some(b)) => {
                                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                                names[lo..=hi].to_vec()
                            }
                            _ => Vec::new(),
                        }
                    }
                };
                for sheet in list {
                    out.push(Precedent::Range {
                        sheet,
                        range: r.range.normalized(),
                    });
                }
            }
            Instr::PushName(name) => {
                if !seen_names.insert(name.to_lowercase()) {
                    continue;
                }
                if let Some(refers_to) = sheets.named_range(name) {
                    if let Ok(target) = engine.parse(formula_body(&refers_to)) {
                        collect(&target, default_sheet, sheets, engine, out, seen_names);
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use gridcalc_core::CellAddress;
    use pretty_assertions::assert_eq;

    fn workbook() -> Workbook {
        let mut wb = Workbook::new();
        wb.add_worksheet("Data").unwrap();
        wb.define_name("Total", "Data!B1:B3").unwrap();
        wb
    }

    #[test]
    fn workbook_sheet_access() {
        let mut wb = workbook();
        let a1 = CellAddress::parse("A1").unwrap();
        wb.sheet_mut("Data").unwrap().set_formula(a1, "1+1").unwrap();

        assert!(wb.sheet_exists("data"));
        assert!(!wb.sheet_exists("Missing"));
        assert_eq!(
            SheetAccess::cell_formula(&wb, "Data", 0, 0),
            Some("1+1".to_string())
        );
        assert_eq!(SheetAccess::cell_value(&wb, "Data", 5, 5), CellValue::Empty);
        assert_eq!(
            SheetAccess::named_range(&wb, "total"),
            Some("Data!B1:B3".to_string())
        );
    }

    #[test]
    fn precedents_cover_cells_ranges_and_names() {
        let wb = workbook();
        let engine = Engine::new();
        let program = engine.parse("A1+SUM(Data!C1:C2)+Total").unwrap();
        let found = precedents(&program, "Sheet1", &wb, &engine);
        assert_eq!(
            found,
            vec![
                Precedent::Cell(CellId::new("Sheet1", 0, 0)),
                Precedent::Range {
                    sheet: "Data".to_string(),
                    range: CellRange::parse("C1:C2").unwrap(),
                },
                Precedent::Range {
                    sheet: "Data".to_string(),
                    range: CellRange::parse("B1:B3").unwrap(),
                },
            ]
        );
    }

    #[test]
    fn name_loops_do_not_recurse_forever() {
        let mut wb = Workbook::new();
        wb.define_name("Alpha", "Beta").unwrap();
        wb.define_name("Beta", "Alpha").unwrap();
        let engine = Engine::new();
        let program = engine.parse("Alpha+1").unwrap();
        let found = precedents(&program, "Sheet1", &wb, &engine);
        assert_eq!(found, Vec::new());
    }

    #[test]
    fn formula_body_strips_marker() {
        assert_eq!(formula_body("=A1+1"), "A1+1");
        assert_eq!(formula_body("  =A1 "), "A1");
        assert_eq!(formula_body("A1+1"), "A1+1");
    }
}
