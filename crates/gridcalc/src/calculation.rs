//! Workbook calculation pass
//!
//! Recalculates every formula cell in a workbook: formulas are parsed,
//! their precedents feed a dependency graph, cells are evaluated in
//! topological order, and results are written back as cached values so
//! [`CellValue::effective`] reports them.
//!
//! Circular references are not resolved iteratively: every cell on a
//! cycle is stamped `#CALC!`, and cells downstream of a cycle pick the
//! error up through normal evaluation.
//!
//! # Example
//!
//! ```rust
//! use gridcalc::prelude::*;
//!
//! let mut wb = Workbook::new();
//! let sheet = wb.sheet_mut("Sheet1").unwrap();
//! sheet.set_value("A1".parse().unwrap(), 10.0).unwrap();
//! sheet.set_value("A2".parse().unwrap(), 20.0).unwrap();
//! sheet.set_formula("A3".parse().unwrap(), "A1+A2").unwrap();
//!
//! let stats = wb.calculate().unwrap();
//! assert_eq!(stats.evaluated, 1);
//! ```

use ahash::{AHashMap, AHashSet};
use gridcalc_core::{CellValue, Error, ErrorKind, Result, Workbook};
use gridcalc_formula::{
    precedents, CellId, DependencyGraph, Dialect, Engine, ParsedFormula, Precedent, Value,
};
use log::{debug, warn};
use std::rc::Rc;

/// Options for a calculation pass
#[derive(Debug, Clone, Default)]
pub struct CalculationOptions {
    /// Formula dialect the stored formulas are written in
    pub dialect: Dialect,
}

/// Statistics from a calculation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Formula cells whose text parsed successfully
    pub formula_count: usize,
    /// Cells evaluated and written back
    pub evaluated: usize,
    /// Cells stamped `#CALC!` because they sit on a reference cycle
    pub cycle_cells: usize,
    /// Cells skipped because of a parse failure or engine fault
    pub errors: usize,
}

/// Extension trait adding full-workbook recalculation to [`Workbook`]
pub trait WorkbookCalculationExt {
    /// Recalculate every formula cell with default options
    fn calculate(&mut self) -> Result<CalculationStats>;

    /// Recalculate every formula cell with custom options
    fn calculate_with_options(&mut self, options: &CalculationOptions) -> Result<CalculationStats>;
}

impl WorkbookCalculationExt for Workbook {
    fn calculate(&mut self) -> Result<CalculationStats> {
        self.calculate_with_options(&CalculationOptions::default())
    }

    fn calculate_with_options(&mut self, options: &CalculationOptions) -> Result<CalculationStats> {
        let engine = Engine::with_dialect(options.dialect.clone());
        let mut stats = CalculationStats::default();

        // Phase 1: parse every stored formula. Cells whose text does not
        // parse are counted and left untouched so a bad formula never
        // aborts the pass.
        let mut programs: AHashMap<CellId, Rc<ParsedFormula>> = AHashMap::new();
        for sheet in self.sheets() {
            for (addr, text) in sheet.formula_cells() {
                let id = CellId::at(sheet.name(), addr);
                match engine.parse(formula_body(text)) {
                    Ok(program) => {
                        programs.insert(id, program);
                    }
                    Err(err) => {
                        warn!("formula at {id} does not parse: {err}");
                        stats.errors += 1;
                    }
                }
            }
        }
        stats.formula_count = programs.len();
        if programs.is_empty() {
            return Ok(stats);
        }

        // Phase 2: dependency graph over formula cells. References to
        // plain value cells need no ordering and are left out; sheet
        // names from formula text are matched case-insensitively against
        // the workbook's.
        let mut graph = DependencyGraph::new();
        for (id, program) in &programs {
            for precedent in precedents(program, &id.sheet, self, &engine) {
                match precedent {
                    Precedent::Cell(target) => {
                        let hit = programs.keys().find(|k| {
                            k.row == target.row
                                && k.col == target.col
                                && k.sheet.eq_ignore_ascii_case(&target.sheet)
                        });
                        if let Some(target) = hit {
                            graph.add_dependency(target.clone(), id.clone());
                        }
                    }
                    Precedent::Range { sheet, range } => {
                        for target in programs.keys() {
                            if target.sheet.eq_ignore_ascii_case(&sheet)
                                && range.contains(&target.addr())
                            {
                                graph.add_dependency(target.clone(), id.clone());
                            }
                        }
                    }
                }
            }
        }

        // Phase 3: stamp cycle members, order the rest. Kahn's leftover
        // also contains cells downstream of a cycle; those still get
        // evaluated and inherit `#CALC!` through their references.
        let members: Vec<CellId> = programs.keys().cloned().collect();
        let cyclic: AHashSet<CellId> = graph.cycle_cells(&members).into_iter().collect();
        stats.cycle_cells = cyclic.len();

        let (mut order, leftover) = graph.calculation_order(&members);
        order.retain(|id| !cyclic.contains(id));
        order.extend(leftover.into_iter().filter(|id| !cyclic.contains(id)));

        // Phase 4: evaluate against the read-only workbook, collecting
        // results so the write-back happens in one mutable sweep.
        let mut results: Vec<(CellId, CellValue)> = Vec::with_capacity(members.len());
        for id in &cyclic {
            results.push((id.clone(), CellValue::Error(ErrorKind::Calc)));
        }
        for id in order {
            let program = match programs.get(&id) {
                Some(program) => Rc::clone(program),
                None => continue,
            };
            match engine.evaluate_parsed(&program, self, id.clone()) {
                Ok(value) => {
                    results.push((id, cache_value(value)));
                    stats.evaluated += 1;
                }
                Err(err) => {
                    warn!("evaluation failed at {id}: {err}");
                    stats.errors += 1;
                }
            }
        }

        // Phase 5: write cached results back.
        for (id, value) in results {
            let sheet = self
                .sheet_mut(&id.sheet)
                .ok_or_else(|| Error::SheetNotFound(id.sheet.clone()))?;
            sheet.set_cached_result(id.addr(), value)?;
        }

        debug!(
            "calculated {} cells ({} on cycles, {} errors)",
            stats.evaluated, stats.cycle_cells, stats.errors
        );
        Ok(stats)
    }
}

fn formula_body(text: &str) -> &str {
    text.trim().strip_prefix('=').unwrap_or(text).trim()
}

/// Convert an evaluation result into the value cached on the cell.
/// Array results collapse to their top-left element; a cell holds one
/// value and spilling is not modelled.
fn cache_value(value: Value) -> CellValue {
    match value {
        Value::Number(n) => CellValue::Number(n),
        Value::Text(s) => CellValue::Text(s),
        Value::Bool(b) => CellValue::Boolean(b),
        Value::Error(kind) => CellValue::Error(kind),
        Value::Empty => CellValue::Empty,
        Value::Array(array) => cache_value(array.top_left().clone()),
    }
}
