//! Built-in worksheet functions
//!
//! The registry is keyed by uppercase name and built once. Dispatch owns
//! the behavior every function shares: unknown names and arity violations
//! surface as error values, scalar error arguments short-circuit unless a
//! function opts out, and single-argument scalar functions can map over
//! array arguments element-wise.

pub mod info;
pub mod logical;
pub mod math;

use crate::context::EvalContext;
use crate::error::{EngineError, EngineResult};
use crate::value::{Array, Value};
use ahash::AHashMap;
use gridcalc_core::ErrorKind;
use once_cell::sync::Lazy;

/// Function implementation signature
///
/// Arguments arrive already evaluated; implementations may consult the
/// context for sheet access.
pub type FunctionImpl = fn(&[Value], &EvalContext) -> EngineResult<Value>;

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Error value returned on an argument-count violation
    pub arity_error: ErrorKind,
    /// Whether a scalar error argument short-circuits before the
    /// implementation runs
    pub propagate_errors: bool,
    /// Whether an array argument maps element-wise through the
    /// single-argument implementation
    pub map_arrays: bool,
    /// Implementation
    pub implementation: FunctionImpl,
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

static REGISTRY: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::new);

/// The shared registry of built-in functions
pub fn registry() -> &'static FunctionRegistry {
    &REGISTRY
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };

        registry.register_math_functions();
        registry.register_info_functions();
        registry.register_logical_functions();

        registry
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
    }

    fn register_math_functions(&mut self) {
        // SUM
        self.register(FunctionDef {
            name: "SUM",
            min_args: 1,
            max_args: None,
            arity_error: ErrorKind::Value,
            propagate_errors: true,
            map_arrays: false,
            implementation: math::fn_sum,
        });

        // PRODUCT
        self.register(FunctionDef {
            name: "PRODUCT",
            min_args: 1,
            max_args: None,
            arity_error: ErrorKind::Value,
            propagate_errors: true,
            map_arrays: false,
            implementation: math::fn_product,
        });

        // AVERAGE
        self.register(FunctionDef {
            name: "AVERAGE",
            min_args: 1,
            max_args: None,
            arity_error: ErrorKind::Value,
            propagate_errors: true,
            map_arrays: false,
            implementation: math::fn_average,
        });

        // MIN
        self.register(FunctionDef {
            name: "MIN",
            min_args: 1,
            max_args: None,
            arity_error: ErrorKind::Value,
            propagate_errors: true,
            map_arrays: false,
            implementation: math::fn_min,
        });

        // MAX
        self.register(FunctionDef {
            name: "MAX",
            min_args: 1,
            max_args: None,
            arity_error: ErrorKind::Value,
            propagate_errors: true,
            map_arrays: false,
            implementation: math::fn_max,
        });

        // COUNT (errors are countable, not contagious)
        self.register(FunctionDef {
            name: "COUNT",
            min_args: 1,
            max_args: None,
            arity_error: ErrorKind::Value,
            propagate_errors: false,
            map_arrays: false,
            implementation: math::fn_count,
        });

        // COUNTA
        self.register(FunctionDef {
            name: "COUNTA",
            min_args: 1,
            max_args: None,
            arity_error: ErrorKind::Value,
            propagate_errors: false,
            map_arrays: false,
            implementation: math::fn_counta,
        });

        // ABS
        self.register(FunctionDef {
            name: "ABS",
            min_args: 1,
            max_args: Some(1),
            arity_error: ErrorKind::Value,
            propagate_errors: true,
            map_arrays: true,
            implementation: math::fn_abs,
        });
    }

    fn register_info_functions(&mut self) {
        // ISEVEN (no-argument call is #NAME?, not #VALUE!)
        self.register(FunctionDef {
            name: "ISEVEN",
            min_args: 1,
            max_args: Some(1),
            arity_error: ErrorKind::Name,
            propagate_errors: true,
            map_arrays: true,
            implementation: info::fn_iseven,
        });

        // ISODD
        self.register(FunctionDef {
            name: "ISODD",
            min_args: 1,
            max_args: Some(1),
            arity_error: ErrorKind::Name,
            propagate_errors: true,
            map_arrays: true,
            implementation: info::fn_isodd,
        });

        // ISBLANK
        self.register(FunctionDef {
            name: "ISBLANK",
            min_args: 1,
            max_args: Some(1),
            arity_error: ErrorKind::Value,
            propagate_errors: false,
            map_arrays: false,
            implementation: info::fn_isblank,
        });

        // ISNUMBER
        self.register(FunctionDef {
            name: "ISNUMBER",
            min_args: 1,
            max_args: Some(1),
            arity_error: ErrorKind::Value,
            propagate_errors: false,
            map_arrays: false,
            implementation: info::fn_isnumber,
        });

        // ISTEXT
        self.register(FunctionDef {
            name: "ISTEXT",
            min_args: 1,
            max_args: Some(1),
            arity_error: ErrorKind::Value,
            propagate_errors: false,
            map_arrays: false,
            implementation: info::fn_istext,
        });

        // ISERROR
        self.register(FunctionDef {
            name: "ISERROR",
            min_args: 1,
            max_args: Some(1),
            arity_error: ErrorKind::Value,
            propagate_errors: false,
            map_arrays: false,
            implementation: info::fn_iserror,
        });

        // NA
        self.register(FunctionDef {
            name: "NA",
            min_args: 0,
            max_args: Some(0),
            arity_error: ErrorKind::Value,
            propagate_errors: true,
            map_arrays: false,
            implementation: info::fn_na,
        });
    }

    fn register_logical_functions(&mut self) {
        // IF (errors only matter in the condition and the chosen branch)
        self.register(FunctionDef {
            name: "IF",
            min_args: 2,
            max_args: Some(3),
            arity_error: ErrorKind::Value,
            propagate_errors: false,
            map_arrays: false,
            implementation: logical::fn_if,
        });

        // AND
        self.register(FunctionDef {
            name: "AND",
            min_args: 1,
            max_args: None,
            arity_error: ErrorKind::Value,
            propagate_errors: true,
            map_arrays: false,
            implementation: logical::fn_and,
        });

        // OR
        self.register(FunctionDef {
            name: "OR",
            min_args: 1,
            max_args: None,
            arity_error: ErrorKind::Value,
            propagate_errors: true,
            map_arrays: false,
            implementation: logical::fn_or,
        });

        // NOT
        self.register(FunctionDef {
            name: "NOT",
            min_args: 1,
            max_args: Some(1),
            arity_error: ErrorKind::Value,
            propagate_errors: true,
            map_arrays: false,
            implementation: logical::fn_not,
        });

        // IFERROR
        self.register(FunctionDef {
            name: "IFERROR",
            min_args: 2,
            max_args: Some(2),
            arity_error: ErrorKind::Value,
            propagate_errors: false,
            map_arrays: false,
            implementation: logical::fn_iferror,
        });

        // TRUE
        self.register(FunctionDef {
            name: "TRUE",
            min_args: 0,
            max_args: Some(0),
            arity_error: ErrorKind::Value,
            propagate_errors: true,
            map_arrays: false,
            implementation: logical::fn_true,
        });

        // FALSE
        self.register(FunctionDef {
            name: "FALSE",
            min_args: 0,
            max_args: Some(0),
            arity_error: ErrorKind::Value,
            propagate_errors: true,
            map_arrays: false,
            implementation: logical::fn_false,
        });
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Dispatch a call, applying the shared contract before the
/// implementation runs
pub(crate) fn dispatch(name: &str, args: &[Value], ctx: &EvalContext) -> EngineResult<Value> {
    let Some(def) = registry().get(name) else {
        return Ok(Value::Error(ErrorKind::Name));
    };
    if args.len() < def.min_args || def.max_args.is_some_and(|max| args.len() > max) {
        return Ok(Value::Error(def.arity_error));
    }
    if def.propagate_errors {
        if let Some(e) = args.iter().find_map(Value::as_error) {
            return Ok(Value::Error(e));
        }
    }
    if def.map_arrays {
        if let [Value::Array(arr)] = args {
            let mut data = Vec::with_capacity(arr.rows() * arr.cols());
            for elem in arr.iter() {
                let mapped = match elem.as_error() {
                    Some(e) if def.propagate_errors => Value::Error(e),
                    _ => (def.implementation)(std::slice::from_ref(elem), ctx)?,
                };
                data.push(mapped);
            }
            return Array::new(arr.rows(), arr.cols(), data)
                .map(Value::Array)
                .ok_or_else(|| {
                    EngineError::Internal("array mapping changed shape".to_string())
                });
        }
    }
    (def.implementation)(args, ctx)
}

/// Flatten arguments one level: array and range arguments yield their
/// elements tagged `nested`, scalars pass through untagged. Aggregations
/// use the tag to ignore text and booleans that come from ranges while
/// still coercing literal arguments.
pub(crate) fn flattened(args: &[Value]) -> Vec<(bool, &Value)> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            Value::Array(arr) => out.extend(arr.iter().map(|v| (true, v))),
            scalar => out.push((false, scalar)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(registry().get("sum").is_some());
        assert!(registry().get("Sum").is_some());
        assert!(registry().get("NO_SUCH_FN").is_none());
    }

    #[test]
    fn iseven_misuse_is_a_name_error() {
        let def = registry().get("ISEVEN").unwrap();
        assert_eq!(def.arity_error, ErrorKind::Name);
        assert_eq!(registry().get("SUM").unwrap().arity_error, ErrorKind::Value);
    }

    #[test]
    fn flattening_tags_array_elements() {
        let args = vec![
            Value::Number(1.0),
            Value::Array(
                Array::from_rows(vec![vec![Value::Number(2.0), Value::Empty]]).unwrap(),
            ),
        ];
        let flat = flattened(&args);
        assert_eq!(flat.len(), 3);
        assert!(!flat[0].0);
        assert!(flat[1].0 && flat[2].0);
    }
}
