//! Runtime values and coercion rules
//!
//! Every formula evaluates to a [`Value`]. Spreadsheet error codes are
//! ordinary values here, so they flow through operators and function
//! arguments instead of aborting evaluation.

use gridcalc_core::ErrorKind;
use std::cmp::Ordering;
use std::fmt;

/// A value produced during formula evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
    /// A spreadsheet error code, carried as data
    Error(ErrorKind),
    /// An empty cell or omitted argument
    Empty,
    Array(Array),
}

/// A rectangular, row-major grid of scalar values
///
/// Rectangularity is enforced at construction; elements are never arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    rows: usize,
    cols: usize,
    data: Vec<Value>,
}

impl Array {
    /// Build from row-major data; fails if the shape does not match
    pub fn new(rows: usize, cols: usize, data: Vec<Value>) -> Option<Self> {
        if rows == 0 || cols == 0 || data.len() != rows * cols {
            return None;
        }
        if data.iter().any(|v| matches!(v, Value::Array(_))) {
            return None;
        }
        Some(Self { rows, cols, data })
    }

    /// Build from rows of equal length; fails on ragged input
    pub fn from_rows(rows: Vec<Vec<Value>>) -> Option<Self> {
        let height = rows.len();
        let width = rows.first().map(Vec::len)?;
        if width == 0 || rows.iter().any(|r| r.len() != width) {
            return None;
        }
        let data: Vec<Value> = rows.into_iter().flatten().collect();
        Self::new(height, width, data)
    }

    /// A 1x1 array wrapping a single scalar
    pub fn scalar(value: Value) -> Self {
        Self {
            rows: 1,
            cols: 1,
            data: vec![value],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Element at (row, col); out-of-range reads yield `#N/A`
    pub fn get(&self, row: usize, col: usize) -> &Value {
        static NA: Value = Value::Error(ErrorKind::Na);
        if row < self.rows && col < self.cols {
            &self.data[row * self.cols + col]
        } else {
            &NA
        }
    }

    /// Iterate elements in row-major order
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.data.iter()
    }

    /// Same-shape array with `f` applied to each element
    pub fn map(&self, f: impl FnMut(&Value) -> Value) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }

    /// The top-left element
    pub fn top_left(&self) -> &Value {
        &self.data[0]
    }
}

impl Value {
    /// Coerce to a number; failure yields the spreadsheet error to surface
    ///
    /// Booleans count as 1/0, empty as 0, and text is parsed after
    /// trimming. Non-numeric text is `#VALUE!`; errors pass through.
    pub fn to_number(&self) -> Result<f64, ErrorKind> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Bool(true) => Ok(1.0),
            Value::Bool(false) => Ok(0.0),
            Value::Empty => Ok(0.0),
            Value::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(0.0);
                }
                // f64::from_str accepts "inf"/"NaN"; those are not numbers
                // in a cell
                match trimmed.parse::<f64>() {
                    Ok(n) if n.is_finite() => Ok(n),
                    _ => Err(ErrorKind::Value),
                }
            }
            Value::Error(e) => Err(*e),
            Value::Array(_) => Err(ErrorKind::Value),
        }
    }

    /// Coerce to text for concatenation and text functions
    pub fn to_text(&self) -> Result<String, ErrorKind> {
        match self {
            Value::Text(s) => Ok(s.clone()),
            Value::Number(n) => Ok(format_number(*n)),
            Value::Bool(true) => Ok("TRUE".to_string()),
            Value::Bool(false) => Ok("FALSE".to_string()),
            Value::Empty => Ok(String::new()),
            Value::Error(e) => Err(*e),
            Value::Array(_) => Err(ErrorKind::Value),
        }
    }

    /// Coerce to a condition value
    ///
    /// Text `"TRUE"`/`"FALSE"` (any case) converts; other text is
    /// `#VALUE!`. Numbers are truthy when nonzero.
    pub fn to_bool(&self) -> Result<bool, ErrorKind> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => Ok(*n != 0.0),
            Value::Empty => Ok(false),
            Value::Text(s) => {
                if s.eq_ignore_ascii_case("TRUE") {
                    Ok(true)
                } else if s.eq_ignore_ascii_case("FALSE") {
                    Ok(false)
                } else {
                    Err(ErrorKind::Value)
                }
            }
            Value::Error(e) => Err(*e),
            Value::Array(_) => Err(ErrorKind::Value),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// The contained error code, if any
    pub fn as_error(&self) -> Option<ErrorKind> {
        match self {
            Value::Error(e) => Some(*e),
            _ => None,
        }
    }
}

/// Compare two scalars with the spreadsheet total order
///
/// Within a type: numeric order, case-insensitive text order, FALSE <
/// TRUE. Across types: Number < Text < Bool. Empty takes on the zero
/// value of the other operand's type (`0`, `""`, or FALSE).
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Number(_) => 0,
            Value::Text(_) => 1,
            Value::Bool(_) => 2,
            _ => 0,
        }
    }

    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (Value::Text(a), Value::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Empty, Value::Empty) => Ordering::Equal,
        (Value::Empty, other) => compare_values(&empty_as(other), right),
        (other, Value::Empty) => compare_values(left, &empty_as(other)),
        _ => rank(left).cmp(&rank(right)),
    }
}

fn empty_as(other: &Value) -> Value {
    match other {
        Value::Text(_) => Value::Text(String::new()),
        Value::Bool(_) => Value::Bool(false),
        _ => Value::Number(0.0),
    }
}

/// Format a number the way a cell displays it: integral values carry no
/// fractional part
pub fn format_number(n: f64) -> String {
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Text(s) => write!(f, "{s}"),
            Value::Bool(true) => write!(f, "TRUE"),
            Value::Bool(false) => write!(f, "FALSE"),
            Value::Error(e) => write!(f, "{e}"),
            Value::Empty => Ok(()),
            Value::Array(arr) => {
                write!(f, "{{")?;
                for row in 0..arr.rows() {
                    if row > 0 {
                        write!(f, ";")?;
                    }
                    for col in 0..arr.cols() {
                        if col > 0 {
                            write!(f, ",")?;
                        }
                        write!(f, "{}", arr.get(row, col))?;
                    }
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<ErrorKind> for Value {
    fn from(e: ErrorKind) -> Self {
        Value::Error(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn number_coercion() {
        assert_eq!(Value::Number(2.5).to_number(), Ok(2.5));
        assert_eq!(Value::Bool(true).to_number(), Ok(1.0));
        assert_eq!(Value::Empty.to_number(), Ok(0.0));
        assert_eq!(Value::Text("  42 ".into()).to_number(), Ok(42.0));
        assert_eq!(Value::Text("".into()).to_number(), Ok(0.0));
        assert_eq!(Value::Text("abc".into()).to_number(), Err(ErrorKind::Value));
        assert_eq!(Value::Error(ErrorKind::Ref).to_number(), Err(ErrorKind::Ref));
        // f64 syntax the grid does not consider numeric
        assert_eq!(Value::Text("inf".into()).to_number(), Err(ErrorKind::Value));
        assert_eq!(Value::Text("-inf".into()).to_number(), Err(ErrorKind::Value));
        assert_eq!(Value::Text("NaN".into()).to_number(), Err(ErrorKind::Value));
        assert_eq!(Value::Text("1e999".into()).to_number(), Err(ErrorKind::Value));
    }

    #[test]
    fn text_coercion_formats_integral_numbers_bare() {
        assert_eq!(Value::Number(3.0).to_text(), Ok("3".to_string()));
        assert_eq!(Value::Number(3.5).to_text(), Ok("3.5".to_string()));
        assert_eq!(Value::Number(-0.25).to_text(), Ok("-0.25".to_string()));
        assert_eq!(Value::Bool(true).to_text(), Ok("TRUE".to_string()));
        assert_eq!(Value::Empty.to_text(), Ok(String::new()));
    }

    #[test]
    fn bool_coercion() {
        assert_eq!(Value::Number(0.0).to_bool(), Ok(false));
        assert_eq!(Value::Number(-3.0).to_bool(), Ok(true));
        assert_eq!(Value::Text("true".into()).to_bool(), Ok(true));
        assert_eq!(Value::Text("yes".into()).to_bool(), Err(ErrorKind::Value));
        assert_eq!(Value::Empty.to_bool(), Ok(false));
    }

    #[test]
    fn cross_type_comparison_order() {
        use Ordering::*;
        assert_eq!(
            compare_values(&Value::Number(1e9), &Value::Text("a".into())),
            Less
        );
        assert_eq!(
            compare_values(&Value::Text("zzz".into()), &Value::Bool(false)),
            Less
        );
        assert_eq!(
            compare_values(&Value::Text("Apple".into()), &Value::Text("apple".into())),
            Equal
        );
        assert_eq!(compare_values(&Value::Bool(false), &Value::Bool(true)), Less);
    }

    #[test]
    fn empty_compares_as_zero_of_other_type() {
        use Ordering::*;
        assert_eq!(compare_values(&Value::Empty, &Value::Number(0.0)), Equal);
        assert_eq!(compare_values(&Value::Empty, &Value::Text("".into())), Equal);
        assert_eq!(compare_values(&Value::Empty, &Value::Bool(false)), Equal);
        assert_eq!(compare_values(&Value::Empty, &Value::Number(-1.0)), Greater);
    }

    #[test]
    fn array_construction_enforces_shape() {
        assert!(Array::new(2, 2, vec![Value::Empty; 4]).is_some());
        assert!(Array::new(2, 2, vec![Value::Empty; 3]).is_none());
        assert!(Array::new(0, 0, vec![]).is_none());
        assert!(Array::from_rows(vec![
            vec![Value::Number(1.0), Value::Number(2.0)],
            vec![Value::Number(3.0)],
        ])
        .is_none());
    }

    #[test]
    fn array_get_out_of_range_is_na() {
        let arr = Array::from_rows(vec![vec![Value::Number(1.0)]]).unwrap();
        assert_eq!(*arr.get(0, 0), Value::Number(1.0));
        assert_eq!(*arr.get(1, 0), Value::Error(ErrorKind::Na));
    }

    proptest! {
        #[test]
        fn finite_numbers_round_trip_through_text(n in -1e12f64..1e12f64) {
            let text = Value::Number(n).to_text().unwrap();
            let back = Value::Text(text).to_number().unwrap();
            prop_assert!((back - n).abs() <= n.abs() * 1e-12);
        }
    }
}
