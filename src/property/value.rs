//! Property values and script-text coercion.

use std::fmt;

use super::{Bound, DefaultValue, ParameterType, PropertyDef};
use crate::interpreter::text;

/// Accepted text when a value holds both quote characters.
pub(crate) const UNQUOTABLE: &str = "Text using at most one kind of quote character";

/// Dense real matrix stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Rmatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Rmatrix {
    /// A zero-filled matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// A single-row matrix.
    pub fn row(values: &[f64]) -> Self {
        Self {
            rows: 1,
            cols: values.len(),
            data: values.to_vec(),
        }
    }

    /// Build from rows; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, String> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != cols) {
            return Err("all rows of an array literal must have the same length".to_string());
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data: rows.into_iter().flatten().collect(),
        })
    }

    /// Parse `[1 2 3; 4 5 6]`, `[1, 2, 3]` or `{1, 2, 3}`.
    pub fn parse(literal: &str) -> Result<Self, String> {
        let trimmed = literal.trim();
        let inner = trimmed
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .or_else(|| trimmed.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
            .ok_or_else(|| format!("\"{}\" is not an array literal", literal))?;
        if inner.trim().is_empty() {
            return Ok(Self::zeros(0, 0));
        }
        let mut rows = Vec::new();
        for row_text in inner.split(';') {
            let mut row = Vec::new();
            for item in row_text
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
            {
                let value = text::parse_number(item)
                    .ok_or_else(|| format!("\"{}\" is not a real number", item))?;
                row.push(value);
            }
            rows.push(row);
        }
        Self::from_rows(rows)
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Element at zero-based `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            self.data.get(row * self.cols + col).copied()
        } else {
            None
        }
    }

    /// Set the element at zero-based `(row, col)`; false when out of range.
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> bool {
        if row < self.rows && col < self.cols {
            self.data[row * self.cols + col] = value;
            true
        } else {
            false
        }
    }

    /// Row-major element slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

impl fmt::Display for Rmatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for r in 0..self.rows {
            if r > 0 {
                f.write_str("; ")?;
            }
            let row = &self.data[r * self.cols..(r + 1) * self.cols];
            let items: Vec<String> = row.iter().map(|v| format_real(*v)).collect();
            f.write_str(&items.join(" "))?;
        }
        f.write_str("]")
    }
}

/// A typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Signed integer.
    Integer(i64),
    /// Unsigned integer.
    UnsignedInt(u64),
    /// Real number.
    Real(f64),
    /// Real matrix.
    Rmatrix(Rmatrix),
    /// Free text.
    String(String),
    /// List of text values.
    StringArray(Vec<String>),
    /// Boolean.
    Boolean(bool),
    /// List of booleans.
    BooleanArray(Vec<bool>),
    /// On/Off switch.
    OnOff(bool),
    /// Enumerated label.
    Enumeration(String),
    /// File path.
    Filename(String),
    /// Object name.
    Object(String),
    /// Object names.
    ObjectArray(Vec<String>),
}

impl PropertyValue {
    /// Value held by a freshly created object for `def`.
    pub fn from_default(def: &PropertyDef) -> Self {
        match (def.ty, def.default) {
            (ParameterType::Integer, DefaultValue::Integer(v)) => PropertyValue::Integer(v),
            (ParameterType::UnsignedInt, DefaultValue::Integer(v)) => {
                PropertyValue::UnsignedInt(v.max(0) as u64)
            }
            (ParameterType::Real, DefaultValue::Real(v)) => PropertyValue::Real(v),
            (ParameterType::Rmatrix, DefaultValue::Reals(v)) => PropertyValue::Rmatrix(Rmatrix::row(v)),
            (ParameterType::String, DefaultValue::Text(s)) => PropertyValue::String(s.to_string()),
            (ParameterType::Filename, DefaultValue::Text(s)) => {
                PropertyValue::Filename(s.to_string())
            }
            (ParameterType::Enumeration, DefaultValue::Text(s)) => {
                PropertyValue::Enumeration(s.to_string())
            }
            (ParameterType::Object, DefaultValue::Text(s)) => PropertyValue::Object(s.to_string()),
            (ParameterType::Boolean, DefaultValue::Bool(b)) => PropertyValue::Boolean(b),
            (ParameterType::OnOff, DefaultValue::Switch(b)) => PropertyValue::OnOff(b),
            (ParameterType::StringArray, DefaultValue::Names(n)) => {
                PropertyValue::StringArray(n.iter().map(|s| s.to_string()).collect())
            }
            (ParameterType::ObjectArray, DefaultValue::Names(n)) => {
                PropertyValue::ObjectArray(n.iter().map(|s| s.to_string()).collect())
            }
            (ty, _) => Self::empty(ty),
        }
    }

    /// Zero or empty value of a type.
    pub fn empty(ty: ParameterType) -> Self {
        match ty {
            ParameterType::Integer => PropertyValue::Integer(0),
            ParameterType::UnsignedInt => PropertyValue::UnsignedInt(0),
            ParameterType::Real => PropertyValue::Real(0.0),
            ParameterType::Rmatrix => PropertyValue::Rmatrix(Rmatrix::zeros(0, 0)),
            ParameterType::String => PropertyValue::String(String::new()),
            ParameterType::StringArray => PropertyValue::StringArray(Vec::new()),
            ParameterType::Boolean => PropertyValue::Boolean(false),
            ParameterType::BooleanArray => PropertyValue::BooleanArray(Vec::new()),
            ParameterType::OnOff => PropertyValue::OnOff(false),
            ParameterType::Enumeration => PropertyValue::Enumeration(String::new()),
            ParameterType::Filename => PropertyValue::Filename(String::new()),
            ParameterType::Object => PropertyValue::Object(String::new()),
            ParameterType::ObjectArray => PropertyValue::ObjectArray(Vec::new()),
        }
    }

    /// The kind of this value.
    pub fn parameter_type(&self) -> ParameterType {
        match self {
            PropertyValue::Integer(_) => ParameterType::Integer,
            PropertyValue::UnsignedInt(_) => ParameterType::UnsignedInt,
            PropertyValue::Real(_) => ParameterType::Real,
            PropertyValue::Rmatrix(_) => ParameterType::Rmatrix,
            PropertyValue::String(_) => ParameterType::String,
            PropertyValue::StringArray(_) => ParameterType::StringArray,
            PropertyValue::Boolean(_) => ParameterType::Boolean,
            PropertyValue::BooleanArray(_) => ParameterType::BooleanArray,
            PropertyValue::OnOff(_) => ParameterType::OnOff,
            PropertyValue::Enumeration(_) => ParameterType::Enumeration,
            PropertyValue::Filename(_) => ParameterType::Filename,
            PropertyValue::Object(_) => ParameterType::Object,
            PropertyValue::ObjectArray(_) => ParameterType::ObjectArray,
        }
    }

    /// Numeric view of integer and real values.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            PropertyValue::Integer(v) => Some(*v as f64),
            PropertyValue::UnsignedInt(v) => Some(*v as f64),
            PropertyValue::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Text view of single-text values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s)
            | PropertyValue::Enumeration(s)
            | PropertyValue::Filename(s)
            | PropertyValue::Object(s) => Some(s),
            _ => None,
        }
    }

    /// Names held by reference values.
    pub fn names(&self) -> Vec<&str> {
        match self {
            PropertyValue::Object(s) if !s.is_empty() => vec![s.as_str()],
            PropertyValue::ObjectArray(items) => items.iter().map(|s| s.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Script text for this value, as written back by the script writer.
    pub fn to_script_string(&self) -> String {
        match self {
            PropertyValue::Integer(v) => v.to_string(),
            PropertyValue::UnsignedInt(v) => v.to_string(),
            PropertyValue::Real(v) => format_real(*v),
            PropertyValue::Rmatrix(m) => m.to_string(),
            PropertyValue::String(s) | PropertyValue::Filename(s) => text::quote(s),
            PropertyValue::Enumeration(s) | PropertyValue::Object(s) => s.clone(),
            PropertyValue::StringArray(items) => format!(
                "{{{}}}",
                items
                    .iter()
                    .map(|s| text::quote(s))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            PropertyValue::ObjectArray(items) => format!("{{{}}}", items.join(", ")),
            PropertyValue::Boolean(b) => b.to_string(),
            PropertyValue::BooleanArray(items) => format!(
                "[{}]",
                items
                    .iter()
                    .map(|b| b.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            ),
            PropertyValue::OnOff(on) => if *on { "On" } else { "Off" }.to_string(),
        }
    }

    /// Coerce script text into a value for `def`.
    ///
    /// On rejection the error holds the description of accepted values,
    /// suitable for [`crate::ScriptError::InvalidValue`].
    pub fn from_script(def: &PropertyDef, raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        match def.ty {
            ParameterType::Integer | ParameterType::UnsignedInt => {
                let allowed = def.bound.describe(def.ty);
                let value = text::parse_number(raw)
                    .filter(|v| v.fract() == 0.0 && def.bound.accepts(*v))
                    .ok_or_else(|| allowed.clone())?;
                if def.ty == ParameterType::UnsignedInt {
                    if value < 0.0 {
                        return Err(Bound::NonNegative.describe(def.ty));
                    }
                    Ok(PropertyValue::UnsignedInt(value as u64))
                } else {
                    Ok(PropertyValue::Integer(value as i64))
                }
            }
            ParameterType::Real => text::parse_number(raw)
                .filter(|v| def.bound.accepts(*v))
                .map(PropertyValue::Real)
                .ok_or_else(|| def.bound.describe(def.ty)),
            ParameterType::Rmatrix => Rmatrix::parse(raw)
                .map(PropertyValue::Rmatrix)
                .map_err(|_| "Array of Real Numbers such as [1 2 3]".to_string()),
            ParameterType::String | ParameterType::Filename => {
                let value = text::strip_quotes(raw);
                if !text::is_quotable(value) {
                    return Err(UNQUOTABLE.to_string());
                }
                Ok(if def.ty == ParameterType::String {
                    PropertyValue::String(value.to_string())
                } else {
                    PropertyValue::Filename(value.to_string())
                })
            }
            ParameterType::Enumeration => {
                let value = text::strip_quotes(raw);
                if def.allowed.is_empty() || def.allowed.contains(&value) {
                    Ok(PropertyValue::Enumeration(value.to_string()))
                } else {
                    Err(def.allowed.join(", "))
                }
            }
            ParameterType::Boolean => parse_bool(raw)
                .map(PropertyValue::Boolean)
                .ok_or_else(|| "true, false".to_string()),
            ParameterType::BooleanArray => {
                let items = list_items(raw);
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(parse_bool(&item).ok_or_else(|| {
                        "Array of booleans such as [true false]".to_string()
                    })?);
                }
                Ok(PropertyValue::BooleanArray(values))
            }
            ParameterType::OnOff => match raw {
                "On" => Ok(PropertyValue::OnOff(true)),
                "Off" => Ok(PropertyValue::OnOff(false)),
                _ => Err("On, Off".to_string()),
            },
            ParameterType::Object => {
                let name = text::strip_quotes(raw);
                if def.allowed.contains(&name) || text::is_valid_name(name) {
                    Ok(PropertyValue::Object(name.to_string()))
                } else {
                    Err(reference_description(def))
                }
            }
            ParameterType::ObjectArray => {
                let items = list_items(raw);
                if items.iter().any(|n| !text::is_valid_name(n)) {
                    return Err(format!("List of {}", reference_description(def)));
                }
                Ok(PropertyValue::ObjectArray(items))
            }
            ParameterType::StringArray => {
                let items = list_items(raw);
                if !items.iter().all(|item| text::is_quotable(item)) {
                    return Err(UNQUOTABLE.to_string());
                }
                Ok(PropertyValue::StringArray(items))
            }
        }
    }
}

impl PropertyValue {
    /// Convert into the type `def` declares, enforcing its allowed set
    /// and numeric domain.
    pub fn coerce(self, def: &PropertyDef) -> Result<Self, String> {
        if self.parameter_type() != def.ty {
            return Self::from_script(def, &self.to_script_string());
        }
        match &self {
            PropertyValue::Enumeration(s)
                if !def.allowed.is_empty() && !def.allowed.contains(&s.as_str()) =>
            {
                Err(def.allowed.join(", "))
            }
            PropertyValue::Real(v) if !def.bound.accepts(*v) => Err(def.bound.describe(def.ty)),
            PropertyValue::Integer(v) if !def.bound.accepts(*v as f64) => {
                Err(def.bound.describe(def.ty))
            }
            _ => Ok(self),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) | PropertyValue::Filename(s) => f.write_str(s),
            other => f.write_str(&other.to_script_string()),
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Real(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

fn reference_description(def: &PropertyDef) -> String {
    let kind = def.object_type.unwrap_or("object");
    if def.allowed.is_empty() {
        format!("{} name", kind)
    } else {
        format!("{} name or {}", kind, def.allowed.join(", "))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Items of `{a, b}`, `[a b]` or a single bare item, quotes removed.
fn list_items(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .or_else(|| trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')))
        .unwrap_or(trimmed);
    text::split_list(inner)
        .into_iter()
        .map(|s| text::strip_quotes(&s).to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Shortest text that reads back to the same real.
pub(crate) fn format_real(v: f64) -> String {
    format!("{}", v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rmatrix_parse_rows() {
        let m = Rmatrix::parse("[1 2 3; 4 5 6]").expect("parses");
        assert_eq!((m.rows(), m.cols()), (2, 3));
        assert_eq!(m.get(1, 2), Some(6.0));
        assert_eq!(m.to_string(), "[1 2 3; 4 5 6]");
    }

    #[test]
    fn test_rmatrix_ragged_rows_rejected() {
        assert!(Rmatrix::parse("[1 2; 3]").is_err());
    }

    #[test]
    fn test_enumeration_lists_allowed() {
        let def = PropertyDef::enumeration("Axes", "VNB", &["VNB", "LVLH"]);
        let err = PropertyValue::from_script(&def, "'Bad'").unwrap_err();
        assert_eq!(err, "VNB, LVLH");
        let ok = PropertyValue::from_script(&def, "'LVLH'").expect("quoted label accepted");
        assert_eq!(ok, PropertyValue::Enumeration("LVLH".to_string()));
    }

    #[test]
    fn test_on_off_is_exact() {
        let def = PropertyDef::on_off("SRP", false);
        assert_eq!(
            PropertyValue::from_script(&def, "On"),
            Ok(PropertyValue::OnOff(true))
        );
        assert!(PropertyValue::from_script(&def, "on").is_err());
        assert!(PropertyValue::from_script(&def, "true").is_err());
    }

    #[test]
    fn test_bounded_real() {
        let def = PropertyDef::real("DryMass", 850.0).bounded(Bound::NonNegative);
        assert!(PropertyValue::from_script(&def, "-1").is_err());
        assert_eq!(
            PropertyValue::from_script(&def, "12.5"),
            Ok(PropertyValue::Real(12.5))
        );
    }

    #[test]
    fn test_object_array_items() {
        let def = PropertyDef::object_array("PointMasses", &[], "CelestialBody");
        let value = PropertyValue::from_script(&def, "{Luna, Sun}").expect("list");
        assert_eq!(value.names(), vec!["Luna", "Sun"]);
        assert_eq!(value.to_script_string(), "{Luna, Sun}");
    }

    #[test]
    fn test_boolean_is_exact() {
        let def = PropertyDef::boolean("Publish", false);
        assert_eq!(
            PropertyValue::from_script(&def, "true"),
            Ok(PropertyValue::Boolean(true))
        );
        assert_eq!(
            PropertyValue::from_script(&def, "TRUE"),
            Err("true, false".to_string())
        );
        assert!(PropertyValue::from_script(&def, "False").is_err());
    }

    #[test]
    fn test_string_with_single_quote_writes_back() {
        let def = PropertyDef::string("Id", "");
        let value = PropertyValue::from_script(&def, "\"Sat's probe\"").expect("double quoted");
        assert_eq!(value.as_str(), Some("Sat's probe"));
        let written = value.to_script_string();
        assert_eq!(written, "\"Sat's probe\"");
        assert_eq!(PropertyValue::from_script(&def, &written), Ok(value));
    }

    #[test]
    fn test_string_with_both_quotes_rejected() {
        let def = PropertyDef::string("Id", "");
        let err = PropertyValue::from_script(&def, "'it's \"odd\"'").unwrap_err();
        assert_eq!(err, UNQUOTABLE);
    }

    #[test]
    fn test_string_strips_one_quote_layer() {
        let def = PropertyDef::string("Id", "");
        assert_eq!(
            PropertyValue::from_script(&def, "'a'b''"),
            Ok(PropertyValue::String("a'b'".to_string()))
        );
    }
}
