//! Parameter objects: user variables, arrays and strings, and the
//! system parameters derived from other objects (`Sat1.Earth.ECC`).

use std::any::Any;
use std::sync::LazyLock;

use regex::Regex;

use super::{rename_in_chain, ConfiguredObject, ObjectCore, ObjectRef, ObjectType, SetOutcome};
use crate::error::{Result, ScriptError};
use crate::parameter_db::ParameterDatabase;
use crate::property::{PropertyDef, PropertyId, PropertyTable, PropertyValue, Rmatrix};

static VARIABLE_TABLE: PropertyTable = PropertyTable {
    type_name: "Variable",
    parent: None,
    properties: &[
        PropertyDef::real("Value", 0.0),
        PropertyDef::string("Expression", "0").read_only(),
    ],
    aliases: &[],
};

static ARRAY_TABLE: PropertyTable = PropertyTable {
    type_name: "Array",
    parent: None,
    properties: &[
        PropertyDef::unsigned("NumRows", 1).read_only(),
        PropertyDef::unsigned("NumCols", 1).read_only(),
        PropertyDef::rmatrix("Value", &[0.0]),
    ],
    aliases: &[],
};

static STRING_TABLE: PropertyTable = PropertyTable {
    type_name: "String",
    parent: None,
    properties: &[PropertyDef::string("Value", "")],
    aliases: &[],
};

static SYSTEM_PARAMETER_TABLE: PropertyTable = PropertyTable {
    type_name: "Parameter",
    parent: None,
    properties: &[
        PropertyDef::string("Owner", "").read_only(),
        PropertyDef::string("Dependency", "").read_only(),
        PropertyDef::string("Type", "").read_only(),
    ],
    aliases: &[],
};

const VALUE: PropertyId = 0;
const EXPRESSION: PropertyId = 1;

/// A real-valued user variable.
///
/// Keeps the literal text it was last assigned so the script writer can
/// reproduce `x = 2*pi` rather than `x = 6.283185307179586`.
#[derive(Debug, Clone)]
pub struct Variable {
    core: ObjectCore,
    values: Vec<PropertyValue>,
    operands: ParameterDatabase,
}

impl Variable {
    /// A variable holding zero.
    pub fn new(name: &str) -> Self {
        Self {
            core: ObjectCore::new(ObjectType::Variable, name),
            values: vec![PropertyValue::Real(0.0), PropertyValue::String("0".to_string())],
            operands: ParameterDatabase::new(),
        }
    }

    /// Current numeric value.
    pub fn value(&self) -> f64 {
        self.values[VALUE].as_real().unwrap_or(0.0)
    }

    /// Text the value was assigned from.
    pub fn expression(&self) -> &str {
        self.values[EXPRESSION].as_str().unwrap_or("")
    }

    /// Parameters the expression depends on.
    pub fn operands(&self) -> &ParameterDatabase {
        &self.operands
    }

    /// Mutable access to the operand registry, for binding.
    pub fn operands_mut(&mut self) -> &mut ParameterDatabase {
        &mut self.operands
    }

    /// Store a plain number.
    pub fn set_real(&mut self, value: f64) {
        self.values[VALUE] = PropertyValue::Real(value);
        self.values[EXPRESSION] = PropertyValue::String(crate::property::format_real(value));
        self.operands = ParameterDatabase::new();
    }

    /// Store an expression, its value when it could be computed, and the
    /// names of the parameters it reads.
    pub fn set_expression<'a>(
        &mut self,
        expression: &str,
        value: Option<f64>,
        operands: impl IntoIterator<Item = &'a str>,
    ) {
        if let Some(v) = value {
            self.values[VALUE] = PropertyValue::Real(v);
        }
        self.values[EXPRESSION] = PropertyValue::String(expression.trim().to_string());
        self.operands = ParameterDatabase::new();
        for name in operands {
            self.operands.add(name);
        }
    }
}

impl ConfiguredObject for Variable {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn table(&self) -> &'static PropertyTable {
        &VARIABLE_TABLE
    }

    fn raw_value(&self, id: PropertyId) -> Option<&PropertyValue> {
        self.values.get(id)
    }

    fn raw_value_mut(&mut self, id: PropertyId) -> Option<&mut PropertyValue> {
        self.values.get_mut(id)
    }

    fn clone_object(&self) -> Box<dyn ConfiguredObject> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn set_value(&mut self, id: PropertyId, value: PropertyValue) -> Result<SetOutcome> {
        self.check_writable(id)?;
        let shown = value.to_string();
        match value.as_real() {
            Some(v) if id == VALUE => {
                self.set_real(v);
                Ok(SetOutcome::Applied)
            }
            _ => Err(ScriptError::InvalidValue {
                object: self.name().to_string(),
                field: self.parameter_label(id).unwrap_or("Value").to_string(),
                value: shown,
                allowed: "Real Number".to_string(),
            }),
        }
    }

    fn referenced_objects(&self) -> Vec<ObjectRef> {
        self.operands
            .names()
            .map(|name| ObjectRef {
                field: "Expression".to_string(),
                name: name.to_string(),
                expected: "Parameter",
            })
            .collect()
    }

    fn rename_reference(&mut self, old: &str, new: &str) -> bool {
        let mut changed = false;
        if let Some(renamed) = rename_word(self.expression(), old, new) {
            self.values[EXPRESSION] = PropertyValue::String(renamed);
            changed = true;
        }
        let names: Vec<String> = self.operands.names().map(str::to_string).collect();
        for name in names {
            if let Some(renamed) = rename_in_chain(&name, old, new) {
                changed |= self.operands.rename(&name, &renamed).is_ok();
            }
        }
        changed
    }
}

/// A real matrix with fixed dimensions.
#[derive(Debug, Clone)]
pub struct Array {
    core: ObjectCore,
    values: Vec<PropertyValue>,
    initialized: bool,
}

impl Array {
    /// A zero matrix of the given size.
    pub fn new(name: &str, rows: usize, cols: usize) -> Self {
        Self {
            core: ObjectCore::new(ObjectType::Array, name),
            values: vec![
                PropertyValue::UnsignedInt(rows as u64),
                PropertyValue::UnsignedInt(cols as u64),
                PropertyValue::Rmatrix(Rmatrix::zeros(rows, cols)),
            ],
            initialized: false,
        }
    }

    /// Declared row count.
    pub fn rows(&self) -> usize {
        self.matrix().rows()
    }

    /// Declared column count.
    pub fn cols(&self) -> usize {
        self.matrix().cols()
    }

    /// Whether any element was assigned since creation.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The elements.
    pub fn matrix(&self) -> &Rmatrix {
        static EMPTY: LazyLock<Rmatrix> = LazyLock::new(|| Rmatrix::zeros(0, 0));
        match &self.values[2] {
            PropertyValue::Rmatrix(m) => m,
            _ => &EMPTY,
        }
    }

    /// Element at one-based script indices.
    pub fn element(&self, row: i64, col: i64) -> Result<f64> {
        let (r, c) = self.index(row, col)?;
        self.matrix()
            .get(r, c)
            .ok_or_else(|| self.out_of_range(row, col))
    }

    /// Set the element at one-based script indices.
    pub fn set_element(&mut self, row: i64, col: i64, value: f64) -> Result<()> {
        let (r, c) = self.index(row, col)?;
        let stored = match &mut self.values[2] {
            PropertyValue::Rmatrix(m) => m.set(r, c, value),
            _ => false,
        };
        if !stored {
            return Err(self.out_of_range(row, col));
        }
        self.initialized = true;
        Ok(())
    }

    /// Replace every element; the dimensions must match the declaration.
    pub fn set_matrix(&mut self, matrix: Rmatrix) -> Result<()> {
        if matrix.rows() != self.rows() || matrix.cols() != self.cols() {
            return Err(ScriptError::Reference(format!(
                "Cannot assign a {}x{} value to the {}x{} array \"{}\"",
                matrix.rows(),
                matrix.cols(),
                self.rows(),
                self.cols(),
                self.name()
            )));
        }
        self.values[2] = PropertyValue::Rmatrix(matrix);
        self.initialized = true;
        Ok(())
    }

    fn index(&self, row: i64, col: i64) -> Result<(usize, usize)> {
        if row < 1 || col < 1 || row as usize > self.rows() || col as usize > self.cols() {
            return Err(self.out_of_range(row, col));
        }
        Ok((row as usize - 1, col as usize - 1))
    }

    fn out_of_range(&self, row: i64, col: i64) -> ScriptError {
        ScriptError::IndexOutOfRange {
            array: self.name().to_string(),
            row,
            col,
            rows: self.rows(),
            cols: self.cols(),
        }
    }
}

impl ConfiguredObject for Array {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn table(&self) -> &'static PropertyTable {
        &ARRAY_TABLE
    }

    fn raw_value(&self, id: PropertyId) -> Option<&PropertyValue> {
        self.values.get(id)
    }

    fn raw_value_mut(&mut self, id: PropertyId) -> Option<&mut PropertyValue> {
        self.values.get_mut(id)
    }

    fn clone_object(&self) -> Box<dyn ConfiguredObject> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn set_value(&mut self, id: PropertyId, value: PropertyValue) -> Result<SetOutcome> {
        let def = self.table().def(id).ok_or_else(|| self.unknown_id(id))?;
        self.check_writable(id)?;
        let shown = value.to_string();
        match value.coerce(def) {
            Ok(PropertyValue::Rmatrix(m)) => {
                self.set_matrix(m)?;
                Ok(SetOutcome::Applied)
            }
            Ok(_) | Err(_) => Err(ScriptError::InvalidValue {
                object: self.name().to_string(),
                field: def.label.to_string(),
                value: shown,
                allowed: format!("Array of {}x{} Real Numbers", self.rows(), self.cols()),
            }),
        }
    }
}

/// A text user variable.
#[derive(Debug, Clone)]
pub struct StringVar {
    core: ObjectCore,
    values: Vec<PropertyValue>,
}

impl StringVar {
    /// An empty string.
    pub fn new(name: &str) -> Self {
        Self {
            core: ObjectCore::new(ObjectType::String, name),
            values: vec![PropertyValue::String(String::new())],
        }
    }

    /// Current text.
    pub fn value(&self) -> &str {
        self.values[0].as_str().unwrap_or("")
    }

    /// Replace the text.
    pub fn set_string(&mut self, value: &str) {
        self.values[0] = PropertyValue::String(value.to_string());
    }
}

impl ConfiguredObject for StringVar {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn table(&self) -> &'static PropertyTable {
        &STRING_TABLE
    }

    fn raw_value(&self, id: PropertyId) -> Option<&PropertyValue> {
        self.values.get(id)
    }

    fn raw_value_mut(&mut self, id: PropertyId) -> Option<&mut PropertyValue> {
        self.values.get_mut(id)
    }

    fn clone_object(&self) -> Box<dyn ConfiguredObject> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// What the middle segment of `owner.dependency.type` names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    /// `owner.type`.
    None,
    /// A coordinate system, as in `Sat1.EarthMJ2000Eq.X`.
    CoordinateSystem,
    /// A central body, as in `Sat1.Earth.SMA`.
    CentralBody,
}

impl DependencyKind {
    /// Type the dependency object must satisfy.
    pub fn expected_type(&self) -> Option<&'static str> {
        match self {
            DependencyKind::None => None,
            DependencyKind::CoordinateSystem => Some("CoordinateSystem"),
            DependencyKind::CentralBody => Some("CelestialBody"),
        }
    }
}

/// Catalogue entry of a system parameter type.
#[derive(Debug, Clone, Copy)]
pub struct ParameterInfo {
    /// Type name, the last segment of the parameter name.
    pub type_name: &'static str,
    /// Type the owner must satisfy.
    pub owner_type: &'static str,
    /// Kind of the dependency segment.
    pub dependency: DependencyKind,
    /// Dependency used when the name omits it.
    pub default_dependency: &'static str,
    /// Owner field that holds the value, for directly stored quantities.
    pub owner_field: Option<&'static str>,
}

const fn info(
    type_name: &'static str,
    owner_type: &'static str,
    dependency: DependencyKind,
    default_dependency: &'static str,
    owner_field: Option<&'static str>,
) -> ParameterInfo {
    ParameterInfo {
        type_name,
        owner_type,
        dependency,
        default_dependency,
        owner_field,
    }
}

static CATALOGUE: &[ParameterInfo] = &[
    info("X", "Spacecraft", DependencyKind::CoordinateSystem, "EarthMJ2000Eq", Some("X")),
    info("Y", "Spacecraft", DependencyKind::CoordinateSystem, "EarthMJ2000Eq", Some("Y")),
    info("Z", "Spacecraft", DependencyKind::CoordinateSystem, "EarthMJ2000Eq", Some("Z")),
    info("VX", "Spacecraft", DependencyKind::CoordinateSystem, "EarthMJ2000Eq", Some("VX")),
    info("VY", "Spacecraft", DependencyKind::CoordinateSystem, "EarthMJ2000Eq", Some("VY")),
    info("VZ", "Spacecraft", DependencyKind::CoordinateSystem, "EarthMJ2000Eq", Some("VZ")),
    info("RMAG", "Spacecraft", DependencyKind::CentralBody, "Earth", None),
    info("VMAG", "Spacecraft", DependencyKind::CentralBody, "Earth", None),
    info("SMA", "Spacecraft", DependencyKind::CentralBody, "Earth", None),
    info("ECC", "Spacecraft", DependencyKind::CentralBody, "Earth", None),
    info("ElapsedSecs", "Spacecraft", DependencyKind::None, "", None),
    info("ElapsedDays", "Spacecraft", DependencyKind::None, "", None),
    info("DryMass", "Spacecraft", DependencyKind::None, "", Some("DryMass")),
    info("TotalMass", "Spacecraft", DependencyKind::None, "", None),
    info("FuelMass", "FuelTank", DependencyKind::None, "", Some("FuelMass")),
];

/// Catalogue entry for a parameter type name.
pub fn parameter_info(type_name: &str) -> Option<&'static ParameterInfo> {
    CATALOGUE.iter().find(|i| i.type_name == type_name)
}

impl ParameterInfo {
    /// Value computed from a Cartesian state `[x, y, z, vx, vy, vz]` and
    /// the gravitational parameter of the central body.
    pub fn from_state(&self, state: &[f64; 6], mu: f64) -> Option<f64> {
        let r = (state[0].powi(2) + state[1].powi(2) + state[2].powi(2)).sqrt();
        let v = (state[3].powi(2) + state[4].powi(2) + state[5].powi(2)).sqrt();
        match self.type_name {
            "X" => Some(state[0]),
            "Y" => Some(state[1]),
            "Z" => Some(state[2]),
            "VX" => Some(state[3]),
            "VY" => Some(state[4]),
            "VZ" => Some(state[5]),
            "RMAG" => Some(r),
            "VMAG" => Some(v),
            "SMA" if r > 0.0 => {
                let energy = v * v / 2.0 - mu / r;
                (energy != 0.0).then(|| -mu / (2.0 * energy))
            }
            "ECC" if r > 0.0 && mu > 0.0 => {
                let rv = state[0] * state[3] + state[1] * state[4] + state[2] * state[5];
                let scale = v * v - mu / r;
                let e: Vec<f64> = (0..3)
                    .map(|i| (scale * state[i] - rv * state[i + 3]) / mu)
                    .collect();
                Some((e[0].powi(2) + e[1].powi(2) + e[2].powi(2)).sqrt())
            }
            "ElapsedSecs" | "ElapsedDays" => Some(0.0),
            _ => None,
        }
    }
}

/// A derived quantity of another object, named `owner.dependency.type`
/// or `owner.type`.
#[derive(Debug, Clone)]
pub struct SystemParameter {
    core: ObjectCore,
    info: &'static ParameterInfo,
    values: Vec<PropertyValue>,
}

impl SystemParameter {
    /// Create the parameter `owner[.dependency].param_type`.
    ///
    /// A missing dependency takes the catalogue default; a dependency on a
    /// type that takes none is an error.
    pub fn new(owner: &str, dependency: Option<&str>, param_type: &str) -> Result<Self> {
        let info = parameter_info(param_type).ok_or_else(|| {
            ScriptError::UnknownParameter {
                object: owner.to_string(),
                type_name: "Parameter".to_string(),
                label: param_type.to_string(),
            }
        })?;
        let dependency = match (info.dependency, dependency) {
            (DependencyKind::None, Some(dep)) => {
                return Err(ScriptError::Reference(format!(
                    "The parameter {} takes no dependency, but \"{}\" was given",
                    param_type, dep
                )))
            }
            (DependencyKind::None, None) => String::new(),
            (_, Some(dep)) => dep.to_string(),
            (_, None) => info.default_dependency.to_string(),
        };
        let name = Self::compose_name(owner, &dependency, param_type);
        Ok(Self {
            core: ObjectCore::new(ObjectType::Parameter, &name),
            info,
            values: vec![
                PropertyValue::String(owner.to_string()),
                PropertyValue::String(dependency),
                PropertyValue::String(param_type.to_string()),
            ],
        })
    }

    /// The registered name of `owner[.dependency].type`.
    pub fn compose_name(owner: &str, dependency: &str, param_type: &str) -> String {
        if dependency.is_empty() {
            format!("{}.{}", owner, param_type)
        } else {
            format!("{}.{}.{}", owner, dependency, param_type)
        }
    }

    /// Owning object name.
    pub fn owner(&self) -> &str {
        self.values[0].as_str().unwrap_or("")
    }

    /// Dependency name, empty when the type takes none.
    pub fn dependency(&self) -> &str {
        self.values[1].as_str().unwrap_or("")
    }

    /// Parameter type name.
    pub fn param_type(&self) -> &str {
        self.values[2].as_str().unwrap_or("")
    }

    /// Catalogue entry.
    pub fn info(&self) -> &'static ParameterInfo {
        self.info
    }
}

impl ConfiguredObject for SystemParameter {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn table(&self) -> &'static PropertyTable {
        &SYSTEM_PARAMETER_TABLE
    }

    fn raw_value(&self, id: PropertyId) -> Option<&PropertyValue> {
        self.values.get(id)
    }

    fn raw_value_mut(&mut self, id: PropertyId) -> Option<&mut PropertyValue> {
        self.values.get_mut(id)
    }

    fn clone_object(&self) -> Box<dyn ConfiguredObject> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn referenced_objects(&self) -> Vec<ObjectRef> {
        let mut refs = vec![ObjectRef {
            field: "Owner".to_string(),
            name: self.owner().to_string(),
            expected: self.info.owner_type,
        }];
        if let Some(expected) = self.info.dependency.expected_type() {
            refs.push(ObjectRef {
                field: "Dependency".to_string(),
                name: self.dependency().to_string(),
                expected,
            });
        }
        refs
    }

    fn rename_reference(&mut self, old: &str, new: &str) -> bool {
        let mut changed = false;
        for slot in 0..2 {
            if self.values[slot].as_str() == Some(old) {
                self.values[slot] = PropertyValue::String(new.to_string());
                changed = true;
            }
        }
        if changed {
            let name = Self::compose_name(self.owner(), self.dependency(), self.param_type());
            self.set_name(&name);
        }
        changed
    }
}

/// Replace whole-word occurrences of `old` that are not a field label
/// (preceded by `.`).
fn rename_word(text: &str, old: &str, new: &str) -> Option<String> {
    static WORD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("valid word regex"));
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut changed = false;
    for m in WORD_RE.find_iter(text) {
        let preceded_by_dot = text[..m.start()].ends_with('.');
        out.push_str(&text[last..m.start()]);
        if m.as_str() == old && !preceded_by_dot {
            out.push_str(new);
            changed = true;
        } else {
            out.push_str(m.as_str());
        }
        last = m.end();
    }
    out.push_str(&text[last..]);
    changed.then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_keeps_expression_text() {
        let mut x = Variable::new("x");
        x.set_expression("2 * Sat1.X", Some(14200.0), ["Sat1.X"]);
        assert_eq!(x.value(), 14200.0);
        assert_eq!(x.expression(), "2 * Sat1.X");
        assert!(x.rename_reference("Sat1", "Sat9"));
        assert_eq!(x.expression(), "2 * Sat9.X");
        assert!(x.operands().contains("Sat9.X"));
    }

    #[test]
    fn test_rename_word_skips_labels() {
        assert_eq!(rename_word("a.X + X", "X", "Y"), Some("a.X + Y".to_string()));
        assert_eq!(rename_word("XX + 1", "X", "Y"), None);
    }

    #[test]
    fn test_array_indices_are_one_based() {
        let mut a = Array::new("A", 2, 3);
        a.set_element(2, 3, 5.0).expect("in range");
        assert_eq!(a.element(2, 3).ok(), Some(5.0));
        assert!(matches!(
            a.set_element(0, 1, 1.0),
            Err(ScriptError::IndexOutOfRange { row: 0, .. })
        ));
        assert!(a.element(-1, 1).is_err());
        assert!(a.element(3, 1).is_err());
        assert!(a.is_initialized());
    }

    #[test]
    fn test_array_dimensions_are_fixed() {
        let mut a = Array::new("A", 1, 3);
        assert!(a.set_matrix(Rmatrix::row(&[1.0, 2.0])).is_err());
        let id = a.parameter_id("NumRows").expect("field").id;
        assert!(matches!(
            a.set_value(id, PropertyValue::UnsignedInt(4)),
            Err(ScriptError::ReadOnly { .. })
        ));
    }

    #[test]
    fn test_system_parameter_names() {
        let p = SystemParameter::new("Sat1", None, "ECC").expect("known type");
        assert_eq!(p.name(), "Sat1.Earth.ECC");
        let mass = SystemParameter::new("Sat1", None, "DryMass").expect("known type");
        assert_eq!(mass.name(), "Sat1.DryMass");
        assert!(SystemParameter::new("Sat1", Some("Earth"), "DryMass").is_err());
        assert!(SystemParameter::new("Sat1", None, "Bogus").is_err());
    }

    #[test]
    fn test_system_parameter_rename_owner() {
        let mut p = SystemParameter::new("Sat1", Some("EarthMJ2000Eq"), "X").expect("known");
        assert!(p.rename_reference("Sat1", "Sat2"));
        assert_eq!(p.name(), "Sat2.EarthMJ2000Eq.X");
        let refs = p.referenced_objects();
        assert_eq!(refs[1].expected, "CoordinateSystem");
    }

    #[test]
    fn test_circular_orbit_elements() {
        let mu = 398600.4415;
        let r: f64 = 7000.0;
        let v = (mu / r).sqrt();
        let state = [r, 0.0, 0.0, 0.0, v, 0.0];
        let sma = parameter_info("SMA").and_then(|i| i.from_state(&state, mu));
        let ecc = parameter_info("ECC").and_then(|i| i.from_state(&state, mu));
        assert!((sma.unwrap_or(0.0) - r).abs() < 1e-6);
        assert!(ecc.unwrap_or(1.0) < 1e-9);
    }
}
