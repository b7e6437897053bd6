//! Configured objects and the reflection contract they share.
//!
//! Domain objects are table driven: a [`TypeSpec`] pairs an
//! [`ObjectType`] with its static [`PropertyTable`] and optional hooks for
//! state-dependent read-only fields, value translation and object-level
//! validation. Parameter objects (variables, arrays, strings and system
//! parameters) carry extra state and implement [`ConfiguredObject`]
//! directly.

mod burn;
mod frames;
mod function;
mod hardware;
mod parameter;
mod points;
mod propagation;
mod solver;
mod spacecraft;
mod subscriber;

pub use burn::{FINITE_BURN, IMPULSIVE_BURN};
pub use frames::{default_coordinate_systems, COORDINATE_SYSTEM};
pub use function::{FunctionHeader, GMAT_FUNCTION, MATLAB_FUNCTION};
pub use hardware::{CHEMICAL_TANK, CHEMICAL_THRUSTER};
pub use parameter::{
    parameter_info, Array, DependencyKind, ParameterInfo, StringVar, SystemParameter, Variable,
};
pub use points::{BARYCENTER, CELESTIAL_BODY, GROUND_STATION, LIBRATION_POINT};
pub use propagation::{FORCE_MODEL, FORCE_MODEL_SUFFIX, PROPAGATOR};
pub use solver::{DIFFERENTIAL_CORRECTOR, YUKON};
pub use spacecraft::SPACECRAFT;
pub use subscriber::REPORT_FILE;

use std::any::Any;
use std::fmt;

use indexmap::IndexMap;

use crate::error::{Result, ScriptError};
use crate::property::{LabelMatch, ParameterType, PropertyId, PropertyTable, PropertyValue};

/// Which store issued an [`ObjectId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The session-wide configuration registry.
    Global,
    /// Objects created inside a function body.
    Function,
    /// Celestial bodies owned by the solar system.
    SolarSystem,
}

/// Stable handle to a registered object.
///
/// Identity survives renames; a handle to a removed object resolves to
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId {
    pub(crate) scope: Scope,
    pub(crate) slot: usize,
}

impl ObjectId {
    /// Store that issued this handle.
    pub fn scope(&self) -> Scope {
        self.scope
    }
}

/// Broad grouping used by the factory and the script writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectCategory {
    /// Spacecraft.
    SpaceObject,
    /// Tanks and thrusters.
    Hardware,
    /// Force models.
    ForceModel,
    /// Propagators.
    Propagator,
    /// Impulsive and finite burns.
    Burn,
    /// Coordinate systems.
    CoordinateSystem,
    /// Celestial bodies, calculated points and ground stations.
    SpacePoint,
    /// Targeters and optimizers.
    Solver,
    /// Report files.
    Subscriber,
    /// Variables, arrays, strings and system parameters.
    Parameter,
    /// User-defined and external functions.
    Function,
}

impl ObjectCategory {
    /// Category name as used by `Factory::list_of_items`.
    pub fn name(&self) -> &'static str {
        match self {
            ObjectCategory::SpaceObject => "SpaceObject",
            ObjectCategory::Hardware => "Hardware",
            ObjectCategory::ForceModel => "ODEModel",
            ObjectCategory::Propagator => "PropSetup",
            ObjectCategory::Burn => "Burn",
            ObjectCategory::CoordinateSystem => "CoordinateSystem",
            ObjectCategory::SpacePoint => "SpacePoint",
            ObjectCategory::Solver => "Solver",
            ObjectCategory::Subscriber => "Subscriber",
            ObjectCategory::Parameter => "Parameter",
            ObjectCategory::Function => "Function",
        }
    }
}

/// Concrete type of a configured object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    /// Spacecraft.
    Spacecraft,
    /// Propellant tank.
    ChemicalTank,
    /// Chemical thruster.
    ChemicalThruster,
    /// Impulsive maneuver.
    ImpulsiveBurn,
    /// Finite maneuver.
    FiniteBurn,
    /// Coordinate system.
    CoordinateSystem,
    /// Force model (ODE model).
    ForceModel,
    /// Propagator (prop setup).
    Propagator,
    /// Solar-system body.
    CelestialBody,
    /// Mass-weighted point of several bodies.
    Barycenter,
    /// Libration point of a two-body system.
    LibrationPoint,
    /// Body-fixed point.
    GroundStation,
    /// Targeting solver.
    DifferentialCorrector,
    /// Optimizer.
    Yukon,
    /// Report output.
    ReportFile,
    /// Script-defined function.
    GmatFunction,
    /// Function executed by an external engine.
    MatlabFunction,
    /// User real variable.
    Variable,
    /// User real matrix.
    Array,
    /// User string.
    String,
    /// Derived parameter such as `Sat1.Earth.ECC`.
    Parameter,
}

impl ObjectType {
    /// Every creatable type.
    pub const ALL: &'static [ObjectType] = &[
        ObjectType::Spacecraft,
        ObjectType::ChemicalTank,
        ObjectType::ChemicalThruster,
        ObjectType::ImpulsiveBurn,
        ObjectType::FiniteBurn,
        ObjectType::CoordinateSystem,
        ObjectType::ForceModel,
        ObjectType::Propagator,
        ObjectType::Barycenter,
        ObjectType::LibrationPoint,
        ObjectType::GroundStation,
        ObjectType::DifferentialCorrector,
        ObjectType::Yukon,
        ObjectType::ReportFile,
        ObjectType::GmatFunction,
        ObjectType::MatlabFunction,
        ObjectType::Variable,
        ObjectType::Array,
        ObjectType::String,
    ];

    /// Script type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            ObjectType::Spacecraft => "Spacecraft",
            ObjectType::ChemicalTank => "ChemicalTank",
            ObjectType::ChemicalThruster => "ChemicalThruster",
            ObjectType::ImpulsiveBurn => "ImpulsiveBurn",
            ObjectType::FiniteBurn => "FiniteBurn",
            ObjectType::CoordinateSystem => "CoordinateSystem",
            ObjectType::ForceModel => "ForceModel",
            ObjectType::Propagator => "Propagator",
            ObjectType::CelestialBody => "CelestialBody",
            ObjectType::Barycenter => "Barycenter",
            ObjectType::LibrationPoint => "LibrationPoint",
            ObjectType::GroundStation => "GroundStation",
            ObjectType::DifferentialCorrector => "DifferentialCorrector",
            ObjectType::Yukon => "Yukon",
            ObjectType::ReportFile => "ReportFile",
            ObjectType::GmatFunction => "GmatFunction",
            ObjectType::MatlabFunction => "MatlabFunction",
            ObjectType::Variable => "Variable",
            ObjectType::Array => "Array",
            ObjectType::String => "String",
            ObjectType::Parameter => "Parameter",
        }
    }

    /// Look up a type by its script name.
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .chain([ObjectType::CelestialBody, ObjectType::Parameter].iter())
            .copied()
            .find(|t| t.type_name() == name)
    }

    /// Abstract types this type satisfies besides its own name.
    pub fn supertypes(&self) -> &'static [&'static str] {
        match self {
            ObjectType::Spacecraft => &["SpacePoint", "SpaceObject"],
            ObjectType::ChemicalTank => &["Hardware", "FuelTank"],
            ObjectType::ChemicalThruster => &["Hardware", "Thruster"],
            ObjectType::ImpulsiveBurn | ObjectType::FiniteBurn => &["Burn"],
            ObjectType::CoordinateSystem => &[],
            ObjectType::ForceModel => &["ODEModel"],
            ObjectType::Propagator => &["PropSetup"],
            ObjectType::CelestialBody => &["SpacePoint"],
            ObjectType::Barycenter | ObjectType::LibrationPoint => {
                &["SpacePoint", "CalculatedPoint"]
            }
            ObjectType::GroundStation => &["SpacePoint", "BodyFixedPoint"],
            ObjectType::DifferentialCorrector => &["Solver", "Targeter"],
            ObjectType::Yukon => &["Solver", "Optimizer"],
            ObjectType::ReportFile => &["Subscriber"],
            ObjectType::GmatFunction | ObjectType::MatlabFunction => &["Function"],
            ObjectType::Variable | ObjectType::Array | ObjectType::String => &["Parameter"],
            ObjectType::Parameter => &["Parameter", "SystemParameter"],
        }
    }

    /// Whether this type is `expected` or derives from it.
    pub fn satisfies(&self, expected: &str) -> bool {
        self.type_name() == expected || self.supertypes().contains(&expected)
    }

    /// Grouping used by the factory and writer.
    pub fn category(&self) -> ObjectCategory {
        match self {
            ObjectType::Spacecraft => ObjectCategory::SpaceObject,
            ObjectType::ChemicalTank | ObjectType::ChemicalThruster => ObjectCategory::Hardware,
            ObjectType::ImpulsiveBurn | ObjectType::FiniteBurn => ObjectCategory::Burn,
            ObjectType::CoordinateSystem => ObjectCategory::CoordinateSystem,
            ObjectType::ForceModel => ObjectCategory::ForceModel,
            ObjectType::Propagator => ObjectCategory::Propagator,
            ObjectType::CelestialBody
            | ObjectType::Barycenter
            | ObjectType::LibrationPoint
            | ObjectType::GroundStation => ObjectCategory::SpacePoint,
            ObjectType::DifferentialCorrector | ObjectType::Yukon => ObjectCategory::Solver,
            ObjectType::ReportFile => ObjectCategory::Subscriber,
            ObjectType::GmatFunction | ObjectType::MatlabFunction => ObjectCategory::Function,
            ObjectType::Variable
            | ObjectType::Array
            | ObjectType::String
            | ObjectType::Parameter => ObjectCategory::Parameter,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A named reference one object holds to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    /// Field holding the reference.
    pub field: String,
    /// Referenced name.
    pub name: String,
    /// Type or category the referenced object must satisfy.
    pub expected: &'static str,
}

/// Outcome of a successful property write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    /// The value was stored.
    Applied,
    /// The value was stored or ignored, with a warning to show once per
    /// session under `key`.
    Warned {
        /// Deduplication key.
        key: String,
        /// Warning text.
        message: String,
    },
}

/// A legacy field value rewritten to its current form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Field that receives the value.
    pub id: PropertyId,
    /// Text to store.
    pub text: String,
    /// Warning shown once per session.
    pub warning: SetOutcome,
}

/// State shared by every configured object.
#[derive(Debug, Clone)]
pub struct ObjectCore {
    /// Unique name within its store.
    pub name: String,
    /// Concrete type.
    pub object_type: ObjectType,
    /// Survives `remove_non_global_items`.
    pub is_global: bool,
    /// Late-bound references, by referenced name.
    pub bindings: IndexMap<String, ObjectId>,
}

impl ObjectCore {
    /// Core for a new object.
    pub fn new(object_type: ObjectType, name: &str) -> Self {
        Self {
            name: name.to_string(),
            object_type,
            is_global: false,
            bindings: IndexMap::new(),
        }
    }
}

/// The reflection contract implemented by every configured object.
///
/// Fields are addressed by label or id through the object's
/// [`PropertyTable`]; values travel as [`PropertyValue`]s.
pub trait ConfiguredObject: fmt::Debug + Any {
    /// Shared state.
    fn core(&self) -> &ObjectCore;

    /// Shared state, mutable.
    fn core_mut(&mut self) -> &mut ObjectCore;

    /// Property table of this type.
    fn table(&self) -> &'static PropertyTable;

    /// Stored value of a property.
    fn raw_value(&self, id: PropertyId) -> Option<&PropertyValue>;

    /// Stored value of a property, mutable. Bypasses every check.
    fn raw_value_mut(&mut self, id: PropertyId) -> Option<&mut PropertyValue>;

    /// Deep copy.
    fn clone_object(&self) -> Box<dyn ConfiguredObject>;

    /// Downcasting support.
    fn as_any(&self) -> &dyn Any;

    /// Downcasting support.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Object name.
    fn name(&self) -> &str {
        &self.core().name
    }

    /// Rename the object itself. Registries must be updated separately.
    fn set_name(&mut self, name: &str) {
        self.core_mut().name = name.to_string();
    }

    /// Concrete type.
    fn object_type(&self) -> ObjectType {
        self.core().object_type
    }

    /// Script type name.
    fn type_name(&self) -> &'static str {
        self.object_type().type_name()
    }

    /// Whether the object survives clearing non-global items.
    fn is_global(&self) -> bool {
        self.core().is_global
    }

    /// Mark the object global.
    fn set_global(&mut self, global: bool) {
        self.core_mut().is_global = global;
    }

    /// Resolve a label through the table chain.
    fn parameter_id(&self, label: &str) -> Result<LabelMatch> {
        self.table()
            .lookup(label)
            .ok_or_else(|| ScriptError::UnknownParameter {
                object: self.name().to_string(),
                type_name: self.type_name().to_string(),
                label: label.to_string(),
            })
    }

    /// Label of an id.
    fn parameter_label(&self, id: PropertyId) -> Option<&'static str> {
        self.table().def(id).map(|d| d.label)
    }

    /// Value kind of an id.
    fn parameter_type(&self, id: PropertyId) -> Result<ParameterType> {
        self.table()
            .def(id)
            .map(|d| d.ty)
            .ok_or_else(|| self.unknown_id(id))
    }

    /// Whether the field rejects writes in the object's current state.
    fn is_parameter_read_only(&self, id: PropertyId) -> bool {
        self.table().def(id).map(|d| d.read_only).unwrap_or(true)
    }

    /// Current value of a field.
    fn get_value(&self, id: PropertyId) -> Result<PropertyValue> {
        self.raw_value(id).cloned().ok_or_else(|| self.unknown_id(id))
    }

    /// Legacy spellings of a field value: redirects `text` written to `id`
    /// to the field and text that should be stored instead, with a warning.
    fn translate_text(&self, _id: PropertyId, _text: &str) -> Option<Translation> {
        None
    }

    /// Write a field from script text.
    ///
    /// Applies legacy translations, coerces the text into the field's
    /// type and stores it through [`ConfiguredObject::set_value`].
    fn set_text(&mut self, id: PropertyId, text: &str) -> Result<SetOutcome> {
        let (id, text, note) = match self.translate_text(id, text) {
            Some(t) => (t.id, t.text, Some(t.warning)),
            None => (id, text.to_string(), None),
        };
        let def = self.table().def(id).ok_or_else(|| self.unknown_id(id))?;
        self.check_writable(id)?;
        if def.deprecated {
            return self.set_value(id, PropertyValue::empty(def.ty));
        }
        let value = PropertyValue::from_script(def, &text).map_err(|allowed| {
            ScriptError::InvalidValue {
                object: self.name().to_string(),
                field: def.label.to_string(),
                value: crate::interpreter::text::strip_quotes(&text).to_string(),
                allowed,
            }
        })?;
        let outcome = self.set_value(id, value)?;
        Ok(note.unwrap_or(outcome))
    }

    /// Fail with [`ScriptError::ReadOnly`] when the field rejects writes.
    fn check_writable(&self, id: PropertyId) -> Result<()> {
        if self.is_parameter_read_only(id) {
            return Err(ScriptError::ReadOnly {
                object: self.name().to_string(),
                field: self.parameter_label(id).unwrap_or("?").to_string(),
            });
        }
        Ok(())
    }

    /// Write a field, enforcing read-only state, type and allowed values.
    fn set_value(&mut self, id: PropertyId, value: PropertyValue) -> Result<SetOutcome> {
        let def = self.table().def(id).ok_or_else(|| self.unknown_id(id))?;
        self.check_writable(id)?;
        if def.deprecated {
            return Ok(SetOutcome::Warned {
                key: format!("{}.{}", self.type_name(), def.label),
                message: format!(
                    "The field \"{}\" of {} is deprecated and is ignored",
                    def.label,
                    self.type_name()
                ),
            });
        }
        let shown = value.to_string();
        let value = value.coerce(def).map_err(|allowed| ScriptError::InvalidValue {
            object: self.name().to_string(),
            field: def.label.to_string(),
            value: shown,
            allowed,
        })?;
        if let Some(slot) = self.raw_value_mut(id) {
            *slot = value;
        }
        Ok(SetOutcome::Applied)
    }

    /// Current value of a field by label.
    fn get_by_label(&self, label: &str) -> Result<PropertyValue> {
        let id = self.parameter_id(label)?.id;
        self.get_value(id)
    }

    /// Names this object refers to, with the type each must satisfy.
    fn referenced_objects(&self) -> Vec<ObjectRef> {
        let mut refs = Vec::new();
        for (id, def) in self.table().iter() {
            let Some(expected) = def.object_type else {
                continue;
            };
            if !def.ty.is_reference() {
                continue;
            }
            if let Some(value) = self.raw_value(id) {
                for name in value.names() {
                    if def.allowed.contains(&name) {
                        continue;
                    }
                    refs.push(ObjectRef {
                        field: def.label.to_string(),
                        name: name.to_string(),
                        expected,
                    });
                }
            }
        }
        refs
    }

    /// Rewrite references from `old` to `new`; true when anything changed.
    fn rename_reference(&mut self, old: &str, new: &str) -> bool {
        let mut changed = false;
        for id in 0..self.table().len() {
            let Some(value) = self.raw_value_mut(id) else {
                continue;
            };
            match value {
                PropertyValue::Object(name) if name.as_str() == old => {
                    *name = new.to_string();
                    changed = true;
                }
                PropertyValue::ObjectArray(names) | PropertyValue::StringArray(names) => {
                    for name in names.iter_mut() {
                        if let Some(renamed) = rename_in_chain(name, old, new) {
                            *name = renamed;
                            changed = true;
                        }
                    }
                }
                _ => {}
            }
        }
        if let Some(id) = self.core_mut().bindings.shift_remove(old) {
            self.core_mut().bindings.insert(new.to_string(), id);
            changed = true;
        }
        changed
    }

    /// Record the resolved handle of a referenced name.
    fn bind_reference(&mut self, name: &str, id: ObjectId) {
        self.core_mut().bindings.insert(name.to_string(), id);
    }

    /// Resolved handle of a referenced name.
    fn bound_reference(&self, name: &str) -> Option<ObjectId> {
        self.core().bindings.get(name).copied()
    }

    /// Object-level consistency problems.
    fn validate(&self) -> Vec<String> {
        Vec::new()
    }

    /// Script text that recreates this object.
    fn generating_string(&self) -> String {
        crate::writer::object_text(self)
    }

    #[doc(hidden)]
    fn unknown_id(&self, id: PropertyId) -> ScriptError {
        ScriptError::UnknownParameter {
            object: self.name().to_string(),
            type_name: self.type_name().to_string(),
            label: format!("#{}", id),
        }
    }
}

/// Rewrite a name or the owner segment of a dotted chain such as
/// `Sat1.Earth.ECC`.
pub(crate) fn rename_in_chain(text: &str, old: &str, new: &str) -> Option<String> {
    if text == old {
        return Some(new.to_string());
    }
    text.strip_prefix(old)
        .filter(|rest| rest.starts_with('.') || rest.starts_with('('))
        .map(|rest| format!("{}{}", new, rest))
}

/// Static description of a table-driven type.
#[derive(Debug)]
pub struct TypeSpec {
    /// Concrete type.
    pub object_type: ObjectType,
    /// Property table.
    pub table: &'static PropertyTable,
    /// Fields that become read-only depending on other fields.
    pub read_only: Option<fn(&TableObject, PropertyId) -> bool>,
    /// Legacy value spellings.
    pub translate: Option<fn(&TableObject, PropertyId, &str) -> Option<Translation>>,
    /// Object-level validation.
    pub validate: Option<fn(&TableObject) -> Vec<String>>,
}

impl TypeSpec {
    /// A type with no hooks.
    pub const fn plain(object_type: ObjectType, table: &'static PropertyTable) -> Self {
        Self {
            object_type,
            table,
            read_only: None,
            translate: None,
            validate: None,
        }
    }

    /// Create an object of this type with default values.
    pub fn instantiate(&'static self, name: &str) -> TableObject {
        TableObject {
            core: ObjectCore::new(self.object_type, name),
            spec: self,
            values: self
                .table
                .iter()
                .map(|(_, def)| PropertyValue::from_default(def))
                .collect(),
        }
    }
}

/// A configured object whose state is entirely described by its table.
#[derive(Debug, Clone)]
pub struct TableObject {
    core: ObjectCore,
    spec: &'static TypeSpec,
    values: Vec<PropertyValue>,
}

impl TableObject {
    /// Value of a field by label, if it exists.
    pub fn value_of(&self, label: &str) -> Option<&PropertyValue> {
        self.spec
            .table
            .lookup(label)
            .and_then(|m| self.values.get(m.id))
    }

    /// Text value of a field by label, or empty.
    pub fn text_of(&self, label: &str) -> &str {
        self.value_of(label).and_then(|v| v.as_str()).unwrap_or("")
    }

    /// Real value of a field by label.
    pub fn real_of(&self, label: &str) -> Option<f64> {
        self.value_of(label).and_then(|v| v.as_real())
    }

    /// Type description.
    pub fn spec(&self) -> &'static TypeSpec {
        self.spec
    }
}

impl ConfiguredObject for TableObject {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn table(&self) -> &'static PropertyTable {
        self.spec.table
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

    fn is_parameter_read_only(&self, id: PropertyId) -> bool {
        let fixed = self.spec.table.def(id).map(|d| d.read_only).unwrap_or(true);
        fixed || self.spec.read_only.is_some_and(|f| f(self, id))
    }

    fn translate_text(&self, id: PropertyId, text: &str) -> Option<Translation> {
        self.spec.translate.and_then(|f| f(self, id, text))
    }

    fn validate(&self) -> Vec<String> {
        self.spec.validate.map(|f| f(self)).unwrap_or_default()
    }
}

/// The table-driven spec for a type, when it has one.
pub fn type_spec(object_type: ObjectType) -> Option<&'static TypeSpec> {
    let spec = match object_type {
        ObjectType::Spacecraft => &SPACECRAFT,
        ObjectType::ChemicalTank => &CHEMICAL_TANK,
        ObjectType::ChemicalThruster => &CHEMICAL_THRUSTER,
        ObjectType::ImpulsiveBurn => &IMPULSIVE_BURN,
        ObjectType::FiniteBurn => &FINITE_BURN,
        ObjectType::CoordinateSystem => &COORDINATE_SYSTEM,
        ObjectType::ForceModel => &FORCE_MODEL,
        ObjectType::Propagator => &PROPAGATOR,
        ObjectType::CelestialBody => &CELESTIAL_BODY,
        ObjectType::Barycenter => &BARYCENTER,
        ObjectType::LibrationPoint => &LIBRATION_POINT,
        ObjectType::GroundStation => &GROUND_STATION,
        ObjectType::DifferentialCorrector => &DIFFERENTIAL_CORRECTOR,
        ObjectType::Yukon => &YUKON,
        ObjectType::ReportFile => &REPORT_FILE,
        ObjectType::GmatFunction => &GMAT_FUNCTION,
        ObjectType::MatlabFunction => &MATLAB_FUNCTION,
        ObjectType::Variable | ObjectType::Array | ObjectType::String | ObjectType::Parameter => {
            return None
        }
    };
    Some(spec)
}

/// Create a default object of `object_type`.
///
/// Arrays are created 1x1; use [`Array::new`] for other sizes. System
/// parameters need an owner and are created through [`SystemParameter::new`].
pub fn instantiate(object_type: ObjectType, name: &str) -> Option<Box<dyn ConfiguredObject>> {
    if let Some(spec) = type_spec(object_type) {
        return Some(Box::new(spec.instantiate(name)));
    }
    match object_type {
        ObjectType::Variable => Some(Box::new(Variable::new(name))),
        ObjectType::Array => Some(Box::new(Array::new(name, 1, 1))),
        ObjectType::String => Some(Box::new(StringVar::new(name))),
        _ => None,
    }
}

/// Downcast a configured object to a concrete type.
pub fn downcast<T: ConfiguredObject>(object: &dyn ConfiguredObject) -> Option<&T> {
    object.as_any().downcast_ref::<T>()
}

/// Downcast a configured object to a concrete type, mutably.
pub fn downcast_mut<'a, T: ConfiguredObject>(
    object: &'a mut (dyn ConfiguredObject + 'static),
) -> Option<&'a mut T> {
    object.as_any_mut().downcast_mut::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_hierarchy() {
        assert!(ObjectType::Spacecraft.satisfies("SpacePoint"));
        assert!(ObjectType::LibrationPoint.satisfies("CalculatedPoint"));
        assert!(!ObjectType::Variable.satisfies("SpacePoint"));
        assert_eq!(
            ObjectType::from_type_name("ImpulsiveBurn"),
            Some(ObjectType::ImpulsiveBurn)
        );
        assert_eq!(ObjectType::from_type_name("Nope"), None);
    }

    #[test]
    fn test_rename_in_chain() {
        assert_eq!(rename_in_chain("Sat1", "Sat1", "Sat2"), Some("Sat2".to_string()));
        assert_eq!(
            rename_in_chain("Sat1.Earth.ECC", "Sat1", "Sat2"),
            Some("Sat2.Earth.ECC".to_string())
        );
        assert_eq!(rename_in_chain("Sat12.X", "Sat1", "Sat2"), None);
    }

    #[test]
    fn test_instantiate_defaults() {
        let sat = instantiate(ObjectType::Spacecraft, "Sat1").expect("creatable");
        assert_eq!(sat.name(), "Sat1");
        assert_eq!(sat.type_name(), "Spacecraft");
        let x = sat.get_by_label("X").expect("has X");
        assert!(x.as_real().is_some());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut sat = instantiate(ObjectType::Spacecraft, "Sat1").expect("creatable");
        let id = sat.parameter_id("X").expect("X").id;
        let mut copy = sat.clone_object();
        copy.set_value(id, PropertyValue::Real(1.0)).expect("set");
        sat.set_value(id, PropertyValue::Real(2.0)).expect("set");
        assert_eq!(copy.get_value(id).ok(), Some(PropertyValue::Real(1.0)));
    }
}
