//! The session object owning everything one script load builds.

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use crate::command::MissionSequence;
use crate::config::ConfigManager;
use crate::error::{Result, ScriptError};
use crate::expression::EvalContext;
use crate::factory::Factory;
use crate::function_runner::{FunctionExecutor, FunctionRunner};
use crate::object::{
    default_coordinate_systems, downcast, parameter_info, Array, ConfiguredObject, DependencyKind,
    FunctionHeader, ObjectId, ParameterInfo, Scope, StringVar, SystemParameter, TableObject,
    Variable,
};
use crate::solar_system::SolarSystem;

/// A function body parsed in function mode.
#[derive(Debug)]
pub struct FunctionDefinition {
    /// The `function [out] = name(in)` header.
    pub header: FunctionHeader,
    /// Objects created inside the function.
    pub objects: ConfigManager,
    /// The function's own command sequence.
    pub sequence: MissionSequence,
}

impl FunctionDefinition {
    /// An empty body for `header`.
    pub fn new(header: FunctionHeader) -> Self {
        Self {
            header,
            objects: ConfigManager::with_scope(Scope::Function),
            sequence: MissionSequence::new(),
        }
    }
}

/// Registry, solar system, factory, mission sequence, function bodies and
/// warnings of one session.
///
/// Independent workspaces share nothing, so several scripts can be loaded
/// side by side.
#[derive(Debug)]
pub struct Workspace {
    config: ConfigManager,
    solar_system: SolarSystem,
    factory: Factory,
    sequence: MissionSequence,
    functions: IndexMap<String, FunctionDefinition>,
    runner: FunctionRunner,
    warnings: Vec<String>,
    warned: IndexSet<String>,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    /// A workspace holding the default coordinate systems.
    pub fn new() -> Self {
        let mut config = ConfigManager::new();
        for cs in default_coordinate_systems() {
            // Default names are distinct.
            let _ = config.add_object(Box::new(cs));
        }
        config.set_changed(false);
        Self {
            config,
            solar_system: SolarSystem::new(),
            factory: Factory::new(),
            sequence: MissionSequence::new(),
            functions: IndexMap::new(),
            runner: FunctionRunner::new(),
            warnings: Vec::new(),
            warned: IndexSet::new(),
        }
    }

    /// The configuration registry.
    pub fn config(&self) -> &ConfigManager {
        &self.config
    }

    /// The configuration registry, mutable.
    pub fn config_mut(&mut self) -> &mut ConfigManager {
        &mut self.config
    }

    /// Celestial bodies.
    pub fn solar_system(&self) -> &SolarSystem {
        &self.solar_system
    }

    /// Celestial bodies, mutable.
    pub fn solar_system_mut(&mut self) -> &mut SolarSystem {
        &mut self.solar_system
    }

    /// Creatable types.
    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    /// Creatable types, mutable for plugin registration.
    pub fn factory_mut(&mut self) -> &mut Factory {
        &mut self.factory
    }

    /// The main mission sequence.
    pub fn sequence(&self) -> &MissionSequence {
        &self.sequence
    }

    /// The main mission sequence, mutable.
    pub fn sequence_mut(&mut self) -> &mut MissionSequence {
        &mut self.sequence
    }

    /// Function bodies parsed so far.
    pub fn functions(&self) -> &IndexMap<String, FunctionDefinition> {
        &self.functions
    }

    /// Body of function `name`.
    pub fn function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.get(name)
    }

    /// Store a parsed function body, replacing an earlier one.
    pub fn define_function(&mut self, definition: FunctionDefinition) {
        debug!(name = %definition.header.name, "defining function");
        self.functions
            .insert(definition.header.name.clone(), definition);
    }

    /// Calls available to expressions.
    pub fn runner(&self) -> &FunctionRunner {
        &self.runner
    }

    /// Make an externally executed function callable from expressions.
    pub fn register_function(&mut self, name: &str, executor: impl FunctionExecutor + 'static) {
        self.runner.register(name, executor);
    }

    /// Record a warning.
    pub fn warn(&mut self, message: &str) {
        warn!("{}", message);
        self.warnings.push(message.to_string());
    }

    /// Record a warning unless one with `key` was already shown in this
    /// session. Returns whether it was recorded.
    pub fn warn_once(&mut self, key: &str, message: &str) -> bool {
        if !self.warned.insert(key.to_string()) {
            return false;
        }
        self.warn(message);
        true
    }

    /// Warnings recorded so far.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Whether `name` is one of the default coordinate systems.
    pub fn is_default_object(&self, name: &str) -> bool {
        default_coordinate_systems().iter().any(|cs| cs.name() == name)
    }

    /// Object named `name` in `local`, the registry or the solar system.
    pub fn find_object<'a>(
        &'a self,
        name: &str,
        local: Option<&'a ConfigManager>,
    ) -> Option<&'a dyn ConfiguredObject> {
        local
            .and_then(|l| l.get_item(name))
            .or_else(|| self.config.get_item(name))
            .or_else(|| {
                self.solar_system
                    .body(name)
                    .map(|b| b as &dyn ConfiguredObject)
            })
    }

    /// Object behind a handle from any store of this workspace.
    pub fn resolve_id<'a>(
        &'a self,
        id: ObjectId,
        local: Option<&'a ConfigManager>,
    ) -> Option<&'a dyn ConfiguredObject> {
        match id.scope() {
            Scope::Global => self.config.get(id),
            Scope::SolarSystem => self.solar_system.get(id),
            Scope::Function => local.and_then(|l| l.get(id)),
        }
    }

    /// Name resolution over `local` and this workspace.
    pub fn lookup<'a>(&'a self, local: Option<&'a ConfigManager>) -> Lookup<'a> {
        Lookup {
            workspace: self,
            local,
        }
    }

    /// Drop objects not marked global, the mission sequence and function
    /// bodies; warnings and plugins are kept.
    pub fn clear(&mut self) {
        self.config.remove_non_global_items();
        for cs in default_coordinate_systems() {
            if !self.config.contains(cs.name()) {
                let _ = self.config.add_object(Box::new(cs));
            }
        }
        self.sequence.clear();
        self.functions.clear();
    }
}

/// Resolves names for expression evaluation: variables, arrays, object
/// fields, system parameters, constants and functions.
#[derive(Debug, Clone, Copy)]
pub struct Lookup<'a> {
    workspace: &'a Workspace,
    local: Option<&'a ConfigManager>,
}

impl<'a> Lookup<'a> {
    /// Object named `name`.
    pub fn find(&self, name: &str) -> Option<&'a dyn ConfiguredObject> {
        self.workspace.find_object(name, self.local)
    }

    /// Whether `name` is a known object.
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Value of `owner[.dependency].type` computed from its owner.
    pub fn parameter_value(&self, owner: &str, dependency: &str, param_type: &str) -> Result<f64> {
        let info = parameter_info(param_type).ok_or_else(|| ScriptError::UnknownParameter {
            object: owner.to_string(),
            type_name: "Parameter".to_string(),
            label: param_type.to_string(),
        })?;
        let object = self
            .find(owner)
            .ok_or_else(|| ScriptError::UnknownObject(owner.to_string()))?;
        if !object.object_type().satisfies(info.owner_type) {
            return Err(ScriptError::TypeMismatch {
                name: owner.to_string(),
                expected: info.owner_type.to_string(),
                actual: object.type_name().to_string(),
            });
        }
        let table = downcast::<TableObject>(object)
            .ok_or_else(|| ScriptError::UnknownObject(owner.to_string()))?;
        self.owner_quantity(table, info, dependency)
    }

    fn owner_quantity(
        &self,
        owner: &TableObject,
        info: &ParameterInfo,
        dependency: &str,
    ) -> Result<f64> {
        if let Some(field) = info.owner_field {
            return owner.real_of(field).ok_or_else(|| {
                ScriptError::Evaluation(format!("{}.{} is not numeric", owner.name(), field))
            });
        }
        if info.type_name == "TotalMass" {
            let dry = owner.real_of("DryMass").unwrap_or(0.0);
            let fuel: f64 = owner
                .value_of("Tanks")
                .map(|v| v.names())
                .unwrap_or_default()
                .into_iter()
                .filter_map(|tank| self.find(tank).and_then(downcast::<TableObject>))
                .filter_map(|tank| tank.real_of("FuelMass"))
                .sum();
            return Ok(dry + fuel);
        }
        let mut state = [0.0; 6];
        for (slot, label) in state.iter_mut().zip(["X", "Y", "Z", "VX", "VY", "VZ"]) {
            *slot = owner.real_of(label).unwrap_or(0.0);
        }
        let body = match info.dependency {
            DependencyKind::CentralBody if !dependency.is_empty() => dependency,
            _ => "Earth",
        };
        let mu = self
            .workspace
            .solar_system
            .mu(body)
            .ok_or_else(|| ScriptError::UnknownObject(body.to_string()))?;
        info.from_state(&state, mu).ok_or_else(|| {
            ScriptError::Evaluation(format!(
                "{} of \"{}\" is undefined for its current state",
                info.type_name,
                owner.name()
            ))
        })
    }

    fn field_real(&self, object: &dyn ConfiguredObject, field: &str) -> Result<f64> {
        let value = object.get_by_label(field)?;
        value.as_real().ok_or_else(|| {
            ScriptError::Evaluation(format!(
                "The field \"{}\" of \"{}\" is not numeric",
                field,
                object.name()
            ))
        })
    }
}

impl EvalContext for Lookup<'_> {
    fn reference(&self, name: &str) -> Result<f64> {
        let parts: Vec<&str> = name.split('.').collect();
        let Some(object) = self.find(parts[0]) else {
            if parts.len() == 1 {
                if let Some(value) = FunctionRunner::constant(name) {
                    return Ok(value);
                }
            }
            return Err(ScriptError::UnknownObject(parts[0].to_string()));
        };
        if parts.len() == 1 {
            if let Some(var) = downcast::<Variable>(object) {
                return Ok(var.value());
            }
            if let Some(array) = downcast::<Array>(object) {
                if array.rows() == 1 && array.cols() == 1 {
                    return array.element(1, 1);
                }
            }
            if let Some(param) = downcast::<SystemParameter>(object) {
                return self.parameter_value(param.owner(), param.dependency(), param.param_type());
            }
            return Err(ScriptError::Evaluation(format!(
                "\"{}\" of type {} has no numeric value",
                name,
                object.type_name()
            )));
        }
        let field = parts[1..].join(".");
        if object.parameter_id(&field).is_ok() {
            return self.field_real(object, &field);
        }
        match parts.as_slice() {
            [owner, param_type] => self.parameter_value(owner, "", param_type),
            [owner, dependency, param_type] => self.parameter_value(owner, dependency, param_type),
            _ => self.field_real(object, &field),
        }
    }

    fn call(&self, name: &str, args: &[f64]) -> Result<f64> {
        if let Some(array) = self.find(name).and_then(downcast::<Array>) {
            let (row, col) = match args {
                [i] if array.rows() == 1 => (1, i.trunc() as i64),
                [i] => (i.trunc() as i64, 1),
                [r, c] => (r.trunc() as i64, c.trunc() as i64),
                _ => {
                    return Err(ScriptError::Syntax(format!(
                        "The array \"{}\" takes one or two indices",
                        name
                    )))
                }
            };
            return array.element(row, col);
        }
        self.workspace.runner.call(name, args)
    }

    fn text(&self, name: &str) -> Result<String> {
        if let Some(s) = self.find(name).and_then(downcast::<StringVar>) {
            return Ok(s.value().to_string());
        }
        let (owner, field) = name.split_once('.').ok_or_else(|| {
            ScriptError::Evaluation(format!("\"{}\" does not hold text", name))
        })?;
        let object = self
            .find(owner)
            .ok_or_else(|| ScriptError::UnknownObject(owner.to_string()))?;
        let value = object.get_by_label(field)?;
        value.as_str().map(str::to_string).ok_or_else(|| {
            ScriptError::Evaluation(format!("\"{}\" does not hold text", name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{instantiate, ObjectType};
    use crate::property::PropertyValue;

    fn workspace_with_sat() -> Workspace {
        let mut ws = Workspace::new();
        let mut sat = instantiate(ObjectType::Spacecraft, "Sat1").expect("creatable");
        let x = sat.parameter_id("X").expect("X").id;
        sat.set_value(x, PropertyValue::Real(7000.0)).expect("set X");
        ws.config_mut().add_object(sat).expect("added");
        ws
    }

    #[test]
    fn test_default_objects() {
        let ws = Workspace::new();
        assert!(ws.config().contains("EarthMJ2000Eq"));
        assert!(ws.is_default_object("EarthFixed"));
        assert!(!ws.config().has_changed());
    }

    #[test]
    fn test_warn_once() {
        let mut ws = Workspace::new();
        assert!(ws.warn_once("Burn.V", "deprecated"));
        assert!(!ws.warn_once("Burn.V", "deprecated"));
        assert_eq!(ws.warnings().len(), 1);
    }

    #[test]
    fn test_lookup_fields_and_parameters() {
        let ws = workspace_with_sat();
        let lookup = ws.lookup(None);
        assert_eq!(lookup.reference("Sat1.X").ok(), Some(7000.0));
        assert_eq!(lookup.reference("Sat1.Earth.RMAG").ok(), lookup.reference("Sat1.RMAG").ok());
        assert_eq!(lookup.reference("Sat1.TotalMass").ok(), Some(850.0));
        assert_eq!(lookup.reference("pi").ok(), Some(std::f64::consts::PI));
        assert_eq!(lookup.reference("Earth.Mu").ok(), Some(398600.4415));
        assert!(lookup.reference("Sat9.X").is_err());
        assert_eq!(lookup.text("Sat1.Id").ok(), Some("SatId".to_string()));
    }

    #[test]
    fn test_function_call_through_runner() {
        let mut ws = Workspace::new();
        ws.register_function("Half", |args: &[f64]| Ok(vec![args[0] / 2.0]));
        let lookup = ws.lookup(None);
        assert_eq!(lookup.call("Half", &[3.0]).ok(), Some(1.5));
    }
}
