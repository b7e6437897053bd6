//! The configuration registry.
//!
//! [`ConfigManager`] owns every named object of one store. Objects live in
//! an arena of slots addressed by [`ObjectId`]; an ordered name index maps
//! names to slots, so renames keep identity and creation order.

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{Result, ScriptError};
use crate::interpreter::text;
use crate::object::{
    downcast, downcast_mut, Array, ConfiguredObject, ObjectId, ObjectType, Scope, StringVar,
    SystemParameter, TableObject, Variable, FORCE_MODEL_SUFFIX,
};

/// Registry of configured objects.
///
/// Lookups never fail: a missing name or a name of the wrong type yields
/// `None`. Mutations report registry problems as errors, except for rename
/// collisions, which are a logged no-op.
///
/// # Examples
///
/// ```
/// use missionscript::ConfigManager;
/// use missionscript::object::{instantiate, ObjectType};
///
/// let mut config = ConfigManager::new();
/// let sat = instantiate(ObjectType::Spacecraft, "Sat1").unwrap();
/// config.add_object(sat).unwrap();
/// assert!(config.rename_item("Spacecraft", "Sat1", "Sat2"));
/// assert!(config.get_item("Sat1").is_none());
/// assert_eq!(config.get_item("Sat2").map(|o| o.name()), Some("Sat2"));
/// ```
#[derive(Debug)]
pub struct ConfigManager {
    scope: Scope,
    slots: Vec<Option<Box<dyn ConfiguredObject>>>,
    names: IndexMap<String, usize>,
    retired: Vec<Box<dyn ConfiguredObject>>,
    changed: bool,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    /// An empty session-wide registry.
    pub fn new() -> Self {
        Self::with_scope(Scope::Global)
    }

    /// An empty registry issuing handles for `scope`.
    pub fn with_scope(scope: Scope) -> Self {
        Self {
            scope,
            slots: Vec::new(),
            names: IndexMap::new(),
            retired: Vec::new(),
            changed: false,
        }
    }

    /// Store this registry issues handles for.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Register an object under its own name.
    pub fn add_object(&mut self, object: Box<dyn ConfiguredObject>) -> Result<ObjectId> {
        let name = object.name().to_string();
        if name.is_empty() || self.names.contains_key(&name) {
            return Err(ScriptError::DuplicateName(name));
        }
        let slot = self.slots.len();
        debug!(name = %name, type_name = object.type_name(), "registering object");
        self.slots.push(Some(object));
        self.names.insert(name, slot);
        self.changed = true;
        Ok(self.id(slot))
    }

    /// Register an object that must satisfy `expected`.
    pub fn add_typed(
        &mut self,
        expected: &str,
        object: Box<dyn ConfiguredObject>,
    ) -> Result<ObjectId> {
        if !object.object_type().satisfies(expected) {
            return Err(ScriptError::TypeMismatch {
                name: object.name().to_string(),
                expected: expected.to_string(),
                actual: object.type_name().to_string(),
            });
        }
        self.add_object(object)
    }

    /// Object registered under `name`.
    pub fn get_item(&self, name: &str) -> Option<&dyn ConfiguredObject> {
        let slot = *self.names.get(name)?;
        self.slots.get(slot)?.as_deref()
    }

    /// Object registered under `name`, mutable.
    pub fn get_item_mut(&mut self, name: &str) -> Option<&mut (dyn ConfiguredObject + 'static)> {
        let slot = *self.names.get(name)?;
        self.slots.get_mut(slot)?.as_deref_mut()
    }

    /// Handle of the object registered under `name`.
    pub fn get_id(&self, name: &str) -> Option<ObjectId> {
        self.names.get(name).map(|slot| self.id(*slot))
    }

    /// Object behind a handle; `None` once it was removed.
    pub fn get(&self, id: ObjectId) -> Option<&dyn ConfiguredObject> {
        if id.scope != self.scope {
            return None;
        }
        self.slots.get(id.slot)?.as_deref()
    }

    /// Object behind a handle, mutable.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut (dyn ConfiguredObject + 'static)> {
        if id.scope != self.scope {
            return None;
        }
        self.slots.get_mut(id.slot)?.as_deref_mut()
    }

    /// Object registered under `name` if it satisfies `expected`.
    pub fn get_typed(&self, name: &str, expected: &str) -> Option<&dyn ConfiguredObject> {
        self.get_item(name)
            .filter(|o| o.object_type().satisfies(expected))
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Number of registered objects.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Registered names in creation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(|k| k.as_str())
    }

    /// Registered objects in creation order.
    pub fn items(&self) -> impl Iterator<Item = &dyn ConfiguredObject> {
        self.names
            .values()
            .filter_map(|slot| self.slots.get(*slot).and_then(|o| o.as_deref()))
    }

    /// Names of objects satisfying `type_name`, or every name for `None`.
    pub fn list_of_items(&self, type_name: Option<&str>) -> Vec<String> {
        self.items()
            .filter(|o| type_name.is_none_or(|t| o.object_type().satisfies(t)))
            .map(|o| o.name().to_string())
            .collect()
    }

    /// Whether anything changed since the flag was last cleared.
    pub fn has_changed(&self) -> bool {
        self.changed
    }

    /// Set or clear the change flag.
    pub fn set_changed(&mut self, changed: bool) {
        self.changed = changed;
    }

    /// Rename an object and rewrite every reference to it.
    ///
    /// Returns false without changing anything when `old` is missing or not
    /// of `type_name`, or when `new` is taken or not a valid name.
    pub fn rename_item(&mut self, type_name: &str, old: &str, new: &str) -> bool {
        let Some(object) = self.get_item(old) else {
            warn!(old, "cannot rename: no object of this name");
            return false;
        };
        if !object.object_type().satisfies(type_name) {
            warn!(old, type_name, "cannot rename: type mismatch");
            return false;
        }
        if !text::is_valid_name(new) || self.contains(new) {
            warn!(old, new, "cannot rename: the new name is invalid or already in use");
            return false;
        }
        let is_propagator = object.object_type() == ObjectType::Propagator;

        self.rekey(old, new);
        self.cascade_rename(old, new);

        if is_propagator {
            let old_fm = format!("{}{}", old, FORCE_MODEL_SUFFIX);
            let new_fm = format!("{}{}", new, FORCE_MODEL_SUFFIX);
            if self.get_typed(&old_fm, "ForceModel").is_some() && !self.contains(&new_fm) {
                self.rekey(&old_fm, &new_fm);
                self.cascade_rename(&old_fm, &new_fm);
            }
        }
        self.changed = true;
        debug!(old, new, "renamed object");
        true
    }

    /// Move the registry key of `old` to `new` and rename the object.
    fn rekey(&mut self, old: &str, new: &str) {
        let Some((index, _, slot)) = self.names.shift_remove_full(old) else {
            return;
        };
        if let Some(Some(object)) = self.slots.get_mut(slot) {
            object.set_name(new);
        }
        self.names.shift_insert(index, new.to_string(), slot);
    }

    /// Rewrite references in every object and re-key objects whose names
    /// embed the renamed owner, such as `Sat1.Earth.ECC`.
    fn cascade_rename(&mut self, old: &str, new: &str) {
        let mut moved = Vec::new();
        for (key, slot) in &self.names {
            if let Some(Some(object)) = self.slots.get_mut(*slot) {
                if object.rename_reference(old, new) && object.name() != key.as_str() {
                    moved.push((key.clone(), object.name().to_string()));
                }
            }
        }
        for (from, to) in moved {
            if self.contains(&to) {
                warn!(from = %from, to = %to, "renamed parameter collides with an existing name");
                continue;
            }
            self.rekey_only(&from, &to);
        }
    }

    fn rekey_only(&mut self, old: &str, new: &str) {
        if let Some((index, _, slot)) = self.names.shift_remove_full(old) {
            self.names.shift_insert(index, new.to_string(), slot);
        }
    }

    /// Remove and drop an object; false when missing or not of `type_name`.
    ///
    /// Removing a propagator also removes its companion force model.
    pub fn remove_item(&mut self, type_name: &str, name: &str) -> bool {
        let Some(object) = self.get_item(name) else {
            return false;
        };
        if !object.object_type().satisfies(type_name) {
            return false;
        }
        let companion = (object.object_type() == ObjectType::Propagator)
            .then(|| format!("{}{}", name, FORCE_MODEL_SUFFIX));
        self.take(name);
        if let Some(fm) = companion {
            if self.get_typed(&fm, "ForceModel").is_some() {
                self.take(&fm);
            }
        }
        self.changed = true;
        true
    }

    fn take(&mut self, name: &str) -> Option<Box<dyn ConfiguredObject>> {
        let slot = self.names.shift_remove(name)?;
        self.slots.get_mut(slot)?.take()
    }

    /// Replace the object registered under `name`, keeping its handle.
    ///
    /// The previous object stays alive until the registry is cleared.
    pub fn reconfigure_item(&mut self, mut object: Box<dyn ConfiguredObject>, name: &str) -> bool {
        let Some(&slot) = self.names.get(name) else {
            return false;
        };
        object.set_name(name);
        let Some(entry) = self.slots.get_mut(slot) else {
            return false;
        };
        if let Some(previous) = entry.replace(object) {
            self.retired.push(previous);
        }
        self.changed = true;
        true
    }

    /// Objects replaced by [`ConfigManager::reconfigure_item`] and not yet
    /// released.
    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }

    /// Register a copy of `name` under the next free derived name.
    pub fn add_clone(&mut self, name: &str) -> Result<String> {
        let original = self
            .get_item(name)
            .ok_or_else(|| ScriptError::UnknownObject(name.to_string()))?;
        let new_name = next_clone_name(name, |candidate| self.contains(candidate));
        let mut copy = original.clone_object();
        copy.set_name(&new_name);
        copy.set_global(false);
        self.add_object(copy)?;
        Ok(new_name)
    }

    /// Drop every object.
    pub fn remove_all_items(&mut self) {
        self.slots.clear();
        self.names.clear();
        self.retired.clear();
        self.changed = true;
    }

    /// Drop every object not marked global.
    pub fn remove_non_global_items(&mut self) {
        let doomed: Vec<String> = self
            .items()
            .filter(|o| !o.is_global())
            .map(|o| o.name().to_string())
            .collect();
        for name in doomed {
            self.take(&name);
        }
        self.changed = true;
    }

    fn id(&self, slot: usize) -> ObjectId {
        ObjectId {
            scope: self.scope,
            slot,
        }
    }

    fn table_item(&self, name: &str, expected: &str) -> Option<&TableObject> {
        self.get_typed(name, expected).and_then(downcast::<TableObject>)
    }

    /// Spacecraft named `name`.
    pub fn get_spacecraft(&self, name: &str) -> Option<&TableObject> {
        self.table_item(name, "Spacecraft")
    }

    /// Burn named `name`.
    pub fn get_burn(&self, name: &str) -> Option<&TableObject> {
        self.table_item(name, "Burn")
    }

    /// Propagator named `name`.
    pub fn get_propagator(&self, name: &str) -> Option<&TableObject> {
        self.table_item(name, "Propagator")
    }

    /// Force model named `name`.
    pub fn get_force_model(&self, name: &str) -> Option<&TableObject> {
        self.table_item(name, "ForceModel")
    }

    /// Coordinate system named `name`.
    pub fn get_coordinate_system(&self, name: &str) -> Option<&TableObject> {
        self.table_item(name, "CoordinateSystem")
    }

    /// Solver named `name`.
    pub fn get_solver(&self, name: &str) -> Option<&TableObject> {
        self.table_item(name, "Solver")
    }

    /// Function named `name`.
    pub fn get_function(&self, name: &str) -> Option<&TableObject> {
        self.table_item(name, "Function")
    }

    /// Variable named `name`.
    pub fn get_variable(&self, name: &str) -> Option<&Variable> {
        self.get_item(name).and_then(downcast::<Variable>)
    }

    /// Variable named `name`, mutable.
    pub fn get_variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.get_item_mut(name).and_then(downcast_mut::<Variable>)
    }

    /// Array named `name`.
    pub fn get_array(&self, name: &str) -> Option<&Array> {
        self.get_item(name).and_then(downcast::<Array>)
    }

    /// Array named `name`, mutable.
    pub fn get_array_mut(&mut self, name: &str) -> Option<&mut Array> {
        self.get_item_mut(name).and_then(downcast_mut::<Array>)
    }

    /// String variable named `name`.
    pub fn get_string(&self, name: &str) -> Option<&StringVar> {
        self.get_item(name).and_then(downcast::<StringVar>)
    }

    /// System parameter named `name`.
    pub fn get_system_parameter(&self, name: &str) -> Option<&SystemParameter> {
        self.get_item(name).and_then(downcast::<SystemParameter>)
    }
}

/// Next name derived from `name` that `taken` rejects.
///
/// A trailing number is incremented (`Sat1` gives `Sat2`); a name without
/// one gets `2` appended and counts up from there.
///
/// # Examples
///
/// ```
/// use missionscript::config::next_clone_name;
///
/// assert_eq!(next_clone_name("Sat1", |_| false), "Sat2");
/// assert_eq!(next_clone_name("Probe", |n| n == "Probe2"), "Probe3");
/// ```
pub fn next_clone_name(name: &str, taken: impl Fn(&str) -> bool) -> String {
    let base_len = name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (base, digits) = name.split_at(base_len);
    let (base, mut counter) = match digits.parse::<u64>().ok().and_then(|n| n.checked_add(1)) {
        Some(next) if !base.is_empty() => (base, next),
        _ => (name, 2),
    };
    loop {
        let candidate = format!("{}{}", base, counter);
        if !taken(&candidate) {
            return candidate;
        }
        counter = counter.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{instantiate, Variable, PROPAGATOR};

    fn spacecraft(name: &str) -> Box<dyn ConfiguredObject> {
        instantiate(ObjectType::Spacecraft, name).expect("creatable")
    }

    #[test]
    fn test_duplicate_and_empty_names() {
        let mut config = ConfigManager::new();
        config.add_object(spacecraft("Sat1")).expect("first");
        assert!(matches!(
            config.add_object(spacecraft("Sat1")),
            Err(ScriptError::DuplicateName(_))
        ));
        assert!(config.add_object(spacecraft("")).is_err());
    }

    #[test]
    fn test_add_typed_checks_type() {
        let mut config = ConfigManager::new();
        let err = config
            .add_typed("Burn", spacecraft("Sat1"))
            .expect_err("spacecraft is not a burn");
        assert!(matches!(err, ScriptError::TypeMismatch { .. }));
        assert!(config.add_typed("SpacePoint", spacecraft("Sat1")).is_ok());
    }

    #[test]
    fn test_rename_preserves_identity() {
        let mut config = ConfigManager::new();
        let id = config.add_object(spacecraft("Sat1")).expect("add");
        let mut burn = instantiate(ObjectType::ImpulsiveBurn, "Burn1").expect("burn");
        let origin = burn.parameter_id("Origin").expect("field").id;
        burn.set_text(origin, "Sat1").expect("origin");
        config.add_object(burn).expect("add");

        assert!(config.rename_item("Spacecraft", "Sat1", "Sat2"));
        assert!(config.get_item("Sat1").is_none());
        assert_eq!(config.get_id("Sat2"), Some(id));
        let burn = config.get_burn("Burn1").expect("burn");
        assert_eq!(burn.text_of("Origin"), "Sat2");
    }

    #[test]
    fn test_rename_collision_is_noop() {
        let mut config = ConfigManager::new();
        config.add_object(spacecraft("Sat1")).expect("add");
        config.add_object(spacecraft("Sat2")).expect("add");
        assert!(!config.rename_item("Spacecraft", "Sat1", "Sat2"));
        assert!(!config.rename_item("Burn", "Sat1", "Sat3"));
        assert!(config.get_item("Sat1").is_some());
    }

    #[test]
    fn test_rename_cascades_to_system_parameters() {
        let mut config = ConfigManager::new();
        config.add_object(spacecraft("Sat1")).expect("add");
        let ecc = SystemParameter::new("Sat1", None, "ECC").expect("param");
        config.add_object(Box::new(ecc)).expect("add");
        assert!(config.rename_item("Spacecraft", "Sat1", "Probe"));
        assert!(config.get_item("Sat1.Earth.ECC").is_none());
        let param = config
            .get_system_parameter("Probe.Earth.ECC")
            .expect("parameter re-keyed");
        assert_eq!(param.owner(), "Probe");
    }

    #[test]
    fn test_propagator_companion_follows() {
        let mut config = ConfigManager::new();
        let mut prop = PROPAGATOR.instantiate("Prop");
        let fm_id = prop.parameter_id("FM").expect("field").id;
        prop.set_text(fm_id, "Prop_ForceModel").expect("fm");
        config.add_object(Box::new(prop)).expect("add");
        let fm = instantiate(ObjectType::ForceModel, "Prop_ForceModel").expect("fm");
        config.add_object(fm).expect("add");

        assert!(config.rename_item("Propagator", "Prop", "LEO"));
        assert!(config.get_force_model("LEO_ForceModel").is_some());
        assert_eq!(
            config.get_propagator("LEO").map(|p| p.text_of("FM")),
            Some("LEO_ForceModel")
        );
        assert!(config.remove_item("Propagator", "LEO"));
        assert!(config.is_empty());
    }

    #[test]
    fn test_remove_requires_type() {
        let mut config = ConfigManager::new();
        config.add_object(spacecraft("Sat1")).expect("add");
        assert!(!config.remove_item("Burn", "Sat1"));
        assert!(!config.remove_item("Spacecraft", "Nope"));
        assert!(config.remove_item("Spacecraft", "Sat1"));
        assert!(config.get_item("Sat1").is_none());
    }

    #[test]
    fn test_reconfigure_keeps_handle() {
        let mut config = ConfigManager::new();
        let id = config.add_object(spacecraft("Sat1")).expect("add");
        assert!(config.reconfigure_item(spacecraft("Other"), "Sat1"));
        assert_eq!(config.get(id).map(|o| o.name()), Some("Sat1"));
        assert_eq!(config.retired_count(), 1);
        assert!(!config.reconfigure_item(spacecraft("X"), "Missing"));
    }

    #[test]
    fn test_clone_is_deep() {
        let mut config = ConfigManager::new();
        let mut x = Variable::new("x");
        x.set_real(4.0);
        config.add_object(Box::new(x)).expect("add");
        let copy = config.add_clone("x").expect("clone");
        assert_eq!(copy, "x2");
        config.get_variable_mut("x2").expect("clone").set_real(9.0);
        assert_eq!(config.get_variable("x").map(|v| v.value()), Some(4.0));
        assert!(config.add_clone("missing").is_err());
    }

    #[test]
    fn test_remove_all_and_non_global() {
        let mut config = ConfigManager::new();
        config.add_object(spacecraft("Sat1")).expect("add");
        let mut keep = spacecraft("Keep");
        keep.set_global(true);
        config.add_object(keep).expect("add");
        config.remove_non_global_items();
        assert_eq!(config.names().collect::<Vec<_>>(), vec!["Keep"]);
        config.remove_all_items();
        assert!(config.get_item("Keep").is_none());
    }

    #[test]
    fn test_clone_names() {
        assert_eq!(next_clone_name("Sat1", |_| false), "Sat2");
        assert_eq!(next_clone_name("Sat1", |n| n == "Sat2"), "Sat3");
        assert_eq!(next_clone_name("DC", |_| false), "DC2");
        assert_eq!(next_clone_name("Tank09", |_| false), "Tank10");
    }
}
