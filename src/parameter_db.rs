//! Ordered name registry of the parameters an expression depends on.

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{Result, ScriptError};
use crate::object::ObjectId;

/// Ordered map from parameter name to its resolved handle.
///
/// Composite objects (a variable's expression, a condition's operands)
/// own one of these. Names are registered as soon as they are seen and
/// bound to a handle once the configuration is complete.
///
/// Adding a name that is already present leaves the entry untouched; this
/// keeps re-parsed expressions idempotent.
///
/// # Examples
///
/// ```
/// use missionscript::ParameterDatabase;
///
/// let mut db = ParameterDatabase::new();
/// assert!(db.add("Sat1.X"));
/// assert!(!db.add("Sat1.X"));
/// assert_eq!(db.len(), 1);
/// assert!(db.remove("Sat1.Y").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterDatabase {
    entries: IndexMap<String, Option<ObjectId>>,
}

impl ParameterDatabase {
    /// An empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no names are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    /// Register `name`; returns false and changes nothing when it exists.
    pub fn add(&mut self, name: &str) -> bool {
        if self.entries.contains_key(name) {
            debug!(name, "parameter already registered");
            return false;
        }
        self.entries.insert(name.to_string(), None);
        true
    }

    /// Register `name` already bound to `id`; an existing entry is kept.
    pub fn add_bound(&mut self, name: &str, id: ObjectId) -> bool {
        if self.entries.contains_key(name) {
            return false;
        }
        self.entries.insert(name.to_string(), Some(id));
        true
    }

    /// Remove `name`.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        self.entries
            .shift_remove(name)
            .map(|_| ())
            .ok_or_else(|| missing(name))
    }

    /// Rename an entry in place, keeping its position and binding.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        if self.entries.contains_key(new) {
            return Err(ScriptError::ParameterDatabase(format!(
                "cannot rename \"{}\" to \"{}\": the name is already registered",
                old, new
            )));
        }
        let (index, _, binding) = self
            .entries
            .shift_remove_full(old)
            .ok_or_else(|| missing(old))?;
        self.entries.shift_insert(index, new.to_string(), binding);
        Ok(())
    }

    /// Handle bound to `name`, or `None` while it is unresolved.
    pub fn get(&self, name: &str) -> Result<Option<ObjectId>> {
        self.entries.get(name).copied().ok_or_else(|| missing(name))
    }

    /// Bind `name` to a handle.
    pub fn set_binding(&mut self, name: &str, id: ObjectId) -> Result<()> {
        let slot = self.entries.get_mut(name).ok_or_else(|| missing(name))?;
        *slot = Some(id);
        Ok(())
    }

    /// Names that have no handle yet.
    pub fn unbound(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, id)| id.is_none())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

fn missing(name: &str) -> ScriptError {
    ScriptError::ParameterDatabase(format!("\"{}\" is not registered", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Scope;

    fn id(slot: usize) -> ObjectId {
        ObjectId {
            scope: Scope::Global,
            slot,
        }
    }

    #[test]
    fn test_duplicate_add_keeps_binding() {
        let mut db = ParameterDatabase::new();
        db.add_bound("Sat1.X", id(3));
        assert!(!db.add("Sat1.X"));
        assert_eq!(db.get("Sat1.X").ok().flatten(), Some(id(3)));
    }

    #[test]
    fn test_rename_keeps_position() {
        let mut db = ParameterDatabase::new();
        db.add("a");
        db.add("b");
        db.add("c");
        db.rename("b", "z").expect("rename");
        assert_eq!(db.names().collect::<Vec<_>>(), vec!["a", "z", "c"]);
        assert!(db.rename("a", "c").is_err());
        assert!(db.rename("nope", "q").is_err());
    }

    #[test]
    fn test_binding_and_unbound() {
        let mut db = ParameterDatabase::new();
        db.add("x");
        db.add("y");
        db.set_binding("y", id(1)).expect("bind");
        assert_eq!(db.unbound(), vec!["x"]);
        assert!(db.set_binding("w", id(2)).is_err());
        assert!(db.get("w").is_err());
    }
}
