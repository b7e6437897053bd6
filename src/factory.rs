//! Type discovery and construction of configured objects.
//!
//! The [`Factory`] maps script type names to constructors and keeps, per
//! [`ObjectCategory`], the list of names a `Create` statement accepts.
//! Plugins add names at run time; the lists are rebuilt on every
//! registration.

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{Result, ScriptError};
use crate::object::{instantiate, ConfiguredObject, ObjectCategory, ObjectType, TypeSpec};

/// Legacy type names and the types they now create.
const DEPRECATED_TYPES: &[(&str, ObjectType)] = &[
    ("FuelTank", ObjectType::ChemicalTank),
    ("Thruster", ObjectType::ChemicalThruster),
];

/// An object built by the factory.
#[derive(Debug)]
pub struct Created {
    /// The new object.
    pub object: Box<dyn ConfiguredObject>,
    /// Set when a legacy type name was used; holds the one-time warning
    /// key and message.
    pub warning: Option<(String, String)>,
}

#[derive(Debug, Clone, Copy)]
enum Constructor {
    Builtin(ObjectType),
    Plugin(&'static TypeSpec),
}

/// Registry of creatable types.
#[derive(Debug, Clone)]
pub struct Factory {
    constructors: IndexMap<String, Constructor>,
    lists: IndexMap<ObjectCategory, Vec<String>>,
}

impl Default for Factory {
    fn default() -> Self {
        Self::new()
    }
}

impl Factory {
    /// A factory knowing every built-in type.
    pub fn new() -> Self {
        let constructors = ObjectType::ALL
            .iter()
            .map(|t| (t.type_name().to_string(), Constructor::Builtin(*t)))
            .collect();
        let mut factory = Self {
            constructors,
            lists: IndexMap::new(),
        };
        factory.rebuild_lists();
        factory
    }

    /// Register a plugin type under `type_name`.
    pub fn register_plugin(&mut self, type_name: &str, spec: &'static TypeSpec) -> Result<()> {
        if self.is_type_name(type_name) {
            return Err(ScriptError::DuplicateName(type_name.to_string()));
        }
        debug!(type_name, "registering plugin type");
        self.constructors
            .insert(type_name.to_string(), Constructor::Plugin(spec));
        self.rebuild_lists();
        Ok(())
    }

    fn rebuild_lists(&mut self) {
        self.lists.clear();
        for (name, constructor) in &self.constructors {
            let category = match constructor {
                Constructor::Builtin(t) => t.category(),
                Constructor::Plugin(spec) => spec.object_type.category(),
            };
            self.lists.entry(category).or_default().push(name.clone());
        }
        self.lists.sort_keys();
    }

    /// Creatable type names of a category.
    pub fn list_of_items(&self, category: ObjectCategory) -> &[String] {
        self.lists.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every creatable type name, legacy names included.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.constructors
            .keys()
            .map(|k| k.as_str())
            .chain(DEPRECATED_TYPES.iter().map(|(name, _)| *name))
    }

    /// Whether `name` is a creatable type name.
    pub fn is_type_name(&self, name: &str) -> bool {
        self.constructors.contains_key(name) || DEPRECATED_TYPES.iter().any(|(n, _)| *n == name)
    }

    /// Type that `type_name` creates.
    pub fn resolve(&self, type_name: &str) -> Option<ObjectType> {
        match self.constructors.get(type_name) {
            Some(Constructor::Builtin(t)) => Some(*t),
            Some(Constructor::Plugin(spec)) => Some(spec.object_type),
            None => DEPRECATED_TYPES
                .iter()
                .find(|(name, _)| *name == type_name)
                .map(|(_, t)| *t),
        }
    }

    /// Build a default object of `type_name` called `name`.
    pub fn create(&self, type_name: &str, name: &str) -> Result<Created> {
        let unknown = || ScriptError::Reference(format!("Unknown object type \"{}\"", type_name));
        let (object, warning) = match self.constructors.get(type_name) {
            Some(Constructor::Builtin(t)) => (instantiate(*t, name).ok_or_else(unknown)?, None),
            Some(Constructor::Plugin(spec)) => {
                (Box::new(spec.instantiate(name)) as Box<dyn ConfiguredObject>, None)
            }
            None => {
                let (legacy, t) = DEPRECATED_TYPES
                    .iter()
                    .find(|(legacy, _)| *legacy == type_name)
                    .ok_or_else(unknown)?;
                let warning = (
                    format!("type.{}", legacy),
                    format!(
                        "The type \"{}\" is deprecated; creating a {} instead",
                        legacy,
                        t.type_name()
                    ),
                );
                (instantiate(*t, name).ok_or_else(unknown)?, Some(warning))
            }
        };
        Ok(Created { object, warning })
    }
}
