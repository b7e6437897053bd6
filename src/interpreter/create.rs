//! Object creation.

use tracing::debug;

use super::{text, Interpreter};
use crate::command::CommandKind;
use crate::error::{Result, ScriptError};
use crate::object::{Array, ConfiguredObject, ObjectId, ObjectType, FORCE_MODEL_SUFFIX};

/// Largest number of elements an `Array` may declare.
pub(crate) const MAX_ARRAY_ELEMENTS: usize = 1 << 20;

/// Words that can never name an object.
const RESERVED_WORDS: &[&str] = &["Create", "Global", "GMAT", "function"];

/// Where a created object is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManageMode {
    /// Not registered; the caller owns the object.
    Unmanaged,
    /// Registered in the configuration registry.
    Configured,
    /// Registered in the store of the function being read.
    FunctionLocal,
}

/// Result of [`Interpreter::create_object`].
#[derive(Debug)]
pub enum ObjectHandle {
    /// An object nobody else holds.
    Unmanaged(Box<dyn ConfiguredObject>),
    /// Handle of a registered object.
    Registered(ObjectId),
}

impl ObjectHandle {
    /// Handle of a registered object.
    pub fn id(&self) -> Option<ObjectId> {
        match self {
            ObjectHandle::Registered(id) => Some(*id),
            ObjectHandle::Unmanaged(_) => None,
        }
    }
}

impl Interpreter {
    /// Create an object of `type_name` called `name`.
    ///
    /// Registering a name that already exists warns and hands back the
    /// existing object. With `create_default`, a propagator also gets its
    /// companion force model.
    ///
    /// ```
    /// use missionscript::interpreter::ManageMode;
    /// use missionscript::Interpreter;
    ///
    /// let mut interpreter = Interpreter::new();
    /// let first = interpreter
    ///     .create_object("Spacecraft", "Sat1", ManageMode::Configured, true)
    ///     .unwrap();
    /// let again = interpreter
    ///     .create_object("Spacecraft", "Sat1", ManageMode::Configured, true)
    ///     .unwrap();
    /// assert_eq!(first.id(), again.id());
    /// assert_eq!(interpreter.workspace().warnings().len(), 1);
    /// ```
    pub fn create_object(
        &mut self,
        type_name: &str,
        name: &str,
        mode: ManageMode,
        create_default: bool,
    ) -> Result<ObjectHandle> {
        self.check_object_name(name)?;
        let object_type = self.workspace.factory().resolve(type_name).ok_or_else(|| {
            ScriptError::Reference(format!("Unknown object type \"{}\"", type_name))
        })?;
        if let Some(existing) = self.existing(name, mode, type_name) {
            return Ok(ObjectHandle::Registered(existing));
        }
        let created = self.workspace.factory().create(type_name, name)?;
        if let Some((key, message)) = &created.warning {
            self.workspace.warn_once(key, message);
        }
        let handle = self.register(created.object, mode)?;
        if create_default && object_type == ObjectType::Propagator && mode != ManageMode::Unmanaged {
            self.attach_force_model(name, mode)?;
        }
        Ok(handle)
    }

    /// `Create Array A[rows, cols]`.
    pub(crate) fn create_array(&mut self, declaration: &str, mode: ManageMode) -> Result<ObjectHandle> {
        let (name, rows, cols) = parse_array_declaration(declaration)?;
        self.check_object_name(name)?;
        if let Some(existing) = self.existing(name, mode, "Array") {
            return Ok(ObjectHandle::Registered(existing));
        }
        self.register(Box::new(Array::new(name, rows, cols)), mode)
    }

    fn check_object_name(&self, name: &str) -> Result<()> {
        if !text::is_valid_name(name) {
            return Err(ScriptError::Syntax(format!(
                "\"{}\" is not a valid object name",
                name
            )));
        }
        if CommandKind::is_reserved(name) || RESERVED_WORDS.contains(&name) {
            return Err(ScriptError::Syntax(format!(
                "\"{}\" is a reserved word and cannot name an object",
                name
            )));
        }
        if !self.options.allow_type_names_as_object_names
            && self.workspace.factory().is_type_name(name)
        {
            return Err(ScriptError::Syntax(format!(
                "\"{}\" is a type name and cannot name an object",
                name
            )));
        }
        if self.workspace.solar_system().contains(name) {
            return Err(ScriptError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    /// Handle of an already registered object, with a warning.
    fn existing(&mut self, name: &str, mode: ManageMode, type_name: &str) -> Option<ObjectId> {
        let store = match mode {
            ManageMode::Unmanaged => return None,
            ManageMode::Configured => self.workspace.config(),
            ManageMode::FunctionLocal => self.local()?,
        };
        let id = store.get_id(name)?;
        let actual = store.get(id).map(|o| o.type_name()).unwrap_or("?");
        let message = if actual == type_name {
            format!("\"{}\" is already created; keeping the existing object", name)
        } else {
            format!(
                "\"{}\" is already created as a {}; ignoring the new {}",
                name, actual, type_name
            )
        };
        self.workspace.warn(&message);
        Some(id)
    }

    fn register(&mut self, object: Box<dyn ConfiguredObject>, mode: ManageMode) -> Result<ObjectHandle> {
        if mode == ManageMode::Unmanaged {
            return Ok(ObjectHandle::Unmanaged(object));
        }
        debug!(name = object.name(), type_name = object.type_name(), ?mode, "creating object");
        let id = self.store_mut(mode).add_object(object)?;
        Ok(ObjectHandle::Registered(id))
    }

    /// Create or reuse `<propagator>_ForceModel` and point the propagator
    /// at it.
    fn attach_force_model(&mut self, propagator: &str, mode: ManageMode) -> Result<()> {
        let fm_name = format!("{}{}", propagator, FORCE_MODEL_SUFFIX);
        let store = self.store_mut(mode);
        match store.get_item(&fm_name).map(|o| o.object_type()) {
            Some(ObjectType::ForceModel) => {}
            Some(other) => {
                return Err(ScriptError::TypeMismatch {
                    name: fm_name,
                    expected: "ForceModel".to_string(),
                    actual: other.type_name().to_string(),
                })
            }
            None => {
                let created = self.workspace.factory().create("ForceModel", &fm_name)?;
                self.store_mut(mode).add_object(created.object)?;
            }
        }
        let store = self.store_mut(mode);
        if let Some(prop) = store.get_item_mut(propagator) {
            let id = prop.parameter_id("FM")?.id;
            prop.set_text(id, &fm_name)?;
        }
        Ok(())
    }
}

/// Split `A[3,2]` or `A[3]` into the name and dimensions.
fn parse_array_declaration(declaration: &str) -> Result<(&str, usize, usize)> {
    let declaration = declaration.trim();
    let invalid = || {
        ScriptError::Syntax(format!(
            "The array declaration \"{}\" must look like Name[rows, cols]",
            declaration
        ))
    };
    let open = declaration.find('[').ok_or_else(invalid)?;
    let close = text::find_matching(declaration, open).ok_or_else(invalid)?;
    if close != declaration.len() - 1 {
        return Err(invalid());
    }
    let name = declaration[..open].trim();
    let dims: Vec<usize> = text::split_top_level(&declaration[open + 1..close], ',')
        .iter()
        .map(|d| {
            text::parse_number(d)
                .filter(|v| v.fract() == 0.0 && *v >= 1.0)
                .map(|v| v as usize)
                .ok_or_else(|| {
                    ScriptError::Syntax(format!(
                        "The array dimension \"{}\" of \"{}\" must be a positive integer",
                        d.trim(),
                        name
                    ))
                })
        })
        .collect::<Result<_>>()?;
    let (rows, cols) = match dims.as_slice() {
        [n] => (1, *n),
        [rows, cols] => (*rows, *cols),
        _ => return Err(invalid()),
    };
    match rows.checked_mul(cols) {
        Some(size) if size <= MAX_ARRAY_ELEMENTS => Ok((name, rows, cols)),
        _ => Err(ScriptError::Syntax(format!(
            "The array \"{}\" is too large: {} x {} exceeds {} elements",
            name, rows, cols, MAX_ARRAY_ELEMENTS
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{downcast, TableObject};

    #[test]
    fn test_array_declaration() {
        assert_eq!(parse_array_declaration("A[3, 2]").ok(), Some(("A", 3, 2)));
        assert_eq!(parse_array_declaration("v[4]").ok(), Some(("v", 1, 4)));
        assert!(parse_array_declaration("A").is_err());
        assert!(parse_array_declaration("A[0, 2]").is_err());
        assert!(parse_array_declaration("A[1.5]").is_err());
    }

    #[test]
    fn test_oversized_array_is_rejected() {
        let err = parse_array_declaration("A[4294967296,4294967296]").unwrap_err();
        assert!(matches!(err, ScriptError::Syntax(ref m) if m.contains("\"A\" is too large")), "{}", err);
        assert!(parse_array_declaration("B[2000, 2000]").is_err());
        assert_eq!(parse_array_declaration("C[1024, 1024]").ok(), Some(("C", 1024, 1024)));
    }

    #[test]
    fn test_reserved_and_type_names() {
        let mut interpreter = Interpreter::new();
        assert!(interpreter
            .create_object("Spacecraft", "Propagate", ManageMode::Configured, true)
            .is_err());
        assert!(interpreter
            .create_object("Spacecraft", "Spacecraft", ManageMode::Configured, true)
            .is_err());
        assert!(interpreter
            .create_object("Spacecraft", "Earth", ManageMode::Configured, true)
            .is_err());
        let mut lenient = Interpreter::builder()
            .allow_type_names_as_object_names(true)
            .build();
        assert!(lenient
            .create_object("Spacecraft", "Spacecraft", ManageMode::Configured, true)
            .is_ok());
    }

    #[test]
    fn test_unmanaged_objects_are_not_registered() {
        let mut interpreter = Interpreter::new();
        let handle = interpreter
            .create_object("ImpulsiveBurn", "Burn1", ManageMode::Unmanaged, true)
            .expect("created");
        assert!(matches!(handle, ObjectHandle::Unmanaged(ref o) if o.name() == "Burn1"));
        assert!(!interpreter.workspace().config().contains("Burn1"));
    }

    #[test]
    fn test_propagator_companion() {
        let mut interpreter = Interpreter::new();
        interpreter
            .create_object("Propagator", "Prop1", ManageMode::Configured, true)
            .expect("created");
        let config = interpreter.workspace().config();
        assert!(config.get_force_model("Prop1_ForceModel").is_some());
        let prop = config
            .get_item("Prop1")
            .and_then(downcast::<TableObject>)
            .expect("propagator");
        assert_eq!(prop.text_of("FM"), "Prop1_ForceModel");
    }

    #[test]
    fn test_legacy_type_warns_once() {
        let mut interpreter = Interpreter::new();
        for name in ["Tank1", "Tank2"] {
            interpreter
                .create_object("FuelTank", name, ManageMode::Configured, true)
                .expect("created");
        }
        let tank = interpreter.workspace().config().get_item("Tank2").expect("tank");
        assert_eq!(tank.object_type(), ObjectType::ChemicalTank);
        assert_eq!(interpreter.workspace().warnings().len(), 1);
    }
}
