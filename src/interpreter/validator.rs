//! Wrapper construction and system-parameter creation.

use tracing::debug;

use super::{text, Interpreter};
use crate::command::{ElementWrapper, WrapperKind};
use crate::error::{Result, ScriptError};
use crate::expression::MathNode;
use crate::function_runner::FunctionRunner;
use crate::object::{parameter_info, ConfiguredObject, ObjectType, SystemParameter};

impl Interpreter {
    /// Build the wrapper for a command operand.
    ///
    /// Every name the operand reads must exist by now; system parameters
    /// such as `Sat1.Earth.SMA` are created on first use. Names that are
    /// arguments of the function being read are accepted unchecked.
    ///
    /// ```
    /// use missionscript::command::WrapperKind;
    /// use missionscript::Interpreter;
    ///
    /// let mut interpreter = Interpreter::new();
    /// interpreter.interpret_str("Create Spacecraft Sat1;").unwrap();
    /// let wrapper = interpreter.create_wrapper("Sat1.Earth.SMA").unwrap();
    /// assert_eq!(wrapper.kind(), WrapperKind::Parameter);
    /// assert!(interpreter.workspace().config().contains("Sat1.Earth.SMA"));
    /// ```
    pub fn create_wrapper(&mut self, description: &str) -> Result<ElementWrapper> {
        let desc = description.trim();
        if desc.is_empty() {
            return Err(ScriptError::Syntax("An operand is empty".to_string()));
        }
        if text::is_quoted(desc) {
            return Ok(ElementWrapper::text(desc));
        }
        if text::parse_number(desc).is_some() {
            return ElementWrapper::new(desc, WrapperKind::Number);
        }
        let head = desc
            .split(['.', '('])
            .next()
            .unwrap_or(desc)
            .trim();
        if self.is_argument(head) {
            let kind = if text::is_valid_name(desc) {
                WrapperKind::Variable
            } else {
                WrapperKind::Expression
            };
            return ElementWrapper::new(desc, kind);
        }
        if text::is_valid_name(desc) {
            return self.named_wrapper(desc);
        }
        if let Some((name, indices)) = text::split_indexed(desc) {
            if self
                .find(name)
                .is_some_and(|o| o.object_type() == ObjectType::Array)
            {
                for index in &indices {
                    let node = MathNode::parse(index)?;
                    self.check_expression(&node)?;
                }
                return ElementWrapper::new(desc, WrapperKind::ArrayElement);
            }
        }
        let parts = text::split_dots(desc);
        if parts.len() >= 2 && parts.iter().all(|p| text::is_valid_name(p)) {
            return self.dotted_wrapper(desc, &parts[0], &parts[1..].join("."));
        }
        let node = MathNode::parse(desc)?;
        self.check_expression(&node)?;
        ElementWrapper::new(desc, WrapperKind::Expression)
    }

    fn named_wrapper(&self, name: &str) -> Result<ElementWrapper> {
        let Some(object) = self.find(name) else {
            if FunctionRunner::constant(name).is_some() {
                return ElementWrapper::new(name, WrapperKind::Number);
            }
            return Err(ScriptError::UnknownObject(name.to_string()));
        };
        let kind = match object.object_type() {
            ObjectType::Variable => WrapperKind::Variable,
            ObjectType::String => WrapperKind::StringVariable,
            ObjectType::Array => WrapperKind::Array,
            ObjectType::Parameter => WrapperKind::Parameter,
            other => {
                return Err(ScriptError::TypeMismatch {
                    name: name.to_string(),
                    expected: "Variable, Array, String or Parameter".to_string(),
                    actual: other.type_name().to_string(),
                })
            }
        };
        ElementWrapper::new(name, kind)
    }

    /// `Owner.Field`, or a system parameter `Owner[.Dep].Type`.
    fn dotted_wrapper(&mut self, desc: &str, owner: &str, field: &str) -> Result<ElementWrapper> {
        let object = self
            .find(owner)
            .ok_or_else(|| ScriptError::UnknownObject(owner.to_string()))?;
        let type_name = object.type_name();
        let field_type = match object.parameter_id(field) {
            Ok(label) => Some(object.parameter_type(label.id)?),
            Err(_) => None,
        };
        if let Some(ty) = field_type {
            let kind = if ty.is_text() {
                WrapperKind::StringVariable
            } else {
                WrapperKind::ObjectProperty
            };
            return ElementWrapper::new(desc, kind);
        }
        if self.ensure_parameter(desc)?.is_some() {
            return ElementWrapper::new(desc, WrapperKind::Parameter);
        }
        Err(ScriptError::UnknownParameter {
            object: owner.to_string(),
            type_name: type_name.to_string(),
            label: field.to_string(),
        })
    }

    /// Fail unless every name an expression reads exists.
    fn check_expression(&mut self, node: &MathNode) -> Result<()> {
        for reference in node.references() {
            let (owner, field) = match reference.split_once('.') {
                Some((owner, field)) => (owner, Some(field)),
                None => (reference, None),
            };
            if self.is_argument(owner) {
                continue;
            }
            match field {
                None if self.find(owner).is_some() || FunctionRunner::constant(owner).is_some() => {}
                None => return Err(ScriptError::UnknownObject(owner.to_string())),
                Some(field) => {
                    let object = self
                        .find(owner)
                        .ok_or_else(|| ScriptError::UnknownObject(owner.to_string()))?;
                    if object.parameter_id(field).is_ok() {
                        continue;
                    }
                    let type_name = object.type_name();
                    if self.ensure_parameter(reference)?.is_none() {
                        return Err(ScriptError::UnknownParameter {
                            object: owner.to_string(),
                            type_name: type_name.to_string(),
                            label: field.to_string(),
                        });
                    }
                }
            }
        }
        for call in node.calls() {
            let is_array = self
                .find(call)
                .is_some_and(|o| o.object_type() == ObjectType::Array);
            if !is_array && !self.is_argument(call) && !self.workspace.runner().is_callable(call) {
                return Err(ScriptError::Function(format!(
                    "\"{}\" is neither an array nor a known function",
                    call
                )));
            }
        }
        Ok(())
    }

    /// Register the system parameter `name` if it names one.
    ///
    /// Returns the registered name, which spells out the default
    /// dependency (`Sat1.X` is registered as `Sat1.EarthMJ2000Eq.X`), or
    /// `None` when `name` is not a parameter of an existing owner.
    pub(crate) fn ensure_parameter(&mut self, name: &str) -> Result<Option<String>> {
        let parts: Vec<&str> = name.split('.').map(str::trim).collect();
        let (owner, dependency, param_type) = match parts.as_slice() {
            [owner, param_type] => (*owner, None, *param_type),
            [owner, dependency, param_type] => (*owner, Some(*dependency), *param_type),
            _ => return Ok(None),
        };
        let Some(info) = parameter_info(param_type) else {
            return Ok(None);
        };
        if !self
            .find(owner)
            .is_some_and(|o| o.object_type().satisfies(info.owner_type))
        {
            return Ok(None);
        }
        let parameter = SystemParameter::new(owner, dependency, param_type)?;
        let registered = parameter.name().to_string();
        if self.find(&registered).is_none() {
            debug!(name = %registered, "creating system parameter");
            let mode = self.manage_mode();
            self.store_mut(mode).add_object(Box::new(parameter))?;
        }
        Ok(Some(registered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpreter() -> Interpreter {
        let mut interpreter = Interpreter::new();
        let r = interpreter.interpret_str(
            "Create Spacecraft Sat1;\nCreate Variable x;\nCreate String s;\nCreate Array A[2,2];\nCreate ImpulsiveBurn Burn1;",
        );
        assert!(r.is_ok(), "{:?}", r.err());
        interpreter
    }

    #[test]
    fn test_wrapper_kinds() {
        let mut interpreter = interpreter();
        let cases = [
            ("3.5", WrapperKind::Number),
            ("'text'", WrapperKind::Text),
            ("x", WrapperKind::Variable),
            ("s", WrapperKind::StringVariable),
            ("A", WrapperKind::Array),
            ("A(1, x)", WrapperKind::ArrayElement),
            ("Sat1.DryMass", WrapperKind::ObjectProperty),
            ("Sat1.Id", WrapperKind::StringVariable),
            ("Sat1.Earth.ECC", WrapperKind::Parameter),
            ("x + Sat1.RMAG * 2", WrapperKind::Expression),
            ("pi", WrapperKind::Number),
        ];
        for (desc, kind) in cases {
            let wrapper = interpreter.create_wrapper(desc);
            assert!(wrapper.is_ok(), "{}: {:?}", desc, wrapper.err());
            assert_eq!(wrapper.map(|w| w.kind()).ok(), Some(kind), "{}", desc);
        }
    }

    #[test]
    fn test_wrapper_errors() {
        let mut interpreter = interpreter();
        assert!(matches!(interpreter.create_wrapper("ghost"), Err(ScriptError::UnknownObject(_))));
        assert!(matches!(
            interpreter.create_wrapper("Burn1"),
            Err(ScriptError::TypeMismatch { .. })
        ));
        assert!(matches!(
            interpreter.create_wrapper("Sat1.Colour"),
            Err(ScriptError::UnknownParameter { .. })
        ));
        assert!(matches!(
            interpreter.create_wrapper("x + nosuch(2)"),
            Err(ScriptError::Function(_))
        ));
    }

    #[test]
    fn test_parameter_names_are_canonical() {
        let mut interpreter = interpreter();
        assert_eq!(
            interpreter.ensure_parameter("Sat1.X").ok().flatten().as_deref(),
            Some("Sat1.EarthMJ2000Eq.X")
        );
        assert_eq!(interpreter.ensure_parameter("Sat1.DryMass").ok().flatten().as_deref(), Some("Sat1.DryMass"));
        assert_eq!(interpreter.ensure_parameter("Burn1.X").ok().flatten(), None);
        assert_eq!(interpreter.ensure_parameter("Sat9.X").ok().flatten(), None);
        assert!(interpreter.ensure_parameter("Sat1.Earth.DryMass").is_err());
    }
}
