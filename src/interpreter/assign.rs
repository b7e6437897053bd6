//! Assignments in the object section.
//!
//! Each side of `lhs = rhs` is classified once; the target's kind then
//! decides which right-hand forms are accepted. Names that are not known
//! yet make the assignment [`Resolution::Pending`] so it can be replayed
//! after the whole script has been read.

use tracing::trace;

use super::{text, Interpreter};
use crate::error::{Result, ScriptError};
use crate::expression::{EvalContext, MathNode};
use crate::function_runner::FunctionRunner;
use crate::object::{downcast, downcast_mut, Array, SetOutcome, StringVar, Variable};
use crate::object::{ConfiguredObject, ObjectType};
use crate::property::{format_real, ParameterType, Rmatrix};

/// Outcome of [`Interpreter::make_assignment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The value was stored.
    Bound,
    /// A name is not known yet; the reason is reported if it never
    /// resolves.
    Pending(String),
}

/// One side of an assignment.
#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Number(f64),
    Text(String),
    /// `{...}` or `[...]` literal.
    List(String),
    /// A known object.
    Object(String),
    /// `Owner.Field` or `Owner.Dep.Param`.
    Property { owner: String, field: String },
    /// `A(i, j)` on a known array.
    Element { array: String, indices: Vec<String> },
    /// A valid identifier nothing is called yet.
    Name(String),
    Expression(String),
}

impl Operand {
    fn describe(&self) -> &'static str {
        match self {
            Operand::Number(_) => "Real Number",
            Operand::Text(_) => "String",
            Operand::List(_) => "List",
            Operand::Object(_) | Operand::Name(_) => "Object",
            Operand::Property { .. } => "Object Property",
            Operand::Element { .. } => "Array Element",
            Operand::Expression(_) => "Expression",
        }
    }
}

fn pending(name: &str) -> Resolution {
    Resolution::Pending(format!("Cannot find the object named \"{}\"", name))
}

impl Interpreter {
    /// Apply one object-section assignment.
    ///
    /// Supported targets are object fields (`Sat1.X = 7000`), whole
    /// variables, strings, arrays and objects (`x = 2 * y`,
    /// `Sat2 = Sat1`), and array elements (`A(2, 1) = 5`).
    ///
    /// ```
    /// use missionscript::interpreter::Resolution;
    /// use missionscript::Interpreter;
    ///
    /// let mut interpreter = Interpreter::new();
    /// interpreter.interpret_str("Create Spacecraft Sat1;").unwrap();
    /// assert_eq!(interpreter.make_assignment("Sat1.X", "7100").unwrap(), Resolution::Bound);
    /// assert!(matches!(
    ///     interpreter.make_assignment("Sat2.X", "7100").unwrap(),
    ///     Resolution::Pending(_)
    /// ));
    /// ```
    pub fn make_assignment(&mut self, lhs: &str, rhs: &str) -> Result<Resolution> {
        let lhs = lhs.trim();
        let rhs = rhs.trim();
        let value = self.classify(rhs);
        trace!(lhs, rhs, kind = value.describe(), "assignment");
        match self.classify(lhs) {
            Operand::Property { owner, field } => self.assign_property(&owner, &field, value, rhs),
            Operand::Object(name) => self.assign_object(&name, value, rhs),
            Operand::Element { array, indices } => self.assign_element(&array, &indices, value, rhs),
            Operand::Name(name) => self.unresolved(&name),
            _ => match text::split_indexed(lhs) {
                Some((array, _)) => self.unresolved(array),
                None => Err(ScriptError::Syntax(format!(
                    "\"{}\" cannot be assigned to",
                    lhs
                ))),
            },
        }
    }

    fn classify(&self, side: &str) -> Operand {
        if let Some(v) = text::parse_number(side) {
            return Operand::Number(v);
        }
        if text::is_quoted(side) {
            return Operand::Text(text::strip_quotes(side).to_string());
        }
        if side.starts_with('{') || side.starts_with('[') {
            return Operand::List(side.to_string());
        }
        if text::is_valid_name(side) {
            return match self.find(side) {
                Some(_) => Operand::Object(side.to_string()),
                None => Operand::Name(side.to_string()),
            };
        }
        if let Some((name, indices)) = text::split_indexed(side) {
            if self
                .find(name)
                .is_some_and(|o| o.object_type() == ObjectType::Array)
            {
                return Operand::Element {
                    array: name.to_string(),
                    indices,
                };
            }
        }
        let parts = text::split_dots(side);
        if parts.len() >= 2 && parts.iter().all(|p| text::is_valid_name(p)) {
            return Operand::Property {
                owner: parts[0].clone(),
                field: parts[1..].join("."),
            };
        }
        Operand::Expression(side.to_string())
    }

    /// Pending before the replay, an error during it.
    fn unresolved(&self, name: &str) -> Result<Resolution> {
        if self.replaying {
            Err(ScriptError::UnknownObject(name.to_string()))
        } else {
            Ok(pending(name))
        }
    }

    /// Evaluate `expression`; `None` when it reads a name that does not
    /// exist yet.
    pub(crate) fn evaluate(&mut self, expression: &str) -> Result<Option<f64>> {
        let node = MathNode::parse(expression)?;
        self.expression_operands(&node)?;
        match node.evaluate(&self.lookup()) {
            Ok(v) => Ok(Some(v)),
            Err(ScriptError::UnknownObject(_)) if !self.replaying => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Parameter objects an expression reads, creating system parameters
    /// such as `Sat1.Earth.RMAG` on first use.
    pub(crate) fn expression_operands(&mut self, node: &MathNode) -> Result<Vec<String>> {
        let mut operands: Vec<String> = Vec::new();
        for reference in node.references() {
            let name = if reference.contains('.') {
                self.ensure_parameter(reference)?
            } else if self
                .find(reference)
                .is_some_and(|o| o.object_type().satisfies("Parameter"))
            {
                Some(reference.to_string())
            } else {
                None
            };
            if let Some(name) = name {
                if !operands.contains(&name) {
                    operands.push(name);
                }
            }
        }
        for call in node.calls() {
            if self
                .find(call)
                .is_some_and(|o| o.object_type() == ObjectType::Array)
                && !operands.iter().any(|o| o == call)
            {
                operands.push(call.to_string());
            }
        }
        Ok(operands)
    }

    fn assign_property(
        &mut self,
        owner: &str,
        field: &str,
        value: Operand,
        raw: &str,
    ) -> Result<Resolution> {
        let Some(object) = self.find(owner) else {
            return self.unresolved(owner);
        };
        let label = match object.parameter_id(field) {
            Ok(label) => label,
            Err(e) if self.replaying => return Err(e),
            Err(e) => return Ok(Resolution::Pending(e.to_string())),
        };
        let ty = object.parameter_type(label.id)?;
        let type_name = object.type_name();
        let expected = object
            .table()
            .def(label.id)
            .and_then(|d| d.object_type)
            .unwrap_or("Object");
        let target = format!("{}.{}", owner, field);
        let Some(text) = self.property_text(&target, ty, expected, value, raw)? else {
            return Ok(Resolution::Pending(format!(
                "\"{}\" cannot be evaluated yet",
                raw
            )));
        };
        if let Some(current) = label.replacement {
            self.workspace.warn_once(
                &format!("{}.{}", type_name, field),
                &format!(
                    "The field \"{}\" of {} is deprecated; use \"{}\" instead",
                    field, type_name, current
                ),
            );
        }
        let object = self
            .find_mut(owner)
            .ok_or_else(|| ScriptError::UnknownObject(owner.to_string()))?;
        if let SetOutcome::Warned { key, message } = object.set_text(label.id, &text)? {
            self.workspace.warn_once(&key, &message);
        }
        Ok(Resolution::Bound)
    }

    /// Script text to store in a field of kind `ty`, or `None` while a
    /// numeric value cannot be computed yet.
    fn property_text(
        &mut self,
        target: &str,
        ty: ParameterType,
        expected: &str,
        value: Operand,
        raw: &str,
    ) -> Result<Option<String>> {
        match value {
            Operand::Number(_) | Operand::Text(_) | Operand::List(_) => Ok(Some(raw.to_string())),
            Operand::Name(name) => {
                if ty.is_numeric() && FunctionRunner::constant(&name).is_some() {
                    return Ok(self.evaluate(raw)?.map(format_real));
                }
                if ty.is_numeric() && !self.replaying {
                    return Ok(None);
                }
                Ok(Some(raw.to_string()))
            }
            Operand::Object(name) => {
                let source_type = self
                    .find(&name)
                    .map(|o| o.object_type())
                    .ok_or_else(|| ScriptError::UnknownObject(name.clone()))?;
                if ty.is_numeric() {
                    return Ok(self.evaluate(raw)?.map(format_real));
                }
                if ty.is_reference()
                    && matches!(
                        source_type,
                        ObjectType::Variable | ObjectType::Array | ObjectType::String
                    )
                {
                    return Err(ScriptError::TypeMismatch {
                        name: target.to_string(),
                        expected: expected.to_string(),
                        actual: source_type.type_name().to_string(),
                    });
                }
                if ty.is_text() && source_type == ObjectType::String {
                    let value = self
                        .find(&name)
                        .and_then(downcast::<StringVar>)
                        .map(|s| s.value().to_string())
                        .unwrap_or_default();
                    return Ok(Some(text::quote(&value)));
                }
                Ok(Some(raw.to_string()))
            }
            Operand::Property { .. } | Operand::Element { .. } | Operand::Expression(_) => {
                if ty.is_numeric() {
                    return Ok(self.evaluate(raw)?.map(format_real));
                }
                if ty.is_text() && matches!(value, Operand::Property { .. }) {
                    if let Ok(value) = self.lookup().text(raw) {
                        return Ok(Some(text::quote(&value)));
                    }
                }
                Ok(Some(raw.to_string()))
            }
        }
    }

    fn assign_object(&mut self, name: &str, value: Operand, raw: &str) -> Result<Resolution> {
        let target_type = self
            .find(name)
            .map(|o| o.object_type())
            .ok_or_else(|| ScriptError::UnknownObject(name.to_string()))?;
        match target_type {
            ObjectType::Variable => self.assign_variable(name, value, raw),
            ObjectType::String => self.assign_string(name, value, raw),
            ObjectType::Array => self.assign_array(name, value),
            ObjectType::Parameter => Err(ScriptError::Reference(format!(
                "The parameter \"{}\" is computed and cannot be assigned",
                name
            ))),
            other => self.assign_whole_object(name, other, value),
        }
    }

    fn mismatch(name: &str, expected: &str, actual: &str) -> ScriptError {
        ScriptError::TypeMismatch {
            name: name.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    fn assign_variable(&mut self, name: &str, value: Operand, raw: &str) -> Result<Resolution> {
        match &value {
            Operand::Number(v) => {
                let v = *v;
                if let Some(var) = self.find_mut(name).and_then(downcast_mut::<Variable>) {
                    var.set_real(v);
                }
                return Ok(Resolution::Bound);
            }
            Operand::Text(_) | Operand::List(_) => {
                return Err(Self::mismatch(name, "Real Number", value.describe()))
            }
            Operand::Object(source) => {
                let source = self
                    .find(source)
                    .ok_or_else(|| ScriptError::UnknownObject(source.clone()))?;
                let numeric = match downcast::<Array>(source) {
                    Some(array) => array.rows() == 1 && array.cols() == 1,
                    None => source.object_type().satisfies("Parameter")
                        && source.object_type() != ObjectType::String,
                };
                if !numeric {
                    return Err(Self::mismatch(name, "Real Number", source.type_name()));
                }
            }
            Operand::Name(n) => {
                if self.is_argument(n) {
                    if let Some(var) = self.find_mut(name).and_then(downcast_mut::<Variable>) {
                        var.set_expression(raw, None, [n.as_str()]);
                    }
                    return Ok(Resolution::Bound);
                }
                if FunctionRunner::constant(n).is_none() {
                    return self.unresolved(n);
                }
            }
            Operand::Property { .. } | Operand::Element { .. } | Operand::Expression(_) => {}
        }
        let node = MathNode::parse(raw)?;
        let operands = self.expression_operands(&node)?;
        let computed = match node.evaluate(&self.lookup()) {
            Ok(v) => v,
            Err(ScriptError::UnknownObject(missing)) if !self.replaying => {
                return Ok(pending(&missing))
            }
            Err(e) => return Err(e),
        };
        if let Some(var) = self.find_mut(name).and_then(downcast_mut::<Variable>) {
            var.set_expression(raw, Some(computed), operands.iter().map(String::as_str));
        }
        Ok(Resolution::Bound)
    }

    fn assign_string(&mut self, name: &str, value: Operand, raw: &str) -> Result<Resolution> {
        let text = match value {
            Operand::Text(s) => s,
            Operand::Object(source) => {
                let source = self
                    .find(&source)
                    .ok_or_else(|| ScriptError::UnknownObject(source.clone()))?;
                match downcast::<StringVar>(source) {
                    Some(s) => s.value().to_string(),
                    None => return Err(Self::mismatch(name, "String", source.type_name())),
                }
            }
            Operand::Property { ref owner, .. } => match self.lookup().text(raw) {
                Ok(s) => s,
                Err(ScriptError::UnknownObject(_)) if !self.replaying => return Ok(pending(owner)),
                Err(e) => return Err(e),
            },
            Operand::Name(n) => return self.unresolved(&n),
            other => return Err(Self::mismatch(name, "String", other.describe())),
        };
        if let Some(s) = self.find_mut(name).and_then(downcast_mut::<StringVar>) {
            s.set_string(&text);
        }
        Ok(Resolution::Bound)
    }

    fn assign_array(&mut self, name: &str, value: Operand) -> Result<Resolution> {
        let matrix = match value {
            Operand::List(literal) => {
                Rmatrix::parse(&literal).map_err(|allowed| ScriptError::InvalidValue {
                    object: name.to_string(),
                    field: "Value".to_string(),
                    value: literal.clone(),
                    allowed,
                })?
            }
            Operand::Object(source) => {
                let source = self
                    .find(&source)
                    .ok_or_else(|| ScriptError::UnknownObject(source.clone()))?;
                match downcast::<Array>(source) {
                    Some(array) => array.matrix().clone(),
                    None => return Err(Self::mismatch(name, "Array", source.type_name())),
                }
            }
            Operand::Name(n) => return self.unresolved(&n),
            other => return Err(Self::mismatch(name, "Array", other.describe())),
        };
        let array = self
            .find_mut(name)
            .and_then(downcast_mut::<Array>)
            .ok_or_else(|| ScriptError::UnknownObject(name.to_string()))?;
        array.set_matrix(matrix)?;
        Ok(Resolution::Bound)
    }

    fn assign_element(
        &mut self,
        array: &str,
        indices: &[String],
        value: Operand,
        raw: &str,
    ) -> Result<Resolution> {
        let mut resolved = Vec::with_capacity(indices.len());
        for index in indices {
            match self.evaluate(index)? {
                Some(v) => resolved.push(v.trunc() as i64),
                None => return Ok(Resolution::Pending(format!(
                    "The index \"{}\" of \"{}\" cannot be evaluated yet",
                    index, array
                ))),
            }
        }
        let rows = self
            .find(array)
            .and_then(downcast::<Array>)
            .map(|a| a.rows())
            .ok_or_else(|| ScriptError::UnknownObject(array.to_string()))?;
        let (row, col) = match resolved.as_slice() {
            [i] if rows == 1 => (1, *i),
            [i] => (*i, 1),
            [r, c] => (*r, *c),
            _ => {
                return Err(ScriptError::Syntax(format!(
                    "The array \"{}\" takes one or two indices",
                    array
                )))
            }
        };
        let target = format!("{}({})", array, indices.join(","));
        let element = match value {
            Operand::Text(_) | Operand::List(_) => {
                return Err(Self::mismatch(&target, "Real Number", value.describe()))
            }
            Operand::Name(ref n) if FunctionRunner::constant(n).is_none() => {
                return self.unresolved(n)
            }
            _ => match self.evaluate(raw)? {
                Some(v) => v,
                None => return Ok(Resolution::Pending(format!(
                    "\"{}\" cannot be evaluated yet",
                    raw
                ))),
            },
        };
        let target = self
            .find_mut(array)
            .and_then(downcast_mut::<Array>)
            .ok_or_else(|| ScriptError::UnknownObject(array.to_string()))?;
        target.set_element(row, col, element)?;
        Ok(Resolution::Bound)
    }

    /// `Sat2 = Sat1`: replace the target with a copy of the source.
    fn assign_whole_object(
        &mut self,
        name: &str,
        target_type: ObjectType,
        value: Operand,
    ) -> Result<Resolution> {
        let source = match value {
            Operand::Object(source) => source,
            Operand::Name(n) => return self.unresolved(&n),
            other => {
                return Err(Self::mismatch(
                    name,
                    target_type.type_name(),
                    other.describe(),
                ))
            }
        };
        let source = self
            .find(&source)
            .ok_or_else(|| ScriptError::UnknownObject(source.clone()))?;
        if source.object_type() != target_type {
            return Err(Self::mismatch(
                source.name(),
                target_type.type_name(),
                source.type_name(),
            ));
        }
        let mut copy = source.clone_object();
        let global = self.find(name).is_some_and(|o| o.is_global());
        copy.set_global(global);
        let in_local = self.local().is_some_and(|l| l.contains(name));
        let store = if in_local {
            self.store_mut(super::ManageMode::FunctionLocal)
        } else {
            self.workspace.config_mut()
        };
        if !store.reconfigure_item(copy, name) {
            return Err(ScriptError::Reference(format!(
                "Only configured objects can be assigned; \"{}\" is not one",
                name
            )));
        }
        Ok(Resolution::Bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(script: &str) -> Interpreter {
        let mut interpreter = Interpreter::new();
        let r = interpreter.interpret_str(script);
        assert!(r.is_ok(), "{:?}", r.err());
        interpreter
    }

    #[test]
    fn test_field_from_expression() {
        let interpreter = loaded(
            "Create Spacecraft Sat1 Sat2;\nCreate Variable r;\nr = 7000;\nSat1.X = r + 100;\nSat2.X = Sat1.X * 2;",
        );
        let config = interpreter.workspace().config();
        assert_eq!(config.get_spacecraft("Sat1").and_then(|s| s.real_of("X")), Some(7100.0));
        assert_eq!(config.get_spacecraft("Sat2").and_then(|s| s.real_of("X")), Some(14200.0));
    }

    #[test]
    fn test_variable_records_operands() {
        let interpreter = loaded("Create Spacecraft Sat1;\nCreate Variable x;\nx = Sat1.RMAG / 2;");
        let var = interpreter.workspace().config().get_variable("x").expect("x");
        assert_eq!(var.expression(), "Sat1.RMAG / 2");
        assert!(var.operands().contains("Sat1.Earth.RMAG"));
        assert!(interpreter.workspace().config().contains("Sat1.Earth.RMAG"));
    }

    #[test]
    fn test_string_and_array_assignments() {
        let interpreter = loaded(
            "Create String s t;\nCreate Array A[2,2] B[2,2];\ns = 'hello';\nt = s;\nA = [1 2; 3 4];\nB = A;\nB(2,1) = 9;",
        );
        let config = interpreter.workspace().config();
        assert_eq!(config.get_string("t").map(|s| s.value()), Some("hello"));
        let b = config.get_array("B").expect("B");
        assert_eq!(b.element(1, 2).ok(), Some(2.0));
        assert_eq!(b.element(2, 1).ok(), Some(9.0));
        assert_eq!(config.get_array("A").and_then(|a| a.element(2, 1).ok()), Some(3.0));
    }

    #[test]
    fn test_type_mismatches() {
        let mut interpreter = Interpreter::new();
        let r = interpreter.interpret_str("Create Variable x;\nCreate String s;\nx = 'text';");
        assert!(matches!(r.map_err(|e| e.root().to_string()), Err(m) if m.contains("Real Number")));

        let mut interpreter = Interpreter::new();
        let err = interpreter
            .interpret_str("Create ImpulsiveBurn B;\nCreate Variable v;\nB.Origin = v;")
            .expect_err("a variable is not a celestial body");
        assert!(matches!(err.root(), ScriptError::TypeMismatch { name, .. } if name == "B.Origin"));
    }

    #[test]
    fn test_object_copy_keeps_name() {
        let interpreter = loaded("Create Spacecraft Sat1 Sat2;\nSat1.DryMass = 1234;\nSat2 = Sat1;");
        let sat2 = interpreter.workspace().config().get_spacecraft("Sat2").expect("Sat2");
        assert_eq!(sat2.name(), "Sat2");
        assert_eq!(sat2.real_of("DryMass"), Some(1234.0));
    }

    #[test]
    fn test_unknown_names_are_pending() {
        let mut interpreter = Interpreter::new();
        assert!(matches!(
            interpreter.make_assignment("x", "5"),
            Ok(Resolution::Pending(_))
        ));
        assert!(matches!(
            interpreter.make_assignment("A(1)", "5"),
            Ok(Resolution::Pending(_))
        ));
        assert!(interpreter.make_assignment("1 + 2", "5").is_err());
    }

    #[test]
    fn test_constants_and_body_fields() {
        let interpreter = loaded("Create Variable x;\nx = 2 * pi;\nEarth.Mu = 398600;");
        let x = interpreter.workspace().config().get_variable("x").expect("x");
        assert!((x.value() - std::f64::consts::TAU).abs() < 1e-12);
        assert!(interpreter.workspace().solar_system().has_changed());
        assert_eq!(interpreter.workspace().solar_system().mu("Earth"), Some(398600.0));
    }
}
