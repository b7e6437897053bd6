//! Whole-script validation and reference linking.
//!
//! Runs once every statement has been read and every delayed assignment
//! replayed. Each problem found is collected so a script with several
//! mistakes reports all of them at once.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{text, Interpreter};
use crate::command::{Command, CommandBody, CommandKind, ElementWrapper, Side, ValidationReport, WrapperKind};
use crate::error::{Result, ScriptError};
use crate::object::{downcast_mut, ConfiguredObject, FunctionHeader, ObjectId, ObjectType, Variable};
use crate::property::PropertyValue;

/// Extension of script function files.
const FUNCTION_FILE_EXTENSION: &str = "gmf";

fn locate(line: usize, kind: CommandKind, message: impl std::fmt::Display) -> String {
    format!("Line {} ({}): {}", line, kind, message)
}

impl Interpreter {
    /// Check and link the configured objects and the mission sequence.
    ///
    /// Every object reference must name an existing object of the right
    /// type; resolved handles are then recorded on the referring objects.
    /// Object-level checks and the command checks of
    /// [`Interpreter::validate_mcs_commands`] follow. All problems are
    /// returned together as [`ScriptError::Validation`].
    pub fn final_pass(&mut self) -> Result<()> {
        let mut problems = self.create_report_parameters();
        problems.extend(self.link_objects());
        problems.extend(self.validate_mcs_commands().problems());
        if problems.is_empty() {
            info!(objects = self.workspace.config().len(), "final pass complete");
            Ok(())
        } else {
            info!(problems = problems.len(), "final pass found problems");
            Err(ScriptError::Validation(problems))
        }
    }

    /// Create the system parameters listed by report files.
    fn create_report_parameters(&mut self) -> Vec<String> {
        let requests: Vec<(String, String)> = self
            .workspace
            .config()
            .items()
            .filter(|o| o.object_type() == ObjectType::ReportFile)
            .filter_map(|o| match o.get_by_label("Add") {
                Ok(PropertyValue::StringArray(items)) => {
                    Some(items.into_iter().map(|i| (o.name().to_string(), i)).collect::<Vec<_>>())
                }
                _ => None,
            })
            .flatten()
            .collect();
        let mut problems = Vec::new();
        for (report, item) in requests {
            let known = if text::is_valid_name(&item) {
                Ok(self.find(&item).is_some())
            } else {
                let is_field = item.split_once('.').is_some_and(|(owner, field)| {
                    self.find(owner).is_some_and(|o| o.parameter_id(field).is_ok())
                });
                if is_field {
                    Ok(true)
                } else {
                    self.ensure_parameter(&item).map(|p| p.is_some())
                }
            };
            match known {
                Ok(true) => {}
                Ok(false) => problems.push(format!(
                    "ReportFile \"{}\": cannot find \"{}\" to report",
                    report, item
                )),
                Err(e) => problems.push(format!("ReportFile \"{}\": {}", report, e)),
            }
        }
        problems
    }

    /// Check object references and record their handles.
    fn link_objects(&mut self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut bindings: Vec<(String, String, ObjectId)> = Vec::new();
        let workspace = &self.workspace;
        for object in workspace.config().items() {
            for reference in object.referenced_objects() {
                let Some(target) = workspace.find_object(&reference.name, None) else {
                    problems.push(format!(
                        "{} \"{}\": the {} field references \"{}\", which does not exist",
                        object.type_name(),
                        object.name(),
                        reference.field,
                        reference.name
                    ));
                    continue;
                };
                if !target.object_type().satisfies(reference.expected) {
                    problems.push(format!(
                        "{} \"{}\": the {} field needs a {}, but \"{}\" is a {}",
                        object.type_name(),
                        object.name(),
                        reference.field,
                        reference.expected,
                        reference.name,
                        target.type_name()
                    ));
                    continue;
                }
                let id = workspace
                    .config()
                    .get_id(&reference.name)
                    .or_else(|| workspace.solar_system().get_id(&reference.name));
                if let Some(id) = id {
                    bindings.push((object.name().to_string(), reference.name.clone(), id));
                }
            }
            problems.extend(object.validate());
        }
        debug!(count = bindings.len(), "binding object references");
        for (owner, name, id) in bindings {
            let Some(object) = self.workspace.config_mut().get_item_mut(&owner) else {
                continue;
            };
            object.bind_reference(&name, id);
            if let Some(var) = downcast_mut::<Variable>(object) {
                if var.operands().contains(&name) {
                    // Present by the check above.
                    let _ = var.operands_mut().set_binding(&name, id);
                }
            }
        }
        problems
    }

    /// Check every command of the current sequence, binding operand
    /// wrappers and solvers along the way.
    ///
    /// Missing or mistyped references are listed under
    /// [`ValidationReport::missing`], all other problems under
    /// [`ValidationReport::failed`]. Commands whose arguments failed to
    /// parse were reported when read and are not checked again.
    pub fn validate_mcs_commands(&mut self) -> ValidationReport {
        let mut commands = std::mem::take(self.sequence_mut().commands_mut());
        let report = self.check_commands(&mut commands, None);
        *self.sequence_mut().commands_mut() = commands;
        debug!(problems = report.len(), "mission sequence checked");
        report
    }

    /// Command checks for a function body.
    pub(crate) fn validate_function(&mut self) -> Result<()> {
        match self.validate_mcs_commands().into_error() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn check_commands(&mut self, commands: &mut [Command], solver: Option<&str>) -> ValidationReport {
        let mut report = ValidationReport::new();
        for command in commands.iter_mut() {
            let nested = self.check_command(command, solver);
            report = report.merge(nested);
        }
        report
    }

    fn check_command(&mut self, command: &mut Command, solver: Option<&str>) -> ValidationReport {
        let mut report = ValidationReport::new();
        let line = command.line();
        let kind = command.kind();
        if command.error().is_none() {
            for reference in command.references() {
                if self.is_argument(&reference.name) {
                    continue;
                }
                match self.find(&reference.name) {
                    None => report.missing.push(locate(
                        line,
                        kind,
                        format!("cannot find \"{}\"", reference.name),
                    )),
                    Some(object) if !object.object_type().satisfies(reference.expected) => {
                        report.missing.push(locate(
                            line,
                            kind,
                            format!(
                                "\"{}\" is a {}, but a {} is required",
                                reference.name,
                                object.type_name(),
                                reference.expected
                            ),
                        ))
                    }
                    Some(_) => {}
                }
            }
            if let Err(e) = self.bind_wrappers(command) {
                report.failed.push(locate(line, kind, e));
            }
            if let Err(message) = check_solver(command, solver) {
                report.failed.push(locate(line, kind, message));
            }
            if let Err(e) = self.check_call(command) {
                report.failed.push(locate(line, kind, e));
            }
            report
                .failed
                .extend(command.validate().into_iter().map(|p| locate(line, kind, p)));
        }
        let inner_solver = match kind {
            CommandKind::Target | CommandKind::Optimize => command.solver_name().map(str::to_string),
            _ => solver.map(str::to_string),
        };
        let mut children = std::mem::take(command.children_mut());
        report = report.merge(self.check_commands(&mut children, inner_solver.as_deref()));
        *command.children_mut() = children;
        if let Some(branch) = command.else_children_mut() {
            let mut else_children = std::mem::take(branch);
            report = report.merge(self.check_commands(&mut else_children, inner_solver.as_deref()));
            if let Some(branch) = command.else_children_mut() {
                *branch = else_children;
            }
        }
        report
    }

    /// Build the operand wrappers of one command.
    fn bind_wrappers(&mut self, command: &mut Command) -> Result<()> {
        match command.body_mut() {
            CommandBody::Assignment {
                lhs,
                rhs,
                lhs_wrapper,
                rhs_wrapper,
            } => {
                if self.is_object_copy(lhs, rhs) {
                    return Ok(());
                }
                let target = self.create_wrapper(lhs)?;
                if !matches!(
                    target.kind(),
                    WrapperKind::Variable
                        | WrapperKind::StringVariable
                        | WrapperKind::Array
                        | WrapperKind::ArrayElement
                        | WrapperKind::ObjectProperty
                ) {
                    return Err(ScriptError::Reference(format!(
                        "\"{}\" cannot be assigned to",
                        lhs
                    )));
                }
                let value = self.create_wrapper(rhs)?;
                *lhs_wrapper = Some(target);
                *rhs_wrapper = Some(value);
            }
            CommandBody::Branch(branch) => {
                let operands: Vec<(String, String)> = branch
                    .conditions()
                    .iter()
                    .map(|c| (c.lhs.clone(), c.rhs.clone()))
                    .collect();
                for (index, (lhs, rhs)) in operands.iter().enumerate() {
                    let left = self.create_wrapper(lhs)?;
                    let right = self.create_wrapper(rhs)?;
                    if left.is_text() != right.is_text() {
                        return Err(ScriptError::Reference(format!(
                            "The condition comparing \"{}\" with \"{}\" mixes text and numbers",
                            lhs, rhs
                        )));
                    }
                    branch.set_wrapper(index, Side::Left, left)?;
                    branch.set_wrapper(index, Side::Right, right)?;
                }
            }
            CommandBody::For {
                start,
                step,
                end,
                wrappers,
                ..
            } => {
                let bound = [start, step, end]
                    .into_iter()
                    .map(|part| self.create_wrapper(part))
                    .collect::<Result<Vec<ElementWrapper>>>()?;
                *wrappers = bound;
            }
            CommandBody::Report { items, .. } => {
                for item in items.iter() {
                    self.create_wrapper(item)?;
                }
            }
            CommandBody::Propagate { stops, .. } => {
                for stop in stops.iter() {
                    self.create_wrapper(&stop.parameter)?;
                    if !stop.goal.is_empty() {
                        self.create_wrapper(&stop.goal)?;
                    }
                }
            }
            CommandBody::Vary {
                variable, initial, ..
            } => {
                let varied = self.create_wrapper(variable)?;
                if !matches!(
                    varied.kind(),
                    WrapperKind::Variable | WrapperKind::ObjectProperty | WrapperKind::ArrayElement
                ) {
                    return Err(ScriptError::Reference(format!(
                        "\"{}\" cannot be varied",
                        variable
                    )));
                }
                self.create_wrapper(initial)?;
            }
            CommandBody::Achieve { goal, value, .. } => {
                self.create_wrapper(goal)?;
                self.create_wrapper(value)?;
            }
            CommandBody::Minimize { objective, .. } => {
                self.create_wrapper(objective)?;
            }
            CommandBody::Constraint { lhs, rhs, .. } => {
                self.create_wrapper(lhs)?;
                self.create_wrapper(rhs)?;
            }
            CommandBody::Call {
                inputs, outputs, ..
            } => {
                for input in inputs.iter() {
                    self.create_wrapper(input)?;
                }
                for output in outputs.iter() {
                    if self.find(output).is_none() && !self.is_argument(output) {
                        return Err(ScriptError::UnknownObject(output.clone()));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// `Sat2 = Sat1` between two configured objects of the same type.
    fn is_object_copy(&self, lhs: &str, rhs: &str) -> bool {
        if !text::is_valid_name(lhs) || !text::is_valid_name(rhs) {
            return false;
        }
        match (self.find(lhs), self.find(rhs)) {
            (Some(target), Some(source)) => {
                target.object_type() == source.object_type()
                    && !target.object_type().satisfies("Parameter")
            }
            _ => false,
        }
    }

    /// Compare a call with the header of the function it calls.
    fn check_call(&self, command: &Command) -> Result<()> {
        let CommandBody::Call {
            function,
            inputs,
            outputs,
        } = command.body()
        else {
            return Ok(());
        };
        if command.kind() != CommandKind::CallFunction {
            return Ok(());
        }
        let header = match self.workspace.function(function) {
            Some(definition) => Some(definition.header.clone()),
            None if self.options.check_function_files => Some(self.read_function_header(function)?),
            None => None,
        };
        let Some(header) = header else {
            return Ok(());
        };
        if header.inputs.len() != inputs.len() || outputs.len() > header.outputs.len() {
            return Err(ScriptError::Function(format!(
                "\"{}\" takes {} input(s) and returns {} output(s), but the call passes {} and expects {}",
                function,
                header.inputs.len(),
                header.outputs.len(),
                inputs.len(),
                outputs.len()
            )));
        }
        Ok(())
    }

    /// Header of the function file for `name`.
    fn read_function_header(&self, name: &str) -> Result<FunctionHeader> {
        let file_name = format!("{}.{}", name, FUNCTION_FILE_EXTENSION);
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(function) = self.find(name) {
            if let Ok(PropertyValue::Filename(path) | PropertyValue::String(path)) =
                function.get_by_label("FunctionPath")
            {
                let path = Path::new(&path);
                if path.extension().is_some_and(|e| e == FUNCTION_FILE_EXTENSION) {
                    candidates.push(path.to_path_buf());
                } else if !path.as_os_str().is_empty() {
                    candidates.push(path.join(&file_name));
                }
            }
        }
        if let Some(dir) = &self.options.function_path {
            candidates.push(dir.join(&file_name));
        }
        let Some(path) = candidates.iter().find(|p| p.is_file()) else {
            return Err(ScriptError::Function(format!(
                "Cannot find the function file {}",
                file_name
            )));
        };
        debug!(path = %path.display(), "reading function header");
        let script = std::fs::read_to_string(path)?;
        let first = text::logical_lines(&script)
            .into_iter()
            .next()
            .ok_or_else(|| ScriptError::Function(format!("The function file {} is empty", path.display())))?;
        FunctionHeader::parse(&first.text)
    }
}

/// Solver-container rules: `Vary` and friends sit inside a `Target` or
/// `Optimize` block and name the block's solver.
fn check_solver(command: &mut Command, enclosing: Option<&str>) -> std::result::Result<(), String> {
    let kind = command.kind();
    if matches!(kind, CommandKind::Target | CommandKind::Optimize) {
        if let Some(own) = command.solver_name().map(str::to_string) {
            command.set_solver(&own);
        }
        return Ok(());
    }
    if !kind.needs_solver_container() {
        if let Some(solver) = enclosing {
            command.set_solver(solver);
        }
        return Ok(());
    }
    let own = command.solver_name().unwrap_or("").to_string();
    match enclosing {
        None => Err(format!("{} must be inside a Target or Optimize block", kind)),
        Some(solver) if solver != own => Err(format!(
            "{} uses the solver \"{}\" inside a block driven by \"{}\"",
            kind, own, solver
        )),
        Some(solver) => {
            command.set_solver(solver);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TARGETING: &str = r#"
Create Spacecraft Sat1;
Create ImpulsiveBurn TOI;
Create DifferentialCorrector DC1;
Create Propagator Prop1;
Create Variable i;

BeginMissionSequence;
Target DC1 {SolveMode = Solve};
   Vary DC1(TOI.Element1 = 1.0, {Perturbation = 0.0001});
   Maneuver TOI(Sat1);
   Propagate Prop1(Sat1) {Sat1.ElapsedSecs = 600};
   Achieve DC1(Sat1.Earth.RMAG = 42164, {Tolerance = 0.1});
EndTarget;
For i = 1:3
   Propagate Prop1(Sat1);
EndFor;
"#;

    #[test]
    fn test_targeting_sequence_links() {
        let mut interpreter = Interpreter::new();
        let r = interpreter.interpret_str(TARGETING);
        assert!(r.is_ok(), "{:?}", r.err());
        let commands = interpreter.workspace().sequence().commands();
        assert_eq!(commands.len(), 2);
        let target = &commands[0];
        assert_eq!(target.solver(), Some("DC1"));
        assert!(target.children().iter().all(|c| c.solver() == Some("DC1")));
        assert!(interpreter.workspace().config().contains("Sat1.Earth.RMAG"));
        match commands[1].body() {
            CommandBody::For { wrappers, .. } => assert_eq!(wrappers.len(), 3),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_missing_references_are_collected() {
        let mut interpreter = Interpreter::new();
        let err = interpreter
            .interpret_str("Create Spacecraft Sat1;\nBeginMissionSequence;\nManeuver Burn9(Sat1);\nPropagate Prop9(Sat1);")
            .expect_err("unknown burn and propagator");
        match err {
            ScriptError::Validation(problems) => {
                assert_eq!(problems.len(), 2, "{:?}", problems);
                assert!(problems[0].contains("Burn9"));
                assert!(problems[1].contains("Prop9"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_solver_placement() {
        let mut interpreter = Interpreter::new();
        let err = interpreter
            .interpret_str(
                "Create DifferentialCorrector DC1 DC2;\nCreate Variable x;\nBeginMissionSequence;\nVary DC1(x = 1);\nTarget DC1;\n   Achieve DC2(x = 2);\nEndTarget;",
            )
            .expect_err("misplaced solver commands");
        let text = err.to_string();
        assert!(text.contains("must be inside a Target or Optimize block"), "{}", text);
        assert!(text.contains("inside a block driven by \"DC1\""), "{}", text);
    }

    #[test]
    fn test_object_reference_checks() {
        let mut interpreter = Interpreter::new();
        let err = interpreter
            .interpret_str("Create ImpulsiveBurn Burn1;\nCreate Variable v;\nBurn1.Origin = Luna;\nCreate Spacecraft Sat1;\nSat1.Tanks = {Tank9};")
            .expect_err("Tank9 is never created");
        assert!(err.to_string().contains("Tank9"), "{}", err);
        let burn = interpreter.workspace().config().get_burn("Burn1").expect("Burn1");
        assert!(burn.bound_reference("Luna").is_some());
    }

    #[test]
    fn test_call_arity_from_function_file() {
        let dir = std::env::temp_dir().join(format!("missionscript-arity-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let mut file = std::fs::File::create(dir.join("Double.gmf")).expect("function file");
        writeln!(file, "function [y] = Double(x)\ny = 2 * x;").expect("written");

        let mut interpreter = Interpreter::builder()
            .function_path(&dir)
            .check_function_files(true)
            .build();
        let err = interpreter
            .interpret_str("Create GmatFunction Double;\nCreate Variable a b;\nBeginMissionSequence;\n[a] = Double(1, 2);")
            .expect_err("two inputs for one parameter");
        assert!(err.to_string().contains("takes 1 input(s)"), "{}", err);

        let mut interpreter = Interpreter::builder()
            .function_path(&dir)
            .check_function_files(true)
            .build();
        let r = interpreter
            .interpret_str("Create GmatFunction Double;\nCreate Variable a b;\nBeginMissionSequence;\n[a] = Double(b);");
        assert!(r.is_ok(), "{:?}", r.err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
