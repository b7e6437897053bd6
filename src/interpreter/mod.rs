//! The script interpreter.
//!
//! A script is read one logical statement at a time. Statements before
//! `BeginMissionSequence` create and configure objects; statements after it
//! build the mission sequence. Assignments that name objects not created
//! yet are queued and replayed once every statement has been read, then
//! [`Interpreter::final_pass`] checks and links the whole object graph and
//! command tree.
//!
//! # Example
//!
//! ```
//! use missionscript::Interpreter;
//!
//! let mut interpreter = Interpreter::builder().continue_on_error(true).build();
//! let result = interpreter.interpret_str(
//!     r#"
//!     Create ImpulsiveBurn Burn1;
//!     Burn1.Origin = Sat1;         % Sat1 is created below
//!     Create Spacecraft Sat1;
//!     Sat1.DryMass = 1000;
//!
//!     BeginMissionSequence;
//!     Maneuver Burn1(Sat1);
//!     "#,
//! );
//! assert!(result.is_ok(), "{:?}", result.err());
//! assert_eq!(interpreter.workspace().sequence().len(), 1);
//! ```

mod assemble;
mod assign;
mod create;
mod deferred;
mod final_pass;
pub(crate) mod text;
mod validator;

pub use assign::Resolution;
pub use create::{ManageMode, ObjectHandle};
pub use deferred::DelayedBlock;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::command::{CommandKind, MissionSequence};
use crate::config::ConfigManager;
use crate::error::{Result, ScriptError};
use crate::object::{ConfiguredObject, FunctionHeader, ObjectType};
use crate::workspace::{FunctionDefinition, Lookup, Workspace};
use text::SourceLine;

/// Options controlling how scripts are interpreted.
#[derive(Debug, Clone, Default)]
pub struct InterpreterOptions {
    /// Collect statement errors and keep going instead of stopping at the
    /// first one.
    pub continue_on_error: bool,
    /// Accept object names that are also type names, such as `Spacecraft`.
    pub allow_type_names_as_object_names: bool,
    /// Directory searched for `<name>.gmf` function files.
    pub function_path: Option<PathBuf>,
    /// Read function files during validation to check call arity.
    pub check_function_files: bool,
}

/// Builder for an [`Interpreter`].
#[derive(Debug, Default)]
pub struct InterpreterBuilder {
    options: InterpreterOptions,
    workspace: Option<Workspace>,
}

impl InterpreterBuilder {
    /// A builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect errors instead of stopping at the first one.
    pub fn continue_on_error(mut self, enabled: bool) -> Self {
        self.options.continue_on_error = enabled;
        self
    }

    /// Accept type names as object names.
    pub fn allow_type_names_as_object_names(mut self, enabled: bool) -> Self {
        self.options.allow_type_names_as_object_names = enabled;
        self
    }

    /// Directory searched for function files.
    pub fn function_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.function_path = Some(dir.into());
        self
    }

    /// Check call arity against function files.
    pub fn check_function_files(mut self, enabled: bool) -> Self {
        self.options.check_function_files = enabled;
        self
    }

    /// Load scripts into an existing workspace.
    pub fn workspace(mut self, workspace: Workspace) -> Self {
        self.workspace = Some(workspace);
        self
    }

    /// Build the interpreter.
    pub fn build(self) -> Interpreter {
        Interpreter::with_options(self.options, self.workspace.unwrap_or_default())
    }
}

/// Which part of a script is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Objects,
    Commands,
}

/// Builds a [`Workspace`] from mission scripts.
#[derive(Debug)]
pub struct Interpreter {
    options: InterpreterOptions,
    workspace: Workspace,
    section: Section,
    function: Option<FunctionDefinition>,
    delayed: Vec<DelayedBlock>,
    replaying: bool,
    errors: Vec<ScriptError>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter with default options over a fresh workspace.
    pub fn new() -> Self {
        Self::with_options(InterpreterOptions::default(), Workspace::new())
    }

    /// Configure an interpreter.
    pub fn builder() -> InterpreterBuilder {
        InterpreterBuilder::new()
    }

    /// An interpreter with `options` over `workspace`.
    pub fn with_options(options: InterpreterOptions, workspace: Workspace) -> Self {
        Self {
            options,
            workspace,
            section: Section::Objects,
            function: None,
            delayed: Vec::new(),
            replaying: false,
            errors: Vec::new(),
        }
    }

    /// Active options.
    pub fn options(&self) -> &InterpreterOptions {
        &self.options
    }

    /// The workspace being built.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// The workspace being built, mutable.
    pub fn workspace_mut(&mut self) -> &mut Workspace {
        &mut self.workspace
    }

    /// Hand the built workspace to the caller.
    pub fn into_workspace(self) -> Workspace {
        self.workspace
    }

    /// Whether the mission sequence has started.
    pub fn in_mission_sequence(&self) -> bool {
        self.section == Section::Commands
    }

    /// Interpret a whole script.
    ///
    /// In fail-fast mode the first error is returned with its line. With
    /// `continue_on_error` every statement is attempted; a single problem
    /// is returned as is and several as [`ScriptError::Multiple`].
    pub fn interpret_str(&mut self, script: &str) -> Result<()> {
        self.section = Section::Objects;
        let lines = text::logical_lines(script);
        info!(statements = lines.len(), "interpreting script");
        self.run(&lines)
    }

    /// Interpret the script stored at `path`.
    pub fn interpret_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading script");
        let script = std::fs::read_to_string(path)?;
        self.interpret_str(&script)
    }

    /// Interpret a function file in function mode.
    ///
    /// The first statement must be the `function [out] = name(in)` header.
    /// Objects created by the body go to the function's own store and its
    /// commands to the function's own sequence; the parsed body is then
    /// stored in the workspace.
    pub fn interpret_function(&mut self, name: &str, script: &str) -> Result<()> {
        let lines = text::logical_lines(script);
        let Some((first, body)) = lines.split_first() else {
            return Err(ScriptError::Function(format!(
                "The function file for \"{}\" is empty",
                name
            )));
        };
        let header = FunctionHeader::parse(&first.text).map_err(|e| e.at_line(first.line, &first.text))?;
        if header.name != name {
            return Err(ScriptError::Function(format!(
                "The function file for \"{}\" defines \"{}\"",
                name, header.name
            ))
            .at_line(first.line, &first.text));
        }
        info!(function = name, statements = body.len(), "interpreting function");
        let saved = self.section;
        self.section = Section::Objects;
        self.function = Some(FunctionDefinition::new(header));
        let result = self.run(body);
        self.section = saved;
        if let Some(definition) = self.function.take() {
            self.workspace.define_function(definition);
        }
        result
    }

    fn run(&mut self, lines: &[SourceLine]) -> Result<()> {
        self.delayed.clear();
        self.errors.clear();
        for line in lines {
            if let Err(e) = self.interpret_line(line) {
                self.record(e.at_line(line.line, &line.text))?;
            }
        }
        for kind in self.sequence_mut().close_all() {
            let end = kind.end_keyword().unwrap_or("End");
            self.record(ScriptError::Syntax(format!(
                "The {} block is never closed with {}",
                kind, end
            )))?;
        }
        self.replay_delayed()?;
        let checked = if self.function.is_some() {
            self.validate_function()
        } else {
            self.final_pass()
        };
        if let Err(e) = checked {
            self.record(e)?;
        }
        let mut errors = std::mem::take(&mut self.errors);
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ScriptError::Multiple(errors)),
        }
    }

    /// Keep `error` in tolerant mode, return it otherwise.
    fn record(&mut self, error: ScriptError) -> Result<()> {
        if self.options.continue_on_error {
            debug!(%error, "continuing after error");
            self.errors.push(error);
            Ok(())
        } else {
            Err(error)
        }
    }

    fn interpret_line(&mut self, line: &SourceLine) -> Result<()> {
        let statement = line.text.trim();
        let statement = statement
            .strip_prefix("GMAT ")
            .map(str::trim)
            .unwrap_or(statement);
        text::check_brackets(statement).map_err(ScriptError::Syntax)?;
        debug!(line = line.line, statement, "statement");
        let (first, rest) = text::split_first_word(statement);
        match first {
            "Create" => self.interpret_create(rest),
            "Global" => self.interpret_global(rest),
            "BeginMissionSequence" => self.begin_mission_sequence(),
            "Else" => {
                self.enter_commands(first);
                self.sequence_mut().begin_else()
            }
            word if word.starts_with("End") && CommandKind::BLOCK_WORDS.contains(&word) => {
                self.enter_commands(word);
                self.sequence_mut().close(word)
            }
            word if CommandKind::from_keyword(word).is_some() => {
                self.enter_commands(word);
                self.create_command(word, rest, line.line)
            }
            _ => self.interpret_statement(statement, line),
        }
    }

    /// Assignments and function calls.
    fn interpret_statement(&mut self, statement: &str, line: &SourceLine) -> Result<()> {
        if self.is_call_statement(statement) {
            self.enter_commands("a function call");
            return self.create_command("", statement, line.line);
        }
        let Some((lhs, rhs)) = text::split_assignment(statement) else {
            return Err(ScriptError::Syntax(format!(
                "\"{}\" is not a statement; expected Create, an assignment or a command",
                statement
            )));
        };
        if lhs.is_empty() || rhs.is_empty() {
            return Err(ScriptError::Syntax(format!(
                "The assignment \"{}\" needs both sides of the equal sign",
                statement
            )));
        }
        if self.section == Section::Commands {
            return self.create_command("", statement, line.line);
        }
        if self.reads_argument(statement) {
            self.enter_commands("an assignment using a function argument");
            return self.create_command("", statement, line.line);
        }
        match self.make_assignment(lhs, rhs)? {
            Resolution::Bound => Ok(()),
            Resolution::Pending(reason) => {
                self.defer(DelayedBlock {
                    line: line.line,
                    text: line.text.clone(),
                    lhs: lhs.to_string(),
                    rhs: rhs.to_string(),
                    reason,
                });
                Ok(())
            }
        }
    }

    /// `[a, b] = F(x)`, `x = F(y)` with `F` a declared function, `F(x)` or
    /// a bare declared function name.
    fn is_call_statement(&self, statement: &str) -> bool {
        if statement.starts_with('[') {
            return true;
        }
        let callee = match text::split_assignment(statement) {
            Some((_, rhs)) => rhs,
            None => statement,
        };
        let name = text::split_call(callee).map(|(n, _)| n).unwrap_or(callee.trim());
        self.is_declared_function(name)
            || (text::split_assignment(statement).is_none()
                && text::split_call(statement).is_some_and(|(n, _)| {
                    text::is_valid_name(n) && self.find(n).is_none()
                }))
    }

    /// Whether a statement names an argument of the function being read.
    /// Arguments have no value until the function is called.
    fn reads_argument(&self, statement: &str) -> bool {
        self.function.is_some()
            && statement
                .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .any(|word| self.is_argument(word))
    }

    fn is_declared_function(&self, name: &str) -> bool {
        self.find(name)
            .is_some_and(|o| o.object_type().satisfies("Function"))
    }

    fn begin_mission_sequence(&mut self) -> Result<()> {
        if self.section == Section::Commands {
            return Err(ScriptError::Syntax(
                "BeginMissionSequence appears more than once".to_string(),
            ));
        }
        info!("object section complete");
        self.section = Section::Commands;
        Ok(())
    }

    /// Switch to the mission sequence when a command appears in the
    /// object section.
    fn enter_commands(&mut self, trigger: &str) {
        if self.section == Section::Commands {
            return;
        }
        if self.function.is_none() {
            self.workspace.warn_once(
                "BeginMissionSequence",
                &format!(
                    "No BeginMissionSequence found; {} starts the mission sequence",
                    trigger
                ),
            );
        }
        info!("object section complete");
        self.section = Section::Commands;
    }

    fn interpret_create(&mut self, rest: &str) -> Result<()> {
        let (type_name, names) = text::split_first_word(rest);
        if type_name.is_empty() || names.is_empty() {
            return Err(ScriptError::Syntax(
                "Create needs a type and at least one object name".to_string(),
            ));
        }
        let mode = self.manage_mode();
        for item in text::split_list(names) {
            if type_name == "Array" {
                self.create_array(&item, mode)?;
            } else {
                self.create_object(type_name, &item, mode, true)?;
            }
        }
        Ok(())
    }

    fn interpret_global(&mut self, rest: &str) -> Result<()> {
        let names = text::split_list(rest);
        if names.is_empty() {
            return Err(ScriptError::Syntax("Global needs at least one name".to_string()));
        }
        for name in names {
            let local = self
                .function
                .as_mut()
                .and_then(|f| {
                    let object = f.objects.get_item(&name).map(|o| o.clone_object())?;
                    f.objects.remove_item(object.type_name(), &name);
                    Some(object)
                });
            if let Some(mut object) = local {
                if !self.workspace.config().contains(&name) {
                    object.set_global(true);
                    self.workspace.config_mut().add_object(object)?;
                }
            }
            match self.workspace.config_mut().get_item_mut(&name) {
                Some(object) => object.set_global(true),
                None => return Err(ScriptError::UnknownObject(name)),
            }
        }
        Ok(())
    }

    fn manage_mode(&self) -> ManageMode {
        if self.function.is_some() {
            ManageMode::FunctionLocal
        } else {
            ManageMode::Configured
        }
    }

    /// Objects of the function being read, if any.
    fn local(&self) -> Option<&ConfigManager> {
        self.function.as_ref().map(|f| &f.objects)
    }

    fn lookup(&self) -> Lookup<'_> {
        self.workspace.lookup(self.local())
    }

    fn find(&self, name: &str) -> Option<&dyn ConfiguredObject> {
        self.workspace.find_object(name, self.local())
    }

    /// Mutable access to an object in the function store, the registry
    /// or the solar system. Celestial bodies are marked modified.
    fn find_mut(&mut self, name: &str) -> Option<&mut (dyn ConfiguredObject + 'static)> {
        let in_local = self
            .function
            .as_ref()
            .is_some_and(|f| f.objects.contains(name));
        if in_local {
            return self.function.as_mut().and_then(|f| f.objects.get_item_mut(name));
        }
        if self.workspace.config().contains(name) {
            return self.workspace.config_mut().get_item_mut(name);
        }
        if self.workspace.solar_system().contains(name) {
            self.workspace.solar_system_mut().mark_changed();
            return self
                .workspace
                .solar_system_mut()
                .body_mut(name)
                .map(|b| b as &mut (dyn ConfiguredObject + 'static));
        }
        None
    }

    /// Store new objects go to.
    fn store_mut(&mut self, mode: ManageMode) -> &mut ConfigManager {
        match (mode, self.function.as_mut()) {
            (ManageMode::FunctionLocal, Some(f)) => &mut f.objects,
            _ => self.workspace.config_mut(),
        }
    }

    fn sequence_mut(&mut self) -> &mut MissionSequence {
        match self.function.as_mut() {
            Some(f) => &mut f.sequence,
            None => self.workspace.sequence_mut(),
        }
    }

    /// Whether `name` is an argument of the function being read.
    fn is_argument(&self, name: &str) -> bool {
        self.function.as_ref().is_some_and(|f| {
            f.header.inputs.iter().any(|n| n == name) || f.header.outputs.iter().any(|n| n == name)
        })
    }

    /// Whether `name` is a user function declared with `Create`.
    fn function_type(&self, name: &str) -> Option<ObjectType> {
        self.find(name)
            .map(|o| o.object_type())
            .filter(|t| t.satisfies("Function"))
    }

    /// Regenerated script text of the workspace.
    pub fn generating_string(&self) -> String {
        crate::writer::script_text(&self.workspace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_options() {
        let interpreter = Interpreter::builder()
            .continue_on_error(true)
            .allow_type_names_as_object_names(true)
            .function_path("/tmp/functions")
            .check_function_files(true)
            .build();
        let options = interpreter.options();
        assert!(options.continue_on_error);
        assert!(options.allow_type_names_as_object_names);
        assert_eq!(options.function_path, Some(PathBuf::from("/tmp/functions")));
        assert!(options.check_function_files);
    }

    #[test]
    fn test_fail_fast_reports_line() {
        let mut interpreter = Interpreter::new();
        let err = interpreter
            .interpret_str("Create Spacecraft Sat1;\nSat1.DryMass = -5;\nSat1.Cd = 1;")
            .expect_err("negative mass is rejected");
        assert_eq!(err.line(), Some(2));
        assert!(matches!(err.root(), ScriptError::InvalidValue { field, .. } if field == "DryMass"));
    }

    #[test]
    fn test_tolerant_mode_collects_errors() {
        let mut interpreter = Interpreter::builder().continue_on_error(true).build();
        let err = interpreter
            .interpret_str("Create Spacecraft Sat1;\nSat1.DryMass = -5;\nSat1.Cd = abc;\nSat1.Cr = 1.5;")
            .expect_err("two bad lines");
        match err {
            ScriptError::Multiple(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].line(), Some(2));
                assert_eq!(errors[1].line(), Some(3));
            }
            other => panic!("expected several errors, got {:?}", other),
        }
        let sat = interpreter.workspace().config().get_spacecraft("Sat1").expect("Sat1");
        assert_eq!(sat.real_of("Cr"), Some(1.5));
    }

    #[test]
    fn test_implicit_mission_sequence_warns_once() {
        let mut interpreter = Interpreter::new();
        let r = interpreter.interpret_str("Create ReportFile rf;\nToggle rf Off;\nToggle rf On;");
        assert!(r.is_ok(), "{:?}", r.err());
        assert!(interpreter.in_mission_sequence());
        assert_eq!(interpreter.workspace().sequence().len(), 2);
        let warnings = interpreter.workspace().warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("BeginMissionSequence"));
    }

    #[test]
    fn test_unclosed_block() {
        let mut interpreter = Interpreter::new();
        let err = interpreter
            .interpret_str("Create Variable x;\nBeginMissionSequence;\nWhile x < 3\nx = x + 1;")
            .expect_err("While is never closed");
        assert!(err.to_string().contains("EndWhile"), "{}", err);
    }

    #[test]
    fn test_unknown_statement() {
        let mut interpreter = Interpreter::new();
        let err = interpreter.interpret_str("Launch Sat1;").expect_err("not a statement");
        assert!(matches!(err.root(), ScriptError::Syntax(_)));
    }

    #[test]
    fn test_global_marks_objects() {
        let mut interpreter = Interpreter::new();
        let r = interpreter.interpret_str("Create Variable a b;\nGlobal a;");
        assert!(r.is_ok(), "{:?}", r.err());
        let config = interpreter.workspace_mut().config_mut();
        config.remove_non_global_items();
        assert!(config.contains("a"));
        assert!(!config.contains("b"));
    }
}
