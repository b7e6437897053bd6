//! Mission-sequence commands.
//!
//! Commands are constructed and wired here; running them belongs to the
//! executor that receives the validated [`MissionSequence`]. Container
//! commands (`If`, `While`, `For`, `Target`, `Optimize`) own their nested
//! commands, so the sequence is a tree walked recursively by validation
//! and by the script writer.

mod condition;
mod wrapper;

pub use condition::{combine, Condition, ConditionalBranch, LogicalOp, RelationalOp, Side};
pub use wrapper::{ElementWrapper, WrapperKind, WrapperValue};

use std::fmt;

use crate::error::{Result, ScriptError};

/// Kind of a mission-sequence command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// `Propagate Prop(Sat) {Sat.ElapsedSecs = 60}`
    Propagate,
    /// `Maneuver Burn(Sat)`
    Maneuver,
    /// `BeginFiniteBurn Burn(Sat)`
    BeginFiniteBurn,
    /// `EndFiniteBurn Burn(Sat)`
    EndFiniteBurn,
    /// `Report rf Sat.X Sat.Y`
    Report,
    /// `Toggle rf Off`
    Toggle,
    /// `Stop`
    Stop,
    /// `lhs = rhs`
    Assignment,
    /// `If cond ... [Else ...] EndIf`
    If,
    /// `While cond ... EndWhile`
    While,
    /// `For i = start:step:end ... EndFor`
    For,
    /// `Target solver ... EndTarget`
    Target,
    /// `Optimize solver ... EndOptimize`
    Optimize,
    /// `Vary solver(var = initial, {...})`
    Vary,
    /// `Achieve solver(goal = value, {...})`
    Achieve,
    /// `Minimize solver(objective)`
    Minimize,
    /// `NonlinearConstraint solver(lhs op rhs)`
    NonlinearConstraint,
    /// Call of a script-defined function.
    CallFunction,
    /// Call of a function run by an external engine.
    CallExternalFunction,
}

impl CommandKind {
    /// Commands that start with a keyword, by keyword.
    pub const KEYWORDS: &'static [(&'static str, CommandKind)] = &[
        ("Propagate", CommandKind::Propagate),
        ("Maneuver", CommandKind::Maneuver),
        ("BeginFiniteBurn", CommandKind::BeginFiniteBurn),
        ("EndFiniteBurn", CommandKind::EndFiniteBurn),
        ("Report", CommandKind::Report),
        ("Toggle", CommandKind::Toggle),
        ("Stop", CommandKind::Stop),
        ("If", CommandKind::If),
        ("While", CommandKind::While),
        ("For", CommandKind::For),
        ("Target", CommandKind::Target),
        ("Optimize", CommandKind::Optimize),
        ("Vary", CommandKind::Vary),
        ("Achieve", CommandKind::Achieve),
        ("Minimize", CommandKind::Minimize),
        ("NonlinearConstraint", CommandKind::NonlinearConstraint),
    ];

    /// Block delimiters that are not commands on their own.
    pub const BLOCK_WORDS: &'static [&'static str] = &[
        "BeginMissionSequence",
        "Else",
        "EndIf",
        "EndWhile",
        "EndFor",
        "EndTarget",
        "EndOptimize",
    ];

    /// Kind started by `keyword`.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::KEYWORDS
            .iter()
            .find(|(k, _)| *k == keyword)
            .map(|(_, kind)| *kind)
    }

    /// Whether `word` is reserved for the mission sequence.
    pub fn is_reserved(word: &str) -> bool {
        Self::from_keyword(word).is_some() || Self::BLOCK_WORDS.contains(&word)
    }

    /// Script keyword; empty for assignments and calls.
    pub fn keyword(&self) -> &'static str {
        Self::KEYWORDS
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(k, _)| *k)
            .unwrap_or("")
    }

    /// Whether the command owns nested commands.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            CommandKind::If
                | CommandKind::While
                | CommandKind::For
                | CommandKind::Target
                | CommandKind::Optimize
        )
    }

    /// Keyword closing a container.
    pub fn end_keyword(&self) -> Option<&'static str> {
        match self {
            CommandKind::If => Some("EndIf"),
            CommandKind::While => Some("EndWhile"),
            CommandKind::For => Some("EndFor"),
            CommandKind::Target => Some("EndTarget"),
            CommandKind::Optimize => Some("EndOptimize"),
            _ => None,
        }
    }

    /// Whether the command belongs inside a solver container.
    pub fn needs_solver_container(&self) -> bool {
        matches!(
            self,
            CommandKind::Vary
                | CommandKind::Achieve
                | CommandKind::Minimize
                | CommandKind::NonlinearConstraint
        )
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Assignment => f.write_str("Assignment"),
            CommandKind::CallFunction => f.write_str("CallFunction"),
            CommandKind::CallExternalFunction => f.write_str("CallExternalFunction"),
            other => f.write_str(other.keyword()),
        }
    }
}

/// A name a command refers to and the type it must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRef {
    /// Referenced object name.
    pub name: String,
    /// Type or category the object must satisfy.
    pub expected: &'static str,
}

impl CommandRef {
    fn new(name: &str, expected: &'static str) -> Self {
        Self {
            name: name.to_string(),
            expected,
        }
    }
}

/// Propagator and the spacecraft it advances.
#[derive(Debug, Clone, PartialEq)]
pub struct PropagateSegment {
    /// Propagator name.
    pub propagator: String,
    /// Spacecraft names.
    pub spacecraft: Vec<String>,
}

/// `param = goal` stopping condition of a `Propagate`.
#[derive(Debug, Clone, PartialEq)]
pub struct StopCondition {
    /// Parameter being watched.
    pub parameter: String,
    /// Goal value text.
    pub goal: String,
}

/// Helper created by a finite-burn command to apply thrust during
/// propagation. Owned by the command, never registered.
#[derive(Debug, Clone, PartialEq)]
pub struct FiniteThrust {
    /// Generated helper name.
    pub name: String,
    /// Finite burn applied.
    pub burn: String,
    /// Spacecraft receiving thrust.
    pub spacecraft: Vec<String>,
}

/// Parsed arguments of a command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandBody {
    /// No arguments.
    Empty,
    /// `Propagate`.
    Propagate {
        /// Optional mode keyword, such as `Synchronized` or `BackProp`.
        mode: Option<String>,
        /// Propagators with their spacecraft.
        segments: Vec<PropagateSegment>,
        /// Stopping conditions.
        stops: Vec<StopCondition>,
    },
    /// `Maneuver`.
    Maneuver {
        /// Impulsive burn.
        burn: String,
        /// Target spacecraft.
        spacecraft: String,
    },
    /// `BeginFiniteBurn` / `EndFiniteBurn`.
    FiniteBurn {
        /// Finite burn.
        burn: String,
        /// Spacecraft receiving thrust.
        spacecraft: Vec<String>,
        /// Thrust helper, present for `BeginFiniteBurn`.
        thrust: Option<FiniteThrust>,
    },
    /// `Report`.
    Report {
        /// Report file.
        subscriber: String,
        /// Reported values.
        items: Vec<String>,
    },
    /// `Toggle`.
    Toggle {
        /// Subscribers switched.
        subscribers: Vec<String>,
        /// New state.
        on: bool,
    },
    /// Mission-sequence assignment.
    Assignment {
        /// Target text.
        lhs: String,
        /// Value text.
        rhs: String,
        /// Bound target.
        lhs_wrapper: Option<ElementWrapper>,
        /// Bound value.
        rhs_wrapper: Option<ElementWrapper>,
    },
    /// `If` / `While`.
    Branch(ConditionalBranch),
    /// `For`.
    For {
        /// Loop variable.
        index: String,
        /// Start value text.
        start: String,
        /// Step value text.
        step: String,
        /// End value text.
        end: String,
        /// Bound start, step and end values.
        wrappers: Vec<ElementWrapper>,
    },
    /// `Target` / `Optimize`.
    Solver {
        /// Solver name.
        solver: String,
        /// `{Key = Value}` options.
        options: Vec<(String, String)>,
    },
    /// `Vary`.
    Vary {
        /// Solver name.
        solver: String,
        /// Varied field or variable.
        variable: String,
        /// Initial value text.
        initial: String,
        /// `{Key = Value}` options.
        options: Vec<(String, String)>,
    },
    /// `Achieve`.
    Achieve {
        /// Solver name.
        solver: String,
        /// Goal parameter.
        goal: String,
        /// Goal value text.
        value: String,
        /// `{Key = Value}` options.
        options: Vec<(String, String)>,
    },
    /// `Minimize`.
    Minimize {
        /// Solver name.
        solver: String,
        /// Objective variable.
        objective: String,
    },
    /// `NonlinearConstraint`.
    Constraint {
        /// Solver name.
        solver: String,
        /// Constrained value text.
        lhs: String,
        /// `<=`, `>=` or `=`.
        op: String,
        /// Bound text.
        rhs: String,
    },
    /// Function call.
    Call {
        /// Function name.
        function: String,
        /// Input argument texts.
        inputs: Vec<String>,
        /// Output names.
        outputs: Vec<String>,
    },
}

/// A constructed mission-sequence command.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    kind: CommandKind,
    line: usize,
    description: String,
    body: CommandBody,
    children: Vec<Command>,
    else_children: Option<Vec<Command>>,
    solver: Option<String>,
    error: Option<String>,
}

impl Command {
    /// A command of `kind` built from `description`, the text after its
    /// keyword.
    pub fn new(kind: CommandKind, line: usize, description: &str) -> Self {
        Self {
            kind,
            line,
            description: description.trim().to_string(),
            body: CommandBody::Empty,
            children: Vec::new(),
            else_children: None,
            solver: None,
            error: None,
        }
    }

    /// Command kind.
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Line the command starts on.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Text after the keyword.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Parsed arguments.
    pub fn body(&self) -> &CommandBody {
        &self.body
    }

    /// Parsed arguments, mutable for binding.
    pub fn body_mut(&mut self) -> &mut CommandBody {
        &mut self.body
    }

    /// Store parsed arguments.
    pub fn set_body(&mut self, body: CommandBody) {
        self.body = body;
    }

    /// Nested commands.
    pub fn children(&self) -> &[Command] {
        &self.children
    }

    /// Nested commands, mutable.
    pub fn children_mut(&mut self) -> &mut Vec<Command> {
        &mut self.children
    }

    /// Commands of the `Else` branch.
    pub fn else_children(&self) -> Option<&[Command]> {
        self.else_children.as_deref()
    }

    /// Commands of the `Else` branch, mutable.
    pub fn else_children_mut(&mut self) -> Option<&mut Vec<Command>> {
        self.else_children.as_mut()
    }

    /// Solver bound to a solver-container command or its nested commands.
    pub fn solver(&self) -> Option<&str> {
        self.solver.as_deref()
    }

    /// Bind the solver of the enclosing container.
    pub fn set_solver(&mut self, solver: &str) {
        self.solver = Some(solver.to_string());
    }

    /// Assembly failure recorded for validation.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Record an assembly failure.
    pub fn set_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }

    /// Solver named by the command's own arguments.
    pub fn solver_name(&self) -> Option<&str> {
        match &self.body {
            CommandBody::Solver { solver, .. }
            | CommandBody::Vary { solver, .. }
            | CommandBody::Achieve { solver, .. }
            | CommandBody::Minimize { solver, .. }
            | CommandBody::Constraint { solver, .. } => Some(solver),
            _ => None,
        }
    }

    /// Names this command refers to, with the type each must satisfy.
    ///
    /// Operands that may be literals or expressions are not listed; they
    /// are checked when their wrappers are bound.
    pub fn references(&self) -> Vec<CommandRef> {
        let mut refs = Vec::new();
        match &self.body {
            CommandBody::Empty
            | CommandBody::Assignment { .. }
            | CommandBody::Branch(_)
            | CommandBody::Constraint { .. } => {}
            CommandBody::Propagate { segments, .. } => {
                for segment in segments {
                    refs.push(CommandRef::new(&segment.propagator, "PropSetup"));
                    for sat in &segment.spacecraft {
                        refs.push(CommandRef::new(sat, "SpaceObject"));
                    }
                }
            }
            CommandBody::Maneuver { burn, spacecraft } => {
                refs.push(CommandRef::new(burn, "ImpulsiveBurn"));
                refs.push(CommandRef::new(spacecraft, "Spacecraft"));
            }
            CommandBody::FiniteBurn {
                burn, spacecraft, ..
            } => {
                refs.push(CommandRef::new(burn, "FiniteBurn"));
                for sat in spacecraft {
                    refs.push(CommandRef::new(sat, "Spacecraft"));
                }
            }
            CommandBody::Report { subscriber, .. } => {
                refs.push(CommandRef::new(subscriber, "ReportFile"));
            }
            CommandBody::Toggle { subscribers, .. } => {
                for sub in subscribers {
                    refs.push(CommandRef::new(sub, "Subscriber"));
                }
            }
            CommandBody::For { index, .. } => refs.push(CommandRef::new(index, "Variable")),
            CommandBody::Solver { solver, .. } => {
                let expected = match self.kind {
                    CommandKind::Optimize => "Optimizer",
                    _ => "Targeter",
                };
                refs.push(CommandRef::new(solver, expected));
            }
            CommandBody::Vary { solver, .. }
            | CommandBody::Achieve { solver, .. }
            | CommandBody::Minimize { solver, .. } => {
                refs.push(CommandRef::new(solver, "Solver"));
            }
            CommandBody::Call { function, .. } => {
                refs.push(CommandRef::new(function, "Function"));
            }
        }
        refs
    }

    /// Command-level consistency problems.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if let Some(error) = &self.error {
            problems.push(error.clone());
        }
        match &self.body {
            CommandBody::Propagate { segments, .. } if segments.is_empty() => {
                problems.push("Propagate needs at least one propagator".to_string());
            }
            CommandBody::Propagate { segments, .. } => {
                for segment in segments.iter().filter(|s| s.spacecraft.is_empty()) {
                    problems.push(format!(
                        "The propagator \"{}\" has no spacecraft to propagate",
                        segment.propagator
                    ));
                }
            }
            CommandBody::Toggle { subscribers, .. } if subscribers.is_empty() => {
                problems.push("Toggle needs at least one subscriber".to_string());
            }
            CommandBody::For { step, .. } if step.trim() == "0" => {
                problems.push("The step of a For loop cannot be zero".to_string());
            }
            CommandBody::Branch(branch) => {
                if let Err(e) = branch.check_structure() {
                    problems.push(e.to_string());
                }
            }
            _ => {}
        }
        problems
    }

    /// Script text of this command alone, without nested commands.
    pub fn generating_string(&self) -> String {
        match self.kind {
            CommandKind::Assignment | CommandKind::CallFunction | CommandKind::CallExternalFunction => {
                format!("{};", self.description)
            }
            CommandKind::Stop => "Stop;".to_string(),
            kind if kind.is_container() => format!("{} {}", kind.keyword(), self.description),
            kind => format!("{} {};", kind.keyword(), self.description),
        }
    }
}

/// Commands in a block currently being filled.
#[derive(Debug)]
struct OpenBlock {
    command: Command,
    in_else: bool,
}

/// The ordered command tree handed to the executor.
///
/// While a script is parsed, containers stay open on a stack; nested
/// commands are appended to the innermost open container and the container
/// joins its parent when its closing keyword is read.
#[derive(Debug, Default)]
pub struct MissionSequence {
    commands: Vec<Command>,
    open: Vec<OpenBlock>,
}

impl MissionSequence {
    /// An empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level commands.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Top-level commands, mutable.
    pub fn commands_mut(&mut self) -> &mut Vec<Command> {
        &mut self.commands
    }

    /// Number of commands in the whole tree.
    pub fn len(&self) -> usize {
        fn count(commands: &[Command]) -> usize {
            commands
                .iter()
                .map(|c| 1 + count(&c.children) + c.else_children().map(count).unwrap_or(0))
                .sum()
        }
        count(&self.commands)
    }

    /// Whether no command was added.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.open.is_empty()
    }

    /// Kinds of the open containers, innermost last.
    pub fn open_kinds(&self) -> Vec<CommandKind> {
        self.open.iter().map(|b| b.command.kind).collect()
    }

    /// Solver of the innermost open `Target` or `Optimize`.
    pub fn enclosing_solver(&self) -> Option<&str> {
        self.open
            .iter()
            .rev()
            .find(|b| matches!(b.command.kind, CommandKind::Target | CommandKind::Optimize))
            .and_then(|b| b.command.solver_name())
    }

    fn current_list(&mut self) -> &mut Vec<Command> {
        match self.open.last_mut() {
            Some(block) if block.in_else => block.command.else_children.get_or_insert_with(Vec::new),
            Some(block) => &mut block.command.children,
            None => &mut self.commands,
        }
    }

    /// Append a command at the current insertion point and return it for
    /// further assembly. Containers become the new insertion point.
    pub fn append(&mut self, command: Command) -> &mut Command {
        if command.kind.is_container() {
            self.open.push(OpenBlock {
                command,
                in_else: false,
            });
            let last = self.open.len() - 1;
            return &mut self.open[last].command;
        }
        let list = self.current_list();
        list.push(command);
        let last = list.len() - 1;
        &mut list[last]
    }

    /// Switch the innermost `If` to its `Else` branch.
    pub fn begin_else(&mut self) -> Result<()> {
        match self.open.last_mut() {
            Some(block) if block.command.kind == CommandKind::If && !block.in_else => {
                block.in_else = true;
                block.command.else_children = Some(Vec::new());
                Ok(())
            }
            Some(block) if block.command.kind == CommandKind::If => Err(ScriptError::Syntax(
                "An If block can have only one Else".to_string(),
            )),
            _ => Err(ScriptError::Syntax("Else found outside an If block".to_string())),
        }
    }

    /// Close the innermost container with `end_keyword`.
    pub fn close(&mut self, end_keyword: &str) -> Result<()> {
        let Some(block) = self.open.last() else {
            return Err(ScriptError::Syntax(format!(
                "{} found without an open block",
                end_keyword
            )));
        };
        let expected = block.command.kind.end_keyword().unwrap_or("");
        if expected != end_keyword {
            return Err(ScriptError::Syntax(format!(
                "{} found where {} was expected",
                end_keyword, expected
            )));
        }
        if let Some(block) = self.open.pop() {
            self.current_list().push(block.command);
        }
        Ok(())
    }

    /// Close every container left open, returning their kinds.
    pub fn close_all(&mut self) -> Vec<CommandKind> {
        let mut unclosed = Vec::new();
        while let Some(block) = self.open.pop() {
            unclosed.push(block.command.kind);
            self.current_list().push(block.command);
        }
        unclosed
    }

    /// Drop every command.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.open.clear();
    }
}

/// Problems found by a command-sequence walk.
///
/// Reports from nested walks are combined by concatenation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Missing or mistyped references.
    pub missing: Vec<String>,
    /// Commands that failed their own checks.
    pub failed: Vec<String>,
}

impl ValidationReport {
    /// An empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing was found.
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.failed.is_empty()
    }

    /// Number of problems.
    pub fn len(&self) -> usize {
        self.missing.len() + self.failed.len()
    }

    /// Concatenate another report onto this one.
    pub fn merge(mut self, other: ValidationReport) -> Self {
        self.missing.extend(other.missing);
        self.failed.extend(other.failed);
        self
    }

    /// Every problem, references first.
    pub fn problems(&self) -> Vec<String> {
        self.missing.iter().chain(&self.failed).cloned().collect()
    }

    /// The report as one aggregate error, if anything was found.
    pub fn into_error(self) -> Option<ScriptError> {
        (!self.is_empty()).then(|| ScriptError::Validation(self.problems()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_append_and_close() {
        let mut seq = MissionSequence::new();
        seq.append(Command::new(CommandKind::If, 1, "x > 1"));
        seq.append(Command::new(CommandKind::Stop, 2, ""));
        seq.begin_else().expect("else");
        seq.append(Command::new(CommandKind::Stop, 4, ""));
        assert!(seq.close("EndWhile").is_err());
        seq.close("EndIf").expect("closes");
        assert_eq!(seq.commands().len(), 1);
        let branch = &seq.commands()[0];
        assert_eq!(branch.children().len(), 1);
        assert_eq!(branch.else_children().map(|c| c.len()), Some(1));
        assert_eq!(seq.len(), 3);
    }

    #[test]
    fn test_else_outside_if() {
        let mut seq = MissionSequence::new();
        assert!(seq.begin_else().is_err());
        seq.append(Command::new(CommandKind::While, 1, "x < 2"));
        assert!(seq.begin_else().is_err());
        assert_eq!(seq.close_all(), vec![CommandKind::While]);
        assert_eq!(seq.commands().len(), 1);
    }

    #[test]
    fn test_enclosing_solver() {
        let mut seq = MissionSequence::new();
        let target = seq.append(Command::new(CommandKind::Target, 1, "DC1"));
        target.set_body(CommandBody::Solver {
            solver: "DC1".to_string(),
            options: Vec::new(),
        });
        seq.append(Command::new(CommandKind::For, 2, "i = 1:3"));
        assert_eq!(seq.enclosing_solver(), Some("DC1"));
    }

    #[test]
    fn test_report_merge() {
        let a = ValidationReport {
            missing: vec!["m1".to_string()],
            failed: Vec::new(),
        };
        let b = ValidationReport {
            missing: vec!["m2".to_string()],
            failed: vec!["f1".to_string()],
        };
        let merged = a.merge(b);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.problems(), vec!["m1", "m2", "f1"]);
        assert!(ValidationReport::new().into_error().is_none());
    }
}
