//! Error types for script interpretation and object configuration.

use thiserror::Error;

use crate::expression::Rule;

/// Errors that can occur while interpreting a script or manipulating the
/// configured object graph.
///
/// Every variant that concerns a property names both the field and the
/// owning object so a message can be located in a long script without a
/// debugger. Errors raised while processing a statement are wrapped in
/// [`ScriptError::AtLine`] with the original line number and text.
///
/// # Examples
///
/// ```
/// use missionscript::{Interpreter, ScriptError};
///
/// let mut interpreter = Interpreter::builder().build();
/// let result = interpreter.interpret_str(
///     "Create ImpulsiveBurn Burn1;\nBurn1.Axes = BadFrame;",
/// );
/// match result {
///     Err(ScriptError::AtLine { line, source, .. }) => {
///         assert_eq!(line, 2);
///         assert!(matches!(*source, ScriptError::InvalidValue { .. }));
///     }
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(Error, Debug)]
pub enum ScriptError {
    /// Lexical or grammar error in a statement.
    ///
    /// Unbalanced brackets, a missing equal sign, a bad colon count in a
    /// `For` loop and similar problems. Always fatal for the statement.
    #[error("{0}")]
    Syntax(String),

    /// An object with this name is already configured, or the name is empty.
    #[error("An object named \"{0}\" already exists or the name is invalid")]
    DuplicateName(String),

    /// The object does not satisfy the required type.
    #[error("The object \"{name}\" is of type {actual}, but {expected} was expected")]
    TypeMismatch {
        /// Object name.
        name: String,
        /// Required type or category.
        expected: String,
        /// Actual type name.
        actual: String,
    },

    /// No property with this label exists at any level of the type hierarchy.
    #[error("The field \"{label}\" does not exist on \"{object}\" of type {type_name}")]
    UnknownParameter {
        /// Owning object.
        object: String,
        /// Owning object's type.
        type_name: String,
        /// Property label that failed to resolve.
        label: String,
    },

    /// A referenced object cannot be found.
    #[error("Cannot find the object named \"{0}\"")]
    UnknownObject(String),

    /// A value was rejected by the property it was assigned to.
    #[error(
        "The value of \"{value}\" for field \"{field}\" on object \"{object}\" is not an allowed value.\nThe allowed values are: [{allowed}]"
    )]
    InvalidValue {
        /// Owning object.
        object: String,
        /// Property label.
        field: String,
        /// Rejected value text.
        value: String,
        /// Description of the accepted values.
        allowed: String,
    },

    /// The property cannot be set in the object's current state.
    #[error("The field \"{field}\" on object \"{object}\" is read-only")]
    ReadOnly {
        /// Owning object.
        object: String,
        /// Property label.
        field: String,
    },

    /// An array index is outside the declared dimensions.
    #[error("Index ({row}, {col}) is out of range for array \"{array}\" of size [{rows}, {cols}]")]
    IndexOutOfRange {
        /// Array name.
        array: String,
        /// One-based row index as written in the script.
        row: i64,
        /// One-based column index as written in the script.
        col: i64,
        /// Declared row count.
        rows: usize,
        /// Declared column count.
        cols: usize,
    },

    /// An assignment combination that is not allowed before the mission
    /// sequence runs, or a command referencing an unusable object.
    #[error("{0}")]
    Reference(String),

    /// A math expression failed to parse.
    #[error("Cannot parse the expression \"{expression}\" at column {column}: {message}")]
    Expression {
        /// The expression text.
        expression: String,
        /// One-based column of the failure.
        column: usize,
        /// Parser message.
        message: String,
    },

    /// A scripted value could not be evaluated.
    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    /// A parameter database lookup or mutation failed.
    #[error("Parameter database: {0}")]
    ParameterDatabase(String),

    /// A function call or function definition is unusable.
    #[error("Function error: {0}")]
    Function(String),

    /// An error raised by a specific script statement.
    #[error("Line {line}: {source}\n    \"{text}\"")]
    AtLine {
        /// One-based line number in the script.
        line: usize,
        /// The statement text.
        text: String,
        /// Underlying error.
        #[source]
        source: Box<ScriptError>,
    },

    /// Whole-graph validation failures, reported together.
    #[error("Final validation found {} problem(s):\n{}", .0.len(), .0.join("\n"))]
    Validation(Vec<String>),

    /// Statement errors accumulated in tolerant mode.
    #[error("{} error(s) found in the script:\n{}", .0.len(), join_errors(.0))]
    Multiple(Vec<ScriptError>),

    /// I/O error while reading a script or function file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScriptError {
    /// Wrap this error with the line that produced it.
    ///
    /// Errors that already carry a line are returned unchanged.
    pub fn at_line(self, line: usize, text: &str) -> Self {
        match self {
            located @ ScriptError::AtLine { .. } => located,
            other => ScriptError::AtLine {
                line,
                text: text.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, skipping line wrappers.
    pub fn root(&self) -> &ScriptError {
        match self {
            ScriptError::AtLine { source, .. } => source.root(),
            other => other,
        }
    }

    /// Line number of the statement that raised this error, if known.
    pub fn line(&self) -> Option<usize> {
        match self {
            ScriptError::AtLine { line, .. } => Some(*line),
            _ => None,
        }
    }
}

fn join_errors(errors: &[ScriptError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl From<pest::error::Error<Rule>> for ScriptError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        let column = match e.line_col {
            pest::error::LineColLocation::Pos((_, col)) => col,
            pest::error::LineColLocation::Span((_, col), _) => col,
        };
        ScriptError::Expression {
            expression: e.line().to_string(),
            column,
            message: e.variant.message().to_string(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = ScriptError> = std::result::Result<T, E>;
