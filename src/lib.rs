//! MissionScript: mission script interpreter for Rust
//!
//! MissionScript reads flight-dynamics mission scripts and builds the
//! object graph and command tree they describe. Every object is created,
//! configured through a reflective property interface, registered by name,
//! and finally checked so each reference points at an existing object of
//! the right type.
//!
//! # Features
//!
//! - **Object registry**: Named objects with rename, clone and removal that
//!   keep every reference consistent
//! - **Property reflection**: Fields addressed by label or id, with types,
//!   bounds, allowed values, aliases and deprecated spellings
//! - **Forward references**: Assignments naming objects created later are
//!   replayed once the whole script is read
//! - **Mission sequence**: Nested `If`/`While`/`For`/`Target`/`Optimize`
//!   blocks with solver checks and bound operand wrappers
//! - **Conditions**: `&` binds tighter than `|`, evaluated left to right
//! - **Functions**: Built-in math functions plus user functions read in
//!   function mode
//! - **Script writer**: Regenerated text reads back into the same workspace
//!
//! # Quick Start
//!
//! ```rust
//! use missionscript::Interpreter;
//!
//! # fn example() -> Result<(), missionscript::ScriptError> {
//! let mut interpreter = Interpreter::new();
//! interpreter.interpret_str(
//!     r#"
//!     Create Spacecraft Sat1;
//!     Sat1.DryMass = 850;
//!     Create Propagator Prop1;
//!     Create Variable x;
//!     x = Sat1.DryMass / 2;
//!
//!     BeginMissionSequence;
//!     While x < 1000
//!        Propagate Prop1(Sat1) {Sat1.ElapsedSecs = 60};
//!        x = x + 100;
//!     EndWhile;
//!     "#,
//! )?;
//!
//! let workspace = interpreter.workspace();
//! assert_eq!(workspace.config().get_variable("x").map(|v| v.value()), Some(425.0));
//! assert_eq!(workspace.sequence().commands().len(), 1);
//! assert_eq!(workspace.sequence().len(), 3);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! # Error Handling
//!
//! By default the first problem stops interpretation and is returned with
//! its line. With `continue_on_error` every statement is attempted and the
//! problems come back together:
//!
//! ```rust
//! use missionscript::{Interpreter, ScriptError};
//!
//! let mut interpreter = Interpreter::builder().continue_on_error(true).build();
//! let err = interpreter
//!     .interpret_str("Create Spacecraft Sat1;\nSat1.DryMass = -1;\nSat1.Cd = abc;")
//!     .unwrap_err();
//! assert!(matches!(err, ScriptError::Multiple(ref errors) if errors.len() == 2));
//! ```
//!
//! # Regenerating Scripts
//!
//! ```rust
//! use missionscript::Interpreter;
//!
//! let mut interpreter = Interpreter::new();
//! interpreter.interpret_str("Create Variable x;\nx = 2;").unwrap();
//! let text = interpreter.generating_string();
//! assert!(text.contains("Create Variable x;\nx = 2;"));
//! ```

#![warn(missing_docs)]

pub mod command;
pub mod config;
pub mod error;
pub mod expression;
pub mod factory;
pub mod function_runner;
pub mod interpreter;
pub mod object;
pub mod parameter_db;
pub mod property;
pub mod solar_system;
pub mod workspace;
pub mod writer;

// Public API exports
pub use config::ConfigManager;
pub use error::{Result, ScriptError};
pub use function_runner::FunctionRunner;
pub use interpreter::{Interpreter, InterpreterBuilder, InterpreterOptions};
pub use parameter_db::ParameterDatabase;
pub use workspace::Workspace;
