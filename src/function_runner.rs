//! Bridge from expression calls to built-in, user-defined and external
//! functions.

use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{Result, ScriptError};

/// Something that can run a named function on real arguments.
///
/// User-defined functions run inside the executor that owns their mission
/// sequence; external functions run in another engine. Both are plugged in
/// through this trait.
pub trait FunctionExecutor {
    /// Run the function and return its outputs.
    fn execute(&self, args: &[f64]) -> Result<Vec<f64>>;
}

impl<F> FunctionExecutor for F
where
    F: Fn(&[f64]) -> Result<Vec<f64>>,
{
    fn execute(&self, args: &[f64]) -> Result<Vec<f64>> {
        self(args)
    }
}

type Builtin = fn(&[f64]) -> Option<f64>;

/// `(name, arity, implementation)`
const BUILTINS: &[(&str, usize, Builtin)] = &[
    ("sin", 1, |a| Some(a[0].sin())),
    ("cos", 1, |a| Some(a[0].cos())),
    ("tan", 1, |a| Some(a[0].tan())),
    ("asin", 1, |a| (a[0].abs() <= 1.0).then(|| a[0].asin())),
    ("acos", 1, |a| (a[0].abs() <= 1.0).then(|| a[0].acos())),
    ("atan", 1, |a| Some(a[0].atan())),
    ("atan2", 2, |a| Some(a[0].atan2(a[1]))),
    ("sqrt", 1, |a| (a[0] >= 0.0).then(|| a[0].sqrt())),
    ("exp", 1, |a| Some(a[0].exp())),
    ("log", 1, |a| (a[0] > 0.0).then(|| a[0].ln())),
    ("log10", 1, |a| (a[0] > 0.0).then(|| a[0].log10())),
    ("abs", 1, |a| Some(a[0].abs())),
    ("mod", 2, |a| (a[1] != 0.0).then(|| a[0] - (a[0] / a[1]).floor() * a[1])),
    ("DegToRad", 1, |a| Some(a[0].to_radians())),
    ("RadToDeg", 1, |a| Some(a[0].to_degrees())),
];

const CONSTANTS: &[(&str, f64)] = &[("pi", std::f64::consts::PI), ("e", std::f64::consts::E)];

/// Calls from expressions, resolved in order: built-ins, then registered
/// user or external functions.
///
/// # Examples
///
/// ```
/// use missionscript::FunctionRunner;
///
/// let mut runner = FunctionRunner::new();
/// runner.register("Twice", |args: &[f64]| Ok(vec![args[0] * 2.0]));
/// assert_eq!(runner.call("Twice", &[21.0]).unwrap(), 42.0);
/// assert_eq!(runner.call("sqrt", &[9.0]).unwrap(), 3.0);
/// ```
#[derive(Default)]
pub struct FunctionRunner {
    functions: IndexMap<String, Box<dyn FunctionExecutor>>,
}

impl fmt::Debug for FunctionRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRunner")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FunctionRunner {
    /// A runner with only the built-ins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `name` callable from expressions.
    pub fn register(&mut self, name: &str, executor: impl FunctionExecutor + 'static) {
        debug!(name, "registering function executor");
        self.functions.insert(name.to_string(), Box::new(executor));
    }

    /// Whether `name` is a built-in function.
    pub fn is_builtin(name: &str) -> bool {
        BUILTINS.iter().any(|(n, _, _)| *n == name)
    }

    /// Value of a built-in constant.
    pub fn constant(name: &str) -> Option<f64> {
        CONSTANTS.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    /// Whether `name` resolves to something callable.
    pub fn is_callable(&self, name: &str) -> bool {
        Self::is_builtin(name) || self.functions.contains_key(name)
    }

    /// Call `name` and return its first output.
    pub fn call(&self, name: &str, args: &[f64]) -> Result<f64> {
        if let Some((_, arity, f)) = BUILTINS.iter().find(|(n, _, _)| *n == name) {
            if args.len() != *arity {
                return Err(ScriptError::Function(format!(
                    "{} expects {} argument(s), got {}",
                    name,
                    arity,
                    args.len()
                )));
            }
            return f(args).ok_or_else(|| {
                ScriptError::Evaluation(format!("{} is undefined for {:?}", name, args))
            });
        }
        let executor = self
            .functions
            .get(name)
            .ok_or_else(|| ScriptError::Function(format!("Unknown function \"{}\"", name)))?;
        let outputs = executor.execute(args)?;
        outputs.first().copied().ok_or_else(|| {
            ScriptError::Function(format!(
                "The function \"{}\" returns no value and cannot be used in an expression",
                name
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_arity() {
        let runner = FunctionRunner::new();
        assert!(runner.call("atan2", &[1.0]).is_err());
        assert_eq!(runner.call("mod", &[7.0, 3.0]).ok(), Some(1.0));
        assert!(runner.call("sqrt", &[-1.0]).is_err());
    }

    #[test]
    fn test_user_function_first_output() {
        let mut runner = FunctionRunner::new();
        runner.register("Pair", |_: &[f64]| Ok(vec![1.0, 2.0]));
        runner.register("Nothing", |_: &[f64]| Ok(Vec::new()));
        assert_eq!(runner.call("Pair", &[]).ok(), Some(1.0));
        assert!(runner.call("Nothing", &[]).is_err());
        assert!(runner.call("Missing", &[]).is_err());
        assert!(runner.is_callable("Pair"));
    }

    #[test]
    fn test_constants() {
        assert_eq!(FunctionRunner::constant("pi"), Some(std::f64::consts::PI));
        assert_eq!(FunctionRunner::constant("tau"), None);
    }
}
