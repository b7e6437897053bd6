//! Evaluatable handles over scripted values.

use std::fmt;

use crate::error::{Result, ScriptError};
use crate::expression::{EvalContext, MathNode};
use crate::interpreter::text;

/// What an [`ElementWrapper`] reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperKind {
    /// Numeric literal.
    Number,
    /// Quoted text literal.
    Text,
    /// A `Variable`.
    Variable,
    /// A `String` variable.
    StringVariable,
    /// A whole `Array`.
    Array,
    /// One element of an `Array`, as in `A(2, i)`.
    ArrayElement,
    /// A field of a configured object, as in `Sat1.DryMass`.
    ObjectProperty,
    /// A system parameter, as in `Sat1.Earth.ECC`.
    Parameter,
    /// An arithmetic expression over any of the above.
    Expression,
}

/// Evaluated value of a wrapper.
#[derive(Debug, Clone, PartialEq)]
pub enum WrapperValue {
    /// Numeric result.
    Real(f64),
    /// Text result.
    Text(String),
}

/// A typed, evaluatable handle over a scripted value.
///
/// Wrappers are built from a description string by the validator once all
/// objects exist; evaluation resolves names through an [`EvalContext`].
#[derive(Debug, Clone, PartialEq)]
pub struct ElementWrapper {
    description: String,
    kind: WrapperKind,
    node: Option<MathNode>,
}

impl ElementWrapper {
    /// Wrap a numeric or reference description that parses as an
    /// expression.
    pub fn new(description: &str, kind: WrapperKind) -> Result<Self> {
        let description = description.trim();
        let node = match kind {
            WrapperKind::Text | WrapperKind::StringVariable => None,
            WrapperKind::Array => Some(MathNode::Reference(description.to_string())),
            _ => Some(MathNode::parse(description)?),
        };
        Ok(Self {
            description: description.to_string(),
            kind,
            node,
        })
    }

    /// Wrap a quoted literal.
    pub fn text(literal: &str) -> Self {
        Self {
            description: literal.trim().to_string(),
            kind: WrapperKind::Text,
            node: None,
        }
    }

    /// The text the wrapper was built from.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// What the wrapper reads.
    pub fn kind(&self) -> WrapperKind {
        self.kind
    }

    /// Whether the wrapper yields text.
    pub fn is_text(&self) -> bool {
        matches!(self.kind, WrapperKind::Text | WrapperKind::StringVariable)
    }

    /// Configured object names the wrapper depends on: reference owners
    /// and array or function names.
    pub fn object_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        };
        match (&self.node, self.kind) {
            (_, WrapperKind::StringVariable) => push(&self.description),
            (Some(node), _) => {
                for reference in node.references() {
                    let owner = reference.split('.').next().unwrap_or(reference);
                    push(owner);
                }
                for call in node.calls() {
                    push(call);
                }
            }
            (None, _) => {}
        }
        names
    }

    /// Evaluate the wrapper.
    pub fn evaluate(&self, ctx: &dyn EvalContext) -> Result<WrapperValue> {
        match self.kind {
            WrapperKind::Text => Ok(WrapperValue::Text(
                text::strip_quotes(&self.description).to_string(),
            )),
            WrapperKind::StringVariable => ctx.text(&self.description).map(WrapperValue::Text),
            _ => self.real(ctx).map(WrapperValue::Real),
        }
    }

    /// Evaluate the wrapper as a number.
    pub fn real(&self, ctx: &dyn EvalContext) -> Result<f64> {
        match &self.node {
            Some(node) if !self.is_text() => node.evaluate(ctx),
            _ => Err(ScriptError::Evaluation(format!(
                "\"{}\" is not a numeric value",
                self.description
            ))),
        }
    }
}

impl fmt::Display for ElementWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Values;

    impl EvalContext for Values {
        fn reference(&self, name: &str) -> Result<f64> {
            match name {
                "x" => Ok(2.0),
                "Sat1.X" => Ok(7000.0),
                _ => Err(ScriptError::UnknownObject(name.to_string())),
            }
        }

        fn call(&self, name: &str, args: &[f64]) -> Result<f64> {
            match name {
                "A" => Ok(args.iter().sum()),
                _ => Err(ScriptError::Function(name.to_string())),
            }
        }

        fn text(&self, name: &str) -> Result<String> {
            Ok(format!("<{}>", name))
        }
    }

    #[test]
    fn test_object_names() {
        let w = ElementWrapper::new("Sat1.X + A(1, x)", WrapperKind::Expression).expect("parses");
        assert_eq!(w.object_names(), vec!["Sat1", "x", "A"]);
        assert_eq!(w.real(&Values).ok(), Some(7003.0));
    }

    #[test]
    fn test_text_wrappers() {
        let literal = ElementWrapper::text("'abc'");
        assert_eq!(
            literal.evaluate(&Values).ok(),
            Some(WrapperValue::Text("abc".to_string()))
        );
        assert!(literal.real(&Values).is_err());
        let var = ElementWrapper::new("s", WrapperKind::StringVariable).expect("wraps");
        assert_eq!(var.object_names(), vec!["s"]);
        assert_eq!(
            var.evaluate(&Values).ok(),
            Some(WrapperValue::Text("<s>".to_string()))
        );
    }
}
