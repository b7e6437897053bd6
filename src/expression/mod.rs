//! Math expressions used on the right of mission-sequence assignments and
//! inside conditions.
//!
//! Expressions are parsed with pest into a [`MathNode`] tree. Evaluation
//! is delegated to an [`EvalContext`], which resolves references
//! (`x`, `Sat1.X`, `Sat1.Earth.ECC`) and calls (`sqrt(x)`, `A(1, 2)`,
//! `UserFn(a, b)`).

use std::fmt;

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::error::{Result, ScriptError};
use crate::property::format_real;

#[derive(Parser)]
#[grammar = "expression/grammar.pest"]
struct ExpressionParser;

/// Binary operators, in increasing binding strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `^`, right associative.
    Pow,
}

impl BinaryOp {
    fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
            BinaryOp::Pow => 4,
        }
    }
}

/// Node of a parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum MathNode {
    /// Numeric literal.
    Number(f64),
    /// Variable, parameter or `object.field` chain.
    Reference(String),
    /// Function call or array element; told apart at evaluation.
    Call {
        /// Callee or array name.
        name: String,
        /// Arguments or indices.
        args: Vec<MathNode>,
    },
    /// Unary minus.
    Negate(Box<MathNode>),
    /// Binary operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<MathNode>,
        /// Right operand.
        rhs: Box<MathNode>,
    },
}

/// Resolves the names an expression reads.
pub trait EvalContext {
    /// Value of a reference.
    fn reference(&self, name: &str) -> Result<f64>;

    /// Value of `name(args)`: an array element or a function result.
    fn call(&self, name: &str, args: &[f64]) -> Result<f64>;

    /// Value of a text reference such as a `String` variable.
    fn text(&self, name: &str) -> Result<String> {
        Err(ScriptError::Evaluation(format!(
            "\"{}\" does not hold text",
            name
        )))
    }
}

impl MathNode {
    /// Parse expression text.
    ///
    /// # Examples
    ///
    /// ```
    /// use missionscript::expression::MathNode;
    ///
    /// let node = MathNode::parse("2 * Sat1.X + sqrt(4)").unwrap();
    /// assert_eq!(node.references(), vec!["Sat1.X"]);
    /// assert_eq!(node.calls(), vec!["sqrt"]);
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let mut pairs = ExpressionParser::parse(Rule::expression, text)?;
        let expr = pairs
            .next()
            .and_then(|p| p.into_inner().next())
            .ok_or_else(|| malformed(text))?;
        build_expr(expr, text)
    }

    /// Whether the node is a literal number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MathNode::Number(v) => Some(*v),
            MathNode::Negate(inner) => inner.as_number().map(|v| -v),
            _ => None,
        }
    }

    /// Names read as references, in order of first appearance.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.walk(&mut |node| {
            if let MathNode::Reference(name) = node {
                out.push(name.as_str());
            }
        });
        dedup(out)
    }

    /// Names used as callees or arrays, in order of first appearance.
    pub fn calls(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.walk(&mut |node| {
            if let MathNode::Call { name, .. } = node {
                out.push(name.as_str());
            }
        });
        dedup(out)
    }

    fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a MathNode)) {
        visit(self);
        match self {
            MathNode::Number(_) | MathNode::Reference(_) => {}
            MathNode::Call { args, .. } => args.iter().for_each(|a| a.walk(visit)),
            MathNode::Negate(inner) => inner.walk(visit),
            MathNode::Binary { lhs, rhs, .. } => {
                lhs.walk(visit);
                rhs.walk(visit);
            }
        }
    }

    /// Evaluate against a context.
    pub fn evaluate(&self, ctx: &dyn EvalContext) -> Result<f64> {
        match self {
            MathNode::Number(v) => Ok(*v),
            MathNode::Reference(name) => ctx.reference(name),
            MathNode::Call { name, args } => {
                let values = args
                    .iter()
                    .map(|a| a.evaluate(ctx))
                    .collect::<Result<Vec<_>>>()?;
                ctx.call(name, &values)
            }
            MathNode::Negate(inner) => Ok(-inner.evaluate(ctx)?),
            MathNode::Binary { op, lhs, rhs } => {
                let a = lhs.evaluate(ctx)?;
                let b = rhs.evaluate(ctx)?;
                let value = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => {
                        if b == 0.0 {
                            return Err(ScriptError::Evaluation(format!(
                                "division by zero in \"{}\"",
                                self
                            )));
                        }
                        a / b
                    }
                    BinaryOp::Pow => a.powf(b),
                };
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(ScriptError::Evaluation(format!(
                        "\"{}\" does not evaluate to a finite number",
                        self
                    )))
                }
            }
        }
    }

    fn write_operand(&self, f: &mut fmt::Formatter<'_>, parent: u8, right: bool) -> fmt::Result {
        let needs_parens = match self {
            MathNode::Binary { op, .. } => {
                op.precedence() < parent || (right && op.precedence() == parent)
            }
            MathNode::Negate(_) => parent >= 3,
            _ => false,
        };
        if needs_parens {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl fmt::Display for MathNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MathNode::Number(v) => f.write_str(&format_real(*v)),
            MathNode::Reference(name) => f.write_str(name),
            MathNode::Call { name, args } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", name, args.join(", "))
            }
            MathNode::Negate(inner) => {
                f.write_str("-")?;
                inner.write_operand(f, 3, false)
            }
            MathNode::Binary { op, lhs, rhs } => {
                let p = op.precedence();
                // `^` groups to the right, the others to the left.
                let (left_strict, right_strict) = if *op == BinaryOp::Pow {
                    (true, false)
                } else {
                    (false, true)
                };
                lhs.write_operand(f, p, left_strict)?;
                write!(f, " {} ", op.symbol())?;
                rhs.write_operand(f, p, right_strict)
            }
        }
    }
}

fn dedup(items: Vec<&str>) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

fn malformed(text: &str) -> ScriptError {
    ScriptError::Expression {
        expression: text.to_string(),
        column: 1,
        message: "unexpected structure".to_string(),
    }
}

fn build_expr(pair: Pair<Rule>, text: &str) -> Result<MathNode> {
    match pair.as_rule() {
        Rule::expr | Rule::term => {
            let mut inner = pair.into_inner();
            let first = inner.next().ok_or_else(|| malformed(text))?;
            let mut node = build_expr(first, text)?;
            while let Some(op_pair) = inner.next() {
                let op = match op_pair.as_str() {
                    "+" => BinaryOp::Add,
                    "-" => BinaryOp::Sub,
                    "*" => BinaryOp::Mul,
                    _ => BinaryOp::Div,
                };
                let rhs = inner.next().ok_or_else(|| malformed(text))?;
                node = MathNode::Binary {
                    op,
                    lhs: Box::new(node),
                    rhs: Box::new(build_expr(rhs, text)?),
                };
            }
            Ok(node)
        }
        Rule::factor => {
            let mut inner = pair.into_inner().peekable();
            let negated = inner.peek().is_some_and(|p| p.as_rule() == Rule::neg);
            if negated {
                inner.next();
            }
            let power = inner.next().ok_or_else(|| malformed(text))?;
            let node = build_expr(power, text)?;
            Ok(if negated {
                MathNode::Negate(Box::new(node))
            } else {
                node
            })
        }
        Rule::power => {
            let mut inner = pair.into_inner();
            let base = build_expr(inner.next().ok_or_else(|| malformed(text))?, text)?;
            match (inner.next(), inner.next()) {
                (Some(_), Some(exponent)) => Ok(MathNode::Binary {
                    op: BinaryOp::Pow,
                    lhs: Box::new(base),
                    rhs: Box::new(build_expr(exponent, text)?),
                }),
                _ => Ok(base),
            }
        }
        Rule::call => {
            let mut inner = pair.into_inner();
            let name = inner.next().ok_or_else(|| malformed(text))?.as_str().to_string();
            let args = inner
                .map(|a| build_expr(a, text))
                .collect::<Result<Vec<_>>>()?;
            Ok(MathNode::Call { name, args })
        }
        Rule::reference => Ok(MathNode::Reference(pair.as_str().to_string())),
        Rule::number => pair
            .as_str()
            .parse::<f64>()
            .map(MathNode::Number)
            .map_err(|e| ScriptError::Expression {
                expression: text.to_string(),
                column: pair.as_span().start() + 1,
                message: e.to_string(),
            }),
        _ => Err(malformed(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl EvalContext for Fixed {
        fn reference(&self, name: &str) -> Result<f64> {
            match name {
                "x" => Ok(3.0),
                "Sat1.X" => Ok(7000.0),
                other => Err(ScriptError::UnknownObject(other.to_string())),
            }
        }

        fn call(&self, name: &str, args: &[f64]) -> Result<f64> {
            match (name, args) {
                ("sqrt", [v]) => Ok(v.sqrt()),
                ("A", [r, c]) => Ok(r * 10.0 + c),
                _ => Err(ScriptError::Function(name.to_string())),
            }
        }
    }

    fn eval(text: &str) -> f64 {
        MathNode::parse(text)
            .and_then(|n| n.evaluate(&Fixed))
            .expect("evaluates")
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1 + 2 * 3"), 7.0);
        assert_eq!(eval("(1 + 2) * 3"), 9.0);
        assert_eq!(eval("2 ^ 3 ^ 2"), 512.0);
        assert_eq!(eval("-2 ^ 2"), -4.0);
        assert_eq!(eval("8 / 4 / 2"), 1.0);
    }

    #[test]
    fn test_references_and_calls() {
        assert_eq!(eval("Sat1.X / 1000 + x"), 10.0);
        assert_eq!(eval("sqrt(16) + A(2, 3)"), 27.0);
    }

    #[test]
    fn test_parse_error_has_column() {
        match MathNode::parse("1 + * 2") {
            Err(ScriptError::Expression { column, .. }) => assert_eq!(column, 5),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_division_by_zero() {
        let node = MathNode::parse("x / 0").expect("parses");
        assert!(matches!(
            node.evaluate(&Fixed),
            Err(ScriptError::Evaluation(_))
        ));
    }

    #[test]
    fn test_display_reparses_to_same_tree() {
        for text in ["1 - (2 - 3)", "-(x + 1) * 2", "2 ^ (1 + 1)", "(2 ^ 3) ^ 2", "A(1, x) / sqrt(x)"] {
            let node = MathNode::parse(text).expect("parses");
            let again = MathNode::parse(&node.to_string()).expect("reparses");
            assert_eq!(node, again, "{}", text);
        }
    }
}
