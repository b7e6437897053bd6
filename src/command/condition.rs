//! Condition chains behind `If` and `While`.
//!
//! A chain is a flat list of relational conditions joined by `&` and `|`.
//! AND binds tighter than OR and groups are read strictly left to right:
//! `a & b | c & d | e` is `(a & b) | (c & d) | e`.

use std::fmt;

use super::wrapper::{ElementWrapper, WrapperValue};
use crate::error::{Result, ScriptError};
use crate::expression::EvalContext;

const RELATIONAL_TOKENS: &str = "==, ~=, >, <, >=, <=";

/// Relational operator of one condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationalOp {
    /// `==`
    Equal,
    /// `~=`
    NotEqual,
    /// `>`
    Greater,
    /// `<`
    Less,
    /// `>=`
    GreaterEqual,
    /// `<=`
    LessEqual,
}

impl RelationalOp {
    /// Match an operator token exactly.
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "==" => Ok(RelationalOp::Equal),
            "~=" => Ok(RelationalOp::NotEqual),
            ">" => Ok(RelationalOp::Greater),
            "<" => Ok(RelationalOp::Less),
            ">=" => Ok(RelationalOp::GreaterEqual),
            "<=" => Ok(RelationalOp::LessEqual),
            other => Err(ScriptError::Syntax(format!(
                "The relational operator \"{}\" is not allowed. The allowed operators are [{}]",
                other, RELATIONAL_TOKENS
            ))),
        }
    }

    /// Script token.
    pub fn token(&self) -> &'static str {
        match self {
            RelationalOp::Equal => "==",
            RelationalOp::NotEqual => "~=",
            RelationalOp::Greater => ">",
            RelationalOp::Less => "<",
            RelationalOp::GreaterEqual => ">=",
            RelationalOp::LessEqual => "<=",
        }
    }

    /// Compare two numbers.
    pub fn compare(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            RelationalOp::Equal => lhs == rhs,
            RelationalOp::NotEqual => lhs != rhs,
            RelationalOp::Greater => lhs > rhs,
            RelationalOp::Less => lhs < rhs,
            RelationalOp::GreaterEqual => lhs >= rhs,
            RelationalOp::LessEqual => lhs <= rhs,
        }
    }
}

impl fmt::Display for RelationalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Operator joining two consecutive conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// `&`
    And,
    /// `|`
    Or,
}

impl LogicalOp {
    /// Script token.
    pub fn token(&self) -> &'static str {
        match self {
            LogicalOp::And => "&",
            LogicalOp::Or => "|",
        }
    }
}

/// One `lhs op rhs` condition and its bound operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Left operand text.
    pub lhs: String,
    /// Operator.
    pub op: RelationalOp,
    /// Right operand text.
    pub rhs: String,
    lhs_wrapper: Option<ElementWrapper>,
    rhs_wrapper: Option<ElementWrapper>,
}

impl Condition {
    /// An unbound condition.
    pub fn new(lhs: &str, op: RelationalOp, rhs: &str) -> Self {
        Self {
            lhs: lhs.trim().to_string(),
            op,
            rhs: rhs.trim().to_string(),
            lhs_wrapper: None,
            rhs_wrapper: None,
        }
    }

    /// Whether both operands are bound.
    pub fn is_bound(&self) -> bool {
        self.lhs_wrapper.is_some() && self.rhs_wrapper.is_some()
    }
}

/// Which operand of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Left of the operator.
    Left,
    /// Right of the operator.
    Right,
}

/// A chain of conditions joined by logical operators.
///
/// # Examples
///
/// ```
/// use missionscript::command::{ConditionalBranch, LogicalOp};
///
/// let branch = ConditionalBranch::parse("Sat1.X > 100 & Sat1.Y < 50 | x == 1").unwrap();
/// assert_eq!(branch.conditions().len(), 3);
/// assert_eq!(branch.logical_ops(), &[LogicalOp::And, LogicalOp::Or]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionalBranch {
    conditions: Vec<Condition>,
    logical_ops: Vec<LogicalOp>,
}

impl ConditionalBranch {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse condition text such as `Sat1.X > 100 & Sat1.Y < 50`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut branch = Self::new();
        let (pieces, ops) = split_logical(text)?;
        for piece in &pieces {
            let (lhs, op, rhs) = split_relation(piece)?;
            branch.add_condition(&lhs, op, &rhs);
        }
        for op in ops {
            branch.add_logical_op(op);
        }
        Ok(branch)
    }

    /// Append a condition.
    pub fn add_condition(&mut self, lhs: &str, op: RelationalOp, rhs: &str) {
        self.conditions.push(Condition::new(lhs, op, rhs));
    }

    /// Append a logical operator.
    pub fn add_logical_op(&mut self, op: LogicalOp) {
        self.logical_ops.push(op);
    }

    /// Conditions in order.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Logical operators in order.
    pub fn logical_ops(&self) -> &[LogicalOp] {
        &self.logical_ops
    }

    /// Operand texts of every condition, left then right.
    pub fn operand_texts(&self) -> Vec<&str> {
        self.conditions
            .iter()
            .flat_map(|c| [c.lhs.as_str(), c.rhs.as_str()])
            .collect()
    }

    /// Bind an operand of condition `index`.
    pub fn set_wrapper(&mut self, index: usize, side: Side, wrapper: ElementWrapper) -> Result<()> {
        let condition = self.conditions.get_mut(index).ok_or_else(|| {
            ScriptError::Reference(format!("There is no condition number {}", index + 1))
        })?;
        match side {
            Side::Left => condition.lhs_wrapper = Some(wrapper),
            Side::Right => condition.rhs_wrapper = Some(wrapper),
        }
        Ok(())
    }

    /// Bound operands of every condition.
    pub fn wrappers(&self) -> impl Iterator<Item = &ElementWrapper> {
        self.conditions
            .iter()
            .flat_map(|c| c.lhs_wrapper.iter().chain(c.rhs_wrapper.iter()))
    }

    /// Whether every operand is bound.
    pub fn is_bound(&self) -> bool {
        self.conditions.iter().all(Condition::is_bound)
    }

    /// Fail unless the chain has one more condition than operators.
    pub fn check_structure(&self) -> Result<()> {
        if self.conditions.len() != self.logical_ops.len() + 1 {
            return Err(ScriptError::Syntax(format!(
                "A condition chain needs one more condition than logical operators; found {} condition(s) and {} operator(s)",
                self.conditions.len(),
                self.logical_ops.len()
            )));
        }
        Ok(())
    }

    /// Evaluate condition `index`.
    ///
    /// Both operands must be bound; an unbound operand is an error, never a
    /// pending state.
    pub fn evaluate_condition(&self, index: usize, ctx: &dyn EvalContext) -> Result<bool> {
        let condition = self.conditions.get(index).ok_or_else(|| {
            ScriptError::Evaluation(format!("There is no condition number {}", index + 1))
        })?;
        let (Some(lhs), Some(rhs)) = (&condition.lhs_wrapper, &condition.rhs_wrapper) else {
            return Err(ScriptError::Evaluation(format!(
                "The operands of condition \"{} {} {}\" are not bound",
                condition.lhs, condition.op, condition.rhs
            )));
        };
        match (lhs.evaluate(ctx)?, rhs.evaluate(ctx)?) {
            (WrapperValue::Real(l), WrapperValue::Real(r)) => Ok(condition.op.compare(l, r)),
            (WrapperValue::Text(l), WrapperValue::Text(r)) => match condition.op {
                RelationalOp::Equal => Ok(l == r),
                RelationalOp::NotEqual => Ok(l != r),
                op => Err(ScriptError::Evaluation(format!(
                    "The operator {} cannot compare text values",
                    op
                ))),
            },
            _ => Err(ScriptError::Evaluation(format!(
                "Cannot compare a number with text in \"{} {} {}\"",
                condition.lhs, condition.op, condition.rhs
            ))),
        }
    }

    /// Evaluate the whole chain.
    pub fn evaluate(&self, ctx: &dyn EvalContext) -> Result<bool> {
        self.check_structure()?;
        let values = (0..self.conditions.len())
            .map(|i| self.evaluate_condition(i, ctx))
            .collect::<Result<Vec<_>>>()?;
        combine(&values, &self.logical_ops)
    }
}

impl fmt::Display for ConditionalBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.conditions.iter().enumerate() {
            if i > 0 {
                if let Some(op) = self.logical_ops.get(i - 1) {
                    write!(f, " {} ", op.token())?;
                }
            }
            write!(f, "{} {} {}", c.lhs, c.op, c.rhs)?;
        }
        Ok(())
    }
}

/// Fold condition results: consecutive AND-joined results form a group,
/// and the groups are ORed together, left to right.
pub fn combine(values: &[bool], ops: &[LogicalOp]) -> Result<bool> {
    let Some((&first, rest)) = values.split_first() else {
        return Err(ScriptError::Evaluation("The condition chain is empty".to_string()));
    };
    if rest.len() != ops.len() {
        return Err(ScriptError::Evaluation(format!(
            "{} condition(s) cannot be joined by {} logical operator(s)",
            values.len(),
            ops.len()
        )));
    }
    let mut result = false;
    let mut group = first;
    for (op, &value) in ops.iter().zip(rest) {
        match op {
            LogicalOp::And => group = group && value,
            LogicalOp::Or => {
                result = result || group;
                group = value;
            }
        }
    }
    Ok(result || group)
}

/// Split on top-level `&` and `|`.
fn split_logical(text: &str) -> Result<(Vec<String>, Vec<LogicalOp>)> {
    let mut pieces = Vec::new();
    let mut ops = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut in_quote = false;

    for ch in text.chars() {
        if in_quote {
            in_quote = ch != '\'';
            current.push(ch);
            continue;
        }
        let op = match ch {
            '\'' => {
                in_quote = true;
                None
            }
            '(' | '[' | '{' => {
                depth += 1;
                None
            }
            ')' | ']' | '}' => {
                depth -= 1;
                None
            }
            '&' if depth == 0 => Some(LogicalOp::And),
            '|' if depth == 0 => Some(LogicalOp::Or),
            _ => None,
        };
        match op {
            Some(op) => {
                if current.trim().is_empty() {
                    return Err(ScriptError::Syntax(format!(
                        "Missing condition before the logical operator \"{}\" in \"{}\"",
                        op.token(),
                        text.trim()
                    )));
                }
                pieces.push(std::mem::take(&mut current));
                ops.push(op);
            }
            None => current.push(ch),
        }
    }
    if current.trim().is_empty() {
        return Err(ScriptError::Syntax(format!(
            "Missing condition at the end of \"{}\"",
            text.trim()
        )));
    }
    pieces.push(current);
    Ok((pieces, ops))
}

/// Split one condition at its single relational operator.
fn split_relation(piece: &str) -> Result<(String, RelationalOp, String)> {
    let bytes = piece.as_bytes();
    let mut found: Vec<(usize, usize, RelationalOp)> = Vec::new();
    let mut depth: i32 = 0;
    let mut in_quote = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_quote {
            in_quote = b != b'\'';
            i += 1;
            continue;
        }
        match b {
            b'\'' => in_quote = true,
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'=' | b'~' | b'<' | b'>' | b'!' if depth == 0 => {
                let len = if bytes.get(i + 1) == Some(&b'=') { 2 } else { 1 };
                let op = RelationalOp::parse(&piece[i..i + len])?;
                found.push((i, len, op));
                i += len;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    match found.as_slice() {
        [(at, len, op)] => {
            let lhs = piece[..*at].trim();
            let rhs = piece[at + len..].trim();
            if lhs.is_empty() || rhs.is_empty() {
                return Err(ScriptError::Syntax(format!(
                    "The condition \"{}\" is missing an operand",
                    piece.trim()
                )));
            }
            Ok((lhs.to_string(), *op, rhs.to_string()))
        }
        [] => Err(ScriptError::Syntax(format!(
            "The condition \"{}\" has no relational operator. The allowed operators are [{}]",
            piece.trim(),
            RELATIONAL_TOKENS
        ))),
        _ => Err(ScriptError::Syntax(format!(
            "The condition \"{}\" has more than one relational operator",
            piece.trim()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::wrapper::WrapperKind;

    struct Fixed(Vec<(&'static str, f64)>);

    impl EvalContext for Fixed {
        fn reference(&self, name: &str) -> Result<f64> {
            self.0
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| *v)
                .ok_or_else(|| ScriptError::UnknownObject(name.to_string()))
        }

        fn call(&self, name: &str, _args: &[f64]) -> Result<f64> {
            Err(ScriptError::Function(name.to_string()))
        }
    }

    fn bind_all(branch: &mut ConditionalBranch) {
        for i in 0..branch.conditions().len() {
            let (lhs, rhs) = {
                let c = &branch.conditions()[i];
                (c.lhs.clone(), c.rhs.clone())
            };
            let l = ElementWrapper::new(&lhs, WrapperKind::Expression).expect("lhs");
            let r = ElementWrapper::new(&rhs, WrapperKind::Expression).expect("rhs");
            branch.set_wrapper(i, Side::Left, l).expect("left");
            branch.set_wrapper(i, Side::Right, r).expect("right");
        }
    }

    #[test]
    fn test_parse_operators() {
        let branch = ConditionalBranch::parse("a >= 1 | b ~= 2").expect("parses");
        assert_eq!(branch.conditions()[0].op, RelationalOp::GreaterEqual);
        assert_eq!(branch.conditions()[1].op, RelationalOp::NotEqual);
        assert_eq!(branch.to_string(), "a >= 1 | b ~= 2");
    }

    #[test]
    fn test_parse_errors() {
        assert!(ConditionalBranch::parse("a = 1").is_err());
        assert!(ConditionalBranch::parse("a != 1").is_err());
        assert!(ConditionalBranch::parse("a < b < c").is_err());
        assert!(ConditionalBranch::parse("a < 1 & & b > 2").is_err());
        assert!(ConditionalBranch::parse("a < 1 |").is_err());
        assert!(ConditionalBranch::parse("x").is_err());
    }

    #[test]
    fn test_operator_inside_call_is_ignored() {
        let branch = ConditionalBranch::parse("F(a > b) == 1").expect("parses");
        assert_eq!(branch.conditions()[0].lhs, "F(a > b)");
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        // (a == b & c > d) | e < f
        let mut branch = ConditionalBranch::parse("a == b & c > d | e < f").expect("parses");
        bind_all(&mut branch);
        let ctx = |a, b, c, d, e, f| {
            Fixed(vec![("a", a), ("b", b), ("c", c), ("d", d), ("e", e), ("f", f)])
        };
        assert_eq!(branch.evaluate(&ctx(1.0, 1.0, 2.0, 1.0, 5.0, 1.0)).ok(), Some(true));
        assert_eq!(branch.evaluate(&ctx(1.0, 2.0, 2.0, 1.0, 0.0, 1.0)).ok(), Some(true));
        assert_eq!(branch.evaluate(&ctx(1.0, 2.0, 2.0, 1.0, 5.0, 1.0)).ok(), Some(false));
        assert_eq!(branch.evaluate(&ctx(1.0, 1.0, 0.0, 1.0, 5.0, 1.0)).ok(), Some(false));
    }

    #[test]
    fn test_unbound_operand_is_an_error() {
        let branch = ConditionalBranch::parse("x > 1").expect("parses");
        let ctx = Fixed(vec![("x", 2.0)]);
        assert!(branch.evaluate_condition(0, &ctx).is_err());
    }

    #[test]
    fn test_structure_mismatch() {
        let mut branch = ConditionalBranch::new();
        branch.add_condition("x", RelationalOp::Less, "1");
        branch.add_logical_op(LogicalOp::And);
        assert!(branch.check_structure().is_err());
        assert!(combine(&[], &[]).is_err());
    }

    #[test]
    fn test_text_comparison() {
        let mut branch = ConditionalBranch::parse("'a' == 'a'").expect("parses");
        branch
            .set_wrapper(0, Side::Left, ElementWrapper::text("'a'"))
            .expect("left");
        branch
            .set_wrapper(0, Side::Right, ElementWrapper::text("'a'"))
            .expect("right");
        assert_eq!(branch.evaluate(&Fixed(Vec::new())).ok(), Some(true));
    }
}
