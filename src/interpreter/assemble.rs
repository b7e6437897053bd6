//! Mission-sequence command assembly.
//!
//! Each command's argument text is parsed into a [`CommandBody`] by a
//! small grammar function. Names are only checked later, by
//! [`Interpreter::validate_mcs_commands`], so commands may mention objects
//! the script creates further down.

use tracing::debug;

use super::{text, Interpreter};
use crate::command::{
    Command, CommandBody, CommandKind, ConditionalBranch, FiniteThrust, PropagateSegment,
    StopCondition,
};
use crate::error::{Result, ScriptError};
use crate::object::ObjectType;

/// Mode words that may open a `Propagate` command.
const PROPAGATE_MODES: &[&str] = &["Synchronized", "BackProp"];

/// Prefix of the thrust helper named after its burn.
const FINITE_THRUST_PREFIX: &str = "FiniteThrust_";

impl Interpreter {
    /// Build a command and append it to the current sequence.
    ///
    /// An empty `keyword` means an assignment or a function call,
    /// told apart by the shape of `description`. A command whose arguments
    /// fail to parse is still appended, so block structure stays intact,
    /// and the parse error is returned.
    ///
    /// ```
    /// use missionscript::command::CommandBody;
    /// use missionscript::Interpreter;
    ///
    /// let mut interpreter = Interpreter::new();
    /// interpreter.create_command("Propagate", "Prop1(Sat1) {Sat1.ElapsedSecs = 60}", 1).unwrap();
    /// let command = &interpreter.workspace().sequence().commands()[0];
    /// assert!(matches!(command.body(), CommandBody::Propagate { stops, .. } if stops.len() == 1));
    /// ```
    pub fn create_command(&mut self, keyword: &str, description: &str, line: usize) -> Result<()> {
        let description = description.trim();
        let kind = if keyword.is_empty() {
            self.statement_kind(description)
        } else {
            CommandKind::from_keyword(keyword).ok_or_else(|| {
                ScriptError::Syntax(format!("\"{}\" is not a command", keyword))
            })?
        };
        let mut command = Command::new(kind, line, description);
        let outcome = match parse_body(kind, description) {
            Ok(body) => {
                command.set_body(body);
                Ok(())
            }
            Err(e) => {
                command.set_error(&e.to_string());
                Err(e)
            }
        };
        debug!(%kind, line, ok = outcome.is_ok(), "command");
        self.sequence_mut().append(command);
        outcome
    }

    /// Assignment, or a call of a script or external function.
    fn statement_kind(&self, description: &str) -> CommandKind {
        let assignment = text::split_assignment(description);
        let callee = assignment.map(|(_, rhs)| rhs).unwrap_or(description);
        let name = text::split_call(callee)
            .map(|(n, _)| n)
            .unwrap_or(callee.trim());
        match self.function_type(name) {
            Some(ObjectType::MatlabFunction) => CommandKind::CallExternalFunction,
            Some(_) => CommandKind::CallFunction,
            None if description.starts_with('[') || assignment.is_none() => {
                CommandKind::CallFunction
            }
            None => CommandKind::Assignment,
        }
    }
}

fn syntax(message: String) -> ScriptError {
    ScriptError::Syntax(message)
}

fn parse_body(kind: CommandKind, text: &str) -> Result<CommandBody> {
    match kind {
        CommandKind::Propagate => parse_propagate(text),
        CommandKind::Maneuver => parse_maneuver(text),
        CommandKind::BeginFiniteBurn => parse_finite_burn(text, true),
        CommandKind::EndFiniteBurn => parse_finite_burn(text, false),
        CommandKind::Report => parse_report(text),
        CommandKind::Toggle => parse_toggle(text),
        CommandKind::Stop if text.is_empty() => Ok(CommandBody::Empty),
        CommandKind::Stop => Err(syntax(format!("Stop takes no arguments, found \"{}\"", text))),
        CommandKind::If | CommandKind::While if text.is_empty() => {
            Err(syntax(format!("{} needs a condition", kind)))
        }
        CommandKind::If | CommandKind::While => ConditionalBranch::parse(text).map(CommandBody::Branch),
        CommandKind::For => parse_for(text),
        CommandKind::Target | CommandKind::Optimize => parse_solver(kind, text),
        CommandKind::Vary => parse_vary(text),
        CommandKind::Achieve => parse_achieve(text),
        CommandKind::Minimize => parse_minimize(text),
        CommandKind::NonlinearConstraint => parse_constraint(text),
        CommandKind::CallFunction | CommandKind::CallExternalFunction => parse_call(text),
        CommandKind::Assignment => parse_assignment(text),
    }
}

fn check_name<'a>(name: &'a str, role: &str, command: &str) -> Result<&'a str> {
    let name = name.trim();
    if text::is_valid_name(name) {
        Ok(name)
    } else {
        Err(syntax(format!(
            "\"{}\" is not a valid {} name in {}",
            name, role, command
        )))
    }
}

/// Text between the outer braces of `{...}`.
fn braced(s: &str) -> Option<&str> {
    let s = s.trim();
    s.strip_prefix('{')?.strip_suffix('}')
}

/// `Propagate [mode] P1(S1, S2) [P2(S3)] [{stop, ...}]`
fn parse_propagate(text: &str) -> Result<CommandBody> {
    let (first, after) = text::split_first_word(text);
    let (mode, rest) = if PROPAGATE_MODES.contains(&first) {
        (Some(first.to_string()), after)
    } else {
        (None, text)
    };
    let mut segments = Vec::new();
    let mut stops = Vec::new();
    let pieces = text::split_top_level(rest, ' ')
        .into_iter()
        .flat_map(|p| text::split_top_level(&p, ','))
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    for piece in pieces {
        if let Some(inner) = braced(&piece) {
            stops.extend(parse_stops(inner)?);
            continue;
        }
        let (propagator, args) = text::split_call(&piece).ok_or_else(|| {
            syntax(format!(
                "Propagate expects Propagator(Spacecraft), found \"{}\"",
                piece
            ))
        })?;
        let propagator = check_name(propagator, "propagator", "Propagate")?.to_string();
        let mut spacecraft = Vec::new();
        for arg in text::split_top_level(args, ',') {
            match braced(&arg) {
                Some(inner) => stops.extend(parse_stops(inner)?),
                None if arg.trim().is_empty() => {}
                None => spacecraft.push(check_name(&arg, "spacecraft", "Propagate")?.to_string()),
            }
        }
        segments.push(PropagateSegment {
            propagator,
            spacecraft,
        });
    }
    if segments.is_empty() {
        return Err(syntax("Propagate needs at least one Propagator(Spacecraft)".to_string()));
    }
    Ok(CommandBody::Propagate {
        mode,
        segments,
        stops,
    })
}

/// `Sat1.ElapsedSecs = 8640, Sat1.Periapsis`
fn parse_stops(inner: &str) -> Result<Vec<StopCondition>> {
    text::split_top_level(inner, ',')
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (parameter, goal) = text::split_assignment(item).unwrap_or((item, ""));
            if parameter.is_empty() {
                return Err(syntax(format!("The stopping condition \"{}\" has no parameter", item)));
            }
            Ok(StopCondition {
                parameter: parameter.to_string(),
                goal: goal.to_string(),
            })
        })
        .collect()
}

/// `Maneuver Burn1(Sat1)`
fn parse_maneuver(text: &str) -> Result<CommandBody> {
    let (burn, args) = text::split_call(text)
        .ok_or_else(|| syntax(format!("Maneuver expects Burn(Spacecraft), found \"{}\"", text)))?;
    let targets = text::split_list(args);
    let [spacecraft] = targets.as_slice() else {
        return Err(syntax(format!(
            "Maneuver applies to exactly one spacecraft, found {}",
            targets.len()
        )));
    };
    Ok(CommandBody::Maneuver {
        burn: check_name(burn, "burn", "Maneuver")?.to_string(),
        spacecraft: check_name(spacecraft, "spacecraft", "Maneuver")?.to_string(),
    })
}

/// `BeginFiniteBurn Burn1(Sat1, Sat2)` / `EndFiniteBurn Burn1(Sat1)`
fn parse_finite_burn(text: &str, begin: bool) -> Result<CommandBody> {
    let command = if begin { "BeginFiniteBurn" } else { "EndFiniteBurn" };
    if text.contains(['[', '{']) {
        return Err(syntax(format!("{} does not accept brackets or braces", command)));
    }
    let (burn, args) = text::split_call(text)
        .ok_or_else(|| syntax(format!("{} expects Burn(Spacecraft), found \"{}\"", command, text)))?;
    let burn = check_name(burn, "burn", command)?.to_string();
    let spacecraft = text::split_list(args)
        .iter()
        .map(|s| check_name(s, "spacecraft", command).map(str::to_string))
        .collect::<Result<Vec<_>>>()?;
    if spacecraft.is_empty() {
        return Err(syntax(format!("{} needs at least one spacecraft", command)));
    }
    let thrust = begin.then(|| FiniteThrust {
        name: format!("{}{}", FINITE_THRUST_PREFIX, burn),
        burn: burn.clone(),
        spacecraft: spacecraft.clone(),
    });
    Ok(CommandBody::FiniteBurn {
        burn,
        spacecraft,
        thrust,
    })
}

/// `Report rf Sat1.X Sat1.Y`
fn parse_report(text: &str) -> Result<CommandBody> {
    let (subscriber, rest) = text::split_first_word(text);
    let items = text::split_list(rest);
    if subscriber.is_empty() || items.is_empty() {
        return Err(syntax(
            "Report needs a report file and at least one value".to_string(),
        ));
    }
    Ok(CommandBody::Report {
        subscriber: check_name(subscriber, "report file", "Report")?.to_string(),
        items,
    })
}

/// `Toggle rf1 rf2 On`
fn parse_toggle(text: &str) -> Result<CommandBody> {
    let text = text.trim();
    let (names, state) = match text.rfind(char::is_whitespace) {
        Some(i) => (&text[..i], text[i..].trim()),
        None => ("", text),
    };
    let on = match state {
        "On" => true,
        "Off" => false,
        other => {
            return Err(syntax(format!(
                "Toggle must end with On or Off, found \"{}\"",
                other
            )))
        }
    };
    let subscribers = text::split_list(names)
        .iter()
        .map(|s| check_name(s, "subscriber", "Toggle").map(str::to_string))
        .collect::<Result<Vec<_>>>()?;
    Ok(CommandBody::Toggle { subscribers, on })
}

/// `For i = 1:10` or `For i = 1:2:10`
fn parse_for(text: &str) -> Result<CommandBody> {
    let (index, range) = text::split_assignment(text)
        .ok_or_else(|| syntax(format!("For expects index = start:end, found \"{}\"", text)))?;
    let index = check_name(index, "loop index", "For")?.to_string();
    let parts: Vec<String> = text::split_top_level(range, ':')
        .into_iter()
        .map(|p| p.trim().to_string())
        .collect();
    let (start, step, end) = match parts.as_slice() {
        [start, end] => (start.clone(), "1".to_string(), end.clone()),
        [start, step, end] => (start.clone(), step.clone(), end.clone()),
        _ => {
            return Err(syntax(format!(
                "The For range \"{}\" must be start:end or start:step:end, found {} colon(s)",
                range.trim(),
                parts.len() - 1
            )))
        }
    };
    if [&start, &step, &end].iter().any(|p| p.is_empty()) {
        return Err(syntax(format!("The For range \"{}\" has an empty part", range.trim())));
    }
    Ok(CommandBody::For {
        index,
        start,
        step,
        end,
        wrappers: Vec::new(),
    })
}

/// `{Key = Value, ...}`
fn parse_options(text: &str) -> Result<Vec<(String, String)>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let inner = braced(text)
        .ok_or_else(|| syntax(format!("Options must be written {{Key = Value}}, found \"{}\"", text)))?;
    text::split_top_level(inner, ',')
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| match text::split_assignment(item) {
            Some((key, value)) if !key.is_empty() && !value.is_empty() => {
                Ok((key.to_string(), value.to_string()))
            }
            _ => Err(syntax(format!("The option \"{}\" must be written Key = Value", item))),
        })
        .collect()
}

/// `Target DC1 {SolveMode = Solve}`
fn parse_solver(kind: CommandKind, text: &str) -> Result<CommandBody> {
    let (solver, rest) = text::split_first_word(text);
    let command = kind.keyword();
    if solver.is_empty() {
        return Err(syntax(format!("{} needs a solver", command)));
    }
    Ok(CommandBody::Solver {
        solver: check_name(solver, "solver", command)?.to_string(),
        options: parse_options(rest)?,
    })
}

/// Solver name and the `target = value` pair of `Solver(target = value, {options})`.
fn solver_pair<'a>(text: &'a str, command: &str) -> Result<(&'a str, String, String, Vec<(String, String)>)> {
    let (solver, args) = text::split_call(text).ok_or_else(|| {
        syntax(format!("{} expects Solver(name = value), found \"{}\"", command, text))
    })?;
    let solver = check_name(solver, "solver", command)?;
    let pieces = text::split_top_level(args, ',');
    let (lhs, rhs) = pieces
        .first()
        .and_then(|p| text::split_assignment(p))
        .filter(|(l, r)| !l.is_empty() && !r.is_empty())
        .ok_or_else(|| syntax(format!("{} expects name = value inside the parentheses", command)))?;
    let options = match pieces.as_slice() {
        [_] => Vec::new(),
        [_, options] => parse_options(options)?,
        _ => {
            return Err(syntax(format!(
                "{} takes one name = value pair and an optional {{options}} block",
                command
            )))
        }
    };
    Ok((solver, lhs.to_string(), rhs.to_string(), options))
}

/// `Vary DC1(Burn1.Element1 = 0.5, {Perturbation = 1e-4})`
fn parse_vary(text: &str) -> Result<CommandBody> {
    let (solver, variable, initial, options) = solver_pair(text, "Vary")?;
    Ok(CommandBody::Vary {
        solver: solver.to_string(),
        variable,
        initial,
        options,
    })
}

/// `Achieve DC1(Sat1.RMAG = 42164, {Tolerance = 0.1})`
fn parse_achieve(text: &str) -> Result<CommandBody> {
    let (solver, goal, value, options) = solver_pair(text, "Achieve")?;
    Ok(CommandBody::Achieve {
        solver: solver.to_string(),
        goal,
        value,
        options,
    })
}

/// `Minimize Opt(cost)`
fn parse_minimize(text: &str) -> Result<CommandBody> {
    let (solver, args) = text::split_call(text)
        .ok_or_else(|| syntax(format!("Minimize expects Optimizer(objective), found \"{}\"", text)))?;
    Ok(CommandBody::Minimize {
        solver: check_name(solver, "optimizer", "Minimize")?.to_string(),
        objective: check_name(args, "objective", "Minimize")?.to_string(),
    })
}

/// `NonlinearConstraint Opt(Sat1.RMAG <= 42000)`
fn parse_constraint(text: &str) -> Result<CommandBody> {
    let (solver, args) = text::split_call(text).ok_or_else(|| {
        syntax(format!(
            "NonlinearConstraint expects Optimizer(lhs <= rhs), found \"{}\"",
            text
        ))
    })?;
    let solver = check_name(solver, "optimizer", "NonlinearConstraint")?.to_string();
    let (lhs, op, rhs) = ["<=", ">="]
        .iter()
        .find_map(|op| args.split_once(op).map(|(l, r)| (l, *op, r)))
        .or_else(|| text::split_assignment(args).map(|(l, r)| (l, "=", r)))
        .ok_or_else(|| syntax(format!("The constraint \"{}\" needs <=, >= or =", args.trim())))?;
    let (lhs, rhs) = (lhs.trim(), rhs.trim());
    if lhs.is_empty() || rhs.is_empty() {
        return Err(syntax(format!("The constraint \"{}\" has an empty side", args.trim())));
    }
    Ok(CommandBody::Constraint {
        solver,
        lhs: lhs.to_string(),
        op: op.to_string(),
        rhs: rhs.to_string(),
    })
}

/// `[a, b] = F(x, y)`, `F(x)` or `F`
fn parse_call(text: &str) -> Result<CommandBody> {
    let (outputs, call) = match text::split_assignment(text) {
        Some((lhs, rhs)) => {
            let list = lhs
                .strip_prefix('[')
                .and_then(|l| l.strip_suffix(']'))
                .unwrap_or(lhs);
            let outputs = text::split_list(list)
                .iter()
                .map(|o| check_name(o, "output", "a function call").map(str::to_string))
                .collect::<Result<Vec<_>>>()?;
            (outputs, rhs)
        }
        None => (Vec::new(), text),
    };
    let (function, inputs) = match text::split_call(call) {
        Some((name, args)) => (
            name,
            text::split_top_level(args, ',')
                .into_iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect(),
        ),
        None => (call.trim(), Vec::new()),
    };
    Ok(CommandBody::Call {
        function: check_name(function, "function", "a function call")?.to_string(),
        inputs,
        outputs,
    })
}

fn parse_assignment(text: &str) -> Result<CommandBody> {
    match text::split_assignment(text) {
        Some((lhs, rhs)) if !lhs.is_empty() && !rhs.is_empty() => Ok(CommandBody::Assignment {
            lhs: lhs.to_string(),
            rhs: rhs.to_string(),
            lhs_wrapper: None,
            rhs_wrapper: None,
        }),
        _ => Err(syntax(format!(
            "\"{}\" is not an assignment of the form target = value",
            text
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_propagate_forms() {
        let body = parse_propagate("Synchronized Prop1(Sat1, Sat2) Prop2(Sat3) {Sat1.ElapsedDays = 1, Sat1.Periapsis}")
            .expect("parses");
        match body {
            CommandBody::Propagate {
                mode,
                segments,
                stops,
            } => {
                assert_eq!(mode.as_deref(), Some("Synchronized"));
                assert_eq!(segments.len(), 2);
                assert_eq!(segments[0].spacecraft, vec!["Sat1", "Sat2"]);
                assert_eq!(stops.len(), 2);
                assert_eq!(stops[0].goal, "1");
                assert_eq!(stops[1].parameter, "Sat1.Periapsis");
                assert!(stops[1].goal.is_empty());
            }
            other => panic!("unexpected body {:?}", other),
        }
        let inline = parse_propagate("BackProp Prop1(Sat1, {Sat1.ElapsedSecs = -60})").expect("parses");
        assert!(matches!(inline, CommandBody::Propagate { ref stops, .. } if stops.len() == 1));
        assert!(parse_propagate("{Sat1.ElapsedSecs = 60}").is_err());
    }

    #[test]
    fn test_maneuver_and_finite_burn() {
        assert!(parse_maneuver("Burn1(Sat1)").is_ok());
        assert!(parse_maneuver("Burn1(Sat1, Sat2)").is_err());
        let body = parse_finite_burn("FB(Sat1)", true).expect("parses");
        match body {
            CommandBody::FiniteBurn { thrust: Some(t), .. } => assert_eq!(t.name, "FiniteThrust_FB"),
            other => panic!("unexpected body {:?}", other),
        }
        assert!(matches!(
            parse_finite_burn("FB(Sat1)", false),
            Ok(CommandBody::FiniteBurn { thrust: None, .. })
        ));
        assert!(parse_finite_burn("FB{Sat1}", true).is_err());
        assert!(parse_finite_burn("FB()", true).is_err());
    }

    #[test]
    fn test_report_and_toggle() {
        assert!(matches!(
            parse_report("rf Sat1.X Sat1.Y"),
            Ok(CommandBody::Report { ref items, .. }) if items.len() == 2
        ));
        assert!(parse_report("rf").is_err());
        assert!(matches!(
            parse_toggle("rf1, rf2 Off"),
            Ok(CommandBody::Toggle { ref subscribers, on: false }) if subscribers.len() == 2
        ));
        assert!(parse_toggle("rf Maybe").is_err());
    }

    #[test]
    fn test_for_ranges() {
        assert!(matches!(
            parse_for("i = 1:10"),
            Ok(CommandBody::For { ref step, .. }) if step == "1"
        ));
        assert!(matches!(
            parse_for("i = 10:-2:1"),
            Ok(CommandBody::For { ref step, ref end, .. }) if step == "-2" && end == "1"
        ));
        let err = parse_for("i = 1:2:3:4").expect_err("too many colons");
        assert!(err.to_string().contains("3 colon"), "{}", err);
        assert!(parse_for("i = 1").is_err());
    }

    #[test]
    fn test_solver_commands() {
        assert!(matches!(
            parse_solver(CommandKind::Target, "DC1 {SolveMode = Solve, ExitMode = SaveAndContinue}"),
            Ok(CommandBody::Solver { ref options, .. }) if options.len() == 2
        ));
        assert!(parse_solver(CommandKind::Target, "DC1 {SolveMode}").is_err());
        match parse_vary("DC1(Burn1.Element1 = 0.5, {Perturbation = 0.0001, MaxStep = 0.2})") {
            Ok(CommandBody::Vary {
                variable,
                initial,
                options,
                ..
            }) => {
                assert_eq!(variable, "Burn1.Element1");
                assert_eq!(initial, "0.5");
                assert_eq!(options.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse_achieve("DC1(Sat1.RMAG = 42164)").is_ok());
        assert!(parse_achieve("DC1(Sat1.RMAG)").is_err());
        assert!(parse_minimize("Opt(cost)").is_ok());
        assert!(matches!(
            parse_constraint("Opt(Sat1.RMAG >= 7000)"),
            Ok(CommandBody::Constraint { ref op, .. }) if op == ">="
        ));
    }

    #[test]
    fn test_call_forms() {
        match parse_call("[a, b] = F(x, 2)") {
            Ok(CommandBody::Call {
                function,
                inputs,
                outputs,
            }) => {
                assert_eq!(function, "F");
                assert_eq!(inputs, vec!["x", "2"]);
                assert_eq!(outputs, vec!["a", "b"]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            parse_call("F"),
            Ok(CommandBody::Call { ref inputs, ref outputs, .. }) if inputs.is_empty() && outputs.is_empty()
        ));
    }

    #[test]
    fn test_failed_command_keeps_block_structure() {
        let mut interpreter = Interpreter::builder().continue_on_error(true).build();
        let err = interpreter
            .interpret_str("Create Variable x;\nBeginMissionSequence;\nIf x >\n   x = 1;\nEndIf;")
            .expect_err("bad condition");
        assert!(err.to_string().contains("Line 3"), "{}", err);
        let commands = interpreter.workspace().sequence().commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].children().len(), 1);
        assert!(commands[0].error().is_some());
    }

    #[test]
    fn test_external_function_call_kind() {
        let mut interpreter = Interpreter::new();
        let r = interpreter.interpret_str(
            "Create MatlabFunction MF;\nCreate Variable a;\nBeginMissionSequence;\n[a] = MF(1);",
        );
        assert!(r.is_ok(), "{:?}", r.err());
        let kind = interpreter.workspace().sequence().commands()[0].kind();
        assert_eq!(kind, CommandKind::CallExternalFunction);
    }
}
