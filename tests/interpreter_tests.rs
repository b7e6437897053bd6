//! Integration tests for MissionScript

use missionscript::command::{CommandBody, CommandKind};
use missionscript::object::ConfiguredObject;
use missionscript::{Interpreter, ScriptError};

const MISSION: &str = r#"
% Transfer to geosynchronous orbit
Create Spacecraft Sat1;
Sat1.DryMass = 850;
Sat1.Tanks = {MainTank};

Create ChemicalTank MainTank;
MainTank.FuelMass = 700;

Create ImpulsiveBurn TOI GOI;
TOI.Axes = VNB;
GOI.Axes = VNB;

Create Propagator Prop1;
Create DifferentialCorrector DC1;
Create ReportFile Summary;
Summary.Filename = 'summary.txt';
Summary.Add = {Sat1.ElapsedDays, Sat1.Earth.SMA};

Create Variable radius apogees;
radius = Earth.EquatorialRadius + 35786;

BeginMissionSequence;
Propagate Prop1(Sat1) {Sat1.ElapsedSecs = 3600};
Target DC1 {SolveMode = Solve};
   Vary DC1(TOI.Element1 = 1.0, {Perturbation = 0.0001});
   Maneuver TOI(Sat1);
   Propagate Prop1(Sat1) {Sat1.ElapsedSecs = 19000};
   Achieve DC1(Sat1.Earth.RMAG = radius, {Tolerance = 0.1});
   Vary DC1(GOI.Element1 = 1.0);
   Maneuver GOI(Sat1);
   Achieve DC1(Sat1.Earth.ECC = 0.0005);
EndTarget;
For apogees = 1:2:5
   If Sat1.Earth.RMAG > radius & apogees < 5 | apogees == 1
      Report Summary Sat1.Earth.SMA apogees;
   Else
      Toggle Summary Off;
   EndIf;
EndFor;
"#;

fn load(script: &str) -> Interpreter {
    let mut interpreter = Interpreter::new();
    let result = interpreter.interpret_str(script);
    assert!(result.is_ok(), "{:?}", result.err());
    interpreter
}

#[test]
fn test_full_mission_loads() {
    let interpreter = load(MISSION);
    let workspace = interpreter.workspace();
    let config = workspace.config();

    assert!(config.contains("Prop1_ForceModel"));
    assert!(config.contains("Sat1.ElapsedDays"));
    assert!(config.contains("Sat1.Earth.SMA"));
    assert!(config.contains("Sat1.Earth.RMAG"));

    let radius = config.get_variable("radius").map(|v| v.value());
    assert_eq!(radius, Some(6378.1363 + 35786.0));

    let commands = workspace.sequence().commands();
    let kinds: Vec<CommandKind> = commands.iter().map(|c| c.kind()).collect();
    assert_eq!(kinds, vec![CommandKind::Propagate, CommandKind::Target, CommandKind::For]);
    assert_eq!(commands[1].children().len(), 7);
    assert!(commands[1].children().iter().all(|c| c.solver() == Some("DC1")));

    let branch = &commands[2].children()[0];
    assert_eq!(branch.kind(), CommandKind::If);
    assert_eq!(branch.children().len(), 1);
    assert_eq!(branch.else_children().map(|c| c.len()), Some(1));
    assert!(workspace.warnings().is_empty(), "{:?}", workspace.warnings());
}

#[test]
fn test_references_are_bound_after_load() {
    let interpreter = load(MISSION);
    let workspace = interpreter.workspace();
    let config = workspace.config();
    let sat = config.get_item("Sat1").expect("Sat1");
    assert_eq!(sat.bound_reference("MainTank"), config.get_id("MainTank"));
    let prop = config.get_item("Prop1").expect("Prop1");
    assert_eq!(prop.bound_reference("Prop1_ForceModel"), config.get_id("Prop1_ForceModel"));
}

#[test]
fn test_condition_evaluates_against_workspace() {
    let mut interpreter = load(MISSION);
    let apogees = interpreter
        .workspace_mut()
        .config_mut()
        .get_variable_mut("apogees")
        .expect("apogees");
    apogees.set_real(1.0);

    let workspace = interpreter.workspace();
    let lookup = workspace.lookup(None);
    let branch = &workspace.sequence().commands()[2].children()[0];
    let CommandBody::Branch(condition) = branch.body() else {
        panic!("If without a condition: {:?}", branch.body());
    };
    assert!(condition.is_bound());
    let value = condition.evaluate(&lookup);
    assert_eq!(value.ok(), Some(true));
}

#[test]
fn test_every_problem_is_reported_in_tolerant_mode() {
    let mut interpreter = Interpreter::builder().continue_on_error(true).build();
    let err = interpreter
        .interpret_str(
            r#"
Create Spacecraft Sat1;
Sat1.DryMass = -10;
Create Rocket Oops;
Create Variable x;
x = 2 *;
BeginMissionSequence;
Maneuver Missing(Sat1);
"#,
        )
        .expect_err("four separate mistakes");
    let ScriptError::Multiple(errors) = err else {
        panic!("expected several errors, got {:?}", err);
    };
    let lines: Vec<Option<usize>> = errors.iter().map(|e| e.line()).collect();
    assert_eq!(lines[..3], [Some(3), Some(4), Some(6)]);
    let last = errors.last().map(|e| e.to_string()).unwrap_or_default();
    assert!(last.contains("Missing"), "{}", last);
}

#[test]
fn test_fail_fast_stops_at_first_problem() {
    let mut interpreter = Interpreter::new();
    let err = interpreter
        .interpret_str("Create Spacecraft Sat1;\nCreate Rocket R1;\nSat1.DryMass = -10;")
        .expect_err("unknown type");
    assert_eq!(err.line(), Some(2));
    assert!(err.to_string().contains("Rocket"), "{}", err);
    assert!(interpreter.workspace().config().get_spacecraft("Sat1").is_some());
}

#[test]
fn test_huge_array_is_an_error() {
    let mut interpreter = Interpreter::new();
    let err = interpreter
        .interpret_str("Create Variable x;\nCreate Array A[4294967296,4294967296];")
        .expect_err("array too large");
    assert_eq!(err.line(), Some(2));
    assert!(matches!(err.root(), ScriptError::Syntax(_)), "{:?}", err);
    assert!(err.to_string().contains("\"A\""), "{}", err);
    assert!(!interpreter.workspace().config().contains("A"));
}

#[test]
fn test_concatenated_strings_are_not_one_literal() {
    let mut interpreter = Interpreter::new();
    let result = interpreter.interpret_str("Create String s;\ns = 'a' + 'b';");
    assert!(result.is_err());
    let value = interpreter.workspace().config().get_string("s").map(|s| s.value().to_string());
    assert_eq!(value.as_deref(), Some(""));
}

#[test]
fn test_rename_keeps_references_consistent() {
    let mut interpreter = load(
        "Create Spacecraft Sat1;\nCreate ImpulsiveBurn Burn1;\nBurn1.Origin = Sat1;\nCreate Variable r;\nr = Sat1.Earth.RMAG;",
    );
    let config = interpreter.workspace_mut().config_mut();
    assert!(config.rename_item("Spacecraft", "Sat1", "Probe"));

    assert!(config.contains("Probe"));
    assert!(!config.contains("Sat1"));
    assert!(config.contains("Probe.Earth.RMAG"));
    assert!(!config.contains("Sat1.Earth.RMAG"));
    let burn = config.get_burn("Burn1").expect("Burn1");
    assert_eq!(burn.text_of("Origin"), "Probe");
    let r = config.get_variable("r").expect("r");
    assert_eq!(r.expression(), "Probe.Earth.RMAG");
    assert!(r.operands().contains("Probe.Earth.RMAG"));

    assert!(!config.rename_item("Spacecraft", "Burn1", "Other"));
    assert!(!config.rename_item("ImpulsiveBurn", "Burn1", "Probe"));
}

#[test]
fn test_clone_and_remove() {
    let mut interpreter = load("Create Spacecraft Sat1;\nSat1.DryMass = 920;\nCreate Propagator Prop1;");
    let config = interpreter.workspace_mut().config_mut();

    let copy = config.add_clone("Sat1");
    assert_eq!(copy.as_deref().ok(), Some("Sat2"));
    let sat2 = config.get_spacecraft("Sat2").expect("Sat2");
    assert_eq!(sat2.real_of("DryMass"), Some(920.0));

    assert!(config.remove_item("Propagator", "Prop1"));
    assert!(!config.contains("Prop1_ForceModel"));
    assert!(!config.remove_item("Propagator", "Prop1"));
}

#[test]
fn test_function_mode() {
    let mut interpreter = Interpreter::new();
    let result = interpreter.interpret_function(
        "Orbits",
        "function [count] = Orbits(sat, limit)\nCreate Variable n;\nn = 0;\nWhile n < limit\n   n = n + 1;\nEndWhile;\ncount = n;",
    );
    assert!(result.is_ok(), "{:?}", result.err());

    let workspace = interpreter.workspace();
    assert!(!workspace.config().contains("n"));
    let definition = workspace.function("Orbits").expect("Orbits is defined");
    assert!(definition.objects.contains("n"));
    assert_eq!(definition.sequence.commands().len(), 2);
    assert_eq!(definition.sequence.len(), 3);
    assert_eq!(definition.header.inputs, vec!["sat", "limit"]);
    assert_eq!(definition.header.outputs, vec!["count"]);
}

#[test]
fn test_call_checks_defined_function() {
    let mut interpreter = Interpreter::new();
    let defined = interpreter.interpret_function("Half", "function [y] = Half(x)\ny = x / 2;");
    assert!(defined.is_ok(), "{:?}", defined.err());

    let err = interpreter
        .interpret_str("Create GmatFunction Half;\nCreate Variable a b;\nBeginMissionSequence;\n[a, b] = Half(4);")
        .expect_err("Half returns one value");
    assert!(err.to_string().contains("returns 1 output(s)"), "{}", err);
}

#[test]
fn test_regenerated_script_reads_back() {
    let first = load(MISSION);
    let text = first.generating_string();
    assert!(text.contains("BeginMissionSequence;"));
    assert!(text.contains("   Vary DC1(TOI.Element1 = 1.0, {Perturbation = 0.0001});"), "{}", text);

    let path = std::env::temp_dir().join(format!("missionscript-regen-{}.script", std::process::id()));
    std::fs::write(&path, &text).expect("script written");
    let mut second = Interpreter::new();
    let result = second.interpret_file(&path);
    let _ = std::fs::remove_file(&path);
    assert!(result.is_ok(), "{:?}", result.err());
    assert_eq!(second.generating_string(), text);
}
