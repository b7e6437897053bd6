//! Targeting and optimization solvers.

use super::{ConfiguredObject, ObjectType, TableObject, TypeSpec};
use crate::property::{Bound, PropertyDef, PropertyTable};

const REPORT_STYLES: &[&str] = &["Normal", "Concise", "Verbose", "Debug"];

static SOLVER_TABLE: PropertyTable = PropertyTable {
    type_name: "Solver",
    parent: None,
    properties: &[
        PropertyDef::boolean("ShowProgress", true),
        PropertyDef::enumeration("ReportStyle", "Normal", REPORT_STYLES),
        PropertyDef::filename("ReportFile", ""),
    ],
    aliases: &[],
};

static DIFFERENTIAL_CORRECTOR_TABLE: PropertyTable = PropertyTable {
    type_name: "DifferentialCorrector",
    parent: Some(&SOLVER_TABLE),
    properties: &[
        PropertyDef::integer("MaximumIterations", 25).bounded(Bound::Positive),
        PropertyDef::enumeration(
            "DerivativeMethod",
            "ForwardDifference",
            &["ForwardDifference", "BackwardDifference", "CentralDifference"],
        ),
        PropertyDef::enumeration(
            "Algorithm",
            "NewtonRaphson",
            &["NewtonRaphson", "Broyden", "ModifiedBroyden"],
        ),
    ],
    aliases: &[],
};

static YUKON_TABLE: PropertyTable = PropertyTable {
    type_name: "Yukon",
    parent: Some(&SOLVER_TABLE),
    properties: &[
        PropertyDef::integer("MaximumIterations", 200).bounded(Bound::Positive),
        PropertyDef::real("FeasibilityTolerance", 1e-4).bounded(Bound::Positive),
        PropertyDef::real("OptimalityTolerance", 1e-4).bounded(Bound::Positive),
        PropertyDef::enumeration(
            "HessianUpdateMethod",
            "SelfScaledBFGS",
            &["SelfScaledBFGS", "DampedBFGS"],
        ),
        PropertyDef::integer("MaximumFunctionEvals", 1000).bounded(Bound::Positive),
    ],
    aliases: &[],
};

/// Differential corrector (targeter).
pub static DIFFERENTIAL_CORRECTOR: TypeSpec = TypeSpec {
    validate: Some(validate_report_file),
    ..TypeSpec::plain(ObjectType::DifferentialCorrector, &DIFFERENTIAL_CORRECTOR_TABLE)
};

/// Yukon optimizer.
pub static YUKON: TypeSpec = TypeSpec {
    validate: Some(validate_report_file),
    ..TypeSpec::plain(ObjectType::Yukon, &YUKON_TABLE)
};

fn validate_report_file(solver: &TableObject) -> Vec<String> {
    let file = solver.text_of("ReportFile");
    if file.contains(['*', '?', '"', '<', '>', '|']) {
        vec![format!(
            "The report file \"{}\" of solver \"{}\" is not a valid file name",
            file,
            solver.name()
        )]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScriptError;

    #[test]
    fn test_shared_solver_fields() {
        let dc = DIFFERENTIAL_CORRECTOR.instantiate("DC");
        let yukon = YUKON.instantiate("Opt");
        assert_eq!(
            dc.parameter_id("ShowProgress").map(|m| m.id).ok(),
            yukon.parameter_id("ShowProgress").map(|m| m.id).ok()
        );
        assert_eq!(yukon.real_of("MaximumIterations"), Some(200.0));
    }

    #[test]
    fn test_iterations_must_be_positive() {
        let mut dc = DIFFERENTIAL_CORRECTOR.instantiate("DC");
        let id = dc.parameter_id("MaximumIterations").expect("field").id;
        assert!(matches!(
            dc.set_text(id, "0"),
            Err(ScriptError::InvalidValue { .. })
        ));
        dc.set_text(id, "40").expect("positive");
        assert_eq!(dc.real_of("MaximumIterations"), Some(40.0));
    }
}
