//! Force models and propagators.
//!
//! Creating a propagator also creates its companion force model named
//! `<propagator>_ForceModel`; the pairing is maintained by the
//! configuration registry, not here.

use super::{ConfiguredObject, ObjectType, TableObject, TypeSpec};
use crate::property::{Alias, Bound, PropertyDef, PropertyTable, PropertyValue};

/// Suffix of the force model created with each propagator.
pub const FORCE_MODEL_SUFFIX: &str = "_ForceModel";

static FORCE_MODEL_TABLE: PropertyTable = PropertyTable {
    type_name: "ForceModel",
    parent: None,
    properties: &[
        PropertyDef::object("CentralBody", "Earth", "CelestialBody"),
        PropertyDef::object_array("PrimaryBodies", &["Earth"], "CelestialBody"),
        PropertyDef::object_array("PointMasses", &[], "CelestialBody"),
        PropertyDef::integer("GravityField.Earth.Degree", 4).bounded(Bound::NonNegative),
        PropertyDef::integer("GravityField.Earth.Order", 4).bounded(Bound::NonNegative),
        PropertyDef::filename("GravityField.Earth.PotentialFile", "JGM2.cof"),
        PropertyDef::enumeration(
            "Drag.AtmosphereModel",
            "None",
            &["None", "Exponential", "MSISE90", "JacchiaRoberts"],
        ),
        PropertyDef::on_off("SRP", false),
        PropertyDef::on_off("RelativisticCorrection", false),
        PropertyDef::enumeration(
            "ErrorControl",
            "RSSStep",
            &["None", "RSSStep", "RSSState", "LargestStep", "LargestState"],
        ),
    ],
    aliases: &[
        Alias {
            label: "Drag",
            target: "Drag.AtmosphereModel",
        },
        Alias {
            label: "Gravity.Earth.Degree",
            target: "GravityField.Earth.Degree",
        },
        Alias {
            label: "Gravity.Earth.Order",
            target: "GravityField.Earth.Order",
        },
        Alias {
            label: "Gravity.Earth.PotentialFile",
            target: "GravityField.Earth.PotentialFile",
        },
    ],
};

static PROPAGATOR_TABLE: PropertyTable = PropertyTable {
    type_name: "Propagator",
    parent: None,
    properties: &[
        PropertyDef::object("FM", "", "ForceModel"),
        PropertyDef::enumeration(
            "Type",
            "RungeKutta89",
            &[
                "RungeKutta89",
                "RungeKutta68",
                "RungeKutta56",
                "PrinceDormand45",
                "PrinceDormand78",
                "AdamsBashforthMoulton",
            ],
        ),
        PropertyDef::real("InitialStepSize", 60.0),
        PropertyDef::real("Accuracy", 1e-11).bounded(Bound::Positive),
        PropertyDef::real("MinStep", 0.001).bounded(Bound::NonNegative),
        PropertyDef::real("MaxStep", 2700.0).bounded(Bound::Positive),
        PropertyDef::integer("MaxStepAttempts", 50).bounded(Bound::Positive),
        PropertyDef::boolean("StopIfAccuracyIsViolated", true),
    ],
    aliases: &[],
};

/// Force model (ODE model).
pub static FORCE_MODEL: TypeSpec = TypeSpec {
    validate: Some(validate_force_model),
    ..TypeSpec::plain(ObjectType::ForceModel, &FORCE_MODEL_TABLE)
};

/// Propagator (prop setup).
pub static PROPAGATOR: TypeSpec = TypeSpec {
    validate: Some(validate_propagator),
    ..TypeSpec::plain(ObjectType::Propagator, &PROPAGATOR_TABLE)
};

fn validate_force_model(fm: &TableObject) -> Vec<String> {
    let mut problems = Vec::new();
    let primaries = fm
        .value_of("PrimaryBodies")
        .map(|v| v.names())
        .unwrap_or_default();
    if let Some(PropertyValue::ObjectArray(points)) = fm.value_of("PointMasses") {
        for body in points.iter().filter(|p| primaries.contains(&p.as_str())) {
            problems.push(format!(
                "\"{}\" is both a primary body and a point mass of force model \"{}\"",
                body,
                fm.name()
            ));
        }
    }
    let degree = fm.real_of("GravityField.Earth.Degree").unwrap_or(0.0);
    let order = fm.real_of("GravityField.Earth.Order").unwrap_or(0.0);
    if order > degree {
        problems.push(format!(
            "The gravity order {} of force model \"{}\" exceeds its degree {}",
            order,
            fm.name(),
            degree
        ));
    }
    problems
}

fn validate_propagator(prop: &TableObject) -> Vec<String> {
    let mut problems = Vec::new();
    if prop.text_of("FM").is_empty() {
        problems.push(format!("Propagator \"{}\" has no force model", prop.name()));
    }
    let min = prop.real_of("MinStep").unwrap_or(0.0);
    let max = prop.real_of("MaxStep").unwrap_or(0.0);
    if min > max {
        problems.push(format!(
            "The MinStep of propagator \"{}\" is larger than its MaxStep",
            prop.name()
        ));
    }
    problems
}
