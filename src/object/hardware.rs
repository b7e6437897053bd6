//! Tanks and thrusters attached to spacecraft.

use super::burn::{local_frame_read_only, translate_inertial, LOCAL_AXES};
use super::{ConfiguredObject, ObjectType, TableObject, TypeSpec};
use crate::property::{Bound, PropertyDef, PropertyTable, PropertyValue};

static TANK_TABLE: PropertyTable = PropertyTable {
    type_name: "ChemicalTank",
    parent: None,
    properties: &[
        PropertyDef::real("FuelMass", 756.0),
        PropertyDef::real("Pressure", 1500.0).bounded(Bound::NonNegative),
        PropertyDef::real("Temperature", 20.0),
        PropertyDef::real("RefTemperature", 20.0),
        PropertyDef::real("Volume", 0.75).bounded(Bound::NonNegative),
        PropertyDef::real("FuelDensity", 1260.0).bounded(Bound::Positive),
        PropertyDef::enumeration(
            "PressureModel",
            "PressureRegulated",
            &["PressureRegulated", "BlowDown"],
        ),
        PropertyDef::boolean("AllowNegativeFuelMass", false),
    ],
    aliases: &[],
};

static THRUSTER_TABLE: PropertyTable = PropertyTable {
    type_name: "ChemicalThruster",
    parent: None,
    properties: &[
        PropertyDef::object("CoordinateSystem", "Local", "CoordinateSystem").also_accepts(&["Local"]),
        PropertyDef::object("Origin", "Earth", "SpacePoint"),
        PropertyDef::enumeration("Axes", "VNB", LOCAL_AXES),
        PropertyDef::real("ThrustDirection1", 1.0),
        PropertyDef::real("ThrustDirection2", 0.0),
        PropertyDef::real("ThrustDirection3", 0.0),
        PropertyDef::real("DutyCycle", 1.0).bounded(Bound::NonNegative),
        PropertyDef::real("ThrustScaleFactor", 1.0).bounded(Bound::NonNegative),
        PropertyDef::object_array("Tank", &[], "FuelTank"),
        PropertyDef::boolean("DecrementMass", false),
        PropertyDef::real("GravitationalAccel", 9.81).bounded(Bound::Positive),
    ],
    aliases: &[],
};

/// Propellant tank.
pub static CHEMICAL_TANK: TypeSpec = TypeSpec {
    validate: Some(validate_tank),
    ..TypeSpec::plain(ObjectType::ChemicalTank, &TANK_TABLE)
};

/// Chemical thruster.
pub static CHEMICAL_THRUSTER: TypeSpec = TypeSpec {
    read_only: Some(local_frame_read_only),
    translate: Some(translate_inertial),
    validate: Some(validate_thruster),
    ..TypeSpec::plain(ObjectType::ChemicalThruster, &THRUSTER_TABLE)
};

fn validate_tank(tank: &TableObject) -> Vec<String> {
    let negative = tank.real_of("FuelMass").is_some_and(|m| m < 0.0);
    let allowed = matches!(
        tank.value_of("AllowNegativeFuelMass"),
        Some(PropertyValue::Boolean(true))
    );
    if negative && !allowed {
        vec![format!("The tank \"{}\" has negative fuel mass", tank.name())]
    } else {
        Vec::new()
    }
}

fn validate_thruster(thruster: &TableObject) -> Vec<String> {
    let direction: Vec<f64> = ["ThrustDirection1", "ThrustDirection2", "ThrustDirection3"]
        .iter()
        .filter_map(|label| thruster.real_of(label))
        .collect();
    if direction.iter().all(|v| *v == 0.0) {
        return vec![format!(
            "The thrust direction of thruster \"{}\" is the zero vector",
            thruster.name()
        )];
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tank_satisfies_legacy_type() {
        let tank = CHEMICAL_TANK.instantiate("Tank1");
        assert!(tank.object_type().satisfies("FuelTank"));
        assert!(tank.validate().is_empty());
    }

    #[test]
    fn test_thruster_zero_direction() {
        let mut thruster = CHEMICAL_THRUSTER.instantiate("T1");
        let id = thruster.parameter_id("ThrustDirection1").expect("field").id;
        thruster.set_text(id, "0").expect("real");
        assert_eq!(thruster.validate().len(), 1);
    }

    #[test]
    fn test_thruster_tank_reference() {
        let mut thruster = CHEMICAL_THRUSTER.instantiate("T1");
        let id = thruster.parameter_id("Tank").expect("field").id;
        thruster.set_text(id, "{Tank1}").expect("list");
        let refs = thruster.referenced_objects();
        assert!(refs.iter().any(|r| r.name == "Tank1" && r.expected == "FuelTank"));
        assert!(!refs.iter().any(|r| r.name == "Local"));
    }
}
