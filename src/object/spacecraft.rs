//! Spacecraft and the space-point base table.

use std::sync::LazyLock;

use regex::Regex;

use super::{ConfiguredObject, ObjectType, TableObject, TypeSpec};
use crate::property::{Alias, Bound, PropertyDef, PropertyTable};

pub(crate) const DATE_FORMATS: &[&str] = &[
    "A1ModJulian",
    "TAIModJulian",
    "UTCModJulian",
    "TTModJulian",
    "A1Gregorian",
    "TAIGregorian",
    "UTCGregorian",
    "TTGregorian",
];

const STATE_TYPES: &[&str] = &[
    "Cartesian",
    "Keplerian",
    "ModifiedKeplerian",
    "SphericalAZFPA",
    "SphericalRADEC",
    "Equinoctial",
];

static GREGORIAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{2} [A-Z][a-z]{2} \d{4} \d{2}:\d{2}:\d{2}\.\d{3}$")
        .expect("valid gregorian regex")
});

/// Fields shared by everything with a location in space.
pub(crate) static SPACE_POINT_TABLE: PropertyTable = PropertyTable {
    type_name: "SpacePoint",
    parent: None,
    properties: &[
        PropertyDef::integer("NAIFId", -10000001),
        PropertyDef::string("OrbitColor", "Red"),
    ],
    aliases: &[],
};

static SPACECRAFT_TABLE: PropertyTable = PropertyTable {
    type_name: "Spacecraft",
    parent: Some(&SPACE_POINT_TABLE),
    properties: &[
        PropertyDef::enumeration("DateFormat", "TAIModJulian", DATE_FORMATS),
        PropertyDef::string("Epoch", "21545"),
        PropertyDef::object("CoordinateSystem", "EarthMJ2000Eq", "CoordinateSystem"),
        PropertyDef::enumeration("DisplayStateType", "Cartesian", STATE_TYPES),
        PropertyDef::real("X", 7100.0),
        PropertyDef::real("Y", 0.0),
        PropertyDef::real("Z", 1300.0),
        PropertyDef::real("VX", 0.0),
        PropertyDef::real("VY", 7.35),
        PropertyDef::real("VZ", 1.0),
        PropertyDef::real("DryMass", 850.0).bounded(Bound::NonNegative),
        PropertyDef::real("Cd", 2.2).bounded(Bound::NonNegative),
        PropertyDef::real("Cr", 1.8).bounded(Bound::NonNegative),
        PropertyDef::real("DragArea", 15.0).bounded(Bound::NonNegative),
        PropertyDef::real("SRPArea", 1.0).bounded(Bound::NonNegative),
        PropertyDef::object_array("Tanks", &[], "FuelTank"),
        PropertyDef::object_array("Thrusters", &[], "Thruster"),
        PropertyDef::string("Id", "SatId"),
    ],
    aliases: &[Alias {
        label: "StateType",
        target: "DisplayStateType",
    }],
};

/// Spacecraft.
pub static SPACECRAFT: TypeSpec = TypeSpec {
    validate: Some(validate_spacecraft),
    ..TypeSpec::plain(ObjectType::Spacecraft, &SPACECRAFT_TABLE)
};

fn validate_spacecraft(sat: &TableObject) -> Vec<String> {
    let format = sat.text_of("DateFormat");
    let epoch = sat.text_of("Epoch").trim();
    let ok = if format.ends_with("ModJulian") {
        epoch.parse::<f64>().is_ok()
    } else {
        GREGORIAN_RE.is_match(epoch)
    };
    if ok {
        Vec::new()
    } else {
        vec![format!(
            "The epoch \"{}\" of spacecraft \"{}\" does not match its DateFormat {}",
            epoch,
            sat.name(),
            format
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyValue;

    #[test]
    fn test_state_type_alias() {
        let sat = SPACECRAFT.instantiate("Sat1");
        let m = sat.parameter_id("StateType").expect("alias");
        assert_eq!(m.replacement, Some("DisplayStateType"));
        assert_eq!(sat.parameter_label(m.id), Some("DisplayStateType"));
    }

    #[test]
    fn test_inherited_space_point_field() {
        let sat = SPACECRAFT.instantiate("Sat1");
        let m = sat.parameter_id("NAIFId").expect("base field");
        assert_eq!(m.id, 0);
    }

    #[test]
    fn test_epoch_must_match_format() {
        let mut sat = SPACECRAFT.instantiate("Sat1");
        assert!(sat.validate().is_empty());
        let id = sat.parameter_id("DateFormat").expect("field").id;
        sat.set_value(id, PropertyValue::Enumeration("UTCGregorian".into()))
            .expect("valid format");
        assert_eq!(sat.validate().len(), 1);
        let epoch = sat.parameter_id("Epoch").expect("field").id;
        sat.set_value(epoch, PropertyValue::String("01 Jan 2000 11:59:28.000".into()))
            .expect("epoch");
        assert!(sat.validate().is_empty());
    }
}
