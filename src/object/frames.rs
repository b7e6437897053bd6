//! Coordinate systems.

use super::{ConfiguredObject, ObjectType, TableObject, TypeSpec};
use crate::property::{PropertyDef, PropertyId, PropertyTable, PropertyValue};

const AXES_TYPES: &[&str] = &[
    "MJ2000Eq",
    "MJ2000Ec",
    "BodyFixed",
    "BodyInertial",
    "ObjectReferenced",
    "Equator",
    "TOEEq",
    "MOEEq",
    "TODEq",
    "MODEq",
    "GSE",
    "GSM",
    "Topocentric",
];

const AXIS_DIRECTIONS: &[&str] = &["", "R", "V", "N", "-R", "-V", "-N"];

const OBJECT_REFERENCED_FIELDS: &[&str] = &["Primary", "Secondary", "XAxis", "YAxis", "ZAxis"];

static COORDINATE_SYSTEM_TABLE: PropertyTable = PropertyTable {
    type_name: "CoordinateSystem",
    parent: None,
    properties: &[
        PropertyDef::object("Origin", "Earth", "SpacePoint"),
        PropertyDef::enumeration("Axes", "MJ2000Eq", AXES_TYPES),
        PropertyDef::object("Primary", "Earth", "SpacePoint"),
        PropertyDef::object("Secondary", "Luna", "SpacePoint"),
        PropertyDef::enumeration("XAxis", "R", AXIS_DIRECTIONS),
        PropertyDef::enumeration("YAxis", "", AXIS_DIRECTIONS),
        PropertyDef::enumeration("ZAxis", "N", AXIS_DIRECTIONS),
        PropertyDef::real("Epoch", 21545.0),
    ],
    aliases: &[],
};

/// Coordinate system.
pub static COORDINATE_SYSTEM: TypeSpec = TypeSpec {
    read_only: Some(object_referenced_only),
    validate: Some(validate_axes),
    ..TypeSpec::plain(ObjectType::CoordinateSystem, &COORDINATE_SYSTEM_TABLE)
};

fn object_referenced_only(cs: &TableObject, id: PropertyId) -> bool {
    let Some(def) = cs.spec().table.def(id) else {
        return false;
    };
    OBJECT_REFERENCED_FIELDS.contains(&def.label) && cs.text_of("Axes") != "ObjectReferenced"
}

fn validate_axes(cs: &TableObject) -> Vec<String> {
    let mut problems = Vec::new();
    if cs.text_of("Axes") != "ObjectReferenced" {
        return problems;
    }
    if cs.text_of("Primary") == cs.text_of("Secondary") {
        problems.push(format!(
            "The primary and secondary of coordinate system \"{}\" are both \"{}\"",
            cs.name(),
            cs.text_of("Primary")
        ));
    }
    let axes: Vec<&str> = ["XAxis", "YAxis", "ZAxis"]
        .iter()
        .map(|label| cs.text_of(label))
        .filter(|axis| !axis.is_empty())
        .collect();
    if axes.len() != 2 {
        problems.push(format!(
            "Coordinate system \"{}\" must set exactly two of XAxis, YAxis and ZAxis",
            cs.name()
        ));
    } else if axes[0].trim_start_matches('-') == axes[1].trim_start_matches('-') {
        problems.push(format!(
            "The axes of coordinate system \"{}\" are colinear",
            cs.name()
        ));
    }
    problems
}

/// Coordinate systems every workspace starts with.
pub fn default_coordinate_systems() -> Vec<TableObject> {
    [
        ("EarthMJ2000Eq", "MJ2000Eq"),
        ("EarthMJ2000Ec", "MJ2000Ec"),
        ("EarthFixed", "BodyFixed"),
    ]
    .iter()
    .map(|(name, axes)| {
        let mut cs = COORDINATE_SYSTEM.instantiate(name);
        if let Some(m) = COORDINATE_SYSTEM_TABLE.lookup("Axes") {
            if let Some(slot) = cs.raw_value_mut(m.id) {
                *slot = PropertyValue::Enumeration(axes.to_string());
            }
        }
        cs
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScriptError;

    #[test]
    fn test_defaults() {
        let systems = default_coordinate_systems();
        let names: Vec<&str> = systems.iter().map(|cs| cs.name()).collect();
        assert_eq!(names, vec!["EarthMJ2000Eq", "EarthMJ2000Ec", "EarthFixed"]);
        assert_eq!(systems[2].text_of("Axes"), "BodyFixed");
    }

    #[test]
    fn test_primary_needs_object_referenced_axes() {
        let mut cs = COORDINATE_SYSTEM.instantiate("Rot");
        let primary = cs.parameter_id("Primary").expect("field").id;
        assert!(matches!(
            cs.set_text(primary, "Sun"),
            Err(ScriptError::ReadOnly { .. })
        ));
        let axes = cs.parameter_id("Axes").expect("field").id;
        cs.set_text(axes, "ObjectReferenced").expect("axes");
        cs.set_text(primary, "Sun").expect("now writable");
        assert!(cs.validate().is_empty(), "{:?}", cs.validate());
    }

    #[test]
    fn test_colinear_axes_rejected() {
        let mut cs = COORDINATE_SYSTEM.instantiate("Rot");
        let axes = cs.parameter_id("Axes").expect("field").id;
        cs.set_text(axes, "ObjectReferenced").expect("axes");
        let z = cs.parameter_id("ZAxis").expect("field").id;
        cs.set_text(z, "-R").expect("direction");
        assert_eq!(cs.validate().len(), 1);
    }
}
