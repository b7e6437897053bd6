//! Celestial bodies, calculated points and ground stations.

use super::{ConfiguredObject, ObjectType, TableObject, TypeSpec};
use super::spacecraft::SPACE_POINT_TABLE;
use crate::property::{Bound, PropertyDef, PropertyTable};

static CELESTIAL_BODY_TABLE: PropertyTable = PropertyTable {
    type_name: "CelestialBody",
    parent: Some(&SPACE_POINT_TABLE),
    properties: &[
        PropertyDef::real("Mu", 398600.4415).bounded(Bound::Positive),
        PropertyDef::real("EquatorialRadius", 6378.1363).bounded(Bound::NonNegative),
        PropertyDef::real("Flattening", 0.0033527),
        PropertyDef::object("CentralBody", "Sun", "CelestialBody"),
    ],
    aliases: &[],
};

static BARYCENTER_TABLE: PropertyTable = PropertyTable {
    type_name: "Barycenter",
    parent: Some(&SPACE_POINT_TABLE),
    properties: &[PropertyDef::object_array("BodyNames", &["Earth", "Luna"], "CelestialBody")],
    aliases: &[],
};

static LIBRATION_POINT_TABLE: PropertyTable = PropertyTable {
    type_name: "LibrationPoint",
    parent: Some(&SPACE_POINT_TABLE),
    properties: &[
        PropertyDef::object("Primary", "Sun", "SpacePoint"),
        PropertyDef::object("Secondary", "Earth", "SpacePoint"),
        PropertyDef::enumeration("Point", "L1", &["L1", "L2", "L3", "L4", "L5"]),
    ],
    aliases: &[],
};

static GROUND_STATION_TABLE: PropertyTable = PropertyTable {
    type_name: "GroundStation",
    parent: Some(&SPACE_POINT_TABLE),
    properties: &[
        PropertyDef::object("CentralBody", "Earth", "CelestialBody"),
        PropertyDef::enumeration("StateType", "Cartesian", &["Cartesian", "Spherical"]),
        PropertyDef::enumeration("HorizonReference", "Sphere", &["Sphere", "Ellipsoid"]),
        PropertyDef::real("Location1", 6378.1363),
        PropertyDef::real("Location2", 0.0),
        PropertyDef::real("Location3", 0.0),
        PropertyDef::string("Id", "StationId"),
        PropertyDef::real("MinimumElevationAngle", 7.0),
    ],
    aliases: &[],
};

/// Solar-system body.
pub static CELESTIAL_BODY: TypeSpec = TypeSpec::plain(ObjectType::CelestialBody, &CELESTIAL_BODY_TABLE);

/// Barycenter of several bodies.
pub static BARYCENTER: TypeSpec = TypeSpec {
    validate: Some(validate_barycenter),
    ..TypeSpec::plain(ObjectType::Barycenter, &BARYCENTER_TABLE)
};

/// Libration point.
pub static LIBRATION_POINT: TypeSpec = TypeSpec {
    validate: Some(validate_libration_point),
    ..TypeSpec::plain(ObjectType::LibrationPoint, &LIBRATION_POINT_TABLE)
};

/// Ground station.
pub static GROUND_STATION: TypeSpec = TypeSpec::plain(ObjectType::GroundStation, &GROUND_STATION_TABLE);

fn validate_barycenter(point: &TableObject) -> Vec<String> {
    let bodies = point.value_of("BodyNames").map(|v| v.names()).unwrap_or_default();
    if bodies.is_empty() {
        vec![format!("Barycenter \"{}\" has no bodies", point.name())]
    } else {
        Vec::new()
    }
}

fn validate_libration_point(point: &TableObject) -> Vec<String> {
    if point.text_of("Primary") == point.text_of("Secondary") {
        vec![format!(
            "The primary and secondary bodies of libration point \"{}\" must differ",
            point.name()
        )]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_libration_point_bodies_differ() {
        let mut point = LIBRATION_POINT.instantiate("L1");
        assert!(point.validate().is_empty());
        let id = point.parameter_id("Secondary").expect("field").id;
        point.set_text(id, "Sun").expect("reference");
        assert_eq!(point.validate().len(), 1);
    }

    #[test]
    fn test_ground_station_references_body() {
        let station = GROUND_STATION.instantiate("GS");
        let refs = station.referenced_objects();
        assert!(refs
            .iter()
            .any(|r| r.field == "CentralBody" && r.name == "Earth"));
    }
}
