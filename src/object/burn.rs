//! Impulsive and finite burns.
//!
//! A burn's direction is given in `Element1..3` (legacy labels `V`, `N`,
//! `B`) along `Axes` about `Origin`. When `CoordinateSystem` names a real
//! coordinate system instead of `Local`, the origin and axes come from
//! that system and the two fields become read-only.

use super::{ObjectType, SetOutcome, TableObject, Translation, TypeSpec};
use crate::property::{Alias, Bound, PropertyDef, PropertyId, PropertyTable};

/// Axes a local burn frame may use.
pub(crate) const LOCAL_AXES: &[&str] = &["VNB", "LVLH", "MJ2000Eq", "SpacecraftBody"];

/// Coordinate system that replaces the legacy `Inertial` frame.
pub(crate) const INERTIAL_REPLACEMENT: &str = "EarthMJ2000Eq";

static BURN_TABLE: PropertyTable = PropertyTable {
    type_name: "Burn",
    parent: None,
    properties: &[
        PropertyDef::object("CoordinateSystem", "Local", "CoordinateSystem").also_accepts(&["Local"]),
        PropertyDef::object("Origin", "Earth", "SpacePoint"),
        PropertyDef::enumeration("Axes", "VNB", LOCAL_AXES),
        PropertyDef::enumeration("VectorFormat", "Cartesian", &["Cartesian", "Spherical"])
            .deprecated(),
        PropertyDef::real("Element1", 0.0),
        PropertyDef::real("Element2", 0.0),
        PropertyDef::real("Element3", 0.0),
    ],
    aliases: &[
        Alias {
            label: "V",
            target: "Element1",
        },
        Alias {
            label: "N",
            target: "Element2",
        },
        Alias {
            label: "B",
            target: "Element3",
        },
    ],
};

static IMPULSIVE_TABLE: PropertyTable = PropertyTable {
    type_name: "ImpulsiveBurn",
    parent: Some(&BURN_TABLE),
    properties: &[
        PropertyDef::boolean("DecrementMass", false),
        PropertyDef::object_array("Tank", &[], "FuelTank"),
        PropertyDef::real("Isp", 300.0).bounded(Bound::Positive),
        PropertyDef::real("GravitationalAccel", 9.81).bounded(Bound::Positive),
    ],
    aliases: &[],
};

static FINITE_TABLE: PropertyTable = PropertyTable {
    type_name: "FiniteBurn",
    parent: Some(&BURN_TABLE),
    properties: &[
        PropertyDef::object_array("Thrusters", &[], "Thruster"),
        PropertyDef::enumeration(
            "ThrottleLogicAlgorithm",
            "MaxNumberOfThrusters",
            &["MaxNumberOfThrusters", "MinimumRequiredThrusters"],
        ),
    ],
    aliases: &[],
};

/// Impulsive maneuver.
pub static IMPULSIVE_BURN: TypeSpec = TypeSpec {
    read_only: Some(local_frame_read_only),
    translate: Some(translate_inertial),
    ..TypeSpec::plain(ObjectType::ImpulsiveBurn, &IMPULSIVE_TABLE)
};

/// Finite maneuver.
pub static FINITE_BURN: TypeSpec = TypeSpec {
    read_only: Some(local_frame_read_only),
    translate: Some(translate_inertial),
    ..TypeSpec::plain(ObjectType::FiniteBurn, &FINITE_TABLE)
};

/// `Origin` and `Axes` only apply to a `Local` frame.
pub(crate) fn local_frame_read_only(obj: &TableObject, id: PropertyId) -> bool {
    let Some(def) = obj.spec().table.def(id) else {
        return false;
    };
    matches!(def.label, "Origin" | "Axes") && obj.text_of("CoordinateSystem") != "Local"
}

/// `Inertial` used to be both an axis label and a frame name; both now
/// mean the Earth-centred J2000 equatorial system.
pub(crate) fn translate_inertial(obj: &TableObject, id: PropertyId, text: &str) -> Option<Translation> {
    let label = obj.spec().table.def(id)?.label;
    if crate::interpreter::text::strip_quotes(text.trim()) != "Inertial" {
        return None;
    }
    if !matches!(label, "Axes" | "CoordinateSystem") {
        return None;
    }
    let target = obj.spec().table.lookup("CoordinateSystem")?.id;
    Some(Translation {
        id: target,
        text: INERTIAL_REPLACEMENT.to_string(),
        warning: SetOutcome::Warned {
            key: format!("{}.Inertial", obj.spec().table.type_name),
            message: format!(
                "\"Inertial\" is deprecated for {}; using the {} coordinate system",
                label, INERTIAL_REPLACEMENT
            ),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScriptError;
    use crate::object::ConfiguredObject;
    use crate::property::PropertyValue;

    fn id_of(obj: &TableObject, label: &str) -> PropertyId {
        obj.parameter_id(label).expect("known label").id
    }

    #[test]
    fn test_vnb_aliases() {
        let burn = IMPULSIVE_BURN.instantiate("Burn1");
        let m = burn.parameter_id("V").expect("alias");
        assert_eq!(burn.parameter_label(m.id), Some("Element1"));
        assert_eq!(m.replacement, Some("Element1"));
    }

    #[test]
    fn test_bad_axes_lists_allowed() {
        let mut burn = IMPULSIVE_BURN.instantiate("Burn1");
        let axes = id_of(&burn, "Axes");
        let err = burn.set_text(axes, "BadFrame").unwrap_err();
        match err {
            ScriptError::InvalidValue { allowed, field, .. } => {
                assert_eq!(field, "Axes");
                assert_eq!(allowed, "VNB, LVLH, MJ2000Eq, SpacecraftBody");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_inertial_axes_selects_coordinate_system() {
        let mut burn = IMPULSIVE_BURN.instantiate("Burn1");
        let axes = id_of(&burn, "Axes");
        let outcome = burn.set_text(axes, "Inertial").expect("legacy value accepted");
        assert!(matches!(outcome, SetOutcome::Warned { .. }));
        assert_eq!(burn.text_of("CoordinateSystem"), "EarthMJ2000Eq");
        assert!(burn.is_parameter_read_only(axes));
        assert!(burn.is_parameter_read_only(id_of(&burn, "Origin")));
    }

    #[test]
    fn test_axes_read_only_outside_local_frame() {
        let mut burn = FINITE_BURN.instantiate("FB");
        let axes = id_of(&burn, "Axes");
        assert!(!burn.is_parameter_read_only(axes));
        let cs = id_of(&burn, "CoordinateSystem");
        burn.set_text(cs, "EarthMJ2000Eq").expect("frame");
        let err = burn.set_text(axes, "LVLH").unwrap_err();
        assert!(matches!(err, ScriptError::ReadOnly { .. }));
    }

    #[test]
    fn test_vector_format_is_ignored() {
        let mut burn = IMPULSIVE_BURN.instantiate("Burn1");
        let id = id_of(&burn, "VectorFormat");
        let outcome = burn.set_text(id, "Spherical").expect("accepted");
        assert!(matches!(outcome, SetOutcome::Warned { ref key, .. } if key == "ImpulsiveBurn.VectorFormat"));
        assert_eq!(
            burn.value_of("VectorFormat"),
            Some(&PropertyValue::Enumeration("Cartesian".to_string()))
        );
    }
}
