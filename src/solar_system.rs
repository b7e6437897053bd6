//! Named celestial bodies available to every script.

use crate::config::ConfigManager;
use crate::object::{downcast, downcast_mut, ConfiguredObject, ObjectId, Scope, TableObject, CELESTIAL_BODY};
use crate::property::PropertyValue;

/// `(name, central body, mu [km^3/s^2], equatorial radius [km])`
const BODIES: &[(&str, &str, f64, f64)] = &[
    ("Sun", "Sun", 132712440017.99, 695990.0),
    ("Mercury", "Sun", 22032.080486418, 2439.7),
    ("Venus", "Sun", 324858.59882646, 6051.8),
    ("Earth", "Sun", 398600.4415, 6378.1363),
    ("Luna", "Earth", 4902.8005821478, 1738.2),
    ("Mars", "Sun", 42828.314258067, 3396.19),
    ("Jupiter", "Sun", 126712767.8578, 71492.0),
    ("Saturn", "Sun", 37940626.061137, 60268.0),
    ("Uranus", "Sun", 5794549.0070719, 25559.0),
    ("Neptune", "Sun", 6836534.0638793, 25269.0),
    ("Pluto", "Sun", 981.600887707, 1162.0),
];

/// The bodies of the solar system, in their own store.
#[derive(Debug)]
pub struct SolarSystem {
    bodies: ConfigManager,
}

impl Default for SolarSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl SolarSystem {
    /// The default set of bodies with standard constants.
    pub fn new() -> Self {
        let mut bodies = ConfigManager::with_scope(Scope::SolarSystem);
        for (name, central, mu, radius) in BODIES {
            let mut body = CELESTIAL_BODY.instantiate(name);
            set_raw(&mut body, "Mu", PropertyValue::Real(*mu));
            set_raw(&mut body, "EquatorialRadius", PropertyValue::Real(*radius));
            set_raw(&mut body, "CentralBody", PropertyValue::Object(central.to_string()));
            body.set_global(true);
            // Names are unique in the table above.
            let _ = bodies.add_object(Box::new(body));
        }
        bodies.set_changed(false);
        Self { bodies }
    }

    /// Whether `name` is a body.
    pub fn contains(&self, name: &str) -> bool {
        self.bodies.contains(name)
    }

    /// Body names.
    pub fn body_names(&self) -> Vec<String> {
        self.bodies.list_of_items(None)
    }

    /// Body named `name`.
    pub fn body(&self, name: &str) -> Option<&TableObject> {
        self.bodies.get_item(name).and_then(downcast::<TableObject>)
    }

    /// Body named `name`, mutable.
    pub fn body_mut(&mut self, name: &str) -> Option<&mut TableObject> {
        self.bodies.get_item_mut(name).and_then(downcast_mut::<TableObject>)
    }

    /// Handle of a body.
    pub fn get_id(&self, name: &str) -> Option<ObjectId> {
        self.bodies.get_id(name)
    }

    /// Body behind a handle.
    pub fn get(&self, id: ObjectId) -> Option<&dyn ConfiguredObject> {
        self.bodies.get(id)
    }

    /// Gravitational parameter of a body.
    pub fn mu(&self, name: &str) -> Option<f64> {
        self.body(name).and_then(|b| b.real_of("Mu"))
    }

    /// Bodies whose fields were changed by a script.
    pub fn has_changed(&self) -> bool {
        self.bodies.has_changed()
    }

    /// Record that a script modified a body.
    pub fn mark_changed(&mut self) {
        self.bodies.set_changed(true);
    }
}

fn set_raw(body: &mut TableObject, label: &str, value: PropertyValue) {
    if let Ok(m) = body.parameter_id(label) {
        if let Some(slot) = body.raw_value_mut(m.id) {
            *slot = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bodies() {
        let ss = SolarSystem::new();
        assert!(ss.contains("Luna"));
        assert!(!ss.contains("Vulcan"));
        assert_eq!(ss.mu("Earth"), Some(398600.4415));
        assert_eq!(ss.body("Luna").map(|b| b.text_of("CentralBody")), Some("Earth"));
        assert!(!ss.has_changed());
    }

    #[test]
    fn test_handles_are_scoped() {
        let ss = SolarSystem::new();
        let id = ss.get_id("Mars").expect("body");
        assert_eq!(id.scope(), Scope::SolarSystem);
        assert_eq!(ss.get(id).map(|b| b.name()), Some("Mars"));
    }
}
