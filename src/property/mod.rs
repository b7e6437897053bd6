//! String-keyed property reflection.
//!
//! Every configured object exposes its fields through a static
//! [`PropertyTable`]. A table lists `(label, type, default)` entries and may
//! extend a parent table; ids are assigned parent-first so a derived type's
//! ids never collide with its base type's ids. Label lookup checks the
//! derived table (and its deprecated aliases) before walking to the parent.

mod value;

pub use value::{PropertyValue, Rmatrix};
pub(crate) use value::format_real;

use std::fmt;

/// Index of a property within an object's full table chain.
pub type PropertyId = usize;

/// The value kind of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterType {
    /// Signed integer.
    Integer,
    /// Unsigned integer.
    UnsignedInt,
    /// Real number.
    Real,
    /// Real-valued matrix (`[1 2; 3 4]`).
    Rmatrix,
    /// Free text, written single-quoted.
    String,
    /// List of text values.
    StringArray,
    /// `true` / `false`.
    Boolean,
    /// List of booleans.
    BooleanArray,
    /// `On` / `Off`.
    OnOff,
    /// One of a fixed set of labels.
    Enumeration,
    /// File path, written single-quoted.
    Filename,
    /// Name of another configured object.
    Object,
    /// List of names of other configured objects.
    ObjectArray,
}

impl ParameterType {
    /// Human readable name used in messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterType::Integer => "Integer",
            ParameterType::UnsignedInt => "UnsignedInt",
            ParameterType::Real => "Real",
            ParameterType::Rmatrix => "RealArray",
            ParameterType::String => "String",
            ParameterType::StringArray => "StringArray",
            ParameterType::Boolean => "Boolean",
            ParameterType::BooleanArray => "BooleanArray",
            ParameterType::OnOff => "OnOff",
            ParameterType::Enumeration => "Enumeration",
            ParameterType::Filename => "Filename",
            ParameterType::Object => "Object",
            ParameterType::ObjectArray => "ObjectArray",
        }
    }

    /// Whether values of this type are numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ParameterType::Integer | ParameterType::UnsignedInt | ParameterType::Real
        )
    }

    /// Whether values of this type name other configured objects.
    pub fn is_reference(&self) -> bool {
        matches!(self, ParameterType::Object | ParameterType::ObjectArray)
    }

    /// Whether values of this type are text.
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            ParameterType::String | ParameterType::Filename | ParameterType::Enumeration
        )
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Numeric domain of a real or integer property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Any finite value.
    Any,
    /// Value `>= 0`.
    NonNegative,
    /// Value `> 0`.
    Positive,
}

impl Bound {
    pub(crate) fn accepts(&self, value: f64) -> bool {
        match self {
            Bound::Any => value.is_finite(),
            Bound::NonNegative => value >= 0.0,
            Bound::Positive => value > 0.0,
        }
    }

    pub(crate) fn describe(&self, ty: ParameterType) -> String {
        let kind = match ty {
            ParameterType::Integer | ParameterType::UnsignedInt => "Integer",
            _ => "Real Number",
        };
        match self {
            Bound::Any => kind.to_string(),
            Bound::NonNegative => format!("{} >= 0", kind),
            Bound::Positive => format!("{} > 0", kind),
        }
    }
}

/// Compile-time default for a property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    /// Real default.
    Real(f64),
    /// Integer default.
    Integer(i64),
    /// Text default (strings, enumerations, filenames, object names).
    Text(&'static str),
    /// Boolean default.
    Bool(bool),
    /// On/Off default (`true` is `On`).
    Switch(bool),
    /// Name list default.
    Names(&'static [&'static str]),
    /// Row vector default.
    Reals(&'static [f64]),
}

/// One entry of a [`PropertyTable`].
#[derive(Debug, Clone, Copy)]
pub struct PropertyDef {
    /// Script label.
    pub label: &'static str,
    /// Value kind.
    pub ty: ParameterType,
    /// Value held by a freshly created object.
    pub default: DefaultValue,
    /// Never settable from a script.
    pub read_only: bool,
    /// Accepted but ignored; setting it only produces a warning.
    pub deprecated: bool,
    /// Allowed labels for enumerations, or extra literal names accepted
    /// by object references (for example `Local`).
    pub allowed: &'static [&'static str],
    /// Type or category that referenced objects must satisfy.
    pub object_type: Option<&'static str>,
    /// Numeric domain.
    pub bound: Bound,
}

impl PropertyDef {
    const fn base(label: &'static str, ty: ParameterType, default: DefaultValue) -> Self {
        Self {
            label,
            ty,
            default,
            read_only: false,
            deprecated: false,
            allowed: &[],
            object_type: None,
            bound: Bound::Any,
        }
    }

    /// A real-valued property.
    pub const fn real(label: &'static str, default: f64) -> Self {
        Self::base(label, ParameterType::Real, DefaultValue::Real(default))
    }

    /// A signed integer property.
    pub const fn integer(label: &'static str, default: i64) -> Self {
        Self::base(label, ParameterType::Integer, DefaultValue::Integer(default))
    }

    /// An unsigned integer property.
    pub const fn unsigned(label: &'static str, default: i64) -> Self {
        Self::base(label, ParameterType::UnsignedInt, DefaultValue::Integer(default))
    }

    /// A free text property.
    pub const fn string(label: &'static str, default: &'static str) -> Self {
        Self::base(label, ParameterType::String, DefaultValue::Text(default))
    }

    /// A file path property.
    pub const fn filename(label: &'static str, default: &'static str) -> Self {
        Self::base(label, ParameterType::Filename, DefaultValue::Text(default))
    }

    /// An enumerated property.
    pub const fn enumeration(
        label: &'static str,
        default: &'static str,
        allowed: &'static [&'static str],
    ) -> Self {
        let mut def = Self::base(label, ParameterType::Enumeration, DefaultValue::Text(default));
        def.allowed = allowed;
        def
    }

    /// A boolean property.
    pub const fn boolean(label: &'static str, default: bool) -> Self {
        Self::base(label, ParameterType::Boolean, DefaultValue::Bool(default))
    }

    /// An On/Off property.
    pub const fn on_off(label: &'static str, default: bool) -> Self {
        Self::base(label, ParameterType::OnOff, DefaultValue::Switch(default))
    }

    /// A reference to one object of `object_type`.
    pub const fn object(
        label: &'static str,
        default: &'static str,
        object_type: &'static str,
    ) -> Self {
        let mut def = Self::base(label, ParameterType::Object, DefaultValue::Text(default));
        def.object_type = Some(object_type);
        def
    }

    /// A list of references to objects of `object_type`.
    pub const fn object_array(
        label: &'static str,
        default: &'static [&'static str],
        object_type: &'static str,
    ) -> Self {
        let mut def = Self::base(label, ParameterType::ObjectArray, DefaultValue::Names(default));
        def.object_type = Some(object_type);
        def
    }

    /// A list of text values.
    pub const fn string_array(label: &'static str, default: &'static [&'static str]) -> Self {
        Self::base(label, ParameterType::StringArray, DefaultValue::Names(default))
    }

    /// A real row vector.
    pub const fn rmatrix(label: &'static str, default: &'static [f64]) -> Self {
        Self::base(label, ParameterType::Rmatrix, DefaultValue::Reals(default))
    }

    /// Mark as never settable.
    pub const fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Mark as accepted-but-ignored.
    pub const fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Restrict the numeric domain.
    pub const fn bounded(mut self, bound: Bound) -> Self {
        self.bound = bound;
        self
    }

    /// Extra literals accepted by an object reference.
    pub const fn also_accepts(mut self, literals: &'static [&'static str]) -> Self {
        self.allowed = literals;
        self
    }
}

/// A deprecated label that resolves to another label.
#[derive(Debug, Clone, Copy)]
pub struct Alias {
    /// Old label still accepted in scripts.
    pub label: &'static str,
    /// Current label it maps to.
    pub target: &'static str,
}

/// Result of resolving a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelMatch {
    /// Resolved id.
    pub id: PropertyId,
    /// Set when the label was a deprecated alias; holds the current label.
    pub replacement: Option<&'static str>,
}

/// Static property table of one object type.
#[derive(Debug)]
pub struct PropertyTable {
    /// Type whose fields this table declares.
    pub type_name: &'static str,
    /// Table this one extends.
    pub parent: Option<&'static PropertyTable>,
    /// Fields declared at this level.
    pub properties: &'static [PropertyDef],
    /// Deprecated labels declared at this level.
    pub aliases: &'static [Alias],
}

impl PropertyTable {
    /// Total number of properties including the parent chain.
    pub fn len(&self) -> usize {
        self.base_len() + self.properties.len()
    }

    /// Whether the chain declares no properties.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn base_len(&self) -> usize {
        self.parent.map(|p| p.len()).unwrap_or(0)
    }

    /// Definition for an id anywhere in the chain.
    pub fn def(&self, id: PropertyId) -> Option<&'static PropertyDef> {
        let base = self.base_len();
        if id < base {
            self.parent.and_then(|p| p.def(id))
        } else {
            self.properties.get(id - base)
        }
    }

    /// Resolve a label, checking this level first and then the parent.
    pub fn lookup(&self, label: &str) -> Option<LabelMatch> {
        let base = self.base_len();
        if let Some(pos) = self.properties.iter().position(|p| p.label == label) {
            return Some(LabelMatch {
                id: base + pos,
                replacement: None,
            });
        }
        if let Some(alias) = self.aliases.iter().find(|a| a.label == label) {
            return self.lookup(alias.target).map(|m| LabelMatch {
                id: m.id,
                replacement: Some(alias.target),
            });
        }
        self.parent.and_then(|p| p.lookup(label))
    }

    /// Every property in id order.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, &'static PropertyDef)> + '_ {
        (0..self.len()).filter_map(move |id| self.def(id).map(|d| (id, d)))
    }

    /// Whether `type_name` is this table's type or one of its ancestors.
    pub fn extends(&self, type_name: &str) -> bool {
        self.type_name == type_name || self.parent.is_some_and(|p| p.extends(type_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static BASE: PropertyTable = PropertyTable {
        type_name: "Base",
        parent: None,
        properties: &[PropertyDef::real("A", 1.0), PropertyDef::string("B", "b")],
        aliases: &[Alias {
            label: "OldA",
            target: "A",
        }],
    };

    static DERIVED: PropertyTable = PropertyTable {
        type_name: "Derived",
        parent: Some(&BASE),
        properties: &[PropertyDef::integer("C", 3), PropertyDef::real("A", 9.0)],
        aliases: &[Alias {
            label: "OldC",
            target: "C",
        }],
    };

    #[test]
    fn test_ids_are_parent_first() {
        assert_eq!(DERIVED.len(), 4);
        assert_eq!(DERIVED.lookup("B").map(|m| m.id), Some(1));
        assert_eq!(DERIVED.lookup("C").map(|m| m.id), Some(2));
        assert_eq!(DERIVED.def(1).map(|d| d.label), Some("B"));
    }

    #[test]
    fn test_derived_label_shadows_parent() {
        assert_eq!(DERIVED.lookup("A").map(|m| m.id), Some(3));
        assert_eq!(BASE.lookup("A").map(|m| m.id), Some(0));
    }

    #[test]
    fn test_alias_reports_replacement() {
        let m = DERIVED.lookup("OldC").expect("alias resolves");
        assert_eq!(m.id, 2);
        assert_eq!(m.replacement, Some("C"));
        let parent_alias = DERIVED.lookup("OldA").expect("parent alias resolves");
        assert_eq!(parent_alias.id, 0);
    }

    #[test]
    fn test_unknown_label() {
        assert!(DERIVED.lookup("Nope").is_none());
        assert!(DERIVED.extends("Base"));
        assert!(!BASE.extends("Derived"));
    }
}
