// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property records, property sets and quantities

use crate::{EntityId, IfcType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Field name carrying an entity's display name
pub const NAME_FIELD: &str = "Name";
/// Field listing association relationships (materials, classifications, ...)
pub const ASSOCIATIONS_FIELD: &str = "HasAssociations";
/// Field referencing the element's type definition
pub const TYPE_FIELD: &str = "IsTypedBy";
/// Field listing the single properties of a property set
pub const HAS_PROPERTIES_FIELD: &str = "HasProperties";
/// Field listing the quantities of a quantity set
pub const QUANTITIES_FIELD: &str = "Quantities";
/// Field carrying the value of a single-value property
pub const NOMINAL_VALUE_FIELD: &str = "NominalValue";

/// A value in an open-schema property record
///
/// Keeps the distinction between an inline scalar and a reference to another
/// record of the same model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    String(String),
    Number(f64),
    Bool(bool),
    /// Reference to another record (#123)
    Reference(EntityId),
    /// Aggregate of values, typically a list of references
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Try to get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as reference
    pub fn as_reference(&self) -> Option<EntityId> {
        match self {
            PropertyValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// All references held by this value: itself if a reference, or the
    /// references inside a list (non-reference items are skipped)
    pub fn references(&self) -> Vec<EntityId> {
        match self {
            PropertyValue::Reference(id) => vec![*id],
            PropertyValue::List(items) => items.iter().filter_map(|v| v.as_reference()).collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "{}", s),
            PropertyValue::Number(n) => {
                let s = format!("{:.6}", n);
                write!(f, "{}", s.trim_end_matches('0').trim_end_matches('.'))
            }
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Reference(id) => write!(f, "{}", id),
            PropertyValue::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(", "))
            }
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Number(n)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<EntityId> for PropertyValue {
    fn from(id: EntityId) -> Self {
        PropertyValue::Reference(id)
    }
}

impl From<Vec<EntityId>> for PropertyValue {
    fn from(ids: Vec<EntityId>) -> Self {
        PropertyValue::List(ids.into_iter().map(PropertyValue::Reference).collect())
    }
}

/// Open-schema record returned by the engine for any entity
///
/// Field order is preserved as delivered by the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    /// ExpressID of the record
    pub express_id: EntityId,
    /// Schema class name as reported by the engine (e.g. "IFCWALL")
    pub class_name: String,
    /// Field name to value
    #[serde(default)]
    pub fields: IndexMap<String, PropertyValue>,
}

impl PropertyRecord {
    /// Create a record without fields
    pub fn new(express_id: EntityId, class_name: impl Into<String>) -> Self {
        Self {
            express_id,
            class_name: class_name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Builder-style field insertion
    pub fn with(mut self, field: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Get a field value
    pub fn get(&self, field: &str) -> Option<&PropertyValue> {
        self.fields.get(field)
    }

    /// Parsed class of this record
    pub fn ifc_type(&self) -> IfcType {
        IfcType::parse(&self.class_name)
    }

    /// The `Name` field, if it is a string
    pub fn name(&self) -> Option<&str> {
        self.get(NAME_FIELD).and_then(|v| v.as_str())
    }

    /// References held by a field (empty if absent)
    pub fn references(&self, field: &str) -> Vec<EntityId> {
        self.get(field).map(|v| v.references()).unwrap_or_default()
    }
}

/// A single named property value with optional unit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Property name
    pub name: String,
    /// Property value
    pub value: PropertyValue,
    /// Unit of measurement (if applicable)
    #[serde(default)]
    pub unit: Option<String>,
}

impl Property {
    /// Create a new property
    pub fn new(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            unit: None,
        }
    }
}

/// Quantity types supported in IFC
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantityType {
    /// Linear measurement (IfcQuantityLength)
    Length,
    /// Area measurement (IfcQuantityArea)
    Area,
    /// Volume measurement (IfcQuantityVolume)
    Volume,
    /// Count (IfcQuantityCount)
    Count,
    /// Weight/mass measurement (IfcQuantityWeight)
    Weight,
}

impl QuantityType {
    /// Get default unit for this quantity type
    pub fn default_unit(&self) -> &'static str {
        match self {
            QuantityType::Length => "m",
            QuantityType::Area => "m²",
            QuantityType::Volume => "m³",
            QuantityType::Count => "",
            QuantityType::Weight => "kg",
        }
    }

    /// Quantity type and value field for a quantity record class
    fn from_ifc_type(ifc_type: &IfcType) -> Option<(Self, &'static str)> {
        match ifc_type {
            IfcType::IfcQuantityLength => Some((QuantityType::Length, "LengthValue")),
            IfcType::IfcQuantityArea => Some((QuantityType::Area, "AreaValue")),
            IfcType::IfcQuantityVolume => Some((QuantityType::Volume, "VolumeValue")),
            IfcType::IfcQuantityCount => Some((QuantityType::Count, "CountValue")),
            IfcType::IfcQuantityWeight => Some((QuantityType::Weight, "WeightValue")),
            _ => None,
        }
    }
}

/// A quantity value with type and unit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    /// Quantity name
    pub name: String,
    /// Numeric value
    pub value: f64,
    /// Unit of measurement
    pub unit: String,
    /// Type of quantity
    pub quantity_type: QuantityType,
}

impl Quantity {
    /// Create a new quantity
    pub fn new(name: impl Into<String>, value: f64, quantity_type: QuantityType) -> Self {
        Self {
            name: name.into(),
            value,
            unit: quantity_type.default_unit().to_string(),
            quantity_type,
        }
    }

    /// Format the value with unit
    pub fn formatted(&self) -> String {
        if self.unit.is_empty() {
            format!("{}", self.value)
        } else {
            format!("{} {}", self.value, self.unit)
        }
    }
}

/// Whether a set carries properties or quantities
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PropertySetKind {
    #[default]
    PropertySet,
    QuantitySet,
}

/// A named property set (Pset) or quantity set (Qto)
///
/// Names are not guaranteed unique among the sets of one element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertySet {
    /// ExpressID of the set record
    pub express_id: EntityId,
    /// Set name (e.g., "Pset_WallCommon")
    pub name: String,
    #[serde(default)]
    pub kind: PropertySetKind,
    /// Properties in this set
    #[serde(default)]
    pub properties: Vec<Property>,
    /// Quantities in this set
    #[serde(default)]
    pub quantities: Vec<Quantity>,
}

impl PropertySet {
    /// Create a new, empty property set
    pub fn new(express_id: EntityId, name: impl Into<String>) -> Self {
        Self {
            express_id,
            name: name.into(),
            kind: PropertySetKind::PropertySet,
            properties: Vec::new(),
            quantities: Vec::new(),
        }
    }

    /// Create a new, empty quantity set
    pub fn quantity_set(express_id: EntityId, name: impl Into<String>) -> Self {
        Self {
            kind: PropertySetKind::QuantitySet,
            ..Self::new(express_id, name)
        }
    }

    /// Builder-style property insertion
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.push(Property::new(name, value));
        self
    }

    /// Builder-style quantity insertion
    pub fn with_quantity(mut self, name: impl Into<String>, value: f64, kind: QuantityType) -> Self {
        self.quantities.push(Quantity::new(name, value, kind));
        self
    }

    /// Get a property by name (first match)
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Whether a property or quantity with this exact name exists
    pub fn contains(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p.name == name)
            || self.quantities.iter().any(|q| q.name == name)
    }

    /// True when the set carries neither properties nor quantities
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.quantities.is_empty()
    }

    /// Build a set from its raw record and the already-resolved entry records
    ///
    /// Returns `None` if the record is not a property or quantity set. Entries
    /// that are not recognised single values or quantities are skipped.
    pub fn from_record(record: &PropertyRecord, entries: &[PropertyRecord]) -> Option<Self> {
        let kind = match record.ifc_type() {
            IfcType::IfcPropertySet => PropertySetKind::PropertySet,
            IfcType::IfcElementQuantity => PropertySetKind::QuantitySet,
            _ => return None,
        };

        let mut set = PropertySet {
            express_id: record.express_id,
            name: record.name().unwrap_or("Unknown").to_string(),
            kind,
            properties: Vec::new(),
            quantities: Vec::new(),
        };

        for entry in entries {
            let Some(name) = entry.name() else { continue };
            let ifc_type = entry.ifc_type();
            if let Some((quantity_type, value_field)) = QuantityType::from_ifc_type(&ifc_type) {
                if let Some(value) = entry.get(value_field).and_then(|v| v.as_f64()) {
                    set.quantities.push(Quantity::new(name, value, quantity_type));
                }
                continue;
            }
            let value = match ifc_type {
                IfcType::IfcPropertySingleValue => entry.get(NOMINAL_VALUE_FIELD).cloned(),
                IfcType::IfcPropertyEnumeratedValue => entry.get("EnumerationValues").cloned(),
                _ => None,
            };
            if let Some(value) = value {
                set.properties.push(Property::new(name, value));
            }
        }

        Some(set)
    }

    /// Field of a set record listing its entries
    pub fn entries_field(record: &PropertyRecord) -> &'static str {
        match record.ifc_type() {
            IfcType::IfcElementQuantity => QUANTITIES_FIELD,
            _ => HAS_PROPERTIES_FIELD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_references() {
        let single = PropertyValue::Reference(EntityId(5));
        assert_eq!(single.references(), vec![EntityId(5)]);

        let list = PropertyValue::List(vec![
            PropertyValue::Reference(EntityId(1)),
            PropertyValue::String("x".into()),
            PropertyValue::Reference(EntityId(2)),
        ]);
        assert_eq!(list.references(), vec![EntityId(1), EntityId(2)]);
        assert!(PropertyValue::Number(1.0).references().is_empty());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(PropertyValue::Number(2.5).to_string(), "2.5");
        assert_eq!(PropertyValue::Number(3.0).to_string(), "3");
        assert_eq!(PropertyValue::Reference(EntityId(9)).to_string(), "#9");
    }

    #[test]
    fn test_record_accessors() {
        let record = PropertyRecord::new(EntityId(10), "IFCWALL")
            .with("Name", "Wall 1")
            .with("HasAssociations", vec![EntityId(20), EntityId(21)]);
        assert_eq!(record.name(), Some("Wall 1"));
        assert_eq!(record.ifc_type(), IfcType::IfcWall);
        assert_eq!(record.references("HasAssociations").len(), 2);
        assert!(record.references("IsTypedBy").is_empty());
    }

    #[test]
    fn test_set_from_record() {
        let pset = PropertyRecord::new(EntityId(30), "IFCPROPERTYSET")
            .with("Name", "Pset_WallCommon")
            .with("HasProperties", vec![EntityId(31), EntityId(32)]);
        let entries = vec![
            PropertyRecord::new(EntityId(31), "IFCPROPERTYSINGLEVALUE")
                .with("Name", "IsExternal")
                .with("NominalValue", true),
            PropertyRecord::new(EntityId(32), "IFCPROPERTYSINGLEVALUE").with("Name", "NoValue"),
        ];

        let set = PropertySet::from_record(&pset, &entries).unwrap();
        assert_eq!(set.name, "Pset_WallCommon");
        assert_eq!(set.kind, PropertySetKind::PropertySet);
        assert_eq!(set.properties.len(), 1);
        assert!(set.contains("IsExternal"));
        assert!(!set.contains("NoValue"));
        assert_eq!(PropertySet::entries_field(&pset), HAS_PROPERTIES_FIELD);
    }

    #[test]
    fn test_quantity_set_from_record() {
        let qto = PropertyRecord::new(EntityId(40), "IFCELEMENTQUANTITY").with("Name", "Qto_WallBaseQuantities");
        let entries = vec![PropertyRecord::new(EntityId(41), "IFCQUANTITYLENGTH")
            .with("Name", "Length")
            .with("LengthValue", 4.2)];

        let set = PropertySet::from_record(&qto, &entries).unwrap();
        assert_eq!(set.kind, PropertySetKind::QuantitySet);
        assert_eq!(set.quantities[0].formatted(), "4.2 m");
        assert!(set.contains("Length"));
        assert_eq!(PropertySet::entries_field(&qto), QUANTITIES_FIELD);
    }

    #[test]
    fn test_non_set_record_is_rejected() {
        let material = PropertyRecord::new(EntityId(50), "IFCMATERIAL").with("Name", "Concrete");
        assert!(PropertySet::from_record(&material, &[]).is_none());
    }
}
