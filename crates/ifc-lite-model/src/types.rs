// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types for IFC data representation
//!
//! This module defines the identifiers and the class table used throughout the viewer core.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type-safe entity identifier (the per-model ExpressID)
///
/// Wraps the raw IFC entity ID (e.g., #123 becomes EntityId(123))
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        EntityId(id)
    }
}

impl From<EntityId> for u32 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Identifier the engine assigns to an opened model
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ModelId(pub u32);

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model:{}", self.0)
    }
}

/// Unique key of an element across models: `(modelID, expressID)`
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct ElementKey {
    pub model_id: ModelId,
    pub express_id: EntityId,
}

impl ElementKey {
    pub fn new(model_id: ModelId, express_id: EntityId) -> Self {
        Self {
            model_id,
            express_id,
        }
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.model_id, self.express_id)
    }
}

/// Declares the `IfcType` enum together with its upper-case schema spelling.
///
/// The variant identifier doubles as the camel-case spelling used for display.
macro_rules! ifc_types {
    ($($variant:ident => $upper:literal),* $(,)?) => {
        /// IFC entity type enumeration
        ///
        /// Covers the classes the viewer core reasons about. Unknown types are
        /// captured with their original string representation.
        #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum IfcType {
            $($variant,)*
            /// Unknown type - stores the original type name string
            Unknown(String),
        }

        impl IfcType {
            /// Parse a type name string into an IfcType (case-insensitive)
            pub fn parse(s: &str) -> Self {
                match s.to_uppercase().as_str() {
                    $($upper => IfcType::$variant,)*
                    _ => IfcType::Unknown(s.to_string()),
                }
            }

            /// Upper-case schema name (e.g. "IFCWALLSTANDARDCASE")
            pub fn name(&self) -> &str {
                match self {
                    $(IfcType::$variant => $upper,)*
                    IfcType::Unknown(s) => s,
                }
            }

            /// Camel-case schema name (e.g. "IfcWallStandardCase"), if known
            pub fn camel_name(&self) -> Option<&'static str> {
                match self {
                    $(IfcType::$variant => Some(stringify!($variant)),)*
                    IfcType::Unknown(_) => None,
                }
            }
        }
    };
}

ifc_types! {
    // Spatial structure
    IfcProject => "IFCPROJECT",
    IfcSite => "IFCSITE",
    IfcBuilding => "IFCBUILDING",
    IfcBuildingStorey => "IFCBUILDINGSTOREY",
    IfcSpace => "IFCSPACE",

    // Building elements
    IfcWall => "IFCWALL",
    IfcWallStandardCase => "IFCWALLSTANDARDCASE",
    IfcWallElementedCase => "IFCWALLELEMENTEDCASE",
    IfcCurtainWall => "IFCCURTAINWALL",
    IfcSlab => "IFCSLAB",
    IfcSlabStandardCase => "IFCSLABSTANDARDCASE",
    IfcRoof => "IFCROOF",
    IfcBeam => "IFCBEAM",
    IfcBeamStandardCase => "IFCBEAMSTANDARDCASE",
    IfcColumn => "IFCCOLUMN",
    IfcColumnStandardCase => "IFCCOLUMNSTANDARDCASE",
    IfcDoor => "IFCDOOR",
    IfcDoorStandardCase => "IFCDOORSTANDARDCASE",
    IfcWindow => "IFCWINDOW",
    IfcWindowStandardCase => "IFCWINDOWSTANDARDCASE",
    IfcStair => "IFCSTAIR",
    IfcStairFlight => "IFCSTAIRFLIGHT",
    IfcRamp => "IFCRAMP",
    IfcRampFlight => "IFCRAMPFLIGHT",
    IfcRailing => "IFCRAILING",
    IfcCovering => "IFCCOVERING",
    IfcPlate => "IFCPLATE",
    IfcMember => "IFCMEMBER",
    IfcFooting => "IFCFOOTING",
    IfcPile => "IFCPILE",
    IfcBuildingElementProxy => "IFCBUILDINGELEMENTPROXY",

    // Distribution elements (MEP)
    IfcDistributionElement => "IFCDISTRIBUTIONELEMENT",
    IfcFlowTerminal => "IFCFLOWTERMINAL",
    IfcFlowSegment => "IFCFLOWSEGMENT",
    IfcFlowFitting => "IFCFLOWFITTING",
    IfcPipeSegment => "IFCPIPESEGMENT",
    IfcDuctSegment => "IFCDUCTSEGMENT",

    // Furnishing and openings
    IfcFurnishingElement => "IFCFURNISHINGELEMENT",
    IfcFurniture => "IFCFURNITURE",
    IfcOpeningElement => "IFCOPENINGELEMENT",

    // Relationships
    IfcRelDefinesByProperties => "IFCRELDEFINESBYPROPERTIES",
    IfcRelDefinesByType => "IFCRELDEFINESBYTYPE",
    IfcRelAssociatesMaterial => "IFCRELASSOCIATESMATERIAL",
    IfcRelAssociatesClassification => "IFCRELASSOCIATESCLASSIFICATION",

    // Properties
    IfcPropertySet => "IFCPROPERTYSET",
    IfcPropertySingleValue => "IFCPROPERTYSINGLEVALUE",
    IfcPropertyEnumeratedValue => "IFCPROPERTYENUMERATEDVALUE",
    IfcElementQuantity => "IFCELEMENTQUANTITY",
    IfcQuantityLength => "IFCQUANTITYLENGTH",
    IfcQuantityArea => "IFCQUANTITYAREA",
    IfcQuantityVolume => "IFCQUANTITYVOLUME",
    IfcQuantityCount => "IFCQUANTITYCOUNT",
    IfcQuantityWeight => "IFCQUANTITYWEIGHT",

    // Materials
    IfcMaterial => "IFCMATERIAL",
    IfcMaterialLayer => "IFCMATERIALLAYER",
    IfcMaterialLayerSet => "IFCMATERIALLAYERSET",
    IfcMaterialLayerSetUsage => "IFCMATERIALLAYERSETUSAGE",
    IfcMaterialList => "IFCMATERIALLIST",
    IfcMaterialConstituentSet => "IFCMATERIALCONSTITUENTSET",
    IfcMaterialProfileSet => "IFCMATERIALPROFILESET",

    // Type definitions
    IfcWallType => "IFCWALLTYPE",
    IfcSlabType => "IFCSLABTYPE",
    IfcBeamType => "IFCBEAMTYPE",
    IfcColumnType => "IFCCOLUMNTYPE",
    IfcDoorType => "IFCDOORTYPE",
    IfcWindowType => "IFCWINDOWTYPE",
    IfcCoveringType => "IFCCOVERINGTYPE",
    IfcRailingType => "IFCRAILINGTYPE",
    IfcStairType => "IFCSTAIRTYPE",
    IfcRoofType => "IFCROOFTYPE",
    IfcMemberType => "IFCMEMBERTYPE",
    IfcPlateType => "IFCPLATETYPE",
    IfcBuildingElementProxyType => "IFCBUILDINGELEMENTPROXYTYPE",
}

impl FromStr for IfcType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl IfcType {
    /// Check if this type is a property definition (property set or quantity set)
    pub fn is_property_definition(&self) -> bool {
        matches!(self, IfcType::IfcPropertySet | IfcType::IfcElementQuantity)
    }

    /// Check if this type is a material definition
    pub fn is_material(&self) -> bool {
        match self {
            IfcType::Unknown(s) => s.to_uppercase().starts_with("IFCMATERIAL"),
            other => other.name().starts_with("IFCMATERIAL"),
        }
    }
}

impl Default for IfcType {
    fn default() -> Self {
        IfcType::Unknown(String::new())
    }
}

impl fmt::Display for IfcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
