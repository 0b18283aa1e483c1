// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property extraction
//!
//! Resolves everything the engine knows about one element into a
//! [`PropertyBundle`]:
//!
//! 1. base item record
//! 2. property and quantity sets
//! 3. materials, from the association list
//! 4. type-level record and sets, from the type reference
//! 5. property sets reached through associations, when step 2 found none
//!
//! Each step after the first fails on its own: the failure is logged and the
//! step contributes nothing. Only a failed base fetch yields no bundle.

use ifc_lite_model::{
    AsyncEngine, ElementKey, EntityId, PropertyRecord, PropertySet, ASSOCIATIONS_FIELD, TYPE_FIELD,
};
use serde::Serialize;

/// Record and property sets of an element's type definition
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TypeProperties {
    pub record: PropertyRecord,
    pub property_sets: Vec<PropertySet>,
}

/// Everything known about one element
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PropertyBundle {
    pub key: ElementKey,
    /// Base item record (name to scalar or reference)
    pub base: PropertyRecord,
    /// Property and quantity sets in engine order; names may repeat
    pub property_sets: Vec<PropertySet>,
    pub materials: Vec<PropertyRecord>,
    pub type_properties: Option<TypeProperties>,
}

impl PropertyBundle {
    /// Schema class name of the element
    pub fn class_name(&self) -> &str {
        &self.base.class_name
    }

    pub fn name(&self) -> Option<&str> {
        self.base.name()
    }

    /// First property set with this exact name
    pub fn property_set(&self, name: &str) -> Option<&PropertySet> {
        self.property_sets.iter().find(|s| s.name == name)
    }

    /// Names of the resolved materials
    pub fn material_names(&self) -> Vec<&str> {
        self.materials.iter().filter_map(|m| m.name()).collect()
    }
}

/// Resolve the full property bundle of an element
///
/// Returns `None` only when the base record cannot be fetched.
pub async fn extract(engine: &dyn AsyncEngine, key: ElementKey) -> Option<PropertyBundle> {
    let ElementKey {
        model_id,
        express_id,
    } = key;

    let base = match engine.item_properties(model_id, express_id).await {
        Ok(record) => record,
        Err(e) => {
            log::warn!("[Properties] Failed to fetch item properties for {}: {}", key, e);
            return None;
        }
    };

    let mut property_sets = match engine.property_sets(model_id, express_id, true).await {
        Ok(sets) => sets,
        Err(e) => {
            log::warn!("[Properties] Failed to fetch property sets for {}: {}", key, e);
            Vec::new()
        }
    };

    let association_ids = base.references(ASSOCIATIONS_FIELD);
    let associations = resolve_records(engine, key, &association_ids).await;

    let materials: Vec<PropertyRecord> = associations
        .iter()
        .filter(|record| record.ifc_type().is_material() || record.name().is_some())
        .cloned()
        .collect();

    let type_properties = match base.references(TYPE_FIELD).first() {
        Some(type_id) => resolve_type(engine, key, *type_id).await,
        None => None,
    };

    if property_sets.is_empty() && !associations.is_empty() {
        for record in associations.iter().filter(|r| r.ifc_type().is_property_definition()) {
            let entry_ids = record.references(PropertySet::entries_field(record));
            let entries = resolve_records(engine, key, &entry_ids).await;
            if let Some(set) = PropertySet::from_record(record, &entries) {
                log::debug!(
                    "[Properties] {} resolved '{}' through its associations",
                    key,
                    set.name
                );
                property_sets.push(set);
            }
        }
    }

    Some(PropertyBundle {
        key,
        base,
        property_sets,
        materials,
        type_properties,
    })
}

/// Fetch records one at a time, skipping (and logging) the ones that fail
async fn resolve_records(
    engine: &dyn AsyncEngine,
    owner: ElementKey,
    ids: &[EntityId],
) -> Vec<PropertyRecord> {
    let mut records = Vec::with_capacity(ids.len());
    for id in ids {
        match engine.item_properties(owner.model_id, *id).await {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("[Properties] Failed to resolve {} for {}: {}", id, owner, e),
        }
    }
    records
}

async fn resolve_type(
    engine: &dyn AsyncEngine,
    owner: ElementKey,
    type_id: EntityId,
) -> Option<TypeProperties> {
    let record = match engine.item_properties(owner.model_id, type_id).await {
        Ok(record) => record,
        Err(e) => {
            log::warn!("[Properties] Failed to resolve type {} of {}: {}", type_id, owner, e);
            return None;
        }
    };
    let property_sets = engine
        .property_sets(owner.model_id, type_id, true)
        .await
        .unwrap_or_else(|e| {
            log::warn!("[Properties] Failed to fetch type property sets of {}: {}", owner, e);
            Vec::new()
        });
    Some(TypeProperties {
        record,
        property_sets,
    })
}
