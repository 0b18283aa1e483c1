// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rule-based property validation
//!
//! A [`ValidationRule`] names a class token plus the property sets (and the
//! properties inside them) an element of a matching class must carry. The
//! engine walks the element index one element at a time, fetching each
//! element's property sets only when at least one rule applies.
//!
//! # Matching
//!
//! - A rule applies when its class token is a case-insensitive substring of the
//!   element's upper-cased class (`WALL` matches `IFCWALLSTANDARDCASE`).
//! - Set and property names match exactly. When several sets share a name the
//!   first one in engine order is used.
//! - Required properties are only checked inside sets that were found; a set
//!   that is missing altogether is reported once, in `missing_psets`.
//! - A found set without any entries misses all of its required properties.
//!
//! Only failing elements produce a [`ValidationResult`].

use crate::index::ElementIndex;
use ifc_lite_model::{AsyncEngine, ElementKey, EntityId, ModelId, PropertySet};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Declarative requirement for elements of one class
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRule {
    /// Class token, matched as a case-insensitive substring
    #[serde(alias = "ifcClass")]
    pub class: String,
    #[serde(alias = "requiredPsets")]
    pub required_psets: Vec<String>,
    /// Property set name to required property names
    #[serde(alias = "requiredProperties")]
    pub required_properties: IndexMap<String, Vec<String>>,
}

impl ValidationRule {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            ..Default::default()
        }
    }

    /// Require a property set by name
    pub fn require_pset(mut self, name: impl Into<String>) -> Self {
        self.required_psets.push(name.into());
        self
    }

    /// Require properties inside a property set
    pub fn require_properties<I, S>(mut self, pset: impl Into<String>, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_properties
            .entry(pset.into())
            .or_default()
            .extend(properties.into_iter().map(Into::into));
        self
    }

    /// Whether this rule applies to an upper-cased class name
    pub fn applies_to(&self, normalized_class: &str) -> bool {
        normalized_class.contains(&self.class.to_uppercase())
    }

    /// Parse a JSON array of rules
    pub fn list_from_json(json: &str) -> serde_json::Result<Vec<Self>> {
        serde_json::from_str(json)
    }
}

/// Outcome for one element
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub express_id: EntityId,
    pub model_id: ModelId,
    /// Upper-cased class name
    pub class_name: String,
    /// Missing property sets, deduplicated, in rule order
    pub missing_psets: Vec<String>,
    /// Property set name to missing property names, deduplicated
    pub missing_properties: IndexMap<String, Vec<String>>,
    pub passed: bool,
}

impl ValidationResult {
    pub fn key(&self) -> ElementKey {
        ElementKey::new(self.model_id, self.express_id)
    }

    /// Total number of missing property names
    pub fn missing_property_count(&self) -> usize {
        self.missing_properties.values().map(Vec::len).sum()
    }
}

/// Counts over one validation run
#[derive(Clone, Debug, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub elements_checked: usize,
    pub failed: usize,
    pub passed: usize,
    pub missing_psets: usize,
    pub missing_properties: usize,
    /// Failing elements per class
    pub failures_by_class: IndexMap<String, usize>,
}

/// Summarize the failing results of a run over `elements_checked` elements
pub fn summarize(results: &[ValidationResult], elements_checked: usize) -> ValidationReport {
    let mut report = ValidationReport {
        elements_checked,
        ..Default::default()
    };
    for result in results.iter().filter(|r| !r.passed) {
        report.failed += 1;
        report.missing_psets += result.missing_psets.len();
        report.missing_properties += result.missing_property_count();
        *report
            .failures_by_class
            .entry(result.class_name.clone())
            .or_default() += 1;
    }
    report.passed = elements_checked.saturating_sub(report.failed);
    report
}

/// Check one element's property sets against the rules that apply to it
///
/// `class_name` must already be upper-cased.
pub fn check_element(
    key: ElementKey,
    class_name: &str,
    rules: &[&ValidationRule],
    sets: &[PropertySet],
) -> ValidationResult {
    let mut missing_psets: Vec<String> = Vec::new();
    let mut missing_properties: IndexMap<String, Vec<String>> = IndexMap::new();

    log_duplicate_sets(key, sets);
    let find = |name: &str| sets.iter().find(|s| s.name == name);

    for rule in rules {
        for pset in &rule.required_psets {
            if find(pset).is_none() && !missing_psets.contains(pset) {
                missing_psets.push(pset.clone());
            }
        }

        for (pset, required) in &rule.required_properties {
            // Properties of an absent set are covered by the set-level miss
            let Some(set) = find(pset) else { continue };
            let missing: Vec<&String> = if set.is_empty() {
                required.iter().collect()
            } else {
                required.iter().filter(|p| !set.contains(p)).collect()
            };
            if missing.is_empty() {
                continue;
            }
            let entry = missing_properties.entry(pset.clone()).or_default();
            for property in missing {
                if !entry.contains(property) {
                    entry.push(property.clone());
                }
            }
        }
    }

    let passed = missing_psets.is_empty() && missing_properties.values().all(Vec::is_empty);
    ValidationResult {
        express_id: key.express_id,
        model_id: key.model_id,
        class_name: class_name.to_string(),
        missing_psets,
        missing_properties,
        passed,
    }
}

fn log_duplicate_sets(key: ElementKey, sets: &[PropertySet]) {
    let mut seen = FxHashSet::default();
    for set in sets {
        if !seen.insert(set.name.as_str()) {
            log::debug!(
                "[Validation] {} carries '{}' more than once, first one is checked",
                key,
                set.name
            );
        }
    }
}

/// Reports integer completion percentages every `step` elements and at the end
#[derive(Debug)]
pub struct ProgressTicker {
    total: usize,
    step: usize,
    processed: usize,
}

impl ProgressTicker {
    pub fn new(total: usize, step: usize) -> Self {
        Self {
            total,
            step: step.max(1),
            processed: 0,
        }
    }

    /// Record one processed element; returns a percentage when one is due
    pub fn advance(&mut self) -> Option<u8> {
        self.processed += 1;
        let done = self.processed >= self.total;
        if self.processed % self.step != 0 && !done {
            return None;
        }
        if done {
            return Some(100);
        }
        // Floor, so only the final element can report 100
        Some((self.processed * 100 / self.total) as u8)
    }
}

/// Validate every indexed element against `rules`
///
/// Elements are processed strictly one after another. Elements whose class or
/// property sets cannot be fetched are logged and skipped. `on_progress`
/// receives non-decreasing percentages ending with 100.
pub async fn validate<F>(
    engine: &dyn AsyncEngine,
    index: &ElementIndex,
    rules: &[ValidationRule],
    progress_step: usize,
    mut on_progress: F,
) -> Vec<ValidationResult>
where
    F: FnMut(u8),
{
    let total = index.len();
    let mut results = Vec::new();
    let mut ticker = ProgressTicker::new(total, progress_step);

    if total == 0 {
        on_progress(100);
        return results;
    }

    for key in index.keys() {
        if let Some(result) = validate_element(engine, key, rules).await {
            if !result.passed {
                results.push(result);
            }
        }
        if let Some(pct) = ticker.advance() {
            on_progress(pct);
        }
    }

    log::info!(
        "[Validation] {} of {} elements failed {} rules",
        results.len(),
        total,
        rules.len()
    );
    results
}

async fn validate_element(
    engine: &dyn AsyncEngine,
    key: ElementKey,
    rules: &[ValidationRule],
) -> Option<ValidationResult> {
    let record = match engine.item_properties(key.model_id, key.express_id).await {
        Ok(record) => record,
        Err(e) => {
            log::warn!("[Validation] Skipping {}: {}", key, e);
            return None;
        }
    };
    let class_name = record.class_name.to_uppercase();

    let applicable: Vec<&ValidationRule> =
        rules.iter().filter(|r| r.applies_to(&class_name)).collect();
    if applicable.is_empty() {
        return None;
    }

    let sets = match engine.property_sets(key.model_id, key.express_id, true).await {
        Ok(sets) => sets,
        Err(e) => {
            log::warn!("[Validation] Skipping {}: property sets unavailable: {}", key, e);
            return None;
        }
    };

    Some(check_element(key, &class_name, &applicable, &sets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifc_lite_model::QuantityType;

    fn key() -> ElementKey {
        ElementKey::new(ModelId(0), EntityId(1))
    }

    #[test]
    fn test_rule_matches_class_substring() {
        let rule = ValidationRule::new("wall");
        assert!(rule.applies_to("IFCWALL"));
        assert!(rule.applies_to("IFCWALLSTANDARDCASE"));
        assert!(!rule.applies_to("IFCSLAB"));
    }

    #[test]
    fn test_missing_pset() {
        let rule = ValidationRule::new("IFCWALL").require_pset("Pset_WallCommon");
        let result = check_element(key(), "IFCWALL", &[&rule], &[]);
        assert!(!result.passed);
        assert_eq!(result.missing_psets, vec!["Pset_WallCommon"]);
        assert!(result.missing_properties.is_empty());
    }

    #[test]
    fn test_empty_set_misses_every_property() {
        let rule = ValidationRule::new("IFCWALL")
            .require_properties("Pset_WallCommon", ["LoadBearing", "IsExternal"]);
        let sets = [PropertySet::new(EntityId(10), "Pset_WallCommon")];
        let result = check_element(key(), "IFCWALL", &[&rule], &sets);
        assert!(result.missing_psets.is_empty());
        assert_eq!(
            result.missing_properties["Pset_WallCommon"],
            vec!["LoadBearing", "IsExternal"]
        );
    }

    #[test]
    fn test_absent_set_does_not_report_its_properties() {
        let rule = ValidationRule::new("IFCWALL")
            .require_pset("Pset_WallCommon")
            .require_properties("Pset_WallCommon", ["LoadBearing"]);
        let result = check_element(key(), "IFCWALL", &[&rule], &[]);
        assert_eq!(result.missing_psets, vec!["Pset_WallCommon"]);
        assert!(result.missing_properties.is_empty());

        // Without a set-level requirement the element passes
        let rule = ValidationRule::new("IFCWALL").require_properties("Pset_WallCommon", ["LoadBearing"]);
        assert!(check_element(key(), "IFCWALL", &[&rule], &[]).passed);
    }

    #[test]
    fn test_partial_properties_and_quantities() {
        let rule = ValidationRule::new("IFCWALL")
            .require_properties("Pset_WallCommon", ["IsExternal", "FireRating"])
            .require_properties("Qto_WallBaseQuantities", ["Length"]);
        let sets = [
            PropertySet::new(EntityId(10), "Pset_WallCommon").with_property("IsExternal", true),
            PropertySet::quantity_set(EntityId(11), "Qto_WallBaseQuantities")
                .with_quantity("Length", 4.0, QuantityType::Length),
        ];
        let result = check_element(key(), "IFCWALL", &[&rule], &sets);
        assert_eq!(result.missing_properties.len(), 1);
        assert_eq!(result.missing_properties["Pset_WallCommon"], vec!["FireRating"]);
    }

    #[test]
    fn test_rules_are_deduplicated() {
        let a = ValidationRule::new("WALL")
            .require_pset("Pset_WallCommon")
            .require_properties("Pset_Custom", ["A"]);
        let b = ValidationRule::new("IFCWALL")
            .require_pset("Pset_WallCommon")
            .require_properties("Pset_Custom", ["A", "B"]);
        let sets = [PropertySet::new(EntityId(12), "Pset_Custom")];
        let result = check_element(key(), "IFCWALL", &[&a, &b], &sets);
        assert_eq!(result.missing_psets, vec!["Pset_WallCommon"]);
        assert_eq!(result.missing_properties["Pset_Custom"], vec!["A", "B"]);
    }

    #[test]
    fn test_duplicate_set_names_use_first() {
        let rule = ValidationRule::new("IFCWALL").require_properties("Pset_WallCommon", ["IsExternal"]);
        let sets = [
            PropertySet::new(EntityId(10), "Pset_WallCommon").with_property("LoadBearing", true),
            PropertySet::new(EntityId(11), "Pset_WallCommon").with_property("IsExternal", true),
        ];
        let result = check_element(key(), "IFCWALL", &[&rule], &sets);
        assert_eq!(result.missing_properties["Pset_WallCommon"], vec!["IsExternal"]);
    }

    #[test]
    fn test_rules_from_json() {
        let rules = ValidationRule::list_from_json(
            r#"[{"class": "IFCWALL", "requiredPsets": ["Pset_WallCommon"],
                 "requiredProperties": {"Pset_WallCommon": ["IsExternal"]}},
                {"class": "IFCSLAB"}]"#,
        )
        .unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].required_psets, vec!["Pset_WallCommon"]);
        assert_eq!(rules[0].required_properties["Pset_WallCommon"], vec!["IsExternal"]);
        assert!(rules[1].required_psets.is_empty());
    }

    #[test]
    fn test_progress_ticks() {
        let mut ticker = ProgressTicker::new(25, 10);
        let ticks: Vec<u8> = (0..25).filter_map(|_| ticker.advance()).collect();
        assert_eq!(ticks, vec![40, 80, 100]);

        let mut ticker = ProgressTicker::new(20, 10);
        let ticks: Vec<u8> = (0..20).filter_map(|_| ticker.advance()).collect();
        assert_eq!(ticks, vec![50, 100]);

        let mut ticker = ProgressTicker::new(3, 10);
        let ticks: Vec<u8> = (0..3).filter_map(|_| ticker.advance()).collect();
        assert_eq!(ticks, vec![100]);

        let mut ticker = ProgressTicker::new(2001, 10);
        let ticks: Vec<u8> = (0..2001).filter_map(|_| ticker.advance()).collect();
        assert_eq!(ticks.iter().filter(|&&pct| pct == 100).count(), 1);
        assert_eq!(&ticks[ticks.len() - 3..], &[99, 99, 100]);
        assert!(ticks.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_summarize() {
        let rule = ValidationRule::new("IFCWALL")
            .require_pset("Pset_WallCommon")
            .require_properties("Pset_Custom", ["A", "B"]);
        let sets = [PropertySet::new(EntityId(12), "Pset_Custom")];
        let failing = check_element(key(), "IFCWALL", &[&rule], &sets);

        let report = summarize(&[failing], 10);
        assert_eq!(report.failed, 1);
        assert_eq!(report.passed, 9);
        assert_eq!(report.missing_psets, 1);
        assert_eq!(report.missing_properties, 2);
        assert_eq!(report.failures_by_class["IFCWALL"], 1);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let rule = ValidationRule::new("IFCWALL").require_pset("Pset_WallCommon");
        let result = check_element(key(), "IFCWALL", &[&rule], &[]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["expressId"], 1);
        assert_eq!(json["missingPsets"][0], "Pset_WallCommon");
    }
}
