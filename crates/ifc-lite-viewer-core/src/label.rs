// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Human-readable class labels

use crate::extract::PropertyBundle;
use ifc_lite_model::IfcType;

/// Display label of a bundle's class, e.g. "Wall Standard Case"
pub fn element_class_label(bundle: &PropertyBundle) -> String {
    class_label(bundle.class_name())
}

/// Strip the schema prefix and split the class name into words
///
/// Upper-case schema names are mapped back to their camel-case spelling when
/// the class is known; unknown upper-case names keep a single capitalised word.
pub fn class_label(class_name: &str) -> String {
    let camel = match IfcType::parse(class_name).camel_name() {
        Some(name) => name.to_string(),
        None if is_upper_case(class_name) => capitalize(class_name),
        None => class_name.to_string(),
    };
    let stripped = camel
        .strip_prefix("Ifc")
        .or_else(|| camel.strip_prefix("IFC"))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(&camel);
    split_camel_case(stripped)
}

fn is_upper_case(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_alphabetic()) && !s.chars().any(|c| c.is_ascii_lowercase())
}

/// "IFCFOO" -> "IfcFoo"; only the prefix boundary is known
fn capitalize(s: &str) -> String {
    let lower = s.to_ascii_lowercase();
    let body = lower.strip_prefix("ifc").unwrap_or(&lower);
    let mut chars = body.chars();
    match chars.next() {
        Some(first) => format!("Ifc{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => s.to_string(),
    }
}

fn split_camel_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                out.push(' ');
            }
        }
        out.push(*c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_names() {
        assert_eq!(class_label("IfcWallStandardCase"), "Wall Standard Case");
        assert_eq!(class_label("IfcBuildingElementProxy"), "Building Element Proxy");
        assert_eq!(class_label("IfcSlab"), "Slab");
    }

    #[test]
    fn test_upper_case_names() {
        assert_eq!(class_label("IFCWALLSTANDARDCASE"), "Wall Standard Case");
        assert_eq!(class_label("IFCFLOWTERMINAL"), "Flow Terminal");
        assert_eq!(class_label("IFCSOMETHINGNEW"), "Somethingnew");
    }

    #[test]
    fn test_unprefixed_and_acronyms() {
        assert_eq!(class_label("IfcDistributionElement"), "Distribution Element");
        assert_eq!(class_label("HVACUnit"), "HVAC Unit");
        assert_eq!(class_label("Ifc"), "Ifc");
    }
}
