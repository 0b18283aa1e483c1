// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Lite Viewer Core - model lifecycle, selection and validation
//!
//! This crate sits between an IFC decoding engine (reached through
//! [`ifc_lite_model::AsyncEngine`]) and a presentation layer. It keeps exactly
//! one model live, re-centres georeferenced geometry so it renders without
//! jitter, keeps the selection highlight aligned with that shift and runs
//! rule-based property validation over every element.
//!
//! # Architecture
//!
//! - [`normalize`] - moves the model's bounding-box centre to the origin by rewriting vertices
//! - [`index`] - `(modelID, expressID)` lookup built once per load
//! - [`highlight`] - single live highlight, reconciled with the centering offset
//! - [`extract`] - fault-tolerant property bundle resolution
//! - [`validation`] - sequential rule evaluation with progress reporting
//! - [`lifecycle`] - [`ModelManager`], owner of the live model
//! - [`pool`] - [`WorkerPool`], bounded workers in front of a blocking engine
//!
//! # Example
//!
//! ```ignore
//! use ifc_lite_model::{ElementKey, EntityId, MemoryEngine, ModelSource};
//! use ifc_lite_viewer_core::{ModelManager, ValidationRule, ViewerConfig};
//! use std::sync::Arc;
//!
//! let mut viewer = ModelManager::with_engine(Arc::new(MemoryEngine::new()), ViewerConfig::from_env())?;
//! let model = viewer.load_model(ModelSource::path("house.json"), |p| println!("{:?}", p.percent())).await?;
//! let key = ElementKey::new(model.id(), EntityId(42));
//!
//! viewer.highlight_element(key).await?;
//! let rules = vec![ValidationRule::new("IFCWALL").require_pset("Pset_WallCommon")];
//! let failures = viewer.validate_model(&rules, |pct| println!("{}%", pct)).await?;
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod highlight;
pub mod index;
pub mod label;
pub mod lifecycle;
pub mod normalize;
pub mod pool;
pub mod validation;

pub use config::ViewerConfig;
pub use error::{Result, ViewerError};
pub use extract::{extract, PropertyBundle, TypeProperties};
pub use highlight::{Highlight, SelectionHighlighter};
pub use index::{ElementEntry, ElementIndex};
pub use label::{class_label, element_class_label};
pub use lifecycle::{Model, ModelManager, ViewerStatus};
pub use normalize::{normalize, CenteringOutcome};
pub use pool::WorkerPool;
pub use validation::{
    check_element, summarize, validate, ValidationReport, ValidationResult, ValidationRule,
};
