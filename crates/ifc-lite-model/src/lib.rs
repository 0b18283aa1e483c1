// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Lite Model - Shared types and engine traits for the viewer core
//!
//! This crate provides the abstractions the viewer core is written against. The
//! geometry/property decoding engine is an external collaborator: it is reached
//! only through the [`GeometryEngine`] (blocking) and [`AsyncEngine`] (future
//! based) traits defined here.
//!
//! # Architecture
//!
//! - [`types`] - identifiers (`ModelId`, `EntityId`, `ElementKey`) and the `IfcType` table
//! - [`properties`] - the open-schema [`PropertyRecord`] with its tagged [`PropertyValue`]
//! - [`geometry`] - the scene graph arena, primitives and bounding volumes
//! - [`traits`] - the engine seam
//! - [`memory`] - [`MemoryEngine`], an in-process engine serving JSON model fixtures
//!
//! # Example
//!
//! ```ignore
//! use ifc_lite_model::{GeometryEngine, MemoryEngine, ModelSource};
//!
//! let engine = MemoryEngine::new();
//! engine.initialize("worker.js", "web-ifc.wasm")?;
//! let graph = engine.load_geometry(&ModelSource::path("house.json"), &mut |_| {})?;
//! println!("{} primitives", graph.primitives().count());
//! ```

pub mod error;
pub mod geometry;
pub mod memory;
pub mod properties;
pub mod traits;
pub mod types;

// Re-export all public types
pub use error::*;
pub use geometry::*;
pub use memory::*;
pub use properties::*;
pub use traits::*;
pub use types::*;
