//! Zinc Scene Core
//!
//! This crate contains the scene model behind the zinc viewer:
//! - RegionTree: named regions holding primitives
//! - ZincObject: surfaces, lines, points and glyph sets with levels of detail
//! - TimeModel: manual time and morph-target clips
//! - MetadataLoader: v1/v2 metadata documents resolved into a scene
//! - Scene: camera, viewports, duration and markers

pub mod bounds;
pub mod camera;
pub mod config;
pub mod constants;
pub mod geometry;
pub mod loader;
pub mod lod;
pub mod marker;
pub mod mesh;
pub mod primitive;
pub mod region;
pub mod scene;
pub mod time;
pub mod transport;

pub use bounds::*;
pub use camera::*;
pub use config::*;
pub use constants::*;
pub use geometry::*;
pub use loader::*;
pub use lod::*;
pub use marker::*;
pub use mesh::*;
pub use primitive::*;
pub use region::*;
pub use scene::*;
pub use time::*;
pub use transport::*;
