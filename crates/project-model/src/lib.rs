//! ClipForge Project Model
//!
//! Defines the core data contracts for ClipForge projects:
//! - **Clips and overlays:** media clips with source trim bounds, timeline
//!   placement and transform, plus text overlays
//! - **Timeline:** the aggregate owning every element, with its fixed canvas
//!   and frame rate
//! - **Coordinates:** mapping between source time, timeline position and
//!   screen pixels
//! - **Operations:** pure reducers applying editing commands to a timeline
//! - **Project:** top-level metadata, imported assets, export settings and
//!   on-disk persistence
//!
//! All times are in seconds. Every successful operation leaves the timeline
//! satisfying the clip invariants documented on [`MediaClip`].

pub mod asset;
pub mod clip;
pub mod coords;
pub mod gesture;
pub mod ops;
pub mod project;
pub mod sanitize;
pub mod text;
pub mod timeline;

pub use asset::*;
pub use clip::*;
pub use coords::*;
pub use gesture::*;
pub use ops::*;
pub use project::*;
pub use text::*;
pub use timeline::*;
