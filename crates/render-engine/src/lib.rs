//! ClipForge Render Engine
//!
//! Compiles a timeline snapshot into a [`RenderCommand`] and executes it on
//! an external transcoding engine.
//!
//! # Pipeline Architecture
//!
//! ```text
//! timeline ──┐
//!            ├── compile ── FilterGraph + inputs + encode params
//! assets ────┘                        │
//!                                     ▼
//!                           ExportSession (one at a time)
//!                                     │
//!                                     ▼
//!                            ffmpeg -progress pipe:1
//!                                     │
//!                                     ▼
//!                                 output.mp4
//! ```

pub mod assets;
pub mod command;
pub mod compiler;
pub mod engine;
pub mod export;
pub mod graph;

pub use assets::*;
pub use command::*;
pub use compiler::{compile, CompileError, CompileOptions};
pub use engine::*;
pub use export::*;
pub use graph::*;
