//! Time-aware coordinate-frame transform tree for robotics telemetry
//! visualization.
//!
//! Ingests time-stamped rigid-body transforms between named frames, keeps a
//! bounded-history forest, and answers "pose of frame A relative to frame B
//! at time T" queries every rendered frame. Decoding of transform messages
//! and the rendering of resolved poses live outside this crate.

pub mod clock;
pub mod diagnostics;
pub mod error;
pub mod frame;
pub mod resolver;
pub mod selection;
pub mod tree;

#[cfg(test)]
mod test_utils;

use compact_str::CompactString;

/// A coordinate-frame identifier.
pub type FrameId = CompactString;

pub use clock::{TfDuration, TfTime};
pub use diagnostics::{PoseDiagnostics, MISSING_TRANSFORM};
pub use error::{TransformError, TransformResult};
pub use frame::{EdgeUpdate, Frame, TransformEdge};
pub use resolver::{resolve_render_pose, update_pose, RenderView, RenderablePose};
pub use selection::{FramePolicy, SelectedFrames, DEFAULT_PREFERRED_FRAMES};
pub use tree::{FrameGroup, TransformTree, TreeChange};

pub use tf_payloads::Transform;
