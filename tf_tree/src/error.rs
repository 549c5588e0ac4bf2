use crate::clock::{TfDuration, TfTime};
use crate::FrameId;
use thiserror::Error;

/// Failures are local and recoverable: a failed query or rejected edge never
/// invalidates the rest of the tree.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("frame '{0}' does not exist")]
    FrameNotFound(FrameId),

    #[error("frames '{from}' and '{to}' share no common ancestor")]
    DisconnectedFrames { from: FrameId, to: FrameId },

    #[error("frame '{0}' has no transform history")]
    NoTransformData(FrameId),

    #[error("transform for frame '{frame}' is {age} away from the requested time {time}")]
    StaleTransform {
        frame: FrameId,
        time: TfTime,
        age: TfDuration,
    },

    #[error("cycle detected in the parent chain of frame '{0}'")]
    CycleDetected(FrameId),

    #[error("frame '{0}' cannot be its own parent")]
    SelfParent(FrameId),

    #[error("non-finite or degenerate transform for frame '{0}'")]
    MalformedTransform(FrameId),
}

pub type TransformResult<T> = Result<T, TransformError>;
