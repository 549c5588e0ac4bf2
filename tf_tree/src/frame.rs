use crate::clock::{TfDuration, TfTime};
use crate::error::{TransformError, TransformResult};
use crate::FrameId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tf_payloads::Transform;

/// One entry in a frame's history: at `stamp`, the frame's pose relative to
/// `parent` was `transform`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformEdge {
    pub stamp: TfTime,
    pub parent: FrameId,
    pub transform: Transform,
}

/// What an edge insertion changed, so callers know whether dependents need
/// to be notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeUpdate {
    /// The frame's effective parent (parent of the newest edge) moved.
    ParentChanged,
    /// History changed without moving the effective parent.
    Updated,
    /// Identical re-delivery; nothing changed.
    Unchanged,
}

/// A named coordinate frame owning its time-ordered edge history.
///
/// Edges are kept sorted by stamp. Successive edges may name different
/// parents: re-parenting is valid data. A frame with no edges is its own
/// root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    id: FrameId,
    edges: VecDeque<TransformEdge>,
    max_capacity: usize,
}

impl Frame {
    pub fn new(id: FrameId, max_capacity: usize) -> Self {
        Self {
            id,
            edges: VecDeque::new(),
            max_capacity,
        }
    }

    pub fn id(&self) -> &FrameId {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// The most recent edge, if any.
    pub fn latest(&self) -> Option<&TransformEdge> {
        self.edges.back()
    }

    /// Parent id of the most recent edge. `None` means this frame is a root.
    pub fn latest_parent(&self) -> Option<&FrameId> {
        self.edges.back().map(|edge| &edge.parent)
    }

    /// Stamps of the oldest and newest edges.
    pub fn time_range(&self) -> Option<(TfTime, TfTime)> {
        match (self.edges.front(), self.edges.back()) {
            (Some(front), Some(back)) => Some((front.stamp, back.stamp)),
            _ => None,
        }
    }

    /// Inserts an edge in time order. An edge at exactly the same stamp is
    /// replaced, so message re-delivery is idempotent.
    pub fn add_edge(&mut self, stamp: TfTime, parent: FrameId, transform: Transform) -> EdgeUpdate {
        let previous_parent = self.edges.back().map(|edge| edge.parent.clone());

        let pos = self.edges.partition_point(|edge| edge.stamp < stamp);
        let edge = TransformEdge {
            stamp,
            parent,
            transform,
        };
        match self.edges.get_mut(pos) {
            Some(existing) if existing.stamp == stamp => {
                if *existing == edge {
                    return EdgeUpdate::Unchanged;
                }
                *existing = edge;
            }
            _ => self.edges.insert(pos, edge),
        }

        while self.edges.len() > self.max_capacity {
            self.edges.pop_front();
        }

        let current_parent = self.edges.back().map(|edge| &edge.parent);
        if previous_parent.as_ref() != current_parent {
            EdgeUpdate::ParentChanged
        } else {
            EdgeUpdate::Updated
        }
    }

    /// The bracketing edges around `time`: the most recent edge at or before
    /// it and, when interpolation is possible, the earliest edge after it.
    /// Outside the recorded range the nearest edge is returned alone
    /// (clamped extrapolation).
    pub fn edges_at(&self, time: TfTime) -> TransformResult<(&TransformEdge, Option<&TransformEdge>)> {
        if self.edges.is_empty() {
            return Err(TransformError::NoTransformData(self.id.clone()));
        }

        let pos = self.edges.partition_point(|edge| edge.stamp <= time);
        if pos == 0 {
            return Ok((&self.edges[0], None));
        }

        let before = &self.edges[pos - 1];
        if before.stamp == time || pos == self.edges.len() {
            return Ok((before, None));
        }
        Ok((before, Some(&self.edges[pos])))
    }

    /// The frame's transform to its parent at `time`, interpolating between
    /// bracketing edges and clamping outside the recorded range.
    ///
    /// With `max_staleness` set, fails when the nearest edge is farther from
    /// `time` than allowed: the frame has not been updated recently enough
    /// to trust.
    pub fn transform_at(
        &self,
        time: TfTime,
        max_staleness: Option<TfDuration>,
    ) -> TransformResult<Transform> {
        let (before, after) = self.edges_at(time)?;

        if let Some(max) = max_staleness {
            let age = match after {
                Some(after) => time.abs_diff(before.stamp).min(after.stamp.abs_diff(time)),
                None => time.abs_diff(before.stamp),
            };
            if age > max {
                return Err(TransformError::StaleTransform {
                    frame: self.id.clone(),
                    time,
                    age,
                });
            }
        }

        match after {
            None => Ok(before.transform),
            Some(after) => {
                let span = (after.stamp.as_nanos() - before.stamp.as_nanos()) as f64;
                let t = (time.as_nanos() - before.stamp.as_nanos()) as f64 / span;
                Ok(Transform::interpolate(
                    &before.transform,
                    &after.transform,
                    t,
                ))
            }
        }
    }

    /// Drops edges older than `oldest_allowed`, always retaining the most
    /// recent edge so the frame's current pose is never lost. Returns how
    /// many edges were dropped.
    pub fn prune(&mut self, oldest_allowed: TfTime) -> usize {
        let mut dropped = 0;
        while self.edges.len() > 1
            && self
                .edges
                .front()
                .is_some_and(|edge| edge.stamp < oldest_allowed)
        {
            self.edges.pop_front();
            dropped += 1;
        }
        dropped
    }
}
