use crate::clock::{TfDuration, TfTime};
use crate::error::{TransformError, TransformResult};
use crate::frame::{EdgeUpdate, Frame};
use crate::FrameId;
use log::{debug, warn};
use smallvec::SmallVec;
use std::collections::HashMap;
use tf_payloads::Transform;

/// Typical hierarchy depth; deeper chains spill to the heap.
const CHAIN_DEPTH: usize = 8;

/// What an ingested transform changed, so the caller can decide whether
/// cached frame lists or tree-shape data need recomputing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeChange {
    /// A frame appeared or an effective parent moved.
    Topology,
    /// Only timing or transform values changed.
    Timing,
    /// Identical re-delivery; nothing changed.
    Unchanged,
}

/// One display-oriented group of [`TransformTree::frame_list`]: all frames
/// sharing `root`, sorted by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameGroup {
    pub root: FrameId,
    pub frames: Vec<FrameId>,
}

/// One link of an ancestor chain. `to_parent` is `None` only for the
/// terminal root.
struct ChainLink<'a> {
    frame: &'a FrameId,
    to_parent: Option<Transform>,
}

type Chain<'a> = SmallVec<[ChainLink<'a>; CHAIN_DEPTH]>;

/// The forest of coordinate frames for one render session.
///
/// Owns every [`Frame`] and their histories; consumers only read resolved
/// poses. Single-threaded by design: ingestion and resolution run on the
/// same tick and never overlap.
pub struct TransformTree {
    frames: HashMap<FrameId, Frame>,
    retention: TfDuration,
    frame_capacity: usize,
    max_staleness: Option<TfDuration>,
}

impl TransformTree {
    /// Default history retention window.
    pub const DEFAULT_RETENTION: TfDuration = TfDuration::from_secs(60);

    /// Default per-frame edge-count cap.
    pub const DEFAULT_FRAME_CAPACITY: usize = 10_000;

    pub fn new() -> Self {
        Self::with_settings(Self::DEFAULT_RETENTION, Self::DEFAULT_FRAME_CAPACITY)
    }

    pub fn with_settings(retention: TfDuration, frame_capacity: usize) -> Self {
        Self {
            frames: HashMap::new(),
            retention,
            frame_capacity,
            max_staleness: None,
        }
    }

    pub fn retention(&self) -> TfDuration {
        self.retention
    }

    /// Optional bound on how far the nearest edge may be from a query time
    /// before resolution fails with [`TransformError::StaleTransform`].
    pub fn set_max_staleness(&mut self, max_staleness: Option<TfDuration>) {
        self.max_staleness = max_staleness;
    }

    pub fn max_staleness(&self) -> Option<TfDuration> {
        self.max_staleness
    }

    pub fn has_frame(&self, id: &str) -> bool {
        self.frames.contains_key(id)
    }

    pub fn frame(&self, id: &str) -> Option<&Frame> {
        self.frames.get(id)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_ids(&self) -> impl Iterator<Item = &FrameId> {
        self.frames.keys()
    }

    pub fn get_or_create_frame(&mut self, id: &str) -> &mut Frame {
        if !self.frames.contains_key(id) {
            debug!("new frame '{id}'");
        }
        let capacity = self.frame_capacity;
        self.frames
            .entry(FrameId::from(id))
            .or_insert_with_key(|key| Frame::new(key.clone(), capacity))
    }

    /// Ingests one transform record: `child`'s pose relative to `parent` at
    /// `stamp`. Creates both frames on first sight and normalizes the
    /// rotation before storage.
    ///
    /// Self-parenting and non-finite or degenerate transforms are rejected
    /// with a typed error and a log line; existing history is untouched.
    pub fn add_transform(
        &mut self,
        child: &str,
        parent: &str,
        stamp: TfTime,
        transform: Transform,
    ) -> TransformResult<TreeChange> {
        if child == parent {
            warn!("dropping transform that makes frame '{child}' its own parent");
            return Err(TransformError::SelfParent(FrameId::from(child)));
        }

        let Some(normalized) = transform.try_normalized() else {
            warn!("dropping non-finite or degenerate transform for frame '{child}'");
            return Err(TransformError::MalformedTransform(FrameId::from(child)));
        };

        let created = !self.frames.contains_key(child) || !self.frames.contains_key(parent);
        self.get_or_create_frame(parent);
        let parent_id = FrameId::from(parent);
        let update = self
            .get_or_create_frame(child)
            .add_edge(stamp, parent_id, normalized);

        Ok(if created || update == EdgeUpdate::ParentChanged {
            TreeChange::Topology
        } else if update == EdgeUpdate::Updated {
            TreeChange::Timing
        } else {
            TreeChange::Unchanged
        })
    }

    /// Follows latest-parent links from `id` to its root. A revisited frame
    /// means the parent chain loops; that is reported, not followed forever.
    pub fn root_of(&self, id: &str) -> TransformResult<&FrameId> {
        let mut frame = self
            .frames
            .get(id)
            .ok_or_else(|| TransformError::FrameNotFound(FrameId::from(id)))?;

        let mut visited: SmallVec<[&FrameId; CHAIN_DEPTH]> = SmallVec::new();
        loop {
            visited.push(frame.id());
            match frame.latest_parent() {
                None => return Ok(frame.id()),
                Some(parent) => {
                    if visited.iter().any(|seen| *seen == parent) {
                        return Err(TransformError::CycleDetected(parent.clone()));
                    }
                    frame = self
                        .frames
                        .get(parent.as_str())
                        .ok_or_else(|| TransformError::FrameNotFound(parent.clone()))?;
                }
            }
        }
    }

    /// Resolves the pose of `from` relative to `to` at `time`.
    ///
    /// Walks both ancestor chains with time-interpolated per-hop
    /// transforms, finds the lowest common ancestor, and returns
    /// `invert(to→ancestor) ∘ (from→ancestor)`. Any hop that cannot produce
    /// a transform at `time` fails the whole query; partial answers are
    /// never returned.
    pub fn resolve_pose(&self, from: &str, to: &str, time: TfTime) -> TransformResult<Transform> {
        if !self.frames.contains_key(from) {
            return Err(TransformError::FrameNotFound(FrameId::from(from)));
        }
        if !self.frames.contains_key(to) {
            return Err(TransformError::FrameNotFound(FrameId::from(to)));
        }
        if from == to {
            return Ok(Transform::IDENTITY);
        }

        let from_chain = self.ancestor_chain(from, time)?;
        let to_chain = self.ancestor_chain(to, time)?;

        let mut lca = None;
        for (to_hops, link) in to_chain.iter().enumerate() {
            if let Some(from_hops) = from_chain
                .iter()
                .position(|candidate| candidate.frame == link.frame)
            {
                lca = Some((from_hops, to_hops));
                break;
            }
        }
        let Some((from_hops, to_hops)) = lca else {
            return Err(TransformError::DisconnectedFrames {
                from: FrameId::from(from),
                to: FrameId::from(to),
            });
        };

        let from_to_ancestor = compose_chain(&from_chain[..from_hops]);
        let to_to_ancestor = compose_chain(&to_chain[..to_hops]);
        Ok(to_to_ancestor.inverse() * from_to_ancestor)
    }

    /// Applies the retention window to every frame. Returns how many edges
    /// were dropped.
    pub fn prune(&mut self, now: TfTime) -> usize {
        let oldest_allowed = now.saturating_sub(self.retention);
        self.frames
            .values_mut()
            .map(|frame| frame.prune(oldest_allowed))
            .sum()
    }

    /// All known frame ids grouped by root and sorted, for display.
    /// Frames whose parent chain loops group under themselves.
    pub fn frame_list(&self) -> Vec<FrameGroup> {
        let mut by_root: HashMap<FrameId, Vec<FrameId>> = HashMap::new();
        for id in self.frames.keys() {
            let root = match self.root_of(id.as_str()) {
                Ok(root) => root.clone(),
                Err(_) => id.clone(),
            };
            by_root.entry(root).or_default().push(id.clone());
        }

        let mut groups: Vec<FrameGroup> = by_root
            .into_iter()
            .map(|(root, mut frames)| {
                frames.sort_unstable();
                FrameGroup { root, frames }
            })
            .collect();
        groups.sort_unstable_by(|a, b| a.root.cmp(&b.root));
        groups
    }

    /// The chain of frames from `start` up to its root, each paired with
    /// its interpolated transform-to-parent at `time`.
    fn ancestor_chain(&self, start: &str, time: TfTime) -> TransformResult<Chain<'_>> {
        let mut chain: Chain<'_> = SmallVec::new();
        let mut frame = self
            .frames
            .get(start)
            .ok_or_else(|| TransformError::FrameNotFound(FrameId::from(start)))?;

        loop {
            if chain.iter().any(|link| link.frame == frame.id()) {
                return Err(TransformError::CycleDetected(frame.id().clone()));
            }
            match frame.latest_parent() {
                None => {
                    chain.push(ChainLink {
                        frame: frame.id(),
                        to_parent: None,
                    });
                    return Ok(chain);
                }
                Some(parent) => {
                    let to_parent = frame.transform_at(time, self.max_staleness)?;
                    chain.push(ChainLink {
                        frame: frame.id(),
                        to_parent: Some(to_parent),
                    });
                    frame = self
                        .frames
                        .get(parent.as_str())
                        .ok_or_else(|| TransformError::FrameNotFound(parent.clone()))?;
                }
            }
        }
    }
}

impl Default for TransformTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Composes the transforms of a chain slice, child-most first, yielding the
/// pose of the slice's first frame relative to the frame above the slice.
fn compose_chain(links: &[ChainLink<'_>]) -> Transform {
    let mut result = Transform::IDENTITY;
    for link in links {
        if let Some(to_parent) = link.to_parent {
            result = to_parent * result;
        }
    }
    result
}
