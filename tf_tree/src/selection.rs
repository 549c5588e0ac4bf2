//! Heuristics for choosing default render and fixed frames when the caller
//! has not configured one, re-evaluated on first data arrival and whenever
//! the configured frame becomes invalid.

use crate::tree::TransformTree;
use crate::FrameId;
use log::debug;
use std::collections::HashMap;

/// Canonical reference frame names tried in priority order.
pub const DEFAULT_PREFERRED_FRAMES: [&str; 4] = ["base_link", "odom", "map", "world"];

/// The working frames of a render session: the frame the scene is viewed
/// from, and the root anchoring it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFrames {
    pub render_frame: FrameId,
    pub fixed_frame: FrameId,
}

/// Reference-frame selection policy.
#[derive(Debug, Clone)]
pub struct FramePolicy {
    preferred: Vec<FrameId>,
    configured_render_frame: Option<FrameId>,
}

impl FramePolicy {
    pub fn new() -> Self {
        Self::with_preferred(
            DEFAULT_PREFERRED_FRAMES
                .iter()
                .map(|name| FrameId::from(*name))
                .collect(),
        )
    }

    pub fn with_preferred(preferred: Vec<FrameId>) -> Self {
        Self {
            preferred,
            configured_render_frame: None,
        }
    }

    /// Explicit render-frame override; used only while it exists in the tree.
    pub fn set_render_frame(&mut self, frame: Option<FrameId>) {
        self.configured_render_frame = frame;
    }

    pub fn render_frame_override(&self) -> Option<&FrameId> {
        self.configured_render_frame.as_ref()
    }

    /// Chooses render and fixed frames for the current tree contents:
    /// the verified configured frame, else the first preferred name present,
    /// else the root governing the most frames. The fixed frame is the root
    /// of the chosen render frame. `None` while the tree is empty.
    pub fn select(&self, tree: &TransformTree) -> Option<SelectedFrames> {
        let render_frame = self
            .configured_render_frame
            .as_ref()
            .filter(|frame| tree.has_frame(frame.as_str()))
            .cloned()
            .or_else(|| {
                self.preferred
                    .iter()
                    .find(|frame| tree.has_frame(frame.as_str()))
                    .cloned()
            })
            .or_else(|| biggest_root(tree))?;

        // A looping parent chain leaves the frame anchored to itself.
        let fixed_frame = tree
            .root_of(render_frame.as_str())
            .map(|root| root.clone())
            .unwrap_or_else(|_| render_frame.clone());

        debug!("selected render frame '{render_frame}', fixed frame '{fixed_frame}'");
        Some(SelectedFrames {
            render_frame,
            fixed_frame,
        })
    }

    /// Whether `current` is no longer valid: nothing selected yet while data
    /// exists, or the render frame disappeared or was never present.
    pub fn needs_reselect(&self, tree: &TransformTree, current: Option<&SelectedFrames>) -> bool {
        match current {
            None => tree.frame_count() > 0,
            Some(selected) => !tree.has_frame(selected.render_frame.as_str()),
        }
    }
}

impl Default for FramePolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// The root with the most frames under it; ties go to the lexicographically
/// smallest id. Frames with looping parent chains are skipped.
fn biggest_root(tree: &TransformTree) -> Option<FrameId> {
    let mut counts: HashMap<&FrameId, usize> = HashMap::new();
    for id in tree.frame_ids() {
        if let Ok(root) = tree.root_of(id.as_str()) {
            *counts.entry(root).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .max_by(|(root_a, count_a), (root_b, count_b)| {
            count_a.cmp(count_b).then_with(|| root_b.cmp(root_a))
        })
        .map(|(root, _)| root.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TfTime;
    use crate::test_utils::translation;

    fn add(tree: &mut TransformTree, child: &str, parent: &str) {
        tree.add_transform(child, parent, TfTime::from_secs(0), translation(0.0, 0.0, 0.0))
            .unwrap();
    }

    #[test]
    fn empty_tree_selects_nothing() {
        let policy = FramePolicy::new();
        let tree = TransformTree::new();
        assert!(policy.select(&tree).is_none());
        assert!(!policy.needs_reselect(&tree, None));
    }

    #[test]
    fn first_preferred_name_present_wins() {
        let policy = FramePolicy::new();
        let mut tree = TransformTree::new();
        add(&mut tree, "odom", "map");
        add(&mut tree, "base_link", "odom");

        let selected = policy.select(&tree).unwrap();
        assert_eq!(selected.render_frame, "base_link");
        assert_eq!(selected.fixed_frame, "map");
    }

    #[test]
    fn configured_frame_wins_when_it_exists() {
        let mut policy = FramePolicy::new();
        let mut tree = TransformTree::new();
        add(&mut tree, "base_link", "odom");
        add(&mut tree, "camera", "base_link");

        policy.set_render_frame(Some(FrameId::from("camera")));
        let selected = policy.select(&tree).unwrap();
        assert_eq!(selected.render_frame, "camera");
        assert_eq!(selected.fixed_frame, "odom");

        // an override that never showed up in the tree is ignored
        policy.set_render_frame(Some(FrameId::from("missing")));
        let selected = policy.select(&tree).unwrap();
        assert_eq!(selected.render_frame, "base_link");
    }

    #[test]
    fn falls_back_to_the_biggest_root() {
        let policy = FramePolicy::new();
        let mut tree = TransformTree::new();
        add(&mut tree, "sensor_a", "rig");
        add(&mut tree, "sensor_b", "rig");
        add(&mut tree, "lone", "pole");

        let selected = policy.select(&tree).unwrap();
        assert_eq!(selected.render_frame, "rig");
        assert_eq!(selected.fixed_frame, "rig");
    }

    #[test]
    fn biggest_root_ties_break_deterministically() {
        let policy = FramePolicy::new();
        let mut tree = TransformTree::new();
        add(&mut tree, "b_child", "b_root");
        add(&mut tree, "a_child", "a_root");

        let selected = policy.select(&tree).unwrap();
        assert_eq!(selected.render_frame, "a_root");
    }

    #[test]
    fn reselect_when_the_render_frame_is_invalid() {
        let policy = FramePolicy::new();
        let mut tree = TransformTree::new();
        add(&mut tree, "base_link", "odom");

        assert!(policy.needs_reselect(&tree, None));

        let selected = policy.select(&tree).unwrap();
        assert!(!policy.needs_reselect(&tree, Some(&selected)));

        let phantom = SelectedFrames {
            render_frame: FrameId::from("removed"),
            fixed_frame: FrameId::from("map"),
        };
        assert!(policy.needs_reselect(&tree, Some(&phantom)));
    }
}
