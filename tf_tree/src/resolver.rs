//! Per-renderable pose resolution, run once per visible renderable on every
//! rendered frame.

use crate::clock::TfTime;
use crate::diagnostics::{PoseDiagnostics, MISSING_TRANSFORM};
use crate::error::TransformResult;
use crate::tree::TransformTree;
use crate::FrameId;
use log::debug;
use tf_payloads::Transform;

/// Per-tick view configuration shared by every renderable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderView {
    /// Frame the scene is viewed from.
    pub render_frame: FrameId,
    /// Root frame treated as the static world reference.
    pub fixed_frame: FrameId,
    /// Current playback time.
    pub current_time: TfTime,
}

/// Pose state of one renderable, keyed into diagnostics by `path`.
#[derive(Debug, Clone)]
pub struct RenderablePose {
    /// Opaque settings path identifying this renderable in diagnostics.
    pub path: String,
    /// The frame the renderable's data is expressed in.
    pub frame_id: FrameId,
    /// Timestamp of the renderable's own message.
    pub stamp: TfTime,
    /// When set, the pose is recomputed at the current render time instead
    /// of `stamp`, trading temporal accuracy for guaranteed currency.
    pub frame_locked: bool,
    /// Last successfully resolved pose in the render frame. Left untouched
    /// when resolution fails so the renderable can keep its last good pose.
    pub pose: Option<Transform>,
}

impl RenderablePose {
    pub fn new(path: impl Into<String>, frame_id: FrameId, stamp: TfTime, frame_locked: bool) -> Self {
        Self {
            path: path.into(),
            frame_id,
            stamp,
            frame_locked,
            pose: None,
        }
    }
}

/// Computes the pose of `frame_id` in the view's render frame.
///
/// The render frame is anchored to the fixed frame at the current time; the
/// renderable is anchored at its source time (current time when
/// frame-locked, else its own stamp). Both legs go through the fixed frame
/// so a moving render frame and an old message still land in the right
/// place.
pub fn resolve_render_pose(
    tree: &TransformTree,
    view: &RenderView,
    frame_id: &str,
    stamp: TfTime,
    frame_locked: bool,
) -> TransformResult<Transform> {
    let render_to_fixed = tree.resolve_pose(
        view.render_frame.as_str(),
        view.fixed_frame.as_str(),
        view.current_time,
    )?;

    let source_time = if frame_locked { view.current_time } else { stamp };
    let frame_to_fixed = tree.resolve_pose(frame_id, view.fixed_frame.as_str(), source_time)?;

    Ok(render_to_fixed.inverse() * frame_to_fixed)
}

/// Resolves and applies the pose of one renderable.
///
/// On success stores the fresh pose and clears the renderable's
/// missing-transform diagnostic; on failure leaves the last good pose
/// untouched and files a diagnostic naming the frames involved. Returns
/// whether a fresh pose was applied.
pub fn update_pose(
    tree: &TransformTree,
    view: &RenderView,
    renderable: &mut RenderablePose,
    diagnostics: &mut PoseDiagnostics,
) -> bool {
    match resolve_render_pose(
        tree,
        view,
        renderable.frame_id.as_str(),
        renderable.stamp,
        renderable.frame_locked,
    ) {
        Ok(pose) => {
            renderable.pose = Some(pose);
            diagnostics.clear(&renderable.path, MISSING_TRANSFORM);
            true
        }
        Err(err) => {
            debug!(
                "no pose for '{}' in '{}': {err}",
                renderable.frame_id, view.render_frame
            );
            diagnostics.report(
                &renderable.path,
                MISSING_TRANSFORM,
                format!(
                    "missing transform from frame '{}' to frame '{}': {err}",
                    renderable.frame_id, view.render_frame
                ),
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TfDuration;
    use crate::test_utils::{rotation_z, translation};
    use crate::FrameId;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn secs(s: u64) -> TfTime {
        TfTime::from_secs(s)
    }

    /// map <- odom (static) <- base_link moving +x from 1 m to 2 m over 10 s.
    fn moving_robot_tree() -> TransformTree {
        let mut tree = TransformTree::new();
        tree.add_transform("odom", "map", secs(0), translation(0.0, 0.0, 0.0))
            .unwrap();
        tree.add_transform("base_link", "odom", secs(0), translation(1.0, 0.0, 0.0))
            .unwrap();
        tree.add_transform("base_link", "odom", secs(10), translation(2.0, 0.0, 0.0))
            .unwrap();
        tree
    }

    fn map_view(current_time: TfTime) -> RenderView {
        RenderView {
            render_frame: FrameId::from("map"),
            fixed_frame: FrameId::from("map"),
            current_time,
        }
    }

    #[test]
    fn source_time_follows_the_message_stamp() {
        let tree = moving_robot_tree();
        let view = map_view(secs(10));

        let pose = resolve_render_pose(&tree, &view, "base_link", secs(0), false).unwrap();
        assert_relative_eq!(pose.translation.x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn frame_locked_uses_current_time() {
        let tree = moving_robot_tree();
        let view = map_view(secs(10));

        let pose = resolve_render_pose(&tree, &view, "base_link", secs(0), true).unwrap();
        assert_relative_eq!(pose.translation.x, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn render_frame_is_anchored_at_current_time() {
        let mut tree = moving_robot_tree();
        // a marker placed 90 degrees rotated, fixed in the map
        tree.add_transform("marker", "map", secs(0), rotation_z(FRAC_PI_2))
            .unwrap();

        // viewing from the moving robot at t = 10 s: the marker sits at
        // -2 m x in robot coordinates, regardless of its old stamp
        let view = RenderView {
            render_frame: FrameId::from("base_link"),
            fixed_frame: FrameId::from("map"),
            current_time: secs(10),
        };
        let pose = resolve_render_pose(&tree, &view, "marker", secs(0), false).unwrap();
        assert_relative_eq!(pose.translation.x, -2.0, epsilon = 1e-12);
        assert_relative_eq!(pose.translation.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn update_pose_applies_and_clears_diagnostics() {
        let tree = moving_robot_tree();
        let view = map_view(secs(10));
        let mut diags = PoseDiagnostics::new();
        let mut renderable =
            RenderablePose::new("/markers/0", FrameId::from("base_link"), secs(10), false);

        assert!(update_pose(&tree, &view, &mut renderable, &mut diags));
        assert_relative_eq!(renderable.pose.unwrap().translation.x, 2.0, epsilon = 1e-12);
        assert!(diags.is_empty());
    }

    #[test]
    fn update_pose_keeps_last_good_pose_and_files_diagnostic() {
        let mut tree = moving_robot_tree();
        let view = map_view(secs(10));
        let mut diags = PoseDiagnostics::new();
        let mut renderable =
            RenderablePose::new("/markers/0", FrameId::from("gripper"), secs(10), false);
        renderable.pose = Some(translation(9.0, 0.0, 0.0));

        assert!(!update_pose(&tree, &view, &mut renderable, &mut diags));
        // last good pose untouched, error filed
        assert_relative_eq!(renderable.pose.unwrap().translation.x, 9.0, epsilon = 1e-12);
        assert!(diags.message("/markers/0", MISSING_TRANSFORM).is_some());

        // once the frame shows up, the diagnostic clears
        tree.add_transform("gripper", "base_link", secs(10), translation(0.5, 0.0, 0.0))
            .unwrap();
        assert!(update_pose(&tree, &view, &mut renderable, &mut diags));
        assert!(diags.is_empty());
        assert_relative_eq!(renderable.pose.unwrap().translation.x, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn staleness_failures_surface_per_renderable() {
        let mut tree = moving_robot_tree();
        tree.set_max_staleness(Some(TfDuration::from_secs(5)));
        let view = map_view(secs(10));
        let mut diags = PoseDiagnostics::new();
        let mut renderable =
            RenderablePose::new("/markers/0", FrameId::from("base_link"), secs(60), false);

        assert!(!update_pose(&tree, &view, &mut renderable, &mut diags));
        assert!(renderable.pose.is_none());
        let message = diags.message("/markers/0", MISSING_TRANSFORM).unwrap();
        assert!(message.contains("base_link"));
    }
}
