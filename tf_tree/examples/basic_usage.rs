use tf_payloads::{DVec3, Transform};
use tf_tree::{
    update_pose, FramePolicy, PoseDiagnostics, RenderView, RenderablePose, TfTime, TransformTree,
};

fn main() {
    println!("Transform Tree - Basic Usage Demo");
    println!("=================================");

    let mut tree = TransformTree::new();

    // A small robot scene: map <- odom <- base_link, with the robot driving
    // one meter along +x between t = 0 s and t = 10 s.
    tree.add_transform("odom", "map", TfTime::from_secs(0), Transform::IDENTITY)
        .unwrap();
    tree.add_transform(
        "base_link",
        "odom",
        TfTime::from_secs(0),
        Transform::from_translation(DVec3::new(1.0, 0.0, 0.0)),
    )
    .unwrap();
    tree.add_transform(
        "base_link",
        "odom",
        TfTime::from_secs(10),
        Transform::from_translation(DVec3::new(2.0, 0.0, 0.0)),
    )
    .unwrap();

    for group in tree.frame_list() {
        println!("root '{}': {:?}", group.root, group.frames);
    }

    // Interpolated multi-hop query halfway through the motion
    let pose = tree
        .resolve_pose("base_link", "map", TfTime::from_secs(5))
        .unwrap();
    println!(
        "base_link in map at t=5s: [{}, {}, {}]",
        pose.translation.x, pose.translation.y, pose.translation.z
    );

    // Pick default reference frames the way the panel would
    let policy = FramePolicy::new();
    let selected = policy.select(&tree).unwrap();
    println!(
        "selected render frame '{}', fixed frame '{}'",
        selected.render_frame, selected.fixed_frame
    );

    // Drive the per-renderable pipeline for one marker pinned to the map
    let view = RenderView {
        render_frame: selected.render_frame.clone(),
        fixed_frame: selected.fixed_frame.clone(),
        current_time: TfTime::from_secs(10),
    };
    let mut diagnostics = PoseDiagnostics::new();
    let mut marker = RenderablePose::new("/markers/0", "map".into(), TfTime::from_secs(0), false);

    if update_pose(&tree, &view, &mut marker, &mut diagnostics) {
        let pose = marker.pose.unwrap();
        println!(
            "marker in '{}': [{}, {}, {}]",
            view.render_frame, pose.translation.x, pose.translation.y, pose.translation.z
        );
    }

    // Long sessions stay bounded: prune drops edges older than the
    // retention window but never a frame's newest edge.
    let dropped = tree.prune(TfTime::from_secs(120));
    println!("pruned {dropped} stale edge(s)");
}
