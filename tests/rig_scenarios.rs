//! 运行时端到端场景

use figure_rig::constraint::BoneStatus;
use figure_rig::skeleton::anatomy;
use figure_rig::{AnchorTarget, FigureRig, RigError, RigMode};

fn rig() -> FigureRig {
    let mut rig = FigureRig::new(800.0, 600.0).unwrap();
    rig.tick();
    rig
}

#[test]
fn locked_foot_stays_on_pin_when_hips_move() {
    let mut rig = rig();
    assert!(rig.toggle_lock("L_Foot").unwrap());
    let pin = rig.locks().lock_target("L_Foot").unwrap();
    assert!((pin.y - rig.floor_y()).abs() < 1e-3);

    assert!(rig.set_anchor_value(AnchorTarget::GroundY, 10.0));
    assert!(rig.set_anchor_value(AnchorTarget::GroundX, -4.0));
    rig.tick();

    let foot = rig.pose().get("L_Foot").unwrap();
    assert!((foot.start - pin).length() < 1e-2);
    // 未锁定的右腿随髋部移动
    let status = rig.bone_status("L_Thigh").unwrap();
    assert!(status.contains(BoneStatus::IN_LOCKED_CHAIN));
    assert!(!rig.bone_status("R_Thigh").unwrap().is_constrained());
}

#[test]
fn blend_lands_exactly_on_reference_pose() {
    let mut rig = rig();
    rig.set_bone_angle("Head", 0.4);
    rig.set_anchor_value(AnchorTarget::GroundX, 25.0);
    rig.transition_to(RigMode::TPose).unwrap();

    for _ in 0..anatomy::DEFAULT_TRANSITION_FRAMES {
        rig.tick();
    }

    assert!(!rig.is_transitioning());
    assert_eq!(rig.mode(), RigMode::TPose);
    let t_pose = anatomy::t_pose().unwrap();
    for link in t_pose.links() {
        assert_eq!(rig.skeleton().angle(&link.name), t_pose.angle(&link.name), "{}", link.name);
    }
    assert_eq!(rig.anchor().offset.x, 0.0);
}

#[test]
fn snapshots_are_isolated_from_live_edits() {
    let mut rig = rig();
    let snapshot = rig.skeleton().clone();
    assert!(rig.set_bone_angle("Head", 0.3));
    assert_eq!(snapshot.angle("Head"), Some(0.0));
    assert_eq!(rig.skeleton().angle("Head"), Some(0.3));
}

#[test]
fn collapse_falls_to_floor_and_blends_back() {
    let mut rig = rig();
    let standing_navel = rig.pose().get(anatomy::ROOT_BONE).unwrap().start;

    rig.transition_to(RigMode::Collapse).unwrap();
    for _ in 0..300 {
        rig.tick();
    }
    let floor = rig.floor_y();
    for (name, bone) in rig.pose().iter() {
        assert!(bone.start.y <= floor + 1e-3, "{name}");
        assert!(bone.end.y <= floor + 1e-3, "{name}");
    }
    let fallen_navel = rig.pose().get(anatomy::ROOT_BONE).unwrap().start;
    assert!(fallen_navel.y > standing_navel.y + 10.0);

    rig.transition_to(RigMode::TPose).unwrap();
    assert!(!rig.is_simulating());
    // 过渡从布娃娃躺倒的位置开始
    assert!((rig.anchor().origin() - fallen_navel).length() < 1e-3);

    for _ in 0..anatomy::DEFAULT_TRANSITION_FRAMES {
        rig.tick();
    }
    assert_eq!(rig.mode(), RigMode::TPose);
    assert_eq!(rig.anchor().origin(), rig.anchor().base);
}

#[test]
fn locked_foot_is_pinned_through_collapse() {
    let mut rig = rig();
    rig.toggle_lock("R_Foot").unwrap();
    let pin = rig.locks().lock_target("R_Foot").unwrap();

    rig.set_collapse_mode();
    for _ in 0..120 {
        rig.tick();
    }
    assert_eq!(rig.pose().get("R_Foot").unwrap().start, pin);

    assert!(rig.exit_collapse());
    assert_eq!(rig.mode(), RigMode::Tension);
    assert!(rig.locks().is_locked("R_Foot"));
    assert!(!rig.exit_collapse());
}

#[test]
fn manual_rotation_guards() {
    let mut rig = rig();
    rig.toggle_lock("R_Hand").unwrap();
    assert!(!rig.set_bone_angle("R_Forearm", -1.0));
    assert!(rig.set_bone_angle("R_Hand", 0.5));

    rig.clear_all_locks();
    rig.tick();
    assert!(rig.set_bone_angle("R_Forearm", -1.0));

    rig.set_collapse_mode();
    assert!(!rig.set_bone_angle("R_Forearm", -0.5));
    assert!(matches!(rig.toggle_lock("Spine"), Err(RigError::InvalidEffector(_))));
}

#[test]
fn clearing_locks_in_collapse_releases_pinned_joints() {
    let mut rig = rig();
    rig.toggle_lock("R_Hand").unwrap();
    let pin = rig.locks().lock_target("R_Hand").unwrap();

    rig.transition_to(RigMode::Collapse).unwrap();
    assert_eq!(rig.ragdoll().unwrap().pinned_count(), 1);

    rig.clear_all_locks();
    assert!(rig.locks().is_empty());
    assert_eq!(rig.ragdoll().unwrap().pinned_count(), 0);
    assert!(!rig
        .bone_status("R_Hand")
        .unwrap()
        .contains(BoneStatus::LOCKED_EFFECTOR));

    for _ in 0..300 {
        rig.tick();
    }
    let wrist = rig.pose().get("R_Hand").unwrap().start;
    assert!(wrist.y > pin.y + 20.0, "wrist {wrist:?} still near cleared pin {pin:?}");
    assert!(wrist.y <= rig.floor_y());
}
