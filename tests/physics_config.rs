//! 全局物理配置经由运行时生效
//!
//! 配置是进程级全局状态，单独放在一个测试二进制中，避免与其他场景并发修改。

use figure_rig::physics::{get_config, reset_config, set_config, PhysicsConfig};
use figure_rig::{FigureRig, RigMode};

fn collapsed_rig() -> FigureRig {
    let mut rig = FigureRig::new(800.0, 600.0).unwrap();
    rig.tick();
    rig.transition_to(RigMode::Collapse).unwrap();
    rig
}

#[test]
fn runtime_config_is_read_every_tick() {
    // 无重力：布娃娃保持进入物理时的姿态
    set_config(PhysicsConfig {
        gravity: 0.0,
        ..PhysicsConfig::default()
    });
    assert_eq!(get_config().gravity, 0.0);

    let mut rig = collapsed_rig();
    let head = rig.pose().get("Head").unwrap().end;
    for _ in 0..30 {
        rig.tick();
    }
    assert!((rig.pose().get("Head").unwrap().end - head).length() < 1e-2);

    // 恢复默认后同一个布娃娃开始下落
    reset_config();
    assert_eq!(get_config().gravity, PhysicsConfig::default().gravity);
    for _ in 0..120 {
        rig.tick();
    }
    assert!(rig.pose().get("Head").unwrap().end.y > head.y + 1.0);

    // 零松弛迭代：约束杆不再维持长度，骨骼被拉长
    set_config(PhysicsConfig {
        relax_iterations: 0,
        ..PhysicsConfig::default()
    });
    let mut loose = collapsed_rig();
    for _ in 0..120 {
        loose.tick();
    }
    let ragdoll = loose.ragdoll().unwrap();
    let stretched = ragdoll.sticks().iter().any(|s| {
        let a = ragdoll.points()[s.a].position;
        let b = ragdoll.points()[s.b].position;
        (a.distance(b) - s.length).abs() > 1.0
    });
    assert!(stretched);
    reset_config();
}
