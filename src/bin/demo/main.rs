//! 无窗口演示
//!
//! 脚本化会话：锁定左脚 → 平移髋部 → 倒地 → 过渡回 T 字姿态，
//! 每个阶段输出关键关节的世界坐标。
//!
//! 运行：RUST_LOG=info cargo run --bin demo --features demo

use figure_rig::skeleton::GlobalPose;
use figure_rig::{AnchorTarget, FigureRig, RigMode};

const WIDTH: f32 = 800.0;
const HEIGHT: f32 = 600.0;

const TRACKED: [&str; 4] = ["Head", "L_Hand", "L_Shin", "R_Shin"];

fn log_pose(stage: &str, pose: &GlobalPose) {
    for name in TRACKED {
        if let Some(bone) = pose.get(name) {
            log::info!("[{}] {:<8} end=({:.1}, {:.1})", stage, name, bone.end.x, bone.end.y);
        }
    }
}

fn main() -> figure_rig::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut rig = FigureRig::new(WIDTH, HEIGHT)?;
    rig.tick();
    log_pose("站立", rig.pose());

    // 锁定左脚后平移并下压髋部，左腿由 IK 保持脚踝不动
    rig.toggle_lock("L_Foot")?;
    rig.set_anchor_value(AnchorTarget::GroundX, -5.0);
    rig.set_anchor_value(AnchorTarget::GroundY, 12.0);
    rig.tick();
    log_pose("锁脚下蹲", rig.pose());
    if let Some(pin) = rig.locks().lock_target("L_Foot") {
        log::info!("左脚锁定点 ({:.1}, {:.1})", pin.x, pin.y);
    }

    rig.transition_to(RigMode::Collapse)?;
    for _ in 0..120 {
        rig.tick();
    }
    log_pose("倒地", rig.pose());

    rig.transition_to(RigMode::TPose)?;
    while rig.is_transitioning() {
        rig.tick();
    }
    rig.tick();
    log_pose("T 字姿态", rig.pose());
    log::info!("最终模式: {:?}, 锁定 {} 个", rig.mode(), rig.locks().locks().len());

    Ok(())
}
