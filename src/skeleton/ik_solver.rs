//! 两骨骼 IK 求解器 - 余弦定理解析解
//!
//! 设计原则：
//! - 一次求解，不迭代
//! - 超出可达范围时整条链伸直指向目标，不视为错误
//! - 弯曲方向由每条链显式配置，不从几何推断

use std::f32::consts::PI;

use glam::Vec2;

use super::bone_set::BoneSet;
use super::global_pose::GlobalPose;

/// 求解结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IkOutcome {
    /// 目标在可达范围内，关节点落在目标上
    Reached,
    /// 目标过远，链条已完全伸直指向目标
    Extended,
}

// ============================================================================
// IK 链
// ============================================================================

/// 两骨骼 IK 链
///
/// `upper` 是近端骨骼，`lower` 是远端骨骼，`effector` 是挂在 `lower` 末端的末端执行器。
/// 求解目标是 `lower` 的终点（即 effector 的起点关节）。
#[derive(Clone, Debug, PartialEq)]
pub struct IkChain {
    pub effector: String,
    pub upper: String,
    pub lower: String,
    /// 弯曲方向：左侧 -1，右侧 +1
    pub bend_direction: f32,
}

impl IkChain {
    pub fn new(
        effector: impl Into<String>,
        upper: impl Into<String>,
        lower: impl Into<String>,
        bend_direction: f32,
    ) -> Self {
        Self {
            effector: effector.into(),
            upper: upper.into(),
            lower: lower.into(),
            bend_direction: if bend_direction < 0.0 { -1.0 } else { 1.0 },
        }
    }

    /// 求解 IK，原地修改 `upper`/`lower` 的本地角度
    ///
    /// 需要 `pose` 中 `upper` 父骨骼的世界姿态已解算。
    /// 骨骼名未知或链长度退化时返回 None，不修改任何骨骼。
    pub fn solve(&self, skeleton: &mut BoneSet, pose: &GlobalPose, target: Vec2) -> Option<IkOutcome> {
        let upper_idx = skeleton.find_bone_by_name(&self.upper)?;
        let lower_idx = skeleton.find_bone_by_name(&self.lower)?;
        let root_idx = skeleton.parent_of(upper_idx)?;
        let chain_root = pose.at(root_idx)?;

        let l1 = skeleton.link(upper_idx)?.length;
        let l2 = skeleton.link(lower_idx)?.length;
        if l1 <= f32::EPSILON || l2 <= f32::EPSILON {
            return None;
        }

        let (upper_angle, lower_angle, outcome) =
            solve_two_bone(chain_root.end, chain_root.angle, l1, l2, self.bend_direction, target);
        skeleton.set_angle_at(upper_idx, upper_angle);
        skeleton.set_angle_at(lower_idx, lower_angle);
        Some(outcome)
    }
}

/// 两骨骼解析 IK
///
/// 返回 (近端本地角度, 远端本地角度, 结果)。
pub fn solve_two_bone(
    chain_root: Vec2,
    parent_world_angle: f32,
    l1: f32,
    l2: f32,
    bend_direction: f32,
    target: Vec2,
) -> (f32, f32, IkOutcome) {
    let to_target = target - chain_root;
    let d = to_target.length();
    let base_angle = to_target.y.atan2(to_target.x);

    // 不可达：完全伸直
    if d > l1 + l2 {
        return (base_angle - parent_world_angle, 0.0, IkOutcome::Extended);
    }

    // 目标与链根重合时方向无意义，近端骨骼沿 base_angle 不额外偏转
    let cos1 = if d > f32::EPSILON {
        (d * d + l1 * l1 - l2 * l2) / (2.0 * d * l1)
    } else {
        1.0
    };
    let cos2 = (l1 * l1 + l2 * l2 - d * d) / (2.0 * l1 * l2);

    // clamp 后再 acos，容忍可达边界处的浮点误差
    let angle1 = cos1.clamp(-1.0, 1.0).acos();
    let angle2 = cos2.clamp(-1.0, 1.0).acos();

    let upper_world = base_angle + bend_direction * angle1;
    let upper_local = upper_world - parent_world_angle;
    let lower_local = bend_direction * (angle2 - PI);

    (upper_local, lower_local, IkOutcome::Reached)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::BoneLink;

    /// 两条对称手臂：链根分别在 (-10, 0) 和 (10, 0)
    fn arms() -> BoneSet {
        BoneSet::from_links(vec![
            BoneLink::new("Root", 0.0),
            BoneLink::new("L_Shoulder", 10.0).with_parent("Root").with_angle(PI),
            BoneLink::new("L_Upper", 100.0).with_parent("L_Shoulder"),
            BoneLink::new("L_Lower", 100.0).with_parent("L_Upper"),
            BoneLink::new("L_Hand", 5.0).with_parent("L_Lower"),
            BoneLink::new("R_Shoulder", 10.0).with_parent("Root"),
            BoneLink::new("R_Upper", 100.0).with_parent("R_Shoulder"),
            BoneLink::new("R_Lower", 100.0).with_parent("R_Upper"),
            BoneLink::new("R_Hand", 5.0).with_parent("R_Lower"),
        ])
        .unwrap()
    }

    fn left() -> IkChain {
        IkChain::new("L_Hand", "L_Upper", "L_Lower", -1.0)
    }

    fn right() -> IkChain {
        IkChain::new("R_Hand", "R_Upper", "R_Lower", 1.0)
    }

    fn wrap(angle: f32) -> f32 {
        let mut a = angle % (2.0 * PI);
        if a > PI {
            a -= 2.0 * PI;
        } else if a < -PI {
            a += 2.0 * PI;
        }
        a
    }

    fn solve_and_resolve(set: &mut BoneSet, chain: &IkChain, target: Vec2) -> (IkOutcome, GlobalPose) {
        let pose = GlobalPose::resolve(set, Vec2::ZERO, 0.0);
        let outcome = chain.solve(set, &pose, target).unwrap();
        (outcome, GlobalPose::resolve(set, Vec2::ZERO, 0.0))
    }

    #[test]
    fn unreachable_target_fully_extends() {
        let mut set = arms();
        let root = Vec2::new(10.0, 0.0);
        let dir = Vec2::new(0.6, 0.8);
        let target = root + dir * 250.0;
        let (outcome, pose) = solve_and_resolve(&mut set, &right(), target);

        assert_eq!(outcome, IkOutcome::Extended);
        assert_eq!(set.angle("R_Lower"), Some(0.0));
        let upper = pose.get("R_Upper").unwrap();
        let pointing = (upper.end - upper.start).normalize();
        assert!((pointing - dir).length() < 1e-4);
    }

    #[test]
    fn reachable_target_is_hit() {
        let mut set = arms();
        let target = Vec2::new(90.0, 120.0);
        let (outcome, pose) = solve_and_resolve(&mut set, &right(), target);

        assert_eq!(outcome, IkOutcome::Reached);
        let lower = pose.get("R_Lower").unwrap();
        assert!((lower.end - target).length() < 1e-3);
        assert_eq!(pose.get("R_Hand").unwrap().start, lower.end);
    }

    #[test]
    fn partial_fold_uses_law_of_cosines() {
        let mut set = arms();
        let target = Vec2::new(10.0, 100.0);
        let (_, pose) = solve_and_resolve(&mut set, &right(), target);

        // d = l1 = l2：肘角 60°
        let expected = (0.5_f32).acos() - PI;
        assert!((set.angle("R_Lower").unwrap() - expected).abs() < 1e-4);
        assert!((pose.get("R_Lower").unwrap().end - target).length() < 1e-3);
    }

    #[test]
    fn target_on_chain_root_folds_back_completely() {
        let mut set = arms();
        let target = Vec2::new(10.0, 0.0);
        let (outcome, _) = solve_and_resolve(&mut set, &right(), target);

        assert_eq!(outcome, IkOutcome::Reached);
        // acos(1) = 0 → bend · (0 − π)
        assert!((set.angle("R_Lower").unwrap() + PI).abs() < 1e-3);
        assert!(set.angle("R_Upper").unwrap().is_finite());
    }

    #[test]
    fn mirrored_targets_give_mirrored_angles() {
        let mut set = arms();
        let pose = GlobalPose::resolve(&set, Vec2::ZERO, 0.0);
        let target = Vec2::new(80.0, 90.0);
        let mirrored = Vec2::new(-target.x, target.y);

        right().solve(&mut set, &pose, target).unwrap();
        left().solve(&mut set, &pose, mirrored).unwrap();

        let r_upper = set.angle("R_Upper").unwrap();
        let l_upper = set.angle("L_Upper").unwrap();
        let r_lower = set.angle("R_Lower").unwrap();
        let l_lower = set.angle("L_Lower").unwrap();
        assert!(wrap(l_upper + r_upper).abs() < 1e-4);
        assert!((l_lower + r_lower).abs() < 1e-4);
    }

    #[test]
    fn unknown_or_degenerate_chain_is_noop() {
        let mut set = arms();
        let pose = GlobalPose::resolve(&set, Vec2::ZERO, 0.0);
        let ghost = IkChain::new("X_Hand", "X_Upper", "X_Lower", 1.0);
        assert_eq!(ghost.solve(&mut set, &pose, Vec2::ONE), None);

        // 根骨骼没有父骨骼，无法作为近端
        let rootless = IkChain::new("R_Upper", "Root", "R_Shoulder", 1.0);
        assert_eq!(rootless.solve(&mut set, &pose, Vec2::ONE), None);
    }
}
