//! 人体骨架静态数据
//!
//! 比例单位、骨骼拓扑、参考姿态、解剖分组与 IK 链配置。只加载一次，之后只读。
//!
//! 坐标约定：屏幕坐标，+X 向右，+Y 向下；角度 0 指向 +X。
//! "L_" 前缀为画面左侧的肢体。

use std::f32::consts::{FRAC_PI_2, PI};

use once_cell::sync::Lazy;

use super::bone_link::BoneLink;
use super::bone_set::BoneSet;
use super::ik_solver::IkChain;
use crate::error::Result;
use crate::runtime::RigMode;

/// 比例基本单位（像素）
pub const ANATOMY_UNIT: f32 = 20.0;

/// 根骨骼
pub const ROOT_BONE: &str = "Navel";

/// 脚部末端执行器后缀（锁定时贴地）
pub const FOOT_SUFFIX: &str = "_Foot";

/// 末端执行器白名单，同时也是 IK 求值顺序
pub const EFFECTOR_ORDER: [&str; 4] = ["L_Foot", "R_Foot", "L_Hand", "R_Hand"];

/// 默认过渡帧数
pub const DEFAULT_TRANSITION_FRAMES: u32 = 30;

/// 地面高度占视口高度的比例
pub const FLOOR_RATIO: f32 = 0.9;

// ============================================================================
// 骨骼表
// ============================================================================

/// (名称, 父骨骼, 长度/单位, 初始角度, 质量, 关节范围)
type BoneRow = (&'static str, Option<&'static str>, f32, f32, f32, Option<(f32, f32)>);

/// 张力姿态（默认站姿）下的骨骼表
const FIGURE: &[BoneRow] = &[
    ("Navel", None, 0.0, -FRAC_PI_2, 1.6, None),
    ("Spine", Some("Navel"), 3.0, 0.0, 1.4, Some((-PI / 3.0, PI / 3.0))),
    ("Neck", Some("Spine"), 0.6, 0.0, 0.6, Some((-PI / 4.0, PI / 4.0))),
    ("Head", Some("Neck"), 1.4, 0.0, 1.2, Some((-PI / 4.0, PI / 4.0))),
    ("L_Shoulder", Some("Spine"), 1.0, -FRAC_PI_2, 0.8, Some((-FRAC_PI_2 - 0.4, -FRAC_PI_2 + 0.4))),
    ("L_UpperArm", Some("L_Shoulder"), 1.6, -FRAC_PI_2 + 0.2, 0.7, Some((-PI, PI))),
    ("L_Forearm", Some("L_UpperArm"), 1.4, 0.25, 0.6, Some((-0.2, 2.8))),
    ("L_Hand", Some("L_Forearm"), 0.6, 0.0, 0.5, Some((-1.2, 1.2))),
    ("R_Shoulder", Some("Spine"), 1.0, FRAC_PI_2, 0.8, Some((FRAC_PI_2 - 0.4, FRAC_PI_2 + 0.4))),
    ("R_UpperArm", Some("R_Shoulder"), 1.6, FRAC_PI_2 - 0.2, 0.7, Some((-PI, PI))),
    ("R_Forearm", Some("R_UpperArm"), 1.4, -0.25, 0.6, Some((-2.8, 0.2))),
    ("R_Hand", Some("R_Forearm"), 0.6, 0.0, 0.5, Some((-1.2, 1.2))),
    ("L_Hip", Some("Navel"), 0.6, -FRAC_PI_2, 1.0, Some((-FRAC_PI_2 - 0.3, -FRAC_PI_2 + 0.3))),
    ("L_Thigh", Some("L_Hip"), 2.2, -FRAC_PI_2 + 0.08, 1.0, Some((-PI, PI))),
    ("L_Shin", Some("L_Thigh"), 2.1, 0.1, 0.8, Some((-0.2, 2.8))),
    ("L_Foot", Some("L_Shin"), 0.7, FRAC_PI_2, 0.5, Some((FRAC_PI_2 - 0.6, FRAC_PI_2 + 0.6))),
    ("R_Hip", Some("Navel"), 0.6, FRAC_PI_2, 1.0, Some((FRAC_PI_2 - 0.3, FRAC_PI_2 + 0.3))),
    ("R_Thigh", Some("R_Hip"), 2.2, FRAC_PI_2 - 0.08, 1.0, Some((-PI, PI))),
    ("R_Shin", Some("R_Thigh"), 2.1, -0.1, 0.8, Some((-2.8, 0.2))),
    ("R_Foot", Some("R_Shin"), 0.7, -FRAC_PI_2, 0.5, Some((-FRAC_PI_2 - 0.6, -FRAC_PI_2 + 0.6))),
];

/// T 字姿态相对张力姿态的角度覆盖
const T_POSE: &[(&str, f32)] = &[
    ("Spine", 0.0),
    ("Neck", 0.0),
    ("Head", 0.0),
    ("L_UpperArm", 0.0),
    ("L_Forearm", 0.0),
    ("L_Hand", 0.0),
    ("R_UpperArm", 0.0),
    ("R_Forearm", 0.0),
    ("R_Hand", 0.0),
    ("L_Thigh", -FRAC_PI_2),
    ("L_Shin", 0.0),
    ("R_Thigh", FRAC_PI_2),
    ("R_Shin", 0.0),
];

fn figure_links() -> Vec<BoneLink> {
    FIGURE
        .iter()
        .map(|&(name, parent, units, angle, mass, limits)| {
            let mut link = BoneLink::new(name, units * ANATOMY_UNIT)
                .with_angle(angle)
                .with_mass(mass);
            if let Some(parent) = parent {
                link = link.with_parent(parent);
            }
            if let Some((min, max)) = limits {
                link = link.with_limits(min, max);
            }
            link
        })
        .collect()
}

static TENSION_POSE: Lazy<Result<BoneSet>> = Lazy::new(|| BoneSet::from_links(figure_links()));

static T_POSE_SET: Lazy<Result<BoneSet>> = Lazy::new(|| {
    let mut set = (*TENSION_POSE).clone()?;
    for &(name, angle) in T_POSE {
        set.set_angle(name, angle);
    }
    Ok(set)
});

/// 张力姿态快照（默认站姿）
pub fn tension_pose() -> Result<BoneSet> {
    (*TENSION_POSE).clone()
}

/// T 字姿态快照
pub fn t_pose() -> Result<BoneSet> {
    (*T_POSE_SET).clone()
}

/// 指定模式的参考姿态
///
/// Collapse 没有自己的参考姿态，倒下前的站姿即张力姿态。
pub fn reference_pose(mode: RigMode) -> Result<BoneSet> {
    match mode {
        RigMode::TPose => t_pose(),
        RigMode::Tension | RigMode::Collapse => tension_pose(),
    }
}

// ============================================================================
// 解剖分组
// ============================================================================

/// 解剖分组（用于分组复位和显隐）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoneGroup {
    Head,
    Torso,
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
}

impl BoneGroup {
    pub const ALL: [BoneGroup; 6] = [
        BoneGroup::Head,
        BoneGroup::Torso,
        BoneGroup::LeftArm,
        BoneGroup::RightArm,
        BoneGroup::LeftLeg,
        BoneGroup::RightLeg,
    ];

    pub fn bones(self) -> &'static [&'static str] {
        match self {
            BoneGroup::Head => &["Neck", "Head"],
            BoneGroup::Torso => &["Spine", "L_Shoulder", "R_Shoulder", "L_Hip", "R_Hip"],
            BoneGroup::LeftArm => &["L_UpperArm", "L_Forearm", "L_Hand"],
            BoneGroup::RightArm => &["R_UpperArm", "R_Forearm", "R_Hand"],
            BoneGroup::LeftLeg => &["L_Thigh", "L_Shin", "L_Foot"],
            BoneGroup::RightLeg => &["R_Thigh", "R_Shin", "R_Foot"],
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Head" => Some(BoneGroup::Head),
            "Torso" => Some(BoneGroup::Torso),
            "LeftArm" => Some(BoneGroup::LeftArm),
            "RightArm" => Some(BoneGroup::RightArm),
            "LeftLeg" => Some(BoneGroup::LeftLeg),
            "RightLeg" => Some(BoneGroup::RightLeg),
            _ => None,
        }
    }

    /// 骨骼所属分组
    pub fn of_bone(bone: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.bones().contains(&bone))
    }
}

// ============================================================================
// IK 链
// ============================================================================

static IK_CHAINS: Lazy<Vec<IkChain>> = Lazy::new(|| {
    vec![
        IkChain::new("L_Foot", "L_Thigh", "L_Shin", -1.0),
        IkChain::new("R_Foot", "R_Thigh", "R_Shin", 1.0),
        IkChain::new("L_Hand", "L_UpperArm", "L_Forearm", -1.0),
        IkChain::new("R_Hand", "R_UpperArm", "R_Forearm", 1.0),
    ]
});

/// 全部 IK 链（按 EFFECTOR_ORDER 排列）
pub fn ik_chains() -> &'static [IkChain] {
    &IK_CHAINS
}

/// 末端执行器对应的 IK 链
pub fn ik_chain(effector: &str) -> Option<&'static IkChain> {
    IK_CHAINS.iter().find(|c| c.effector == effector)
}

#[inline]
pub fn is_effector(name: &str) -> bool {
    EFFECTOR_ORDER.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::GlobalPose;
    use glam::Vec2;

    #[test]
    fn figure_table_is_a_valid_tree() {
        let set = tension_pose().unwrap();
        assert_eq!(set.bone_count(), FIGURE.len());
        assert_eq!(set.link(set.root_index()).unwrap().name, ROOT_BONE);
    }

    #[test]
    fn every_grouped_bone_exists_once() {
        let set = tension_pose().unwrap();
        let mut seen = std::collections::HashSet::new();
        for group in BoneGroup::ALL {
            for bone in group.bones() {
                assert!(set.find_bone_by_name(bone).is_some(), "{bone}");
                assert!(seen.insert(*bone), "{bone} in two groups");
            }
        }
        assert_eq!(BoneGroup::of_bone("L_Shin"), Some(BoneGroup::LeftLeg));
        assert_eq!(BoneGroup::from_name("Torso"), Some(BoneGroup::Torso));
        assert_eq!(BoneGroup::of_bone(ROOT_BONE), None);
    }

    #[test]
    fn ik_chains_are_consistent_with_topology() {
        let set = tension_pose().unwrap();
        for (chain, effector) in ik_chains().iter().zip(EFFECTOR_ORDER) {
            assert_eq!(chain.effector, effector);
            let upper = set.find_bone_by_name(&chain.upper).unwrap();
            let lower = set.find_bone_by_name(&chain.lower).unwrap();
            let eff = set.find_bone_by_name(&chain.effector).unwrap();
            assert_eq!(set.parent_of(lower), Some(upper));
            assert_eq!(set.parent_of(eff), Some(lower));
            let expected = if effector.starts_with("L_") { -1.0 } else { 1.0 };
            assert_eq!(chain.bend_direction, expected);
        }
        assert!(ik_chain("Head").is_none());
    }

    #[test]
    fn t_pose_spreads_arms_horizontally() {
        let pose = GlobalPose::resolve(&t_pose().unwrap(), Vec2::ZERO, 0.0);
        let left = pose.get("L_Hand").unwrap();
        let right = pose.get("R_Hand").unwrap();
        let shoulder_y = pose.get("Spine").unwrap().end.y;
        assert!((left.end.y - shoulder_y).abs() < 1e-3);
        assert!((right.end.y - shoulder_y).abs() < 1e-3);
        assert!((left.end.x + right.end.x).abs() < 1e-3);
    }

    #[test]
    fn reference_poses_share_topology() {
        let t = reference_pose(RigMode::TPose).unwrap();
        let tension = reference_pose(RigMode::Tension).unwrap();
        assert!(t.same_topology(&tension));
        assert_ne!(t.angle("L_UpperArm"), tension.angle("L_UpperArm"));
    }
}
