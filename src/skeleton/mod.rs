//! 骨骼系统
//!
//! 核心设计思想：
//! - BoneLink: 单个骨骼节点的静态定义
//! - BoneSet: 骨架快照，共享只读拓扑，角度按快照独立
//! - GlobalPose: 正向运动学解算结果
//! - IkChain: 两骨骼解析 IK
//! - anatomy: 人体骨架静态数据

pub mod anatomy;
mod bone_link;
mod bone_set;
mod global_pose;
mod ik_solver;

pub use anatomy::BoneGroup;
pub use bone_link::BoneLink;
pub use bone_set::BoneSet;
pub use global_pose::{BoneWorld, GlobalPose};
pub use ik_solver::{solve_two_bone, IkChain, IkOutcome};

// ============================================================================
// 类型别名
// ============================================================================

/// Skeleton 别名
pub type Skeleton = BoneSet;
