//! 2D 骨架绑定引擎
//!
//! - skeleton: 骨骼树、全局姿态解算、两骨骼 IK
//! - constraint: 末端锁定与锁定链
//! - animation: 姿态过渡插值
//! - physics: Verlet 布娃娃（Collapse 模式）
//! - runtime: 单线程逐帧驱动

pub mod animation;
pub mod constraint;
pub mod error;
pub mod physics;
pub mod runtime;
pub mod skeleton;

pub use error::{Result, RigError};
pub use runtime::{AnchorTarget, FigureRig, RigMode};
pub use skeleton::{BoneSet, GlobalPose, Skeleton};
