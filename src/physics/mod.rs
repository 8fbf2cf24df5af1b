//! 物理系统
//!
//! - config: 全局物理参数
//! - Ragdoll: Collapse 模式下的 Verlet 粒子/约束杆模拟

pub mod config;
mod ragdoll;

pub use config::{get_config, reset_config, set_config, PhysicsConfig};
pub use ragdoll::{BoneBinding, PhysicsPoint, PhysicsStick, Ragdoll};
