//! 动画系统
//!
//! 提供模式切换时的姿态过渡插值。

mod transition;

pub use transition::PoseTransition;
