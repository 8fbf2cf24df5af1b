//! 错误类型

use thiserror::Error;

/// 骨架系统错误
///
/// 几何退化情况（IK 不可达、零长度约束）不属于错误，由求解器内部吸收。
#[derive(Clone, Debug, Error)]
pub enum RigError {
    /// 两个骨架快照的拓扑结构不一致，无法逐骨骼插值
    #[error("skeleton topology mismatch: start has {start} bones, target has {target} bones")]
    TopologyMismatch { start: usize, target: usize },

    /// 不在末端执行器白名单中的骨骼不能被锁定
    #[error("bone '{0}' is not a lockable end-effector")]
    InvalidEffector(String),

    /// 骨骼定义表无法构成一棵合法的树
    #[error("invalid skeleton topology: {0}")]
    InvalidTopology(String),
}

pub type Result<T> = std::result::Result<T, RigError>;
