//! 约束系统
//!
//! - LockManager: 末端锁定、锁定链缓存与 IK 驱动
//! - BoneStatus: 每根骨骼的锁定/可见状态（供渲染层着色）

mod lock_manager;

pub use lock_manager::LockManager;

use bitflags::bitflags;

bitflags! {
    /// 骨骼状态标志位
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct BoneStatus: u32 {
        /// 可见
        const VISIBLE = 1 << 0;
        /// 可锁定的末端执行器
        const EFFECTOR = 1 << 1;
        /// 已锁定的末端执行器
        const LOCKED_EFFECTOR = 1 << 2;
        /// 位于锁定链上（禁止手动旋转）
        const IN_LOCKED_CHAIN = 1 << 3;
    }
}

impl BoneStatus {
    #[inline]
    pub fn is_constrained(&self) -> bool {
        self.contains(BoneStatus::IN_LOCKED_CHAIN)
    }
}
