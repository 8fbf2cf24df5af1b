//! 末端锁定管理器
//!
//! 锁定项把末端执行器名称映射到世界空间固定点。每帧交互渲染前：
//! 1. 脚部锁定点贴地
//! 2. 按固定顺序对每个锁定的末端求解 IK
//! 3. 重建锁定链缓存（从末端沿父指针直到根，不含根）

use std::collections::{HashMap, HashSet};

use glam::Vec2;

use super::BoneStatus;
use crate::error::{Result, RigError};
use crate::skeleton::anatomy::{self, FOOT_SUFFIX};
use crate::skeleton::{BoneSet, GlobalPose, IkChain};

/// 末端锁定管理器
#[derive(Clone, Debug)]
pub struct LockManager {
    /// IK 链（顺序即求值顺序，也是锁定白名单）
    chains: Vec<IkChain>,
    /// 末端名称 -> 固定点
    locks: HashMap<String, Vec2>,
    /// 锁定链缓存
    locked_chain: HashSet<String>,
}

impl LockManager {
    /// 使用人体骨架的四条肢体 IK 链
    pub fn new() -> Self {
        Self::with_chains(anatomy::ik_chains().to_vec())
    }

    pub fn with_chains(chains: Vec<IkChain>) -> Self {
        Self {
            chains,
            locks: HashMap::new(),
            locked_chain: HashSet::new(),
        }
    }

    /// 是否为可锁定的末端执行器
    pub fn is_effector(&self, name: &str) -> bool {
        self.chains.iter().any(|c| c.effector == name)
    }

    // ========================================
    // 锁定操作
    // ========================================

    /// 切换锁定状态，返回切换后是否处于锁定
    ///
    /// 锁定时捕获末端父关节（而非末端自身尖端）的当前世界位置，
    /// 需要调用方先刷新 `pose`。
    pub fn toggle_lock(&mut self, effector: &str, skeleton: &BoneSet, pose: &GlobalPose) -> Result<bool> {
        if !self.is_effector(effector) {
            return Err(RigError::InvalidEffector(effector.to_string()));
        }

        if self.locks.remove(effector).is_some() {
            log::debug!("解除锁定: {}", effector);
            self.rebuild_locked_chain(skeleton);
            return Ok(false);
        }

        let pin = skeleton
            .find_bone_by_name(effector)
            .and_then(|i| skeleton.parent_of(i))
            .and_then(|p| pose.at(p))
            .map(|parent| parent.end);

        match pin {
            Some(pin) => {
                log::debug!("锁定 {} 于 ({:.1}, {:.1})", effector, pin.x, pin.y);
                self.locks.insert(effector.to_string(), pin);
                self.rebuild_locked_chain(skeleton);
                Ok(true)
            }
            None => {
                log::warn!("末端 '{}' 不在骨架中，忽略锁定", effector);
                Ok(false)
            }
        }
    }

    /// 清除全部锁定
    pub fn clear_all_locks(&mut self) {
        self.locks.clear();
        self.locked_chain.clear();
    }

    #[inline]
    pub fn is_locked(&self, effector: &str) -> bool {
        self.locks.contains_key(effector)
    }

    #[inline]
    pub fn lock_target(&self, effector: &str) -> Option<Vec2> {
        self.locks.get(effector).copied()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// 按求值顺序列出锁定项
    pub fn locks(&self) -> Vec<(&str, Vec2)> {
        self.chains
            .iter()
            .filter_map(|c| self.locks.get(&c.effector).map(|&p| (c.effector.as_str(), p)))
            .collect()
    }

    // ========================================
    // 锁定链
    // ========================================

    /// 重建锁定链缓存
    ///
    /// 骨架快照每帧都会变化，使用前必须重建，不做增量维护。
    pub fn rebuild_locked_chain(&mut self, skeleton: &BoneSet) {
        self.locked_chain.clear();
        for effector in self.locks.keys() {
            let Some(idx) = skeleton.find_bone_by_name(effector) else {
                continue;
            };
            for bone in skeleton.path_to_root(idx) {
                if let Some(link) = skeleton.link(bone) {
                    self.locked_chain.insert(link.name.clone());
                }
            }
        }
    }

    /// 骨骼是否位于锁定链上
    ///
    /// `include_effector` 为 false 时，已锁定的末端自身不算受约束（仍可手动旋转）。
    pub fn is_in_locked_chain(&self, bone: &str, include_effector: bool) -> bool {
        if !self.locked_chain.contains(bone) {
            return false;
        }
        include_effector || !self.locks.contains_key(bone)
    }

    // ========================================
    // 每帧求解
    // ========================================

    /// 脚部锁定点贴地
    ///
    /// 视口变化导致地面高度变化时，水平拖动过的脚锁仍然贴在地面上。
    pub fn glue_feet_to_floor(&mut self, floor_y: f32) {
        for (name, pin) in self.locks.iter_mut() {
            if name.ends_with(FOOT_SUFFIX) {
                pin.y = floor_y;
            }
        }
    }

    /// 对所有锁定末端按固定顺序求解 IK，返回最终解算的全局姿态
    ///
    /// 每条链求解后重新解算，后续链读取到的是最新的链根位置。
    pub fn solve(&self, skeleton: &mut BoneSet, origin: Vec2, root_angle: f32) -> GlobalPose {
        let mut pose = GlobalPose::resolve(skeleton, origin, root_angle);
        for chain in &self.chains {
            let Some(&target) = self.locks.get(&chain.effector) else {
                continue;
            };
            if chain.solve(skeleton, &pose, target).is_some() {
                pose = GlobalPose::resolve(skeleton, origin, root_angle);
            }
        }
        pose
    }

    /// 单根骨骼的状态标志
    pub fn bone_status(&self, skeleton: &BoneSet, bone: &str) -> Option<BoneStatus> {
        let visible = skeleton.is_visible(bone)?;
        let mut status = BoneStatus::empty();
        status.set(BoneStatus::VISIBLE, visible);
        status.set(BoneStatus::EFFECTOR, self.is_effector(bone));
        status.set(BoneStatus::LOCKED_EFFECTOR, self.is_locked(bone));
        status.set(BoneStatus::IN_LOCKED_CHAIN, self.is_in_locked_chain(bone, false));
        Some(status)
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}
