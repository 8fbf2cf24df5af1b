//! 骨架运行时
//!
//! 单线程逐帧驱动：每个 tick 只做一件事，由当前活动决定：
//! - Blending: 推进姿态过渡（IK 与手动编辑暂停）
//! - Simulating: 推进布娃娃物理（Collapse 模式）
//! - Idle: 脚锁贴地 → 锁定 IK → 重建锁定链缓存
//!
//! 渲染层只在 tick 完成后读取 `pose()`。

use glam::Vec2;

use crate::animation::PoseTransition;
use crate::constraint::{BoneStatus, LockManager};
use crate::error::{Result, RigError};
use crate::physics::{self, Ragdoll};
use crate::skeleton::anatomy::{self, BoneGroup, DEFAULT_TRANSITION_FRAMES, FLOOR_RATIO};
use crate::skeleton::{BoneSet, GlobalPose};

// ============================================================================
// 模式与锚点
// ============================================================================

/// 骨架模式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RigMode {
    /// T 字姿态
    TPose,
    /// 张力姿态（默认站姿）
    Tension,
    /// 物理倒地（布娃娃）
    Collapse,
}

impl RigMode {
    /// 是否由角度驱动（非物理）
    #[inline]
    pub fn is_posed(self) -> bool {
        !matches!(self, RigMode::Collapse)
    }
}

/// 锚点参数
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnchorTarget {
    GroundX,
    GroundY,
    GlobalRotation,
}

/// 根骨骼锚点
///
/// 肚脐世界位置 = `base + offset`，`base` 由视口决定，`offset` 由用户拖动。
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Anchor {
    pub base: Vec2,
    pub offset: Vec2,
    /// 全局旋转（根骨骼的父朝向）
    pub rotation: f32,
}

impl Anchor {
    #[inline]
    pub fn origin(&self) -> Vec2 {
        self.base + self.offset
    }
}

/// 当前 tick 的唯一写者
#[derive(Clone, Debug)]
enum Activity {
    Idle,
    Blending(PoseTransition),
    Simulating(Ragdoll),
}

// ============================================================================
// 运行时
// ============================================================================

/// 人形骨架运行时
#[derive(Clone, Debug)]
pub struct FigureRig {
    /// 活动骨架（唯一被修改的快照）
    skeleton: BoneSet,
    /// 最近一次输出的全局姿态
    pose: GlobalPose,
    t_pose: BoneSet,
    tension_pose: BoneSet,
    anchor: Anchor,
    floor_y: f32,
    mode: RigMode,
    /// 最近一次角度驱动的模式（退出 Collapse 时回到这里）
    posed_mode: RigMode,
    locks: LockManager,
    activity: Activity,
}

impl FigureRig {
    /// 以张力姿态创建，视口尺寸决定地面与肚脐基准位置
    pub fn new(width: f32, height: f32) -> Result<Self> {
        let tension_pose = anatomy::tension_pose()?;
        let t_pose = anatomy::t_pose()?;
        let skeleton = tension_pose.clone();
        let pose = GlobalPose::resolve(&skeleton, Vec2::ZERO, 0.0);

        let mut rig = Self {
            skeleton,
            pose,
            t_pose,
            tension_pose,
            anchor: Anchor::default(),
            floor_y: 0.0,
            mode: RigMode::Tension,
            posed_mode: RigMode::Tension,
            locks: LockManager::new(),
            activity: Activity::Idle,
        };
        rig.set_viewport(width, height);
        log::info!(
            "骨架运行时初始化: {} 骨骼, 地面 y={:.1}",
            rig.skeleton.bone_count(),
            rig.floor_y
        );
        Ok(rig)
    }

    /// 视口变化：重新计算地面高度与肚脐基准位置
    ///
    /// 基准位置使张力姿态在零偏移下脚踝正好落在地面上。
    /// 脚锁随地面移动；Collapse 中已固定的脚部粒子同步移到新地面上。
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.floor_y = height * FLOOR_RATIO;
        let drop = ankle_drop(&self.tension_pose);
        self.anchor.base = Vec2::new(width * 0.5, self.floor_y - drop);
        self.locks.glue_feet_to_floor(self.floor_y);
        if let Activity::Simulating(ragdoll) = &mut self.activity {
            pin_locked_joints(&self.skeleton, &self.locks, ragdoll);
        }
        if matches!(self.activity, Activity::Idle) {
            self.refresh_pose();
        }
        log::debug!(
            "视口 {}x{}: 地面 y={:.1}, 基准 ({:.1}, {:.1})",
            width,
            height,
            self.floor_y,
            self.anchor.base.x,
            self.anchor.base.y
        );
    }

    // ========================================
    // 逐帧驱动
    // ========================================

    /// 推进一个 tick
    pub fn tick(&mut self) {
        let committed = match &mut self.activity {
            Activity::Blending(transition) => {
                let committed = transition.step(&mut self.skeleton, &mut self.anchor.offset);
                self.pose = GlobalPose::resolve(&self.skeleton, self.anchor.origin(), self.anchor.rotation);
                committed
            }
            Activity::Simulating(ragdoll) => {
                let config = physics::get_config();
                ragdoll.step_simulation(&config, self.floor_y);
                self.pose = ragdoll.global_pose(&self.skeleton, self.anchor.rotation);
                None
            }
            Activity::Idle => {
                self.locks.glue_feet_to_floor(self.floor_y);
                self.pose = self
                    .locks
                    .solve(&mut self.skeleton, self.anchor.origin(), self.anchor.rotation);
                self.locks.rebuild_locked_chain(&self.skeleton);
                None
            }
        };

        if let Some(mode) = committed {
            self.activity = Activity::Idle;
            self.commit_mode(mode);
        }
    }

    fn commit_mode(&mut self, mode: RigMode) {
        log::info!("过渡完成: {:?}", mode);
        if mode.is_posed() {
            self.mode = mode;
            self.posed_mode = mode;
        } else {
            self.engage_physics();
        }
    }

    /// 不经过 IK 重新解算当前骨架
    fn refresh_pose(&mut self) {
        self.pose = GlobalPose::resolve(&self.skeleton, self.anchor.origin(), self.anchor.rotation);
    }

    // ========================================
    // 手动编辑
    // ========================================

    /// 是否允许手动编辑（过渡中或 Collapse 模式下禁止）
    #[inline]
    fn accepts_edits(&self) -> bool {
        matches!(self.activity, Activity::Idle) && self.mode.is_posed()
    }

    /// 设置骨骼本地角度（限制在关节范围内）
    ///
    /// 位于锁定链上的骨骼拒绝修改，已锁定的末端自身除外。
    pub fn set_bone_angle(&mut self, name: &str, radians: f32) -> bool {
        if !self.accepts_edits() || self.locks.is_in_locked_chain(name, false) {
            return false;
        }
        let Some(clamped) = self.skeleton.link_by_name(name).map(|l| l.clamp_angle(radians)) else {
            return false;
        };
        self.skeleton.set_angle(name, clamped)
    }

    /// 设置锚点参数
    pub fn set_anchor_value(&mut self, target: AnchorTarget, value: f32) -> bool {
        if !self.accepts_edits() {
            return false;
        }
        match target {
            AnchorTarget::GroundX => self.anchor.offset.x = value,
            AnchorTarget::GroundY => self.anchor.offset.y = value,
            AnchorTarget::GlobalRotation => self.anchor.rotation = value,
        }
        true
    }

    /// 将分组内骨骼复位为当前模式的参考姿态，返回复位的骨骼数
    ///
    /// 过渡中或 Collapse 模式下为空操作；锁定链上的骨骼跳过。
    pub fn reset_group(&mut self, group: BoneGroup) -> usize {
        if !self.accepts_edits() {
            return 0;
        }
        let reference = match self.mode {
            RigMode::TPose => &self.t_pose,
            RigMode::Tension | RigMode::Collapse => &self.tension_pose,
        };

        let mut count = 0;
        for &bone in group.bones() {
            if self.locks.is_in_locked_chain(bone, false) {
                continue;
            }
            if let Some(angle) = reference.angle(bone) {
                if self.skeleton.set_angle(bone, angle) {
                    count += 1;
                }
            }
        }
        count
    }

    pub fn set_bone_visible(&mut self, name: &str, visible: bool) -> bool {
        self.skeleton.set_visible(name, visible)
    }

    /// 设置分组显隐，返回修改的骨骼数
    pub fn set_group_visible(&mut self, group: BoneGroup, visible: bool) -> usize {
        group
            .bones()
            .iter()
            .filter(|bone| self.skeleton.set_visible(bone, visible))
            .count()
    }

    // ========================================
    // 锁定
    // ========================================

    /// 切换末端锁定，返回切换后是否处于锁定
    ///
    /// Collapse 模式下先冻结布娃娃当前姿态并回到之前的角度驱动模式。
    pub fn toggle_lock(&mut self, effector: &str) -> Result<bool> {
        if !self.locks.is_effector(effector) {
            return Err(RigError::InvalidEffector(effector.to_string()));
        }
        if self.is_simulating() {
            self.exit_collapse();
        }
        self.refresh_pose();
        self.locks.toggle_lock(effector, &self.skeleton, &self.pose)
    }

    /// 清除全部锁定；Collapse 中同时释放布娃娃上的固定粒子
    pub fn clear_all_locks(&mut self) {
        self.locks.clear_all_locks();
        if let Activity::Simulating(ragdoll) = &mut self.activity {
            let released = ragdoll.unpin_all();
            log::debug!("清除锁定，释放 {} 个固定粒子", released);
        }
    }

    // ========================================
    // 模式切换
    // ========================================

    /// 开始姿态过渡
    ///
    /// 物理模拟中会先把粒子位置读回骨骼角度，过渡从布娃娃的实际姿态开始；
    /// 进行中的过渡被丢弃，从当前中间姿态重新开始。
    pub fn start_transition(&mut self, target: BoneSet, target_mode: RigMode, duration_frames: Option<u32>) -> Result<()> {
        if !self.skeleton.same_topology(&target) {
            return Err(RigError::TopologyMismatch {
                start: self.skeleton.bone_count(),
                target: target.bone_count(),
            });
        }
        if self.is_simulating() {
            self.freeze_ragdoll();
        }

        let duration = duration_frames.unwrap_or(DEFAULT_TRANSITION_FRAMES);
        let transition = PoseTransition::new(
            self.skeleton.clone(),
            self.anchor.offset,
            target,
            target_mode,
            duration,
        )?;
        log::info!("开始过渡: {:?} -> {:?} ({} 帧)", self.mode, target_mode, duration);
        self.activity = Activity::Blending(transition);
        Ok(())
    }

    /// 切换到指定模式（Collapse 直接进入物理，其余模式过渡到参考姿态）
    pub fn transition_to(&mut self, mode: RigMode) -> Result<()> {
        match mode {
            RigMode::Collapse => {
                self.set_collapse_mode();
                Ok(())
            }
            RigMode::TPose => self.start_transition(self.t_pose.clone(), mode, None),
            RigMode::Tension => self.start_transition(self.tension_pose.clone(), mode, None),
        }
    }

    /// 进入 Collapse 模式
    pub fn set_collapse_mode(&mut self) {
        if self.is_simulating() {
            return;
        }
        if let Activity::Blending(transition) = &self.activity {
            log::debug!("过渡在第 {} 帧被 Collapse 打断", transition.current_frame());
        }
        self.engage_physics();
    }

    fn engage_physics(&mut self) {
        self.refresh_pose();
        let config = physics::get_config();
        let mut ragdoll = Ragdoll::build_physics(&self.skeleton, &self.pose, &config);
        pin_locked_joints(&self.skeleton, &self.locks, &mut ragdoll);

        self.pose = ragdoll.global_pose(&self.skeleton, self.anchor.rotation);
        self.mode = RigMode::Collapse;
        self.activity = Activity::Simulating(ragdoll);
        log::info!("进入 Collapse 模式");
    }

    /// 退出 Collapse：冻结布娃娃当前姿态，回到之前的角度驱动模式
    ///
    /// 未处于物理模拟时返回 false。
    pub fn exit_collapse(&mut self) -> bool {
        if !self.is_simulating() {
            return false;
        }
        self.freeze_ragdoll();
        self.mode = self.posed_mode;
        self.refresh_pose();
        log::info!("退出 Collapse 模式，回到 {:?}", self.mode);
        true
    }

    /// 粒子位置读回骨骼角度，并由肚脐粒子位移重新推出地面偏移
    fn freeze_ragdoll(&mut self) {
        let activity = std::mem::replace(&mut self.activity, Activity::Idle);
        if let Activity::Simulating(ragdoll) = activity {
            ragdoll.sync_bones(&mut self.skeleton, self.anchor.rotation);
            self.anchor.offset = ragdoll.root_position() - self.anchor.base;
        }
    }

    // ========================================
    // 访问器
    // ========================================

    #[inline]
    pub fn skeleton(&self) -> &BoneSet {
        &self.skeleton
    }

    /// 最近一次 tick 输出的全局姿态
    #[inline]
    pub fn pose(&self) -> &GlobalPose {
        &self.pose
    }

    #[inline]
    pub fn mode(&self) -> RigMode {
        self.mode
    }

    #[inline]
    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    #[inline]
    pub fn floor_y(&self) -> f32 {
        self.floor_y
    }

    #[inline]
    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    pub fn bone_status(&self, name: &str) -> Option<BoneStatus> {
        self.locks.bone_status(&self.skeleton, name)
    }

    pub fn reference_pose(&self, mode: RigMode) -> &BoneSet {
        match mode {
            RigMode::TPose => &self.t_pose,
            RigMode::Tension | RigMode::Collapse => &self.tension_pose,
        }
    }

    #[inline]
    pub fn is_transitioning(&self) -> bool {
        matches!(self.activity, Activity::Blending(_))
    }

    #[inline]
    pub fn is_simulating(&self) -> bool {
        matches!(self.activity, Activity::Simulating(_))
    }

    pub fn transition(&self) -> Option<&PoseTransition> {
        match &self.activity {
            Activity::Blending(transition) => Some(transition),
            _ => None,
        }
    }

    pub fn ragdoll(&self) -> Option<&Ragdoll> {
        match &self.activity {
            Activity::Simulating(ragdoll) => Some(ragdoll),
            _ => None,
        }
    }
}

/// 锁定末端的关节粒子固定在锁定点上
fn pin_locked_joints(skeleton: &BoneSet, locks: &LockManager, ragdoll: &mut Ragdoll) {
    for (effector, target) in locks.locks() {
        let joint = skeleton
            .find_bone_by_name(effector)
            .and_then(|i| ragdoll.binding(i))
            .map(|b| b.start);
        match joint {
            Some(index) => {
                ragdoll.pin_point(index, target);
            }
            None => log::warn!("锁定末端 '{}' 没有对应粒子", effector),
        }
    }
}

/// 参考姿态下肚脐到最低脚踝的竖直距离
fn ankle_drop(reference: &BoneSet) -> f32 {
    let pose = GlobalPose::resolve(reference, Vec2::ZERO, 0.0);
    anatomy::ik_chains()
        .iter()
        .filter(|c| c.effector.ends_with(anatomy::FOOT_SUFFIX))
        .filter_map(|c| pose.get(&c.lower))
        .map(|shin| shin.end.y)
        .fold(0.0, f32::max)
}
