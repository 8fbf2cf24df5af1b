//! Verlet 布娃娃（Collapse 模式）
//!
//! 流程：build_physics → 每帧 step_simulation → 退出时 sync_bones。
//! 每根非零长度骨骼对应一根刚性约束杆；关节按世界坐标重合去重，
//! 父骨骼终点和子骨骼起点共享同一个粒子，松弛时关节不会被拉开。

use glam::Vec2;

use super::config::PhysicsConfig;
use crate::skeleton::{BoneSet, BoneWorld, GlobalPose};

// ============================================================================
// 粒子与约束杆
// ============================================================================

/// 质点
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsPoint {
    /// 当前位置
    pub position: Vec2,
    /// 上一帧位置（隐式速度）
    pub old_position: Vec2,
    /// 固定点不参与积分和约束位移
    pub pinned: bool,
}

impl PhysicsPoint {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            old_position: position,
            pinned: false,
        }
    }

    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.position - self.old_position
    }
}

/// 刚性距离约束
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsStick {
    pub a: usize,
    pub b: usize,
    /// 静止长度（进入物理时骨骼的长度）
    pub length: f32,
}

/// 骨骼到粒子的绑定
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneBinding {
    pub start: usize,
    pub end: usize,
    /// 零长度骨骼没有约束杆
    pub stick: Option<usize>,
}

// ============================================================================
// 布娃娃
// ============================================================================

/// Verlet 布娃娃
#[derive(Clone, Debug)]
pub struct Ragdoll {
    points: Vec<PhysicsPoint>,
    sticks: Vec<PhysicsStick>,
    /// 按骨骼索引
    bindings: Vec<BoneBinding>,
    root_bone: usize,
}

impl Ragdoll {
    /// 从已解算的骨架构建粒子/约束图（一次性）
    pub fn build_physics(skeleton: &BoneSet, pose: &GlobalPose, config: &PhysicsConfig) -> Self {
        let mut ragdoll = Self {
            points: Vec::new(),
            sticks: Vec::new(),
            bindings: Vec::with_capacity(skeleton.bone_count()),
            root_bone: skeleton.root_index(),
        };

        for (idx, link) in skeleton.links().enumerate() {
            let world = pose.at(idx).copied().unwrap_or_default();
            let start = ragdoll.find_or_insert(world.start, config.joint_merge_epsilon);
            let end = if link.is_degenerate() {
                start
            } else {
                ragdoll.find_or_insert(world.end, config.joint_merge_epsilon)
            };

            let stick = (!link.is_degenerate() && start != end).then(|| {
                ragdoll.sticks.push(PhysicsStick {
                    a: start,
                    b: end,
                    length: link.length,
                });
                ragdoll.sticks.len() - 1
            });

            ragdoll.bindings.push(BoneBinding { start, end, stick });
        }

        log::info!(
            "布娃娃构建完成: {} 粒子, {} 约束杆 ({} 骨骼)",
            ragdoll.points.len(),
            ragdoll.sticks.len(),
            skeleton.bone_count()
        );

        ragdoll
    }

    /// 按位置查找已有粒子，没有则新建
    fn find_or_insert(&mut self, position: Vec2, epsilon: f32) -> usize {
        let eps_sq = epsilon * epsilon;
        if let Some(i) = self
            .points
            .iter()
            .position(|p| p.position.distance_squared(position) <= eps_sq)
        {
            return i;
        }
        self.points.push(PhysicsPoint::new(position));
        self.points.len() - 1
    }

    /// 固定粒子并把它移到 `position`（锁定点），清零其隐式速度
    pub fn pin_point(&mut self, index: usize, position: Vec2) -> bool {
        match self.points.get_mut(index) {
            Some(point) => {
                point.position = position;
                point.old_position = position;
                point.pinned = true;
                true
            }
            None => false,
        }
    }

    /// 解除全部固定点，返回解除的数量
    pub fn unpin_all(&mut self) -> usize {
        let mut count = 0;
        for point in self.points.iter_mut().filter(|p| p.pinned) {
            point.pinned = false;
            count += 1;
        }
        count
    }

    #[inline]
    pub fn pinned_count(&self) -> usize {
        self.points.iter().filter(|p| p.pinned).count()
    }

    // ========================================
    // 模拟
    // ========================================

    /// 步进一个 tick：积分 → 约束松弛 → 地面碰撞
    pub fn step_simulation(&mut self, config: &PhysicsConfig, floor_y: f32) {
        self.integrate(config.gravity_step());
        self.relax(config.relax_iterations);
        self.collide_floor(floor_y);

        if config.debug_log {
            let root = self.root_position();
            log::debug!("布娃娃步进: 根粒子 ({:.2}, {:.2})", root.x, root.y);
        }
    }

    /// Verlet 位置积分
    pub fn integrate(&mut self, gravity_step: f32) {
        for point in self.points.iter_mut().filter(|p| !p.pinned) {
            let velocity = point.velocity();
            point.old_position = point.position;
            point.position += velocity;
            point.position.y += gravity_step;
        }
    }

    /// 约束松弛（Gauss-Seidel，按约束杆列表固定顺序）
    ///
    /// 每根杆两端各承担一半修正；固定点不移动。两端重合时跳过。
    pub fn relax(&mut self, iterations: usize) {
        for _ in 0..iterations {
            for stick in &self.sticks {
                let (pa, pb) = (self.points[stick.a], self.points[stick.b]);
                let delta = pb.position - pa.position;
                let distance = delta.length();
                if distance <= f32::EPSILON {
                    continue;
                }

                let difference = (stick.length - distance) / distance;
                let offset = delta * difference * 0.5;
                if !pa.pinned {
                    self.points[stick.a].position -= offset;
                }
                if !pb.pinned {
                    self.points[stick.b].position += offset;
                }
            }
        }
    }

    /// 地面碰撞：粒子不能低于地面线（固定点除外）
    pub fn collide_floor(&mut self, floor_y: f32) {
        for point in self.points.iter_mut().filter(|p| !p.pinned) {
            if point.position.y > floor_y {
                point.position.y = floor_y;
            }
        }
    }

    // ========================================
    // 读回
    // ========================================

    /// 每根骨骼的世界角度（按骨骼名记忆化，共享关节不重复计算）
    ///
    /// 非零长度骨骼取两端粒子的 atan2；零长度骨骼没有方向，沿用父朝向加当前本地角度。
    fn world_angles(&self, skeleton: &BoneSet, root_angle: f32) -> Vec<f32> {
        let mut memo: Vec<Option<f32>> = vec![None; skeleton.bone_count()];
        for idx in 0..skeleton.bone_count() {
            self.world_angle(skeleton, idx, root_angle, &mut memo);
        }
        memo.into_iter().map(|a| a.unwrap_or(root_angle)).collect()
    }

    /// 单根骨骼的世界角度
    ///
    /// 肚脐是零长度骨骼，两端共用一个粒子，没有可用的 atan2 方向，
    /// 因此保留其本地角度（相对全局旋转）作为根朝向，不从粒子重新推出。
    /// 子骨骼的世界角度各自取自粒子，读回后的关节位置不受影响。
    fn world_angle(&self, skeleton: &BoneSet, idx: usize, root_angle: f32, memo: &mut [Option<f32>]) -> f32 {
        if let Some(angle) = memo[idx] {
            return angle;
        }

        let binding = self.bindings[idx];
        let angle = if binding.stick.is_some() {
            let delta = self.points[binding.end].position - self.points[binding.start].position;
            delta.y.atan2(delta.x)
        } else {
            let parent_angle = match skeleton.parent_of(idx) {
                Some(parent) => self.world_angle(skeleton, parent, root_angle, memo),
                None => root_angle,
            };
            parent_angle + skeleton.angle_at(idx).unwrap_or(0.0)
        };

        memo[idx] = Some(angle);
        angle
    }

    /// 将粒子位置写回骨骼本地角度
    ///
    /// 自上而下：本地角度 = 自身世界角度 − 父世界角度；根骨骼相对 `root_angle`。
    pub fn sync_bones(&self, skeleton: &mut BoneSet, root_angle: f32) {
        let world = self.world_angles(skeleton, root_angle);
        for (idx, &angle) in world.iter().enumerate() {
            let parent_angle = skeleton
                .parent_of(idx)
                .map(|p| world[p])
                .unwrap_or(root_angle);
            skeleton.set_angle_at(idx, angle - parent_angle);
        }
    }

    /// 直接由粒子位置生成的全局姿态（模拟期间的输出帧）
    pub fn global_pose(&self, skeleton: &BoneSet, root_angle: f32) -> GlobalPose {
        let world = self.world_angles(skeleton, root_angle);
        let bones = self
            .bindings
            .iter()
            .zip(world)
            .map(|(binding, angle)| BoneWorld {
                start: self.points[binding.start].position,
                end: self.points[binding.end].position,
                angle,
            })
            .collect();
        GlobalPose::from_parts(skeleton, bones)
    }

    // ========================================
    // 访问器
    // ========================================

    /// 根骨骼（肚脐）所在粒子的位置
    pub fn root_position(&self) -> Vec2 {
        self.bindings
            .get(self.root_bone)
            .map(|b| self.points[b.start].position)
            .unwrap_or(Vec2::ZERO)
    }

    pub fn points(&self) -> &[PhysicsPoint] {
        &self.points
    }

    pub fn sticks(&self) -> &[PhysicsStick] {
        &self.sticks
    }

    pub fn binding(&self, bone_index: usize) -> Option<&BoneBinding> {
        self.bindings.get(bone_index)
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn stick_count(&self) -> usize {
        self.sticks.len()
    }
}
