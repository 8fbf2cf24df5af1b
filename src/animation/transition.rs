//! 姿态过渡
//!
//! 在起始快照与目标快照之间按帧线性插值每根骨骼的本地角度以及地面偏移。
//! 到达最后一帧时直接对齐目标快照，消除残余插值误差。

use glam::Vec2;

use crate::error::{Result, RigError};
use crate::runtime::RigMode;
use crate::skeleton::BoneSet;

#[inline]
fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// 姿态过渡状态
///
/// 仅在过渡进行期间存在：开始时创建，每帧推进一次，完成后并入活动骨架。
#[derive(Clone, Debug)]
pub struct PoseTransition {
    start: BoneSet,
    target: BoneSet,
    start_offset: Vec2,
    target_offset: Vec2,
    duration_frames: u32,
    current_frame: u32,
    target_mode: RigMode,
    active: bool,
}

impl PoseTransition {
    /// 创建过渡
    ///
    /// 地面偏移总是回到原点。起始与目标快照拓扑不一致时返回错误。
    pub fn new(
        start: BoneSet,
        start_offset: Vec2,
        target: BoneSet,
        target_mode: RigMode,
        duration_frames: u32,
    ) -> Result<Self> {
        if !start.same_topology(&target) {
            return Err(RigError::TopologyMismatch {
                start: start.bone_count(),
                target: target.bone_count(),
            });
        }

        Ok(Self {
            start,
            target,
            start_offset,
            target_offset: Vec2::ZERO,
            duration_frames: duration_frames.max(1),
            current_frame: 0,
            target_mode,
            active: true,
        })
    }

    /// 推进一帧，写入活动骨架与地面偏移
    ///
    /// 完成时返回需要提交的目标模式。
    pub fn step(&mut self, live: &mut BoneSet, offset: &mut Vec2) -> Option<RigMode> {
        if !self.active {
            return None;
        }

        self.current_frame += 1;

        if self.current_frame >= self.duration_frames {
            for (angle, &target) in live.angles_mut().iter_mut().zip(self.target.angles()) {
                *angle = target;
            }
            *offset = self.target_offset;
            self.active = false;
            return Some(self.target_mode);
        }

        let progress = self.progress();
        for ((angle, &from), &to) in live
            .angles_mut()
            .iter_mut()
            .zip(self.start.angles())
            .zip(self.target.angles())
        {
            *angle = lerp_f32(from, to, progress);
        }
        *offset = self.start_offset.lerp(self.target_offset, progress);
        None
    }

    /// 当前进度 current_frame / duration_frames
    #[inline]
    pub fn progress(&self) -> f32 {
        self.current_frame as f32 / self.duration_frames as f32
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn target_mode(&self) -> RigMode {
        self.target_mode
    }

    #[inline]
    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    #[inline]
    pub fn duration_frames(&self) -> u32 {
        self.duration_frames
    }
}
