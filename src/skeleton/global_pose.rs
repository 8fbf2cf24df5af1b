//! 全局姿态解算（正向运动学）
//!
//! 输入根位置、父朝向与各骨骼本地角度，输出每根骨骼的世界起点、终点和累积角度。
//! 结果是独立的派生数据，不回写到骨架快照上。

use std::sync::Arc;

use glam::Vec2;

use super::bone_set::{BoneSet, Topology};

/// 单根骨骼的世界空间姿态
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoneWorld {
    /// 起点关节
    pub start: Vec2,
    /// 终点关节
    pub end: Vec2,
    /// 累积世界角度
    pub angle: f32,
}

/// 已解算的全局姿态，按骨骼索引存储
#[derive(Clone, Debug)]
pub struct GlobalPose {
    topology: Arc<Topology>,
    bones: Vec<BoneWorld>,
}

impl GlobalPose {
    /// 从根骨骼开始递归解算
    ///
    /// `origin` 是根骨骼起点（肚脐锚点），`parent_angle` 是根骨骼的父朝向（全局旋转）。
    pub fn resolve(skeleton: &BoneSet, origin: Vec2, parent_angle: f32) -> Self {
        let mut pose = Self {
            topology: skeleton.topology().clone(),
            bones: vec![BoneWorld::default(); skeleton.bone_count()],
        };
        pose.resolve_recursive(skeleton, skeleton.root_index(), origin, parent_angle);
        pose
    }

    fn resolve_recursive(&mut self, skeleton: &BoneSet, idx: usize, origin: Vec2, parent_angle: f32) {
        let Some(link) = skeleton.link(idx) else {
            return;
        };
        let angle = parent_angle + skeleton.angle_at(idx).unwrap_or(0.0);
        let end = origin + Vec2::from_angle(angle) * link.length;
        self.bones[idx] = BoneWorld {
            start: origin,
            end,
            angle,
        };

        for &child in link.children() {
            self.resolve_recursive(skeleton, child, end, angle);
        }
    }

    /// 由外部（物理粒子）直接给出的姿态
    pub(crate) fn from_parts(skeleton: &BoneSet, bones: Vec<BoneWorld>) -> Self {
        debug_assert_eq!(bones.len(), skeleton.bone_count());
        Self {
            topology: skeleton.topology().clone(),
            bones,
        }
    }

    /// 通过名称获取骨骼世界姿态
    pub fn get(&self, name: &str) -> Option<&BoneWorld> {
        self.topology
            .name_to_index
            .get(name)
            .and_then(|&i| self.bones.get(i))
    }

    #[inline]
    pub fn at(&self, index: usize) -> Option<&BoneWorld> {
        self.bones.get(index)
    }

    /// 按骨骼定义顺序遍历 (名称, 世界姿态)
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoneWorld)> {
        self.topology
            .links
            .iter()
            .zip(&self.bones)
            .map(|(link, world)| (link.name.as_str(), world))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::BoneLink;
    use std::f32::consts::FRAC_PI_2;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn single_bone_follows_local_angle() {
        let theta = 0.7_f32;
        let set = BoneSet::from_links(vec![BoneLink::new("Bone", 5.0).with_angle(theta)]).unwrap();
        let pose = GlobalPose::resolve(&set, Vec2::ZERO, 0.0);
        let bone = pose.get("Bone").unwrap();
        assert!(close(bone.start, Vec2::ZERO));
        assert!(close(bone.end, Vec2::new(5.0 * theta.cos(), 5.0 * theta.sin())));
        assert!((bone.angle - theta).abs() < 1e-6);
    }

    #[test]
    fn zero_angle_chain_extends_along_parent_angle() {
        let set = BoneSet::from_links(vec![
            BoneLink::new("Root", 0.0),
            BoneLink::new("A", 3.0).with_parent("Root"),
            BoneLink::new("B", 4.0).with_parent("A"),
        ])
        .unwrap();
        let origin = Vec2::new(10.0, 20.0);
        let pose = GlobalPose::resolve(&set, origin, FRAC_PI_2);

        let a = pose.get("A").unwrap();
        let b = pose.get("B").unwrap();
        assert!(close(a.start, origin));
        assert!(close(a.end, origin + Vec2::new(0.0, 3.0)));
        assert!(close(b.start, a.end));
        assert!(close(b.end, a.end + Vec2::new(0.0, 4.0)));
        assert!((b.angle - FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn angles_accumulate_down_the_tree() {
        let set = BoneSet::from_links(vec![
            BoneLink::new("Root", 2.0).with_angle(0.25),
            BoneLink::new("Left", 1.0).with_parent("Root").with_angle(0.5),
            BoneLink::new("Right", 1.0).with_parent("Root").with_angle(-0.5),
        ])
        .unwrap();
        let pose = GlobalPose::resolve(&set, Vec2::ZERO, 0.0);
        assert!((pose.get("Left").unwrap().angle - 0.75).abs() < 1e-6);
        assert!((pose.get("Right").unwrap().angle + 0.25).abs() < 1e-6);
        assert_eq!(pose.get("Left").unwrap().start, pose.get("Root").unwrap().end);
        assert_eq!(pose.iter().count(), 3);
    }
}
