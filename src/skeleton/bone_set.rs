//! 骨骼集合
//!
//! 拓扑（名称、长度、父子关系）放在 Arc 中由所有快照只读共享；
//! 角度与可见性按快照独立保存，clone 即深拷贝，快照之间互不影响。

use std::collections::HashMap;
use std::sync::Arc;

use super::bone_link::BoneLink;
use crate::error::{Result, RigError};

// ============================================================================
// 拓扑
// ============================================================================

/// 骨骼树拓扑（加载后不可变）
#[derive(Debug)]
pub(crate) struct Topology {
    pub(crate) links: Vec<BoneLink>,
    pub(crate) name_to_index: HashMap<String, usize>,
    pub(crate) root: usize,
}

impl Topology {
    fn build(mut links: Vec<BoneLink>) -> Result<Self> {
        let mut name_to_index = HashMap::with_capacity(links.len());
        for (i, link) in links.iter_mut().enumerate() {
            if link.length < 0.0 || !link.length.is_finite() {
                return Err(RigError::InvalidTopology(format!(
                    "bone '{}' has invalid length {}",
                    link.name, link.length
                )));
            }
            if name_to_index.insert(link.name.clone(), i).is_some() {
                return Err(RigError::InvalidTopology(format!(
                    "duplicate bone name '{}'",
                    link.name
                )));
            }
            link.internal_id = i;
            link.children.clear();
        }

        // 解析父子关系
        let mut root = None;
        for i in 0..links.len() {
            let parent = match links[i].parent_name.as_deref() {
                Some(parent_name) => match name_to_index.get(parent_name) {
                    Some(&p) if p != i => Some(p),
                    _ => {
                        return Err(RigError::InvalidTopology(format!(
                            "bone '{}' has unknown parent '{}'",
                            links[i].name, parent_name
                        )))
                    }
                },
                None => {
                    if root.replace(i).is_some() {
                        return Err(RigError::InvalidTopology(
                            "more than one root bone".to_string(),
                        ));
                    }
                    None
                }
            };
            links[i].parent_index = parent;
            if let Some(p) = parent {
                links[p].children.push(i);
            }
        }

        let root = root.ok_or_else(|| RigError::InvalidTopology("no root bone".to_string()))?;

        // 检查环：从根出发必须能到达所有骨骼
        let mut reached = 0usize;
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            reached += 1;
            stack.extend(links[idx].children.iter().copied());
            if reached > links.len() {
                break;
            }
        }
        if reached != links.len() {
            return Err(RigError::InvalidTopology(
                "bone hierarchy contains a cycle".to_string(),
            ));
        }

        Ok(Self {
            links,
            name_to_index,
            root,
        })
    }

    /// 结构一致：同名、同父、同长度
    fn same_shape(&self, other: &Topology) -> bool {
        self.links.len() == other.links.len()
            && self.links.iter().zip(&other.links).all(|(a, b)| {
                a.name == b.name && a.parent_index == b.parent_index && a.length == b.length
            })
    }
}

// ============================================================================
// 骨骼集合（快照）
// ============================================================================

/// 骨骼集合 - 一个完整骨架快照
///
/// 所有查找以骨骼名称为键；未知名称视为“不存在”，相应操作为空操作。
#[derive(Clone, Debug)]
pub struct BoneSet {
    topology: Arc<Topology>,
    angles: Vec<f32>,
    visible: Vec<bool>,
}

impl BoneSet {
    /// 从骨骼定义表构建骨架，角度取各骨骼的 rest_angle
    pub fn from_links(links: Vec<BoneLink>) -> Result<Self> {
        let topology = Topology::build(links)?;
        let angles = topology.links.iter().map(|l| l.rest_angle).collect();
        let visible = vec![true; topology.links.len()];
        Ok(Self {
            topology: Arc::new(topology),
            angles,
            visible,
        })
    }

    #[inline]
    pub(crate) fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    /// 骨骼数量
    #[inline]
    pub fn bone_count(&self) -> usize {
        self.topology.links.len()
    }

    /// 根骨骼索引
    #[inline]
    pub fn root_index(&self) -> usize {
        self.topology.root
    }

    /// 通过名称查找骨骼
    #[inline]
    pub fn find_bone_by_name(&self, name: &str) -> Option<usize> {
        self.topology.name_to_index.get(name).copied()
    }

    /// 获取骨骼定义
    #[inline]
    pub fn link(&self, index: usize) -> Option<&BoneLink> {
        self.topology.links.get(index)
    }

    /// 通过名称获取骨骼定义
    pub fn link_by_name(&self, name: &str) -> Option<&BoneLink> {
        self.find_bone_by_name(name).and_then(|i| self.link(i))
    }

    /// 按定义顺序遍历骨骼
    pub fn links(&self) -> impl Iterator<Item = &BoneLink> {
        self.topology.links.iter()
    }

    #[inline]
    pub fn parent_of(&self, index: usize) -> Option<usize> {
        self.link(index).and_then(|l| l.parent_index)
    }

    /// 从 index 沿父指针向上直到根（不含根）经过的骨骼
    pub fn path_to_root(&self, index: usize) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = Some(index).filter(|&i| i < self.bone_count());
        while let Some(idx) = current {
            if idx == self.topology.root {
                break;
            }
            path.push(idx);
            current = self.parent_of(idx);
        }
        path
    }

    // ========================================
    // 角度
    // ========================================

    pub fn angle(&self, name: &str) -> Option<f32> {
        self.find_bone_by_name(name).map(|i| self.angles[i])
    }

    #[inline]
    pub fn angle_at(&self, index: usize) -> Option<f32> {
        self.angles.get(index).copied()
    }

    /// 设置本地角度，未知骨骼返回 false
    pub fn set_angle(&mut self, name: &str, angle: f32) -> bool {
        match self.find_bone_by_name(name) {
            Some(i) => {
                self.angles[i] = angle;
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn set_angle_at(&mut self, index: usize, angle: f32) {
        if let Some(a) = self.angles.get_mut(index) {
            *a = angle;
        }
    }

    #[inline]
    pub(crate) fn angles(&self) -> &[f32] {
        &self.angles
    }

    #[inline]
    pub(crate) fn angles_mut(&mut self) -> &mut [f32] {
        &mut self.angles
    }

    // ========================================
    // 可见性
    // ========================================

    pub fn is_visible(&self, name: &str) -> Option<bool> {
        self.find_bone_by_name(name).map(|i| self.visible[i])
    }

    #[inline]
    pub fn visible_at(&self, index: usize) -> bool {
        self.visible.get(index).copied().unwrap_or(false)
    }

    pub fn set_visible(&mut self, name: &str, visible: bool) -> bool {
        match self.find_bone_by_name(name) {
            Some(i) => {
                self.visible[i] = visible;
                true
            }
            None => false,
        }
    }

    // ========================================
    // 快照间操作
    // ========================================

    /// 两个快照是否具有相同拓扑
    pub fn same_topology(&self, other: &BoneSet) -> bool {
        Arc::ptr_eq(&self.topology, &other.topology) || self.topology.same_shape(&other.topology)
    }

    /// 从另一个快照复制全部角度（不改变可见性）
    pub fn copy_angles_from(&mut self, other: &BoneSet) -> Result<()> {
        if !self.same_topology(other) {
            return Err(RigError::TopologyMismatch {
                start: self.bone_count(),
                target: other.bone_count(),
            });
        }
        self.angles.copy_from_slice(&other.angles);
        Ok(())
    }
}
