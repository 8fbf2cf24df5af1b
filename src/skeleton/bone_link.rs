//! 骨骼节点
//!
//! BoneLink 是骨骼树中单个节点的静态定义：名称、父子关系、长度、粗细、
//! 初始角度和关节范围。加载后拓扑不再变化，运行时只有角度与可见性会被修改，
//! 这两项保存在 BoneSet 的每个快照中。

// ============================================================================
// 骨骼节点
// ============================================================================

/// 骨骼节点（静态数据，初始化后不变）
#[derive(Clone, Debug, PartialEq)]
pub struct BoneLink {
    /// 骨骼名称（全局唯一，是系统内唯一的交叉引用键）
    pub name: String,

    /// 父骨骼名称（仅用于构建，None 表示根骨骼）
    pub parent_name: Option<String>,

    /// 骨骼内部索引（build 时分配）
    pub(crate) internal_id: usize,

    /// 父骨骼索引（build 时解析）
    pub(crate) parent_index: Option<usize>,

    /// 子骨骼索引（保持定义顺序，保证遍历确定性）
    pub(crate) children: Vec<usize>,

    /// 起点关节到终点关节的长度
    pub length: f32,

    /// 质量（静态数据，渲染层用作相对粗细）
    pub mass: f32,

    /// 初始本地角度（弧度，相对父骨骼的世界朝向）
    pub rest_angle: f32,

    /// 手动调节范围 (min, max)，None 表示不限制
    pub angle_limit: Option<(f32, f32)>,
}

impl BoneLink {
    /// 创建新骨骼
    pub fn new(name: impl Into<String>, length: f32) -> Self {
        Self {
            name: name.into(),
            parent_name: None,
            internal_id: 0,
            parent_index: None,
            children: Vec::new(),
            length,
            mass: 1.0,
            rest_angle: 0.0,
            angle_limit: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_name = Some(parent.into());
        self
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.rest_angle = angle;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_limits(mut self, min: f32, max: f32) -> Self {
        self.angle_limit = Some((min.min(max), min.max(max)));
        self
    }

    // ========================================
    // 访问器
    // ========================================

    /// 骨骼索引
    #[inline]
    pub fn link_id(&self) -> usize {
        self.internal_id
    }

    /// 父骨骼索引
    #[inline]
    pub fn parent_id(&self) -> Option<usize> {
        self.parent_index
    }

    /// 是否为根骨骼
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent_index.is_none()
    }

    /// 子骨骼索引
    #[inline]
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// 是否为零长度骨骼（不参与物理约束）
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.length <= f32::EPSILON
    }

    /// 将角度限制到关节范围内
    #[inline]
    pub fn clamp_angle(&self, angle: f32) -> f32 {
        match self.angle_limit {
            Some((min, max)) => angle.clamp(min, max),
            None => angle,
        }
    }
}
