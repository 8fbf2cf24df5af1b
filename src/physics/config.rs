//! 物理配置
//!
//! 所有参数扁平化，直接在代码中修改默认值即可。

use once_cell::sync::Lazy;
use std::sync::RwLock;

/// 物理配置（扁平化，不嵌套）
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    // ========== 重力 ==========
    /// 重力加速度（像素/秒²，+Y 向下），默认 980.0
    pub gravity: f32,

    // ========== 模拟参数 ==========
    /// 每个 tick 的时长（秒），默认 1/60
    pub tick_seconds: f32,
    /// 每 tick 约束松弛迭代次数，默认 5
    pub relax_iterations: usize,

    // ========== 粒子构建 ==========
    /// 关节合并容差：世界坐标距离小于该值的关节共享同一个粒子
    pub joint_merge_epsilon: f32,

    // ========== 调试 ==========
    /// 是否输出逐帧调试日志，默认 false
    pub debug_log: bool,
}

impl PhysicsConfig {
    /// 每 tick 的重力位移增量 = 重力 × tick²
    #[inline]
    pub fn gravity_step(&self) -> f32 {
        self.gravity * self.tick_seconds * self.tick_seconds
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            // ====== 重力 ======
            // 画布像素尺度下的重力，60 FPS 时每帧约 0.27 像素
            gravity: 980.0,

            // ====== 模拟参数 ======
            // 与显示刷新同步，一次回调一个 tick
            tick_seconds: 1.0 / 60.0,

            // 固定迭代次数，近似收敛而非精确求解
            relax_iterations: 5,

            // ====== 粒子构建 ======
            joint_merge_epsilon: 1e-3,

            // ====== 调试 ======
            debug_log: false,
        }
    }
}

/// 全局配置实例
static PHYSICS_CONFIG: Lazy<RwLock<PhysicsConfig>> = Lazy::new(|| {
    RwLock::new(PhysicsConfig::default())
});

/// 获取当前配置（只读）
pub fn get_config() -> PhysicsConfig {
    PHYSICS_CONFIG.read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// 手动设置配置（用于运行时调试）
pub fn set_config(config: PhysicsConfig) {
    *PHYSICS_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = config;
}

/// 重置为默认配置
pub fn reset_config() {
    *PHYSICS_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = PhysicsConfig::default();
}
