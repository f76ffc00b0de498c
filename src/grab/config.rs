//! 抓取配置
//!
//! 全局设置扁平化（GrabSettings），每次抓取再派生出不可变的 GrabConfig。

use glam::Vec3;
use once_cell::sync::Lazy;
use std::sync::RwLock;

use crate::error::GrabError;
use crate::physics::ColliderKinds;

/// 刚度预设
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stiffness {
    Soft,
    Firm,
    Lock,
}

impl Stiffness {
    pub const ALL: [Stiffness; 3] = [Stiffness::Soft, Stiffness::Firm, Stiffness::Lock];

    pub fn name(&self) -> &'static str {
        match self {
            Stiffness::Soft => "Soft",
            Stiffness::Firm => "Firm",
            Stiffness::Lock => "Lock",
        }
    }
}

/// 耦合模式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GrabMode {
    /// 抓握：完整线性驱动，减弱角驱动
    Hold,
    /// 粘合：完整驱动，加大阻尼
    Glue,
    /// 松散跟随：整体缩小
    Loose,
    /// 完美跟随：运动学放置，无弹簧
    Perfect,
}

impl GrabMode {
    pub const ALL: [GrabMode; 4] = [GrabMode::Hold, GrabMode::Glue, GrabMode::Loose, GrabMode::Perfect];

    #[inline]
    pub fn is_kinematic(&self) -> bool {
        matches!(self, GrabMode::Perfect)
    }

    pub fn name(&self) -> &'static str {
        match self {
            GrabMode::Hold => "Grab/Hold",
            GrabMode::Glue => "Glue",
            GrabMode::Loose => "Loose Follow",
            GrabMode::Perfect => "Perfect Follow",
        }
    }
}

/// 单次附着的不可变配置
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrabConfig {
    pub stiffness: Stiffness,
    pub mode: GrabMode,
    /// 每秒混合量（blend 为 0..1 无量纲）
    pub blend_speed: f32,
    /// 仅约束位置，旋转自由
    pub position_only: bool,
    /// 保持抓取时（或记忆中）的相对位姿
    pub keep_offset: bool,
}

impl Default for GrabConfig {
    fn default() -> Self {
        Self::from_settings(&GrabSettings::default())
    }
}

impl GrabConfig {
    pub fn from_settings(settings: &GrabSettings) -> Self {
        Self {
            stiffness: settings.stiffness,
            mode: settings.mode,
            blend_speed: settings.blend_speed,
            position_only: settings.position_only,
            keep_offset: settings.keep_offset,
        }
    }

    pub fn validate(&self) -> Result<(), GrabError> {
        if !(self.blend_speed > 0.0) || !self.blend_speed.is_finite() {
            return Err(GrabError::InvalidBlendSpeed(self.blend_speed));
        }
        Ok(())
    }
}

/// 全局抓取设置（扁平化，不嵌套）
#[derive(Debug, Clone)]
pub struct GrabSettings {
    // ========== 扫描 ==========
    /// 抓取半径，默认 0.15（范围 0.01~0.5）
    pub grab_radius: f32,
    /// 抓取中心相对源刚体的局部偏移，每轴范围 -0.5~0.5
    pub origin_offset: Vec3,

    // ========== 附着 ==========
    /// 默认刚度，默认 Lock
    pub stiffness: Stiffness,
    /// 默认模式，默认 Grab/Hold
    pub mode: GrabMode,
    /// 混合速度，默认 2.0（范围 0.1~10）
    pub blend_speed: f32,
    pub position_only: bool,
    pub keep_offset: bool,

    // ========== 可抓取类别 ==========
    pub grab_rigidbodies: bool,
    pub grab_triggers: bool,
    pub grab_mesh_joints: bool,

    // ========== 策略 ==========
    /// 是否允许同时存在多个附着，默认 false（已抓住时拒绝再次抓取）
    pub allow_multiple: bool,

    // ========== 调试 ==========
    /// 是否输出调试日志，默认 false
    pub debug_log: bool,
}

impl Default for GrabSettings {
    fn default() -> Self {
        Self {
            grab_radius: 0.15,
            origin_offset: Vec3::ZERO,

            stiffness: Stiffness::Lock,
            mode: GrabMode::Hold,
            blend_speed: 2.0,
            position_only: false,
            keep_offset: true,

            grab_rigidbodies: true,
            grab_triggers: false,
            grab_mesh_joints: false,

            allow_multiple: false,

            debug_log: false,
        }
    }
}

impl GrabSettings {
    /// 可抓取的碰撞体类别
    pub fn eligible_kinds(&self) -> ColliderKinds {
        let mut kinds = ColliderKinds::empty();
        if self.grab_rigidbodies {
            kinds |= ColliderKinds::SOLID;
        }
        if self.grab_triggers {
            kinds |= ColliderKinds::TRIGGER;
        }
        if self.grab_mesh_joints {
            kinds |= ColliderKinds::MESH_JOINT;
        }
        kinds
    }

    /// 钳制到 UI 允许的范围
    pub fn clamped(mut self) -> Self {
        self.grab_radius = self.grab_radius.clamp(0.01, 0.5);
        self.origin_offset = self.origin_offset.clamp(Vec3::splat(-0.5), Vec3::splat(0.5));
        self.blend_speed = self.blend_speed.clamp(0.1, 10.0);
        self
    }
}

/// 全局配置实例
static GRAB_SETTINGS: Lazy<RwLock<GrabSettings>> = Lazy::new(|| {
    RwLock::new(GrabSettings::default())
});

/// 获取当前配置（只读）
pub fn get_config() -> GrabSettings {
    GRAB_SETTINGS.read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// 手动设置配置（超出范围的值会被钳制）
pub fn set_config(settings: GrabSettings) {
    *GRAB_SETTINGS.write().unwrap_or_else(|e| e.into_inner()) = settings.clamped();
}

/// 重置为默认配置
pub fn reset_config() {
    *GRAB_SETTINGS.write().unwrap_or_else(|e| e.into_inner()) = GrabSettings::default();
}
