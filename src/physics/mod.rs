//! 物理后端接口
//!
//! 抓取核心只"配置和查询"物理引擎，从不创建或销毁刚体。
//! 这里定义核心消费的全部接口：
//! - PhysicsWorld: 重叠查询、位姿读取、运动学标志、6DOF 关节
//! - Pose: 刚体位姿（位置 + 旋转）
//! - RapierWorld: 基于 rapier3d 的实现

mod rapier_world;

#[cfg(test)]
pub(crate) mod mock_world;

pub use rapier_world::RapierWorld;

use bitflags::bitflags;
use glam::{Quat, Vec3};

// ============================================================================
// 位姿
// ============================================================================

/// 刚体位姿（世界空间或某刚体局部空间）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    #[inline]
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    #[inline]
    pub fn from_position(position: Vec3) -> Self {
        Self { position, rotation: Quat::IDENTITY }
    }

    /// 局部点 → 世界点
    #[inline]
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// 世界点 → 局部点
    #[inline]
    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse() * (world - self.position)
    }

    /// 位姿复合：先应用 `local`，再应用 `self`
    #[inline]
    pub fn mul(&self, local: &Pose) -> Pose {
        Pose {
            position: self.transform_point(local.position),
            rotation: (self.rotation * local.rotation).normalize(),
        }
    }

    #[inline]
    pub fn inverse(&self) -> Pose {
        let rotation = self.rotation.inverse();
        Pose {
            position: rotation * -self.position,
            rotation,
        }
    }

    /// 计算 `other` 在 `self` 局部空间中的相对位姿
    #[inline]
    pub fn relative(&self, other: &Pose) -> Pose {
        Pose {
            position: self.inverse_transform_point(other.position),
            rotation: (self.rotation.inverse() * other.rotation).normalize(),
        }
    }
}

// ============================================================================
// 句柄与身份
// ============================================================================

/// 刚体句柄（不透明，由物理引擎拥有）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub u64);

/// 关节句柄（不透明，由物理引擎拥有）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct JointHandle(pub u64);

/// 刚体身份：(容器 ID, 部件名)
///
/// 由宿主推导后传入，用于偏移记忆的键和状态显示。
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct BodyIdentity {
    pub container_id: String,
    pub part_name: String,
}

impl BodyIdentity {
    pub fn new(container_id: impl Into<String>, part_name: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            part_name: part_name.into(),
        }
    }
}

impl std::fmt::Display for BodyIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.container_id, self.part_name)
    }
}

// ============================================================================
// 重叠查询
// ============================================================================

bitflags! {
    /// 碰撞体类别
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ColliderKinds: u32 {
        /// 普通实体刚体碰撞体
        const SOLID = 1 << 0;
        /// 触发体（sensor）
        const TRIGGER = 1 << 1;
        /// 网格关节刚体（由宿主标记）
        const MESH_JOINT = 1 << 2;
    }
}

/// 重叠查询的单个结果
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlapHit {
    /// 碰撞体所附着的刚体
    pub body: BodyHandle,
    /// 碰撞体世界位置（用于距离排序）
    pub position: Vec3,
    /// 该碰撞体的类别
    pub kind: ColliderKinds,
}

// ============================================================================
// 6DOF 关节
// ============================================================================

/// 单轴运动模式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisMotion {
    Locked,
    Free,
}

/// 弹簧驱动参数
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DriveParams {
    pub spring: f32,
    pub damper: f32,
    pub max_force: f32,
}

impl DriveParams {
    pub const ZERO: Self = Self { spring: 0.0, damper: 0.0, max_force: 0.0 };

    pub const fn new(spring: f32, damper: f32, max_force: f32) -> Self {
        Self { spring, damper, max_force }
    }

    /// 逐分量缩放
    #[inline]
    pub fn scaled(&self, spring: f32, damper: f32, max_force: f32) -> Self {
        Self {
            spring: self.spring * spring,
            damper: self.damper * damper,
            max_force: self.max_force * max_force,
        }
    }

    /// 从零插值：t=0 为无力，t=1 为完整强度
    #[inline]
    pub fn lerp_from_zero(&self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            spring: self.spring * t,
            damper: self.damper * t,
            max_force: self.max_force * t,
        }
    }
}

/// 6DOF 关节创建描述
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointSpec {
    /// 锚点（源刚体局部空间），旋转即目标相对旋转
    pub anchor: Pose,
    pub linear_motion: AxisMotion,
    pub angular_motion: AxisMotion,
    pub linear_drive: DriveParams,
    pub angular_drive: DriveParams,
}

// ============================================================================
// 物理世界接口
// ============================================================================

/// 抓取核心消费的物理引擎接口
///
/// 写操作返回 bool 表示是否真正生效：句柄失效时返回 false 而非报错，
/// 调用方把它视为"无事可做"。
pub trait PhysicsWorld {
    /// 查询与球体重叠的所有碰撞体
    fn query_overlapping(&self, center: Vec3, radius: f32, include_triggers: bool) -> Vec<OverlapHit>;

    /// 读取刚体世界位姿（刚体已失效时为 None）
    fn body_pose(&self, body: BodyHandle) -> Option<Pose>;

    /// 刚体身份（宿主未注册时为 None）
    fn body_identity(&self, body: BodyHandle) -> Option<BodyIdentity>;

    fn is_kinematic(&self, body: BodyHandle) -> Option<bool>;

    fn set_kinematic(&mut self, body: BodyHandle, kinematic: bool) -> bool;

    /// 运动学移动（保证与其他刚体的碰撞响应正确）
    fn move_kinematic(&mut self, body: BodyHandle, position: Vec3, rotation: Option<Quat>) -> bool;

    /// 在两刚体之间创建 6DOF 关节
    fn create_joint(
        &mut self,
        source: BodyHandle,
        target: BodyHandle,
        spec: &JointSpec,
    ) -> Result<JointHandle, String>;

    fn set_joint_drives(&mut self, joint: JointHandle, linear: DriveParams, angular: DriveParams) -> bool;

    fn remove_joint(&mut self, joint: JointHandle) -> bool;
}
