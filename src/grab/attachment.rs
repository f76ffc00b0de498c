//! 附着 - 源刚体与目标刚体之间的一次物理耦合
//!
//! 状态机：BlendingIn → Steady → Detaching → Dead（单向，不可复活）
//!
//! - 弹簧模式（Hold/Glue/Loose）：拥有一个 6DOF 关节，blend 从 0 升到 1
//!   再降回 0，驱动参数随 blend 线性变化
//! - 完美跟随（Perfect）：不创建关节，目标设为运动学并每步复制位姿；
//!   目标原有的运动学标志在销毁时恰好恢复一次

use crate::error::GrabError;
use crate::physics::{AxisMotion, BodyHandle, BodyIdentity, JointHandle, JointSpec, PhysicsWorld, Pose};

use super::config::{GrabConfig, GrabMode};
use super::drive::{compute_drives, DrivePair};

/// blend 接近端点时直接吸附，消除浮点累计误差
const BLEND_EPSILON: f32 = 1e-4;

/// 附着阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    BlendingIn,
    Steady,
    Detaching,
    Dead,
}

/// 刚体句柄 + 身份
#[derive(Clone, Debug, PartialEq)]
pub struct BodyRef {
    pub handle: BodyHandle,
    pub identity: BodyIdentity,
}

impl BodyRef {
    pub fn new(handle: BodyHandle, identity: BodyIdentity) -> Self {
        Self { handle, identity }
    }
}

/// 附着持有的物理资源
#[derive(Debug)]
enum Coupling {
    /// 弹簧关节（释放后为 None）
    Joint(Option<JointHandle>),
    /// 运动学放置：目标附着前的运动学标志（恢复后为 None）
    Kinematic { was_kinematic: Option<bool> },
}

#[derive(Debug)]
pub struct Attachment {
    source: BodyRef,
    target: BodyRef,
    config: GrabConfig,
    /// 目标在源刚体局部空间中的相对位姿
    offset: Pose,
    /// 偏移是否来自记忆
    offset_remembered: bool,
    blend: f32,
    phase: Phase,
    coupling: Coupling,
    drives: DrivePair,
    destroyed: bool,
}

impl Attachment {
    /// 创建附着
    ///
    /// 失败时不会留下任何关节，目标的运动学标志保持不变。
    pub fn new<W: PhysicsWorld + ?Sized>(
        world: &mut W,
        source: BodyRef,
        target: BodyRef,
        config: GrabConfig,
        remembered_offset: Option<Pose>,
    ) -> Result<Self, GrabError> {
        config.validate()?;

        if source.handle == target.handle {
            return Err(GrabError::JointCreationFailed("source and target are the same body".into()));
        }
        let source_pose = world
            .body_pose(source.handle)
            .ok_or_else(|| GrabError::JointCreationFailed("source body is invalid".into()))?;
        let target_pose = world
            .body_pose(target.handle)
            .ok_or_else(|| GrabError::JointCreationFailed("target body is invalid".into()))?;

        let offset_remembered = config.keep_offset && remembered_offset.is_some();
        let offset = match (config.keep_offset, remembered_offset) {
            (true, Some(remembered)) => remembered,
            (true, None) => source_pose.relative(&target_pose),
            (false, _) => Pose::IDENTITY,
        };

        let mut attachment = Self {
            source,
            target,
            config,
            offset,
            offset_remembered,
            blend: 0.0,
            phase: Phase::BlendingIn,
            coupling: Coupling::Joint(None),
            drives: DrivePair::ZERO,
            destroyed: false,
        };

        if config.mode.is_kinematic() {
            let was_kinematic = world
                .is_kinematic(attachment.target.handle)
                .ok_or_else(|| GrabError::JointCreationFailed("target body is invalid".into()))?;
            if !world.set_kinematic(attachment.target.handle, true) {
                return Err(GrabError::JointCreationFailed("cannot make target kinematic".into()));
            }
            attachment.coupling = Coupling::Kinematic { was_kinematic: Some(was_kinematic) };
            attachment.blend = 1.0;
            attachment.phase = Phase::Steady;
        } else {
            // 初始驱动为零强度
            attachment.drives = attachment.compute_drives();
            let spec = JointSpec {
                anchor: offset,
                linear_motion: AxisMotion::Locked,
                angular_motion: if config.position_only { AxisMotion::Free } else { AxisMotion::Locked },
                linear_drive: attachment.drives.linear,
                angular_drive: attachment.drives.angular,
            };
            let joint = world
                .create_joint(attachment.source.handle, attachment.target.handle, &spec)
                .map_err(GrabError::JointCreationFailed)?;
            attachment.coupling = Coupling::Joint(Some(joint));
        }

        Ok(attachment)
    }

    // ========== 每步更新 ==========

    /// 推进 blend 并刷新驱动参数或运动学位姿
    ///
    /// 刚体已失效时视为无事可做。
    pub fn update<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, dt: f32) {
        if self.destroyed || self.phase == Phase::Dead {
            return;
        }

        let blend_changed = self.advance_blend(dt);

        match self.coupling {
            Coupling::Kinematic { .. } => self.place_target(world),
            Coupling::Joint(Some(joint)) => {
                if blend_changed {
                    self.drives = self.compute_drives();
                    world.set_joint_drives(joint, self.drives.linear, self.drives.angular);
                }
            }
            Coupling::Joint(None) => {}
        }
    }

    fn advance_blend(&mut self, dt: f32) -> bool {
        let step = dt.max(0.0) * self.config.blend_speed;
        let before = self.blend;
        match self.phase {
            Phase::BlendingIn => {
                self.blend = (self.blend + step).min(1.0);
                if self.blend >= 1.0 - BLEND_EPSILON {
                    self.blend = 1.0;
                    self.phase = Phase::Steady;
                }
            }
            Phase::Detaching => {
                self.blend = (self.blend - step).max(0.0);
                if self.blend <= BLEND_EPSILON {
                    self.blend = 0.0;
                    self.phase = Phase::Dead;
                }
            }
            Phase::Steady | Phase::Dead => {}
        }
        self.blend != before
    }

    /// 完美跟随：目标位姿 = 源位姿 ∘ 偏移
    fn place_target<W: PhysicsWorld + ?Sized>(&self, world: &mut W) {
        let Some(source_pose) = world.body_pose(self.source.handle) else {
            return;
        };
        let desired = source_pose.mul(&self.offset);
        let rotation = if self.config.position_only { None } else { Some(desired.rotation) };
        world.move_kinematic(self.target.handle, desired.position, rotation);
    }

    fn compute_drives(&self) -> DrivePair {
        compute_drives(self.config.stiffness, self.config.mode, self.config.position_only, self.blend)
    }

    // ========== 释放 ==========

    /// 开始平滑释放；已在释放或已死亡时返回 false
    pub fn begin_detach(&mut self) -> bool {
        match self.phase {
            Phase::BlendingIn | Phase::Steady => {
                self.phase = Phase::Detaching;
                true
            }
            Phase::Detaching | Phase::Dead => false,
        }
    }

    /// 释放物理资源（可重复调用，第二次起无操作）
    pub fn destroy<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.phase = Phase::Dead;

        match &mut self.coupling {
            Coupling::Joint(joint) => {
                if let Some(joint) = joint.take() {
                    if !world.remove_joint(joint) {
                        log::warn!("[抓取] 关节 {:?} 已不存在，跳过释放", joint);
                    }
                }
            }
            Coupling::Kinematic { was_kinematic } => {
                if let Some(was) = was_kinematic.take() {
                    if !world.set_kinematic(self.target.handle, was) {
                        log::warn!("[抓取] 目标 '{}' 已失效，无法恢复运动学标志", self.target.identity);
                    }
                }
            }
        }
        self.drives = DrivePair::ZERO;
    }

    // ========== 查询 ==========

    pub fn source(&self) -> &BodyRef {
        &self.source
    }

    pub fn target(&self) -> &BodyRef {
        &self.target
    }

    pub fn config(&self) -> &GrabConfig {
        &self.config
    }

    pub fn mode(&self) -> GrabMode {
        self.config.mode
    }

    pub fn offset(&self) -> Pose {
        self.offset
    }

    pub fn offset_remembered(&self) -> bool {
        self.offset_remembered
    }

    pub fn blend(&self) -> f32 {
        self.blend
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn drives(&self) -> DrivePair {
        self.drives
    }

    pub fn joint(&self) -> Option<JointHandle> {
        match self.coupling {
            Coupling::Joint(joint) => joint,
            Coupling::Kinematic { .. } => None,
        }
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.phase == Phase::Dead
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}
