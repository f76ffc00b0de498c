//! Rapier3D 物理世界
//!
//! PhysicsWorld 的 rapier 实现，同时持有完整的模拟流水线。
//!
//! ## 接口 → Rapier 映射
//! | 接口 | Rapier |
//! |------|--------|
//! | 重叠查询 | QueryPipeline::intersections_with_shape + Ball |
//! | 运动学标志 | RigidBodyType::KinematicPositionBased / Dynamic |
//! | 运动学移动 | set_next_kinematic_position |
//! | 6DOF 关节 | GenericJoint + 每轴 ForceBased 位置电机 |
//!
//! 锁定轴用位置电机实现而不是 JointAxesMask 硬约束，
//! 这样 blend 才能把约束强度从零平滑拉起。

use std::collections::{HashMap, HashSet};

use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, UnitQuaternion};
use rapier3d::prelude::*;

use super::{
    AxisMotion, BodyHandle, BodyIdentity, ColliderKinds, DriveParams, JointHandle, JointSpec,
    OverlapHit, PhysicsWorld, Pose,
};

const LINEAR_AXES: [JointAxis; 3] = [JointAxis::LinX, JointAxis::LinY, JointAxis::LinZ];
const ANGULAR_AXES: [JointAxis; 3] = [JointAxis::AngX, JointAxis::AngY, JointAxis::AngZ];

// ============================================================================
// glam ↔ nalgebra
// ============================================================================

#[inline]
fn to_na_vector(v: Vec3) -> Vector<Real> {
    Vector::new(v.x, v.y, v.z)
}

#[inline]
fn to_na_rotation(q: Quat) -> Rotation<Real> {
    UnitQuaternion::new_normalize(Quaternion::new(q.w, q.x, q.y, q.z))
}

#[inline]
fn to_na_isometry(pose: &Pose) -> Isometry<Real> {
    Isometry::from_parts(to_na_vector(pose.position).into(), to_na_rotation(pose.rotation))
}

#[inline]
fn from_na_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

#[inline]
fn from_na_rotation(r: &Rotation<Real>) -> Quat {
    let c = r.coords;
    Quat::from_xyzw(c.x, c.y, c.z, c.w)
}

// ============================================================================
// 句柄编码
// ============================================================================

fn encode_body(handle: RigidBodyHandle) -> BodyHandle {
    let (index, generation) = handle.into_raw_parts();
    BodyHandle(((generation as u64) << 32) | index as u64)
}

fn decode_body(handle: BodyHandle) -> RigidBodyHandle {
    RigidBodyHandle::from_raw_parts(handle.0 as u32, (handle.0 >> 32) as u32)
}

fn encode_joint(handle: ImpulseJointHandle) -> JointHandle {
    let (index, generation) = handle.into_raw_parts();
    JointHandle(((generation as u64) << 32) | index as u64)
}

fn decode_joint(handle: JointHandle) -> ImpulseJointHandle {
    ImpulseJointHandle::from_raw_parts(handle.0 as u32, (handle.0 >> 32) as u32)
}

/// 关节实际被驱动的轴
#[derive(Clone, Copy, Debug)]
struct DrivenAxes {
    linear: bool,
    angular: bool,
}

/// Rapier 物理世界
pub struct RapierWorld {
    /// 物理流水线
    pub physics_pipeline: PhysicsPipeline,
    /// 积分参数
    pub integration_parameters: IntegrationParameters,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,
    /// 重力向量
    pub gravity: Vector<Real>,

    /// 宿主注册的刚体身份
    identities: HashMap<RigidBodyHandle, BodyIdentity>,
    /// 宿主标记的网格关节刚体
    mesh_joints: HashSet<RigidBodyHandle>,
    /// 切换为运动学之前的刚体类型（Fixed 刚体释放后仍为 Fixed）
    saved_body_types: HashMap<RigidBodyHandle, RigidBodyType>,
    driven_axes: HashMap<ImpulseJointHandle, DrivenAxes>,
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, -9.81, 0.0))
    }
}

impl RapierWorld {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            physics_pipeline: PhysicsPipeline::new(),
            integration_parameters: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            gravity: to_na_vector(gravity),
            identities: HashMap::new(),
            mesh_joints: HashSet::new(),
            saved_body_types: HashMap::new(),
            driven_axes: HashMap::new(),
        }
    }

    /// 插入刚体及其碰撞体，并登记身份
    pub fn insert_body(&mut self, body: RigidBody, collider: Collider, identity: BodyIdentity) -> BodyHandle {
        let handle = self.rigid_body_set.insert(body);
        self.collider_set.insert_with_parent(collider, handle, &mut self.rigid_body_set);
        self.identities.insert(handle, identity);
        // 新碰撞体在下一次 step 前也要能被查询到
        self.query_pipeline.update(&self.collider_set);
        encode_body(handle)
    }

    /// 从世界中移除刚体（附着的碰撞体和关节一并移除）
    pub fn remove_body(&mut self, body: BodyHandle) -> bool {
        let handle = decode_body(body);
        self.identities.remove(&handle);
        self.mesh_joints.remove(&handle);
        self.saved_body_types.remove(&handle);
        let removed = self
            .rigid_body_set
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some();
        self.query_pipeline.update(&self.collider_set);
        removed
    }

    /// 标记为网格关节刚体（扫描时归入 MESH_JOINT 类别）
    pub fn mark_mesh_joint(&mut self, body: BodyHandle) {
        self.mesh_joints.insert(decode_body(body));
    }

    pub fn body(&self, body: BodyHandle) -> Option<&RigidBody> {
        self.rigid_body_set.get(decode_body(body))
    }

    pub fn joint_count(&self) -> usize {
        self.impulse_joint_set.len()
    }

    /// 步进物理模拟
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    fn apply_drives(joint: &mut GenericJoint, axes: DrivenAxes, linear: DriveParams, angular: DriveParams) {
        if axes.linear {
            for axis in LINEAR_AXES {
                Self::apply_axis_drive(joint, axis, linear);
            }
        }
        if axes.angular {
            for axis in ANGULAR_AXES {
                Self::apply_axis_drive(joint, axis, angular);
            }
        }
    }

    fn apply_axis_drive(joint: &mut GenericJoint, axis: JointAxis, drive: DriveParams) {
        joint.set_motor_model(axis, MotorModel::ForceBased);
        joint.set_motor_position(axis, 0.0, drive.spring, drive.damper);
        joint.set_motor_max_force(axis, drive.max_force);
    }
}

impl PhysicsWorld for RapierWorld {
    fn query_overlapping(&self, center: Vec3, radius: f32, include_triggers: bool) -> Vec<OverlapHit> {
        let shape = Ball::new(radius);
        let shape_pos = Isometry::translation(center.x, center.y, center.z);
        let mut filter = QueryFilter::default();
        if !include_triggers {
            filter = filter.exclude_sensors();
        }

        let mut hits = Vec::new();
        self.query_pipeline.intersections_with_shape(
            &self.rigid_body_set,
            &self.collider_set,
            &shape_pos,
            &shape,
            filter,
            |collider_handle| {
                if let Some(collider) = self.collider_set.get(collider_handle) {
                    // 无父刚体的静态碰撞体不可抓取
                    if let Some(parent) = collider.parent() {
                        let mut kind = if collider.is_sensor() {
                            ColliderKinds::TRIGGER
                        } else {
                            ColliderKinds::SOLID
                        };
                        if self.mesh_joints.contains(&parent) {
                            kind |= ColliderKinds::MESH_JOINT;
                        }
                        hits.push(OverlapHit {
                            body: encode_body(parent),
                            position: from_na_vector(collider.translation()),
                            kind,
                        });
                    }
                }
                true
            },
        );
        hits
    }

    fn body_pose(&self, body: BodyHandle) -> Option<Pose> {
        self.rigid_body_set
            .get(decode_body(body))
            .map(|rb| Pose::new(from_na_vector(rb.translation()), from_na_rotation(rb.rotation())))
    }

    fn body_identity(&self, body: BodyHandle) -> Option<BodyIdentity> {
        self.identities.get(&decode_body(body)).cloned()
    }

    fn is_kinematic(&self, body: BodyHandle) -> Option<bool> {
        self.rigid_body_set.get(decode_body(body)).map(|rb| rb.is_kinematic())
    }

    fn set_kinematic(&mut self, body: BodyHandle, kinematic: bool) -> bool {
        let handle = decode_body(body);
        let Some(rb) = self.rigid_body_set.get_mut(handle) else {
            return false;
        };
        let body_type = if kinematic {
            if !rb.is_kinematic() {
                self.saved_body_types.insert(handle, rb.body_type());
            }
            RigidBodyType::KinematicPositionBased
        } else if rb.is_kinematic() {
            self.saved_body_types.remove(&handle).unwrap_or(RigidBodyType::Dynamic)
        } else {
            return true;
        };
        rb.set_body_type(body_type, true);
        true
    }

    fn move_kinematic(&mut self, body: BodyHandle, position: Vec3, rotation: Option<Quat>) -> bool {
        let Some(rb) = self.rigid_body_set.get_mut(decode_body(body)) else {
            return false;
        };
        match rotation {
            Some(rotation) => {
                let pose = Pose::new(position, rotation);
                rb.set_next_kinematic_position(to_na_isometry(&pose));
            }
            None => rb.set_next_kinematic_translation(to_na_vector(position)),
        }
        true
    }

    fn create_joint(
        &mut self,
        source: BodyHandle,
        target: BodyHandle,
        spec: &JointSpec,
    ) -> Result<JointHandle, String> {
        let body1 = decode_body(source);
        let body2 = decode_body(target);
        if self.rigid_body_set.get(body1).is_none() {
            return Err("source body not in world".to_string());
        }
        if self.rigid_body_set.get(body2).is_none() {
            return Err("target body not in world".to_string());
        }

        let axes = DrivenAxes {
            linear: spec.linear_motion == AxisMotion::Locked,
            angular: spec.angular_motion == AxisMotion::Locked,
        };

        let mut joint = GenericJointBuilder::new(JointAxesMask::empty()).build();
        joint.set_local_frame1(to_na_isometry(&spec.anchor));
        joint.set_local_frame2(Isometry::identity());
        joint.set_contacts_enabled(false);
        Self::apply_drives(&mut joint, axes, spec.linear_drive, spec.angular_drive);

        let handle = self.impulse_joint_set.insert(body1, body2, joint, true);
        self.driven_axes.insert(handle, axes);
        Ok(encode_joint(handle))
    }

    fn set_joint_drives(&mut self, joint: JointHandle, linear: DriveParams, angular: DriveParams) -> bool {
        let handle = decode_joint(joint);
        let Some(axes) = self.driven_axes.get(&handle).copied() else {
            return false;
        };
        match self.impulse_joint_set.get_mut(handle) {
            Some(impulse_joint) => {
                Self::apply_drives(&mut impulse_joint.data, axes, linear, angular);
                true
            }
            None => false,
        }
    }

    fn remove_joint(&mut self, joint: JointHandle) -> bool {
        let handle = decode_joint(joint);
        self.driven_axes.remove(&handle);
        self.impulse_joint_set.remove(handle, true).is_some()
    }
}
