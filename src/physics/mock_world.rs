//! 测试用物理世界
//!
//! 纯脚本化实现：刚体位姿手动设置，重叠查询按球心距离过滤，
//! 关节只记录参数。所有写操作都会计数，便于检查资源生命周期。

use std::collections::HashMap;

use glam::{Quat, Vec3};

use super::{
    BodyHandle, BodyIdentity, ColliderKinds, DriveParams, JointHandle, JointSpec, OverlapHit,
    PhysicsWorld, Pose,
};

#[derive(Clone, Debug)]
pub struct MockBody {
    pub pose: Pose,
    pub identity: Option<BodyIdentity>,
    pub kinematic: bool,
    pub kind: ColliderKinds,
    /// 碰撞体包围半径
    pub extent: f32,
}

#[derive(Clone, Debug)]
pub struct MockJoint {
    pub source: BodyHandle,
    pub target: BodyHandle,
    pub spec: JointSpec,
    pub linear: DriveParams,
    pub angular: DriveParams,
}

#[derive(Default)]
pub struct MockWorld {
    pub bodies: HashMap<BodyHandle, MockBody>,
    /// 插入顺序即重叠查询返回顺序
    pub order: Vec<BodyHandle>,
    pub joints: HashMap<JointHandle, MockJoint>,
    pub next_id: u64,
    pub refuse_joints: bool,
    pub joints_created: usize,
    pub joints_removed: usize,
    pub kinematic_writes: usize,
    pub kinematic_moves: Vec<(BodyHandle, Vec3, Option<Quat>)>,
}

impl MockWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_body(&mut self, container: &str, part: &str, position: Vec3) -> BodyHandle {
        self.add_body_with(container, part, Pose::from_position(position), ColliderKinds::SOLID)
    }

    pub fn add_body_with(&mut self, container: &str, part: &str, pose: Pose, kind: ColliderKinds) -> BodyHandle {
        self.next_id += 1;
        let handle = BodyHandle(self.next_id);
        self.bodies.insert(handle, MockBody {
            pose,
            identity: Some(BodyIdentity::new(container, part)),
            kinematic: false,
            kind,
            extent: 0.0,
        });
        self.order.push(handle);
        handle
    }

    pub fn set_pose(&mut self, body: BodyHandle, pose: Pose) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.pose = pose;
        }
    }

    pub fn remove_body(&mut self, body: BodyHandle) {
        self.bodies.remove(&body);
        self.order.retain(|b| *b != body);
    }

    pub fn joint(&self, joint: JointHandle) -> Option<&MockJoint> {
        self.joints.get(&joint)
    }
}

impl PhysicsWorld for MockWorld {
    fn query_overlapping(&self, center: Vec3, radius: f32, include_triggers: bool) -> Vec<OverlapHit> {
        self.order
            .iter()
            .filter_map(|h| self.bodies.get(h).map(|b| (*h, b)))
            .filter(|(_, b)| include_triggers || !b.kind.contains(ColliderKinds::TRIGGER))
            .filter(|(_, b)| b.pose.position.distance(center) <= radius + b.extent)
            .map(|(h, b)| OverlapHit {
                body: h,
                position: b.pose.position,
                kind: b.kind,
            })
            .collect()
    }

    fn body_pose(&self, body: BodyHandle) -> Option<Pose> {
        self.bodies.get(&body).map(|b| b.pose)
    }

    fn body_identity(&self, body: BodyHandle) -> Option<BodyIdentity> {
        self.bodies.get(&body).and_then(|b| b.identity.clone())
    }

    fn is_kinematic(&self, body: BodyHandle) -> Option<bool> {
        self.bodies.get(&body).map(|b| b.kinematic)
    }

    fn set_kinematic(&mut self, body: BodyHandle, kinematic: bool) -> bool {
        match self.bodies.get_mut(&body) {
            Some(b) => {
                b.kinematic = kinematic;
                self.kinematic_writes += 1;
                true
            }
            None => false,
        }
    }

    fn move_kinematic(&mut self, body: BodyHandle, position: Vec3, rotation: Option<Quat>) -> bool {
        match self.bodies.get_mut(&body) {
            Some(b) => {
                b.pose.position = position;
                if let Some(r) = rotation {
                    b.pose.rotation = r;
                }
                self.kinematic_moves.push((body, position, rotation));
                true
            }
            None => false,
        }
    }

    fn create_joint(
        &mut self,
        source: BodyHandle,
        target: BodyHandle,
        spec: &JointSpec,
    ) -> Result<JointHandle, String> {
        if self.refuse_joints {
            return Err("joint refused".to_string());
        }
        if !self.bodies.contains_key(&source) || !self.bodies.contains_key(&target) {
            return Err("invalid body".to_string());
        }
        self.next_id += 1;
        let handle = JointHandle(self.next_id);
        self.joints.insert(handle, MockJoint {
            source,
            target,
            spec: *spec,
            linear: spec.linear_drive,
            angular: spec.angular_drive,
        });
        self.joints_created += 1;
        Ok(handle)
    }

    fn set_joint_drives(&mut self, joint: JointHandle, linear: DriveParams, angular: DriveParams) -> bool {
        match self.joints.get_mut(&joint) {
            Some(j) => {
                j.linear = linear;
                j.angular = angular;
                true
            }
            None => false,
        }
    }

    fn remove_joint(&mut self, joint: JointHandle) -> bool {
        if self.joints.remove(&joint).is_some() {
            self.joints_removed += 1;
            true
        } else {
            false
        }
    }
}
