//! 近距离抓取运行时
//!
//! 源刚体在扫描球体内找到可附着的刚体，建立平滑混合的临时物理耦合，
//! 释放时同样平滑淡出。物理积分本身由外部引擎完成，这里只配置和查询它。

pub mod error;
pub mod grab;
pub mod physics;

pub use error::GrabError;
pub use grab::{
    AttachedInfo, Attachment, AttachmentInfo, AttachmentManager, BodyRef, GrabConfig, GrabEngine,
    GrabMode, GrabSettings, OffsetMemory, Phase, SpatialScanner, Stiffness,
};
pub use physics::{
    AxisMotion, BodyHandle, BodyIdentity, ColliderKinds, DriveParams, JointHandle, JointSpec,
    OverlapHit, PhysicsWorld, Pose, RapierWorld,
};
