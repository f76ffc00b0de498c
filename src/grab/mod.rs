//! 抓取核心
//!
//! - SpatialScanner: 扫描抓取球体内最近的合格刚体
//! - OffsetMemory: 记忆首次抓取的相对位姿
//! - Attachment: 单个附着的 blend 状态机与驱动计算
//! - AttachmentManager: 持有并推进所有附着
//! - GrabEngine: 面向宿主的入口（抓取/释放/状态）

pub mod config;
mod attachment;
mod drive;
mod engine;
mod manager;
mod offset_memory;
mod scanner;

pub use attachment::{Attachment, BodyRef, Phase};
pub use config::{get_config, reset_config, set_config, GrabConfig, GrabMode, GrabSettings, Stiffness};
pub use drive::{compute_drives, full_drives, mode_shaping, stiffness_base, DrivePair, Shaping};
pub use engine::{AttachedInfo, AttachmentInfo, GrabEngine};
pub use manager::{AttachmentManager, ChangeKind, ChangeListener, DetachTarget, MembershipChange};
pub use offset_memory::{OffsetEntry, OffsetKey, OffsetMemory};
pub use scanner::{CandidatePredicate, ScanRequest, SpatialScanner};
