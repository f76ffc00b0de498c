//! 抓取错误类型
//!
//! 全部是调用方可恢复的状态，失败的抓取不会留下任何关节或运动学标志。

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GrabError {
    /// 未选择源刚体（或源刚体已失效）
    #[error("no origin selected")]
    NoOriginSelected,

    /// 扫描范围内没有可抓取的刚体
    #[error("nothing in range")]
    NothingInRange,

    /// 物理引擎拒绝创建关节
    #[error("joint creation failed: {0}")]
    JointCreationFailed(String),

    /// 单抓取策略下已持有物体
    #[error("already holding object")]
    AlreadyHolding,

    #[error("blend speed must be positive and finite, got {0}")]
    InvalidBlendSpeed(f32),

    #[error("grab radius must be positive and finite, got {0}")]
    InvalidRadius(f32),

    #[error("attachment index {index} out of range (count: {count})")]
    IndexOutOfRange { index: usize, count: usize },
}
