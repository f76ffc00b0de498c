//! 弹簧驱动参数计算
//!
//! 刚度预设给出基础 (spring, damper, max_force)，模式在其上做乘法整形，
//! 最后按 blend 从零线性插值。blend=0 时关节不施加任何力，
//! blend=1 时为完整强度，因此附着/释放都是连续的。

use super::config::{GrabMode, Stiffness};
use crate::physics::DriveParams;

/// 单个模式的整形系数：(spring, damper, max_force)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shaping {
    pub linear: [f32; 3],
    pub angular: [f32; 3],
}

impl Shaping {
    const fn uniform(linear: f32, angular: f32) -> Self {
        Self {
            linear: [linear; 3],
            angular: [angular; 3],
        }
    }

    fn apply(factors: [f32; 3], base: DriveParams) -> DriveParams {
        base.scaled(factors[0], factors[1], factors[2])
    }
}

/// 最终线性/角驱动参数
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DrivePair {
    pub linear: DriveParams,
    pub angular: DriveParams,
}

impl DrivePair {
    pub const ZERO: Self = Self {
        linear: DriveParams::ZERO,
        angular: DriveParams::ZERO,
    };
}

/// 刚度预设基础值（Soft < Firm < Lock，三个分量严格递增）
pub fn stiffness_base(stiffness: Stiffness) -> DriveParams {
    match stiffness {
        Stiffness::Soft => DriveParams::new(200.0, 10.0, 500.0),
        Stiffness::Firm => DriveParams::new(2_000.0, 60.0, 5_000.0),
        Stiffness::Lock => DriveParams::new(20_000.0, 300.0, 100_000.0),
    }
}

/// 模式整形表（Perfect 无弹簧，返回 None）
pub fn mode_shaping(mode: GrabMode) -> Option<Shaping> {
    match mode {
        GrabMode::Hold => Some(Shaping {
            linear: [1.0, 1.0, 1.0],
            angular: [0.4, 0.4, 0.4],
        }),
        GrabMode::Glue => Some(Shaping {
            linear: [1.0, 2.5, 1.0],
            angular: [1.0, 2.5, 1.0],
        }),
        GrabMode::Loose => Some(Shaping::uniform(0.25, 0.25)),
        GrabMode::Perfect => None,
    }
}

/// 完整强度（blend=1）下的驱动参数
pub fn full_drives(stiffness: Stiffness, mode: GrabMode, position_only: bool) -> DrivePair {
    let Some(shaping) = mode_shaping(mode) else {
        return DrivePair::ZERO;
    };
    let base = stiffness_base(stiffness);
    let linear = Shaping::apply(shaping.linear, base);
    // 仅位置模式：旋转自由，角驱动强制为零
    let angular = if position_only {
        DriveParams::ZERO
    } else {
        Shaping::apply(shaping.angular, base)
    };
    DrivePair { linear, angular }
}

/// 按 blend 插值后的驱动参数
pub fn compute_drives(stiffness: Stiffness, mode: GrabMode, position_only: bool, blend: f32) -> DrivePair {
    let full = full_drives(stiffness, mode, position_only);
    DrivePair {
        linear: full.linear.lerp_from_zero(blend),
        angular: full.angular.lerp_from_zero(blend),
    }
}
