//! 抓取引擎 - 面向宿主的入口
//!
//! 流程：grab → 扫描目标 → 查偏移记忆 → 创建附着（首次抓取记录偏移）→ 交给管理器。
//! 每个模拟步调用 update，由管理器推进所有附着并回收已淡出的附着。
//! 所有失败都以 GrabError 返回，同时更新状态文本，不会改变任何物理状态。

use glam::Vec3;

use crate::error::GrabError;
use crate::physics::{BodyHandle, BodyIdentity, PhysicsWorld, Pose};

use super::attachment::{Attachment, BodyRef, Phase};
use super::config::{get_config, GrabConfig, GrabMode, GrabSettings};
use super::manager::{AttachmentManager, ChangeListener, DetachTarget};
use super::offset_memory::OffsetMemory;
use super::scanner::{CandidatePredicate, ScanRequest, SpatialScanner};

/// 抓取成功的返回信息
#[derive(Clone, Debug, PartialEq)]
pub struct AttachedInfo {
    pub index: usize,
    pub target: BodyIdentity,
    pub mode: GrabMode,
    pub offset: Pose,
    /// 偏移是否取自记忆
    pub offset_remembered: bool,
}

/// 存活附着的只读快照
#[derive(Clone, Debug, PartialEq)]
pub struct AttachmentInfo {
    pub index: usize,
    pub target: BodyIdentity,
    pub mode: GrabMode,
    pub phase: Phase,
    pub blend: f32,
}

pub struct GrabEngine {
    settings: GrabSettings,
    origin: Option<BodyRef>,
    scanner: SpatialScanner,
    memory: OffsetMemory,
    manager: AttachmentManager,
    status: String,
}

impl Default for GrabEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GrabEngine {
    /// 使用全局配置创建
    pub fn new() -> Self {
        Self::with_settings(get_config())
    }

    pub fn with_settings(settings: GrabSettings) -> Self {
        let mut scanner = SpatialScanner::new(settings.eligible_kinds());
        scanner.set_debug_log(settings.debug_log);
        Self {
            settings,
            origin: None,
            scanner,
            memory: OffsetMemory::new(),
            manager: AttachmentManager::new(),
            status: "Ready".to_string(),
        }
    }

    pub fn settings(&self) -> &GrabSettings {
        &self.settings
    }

    /// 更新设置（只影响之后的抓取，已存在的附着保持原配置）
    pub fn set_settings(&mut self, settings: GrabSettings) {
        let settings = settings.clamped();
        self.scanner.eligible = settings.eligible_kinds();
        self.scanner.set_debug_log(settings.debug_log);
        self.settings = settings;
    }

    /// 附加候选过滤（替换扫描器，保留类别设置）
    pub fn set_candidate_predicate(&mut self, predicate: CandidatePredicate) {
        let mut scanner = SpatialScanner::new(self.settings.eligible_kinds()).with_predicate(predicate);
        scanner.set_debug_log(self.settings.debug_log);
        self.scanner = scanner;
    }

    // ========== 源刚体 ==========

    pub fn set_origin(&mut self, origin: BodyRef) {
        self.origin = Some(origin);
    }

    pub fn clear_origin(&mut self) {
        self.origin = None;
    }

    pub fn origin(&self) -> Option<&BodyRef> {
        self.origin.as_ref()
    }

    /// 抓取中心 = 源刚体位姿变换后的局部偏移
    pub fn grab_center<W: PhysicsWorld + ?Sized>(&self, world: &W) -> Option<Vec3> {
        let origin = self.origin.as_ref()?;
        let pose = world.body_pose(origin.handle)?;
        Some(pose.transform_point(self.settings.origin_offset))
    }

    // ========== 抓取 / 释放 ==========

    /// 使用当前设置在抓取中心抓取
    pub fn grab<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) -> Result<AttachedInfo, GrabError> {
        let Some(center) = self.grab_center(&*world) else {
            return Err(self.fail(GrabError::NoOriginSelected));
        };
        let radius = self.settings.grab_radius;
        let config = GrabConfig::from_settings(&self.settings);
        self.grab_at(world, center, radius, config)
    }

    /// 在指定球体内抓取最近的合格刚体
    pub fn grab_at<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        center: Vec3,
        radius: f32,
        config: GrabConfig,
    ) -> Result<AttachedInfo, GrabError> {
        let origin = self.origin.clone().filter(|o| world.body_pose(o.handle).is_some());
        let Some(origin) = origin else {
            return Err(self.fail(GrabError::NoOriginSelected));
        };
        if !(radius > 0.0) || !radius.is_finite() {
            return Err(self.fail(GrabError::InvalidRadius(radius)));
        }
        if let Err(e) = config.validate() {
            return Err(self.fail(e));
        }
        // 淡出中的附着同样占用目标，否则两个附着会争用同一个运动学标志
        if !self.settings.allow_multiple && self.manager.count() > 0 {
            return Err(self.fail(GrabError::AlreadyHolding));
        }

        let attached: Vec<BodyHandle> = self.manager.iter().map(|a| a.target().handle).collect();
        let request = ScanRequest {
            center,
            radius,
            excluded_container: Some(origin.identity.container_id.as_str()),
            excluded_body: origin.handle,
            excluded_targets: &attached,
        };
        let Some(target) = self.scanner.find_target(&*world, &request) else {
            return Err(self.fail(GrabError::NothingInRange));
        };

        let target_identity = world
            .body_identity(target)
            .unwrap_or_else(|| BodyIdentity::new("Unknown", format!("body#{}", target.0)));
        let key = OffsetMemory::key(&origin.identity, &target_identity);
        let remembered = if config.keep_offset { self.memory.get(&key) } else { None };

        let attachment = match Attachment::new(
            world,
            origin,
            BodyRef::new(target, target_identity.clone()),
            config,
            remembered,
        ) {
            Ok(attachment) => attachment,
            Err(e) => {
                log::warn!("[抓取] 抓取 '{}' 失败: {}", target_identity, e);
                self.status = format!("Failed to grab {}", target_identity.part_name);
                return Err(e);
            }
        };

        if config.keep_offset && remembered.is_none() {
            self.memory.put(key, attachment.offset());
        }

        let info = AttachedInfo {
            index: self.manager.count(),
            target: target_identity,
            mode: config.mode,
            offset: attachment.offset(),
            offset_remembered: attachment.offset_remembered(),
        };
        self.manager.add(attachment);

        log::info!(
            "[抓取] 抓住 '{}' (模式={}, 刚度={}, 记忆偏移={})",
            info.target, config.mode.name(), config.stiffness.name(), info.offset_remembered
        );
        self.status = format!("Grabbed {}", info.target.part_name);
        Ok(info)
    }

    /// 释放全部附着；返回受影响数量
    pub fn release_all<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, graceful: bool) -> usize {
        let released = if graceful {
            self.manager.detach_graceful(DetachTarget::All)
        } else {
            self.manager.detach_immediate(world, DetachTarget::All)
        }
        .unwrap_or(0);
        if released > 0 {
            log::info!("[抓取] 释放 {} 个附着 (平滑={})", released, graceful);
        }
        self.status = "Released.".to_string();
        released
    }

    /// 释放单个附着
    pub fn release_one<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        index: usize,
        graceful: bool,
    ) -> Result<usize, GrabError> {
        let result = if graceful {
            self.manager.detach_graceful(DetachTarget::Index(index))
        } else {
            self.manager.detach_immediate(world, DetachTarget::Index(index))
        };
        match result {
            Ok(released) => {
                self.status = "Released.".to_string();
                Ok(released)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// 存在附着时平滑释放，否则抓取
    pub fn toggle_grab<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) -> Result<Option<AttachedInfo>, GrabError> {
        if self.manager.count() > 0 {
            self.release_all(world, true);
            Ok(None)
        } else {
            self.grab(world).map(Some)
        }
    }

    /// 每个模拟步调用
    pub fn update<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, dt: f32) {
        self.manager.update(world, dt);
    }

    /// 宿主销毁时调用：立即销毁全部附着
    pub fn shutdown<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) {
        self.manager.clear(world);
        self.status = "Released.".to_string();
    }

    // ========== 查询 ==========

    /// 仍在抓握（未进入释放）的附着数
    pub fn holding_count(&self) -> usize {
        self.manager
            .iter()
            .filter(|a| matches!(a.phase(), Phase::BlendingIn | Phase::Steady))
            .count()
    }

    pub fn attachment_count(&self) -> usize {
        self.manager.count()
    }

    pub fn attachments(&self) -> Vec<AttachmentInfo> {
        self.manager
            .iter()
            .enumerate()
            .map(|(index, a)| AttachmentInfo {
                index,
                target: a.target().identity.clone(),
                mode: a.mode(),
                phase: a.phase(),
                blend: a.blend(),
            })
            .collect()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// 注册成员变化回调（供外部状态显示使用）
    pub fn subscribe(&mut self, listener: ChangeListener) {
        self.manager.subscribe(listener);
    }

    pub fn offsets(&self) -> &OffsetMemory {
        &self.memory
    }

    pub fn clear_offsets(&mut self) {
        self.memory.clear_all();
    }

    fn fail(&mut self, error: GrabError) -> GrabError {
        self.status = match &error {
            GrabError::NoOriginSelected => "Error: No Origin Selected".to_string(),
            GrabError::NothingInRange => "Nothing in range.".to_string(),
            GrabError::AlreadyHolding => "Already holding object.".to_string(),
            other => format!("Error: {}", other),
        };
        if self.settings.debug_log {
            log::debug!("[抓取] 请求被拒绝: {}", error);
        }
        error
    }
}
