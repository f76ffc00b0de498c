//! 空间扫描器
//!
//! 查询与抓取球体重叠的刚体，按到球心的距离平方升序排列，
//! 返回第一个通过全部排除规则的候选。纯查询，无副作用。

use glam::Vec3;

use crate::physics::{BodyHandle, BodyIdentity, ColliderKinds, OverlapHit, PhysicsWorld};

/// 调用方自定义的候选过滤
pub type CandidatePredicate = Box<dyn Fn(&OverlapHit, Option<&BodyIdentity>) -> bool>;

/// 扫描请求
#[derive(Clone, Copy, Debug)]
pub struct ScanRequest<'a> {
    pub center: Vec3,
    pub radius: f32,
    /// 与源刚体相连的容器（其下刚体不能被自抓取）
    pub excluded_container: Option<&'a str>,
    /// 源刚体本身
    pub excluded_body: BodyHandle,
    /// 已被附着占用的刚体（同一对刚体只允许一个附着）
    pub excluded_targets: &'a [BodyHandle],
}

/// 空间扫描器
pub struct SpatialScanner {
    /// 可抓取的碰撞体类别
    pub eligible: ColliderKinds,
    predicate: Option<CandidatePredicate>,
    debug_log: bool,
}

impl Default for SpatialScanner {
    fn default() -> Self {
        Self::new(ColliderKinds::SOLID)
    }
}

impl SpatialScanner {
    pub fn new(eligible: ColliderKinds) -> Self {
        Self {
            eligible,
            predicate: None,
            debug_log: false,
        }
    }

    /// 附加自定义过滤（返回 false 的候选被拒绝）
    pub fn with_predicate(mut self, predicate: CandidatePredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn set_debug_log(&mut self, enabled: bool) {
        self.debug_log = enabled;
    }

    /// 查找最近的合格目标
    pub fn find_target<W: PhysicsWorld + ?Sized>(&self, world: &W, request: &ScanRequest<'_>) -> Option<BodyHandle> {
        let include_triggers = self.eligible.contains(ColliderKinds::TRIGGER);
        let mut hits = world.query_overlapping(request.center, request.radius, include_triggers);

        // 稳定排序：距离相同时保持查询原顺序
        hits.sort_by(|a, b| {
            let da = a.position.distance_squared(request.center);
            let db = b.position.distance_squared(request.center);
            da.total_cmp(&db)
        });

        hits.into_iter()
            .find(|hit| self.accepts(world, hit, request))
            .map(|hit| hit.body)
    }

    fn accepts<W: PhysicsWorld + ?Sized>(&self, world: &W, hit: &OverlapHit, request: &ScanRequest<'_>) -> bool {
        if hit.body == request.excluded_body {
            return false;
        }
        if request.excluded_targets.contains(&hit.body) {
            self.reject(hit, "already attached");
            return false;
        }

        let identity = world.body_identity(hit.body);

        if let (Some(container), Some(id)) = (request.excluded_container, identity.as_ref()) {
            if id.container_id == container {
                self.reject(hit, "linked to source container");
                return false;
            }
        }

        // 网格关节优先判定，其次触发体，其余视为普通刚体
        let category = if hit.kind.contains(ColliderKinds::MESH_JOINT) {
            ColliderKinds::MESH_JOINT
        } else if hit.kind.contains(ColliderKinds::TRIGGER) {
            ColliderKinds::TRIGGER
        } else {
            ColliderKinds::SOLID
        };
        if !self.eligible.contains(category) {
            self.reject(hit, "category not eligible");
            return false;
        }

        if let Some(predicate) = &self.predicate {
            if !predicate(hit, identity.as_ref()) {
                self.reject(hit, "rejected by predicate");
                return false;
            }
        }

        true
    }

    fn reject(&self, hit: &OverlapHit, reason: &str) {
        if self.debug_log {
            log::debug!("[扫描] 跳过刚体 {:?}: {}", hit.body, reason);
        }
    }
}
