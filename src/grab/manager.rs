//! 附着管理器
//!
//! 唯一拥有所有存活附着：每步先更新全部附着，再回收已完成淡出的附着，
//! 保证本步降到 blend=0 的附着在移除前仍被更新一次。
//! 不做去重、不限制数量，"同时只抓一个"之类的策略由调用方决定。

use crate::error::GrabError;
use crate::physics::PhysicsWorld;

use super::attachment::Attachment;

/// 成员变化类型
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    /// 平滑释放完成后回收
    Reaped,
    /// 立即释放
    Detached,
    Cleared,
}

/// 成员变化通知
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MembershipChange {
    pub kind: ChangeKind,
    /// 本次变化涉及的附着数
    pub affected: usize,
    /// 变化后的存活数
    pub count: usize,
}

pub type ChangeListener = Box<dyn FnMut(&MembershipChange)>;

/// 释放选择：单个索引或全部
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetachTarget {
    Index(usize),
    All,
}

#[derive(Default)]
pub struct AttachmentManager {
    attachments: Vec<Attachment>,
    listeners: Vec<ChangeListener>,
}

impl AttachmentManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册成员变化回调
    pub fn subscribe(&mut self, listener: ChangeListener) {
        self.listeners.push(listener);
    }

    pub fn add(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
        self.notify(ChangeKind::Added, 1);
    }

    pub fn count(&self) -> usize {
        self.attachments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Attachment> {
        self.attachments.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.iter()
    }

    /// 每步更新：先全部更新，再回收死亡附着
    pub fn update<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, dt: f32) {
        for attachment in &mut self.attachments {
            attachment.update(world, dt);
        }

        let before = self.attachments.len();
        self.attachments.retain_mut(|attachment| {
            if attachment.is_dead() {
                attachment.destroy(world);
                false
            } else {
                true
            }
        });

        let reaped = before - self.attachments.len();
        if reaped > 0 {
            self.notify(ChangeKind::Reaped, reaped);
        }
    }

    /// 平滑释放：切换到 Detaching，不立即移除；返回进入释放的数量
    pub fn detach_graceful(&mut self, target: DetachTarget) -> Result<usize, GrabError> {
        match target {
            DetachTarget::Index(index) => {
                let count = self.attachments.len();
                let attachment = self
                    .attachments
                    .get_mut(index)
                    .ok_or(GrabError::IndexOutOfRange { index, count })?;
                Ok(usize::from(attachment.begin_detach()))
            }
            DetachTarget::All => Ok(self
                .attachments
                .iter_mut()
                .map(|a| usize::from(a.begin_detach()))
                .sum()),
        }
    }

    /// 立即释放：销毁并同步移除，跳过淡出
    pub fn detach_immediate<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        target: DetachTarget,
    ) -> Result<usize, GrabError> {
        match target {
            DetachTarget::Index(index) => {
                let count = self.attachments.len();
                if index >= count {
                    return Err(GrabError::IndexOutOfRange { index, count });
                }
                let mut attachment = self.attachments.remove(index);
                attachment.destroy(world);
                self.notify(ChangeKind::Detached, 1);
                Ok(1)
            }
            DetachTarget::All => {
                let removed = self.destroy_all(world);
                if removed > 0 {
                    self.notify(ChangeKind::Cleared, removed);
                }
                Ok(removed)
            }
        }
    }

    /// 强制清空（宿主销毁时调用），不产生错误
    pub fn clear<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) {
        let removed = self.destroy_all(world);
        if removed > 0 {
            self.notify(ChangeKind::Cleared, removed);
        }
    }

    fn destroy_all<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) -> usize {
        let drained: Vec<Attachment> = self.attachments.drain(..).collect();
        let removed = drained.len();
        for mut attachment in drained {
            attachment.destroy(world);
        }
        removed
    }

    fn notify(&mut self, kind: ChangeKind, affected: usize) {
        let change = MembershipChange {
            kind,
            affected,
            count: self.attachments.len(),
        };
        for listener in &mut self.listeners {
            listener(&change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grab::attachment::{BodyRef, Phase};
    use crate::grab::config::{GrabConfig, GrabMode, Stiffness};
    use crate::physics::mock_world::MockWorld;
    use crate::physics::BodyIdentity;
    use glam::Vec3;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn config(mode: GrabMode) -> GrabConfig {
        GrabConfig {
            stiffness: Stiffness::Soft,
            mode,
            blend_speed: 4.0,
            position_only: false,
            keep_offset: true,
        }
    }

    fn attach(world: &mut MockWorld, part: &str, mode: GrabMode) -> Attachment {
        let hand = world.add_body("Person", "rHand", Vec3::ZERO);
        let target = world.add_body("Prop", part, Vec3::X * 0.1);
        Attachment::new(
            world,
            BodyRef::new(hand, BodyIdentity::new("Person", "rHand")),
            BodyRef::new(target, BodyIdentity::new("Prop", part)),
            config(mode),
            None,
        )
        .unwrap()
    }

    fn recorder(manager: &mut AttachmentManager) -> Rc<RefCell<Vec<MembershipChange>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        manager.subscribe(Box::new(move |change| sink.borrow_mut().push(*change)));
        log
    }

    #[test]
    fn test_graceful_detach_reaps() {
        let mut world = MockWorld::new();
        let mut manager = AttachmentManager::new();
        let changes = recorder(&mut manager);

        manager.add(attach(&mut world, "a", GrabMode::Hold));
        manager.add(attach(&mut world, "b", GrabMode::Glue));
        assert_eq!(manager.count(), 2);

        for _ in 0..10 {
            manager.update(&mut world, 0.05);
        }
        assert!(manager.iter().all(|a| a.phase() == Phase::Steady));

        assert_eq!(manager.detach_graceful(DetachTarget::Index(0)), Ok(1));
        assert_eq!(manager.count(), 2);

        // 1 / (0.05 * 4) = 5 步
        for _ in 0..5 {
            manager.update(&mut world, 0.05);
        }
        assert_eq!(manager.count(), 1);
        assert_eq!(manager.get(0).unwrap().target().identity.part_name, "b");
        assert_eq!(world.joints_removed, 1);

        let log = changes.borrow();
        assert_eq!(log.len(), 3);
        assert_eq!(log[2], MembershipChange { kind: ChangeKind::Reaped, affected: 1, count: 1 });
    }

    #[test]
    fn test_detach_immediate() {
        let mut world = MockWorld::new();
        let mut manager = AttachmentManager::new();
        let changes = recorder(&mut manager);

        manager.add(attach(&mut world, "a", GrabMode::Hold));
        manager.add(attach(&mut world, "b", GrabMode::Perfect));
        manager.add(attach(&mut world, "c", GrabMode::Loose));

        assert_eq!(manager.detach_immediate(&mut world, DetachTarget::Index(1)), Ok(1));
        assert_eq!(manager.count(), 2);
        assert_eq!(
            manager.detach_immediate(&mut world, DetachTarget::Index(5)),
            Err(GrabError::IndexOutOfRange { index: 5, count: 2 })
        );
        assert_eq!(manager.detach_immediate(&mut world, DetachTarget::All), Ok(2));
        assert!(manager.is_empty());
        assert!(world.joints.is_empty());
        assert_eq!(world.joints_removed, 2);
        // Perfect 目标的运动学标志已恢复
        assert!(world.bodies.values().all(|b| !b.kinematic));

        let kinds: Vec<ChangeKind> = changes.borrow().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Added, ChangeKind::Added, ChangeKind::Added, ChangeKind::Detached, ChangeKind::Cleared]
        );
    }

    #[test]
    fn test_graceful_all_and_out_of_range() {
        let mut world = MockWorld::new();
        let mut manager = AttachmentManager::new();
        manager.add(attach(&mut world, "a", GrabMode::Hold));
        manager.add(attach(&mut world, "b", GrabMode::Hold));

        assert!(manager.detach_graceful(DetachTarget::Index(2)).is_err());
        assert_eq!(manager.detach_graceful(DetachTarget::All), Ok(2));
        // 重复请求不再计数
        assert_eq!(manager.detach_graceful(DetachTarget::All), Ok(0));

        // 淡入未开始即释放：blend 本就为 0，下一步即回收
        manager.update(&mut world, 0.016);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_reaped_attachment_updated_once() {
        let mut world = MockWorld::new();
        let mut manager = AttachmentManager::new();
        manager.add(attach(&mut world, "a", GrabMode::Perfect));
        manager.detach_graceful(DetachTarget::All).unwrap();

        let moves_before = world.kinematic_moves.len();
        // 一步即降到 0（4.0 * 0.5 > 1）
        manager.update(&mut world, 0.5);
        assert!(manager.is_empty());
        assert_eq!(world.kinematic_moves.len(), moves_before + 1);
    }

    #[test]
    fn test_clear_without_attachments_is_silent() {
        let mut world = MockWorld::new();
        let mut manager = AttachmentManager::new();
        let changes = recorder(&mut manager);
        manager.clear(&mut world);
        assert!(changes.borrow().is_empty());
    }
}
