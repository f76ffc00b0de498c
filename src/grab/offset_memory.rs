//! 偏移记忆
//!
//! 以 (源身份, 目标身份) 为键保存首次抓取时目标在源局部空间的相对位姿，
//! 再次抓取同一对刚体时直接复用，避免刚体漂移后重新计算导致"跳变"。
//! 无淘汰策略，条目在组件生命周期内一直保留。

use std::collections::HashMap;

use crate::physics::{BodyIdentity, Pose};

/// 偏移记忆键（有序：交换源/目标得到不同的键）
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OffsetKey {
    source: BodyIdentity,
    target: BodyIdentity,
}

impl OffsetKey {
    pub fn new(source: &BodyIdentity, target: &BodyIdentity) -> Self {
        Self {
            source: source.clone(),
            target: target.clone(),
        }
    }

    pub fn source(&self) -> &BodyIdentity {
        &self.source
    }

    pub fn target(&self) -> &BodyIdentity {
        &self.target
    }
}

/// 记忆条目：源刚体局部空间中的相对位置与旋转
pub type OffsetEntry = Pose;

#[derive(Debug, Default, Clone)]
pub struct OffsetMemory {
    entries: HashMap<OffsetKey, OffsetEntry>,
}

impl OffsetMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(source: &BodyIdentity, target: &BodyIdentity) -> OffsetKey {
        OffsetKey::new(source, target)
    }

    pub fn get(&self, key: &OffsetKey) -> Option<OffsetEntry> {
        self.entries.get(key).copied()
    }

    /// 写入（每个键只写一次）；已存在时保留旧值并返回 false
    pub fn put(&mut self, key: OffsetKey, entry: OffsetEntry) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, entry);
        true
    }

    /// 显式清除单个条目
    pub fn clear(&mut self, key: &OffsetKey) -> Option<OffsetEntry> {
        self.entries.remove(key)
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
