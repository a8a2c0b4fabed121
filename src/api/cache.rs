//! 进程级请求缓存。
//!
//! - 以请求身份（完整 URL）为键，值以 `Arc<T>` 共享且不可变；需要排序等派生时调用方自行拷贝
//! - 每个条目记录自己“提供”的标签，`invalidate` 按标签批量失效
//! - `begin`/`finish` 标记进行中的请求，配合外层 `Condvar` 做请求去重
//! - 超过 `keep_unused_for` 未被读取的条目过期；条目数到达上限时淘汰最久未用的

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Home,
    Comic,
    Category,
}

/// 缓存标签。`id == None` 表示整类标签（例如分类索引只提供裸 `Category`）。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub kind: TagKind,
    pub id: Option<String>,
}

impl Tag {
    pub fn home() -> Self {
        Self {
            kind: TagKind::Home,
            id: None,
        }
    }

    pub fn comic(slug: &str) -> Self {
        Self {
            kind: TagKind::Comic,
            id: Some(slug.to_string()),
        }
    }

    pub fn category(slug: &str) -> Self {
        Self {
            kind: TagKind::Category,
            id: Some(slug.to_string()),
        }
    }

    pub fn all(kind: TagKind) -> Self {
        Self { kind, id: None }
    }

    /// 用 `self` 作失效标签时，是否命中条目提供的 `provided`。
    fn invalidates(&self, provided: &Tag) -> bool {
        if self.kind != provided.kind {
            return false;
        }
        match &self.id {
            None => true,
            Some(id) => provided.id.as_deref() == Some(id.as_str()),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{:?}:{id}", self.kind),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

pub const DEFAULT_CAPACITY: usize = 200;
pub const KEEP_UNUSED_FOR: Duration = Duration::from_secs(300);

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    tags: Vec<Tag>,
    last_used: Instant,
}

pub struct QueryCache {
    entries: HashMap<String, Entry>,
    in_flight: HashSet<String>,
    capacity: usize,
    keep_unused_for: Duration,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::with_limits(DEFAULT_CAPACITY, KEEP_UNUSED_FOR)
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(capacity: usize, keep_unused_for: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            in_flight: HashSet::new(),
            capacity: capacity.max(1),
            keep_unused_for,
        }
    }

    /// 命中、未过期且类型一致时返回共享值，并刷新最近使用时间。
    pub fn get<T: Any + Send + Sync>(&mut self, key: &str) -> Option<Arc<T>> {
        let now = Instant::now();
        let entry = self.entries.get_mut(key)?;
        if now.duration_since(entry.last_used) >= self.keep_unused_for {
            self.entries.remove(key);
            debug!(target: "cache", key, "expired");
            return None;
        }
        entry.last_used = now;
        Arc::clone(&entry.value).downcast::<T>().ok()
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: Arc<T>, tags: Vec<Tag>) {
        let key = key.into();
        let now = Instant::now();
        self.purge_expired(now);
        if !self.entries.contains_key(&key) {
            while self.entries.len() >= self.capacity {
                self.evict_oldest();
            }
        }
        self.entries.insert(
            key,
            Entry {
                value,
                tags,
                last_used: now,
            },
        );
    }

    fn purge_expired(&mut self, now: Instant) {
        let keep = self.keep_unused_for;
        self.entries
            .retain(|_, entry| now.duration_since(entry.last_used) < keep);
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            debug!(target: "cache", key = %key, "evicted");
        }
    }

    #[cfg(test)]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 删除所有提供了匹配标签的条目，返回删除数量。
    pub fn invalidate(&mut self, tag: &Tag) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.tags.iter().any(|provided| tag.invalidates(provided)));
        let removed = before - self.entries.len();
        debug!(target: "cache", tag = %tag, removed, "invalidate");
        removed
    }

    /// 标记 `key` 开始请求。返回 `false` 表示已有同键请求在途，调用方应等待。
    pub fn begin(&mut self, key: &str) -> bool {
        self.in_flight.insert(key.to_string())
    }

    pub fn finish(&mut self, key: &str) {
        self.in_flight.remove(key);
    }

    #[cfg(test)]
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.contains(key)
    }
}
