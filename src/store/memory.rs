use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

use regex::Regex;

use super::{KeyValueStore, ScanPage, StoreResult};

/// 进程内的键值存储
///
/// 所有连接共享同一份数据。与 Redis 类似，扫描按键的哈希值排序，游标是下一个待检查的哈希值，
/// 因此扫描过程中删除键不会导致其他键被跳过。
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    values: HashMap<String, String>,
    order: BTreeSet<(u64, String)>,
}

impl Inner {
    fn insert(&mut self, key: &str, value: &str) {
        if self.values.insert(key.to_string(), value.to_string()).is_none() {
            self.order.insert((slot(key), key.to_string()));
        }
    }

    fn remove(&mut self, key: &str) -> bool {
        if self.values.remove(key).is_some() {
            self.order.remove(&(slot(key), key.to_string()));
            return true;
        }
        false
    }
}

/// 键在扫描顺序中的位置，0 保留给“扫描结束”
fn slot(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish().max(1)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("failed to acquire rw lock").values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    async fn connect(&self) -> StoreResult<Self> {
        Ok(self.clone())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let inner = self.inner.read().expect("failed to acquire rw lock");
        Ok(inner.values.get(key).cloned())
    }

    async fn get_many(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        let inner = self.inner.read().expect("failed to acquire rw lock");
        Ok(keys.iter().map(|key| inner.values.get(key).cloned()).collect())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.inner.write().expect("failed to acquire rw lock").insert(key, value);
        Ok(())
    }

    async fn set_many(&self, entries: &[(String, String)]) -> StoreResult<()> {
        let mut inner = self.inner.write().expect("failed to acquire rw lock");
        for (key, value) in entries {
            inner.insert(key, value);
        }
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> StoreResult<u64> {
        let mut inner = self.inner.write().expect("failed to acquire rw lock");
        Ok(keys.iter().filter(|key| inner.remove(key)).count() as u64)
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> StoreResult<ScanPage> {
        let re = pattern_regex(pattern)?;
        let inner = self.inner.read().expect("failed to acquire rw lock");
        let count = count.max(1);

        let mut examined = inner.order.range((cursor, String::new())..);
        let keys = examined
            .by_ref()
            .take(count)
            .filter(|(_, key)| re.is_match(key))
            .map(|(_, key)| key.clone())
            .collect();

        let cursor = examined.next().map(|(slot, _)| *slot).unwrap_or(0);
        Ok(ScanPage { cursor, keys })
    }

    async fn flush(&self) -> StoreResult<()> {
        let mut inner = self.inner.write().expect("failed to acquire rw lock");
        inner.values.clear();
        inner.order.clear();
        Ok(())
    }
}

/// 将 Redis 风格的通配符转换为正则表达式，支持 `*` 和 `?`
fn pattern_regex(pattern: &str) -> StoreResult<Regex> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push_str("^(?s:");
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    re.push_str(")$");
    Ok(Regex::new(&re)?)
}
