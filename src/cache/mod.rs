//! 带命名空间的缓存操作
//!
//! 所有需要遍历键空间的操作都基于游标扫描，每次只检查 [`SCAN_PAGE`] 个键，
//! 不会把整个键空间读入内存。

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::color::normalize_hex;
use crate::media::MediaRecord;
use crate::store::{KeyValueStore, ScanPage, StoreError, StoreResult};

pub mod prefix;

pub use self::prefix::{ClearTarget, Namespace, prefix};

/// 每次游标扫描检查的键数量
pub const SCAN_PAGE: usize = 100;

/// 各命名空间的键数量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CacheStats {
    pub color: u64,
    pub media: u64,
    pub total: u64,
}

/// 缓存切片中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SliceEntry {
    /// 带命名空间的完整键
    pub key: String,
    pub value: String,
}

/// 清理缓存的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClearOutcome {
    #[serde(rename = "type")]
    pub target: ClearTarget,
    /// 清空全部缓存时不统计数量
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries_cleared: Option<u64>,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("颜色应为 6 位十六进制: {0}")]
    InvalidColor(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 在键值存储之上提供带命名空间的读写、统计、切片和清理
#[derive(Clone)]
pub struct CacheFacade<S> {
    store: S,
}

impl<S: KeyValueStore> CacheFacade<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 打开一个使用独立连接的实例
    pub async fn connect(&self) -> StoreResult<Self> {
        Ok(Self::new(self.store.connect().await?))
    }

    pub async fn get(&self, namespace: Namespace, key: &str) -> StoreResult<Option<String>> {
        self.store.get(&prefix(namespace, key)).await
    }

    pub async fn set(&self, namespace: Namespace, key: &str, value: &str) -> StoreResult<()> {
        self.store.set(&prefix(namespace, key), value).await
    }

    pub async fn get_many<K: AsRef<str>>(
        &self,
        namespace: Namespace,
        keys: &[K],
    ) -> StoreResult<Vec<Option<String>>> {
        let keys = keys.iter().map(|key| prefix(namespace, key.as_ref())).collect::<Vec<_>>();
        self.store.get_many(&keys).await
    }

    pub async fn set_many(&self, namespace: Namespace, entries: &[(String, String)]) -> StoreResult<()> {
        let entries = entries
            .iter()
            .map(|(key, value)| (prefix(namespace, key), value.clone()))
            .collect::<Vec<_>>();
        self.store.set_many(&entries).await
    }

    /// 读取缓存的照片信息
    pub async fn get_media(&self, file_name: &str) -> StoreResult<Option<MediaRecord>> {
        match self.get(Namespace::Media, file_name).await? {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    pub async fn put_media(&self, file_name: &str, media: &MediaRecord) -> StoreResult<()> {
        let value = serde_json::to_string(media)?;
        self.set(Namespace::Media, file_name, &value).await
    }

    /// 查找颜色对应的照片路径，颜色允许带 `#` 和大写字母
    pub async fn lookup(&self, color: &str) -> Result<Option<String>, LookupError> {
        let hex = normalize_hex(color).ok_or_else(|| LookupError::InvalidColor(color.to_string()))?;
        Ok(self.get(Namespace::Color, &hex).await?)
    }

    async fn count_keys(&self, namespace: Namespace) -> StoreResult<u64> {
        let pattern = namespace.pattern();
        let mut cursor = 0;
        let mut count = 0;
        loop {
            let page = self.store.scan(cursor, &pattern, SCAN_PAGE).await?;
            count += page.keys.len() as u64;
            if page.is_done() {
                break;
            }
            cursor = page.cursor;
        }
        Ok(count)
    }

    pub async fn stats(&self) -> StoreResult<CacheStats> {
        let color = self.count_keys(Namespace::Color).await?;
        let media = self.count_keys(Namespace::Media).await?;
        Ok(CacheStats { color, media, total: color + media })
    }

    pub async fn clear(&self, target: ClearTarget) -> StoreResult<ClearOutcome> {
        info!("开始清理缓存: {target}");

        let Some(namespace) = target.namespace() else {
            self.store.flush().await?;
            info!("已清空全部缓存");
            return Ok(ClearOutcome {
                target,
                entries_cleared: None,
                message: "All cache cleared successfully".to_string(),
            });
        };

        let pattern = namespace.pattern();
        let mut cursor = 0;
        let mut cleared = 0;
        loop {
            let page = self.store.scan(cursor, &pattern, SCAN_PAGE).await?;
            cleared += self.store.delete_many(&page.keys).await?;
            if page.is_done() {
                break;
            }
            cursor = page.cursor;
        }

        if cleared == 0 {
            info!("没有找到 {namespace} 缓存");
        } else {
            info!("已清理 {cleared} 条 {namespace} 缓存");
        }

        Ok(ClearOutcome {
            target,
            entries_cleared: Some(cleared),
            message: "Cache cleared successfully".to_string(),
        })
    }

    /// 按扫描顺序取出第 `start` 个起的至多 `count` 条缓存
    ///
    /// 扫描顺序由存储决定，并发写入时不稳定，只适合调试查看
    pub async fn slice(&self, namespace: Namespace, start: usize, count: usize) -> StoreResult<Vec<SliceEntry>> {
        if count == 0 {
            return Ok(vec![]);
        }

        let pattern = namespace.pattern();
        let end = start.saturating_add(count);
        let mut cursor = 0;
        let mut index = 0;
        let mut keys = vec![];

        loop {
            let ScanPage { cursor: next, keys: page } = self.store.scan(cursor, &pattern, SCAN_PAGE).await?;
            for key in page {
                if index >= start && index < end {
                    keys.push(key);
                }
                index += 1;
            }
            if next == 0 || keys.len() >= count {
                break;
            }
            cursor = next;
        }

        let values = self.store.get_many(&keys).await?;
        let entries = keys
            .into_iter()
            .zip(values)
            .filter_map(|(key, value)| Some(SliceEntry { key, value: value? }))
            .collect::<Vec<_>>();
        debug!("{namespace} 缓存切片: start = {start}, 返回 {} 条", entries.len());
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Hsl;
    use crate::store::MemoryStore;

    async fn facade_with(colors: usize, medias: usize) -> CacheFacade<MemoryStore> {
        let cache = CacheFacade::new(MemoryStore::new());
        let colors = (0..colors).map(|i| (format!("{i:06x}"), format!("{i}.webp"))).collect::<Vec<_>>();
        cache.set_many(Namespace::Color, &colors).await.unwrap();
        for i in 0..medias {
            cache.put_media(&format!("photo_{i}"), &MediaRecord::new(format!("photo_{i}.webp"))).await.unwrap();
        }
        cache
    }

    #[tokio::test]
    async fn test_round_trip() {
        let cache = CacheFacade::new(MemoryStore::new());
        cache.set(Namespace::Color, "ff0000", "red.webp").await.unwrap();
        assert_eq!(cache.get(Namespace::Color, "ff0000").await.unwrap().as_deref(), Some("red.webp"));
        assert_eq!(cache.get(Namespace::Media, "ff0000").await.unwrap(), None);
        assert_eq!(cache.store().get("color:ff0000").await.unwrap().as_deref(), Some("red.webp"));

        let values = cache.get_many(Namespace::Color, &["ff0000", "00ff00"]).await.unwrap();
        assert_eq!(values, vec![Some("red.webp".to_string()), None]);
    }

    #[tokio::test]
    async fn test_media_record() {
        let cache = CacheFacade::new(MemoryStore::new());
        let media = MediaRecord::new("posts/a.webp").with_hsl(Hsl::new(0.1, 0.2, 0.3));
        cache.put_media(media.file_name(), &media).await.unwrap();
        assert_eq!(cache.get_media("a").await.unwrap(), Some(media));
        assert_eq!(cache.get_media("b").await.unwrap(), None);

        cache.set(Namespace::Media, "broken", "{").await.unwrap();
        assert!(matches!(cache.get_media("broken").await, Err(StoreError::Codec(_))));
    }

    #[tokio::test]
    async fn test_lookup() {
        let cache = facade_with(0, 0).await;
        cache.set(Namespace::Color, "ff00aa", "pink.webp").await.unwrap();
        assert_eq!(cache.lookup("#FF00AA").await.unwrap().as_deref(), Some("pink.webp"));
        assert_eq!(cache.lookup("ff00aa").await.unwrap().as_deref(), Some("pink.webp"));
        assert_eq!(cache.lookup("000000").await.unwrap(), None);
        assert!(matches!(cache.lookup("red").await, Err(LookupError::InvalidColor(_))));
    }

    #[tokio::test]
    async fn test_stats() {
        let cache = facade_with(1234, 7).await;
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats, CacheStats { color: 1234, media: 7, total: 1241 });
    }

    #[tokio::test]
    async fn test_clear_namespace() {
        let cache = facade_with(350, 5).await;
        let outcome = cache.clear(ClearTarget::Color).await.unwrap();
        assert_eq!(outcome.entries_cleared, Some(350));
        assert_eq!(cache.stats().await.unwrap(), CacheStats { color: 0, media: 5, total: 5 });

        let outcome = cache.clear(ClearTarget::Color).await.unwrap();
        assert_eq!(outcome.entries_cleared, Some(0));
    }

    #[tokio::test]
    async fn test_clear_all() {
        let cache = facade_with(10, 5).await;
        let outcome = cache.clear(ClearTarget::All).await.unwrap();
        assert_eq!(outcome.entries_cleared, None);
        assert!(cache.store().is_empty());

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json, serde_json::json!({"type": "all", "message": "All cache cleared successfully"}));
    }

    #[tokio::test]
    async fn test_slice() {
        let cache = facade_with(250, 3).await;

        let first = cache.slice(Namespace::Color, 0, 10).await.unwrap();
        assert_eq!(first.len(), 10);
        assert!(first.iter().all(|entry| entry.key.starts_with("color:")));

        // 相邻窗口不重叠
        let second = cache.slice(Namespace::Color, 10, 10).await.unwrap();
        assert_eq!(second.len(), 10);
        assert!(second.iter().all(|entry| !first.contains(entry)));

        let tail = cache.slice(Namespace::Color, 245, 10).await.unwrap();
        assert_eq!(tail.len(), 5);
        assert!(cache.slice(Namespace::Color, 1000, 10).await.unwrap().is_empty());
        assert!(cache.slice(Namespace::Color, 0, 0).await.unwrap().is_empty());

        let media = cache.slice(Namespace::Media, 0, 10).await.unwrap();
        assert_eq!(media.len(), 3);
    }
}
