//! 键值存储
//!
//! 索引数据保存在外部的键值缓存中（通常是 Redis），多个构建任务各自持有独立连接并发写入。
//! 由于同一个键的值只取决于输入的图库，写入之间无需加锁。

use std::future::Future;

use thiserror::Error;

mod memory;
mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// 存储不可用或命令执行失败，不做内部重试
    #[error("缓存存储不可用: {0}")]
    Unavailable(#[from] ::redis::RedisError),
    #[error("缓存数据格式错误: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("扫描模式无效: {0}")]
    Pattern(#[from] regex::Error),
    #[error("不支持的存储地址: {0}")]
    InvalidUrl(String),
}

/// 一次游标扫描的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// 下一次扫描使用的游标，为 0 时表示扫描结束
    pub cursor: u64,
    pub keys: Vec<String>,
}

impl ScanPage {
    pub fn is_done(&self) -> bool {
        self.cursor == 0
    }
}

/// 键值存储的最小接口
///
/// `scan` 遵循 Redis 的游标协议：从 0 开始，返回 0 时表示遍历结束；
/// `count` 只是每次检查的键数量提示，返回的键可能更少。
pub trait KeyValueStore: Clone + Send + Sync + 'static {
    /// 打开一个独立的新连接
    fn connect(&self) -> impl Future<Output = StoreResult<Self>> + Send;

    fn get(&self, key: &str) -> impl Future<Output = StoreResult<Option<String>>> + Send;

    fn get_many(
        &self,
        keys: &[String],
    ) -> impl Future<Output = StoreResult<Vec<Option<String>>>> + Send;

    fn set(&self, key: &str, value: &str) -> impl Future<Output = StoreResult<()>> + Send;

    /// 使用 pipeline 批量写入
    fn set_many(&self, entries: &[(String, String)]) -> impl Future<Output = StoreResult<()>> + Send;

    /// 使用 pipeline 批量删除，返回实际删除的数量
    fn delete_many(&self, keys: &[String]) -> impl Future<Output = StoreResult<u64>> + Send;

    fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> impl Future<Output = StoreResult<ScanPage>> + Send;

    /// 清空整个存储
    fn flush(&self) -> impl Future<Output = StoreResult<()>> + Send;
}

/// 根据地址选择的存储后端
///
/// - `memory://`：进程内存储，仅用于测试和本地调试
/// - `redis://` 或 `rediss://`：Redis
#[derive(Clone)]
pub enum StoreBackend {
    Memory(MemoryStore),
    Redis(RedisStore),
}

impl StoreBackend {
    pub async fn open(url: &str) -> StoreResult<Self> {
        if url.starts_with("memory://") {
            Ok(Self::Memory(MemoryStore::new()))
        } else if url.starts_with("redis://") || url.starts_with("rediss://") {
            Ok(Self::Redis(RedisStore::open(url).await?))
        } else {
            Err(StoreError::InvalidUrl(url.to_string()))
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $expr:expr) => {
        match $self {
            StoreBackend::Memory($store) => $expr,
            StoreBackend::Redis($store) => $expr,
        }
    };
}

impl KeyValueStore for StoreBackend {
    async fn connect(&self) -> StoreResult<Self> {
        Ok(match self {
            Self::Memory(store) => Self::Memory(store.connect().await?),
            Self::Redis(store) => Self::Redis(store.connect().await?),
        })
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        dispatch!(self, store => store.get(key).await)
    }

    async fn get_many(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        dispatch!(self, store => store.get_many(keys).await)
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        dispatch!(self, store => store.set(key, value).await)
    }

    async fn set_many(&self, entries: &[(String, String)]) -> StoreResult<()> {
        dispatch!(self, store => store.set_many(entries).await)
    }

    async fn delete_many(&self, keys: &[String]) -> StoreResult<u64> {
        dispatch!(self, store => store.delete_many(keys).await)
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> StoreResult<ScanPage> {
        dispatch!(self, store => store.scan(cursor, pattern, count).await)
    }

    async fn flush(&self) -> StoreResult<()> {
        dispatch!(self, store => store.flush().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_backend() {
        let store = StoreBackend::open("memory://").await.unwrap();
        assert!(matches!(store, StoreBackend::Memory(_)));
        store.set("color:000000", "a.webp").await.unwrap();
        assert_eq!(store.get("color:000000").await.unwrap().as_deref(), Some("a.webp"));

        let err = StoreBackend::open("postgres://localhost").await.err().unwrap();
        assert!(matches!(err, StoreError::InvalidUrl(_)));
    }
}
