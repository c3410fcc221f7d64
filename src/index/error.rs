use std::time::Duration;

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("图库中没有带颜色信息的照片")]
    NoCandidates,
    #[error("Worker #{worker}: 颜色 #{color} 找不到最接近的照片")]
    NoCandidateFound { worker: usize, color: String },
    #[error("无效的色谱划分: worker = {worker}, workers = {workers}")]
    InvalidSpectrum { worker: usize, workers: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Worker #{worker} 执行失败: {reason}")]
    WorkerFailure { worker: usize, reason: String },
    #[error("Worker #{worker} 超过了 {limit:?} 的时间限制")]
    Timeout { worker: usize, limit: Duration },
    #[error("索引构建已取消")]
    Cancelled,
}

impl IndexError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
