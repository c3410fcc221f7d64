use std::ops::Range;

use super::IndexError;

/// 红色通道的取值数量
pub const CHANNEL_LEVELS: usize = 256;

/// 一个 worker 负责的红色通道区间 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spectrum {
    pub start: usize,
    pub end: usize,
    pub worker: usize,
    pub workers: usize,
}

impl Spectrum {
    /// 计算第 `worker` 个 worker 的区间，共 `workers` 个 worker
    ///
    /// `workers` 超过 256 时部分区间为空，同样视为无效
    pub fn new(workers: usize, worker: usize) -> Result<Self, IndexError> {
        if workers == 0 || workers > CHANNEL_LEVELS || worker >= workers {
            return Err(IndexError::InvalidSpectrum { worker, workers });
        }
        Ok(Self {
            start: CHANNEL_LEVELS * worker / workers,
            end: CHANNEL_LEVELS * (worker + 1) / workers,
            worker,
            workers,
        })
    }

    /// 所有 worker 的区间，按顺序覆盖 `[0, 256)`
    pub fn all(workers: usize) -> Result<Vec<Self>, IndexError> {
        (0..workers.max(1)).map(|worker| Self::new(workers, worker)).collect()
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// 区间内红色取值的数量
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// 区间内的颜色总数
    pub fn cells(&self) -> u64 {
        (self.len() * CHANNEL_LEVELS * CHANNEL_LEVELS) as u64
    }
}
