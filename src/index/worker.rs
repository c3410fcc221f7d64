use std::sync::Arc;

use log::{debug, info};
use tokio::sync::mpsc::Sender;
use tokio::task::spawn_blocking;
use tokio_util::sync::CancellationToken;

use super::IndexError;
use super::matcher::{ColorMatcher, MatchPolicy};
use super::spectrum::{CHANNEL_LEVELS, Spectrum};
use crate::cache::{CacheFacade, Namespace};
use crate::color::{rgb_to_hex, rgb_to_hsl};
use crate::media::MediaRecord;
use crate::metrics;
use crate::store::KeyValueStore;

/// worker 向调度方报告的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Started { worker: usize, start: usize, end: usize },
    /// 处理完 `(red, green)` 这一行的 256 个颜色
    Row { worker: usize, red: u8, green: u8, written: u64, skipped: u64 },
    Finished { worker: usize, written: u64, skipped: u64 },
}

/// 单个 worker 的处理结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitReport {
    pub worker: usize,
    pub written: u64,
    pub skipped: u64,
}

/// 负责一段红色通道区间的 worker
pub struct WorkerUnit<S> {
    pub(super) spectrum: Spectrum,
    pub(super) cache: CacheFacade<S>,
    pub(super) media: Arc<[MediaRecord]>,
    pub(super) policy: MatchPolicy,
    pub(super) cancel: CancellationToken,
    pub(super) events: Sender<WorkerEvent>,
}

impl<S: KeyValueStore> WorkerUnit<S> {
    pub async fn run(self) -> Result<UnitReport, IndexError> {
        let worker = self.spectrum.worker;
        let Spectrum { start, end, .. } = self.spectrum;
        info!("Worker #{worker} 开始处理色谱区间 [{start}, {end})");
        self.emit(WorkerEvent::Started { worker, start, end }).await;

        let mut report = UnitReport { worker, ..Default::default() };
        for red in self.spectrum.range() {
            for green in 0..CHANNEL_LEVELS {
                if self.cancel.is_cancelled() {
                    info!("Worker #{worker} 已取消");
                    return Err(IndexError::Cancelled);
                }

                let (red, green) = (red as u8, green as u8);
                let (written, skipped) = self.process_row(red, green).await?;
                report.written += written;
                report.skipped += skipped;
                metrics::inc_index_cells(written, skipped);
                self.emit(WorkerEvent::Row { worker, red, green, written, skipped }).await;
            }
        }

        info!(
            "Worker #{worker} 完成色谱区间 [{start}, {end}): 写入 {}, 跳过 {}",
            report.written, report.skipped
        );
        self.emit(WorkerEvent::Finished { worker, written: report.written, skipped: report.skipped }).await;
        Ok(report)
    }

    /// 处理一行颜色，返回写入和跳过的数量
    ///
    /// 已缓存的颜色直接跳过，因此中断后重新构建不会重复写入
    async fn process_row(&self, red: u8, green: u8) -> Result<(u64, u64), IndexError> {
        let worker = self.spectrum.worker;
        let keys = (0..=u8::MAX).map(|blue| rgb_to_hex(red, green, blue)).collect::<Vec<_>>();
        let cached = self.cache.get_many(Namespace::Color, &keys).await?;

        // 颜色匹配是纯计算，放到阻塞线程池中执行，不占用异步 worker
        let media = self.media.clone();
        let policy = self.policy;
        let entries = spawn_blocking(move || {
            let matcher = ColorMatcher::new(&media, policy).worker(worker);
            keys.into_iter()
                .zip(cached)
                .zip(0..=u8::MAX)
                .filter(|((_, value), _)| value.is_none())
                .map(|((key, _), blue)| match matcher.find_closest(rgb_to_hsl([red, green, blue, 255])) {
                    Some(media) => Ok((key, media.uri.clone())),
                    None => Err(IndexError::NoCandidateFound { worker, color: key }),
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| IndexError::WorkerFailure { worker, reason: e.to_string() })??;

        let written = entries.len() as u64;
        let skipped = CHANNEL_LEVELS as u64 - written;
        if written == 0 {
            debug!("Worker #{worker}: {red:02x}{green:02x} 这一行已全部缓存");
        } else {
            self.cache.set_many(Namespace::Color, &entries).await?;
        }
        Ok((written, skipped))
    }

    async fn emit(&self, event: WorkerEvent) {
        // 调度方不再接收事件时直接丢弃
        let _ = self.events.send(event).await;
    }
}
