//! 颜色索引
//!
//! 将 RGB 立方体按红色通道切分给多个 worker，每个 worker 独立地为区间内的每个颜色找到最接近的照片，
//! 并写入 `color:<hex>` 缓存。同一颜色的结果只取决于照片列表和匹配策略，因此重复构建是幂等的，
//! 中断后重新构建会跳过已缓存的颜色。

mod error;
pub mod matcher;
pub mod spectrum;
mod worker;

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{FutureExt, StreamExt, stream::FuturesUnordered};
use indicatif::ProgressBar;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{Receiver, channel};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

pub use self::error::IndexError;
pub use self::matcher::{ColorMatcher, MatchPolicy};
pub use self::spectrum::Spectrum;
pub use self::worker::{UnitReport, WorkerEvent};
use self::worker::WorkerUnit;
use crate::cache::{CacheFacade, LookupError};
use crate::media::{MediaRecord, sort_media};
use crate::metrics;
use crate::store::{KeyValueStore, StoreResult};
use crate::utils::{default_threads, pb_style};

/// 最多使用的 worker 数量，每个 worker 至少负责一个红色取值
pub const MAX_WORKERS: usize = spectrum::CHANNEL_LEVELS;

/// 一次索引构建的统计
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BuildSummary {
    /// worker 数量
    pub workers: usize,
    /// 本次写入的颜色数量
    pub written: u64,
    /// 已缓存而跳过的颜色数量
    pub skipped: u64,
    /// 耗时，单位为秒
    pub elapsed: f64,
}

pub struct IndexBuilder<S> {
    store: S,
    threads: Option<usize>,
    policy: MatchPolicy,
    unit_timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
    progress: bool,
}

impl<S: KeyValueStore> IndexBuilder<S> {
    pub fn new(store: S) -> Self {
        Self { store, threads: None, policy: MatchPolicy::default(), unit_timeout: None, cancel: None, progress: false }
    }

    /// worker 数量，默认为 CPU 核心数，限制在 [1, 256]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 单个 worker 的最长运行时间
    pub fn unit_timeout(mut self, limit: Option<Duration>) -> Self {
        self.unit_timeout = limit;
        self
    }

    /// 取消该 token 会中止正在进行的构建
    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// 是否显示进度条
    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub async fn open(self) -> StoreResult<ColorIndex<S>> {
        let workers = self.threads.unwrap_or_else(default_threads).clamp(1, MAX_WORKERS);
        Ok(ColorIndex {
            cache: CacheFacade::new(self.store.connect().await?),
            workers,
            policy: self.policy,
            unit_timeout: self.unit_timeout,
            cancel: self.cancel.unwrap_or_default(),
            progress: self.progress,
        })
    }
}

pub struct ColorIndex<S> {
    cache: CacheFacade<S>,
    workers: usize,
    policy: MatchPolicy,
    unit_timeout: Option<Duration>,
    cancel: CancellationToken,
    progress: bool,
}

impl<S: KeyValueStore> ColorIndex<S> {
    pub fn cache(&self) -> &CacheFacade<S> {
        &self.cache
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// 查找颜色对应的照片路径
    pub async fn lookup(&self, color: &str) -> Result<Option<String>, LookupError> {
        let result = self.cache.lookup(color).await;
        metrics::inc_lookup(match &result {
            Ok(Some(_)) => "hit",
            Ok(None) => "miss",
            Err(LookupError::InvalidColor(_)) => "invalid",
            Err(LookupError::Store(_)) => "error",
        });
        result
    }

    /// 为所有 16777216 个颜色建立索引
    pub async fn build_index(&self, media: Vec<MediaRecord>) -> Result<BuildSummary, IndexError> {
        let spectrums = Spectrum::all(self.workers)?;
        self.build_spectrums(media, spectrums).await
    }

    /// 只为指定的色谱区间建立索引
    pub async fn build_spectrums(
        &self,
        media: Vec<MediaRecord>,
        spectrums: Vec<Spectrum>,
    ) -> Result<BuildSummary, IndexError> {
        let start = Instant::now();
        let media = prepare_media(media)?;
        let workers = spectrums.len();
        info!("开始构建颜色索引: {} 张照片, {workers} 个 worker, 策略 {}", media.len(), self.policy.as_str());

        let result = self.run_units(media, spectrums).await;
        let elapsed = start.elapsed();
        metrics::observe_build_duration(self.policy.as_str(), result.is_ok(), elapsed.as_secs_f64());

        let reports = result?;
        let summary = BuildSummary {
            workers,
            written: reports.iter().map(|r| r.written).sum(),
            skipped: reports.iter().map(|r| r.skipped).sum(),
            elapsed: elapsed.as_secs_f64(),
        };
        info!(
            "颜色索引构建完成: 写入 {}, 跳过 {}, 耗时 {:.2}s",
            summary.written, summary.skipped, summary.elapsed
        );
        Ok(summary)
    }

    /// 启动所有 worker 并等待它们结束
    ///
    /// 任意一个 worker 失败都会取消其余 worker，返回第一个不是取消的错误
    async fn run_units(
        &self,
        media: Arc<[MediaRecord]>,
        spectrums: Vec<Spectrum>,
    ) -> Result<Vec<UnitReport>, IndexError> {
        // 子 token：worker 失败时只取消本次构建
        let cancel = self.cancel.child_token();
        // 调用方提前放弃构建（例如请求断开）时，停止所有 worker
        let _abort = cancel.clone().drop_guard();
        let total = spectrums.iter().map(Spectrum::cells).sum();
        let (tx, rx) = channel(spectrums.len() * 2);
        let progress = tokio::spawn(track_progress(rx, self.progress_bar(total)));

        let mut handles = FuturesUnordered::new();
        for spectrum in spectrums {
            let worker = spectrum.worker;
            let handle: JoinHandle<Result<UnitReport, IndexError>> = tokio::spawn({
                let cache = self.cache.clone();
                let unit_timeout = self.unit_timeout;
                let unit_cancel = cancel.clone();
                let media = media.clone();
                let events = tx.clone();
                let policy = self.policy;
                async move {
                    let unit = WorkerUnit {
                        spectrum,
                        cache: cache.connect().await?,
                        media,
                        policy,
                        cancel: unit_cancel,
                        events,
                    };
                    match unit_timeout {
                        Some(limit) => tokio::time::timeout(limit, unit.run())
                            .await
                            .map_err(|_| IndexError::Timeout { worker, limit })?,
                        None => unit.run().await,
                    }
                }
            });
            handles.push(handle.map(move |joined| (worker, joined)));
        }
        drop(tx);

        let mut reports = vec![];
        let mut failure: Option<IndexError> = None;
        while let Some((worker, joined)) = handles.next().await {
            let result = joined.unwrap_or_else(|e| Err(IndexError::WorkerFailure { worker, reason: e.to_string() }));
            match result {
                Ok(report) => reports.push(report),
                Err(err) => {
                    if !err.is_cancelled() {
                        error!("Worker #{worker} 失败: {err}");
                    }
                    cancel.cancel();
                    if failure.as_ref().is_none_or(IndexError::is_cancelled) {
                        failure = Some(err);
                    }
                }
            }
        }

        if let Err(e) = progress.await {
            warn!("进度显示任务异常退出: {e}");
        }

        match failure {
            Some(err) => Err(err),
            None => {
                reports.sort_by_key(|r| r.worker);
                Ok(reports)
            }
        }
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if self.progress { ProgressBar::new(total).with_style(pb_style()) } else { ProgressBar::hidden() }
    }
}

/// 去掉没有颜色信息的照片并按确定的顺序排列
fn prepare_media(mut media: Vec<MediaRecord>) -> Result<Arc<[MediaRecord]>, IndexError> {
    media.retain(|media| {
        if !media.has_color() {
            warn!("{} 没有颜色信息，已跳过", media.uri);
        }
        media.has_color()
    });
    if media.is_empty() {
        return Err(IndexError::NoCandidates);
    }
    sort_media(&mut media);
    Ok(media.into())
}

async fn track_progress(mut rx: Receiver<WorkerEvent>, pb: ProgressBar) {
    let (mut written, mut skipped) = (0, 0);
    while let Some(event) = rx.recv().await {
        match event {
            WorkerEvent::Started { worker, start, end } => {
                pb.set_message(format!("Worker #{worker}: [{start}, {end})"));
            }
            WorkerEvent::Row { written: w, skipped: s, .. } => {
                written += w;
                skipped += s;
                pb.inc(w + s);
            }
            WorkerEvent::Finished { worker, .. } => {
                pb.set_message(format!("Worker #{worker} 完成, 写入 {written}, 跳过 {skipped}"));
            }
        }
    }
    pb.finish();
}
