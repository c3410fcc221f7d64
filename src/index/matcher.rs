use clap::ValueEnum;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::color::{DEFAULT_PRECISION, Hsl, hue_difference, is_equal_with_precision};
use crate::media::MediaRecord;

const HUE_WEIGHT: f64 = 0.6;
const SATURATION_WEIGHT: f64 = 0.2;
const LIGHTNESS_WEIGHT: f64 = 0.4;

/// 选择最接近照片的策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// 以目标颜色为基准，最小化色相、饱和度、亮度差的加权和
    #[default]
    Weighted,
    /// 依次比较色相、亮度、饱和度，基准颜色为当前最优照片的颜色
    Prioritized,
}

impl MatchPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weighted => "weighted",
            Self::Prioritized => "prioritized",
        }
    }
}

/// 在候选照片中查找与目标颜色最接近的一张
///
/// 结果只取决于候选列表的顺序和目标颜色
#[derive(Debug, Clone, Copy)]
pub struct ColorMatcher<'a> {
    candidates: &'a [MediaRecord],
    policy: MatchPolicy,
    worker: usize,
}

impl<'a> ColorMatcher<'a> {
    pub fn new(candidates: &'a [MediaRecord], policy: MatchPolicy) -> Self {
        Self { candidates, policy, worker: 0 }
    }

    /// 日志中显示的 worker 编号
    pub fn worker(mut self, worker: usize) -> Self {
        self.worker = worker;
        self
    }

    pub fn find_closest(&self, target: Hsl) -> Option<&'a MediaRecord> {
        match self.policy {
            MatchPolicy::Weighted => self.weighted(target),
            MatchPolicy::Prioritized => self.prioritized(target),
        }
    }

    fn colored(&self) -> impl Iterator<Item = (&'a MediaRecord, Hsl)> + 'a {
        let worker = self.worker;
        self.candidates.iter().filter_map(move |media| match media.average_color_hsl {
            Some(hsl) => Some((media, hsl)),
            None => {
                warn!("Worker #{worker}: {} 没有颜色信息", media.uri);
                None
            }
        })
    }

    fn weighted(&self, target: Hsl) -> Option<&'a MediaRecord> {
        let mut best = None;
        let mut best_diff = f64::INFINITY;

        for (media, hsl) in self.colored() {
            let diff = hue_difference(hsl.hue, target.hue) * HUE_WEIGHT
                + (hsl.saturation - target.saturation).abs() * SATURATION_WEIGHT
                + (hsl.lightness - target.lightness).abs() * LIGHTNESS_WEIGHT;
            // 严格小于，相同差值时保留靠前的照片
            if diff < best_diff {
                best_diff = diff;
                best = Some(media);
            }
        }

        best
    }

    fn prioritized(&self, target: Hsl) -> Option<&'a MediaRecord> {
        let mut best = None;
        let mut reference = target;
        let (mut hue_best, mut lightness_best, mut saturation_best) =
            (f64::INFINITY, f64::INFINITY, f64::INFINITY);

        for (media, hsl) in self.colored() {
            let hue_diff = hue_difference(hsl.hue, reference.hue);
            if hue_diff < hue_best {
                (hue_best, lightness_best, saturation_best) = (hue_diff, f64::INFINITY, f64::INFINITY);
                best = Some(media);
                reference = hsl;
                continue;
            }
            if !is_equal_with_precision(hue_diff, hue_best, DEFAULT_PRECISION) {
                continue;
            }

            let lightness_diff = (hsl.lightness - reference.lightness).abs();
            if lightness_diff < lightness_best {
                (hue_best, lightness_best, saturation_best) = (hue_diff, lightness_diff, f64::INFINITY);
                best = Some(media);
                reference = hsl;
                continue;
            }
            if !is_equal_with_precision(lightness_diff, lightness_best, DEFAULT_PRECISION) {
                continue;
            }

            let saturation_diff = (hsl.saturation - reference.saturation).abs();
            if saturation_diff < saturation_best {
                (hue_best, lightness_best, saturation_best) = (hue_diff, lightness_diff, saturation_diff);
                best = Some(media);
                reference = hsl;
            }
        }

        best
    }
}
