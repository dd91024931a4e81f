//! Y 轴可视范围计算
//!
//! 根据当前 X 轴可视区间内的 K 线重新计算纵轴上下界，并留出 5% 边距

use chrono::NaiveTime;

use crate::models::{Bar, OhlcSeries, VisibleRange, YRange};

/// 边距比例
const PADDING_RATIO: f64 = 0.05;

/// 参与计算的价格字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YSource {
    /// K 线图：最低价 / 最高价
    HighLow,
    /// 折线图：只有收盘价
    Close,
}

impl YSource {
    fn bounds(&self, bar: &Bar) -> (f64, f64) {
        match self {
            YSource::HighLow => (bar.low, bar.high),
            YSource::Close => (bar.close, bar.close),
        }
    }
}

/// K 线图的纵轴范围，序列为空时返回 None
pub fn compute_y_range(series: &OhlcSeries, visible: Option<&VisibleRange>) -> Option<YRange> {
    compute_y_range_with(series, visible, YSource::HighLow)
}

/// 按指定价格字段计算纵轴范围
///
/// 可视区间内没有 K 线时退回整段序列的极值。
pub fn compute_y_range_with(
    series: &OhlcSeries,
    visible: Option<&VisibleRange>,
    source: YSource,
) -> Option<YRange> {
    let windowed = visible.and_then(|range| {
        let (start, end) = range.local_bounds(series.timezone);
        let bars: Vec<&Bar> = series
            .bars
            .iter()
            .filter(|bar| {
                let ts = bar.date.and_time(NaiveTime::default());
                start <= ts && ts <= end
            })
            .collect();
        if bars.is_empty() {
            log::debug!("{} 可视区间内无数据，使用全量范围", series.symbol);
            None
        } else {
            extremes(bars.into_iter(), source)
        }
    });

    let (low, high) = match windowed {
        Some(bounds) => bounds,
        None => extremes(series.bars.iter(), source)?,
    };

    Some(pad(low.max(0.0), high))
}

fn extremes<'a>(bars: impl Iterator<Item = &'a Bar>, source: YSource) -> Option<(f64, f64)> {
    bars.map(|bar| source.bounds(bar))
        .fold(None, |acc, (lo, hi)| match acc {
            None => Some((lo, hi)),
            Some((min, max)) => Some((f64::min(min, lo), f64::max(max, hi))),
        })
}

fn pad(y_min: f64, y_max: f64) -> YRange {
    let span = if y_max != y_min { y_max - y_min } else { y_max };
    let padding = span * PADDING_RATIO;
    YRange {
        min: y_min - padding,
        max: y_max + padding,
    }
}
