//! 派生序列计算
//!
//! 均线与涨跌幅归一化，只依赖输入序列，每次请求重新计算

use crate::models::{OhlcSeries, Overlay, OverlaySeries};

/// 收盘价的简单移动平均
///
/// 前 `window - 1` 个点没有值。`window` 为 0 或大于序列长度时全部无值。
pub fn moving_average(series: &OhlcSeries, window: usize) -> OverlaySeries {
    OverlaySeries {
        name: format!("MA{}", window),
        values: rolling_mean(&series.closes(), window),
    }
}

fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 || window > values.len() {
        return out;
    }

    let mut sum: f64 = values[..window].iter().sum();
    out[window - 1] = Some(sum / window as f64);
    for i in window..values.len() {
        sum += values[i] - values[i - window];
        out[i] = Some(sum / window as f64);
    }
    out
}

/// 相对首个收盘价的涨跌幅（%）
///
/// 首个收盘价为 0 或非有限值时无法归一化，所有点均无值。
pub fn normalized_change(series: &OhlcSeries) -> OverlaySeries {
    let closes = series.closes();
    let values = match closes.first() {
        None => Vec::new(),
        Some(&base) if base == 0.0 || !base.is_finite() => {
            log::warn!("{} 首个收盘价为 {}，无法计算涨跌幅", series.symbol, base);
            vec![None; closes.len()]
        }
        Some(&base) => closes
            .iter()
            .map(|c| Some((c - base) / base * 100.0))
            .collect(),
    };

    OverlaySeries {
        name: series.symbol.clone(),
        values,
    }
}

/// 按选项计算叠加指标，顺序固定为 MA50、MA200
pub fn overlays(series: &OhlcSeries, options: &[Overlay]) -> Vec<OverlaySeries> {
    let mut selected = options.to_vec();
    selected.sort();
    selected.dedup();
    selected
        .into_iter()
        .map(|overlay| OverlaySeries {
            name: overlay.name().to_string(),
            ..moving_average(series, overlay.window())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Bar;
    use chrono::{Duration, NaiveDate};
    use chrono_tz::Tz;

    fn series_from_closes(symbol: &str, closes: &[f64]) -> OhlcSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                date: start + Duration::days(i as i64),
                open: c,
                high: c + 1.0,
                low: (c - 1.0).max(0.0),
                close: c,
                volume: Some(1_000),
            })
            .collect();
        OhlcSeries::new(symbol, Tz::America__New_York, bars)
    }

    #[test]
    fn test_moving_average_values() {
        let series = series_from_closes("TEST", &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let ma = moving_average(&series, 3);

        assert_eq!(ma.name, "MA3");
        assert_eq!(ma.values, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
        assert_eq!(ma.defined_count(), 5 - 3 + 1);
    }

    #[test]
    fn test_moving_average_window_edges() {
        let series = series_from_closes("TEST", &[10.0, 20.0]);
        assert_eq!(moving_average(&series, 0).values, vec![None, None]);
        assert_eq!(moving_average(&series, 3).values, vec![None, None]);
        assert_eq!(moving_average(&series, 2).values, vec![None, Some(15.0)]);
        assert_eq!(
            moving_average(&series, 1).values,
            vec![Some(10.0), Some(20.0)]
        );
    }

    #[test]
    fn test_moving_average_matches_window_mean() {
        let closes: Vec<f64> = (0..120).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let series = series_from_closes("TEST", &closes);
        let window = 20;
        let ma = moving_average(&series, window);

        assert_eq!(ma.defined_count(), closes.len() - window + 1);
        for i in (window - 1)..closes.len() {
            let expected: f64 =
                closes[i + 1 - window..=i].iter().sum::<f64>() / window as f64;
            let got = ma.values[i].unwrap();
            assert!((got - expected).abs() < 1e-9, "index {}: {} vs {}", i, got, expected);
        }
    }

    #[test]
    fn test_overlays_300_bars() {
        let closes: Vec<f64> = (0..300).map(|i| 50.0 + i as f64).collect();
        let series = series_from_closes("TEST", &closes);

        let result = overlays(&series, &[Overlay::Ma200, Overlay::Ma50, Overlay::Ma50]);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].name, "MA50");
        assert_eq!(result[0].defined_count(), 251);
        assert_eq!(result[1].name, "MA200");
        assert_eq!(result[1].defined_count(), 101);
        assert_eq!(result[1].values.len(), 300);
    }

    #[test]
    fn test_normalized_change() {
        let series = series_from_closes("A", &[100.0, 110.0, 90.0]);
        let change = normalized_change(&series);

        assert_eq!(change.name, "A");
        assert_eq!(change.values[0], Some(0.0));
        assert!((change.values[1].unwrap() - 10.0).abs() < 1e-9);
        assert!((change.values[2].unwrap() + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalized_change_independent_of_price_level() {
        let a = normalized_change(&series_from_closes("A", &[100.0, 120.0]));
        let b = normalized_change(&series_from_closes("B", &[50.0, 60.0]));

        assert_eq!(a.values[0], Some(0.0));
        assert_eq!(b.values[0], Some(0.0));
        assert_eq!(a.values[1], b.values[1]);
    }

    #[test]
    fn test_normalized_change_degenerate() {
        assert!(normalized_change(&OhlcSeries::empty("X")).values.is_empty());

        let zero = series_from_closes("Z", &[0.0, 5.0, 6.0]);
        assert_eq!(normalized_change(&zero).values, vec![None, None, None]);
    }
}
