//! 行情数据访问
//!
//! 对外部数据源的统一封装：
//! - 历史 K 线：代码未知或区间内无交易时返回空序列而非错误
//! - 基本面指标：任何失败都降级为全 "N/A" 快照
//! - 入口处校验 K 线，丢弃不自洽的数据
//! - 所有请求带超时，超时视为获取失败

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{anyhow, Result};
use futures::future::BoxFuture;

use crate::models::{Bar, DateRange, Fundamentals, MetricsSnapshot, OhlcSeries};
use crate::services::formatting::{format_date, format_number, format_ratio};

/// 行情数据源
pub trait MarketDataProvider: Send + Sync {
    /// 日 K 线历史，代码未知时返回空序列
    fn history<'a>(
        &'a self,
        symbol: &'a str,
        range: &'a DateRange,
    ) -> BoxFuture<'a, Result<OhlcSeries>>;

    /// 基本面原始数据
    fn fundamentals<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, Result<Fundamentals>>;
}

/// 获取并校验历史 K 线
pub async fn fetch_history(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    range: &DateRange,
    timeout: Duration,
) -> Result<OhlcSeries> {
    let series = tokio::time::timeout(timeout, provider.history(symbol, range))
        .await
        .map_err(|_| anyhow!("获取 {} 历史数据超时（{:?}）", symbol, timeout))??;

    let series = validate_series(series);
    log::info!(
        "获取 {} 历史数据 {} 条（{} ~ {}）",
        symbol,
        series.len(),
        range.start,
        range.end
    );
    Ok(series)
}

/// 获取基本面快照，失败时返回全 "N/A"
pub async fn fetch_metrics(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    timeout: Duration,
) -> MetricsSnapshot {
    match tokio::time::timeout(timeout, provider.fundamentals(symbol)).await {
        Ok(Ok(fundamentals)) => metrics_snapshot(&fundamentals),
        Ok(Err(e)) => {
            log::warn!("获取 {} 基本面数据失败: {}", symbol, e);
            MetricsSnapshot::unavailable()
        }
        Err(_) => {
            log::warn!("获取 {} 基本面数据超时（{:?}）", symbol, timeout);
            MetricsSnapshot::unavailable()
        }
    }
}

/// 原始基本面数据格式化为展示快照，缺失字段逐项填 "N/A"
pub fn metrics_snapshot(f: &Fundamentals) -> MetricsSnapshot {
    MetricsSnapshot {
        pe: format_ratio(f.trailing_pe),
        beta: format_ratio(f.beta),
        volume: format_number(f.volume),
        open: format_number(f.open),
        last_close: format_number(f.previous_close),
        dividend_date: format_date(f.dividend_date),
        earnings_date: format_date(f.earnings_date),
        week52_low: format_number(f.fifty_two_week_low),
        week52_high: format_number(f.fifty_two_week_high),
        analyst: f
            .recommendation_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_uppercase)
            .unwrap_or_else(|| crate::models::NOT_AVAILABLE.to_string()),
    }
}

/// 校验 K 线：丢弃价格不自洽的数据，按日期排序并去重（同日保留最后一条）
pub fn validate_series(series: OhlcSeries) -> OhlcSeries {
    let OhlcSeries {
        symbol,
        timezone,
        bars,
    } = series;
    let total = bars.len();

    let mut by_date: BTreeMap<chrono::NaiveDate, Bar> = BTreeMap::new();
    let mut rejected = 0usize;
    for bar in bars {
        if bar.is_consistent() {
            by_date.insert(bar.date, bar);
        } else {
            rejected += 1;
            log::debug!("{} 丢弃异常 K 线: {:?}", symbol, bar);
        }
    }

    let duplicates = total - rejected - by_date.len();
    if rejected > 0 || duplicates > 0 {
        log::warn!(
            "{} 共 {} 条 K 线，丢弃异常 {} 条，合并重复日期 {} 条",
            symbol,
            total,
            rejected,
            duplicates
        );
    }

    OhlcSeries {
        symbol,
        timezone,
        bars: by_date.into_values().collect(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;
    use chrono_tz::Tz;
    use futures::FutureExt;
    use std::collections::HashMap;

    /// 内存行情源，供各模块测试使用
    #[derive(Default)]
    pub(crate) struct FakeProvider {
        pub histories: HashMap<String, OhlcSeries>,
        pub fundamentals: HashMap<String, Fundamentals>,
        /// 设置后所有请求都会失败
        pub fail_with: Option<String>,
        /// 设置后请求会挂起这么久
        pub delay: Option<Duration>,
    }

    impl FakeProvider {
        pub fn with_history(mut self, series: OhlcSeries) -> Self {
            self.histories.insert(series.symbol.clone(), series);
            self
        }
    }

    impl MarketDataProvider for FakeProvider {
        fn history<'a>(
            &'a self,
            symbol: &'a str,
            _range: &'a DateRange,
        ) -> BoxFuture<'a, Result<OhlcSeries>> {
            async move {
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                if let Some(msg) = &self.fail_with {
                    return Err(anyhow!(msg.clone()));
                }
                Ok(self
                    .histories
                    .get(symbol)
                    .cloned()
                    .unwrap_or_else(|| OhlcSeries::empty(symbol)))
            }
            .boxed()
        }

        fn fundamentals<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, Result<Fundamentals>> {
            async move {
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                if let Some(msg) = &self.fail_with {
                    return Err(anyhow!(msg.clone()));
                }
                self.fundamentals
                    .get(symbol)
                    .cloned()
                    .ok_or_else(|| anyhow!("unknown symbol {}", symbol))
            }
            .boxed()
        }
    }

    pub(crate) fn linear_series(symbol: &str, start_close: f64, len: usize) -> OhlcSeries {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let bars = (0..len)
            .map(|i| {
                let close = start_close + i as f64;
                Bar {
                    date: start + chrono::Duration::days(i as i64),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: Some(1_000_000),
                }
            })
            .collect();
        OhlcSeries::new(symbol, Tz::America__New_York, bars)
    }

    fn range() -> DateRange {
        DateRange::since(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
    }

    fn bar(day: u32, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    #[test]
    fn test_validate_series_drops_and_sorts() {
        let series = OhlcSeries::new(
            "TEST",
            Tz::UTC,
            vec![
                bar(3, 10.0, 11.0, 9.0, 10.5),
                bar(1, 10.0, 11.0, 9.0, 10.5),
                bar(2, 10.0, 9.5, 9.0, 10.5),      // high < close
                bar(4, f64::NAN, 11.0, 9.0, 10.5), // NaN
                bar(3, 12.0, 13.0, 11.0, 12.5),    // 重复日期
            ],
        );
        let validated = validate_series(series);

        let days: Vec<String> = validated.bars.iter().map(|b| b.date.to_string()).collect();
        assert_eq!(days, vec!["2024-05-01", "2024-05-03"]);
        assert_eq!(validated.bars[1].close, 12.5);
    }

    #[test]
    fn test_metrics_snapshot_partial() {
        let fundamentals = Fundamentals {
            trailing_pe: Some(31.4159),
            volume: Some(52_300_000.0),
            fifty_two_week_high: Some(199.62),
            recommendation_key: Some("buy".to_string()),
            ..Fundamentals::default()
        };
        let snapshot = metrics_snapshot(&fundamentals);

        assert_eq!(snapshot.pe, "31.416");
        assert_eq!(snapshot.volume, "52.30M");
        assert_eq!(snapshot.week52_high, "199.62");
        assert_eq!(snapshot.analyst, "BUY");
        assert_eq!(snapshot.beta, "N/A");
        assert_eq!(snapshot.dividend_date, "N/A");
        assert_eq!(snapshot.week52_low, "N/A");
    }

    #[tokio::test]
    async fn test_fetch_history_unknown_symbol_is_empty() {
        let provider = FakeProvider::default();
        let series = fetch_history(&provider, "ZZZZ", &range(), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(series.is_empty());
        assert_eq!(series.symbol, "ZZZZ");
    }

    #[tokio::test]
    async fn test_fetch_history_timeout_is_error() {
        let provider = FakeProvider {
            delay: Some(Duration::from_millis(200)),
            ..FakeProvider::default()
        }
        .with_history(linear_series("AAPL", 100.0, 5));

        let result = fetch_history(&provider, "AAPL", &range(), Duration::from_millis(20)).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("超时"));
    }

    #[tokio::test]
    async fn test_fetch_metrics_never_fails() {
        let failing = FakeProvider {
            fail_with: Some("HTTP 401".to_string()),
            ..FakeProvider::default()
        };
        let snapshot = fetch_metrics(&failing, "AAPL", Duration::from_secs(1)).await;
        assert_eq!(snapshot, MetricsSnapshot::unavailable());

        let slow = FakeProvider {
            delay: Some(Duration::from_millis(200)),
            ..FakeProvider::default()
        };
        let snapshot = fetch_metrics(&slow, "AAPL", Duration::from_millis(20)).await;
        assert_eq!(snapshot.analyst, "N/A");
    }

    #[tokio::test]
    async fn test_fetch_metrics_success() {
        let mut provider = FakeProvider::default();
        provider.fundamentals.insert(
            "AAPL".to_string(),
            Fundamentals {
                beta: Some(1.286),
                open: Some(187.15),
                ..Fundamentals::default()
            },
        );
        let snapshot = fetch_metrics(&provider, "AAPL", Duration::from_secs(1)).await;
        assert_eq!(snapshot.beta, "1.286");
        assert_eq!(snapshot.open, "187.15");
        assert_eq!(snapshot.pe, "N/A");
    }
}
