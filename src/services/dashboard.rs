//! 看板数据流水线
//!
//! 每次用户交互（切换代码、切换指标、缩放/平移）独立走一遍：
//! 获取行情 → 计算派生序列 → 计算纵轴范围 → 组装图表。
//! 图表类接口永不返回错误，失败一律转为占位图。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;

use crate::config::DashboardConfig;
use crate::models::{
    ChartSpec, ComparisonSeries, DateRange, MetricsSnapshot, MissingPriceField, OhlcSeries,
    Overlay, PerformanceStats, SymbolOption, VisibleRange,
};
use crate::services::market_data::{self, MarketDataProvider};
use crate::services::symbols::{self, LabelCache, SymbolSearch};
use crate::services::{chart, performance, series, viewport};

/// 看板服务，持有数据源、搜索服务和名称缓存
pub struct Dashboard {
    provider: Arc<dyn MarketDataProvider>,
    search: Arc<dyn SymbolSearch>,
    labels: LabelCache,
    settings: DashboardConfig,
    timeout: Duration,
}

impl Dashboard {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        search: Arc<dyn SymbolSearch>,
        settings: DashboardConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            search,
            labels: LabelCache::new(),
            settings,
            timeout,
        }
    }

    pub fn settings(&self) -> &DashboardConfig {
        &self.settings
    }

    /// 未指定区间时的默认历史区间
    pub fn default_range(&self) -> DateRange {
        DateRange::since(self.settings.history_start)
    }

    /// 带代码的展示名称，如 "Apple (AAPL)"
    pub fn display_label(&self, symbol: &str) -> String {
        symbols::display_label(symbol, &self.labels)
    }

    /// K 线图：K 线 + 叠加均线 + 跟随可视区间的纵轴
    pub async fn candlestick(
        &self,
        symbol: &str,
        options: &[Overlay],
        visible: Option<&VisibleRange>,
        range: &DateRange,
    ) -> ChartSpec {
        let title = self.display_label(symbol);

        let series = match self.history(symbol, range).await {
            Ok(series) => series,
            Err(e) => return self.failure_chart(&title, symbol, &e),
        };

        let overlays = series::overlays(&series, options);
        let y_range = viewport::compute_y_range(&series, visible);
        chart::build_candlestick_chart(&series, &overlays, y_range, &title)
    }

    /// 累计涨跌幅对比图，并发获取各代码历史，无数据或失败的代码跳过
    pub async fn comparison(&self, symbols: &[String], range: &DateRange) -> ChartSpec {
        if symbols.is_empty() {
            return chart::build_comparison_chart(&[]);
        }

        let results = join_all(symbols.iter().map(|s| self.history(s, range))).await;

        let mut entries = Vec::with_capacity(symbols.len());
        let mut missing = Vec::new();
        for (symbol, result) in symbols.iter().zip(results) {
            match result {
                Ok(series) if !series.is_empty() => entries.push(ComparisonSeries {
                    label: self.display_label(symbol),
                    dates: series.dates(),
                    change: series::normalized_change(&series).values,
                }),
                Ok(_) => missing.push(symbol.as_str()),
                Err(e) => {
                    log::warn!("对比图获取 {} 失败: {}", symbol, e);
                    missing.push(symbol.as_str());
                }
            }
        }

        if entries.is_empty() {
            return chart::placeholder_chart(
                "Cumulative Return",
                &format!("No data for {}", missing.join(", ")),
                "Comparison",
            );
        }
        if !missing.is_empty() {
            log::info!("对比图跳过无数据的代码: {}", missing.join(", "));
        }
        chart::build_comparison_chart(&entries)
    }

    /// 基本面快照，永不失败
    pub async fn metrics(&self, symbol: &str) -> MetricsSnapshot {
        market_data::fetch_metrics(self.provider.as_ref(), symbol, self.timeout).await
    }

    /// 校验后的历史 K 线
    pub async fn history(&self, symbol: &str, range: &DateRange) -> Result<OhlcSeries> {
        market_data::fetch_history(self.provider.as_ref(), symbol, range, self.timeout).await
    }

    /// 区间表现统计，K 线不足两根时为 None
    pub async fn performance(
        &self,
        symbol: &str,
        range: &DateRange,
    ) -> Result<Option<PerformanceStats>> {
        let series = self.history(symbol, range).await?;
        Ok(performance::performance_stats(&series))
    }

    /// 搜索框下拉选项，未指定选中代码时使用配置的默认代码
    pub async fn symbol_options(
        &self,
        query: Option<&str>,
        selected: Option<&str>,
    ) -> Vec<SymbolOption> {
        let selected = selected
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(self.settings.default_symbol.as_str());
        symbols::resolve_options(self.search.as_ref(), &self.labels, query, Some(selected)).await
    }

    fn failure_chart(&self, title: &str, symbol: &str, error: &anyhow::Error) -> ChartSpec {
        let message = match error.downcast_ref::<MissingPriceField>() {
            Some(missing) => missing.to_string(),
            None => {
                log::warn!("获取 {} 行情失败: {:#}", symbol, error);
                format!("Error fetching {}", symbol)
            }
        };
        chart::placeholder_chart(title, &message, "Candlestick Chart")
    }
}
