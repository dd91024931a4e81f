//! 区间表现统计
//!
//! 累计收益、年化波动率、夏普比率（无风险利率取 0）和最大回撤

use crate::models::{OhlcSeries, PerformanceDisplay, PerformanceStats, NOT_AVAILABLE};
use crate::services::formatting::format_percent;

/// 年化使用的交易日数
const TRADING_DAYS: f64 = 252.0;

/// 至少需要两根 K 线，否则返回 None
pub fn performance_stats(series: &OhlcSeries) -> Option<PerformanceStats> {
    let closes = series.closes();
    if closes.len() < 2 || closes.iter().any(|c| *c <= 0.0) {
        return None;
    }

    let returns: Vec<f64> = closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    let first = closes[0];
    let last = closes[closes.len() - 1];
    let cumulative_return = last / first - 1.0;

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let std = sample_std(&returns, mean);
    let annual_volatility = std * TRADING_DAYS.sqrt();
    let sharpe_ratio = (std > 0.0).then(|| mean / std * TRADING_DAYS.sqrt());

    let mut peak = f64::MIN;
    let mut max_drawdown = 0.0_f64;
    for close in &closes {
        peak = peak.max(*close);
        max_drawdown = max_drawdown.min(close / peak - 1.0);
    }

    Some(PerformanceStats {
        symbol: series.symbol.clone(),
        cumulative_return,
        annual_volatility,
        sharpe_ratio,
        max_drawdown,
        display: PerformanceDisplay {
            cumulative_return: format_percent(cumulative_return),
            annual_volatility: format_percent(annual_volatility),
            sharpe_ratio: sharpe_ratio
                .map(|s| format!("{:.2}", s))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            max_drawdown: format_percent(max_drawdown),
        },
    })
}

/// 样本标准差（n - 1），单个样本时为 0
fn sample_std(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}
