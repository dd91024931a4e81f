//! 展示格式化工具
//!
//! 把原始数值/日期转换为指标面板中的字符串，无法转换时返回 "N/A"

use chrono::DateTime;

use crate::models::NOT_AVAILABLE;

/// 大数缩写：≥1e9 记为 B，≥1e6 记为 M，≥1e3 记为 K，其余保留两位小数
pub fn format_number(value: Option<f64>) -> String {
    match value {
        Some(num) if num.is_finite() => {
            if num >= 1e9 {
                format!("{:.2}B", num / 1e9)
            } else if num >= 1e6 {
                format!("{:.2}M", num / 1e6)
            } else if num >= 1e3 {
                format!("{:.2}K", num / 1e3)
            } else {
                format!("{:.2}", num)
            }
        }
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// 比率类指标保留三位小数，缺失或为 0 时视为不可用
pub fn format_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() && v != 0.0 => format!("{:.3}", v),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Unix 时间戳（秒）格式化为 dd/mm/yyyy（UTC）
pub fn format_date(timestamp: Option<i64>) -> String {
    timestamp
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// 小数格式化为百分比，保留两位小数
pub fn format_percent(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}%", value * 100.0)
    } else {
        NOT_AVAILABLE.to_string()
    }
}
