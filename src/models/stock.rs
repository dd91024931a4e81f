//! 股票数据模型
//!
//! 定义行情、基本面指标以及请求参数相关的数据结构

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize, Serializer};

/// 指标缺失时的占位值
pub const NOT_AVAILABLE: &str = "N/A";

/// 单日 K 线
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Bar {
    /// 交易日（交易所本地日期）
    pub date: NaiveDate,
    /// 开盘价
    pub open: f64,
    /// 最高价
    pub high: f64,
    /// 最低价
    pub low: f64,
    /// 收盘价
    pub close: f64,
    /// 成交量
    pub volume: Option<u64>,
}

impl Bar {
    /// 检查价格字段是否自洽：low ≤ min(open, close) ≤ max(open, close) ≤ high
    pub fn is_consistent(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return false;
        }
        self.low <= self.open.min(self.close) && self.open.max(self.close) <= self.high
    }
}

/// 按日期排序的 OHLC 序列
#[derive(Debug, Serialize, Clone)]
pub struct OhlcSeries {
    /// 股票代码
    pub symbol: String,
    /// 交易所时区
    #[serde(serialize_with = "serialize_tz")]
    pub timezone: Tz,
    /// K 线，日期严格递增
    pub bars: Vec<Bar>,
}

fn serialize_tz<S: Serializer>(tz: &Tz, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(tz.name())
}

impl OhlcSeries {
    pub fn new(symbol: impl Into<String>, timezone: Tz, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            timezone,
            bars,
        }
    }

    /// 构造空序列（代码未知或区间内无交易）
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self::new(symbol, Tz::UTC, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}

/// OHLC 价格字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
}

impl PriceField {
    /// 数据源中的字段名
    pub fn key(&self) -> &'static str {
        match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PriceField::Open => "Open",
            PriceField::High => "High",
            PriceField::Low => "Low",
            PriceField::Close => "Close",
        };
        f.write_str(name)
    }
}

/// 数据源返回的行情缺少整列价格字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingPriceField {
    pub symbol: String,
    pub field: PriceField,
}

impl fmt::Display for MissingPriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No {} data for {}", self.field, self.symbol)
    }
}

impl std::error::Error for MissingPriceField {}

/// 叠加指标
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Overlay {
    #[serde(rename = "MA50")]
    Ma50,
    #[serde(rename = "MA200")]
    Ma200,
}

impl Overlay {
    pub fn name(&self) -> &'static str {
        match self {
            Overlay::Ma50 => "MA50",
            Overlay::Ma200 => "MA200",
        }
    }

    /// 均线窗口长度
    pub fn window(&self) -> usize {
        match self {
            Overlay::Ma50 => 50,
            Overlay::Ma200 => 200,
        }
    }

    /// 图表中的线条颜色
    pub fn color(&self) -> &'static str {
        match self {
            Overlay::Ma50 => "blue",
            Overlay::Ma200 => "orange",
        }
    }

    /// 解析逗号分隔的叠加指标列表，忽略无法识别的名称
    pub fn parse_list(raw: &str) -> Vec<Overlay> {
        let mut overlays: Vec<Overlay> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| match s.parse::<Overlay>() {
                Ok(o) => Some(o),
                Err(e) => {
                    log::warn!("{}", e);
                    None
                }
            })
            .collect();
        overlays.sort();
        overlays.dedup();
        overlays
    }
}

impl FromStr for Overlay {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MA50" => Ok(Overlay::Ma50),
            "MA200" => Ok(Overlay::Ma200),
            other => Err(anyhow::anyhow!("未知的叠加指标: {}", other)),
        }
    }
}

/// 与 OHLC 序列逐点对齐的派生序列，None 表示该点无值
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct OverlaySeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[cfg(test)]
impl OverlaySeries {
    /// 有值的点数
    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

/// 可视区间的一个端点
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeBound {
    /// 不带时区，按序列时区解释
    Local(NaiveDateTime),
    /// 带偏移量，换算到序列时区
    Offset(DateTime<FixedOffset>),
}

impl RangeBound {
    const DATETIME_FORMATS: [&'static str; 3] =
        ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(RangeBound::Offset(dt));
        }
        for fmt in Self::DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Some(RangeBound::Local(dt));
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .map(|d| RangeBound::Local(d.and_time(NaiveTime::default())))
    }

    /// 该端点在给定时区下的本地时间
    pub fn local_in(&self, tz: Tz) -> NaiveDateTime {
        match self {
            RangeBound::Local(dt) => *dt,
            RangeBound::Offset(dt) => dt.with_timezone(&tz).naive_local(),
        }
    }
}

/// 用户缩放/平移后的 X 轴可视区间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleRange {
    pub start: RangeBound,
    pub end: RangeBound,
}

impl VisibleRange {
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        Some(Self {
            start: RangeBound::parse(start)?,
            end: RangeBound::parse(end)?,
        })
    }

    /// 按时区换算后的闭区间，起止颠倒时自动交换
    pub fn local_bounds(&self, tz: Tz) -> (NaiveDateTime, NaiveDateTime) {
        let start = self.start.local_in(tz);
        let end = self.end.local_in(tz);
        if start <= end {
            (start, end)
        } else {
            (end, start)
        }
    }
}

/// 历史数据请求的日期区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// 从给定起始日到今天（UTC）
    pub fn since(start: NaiveDate) -> Self {
        Self {
            start,
            end: Utc::now().date_naive(),
        }
    }

    /// 解析 YYYY-MM-DD 格式的查询参数，缺省起点取 default_start，缺省终点取今天
    pub fn parse(
        start: Option<&str>,
        end: Option<&str>,
        default_start: NaiveDate,
    ) -> anyhow::Result<Self> {
        let parse_day = |raw: &str| {
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map_err(|e| anyhow::anyhow!("日期格式错误 {:?}: {}", raw, e))
        };

        let mut range = Self::since(default_start);
        if let Some(raw) = start.filter(|s| !s.trim().is_empty()) {
            range.start = parse_day(raw)?;
        }
        if let Some(raw) = end.filter(|s| !s.trim().is_empty()) {
            range.end = parse_day(raw)?;
        }
        if range.start > range.end {
            anyhow::bail!("开始日期 {} 晚于结束日期 {}", range.start, range.end);
        }
        Ok(range)
    }

    /// 区间起点对应的 UTC 时间戳（秒）
    pub fn start_timestamp(&self) -> i64 {
        Utc.from_utc_datetime(&self.start.and_time(NaiveTime::default()))
            .timestamp()
    }

    /// 区间终点对应的 UTC 时间戳（秒，包含终点当日）
    pub fn end_timestamp(&self) -> i64 {
        Utc.from_utc_datetime(&self.end.and_time(NaiveTime::default()))
            .timestamp()
            + 86_400
    }
}

/// 数据源返回的原始基本面数据，任一字段都可能缺失
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub trailing_pe: Option<f64>,
    pub beta: Option<f64>,
    pub volume: Option<f64>,
    pub open: Option<f64>,
    pub previous_close: Option<f64>,
    /// Unix 时间戳（秒）
    pub dividend_date: Option<i64>,
    /// Unix 时间戳（秒）
    pub earnings_date: Option<i64>,
    pub fifty_two_week_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub recommendation_key: Option<String>,
}

/// 指标面板展示用的基本面快照，缺失字段为 "N/A"
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MetricsSnapshot {
    /// 市盈率
    pub pe: String,
    pub beta: String,
    /// 成交量
    pub volume: String,
    /// 开盘价
    pub open: String,
    /// 昨收
    pub last_close: String,
    /// 分红日
    pub dividend_date: String,
    /// 财报日
    pub earnings_date: String,
    /// 52 周最低
    pub week52_low: String,
    /// 52 周最高
    pub week52_high: String,
    /// 分析师评级
    pub analyst: String,
}

impl MetricsSnapshot {
    /// 全部字段为 "N/A" 的快照
    pub fn unavailable() -> Self {
        let na = || NOT_AVAILABLE.to_string();
        Self {
            pe: na(),
            beta: na(),
            volume: na(),
            open: na(),
            last_close: na(),
            dividend_date: na(),
            earnings_date: na(),
            week52_low: na(),
            week52_high: na(),
            analyst: na(),
        }
    }
}

/// 基于收盘价的区间表现统计
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PerformanceStats {
    pub symbol: String,
    /// 累计收益率（小数）
    pub cumulative_return: f64,
    /// 年化波动率（小数）
    pub annual_volatility: f64,
    /// 夏普比率，收益无波动时为空
    pub sharpe_ratio: Option<f64>,
    /// 最大回撤（小数，≤ 0）
    pub max_drawdown: f64,
    /// 展示用字符串
    pub display: PerformanceDisplay,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PerformanceDisplay {
    pub cumulative_return: String,
    pub annual_volatility: String,
    pub sharpe_ratio: String,
    pub max_drawdown: String,
}

/// 搜索服务返回的一条匹配
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SymbolMatch {
    pub symbol: String,
    pub display_name: String,
}

impl SymbolMatch {
    pub fn new(symbol: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            display_name: display_name.into(),
        }
    }
}

/// 下拉框选项
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SymbolOption {
    /// 展示文本，形如 "Apple (AAPL)"
    pub label: String,
    /// 股票代码
    pub value: String,
}

impl SymbolOption {
    pub fn new(name: &str, symbol: &str) -> Self {
        Self {
            label: format!("{} ({})", name, symbol),
            value: symbol.to_string(),
        }
    }
}

/// 历史数据查询参数
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// 开始日期（YYYY-MM-DD）
    pub start: Option<String>,
    /// 结束日期（YYYY-MM-DD）
    pub end: Option<String>,
}

/// K 线图查询参数
#[derive(Debug, Default, Deserialize)]
pub struct CandlestickQuery {
    /// 逗号分隔的叠加指标，如 "MA50,MA200"
    pub options: Option<String>,
    /// 可视区间起点
    pub x0: Option<String>,
    /// 可视区间终点
    pub x1: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

/// 对比图查询参数
#[derive(Debug, Default, Deserialize)]
pub struct CompareQuery {
    /// 逗号分隔的股票代码
    pub symbols: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

/// 代码搜索参数
#[derive(Debug, Default, Deserialize)]
pub struct SymbolQuery {
    /// 搜索关键字
    pub q: Option<String>,
    /// 当前选中的代码
    pub selected: Option<String>,
}
