//! Yahoo Finance 数据源实现
//!
//! - 日 K 线: v8 chart 接口
//! - 基本面: v10 quoteSummary 接口（需要 cookie + crumb）
//! - 代码搜索: v1 search 接口

use anyhow::{anyhow, Context, Result};
use chrono::DateTime;
use chrono_tz::Tz;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use url::Url;

use crate::config::ProviderConfig;
use crate::models::{
    Bar, DateRange, Fundamentals, MissingPriceField, OhlcSeries, PriceField, SymbolMatch,
};
use crate::services::market_data::MarketDataProvider;
use crate::services::symbols::{SymbolSearch, MAX_SEARCH_RESULTS};

/// quoteSummary 需要的模块
const SUMMARY_MODULES: &str = "summaryDetail,calendarEvents,financialData";

/// Yahoo Finance 客户端
pub struct YahooClient {
    client: Client,
    config: ProviderConfig,
}

impl YahooClient {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .cookie_store(true)
            .gzip(true)
            .build()
            .context("创建 HTTP 客户端失败")?;
        Ok(Self { client, config })
    }

    /// 在基础地址后追加代码路径段
    fn symbol_url(base: &str, symbol: &str) -> Result<Url> {
        let mut url = Url::parse(base).with_context(|| format!("无效的接口地址: {}", base))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("接口地址不能追加路径: {}", base))?
            .push(symbol);
        Ok(url)
    }

    async fn get_history(&self, symbol: &str, range: &DateRange) -> Result<OhlcSeries> {
        let mut url = Self::symbol_url(&self.config.chart_url, symbol)?;
        url.query_pairs_mut()
            .append_pair("period1", &range.start_timestamp().to_string())
            .append_pair("period2", &range.end_timestamp().to_string())
            .append_pair("interval", "1d")
            .append_pair("events", "history");

        log::debug!("请求日K线数据 URL: {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();

        // 未知代码返回 404，但响应体仍是带 error 字段的 JSON
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(anyhow!("获取 {} 历史数据失败: {}", symbol, status));
        }

        let json: Value = response.json().await?;
        parse_chart_response(&json, symbol)
    }

    /// 获取 crumb，失败时返回 None 并继续无 crumb 请求
    async fn get_crumb(&self) -> Option<String> {
        // 先访问一次以获取 cookie，响应状态无关紧要
        if let Err(e) = self.client.get(&self.config.cookie_url).send().await {
            log::debug!("获取 cookie 失败: {}", e);
        }

        let response = self.client.get(&self.config.crumb_url).send().await.ok()?;
        if !response.status().is_success() {
            log::debug!("获取 crumb 失败: {}", response.status());
            return None;
        }
        let crumb = response.text().await.ok()?;
        let crumb = crumb.trim();
        (!crumb.is_empty() && !crumb.contains('<')).then(|| crumb.to_string())
    }

    async fn get_fundamentals(&self, symbol: &str) -> Result<Fundamentals> {
        let mut url = Self::symbol_url(&self.config.summary_url, symbol)?;
        url.query_pairs_mut().append_pair("modules", SUMMARY_MODULES);
        if let Some(crumb) = self.get_crumb().await {
            url.query_pairs_mut().append_pair("crumb", &crumb);
        }

        log::debug!("请求基本面数据 URL: {}", url);
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("获取 {} 基本面数据失败: {}", symbol, response.status()));
        }

        let json: Value = response.json().await?;
        parse_summary_response(&json)
    }

    async fn get_search(&self, query: &str) -> Result<Vec<SymbolMatch>> {
        let mut url = Url::parse(&self.config.search_url)
            .with_context(|| format!("无效的接口地址: {}", self.config.search_url))?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("quotesCount", &MAX_SEARCH_RESULTS.to_string())
            .append_pair("newsCount", "0");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("搜索 {:?} 失败: {}", query, response.status()));
        }

        let json: Value = response.json().await?;
        Ok(parse_search_response(&json))
    }
}

impl MarketDataProvider for YahooClient {
    fn history<'a>(
        &'a self,
        symbol: &'a str,
        range: &'a DateRange,
    ) -> BoxFuture<'a, Result<OhlcSeries>> {
        self.get_history(symbol, range).boxed()
    }

    fn fundamentals<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, Result<Fundamentals>> {
        self.get_fundamentals(symbol).boxed()
    }
}

impl SymbolSearch for YahooClient {
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<SymbolMatch>>> {
        self.get_search(query).boxed()
    }
}

/// 解析 chart 接口响应
///
/// 格式: {"chart": {"result": [{"meta": {...}, "timestamp": [...],
///        "indicators": {"quote": [{"open": [...], "high": [...], ...}]}}], "error": null}}
fn parse_chart_response(json: &Value, symbol: &str) -> Result<OhlcSeries> {
    let chart = &json["chart"];

    let error = &chart["error"];
    if !error.is_null() {
        let code = error["code"].as_str().unwrap_or("");
        let description = error["description"].as_str().unwrap_or("");
        if code == "Not Found" {
            log::info!("{} 无行情数据: {}", symbol, description);
            return Ok(OhlcSeries::empty(symbol));
        }
        return Err(anyhow!("行情接口返回错误 {}: {}", code, description));
    }

    let result = match chart["result"].get(0) {
        Some(result) => result,
        None => return Ok(OhlcSeries::empty(symbol)),
    };

    let timezone = result["meta"]["exchangeTimezoneName"]
        .as_str()
        .and_then(|name| name.parse::<Tz>().ok())
        .unwrap_or(Tz::UTC);

    let timestamps: Vec<Option<i64>> = match result["timestamp"].as_array() {
        Some(arr) if !arr.is_empty() => arr.iter().map(Value::as_i64).collect(),
        _ => return Ok(OhlcSeries::new(symbol, timezone, Vec::new())),
    };

    let quote = &result["indicators"]["quote"][0];
    let open = price_column(quote, symbol, PriceField::Open)?;
    let high = price_column(quote, symbol, PriceField::High)?;
    let low = price_column(quote, symbol, PriceField::Low)?;
    let close = price_column(quote, symbol, PriceField::Close)?;
    let volume = quote["volume"].as_array();

    let price = |col: &Vec<Value>, i: usize| col.get(i).and_then(Value::as_f64);
    let mut bars = Vec::with_capacity(timestamps.len());
    let mut skipped = 0usize;
    for (i, ts) in timestamps.iter().enumerate() {
        let date = ts
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .map(|dt| dt.with_timezone(&timezone).date_naive());
        match (date, price(open, i), price(high, i), price(low, i), price(close, i)) {
            (Some(date), Some(open), Some(high), Some(low), Some(close)) => bars.push(Bar {
                date,
                open,
                high,
                low,
                close,
                volume: volume.and_then(|v| v.get(i)).and_then(Value::as_u64),
            }),
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        log::debug!("{} 跳过 {} 条不完整的 K 线", symbol, skipped);
    }

    Ok(OhlcSeries::new(symbol, timezone, bars))
}

/// 整列缺失时返回 MissingPriceField，便于图表提示具体字段
fn price_column<'a>(quote: &'a Value, symbol: &str, field: PriceField) -> Result<&'a Vec<Value>> {
    quote[field.key()].as_array().ok_or_else(|| {
        anyhow::Error::new(MissingPriceField {
            symbol: symbol.to_string(),
            field,
        })
    })
}

/// 取 {"raw": x, "fmt": "..."} 或裸数值
fn raw_f64(value: &Value) -> Option<f64> {
    value["raw"].as_f64().or_else(|| value.as_f64())
}

fn raw_i64(value: &Value) -> Option<i64> {
    value["raw"].as_i64().or_else(|| value.as_i64())
}

/// 解析 quoteSummary 接口响应，缺失的字段保持为 None
fn parse_summary_response(json: &Value) -> Result<Fundamentals> {
    let summary = &json["quoteSummary"];
    if !summary["error"].is_null() {
        return Err(anyhow!(
            "基本面接口返回错误: {}",
            summary["error"]["description"].as_str().unwrap_or("unknown")
        ));
    }
    let result = summary["result"]
        .get(0)
        .ok_or_else(|| anyhow!("基本面接口返回空结果"))?;

    let detail = &result["summaryDetail"];
    let calendar = &result["calendarEvents"];

    Ok(Fundamentals {
        trailing_pe: raw_f64(&detail["trailingPE"]),
        beta: raw_f64(&detail["beta"]),
        volume: raw_f64(&detail["volume"]),
        open: raw_f64(&detail["open"]),
        previous_close: raw_f64(&detail["previousClose"]),
        dividend_date: raw_i64(&calendar["dividendDate"]),
        earnings_date: raw_i64(&calendar["earnings"]["earningsDate"][0]),
        fifty_two_week_low: raw_f64(&detail["fiftyTwoWeekLow"]),
        fifty_two_week_high: raw_f64(&detail["fiftyTwoWeekHigh"]),
        recommendation_key: result["financialData"]["recommendationKey"]
            .as_str()
            .map(str::to_string),
    })
}

/// 解析搜索接口响应，名称依次取 shortname、shortName、longname，最后退回代码
fn parse_search_response(json: &Value) -> Vec<SymbolMatch> {
    json["quotes"]
        .as_array()
        .map(|quotes| {
            quotes
                .iter()
                .filter_map(|q| {
                    let symbol = q["symbol"].as_str().filter(|s| !s.is_empty())?;
                    let name = ["shortname", "shortName", "longname"]
                        .iter()
                        .find_map(|key| q[*key].as_str().filter(|s| !s.is_empty()))
                        .unwrap_or(symbol);
                    Some(SymbolMatch::new(symbol, name))
                })
                .take(MAX_SEARCH_RESULTS)
                .collect()
        })
        .unwrap_or_default()
}
