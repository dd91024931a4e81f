use actix_web::{web, HttpResponse, Result};
use serde::Serialize;

use crate::models::{ApiResponse, DateRange, HistoryQuery, MetricsSnapshot, OhlcSeries, PerformanceStats};
use crate::services::dashboard::Dashboard;
use crate::services::symbols::normalize_symbol;

/// 校验代码与日期参数，失败时返回 400 响应
fn parse_request<T: Serialize>(
    dashboard: &Dashboard,
    raw_symbol: &str,
    query: &HistoryQuery,
) -> std::result::Result<(String, DateRange), HttpResponse> {
    let symbol = normalize_symbol(raw_symbol).ok_or_else(|| {
        HttpResponse::BadRequest().json(ApiResponse::<T>::error(format!(
            "无效的股票代码: {}",
            raw_symbol
        )))
    })?;
    let range = DateRange::parse(
        query.start.as_deref(),
        query.end.as_deref(),
        dashboard.settings().history_start,
    )
    .map_err(|e| HttpResponse::BadRequest().json(ApiResponse::<T>::error(e.to_string())))?;
    Ok((symbol, range))
}

pub async fn get_stock_history(
    dashboard: web::Data<Dashboard>,
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse> {
    let (symbol, range) = match parse_request::<OhlcSeries>(&dashboard, &path, &query) {
        Ok(parsed) => parsed,
        Err(response) => return Ok(response),
    };

    match dashboard.history(&symbol, &range).await {
        Ok(series) => {
            let response = ApiResponse::success(series);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            log::error!("获取 {} 历史数据失败: {}", symbol, e);
            let response = ApiResponse::<OhlcSeries>::error(e.to_string());
            Ok(HttpResponse::InternalServerError().json(response))
        }
    }
}

/// 基本面指标，数据源失败时各字段为 "N/A"
pub async fn get_stock_metrics(
    dashboard: web::Data<Dashboard>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let metrics = match normalize_symbol(&path) {
        Some(symbol) => dashboard.metrics(&symbol).await,
        None => MetricsSnapshot::unavailable(),
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(metrics)))
}

pub async fn get_stock_performance(
    dashboard: web::Data<Dashboard>,
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse> {
    let (symbol, range) = match parse_request::<PerformanceStats>(&dashboard, &path, &query) {
        Ok(parsed) => parsed,
        Err(response) => return Ok(response),
    };

    match dashboard.performance(&symbol, &range).await {
        Ok(Some(stats)) => Ok(HttpResponse::Ok().json(ApiResponse::success(stats))),
        Ok(None) => {
            let response = ApiResponse::<PerformanceStats>::error(format!(
                "{} 在 {} ~ {} 内数据不足",
                symbol, range.start, range.end
            ));
            Ok(HttpResponse::NotFound().json(response))
        }
        Err(e) => {
            log::error!("计算 {} 区间表现失败: {}", symbol, e);
            let response = ApiResponse::<PerformanceStats>::error(e.to_string());
            Ok(HttpResponse::InternalServerError().json(response))
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/stocks")
            .route("/{symbol}/history", web::get().to(get_stock_history))
            .route("/{symbol}/metrics", web::get().to(get_stock_metrics))
            .route("/{symbol}/performance", web::get().to(get_stock_performance))
    );
}
