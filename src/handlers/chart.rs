//! 图表接口
//!
//! 图表接口总是返回 200，无法出图时返回带提示的占位图

use actix_web::{web, HttpResponse, Result};

use crate::models::{ApiResponse, CandlestickQuery, CompareQuery, DateRange, Overlay, VisibleRange};
use crate::services::chart::placeholder_chart;
use crate::services::dashboard::Dashboard;
use crate::services::symbols::normalize_symbol;

/// 日期参数不合法时退回默认区间
fn range_or_default(dashboard: &Dashboard, start: Option<&str>, end: Option<&str>) -> DateRange {
    DateRange::parse(start, end, dashboard.settings().history_start).unwrap_or_else(|e| {
        log::warn!("{}，使用默认区间", e);
        dashboard.default_range()
    })
}

/// 可视区间需要两端都存在且可解析，否则视为未缩放
fn visible_range(x0: Option<&str>, x1: Option<&str>) -> Option<VisibleRange> {
    let (x0, x1) = (x0?, x1?);
    let range = VisibleRange::parse(x0, x1);
    if range.is_none() {
        log::debug!("无法解析可视区间 {:?} ~ {:?}，忽略", x0, x1);
    }
    range
}

pub async fn get_candlestick_chart(
    dashboard: web::Data<Dashboard>,
    path: web::Path<String>,
    query: web::Query<CandlestickQuery>,
) -> Result<HttpResponse> {
    let raw = path.into_inner();
    let chart = match normalize_symbol(&raw) {
        Some(symbol) => {
            let overlays = query
                .options
                .as_deref()
                .map(Overlay::parse_list)
                .unwrap_or_default();
            let visible = visible_range(query.x0.as_deref(), query.x1.as_deref());
            let range = range_or_default(&dashboard, query.start.as_deref(), query.end.as_deref());

            dashboard
                .candlestick(&symbol, &overlays, visible.as_ref(), &range)
                .await
        }
        None => placeholder_chart(
            raw.trim(),
            &format!("Invalid symbol {:?}", raw.trim()),
            "Candlestick Chart",
        ),
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(chart)))
}

pub async fn get_comparison_chart(
    dashboard: web::Data<Dashboard>,
    query: web::Query<CompareQuery>,
) -> Result<HttpResponse> {
    let mut symbols: Vec<String> = Vec::new();
    for raw in query.symbols.as_deref().unwrap_or_default().split(',') {
        if raw.trim().is_empty() {
            continue;
        }
        match normalize_symbol(raw) {
            Some(symbol) if !symbols.contains(&symbol) => symbols.push(symbol),
            Some(_) => {}
            None => log::warn!("忽略无效的股票代码: {:?}", raw),
        }
    }

    let range = range_or_default(&dashboard, query.start.as_deref(), query.end.as_deref());
    let chart = dashboard.comparison(&symbols, &range).await;
    Ok(HttpResponse::Ok().json(ApiResponse::success(chart)))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/charts")
            .route("/candlestick/{symbol}", web::get().to(get_candlestick_chart))
            .route("/compare", web::get().to(get_comparison_chart))
    );
}
