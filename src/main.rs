//! 股票行情看板后端服务
//!
//! 提供 K 线图、均线叠加、多股对比和基本面指标的 RESTful API
//! 数据来源：Yahoo Finance

mod config;     // 配置
mod handlers;   // HTTP 请求处理器
mod models;     // 数据模型定义
mod services;   // 业务逻辑服务

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use crate::config::AppConfig;
use crate::services::dashboard::Dashboard;
use crate::services::yahoo::YahooClient;

/// 应用程序入口
///
/// 加载配置后启动 HTTP 服务器，默认监听 0.0.0.0:8080
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let (config, report) = AppConfig::load();

    // 初始化日志系统，RUST_LOG 优先于配置文件
    env_logger::init_from_env(Env::default().default_filter_or(config.log.level.as_str()));
    report.log();

    let client = YahooClient::new(config.provider.clone()).map_err(|e| {
        log::error!("初始化行情客户端失败: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;
    let client = Arc::new(client);

    let dashboard = web::Data::new(Dashboard::new(
        client.clone(),
        client,
        config.dashboard.clone(),
        config.provider.timeout(),
    ));

    let bind_addr = config.bind_addr();
    log::info!(
        "启动股票看板服务 {}，默认代码 {}，历史起始日 {}",
        bind_addr,
        config.dashboard.default_symbol,
        config.dashboard.history_start
    );

    // 创建并启动 HTTP 服务器
    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default()) // 请求日志
            .app_data(dashboard.clone())
            .configure(handlers::config) // 配置路由
    });
    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    server.bind(bind_addr)?.run().await
}
