use actix_web::{web, HttpResponse, Result};

use crate::models::{ApiResponse, SymbolQuery};
use crate::services::dashboard::Dashboard;

/// 搜索框下拉选项，搜索失败时只返回默认列表
pub async fn list_symbols(
    dashboard: web::Data<Dashboard>,
    query: web::Query<SymbolQuery>,
) -> Result<HttpResponse> {
    let options = dashboard
        .symbol_options(query.q.as_deref(), query.selected.as_deref())
        .await;
    Ok(HttpResponse::Ok().json(ApiResponse::success(options)))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/symbols", web::get().to(list_symbols));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::sample_data;
    use crate::services::symbols::DEFAULT_STOCKS;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_list_symbols() {
        let app = test::init_service(App::new().app_data(sample_data()).configure(config)).await;

        let req = test::TestRequest::get().uri("/symbols").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let options = body["data"].as_array().unwrap();
        assert_eq!(options.len(), DEFAULT_STOCKS.len());
        assert_eq!(options[0]["label"], "Apple (AAPL)");
        assert_eq!(options[0]["value"], "AAPL");

        let req = test::TestRequest::get()
            .uri("/symbols?q=plt&selected=ZZZZ")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let options = body["data"].as_array().unwrap();
        assert_eq!(options[0]["value"], "PLTR");
        assert_eq!(options.last().unwrap()["label"], "ZZZZ (ZZZZ)");
    }

    #[actix_web::test]
    async fn test_list_symbols_lowercase_selected_default() {
        let app = test::init_service(App::new().app_data(sample_data()).configure(config)).await;

        let req = test::TestRequest::get().uri("/symbols?selected=aapl").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let options = body["data"].as_array().unwrap();
        assert_eq!(options.len(), DEFAULT_STOCKS.len());
        assert_eq!(options.iter().filter(|o| o["value"] == "AAPL").count(), 1);
        assert!(options.iter().all(|o| o["value"] != "aapl"));
    }
}
