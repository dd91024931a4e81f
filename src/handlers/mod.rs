pub mod chart;
pub mod health;
pub mod stock;
pub mod symbols;

use actix_web::web;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(health::config)
            .configure(symbols::config)
            .configure(stock::config)
            .configure(chart::config)
    );
}
