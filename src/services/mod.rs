//! 业务逻辑服务模块
//!
//! 封装行情获取、派生序列计算和图表组装逻辑

pub mod chart;        // 图表组装
pub mod dashboard;    // 看板流水线
pub mod formatting;   // 展示格式化
pub mod market_data;  // 行情数据访问
pub mod performance;  // 区间表现统计
pub mod series;       // 派生序列
pub mod symbols;      // 代码解析与搜索
pub mod viewport;     // 纵轴范围
pub mod yahoo;        // Yahoo Finance 数据源
