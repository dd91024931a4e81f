//! 图表描述模型
//!
//! 与渲染端无关的声明式图表结构，字段命名与 Plotly 的 figure JSON 保持一致，
//! 前端可直接交给渲染库使用

use chrono::NaiveDate;
use serde::Serialize;

/// 完整图表：数据轨迹 + 布局
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ChartSpec {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[cfg(test)]
impl ChartSpec {
    /// 是否为带警告注释的占位图
    pub fn is_placeholder(&self) -> bool {
        self.data.is_empty() && !self.layout.annotations.is_empty()
    }

    /// 占位图的提示文本
    pub fn message(&self) -> Option<&str> {
        self.layout.annotations.first().map(|a| a.text.as_str())
    }
}

/// 数据轨迹
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Candlestick(CandlestickTrace),
    Scatter(LineTrace),
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CandlestickTrace {
    pub name: String,
    pub x: Vec<NaiveDate>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LineTrace {
    pub name: String,
    pub x: Vec<NaiveDate>,
    /// null 渲染为断点
    pub y: Vec<Option<f64>>,
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<LineStyle>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LineStyle {
    pub color: String,
    pub width: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Layout {
    pub template: String,
    pub title: String,
    pub xaxis: Axis,
    pub yaxis: Axis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<Margin>,
    /// 保持用户缩放状态的标识
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uirevision: Option<String>,
    pub showlegend: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl Layout {
    /// 深色主题的基础布局
    pub fn dark(title: impl Into<String>) -> Self {
        Self {
            template: "plotly_dark".to_string(),
            title: title.into(),
            xaxis: Axis::default(),
            yaxis: Axis::default(),
            margin: None,
            uirevision: None,
            showlegend: false,
            annotations: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Serialize, Clone, PartialEq)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub axis_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rangeslider: Option<RangeSlider>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RangeSlider {
    pub visible: bool,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub t: u32,
    pub b: u32,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Annotation {
    pub text: String,
    pub xref: String,
    pub yref: String,
    pub x: f64,
    pub y: f64,
    pub showarrow: bool,
    pub font: Font,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Font {
    pub size: u32,
    pub color: String,
}

/// Y 轴可视范围
#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct YRange {
    pub min: f64,
    pub max: f64,
}

impl YRange {
    pub fn as_array(&self) -> [f64; 2] {
        [self.min, self.max]
    }
}

/// 对比图中的一条已归一化序列
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonSeries {
    /// 图例名称
    pub label: String,
    pub dates: Vec<NaiveDate>,
    /// 相对首个收盘价的涨跌幅（%）
    pub change: Vec<Option<f64>>,
}
