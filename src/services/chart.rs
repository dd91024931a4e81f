//! 图表组装
//!
//! 把 K 线、叠加指标和纵轴范围组装成 ChartSpec；数据缺失时返回带警告注释的占位图，
//! 不向渲染端抛出错误

use std::str::FromStr;

use crate::models::{
    Annotation, Axis, CandlestickTrace, ChartSpec, ComparisonSeries, Font, Layout, LineStyle,
    LineTrace, Margin, OhlcSeries, Overlay, OverlaySeries, RangeSlider, Trace, YRange,
};

const OVERLAY_LINE_WIDTH: f64 = 1.5;
const FALLBACK_OVERLAY_COLOR: &str = "gray";

const CHART_MARGIN: Margin = Margin {
    l: 20,
    r: 20,
    t: 50,
    b: 40,
};

/// 占位图：无数据轨迹，居中显示红色警告
pub fn placeholder_chart(title: &str, message: &str, chart_type: &str) -> ChartSpec {
    let mut layout = Layout::dark(format!("{} {}", title, chart_type));
    layout.annotations.push(Annotation {
        text: format!("⚠️ {}", message),
        xref: "paper".to_string(),
        yref: "paper".to_string(),
        x: 0.5,
        y: 0.5,
        showarrow: false,
        font: Font {
            size: 20,
            color: "red".to_string(),
        },
    });
    ChartSpec {
        data: Vec::new(),
        layout,
    }
}

/// K 线图
///
/// `title` 为带代码的展示名称，如 "Apple (AAPL)"。序列为空时返回
/// "No data for {symbol}" 占位图。
pub fn build_candlestick_chart(
    series: &OhlcSeries,
    overlays: &[OverlaySeries],
    y_range: Option<YRange>,
    title: &str,
) -> ChartSpec {
    if series.is_empty() {
        return placeholder_chart(
            title,
            &format!("No data for {}", series.symbol),
            "Candlestick Chart",
        );
    }

    let dates = series.dates();
    let mut data = Vec::with_capacity(1 + overlays.len());
    data.push(Trace::Candlestick(CandlestickTrace {
        name: "Candlesticks".to_string(),
        x: dates.clone(),
        open: series.bars.iter().map(|b| b.open).collect(),
        high: series.bars.iter().map(|b| b.high).collect(),
        low: series.bars.iter().map(|b| b.low).collect(),
        close: series.bars.iter().map(|b| b.close).collect(),
    }));

    for overlay in overlays {
        if overlay.values.len() != dates.len() {
            log::warn!(
                "叠加指标 {} 长度 {} 与 K 线长度 {} 不一致，已跳过",
                overlay.name,
                overlay.values.len(),
                dates.len()
            );
            continue;
        }
        let color = Overlay::from_str(&overlay.name)
            .map(|o| o.color())
            .unwrap_or(FALLBACK_OVERLAY_COLOR);
        data.push(Trace::Scatter(LineTrace {
            name: overlay.name.clone(),
            x: dates.clone(),
            y: overlay.values.clone(),
            mode: "lines".to_string(),
            line: Some(LineStyle {
                color: color.to_string(),
                width: OVERLAY_LINE_WIDTH,
            }),
        }));
    }

    let mut layout = Layout::dark(format!("{} Candlestick Chart", title));
    layout.xaxis = Axis {
        title: Some("Date".to_string()),
        axis_type: Some("date".to_string()),
        rangeslider: Some(RangeSlider { visible: false }),
        ..Axis::default()
    };
    layout.yaxis = Axis {
        title: Some("Price ($)".to_string()),
        range: y_range.map(|r| r.as_array()),
        ..Axis::default()
    };
    layout.margin = Some(CHART_MARGIN);
    layout.uirevision = Some("candles".to_string());
    layout.showlegend = true;

    ChartSpec { data, layout }
}

/// 多只股票的累计涨跌幅对比图
pub fn build_comparison_chart(series: &[ComparisonSeries]) -> ChartSpec {
    if series.is_empty() {
        return placeholder_chart(
            "Cumulative Return",
            "Select stocks to compare",
            "Comparison",
        );
    }

    let data = series
        .iter()
        .map(|s| {
            Trace::Scatter(LineTrace {
                name: s.label.clone(),
                x: s.dates.clone(),
                y: s.change.clone(),
                mode: "lines".to_string(),
                line: None,
            })
        })
        .collect();

    let mut layout = Layout::dark("Cumulative Return Comparison");
    layout.xaxis = Axis {
        title: Some("Date".to_string()),
        axis_type: Some("date".to_string()),
        ..Axis::default()
    };
    layout.yaxis = Axis {
        title: Some("Change (%)".to_string()),
        ..Axis::default()
    };
    layout.margin = Some(CHART_MARGIN);
    layout.uirevision = Some("compare".to_string());
    layout.showlegend = true;

    ChartSpec { data, layout }
}
