//! 股票代码解析
//!
//! 把搜索框输入映射为代码 + 展示名称，并与默认列表合并成下拉选项

use std::collections::{HashMap, HashSet};
use std::sync::{OnceLock, RwLock};

use anyhow::Result;
use futures::future::BoxFuture;
use regex::Regex;

use crate::models::{SymbolMatch, SymbolOption};

/// 单次搜索最多保留的结果数
pub const MAX_SEARCH_RESULTS: usize = 10;

/// 默认股票列表（展示名称, 代码）
pub const DEFAULT_STOCKS: [(&str, &str); 7] = [
    ("Apple", "AAPL"),
    ("Microsoft", "MSFT"),
    ("Amazon", "AMZN"),
    ("Tesla", "TSLA"),
    ("NVIDIA", "NVDA"),
    ("Google", "GOOGL"),
    ("Meta", "META"),
];

/// 代码搜索服务
pub trait SymbolSearch: Send + Sync {
    /// 按相关度排序的匹配结果
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<SymbolMatch>>>;
}

/// 代码 → 展示名称缓存
///
/// 由搜索结果填充，不淘汰、不持久化。同一代码总是写入相同名称，并发覆盖无害。
#[derive(Debug, Default)]
pub struct LabelCache {
    labels: RwLock<HashMap<String, String>>,
}

impl LabelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, symbol: &str, label: &str) {
        match self.labels.write() {
            Ok(mut labels) => {
                labels.insert(symbol.to_string(), label.to_string());
            }
            Err(poisoned) => {
                poisoned
                    .into_inner()
                    .insert(symbol.to_string(), label.to_string());
            }
        }
    }

    pub fn get(&self, symbol: &str) -> Option<String> {
        match self.labels.read() {
            Ok(labels) => labels.get(symbol).cloned(),
            Err(poisoned) => poisoned.into_inner().get(symbol).cloned(),
        }
    }
}

#[cfg(test)]
impl LabelCache {
    pub fn len(&self) -> usize {
        match self.labels.read() {
            Ok(labels) => labels.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn ticker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\^?[A-Z0-9][A-Z0-9.\-=]{0,14}$").expect("ticker pattern is valid")
    })
}

/// 规范化股票代码：去空白并转大写，不合法时返回 None
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let symbol = raw.trim().to_uppercase();
    ticker_pattern().is_match(&symbol).then_some(symbol)
}

/// 默认列表中的展示名称
pub fn default_label(symbol: &str) -> Option<&'static str> {
    DEFAULT_STOCKS
        .iter()
        .find(|(_, s)| *s == symbol)
        .map(|(name, _)| *name)
}

/// 图表标题用的展示名称，依次查默认列表、缓存，最后退回代码本身
pub fn display_label(symbol: &str, cache: &LabelCache) -> String {
    let name = default_label(symbol)
        .map(str::to_string)
        .or_else(|| cache.get(symbol))
        .unwrap_or_else(|| symbol.to_string());
    format!("{} ({})", name, symbol)
}

/// 合并搜索结果与默认列表
///
/// - 搜索结果在前，保持原有顺序
/// - 默认列表中未出现在搜索结果里的代码追加在后
/// - 当前选中的代码若不在其中，追加一次，名称取缓存，否则为代码本身
pub fn merge_options(
    defaults: &[(&str, &str)],
    results: &[SymbolMatch],
    selected: Option<&str>,
    cache: &LabelCache,
) -> Vec<SymbolOption> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut options = Vec::with_capacity(results.len() + defaults.len() + 1);

    for m in results {
        if seen.insert(m.symbol.as_str()) {
            options.push(SymbolOption::new(&m.display_name, &m.symbol));
        }
    }
    for (name, symbol) in defaults {
        if seen.insert(*symbol) {
            options.push(SymbolOption::new(name, symbol));
        }
    }

    if let Some(selected) = selected.filter(|s| !s.is_empty()) {
        if !seen.contains(selected) {
            let label = cache.get(selected).unwrap_or_else(|| selected.to_string());
            options.push(SymbolOption::new(&label, selected));
        }
    }

    options
}

/// 搜索并生成下拉选项，搜索失败时按无结果处理
///
/// 选中的代码先做规范化，不合法时忽略
pub async fn resolve_options(
    search: &dyn SymbolSearch,
    cache: &LabelCache,
    query: Option<&str>,
    selected: Option<&str>,
) -> Vec<SymbolOption> {
    let mut results = Vec::new();

    if let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) {
        match search.search(query).await {
            Ok(matches) => {
                results = matches
                    .into_iter()
                    .filter(|m| !m.symbol.is_empty())
                    .take(MAX_SEARCH_RESULTS)
                    .collect();
                for m in &results {
                    cache.insert(&m.symbol, &m.display_name);
                }
                log::debug!("搜索 {:?} 返回 {} 条结果", query, results.len());
            }
            Err(e) => {
                log::warn!("搜索 {:?} 失败: {}", query, e);
            }
        }
    }

    let selected = selected.and_then(normalize_symbol);
    merge_options(&DEFAULT_STOCKS, &results, selected.as_deref(), cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    struct FixedSearch(Vec<SymbolMatch>);

    impl SymbolSearch for FixedSearch {
        fn search<'a>(&'a self, _query: &'a str) -> BoxFuture<'a, Result<Vec<SymbolMatch>>> {
            let matches = self.0.clone();
            async move { Ok(matches) }.boxed()
        }
    }

    struct FailingSearch;

    impl SymbolSearch for FailingSearch {
        fn search<'a>(&'a self, _query: &'a str) -> BoxFuture<'a, Result<Vec<SymbolMatch>>> {
            async { Err(anyhow::anyhow!("connection reset")) }.boxed()
        }
    }

    fn default_options() -> Vec<SymbolOption> {
        DEFAULT_STOCKS
            .iter()
            .map(|(name, symbol)| SymbolOption::new(name, symbol))
            .collect()
    }

    #[test]
    fn test_merge_idempotent_for_default_selection() {
        let cache = LabelCache::new();
        let merged = merge_options(&DEFAULT_STOCKS, &[], Some("MSFT"), &cache);
        assert_eq!(merged, default_options());
    }

    #[test]
    fn test_merge_search_results_take_precedence() {
        let cache = LabelCache::new();
        let results = vec![
            SymbolMatch::new("TSLA", "Tesla, Inc."),
            SymbolMatch::new("TSLL", "Direxion Daily TSLA Bull 2X"),
        ];
        let merged = merge_options(&DEFAULT_STOCKS, &results, None, &cache);

        assert_eq!(merged[0].label, "Tesla, Inc. (TSLA)");
        assert_eq!(merged[1].value, "TSLL");
        assert_eq!(merged.len(), 2 + DEFAULT_STOCKS.len() - 1);
        assert_eq!(merged.iter().filter(|o| o.value == "TSLA").count(), 1);
        // 默认列表保持原顺序，跳过已出现的 TSLA
        let tail: Vec<&str> = merged[2..].iter().map(|o| o.value.as_str()).collect();
        assert_eq!(tail, vec!["AAPL", "MSFT", "AMZN", "NVDA", "GOOGL", "META"]);
    }

    #[test]
    fn test_merge_keeps_selected_symbol() {
        let cache = LabelCache::new();
        let results = vec![SymbolMatch::new("SHOP", "Shopify Inc.")];

        let merged = merge_options(&DEFAULT_STOCKS, &results, Some("PLTR"), &cache);
        assert_eq!(merged.iter().filter(|o| o.value == "PLTR").count(), 1);
        assert_eq!(merged.last().unwrap().label, "PLTR (PLTR)");

        cache.insert("PLTR", "Palantir Technologies Inc.");
        let merged = merge_options(&DEFAULT_STOCKS, &[], Some("PLTR"), &cache);
        assert_eq!(merged.len(), DEFAULT_STOCKS.len() + 1);
        assert_eq!(merged.last().unwrap().label, "Palantir Technologies Inc. (PLTR)");
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" aapl "), Some("AAPL".to_string()));
        assert_eq!(normalize_symbol("brk.b"), Some("BRK.B".to_string()));
        assert_eq!(normalize_symbol("^gspc"), Some("^GSPC".to_string()));
        assert_eq!(normalize_symbol("^"), None);
        assert_eq!(normalize_symbol("EURUSD=X"), Some("EURUSD=X".to_string()));
        assert_eq!(normalize_symbol(""), None);
        assert_eq!(normalize_symbol("AAPL; DROP"), None);
    }

    #[test]
    fn test_display_label() {
        let cache = LabelCache::new();
        assert_eq!(display_label("AAPL", &cache), "Apple (AAPL)");
        assert_eq!(display_label("PLTR", &cache), "PLTR (PLTR)");
        cache.insert("PLTR", "Palantir");
        assert_eq!(display_label("PLTR", &cache), "Palantir (PLTR)");
    }

    #[tokio::test]
    async fn test_resolve_options_populates_cache_and_truncates() {
        let matches: Vec<SymbolMatch> = (0..15)
            .map(|i| SymbolMatch::new(format!("SYM{}", i), format!("Company {}", i)))
            .collect();
        let search = FixedSearch(matches);
        let cache = LabelCache::new();

        let options = resolve_options(&search, &cache, Some("sym"), None).await;
        assert_eq!(options.len(), MAX_SEARCH_RESULTS + DEFAULT_STOCKS.len());
        assert_eq!(options[0].value, "SYM0");
        assert_eq!(cache.len(), MAX_SEARCH_RESULTS);
        assert_eq!(cache.get("SYM3").as_deref(), Some("Company 3"));
        assert!(cache.get("SYM12").is_none());
    }

    #[tokio::test]
    async fn test_resolve_options_search_failure() {
        let cache = LabelCache::new();
        let options = resolve_options(&FailingSearch, &cache, Some("appl"), Some("AAPL")).await;
        assert_eq!(options, default_options());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_options_normalizes_selected() {
        let cache = LabelCache::new();
        let search = FixedSearch(Vec::new());

        let options = resolve_options(&search, &cache, None, Some("aapl")).await;
        assert_eq!(options, default_options());

        let options = resolve_options(&search, &cache, None, Some(" pltr ")).await;
        assert_eq!(options.len(), DEFAULT_STOCKS.len() + 1);
        assert_eq!(options.last().unwrap().value, "PLTR");

        let options = resolve_options(&search, &cache, None, Some("$$$")).await;
        assert_eq!(options, default_options());
    }

    #[tokio::test]
    async fn test_resolve_options_blank_query_skips_search() {
        let cache = LabelCache::new();
        let options = resolve_options(&FailingSearch, &cache, Some("   "), None).await;
        assert_eq!(options.len(), DEFAULT_STOCKS.len());
    }
}
