//! User preferences persisted between sessions.

use docview::{Category, SortBy, SortOrder, Strategy, ViewMode};
use serde::{Deserialize, Serialize};

/// Strategy picked in the header. `Auto` sizes the strategy to the folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyChoice {
    #[default]
    Auto,
    Fixed(Strategy),
}

impl StrategyChoice {
    pub fn all() -> Vec<StrategyChoice> {
        let mut all = vec![StrategyChoice::Auto];
        all.extend(Strategy::ALL.into_iter().map(StrategyChoice::Fixed));
        all
    }

    pub fn resolve(&self, expected_rows: usize) -> Strategy {
        match self {
            StrategyChoice::Auto => Strategy::recommended_for(expected_rows),
            StrategyChoice::Fixed(strategy) => *strategy,
        }
    }

    pub fn label(&self) -> String {
        match self {
            StrategyChoice::Auto => "Auto".to_string(),
            StrategyChoice::Fixed(strategy) => strategy.as_str().replace('_', " "),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Category key, see [`Category::key`]
    pub category: String,
    pub strategy: StrategyChoice,
    pub view_mode: ViewMode,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub page_size: u32,
    /// Name, Updated, Size, Owner
    pub column_widths: [f32; 4],
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            category: Category::Documents.key(),
            strategy: StrategyChoice::Auto,
            view_mode: ViewMode::List,
            sort_by: SortBy::Name,
            sort_order: SortOrder::Asc,
            page_size: 50,
            column_widths: [320.0, 150.0, 90.0, 120.0],
        }
    }
}

impl Preferences {
    pub fn category(&self) -> Category {
        self.category.parse().unwrap_or(Category::Documents)
    }

    pub fn set_category(&mut self, category: Category) {
        self.category = category.key();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_strategy_follows_row_count() {
        assert_eq!(StrategyChoice::Auto.resolve(40), Strategy::FullRender);
        assert_eq!(StrategyChoice::Auto.resolve(5000), Strategy::VirtualScroll);
        assert_eq!(
            StrategyChoice::Fixed(Strategy::Pagination).resolve(5000),
            Strategy::Pagination
        );
    }

    #[test]
    fn test_unknown_category_falls_back() {
        let prefs = Preferences {
            category: "lifeline-steam".into(),
            ..Preferences::default()
        };
        assert_eq!(prefs.category(), Category::Documents);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let prefs: Preferences = serde_json::from_str(r#"{"page_size": 100}"#).unwrap();
        assert_eq!(prefs.page_size, 100);
        assert_eq!(prefs.strategy, StrategyChoice::Auto);
    }
}
