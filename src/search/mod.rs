use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::labels::LabelResolver;
use crate::model::{ItemReport, ReportKind};

const ALL: &str = "all";

/// Coarse report-type selector shown as tabs above the listing.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tab {
    #[default]
    All,
    Lost,
    Found,
}

impl Tab {
    pub fn admits(self, kind: ReportKind) -> bool {
        match self {
            Tab::All => true,
            Tab::Lost => kind == ReportKind::Lost,
            Tab::Found => kind == ReportKind::Found,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Code(String),
}

impl CategoryFilter {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == ALL {
            CategoryFilter::All
        } else {
            CategoryFilter::Code(trimmed.to_string())
        }
    }

    /// Exact code comparison; labels play no part here.
    pub fn admits(&self, code: &str) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Code(expected) => expected == code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscoveryQuery {
    pub search_text: String,
    pub category: CategoryFilter,
    pub tab: Tab,
}

impl DiscoveryQuery {
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    pub fn with_category(mut self, category: CategoryFilter) -> Self {
        self.category = category;
        self
    }

    pub fn with_tab(mut self, tab: Tab) -> Self {
        self.tab = tab;
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.search_text.is_empty() && self.category == CategoryFilter::All && self.tab == Tab::All
    }
}

/// Report counts for each tab header under the current text and category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TabCounts {
    pub all: usize,
    pub lost: usize,
    pub found: usize,
}

impl TabCounts {
    pub fn get(&self, tab: Tab) -> usize {
        match tab {
            Tab::All => self.all,
            Tab::Lost => self.lost,
            Tab::Found => self.found,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FilterEngine {
    labels: LabelResolver,
}

impl FilterEngine {
    pub fn new(labels: LabelResolver) -> Self {
        Self { labels }
    }

    /// Reports matching every predicate of `query`, in their input order.
    pub fn apply<'a>(&self, reports: &'a [ItemReport], query: &DiscoveryQuery) -> Vec<&'a ItemReport> {
        let needle = query.search_text.to_lowercase();
        reports
            .iter()
            .filter(|report| {
                self.matches_text(report, &needle)
                    && query.category.admits(&report.category)
                    && query.tab.admits(report.kind)
            })
            .collect()
    }

    pub fn tab_counts(&self, reports: &[ItemReport], query: &DiscoveryQuery) -> TabCounts {
        let needle = query.search_text.to_lowercase();
        reports
            .iter()
            .filter(|report| {
                self.matches_text(report, &needle) && query.category.admits(&report.category)
            })
            .fold(TabCounts::default(), |mut counts, report| {
                counts.all += 1;
                match report.kind {
                    ReportKind::Lost => counts.lost += 1,
                    ReportKind::Found => counts.found += 1,
                }
                counts
            })
    }

    fn matches_text(&self, report: &ItemReport, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        let description = report.description.as_deref().unwrap_or_default();
        [
            report.name.as_str(),
            description,
            self.labels.location(&report.location),
            self.labels.category(&report.category),
        ]
        .into_iter()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Parses a search line such as `mochila category:accessories tab:found`.
/// Unprefixed words become the free-text search, joined by single spaces.
pub fn parse_query(input: &str) -> DiscoveryQuery {
    let mut query = DiscoveryQuery::default();
    let mut words = Vec::new();
    for raw in input.split_whitespace() {
        if let Some(category) = raw.strip_prefix("category:") {
            query.category = CategoryFilter::parse(category);
            continue;
        }
        if let Some(tab) = raw.strip_prefix("tab:") {
            match tab.parse::<Tab>() {
                Ok(tab) => query.tab = tab,
                Err(_) => tracing::debug!(tab, "ignoring unknown tab in search"),
            }
            continue;
        }
        words.push(raw);
    }
    query.search_text = words.join(" ");
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ReportId, ReportStatus};
    use time::macros::datetime;

    fn report(id: &str, kind: ReportKind, category: &str, location: &str) -> ItemReport {
        ItemReport {
            id: ReportId::from(id),
            name: format!("Item {id}"),
            description: None,
            category: category.to_string(),
            location: location.to_string(),
            kind,
            status: ReportStatus::Active,
            reward_amount: None,
            image_ref: None,
            contact: None,
            occurred_on: None,
            created_at: datetime!(2025-11-05 14:30 UTC),
        }
    }

    fn ids(reports: &[&ItemReport]) -> Vec<String> {
        reports.iter().map(|report| report.id.to_string()).collect()
    }

    fn campus_set() -> Vec<ItemReport> {
        vec![
            report("A", ReportKind::Lost, "electronics", "lib"),
            report("B", ReportKind::Found, "accessories", "gym"),
        ]
    }

    #[test]
    fn lost_tab_keeps_only_lost_reports() {
        let set = campus_set();
        let query = DiscoveryQuery::default().with_tab(Tab::Lost);
        assert_eq!(ids(&FilterEngine::default().apply(&set, &query)), vec!["A"]);
    }

    #[test]
    fn text_matches_resolved_location_label() {
        let set = campus_set();
        let query = DiscoveryQuery::default().with_text("gym");
        assert_eq!(ids(&FilterEngine::default().apply(&set, &query)), vec!["B"]);
    }

    #[test]
    fn text_matches_translated_labels_case_insensitively() {
        let set = vec![
            report("A", ReportKind::Lost, "electronics", "biblioteca"),
            report("B", ReportKind::Found, "accessories", "canchas"),
        ];
        let engine = FilterEngine::default();
        let by_category = DiscoveryQuery::default().with_text("ELECTRÓNICOS");
        assert_eq!(ids(&engine.apply(&set, &by_category)), vec!["A"]);
        let by_location = DiscoveryQuery::default().with_text("deportivas");
        assert_eq!(ids(&engine.apply(&set, &by_location)), vec!["B"]);
    }

    #[test]
    fn text_matches_name_and_description() {
        let mut with_description = report("A", ReportKind::Lost, "other", "otro");
        with_description.description = Some("Llavero de Pikachu".into());
        let mut named = report("B", ReportKind::Found, "other", "otro");
        named.name = "Calculadora Casio".into();
        let set = vec![with_description, named];
        let engine = FilterEngine::default();

        let query = DiscoveryQuery::default().with_text("pikachu");
        assert_eq!(ids(&engine.apply(&set, &query)), vec!["A"]);
        let query = DiscoveryQuery::default().with_text("casio");
        assert_eq!(ids(&engine.apply(&set, &query)), vec!["B"]);
    }

    #[test]
    fn missing_description_never_matches_non_empty_text() {
        let set = vec![report("A", ReportKind::Lost, "zz", "zz")];
        let query = DiscoveryQuery::default().with_text("q");
        assert!(FilterEngine::default().apply(&set, &query).is_empty());
    }

    #[test]
    fn category_filter_compares_codes_not_labels() {
        let set = campus_set();
        let engine = FilterEngine::default();
        let by_code = DiscoveryQuery::default()
            .with_category(CategoryFilter::parse("accessories"));
        assert_eq!(ids(&engine.apply(&set, &by_code)), vec!["B"]);
        let by_label = DiscoveryQuery::default()
            .with_category(CategoryFilter::parse("Accesorios"));
        assert!(engine.apply(&set, &by_label).is_empty());
    }

    #[test]
    fn empty_query_returns_input_unchanged() {
        let set = vec![
            report("C", ReportKind::Found, "sports", "canchas"),
            report("A", ReportKind::Lost, "electronics", "lib"),
            report("B", ReportKind::Found, "mystery", "gym"),
        ];
        let query = DiscoveryQuery::default();
        assert!(query.is_unfiltered());
        let filtered = FilterEngine::default().apply(&set, &query);
        assert_eq!(filtered, set.iter().collect::<Vec<_>>());
    }

    #[test]
    fn results_are_a_subset_in_input_order() {
        let set = vec![
            report("1", ReportKind::Lost, "electronics", "lab"),
            report("2", ReportKind::Found, "electronics", "lab"),
            report("3", ReportKind::Lost, "clothing", "lab"),
            report("4", ReportKind::Lost, "electronics", "comedor"),
        ];
        let query = DiscoveryQuery::default()
            .with_text("laboratorios")
            .with_category(CategoryFilter::parse("electronics"))
            .with_tab(Tab::Lost);
        let engine = FilterEngine::default();
        let filtered = engine.apply(&set, &query);
        assert_eq!(ids(&filtered), vec!["1"]);
        assert!(filtered.iter().all(|hit| set.iter().any(|r| std::ptr::eq(r, *hit))));
        assert_eq!(engine.apply(&set, &query), filtered);
    }

    #[test]
    fn tab_counts_ignore_the_selected_tab() {
        let set = vec![
            report("1", ReportKind::Lost, "electronics", "lab"),
            report("2", ReportKind::Found, "electronics", "lab"),
            report("3", ReportKind::Found, "clothing", "lab"),
        ];
        let query = DiscoveryQuery::default()
            .with_category(CategoryFilter::parse("electronics"))
            .with_tab(Tab::Found);
        let counts = FilterEngine::default().tab_counts(&set, &query);
        assert_eq!(
            counts,
            TabCounts {
                all: 2,
                lost: 1,
                found: 1
            }
        );
        assert_eq!(counts.get(Tab::Found), 1);
    }

    #[test]
    fn parse_query_extracts_prefixed_filters() {
        let query = parse_query("  mochila   negra category:accessories tab:found ");
        assert_eq!(query.search_text, "mochila negra");
        assert_eq!(query.category, CategoryFilter::Code("accessories".into()));
        assert_eq!(query.tab, Tab::Found);
    }

    #[test]
    fn parse_query_defaults_to_everything() {
        let query = parse_query("category:all tab:sideways");
        assert!(query.is_unfiltered());
    }
}
