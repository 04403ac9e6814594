//! Query scoring over the page catalog.
//!
//! Each entry is scored as the sum of three independent signals over its
//! lowercase haystack (label, href and keywords):
//!
//! * **all tokens**: every whitespace-separated query token is a substring
//!   of some haystack string;
//! * **direct**: some haystack string contains the whole query, or the whole
//!   query contains some haystack string;
//! * **prefix**: some haystack string starts with the whole query.
//!
//! There is no fuzzy matching: a typo simply scores zero.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use hrms_shared::constants::{MAX_SEARCH_RESULTS, WEIGHT_ALL_TOKENS, WEIGHT_DIRECT, WEIGHT_PREFIX};
use hrms_shared::types::Role;

use crate::catalog::{Catalog, SearchTarget};

/// Weight of each matching signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringWeights {
    pub all_tokens: u32,
    pub direct: u32,
    pub prefix: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            all_tokens: WEIGHT_ALL_TOKENS,
            direct: WEIGHT_DIRECT,
            prefix: WEIGHT_PREFIX,
        }
    }
}

/// A search result as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchHit {
    pub label: String,
    pub href: String,
}

struct Scored<'a> {
    target: &'a SearchTarget,
    score: u32,
}

/// Catalog plus ranking policy.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    catalog: Catalog,
    weights: ScoringWeights,
    limit: usize,
}

impl SearchEngine {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            weights: ScoringWeights::default(),
            limit: MAX_SEARCH_RESULTS,
        }
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Rank the pages visible to `role` against `query`.
    pub fn search(&self, query: &str, role: Role) -> Vec<SearchHit> {
        let hits = rank(self.catalog.entries(role), query, self.weights, self.limit);
        debug!(role = %role, query, hits = hits.len(), "Search evaluated");
        hits
    }
}

/// Score `entries` against `query` and return at most `limit` hits, best
/// first, ties broken by label.
pub fn rank(
    entries: &[SearchTarget],
    query: &str,
    weights: ScoringWeights,
    limit: usize,
) -> Vec<SearchHit> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    let tokens: BTreeSet<&str> = query.split_whitespace().collect();

    let mut scored: Vec<Scored<'_>> = entries
        .iter()
        .map(|target| Scored {
            target,
            score: score(target, &query, &tokens, weights),
        })
        .filter(|s| s.score > 0)
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| by_label(a.target, b.target)));

    scored
        .into_iter()
        .take(limit)
        .map(|s| SearchHit {
            label: s.target.label.clone(),
            href: s.target.href.clone(),
        })
        .collect()
}

fn score(target: &SearchTarget, query: &str, tokens: &BTreeSet<&str>, weights: ScoringWeights) -> u32 {
    let haystack: Vec<String> = std::iter::once(&target.label)
        .chain(std::iter::once(&target.href))
        .chain(target.keywords.iter())
        .map(|s| s.to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    let all_tokens = tokens
        .iter()
        .all(|token| haystack.iter().any(|h| h.contains(token)));
    let direct = haystack
        .iter()
        .any(|h| h.contains(query) || query.contains(h.as_str()));
    let prefix = haystack.iter().any(|h| h.starts_with(query));

    [
        (all_tokens, weights.all_tokens),
        (direct, weights.direct),
        (prefix, weights.prefix),
    ]
    .into_iter()
    .filter(|(hit, _)| *hit)
    .map(|(_, weight)| weight)
    .sum()
}

// Case-insensitive first so "payroll" and "Payroll" sort together; the raw
// label keeps the order total.
fn by_label(a: &SearchTarget, b: &SearchTarget) -> Ordering {
    a.label
        .to_lowercase()
        .cmp(&b.label.to_lowercase())
        .then_with(|| a.label.cmp(&b.label))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SearchEngine {
        SearchEngine::new(Catalog::builtin())
    }

    fn labels(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|h| h.label.as_str()).collect()
    }

    #[test]
    fn empty_query_returns_nothing() {
        assert!(engine().search("", Role::Admin).is_empty());
        assert!(engine().search("   \t", Role::Employee).is_empty());
    }

    #[test]
    fn exact_label_outranks_keyword_matches() {
        let hits = engine().search("payroll", Role::Admin);
        assert_eq!(hits[0].label, "Payroll");
        assert_eq!(hits[0].href, "/admin/payroll");
        assert!(labels(&hits).contains(&"Payslips"));
    }

    #[test]
    fn keyword_hit_resolves_to_its_page() {
        let hits = engine().search("hours", Role::Employee);
        assert_eq!(
            hits,
            vec![SearchHit {
                label: "Timesheet".into(),
                href: "/user/timesheet".into(),
            }]
        );
    }

    #[test]
    fn roles_do_not_see_each_others_pages() {
        assert!(!engine().search("add timesheet", Role::Employee).is_empty());
        assert!(engine().search("add timesheet", Role::Admin).is_empty());
    }

    #[test]
    fn query_is_case_and_whitespace_insensitive() {
        let a = engine().search("  PAYROLL ", Role::Admin);
        let b = engine().search("payroll", Role::Admin);
        assert_eq!(a, b);
    }

    #[test]
    fn over_typed_query_still_matches_via_containment() {
        // "my salary please" contains the keyword "salary".
        let hits = engine().search("my salary please", Role::Employee);
        assert_eq!(labels(&hits), vec!["Payslips"]);
    }

    #[test]
    fn results_are_capped_in_score_then_label_order() {
        let entries: Vec<SearchTarget> = (0..12)
            .rev()
            .map(|i| SearchTarget::new(&format!("Report {i:02}"), &format!("/r/{i}"), &["report"]))
            .chain(std::iter::once(SearchTarget::new("Summary", "/s", &["weekly report data"])))
            .collect();

        let hits = rank(&entries, "report", ScoringWeights::default(), MAX_SEARCH_RESULTS);
        assert_eq!(hits.len(), 8);
        let expected: Vec<String> = (0..8).map(|i| format!("Report {i:02}")).collect();
        assert_eq!(labels(&hits), expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn weights_are_tunable() {
        let entries = vec![
            SearchTarget::new("Leave", "/leave", &[]),
            SearchTarget::new("Apply", "/apply", &["annual leave"]),
        ];
        // Only the prefix signal counts: "annual leave" no longer qualifies.
        let weights = ScoringWeights {
            all_tokens: 0,
            direct: 0,
            prefix: 1,
        };
        let hits = rank(&entries, "leave", weights, 8);
        assert_eq!(labels(&hits), vec!["Leave"]);

        let engine = SearchEngine::new(Catalog::new(vec![], entries)).with_weights(weights);
        assert_eq!(labels(&engine.search("leave", Role::Employee)), vec!["Leave"]);
    }

    #[test]
    fn score_sums_independent_signals() {
        let target = SearchTarget::new("Leave Requests", "/admin/leaves", &["vacation"]);
        let w = ScoringWeights::default();
        let toks = |q: &'static str| q.split_whitespace().collect::<BTreeSet<_>>();

        assert_eq!(score(&target, "leave", &toks("leave"), w), 6);
        assert_eq!(score(&target, "requests", &toks("requests"), w), 5);
        assert_eq!(score(&target, "requests leave", &toks("requests leave"), w), 3);
        assert_eq!(score(&target, "sick", &toks("sick"), w), 0);
    }
}
