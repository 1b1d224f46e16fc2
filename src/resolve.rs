//! Name and ID resolution against the [`Catalog`].
//!
//! Both resolvers are pure functions of the catalog and the search key and
//! return a MatchResult: the matching records in catalog order. Empty means
//! no match; more than one means the caller has to disambiguate (see
//! [`crate::disambiguation`]).
//!
//! # Name resolution
//!
//! 1. Lowercase the query and every catalog name (no other normalization).
//! 2. If some name equals the query, return every record with that name.
//! 3. Otherwise score the query against the distinct lowercased names with
//!    [`close_matches`] and keep the best `max_candidates` at or above
//!    `cutoff`.
//! 4. Return every record whose name is among the accepted matches.

use std::collections::HashSet;

use crate::catalog::Catalog;
use crate::config::MatchingConfig;
use crate::models::EquipmentRecord;
use crate::similarity::close_matches;

/// Fuzzy-matching parameters, decoupled from application config.
#[derive(Debug, Clone, Copy)]
pub struct MatchParams {
    /// Maximum number of distinct names accepted by approximate matching.
    pub max_candidates: usize,
    /// Minimum similarity ratio in `[0.0, 1.0]`.
    pub cutoff: f64,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            max_candidates: 5,
            cutoff: 0.5,
        }
    }
}

impl From<&MatchingConfig> for MatchParams {
    fn from(cfg: &MatchingConfig) -> Self {
        Self {
            max_candidates: cfg.max_candidates,
            cutoff: cfg.cutoff,
        }
    }
}

pub fn resolve_by_name(
    catalog: &Catalog,
    query: &str,
    params: &MatchParams,
) -> Vec<EquipmentRecord> {
    let query = query.to_lowercase();
    let lowered: Vec<String> = catalog
        .records()
        .iter()
        .map(|r| r.name.to_lowercase())
        .collect();

    if lowered.iter().any(|n| *n == query) {
        return records_where(catalog, &lowered, |n| n == query);
    }

    let mut seen = HashSet::new();
    let distinct: Vec<&str> = lowered
        .iter()
        .map(String::as_str)
        .filter(|n| seen.insert(*n))
        .collect();

    let accepted: HashSet<&str> =
        close_matches(&query, distinct, params.max_candidates, params.cutoff)
            .into_iter()
            .collect();

    if accepted.is_empty() {
        return Vec::new();
    }

    records_where(catalog, &lowered, |n| accepted.contains(n))
}

pub fn resolve_by_id(catalog: &Catalog, id: &str) -> Vec<EquipmentRecord> {
    let id = id.to_lowercase();
    catalog
        .records()
        .iter()
        .filter(|r| r.equipment_id.to_lowercase() == id)
        .cloned()
        .collect()
}

fn records_where<F>(catalog: &Catalog, lowered: &[String], pred: F) -> Vec<EquipmentRecord>
where
    F: Fn(&str) -> bool,
{
    catalog
        .records()
        .iter()
        .zip(lowered)
        .filter(|(_, n)| pred(n.as_str()))
        .map(|(r, _)| r.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(rows: &[(&str, &str)]) -> Catalog {
        Catalog::new(
            rows.iter()
                .map(|(name, id)| EquipmentRecord::new(*name, *id))
                .collect(),
            vec![],
        )
    }

    fn ids(records: &[EquipmentRecord]) -> Vec<&str> {
        records.iter().map(|r| r.equipment_id.as_str()).collect()
    }

    #[test]
    fn test_exact_match_case_insensitive() {
        let cat = catalog(&[("Extincteur X45", "EQ-1"), ("Extincteur X46", "EQ-2")]);
        let result = resolve_by_name(&cat, "extincteur x45", &MatchParams::default());
        assert_eq!(ids(&result), vec!["EQ-1"]);
    }

    #[test]
    fn test_exact_match_returns_all_duplicates_only() {
        let cat = catalog(&[
            ("Extincteur", "E1"),
            ("Extincteurs", "E3"),
            ("EXTINCTEUR", "E2"),
        ]);
        let result = resolve_by_name(&cat, "Extincteur", &MatchParams::default());
        assert_eq!(ids(&result), vec!["E1", "E2"]);
    }

    #[test]
    fn test_fuzzy_returns_all_records_per_name_in_catalog_order() {
        let cat = catalog(&[
            ("Pompe B", "P2"),
            ("Vanne", "V1"),
            ("Pompe A", "P1"),
            ("pompe b", "P3"),
        ]);
        let result = resolve_by_name(&cat, "Pompe", &MatchParams::default());
        assert_eq!(ids(&result), vec!["P2", "P1", "P3"]);
    }

    #[test]
    fn test_fuzzy_limited_to_max_candidates_names() {
        let cat = catalog(&[
            ("Pompe A", "P1"),
            ("Pompe B", "P2"),
            ("Pompe C", "P3"),
        ]);
        let params = MatchParams {
            max_candidates: 1,
            cutoff: 0.5,
        };
        // equal scores: highest string wins
        let result = resolve_by_name(&cat, "pompe", &params);
        assert_eq!(ids(&result), vec!["P3"]);
    }

    #[test]
    fn test_no_match_below_cutoff() {
        let cat = catalog(&[("Pompe A", "P1"), ("Extincteur", "E1")]);
        let result = resolve_by_name(&cat, "zzzznonexistent", &MatchParams::default());
        assert!(result.is_empty());
    }

    #[test]
    fn test_empty_catalog() {
        let cat = Catalog::default();
        assert!(resolve_by_name(&cat, "pompe", &MatchParams::default()).is_empty());
        assert!(resolve_by_id(&cat, "P1").is_empty());
    }

    #[test]
    fn test_resolve_by_name_is_idempotent() {
        let cat = catalog(&[("Pompe A", "P1"), ("Pompe B", "P2"), ("Vanne", "V1")]);
        let a = resolve_by_name(&cat, "pompe", &MatchParams::default());
        let b = resolve_by_name(&cat, "pompe", &MatchParams::default());
        assert_eq!(a, b);
    }

    #[test]
    fn test_resolve_by_id_case_insensitive() {
        let cat = catalog(&[("Extincteur", "E1"), ("Extincteur", "E2")]);
        let result = resolve_by_id(&cat, "e2");
        assert_eq!(ids(&result), vec!["E2"]);
        assert_eq!(result[0].name, "Extincteur");
    }

    #[test]
    fn test_resolve_by_id_no_partial_match() {
        let cat = catalog(&[("Extincteur", "E12")]);
        assert!(resolve_by_id(&cat, "E1").is_empty());
    }
}
