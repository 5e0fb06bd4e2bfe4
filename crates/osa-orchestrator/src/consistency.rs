//! Local contradiction pre-check
//!
//! Finds KPIs that are given different targets in different places of the
//! same document. The findings are passed to the consistency pass and kept
//! in its record.

use osa_types::{RecommendationDocument, SectionKind};
use std::collections::BTreeMap;

/// Describe every KPI that carries more than one distinct target
///
/// KPI names and targets are compared case- and whitespace-insensitively.
/// Output order follows the normalized KPI name, so it is stable.
#[must_use]
pub fn find_contradictions(document: &RecommendationDocument) -> Vec<String> {
    // kpi -> (display name, [(normalized target, raw target, section)])
    let mut by_kpi: BTreeMap<String, (&str, Vec<(String, &str, SectionKind)>)> = BTreeMap::new();
    for (section, target) in document.kpi_targets() {
        let key = normalize(&target.kpi);
        if key.is_empty() {
            continue;
        }
        let entry = by_kpi.entry(key).or_insert_with(|| (target.kpi.trim(), Vec::new()));
        entry.1.push((normalize(&target.target), target.target.trim(), section));
    }

    by_kpi
        .into_values()
        .filter_map(|(kpi, claims)| {
            let first = claims.first()?;
            let mut seen = vec![first.0.as_str()];
            let mut parts = vec![format!("'{}' in {}", first.1, first.2)];
            for (norm, raw, section) in &claims[1..] {
                if !seen.contains(&norm.as_str()) {
                    seen.push(norm);
                    parts.push(format!("'{raw}' in {section}"));
                }
            }
            (parts.len() > 1).then(|| format!("{kpi}: {}", parts.join(" vs ")))
        })
        .collect()
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
