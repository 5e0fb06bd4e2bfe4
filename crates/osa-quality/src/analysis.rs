//! Generic-versus-data-driven phrasing analysis

use serde::Serialize;

/// Phrases that mark boilerplate or unfinished content
pub const GENERIC_INDICATORS: &[&str] = &[
    "generic recommendation",
    "standard practice",
    "general suggestion",
    "typical approach",
    "common strategy",
    "placeholder content",
    "[todo]",
    "example data",
    "sample content",
];

/// Phrases that mark content grounded in the organization's own data
pub const DATA_INDICATORS: &[&str] = &[
    "based on your data",
    "your current performance",
    "specific to your site",
    "from your analytics",
    "your audience behavior",
    "your content performance",
    "personalized recommendation",
    "data-driven insight",
];

/// Indicator phrases found in a text
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ContentAnalysis {
    /// Generic indicators present, in list order
    pub generic_phrases: Vec<&'static str>,
    /// Data indicators present, in list order
    pub data_phrases: Vec<&'static str>,
}

impl ContentAnalysis {
    /// True when any generic indicator is present
    #[inline]
    #[must_use]
    pub fn is_generic(&self) -> bool {
        !self.generic_phrases.is_empty()
    }

    /// True when any data indicator is present
    #[inline]
    #[must_use]
    pub fn is_data_driven(&self) -> bool {
        !self.data_phrases.is_empty()
    }
}

/// Scan text (case-insensitive) for indicator phrases
#[must_use]
pub fn analyze_content(text: &str) -> ContentAnalysis {
    let lowered = text.to_lowercase();
    let found = |phrases: &[&'static str]| -> Vec<&'static str> {
        phrases.iter().copied().filter(|p| lowered.contains(p)).collect()
    };
    ContentAnalysis {
        generic_phrases: found(GENERIC_INDICATORS),
        data_phrases: found(DATA_INDICATORS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_generic_phrasing() {
        let analysis = analyze_content("Follow Standard Practice and add [TODO] later");
        assert_eq!(analysis.generic_phrases, vec!["standard practice", "[todo]"]);
        assert!(analysis.is_generic());
        assert!(!analysis.is_data_driven());
    }

    #[test]
    fn detects_data_phrasing() {
        let analysis = analyze_content("Based on your data, from your analytics we see...");
        assert_eq!(analysis.data_phrases.len(), 2);
        assert!(!analysis.is_generic());
    }
}
