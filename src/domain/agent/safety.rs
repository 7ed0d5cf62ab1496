//! Hazard classification of final answers.
//!
//! Pure and deterministic: the same text always yields the same report.
//! Matching is case-insensitive substring search over two fixed term tiers.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Risk level attached to an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    /// No hazard markers found.
    Safe,
    /// Procedure involves components that warrant care.
    Warning,
    /// Procedure involves a risk of serious injury.
    Critical,
}

/// Terms whose presence marks a procedure as critical.
static CRITICAL_TERMS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "high voltage",
        "high-voltage",
        "mains voltage",
        "mains power",
        "capacitor discharge",
        "charged capacitor",
        "battery puncture",
        "puncture the battery",
        "punctured battery",
        "swollen battery",
        "lithium fire",
        "thermal runaway",
        "gas line",
        "gas leak",
        "refrigerant",
        "electric shock",
    ]
});

/// Terms whose presence marks a procedure as needing care.
static WARNING_TERMS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "battery",
        "solder",
        "soldering iron",
        "heat gun",
        "heat the adhesive",
        "power supply",
        "sharp edges",
        "glass shards",
        "isopropyl alcohol",
    ]
});

/// Classification result: level plus every matched hazard term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyReport {
    /// Overall risk level.
    pub level: SafetyLevel,
    /// Hazard terms found in the text, in table order.
    pub matched_terms: Vec<String>,
}

/// Stateless hazard classifier for answer text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyClassifier;

impl SafetyClassifier {
    /// Creates a classifier.
    pub fn new() -> Self {
        Self
    }

    /// Scans `text` for hazard markers and returns the report.
    ///
    /// Critical terms dominate: a single critical match yields `Critical`
    /// even if warning terms also appear. Matched terms from both tiers are
    /// always reported.
    pub fn classify(&self, text: &str) -> SafetyReport {
        let lower = text.to_lowercase();

        let critical: Vec<String> = CRITICAL_TERMS
            .iter()
            .filter(|term| lower.contains(*term))
            .map(|term| term.to_string())
            .collect();

        let warning: Vec<String> = WARNING_TERMS
            .iter()
            .filter(|term| lower.contains(*term))
            .map(|term| term.to_string())
            .collect();

        let level = if !critical.is_empty() {
            SafetyLevel::Critical
        } else if !warning.is_empty() {
            SafetyLevel::Warning
        } else {
            SafetyLevel::Safe
        };

        let mut matched_terms = critical;
        matched_terms.extend(warning);

        SafetyReport {
            level,
            matched_terms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> SafetyReport {
        SafetyClassifier::new().classify(text)
    }

    #[test]
    fn plain_text_is_safe() {
        let report = classify("Step 1: Remove the four screws on the back cover.");
        assert_eq!(report.level, SafetyLevel::Safe);
        assert!(report.matched_terms.is_empty());
    }

    #[test]
    fn battery_mention_is_warning() {
        let report = classify("Carefully disconnect the battery connector.");
        assert_eq!(report.level, SafetyLevel::Warning);
        assert_eq!(report.matched_terms, vec!["battery"]);
    }

    #[test]
    fn high_voltage_is_critical() {
        let report = classify("The power board carries HIGH VOLTAGE even when unplugged.");
        assert_eq!(report.level, SafetyLevel::Critical);
        assert!(report.matched_terms.contains(&"high voltage".to_string()));
    }

    #[test]
    fn gas_line_is_critical() {
        let report = classify("Shut off the gas line before moving the range.");
        assert_eq!(report.level, SafetyLevel::Critical);
    }

    #[test]
    fn critical_beats_warning() {
        let report = classify("Never puncture the battery while prying; battery fires are severe.");
        assert_eq!(report.level, SafetyLevel::Critical);
        // Both tiers are still reported.
        assert!(report.matched_terms.contains(&"puncture the battery".to_string()));
        assert!(report.matched_terms.contains(&"battery".to_string()));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let report = classify("SWOLLEN BATTERY detected");
        assert_eq!(report.level, SafetyLevel::Critical);
    }

    #[test]
    fn classification_is_deterministic() {
        let text = "Use a heat gun to soften the adhesive, then pry near the battery.";
        assert_eq!(classify(text), classify(text));
    }

    #[test]
    fn level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SafetyLevel::Critical).unwrap(), "\"critical\"");
    }
}
