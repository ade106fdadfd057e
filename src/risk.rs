use serde::Serialize;

/// Scores at or above this percentage are high risk.
pub const HIGH_RISK_THRESHOLD: f64 = 80.0;
/// Scores at or above this percentage (and below the high mark) are medium risk.
pub const MEDIUM_RISK_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn from_percent(score: f64) -> Self {
        if score >= HIGH_RISK_THRESHOLD {
            RiskTier::High
        } else if score >= MEDIUM_RISK_THRESHOLD {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskTier::High => "HIGH RISK",
            RiskTier::Medium => "MEDIUM RISK",
            RiskTier::Low => "LOW RISK",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            RiskTier::High => "#ef4444",
            RiskTier::Medium => "#f59e0b",
            RiskTier::Low => "#10b981",
        }
    }

    /// Badge icon shown next to a match in the result list.
    pub fn icon(self) -> &'static str {
        match self {
            RiskTier::High => "fa-exclamation-triangle",
            RiskTier::Medium => "fa-exclamation-circle",
            RiskTier::Low => "fa-check-circle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskClass {
    pub tier: RiskTier,
    pub label: &'static str,
    pub color: &'static str,
}

/// Classifies a percentage score. Values outside `[0, 100]` fall into the
/// nearest tier through the same comparisons.
pub fn classify(score: f64) -> RiskClass {
    let tier = RiskTier::from_percent(score);
    RiskClass {
        tier,
        label: tier.label(),
        color: tier.color(),
    }
}

/// Classifies a canonical `[0, 1]` score.
pub fn classify_fraction(score: f64) -> RiskClass {
    classify(score * 100.0)
}
