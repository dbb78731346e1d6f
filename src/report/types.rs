use crate::evaluate::PredictionOutcome;

/// Coarse reading of a merge confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfidenceBand {
    Low,
    Medium,
    High,
}

impl ConfidenceBand {
    pub fn from_score(score: u8) -> Self {
        match score {
            70..=u8::MAX => ConfidenceBand::High,
            50..=69 => ConfidenceBand::Medium,
            _ => ConfidenceBand::Low,
        }
    }
}

impl std::fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceBand::Low => write!(f, "LOW"),
            ConfidenceBand::Medium => write!(f, "MEDIUM"),
            ConfidenceBand::High => write!(f, "HIGH"),
        }
    }
}

/// One open PR in the report.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub number: u64,
    pub outcome: PredictionOutcome,
}

impl ReportEntry {
    /// None when the evaluation failed.
    pub fn band(&self) -> Option<ConfidenceBand> {
        match &self.outcome {
            PredictionOutcome::Predicted(p) => Some(ConfidenceBand::from_score(p.confidence)),
            PredictionOutcome::Failed { .. } => None,
        }
    }
}

/// Merge predictions for one repository, ready to render.
#[derive(Debug)]
pub struct Report {
    /// "owner/repo"
    pub repository: String,
    /// Entries in PR-number order
    pub entries: Vec<ReportEntry>,
    pub fetch_errors: Vec<String>,
}

impl Report {
    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.band().is_none()).count()
    }
}
