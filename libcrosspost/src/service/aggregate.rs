//! Progress and batch classification
//!
//! Progress runs 0 (idle) -> 10 (validated, starting) -> 100 (last platform
//! settled). Platform completions share the remaining 90 points.

use crate::types::{MultiPlatformPostResponse, PlatformPostResult};

/// Progress published once validation passes
pub const STARTED_PROGRESS: u8 = 10;

/// Progress of a run whose dispatch loop completed
pub const COMPLETE_PROGRESS: u8 = 100;

/// `round(completed / total * 90) + 10`, saturating at 100
pub fn progress_for(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return STARTED_PROGRESS;
    }
    let completed = completed.min(total);
    let share = (completed as f64 / total as f64 * 90.0).round() as u8;
    STARTED_PROGRESS + share
}

/// Classification of a settled batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every platform succeeded
    Full { succeeded: usize },
    /// At least one but not all platforms succeeded
    Partial {
        succeeded: usize,
        failed: usize,
        total: usize,
    },
    /// No platform succeeded; carries every failure message in order
    Total { errors: Vec<String> },
}

impl BatchOutcome {
    pub fn classify(results: &[PlatformPostResult]) -> Self {
        let total = results.len();
        let succeeded = results.iter().filter(|r| r.success).count();

        if succeeded == 0 {
            let errors = results
                .iter()
                .map(|r| {
                    r.error
                        .clone()
                        .unwrap_or_else(|| format!("Failed to post to {}", r.platform))
                })
                .collect();
            Self::Total { errors }
        } else if succeeded == total {
            Self::Full { succeeded }
        } else {
            Self::Partial {
                succeeded,
                failed: total - succeeded,
                total,
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Full { .. })
    }

    /// Human-readable batch summary
    pub fn message(&self) -> String {
        match self {
            Self::Full { succeeded } => {
                format!("Successfully posted to {} platform(s)", succeeded)
            }
            Self::Partial {
                succeeded,
                failed,
                total,
            } => format!(
                "Posted to {}/{} platform(s). {} failed.",
                succeeded, total, failed
            ),
            Self::Total { errors } if errors.is_empty() => "No platforms were attempted".to_string(),
            Self::Total { errors } => format!("All platforms failed: {}", errors.join("; ")),
        }
    }

    /// Response for a full or partial outcome, keeping the actual results
    pub fn into_response(self, results: Vec<PlatformPostResult>) -> MultiPlatformPostResponse {
        MultiPlatformPostResponse {
            success: self.is_success(),
            message: self.message(),
            results,
        }
    }
}
