//! Session report and risk classification.

use crate::fusion::{Violation, ViolationKind};
use crate::session::state::{Session, SessionIdentity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

/// How many of the most recent violations to embed verbatim in the
/// report.
const REPORT_LAST_K: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    LowRisk,
    MediumRisk,
    HighRisk,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub student_id: String,
    pub exam_id: String,
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub frames_camera: u64,
    pub frames_screen: u64,
    pub total_violations: usize,
    pub counts_by_kind: HashMap<String, usize>,
    pub last_violations: Vec<Violation>,
    pub risk_level: RiskLevel,
}

fn kind_label(kind: ViolationKind) -> &'static str {
    match kind {
        ViolationKind::GhostTypingDetected => "GHOST_TYPING_DETECTED",
        ViolationKind::NoFaceDetected => "NO_FACE_DETECTED",
        ViolationKind::MultiplePersons => "MULTIPLE_PERSONS",
    }
}

/// Classify overall session risk from violation counts.
pub fn classify_risk(ghost: usize, multiple: usize, no_face: usize) -> RiskLevel {
    if ghost >= 3 || multiple >= 2 {
        RiskLevel::HighRisk
    } else if ghost >= 1 || no_face > 20 {
        RiskLevel::MediumRisk
    } else {
        RiskLevel::LowRisk
    }
}

/// Build the final report for a session at `end_proctoring`.
/// `wall_start`/`wall_now` anchor the monotonic session clock to the
/// wall-clock timestamps the report surfaces.
pub fn build_report(
    session: &Session,
    wall_start: DateTime<Utc>,
    wall_now: DateTime<Utc>,
    now: Instant,
) -> SessionReport {
    let SessionIdentity { student_id, exam_id, session_id } = session.identity.clone();

    let mut counts_by_kind: HashMap<String, usize> = HashMap::new();
    for kind in [
        ViolationKind::GhostTypingDetected,
        ViolationKind::NoFaceDetected,
        ViolationKind::MultiplePersons,
    ] {
        counts_by_kind.insert(kind_label(kind).to_string(), session.violation_count(kind));
    }

    let ghost = session.violation_count(ViolationKind::GhostTypingDetected);
    let multiple = session.violation_count(ViolationKind::MultiplePersons);
    let no_face = session.violation_count(ViolationKind::NoFaceDetected);

    let last_violations = session
        .violation_log
        .iter()
        .rev()
        .take(REPORT_LAST_K)
        .rev()
        .cloned()
        .collect();

    SessionReport {
        student_id,
        exam_id,
        session_id,
        started_at: wall_start,
        ended_at: wall_now,
        duration_secs: now.duration_since(session.start_time).as_secs_f64(),
        frames_camera: session.frames_camera,
        frames_screen: session.frames_screen,
        total_violations: session.violation_log.len(),
        counts_by_kind,
        last_violations,
        risk_level: classify_risk(ghost, multiple, no_face),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_classification_thresholds() {
        assert_eq!(classify_risk(0, 0, 0), RiskLevel::LowRisk);
        assert_eq!(classify_risk(1, 0, 0), RiskLevel::MediumRisk);
        assert_eq!(classify_risk(0, 0, 21), RiskLevel::MediumRisk);
        assert_eq!(classify_risk(0, 0, 20), RiskLevel::LowRisk);
        assert_eq!(classify_risk(3, 0, 0), RiskLevel::HighRisk);
        assert_eq!(classify_risk(0, 2, 0), RiskLevel::HighRisk);
    }
}
