//! End-to-end scenario tests over literal input sequences, mirroring
//! the six scenarios and boundary behaviours the fusion layer must
//! satisfy. Drives `Session` and `fusion` directly rather than through
//! the ingress transport, since the properties under test are about
//! detection semantics, not wire framing.

use proctor_core::config::ProctorConfig;
use proctor_core::fusion::{self, Severity, ViolationKind};
use proctor_core::session::state::{Session, SessionIdentity};
use std::time::Instant;
use uuid::Uuid;

fn new_session(hist_h: usize) -> Session {
    Session::new(
        SessionIdentity {
            student_id: "student-1".into(),
            exam_id: "exam-1".into(),
            session_id: Uuid::new_v4(),
        },
        hist_h,
    )
}

fn push(session: &mut Session, n: usize, hands_visible: bool, hands_typing: bool, screen_typing: bool) {
    for _ in 0..n {
        session.append(
            hands_visible,
            hands_typing,
            screen_typing,
            if hands_visible { 1 } else { 0 },
            if hands_typing { 0.9 } else { 0.1 },
        );
    }
}

#[test]
fn scenario_1_clean_session_never_flags() {
    let mut session = new_session(40);
    let config = ProctorConfig::default();
    let now = Instant::now();

    // 600 frames, all faceCount=1 handsVisible/handsTyping/screenTyping=true.
    for _ in 0..600 {
        push(&mut session, 1, true, true, true);
        fusion::evaluate_ghost_typing(&session, &config, now);
        assert!(fusion::evaluate_face_count(&session, &config, 1, now).is_none());
    }
    assert!(fusion::evaluate_ghost_typing(&session, &config, now).is_none());
    assert!(session.violation_log.is_empty());
}

#[test]
fn scenario_2_ghost_typing_hands_absent_then_cooldown() {
    let mut session = new_session(40);
    let config = ProctorConfig::default();
    let now = Instant::now();

    push(&mut session, 60, false, false, true);
    let first = fusion::evaluate_ghost_typing(&session, &config, now).expect("expected emission");
    assert_eq!(first.scenario, Some("hands_absent"));
    assert_eq!(first.severity, Severity::Critical);
    assert!((first.confidence - 0.90).abs() < f64::EPSILON);
    session.note_emit(first.kind, now, first);

    // Immediately continuing the same stream is suppressed by the cooldown.
    push(&mut session, 100, false, false, true);
    assert!(fusion::evaluate_ghost_typing(&session, &config, now).is_none());

    // After the cooldown elapses, a fresh emission is possible again.
    let later = now + std::time::Duration::from_secs_f64(config.ghost_cooldown_secs + 0.1);
    let second = fusion::evaluate_ghost_typing(&session, &config, later);
    assert!(second.is_some(), "expected exactly one additional emission after cooldown");
}

#[test]
fn scenario_3_ghost_typing_hands_idle() {
    let mut session = new_session(40);
    let config = ProctorConfig::default();
    let now = Instant::now();

    push(&mut session, 60, true, false, true);
    let violation = fusion::evaluate_ghost_typing(&session, &config, now).expect("expected emission");
    assert_eq!(violation.scenario, Some("hands_not_typing"));
    assert_eq!(violation.severity, Severity::High);
    assert!((violation.confidence - 0.80).abs() < f64::EPSILON);
}

#[test]
fn scenario_4_face_absence_flags_no_face_not_ghost_typing() {
    let mut session = new_session(40);
    let config = ProctorConfig::default();
    let now = Instant::now();

    push(&mut session, 30, true, true, false);
    let violation = fusion::evaluate_face_count(&session, &config, 0, now).expect("expected no-face violation");
    assert_eq!(violation.kind, ViolationKind::NoFaceDetected);
    assert!(fusion::evaluate_ghost_typing(&session, &config, now).is_none());
}

#[test]
fn scenario_5_multiple_persons_flags_critical() {
    let session = new_session(40);
    let config = ProctorConfig::default();
    let now = Instant::now();

    let violation = fusion::evaluate_face_count(&session, &config, 2, now).expect("expected multiple-persons violation");
    assert_eq!(violation.kind, ViolationKind::MultiplePersons);
    assert_eq!(violation.severity, Severity::Critical);
}

#[test]
fn scenario_6_transient_occlusion_does_not_flag() {
    let mut session = new_session(40);
    let config = ProctorConfig::default();
    let now = Instant::now();

    // 30s normal typing (hands visible and typing, no screen anomaly).
    push(&mut session, 300, true, true, false);
    // 1.5s of hands absent with continuous screen typing -- too short to
    // fill the confirmation window with anomalous samples once the
    // history keeps rolling past capacity.
    push(&mut session, 15, false, false, true);
    assert!(fusion::evaluate_ghost_typing(&session, &config, now).is_none());

    // 30s normal typing resumes.
    push(&mut session, 300, true, true, false);
    assert!(fusion::evaluate_ghost_typing(&session, &config, now).is_none());
}

#[test]
fn boundary_history_under_fill_never_fires() {
    let mut session = new_session(40);
    let config = ProctorConfig::default();
    push(&mut session, 14, false, false, true);
    assert!(fusion::evaluate_ghost_typing(&session, &config, Instant::now()).is_none());
}

#[test]
fn boundary_all_true_produces_exactly_one_emission_then_silence() {
    let mut session = new_session(40);
    let config = ProctorConfig::default();
    let now = Instant::now();

    push(&mut session, 30, false, false, true);
    let violation = fusion::evaluate_ghost_typing(&session, &config, now).expect("expected emission");
    session.note_emit(violation.kind, now, violation);

    let within_cooldown = now + std::time::Duration::from_secs(5);
    assert!(fusion::evaluate_ghost_typing(&session, &config, within_cooldown).is_none());
}

#[test]
fn invariant_history_length_never_exceeds_capacity() {
    let mut session = new_session(40);
    push(&mut session, 500, true, true, true);
    assert!(session.history.len() <= 40);
}

#[test]
fn invariant_ghost_typing_requires_both_primary_and_confirmation() {
    let mut session = new_session(40);
    let config = ProctorConfig::default();
    let now = Instant::now();

    // Only 20 samples -- primary window satisfied but the L=30 window
    // can't be: the long-window confirmation must also hold.
    push(&mut session, 20, false, false, true);
    assert!(fusion::evaluate_ghost_typing(&session, &config, now).is_none());
}
