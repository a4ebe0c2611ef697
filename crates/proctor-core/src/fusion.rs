//! Fusion / ghost-typing detector: the heart of the engine. Stateless
//! functions over a `Session`'s rolling history — dual-window (R, L)
//! scenario confirmation plus independent per-frame face-count
//! violations, both gated by per-kind cooldowns.

use crate::config::ProctorConfig;
use crate::session::state::{DetectionSample, Session};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};

const R_WINDOW: usize = 20;
const L_WINDOW: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ViolationKind {
    #[serde(rename = "GHOST_TYPING_DETECTED")]
    GhostTypingDetected,
    #[serde(rename = "NO_FACE_DETECTED")]
    NoFaceDetected,
    #[serde(rename = "MULTIPLE_PERSONS")]
    MultiplePersons,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub details: String,
    pub confidence: f64,
    pub scenario: Option<&'static str>,
    pub evidence: HashMap<String, f64>,
    pub t: DateTime<Utc>,
}

struct WindowCounts {
    s: usize,
    ht: usize,
    hv: usize,
    ha: usize,
    hnt: usize,
    len: usize,
}

fn count_window(samples: &[DetectionSample]) -> WindowCounts {
    let len = samples.len();
    let s = samples.iter().filter(|x| x.screen_typing).count();
    let ht = samples.iter().filter(|x| x.hands_typing).count();
    let hv = samples.iter().filter(|x| x.hands_visible).count();
    let ha = len - hv;
    let hnt = samples
        .iter()
        .filter(|x| x.hands_visible && !x.hands_typing)
        .count();
    WindowCounts { s, ht, hv, ha, hnt, len }
}

fn evidence(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Evaluate the Scenario 1/2 ghost-typing tests over the session's
/// current history, honouring the global `Δ_ghost` cooldown. Returns
/// `None` when preconditions aren't met, no scenario fires, or the
/// cooldown is still armed. Does not mutate `session` — the caller
/// (the session manager) is responsible for calling `note_emit` with
/// the returned violation.
pub fn evaluate_ghost_typing(
    session: &Session,
    config: &ProctorConfig,
    now: Instant,
) -> Option<Violation> {
    if session.history.len() < config.min_history_for_fusion {
        return None;
    }
    if !session.cooldown_elapsed(
        ViolationKind::GhostTypingDetected,
        now,
        Duration::from_secs_f64(config.ghost_cooldown_secs),
    ) {
        return None;
    }

    let r = session.recent(R_WINDOW);
    if r.len() < R_WINDOW {
        return None;
    }
    let l = session.recent(L_WINDOW);

    let rc = count_window(&r);
    let lc = count_window(&l);

    let (s1_r_s, s1_r_ha) = config.s1_r_thresh;
    let (s1_l_s, s1_l_ha) = config.s1_l_thresh;
    let scenario1_primary = rc.s >= s1_r_s && rc.ha >= s1_r_ha;
    let scenario1_confirmed = lc.len >= L_WINDOW && lc.s >= s1_l_s && lc.ha >= s1_l_ha;

    if scenario1_primary && scenario1_confirmed {
        return Some(Violation {
            kind: ViolationKind::GhostTypingDetected,
            severity: Severity::Critical,
            details: "Screen text entry detected with hands absent from frame".to_string(),
            confidence: 0.90,
            scenario: Some("hands_absent"),
            evidence: evidence(&[
                ("S_R", rc.s as f64),
                ("HA_R", rc.ha as f64),
                ("S_L", lc.s as f64),
                ("HA_L", lc.ha as f64),
            ]),
            t: Utc::now(),
        });
    }

    let (s2_r_s, s2_r_ht_max, s2_r_hnt) = config.s2_r_thresh;
    let (s2_l_s, s2_l_ht_max) = config.s2_l_thresh;
    let scenario2_primary = rc.s >= s2_r_s && rc.ht <= s2_r_ht_max && rc.hnt >= s2_r_hnt;
    let scenario2_confirmed = lc.len >= L_WINDOW && lc.s >= s2_l_s && lc.ht <= s2_l_ht_max;

    if scenario2_primary && scenario2_confirmed {
        return Some(Violation {
            kind: ViolationKind::GhostTypingDetected,
            severity: Severity::High,
            details: "Screen text entry detected with hands visible but idle".to_string(),
            confidence: 0.80,
            scenario: Some("hands_not_typing"),
            evidence: evidence(&[
                ("S_R", rc.s as f64),
                ("HT_R", rc.ht as f64),
                ("HNT_R", rc.hnt as f64),
                ("S_L", lc.s as f64),
                ("HT_L", lc.ht as f64),
            ]),
            t: Utc::now(),
        });
    }

    None
}

/// Independent per-frame face-count violations: not gated by the
/// fusion window, each with its own cooldown.
pub fn evaluate_face_count(
    session: &Session,
    config: &ProctorConfig,
    face_count: usize,
    now: Instant,
) -> Option<Violation> {
    let delta = Duration::from_secs_f64(config.face_cooldown_secs);

    if face_count == 0 && session.cooldown_elapsed(ViolationKind::NoFaceDetected, now, delta) {
        return Some(Violation {
            kind: ViolationKind::NoFaceDetected,
            severity: Severity::Medium,
            details: "No face visible in camera frame".to_string(),
            confidence: 1.0,
            scenario: None,
            evidence: evidence(&[("faceCount", 0.0)]),
            t: Utc::now(),
        });
    }

    if face_count > 1 && session.cooldown_elapsed(ViolationKind::MultiplePersons, now, delta) {
        return Some(Violation {
            kind: ViolationKind::MultiplePersons,
            severity: Severity::Critical,
            details: format!("{face_count} faces visible in camera frame"),
            confidence: 1.0,
            scenario: None,
            evidence: evidence(&[("faceCount", face_count as f64)]),
            t: Utc::now(),
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::state::SessionIdentity;
    use uuid::Uuid;

    fn new_session() -> Session {
        Session::new(
            SessionIdentity {
                student_id: "s1".into(),
                exam_id: "e1".into(),
                session_id: Uuid::new_v4(),
            },
            40,
        )
    }

    fn push_n(session: &mut Session, n: usize, hv: bool, ht: bool, st: bool) {
        for _ in 0..n {
            session.append(hv, ht, st, if hv { 1 } else { 0 }, if ht { 0.9 } else { 0.1 });
        }
    }

    #[test]
    fn test_below_min_history_never_fires() {
        let mut session = new_session();
        push_n(&mut session, 10, false, false, true);
        let config = ProctorConfig::default();
        assert!(evaluate_ghost_typing(&session, &config, Instant::now()).is_none());
    }

    #[test]
    fn test_clean_session_never_fires() {
        let mut session = new_session();
        push_n(&mut session, 40, true, true, false);
        let config = ProctorConfig::default();
        assert!(evaluate_ghost_typing(&session, &config, Instant::now()).is_none());
    }

    #[test]
    fn test_scenario1_hands_absent_fires() {
        let mut session = new_session();
        // 40 samples: hands absent throughout, screen typing on all of them.
        push_n(&mut session, 40, false, false, true);
        let config = ProctorConfig::default();
        let violation = evaluate_ghost_typing(&session, &config, Instant::now());
        let violation = violation.expect("expected scenario 1 to fire");
        assert_eq!(violation.kind, ViolationKind::GhostTypingDetected);
        assert_eq!(violation.scenario, Some("hands_absent"));
    }

    #[test]
    fn test_scenario2_hands_idle_fires() {
        let mut session = new_session();
        // Hands visible but never typing, screen typing throughout.
        push_n(&mut session, 40, true, false, true);
        let config = ProctorConfig::default();
        let violation = evaluate_ghost_typing(&session, &config, Instant::now());
        let violation = violation.expect("expected scenario 2 to fire");
        assert_eq!(violation.scenario, Some("hands_not_typing"));
    }

    #[test]
    fn test_cooldown_suppresses_second_emission() {
        let mut session = new_session();
        push_n(&mut session, 40, false, false, true);
        let config = ProctorConfig::default();
        let now = Instant::now();
        let first = evaluate_ghost_typing(&session, &config, now).expect("first fires");
        session.note_emit(ViolationKind::GhostTypingDetected, now, first);

        // Immediately re-evaluating is suppressed by the cooldown.
        assert!(evaluate_ghost_typing(&session, &config, now).is_none());
    }

    #[test]
    fn test_no_face_detected_independent_of_fusion() {
        let session = new_session();
        let config = ProctorConfig::default();
        let violation = evaluate_face_count(&session, &config, 0, Instant::now());
        assert_eq!(violation.unwrap().kind, ViolationKind::NoFaceDetected);
    }

    #[test]
    fn test_multiple_persons_independent_of_fusion() {
        let session = new_session();
        let config = ProctorConfig::default();
        let violation = evaluate_face_count(&session, &config, 2, Instant::now());
        assert_eq!(violation.unwrap().kind, ViolationKind::MultiplePersons);
    }

    #[test]
    fn test_single_face_no_violation() {
        let session = new_session();
        let config = ProctorConfig::default();
        assert!(evaluate_face_count(&session, &config, 1, Instant::now()).is_none());
    }
}
