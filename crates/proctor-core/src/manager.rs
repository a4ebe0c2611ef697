//! Session manager: a registry mapping `connectionId -> Session` plus
//! the detectors/smoothers each session owns.

use crate::config::ProctorConfig;
use crate::detector::{CameraAdapter, CameraVision, NullCameraVision, ScreenAdapter};
use crate::error::{ProctorError, Result};
use crate::frame::{Frame, Substream};
use crate::fusion::{self, Violation};
use crate::persistence::{store_report_best_effort, PersistenceSink};
use crate::session::report::build_report;
use crate::session::state::{Session, SessionIdentity};
use crate::session::SessionReport;
use crate::smoother::TemporalSmoother;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Events a frame routed through the manager can produce, for the
/// ingress layer to translate into outbound wire messages.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Violations(Vec<Violation>),
    Status {
        frames_processed: u64,
        screen_frames_processed: u64,
        total_violations: usize,
        ghost_typing_count: usize,
    },
}

struct SessionHandle {
    session: Session,
    camera_vision: Box<dyn CameraVision>,
    camera_adapter: CameraAdapter,
    screen_adapter: ScreenAdapter,
    smoother: TemporalSmoother,
    wall_start: DateTime<Utc>,
}

/// The per-connection session registry. Safe to share across the
/// ingress layer's connection tasks: each session's state is only ever
/// touched by the single task driving that connection, so the
/// `DashMap` only needs to protect the registry's own insert/remove,
/// not the session's internals.
pub struct SessionManager {
    sessions: DashMap<String, SessionHandle>,
    config: ProctorConfig,
    sink: Arc<dyn PersistenceSink>,
}

impl SessionManager {
    pub fn new(config: ProctorConfig, sink: Arc<dyn PersistenceSink>) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
            sink,
        }
    }

    /// Create a session for `connection_id`, failing if one already
    /// exists for that connection.
    pub fn start(&self, connection_id: &str, student_id: String, exam_id: String) -> Result<Uuid> {
        if self.sessions.contains_key(connection_id) {
            return Err(ProctorError::SessionAlreadyExists(connection_id.to_string()));
        }

        let session_id = Uuid::new_v4();
        let identity = SessionIdentity {
            student_id,
            exam_id,
            session_id,
        };

        let handle = SessionHandle {
            session: Session::new(identity, self.config.hist_h),
            camera_vision: Box::new(NullCameraVision),
            camera_adapter: CameraAdapter::new(self.config.typing_confidence_threshold),
            screen_adapter: ScreenAdapter::new(Box::new(crate::detector::DefaultScreenVision::default())),
            smoother: TemporalSmoother::new(self.config.smooth_w, self.config.smooth_rho),
            wall_start: Utc::now(),
        };

        self.sessions.insert(connection_id.to_string(), handle);
        info!("session {session_id} started for connection {connection_id}");
        Ok(session_id)
    }

    /// Route one decoded frame through the appropriate substream
    /// adapter, update smoothers and history, and evaluate fusion if
    /// due.
    pub fn route_frame(
        &self,
        connection_id: &str,
        substream: Substream,
        frame: &Frame,
    ) -> Result<Vec<SessionEvent>> {
        let mut handle = self
            .sessions
            .get_mut(connection_id)
            .ok_or_else(|| ProctorError::SessionNotFound(connection_id.to_string()))?;
        let handle = handle.value_mut();

        let now = Instant::now();
        handle.session.last_inbound = now;
        let mut events = Vec::new();

        match substream {
            Substream::Camera => {
                handle.session.frames_camera += 1;
                let primitive = handle.camera_vision.detect(frame);
                let output = handle.camera_adapter.process(&primitive);

                handle.smoother.hands_visible.push(output.hands_visible);
                handle.smoother.hands_typing.push(output.hands_typing);
                // screenTyping is updated on the screen path; re-push the
                // smoother's current stable value so camera-path samples
                // stay aligned with the latest screen observation.
                let screen_stable = handle.smoother.screen_typing.stable();

                handle.session.append(
                    handle.smoother.hands_visible.stable(),
                    handle.smoother.hands_typing.stable(),
                    screen_stable,
                    primitive.hands.len(),
                    output.typing_confidence,
                );

                if let Some(violation) =
                    fusion::evaluate_face_count(&handle.session, &self.config, output.face_count, now)
                {
                    handle.session.note_emit(violation.kind, now, violation.clone());
                    events.push(SessionEvent::Violations(vec![violation]));
                }

                let due = handle
                    .session
                    .last_fusion_eval
                    .map(|last| now.duration_since(last) >= Duration::from_secs_f64(self.config.t_eval_secs))
                    .unwrap_or(true);

                if due {
                    handle.session.last_fusion_eval = Some(now);
                    if let Some(violation) = fusion::evaluate_ghost_typing(&handle.session, &self.config, now)
                    {
                        handle.session.note_emit(violation.kind, now, violation.clone());
                        events.push(SessionEvent::Violations(vec![violation]));
                    }
                }

                if handle.session.frames_camera % self.config.status_every == 0 {
                    events.push(SessionEvent::Status {
                        frames_processed: handle.session.frames_camera,
                        screen_frames_processed: handle.session.frames_screen,
                        total_violations: handle.session.violation_log.len(),
                        ghost_typing_count: handle
                            .session
                            .violation_count(crate::fusion::ViolationKind::GhostTypingDetected),
                    });
                }
            }
            Substream::Screen => {
                handle.session.frames_screen += 1;
                let output = handle.screen_adapter.process(frame);
                handle.smoother.screen_typing.push(output.screen_typing);
                debug!(
                    "connection {connection_id}: screen_typing={} (smoothed={})",
                    output.screen_typing,
                    handle.smoother.screen_typing.stable()
                );
            }
        }

        Ok(events)
    }

    /// Finalise a session: compute and persist its report, and remove
    /// it from the registry.
    pub fn end(&self, connection_id: &str) -> Result<SessionReport> {
        let (_, handle) = self
            .sessions
            .remove(connection_id)
            .ok_or_else(|| ProctorError::SessionNotFound(connection_id.to_string()))?;

        let report = build_report(&handle.session, handle.wall_start, Utc::now(), Instant::now());
        store_report_best_effort(self.sink.as_ref(), &report);
        info!(
            "session {} ended for connection {connection_id}: risk={:?}",
            handle.session.identity.session_id, report.risk_level
        );
        Ok(report)
    }

    /// Disconnect and reclaim sessions whose connection has gone idle
    /// past `idle_timeout_secs`, persisting their reports as if the
    /// client had sent `end_proctoring`.
    pub fn reap_idle(&self) -> Vec<(String, SessionReport)> {
        let timeout = Duration::from_secs(self.config.idle_timeout_secs);
        let now = Instant::now();

        let idle_ids: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| now.duration_since(entry.value().session.last_inbound) >= timeout)
            .map(|entry| entry.key().clone())
            .collect();

        let mut reaped = Vec::new();
        for connection_id in idle_ids {
            match self.end(&connection_id) {
                Ok(report) => reaped.push((connection_id, report)),
                Err(err) => warn!("failed to reap idle session {connection_id}: {err}"),
            }
        }
        reaped
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }
}
