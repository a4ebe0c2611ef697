//! Ingress message contracts. This crate owns only the message shapes;
//! the transport (WebSocket, framing, connection lifecycle) lives in
//! the `proctor-cli` binary so `proctor-core` stays transport agnostic.

use crate::session::SessionReport;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message arriving from one client connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    StartProctoring {
        #[serde(rename = "studentId")]
        student_id: String,
        #[serde(rename = "examId")]
        exam_id: String,
    },
    VideoFrame {
        frame: String,
        timestamp: f64,
    },
    ScreenFrame {
        frame: String,
        timestamp: f64,
    },
    EndProctoring,
}

/// A message sent back to one client connection.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    ConnectionResponse {
        status: String,
        #[serde(rename = "sessionId")]
        session_id: Uuid,
    },
    ProctoringStarted {
        status: String,
        #[serde(rename = "sessionId")]
        session_id: Uuid,
    },
    ViolationDetected {
        violations: Vec<crate::fusion::Violation>,
        timestamp: chrono::DateTime<chrono::Utc>,
        source: Option<&'static str>,
    },
    ProctorStatus {
        #[serde(rename = "framesProcessed")]
        frames_processed: u64,
        #[serde(rename = "screenFramesProcessed")]
        screen_frames_processed: u64,
        #[serde(rename = "totalViolations")]
        total_violations: usize,
        #[serde(rename = "ghostTypingCount")]
        ghost_typing_count: usize,
    },
    ProctoringEnded {
        status: String,
        report: SessionReport,
    },
    Error {
        message: String,
    },
}
