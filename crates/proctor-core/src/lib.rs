//! Real-time proctoring correlation engine: fuses synchronized webcam
//! and screen-capture substreams per examinee and flags "ghost typing" —
//! keystrokes appearing on screen with no corresponding hand activity.

pub mod config;
pub mod detector;
pub mod error;
pub mod frame;
pub mod fusion;
pub mod ingress;
pub mod manager;
pub mod persistence;
pub mod session;
pub mod smoother;

pub use config::ProctorConfig;
pub use error::{ProctorError, Result};
pub use frame::{Frame, Substream};
pub use fusion::{Severity, Violation, ViolationKind};
pub use manager::{SessionEvent, SessionManager};
pub use session::{RiskLevel, Session, SessionReport};
