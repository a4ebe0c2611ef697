use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// All engine tunables. Field names track the configuration table in
/// the specification (`SMOOTH_W`, `Δ_GHOST`, ...) in `snake_case`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProctorConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Smoothing window length, in samples (`SMOOTH_W`).
    #[serde(default = "default_smooth_w")]
    pub smooth_w: usize,

    /// Smoothing ratio threshold (`SMOOTH_RHO`).
    #[serde(default = "default_smooth_rho")]
    pub smooth_rho: f64,

    /// Session history capacity, in samples (`HIST_H`).
    #[serde(default = "default_hist_h")]
    pub hist_h: usize,

    /// Minimum interval between fusion evaluations, in seconds (`T_EVAL`).
    #[serde(default = "default_t_eval_secs")]
    pub t_eval_secs: f64,

    /// Cooldown between ghost-typing emissions, in seconds (`Δ_GHOST`).
    #[serde(default = "default_ghost_cooldown_secs")]
    pub ghost_cooldown_secs: f64,

    /// Cooldown for `NO_FACE_DETECTED` / `MULTIPLE_PERSONS`, in seconds.
    #[serde(default = "default_face_cooldown_secs")]
    pub face_cooldown_secs: f64,

    /// Scenario 1 primary thresholds: (S_R, HA_R).
    #[serde(default = "default_s1_r")]
    pub s1_r_thresh: (usize, usize),
    /// Scenario 1 confirmation thresholds: (S_L, HA_L).
    #[serde(default = "default_s1_l")]
    pub s1_l_thresh: (usize, usize),
    /// Scenario 2 primary thresholds: (S_R, HT_R max, HNT_R).
    #[serde(default = "default_s2_r")]
    pub s2_r_thresh: (usize, usize, usize),
    /// Scenario 2 confirmation thresholds: (S_L, HT_L max).
    #[serde(default = "default_s2_l")]
    pub s2_l_thresh: (usize, usize),

    /// Per-frame hand-typing confidence threshold (τ_typing).
    #[serde(default = "default_typing_confidence_threshold")]
    pub typing_confidence_threshold: f64,

    /// "In typing position" threshold from the source behaviour. Kept as
    /// a distinct tunable, not unified with `typing_confidence_threshold`
    /// and not wired into any decision — see DESIGN.md Open Questions.
    #[serde(default = "default_typing_position_threshold")]
    pub typing_position_threshold: f64,

    /// Status emission cadence, in camera frames (`STATUS_EVERY`).
    #[serde(default = "default_status_every")]
    pub status_every: u64,

    /// Session inactivity reclaim timeout, in seconds.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Minimum history length before fusion evaluation is attempted.
    #[serde(default = "default_min_history_for_fusion")]
    pub min_history_for_fusion: usize,

    /// Expected decoded frame dimensions. Real image-container decoding
    /// (PNG/JPEG) is out of scope; the ingress layer treats `video_frame`
    /// / `screen_frame` payloads as flat RGB8 buffers of this size.
    #[serde(default = "default_frame_width")]
    pub frame_width: usize,
    #[serde(default = "default_frame_height")]
    pub frame_height: usize,
}

impl Default for ProctorConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            listen_addr: default_listen_addr(),
            log_level: default_log_level(),
            smooth_w: default_smooth_w(),
            smooth_rho: default_smooth_rho(),
            hist_h: default_hist_h(),
            t_eval_secs: default_t_eval_secs(),
            ghost_cooldown_secs: default_ghost_cooldown_secs(),
            face_cooldown_secs: default_face_cooldown_secs(),
            s1_r_thresh: default_s1_r(),
            s1_l_thresh: default_s1_l(),
            s2_r_thresh: default_s2_r(),
            s2_l_thresh: default_s2_l(),
            typing_confidence_threshold: default_typing_confidence_threshold(),
            typing_position_threshold: default_typing_position_threshold(),
            status_every: default_status_every(),
            idle_timeout_secs: default_idle_timeout_secs(),
            min_history_for_fusion: default_min_history_for_fusion(),
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs_home().join(".proctor")
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_listen_addr() -> String {
    "0.0.0.0:8787".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_smooth_w() -> usize {
    20
}
fn default_smooth_rho() -> f64 {
    0.40
}
fn default_hist_h() -> usize {
    40
}
fn default_t_eval_secs() -> f64 {
    2.0
}
fn default_ghost_cooldown_secs() -> f64 {
    8.0
}
fn default_face_cooldown_secs() -> f64 {
    5.0
}
fn default_s1_r() -> (usize, usize) {
    (12, 14)
}
fn default_s1_l() -> (usize, usize) {
    (18, 21)
}
fn default_s2_r() -> (usize, usize, usize) {
    (12, 4, 14)
}
fn default_s2_l() -> (usize, usize) {
    (18, 6)
}
fn default_typing_confidence_threshold() -> f64 {
    0.40
}
fn default_typing_position_threshold() -> f64 {
    0.30
}
fn default_status_every() -> u64 {
    50
}
fn default_idle_timeout_secs() -> u64 {
    600
}
fn default_min_history_for_fusion() -> usize {
    15
}
fn default_frame_width() -> usize {
    320
}
fn default_frame_height() -> usize {
    240
}

impl ProctorConfig {
    /// Load `<data_dir>/proctor.json`, falling back to (and persisting)
    /// defaults if absent.
    pub fn load_or_default(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join("proctor.json");

        if config_path.exists() {
            let raw = fs::read_to_string(&config_path)?;
            let mut config: ProctorConfig = serde_json::from_str(&raw)?;
            config.data_dir = data_dir.to_path_buf();
            return Ok(config);
        }

        let config = Self::default_with_dir(data_dir);
        config.persist()?;
        Ok(config)
    }

    pub fn default_with_dir(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            ..Self::default()
        }
    }

    pub fn persist(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        let config_path = self.data_dir.join("proctor.json");
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(config_path, raw)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.smooth_w == 0 {
            anyhow::bail!("smooth_w must be > 0");
        }
        if !(0.0..=1.0).contains(&self.smooth_rho) {
            anyhow::bail!("smooth_rho must be in [0, 1]");
        }
        if self.hist_h == 0 {
            anyhow::bail!("hist_h must be > 0");
        }
        Ok(())
    }
}
