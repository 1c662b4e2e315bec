use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

// ── Constants ──────────────────────────────────────────────────────────

pub const DEFAULT_WHOLE_ROTATIONS: u32 = 4;
pub const DEFAULT_POINTER_ANGLE: f64 = 0.0;
pub const DEFAULT_FRAME_COUNT: usize = 60;
pub const DEFAULT_BASE_DELAY_MS: u32 = 20;
pub const DEFAULT_TAIL_FRAMES: usize = 15;
pub const DEFAULT_TAIL_MAX_DELAY_MS: u32 = 120;
pub const DEFAULT_HIGHLIGHT_FRAMES: usize = 5;
pub const DEFAULT_INTER_ROUND_WAIT_MS: u64 = 2_000;
pub const DEFAULT_CANCEL_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_ROLE_CACHE_TTL_MS: u64 = 30_000;
pub const MIN_TOURNAMENT_POOL: usize = 2;
pub const MIN_REINSTATEMENT_POOL: usize = 6;
pub const DEFAULT_OVERLAY_ADDR: &str = "127.0.0.1:17900";

// ── Shared state type aliases ──────────────────────────────────────────

pub type SharedOverlayState = Arc<Mutex<OverlayState>>;

// ── Wheel domain types ─────────────────────────────────────────────────

/// A pool member. Identity inside a round is positional; `id` is only used
/// to talk to the membership source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub label: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Participant {
            id: id.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    /// 1-based round number within the tournament.
    pub round: usize,
    pub winner_index: usize,
    pub winner: Participant,
    pub remaining_pool: Vec<Participant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinPlan {
    pub total_whole_rotations: u32,
    pub pointer_angle: f64,
    pub winner_slot_angle: f64,
    pub final_rotation_radians: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameStep {
    pub rotation_angle: f64,
    pub delay_ms: u32,
    pub highlighted: bool,
}

/// Knobs for the animation timing curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpinTiming {
    pub frame_count: usize,
    pub base_delay_ms: u32,
    pub tail_frames: usize,
    pub tail_max_delay_ms: u32,
    pub highlight_frames: usize,
}

impl Default for SpinTiming {
    fn default() -> Self {
        SpinTiming {
            frame_count: DEFAULT_FRAME_COUNT,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            tail_frames: DEFAULT_TAIL_FRAMES,
            tail_max_delay_ms: DEFAULT_TAIL_MAX_DELAY_MS,
            highlight_frames: DEFAULT_HIGHLIGHT_FRAMES,
        }
    }
}

// ── Render types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelSegment {
    pub label: String,
    pub start_angle: f64,
    pub sweep: f64,
}

/// One drawable wheel state: segments already rotated, pointer fixed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelFrame {
    pub segments: Vec<WheelSegment>,
    pub rotation: f64,
    pub pointer_angle: f64,
    pub highlight_slot: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationFrame {
    pub frame: WheelFrame,
    pub delay_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinAnimation {
    pub frames: Vec<AnimationFrame>,
    pub total_duration_ms: u64,
}

// ── Roster types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterMember {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RosterMember {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn participant(&self) -> Participant {
        Participant::new(self.id.clone(), self.name.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterFile {
    #[serde(default)]
    pub members: Vec<RosterMember>,
}

// ── Session types ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Idle,
    Spinning,
    Waiting,
    Finished,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummary {
    pub round: usize,
    pub eliminated: Participant,
    pub presentation: Vec<String>,
    pub plan: SpinPlan,
    pub tags_updated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub rounds: Vec<RoundSummary>,
    pub survivor: Option<Participant>,
    pub reinstated: Option<Participant>,
    pub cancelled: bool,
    pub failed_tag_updates: Vec<String>,
}

// ── Overlay types ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayState {
    pub status: SessionStatus,
    pub round: usize,
    pub pool: Vec<String>,
    pub last_round: Option<RoundSummary>,
    pub animation: Option<SpinAnimation>,
    /// Bumped every time a new animation is published.
    pub spin_seq: u64,
    pub survivor: Option<Participant>,
    pub updated_at_ms: u64,
}

impl Default for OverlayState {
    fn default() -> Self {
        OverlayState {
            status: SessionStatus::Idle,
            round: 0,
            pool: Vec::new(),
            last_round: None,
            animation: None,
            spin_seq: 0,
            survivor: None,
            updated_at_ms: 0,
        }
    }
}

// ── Config types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WheelConfig {
    pub roster_path: String,
    pub participant_tag: String,
    pub eliminated_tag: String,
    pub winner_tag: String,
    pub whole_rotations: u32,
    pub pointer_angle: f64,
    pub timing: SpinTiming,
    /// Pause after a spin's animation has played, before anything else is published.
    pub inter_round_wait_ms: u64,
    pub cancel_timeout_ms: u64,
    pub min_pool_size: usize,
    pub reinstatement_enabled: bool,
    pub reinstatement_min_pool: usize,
    pub role_cache_ttl_ms: u64,
    pub overlay_addr: String,
    pub rng_seed: Option<u64>,
    pub spin_log_enabled: bool,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            roster_path: "roster.json".to_string(),
            participant_tag: "wheel".to_string(),
            eliminated_tag: "wheel-out".to_string(),
            winner_tag: "wheel-winner".to_string(),
            whole_rotations: DEFAULT_WHOLE_ROTATIONS,
            pointer_angle: DEFAULT_POINTER_ANGLE,
            timing: SpinTiming::default(),
            inter_round_wait_ms: DEFAULT_INTER_ROUND_WAIT_MS,
            cancel_timeout_ms: DEFAULT_CANCEL_TIMEOUT_MS,
            min_pool_size: MIN_TOURNAMENT_POOL,
            reinstatement_enabled: true,
            reinstatement_min_pool: MIN_REINSTATEMENT_POOL,
            role_cache_ttl_ms: DEFAULT_ROLE_CACHE_TTL_MS,
            overlay_addr: DEFAULT_OVERLAY_ADDR.to_string(),
            rng_seed: None,
            spin_log_enabled: true,
        }
    }
}
