//! Centralized tuning constants for the relaxation games.
//!
//! These values define the deterministic math for every simulation. The
//! serde-backed config structs use them as their defaults, so a JSON file
//! can override any of them without touching code.

// Storage namespaces -------------------------------------------------------
pub const REACTION_PREFIX: &str = "relax-reaction-sprint";
pub const SKY_JUMP_PREFIX: &str = "relax-sky-jump";
pub const TARGET_PREFIX: &str = "relax-target-frenzy";
pub const HISTORY_CAPACITY: usize = 15;

// Reaction sprint ----------------------------------------------------------
pub const REACTION_TRIALS_PER_RUN: usize = 5;
pub const REACTION_DELAY_MIN_MS: f64 = 800.0;
pub const REACTION_DELAY_SPAN_MS: f64 = 1_200.0;
pub const REACTION_LEAD_IN_MS: f64 = 250.0;
pub const REACTION_FALSE_START_DISPLAY_MS: f64 = 600.0;
pub const REACTION_CLICKED_DISPLAY_MS: f64 = 350.0;
pub const FALSE_START_PENALTY_MS: f64 = 200.0;

// Target frenzy ------------------------------------------------------------
pub const TARGET_COUNT: usize = 20;
pub const TARGET_MARGIN_PCT: f64 = 6.0;
pub const TARGET_SPAN_PCT: f64 = 88.0;
pub const TARGET_HIT_RADIUS_PCT: f64 = 4.0;
pub const MISS_PENALTY_MS: f64 = 200.0;

// Sky jump: scoring ----------------------------------------------------------
pub const COIN_SCORE: u64 = 100;
pub const DIFFICULTY_FULL_SCROLL: f64 = 1_800.0;

// Sky jump: world geometry -------------------------------------------------
pub const DESKTOP_MIN_WIDTH: f64 = 520.0;
pub const PLATFORM_HEIGHT: f64 = 12.0;
pub const PLATFORM_BASE_WIDTH: f64 = 60.0;
pub const PLATFORM_WIDTH_SPAN: f64 = 40.0;
pub const PLATFORM_SIDE_PAD: f64 = 22.0;
pub const ROW_GAP_BASE: f64 = 40.0;
pub const ROW_GAP_SPAN: f64 = 30.0;
pub const INITIAL_ROWS: usize = 18;
pub const INITIAL_ROW_OFFSET: f64 = 56.0;
pub const START_PLATFORM_WIDTH: f64 = 84.0;
pub const START_PLATFORM_OFFSET: f64 = 18.0;
pub const PLAYER_WIDTH: f64 = 28.0;
pub const PLAYER_HEIGHT: f64 = 34.0;
pub const PLAYER_START_OFFSET: f64 = 60.0;
pub const PLAYER_FOOT_INSET: f64 = 2.0;
pub const HELPER_WIDTH_RATIO: f64 = 0.9;
pub const HELPER_MIN_SEPARATION: f64 = 90.0;
pub const HELPER_NUDGE_RATIO: f64 = 0.7;
pub const COIN_RADIUS: f64 = 7.0;
pub const COIN_LIFT: f64 = 18.0;
pub const SHIELD_RADIUS: f64 = 9.0;
pub const SHIELD_LIFT: f64 = 20.0;
pub const SHIELD_SHIFT: f64 = 20.0;
pub const SHIELD_EDGE_PAD: f64 = 10.0;

// Sky jump: camera and eviction --------------------------------------------
pub const CAMERA_THRESHOLD_RATIO: f64 = 0.42;
pub const PLATFORM_EVICT_MARGIN: f64 = 30.0;
pub const COLLECTIBLE_EVICT_MARGIN: f64 = 40.0;
pub const FALL_OUT_MARGIN: f64 = 40.0;
pub const SPAWN_TRIGGER_Y: f64 = 40.0;
pub const EMPTY_WORLD_ROW_RATIO: f64 = 0.75;

// Sky jump: frame clamping -------------------------------------------------
pub const FALLBACK_FRAME_SECS: f64 = 1.0 / 60.0;
pub const MAX_FRAME_SECS: f64 = 1.0 / 30.0;
pub const STEPS_PER_SECOND: f64 = 60.0;

// Sky jump: haptic pulses (ms) -----------------------------------------------
pub const HAPTIC_FRAGILE_MS: u32 = 8;
pub const HAPTIC_COIN_MS: u32 = 10;
pub const HAPTIC_SPRING_MS: u32 = 12;
pub const HAPTIC_SHIELD_PICKUP_MS: u32 = 12;
pub const HAPTIC_SHIELD_CONSUMED_MS: u32 = 20;
pub const HAPTIC_DEATH_MS: u32 = 30;
