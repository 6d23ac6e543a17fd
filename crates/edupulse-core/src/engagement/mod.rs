//! Engagement scoring.
//!
//! A score in [0, 1] decays once per tick while tracking, is bumped by input
//! activity and knocked down by visibility and idle penalties. The first tick
//! that takes it below the threshold raises a one-shot breach.

mod penalty;
mod score;
mod tracker;

pub use penalty::{IdlePenalty, IdlePenaltyService, RemoteIdlePenalty, SimulatedIdlePenalty};
pub use score::{
    clamp_score, DecayOutcome, EngagementHistory, EngagementRecord, EngagementState, MAX_SCORE,
    MIN_SCORE,
};
pub use tracker::{EngagementSnapshot, EngagementTracker};
