//! Re-engagement challenges.

mod model;
mod provider;

pub use model::{ChallengeKind, EngagementChallenge, FALLBACK_FACT};
pub use provider::ChallengeProvider;
