use sketchmatch_lib::{Difficulty, SessionId};
use tokio::time::Instant;

/// Elapsed time is floored to this so a near-instant guess can't divide by zero.
pub const MIN_ELAPSED_SECS: f64 = 0.001;
const BASE_POINTS: f64 = 1000.0;

pub fn elapsed_seconds(started_at: Instant, now: Instant) -> f64 {
    now.saturating_duration_since(started_at)
        .as_secs_f64()
        .max(MIN_ELAPSED_SECS)
}

/// Points for a correct guess: `multiplier * 1000 / elapsed`, rounded to the nearest point.
pub fn points(difficulty: Option<Difficulty>, elapsed_seconds: f64) -> u64 {
    let multiplier = f64::from(Difficulty::multiplier_of(difficulty));
    (multiplier * BASE_POINTS / elapsed_seconds.max(MIN_ELAPSED_SECS)).round() as u64
}

/// A finished round. Never modified once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedRound {
    pub session_id: SessionId,
    pub duration_seconds: f64,
    pub points_awarded: u64,
}

/// Append-only record of every finished round.
#[derive(Debug, Default)]
pub struct Archive {
    rounds: Vec<ArchivedRound>,
}

impl Archive {
    pub fn record(&mut self, round: ArchivedRound) {
        tracing::info!(
            session_id = %round.session_id,
            duration = round.duration_seconds,
            points = round.points_awarded,
            "Round archived"
        );
        self.rounds.push(round);
    }

    pub fn rounds(&self) -> &[ArchivedRound] {
        &self.rounds
    }
}
