//! Outcome and clock features over game rows.

use crate::expr::{Expr, col, lit};
use crate::pipeline::{FeatureStep, Pipeline};

pub const WHITE_RATING: &str = "white_rating";
pub const BLACK_RATING: &str = "black_rating";
pub const RESULT: &str = "result";
pub const WHITE_CLOCK: &str = "white_clock";
pub const BLACK_CLOCK: &str = "black_clock";
pub const BASE_TIME: &str = "base_time";
pub const INCREMENT: &str = "increment";

pub const WINNER_MARGIN: &str = "winner_margin";
pub const RELATIVE_CLOCK_DIFF: &str = "relative_clock_diff";
pub const ELO_DIFF: &str = "elo_diff";

/// Move horizon used to turn a time control into an expected game budget.
pub const NUM_MOVES: i64 = 40;

/// Winner's rating minus loser's rating; null for draws and unfinished games.
pub fn winner_margin() -> Expr {
    col(RESULT).cases([
        ("0-1", col(BLACK_RATING) - col(WHITE_RATING)),
        ("1-0", col(WHITE_RATING) - col(BLACK_RATING)),
    ])
}

/// Clock difference as a share of the time budget `base_time + increment * num_moves`.
pub fn relative_clock_diff(num_moves: i64) -> Expr {
    (col(WHITE_CLOCK) - col(BLACK_CLOCK)) / (col(BASE_TIME) + col(INCREMENT) * lit(num_moves))
}

pub fn elo_diff() -> Expr {
    col(WHITE_RATING) - col(BLACK_RATING)
}

/// Derive `winner_margin` and order by it.
pub fn winner_margin_pipeline() -> Pipeline {
    Pipeline::new()
        .step(FeatureStep::single(WINNER_MARGIN, winner_margin()))
        .order_by(WINNER_MARGIN)
}

/// Derive `relative_clock_diff`, then `elo_diff`.
pub fn clock_feature_pipeline(num_moves: i64) -> Pipeline {
    Pipeline::new()
        .step(FeatureStep::single(
            RELATIVE_CLOCK_DIFF,
            relative_clock_diff(num_moves),
        ))
        .step(FeatureStep::single(ELO_DIFF, elo_diff()))
}
