pub mod clock;
mod duckdb_impl;
pub mod error;
pub mod expr;
pub mod extract;
pub mod features;
pub mod log;
pub mod movetext;
pub mod pipeline;
pub mod scalars;
pub mod table;
pub mod timecontrol;

use duckdb::{Connection, Result};
use duckdb_ext_macros::duckdb_extension;
use scalars::{
    ChessClockJsonScalar, ChessClockSecondsScalar, ChessMovesClocksScalar,
    ChessTimecontrolBaseScalar, ChessTimecontrolIncrementScalar,
};
use std::error::Error;

pub use clock::{ClockField, ClockPattern, DEFAULT_CLOCK_PATTERN, ParsedClock, parse_clock};
pub use expr::{Expr, col, lit};
pub use extract::{extract_clock_columns, extract_clock_seconds};
pub use pipeline::{FeatureStep, Pipeline, PipelineError, PipelineOutput};
pub use table::{DataType, Schema, Table, Value};

#[duckdb_extension(name = "chess_features", api_version = "v1.0.0")]
pub unsafe fn extension_entrypoint(con: Connection) -> Result<(), Box<dyn Error>> {
    // Clock annotations
    con.register_scalar_function::<ChessClockJsonScalar>("chess_clock_json")?;
    con.register_scalar_function::<ChessClockSecondsScalar>("chess_clock_seconds")?;
    con.register_scalar_function::<ChessMovesClocksScalar>("chess_moves_clocks")?;

    // Time controls
    con.register_scalar_function::<ChessTimecontrolBaseScalar>("chess_timecontrol_base")?;
    con.register_scalar_function::<ChessTimecontrolIncrementScalar>(
        "chess_timecontrol_increment",
    )?;

    log::info("chess_features scalar functions registered");
    Ok(())
}
