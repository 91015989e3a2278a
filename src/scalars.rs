//! DuckDB scalar functions over move comments, movetext and time controls.

use std::error::Error;

use duckdb::{
    Result,
    core::{DataChunkHandle, LogicalTypeHandle, LogicalTypeId},
    vscalar::{ScalarFunctionSignature, VScalar},
    vtab::arrow::WritableVector,
};

use crate::clock::{ClockField, ClockPattern, ParsedClock, default_pattern};
use crate::duckdb_impl::scalar::{
    OptionalVarchar, invoke_unary_varchar_optional_varchar_to_varchar,
    invoke_unary_varchar_to_f64_nullable, invoke_unary_varchar_to_u64_nullable,
    invoke_unary_varchar_to_varchar,
};
use crate::log;
use crate::movetext::move_clocks_json;
use crate::timecontrol::parse_timecontrol;

fn varchar() -> LogicalTypeHandle {
    LogicalTypeHandle::from(LogicalTypeId::Varchar)
}

/// JSON object with one key per clock field; every value is `null` when there is no marker.
pub fn clock_to_json(clock: Option<&ParsedClock>) -> String {
    let object: serde_json::Map<String, serde_json::Value> = ClockField::ALL
        .iter()
        .map(|field| {
            let value = clock
                .map(|c| serde_json::Value::String(c.field(*field).to_string()))
                .unwrap_or(serde_json::Value::Null);
            (field.as_str().to_string(), value)
        })
        .collect();

    serde_json::Value::Object(object).to_string()
}

/// Compiles caller-supplied patterns, reusing the last one while it repeats across rows.
#[derive(Default)]
struct PatternCache {
    last: Option<(String, ClockPattern)>,
}

impl PatternCache {
    fn get(&mut self, pattern: Option<&str>) -> Result<&ClockPattern, Box<dyn Error>> {
        let Some(pattern) = pattern else {
            return Ok(default_pattern());
        };

        let cached = matches!(&self.last, Some((source, _)) if source.as_str() == pattern);
        if !cached {
            let compiled = ClockPattern::new(pattern).inspect_err(|e| log::error(e.to_string()))?;
            self.last = Some((pattern.to_string(), compiled));
        }

        match &self.last {
            Some((_, compiled)) => Ok(compiled),
            None => Ok(default_pattern()),
        }
    }
}

/// One row of `chess_clock_json`; a NULL pattern argument yields NULL.
fn clock_json_row(
    patterns: &mut PatternCache,
    comment: &str,
    pattern: OptionalVarchar<'_>,
) -> Result<Option<String>, Box<dyn Error>> {
    let pattern = match pattern {
        OptionalVarchar::Absent => None,
        OptionalVarchar::Null => return Ok(None),
        OptionalVarchar::Value(pattern) => Some(pattern),
    };
    let parsed = patterns.get(pattern)?.parse(comment);
    Ok(Some(clock_to_json(parsed.as_ref())))
}

pub struct ChessClockJsonScalar;

impl VScalar for ChessClockJsonScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        let mut patterns = PatternCache::default();
        invoke_unary_varchar_optional_varchar_to_varchar(input, output, |comment, pattern| {
            clock_json_row(&mut patterns, comment, pattern)
        })
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        vec![
            ScalarFunctionSignature::exact(vec![varchar()], varchar()),
            ScalarFunctionSignature::exact(vec![varchar(), varchar()], varchar()),
        ]
    }
}

pub struct ChessClockSecondsScalar;

impl VScalar for ChessClockSecondsScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        invoke_unary_varchar_to_f64_nullable(input, output, |comment| {
            default_pattern()
                .parse(comment)
                .and_then(|c| c.total_seconds())
        })
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        vec![ScalarFunctionSignature::exact(
            vec![varchar()],
            LogicalTypeHandle::from(LogicalTypeId::Double),
        )]
    }
}

pub struct ChessMovesClocksScalar;

impl VScalar for ChessMovesClocksScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        invoke_unary_varchar_to_varchar(input, output, |movetext| {
            Ok(move_clocks_json(movetext, default_pattern()))
        })
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        vec![ScalarFunctionSignature::exact(vec![varchar()], varchar())]
    }
}

pub struct ChessTimecontrolBaseScalar;

impl VScalar for ChessTimecontrolBaseScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        invoke_unary_varchar_to_u64_nullable(input, output, |tc| {
            parse_timecontrol(tc).map(|tc| u64::from(tc.base_seconds))
        })
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        vec![ScalarFunctionSignature::exact(
            vec![varchar()],
            LogicalTypeHandle::from(LogicalTypeId::UBigint),
        )]
    }
}

pub struct ChessTimecontrolIncrementScalar;

impl VScalar for ChessTimecontrolIncrementScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        invoke_unary_varchar_to_u64_nullable(input, output, |tc| {
            parse_timecontrol(tc).map(|tc| u64::from(tc.increment_seconds))
        })
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        vec![ScalarFunctionSignature::exact(
            vec![varchar()],
            LogicalTypeHandle::from(LogicalTypeId::UBigint),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::parse_clock;

    #[test]
    fn test_clock_to_json_match() {
        let parsed = parse_clock("something [%clk 0:05:23] more text");
        let json: serde_json::Value =
            serde_json::from_str(&clock_to_json(parsed.as_ref())).unwrap();
        assert_eq!(json["prefix"], "something ");
        assert_eq!(json["hours"], "0");
        assert_eq!(json["minutes"], "05");
        assert_eq!(json["seconds"], "23");
        assert_eq!(json["suffix"], " more text");
    }

    #[test]
    fn test_clock_to_json_no_match_is_all_null() {
        let json: serde_json::Value = serde_json::from_str(&clock_to_json(None)).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 5);
        assert!(object.values().all(serde_json::Value::is_null));
    }

    #[test]
    fn test_clock_json_row_null_pattern_is_null() {
        let mut patterns = PatternCache::default();
        let comment = "[%clk 0:05:23]";

        assert_eq!(
            clock_json_row(&mut patterns, comment, OptionalVarchar::Null).unwrap(),
            None
        );

        let absent = clock_json_row(&mut patterns, comment, OptionalVarchar::Absent)
            .unwrap()
            .unwrap();
        let explicit = clock_json_row(
            &mut patterns,
            comment,
            OptionalVarchar::Value(crate::clock::DEFAULT_CLOCK_PATTERN),
        )
        .unwrap()
        .unwrap();
        assert_eq!(absent, explicit);
        assert_eq!(absent, clock_to_json(parse_clock(comment).as_ref()));
    }

    #[test]
    fn test_pattern_cache_default_and_custom() {
        let mut cache = PatternCache::default();
        assert_eq!(
            cache.get(None).unwrap().as_str(),
            default_pattern().as_str()
        );

        let custom = r"^(?P<prefix>.*?)<(?P<hours>\d+)\.(?P<minutes>\d+)\.(?P<seconds>\d+)>(?P<suffix>.*)$";
        assert_eq!(cache.get(Some(custom)).unwrap().as_str(), custom);
        assert_eq!(cache.get(Some(custom)).unwrap().as_str(), custom);
        assert!(cache.get(Some("(?P<prefix>")).is_err());
    }
}
