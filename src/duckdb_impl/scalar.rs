//! Shared DuckDB scalar invoke helpers.
//!
//! These helpers centralize common scalar boilerplate:
//! - flat vector access
//! - per-row NULL checks
//! - `duckdb_string_t` decoding
//! - output insertion / validity handling
//!
//! # Safety
//! These helpers MUST only be called from within a DuckDB scalar `invoke()` while the
//! underlying vectors are valid.
//!
//! Callers MUST ensure the input/output column logical types match the helper being used
//! (e.g., `VARCHAR` inputs for `duckdb_string_t`, `DOUBLE` outputs for `f64`, etc.).

use std::error::Error;
use std::ffi::CString;

use duckdb::{
    Result,
    core::{DataChunkHandle, FlatVector, Inserter, LogicalTypeId},
    vtab::arrow::WritableVector,
};
use libduckdb_sys::duckdb_string_t;

use super::string::decode_duckdb_string;

fn ensure_type(
    vec: &FlatVector,
    expected: LogicalTypeId,
    label: &str,
) -> Result<(), Box<dyn Error>> {
    let actual = vec.logical_type().id();
    if actual != expected {
        return Err(format!(
            "scalar helper type mismatch: {label} expected {expected:?}, got {actual:?}"
        )
        .into());
    }
    Ok(())
}

/// Invoke a unary `VARCHAR -> VARCHAR` scalar. NULL inputs produce NULL.
pub fn invoke_unary_varchar_to_varchar<F>(
    input: &DataChunkHandle,
    output: &mut dyn WritableVector,
    mut f: F,
) -> Result<(), Box<dyn Error>>
where
    F: FnMut(&str) -> Result<String, Box<dyn Error>>,
{
    let len = input.len();
    let input_vec = input.flat_vector(0);
    ensure_type(&input_vec, LogicalTypeId::Varchar, "input[0]")?;
    let input_slice = input_vec.as_slice::<duckdb_string_t>();
    let mut output_vec = output.flat_vector();
    ensure_type(&output_vec, LogicalTypeId::Varchar, "output")?;

    for (i, s) in input_slice.iter().take(len).enumerate() {
        if input_vec.row_is_null(i as u64) {
            output_vec.set_null(i);
            continue;
        }

        // SAFETY: Row nullability is checked above.
        let val = unsafe { decode_duckdb_string(s) };
        output_vec.insert(i, CString::new(f(&val)?)?);
    }

    Ok(())
}

/// Per-row value of an optional trailing `VARCHAR` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalVarchar<'a> {
    /// The function was called without the argument.
    Absent,
    Null,
    Value(&'a str),
}

/// Invoke a `VARCHAR -> VARCHAR` scalar that optionally reads a per-row `VARCHAR` argument from
/// column 1 if present. A NULL input produces NULL; `f` decides what a NULL argument produces
/// by returning `None` for NULL output.
pub fn invoke_unary_varchar_optional_varchar_to_varchar<F>(
    input: &DataChunkHandle,
    output: &mut dyn WritableVector,
    mut f: F,
) -> Result<(), Box<dyn Error>>
where
    F: FnMut(&str, OptionalVarchar<'_>) -> Result<Option<String>, Box<dyn Error>>,
{
    let len = input.len();
    let input_vec = input.flat_vector(0);
    ensure_type(&input_vec, LogicalTypeId::Varchar, "input[0]")?;
    let input_slice = input_vec.as_slice::<duckdb_string_t>();
    let arg_vec = if input.num_columns() > 1 {
        Some(input.flat_vector(1))
    } else {
        None
    };
    if let Some(vec) = &arg_vec {
        ensure_type(vec, LogicalTypeId::Varchar, "input[1]")?;
    }
    let arg_slice = arg_vec.as_ref().map(|v| v.as_slice::<duckdb_string_t>());

    let mut output_vec = output.flat_vector();
    ensure_type(&output_vec, LogicalTypeId::Varchar, "output")?;

    for (i, s) in input_slice.iter().take(len).enumerate() {
        if input_vec.row_is_null(i as u64) {
            output_vec.set_null(i);
            continue;
        }

        // SAFETY: Row nullability is checked above.
        let val = unsafe { decode_duckdb_string(s) };
        let decoded = match (&arg_vec, &arg_slice) {
            (Some(vec), Some(slice)) if !vec.row_is_null(i as u64) => {
                // SAFETY: Argument row nullability is checked in the guard.
                Some(unsafe { decode_duckdb_string(&slice[i]) })
            }
            _ => None,
        };
        let arg = match (&arg_vec, decoded.as_deref()) {
            (None, _) => OptionalVarchar::Absent,
            (Some(_), None) => OptionalVarchar::Null,
            (Some(_), Some(value)) => OptionalVarchar::Value(value),
        };

        match f(&val, arg)? {
            Some(out) => output_vec.insert(i, CString::new(out)?),
            None => output_vec.set_null(i),
        }
    }

    Ok(())
}

/// Invoke a unary `VARCHAR -> DOUBLE` scalar.
///
/// This helper outputs NULL when the input row is NULL or when `f` returns `None`.
pub fn invoke_unary_varchar_to_f64_nullable<F>(
    input: &DataChunkHandle,
    output: &mut dyn WritableVector,
    mut f: F,
) -> Result<(), Box<dyn Error>>
where
    F: FnMut(&str) -> Option<f64>,
{
    let len = input.len();
    let input_vec = input.flat_vector(0);
    ensure_type(&input_vec, LogicalTypeId::Varchar, "input[0]")?;
    let input_slice = input_vec.as_slice::<duckdb_string_t>();
    let mut output_vec = output.flat_vector();
    ensure_type(&output_vec, LogicalTypeId::Double, "output")?;

    for (i, s) in input_slice.iter().take(len).enumerate() {
        if input_vec.row_is_null(i as u64) {
            output_vec.set_null(i);
            continue;
        }

        // SAFETY: Row nullability is checked above.
        let val = unsafe { decode_duckdb_string(s) };
        match f(&val) {
            Some(v) => output_vec.as_mut_slice::<f64>()[i] = v,
            None => output_vec.set_null(i),
        }
    }

    Ok(())
}

/// Invoke a unary `VARCHAR -> UBIGINT` scalar.
///
/// This helper outputs NULL when the input row is NULL or when `f` returns `None`.
pub fn invoke_unary_varchar_to_u64_nullable<F>(
    input: &DataChunkHandle,
    output: &mut dyn WritableVector,
    mut f: F,
) -> Result<(), Box<dyn Error>>
where
    F: FnMut(&str) -> Option<u64>,
{
    let len = input.len();
    let input_vec = input.flat_vector(0);
    ensure_type(&input_vec, LogicalTypeId::Varchar, "input[0]")?;
    let input_slice = input_vec.as_slice::<duckdb_string_t>();
    let mut output_vec = output.flat_vector();
    ensure_type(&output_vec, LogicalTypeId::UBigint, "output")?;

    for (i, s) in input_slice.iter().take(len).enumerate() {
        if input_vec.row_is_null(i as u64) {
            output_vec.set_null(i);
            continue;
        }

        // SAFETY: Row nullability is checked above.
        let val = unsafe { decode_duckdb_string(s) };
        match f(&val) {
            Some(v) => output_vec.as_mut_slice::<u64>()[i] = v,
            None => output_vec.set_null(i),
        }
    }

    Ok(())
}
