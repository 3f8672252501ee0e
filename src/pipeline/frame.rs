//! Column-level primitives for rule evaluation
//!
//! Every rule follows the same shape: read the current values of the columns
//! it looks at, build a selection vector, then either write through the
//! selection or compact the selected rows away. Writes keep the column's
//! integer dtype when the written values allow it.

use anyhow::{Context, Result};
use polars::prelude::*;

use crate::error::PrepError;

/// Look up a column that the caller cannot do without.
pub fn require<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| anyhow::Error::from(PrepError::missing_column(name)))
}

/// Look up a column that rules compare or overwrite with numbers.
///
/// Text left behind by a failed cast is rejected rather than read as missing.
pub fn require_numeric<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    let column = require(df, name)?;
    let dtype = column.dtype();
    if !(dtype.is_primitive_numeric() || matches!(dtype, DataType::Null)) {
        return Err(PrepError::non_numeric_column(name, dtype).into());
    }
    Ok(column)
}

/// Read a column as `f64`, treating null and NaN alike as missing.
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = require_numeric(df, name)?;
    let floats = column
        .strict_cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' cannot be read as numeric", name))?;

    let values = floats
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();

    Ok(values)
}

/// Read a column as text. Non-string columns are cast first.
pub fn string_values(column: &Column) -> Result<Vec<Option<String>>> {
    let text = column
        .cast(&DataType::String)
        .with_context(|| format!("Column '{}' cannot be read as text", column.name()))?;

    let values = text
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect();

    Ok(values)
}

/// Per-row missing flag: null for every dtype, plus NaN for floats.
pub fn missing_mask(column: &Column) -> Result<Vec<bool>> {
    let series = column.as_materialized_series();
    let nulls = series.is_null();

    let mask = match series.dtype() {
        DataType::Float32 | DataType::Float64 => {
            let nans = series.is_nan()?;
            nulls
                .into_iter()
                .zip(nans.into_iter())
                .map(|(null, nan)| null.unwrap_or(false) || nan.unwrap_or(false))
                .collect()
        }
        _ => nulls.into_iter().map(|null| null.unwrap_or(false)).collect(),
    };

    Ok(mask)
}

/// Overwrite `name` with `value(row)` on every selected row.
///
/// Returns the number of rows written. Columns that were integer typed stay
/// integer typed unless a written value has a fractional part, in which case
/// the column is widened to Float64.
pub fn assign_where<F>(df: &mut DataFrame, name: &str, mask: &[bool], value: F) -> Result<usize>
where
    F: Fn(usize) -> Option<f64>,
{
    let selected = mask.iter().filter(|&&m| m).count();
    if selected == 0 {
        return Ok(0);
    }

    let column = require_numeric(df, name)?;
    let dtype = column.dtype().clone();
    let current = column
        .strict_cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' cannot be filled with a number", name))?;

    let updated: Float64Chunked = current
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            if mask.get(row).copied().unwrap_or(false) {
                value(row)
            } else {
                v
            }
        })
        .collect();

    let series = restore_dtype(updated.into_series().with_name(name.into()), &dtype)?;
    df.with_column(series)
        .with_context(|| format!("Failed to write column '{}'", name))?;

    Ok(selected)
}

/// Fill-constant action.
pub fn fill_constant(df: &mut DataFrame, name: &str, mask: &[bool], value: f64) -> Result<usize> {
    assign_where(df, name, mask, |_| Some(value))
}

/// Fill-from-column action: copy `source` into every target on selected rows.
///
/// Returns `Ok(false)` without touching the table when the assignment is not
/// type compatible: a non-numeric source or target, or a fractional source
/// value headed for an integer column.
pub fn fill_from_column(
    df: &mut DataFrame,
    targets: &[&str],
    source: &str,
    mask: &[bool],
) -> Result<bool> {
    if !require(df, source)?.dtype().is_primitive_numeric() {
        return Ok(false);
    }
    let values = numeric_values(df, source)?;

    let selected_integral = values
        .iter()
        .zip(mask)
        .filter(|(_, m)| **m)
        .all(|(v, _)| v.map_or(true, |x| x.fract() == 0.0));

    for target in targets {
        let dtype = require(df, target)?.dtype().clone();
        if !dtype.is_primitive_numeric() {
            return Ok(false);
        }
        if is_integer_dtype(&dtype) && !selected_integral {
            return Ok(false);
        }
    }

    for target in targets {
        assign_where(df, target, mask, |row| values[row])?;
    }

    Ok(true)
}

/// Drop-rows action. Returns the number of rows removed.
pub fn drop_where(df: &mut DataFrame, mask: &[bool]) -> Result<usize> {
    let dropped = mask.iter().filter(|&&m| m).count();
    if dropped == 0 {
        return Ok(0);
    }

    let keep: BooleanChunked = mask.iter().map(|&m| !m).collect();
    *df = df.filter(&keep).context("Failed to drop rows")?;

    Ok(dropped)
}

/// Replace missing values in `name` with `value`.
///
/// Returns `None` when the column is not in the table; absent columns are
/// not an error for the bulk passes.
pub fn fill_missing(df: &mut DataFrame, name: &str, value: f64) -> Result<Option<usize>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let mask = missing_mask(column)?;

    Ok(Some(fill_constant(df, name, &mask, value)?))
}

pub(crate) fn is_integer_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

fn restore_dtype(series: Series, original: &DataType) -> Result<Series> {
    if !is_integer_dtype(original) {
        return Ok(series);
    }

    let integral = series
        .f64()?
        .into_iter()
        .flatten()
        .all(|v| v.is_finite() && v.fract() == 0.0);

    if integral {
        Ok(series.cast(original)?)
    } else {
        Ok(series)
    }
}
