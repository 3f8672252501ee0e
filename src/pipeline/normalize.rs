//! Type normalisation of raw loan records
//!
//! Re-types raw columns by name: integers, floats, trimmed strings, `Mon-YYYY`
//! dates, categoricals and the ordered employment-length category. No row is
//! added, removed or reordered, and a column that will not cast is left as it
//! was.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use tracing::{debug, info, warn};

use super::columns::{
    CATEGORICAL_FEATURES, DATE_FEATURES, EMP_LENGTH, EMP_LENGTH_ORDER, FLOAT_FEATURES,
    INT_FEATURES, STRING_FEATURES,
};
use super::frame::{is_integer_dtype, string_values};

/// Re-type every known column of a raw loan table.
///
/// Columns named in both the integer and the float group end up Int64 when
/// the integer cast succeeds and Float64 otherwise. Columns of the fixed
/// groups that are not in the table are skipped.
pub fn normalize_types(df: &DataFrame) -> Result<DataFrame> {
    let mut out = df.clone();
    let mut as_integer: HashSet<&str> = HashSet::new();

    for &name in INT_FEATURES {
        let Some(series) = column_series(&out, name) else {
            debug!(column = name, "integer column not present, skipping");
            continue;
        };
        match try_cast_integer(&series) {
            Some(cast) => {
                replace_column(&mut out, cast)?;
                as_integer.insert(name);
            }
            None => debug!(column = name, dtype = %series.dtype(), "integer cast failed, trying float"),
        }
    }

    for &name in FLOAT_FEATURES {
        if as_integer.contains(name) {
            continue;
        }
        let Some(series) = column_series(&out, name) else {
            continue;
        };
        match try_cast_float(&series) {
            Some(cast) => replace_column(&mut out, cast)?,
            None => warn!(column = name, dtype = %series.dtype(), "float cast failed, column left unchanged"),
        }
    }

    for &name in STRING_FEATURES {
        if let Some(series) = column_series(&out, name) {
            if let Some(trimmed) = trim_strings(&series)? {
                replace_column(&mut out, trimmed)?;
            }
        }
    }

    for &name in DATE_FEATURES {
        if let Some(series) = column_series(&out, name) {
            let dates = parse_month_year_column(&series)?;
            replace_column(&mut out, dates)?;
        }
    }

    for &name in CATEGORICAL_FEATURES {
        let Some(series) = column_series(&out, name) else {
            continue;
        };
        match series.strict_cast(&DataType::Categorical(None, CategoricalOrdering::Physical)) {
            Ok(cast) => replace_column(&mut out, cast)?,
            Err(_) => warn!(column = name, "categorical cast failed, column left unchanged"),
        }
    }

    if let Ok(column) = out.column(EMP_LENGTH) {
        let ordered = ordered_employment_length(column)?;
        replace_column(&mut out, ordered)?;
    }

    info!(
        rows = out.height(),
        columns = out.width(),
        "normalized column types"
    );

    Ok(out)
}

/// Parse a `Mon-YYYY` value (e.g. `Dec-2015`) to the first day of that month.
pub fn parse_month_year(value: &str) -> Option<NaiveDate> {
    let (month, year) = value.trim().split_once('-')?;
    if month.len() != 3 || year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(&format!("01-{}-{}", month, year), "%d-%b-%Y").ok()
}

/// Position of an employment-length level in the fixed order.
pub fn emp_length_rank(value: &str) -> Option<usize> {
    EMP_LENGTH_ORDER.iter().position(|&level| level == value)
}

fn column_series(df: &DataFrame, name: &str) -> Option<Series> {
    df.column(name)
        .ok()
        .map(|c| c.as_materialized_series().clone())
}

fn replace_column(df: &mut DataFrame, series: Series) -> Result<()> {
    let name = series.name().to_string();
    df.with_column(series)
        .with_context(|| format!("Failed to replace column '{}'", name))?;
    Ok(())
}

fn try_cast_integer(series: &Series) -> Option<Series> {
    match series.dtype() {
        dtype if is_integer_dtype(dtype) => series.strict_cast(&DataType::Int64).ok(),
        DataType::Float32 | DataType::Float64 => {
            let floats = series.cast(&DataType::Float64).ok()?;
            let integral = floats
                .f64()
                .ok()?
                .into_iter()
                .flatten()
                .all(|v| v.is_finite() && v.fract() == 0.0);
            if integral {
                floats.strict_cast(&DataType::Int64).ok()
            } else {
                None
            }
        }
        DataType::String => series.strict_cast(&DataType::Int64).ok(),
        _ => None,
    }
}

fn try_cast_float(series: &Series) -> Option<Series> {
    let dtype = series.dtype();
    if dtype.is_primitive_numeric() || matches!(dtype, DataType::String | DataType::Boolean) {
        series.strict_cast(&DataType::Float64).ok()
    } else {
        None
    }
}

fn trim_strings(series: &Series) -> Result<Option<Series>> {
    if series.dtype() != &DataType::String {
        return Ok(None);
    }

    let trimmed: StringChunked = series
        .str()?
        .into_iter()
        .map(|v| v.map(str::trim))
        .collect();

    Ok(Some(trimmed.into_series().with_name(series.name().clone())))
}

fn parse_month_year_column(series: &Series) -> Result<Series> {
    if series.dtype() == &DataType::Date {
        return Ok(series.clone());
    }

    let text = string_values(&series.clone().into_column())?;
    let dates: Vec<Option<NaiveDate>> = text
        .iter()
        .map(|v| v.as_deref().and_then(parse_month_year))
        .collect();

    let unparsed = text
        .iter()
        .zip(&dates)
        .filter(|(raw, parsed)| raw.is_some() && parsed.is_none())
        .count();
    if unparsed > 0 {
        debug!(column = %series.name(), unparsed, "unparsable dates set to missing");
    }

    Ok(Series::new(series.name().clone(), dates))
}

/// Cast employment length to an enum over [`EMP_LENGTH_ORDER`], so physical
/// codes equal ranks whatever the state of the global string cache. Values
/// outside the vocabulary become missing.
fn ordered_employment_length(column: &Column) -> Result<Series> {
    let values = string_values(column)?;

    let outside = values
        .iter()
        .flatten()
        .filter(|v| emp_length_rank(v).is_none())
        .count();
    if outside > 0 {
        debug!(outside, "employment length values outside vocabulary set to missing");
    }

    let known: Vec<Option<&str>> = values
        .iter()
        .map(|v| v.as_deref().filter(|s| emp_length_rank(s).is_some()))
        .collect();

    Series::new(column.name().clone(), known)
        .strict_cast(&employment_length_dtype()?)
        .context("Failed to build ordered employment length")
}

fn employment_length_dtype() -> Result<DataType> {
    let levels = StringChunked::from_iter_values(
        PlSmallStr::EMPTY,
        EMP_LENGTH_ORDER.iter().copied(),
    );
    let categories = levels
        .downcast_iter()
        .next()
        .cloned()
        .context("Employment length vocabulary is empty")?;

    Ok(create_enum_dtype(categories))
}
