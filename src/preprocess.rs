use crate::config::{NumericPolicy, MISSING_TEAM};
use crate::error::{AnalyticsError, Result};
use crate::models::{RawRecord, Record};

pub fn preprocess(rows: &[RawRecord], policy: NumericPolicy) -> Result<Vec<Record>> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| preprocess_row(index + 1, row, policy))
        .collect()
}

fn preprocess_row(row_number: usize, row: &RawRecord, policy: NumericPolicy) -> Result<Record> {
    let number = |field: &'static str, value: &Option<String>| {
        parse_number(row_number, field, value.as_deref(), policy)
    };
    let count = |field: &'static str, value: &Option<String>| {
        parse_count(row_number, field, value.as_deref(), policy)
    };

    Ok(Record {
        username: row.username.clone().unwrap_or_default(),
        team: match row.team.as_deref() {
            Some(team) if !team.is_empty() => team.to_string(),
            _ => MISSING_TEAM.to_string(),
        },
        email: row.email.clone().unwrap_or_default(),
        transactions: row.transactions.clone().unwrap_or_default(),
        password: row.password.clone().unwrap_or_default(),
        stepcount: count("stepcount", &row.stepcount)?,
        pushup: count("pushup", &row.pushup)?,
        squat: count("squat", &row.squat)?,
        balance: number("balance", &row.balance)?,
    })
}

/// Blank or absent cells default to 0 under every policy.
fn parse_number(
    row: usize,
    field: &'static str,
    raw: Option<&str>,
    policy: NumericPolicy,
) -> Result<f64> {
    let text = match raw.map(str::trim) {
        None | Some("") => return Ok(0.0),
        Some(text) => text,
    };

    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => match policy {
            NumericPolicy::Strict => Err(AnalyticsError::MalformedNumber {
                row,
                field,
                value: text.to_string(),
            }),
            NumericPolicy::Zero => {
                tracing::warn!(row, field, value = text, "malformed number replaced with 0");
                Ok(0.0)
            }
        },
    }
}

/// Activity counts must be whole numbers; `12.0` is accepted, `12.5` is not.
fn parse_count(
    row: usize,
    field: &'static str,
    raw: Option<&str>,
    policy: NumericPolicy,
) -> Result<f64> {
    let value = parse_number(row, field, raw, policy)?;
    if value.fract() == 0.0 {
        return Ok(value);
    }
    match policy {
        NumericPolicy::Strict => Err(AnalyticsError::FractionalCount {
            row,
            field,
            value: raw.unwrap_or_default().trim().to_string(),
        }),
        NumericPolicy::Zero => {
            tracing::warn!(row, field, value, "fractional count replaced with 0");
            Ok(0.0)
        }
    }
}
