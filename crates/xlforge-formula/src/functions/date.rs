//! `DATE`/`YEAR`/`MONTH`/`DAY`/`TODAY`/`NOW`, plus the Excel serial-date
//! conversions the evaluator's `ToInt`/`DateToSerial`/`DateTimeToSerial` nodes
//! need.
//!
//! Excel's 1900 date system counts days since 1899-12-30, with day 60
//! conventionally standing in for the fictional 1900-02-29 (the historical
//! "1900 leap year" bug). Anchoring the epoch at 1899-12-30 instead of
//! 1899-12-31 absorbs that bug for every date from 1900-03-01 onward without
//! a special case; serial 60 itself has no real calendar date and is mapped
//! to 1900-03-01.

use crate::ast::Value;
use crate::error::EvalError;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::Decimal;
use std::str::FromStr;

fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap()
}

pub fn datetime_to_serial(dt: NaiveDateTime) -> Decimal {
    let days = (dt.date() - excel_epoch()).num_days();
    let day_fraction = Decimal::from(dt.time().num_seconds_from_midnight()) / Decimal::from(86_400i32);
    Decimal::from(days) + day_fraction
}

pub fn serial_to_datetime(serial: Decimal) -> NaiveDateTime {
    let days: i64 = serial.trunc().to_string().parse().unwrap_or(0);
    let date = excel_epoch() + chrono::Duration::days(days);
    let seconds: u32 = (serial.fract().max(Decimal::ZERO) * Decimal::from(86_400i32))
        .round()
        .to_string()
        .parse()
        .unwrap_or(0);
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds.min(86_399), 0).unwrap_or_default();
    NaiveDateTime::new(date, time)
}

fn as_i32(v: &Value, name: &str) -> Result<i32, EvalError> {
    v.as_number()
        .and_then(|n| i32::from_str(&n.trunc().to_string()).ok())
        .ok_or_else(|| EvalError::TypeMismatch {
            op: name.into(),
            expected: "number".into(),
            got: v.type_name().into(),
        })
}

/// `DATE(year, month, day)`. Out-of-range months/days roll over the way
/// Excel's `DATE` does (`DATE(2024, 13, 1)` is `2025-01-01`).
pub fn date(year: &Value, month: &Value, day: &Value) -> Result<Value, EvalError> {
    let y = as_i32(year, "DATE")?;
    let m = as_i32(month, "DATE")?;
    let d = as_i32(day, "DATE")?;

    // Roll month/day overflow the way Excel's DATE does, by normalizing to
    // an absolute month count off year 0 and adding (day - 1) as a duration.
    let total_months = y * 12 + (m - 1);
    let (norm_year, norm_month) = (total_months.div_euclid(12), total_months.rem_euclid(12) + 1);
    let first_of_month = NaiveDate::from_ymd_opt(norm_year, norm_month as u32, 1)
        .ok_or_else(|| EvalError::eval_failed("DATE: year/month out of range"))?;
    let target = first_of_month
        .checked_add_signed(chrono::Duration::days(i64::from(d) - 1))
        .ok_or_else(|| EvalError::eval_failed("DATE: day out of range"))?;
    Ok(Value::DateTime(NaiveDateTime::new(target, NaiveTime::MIN)))
}

fn as_datetime(v: &Value, name: &str) -> Result<NaiveDateTime, EvalError> {
    match v {
        Value::DateTime(dt) => Ok(*dt),
        Value::Number(n) => Ok(serial_to_datetime(*n)),
        _ => Err(EvalError::TypeMismatch {
            op: name.into(),
            expected: "date".into(),
            got: v.type_name().into(),
        }),
    }
}

pub fn year(v: &Value) -> Result<Value, EvalError> {
    Ok(Value::Number(Decimal::from(as_datetime(v, "YEAR")?.year())))
}

pub fn month(v: &Value) -> Result<Value, EvalError> {
    Ok(Value::Number(Decimal::from(as_datetime(v, "MONTH")?.month())))
}

pub fn day(v: &Value) -> Result<Value, EvalError> {
    Ok(Value::Number(Decimal::from(as_datetime(v, "DAY")?.day())))
}

pub fn today(now: NaiveDateTime) -> Value {
    Value::DateTime(NaiveDateTime::new(now.date(), NaiveTime::MIN))
}

pub fn now(now: NaiveDateTime) -> Value {
    Value::DateTime(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_builds_expected_datetime() {
        let v = date(&Value::Number(Decimal::from(2024)), &Value::Number(Decimal::from(3)), &Value::Number(Decimal::from(15))).unwrap();
        match v {
            Value::DateTime(dt) => assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()),
            _ => panic!("expected datetime"),
        }
    }

    #[test]
    fn year_month_day_round_trip_through_serial() {
        let dt = NaiveDateTime::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), NaiveTime::MIN);
        let serial = datetime_to_serial(dt);
        let back = serial_to_datetime(serial);
        assert_eq!(back.date(), dt.date());
    }

    #[test]
    fn month_handles_rollover() {
        let v = date(&Value::Number(Decimal::from(2024)), &Value::Number(Decimal::from(13)), &Value::Number(Decimal::from(1))).unwrap();
        match v {
            Value::DateTime(dt) => assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()),
            _ => panic!("expected datetime"),
        }
    }
}
