//! Shape checks applied to path and query parameters before any delegate call.

use regex::Regex;
use std::sync::LazyLock;

use crate::server::error::ApiError;

static MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}$").expect("month pattern is valid"));
static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("date pattern is valid"));

/// `YYYY-MM`
pub fn month(value: &str) -> Result<&str, ApiError> {
    if MONTH.is_match(value) {
        Ok(value)
    } else {
        Err(ApiError::validation("Invalid month format. Expected YYYY-MM"))
    }
}

/// `YYYY-MM-DD`; `name` is the parameter as the caller spelled it.
pub fn date<'a>(name: &str, value: &'a str) -> Result<&'a str, ApiError> {
    if DATE.is_match(value) {
        Ok(value)
    } else {
        Err(ApiError::validation(format!(
            "Invalid {name} format. Expected YYYY-MM-DD"
        )))
    }
}

/// Both ends of a date range, each required and date-shaped.
pub fn date_range<'a>(
    start: Option<&'a str>,
    end: Option<&'a str>,
) -> Result<(&'a str, &'a str), ApiError> {
    match (start, end) {
        (Some(start), Some(end)) => Ok((date("startDate", start)?, date("endDate", end)?)),
        _ => Err(ApiError::validation(
            "startDate and endDate query parameters are required",
        )),
    }
}
