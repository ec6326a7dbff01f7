//! Typed path parameter helpers.

use chrono::NaiveDate;

use geotrack_core::error::AppError;
use geotrack_entity::device::DeviceCode;

/// Parses a device id from a path segment.
pub fn parse_device_code(s: &str) -> Result<DeviceCode, AppError> {
    DeviceCode::parse(s)
}

/// Parses a `YYYY-MM-DD` calendar date from a path segment.
pub fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date '{s}', expected YYYY-MM-DD")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotrack_core::error::ErrorKind;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-03-10").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
        );
        assert!(parse_date("10/03/2024").unwrap_err().is(ErrorKind::Validation));
        assert!(parse_date("2024-02-30").is_err());
    }
}
