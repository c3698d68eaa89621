use time::{macros::format_description, Date};

use crate::error::AppError;

/// Parse an ISO `AAAA-MM-GG` date coming from a form field.
pub fn parse_date(s: &str) -> Result<Date, AppError> {
    let fmt = format_description!("[year]-[month]-[day]");
    Date::parse(s, fmt).map_err(|_| AppError::Validation(format!("Data non valida: {s}")))
}

pub fn format_date(d: Date) -> String {
    let fmt = format_description!("[year]-[month]-[day]");
    d.format(fmt).unwrap_or_else(|_| d.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let d = parse_date("2020-01-31").unwrap();
        assert_eq!(format_date(d), "2020-01-31");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_date("31/01/2020").is_err());
        assert!(parse_date("2020-13-01").is_err());
        assert!(parse_date("").is_err());
    }
}
