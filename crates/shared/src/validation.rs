//! Common validation utilities.

use std::borrow::Cow;

use validator::ValidationError;

/// Minimum number of digits accepted in a contact number.
const MIN_CONTACT_DIGITS: usize = 6;

/// Maximum number of digits accepted in a contact number (E.164 allows 15).
const MAX_CONTACT_DIGITS: usize = 15;

lazy_static::lazy_static! {
    pub static ref HEX_COLOR_REGEX: regex::Regex =
        regex::Regex::new(r"^#([0-9A-Fa-f]{3}|[0-9A-Fa-f]{6})$").unwrap();
    pub static ref CONTACT_NUMBER_REGEX: regex::Regex =
        regex::Regex::new(r"^\+?[0-9 ()\-]+$").unwrap();
}

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lng: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lng) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Validates that a radius is a finite, strictly positive number of meters.
pub fn validate_radius_meters(radius: f64) -> Result<(), ValidationError> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("radius_range");
        err.message = Some("Radius must be greater than 0 meters".into());
        Err(err)
    }
}

/// Validates a `#RGB` or `#RRGGBB` color string.
pub fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
    if HEX_COLOR_REGEX.is_match(color) {
        Ok(())
    } else {
        Err(ValidationError::new("color_format")
            .with_message(Cow::Borrowed("Color must be a hex value like #FF0000")))
    }
}

/// Validates a phone or mobile number.
///
/// Accepts digits with an optional leading `+` and the usual grouping
/// characters (spaces, dashes, parentheses).
pub fn validate_contact_number(number: &str) -> Result<(), ValidationError> {
    let trimmed = number.trim();
    let digits = trimmed.chars().filter(|c| c.is_ascii_digit()).count();

    if CONTACT_NUMBER_REGEX.is_match(trimmed)
        && (MIN_CONTACT_DIGITS..=MAX_CONTACT_DIGITS).contains(&digits)
    {
        Ok(())
    } else {
        Err(ValidationError::new("contact_number_format").with_message(Cow::Borrowed(
            "Contact number must contain 6-15 digits",
        )))
    }
}

/// Validates that a required text field is not blank.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("required").with_message(Cow::Borrowed("Field is required")))
    } else {
        Ok(())
    }
}
