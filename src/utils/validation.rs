use crate::utils::error::{Result, TriageError};
use std::fmt::Display;
use std::ops::RangeInclusive;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl Display, reason: impl Into<String>) -> TriageError {
    TriageError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Base URL of an HTTP service. Request paths get appended to it, so a query or
/// fragment is rejected.
pub fn validate_endpoint(field: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| invalid(field, raw, format!("not a URL: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        let reason = format!("scheme must be http or https, got {}", url.scheme());
        return Err(invalid(field, raw, reason));
    }
    if url.host_str().is_none() {
        return Err(invalid(field, raw, "missing host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid(field, raw, "must not carry a query or fragment"));
    }

    Ok(url)
}

/// Location of a file the service writes to.
pub fn validate_file_path(field: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(invalid(field, path, "path is empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field, path.escape_default(), "path contains a NUL byte"));
    }
    if path.ends_with('/') || path.ends_with('\\') {
        return Err(invalid(field, path, "path names a directory, not a file"));
    }
    Ok(())
}

pub fn validate_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, value, "must not be blank"));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + Display>(
    field: &str,
    value: T,
    range: RangeInclusive<T>,
) -> Result<()> {
    if !range.contains(&value) {
        let reason = format!("must be between {} and {}", range.start(), range.end());
        return Err(invalid(field, value, reason));
    }
    Ok(())
}
