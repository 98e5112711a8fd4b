//! Query parameter validation.
//!
//! World and player ids are rejected when out of range; the page size is
//! clamped instead.

use crate::{error::Error, model::Cursor};

pub const MAX_WORLD_ID: i64 = 999;
pub const MAX_PLAYER_ID: i64 = 9999;
pub const DEFAULT_PAGE_SIZE: usize = 30;
pub const MAX_PAGE_SIZE: usize = 50;

fn parse_number(name: &'static str, value: Option<&str>) -> Result<Option<i64>, Error> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(|_| Error::invalid_param(name, value)),
    }
}

fn parse_id(
    name: &'static str,
    value: Option<&str>,
    max: i64,
) -> Result<i64, Error> {
    let id = parse_number(name, value)?.unwrap_or(0);

    if !(0..=max).contains(&id) {
        return Err(Error::invalid_param(name, &id.to_string()));
    }

    Ok(id)
}

/// `wid`: 0-999, absent means 0 ("all worlds").
pub fn parse_world_id(value: Option<&str>) -> Result<i64, Error> {
    parse_id("wid", value, MAX_WORLD_ID)
}

/// `pid`: 0-9999, absent means 0 ("all players").
pub fn parse_player_id(value: Option<&str>) -> Result<i64, Error> {
    parse_id("pid", value, MAX_PLAYER_ID)
}

/// `lx`: absent or 0 gives the default page size, anything above the maximum
/// is clamped to it.
pub fn parse_page_size(value: Option<&str>) -> Result<usize, Error> {
    match parse_number("lx", value)? {
        None | Some(0) => Ok(DEFAULT_PAGE_SIZE),
        Some(size) if size < 0 => {
            Err(Error::invalid_param("lx", &size.to_string()))
        },
        Some(size) => Ok((size as usize).min(MAX_PAGE_SIZE)),
    }
}

/// `cx`: passed through to the cache store untouched.
pub fn parse_cursor(value: Option<&str>) -> Option<Cursor> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| Cursor(value.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_id() {
        assert_eq!(parse_world_id(None).unwrap(), 0);
        assert_eq!(parse_world_id(Some("")).unwrap(), 0);
        assert_eq!(parse_world_id(Some("5")).unwrap(), 5);
        assert_eq!(parse_world_id(Some("999")).unwrap(), 999);
        assert!(parse_world_id(Some("1000")).is_err());
        assert!(parse_world_id(Some("-1")).is_err());
        assert!(parse_world_id(Some("abc")).is_err());
    }

    #[test]
    fn test_player_id() {
        assert_eq!(parse_player_id(None).unwrap(), 0);
        assert_eq!(parse_player_id(Some("9999")).unwrap(), 9999);
        assert!(parse_player_id(Some("10000")).is_err());
        assert!(parse_player_id(Some("1.5")).is_err());
    }

    #[test]
    fn test_page_size_clamps_instead_of_rejecting() {
        assert_eq!(parse_page_size(None).unwrap(), 30);
        assert_eq!(parse_page_size(Some("0")).unwrap(), 30);
        assert_eq!(parse_page_size(Some("1")).unwrap(), 1);
        assert_eq!(parse_page_size(Some("50")).unwrap(), 50);
        assert_eq!(parse_page_size(Some("51")).unwrap(), 50);
        assert_eq!(parse_page_size(Some("5000")).unwrap(), 50);
        assert!(parse_page_size(Some("-3")).is_err());
        assert!(parse_page_size(Some("ten")).is_err());
    }

    #[test]
    fn test_cursor_passthrough() {
        assert_eq!(parse_cursor(None), None);
        assert_eq!(parse_cursor(Some("")), None);
        assert_eq!(parse_cursor(Some("MTI")), Some(Cursor(String::from("MTI"))));
    }
}
