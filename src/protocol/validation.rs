//! Pure validators for inbound payload schemas (§6). Each returns
//! `Ok(T)` or a `ValidationError` describing which constraint failed;
//! no runtime-reflective validation, per the design notes.

use crate::domain::coordinates_in_range;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {reason}")]
pub struct ValidationError {
    pub path: &'static str,
    pub reason: &'static str,
}

impl ValidationError {
    fn new(path: &'static str, reason: &'static str) -> Self {
        Self { path, reason }
    }
}

/// `movePlayer`/`teleport` coordinates: finite, within [-10000, 10000].
pub fn validate_coordinates(x: f64, y: f64) -> Result<(), ValidationError> {
    if coordinates_in_range(x, y) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "x,y",
            "coordinates must be finite and within [-10000, 10000]",
        ))
    }
}

/// `teleport`'s room index must be a non-negative integer; the caller
/// additionally checks it exists in the realm (a session-level concern,
/// not a pure schema concern).
pub fn validate_room_index(room_index: i64) -> Result<u32, ValidationError> {
    u32::try_from(room_index).map_err(|_| ValidationError::new("roomIndex", "must be a non-negative integer"))
}

const SKIN_MAX_LEN: usize = 50;

/// `changedSkin`: 1..50 chars, `[A-Za-z0-9_-]`.
pub fn validate_skin(skin: &str) -> Result<(), ValidationError> {
    if skin.is_empty() || skin.chars().count() > SKIN_MAX_LEN {
        return Err(ValidationError::new("skin", "must be 1-50 characters"));
    }
    if !skin
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ValidationError::new(
            "skin",
            "must contain only letters, digits, '_' or '-'",
        ));
    }
    Ok(())
}

const MESSAGE_MAX_LEN: usize = 500;

/// `sendMessage`: trim whitespace, collapse repeated whitespace, require
/// 1..500 chars after trimming.
pub fn validate_chat_message(raw: &str) -> Result<String, ValidationError> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() || collapsed.chars().count() > MESSAGE_MAX_LEN {
        return Err(ValidationError::new(
            "message",
            "must be 1-500 characters after trimming",
        ));
    }
    Ok(collapsed)
}

/// `joinRealm`'s optional `shareId`: either absent/empty (treated as "no
/// share id supplied") or a valid UUID.
pub fn validate_share_id(raw: Option<&str>) -> Result<Option<uuid::Uuid>, ValidationError> {
    match raw {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => uuid::Uuid::parse_str(s)
            .map(Some)
            .map_err(|_| ValidationError::new("shareId", "must be a valid uuid or omitted")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_reject_out_of_range() {
        assert!(validate_coordinates(0.0, 0.0).is_ok());
        assert!(validate_coordinates(10_001.0, 0.0).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
        assert!(validate_coordinates(f64::INFINITY, 0.0).is_err());
    }

    #[test]
    fn room_index_rejects_negative() {
        assert_eq!(validate_room_index(3).unwrap(), 3);
        assert!(validate_room_index(-1).is_err());
    }

    #[test]
    fn skin_enforces_charset_and_length() {
        assert!(validate_skin("default-1").is_ok());
        assert!(validate_skin("").is_err());
        assert!(validate_skin(&"a".repeat(51)).is_err());
        assert!(validate_skin("bad skin!").is_err());
    }

    #[test]
    fn chat_message_collapses_whitespace() {
        let collapsed = validate_chat_message("hello    world  \t ").unwrap();
        assert_eq!(collapsed, "hello world");
        assert!(validate_chat_message("   ").is_err());
        assert!(validate_chat_message(&"a".repeat(501)).is_err());
    }

    #[test]
    fn share_id_treats_empty_as_absent() {
        assert_eq!(validate_share_id(Some("")).unwrap(), None);
        assert_eq!(validate_share_id(None).unwrap(), None);
        assert!(validate_share_id(Some("not-a-uuid")).is_err());
        assert!(validate_share_id(Some(&uuid::Uuid::nil().to_string()))
            .unwrap()
            .is_some());
    }
}
