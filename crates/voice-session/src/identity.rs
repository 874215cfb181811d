//! Room identity: who joins which room.
//!
//! Both fields travel in the token request body and inside the signed
//! credential, so they must be URL/token-safe. Validation happens once at
//! construction; the identity is immutable for the lifetime of a session.

use thiserror::Error;
use uuid::Uuid;

/// Maximum length for room and user names.
const MAX_NAME_LEN: usize = 128;

/// Identity validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// A name was empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// A name contained a character outside the token-safe set.
    #[error("{field} contains invalid character {ch:?}")]
    InvalidCharacter {
        /// Which field failed validation.
        field: &'static str,
        /// The offending character.
        ch: char,
    },

    /// A name exceeded the maximum length.
    #[error("{0} is too long (max {MAX_NAME_LEN} characters)")]
    TooLong(&'static str),
}

/// Immutable identity for one voice session: room name plus display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomIdentity {
    room_name: String,
    user_name: String,
}

impl RoomIdentity {
    /// Create a validated identity.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` if either name is empty, too long, or
    /// contains characters outside `[A-Za-z0-9._-]`.
    pub fn new(
        room_name: impl Into<String>,
        user_name: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let room_name = room_name.into();
        let user_name = user_name.into();
        validate_name("room name", &room_name)?;
        validate_name("user name", &user_name)?;
        Ok(Self {
            room_name,
            user_name,
        })
    }

    /// Generate a fresh per-visit identity from random UUIDs.
    ///
    /// For callers that have no stable identity to supply; each call yields
    /// a new room and display name.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            room_name: format!("room-{}", Uuid::new_v4().simple()),
            user_name: format!("user-{}", Uuid::new_v4().simple()),
        }
    }

    /// The room to join.
    #[must_use]
    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    /// The participant display name.
    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }
}

fn validate_name(field: &'static str, value: &str) -> Result<(), IdentityError> {
    if value.is_empty() {
        return Err(IdentityError::Empty(field));
    }
    if value.len() > MAX_NAME_LEN {
        return Err(IdentityError::TooLong(field));
    }
    for ch in value.chars() {
        if !(ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.')) {
            return Err(IdentityError::InvalidCharacter { field, ch });
        }
    }
    Ok(())
}
