//! The credential and identity part of a user record.
//!
//! Authentication code only needs this substrate, so it is exposed as a
//! trait instead of reaching into the profile fields of [`user::Model`].

use chrono::{DateTime, Utc};

use crate::entities::user;
use crate::password::{UNUSABLE_PASSWORD_PREFIX, verify_password};

pub trait BaseAccount {
    fn username(&self) -> &str;
    fn password_hash(&self) -> &str;
    fn email(&self) -> &str;
    fn first_name(&self) -> &str;
    fn last_name(&self) -> &str;
    fn is_active(&self) -> bool;
    fn is_staff(&self) -> bool;
    fn is_superuser(&self) -> bool;
    fn last_login(&self) -> Option<DateTime<Utc>>;
    fn date_joined(&self) -> DateTime<Utc>;

    fn has_usable_password(&self) -> bool {
        let hash = self.password_hash();
        !hash.is_empty() && !hash.starts_with(UNUSABLE_PASSWORD_PREFIX)
    }

    /// Returns false for unusable or malformed hashes instead of failing.
    fn check_password(&self, raw: &str) -> bool {
        if !self.has_usable_password() {
            return false;
        }
        match verify_password(raw, self.password_hash()) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!("Stored password hash for '{}' is malformed: {}", self.username(), e);
                false
            }
        }
    }

    /// Whether the account may use the administrative console.
    fn can_access_console(&self) -> bool {
        self.is_active() && (self.is_staff() || self.is_superuser())
    }
}

impl BaseAccount for user::Model {
    fn username(&self) -> &str {
        &self.username
    }

    fn password_hash(&self) -> &str {
        &self.password
    }

    fn email(&self) -> &str {
        &self.email
    }

    fn first_name(&self) -> &str {
        &self.first_name
    }

    fn last_name(&self) -> &str {
        &self.last_name
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn is_staff(&self) -> bool {
        self.is_staff
    }

    fn is_superuser(&self) -> bool {
        self.is_superuser
    }

    fn last_login(&self) -> Option<DateTime<Utc>> {
        self.last_login
    }

    fn date_joined(&self) -> DateTime<Utc> {
        self.date_joined
    }
}
