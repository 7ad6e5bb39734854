//! Intake configuration
//!
//! Defaults reproduce the historical service behavior: IST target zone, user
//! `"1"` for uploads without a user id, and the opportune flag fixed to `true`.
//! Every value can be overridden from the environment.

use chrono::{FixedOffset, Offset, Utc};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::timestamp::{india_standard_time, TimestampNormalizer};
use crate::types::{UserId, DEFAULT_USER_ID};

// ============================================================================
// Defaults
// ============================================================================

/// Placeholder for the downstream "is now a good moment" decision.
///
/// Always `true` until real decision logic replaces it.
pub const OPPORTUNE_PLACEHOLDER: bool = true;

/// Records per page in read-back views
pub const DEFAULT_PAGE_SIZE: usize = 15;

/// Database file used when none is configured
pub const DEFAULT_DATABASE_PATH: &str = "intake.db";

/// Environment overrides
pub const ENV_TIMEZONE: &str = "INTAKE_TIMEZONE";
pub const ENV_DEFAULT_USER: &str = "INTAKE_DEFAULT_USER";
pub const ENV_DATABASE: &str = "INTAKE_DATABASE";
pub const ENV_PAGE_SIZE: &str = "INTAKE_PAGE_SIZE";

/// Runtime configuration of the intake service
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeConfig {
    /// Zone every stored timestamp is expressed in
    pub target_offset: FixedOffset,
    /// User id assumed when a batch upload has none
    pub default_user_id: UserId,
    /// Value reported in the `opportune` response field
    pub opportune: bool,
    /// Records per page in the read model
    pub page_size: usize,
    /// SQLite database location
    pub database_path: PathBuf,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            target_offset: india_standard_time(),
            default_user_id: UserId::fallback(),
            opportune: OPPORTUNE_PLACEHOLDER,
            page_size: DEFAULT_PAGE_SIZE,
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
        }
    }
}

impl IntakeConfig {
    /// Load config from environment variables on top of the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load config from an arbitrary key lookup (environment, test map, ...)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(tz) = lookup(ENV_TIMEZONE) {
            config.target_offset = parse_offset(&tz)?;
        }

        if let Some(user) = lookup(ENV_DEFAULT_USER) {
            config.default_user_id =
                UserId::new(user.as_str()).ok_or(ConfigError::InvalidUserId(user))?;
        }

        if let Some(path) = lookup(ENV_DATABASE) {
            config.database_path = PathBuf::from(path);
        }

        if let Some(size) = lookup(ENV_PAGE_SIZE) {
            config.page_size = match size.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidPageSize(size)),
            };
        }

        Ok(config)
    }

    /// Normalizer for the configured target zone
    pub fn normalizer(&self) -> TimestampNormalizer {
        TimestampNormalizer::new(self.target_offset)
    }

    /// Set the target zone
    pub fn with_target_offset(mut self, offset: FixedOffset) -> Self {
        self.target_offset = offset;
        self
    }

    /// Set the database path
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }
}

/// Parse a UTC offset such as `+05:30`, `-0800`, `Z` or `UTC`
pub fn parse_offset(raw: &str) -> Result<FixedOffset, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }
    trimmed
        .parse::<FixedOffset>()
        .map_err(|_| ConfigError::InvalidTimezone(raw.to_string()))
}
