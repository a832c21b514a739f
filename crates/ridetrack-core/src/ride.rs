//! Page context the tracker is initialised with.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::journey::RideStatus;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("missing required page field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for page field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Which side of the ride the current user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Driver,
    Passenger,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Driver => "driver",
            Role::Passenger => "passenger",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "driver" => Ok(Role::Driver),
            "passenger" => Ok(Role::Passenger),
            other => Err(ContextError::InvalidField {
                field: "user-type",
                reason: format!("expected 'driver' or 'passenger', got '{other}'"),
            }),
        }
    }
}

/// Immutable facts about the ride view, fixed for the session's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RideContext {
    pub ride_id: i64,
    /// Present for one occurrence of a commuting ride, absent for one-time rides.
    pub ride_date: Option<NaiveDate>,
    pub role: Role,
    pub username: Option<String>,
    pub initial_status: RideStatus,
}

impl RideContext {
    #[must_use]
    pub fn new(ride_id: i64, role: Role) -> Self {
        Self {
            ride_id,
            ride_date: None,
            role,
            username: None,
            initial_status: RideStatus::Pending(String::new()),
        }
    }

    #[must_use]
    pub fn with_ride_date(mut self, ride_date: NaiveDate) -> Self {
        self.ride_date = Some(ride_date);
        self
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn with_initial_status(mut self, status: RideStatus) -> Self {
        self.initial_status = status;
        self
    }

    #[must_use]
    pub fn is_commuting(&self) -> bool {
        self.ride_date.is_some()
    }

    /// Reads the context from page-embedded fields.
    ///
    /// Keys: `ride-id`, `user-type`, `current-username`, `ride-date`,
    /// `ride-status`. Empty optional fields are treated as absent.
    ///
    /// # Errors
    ///
    /// Fails fast with [`ContextError`] when `ride-id` or `user-type` is
    /// missing or unparseable, or when `ride-date` is not `YYYY-MM-DD`.
    pub fn from_page_fields<F>(lookup: F) -> Result<Self, ContextError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let field = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let ride_id = field("ride-id")
            .ok_or(ContextError::MissingField("ride-id"))?
            .parse::<i64>()
            .map_err(|e| ContextError::InvalidField {
                field: "ride-id",
                reason: e.to_string(),
            })?;

        let role = field("user-type")
            .ok_or(ContextError::MissingField("user-type"))?
            .parse::<Role>()?;

        let ride_date = field("ride-date")
            .map(|raw| {
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
                    ContextError::InvalidField {
                        field: "ride-date",
                        reason: e.to_string(),
                    }
                })
            })
            .transpose()?;

        let initial_status = field("ride-status")
            .map_or_else(|| RideStatus::Pending(String::new()), |s| RideStatus::parse(&s));

        Ok(Self {
            ride_id,
            ride_date,
            role,
            username: field("current-username"),
            initial_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn page<'a>(fields: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = fields.iter().copied().collect();
        move |key| map.get(key).map(|v| (*v).to_string())
    }

    #[test]
    fn reads_one_time_ride() {
        let ctx = RideContext::from_page_fields(page(&[
            ("ride-id", "42"),
            ("user-type", "driver"),
            ("current-username", "dana"),
        ]))
        .unwrap();
        assert_eq!(ctx.ride_id, 42);
        assert_eq!(ctx.role, Role::Driver);
        assert_eq!(ctx.username.as_deref(), Some("dana"));
        assert!(!ctx.is_commuting());
    }

    #[test]
    fn reads_commuting_ride_with_status() {
        let ctx = RideContext::from_page_fields(page(&[
            ("ride-id", "7"),
            ("user-type", "Passenger"),
            ("ride-date", "2025-12-01"),
            ("ride-status", "done"),
        ]))
        .unwrap();
        assert_eq!(ctx.ride_date, NaiveDate::from_ymd_opt(2025, 12, 1));
        assert_eq!(ctx.role, Role::Passenger);
        assert!(ctx.initial_status.is_terminal());
        assert!(ctx.is_commuting());
    }

    #[test]
    fn missing_ride_id_aborts() {
        let err = RideContext::from_page_fields(page(&[("user-type", "driver")])).unwrap_err();
        assert_eq!(err, ContextError::MissingField("ride-id"));
    }

    #[test]
    fn blank_ride_id_counts_as_missing() {
        let err = RideContext::from_page_fields(page(&[("ride-id", "  "), ("user-type", "driver")]))
            .unwrap_err();
        assert_eq!(err, ContextError::MissingField("ride-id"));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = RideContext::from_page_fields(page(&[("ride-id", "1"), ("user-type", "admin")]))
            .unwrap_err();
        assert!(matches!(err, ContextError::InvalidField { field: "user-type", .. }));
    }

    #[test]
    fn malformed_ride_date_is_rejected() {
        let err = RideContext::from_page_fields(page(&[
            ("ride-id", "1"),
            ("user-type", "driver"),
            ("ride-date", "01/12/2025"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ContextError::InvalidField { field: "ride-date", .. }));
    }

    #[test]
    fn empty_ride_date_means_one_time() {
        let ctx = RideContext::from_page_fields(page(&[
            ("ride-id", "1"),
            ("user-type", "driver"),
            ("ride-date", ""),
        ]))
        .unwrap();
        assert!(ctx.ride_date.is_none());
    }
}
