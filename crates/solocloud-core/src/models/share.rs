use crate::constants::PERMANENT_EXPIRY_TIMESTAMP;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

/// Bearer capability granting bounded anonymous access to one stored object.
///
/// Links are never hard-deleted; revocation flips `is_active`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareLink {
    pub id: Uuid,
    pub token: String,
    pub object_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub access_count: i32,
    /// 0 means unbounded.
    pub max_access: i32,
    pub is_active: bool,
}

/// Result of evaluating a link at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareLinkState {
    Active,
    Revoked,
    Expired,
    Exhausted,
}

/// Why a share link refused access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareDenial {
    Revoked,
    Expired,
    Exhausted,
}

impl ShareDenial {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareDenial::Revoked => "revoked",
            ShareDenial::Expired => "expired",
            ShareDenial::Exhausted => "exhausted",
        }
    }
}

impl Display for ShareDenial {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl ShareLinkState {
    pub fn denial(self) -> Option<ShareDenial> {
        match self {
            ShareLinkState::Active => None,
            ShareLinkState::Revoked => Some(ShareDenial::Revoked),
            ShareLinkState::Expired => Some(ShareDenial::Expired),
            ShareLinkState::Exhausted => Some(ShareDenial::Exhausted),
        }
    }
}

impl ShareLink {
    /// Checked in a fixed order: revoked, expired, exhausted.
    pub fn evaluate(&self, now: DateTime<Utc>) -> ShareLinkState {
        if !self.is_active {
            ShareLinkState::Revoked
        } else if self.is_expired(now) {
            ShareLinkState::Expired
        } else if self.is_exhausted() {
            ShareLinkState::Exhausted
        } else {
            ShareLinkState::Active
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_access > 0 && self.access_count >= self.max_access
    }

    pub fn is_permanent(&self) -> bool {
        self.expires_at.timestamp() == PERMANENT_EXPIRY_TIMESTAMP
    }

    /// `None` when unbounded.
    pub fn remaining_accesses(&self) -> Option<i32> {
        (self.max_access > 0).then(|| (self.max_access - self.access_count).max(0))
    }
}

/// A link as shown to its owner.
#[derive(Debug, Clone, Serialize)]
pub struct ShareLinkView {
    #[serde(flatten)]
    pub link: ShareLink,
    pub is_expired: bool,
    pub is_permanent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_accesses: Option<i32>,
}

impl ShareLinkView {
    pub fn new(link: ShareLink, now: DateTime<Utc>) -> Self {
        Self {
            is_expired: link.is_expired(now),
            is_permanent: link.is_permanent(),
            remaining_accesses: link.remaining_accesses(),
            link,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn link(expires_in: Duration, access_count: i32, max_access: i32, is_active: bool) -> ShareLink {
        let now = Utc::now();
        ShareLink {
            id: Uuid::new_v4(),
            token: "t".to_string(),
            object_id: Uuid::new_v4(),
            created_at: now,
            expires_at: now + expires_in,
            access_count,
            max_access,
            is_active,
        }
    }

    #[test]
    fn revoked_wins_over_everything() {
        let l = link(Duration::hours(-1), 5, 5, false);
        assert_eq!(l.evaluate(Utc::now()), ShareLinkState::Revoked);
    }

    #[test]
    fn expiry_is_checked_before_exhaustion() {
        let l = link(Duration::hours(-1), 1, 1, true);
        assert_eq!(l.evaluate(Utc::now()), ShareLinkState::Expired);
    }

    #[test]
    fn expired_even_with_budget_left() {
        let l = link(Duration::seconds(-1), 0, 10, true);
        assert_eq!(l.evaluate(Utc::now()).denial(), Some(ShareDenial::Expired));
    }

    #[test]
    fn zero_max_access_is_unbounded() {
        let l = link(Duration::hours(1), 10_000, 0, true);
        assert_eq!(l.evaluate(Utc::now()), ShareLinkState::Active);
        assert_eq!(l.remaining_accesses(), None);
    }

    #[test]
    fn exhausted_at_bound() {
        let l = link(Duration::hours(1), 3, 3, true);
        assert_eq!(l.evaluate(Utc::now()), ShareLinkState::Exhausted);
        assert_eq!(l.remaining_accesses(), Some(0));
    }
}
