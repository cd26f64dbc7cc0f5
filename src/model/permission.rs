//! Permission tiers, capabilities, and the oracle consulted by the server.
//!
//! The capability → tier mapping is an explicit table so visibility
//! decisions stay auditable; unknown admin locations fall back to a
//! conservative requirement (see `server::menu::required_capability`).

use serde::{Deserialize, Serialize};

use crate::model::types::Status;

/// Coarse requester privilege tier, ordered from least to most privileged.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionLevel {
    /// May only read published content.
    Baseline,
    /// May additionally see draft and pending-review content they can edit.
    EditOwn,
    /// May additionally see private and scheduled content from any author.
    EditOthers,
}

/// Discrete capabilities gating admin actions and the accounts domain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Capability {
    Read,
    EditDocuments,
    EditOthersDocuments,
    UploadFiles,
    ListAccounts,
    CreateAccounts,
    ManageThemes,
    ManagePlugins,
    ManageSettings,
}

impl Capability {
    /// Tier required to hold this capability.
    pub fn required_level(self) -> PermissionLevel {
        match self {
            Capability::Read => PermissionLevel::Baseline,
            Capability::EditDocuments | Capability::UploadFiles => PermissionLevel::EditOwn,
            Capability::EditOthersDocuments
            | Capability::ListAccounts
            | Capability::CreateAccounts
            | Capability::ManageThemes
            | Capability::ManagePlugins
            | Capability::ManageSettings => PermissionLevel::EditOthers,
        }
    }
}

/// Identity of the caller, carried on bootstrap and search requests.
///
/// The socket is local-trust; the daemon takes the declared identity at face
/// value the same way the original backend took its session cookie.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Requester {
    pub account_id: i64,
    pub level: PermissionLevel,
}

/// Opaque capability predicate consulted by the visibility filter and the
/// per-item read checks.
pub trait PermissionOracle: Send + Sync {
    fn level(&self) -> PermissionLevel;

    fn can(&self, cap: Capability) -> bool {
        self.level() >= cap.required_level()
    }

    /// Final per-item readability check applied before a document is
    /// included, beyond the tier-to-status mapping.
    fn can_read(&self, status: Status, author_id: i64) -> bool;
}

/// Default oracle: tier comparison plus author ownership for non-published
/// documents.
#[derive(Debug, Clone, Copy)]
pub struct TieredOracle {
    pub account_id: i64,
    pub level: PermissionLevel,
}

impl From<Requester> for TieredOracle {
    fn from(r: Requester) -> Self {
        Self {
            account_id: r.account_id,
            level: r.level,
        }
    }
}

impl PermissionOracle for TieredOracle {
    fn level(&self) -> PermissionLevel {
        self.level
    }

    fn can_read(&self, status: Status, author_id: i64) -> bool {
        match status {
            Status::Published => true,
            _ => {
                self.level >= PermissionLevel::EditOthers
                    || (self.level >= PermissionLevel::EditOwn && author_id == self.account_id)
            }
        }
    }
}
