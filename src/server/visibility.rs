//! Tier-to-status visibility mapping for the documents domain.
//!
//! Evaluated once per query and passed to the documents strategy as a
//! constraint; never inspects individual items. A final per-item readability
//! check still runs before inclusion (`PermissionOracle::can_read`).

use crate::model::permission::PermissionLevel;
use crate::model::types::Status;

/// Statuses a requester at the given tier may see.
///
/// The result is always a subset of what an unrestricted query would return.
pub fn allowed_statuses(level: PermissionLevel) -> &'static [Status] {
    match level {
        PermissionLevel::Baseline => &[Status::Published],
        PermissionLevel::EditOwn => &[Status::Published, Status::Draft, Status::PendingReview],
        PermissionLevel::EditOthers => &[
            Status::Published,
            Status::Draft,
            Status::PendingReview,
            Status::Private,
            Status::Scheduled,
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_sees_only_published() {
        assert_eq!(
            allowed_statuses(PermissionLevel::Baseline),
            &[Status::Published]
        );
    }

    #[test]
    fn elevated_tiers_extend_without_removing() {
        let own = allowed_statuses(PermissionLevel::EditOwn);
        let others = allowed_statuses(PermissionLevel::EditOthers);
        for s in allowed_statuses(PermissionLevel::Baseline) {
            assert!(own.contains(s));
        }
        for s in own {
            assert!(others.contains(s));
        }
        assert!(!own.contains(&Status::Private));
        assert!(!own.contains(&Status::Scheduled));
        assert!(others.contains(&Status::Private));
        assert!(others.contains(&Status::Scheduled));
    }
}
