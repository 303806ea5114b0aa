//! Record reconciliation
//!
//! Given the desired state of one `(fqdn, slot)` pair and the A records the
//! provider currently holds for the FQDN, the [`Reconciler`] computes the
//! single mutation (or none) that brings them in line:
//!
//! | record for slot | target is `0.0.0.0` | content == target | action  |
//! |-----------------|---------------------|-------------------|---------|
//! | no              | yes                 | -                 | no-op   |
//! | no              | no                  | -                 | create  |
//! | yes             | yes                 | -                 | delete  |
//! | yes             | no                  | yes               | no-op   |
//! | yes             | no                  | no                | update  |
//!
//! Nothing is decided at all if any record for the FQDN lacks a slot marker.
//!
//! The computation is pure; applying the action is the caller's job. There
//! is no compare-and-swap at the provider, so two concurrent requests for the
//! same pair can both act on the same stale observation.

use crate::config::DuplicateSlotPolicy;
use crate::error::{Error, Result};
use crate::slot::{SlotMarker, SlotTag};
use crate::traits::{ManagedRecord, RecordSpec, Zone};
use std::fmt;
use std::net::Ipv4Addr;

/// TTL for records we create; 1 is the provider's "automatic" (shortest) TTL
pub const CREATE_TTL: u32 = 1;

/// Target address that asks for the slot's record to be removed
pub const DELETE_SENTINEL: Ipv4Addr = Ipv4Addr::UNSPECIFIED;

/// Why no mutation is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    /// Delete requested but the slot has no record
    NothingToDelete,
    /// The slot's record already points at the target
    AlreadyCurrent,
}

impl fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoOpReason::NothingToDelete => f.write_str("nothing to delete"),
            NoOpReason::AlreadyCurrent => f.write_str("already current"),
        }
    }
}

/// The mutation a request requires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    NoOp(NoOpReason),
    Create {
        zone_id: String,
        record: RecordSpec,
    },
    Update {
        zone_id: String,
        record_id: String,
        /// Content the record had before the update
        previous: String,
        record: RecordSpec,
    },
    Delete {
        zone_id: String,
        record_id: String,
    },
}

impl Action {
    /// Whether applying this action calls the provider
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Action::NoOp(_))
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Action::NoOp(_) => "noop",
            Action::Create { .. } => "create",
            Action::Update { .. } => "update",
            Action::Delete { .. } => "delete",
        }
    }
}

/// Decision engine for one `(fqdn, slot)` pair
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    duplicate_slot_policy: DuplicateSlotPolicy,
}

impl Reconciler {
    pub fn new(duplicate_slot_policy: DuplicateSlotPolicy) -> Self {
        Self {
            duplicate_slot_policy,
        }
    }

    /// Compute the action for `slot` of `fqdn` given the observed records.
    ///
    /// Records whose name is not exactly `fqdn` are ignored.
    pub fn reconcile(
        &self,
        zone: &Zone,
        fqdn: &str,
        slot: u32,
        target: Ipv4Addr,
        existing: &[ManagedRecord],
    ) -> Result<Action> {
        let tagged: Vec<(SlotTag<'_>, &ManagedRecord)> = existing
            .iter()
            .filter(|record| record.name == fqdn)
            .map(|record| (SlotTag::parse(record.comment.as_deref()), record))
            .collect();

        let unmanaged = tagged.iter().filter(|(tag, _)| !tag.is_managed()).count();
        if unmanaged > 0 {
            return Err(Error::ConflictUnmanagedRecords {
                fqdn: fqdn.to_string(),
                count: unmanaged,
            });
        }

        let mut in_slot = tagged
            .iter()
            .filter(|(tag, _)| tag.carries(slot))
            .map(|(_, record)| *record);
        let found = in_slot.next();

        if self.duplicate_slot_policy == DuplicateSlotPolicy::FailClosed {
            let extra = in_slot.count();
            if extra > 0 {
                return Err(Error::DuplicateSlot {
                    fqdn: fqdn.to_string(),
                    slot,
                    count: extra + 1,
                });
            }
        }

        let delete_intent = target == DELETE_SENTINEL;
        let content = target.to_string();
        let comment = SlotMarker(slot).to_string();

        let action = match (found, delete_intent) {
            (None, true) => Action::NoOp(NoOpReason::NothingToDelete),
            (None, false) => Action::Create {
                zone_id: zone.id.clone(),
                record: RecordSpec {
                    name: fqdn.to_string(),
                    content,
                    ttl: CREATE_TTL,
                    proxied: false,
                    comment,
                },
            },
            (Some(record), true) => Action::Delete {
                zone_id: zone.id.clone(),
                record_id: record.id.clone(),
            },
            (Some(record), false) if record.content == content => {
                Action::NoOp(NoOpReason::AlreadyCurrent)
            }
            (Some(record), false) => Action::Update {
                zone_id: zone.id.clone(),
                record_id: record.id.clone(),
                previous: record.content.clone(),
                record: RecordSpec {
                    name: fqdn.to_string(),
                    content,
                    ttl: record.ttl,
                    proxied: record.proxied,
                    comment,
                },
            },
        };

        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FQDN: &str = "test.example.com";

    fn zone() -> Zone {
        Zone::new("zone-1", "example.com")
    }

    fn record(id: &str, content: &str, comment: Option<&str>) -> ManagedRecord {
        ManagedRecord {
            id: id.to_string(),
            name: FQDN.to_string(),
            content: content.to_string(),
            ttl: 120,
            proxied: true,
            comment: comment.map(str::to_string),
        }
    }

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    fn reconcile(slot: u32, target: &str, existing: &[ManagedRecord]) -> Result<Action> {
        Reconciler::default().reconcile(&zone(), FQDN, slot, ip(target), existing)
    }

    #[test]
    fn no_record_creates_with_marker() {
        let action = reconcile(0, "192.168.1.1", &[]).unwrap();
        assert_eq!(
            action,
            Action::Create {
                zone_id: "zone-1".into(),
                record: RecordSpec {
                    name: FQDN.into(),
                    content: "192.168.1.1".into(),
                    ttl: 1,
                    proxied: false,
                    comment: "[fcddns-slot:0]".into(),
                },
            }
        );
    }

    #[test]
    fn no_record_and_delete_intent_is_noop() {
        let action = reconcile(0, "0.0.0.0", &[]).unwrap();
        assert_eq!(action, Action::NoOp(NoOpReason::NothingToDelete));
        assert!(!action.is_mutation());
    }

    #[test]
    fn same_content_is_noop() {
        let existing = [record("r1", "192.168.1.1", Some("[fcddns-slot:0]"))];
        let action = reconcile(0, "192.168.1.1", &existing).unwrap();
        assert_eq!(action, Action::NoOp(NoOpReason::AlreadyCurrent));
    }

    #[test]
    fn delete_intent_deletes_existing() {
        let existing = [record("r1", "192.168.1.1", Some("[fcddns-slot:0]"))];
        let action = reconcile(0, "0.0.0.0", &existing).unwrap();
        assert_eq!(
            action,
            Action::Delete {
                zone_id: "zone-1".into(),
                record_id: "r1".into()
            }
        );
    }

    #[test]
    fn update_preserves_ttl_and_proxied() {
        let existing = [record("r1", "192.168.1.2", Some("[fcddns-slot:0]"))];
        let action = reconcile(0, "192.168.1.1", &existing).unwrap();

        let Action::Update {
            record_id,
            previous,
            record,
            ..
        } = action
        else {
            panic!("expected update");
        };
        assert_eq!(record_id, "r1");
        assert_eq!(previous, "192.168.1.2");
        assert_eq!(record.content, "192.168.1.1");
        assert_eq!(record.ttl, 120);
        assert!(record.proxied);
        assert_eq!(record.comment, "[fcddns-slot:0]");
    }

    #[test]
    fn update_rewrites_marker_without_surrounding_text() {
        let existing = [record("r1", "192.168.1.2", Some("office [fcddns-slot:4]"))];
        let Action::Update { record, .. } = reconcile(4, "192.168.1.1", &existing).unwrap()
        else {
            panic!("expected update");
        };
        assert_eq!(record.comment, "[fcddns-slot:4]");
    }

    #[test]
    fn unmanaged_record_is_a_conflict_for_any_slot() {
        let existing = [
            record("r1", "192.168.1.1", Some("[fcddns-slot:0]")),
            record("r2", "10.0.0.1", Some("set by hand")),
            record("r3", "10.0.0.2", None),
        ];

        for (slot, target) in [(0, "192.168.1.1"), (1, "192.168.1.9"), (0, "0.0.0.0")] {
            let err = reconcile(slot, target, &existing).unwrap_err();
            assert!(
                matches!(err, Error::ConflictUnmanagedRecords { count: 2, .. }),
                "slot {slot} target {target}: {err:?}"
            );
        }
    }

    #[test]
    fn other_slots_are_not_touched() {
        let existing = [record("r0", "192.168.1.1", Some("[fcddns-slot:0]"))];

        let action = reconcile(1, "192.168.1.5", &existing).unwrap();
        assert!(matches!(
            action,
            Action::Create { ref record, .. } if record.comment == "[fcddns-slot:1]"
        ));

        let action = reconcile(1, "0.0.0.0", &existing).unwrap();
        assert_eq!(action, Action::NoOp(NoOpReason::NothingToDelete));
    }

    #[test]
    fn first_match_is_authoritative() {
        let existing = [
            record("first", "192.168.1.2", Some("[fcddns-slot:0]")),
            record("second", "192.168.1.3", Some("[fcddns-slot:0]")),
        ];

        let action = reconcile(0, "192.168.1.1", &existing).unwrap();
        assert!(matches!(action, Action::Update { ref record_id, .. } if record_id == "first"));
    }

    #[test]
    fn fail_closed_rejects_duplicate_slot() {
        let existing = [
            record("first", "192.168.1.2", Some("[fcddns-slot:0]")),
            record("second", "192.168.1.3", Some("[fcddns-slot:0]")),
            record("other", "192.168.1.4", Some("[fcddns-slot:1]")),
        ];

        let err = Reconciler::new(DuplicateSlotPolicy::FailClosed)
            .reconcile(&zone(), FQDN, 0, ip("192.168.1.1"), &existing)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateSlot { slot: 0, count: 2, .. }));

        // A unique slot next to the duplicate one still reconciles
        let action = Reconciler::new(DuplicateSlotPolicy::FailClosed)
            .reconcile(&zone(), FQDN, 1, ip("192.168.1.4"), &existing)
            .unwrap();
        assert_eq!(action, Action::NoOp(NoOpReason::AlreadyCurrent));
    }

    #[test]
    fn record_with_several_markers_serves_each_slot() {
        let existing = [record("r1", "192.168.1.2", Some("[fcddns-slot:0][fcddns-slot:1]"))];

        let action = reconcile(1, "10.0.0.9", &existing).unwrap();
        assert!(matches!(action, Action::Update { ref record_id, .. } if record_id == "r1"));

        let action = reconcile(0, "192.168.1.2", &existing).unwrap();
        assert_eq!(action, Action::NoOp(NoOpReason::AlreadyCurrent));
    }

    #[test]
    fn unparseable_slot_number_is_managed_not_a_conflict() {
        let existing = [
            record("r0", "192.168.1.1", Some("[fcddns-slot:0]")),
            record("big", "192.168.1.7", Some("[fcddns-slot:99999999999]")),
        ];

        let action = reconcile(0, "192.168.1.1", &existing).unwrap();
        assert_eq!(action, Action::NoOp(NoOpReason::AlreadyCurrent));
    }

    #[test]
    fn leading_zero_marker_is_not_adopted() {
        let existing = [record("r1", "192.168.1.2", Some("[fcddns-slot:01]"))];

        let action = reconcile(1, "192.168.1.2", &existing).unwrap();
        assert!(matches!(
            action,
            Action::Create { ref record, .. } if record.comment == "[fcddns-slot:1]"
        ));
    }

    #[test]
    fn records_for_other_names_are_ignored() {
        let mut foreign = record("r9", "10.0.0.1", Some("set by hand"));
        foreign.name = "other.example.com".into();

        let action = reconcile(0, "192.168.1.1", &[foreign]).unwrap();
        assert!(matches!(action, Action::Create { .. }));
    }
}
