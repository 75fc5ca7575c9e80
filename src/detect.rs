//! Pairwise conflict detection over a snapshot of reservations.
//!
//! Every ordered pair `(a, b)` with distinct ids is tested, so the one-sided
//! overlap test in [`overlaps`] is evaluated in both directions. Taken
//! together the two directions accept exactly the pairs whose closed
//! intervals intersect, touching endpoints included.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::model::{RecordId, Reservation};

/// How many resources two reservations must share to count as a clash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SharingPolicy {
    /// Any shared resource.
    #[default]
    AtLeastOne,
    /// Exactly one shared resource. Pairs sharing two or more resources are
    /// not reported; kept for parity with the legacy checker.
    ExactlyOne,
}

impl SharingPolicy {
    /// Applies the policy to the resources booked by `a` and `b`.
    pub fn shares(self, a: &Reservation, b: &Reservation) -> bool {
        match self {
            SharingPolicy::AtLeastOne => b.resources.iter().any(|r| a.resources.contains(r)),
            SharingPolicy::ExactlyOne => a.resources.shared_count(&b.resources) == 1,
        }
    }
}

/// Ids of the reservations involved in at least one conflict, in the order
/// they were first found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictSet {
    order: Vec<RecordId>,
    members: HashSet<RecordId>,
}

impl ConflictSet {
    /// Adds `id` unless it is already present. Returns whether it was added.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.members.contains(id) {
            return false;
        }
        self.members.insert(id.to_string());
        self.order.push(id.to_string());
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

/// An ordered pair that satisfied the conflict test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictPair {
    pub first: RecordId,
    pub second: RecordId,
}

/// Output of a detection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    pub conflicts: ConflictSet,
    /// Every ordered pair that matched, `(a, b)` and `(b, a)` both included
    /// when both directions match.
    pub pairs: Vec<ConflictPair>,
}

/// One-sided inclusive overlap test: `a` starts during `b`, or `a` covers `b`.
pub fn overlaps(a: &Reservation, b: &Reservation) -> bool {
    a.starts_during(b) || a.contains(b)
}

/// True when the ordered pair `(a, b)` is a conflict under `policy`.
pub fn conflicts_with(a: &Reservation, b: &Reservation, policy: SharingPolicy) -> bool {
    a.id != b.id && overlaps(a, b) && policy.shares(a, b)
}

/// Runs the full ordered double loop and collects the conflicting reservations.
#[instrument(level = "debug", skip(reservations), fields(count = reservations.len()))]
pub fn detect_conflicts(reservations: &[Reservation], policy: SharingPolicy) -> Detection {
    let mut detection = Detection::default();

    for a in reservations {
        if a.resources.is_empty() {
            continue;
        }
        for b in reservations {
            if !conflicts_with(a, b, policy) {
                continue;
            }
            debug!(first = %a.id, second = %b.id, "conflict");
            detection.conflicts.insert(&a.id);
            detection.conflicts.insert(&b.id);
            detection.pairs.push(ConflictPair {
                first: a.id.clone(),
                second: b.id.clone(),
            });
        }
    }

    detection
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::model::ResourceSet;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
    }

    fn reservation(id: &str, start: (u32, u32), end: (u32, u32), resources: &[&str]) -> Reservation {
        Reservation {
            id: id.to_string(),
            start: at(start.0, start.1),
            end: at(end.0, end.1),
            resources: resources.iter().copied().collect::<ResourceSet>(),
            responsible_party: format!("member-{id}"),
        }
    }

    fn ids(detection: &Detection) -> Vec<&str> {
        detection.conflicts.iter().collect()
    }

    #[test]
    fn containment_is_a_conflict() {
        let a = reservation("a", (9, 0), (12, 0), &["X"]);
        let b = reservation("b", (10, 0), (11, 0), &["X"]);
        let detection = detect_conflicts(&[a, b], SharingPolicy::AtLeastOne);
        assert_eq!(ids(&detection), vec!["a", "b"]);
    }

    #[test]
    fn start_during_is_a_conflict() {
        let a = reservation("a", (9, 0), (10, 0), &["X"]);
        let b = reservation("b", (9, 30), (11, 0), &["X"]);
        let detection = detect_conflicts(&[a, b], SharingPolicy::AtLeastOne);
        assert_eq!(ids(&detection), vec!["b", "a"]);
    }

    #[test]
    fn partial_overlap_found_from_the_later_start_only() {
        let a = reservation("a", (9, 0), (10, 0), &["X"]);
        let b = reservation("b", (9, 30), (11, 0), &["X"]);
        assert!(!overlaps(&a, &b));
        assert!(overlaps(&b, &a));
        let detection = detect_conflicts(&[a, b], SharingPolicy::AtLeastOne);
        // Found with b as the outer reservation, so b is recorded first.
        assert_eq!(
            detection.pairs,
            vec![ConflictPair {
                first: "b".into(),
                second: "a".into()
            }]
        );
    }

    #[test]
    fn touching_endpoints_overlap() {
        let a = reservation("a", (9, 0), (10, 0), &["X"]);
        let b = reservation("b", (10, 0), (11, 0), &["X"]);
        let detection = detect_conflicts(&[a, b], SharingPolicy::AtLeastOne);
        assert_eq!(detection.conflicts.len(), 2);
    }

    #[test]
    fn disjoint_times_do_not_conflict() {
        let a = reservation("a", (9, 0), (10, 0), &["X"]);
        let b = reservation("b", (11, 0), (12, 0), &["X"]);
        assert!(detect_conflicts(&[a, b], SharingPolicy::AtLeastOne).conflicts.is_empty());
    }

    #[test]
    fn disjoint_resources_do_not_conflict() {
        let a = reservation("a", (9, 0), (10, 0), &["X"]);
        let b = reservation("b", (9, 0), (10, 0), &["Y"]);
        assert!(detect_conflicts(&[a, b], SharingPolicy::AtLeastOne).conflicts.is_empty());
    }

    #[test]
    fn empty_resources_never_conflict() {
        let a = reservation("a", (9, 0), (10, 0), &[]);
        let b = reservation("b", (9, 0), (10, 0), &[]);
        let c = reservation("c", (9, 0), (10, 0), &["X"]);
        let detection = detect_conflicts(&[a, b, c], SharingPolicy::AtLeastOne);
        assert!(detection.conflicts.is_empty());
    }

    #[test]
    fn reservation_never_conflicts_with_itself() {
        let a = reservation("a", (9, 0), (10, 0), &["X"]);
        let same_id = reservation("a", (9, 0), (10, 0), &["X"]);
        let detection = detect_conflicts(&[a, same_id], SharingPolicy::AtLeastOne);
        assert!(detection.conflicts.is_empty());
    }

    #[test]
    fn one_shared_resource_matches_both_policies() {
        let a = reservation("a", (9, 0), (11, 0), &["X", "Y"]);
        let b = reservation("b", (10, 0), (12, 0), &["Y", "Z"]);
        for policy in [SharingPolicy::AtLeastOne, SharingPolicy::ExactlyOne] {
            let detection = detect_conflicts(&[a.clone(), b.clone()], policy);
            assert_eq!(detection.conflicts.len(), 2, "{policy:?}");
        }
    }

    #[test]
    fn two_shared_resources_distinguish_policies() {
        let a = reservation("a", (9, 0), (11, 0), &["X", "Y"]);
        let b = reservation("b", (10, 0), (12, 0), &["X", "Y", "Z"]);
        let loose = detect_conflicts(&[a.clone(), b.clone()], SharingPolicy::AtLeastOne);
        let strict = detect_conflicts(&[a, b], SharingPolicy::ExactlyOne);
        assert_eq!(loose.conflicts.len(), 2);
        assert!(strict.conflicts.is_empty());
    }

    #[test]
    fn members_are_recorded_once_in_discovery_order() {
        let a = reservation("a", (9, 0), (12, 0), &["X"]);
        let b = reservation("b", (10, 0), (11, 0), &["X"]);
        let c = reservation("c", (10, 30), (13, 0), &["X"]);
        let d = reservation("d", (14, 0), (15, 0), &["X"]);
        let detection = detect_conflicts(&[a, b, c, d], SharingPolicy::AtLeastOne);
        assert_eq!(ids(&detection), vec!["a", "b", "c"]);
    }

    #[test]
    fn detection_is_idempotent() {
        let snapshot = vec![
            reservation("a", (9, 0), (12, 0), &["X"]),
            reservation("b", (10, 0), (11, 0), &["X", "Y"]),
            reservation("c", (11, 30), (13, 0), &["Y"]),
            reservation("d", (8, 0), (8, 30), &["Y"]),
        ];
        let first = detect_conflicts(&snapshot, SharingPolicy::AtLeastOne);
        let second = detect_conflicts(&snapshot, SharingPolicy::AtLeastOne);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_snapshot_yields_empty_set() {
        let detection = detect_conflicts(&[], SharingPolicy::AtLeastOne);
        assert!(detection.conflicts.is_empty());
        assert!(detection.pairs.is_empty());
    }
}
