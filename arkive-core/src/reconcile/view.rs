//! The reconciled view of one collection.
//!
//! An ordered sequence of records backed by an id -> position index, so an id
//! appears at most once. Local mutations and remote snapshots are applied
//! here; I/O lives elsewhere.

use std::collections::HashMap;

use super::policy::{MergePolicy, MergeStats};
use crate::record::Record;

/// A local change to apply to the view.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalMutation<R: Record> {
    /// A record freshly created by the local store; goes to the front.
    Create(R),
    /// A new version of a record; replaces the entry in place.
    Update(R),
    /// Removal by id.
    Delete(String),
}

impl<R: Record> LocalMutation<R> {
    pub fn id(&self) -> &str {
        match self {
            LocalMutation::Create(record) | LocalMutation::Update(record) => record.id(),
            LocalMutation::Delete(id) => id,
        }
    }
}

/// What a local mutation did to the view, kept so it can be reverted if the
/// store rejects the change.
#[derive(Debug, Clone)]
#[must_use = "a pending change is needed to revert the mutation"]
pub struct PendingChange<R> {
    id: String,
    /// The entry the mutation left behind (None after a delete)
    applied: Option<R>,
    /// The entry it displaced, with its position
    previous: Option<(usize, R)>,
}

impl<R> PendingChange<R> {
    pub fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone)]
pub struct ReconciledView<R> {
    entries: Vec<R>,
    index: HashMap<String, usize>,
}

impl<R> Default for ReconciledView<R> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<R: Record> ReconciledView<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a view from a full local fetch: deduplicated (last occurrence
    /// wins) and sorted newest first.
    pub fn from_records(records: impl IntoIterator<Item = R>) -> Self {
        let mut view = Self::new();
        for record in records {
            match view.index.get(record.id()).copied() {
                Some(pos) => view.entries[pos] = record,
                None => view.push_back(record),
            }
        }
        view.sort_by_recency();
        view
    }

    pub fn records(&self) -> &[R] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&R> {
        self.index.get(id).map(|&pos| &self.entries[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Applies a local mutation without any store round-trip.
    pub fn apply_local(&mut self, mutation: LocalMutation<R>) -> PendingChange<R> {
        match mutation {
            LocalMutation::Create(record) => {
                let id = record.id().to_string();
                let previous = self.remove(&id);
                self.entries.insert(0, record.clone());
                self.reindex();
                PendingChange {
                    id,
                    applied: Some(record),
                    previous,
                }
            }
            LocalMutation::Update(record) => {
                let id = record.id().to_string();
                let previous = match self.index.get(&id).copied() {
                    Some(pos) => {
                        let old = std::mem::replace(&mut self.entries[pos], record.clone());
                        Some((pos, old))
                    }
                    None => {
                        self.entries.insert(0, record.clone());
                        self.reindex();
                        None
                    }
                };
                PendingChange {
                    id,
                    applied: Some(record),
                    previous,
                }
            }
            LocalMutation::Delete(id) => {
                let previous = self.remove(&id);
                PendingChange {
                    id,
                    applied: None,
                    previous,
                }
            }
        }
    }

    /// Undoes a local mutation.
    ///
    /// Only reverts while the entry is still exactly what the mutation left
    /// behind; if a remote snapshot replaced or re-added it in the meantime
    /// the remote state stays and this returns false.
    pub fn revert(&mut self, change: PendingChange<R>) -> bool {
        if self.get(&change.id) != change.applied.as_ref() {
            return false;
        }

        if change.applied.is_some() {
            self.remove(&change.id);
        }
        if let Some((pos, record)) = change.previous {
            let pos = pos.min(self.entries.len());
            self.entries.insert(pos, record);
            self.reindex();
        }
        true
    }

    /// Merges a remote snapshot.
    ///
    /// Every record is upserted according to `policy`; ids missing from the
    /// snapshot are left alone. The view is re-sorted afterwards.
    pub fn merge_remote(
        &mut self,
        records: impl IntoIterator<Item = R>,
        policy: MergePolicy,
    ) -> MergeStats {
        let mut stats = MergeStats::default();

        for remote in records {
            stats.received += 1;
            match self.index.get(remote.id()).copied() {
                Some(pos) => {
                    if policy.prefers_remote(&self.entries[pos], &remote) {
                        self.entries[pos] = remote;
                        stats.overwritten += 1;
                    } else {
                        stats.kept_local += 1;
                    }
                }
                None => {
                    self.push_back(remote);
                    stats.inserted += 1;
                }
            }
        }

        self.sort_by_recency();
        stats
    }

    fn push_back(&mut self, record: R) {
        self.index.insert(record.id().to_string(), self.entries.len());
        self.entries.push(record);
    }

    fn remove(&mut self, id: &str) -> Option<(usize, R)> {
        let pos = self.index.remove(id)?;
        let record = self.entries.remove(pos);
        self.reindex();
        Some((pos, record))
    }

    /// Stable sort, newest first; equal instants keep their current order.
    fn sort_by_recency(&mut self) {
        self.entries.sort_by(|a, b| b.recency().cmp(&a.recency()));
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (pos, record) in self.entries.iter().enumerate() {
            self.index.insert(record.id().to_string(), pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Client, ClientDraft};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::collections::HashSet;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn client(id: &str, minutes: i64) -> Client {
        let draft = ClientDraft::new(format!("Client {}", id), "0");
        Client::from_draft(id.to_string(), draft, at(minutes))
    }

    fn named(id: &str, minutes: i64, name: &str) -> Client {
        let mut c = client(id, minutes);
        c.name = name.to_string();
        c
    }

    fn ids(view: &ReconciledView<Client>) -> Vec<&str> {
        view.records().iter().map(|c| c.id.as_str()).collect()
    }

    fn assert_sorted(view: &ReconciledView<Client>) {
        for pair in view.records().windows(2) {
            assert!(pair[0].recency() >= pair[1].recency());
        }
    }

    #[test]
    fn test_from_records_dedupes_and_sorts() {
        let view = ReconciledView::from_records(vec![
            client("a", 1),
            client("b", 3),
            named("a", 2, "second a"),
        ]);

        assert_eq!(ids(&view), vec!["b", "a"]);
        assert_eq!(view.get("a").unwrap().name, "second a");
    }

    #[test]
    fn test_create_goes_to_front_without_sorting() {
        let mut view = ReconciledView::from_records(vec![client("a", 10), client("b", 5)]);
        let _ = view.apply_local(LocalMutation::Create(client("c", 0)));

        assert_eq!(ids(&view), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_update_replaces_in_place() {
        let mut view = ReconciledView::from_records(vec![client("a", 10), client("b", 5)]);
        let _ = view.apply_local(LocalMutation::Update(named("b", 50, "renamed")));

        assert_eq!(ids(&view), vec!["a", "b"]);
        assert_eq!(view.get("b").unwrap().name, "renamed");
    }

    #[test]
    fn test_update_of_unknown_id_inserts() {
        let mut view = ReconciledView::from_records(vec![client("a", 10)]);
        let _ = view.apply_local(LocalMutation::Update(client("z", 1)));

        assert_eq!(ids(&view), vec!["z", "a"]);
    }

    #[test]
    fn test_delete_removes_entry() {
        let mut view = ReconciledView::from_records(vec![client("a", 10), client("b", 5)]);
        let _ = view.apply_local(LocalMutation::Delete("a".into()));

        assert_eq!(ids(&view), vec!["b"]);
        assert!(!view.contains("a"));
    }

    #[test]
    fn test_remote_wins_even_when_older() {
        let mut view = ReconciledView::from_records(vec![named("a", 100, "local")]);
        let remote = named("a", 1, "remote");
        let stats = view.merge_remote(vec![remote.clone()], MergePolicy::RemoteWins);

        assert_eq!(view.get("a"), Some(&remote));
        assert_eq!(stats.overwritten, 1);
        assert_eq!(stats.kept_local, 0);
    }

    #[test]
    fn test_newest_wins_keeps_newer_local() {
        let mut view = ReconciledView::from_records(vec![named("a", 100, "local")]);
        let stats = view.merge_remote(vec![named("a", 1, "remote")], MergePolicy::NewestWins);

        assert_eq!(view.get("a").unwrap().name, "local");
        assert_eq!(stats.kept_local, 1);

        // ties go to the remote record
        let stats = view.merge_remote(vec![named("a", 100, "tie")], MergePolicy::NewestWins);
        assert_eq!(view.get("a").unwrap().name, "tie");
        assert_eq!(stats.overwritten, 1);
    }

    #[test]
    fn test_remote_snapshot_is_additive_only() {
        let mut view = ReconciledView::from_records(vec![client("a", 1), client("b", 2)]);
        let stats = view.merge_remote(vec![client("c", 3)], MergePolicy::RemoteWins);

        assert_eq!(ids(&view), vec!["c", "b", "a"]);
        assert_eq!(stats.inserted, 1);

        let stats = view.merge_remote(Vec::new(), MergePolicy::RemoteWins);
        assert_eq!(view.len(), 3);
        assert_eq!(stats, MergeStats::default());
    }

    #[test]
    fn test_merge_sorts_whole_view() {
        let mut view = ReconciledView::new();
        let _ = view.apply_local(LocalMutation::Create(client("old", 1)));
        let _ = view.apply_local(LocalMutation::Create(client("older", 0)));
        assert_eq!(ids(&view), vec!["older", "old"]);

        view.merge_remote(vec![client("mid", 5)], MergePolicy::RemoteWins);
        assert_eq!(ids(&view), vec!["mid", "old", "older"]);
        assert_sorted(&view);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let snapshot = vec![client("a", 3), named("b", 1, "remote b"), client("c", 2)];
        let mut view = ReconciledView::from_records(vec![named("b", 9, "local b"), client("d", 4)]);

        view.merge_remote(snapshot.clone(), MergePolicy::RemoteWins);
        let once: Vec<Client> = view.records().to_vec();
        view.merge_remote(snapshot, MergePolicy::RemoteWins);

        assert_eq!(view.records(), once.as_slice());
    }

    #[test]
    fn test_equal_recency_keeps_insertion_order() {
        let mut view = ReconciledView::new();
        view.merge_remote(
            vec![client("x", 5), client("y", 5), client("z", 5)],
            MergePolicy::RemoteWins,
        );
        assert_eq!(ids(&view), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_scenario_remote_value_used_despite_older_timestamp() {
        // local: id 1 @ T1; remote: id 1 @ T0, id 2 @ T2, T2 > T1 > T0
        let mut view = ReconciledView::from_records(vec![client("1", 10)]);
        view.merge_remote(vec![client("1", 0), client("2", 20)], MergePolicy::RemoteWins);

        assert_eq!(ids(&view), vec!["2", "1"]);
        assert_eq!(view.get("1").unwrap().updated_at, at(0));
    }

    #[test]
    fn test_stale_snapshot_re_adds_locally_deleted_id() {
        // Remote deletions are not tracked, so a snapshot that still lists a
        // locally deleted id brings it back.
        let mut view = ReconciledView::from_records(vec![client("1", 1), client("2", 2)]);
        let _ = view.apply_local(LocalMutation::Delete("1".into()));
        assert!(!view.contains("1"));

        view.merge_remote(vec![client("1", 1)], MergePolicy::RemoteWins);
        assert!(view.contains("1"));
        assert_eq!(ids(&view), vec!["2", "1"]);
    }

    #[test]
    fn test_revert_update_restores_previous() {
        let original = named("a", 10, "original");
        let mut view = ReconciledView::from_records(vec![original.clone(), client("b", 5)]);

        let change = view.apply_local(LocalMutation::Update(named("a", 11, "edited")));
        assert!(view.revert(change));

        assert_eq!(view.get("a"), Some(&original));
        assert_eq!(ids(&view), vec!["a", "b"]);
    }

    #[test]
    fn test_revert_delete_restores_position() {
        let mut view =
            ReconciledView::from_records(vec![client("a", 10), client("b", 5), client("c", 1)]);

        let change = view.apply_local(LocalMutation::Delete("b".into()));
        assert_eq!(ids(&view), vec!["a", "c"]);
        assert!(view.revert(change));
        assert_eq!(ids(&view), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_revert_update_of_unknown_id_removes_it() {
        let mut view = ReconciledView::from_records(vec![client("a", 10)]);
        let change = view.apply_local(LocalMutation::Update(client("ghost", 1)));

        assert!(view.revert(change));
        assert_eq!(ids(&view), vec!["a"]);
    }

    #[test]
    fn test_revert_skipped_when_remote_superseded() {
        let mut view = ReconciledView::from_records(vec![named("a", 10, "original")]);
        let change = view.apply_local(LocalMutation::Update(named("a", 11, "edited")));

        view.merge_remote(vec![named("a", 12, "remote")], MergePolicy::RemoteWins);
        assert!(!view.revert(change));
        assert_eq!(view.get("a").unwrap().name, "remote");

        let change = view.apply_local(LocalMutation::Delete("a".into()));
        view.merge_remote(vec![named("a", 12, "remote")], MergePolicy::RemoteWins);
        assert!(!view.revert(change));
        assert_eq!(view.len(), 1);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Step {
            Create(u8, i64),
            Update(u8, i64),
            Delete(u8),
            Remote(Vec<(u8, i64)>),
        }

        fn arb_batch() -> impl Strategy<Value = Vec<(u8, i64)>> {
            prop::collection::vec((0u8..12, 0i64..60), 0..6)
        }

        fn arb_step() -> impl Strategy<Value = Step> {
            prop_oneof![
                (0u8..12, 0i64..60).prop_map(|(id, m)| Step::Create(id, m)),
                (0u8..12, 0i64..60).prop_map(|(id, m)| Step::Update(id, m)),
                (0u8..12).prop_map(Step::Delete),
                arb_batch().prop_map(Step::Remote),
            ]
        }

        fn clients(batch: &[(u8, i64)]) -> Vec<Client> {
            batch
                .iter()
                .map(|&(id, m)| named(&id.to_string(), m, &format!("remote {}", m)))
                .collect()
        }

        fn is_sorted(view: &ReconciledView<Client>) -> bool {
            view.records()
                .windows(2)
                .all(|pair| pair[0].recency() >= pair[1].recency())
        }

        fn is_unique(view: &ReconciledView<Client>) -> bool {
            let unique: HashSet<&str> = view.records().iter().map(|c| c.id()).collect();
            unique.len() == view.len()
        }

        proptest! {
            #[test]
            fn prop_mixed_sequences_stay_unique_and_additive(
                steps in prop::collection::vec(arb_step(), 0..80)
            ) {
                let mut view = ReconciledView::new();
                for step in steps {
                    match step {
                        Step::Create(id, m) => {
                            let record = client(&id.to_string(), m);
                            let _ = view.apply_local(LocalMutation::Create(record));
                        }
                        Step::Update(id, m) => {
                            let record = client(&id.to_string(), m);
                            let _ = view.apply_local(LocalMutation::Update(record));
                        }
                        Step::Delete(id) => {
                            let _ = view.apply_local(LocalMutation::Delete(id.to_string()));
                        }
                        Step::Remote(batch) => {
                            let before: Vec<String> =
                                view.records().iter().map(|c| c.id.clone()).collect();
                            let batch = clients(&batch);
                            view.merge_remote(batch.clone(), MergePolicy::RemoteWins);

                            prop_assert!(is_sorted(&view));
                            for id in &before {
                                prop_assert!(view.contains(id));
                            }
                            // the last copy of each id in the snapshot wins
                            for (pos, remote) in batch.iter().enumerate() {
                                if batch[pos + 1..].iter().all(|later| later.id != remote.id) {
                                    prop_assert_eq!(view.get(&remote.id), Some(remote));
                                }
                            }
                        }
                    }
                    prop_assert!(is_unique(&view));
                }
            }

            #[test]
            fn prop_remote_merge_is_idempotent(seed in arb_batch(), batch in arb_batch()) {
                let mut view = ReconciledView::from_records(clients(&seed));
                view.merge_remote(clients(&batch), MergePolicy::RemoteWins);
                let once = view.records().to_vec();

                view.merge_remote(clients(&batch), MergePolicy::RemoteWins);
                prop_assert_eq!(view.records(), &once[..]);
            }
        }
    }
}
