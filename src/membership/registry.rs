//! Member Registry
//!
//! The single source of truth for "who is in the group". Holds every known
//! remote member keyed by identity; the local node is never listed as a remote
//! member of itself.
//!
//! All writes route through the discovery engine (the mutating methods are
//! crate-private). Readers get consistent point-in-time copies and never block
//! writers: `DashMap` shards guarantee an entry is observed either before or
//! after an update, never half-written.

use super::types::{ClusterMember, MemberId, MemberStatus};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct MemberRegistry {
    pub(crate) members: DashMap<MemberId, ClusterMember>,
    local: MemberId,
}

impl MemberRegistry {
    pub(crate) fn new(local: MemberId) -> Arc<Self> {
        Arc::new(Self {
            members: DashMap::new(),
            local,
        })
    }

    /// Records an announcement from `id`. A first observation inserts the
    /// member as `Joining`; subsequent announcements promote it to the status
    /// it advertises and refresh its liveness timestamp. Announcements from
    /// the local node are ignored.
    pub(crate) fn observe(&self, id: MemberId, announced: MemberStatus) {
        if id == self.local {
            return;
        }

        if let Some(mut member) = self.members.get_mut(&id) {
            if member.status != announced {
                tracing::debug!("Member {} is now {:?}", id, announced);
            }
            member.status = announced;
            member.last_seen = Some(Instant::now());
        } else {
            tracing::info!("Discovered new member {}", id);
            self.members
                .insert(id.clone(), ClusterMember::new(id, MemberStatus::Joining));
        }
    }

    /// Removes a member on confirmed departure.
    pub(crate) fn remove(&self, id: &MemberId) {
        if self.members.remove(id).is_some() {
            tracing::info!("Member {} left the cluster", id);
        }
    }

    /// Failure-detection sweep. Members silent for `unreachable_after` become
    /// `Unreachable`; members silent for `evict_after` are dropped entirely.
    pub(crate) fn sweep(&self, unreachable_after: Duration, evict_after: Duration) {
        let now = Instant::now();

        for mut entry in self.members.iter_mut() {
            let member = entry.value_mut();
            let silent_for = match member.last_seen {
                Some(last_seen) => now.duration_since(last_seen),
                None => continue,
            };

            if member.status != MemberStatus::Unreachable && silent_for > unreachable_after {
                tracing::warn!(
                    "Member {} unreachable (no announcement for {:?})",
                    member.id,
                    silent_for
                );
                member.status = MemberStatus::Unreachable;
            }
        }

        self.members.retain(|id, member| {
            let keep = match member.last_seen {
                Some(last_seen) => now.duration_since(last_seen) <= evict_after,
                None => true,
            };
            if !keep {
                tracing::info!("Evicting member {} after liveness timeout", id);
            }
            keep
        });
    }

    /// A consistent point-in-time copy of the membership view, ordered by
    /// member identity so iteration is deterministic. Safe to iterate while
    /// the registry continues mutating.
    pub fn snapshot(&self) -> Vec<ClusterMember> {
        let mut members: Vec<ClusterMember> = self
            .members
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        members.sort_by(|a, b| a.id.cmp(&b.id));
        members
    }

    /// Number of known remote members. The local node is not counted.
    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn get(&self, id: &MemberId) -> Option<ClusterMember> {
        self.members.get(id).map(|entry| entry.value().clone())
    }

    pub fn local_id(&self) -> &MemberId {
        &self.local
    }
}
