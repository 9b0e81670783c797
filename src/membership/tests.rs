//! Membership Module Tests
//!
//! Validates the member data model and the registry's mutation rules.
//!
//! ## Test Scopes
//! - **Data Structures**: Identity equality/ordering and wire serialization.
//! - **Registry Logic**: Upsert transitions, local-node exclusion, snapshots.
//! - **Failure Detection**: Unreachable marking and eviction sweeps.

#[cfg(test)]
mod tests {
    use crate::membership::registry::MemberRegistry;
    use crate::membership::types::{ClusterMember, MemberId, MemberStatus};
    use std::net::IpAddr;
    use std::time::{Duration, Instant};

    fn member_id(port: u16) -> MemberId {
        MemberId::new("127.0.0.1".parse::<IpAddr>().unwrap(), port)
    }

    // ============================================================
    // MEMBER ID TESTS
    // ============================================================

    #[test]
    fn test_member_id_identity() {
        assert_eq!(member_id(4001), member_id(4001));
        assert_ne!(member_id(4001), member_id(4002));
        assert_ne!(
            MemberId::new("10.0.0.1".parse().unwrap(), 4001),
            member_id(4001)
        );
    }

    #[test]
    fn test_member_id_ordering_is_deterministic() {
        let mut ids = vec![member_id(4003), member_id(4001), member_id(4002)];
        ids.sort();

        assert_eq!(ids[0].port, 4001);
        assert_eq!(ids[1].port, 4002);
        assert_eq!(ids[2].port, 4003);
    }

    #[test]
    fn test_member_id_display() {
        assert_eq!(member_id(4001).to_string(), "127.0.0.1:4001");
    }

    // ============================================================
    // CLUSTER MEMBER TESTS
    // ============================================================

    #[test]
    fn test_member_serialization_skips_liveness_timestamp() {
        let member = ClusterMember::new(member_id(4001), MemberStatus::Active);
        assert!(member.last_seen.is_some());

        let encoded = bincode::serialize(&member).expect("Serialization failed");
        let restored: ClusterMember =
            bincode::deserialize(&encoded).expect("Deserialization failed");

        assert_eq!(restored.id, member.id);
        assert_eq!(restored.status, MemberStatus::Active);
        // last_seen is local bookkeeping, never on the wire
        assert!(restored.last_seen.is_none());
    }

    // ============================================================
    // REGISTRY TESTS
    // ============================================================

    #[test]
    fn test_registry_first_observation_inserts_joining() {
        let registry = MemberRegistry::new(member_id(4000));

        registry.observe(member_id(4001), MemberStatus::Active);
        let member = registry.get(&member_id(4001)).unwrap();
        assert_eq!(member.status, MemberStatus::Joining);

        // A later announcement promotes the member to what it advertises.
        registry.observe(member_id(4001), MemberStatus::Active);
        let member = registry.get(&member_id(4001)).unwrap();
        assert_eq!(member.status, MemberStatus::Active);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_registry_never_lists_local_node() {
        let registry = MemberRegistry::new(member_id(4000));

        registry.observe(member_id(4000), MemberStatus::Active);
        assert_eq!(registry.count(), 0);
        assert!(registry.get(&member_id(4000)).is_none());
    }

    #[test]
    fn test_registry_remove_on_departure() {
        let registry = MemberRegistry::new(member_id(4000));

        registry.observe(member_id(4001), MemberStatus::Active);
        assert_eq!(registry.count(), 1);

        registry.remove(&member_id(4001));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_registry_snapshot_is_sorted_copy() {
        let registry = MemberRegistry::new(member_id(4000));
        registry.observe(member_id(4003), MemberStatus::Active);
        registry.observe(member_id(4001), MemberStatus::Active);
        registry.observe(member_id(4002), MemberStatus::Active);

        let snapshot = registry.snapshot();
        let ports: Vec<u16> = snapshot.iter().map(|m| m.port()).collect();
        assert_eq!(ports, vec![4001, 4002, 4003]);

        // The snapshot is a copy: mutating the registry afterwards does not
        // change it.
        registry.remove(&member_id(4002));
        assert_eq!(snapshot.len(), 3);
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_sweep_marks_unreachable_then_evicts() {
        let registry = MemberRegistry::new(member_id(4000));

        let mut silent = ClusterMember::new(member_id(4001), MemberStatus::Active);
        silent.last_seen = Some(Instant::now() - Duration::from_secs(4));
        registry.members.insert(silent.id.clone(), silent);

        let fresh = ClusterMember::new(member_id(4002), MemberStatus::Active);
        registry.members.insert(fresh.id.clone(), fresh);

        // Silent for 4s: unreachable at the 3s threshold, not yet evicted.
        registry.sweep(Duration::from_secs(3), Duration::from_secs(6));
        assert_eq!(
            registry.get(&member_id(4001)).unwrap().status,
            MemberStatus::Unreachable
        );
        assert_eq!(
            registry.get(&member_id(4002)).unwrap().status,
            MemberStatus::Active
        );

        // Tighter eviction threshold drops the silent member entirely.
        registry.sweep(Duration::from_secs(1), Duration::from_secs(2));
        assert!(registry.get(&member_id(4001)).is_none());
        assert!(registry.get(&member_id(4002)).is_some());
    }
}
