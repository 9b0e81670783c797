//! Configuration Model Tests
//!
//! Validates that parsed scheme parameters are exposed unchanged, that the
//! zero-timeout default kicks in, and that non-multicast groups are rejected
//! before any socket is touched.

#[cfg(test)]
mod tests {
    use crate::config::types::{
        ClusterConfiguration, MembershipScheme, MulticastConfig, DEFAULT_DISCOVERY_WINDOW,
    };
    use crate::membership::types::MemberId;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    fn local() -> MemberId {
        MemberId {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 4001,
        }
    }

    #[test]
    fn test_multicast_config_values_unchanged() {
        let config = MulticastConfig::new("228.0.0.4".parse().unwrap(), 45564, 0, 100);

        assert_eq!(config.group, "228.0.0.4".parse::<IpAddr>().unwrap());
        assert_eq!(config.port, 45564);
        assert_eq!(config.timeout_millis, 0);
        assert_eq!(config.ttl, 100);
        assert_eq!(config.group_addr().to_string(), "228.0.0.4:45564");
    }

    #[test]
    fn test_zero_timeout_selects_default_window() {
        let config = MulticastConfig::new("228.0.0.4".parse().unwrap(), 45564, 0, 100);
        assert_eq!(config.discovery_window(), DEFAULT_DISCOVERY_WINDOW);

        let config = MulticastConfig::new("228.0.0.4".parse().unwrap(), 45564, 1500, 100);
        assert_eq!(config.discovery_window(), Duration::from_millis(1500));
    }

    #[test]
    fn test_non_multicast_group_rejected() {
        let config = MulticastConfig::new("192.168.1.10".parse().unwrap(), 45564, 0, 1);
        assert!(config.validate().is_err());

        let config = MulticastConfig::new("228.0.0.4".parse().unwrap(), 45564, 0, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ipv6_multicast_group_accepted() {
        let config = MulticastConfig::new("ff02::4".parse().unwrap(), 45564, 0, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scheme_discriminator() {
        let multicast = MembershipScheme::Multicast(MulticastConfig::new(
            "228.0.0.4".parse().unwrap(),
            45564,
            0,
            100,
        ));
        assert_eq!(multicast.name(), "multicast");

        let wka = MembershipScheme::WellKnownAddress {
            members: vec!["127.0.0.1:4001".parse().unwrap()],
        };
        assert_eq!(wka.name(), "wka");
    }

    #[test]
    fn test_configuration_serialization() {
        let config = ClusterConfiguration::new(
            local(),
            MembershipScheme::Multicast(MulticastConfig::new(
                "228.0.0.4".parse().unwrap(),
                45564,
                0,
                100,
            )),
        );

        let json = serde_json::to_string(&config).expect("Serialization failed");
        let restored: ClusterConfiguration =
            serde_json::from_str(&json).expect("Deserialization failed");

        assert_eq!(restored.local, config.local);
        match restored.scheme {
            MembershipScheme::Multicast(m) => {
                assert_eq!(m.port, 45564);
                assert_eq!(m.ttl, 100);
            }
            _ => panic!("Wrong scheme variant"),
        }
    }
}
