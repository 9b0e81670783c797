//! Messaging Module Tests
//!
//! Validates the wire format, channel framing, handler registry, and the
//! caller-observable execution status contract.

#[cfg(test)]
mod tests {
    use crate::messaging::protocol::{
        read_frame, write_frame, MessageEnvelope, MessageId, WirePacket,
    };
    use crate::messaging::registry::MessageHandlerRegistry;
    use crate::messaging::types::{ClusterMessage, PendingAcks};
    use crate::membership::types::{MemberId, MemberStatus};
    use serde_json::json;
    use std::net::IpAddr;
    use std::time::Duration;

    fn member_id(port: u16) -> MemberId {
        MemberId::new("127.0.0.1".parse::<IpAddr>().unwrap(), port)
    }

    // ============================================================
    // WIRE FORMAT TESTS
    // ============================================================

    #[test]
    fn test_message_id_is_unique() {
        assert_ne!(MessageId::new(), MessageId::new());
    }

    #[test]
    fn test_announcement_serialization() {
        let packet = WirePacket::Announce {
            member: member_id(4001),
            status: MemberStatus::Active,
        };

        let encoded = bincode::serialize(&packet).expect("Failed to serialize Announce");
        let decoded: WirePacket =
            bincode::deserialize(&encoded).expect("Failed to deserialize Announce");

        match decoded {
            WirePacket::Announce { member, status } => {
                assert_eq!(member, member_id(4001));
                assert_eq!(status, MemberStatus::Active);
            }
            _ => panic!("Wrong packet type"),
        }
    }

    #[test]
    fn test_announcements_and_messages_distinguishable() {
        // Both packet kinds share the multicast group; the discriminant must
        // keep them apart after a round trip.
        let announce = bincode::serialize(&WirePacket::Announce {
            member: member_id(4001),
            status: MemberStatus::Joining,
        })
        .unwrap();
        let message = bincode::serialize(&WirePacket::Message(MessageEnvelope {
            id: MessageId::new(),
            sender: member_id(4001),
            handler: "noop".to_string(),
            payload: "null".to_string(),
        }))
        .unwrap();

        assert!(matches!(
            bincode::deserialize::<WirePacket>(&announce).unwrap(),
            WirePacket::Announce { .. }
        ));
        assert!(matches!(
            bincode::deserialize::<WirePacket>(&message).unwrap(),
            WirePacket::Message(_)
        ));
    }

    #[test]
    fn test_structured_payload_survives_wire_encoding() {
        // The payload is dynamically typed JSON; it must come back intact from
        // a full encode/decode cycle of the carrier packet.
        let payload = json!({"key": "value", "numbers": [1, 2, 3]});
        let packet = WirePacket::Message(MessageEnvelope {
            id: MessageId::new(),
            sender: member_id(4001),
            handler: "annotate".to_string(),
            payload: serde_json::to_string(&payload).unwrap(),
        });

        let encoded = bincode::serialize(&packet).expect("Failed to serialize Message");
        let decoded: WirePacket =
            bincode::deserialize(&encoded).expect("Failed to deserialize Message");

        match decoded {
            WirePacket::Message(envelope) => {
                let restored: serde_json::Value =
                    serde_json::from_str(&envelope.payload).expect("payload is not JSON");
                assert_eq!(restored, payload);
            }
            _ => panic!("Wrong packet type"),
        }
    }

    #[tokio::test]
    async fn test_channel_framing_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        let id = MessageId::new();
        let packet = WirePacket::Ack {
            message_id: id.clone(),
            executed_by: member_id(4002),
            result: serde_json::to_string(&json!({"outcome": "done"})).unwrap(),
        };

        write_frame(&mut client, &packet).await.expect("write failed");
        let decoded = read_frame(&mut server).await.expect("read failed");

        match decoded {
            WirePacket::Ack {
                message_id,
                executed_by,
                result,
            } => {
                assert_eq!(message_id, id);
                assert_eq!(executed_by, member_id(4002));
                assert_eq!(
                    serde_json::from_str::<serde_json::Value>(&result).unwrap(),
                    json!({"outcome": "done"})
                );
            }
            _ => panic!("Wrong packet type"),
        }
    }

    // ============================================================
    // HANDLER REGISTRY TESTS
    // ============================================================

    #[tokio::test]
    async fn test_handler_registration_and_execution() {
        let registry = MessageHandlerRegistry::new();
        assert_eq!(registry.handler_count(), 0);

        registry.register("annotate", |payload| async move {
            Ok(json!({ "annotated": payload }))
        });

        assert!(registry.has_handler("annotate"));
        assert_eq!(registry.handler_count(), 1);

        let result = registry
            .execute("annotate", json!("hello"))
            .await
            .expect("handler failed");
        assert_eq!(result, json!({ "annotated": "hello" }));
    }

    #[tokio::test]
    async fn test_unknown_handler_is_an_error() {
        let registry = MessageHandlerRegistry::new();
        let result = registry.execute("missing", json!(null)).await;
        assert!(result.is_err());
    }

    // ============================================================
    // EXECUTION STATUS TESTS
    // ============================================================

    #[test]
    fn test_execution_status_starts_empty_and_is_idempotent() {
        let message = ClusterMessage::new("annotate", json!("payload"));

        assert!(message.execution_status().is_none());

        message.status_handle().set(json!("executed"));
        for _ in 0..5 {
            // Re-querying never changes the value.
            assert_eq!(message.execution_status(), Some(json!("executed")));
        }
    }

    #[test]
    fn test_pending_acks_route_to_tracked_message_only() {
        let pending = PendingAcks::new();
        let tracked = ClusterMessage::new("annotate", json!(1));
        let untracked = ClusterMessage::new("annotate", json!(2));

        pending.track(tracked.id().clone(), &tracked.status_handle());

        pending.complete(untracked.id(), "\"stray\"");
        assert!(tracked.execution_status().is_none());
        assert!(untracked.execution_status().is_none());

        pending.complete(tracked.id(), "\"done\"");
        assert_eq!(tracked.execution_status(), Some(json!("done")));
    }

    #[test]
    fn test_pending_acks_forget_completed_and_dropped_messages() {
        let pending = PendingAcks::new();

        // The first execution report retires the entry; a later report for the
        // same id cannot overwrite the observed result.
        let message = ClusterMessage::new("annotate", json!(1));
        pending.track(message.id().clone(), &message.status_handle());
        assert_eq!(pending.len(), 1);

        pending.complete(message.id(), "\"first\"");
        assert_eq!(message.execution_status(), Some(json!("first")));
        assert_eq!(pending.len(), 0);
        pending.complete(message.id(), "\"second\"");
        assert_eq!(message.execution_status(), Some(json!("first")));

        // A sender that drops its message stops pinning the status slot; the
        // stale entry is pruned when the next message is tracked.
        let dropped = ClusterMessage::new("annotate", json!(2));
        let dropped_id = dropped.id().clone();
        pending.track(dropped_id.clone(), &dropped.status_handle());
        drop(dropped);

        let live = ClusterMessage::new("annotate", json!(3));
        pending.track(live.id().clone(), &live.status_handle());
        assert_eq!(pending.len(), 1);

        // A late report for the dropped message goes nowhere.
        pending.complete(&dropped_id, "\"late\"");
        assert!(live.execution_status().is_none());
    }

    #[tokio::test]
    async fn test_await_executed_sees_asynchronous_completion() {
        let message = ClusterMessage::new("annotate", json!(null));
        let status = message.status_handle();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            status.set(json!("executed"));
        });

        let value = message.await_executed(Duration::from_secs(2)).await;
        assert_eq!(value, Some(json!("executed")));
    }

    #[tokio::test]
    async fn test_await_executed_gives_up_at_deadline() {
        let message = ClusterMessage::new("annotate", json!(null));

        let value = message.await_executed(Duration::from_millis(100)).await;
        assert!(value.is_none());
    }
}
