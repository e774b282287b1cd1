//! Integration tests for the synchronization layer
//!
//! These tests validate cross-component interactions: wire protocol
//! round-trips, registry-to-cache snapshot flow, and clock-compensated
//! scheduling across skewed clocks.

use bincode::{deserialize, serialize};
use client::cache::RemoteCache;
use client::sentinel::{ClockOffset, SentinelScheduler};
use server::registry::Registry;
use server::sentinel::SentinelDriver;
use shared::{Color, Packet, Participant, Phase, Vec3, CONVERGENCE_FACTOR, TURN_PAUSE_MIN_MS};
use std::collections::HashMap;
use std::net::UdpSocket;
use std::thread;
use std::time::Duration;
use tokio::time::sleep;

/// NETWORK PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// Tests packet serialization round-trip for network protocol validation
    #[tokio::test]
    async fn packet_serialization_roundtrip() {
        let test_packets = vec![
            Packet::Connect { client_version: 1 },
            Packet::UpdatePosition {
                position: Vec3::new(10.0, 10.0, 5.0),
                color: Color::new(0xff, 0x00, 0x00),
            },
            Packet::Connected { client_id: 42 },
            Packet::SentinelTurn {
                phase: Phase::Facing,
                duration_ms: 1000,
                start_time_ms: 123_456_789,
            },
            Packet::Disconnect,
            Packet::Disconnected {
                reason: "Test".to_string(),
            },
        ];

        for packet in test_packets {
            let serialized = serialize(&packet).unwrap();
            let deserialized: Packet = deserialize(&serialized).unwrap();

            match (&packet, &deserialized) {
                (Packet::Connect { .. }, Packet::Connect { .. }) => {}
                (Packet::UpdatePosition { .. }, Packet::UpdatePosition { .. }) => {}
                (Packet::Connected { .. }, Packet::Connected { .. }) => {}
                (Packet::SentinelTurn { .. }, Packet::SentinelTurn { .. }) => {}
                (Packet::Disconnect, Packet::Disconnect) => {}
                (Packet::Disconnected { .. }, Packet::Disconnected { .. }) => {}
                _ => panic!("Packet type mismatch after serialization"),
            }
        }
    }

    /// Tests real UDP socket communication with a snapshot payload
    #[tokio::test]
    async fn udp_socket_communication() {
        let server_socket = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind server socket");
        let server_addr = server_socket.local_addr().unwrap();

        // Echo server
        let server_socket_clone = server_socket.try_clone().unwrap();
        thread::spawn(move || {
            let mut buf = [0; 2048];
            if let Ok((size, client_addr)) = server_socket_clone.recv_from(&mut buf) {
                let _ = server_socket_clone.send_to(&buf[..size], client_addr);
            }
        });

        sleep(Duration::from_millis(10)).await;

        let client_socket = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind client socket");
        client_socket
            .set_read_timeout(Some(Duration::from_millis(100)))
            .unwrap();

        let mut participants = HashMap::new();
        participants.insert(
            1,
            Participant {
                position: Vec3::new(10.0, 10.0, 5.0),
                color: Color::new(0xff, 0x00, 0x00),
            },
        );
        let test_packet = Packet::Snapshot { participants };
        let serialized = serialize(&test_packet).unwrap();

        client_socket.send_to(&serialized, server_addr).unwrap();

        let mut buf = [0; 2048];
        let (size, _) = client_socket.recv_from(&mut buf).unwrap();
        let received_packet: Packet = deserialize(&buf[..size]).unwrap();

        match received_packet {
            Packet::Snapshot { participants } => {
                let p = participants.get(&1).unwrap();
                assert_eq!(p.position, Vec3::new(10.0, 10.0, 5.0));
                assert_eq!(p.color.to_hex(), "#ff0000");
            }
            _ => panic!("Wrong packet type received"),
        }
    }
}

/// SNAPSHOT FLOW TESTS
mod snapshot_flow_tests {
    use super::*;

    /// Two clients A and B: A's update must reach B's cache verbatim, and
    /// A's disconnect must tear B's entry down.
    #[test]
    fn update_and_disconnect_propagate_to_remote_cache() {
        let mut registry = Registry::new();
        let a = 1u32;
        let b = 2u32;
        registry.connect(a);
        registry.connect(b);

        let mut cache_b = RemoteCache::new();
        cache_b.apply_snapshot(&registry.snapshot(), Some(b));
        assert_eq!(cache_b.len(), 1);

        // A reports a new position and color.
        assert!(registry.apply_update(
            a,
            Vec3::new(10.0, 10.0, 5.0),
            Color::from_hex("#ff0000").unwrap(),
        ));

        cache_b.apply_snapshot(&registry.snapshot(), Some(b));
        let entry = cache_b.get(a).unwrap();
        assert_eq!(entry.target, Vec3::new(10.0, 10.0, 5.0));
        assert_eq!(entry.color.to_hex(), "#ff0000");

        // A disconnects; the next broadcast to B omits A, and B's cache
        // releases the entry in the same application.
        registry.disconnect(a);
        let snapshot = registry.snapshot();
        assert!(!snapshot.contains_key(&a));

        let removed = cache_b.apply_snapshot(&snapshot, Some(b));
        assert_eq!(removed, vec![a]);
        assert!(cache_b.get(a).is_none());
    }

    /// A stale update between disconnect and the next snapshot changes nothing.
    #[test]
    fn stale_update_does_not_resurrect_participant() {
        let mut registry = Registry::new();
        registry.connect(1);
        registry.connect(2);
        registry.disconnect(1);

        let before = registry.snapshot();
        assert!(!registry.apply_update(1, Vec3::new(5.0, 5.0, 5.0), shared::DEFAULT_COLOR));
        assert_eq!(registry.snapshot(), before);
    }

    /// Proxy convergence across repeated snapshots and render ticks.
    #[test]
    fn proxy_converges_geometrically_between_snapshots() {
        let mut registry = Registry::new();
        registry.connect(1);
        registry.connect(2);

        let mut cache = RemoteCache::new();
        cache.apply_snapshot(&registry.snapshot(), Some(2));

        registry.apply_update(1, Vec3::new(-240.0, 10.0, 0.0), shared::DEFAULT_COLOR);
        cache.apply_snapshot(&registry.snapshot(), Some(2));

        let target = Vec3::new(-240.0, 10.0, 0.0);
        let initial = cache.get(1).unwrap().proxy.distance(target);
        assert!(initial > 0.0);

        for _ in 0..8 {
            cache.step();
        }

        let residual = cache.get(1).unwrap().proxy.distance(target);
        let expected = initial * (1.0 - CONVERGENCE_FACTOR).powi(8);
        assert!((residual - expected).abs() < 1e-2);
    }
}

/// CLOCK-COMPENSATED SCHEDULING TESTS
mod scheduling_tests {
    use super::*;

    /// A turn announced with start time T but received at wall clock T+1500
    /// begins immediately and settles one full duration later.
    #[test]
    fn late_announcement_fires_immediately_and_settles_after_duration() {
        let mut scheduler = SentinelScheduler::new();

        // Client monotonic clock anchored when its wall clock read 5_000_000.
        let offset = ClockOffset::from_parts(5_000_000, 0);
        let start_time_ms = 5_000_000; // deadline at local 0
        let receipt_ms = 1500; // delivered 1500 ms late

        scheduler.announce(Phase::Facing, 1000, start_time_ms, &offset, receipt_ms);
        assert!(scheduler.is_turning());

        scheduler.tick(receipt_ms + 999);
        assert!(scheduler.is_turning());

        scheduler.tick(receipt_ms + 1000);
        assert!(scheduler.is_settled());
        assert!(scheduler.is_facing());
        assert_eq!(scheduler.angle(), Phase::Facing.angle());
    }

    /// Two clients with different clock skews derive the same real-world
    /// start for one announcement.
    #[test]
    fn skewed_clients_agree_on_turn_start() {
        let start_time_ms = 7_000_000u64;

        // Client X's wall clock is 2000 ms ahead of client Y's.
        let offset_x = ClockOffset::from_parts(6_999_000, 0);
        let offset_y = ClockOffset::from_parts(6_997_000, 0);

        let deadline_x = offset_x.epoch_to_monotonic_ms(start_time_ms);
        let deadline_y = offset_y.epoch_to_monotonic_ms(start_time_ms);

        // Each deadline is 1000/3000 ms into the respective local clock, but
        // both map to the same wall-clock moment given each client's skew.
        assert_eq!(deadline_x, 1000);
        assert_eq!(deadline_y, 3000);
        assert_eq!(
            start_time_ms as i64 - deadline_x,
            offset_x.offset_ms()
        );
        assert_eq!(
            start_time_ms as i64 - deadline_y,
            offset_y.offset_ms()
        );
    }

    /// Driver cycles never announce overlapping turn intervals, and a client
    /// fed those announcements alternates its settled facing state.
    #[test]
    fn driver_cycles_alternate_cleanly_through_a_client() {
        let mut driver = SentinelDriver::new();
        let mut scheduler = SentinelScheduler::new();

        // Server and client clocks share an epoch here; skew is covered above.
        let offset = ClockOffset::from_parts(0, 0);
        let mut now_ms = 0u64;
        let mut prev_end = 0u64;
        let mut expected_facing = false;

        for _ in 0..10 {
            let turn = driver.next_turn(now_ms);

            assert!(turn.start_time_ms >= prev_end);
            if prev_end > 0 {
                assert!(turn.start_time_ms - prev_end >= TURN_PAUSE_MIN_MS);
            }
            prev_end = turn.start_time_ms + turn.duration_ms;

            scheduler.announce(
                turn.phase,
                turn.duration_ms,
                turn.start_time_ms,
                &offset,
                now_ms,
            );
            scheduler.tick(now_ms + turn.duration_ms);

            expected_facing = !expected_facing;
            assert!(scheduler.is_settled());
            assert_eq!(scheduler.is_facing(), expected_facing);

            now_ms += turn.duration_ms + turn.pause_ms;
        }
    }
}
