//! Transport-side connection management
//!
//! Tracks which network address belongs to which client id, enforces the
//! server capacity limit, and detects dead connections through an activity
//! timeout. Over UDP there is no teardown handshake, so a client that stops
//! sending packets for long enough is treated as disconnected.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// How long a client may stay silent before it is considered gone. Clients
/// report their position every 50 ms, so this is generous.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// One connected transport endpoint.
#[derive(Debug)]
pub struct Connection {
    pub id: u32,
    pub addr: SocketAddr,
    /// Last time any packet arrived from this address.
    pub last_seen: Instant,
}

impl Connection {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Connection table mapping client ids to addresses.
///
/// Ids are assigned at handshake, start from 1, and stay stable for the
/// connection lifetime. The table is the transport-level counterpart of the
/// registry: the registry holds game state, this holds routing state.
pub struct ConnectionManager {
    connections: HashMap<u32, Connection>,
    next_client_id: u32,
    max_clients: usize,
}

impl ConnectionManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            connections: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Adds a new connection, returning its assigned id, or None when the
    /// server is at capacity.
    pub fn add(&mut self, addr: SocketAddr) -> Option<u32> {
        if self.connections.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.connections.insert(client_id, Connection::new(client_id, addr));

        Some(client_id)
    }

    pub fn remove(&mut self, client_id: u32) -> bool {
        if self.connections.remove(&client_id).is_some() {
            info!("Client {} disconnected", client_id);
            true
        } else {
            false
        }
    }

    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.connections
            .iter()
            .find(|(_, conn)| conn.addr == addr)
            .map(|(id, _)| *id)
    }

    /// Refreshes the activity timestamp for whatever client owns `addr`.
    pub fn touch(&mut self, addr: SocketAddr) {
        if let Some(conn) = self.connections.values_mut().find(|c| c.addr == addr) {
            conn.last_seen = Instant::now();
        }
    }

    /// Removes and returns every connection that has gone silent.
    pub fn check_timeouts(&mut self) -> Vec<u32> {
        let timed_out: Vec<u32> = self
            .connections
            .iter()
            .filter(|(_, conn)| conn.is_timed_out(CONNECTION_TIMEOUT))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            self.remove(*client_id);
        }

        timed_out
    }

    /// All (id, address) pairs, used by the broadcaster.
    pub fn client_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.connections
            .iter()
            .map(|(id, conn)| (*id, conn.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_add_assigns_sequential_ids() {
        let mut manager = ConnectionManager::new(4);
        assert_eq!(manager.add(test_addr()), Some(1));
        assert_eq!(manager.add(test_addr2()), Some(2));
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_add_respects_capacity() {
        let mut manager = ConnectionManager::new(1);
        assert!(manager.add(test_addr()).is_some());
        assert!(manager.add(test_addr2()).is_none());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_find_by_addr() {
        let mut manager = ConnectionManager::new(4);
        let id = manager.add(test_addr()).unwrap();

        assert_eq!(manager.find_by_addr(test_addr()), Some(id));
        assert_eq!(manager.find_by_addr(test_addr2()), None);
    }

    #[test]
    fn test_remove() {
        let mut manager = ConnectionManager::new(4);
        let id = manager.add(test_addr()).unwrap();

        assert!(manager.remove(id));
        assert!(manager.is_empty());
        assert!(!manager.remove(id));
    }

    #[test]
    fn test_timeout_sweep_removes_silent_connections() {
        let mut manager = ConnectionManager::new(4);
        let id1 = manager.add(test_addr()).unwrap();
        let _id2 = manager.add(test_addr2()).unwrap();

        manager.connections.get_mut(&id1).unwrap().last_seen =
            Instant::now() - Duration::from_secs(10);

        let timed_out = manager.check_timeouts();
        assert_eq!(timed_out, vec![id1]);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_touch_resets_timeout() {
        let mut manager = ConnectionManager::new(4);
        let id = manager.add(test_addr()).unwrap();

        manager.connections.get_mut(&id).unwrap().last_seen =
            Instant::now() - Duration::from_secs(10);
        manager.touch(test_addr());

        assert!(manager.check_timeouts().is_empty());
    }

    #[test]
    fn test_client_addrs_for_broadcast() {
        let mut manager = ConnectionManager::new(4);
        let id1 = manager.add(test_addr()).unwrap();
        let id2 = manager.add(test_addr2()).unwrap();

        let mut addrs = manager.client_addrs();
        addrs.sort_by_key(|(id, _)| *id);
        assert_eq!(addrs, vec![(id1, test_addr()), (id2, test_addr2())]);
    }
}
