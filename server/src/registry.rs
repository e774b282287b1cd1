//! Authoritative participant state registry
//!
//! The registry is the single source of truth for connected-participant state:
//! a mapping from client id to last-reported position and color. It is owned
//! by the main server loop and mutated only between suspension points of that
//! loop, so no locking is required; the broadcaster reads a full clone of it
//! after every mutation.

use log::info;
use shared::{Color, Participant, Vec3};
use std::collections::HashMap;

/// Server-side mapping of client id to authoritative participant state.
///
/// An entry exists iff the underlying connection is currently open. Updates
/// for ids that have already been removed are silently dropped rather than
/// treated as errors: the update was simply in flight when the participant
/// disconnected.
#[derive(Debug, Default)]
pub struct Registry {
    participants: HashMap<u32, Participant>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            participants: HashMap::new(),
        }
    }

    /// Registers a newly connected participant with spawn defaults.
    pub fn connect(&mut self, client_id: u32) {
        let participant = Participant::spawn();
        info!(
            "Registered participant {} at spawn ({}, {}, {})",
            client_id, participant.position.x, participant.position.y, participant.position.z
        );
        self.participants.insert(client_id, participant);
    }

    /// Replaces a participant's position and color.
    ///
    /// Returns false when the id is no longer registered; such a late update
    /// is dropped without touching any state.
    pub fn apply_update(&mut self, client_id: u32, position: Vec3, color: Color) -> bool {
        match self.participants.get_mut(&client_id) {
            Some(participant) => {
                participant.position = position;
                participant.color = color;
                true
            }
            None => false,
        }
    }

    /// Removes a participant on connection teardown.
    pub fn disconnect(&mut self, client_id: u32) -> bool {
        if self.participants.remove(&client_id).is_some() {
            info!("Removed participant {}", client_id);
            true
        } else {
            false
        }
    }

    /// Full copy of the current registry, sent verbatim to every client.
    pub fn snapshot(&self) -> HashMap<u32, Participant> {
        self.participants.clone()
    }

    pub fn contains(&self, client_id: u32) -> bool {
        self.participants.contains_key(&client_id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}
