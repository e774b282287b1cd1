//! Remote participant state cache with render-tick smoothing
//!
//! Snapshots arrive at roughly the registry's 20 Hz mutation cadence, which
//! is far below the render rate. Each remote participant therefore carries
//! two positions: the authoritative `target` replaced wholesale by every
//! snapshot, and a rendered `proxy` that closes a fixed fraction of the
//! remaining gap toward the target on every render tick.

use shared::{Color, Participant, Vec3, CONVERGENCE_FACTOR};
use std::collections::HashMap;

/// Cached state of one remote participant.
#[derive(Debug, Clone, Copy)]
pub struct RemoteEntry {
    /// Smoothed position actually rendered.
    pub proxy: Vec3,
    /// Last authoritative position from a snapshot.
    pub target: Vec3,
    pub color: Color,
}

/// Client-side mapping of remote participant id to cached state.
///
/// The local client's own id is never cached; its rendered position comes
/// from local input, not from the server echo.
#[derive(Debug, Default)]
pub struct RemoteCache {
    entries: HashMap<u32, RemoteEntry>,
}

impl RemoteCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Applies one full snapshot.
    ///
    /// Unseen ids are created with the proxy already at the target, so new
    /// participants appear in place instead of sliding in from somewhere.
    /// Known ids get only their target and color replaced; the proxy is left
    /// for [`step`](Self::step) to converge. Ids absent from the snapshot are
    /// removed immediately and returned so the caller can release their
    /// rendering resources in the same tick.
    pub fn apply_snapshot(
        &mut self,
        snapshot: &HashMap<u32, Participant>,
        local_id: Option<u32>,
    ) -> Vec<u32> {
        for (&id, participant) in snapshot {
            if Some(id) == local_id {
                continue;
            }

            match self.entries.get_mut(&id) {
                Some(entry) => {
                    entry.target = participant.position;
                    entry.color = participant.color;
                }
                None => {
                    self.entries.insert(
                        id,
                        RemoteEntry {
                            proxy: participant.position,
                            target: participant.position,
                            color: participant.color,
                        },
                    );
                }
            }
        }

        // Absence from a snapshot is an authoritative disconnect signal.
        let removed: Vec<u32> = self
            .entries
            .keys()
            .filter(|id| !snapshot.contains_key(id))
            .copied()
            .collect();
        for id in &removed {
            self.entries.remove(id);
        }

        removed
    }

    /// One render tick of smoothing: every proxy closes
    /// [`CONVERGENCE_FACTOR`] of its remaining distance to the target.
    pub fn step(&mut self) {
        for entry in self.entries.values_mut() {
            entry.proxy = entry.proxy.lerp(entry.target, CONVERGENCE_FACTOR);
        }
    }

    pub fn get(&self, id: u32) -> Option<&RemoteEntry> {
        self.entries.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u32, &RemoteEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
