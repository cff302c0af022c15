//! Connected-central registry.
//!
//! A plain set of [`ConnHandle`]s: a handle is present iff its connect has
//! been seen and its disconnect has not.  Fan-out iterates a
//! [`snapshot`](ConnectionRegistry::snapshot), never the live set, so a
//! connect or disconnect handled later cannot alter a send in progress.

use heapless::FnvIndexSet;
use log::warn;

use crate::app::ports::ConnHandle;

/// Simultaneous links tracked.  Must be a power of two (index-set sizing)
/// and at least the controller's link limit (Bluedroid allows up to 9).
pub const MAX_CONNECTIONS: usize = 16;

/// Owned copy of the membership at one instant.
pub type ConnectionSnapshot = heapless::Vec<ConnHandle, MAX_CONNECTIONS>;

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    handles: FnvIndexSet<ConnHandle, MAX_CONNECTIONS>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `conn`.  Idempotent.  Returns `false` only when the registry
    /// is full and `conn` was not already present.
    pub fn on_connect(&mut self, conn: ConnHandle) -> bool {
        match self.handles.insert(conn) {
            Ok(_) => true,
            Err(_) => {
                warn!(
                    "registry: full ({} links), ignoring conn {}",
                    MAX_CONNECTIONS, conn.0
                );
                false
            }
        }
    }

    /// Forget `conn`.  Unknown handles are a no-op.  Returns whether the
    /// handle was present.
    pub fn on_disconnect(&mut self, conn: ConnHandle) -> bool {
        self.handles.remove(&conn)
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.handles.iter().copied().collect()
    }

    pub fn contains(&self, conn: ConnHandle) -> bool {
        self.handles.contains(&conn)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
