//! Readiness barrier in front of the database.
//!
//! The gate is created empty, the database is installed once during startup,
//! and request handlers only ever see a fully opened and migrated handle.

use std::sync::{Arc, OnceLock};

use super::Database;

#[derive(Clone, Default)]
pub struct StoreGate {
    slot: Arc<OnceLock<Database>>,
}

impl StoreGate {
    /// A gate with nothing installed yet. Every `get` fails until `install`.
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn with_database(db: Database) -> Self {
        let gate = Self::pending();
        gate.install(db);
        gate
    }

    /// Install the database. Returns false if one was already installed.
    pub fn install(&self, db: Database) -> bool {
        self.slot.set(db).is_ok()
    }

    pub fn is_ready(&self) -> bool {
        self.slot.get().is_some()
    }

    pub fn get(&self) -> Result<&Database, StoreUnavailable> {
        self.slot.get().ok_or(StoreUnavailable)
    }
}

/// The store has not been installed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreUnavailable;

impl std::fmt::Display for StoreUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Document store is not ready")
    }
}

impl std::error::Error for StoreUnavailable {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gate_opens_once() {
        let gate = StoreGate::pending();
        let clone = gate.clone();
        assert!(!gate.is_ready());
        assert_eq!(gate.get().err(), Some(StoreUnavailable));

        let db = Database::open(":memory:").await.unwrap();
        assert!(gate.install(db.clone()));
        assert!(!gate.install(db));

        // Clones share the slot.
        assert!(clone.is_ready());
        assert!(clone.get().is_ok());
    }
}
