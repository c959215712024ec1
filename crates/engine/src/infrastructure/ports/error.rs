//! Error types for port operations.

/// World host operation errors.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// Instance creation failed - includes the farm world for context.
    #[error("World creation failed for {farm_world}: {message}")]
    Create { farm_world: String, message: String },

    /// Unloading or deleting an instance failed.
    #[error("World teardown failed for {world}: {message}")]
    Teardown { world: String, message: String },

    /// The named instance is not present in the host.
    #[error("World not loaded: {0}")]
    NotLoaded(String),

    /// Safe-location sampling gave up.
    #[error("No safe location in {world}: {message}")]
    NoSafeLocation { world: String, message: String },

    /// Moving an occupant failed.
    #[error("Teleport failed: {0}")]
    Teleport(String),
}

impl ProvisionError {
    /// Create a Create error with farm world context.
    pub fn create(farm_world: impl ToString, message: impl ToString) -> Self {
        Self::Create {
            farm_world: farm_world.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a Teardown error with instance context.
    pub fn teardown(world: impl ToString, message: impl ToString) -> Self {
        Self::Teardown {
            world: world.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a NoSafeLocation error.
    pub fn no_safe_location(world: impl ToString, message: impl ToString) -> Self {
        Self::NoSafeLocation {
            world: world.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a Teleport error.
    pub fn teleport(message: impl ToString) -> Self {
        Self::Teleport(message.to_string())
    }
}

/// Persistence operation errors with context for debugging.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Record not found - includes record type and key for actionable error messages.
    #[error("{record_type} not found: {key}")]
    NotFound {
        record_type: &'static str,
        key: String,
    },

    /// Database operation failed - includes operation name for tracing.
    #[error("Database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A record exists but can no longer be interpreted. Callers recover by
    /// treating the record as absent.
    #[error("Stale {record_type} record: {key}")]
    Stale {
        record_type: &'static str,
        key: String,
    },
}

impl StoreError {
    /// Create a NotFound error with record type and key context.
    pub fn not_found(record_type: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            record_type,
            key: key.to_string(),
        }
    }

    /// Create a Database error with operation context.
    pub fn database(operation: &'static str, message: impl ToString) -> Self {
        Self::Database {
            operation,
            message: message.to_string(),
        }
    }

    /// Create a Serialization error.
    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }

    /// Create a Stale record error.
    pub fn stale(record_type: &'static str, key: impl ToString) -> Self {
        Self::Stale {
            record_type,
            key: key.to_string(),
        }
    }

    /// Check if this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a Stale record error.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }
}

/// Errors from publishing farm world events.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventBusError {
    #[error("Event transport failed: {0}")]
    Transport(String),
}
