//! Positions and locations within world instances.

use serde::{Deserialize, Serialize};

// =============================================================================
// Position
// =============================================================================

/// A point with orientation inside some world instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    pub fn with_orientation(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self
    }

    /// Straight-line distance to another position, ignoring orientation.
    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

// =============================================================================
// World Location
// =============================================================================

/// A position bound to a named world instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldLocation {
    pub world: String,
    pub position: Position,
}

impl WorldLocation {
    pub fn new(world: impl Into<String>, position: Position) -> Self {
        Self {
            world: world.into(),
            position,
        }
    }
}

// =============================================================================
// Spawn Point
// =============================================================================

/// A spawn override captured independently of any particular instance.
///
/// Stored per farm world (operator override) or per instance (written next to
/// the instance data); binding to a world name happens at teleport time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnPoint {
    pub position: Position,
}

impl SpawnPoint {
    pub fn new(position: Position) -> Self {
        Self { position }
    }

    pub fn into_location(self, world: impl Into<String>) -> WorldLocation {
        WorldLocation::new(world, self.position)
    }
}

// =============================================================================
// Border
// =============================================================================

/// Square area constraint applied to an instance and to safe-location
/// sampling. `size` is the edge length centered on (`center_x`, `center_z`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Border {
    pub size: f64,
    #[serde(default)]
    pub center_x: f64,
    #[serde(default)]
    pub center_z: f64,
}

impl Border {
    pub fn new(size: f64) -> Self {
        Self {
            size,
            center_x: 0.0,
            center_z: 0.0,
        }
    }

    pub fn centered_at(mut self, x: f64, z: f64) -> Self {
        self.center_x = x;
        self.center_z = z;
        self
    }

    /// Half the edge length; the sampling radius along each axis.
    pub fn half_size(&self) -> f64 {
        self.size / 2.0
    }
}

// =============================================================================
// Environment
// =============================================================================

/// World environment dimension an instance is provisioned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Normal,
    Nether,
    End,
}

impl Environment {
    pub fn display_name(&self) -> &'static str {
        match self {
            Environment::Normal => "Normal",
            Environment::Nether => "Nether",
            Environment::End => "End",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
