//! Farm world definition, runtime state, and the reset timing rules.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::location::{Border, Environment};

/// Floors a timestamp to the start of its minute.
///
/// Promotion timestamps are always minute-aligned so reset deadlines land on
/// wall-clock minute boundaries.
pub fn minute_floor(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

// =============================================================================
// Definition
// =============================================================================

/// Operator-supplied configuration for one farm world. Immutable at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmWorldDefinition {
    /// Unique key; also the prefix of generated instance names.
    pub name: String,
    /// Alternative names accepted when resolving the world.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Gate string evaluated by outer layers; carried verbatim.
    #[serde(default)]
    pub permission: Option<String>,
    /// Visit charge applied by outer layers; carried verbatim.
    #[serde(default)]
    pub price: f64,
    /// Per-player re-visit cooldown in seconds. Zero disables the gate.
    #[serde(default)]
    pub cooldown: u32,
    /// Reset period in minutes.
    pub timer: u32,
    #[serde(default)]
    pub environment: Environment,
    /// Custom generator id handed to the provisioner.
    #[serde(default)]
    pub generator: Option<String>,
    #[serde(default)]
    pub border: Option<Border>,
    /// Template instance names; when set, rotation copies a randomly chosen
    /// template instead of generating terrain.
    #[serde(default)]
    pub templates: Option<Vec<String>>,
}

impl FarmWorldDefinition {
    pub fn new(name: impl Into<String>, timer: u32) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            permission: None,
            price: 0.0,
            cooldown: 0,
            timer,
            environment: Environment::Normal,
            generator: None,
            border: None,
            templates: None,
        }
    }

    pub fn with_cooldown(mut self, seconds: u32) -> Self {
        self.cooldown = seconds;
        self
    }

    pub fn with_border(mut self, border: Border) -> Self {
        self.border = Some(border);
        self
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// True when `candidate` equals the name or any alias, ignoring case.
    pub fn matches_name(&self, candidate: &str) -> bool {
        self.name.eq_ignore_ascii_case(candidate)
            || self
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(candidate))
    }

    /// Checks the field constraints an operator-authored definition must hold.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("farm world name cannot be empty"));
        }
        if self.timer == 0 {
            return Err(DomainError::validation(format!(
                "farm world {}: timer must be at least one minute",
                self.name
            )));
        }
        if let Some(border) = &self.border {
            if border.size <= 0.0 {
                return Err(DomainError::validation(format!(
                    "farm world {}: border size must be positive",
                    self.name
                )));
            }
        }
        if let Some(templates) = &self.templates {
            if templates.is_empty() || templates.iter().any(|t| t.trim().is_empty()) {
                return Err(DomainError::validation(format!(
                    "farm world {}: templates must be a non-empty list of world names",
                    self.name
                )));
            }
        }
        Ok(())
    }

    pub fn reset_period(&self) -> Duration {
        Duration::minutes(i64::from(self.timer))
    }

    pub fn cooldown_duration(&self) -> Duration {
        Duration::seconds(i64::from(self.cooldown))
    }
}

// =============================================================================
// State
// =============================================================================

/// Mutable runtime state of a farm world. Persisted across restarts.
///
/// `loaded` and `enabled` describe the in-process situation only and are
/// rebuilt on startup, so they are skipped during serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmWorldState {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub current_world_name: Option<String>,
    #[serde(default)]
    pub next_world_name: Option<String>,
    /// Minute-floored promotion timestamp of the current instance.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Instance present in the world host right now.
    #[serde(skip)]
    pub loaded: bool,
    /// Lifecycle fully started (instance loaded, pool primed).
    #[serde(skip)]
    pub enabled: bool,
}

impl FarmWorldState {
    /// True when the current instance has outlived the reset period, or no
    /// usable instance exists at all.
    pub fn is_reset_due(&self, timer: u32, now: DateTime<Utc>) -> bool {
        if self.current_world_name.is_none() {
            return true;
        }
        match self.created_at {
            Some(created) => created + Duration::minutes(i64::from(timer)) <= now,
            None => true,
        }
    }

    /// True when the next instance should be pre-generated: one minute before
    /// the reset deadline, and only while no next instance is known yet.
    ///
    /// The lead is the literal `timer - 1` minutes, so a timer of one minute
    /// or less makes pre-generation due the moment a world is promoted.
    pub fn is_pregeneration_due(&self, timer: u32, now: DateTime<Utc>) -> bool {
        if self.next_world_name.is_some() || self.current_world_name.is_none() {
            return false;
        }
        match self.created_at {
            Some(created) => created + Duration::minutes(i64::from(timer) - 1) <= now,
            None => false,
        }
    }

    /// Installs a new current instance: clears any pre-generated next and
    /// floors the promotion timestamp to the minute. Returns the displaced
    /// current instance name.
    pub fn promote(&mut self, new_world: impl Into<String>, now: DateTime<Utc>) -> Option<String> {
        let old = self.current_world_name.replace(new_world.into());
        self.next_world_name = None;
        self.created_at = Some(minute_floor(now));
        old
    }

    /// Instant at which the running timer elapses, if a promotion happened.
    pub fn reset_at(&self, timer: u32) -> Option<DateTime<Utc>> {
        self.created_at
            .map(|created| created + Duration::minutes(i64::from(timer)))
    }
}
