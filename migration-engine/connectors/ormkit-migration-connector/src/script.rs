//! The migration script model (spec §4.E "Script model", §6 "Migration
//! script file format"). A script is data: a revision, its parent, a
//! message, and two operation lists. Nothing here executes third-party
//! code — extracting a script's metadata is a plain deserialize, which is
//! what spec §4.E means by "parsed statically... via a restricted
//! evaluator": the evaluator *is* the deserializer, and it cannot run
//! anything beyond producing this struct (§9 "Migration-script loading").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::operation::Operation;

/// One migration: immutable `revision`, a nullable `down_revision`, and
/// the operation lists for each direction (spec §4.E "Script model").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationScript {
    pub revision: String,
    pub down_revision: Option<String>,
    pub message: String,
    #[serde(default)]
    pub branch_labels: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub upgrade: Vec<Operation>,
    pub downgrade: Vec<Operation>,
}

impl MigrationScript {
    pub fn new(revision: impl Into<String>, down_revision: Option<String>, message: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            revision: revision.into(),
            down_revision,
            message: message.into(),
            branch_labels: Vec::new(),
            depends_on: Vec::new(),
            created_at,
            upgrade: Vec::new(),
            downgrade: Vec::new(),
        }
    }

    /// Append an operation to both the upgrade list and, if reversible,
    /// the front of the downgrade list (downgrade runs in reverse
    /// definition order, spec §4.E "Runner").
    pub fn push(&mut self, operation: Operation) {
        if let Some(reverse) = operation.reverse() {
            self.downgrade.insert(0, reverse);
        }
        self.upgrade.push(operation);
    }

    /// `true` once every upgrade operation was reversible at authoring
    /// time, i.e. a plain `downgrade(head) -> base` will fully restore the
    /// prior schema (spec §8 "Migration round-trip").
    pub fn is_fully_reversible(&self) -> bool {
        self.downgrade.len() == self.upgrade.len()
    }
}
