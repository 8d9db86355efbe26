//! Shared types used across twinslot crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Name of a service in the declared service set (e.g. "web", "db").
pub type ServiceName = String;

/// One of the two fixed deployment slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotId {
    A,
    B,
}

impl SlotId {
    /// Both slots, in discovery order.
    pub const ALL: [SlotId; 2] = [SlotId::A, SlotId::B];

    /// The slot a fresh system deploys into.
    pub const BOOTSTRAP_TARGET: SlotId = SlotId::B;

    /// The opposite slot.
    pub fn other(self) -> SlotId {
        match self {
            SlotId::A => SlotId::B,
            SlotId::B => SlotId::A,
        }
    }

    /// Lowercase suffix used in project names and storage keys.
    pub fn suffix(self) -> &'static str {
        match self {
            SlotId::A => "a",
            SlotId::B => "b",
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotId::A => f.write_str("A"),
            SlotId::B => f.write_str("B"),
        }
    }
}

impl FromStr for SlotId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "a" | "A" => Ok(SlotId::A),
            "b" | "B" => Ok(SlotId::B),
            other => Err(format!("unknown slot '{other}' (expected A or B)")),
        }
    }
}

/// Compose project name for a slot: `{project}-{suffix}`.
pub fn slot_project(project: &str, slot: SlotId) -> String {
    format!("{project}-{}", slot.suffix())
}

/// Substitute `{project}` (the slot's project name) and `{slot}` in a command.
pub fn expand_command(argv: &[String], project: &str, slot: SlotId) -> Vec<String> {
    let slot_project = slot_project(project, slot);
    argv.iter()
        .map(|arg| {
            arg.replace("{project}", &slot_project)
                .replace("{slot}", slot.suffix())
        })
        .collect()
}
