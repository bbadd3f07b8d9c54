//! Collections - the four named record groups of the site
//!
//! Each collection has two names: the key used inside the local blob
//! (`resources`) and the table name used by the hosted object storage
//! (`Resources`).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Shared learning materials
    Resources,
    /// Links to coding practice sites
    Coding,
    /// Past and upcoming club events
    Events,
    /// Public message board
    Messages,
}

impl Collection {
    /// Key of this collection inside the local blob
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Resources => "resources",
            Collection::Coding => "coding",
            Collection::Events => "events",
            Collection::Messages => "messages",
        }
    }

    /// Table name in the hosted object storage
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Resources => "Resources",
            Collection::Coding => "Coding",
            Collection::Events => "Events",
            Collection::Messages => "Messages",
        }
    }

    pub fn all() -> &'static [Collection] {
        &[
            Collection::Resources,
            Collection::Coding,
            Collection::Events,
            Collection::Messages,
        ]
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "resources" | "resource" => Ok(Collection::Resources),
            "coding" | "codinglink" | "links" => Ok(Collection::Coding),
            "events" | "event" => Ok(Collection::Events),
            "messages" | "message" | "board" => Ok(Collection::Messages),
            _ => Err(Error::UnknownCollection(s.to_string())),
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
