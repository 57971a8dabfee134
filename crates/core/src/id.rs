// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newtype wrappers for externally-supplied identifiers.
//!
//! Unlike identifiers minted locally (which would want a generator), every ID
//! in this crate is handed to us by a caller or by the PM service, so these
//! wrappers exist purely to stop a `TaskId` and an `AgentId` from being
//! accidentally swapped at a call site.

use std::borrow::Borrow;
use std::fmt;

macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_string_id! {
    /// Identifies an agent session across restarts; stable for the lifetime of
    /// one worker (not regenerated per task).
    pub struct AgentId;
}

define_string_id! {
    /// A PM-service task identifier. Opaque beyond round-tripping.
    pub struct TaskId;
}

define_string_id! {
    /// Identifies one MCP client/supervisor instance for registry bookkeeping.
    pub struct ClientId;
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
