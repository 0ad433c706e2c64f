// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ledger identifier types.
//!
//! Operation, participant, and call identifiers travel as opaque strings
//! on the wire. An operation id doubles as the ledger file stem on disk;
//! call ids minted here carry the calling participant as a prefix so a
//! stack printout reads as "who is doing what".

use serde::{Deserialize, Serialize};

/// String-newtype identifier with the comparisons the ledger needs.
///
/// The inner string is private; construction goes through `new` or the
/// type's minting constructor.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
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

string_id! {
    /// Unique identifier for one logical distributed operation.
    ///
    /// Stable for the lifetime of the ledger file; doubles as the file
    /// stem of the ledger document on disk.
    OperationId
}

impl OperationId {
    /// Mint a fresh random operation id.
    pub fn mint() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

string_id! {
    /// Identifier for a process taking part in an operation.
    ///
    /// Participants name themselves; there is no minting constructor.
    ParticipantId
}

string_id! {
    /// Identifier for one call frame, unique within its operation.
    CallId
}

/// Length of the random tag appended to minted call ids.
const CALL_TAG_LEN: usize = 12;

impl CallId {
    /// Mint a call id for a participant's next nested invocation.
    ///
    /// The participant name is kept as a prefix, followed by a random
    /// tag, so ids stay unique within the operation without any shared
    /// counter across processes.
    pub fn mint(participant: &ParticipantId) -> Self {
        let tag = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", participant.as_str(), &tag[..CALL_TAG_LEN]))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
