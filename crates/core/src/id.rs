// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed entity identifiers.
//!
//! Every persisted entity carries an integer id assigned by the store on
//! first insert. Zero means "not yet persisted"; the store rejects updates
//! addressed to it.

/// Define a newtype ID wrapper around `i64`.
///
/// Generates `new()`, `raw()`, `is_unsaved()`, `Display`, `From<i64>`,
/// and serde pass-through as a bare integer.
///
/// ```ignore
/// define_id! {
///     /// Doc comment for the ID type.
///     pub struct StoryId;
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap an existing raw id.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// The raw integer value.
            pub const fn raw(&self) -> i64 {
                self.0
            }

            /// True until the store has assigned a real id.
            pub const fn is_unsaved(&self) -> bool {
                self.0 == 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }
    };
}

define_id! {
    /// Identifier of an operator-submitted work item.
    pub struct WorkItemId;
}

define_id! {
    /// Identifier of a planner-produced developer story.
    pub struct StoryId;
}

define_id! {
    /// Identifier of an execution log entry.
    pub struct LogId;
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
