// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Small declarative macros shared by the entity modules.
//!
//! Status enums, entity test builders, and chained setters all follow the
//! same few shapes; these macros keep that boilerplate in one place:
//!
//! - [`simple_display!`] — `Display` for a status enum, one literal per variant
//! - [`builder!`] — a test-only builder for an entity struct
//! - [`setters!`] — chained setter methods on a config/input struct

/// Implement `Display` for an enum by mapping each variant to a literal.
///
/// Used for the status and kind enums, whose display names are the
/// dash-separated spellings the CLI prints (`in-progress`, `user-story`).
/// Variants that carry data take `(..)` to discard it.
///
/// ```ignore
/// crate::simple_display! {
///     StoryStatus {
///         Pending => "pending",
///         InProgress => "in-progress",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($ty:ty { $( $var:ident $(( $($skip:tt)* ))? => $label:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let label = match self {
                    $( Self::$var $(( $($skip)* ))? => $label, )+
                };
                f.write_str(label)
            }
        }
    };
}

/// Generate a test builder for an entity struct.
///
/// Entities like `WorkItem` and `DeveloperStory` have a dozen fields, most
/// of which any given test does not care about; the builder supplies
/// sensible defaults and per-field overrides. Everything generated is
/// gated behind `#[cfg(any(test, feature = "test-support"))]` so nothing
/// leaks into release builds.
///
/// Fields are declared in four groups:
/// - `into { field: Type = default }` — setter accepts `impl Into<Type>`
///   (titles, descriptions)
/// - `set { field: Type = default }` — setter takes the type as-is
///   (ids, statuses, priorities)
/// - `option { field: Type = default }` — stored as `Option<Type>`, the
///   setter wraps its argument in `Some` (timestamps, error messages)
/// - `computed { field: Type = expr }` — no setter; evaluated when
///   `build()` runs (creation timestamps)
///
/// ```ignore
/// crate::builder! {
///     pub struct StoryBuilder => DeveloperStory {
///         into { title: String = "test story" }
///         set { status: StoryStatus = StoryStatus::Pending }
///         option { session_id: String = None }
///         computed { created_at: DateTime<Utc> = clock_origin() }
///     }
/// }
/// ```
#[macro_export]
macro_rules! builder {
    (
        pub struct $name:ident => $entity:ident {
            $(into {
                $( $if_field:ident : $if_ty:ty = $if_default:expr ),* $(,)?
            })?
            $(set {
                $( $sf_field:ident : $sf_ty:ty = $sf_default:expr ),* $(,)?
            })?
            $(option {
                $( $of_field:ident : $of_ty:ty = $of_default:expr ),* $(,)?
            })?
            $(computed {
                $( $cf_field:ident : $cf_ty:ty = $cf_expr:expr ),* $(,)?
            })?
        }
    ) => {
        #[cfg(any(test, feature = "test-support"))]
        pub struct $name {
            $($( $if_field: $if_ty, )*)?
            $($( $sf_field: $sf_ty, )*)?
            $($( $of_field: Option<$of_ty>, )*)?
        }

        #[cfg(any(test, feature = "test-support"))]
        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($( $if_field: $if_default.into(), )*)?
                    $($( $sf_field: $sf_default, )*)?
                    $($( $of_field: $of_default, )*)?
                }
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $name {
            $($(
                pub fn $if_field(mut self, value: impl Into<$if_ty>) -> Self {
                    self.$if_field = value.into();
                    self
                }
            )*)?

            $($(
                pub fn $sf_field(mut self, value: $sf_ty) -> Self {
                    self.$sf_field = value;
                    self
                }
            )*)?

            $($(
                pub fn $of_field(mut self, value: impl Into<$of_ty>) -> Self {
                    self.$of_field = Some(value.into());
                    self
                }
            )*)?

            pub fn build(self) -> $entity {
                $entity {
                    $($( $if_field: self.$if_field, )*)?
                    $($( $sf_field: self.$sf_field, )*)?
                    $($( $of_field: self.$of_field, )*)?
                    $($( $cf_field: $cf_expr, )*)?
                }
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $entity {
            /// Builder pre-filled with test defaults.
            pub fn builder() -> $name {
                $name::default()
            }
        }
    };
}

/// Generate chained setter methods inside an `impl` block.
///
/// The production counterpart of [`builder!`]: input and config structs
/// (`NewWorkItem`, `StoryConfig`, `ExecutionLog`) construct with their
/// required fields and pick up the optional ones through these setters.
/// Field groups mean the same as in [`builder!`], minus `computed`.
///
/// ```ignore
/// impl NewWorkItem {
///     crate::setters! {
///         set { priority: u8 }
///         option { acceptance_criteria: String }
///     }
/// }
/// ```
#[macro_export]
macro_rules! setters {
    (
        $(into {
            $( $if_field:ident : $if_ty:ty ),* $(,)?
        })?
        $(set {
            $( $sf_field:ident : $sf_ty:ty ),* $(,)?
        })?
        $(option {
            $( $of_field:ident : $of_ty:ty ),* $(,)?
        })?
    ) => {
        $($(
            pub fn $if_field(mut self, value: impl Into<$if_ty>) -> Self {
                self.$if_field = value.into();
                self
            }
        )*)?

        $($(
            pub fn $sf_field(mut self, value: $sf_ty) -> Self {
                self.$sf_field = value;
                self
            }
        )*)?

        $($(
            pub fn $of_field(mut self, value: impl Into<$of_ty>) -> Self {
                self.$of_field = Some(value.into());
                self
            }
        )*)?
    };
}
