//! Hookhost Engine - hook bindings, ordering and dispatch.
//!
//! Plugins attach to named hooks through [`HookBinding`]s. The
//! [`HookTable`] keeps each hook's bindings in the order [`HookOrderer`]
//! derives, and the [`Dispatcher`] walks that order to run actions and
//! filters against the plugins of a registry.

mod binding;
mod dispatch;
mod order;
mod table;

pub use binding::HookBinding;
pub use dispatch::{Dispatcher, FilterOutcome};
pub use order::HookOrderer;
pub use table::HookTable;
