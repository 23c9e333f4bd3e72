//! Hookhost Core - error, message and configuration types shared by the
//! hookhost crates.

mod aggregate;
pub mod config;
mod context;
mod error;
mod lifecycle;
pub mod messages;

pub use aggregate::{AggregateError, combine};
pub use config::HostConfig;
pub use context::{CallContext, Interrupted};
pub use error::{HostError, InvokeError, Result, ValidationError};
pub use lifecycle::LifecycleState;
pub use messages::{Catalog, MapCatalog, MessageKey, Messages};
