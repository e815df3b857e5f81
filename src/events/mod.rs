//! Event ingestion and replay
//!
//! Turns the line output of `jstest --event` into typed events and replays them
//! to subscribed handlers:
//!
//! 1. [`event`] - Line parsing into [`Event`]s
//! 2. [`timeline`] - Sequential, time-windowed replay cursor
//! 3. [`registry`] - Handler subscriptions with dispatch-safe add/remove
//! 4. [`state_store`] - Handler tracking the latest value per channel
//!
//! # Architecture
//!
//! ```text
//! LineSource ──► parse ──► Timeline ──► Registry ──► Handler (StateStore, ...)
//!                  │
//!                  └──► unknown lines ──► Handler::handle_unknown
//! ```

pub mod error;
pub mod event;
pub mod registry;
pub mod state_store;
pub mod timeline;

pub use error::{FieldError, HandlerError, RegistryError, TimelineError};
pub use event::{parse, Channel, Event, EventKind, RawRecord, EVENT_CATEGORY, INIT_BIT};
pub use registry::{Dispatch, Handler, HandlerId, Registry};
pub use state_store::StateStore;
pub use timeline::{Bound, LineSource, Timeline};
