//! Client-side synchronization layer.
//!
//! Each watcher owns an isolated, ephemeral view of one backend resource
//! (a live prediction or a persisted history series) and keeps it fresh on
//! a timer. State is published through a `tokio::sync::watch` channel;
//! consumers clone the receiver and read whenever they render.
//!
//! Freshness discipline shared by both watchers:
//! - every successful fetch **replaces** the exposed value, never appends;
//! - a failed fetch stores the error string and leaves the last good value
//!   visible (stale-while-revalidate);
//! - every fetch carries a monotonic sequence number, and a response is
//!   discarded unless its sequence number is the latest issued — a slow
//!   early response can never overwrite a newer one;
//! - a hung request stalls only its own cycle; the timer keeps firing.
//!
//! Dropping a watcher aborts its task and timers. In-flight responses then
//! land on a closed channel and are discarded without effect.

pub mod history;
pub mod live;

pub use history::{HistoryOptions, HistoryState, HistoryWatcher};
pub use live::{LiveOptions, LiveResult, LiveState, LiveWatcher};
