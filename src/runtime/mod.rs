// src/runtime/mod.rs

//! Core asynchronous primitives: conduits, wait groups, drop guards.

pub mod conduit;
pub(crate) mod drop_guard;
pub mod waitgroup;

pub use conduit::{conduit, ConduitReceiver, ConduitSender, EventReceiver, EventSender};
pub use waitgroup::{WaitGroup, WaitGroupGuard};

pub(crate) use drop_guard::ForwarderDropGuard;

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "panicked with a non-string payload".to_string()
  }
}
