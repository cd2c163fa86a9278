//! # Events Module
//!
//! Progress reporting from the core to whichever front end is listening.
//!
//! Long operations (indexing, batch generation, watching) take an
//! [`EventSender`]; the CLI drains the matching [`EventReceiver`] on its
//! own thread to drive progress bars.

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
