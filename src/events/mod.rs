//! # Events Module
//!
//! Event-driven progress reporting for the deduplication engine.
//!
//! ## Design
//! The core library emits events through channels, allowing any presentation
//! layer (CLI, GUI, log collector) to subscribe. Every per-file error travels
//! through here as well - nothing is silently swallowed.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         match event {
//!             Event::Layer(LayerEvent::GroupFormed { members, .. }) => {
//!                 println!("group of {}", members.len())
//!             }
//!             _ => {}
//!         }
//!     }
//! });
//!
//! engine.run_with_events(&sender, &mut prompt)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
