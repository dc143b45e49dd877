//! Core data models for account detection and display

pub mod identity;
pub mod settings;
pub mod snapshot;
pub mod display;
pub mod message;

pub use identity::*;
pub use settings::*;
pub use snapshot::*;
pub use display::*;
pub use message::*;
