//! Data model for the encrypted-record reveal ledger: identifiers, records,
//! pending requests, events, canonical encodings and digests.

pub mod types;
pub mod events;
pub mod encode;
pub mod digest;

// Re-export all public items from modules for convenience
pub use types::*;
pub use events::*;
pub use encode::*;
pub use digest::*;
