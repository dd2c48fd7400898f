pub mod config;
pub mod errors;
pub mod gap;
pub mod layout;
pub mod types;

pub use config::{ComposerConfig, JitterConfig};
pub use errors::StripeError;
pub use gap::{SeqGapTracker, SeqStatus};
pub use layout::{stripe_layout, StripeRect};
pub use types::*;
