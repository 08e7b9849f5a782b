pub mod metrics;
pub mod prompts;
pub mod providers;
pub mod text;
pub mod wisdom;

pub use wisdom::{QuoteOutcome, WisdomError, WisdomService};
