mod credits;

pub mod op;

pub use credits::{Credits, CreditsConversionError};
