mod helpers;
mod kobo;

pub mod op;
mod secret;

pub use helpers::parse_boolean_flag;
pub use kobo::{Kobo, KoboConversionError, NAIRA_CURRENCY_CODE};
pub use secret::Secret;
