//! Bearer token caching with expiry-aware refresh.

mod cache;
mod exchange;
mod tokens;

pub use cache::{TokenCache, DEFAULT_SAFETY_MARGIN_SECS};
pub use exchange::{Clock, SystemClock, TokenExchange};
pub use tokens::{CachedToken, TokenGrant};
