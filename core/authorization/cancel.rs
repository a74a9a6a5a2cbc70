//! Cooperative cancellation for the async entry points of this crate.
//!
//! Uses `tokio_util::sync::CancellationToken` directly rather than invent a
//! bespoke token type.
pub use tokio_util::sync::CancellationToken;

use crate::authorization::error::Error;

/// Check a token at a suspension point, before the call it guards returns.
#[inline]
pub fn check(token: &CancellationToken) -> Result<(), Error> {
    if token.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}
