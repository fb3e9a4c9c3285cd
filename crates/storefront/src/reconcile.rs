//! Session context and the mutate-then-reconcile pipeline.
//!
//! The client never renders from locally patched state. A server mutation
//! is always followed by a full re-fetch of the canonical data, and only
//! that re-fetched data is rendered. This costs one extra round trip per
//! mutation and keeps the displayed quantities and prices equal to the
//! server's last answer.

use std::fmt::Debug;
use std::future::Future;

use tracing::{debug, warn};

use crate::api::ApiError;
use crate::error::{AppError, Result};

/// Who the page is acting for, supplied by the page shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Session {
    authenticated: bool,
}

impl Session {
    /// A signed-out shopper; cart state lives in client storage.
    #[must_use]
    pub const fn guest() -> Self {
        Self {
            authenticated: false,
        }
    }

    /// A signed-in shopper; cart state lives on the server.
    #[must_use]
    pub const fn signed_in() -> Self {
        Self {
            authenticated: true,
        }
    }

    /// Build from the page's authentication flag.
    #[must_use]
    pub const fn from_flag(authenticated: bool) -> Self {
        Self { authenticated }
    }

    /// Whether the shopper is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

/// Run `mutation`, then re-fetch with `refetch`, then `render` the
/// re-fetched data.
///
/// The mutation's own response is only logged; what gets rendered is
/// always the re-fetch. That holds when the server rejects the mutation
/// too (a 404 for an unknown product, say): the rejection is logged and
/// the page is still redrawn from the server. Only a mutation that never
/// reached the server skips the re-fetch and leaves the page as it was.
///
/// # Errors
///
/// Returns a transport error from the mutation, or the first error from
/// the re-fetch or the render.
pub async fn mutate_then_reconcile<A, T, M, R, F>(
    mutation: M,
    refetch: F,
    render: impl FnOnce(&T) -> Result<()>,
) -> Result<T>
where
    A: Debug,
    M: Future<Output = std::result::Result<A, ApiError>>,
    F: FnOnce() -> R,
    R: Future<Output = std::result::Result<T, ApiError>>,
{
    match mutation.await.map_err(AppError::from) {
        Ok(ack) => debug!(ack = ?ack, "Mutation acknowledged, re-fetching"),
        Err(e) if e.is_transport() => return Err(e),
        Err(e) => warn!(error = %e, "Mutation rejected by the server, re-fetching anyway"),
    }

    let fresh = refetch().await?;
    render(&fresh)?;
    Ok(fresh)
}
