//! LAN reachability probe
//!
//! Before each processing cycle the orchestrator asks whether the LAN
//! endpoint answers at all. The probe wraps a dedicated [`WebDavClient`]
//! whose underlying HTTP client carries a short timeout, so an unplugged
//! cable costs one bounded round-trip per cycle rather than stalling the
//! whole batch.

use tracing::debug;

use crate::client::WebDavClient;
use crate::WebDavError;

/// Per-cycle availability check for the LAN endpoint
pub struct LanProbe {
    client: WebDavClient,
}

impl LanProbe {
    /// Creates a probe over a LAN-variant client.
    ///
    /// The client should be built with a probe-specific HTTP client whose
    /// timeout is much shorter than the upload timeout.
    pub fn new(client: WebDavClient) -> Self {
        Self { client }
    }

    /// Returns whether the LAN endpoint currently answers.
    ///
    /// Probes the remote root collection. A timeout means "not reachable"
    /// and maps to `Ok(false)`.
    ///
    /// # Errors
    /// Every non-timeout failure is propagated, unexpected protocol
    /// statuses included; only the bounded wait for an answer is a
    /// yes/no question, everything else is the caller's problem.
    pub async fn is_reachable(&self) -> Result<bool, WebDavError> {
        match self.client.check_directory_exists("").await {
            Ok(_) => Ok(true),
            Err(WebDavError::Network(e)) if e.is_timeout() => {
                debug!("LAN probe timed out");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
