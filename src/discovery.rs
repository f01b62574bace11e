//! First-match instrument discovery.
//!
//! Walks the resource list the transport layer reports and keeps the first
//! resource a session opens on. Probe failures are expected on a real bus
//! (other instruments, stale entries) and are skipped, not surfaced.

use log::{debug, info};

use crate::error::{AppResult, DaqError};
use crate::session::{Session, SessionOptions};
use crate::transport::ResourceManager;

/// Probe every available resource and return a session on the first one
/// that opens (and, when configured, passes the identity check). No further
/// candidates are touched after a success.
pub fn find_instrument(
    manager: &dyn ResourceManager,
    options: &SessionOptions,
) -> AppResult<Session> {
    for resource in manager.list_resources()? {
        match Session::open(manager, &resource, options) {
            Ok(session) => {
                info!("found instrument on {}", resource);
                return Ok(session);
            }
            Err(e) => {
                debug!("skipping resource '{}': {}", resource, e);
            }
        }
    }
    Err(DaqError::Connection(
        "no matching instrument found".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FIRMWARE_IDENTITY;
    use crate::transport::mock::MockResourceManager;
    use std::time::Duration;

    fn options() -> SessionOptions {
        SessionOptions::default().with_settle(Duration::ZERO)
    }

    #[test]
    fn test_first_working_resource_wins() {
        let manager = MockResourceManager::new().with_resources(&["A", "B", "C", "D"], &["C"]);
        let session = find_instrument(&manager, &options()).unwrap();

        assert_eq!(session.resource(), "C");
        assert_eq!(session.identity(), FIRMWARE_IDENTITY);
        // "D" must not have been probed after the success on "C".
        assert_eq!(
            manager.attempts(),
            vec!["A".to_string(), "B".to_string(), "C".to_string()]
        );
    }

    #[test]
    fn test_no_instrument_found() {
        let manager = MockResourceManager::new().with_resources(&["A", "B"], &[]);
        let err = find_instrument(&manager, &options()).unwrap_err();
        assert!(matches!(err, DaqError::Connection(_)));
        assert_eq!(manager.attempts().len(), 2);
    }

    #[test]
    fn test_identity_mismatch_is_skipped() {
        // The device on "A" opens but reports the wrong identity; discovery
        // must move on rather than abort.
        let manager = MockResourceManager::new()
            .with_identity("ACME,Toaster,0,1")
            .with_resources(&["A"], &["A"]);
        let opts = options().with_expected_identity(FIRMWARE_IDENTITY);

        let err = find_instrument(&manager, &opts).unwrap_err();
        assert!(matches!(err, DaqError::Connection(_)));
        assert!(manager.state().lock().unwrap().released);
    }

    #[test]
    fn test_default_options_reject_foreign_instrument() {
        // Nothing configured beyond the defaults: discovery must still
        // refuse a device that answers with somebody else's identity.
        let manager = MockResourceManager::new().with_identity("ACME,Toaster,0,1");

        let err = find_instrument(&manager, &options()).unwrap_err();
        assert!(matches!(err, DaqError::Connection(_)));
        assert!(manager.state().lock().unwrap().released);
    }
}
