use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::info;

/// Result of the one-shot microphone/speech consent check.
///
/// Set once per session by the gate and immutable afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    Undetermined,
    Granted,
    Denied,
    Restricted,
}

impl AuthorizationStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, AuthorizationStatus::Granted)
    }
}

/// One-shot permission check.
///
/// The first call may suspend while consent resolves; the resolved status
/// is cached and every later call returns it immediately without
/// re-prompting.
#[async_trait::async_trait]
pub trait AuthorizationGate: Send + Sync {
    async fn request_authorization(&self) -> AuthorizationStatus;
}

/// Gate resolving consent from service configuration.
///
/// Headless hosts have no interactive consent dialog; whether this service
/// may open the microphone is an operator decision carried in the config
/// file. The one-shot caching contract is the same one an interactive
/// platform gate would honor.
pub struct ConfigAuthorizationGate {
    capture_allowed: bool,
    resolved: OnceCell<AuthorizationStatus>,
}

impl ConfigAuthorizationGate {
    pub fn new(capture_allowed: bool) -> Self {
        Self {
            capture_allowed,
            resolved: OnceCell::new(),
        }
    }
}

#[async_trait::async_trait]
impl AuthorizationGate for ConfigAuthorizationGate {
    async fn request_authorization(&self) -> AuthorizationStatus {
        *self
            .resolved
            .get_or_init(|| async {
                let status = if self.capture_allowed {
                    AuthorizationStatus::Granted
                } else {
                    AuthorizationStatus::Denied
                };
                info!("microphone authorization resolved: {:?}", status);
                status
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn granted_when_capture_allowed() {
        let gate = ConfigAuthorizationGate::new(true);
        assert_eq!(
            gate.request_authorization().await,
            AuthorizationStatus::Granted
        );
    }

    #[tokio::test]
    async fn denied_when_capture_disallowed() {
        let gate = ConfigAuthorizationGate::new(false);
        assert_eq!(
            gate.request_authorization().await,
            AuthorizationStatus::Denied
        );
    }

    #[tokio::test]
    async fn repeated_calls_return_cached_status() {
        let gate = ConfigAuthorizationGate::new(true);
        let first = gate.request_authorization().await;
        let second = gate.request_authorization().await;
        assert_eq!(first, second);
    }
}
