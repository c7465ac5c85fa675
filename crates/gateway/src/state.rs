use crate::projection::ProjectionStore;
use crate::subscription::SubscriptionManager;

/// Shared state for the Gateway's HTTP/WebSocket handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub projections: ProjectionStore,
    pub subscriptions: SubscriptionManager,
    pub require_user_id: bool,
}

impl GatewayState {
    pub fn new(require_user_id: bool) -> Self {
        Self {
            projections: ProjectionStore::new(),
            subscriptions: SubscriptionManager::new(),
            require_user_id,
        }
    }
}
