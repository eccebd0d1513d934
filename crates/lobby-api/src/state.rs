use std::sync::Arc;

use lobby_store::Store;

use crate::notify::Notifier;

pub type AppState = Arc<AppStateInner>;

/// Shared application state. Constructed once in the server binary and
/// injected through axum state; handlers hold no globals.
pub struct AppStateInner {
    pub store: Store,
    pub notifier: Notifier,
}
