use drivegate_config::Settings;
use drivegate_services::{
    CredentialManager, GoogleDriveStore, RemoteStore, TreeExporter,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub credentials: Arc<CredentialManager>,
    pub store: Arc<dyn RemoteStore>,
    pub exporter: Arc<TreeExporter>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let timeout = Duration::from_secs(settings.google.http_timeout_secs);
        let credentials = Arc::new(CredentialManager::new(settings.google.clone()));
        let store: Arc<dyn RemoteStore> =
            Arc::new(GoogleDriveStore::new(&settings.drive, timeout));

        Self::with_store(settings, credentials, store)
    }

    /// Builds state around an already constructed store.
    pub fn with_store(
        settings: Settings,
        credentials: Arc<CredentialManager>,
        store: Arc<dyn RemoteStore>,
    ) -> Self {
        let exporter = Arc::new(TreeExporter::new(store.clone(), settings.export.clone()));

        Self {
            settings,
            credentials,
            store,
            exporter,
        }
    }
}
