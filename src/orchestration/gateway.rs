use async_trait::async_trait;
use tracing::info;

use crate::config::HttpSettings;
use crate::http_session::{
    AppSessionClient, Credentials, HttpSessionError, MAINTENANCE_ENTER_PATH,
    MAINTENANCE_EXIT_PATH,
};
use crate::models::Application;
use crate::state_machine::FreezeProgress;

/// Seam for driving one application's lifecycle endpoints. Jobs go through
/// this so they can be exercised with test doubles.
#[async_trait]
pub trait AppGateway: Send + Sync {
    async fn enter_maintenance(&self, app: &Application) -> Result<(), HttpSessionError>;

    async fn exit_maintenance(&self, app: &Application) -> Result<(), HttpSessionError>;

    /// The application's own view of freeze progress.
    async fn freeze_progress(&self, app: &Application)
        -> Result<FreezeProgress, HttpSessionError>;
}

/// HTTP implementation: one fresh authenticated session per call, built
/// from the application's hostname and shared connection settings.
pub struct HttpAppGateway {
    settings: HttpSettings,
    credentials: Credentials,
}

impl HttpAppGateway {
    pub fn new(settings: HttpSettings, credentials: Credentials) -> Self {
        Self {
            settings,
            credentials,
        }
    }

    async fn session_for(&self, app: &Application) -> Result<AppSessionClient, HttpSessionError> {
        let base = self.settings.base_uri_for(&app.hostname);
        let mut session = AppSessionClient::new(&base, &self.settings.session_settings())?;
        session.login(&self.credentials).await?;
        Ok(session)
    }
}

#[async_trait]
impl AppGateway for HttpAppGateway {
    async fn enter_maintenance(&self, app: &Application) -> Result<(), HttpSessionError> {
        let session = self.session_for(app).await?;
        session.put(MAINTENANCE_ENTER_PATH).await?;
        info!(application = %app.name, hostname = %app.hostname, "application entered maintenance mode");
        Ok(())
    }

    async fn exit_maintenance(&self, app: &Application) -> Result<(), HttpSessionError> {
        let session = self.session_for(app).await?;
        session.put(MAINTENANCE_EXIT_PATH).await?;
        info!(application = %app.name, hostname = %app.hostname, "application left maintenance mode");
        Ok(())
    }

    async fn freeze_progress(
        &self,
        app: &Application,
    ) -> Result<FreezeProgress, HttpSessionError> {
        let session = self.session_for(app).await?;
        session.freeze_progress().await
    }
}
