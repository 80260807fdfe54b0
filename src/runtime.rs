use std::error::Error;
use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::line_client::LineClient;
use crate::clients::sqlite_store::SqliteStore;
use crate::config::Settings;
use crate::handlers::routes::{self, AppState};
use crate::handlers::webhook::WebhookHandler;
use crate::service::notifier::Notifier;
use crate::service::reminder_service::ReminderJob;
use crate::service::routing::CommandService;
use crate::tasks::recurrence::RecurrenceRegistry;

/// Everything the HTTP routes need, wired around one store and notifier.
pub struct Services {
    pub store: Arc<SqliteStore>,
    pub registry: Arc<RecurrenceRegistry>,
    pub commands: Arc<CommandService>,
    pub webhook: Arc<WebhookHandler>,
}

impl Services {
    pub fn new(settings: &Settings, store: Arc<SqliteStore>, notifier: Arc<dyn Notifier>) -> Self {
        let registry = Arc::new(RecurrenceRegistry::new(
            settings.timezone,
            settings.max_reminder_jobs,
        ));
        let job = Arc::new(ReminderJob::new(
            store.clone(),
            notifier.clone(),
            settings.timezone,
        ));
        let commands = Arc::new(
            CommandService::new(
                store.clone(),
                store.clone(),
                registry.clone(),
                job,
                settings.calendar_url.clone(),
            )
            .with_zero_components(settings.zero_components),
        );
        let webhook = Arc::new(WebhookHandler::new(commands.clone(), notifier));
        Self {
            store,
            registry,
            commands,
            webhook,
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            webhook: self.webhook.clone(),
            store: self.store.clone(),
        }
    }
}

pub async fn run_api(settings: Settings) -> Result<(), Box<dyn Error + Send + Sync>> {
    let token = settings.require_access_token()?;
    let notifier: Arc<dyn Notifier> = Arc::new(LineClient::new(
        settings.line_api_base.clone(),
        token.to_string(),
    ));
    let store = Arc::new(SqliteStore::open(&settings.db_location)?);
    let services = Services::new(&settings, store, notifier);

    // Reminders live in process memory; reload the persisted ones.
    if let Err(err) = services.commands.restore_schedules().await {
        warn!(error = %err, "could not load persisted reminders, starting without them");
    }

    info!(
        port = settings.port,
        db = %settings.db_location.display(),
        tz = %settings.timezone,
        "listening"
    );
    warp::serve(routes::routes(services.app_state()))
        .run(([0, 0, 0, 0], settings.port))
        .await;
    Ok(())
}
