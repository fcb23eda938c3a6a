use std::sync::Arc;

use crate::config::AppConfig;
use crate::db;
use crate::mail::{LogMailer, Mailer, SmtpMailer};
use crate::products::repo::{PgProductCatalog, ProductCatalog};
use crate::storage::{Storage, StorageClient};
use crate::users::repo::{PgResetTokenStore, PgUserDirectory, ResetTokenStore, UserDirectory};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserDirectory>,
    pub reset_tokens: Arc<dyn ResetTokenStore>,
    pub products: Arc<dyn ProductCatalog>,
    pub mailer: Arc<dyn Mailer>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let pool = db::connect(&config.database_url).await?;
        db::migrate(&pool).await;

        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
            None => {
                tracing::warn!("SMTP_HOST not set; emails will only be logged");
                Arc::new(LogMailer)
            }
        };

        let storage = Arc::new(Storage::new(&config.storage).await?) as Arc<dyn StorageClient>;

        Ok(Self {
            users: Arc::new(PgUserDirectory::new(pool.clone())),
            reset_tokens: Arc::new(PgResetTokenStore::new(pool.clone())),
            products: Arc::new(PgProductCatalog::new(pool)),
            mailer,
            storage,
            config,
        })
    }
}
