use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::server::{LogIpChangeNotifier, WebhookIpChangeNotifier};
use crate::settings::Settings;
use anyhow::{anyhow, bail};
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;

pub struct Server {
    pub token_service: Arc<dyn TokenService>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let signing_key = hex::decode(&settings.token.signing_key_hex)
            .map_err(|e| anyhow!("token.signing_key_hex is not valid hex: {e}"))?;

        let codec: Arc<dyn TokenCodec> = Arc::new(JwtHs512Codec::new(CodecConfig {
            signing_key,
            access_ttl: Duration::from_secs(settings.token.access_ttl_secs),
        }));
        let hasher: Arc<dyn SecretHasher> = Arc::new(Argon2SecretHasher);

        let repo: Arc<dyn RefreshTokenRepo> = match settings.store.backend.as_str() {
            "mysql" => {
                let dsn = settings
                    .store
                    .dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("store.dsn is required for the mysql backend"))?;
                let pool = Pool::<MySql>::connect(dsn).await?;
                let repo = MySqlRefreshTokenRepo::new(pool);
                repo.ensure_schema().await?;
                Arc::new(repo)
            }
            "memory" => Arc::new(InMemoryRefreshTokenRepo::new()),
            other => bail!("unknown store backend: {other}"),
        };

        let notify_timeout = Duration::from_millis(settings.notifier.timeout_ms);
        let notifier: Arc<dyn IpChangeNotifier> = match settings.notifier.backend.as_str() {
            "webhook" => {
                let url = settings
                    .notifier
                    .webhook_url
                    .as_deref()
                    .ok_or_else(|| anyhow!("notifier.webhook_url is required for webhook"))?;
                Arc::new(WebhookIpChangeNotifier::try_new(url, notify_timeout)?)
            }
            "log" => Arc::new(LogIpChangeNotifier),
            other => bail!("unknown notifier backend: {other}"),
        };

        let token_service: Arc<dyn TokenService> = Arc::new(RotationService::new(
            repo,
            codec,
            hasher,
            notifier,
            RotationConfig {
                refresh_ttl: Duration::from_secs(settings.token.refresh_ttl_secs),
                notify_timeout,
            },
        ));

        Ok(Server { token_service })
    }
}
