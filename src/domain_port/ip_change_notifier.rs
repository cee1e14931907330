use crate::domain_model::UserId;

/// Out-of-band warning channel for rotation attempts arriving from an
/// address other than the one the pair was issued to. Best-effort: the
/// engine logs failures and never propagates them.
#[async_trait::async_trait]
pub trait IpChangeNotifier: Send + Sync {
    async fn notify_ip_change(
        &self,
        user: UserId,
        old_ip: &str,
        new_ip: &str,
    ) -> anyhow::Result<()>;
}
