mod ip_change_notifier;
mod refresh_token_repo;

pub use ip_change_notifier::*;
pub use refresh_token_repo::*;
