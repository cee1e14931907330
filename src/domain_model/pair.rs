use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier shared by one access token and its refresh record.
/// Carried as the `jti` claim on the access side; a fresh one is
/// generated for every issued pair.
#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct PairId(pub uuid::Uuid);

impl PairId {
    pub fn generate() -> Self {
        PairId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PairId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(PairId)
    }
}
