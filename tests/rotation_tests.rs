use cadenza::application_impl::{
    Argon2SecretHasher, CodecConfig, JwtHs512Codec, RotationConfig, RotationService,
};
use cadenza::application_port::{
    AccessToken, RefreshToken, TokenCodec, TokenError, TokenService,
};
use cadenza::domain_model::UserId;
use cadenza::domain_port::{IpChangeNotifier, RefreshTokenRepo};
use cadenza::infra_memory::InMemoryRefreshTokenRepo;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct RecordingNotifier {
    calls: Mutex<Vec<(UserId, String, String)>>,
}

impl RecordingNotifier {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(UserId, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IpChangeNotifier for RecordingNotifier {
    async fn notify_ip_change(
        &self,
        user: UserId,
        old_ip: &str,
        new_ip: &str,
    ) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((user, old_ip.to_owned(), new_ip.to_owned()));
        Ok(())
    }
}

struct Harness {
    service: Arc<RotationService>,
    repo: Arc<InMemoryRefreshTokenRepo>,
    codec: Arc<JwtHs512Codec>,
    notifier: Arc<RecordingNotifier>,
}

fn harness(access_ttl: Duration, refresh_ttl: Duration) -> Harness {
    let codec = Arc::new(JwtHs512Codec::new(CodecConfig {
        signing_key: b"rotation-test-key".to_vec(),
        access_ttl,
    }));
    let repo = Arc::new(InMemoryRefreshTokenRepo::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let service = Arc::new(RotationService::new(
        repo.clone(),
        codec.clone(),
        Arc::new(Argon2SecretHasher),
        notifier.clone(),
        RotationConfig {
            refresh_ttl,
            notify_timeout: Duration::from_secs(1),
        },
    ));

    Harness {
        service,
        repo,
        codec,
        notifier,
    }
}

fn default_harness() -> Harness {
    harness(Duration::from_secs(300), Duration::from_secs(3600))
}

fn some_user() -> UserId {
    UserId(uuid::Uuid::new_v4())
}

#[tokio::test]
async fn issued_access_jti_matches_persisted_record() {
    let h = default_harness();
    let user = some_user();

    let pair = h.service.issue(user, "203.0.113.7").await.unwrap();

    let claims = h.codec.parse_access(&pair.access_token).await.unwrap();
    let record = h.repo.get(claims.pair_id).await.unwrap();

    assert_eq!(record.id, claims.pair_id);
    assert_eq!(record.user_id, user);
    assert_eq!(record.issued_ip, "203.0.113.7");
    assert!(!record.is_used);
}

#[tokio::test]
async fn rotation_from_same_ip_mints_unrelated_pair() {
    let h = default_harness();
    let user = some_user();

    let first = h.service.issue(user, "203.0.113.7").await.unwrap();
    let second = h
        .service
        .rotate_by_refresh(&first.refresh_token, "203.0.113.7")
        .await
        .unwrap();

    let old_id = h.codec.parse_access(&first.access_token).await.unwrap().pair_id;
    let new_id = h
        .codec
        .parse_access(&second.access_token)
        .await
        .unwrap()
        .pair_id;

    assert_ne!(old_id, new_id);
    assert!(h.repo.get(old_id).await.unwrap().is_used);
    assert!(!h.repo.get(new_id).await.unwrap().is_used);
}

#[tokio::test]
async fn second_rotation_is_rejected_from_any_ip() {
    let h = default_harness();

    let pair = h.service.issue(some_user(), "203.0.113.7").await.unwrap();
    h.service
        .rotate_by_refresh(&pair.refresh_token, "203.0.113.7")
        .await
        .unwrap();

    // replay from the original address
    assert!(matches!(
        h.service
            .rotate_by_refresh(&pair.refresh_token, "203.0.113.7")
            .await,
        Err(TokenError::TokenUsed)
    ));

    // and from somewhere else entirely
    assert!(matches!(
        h.service
            .rotate_by_refresh(&pair.refresh_token, "198.51.100.1")
            .await,
        Err(TokenError::TokenUsed)
    ));
}

#[tokio::test]
async fn corrupted_refresh_token_is_invalid() {
    let h = default_harness();

    for garbage in ["", "%%%", "dG90YWxseS1ub3QtYS10b2tlbg"] {
        assert!(matches!(
            h.service
                .rotate_by_refresh(&RefreshToken(garbage.to_owned()), "203.0.113.7")
                .await,
            Err(TokenError::TokenInvalid)
        ));
    }
}

#[tokio::test]
async fn unknown_pair_id_surfaces_record_not_found() {
    let h = default_harness();

    // structurally fine, but nothing was ever stored under this id
    let token = h
        .codec
        .encode_refresh(cadenza::domain_model::PairId::generate(), "secret")
        .await
        .unwrap();

    assert!(matches!(
        h.service.rotate_by_refresh(&token, "203.0.113.7").await,
        Err(TokenError::RecordNotFound)
    ));
}

#[tokio::test]
async fn expired_refresh_token_is_rejected() {
    let h = harness(Duration::from_secs(300), Duration::ZERO);

    let pair = h.service.issue(some_user(), "203.0.113.7").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(matches!(
        h.service
            .rotate_by_refresh(&pair.refresh_token, "203.0.113.7")
            .await,
        Err(TokenError::TokenExpired)
    ));
}

#[tokio::test]
async fn ip_mismatch_notifies_without_consuming() {
    let h = default_harness();
    let user = some_user();

    let pair = h.service.issue(user, "203.0.113.7").await.unwrap();

    assert!(matches!(
        h.service
            .rotate_by_refresh(&pair.refresh_token, "198.51.100.1")
            .await,
        Err(TokenError::IpMismatch)
    ));

    let calls = h.notifier.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], (user, "203.0.113.7".to_owned(), "198.51.100.1".to_owned()));

    // the legitimate holder can still rotate
    h.service
        .rotate_by_refresh(&pair.refresh_token, "203.0.113.7")
        .await
        .unwrap();
}

#[tokio::test]
async fn wrong_kind_token_is_invalid_on_either_path() {
    let h = default_harness();

    let pair = h.service.issue(some_user(), "203.0.113.7").await.unwrap();

    // a signed JWT handed to the refresh path
    let access_as_refresh = RefreshToken(pair.access_token.0.clone());
    assert!(matches!(
        h.service
            .rotate_by_refresh(&access_as_refresh, "203.0.113.7")
            .await,
        Err(TokenError::TokenInvalid)
    ));

    // an opaque refresh blob handed to the access path
    let refresh_as_access = AccessToken(pair.refresh_token.0.clone());
    assert!(matches!(
        h.service
            .rotate_by_access(&refresh_as_access, "203.0.113.7")
            .await,
        Err(TokenError::TokenInvalid)
    ));
}

#[tokio::test]
async fn rotation_by_access_token_consumes_the_pair() {
    let h = default_harness();
    let user = some_user();

    let pair = h.service.issue(user, "203.0.113.7").await.unwrap();
    let rotated = h
        .service
        .rotate_by_access(&pair.access_token, "203.0.113.7")
        .await
        .unwrap();

    let old_id = h.codec.parse_access(&pair.access_token).await.unwrap().pair_id;
    let new_id = h
        .codec
        .parse_access(&rotated.access_token)
        .await
        .unwrap()
        .pair_id;
    assert_ne!(old_id, new_id);

    // both halves of the consumed pair are now dead
    assert!(matches!(
        h.service
            .rotate_by_access(&pair.access_token, "203.0.113.7")
            .await,
        Err(TokenError::TokenUsed)
    ));
    assert!(matches!(
        h.service
            .rotate_by_refresh(&pair.refresh_token, "203.0.113.7")
            .await,
        Err(TokenError::TokenUsed)
    ));
}

#[tokio::test]
async fn access_rotation_rejects_foreign_ip_without_consuming() {
    let h = default_harness();
    let user = some_user();

    let pair = h.service.issue(user, "203.0.113.7").await.unwrap();

    assert!(matches!(
        h.service
            .rotate_by_access(&pair.access_token, "198.51.100.1")
            .await,
        Err(TokenError::IpMismatch)
    ));
    assert_eq!(h.notifier.calls().len(), 1);

    h.service
        .rotate_by_access(&pair.access_token, "203.0.113.7")
        .await
        .unwrap();
}

#[tokio::test]
async fn expired_access_token_is_rejected() {
    let h = harness(Duration::ZERO, Duration::from_secs(3600));

    let pair = h.service.issue(some_user(), "203.0.113.7").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(matches!(
        h.service
            .rotate_by_access(&pair.access_token, "203.0.113.7")
            .await,
        Err(TokenError::TokenExpired)
    ));
}

#[tokio::test]
async fn tampered_access_token_is_invalid() {
    let h = default_harness();

    let pair = h.service.issue(some_user(), "203.0.113.7").await.unwrap();
    let mut raw = pair.access_token.0.clone();
    raw.truncate(raw.len() - 4);

    assert!(matches!(
        h.service
            .rotate_by_access(&AccessToken(raw), "203.0.113.7")
            .await,
        Err(TokenError::TokenInvalid)
    ));
}

#[tokio::test]
async fn concurrent_rotations_have_exactly_one_winner() {
    let h = default_harness();

    let pair = h.service.issue(some_user(), "203.0.113.7").await.unwrap();

    let attempts = 8;
    let tasks: Vec<_> = (0..attempts)
        .map(|_| {
            let service = h.service.clone();
            let token = pair.refresh_token.clone();
            tokio::spawn(async move { service.rotate_by_refresh(&token, "203.0.113.7").await })
        })
        .collect();

    let results = futures_util::future::join_all(tasks).await;

    let mut winners = 0;
    let mut already_used = 0;
    for result in results {
        match result.unwrap() {
            Ok(_) => winners += 1,
            Err(TokenError::TokenUsed) => already_used += 1,
            Err(e) => panic!("unexpected rotation error: {e}"),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(already_used, attempts - 1);
}
