use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::{
    coerce,
    dto::{PreferencesUpdate, SignupRequest},
    error::AccountError,
    password::{hash_password, verify_password},
    repo_types::{SessionUser, UserProfile, UserRecord, DEFAULT_MIN_RATING},
};
use crate::store::{RecordStore, Store};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Signup rules that need no store access, in the order they are reported.
pub(crate) fn validate_signup(req: &SignupRequest) -> Result<(), AccountError> {
    let first = req.first_name.as_deref().unwrap_or("").trim();
    let last = req.last_name.as_deref().unwrap_or("").trim();
    if first.is_empty() || last.is_empty() {
        return Err(AccountError::InvalidName);
    }

    match present(&req.email) {
        Some(email) if is_valid_email(email) => {}
        _ => return Err(AccountError::InvalidEmail),
    }

    let password = match present(&req.password) {
        Some(p) if p.chars().count() >= MIN_PASSWORD_LEN => p,
        _ => return Err(AccountError::WeakPassword),
    };

    if req.confirm_password.as_deref() != Some(password) {
        return Err(AccountError::PasswordMismatch);
    }
    Ok(())
}

/// Account rules on top of a record store handle.
///
/// Every call loads a full snapshot and mutating calls write the whole
/// snapshot back. Mutations are serialized through `writer` so two requests
/// in this process never save over each other.
pub struct AccountService {
    store: Arc<dyn RecordStore>,
    writer: Mutex<()>,
}

impl AccountService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            writer: Mutex::new(()),
        }
    }

    /// Write failures are logged and otherwise ignored.
    async fn persist(&self, store: &Store) {
        if let Err(e) = self.store.save(store).await {
            error!(error = %e, "failed to persist user store");
        }
    }

    pub async fn create_account(&self, req: SignupRequest) -> Result<u64, AccountError> {
        validate_signup(&req)?;
        // Validated above, so both are present.
        let email = req.email.unwrap_or_default();
        let password = req.password.unwrap_or_default();

        // Argon2 is slow; keep it off the async workers and outside the lock.
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AccountError::Internal(e.into()))?
            .map_err(|e| {
                error!(error = %e, "password hashing failed");
                AccountError::Internal(e)
            })?;

        let _guard = self.writer.lock().await;
        let mut store = self.store.load().await;

        if store.find_by_email(&email).is_some() {
            warn!(email = %email, "email already registered");
            return Err(AccountError::EmailTaken);
        }

        let id = store.next_id;
        store.users.push(UserRecord {
            id,
            first_name: req.first_name.unwrap_or_default().trim().to_string(),
            last_name: req.last_name.unwrap_or_default().trim().to_string(),
            email,
            phone: req.phone.unwrap_or_default(),
            password_hash,
            preferences: Vec::new(),
            dietary_restrictions: Vec::new(),
            cuisine_types: Vec::new(),
            price_range: String::new(),
            min_rating: DEFAULT_MIN_RATING,
            has_preferences: false,
            created_at: OffsetDateTime::now_utc(),
        });
        store.next_id += 1;
        self.persist(&store).await;

        info!(user_id = id, "user registered");
        Ok(id)
    }

    pub async fn login(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<SessionUser, AccountError> {
        let (email, password) = match (
            email.filter(|s| !s.is_empty()),
            password.filter(|s| !s.is_empty()),
        ) {
            (Some(e), Some(p)) => (e, p),
            _ => return Err(AccountError::MissingCredentials),
        };

        let store = self.store.load().await;
        let Some(user) = store.find_by_email(email) else {
            warn!(email = %email, "login unknown email");
            return Err(AccountError::InvalidCredentials);
        };

        match verify_password(password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => {
                warn!(user_id = user.id, "login invalid password");
                return Err(AccountError::InvalidCredentials);
            }
            Err(e) => {
                error!(error = %e, user_id = user.id, "stored password hash unusable");
                return Err(AccountError::InvalidCredentials);
            }
        }

        info!(user_id = user.id, "user logged in");
        Ok(SessionUser::from(user))
    }

    pub async fn update_preferences(
        &self,
        user_id: Option<&Value>,
        update: PreferencesUpdate,
    ) -> Result<UserProfile, AccountError> {
        let id = coerce::user_id(user_id)?;

        let _guard = self.writer.lock().await;
        let mut store = self.store.load().await;
        let Some(user) = store.find_by_id_mut(id) else {
            warn!(user_id = id, "preferences for unknown user");
            return Err(AccountError::UserNotFound);
        };

        user.preferences = update.preferences;
        user.dietary_restrictions = update.dietary_restrictions;
        user.cuisine_types = update.cuisine_types;
        user.price_range = update.price_range;
        user.min_rating = update.min_rating;
        user.has_preferences = true;
        let profile = UserProfile::from(&*user);

        self.persist(&store).await;
        info!(user_id = id, "preferences updated");
        Ok(profile)
    }

    pub async fn get_user(&self, id: u64) -> Result<UserProfile, AccountError> {
        let store = self.store.load().await;
        store
            .find_by_id(id)
            .map(UserProfile::from)
            .ok_or(AccountError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use serde_json::json;

    fn service() -> (Arc<MemoryStore>, AccountService) {
        let store = Arc::new(MemoryStore::new());
        let svc = AccountService::new(store.clone());
        (store, svc)
    }

    fn signup(first: &str, last: &str, email: &str, pw: &str, confirm: &str) -> SignupRequest {
        SignupRequest {
            first_name: Some(first.into()),
            last_name: Some(last.into()),
            email: Some(email.into()),
            phone: Some(String::new()),
            password: Some(pw.into()),
            confirm_password: Some(confirm.into()),
        }
    }

    fn ana() -> SignupRequest {
        signup("Ana", "Lee", "ana@x.com", "pass1234", "pass1234")
    }

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("ana@x.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("ana@x"));
        assert!(!is_valid_email("ana @x.com"));
        assert!(!is_valid_email("ana@@x.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn validation_order_first_failure_wins() {
        let bad_everything = signup(" ", "Lee", "nope", "short", "other");
        assert!(matches!(validate_signup(&bad_everything), Err(AccountError::InvalidName)));

        let bad_email = signup("Ana", "Lee", "nope", "short", "other");
        assert!(matches!(validate_signup(&bad_email), Err(AccountError::InvalidEmail)));

        let weak = signup("Ana", "Lee", "ana@x.com", "short", "other");
        assert!(matches!(validate_signup(&weak), Err(AccountError::WeakPassword)));

        let mismatch = signup("Ana", "Lee", "ana@x.com", "pass1234", "pass12345");
        assert!(matches!(validate_signup(&mismatch), Err(AccountError::PasswordMismatch)));

        let missing = SignupRequest {
            email: Some("ana@x.com".into()),
            ..SignupRequest::default()
        };
        assert!(matches!(validate_signup(&missing), Err(AccountError::InvalidName)));
    }

    #[test]
    fn password_length_boundary() {
        let seven = signup("Ana", "Lee", "ana@x.com", "pass123", "pass123");
        assert!(matches!(validate_signup(&seven), Err(AccountError::WeakPassword)));
        let eight = signup("Ana", "Lee", "ana@x.com", "pass1234", "pass1234");
        assert!(validate_signup(&eight).is_ok());
    }

    #[tokio::test]
    async fn invalid_email_creates_nothing() {
        let (store, svc) = service();
        let err = svc
            .create_account(signup("Ana", "Lee", "not-an-email", "pass1234", "pass1234"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::InvalidEmail));
        let snapshot = store.load().await;
        assert!(snapshot.users.is_empty());
        assert_eq!(snapshot.next_id, 1);
    }

    #[tokio::test]
    async fn ids_come_from_next_id_and_advance_by_one() {
        let (store, svc) = service();
        for (i, email) in ["a@x.com", "b@x.com", "c@x.com"].into_iter().enumerate() {
            let before = store.load().await.next_id;
            let id = svc
                .create_account(signup("A", "B", email, "pass1234", "pass1234"))
                .await
                .unwrap();
            assert_eq!(id, before);
            assert_eq!(id, i as u64 + 1);
            assert_eq!(store.load().await.next_id, before + 1);
        }
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let (store, svc) = service();
        svc.create_account(ana()).await.unwrap();
        let err = svc.create_account(ana()).await.unwrap_err();
        assert!(matches!(err, AccountError::EmailTaken));

        let snapshot = store.load().await;
        assert_eq!(snapshot.users.iter().filter(|u| u.email == "ana@x.com").count(), 1);
        assert_eq!(snapshot.next_id, 2);
    }

    #[tokio::test]
    async fn email_uniqueness_is_case_sensitive() {
        let (_, svc) = service();
        svc.create_account(ana()).await.unwrap();
        let id = svc
            .create_account(signup("Ana", "Lee", "Ana@x.com", "pass1234", "pass1234"))
            .await
            .unwrap();
        assert_eq!(id, 2);
    }

    #[tokio::test]
    async fn stored_record_has_defaults_and_hash() {
        let (store, svc) = service();
        let id = svc
            .create_account(signup("  Ana ", "Lee", "ana@x.com", "pass1234", "pass1234"))
            .await
            .unwrap();
        let snapshot = store.load().await;
        let user = snapshot.find_by_id(id).unwrap();
        assert_eq!(user.first_name, "Ana");
        assert_ne!(user.password_hash, "pass1234");
        assert!(verify_password("pass1234", &user.password_hash).unwrap());
        assert!(user.preferences.is_empty());
        assert_eq!(user.price_range, "");
        assert_eq!(user.min_rating, 3.0);
        assert!(!user.has_preferences);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (_, svc) = service();
        svc.create_account(ana()).await.unwrap();

        let wrong_pw = svc.login(Some("ana@x.com"), Some("wrongpass")).await.unwrap_err();
        let unknown = svc.login(Some("bo@x.com"), Some("pass1234")).await.unwrap_err();
        assert!(matches!(wrong_pw, AccountError::InvalidCredentials));
        assert!(matches!(unknown, AccountError::InvalidCredentials));
        assert_eq!(wrong_pw.to_string(), unknown.to_string());
        assert_eq!(wrong_pw.status(), unknown.status());
    }

    #[tokio::test]
    async fn login_requires_both_fields() {
        let (_, svc) = service();
        for (email, pw) in [(None, Some("pass1234")), (Some("ana@x.com"), None), (Some(""), Some("x"))] {
            let err = svc.login(email, pw).await.unwrap_err();
            assert!(matches!(err, AccountError::MissingCredentials));
        }
    }

    #[tokio::test]
    async fn update_preferences_requires_known_user() {
        let (_, svc) = service();
        let update = PreferencesUpdate {
            preferences: vec![],
            dietary_restrictions: vec![],
            cuisine_types: vec![],
            price_range: String::new(),
            min_rating: 3.0,
        };
        let err = svc.update_preferences(None, update.clone()).await.unwrap_err();
        assert!(matches!(err, AccountError::MissingUserId));
        let err = svc.update_preferences(Some(&json!(42)), update).await.unwrap_err();
        assert!(matches!(err, AccountError::UserNotFound));
    }

    #[tokio::test]
    async fn non_array_preferences_become_empty() {
        let (store, svc) = service();
        let id = svc.create_account(ana()).await.unwrap();
        let update = PreferencesUpdate {
            preferences: coerce::tags(Some(json!("vegan"))),
            dietary_restrictions: coerce::tags(Some(json!(["nut-free"]))),
            cuisine_types: coerce::tags(None),
            price_range: coerce::price_range(None),
            min_rating: coerce::min_rating(Some(json!(0))),
        };
        let profile = svc.update_preferences(Some(&json!(id)), update).await.unwrap();
        assert!(profile.preferences.is_empty());
        assert_eq!(profile.dietary_restrictions, vec!["nut-free"]);
        assert_eq!(profile.min_rating, 3.0);
        assert!(store.load().await.find_by_id(id).unwrap().has_preferences);
    }

    #[tokio::test]
    async fn ana_lee_scenario() {
        let (_, svc) = service();

        let id = svc.create_account(ana()).await.unwrap();
        assert_eq!(id, 1);

        let session = svc.login(Some("ana@x.com"), Some("pass1234")).await.unwrap();
        assert_eq!(session.id, 1);
        assert!(!session.has_preferences);

        let update = PreferencesUpdate {
            preferences: vec!["vegan".into()],
            dietary_restrictions: vec!["gluten-free".into()],
            cuisine_types: vec!["italian".into()],
            price_range: "$$".into(),
            min_rating: 4.0,
        };
        let updated = svc.update_preferences(Some(&json!(1)), update).await.unwrap();
        assert!(updated.has_preferences);

        let user = svc.get_user(1).await.unwrap();
        assert_eq!(user.preferences, vec!["vegan"]);
        assert_eq!(user.dietary_restrictions, vec!["gluten-free"]);
        assert_eq!(user.cuisine_types, vec!["italian"]);
        assert_eq!(user.price_range, "$$");
        assert_eq!(user.min_rating, 4.0);
        assert!(user.has_preferences);

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("passwordHash").is_none());

        let session = svc.login(Some("ana@x.com"), Some("pass1234")).await.unwrap();
        assert!(session.has_preferences);
    }

    #[tokio::test]
    async fn get_user_unknown_id() {
        let (_, svc) = service();
        assert!(matches!(svc.get_user(9).await, Err(AccountError::UserNotFound)));
    }

    struct ReadOnlyStore(MemoryStore);

    #[async_trait]
    impl RecordStore for ReadOnlyStore {
        async fn load(&self) -> Store {
            self.0.load().await
        }
        async fn save(&self, _store: &Store) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    #[tokio::test]
    async fn write_failure_is_swallowed() {
        let svc = AccountService::new(Arc::new(ReadOnlyStore(MemoryStore::new())));
        let id = svc.create_account(ana()).await.expect("save error is not surfaced");
        assert_eq!(id, 1);
        // nothing was kept
        assert!(matches!(svc.get_user(1).await, Err(AccountError::UserNotFound)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn preferences_update_not_blocked_by_signup_hashing() {
        let (_, svc) = service();
        let svc = Arc::new(svc);
        let id = svc.create_account(ana()).await.unwrap();

        let pending = tokio::spawn({
            let svc = svc.clone();
            async move {
                svc.create_account(signup("Bo", "Ray", "bo@x.com", "pass1234", "pass1234"))
                    .await
            }
        });
        // let the signup get into argon2
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let update = PreferencesUpdate {
            preferences: vec!["vegan".into()],
            dietary_restrictions: vec![],
            cuisine_types: vec![],
            price_range: "$".into(),
            min_rating: 4.0,
        };
        let profile = svc.update_preferences(Some(&json!(id)), update).await.unwrap();
        assert!(profile.has_preferences);
        assert!(!pending.is_finished(), "update waited for the signup's hash");

        assert_eq!(pending.await.unwrap().unwrap(), 2);
    }

    #[tokio::test]
    async fn duplicate_email_still_rejected_after_hashing() {
        let (store, svc) = service();
        let svc = Arc::new(svc);
        let a = tokio::spawn({
            let svc = svc.clone();
            async move { svc.create_account(ana()).await }
        });
        let b = tokio::spawn({
            let svc = svc.clone();
            async move { svc.create_account(ana()).await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AccountError::EmailTaken))));
        assert_eq!(store.load().await.users.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_signups_do_not_lose_updates() {
        let (store, svc) = service();
        let svc = Arc::new(svc);
        let handles: Vec<_> = ["a@x.com", "b@x.com", "c@x.com", "d@x.com"]
            .into_iter()
            .map(|email| {
                let svc = svc.clone();
                tokio::spawn(async move {
                    svc.create_account(signup("A", "B", email, "pass1234", "pass1234"))
                        .await
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let snapshot = store.load().await;
        assert_eq!(snapshot.users.len(), 4);
        assert_eq!(snapshot.next_id, 5);
        let mut ids: Vec<_> = snapshot.users.iter().map(|u| u.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }
}
