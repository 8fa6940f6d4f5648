//! Token issuance and verification.
//!
//! Tokens are HS256 JWTs carrying `sub` (identity id), `iat` and `exp` in unix
//! seconds. Expiry is judged against the injected `Clock`, so the library's
//! own wall-clock check is switched off.

use std::sync::{Arc, OnceLock};

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::password::{self, validate_password_strength};
use super::AuthError;
use crate::clock::Clock;
use crate::config::{AuthConfig, BootstrapAdmin};
use crate::identity::{Identity, IdentityStore};
use crate::observability::{SecurityEvent, SecurityEventSink};
use crate::security::input::{sanitize_string, validate_email};

const NAME_MAX_LEN: usize = 100;
const DUMMY_PASSWORD: &str = "unknown-account-placeholder";

/// JWT claims payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Registration input.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Issues and verifies bearer tokens and owns everything that touches password hashes.
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    bcrypt_cost: u32,
    lookup_timeout: std::time::Duration,
    /// Hashed at the configured cost on first use; checked against on unknown
    /// emails so a miss costs as much as a wrong password.
    dummy_hash: OnceLock<String>,
    store: Arc<dyn IdentityStore>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn SecurityEventSink>,
}

impl TokenAuthority {
    pub fn new(
        config: &AuthConfig,
        store: Arc<dyn IdentityStore>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn SecurityEventSink>,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            ttl: Duration::try_minutes(config.token_ttl_minutes).unwrap_or(Duration::MAX),
            bcrypt_cost: config.bcrypt_cost,
            lookup_timeout: std::time::Duration::from_millis(config.lookup_timeout_ms),
            dummy_hash: OnceLock::new(),
            store,
            clock,
            events,
        }
    }

    /// Default validity window for issued tokens.
    pub fn token_ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `identity` valid for `validity` from now.
    pub fn issue_token(&self, identity: &Identity, validity: Duration) -> Result<String, AuthError> {
        let now = self.clock.now();
        let expires = now
            .checked_add_signed(validity)
            .ok_or_else(|| AuthError::Signing(format!("token validity {validity} out of range")))?;
        let claims = Claims {
            sub: identity.id.to_string(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Check signature and expiry without touching the identity store.
    pub fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| AuthError::InvalidSignature)?
            .claims;

        if self.clock.now().timestamp() >= claims.exp {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }

    /// Resolve a bearer token to an active identity.
    pub async fn verify_token(&self, token: &str) -> Result<Identity, AuthError> {
        let result = self.resolve(token).await;
        if let Err(e) = &result {
            self.events.log(SecurityEvent::AuthenticationFailed {
                reason: e.reason(),
                subject: None,
            });
        }
        result
    }

    async fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.decode_claims(token)?;
        let id: Uuid = claims.sub.parse().map_err(|_| AuthError::InvalidSignature)?;

        let identity = match tokio::time::timeout(self.lookup_timeout, self.store.find_by_id(id)).await {
            Ok(Ok(Some(identity))) => identity,
            Ok(Ok(None)) => return Err(AuthError::UnknownSubject),
            Ok(Err(e)) => {
                tracing::warn!(subject = %id, error = %e, "Identity lookup failed");
                return Err(AuthError::UnknownSubject);
            }
            Err(_) => {
                tracing::warn!(subject = %id, timeout = ?self.lookup_timeout, "Identity lookup timed out");
                return Err(AuthError::UnknownSubject);
            }
        };

        if !identity.is_active {
            return Err(AuthError::InactiveAccount);
        }
        Ok(identity)
    }

    /// Pass `identity` through only if it carries the administrator flag.
    pub fn require_admin(identity: Identity) -> Result<Identity, AuthError> {
        if identity.is_admin {
            Ok(identity)
        } else {
            Err(AuthError::InsufficientPrivilege)
        }
    }

    /// Check an email/password pair. Disabled accounts are refused even with
    /// the right password.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let result = self.check_credentials(email, password).await;
        if let Err(e) = &result {
            if matches!(e, AuthError::InvalidCredentials | AuthError::InactiveAccount) {
                self.events.log(SecurityEvent::AuthenticationFailed {
                    reason: e.reason(),
                    subject: Some(email.to_string()),
                });
            }
        }
        result
    }

    async fn check_credentials(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = validate_email(email).map_err(|_| AuthError::InvalidCredentials)?;
        let Some(identity) = self.store.find_by_email(&email).await? else {
            let dummy = self.dummy_hash().await?;
            self.verify_blocking(password, &dummy).await?;
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify_blocking(password, &identity.password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }
        if !identity.is_active {
            return Err(AuthError::InactiveAccount);
        }
        Ok(identity)
    }

    /// Create a new identity after validating email and password strength.
    pub async fn register(&self, new: NewIdentity) -> Result<Identity, AuthError> {
        let email = validate_email(&new.email)?;
        validate_password_strength(&new.password)?;
        let first_name = clean_name(new.first_name)?;
        let last_name = clean_name(new.last_name)?;

        if self.store.find_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let hash = self.hash_blocking(new.password).await?;
        let identity = Identity::new(email, hash, first_name, last_name, self.clock.now());
        self.store.save(identity.clone()).await?;

        tracing::info!(identity = %identity.id, "Identity registered");
        Ok(identity)
    }

    /// Grant or revoke the administrator flag.
    pub async fn set_admin(&self, email: &str, is_admin: bool) -> Result<Identity, AuthError> {
        self.update(email, |identity| identity.is_admin = is_admin).await
    }

    /// Enable or disable an account.
    pub async fn set_active(&self, email: &str, is_active: bool) -> Result<Identity, AuthError> {
        self.update(email, |identity| identity.is_active = is_active).await
    }

    async fn update<F>(&self, email: &str, change: F) -> Result<Identity, AuthError>
    where
        F: FnOnce(&mut Identity),
    {
        let email = validate_email(email)?;
        let mut identity = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::NotFound)?;

        change(&mut identity);
        identity.updated_at = self.clock.now();
        self.store.save(identity.clone()).await?;

        tracing::info!(
            identity = %identity.id,
            is_admin = identity.is_admin,
            is_active = identity.is_active,
            "Identity updated"
        );
        Ok(identity)
    }

    /// Make sure the configured administrator exists and holds the admin flag.
    pub async fn ensure_bootstrap_admin(&self, admin: &BootstrapAdmin) -> Result<Identity, AuthError> {
        let email = validate_email(&admin.email)?;
        match self.store.find_by_email(&email).await? {
            Some(existing) if existing.is_admin && existing.is_active => Ok(existing),
            Some(_) => {
                self.set_active(&email, true).await?;
                self.set_admin(&email, true).await
            }
            None => {
                let registered = self
                    .register(NewIdentity {
                        email: email.clone(),
                        password: admin.password.clone(),
                        first_name: None,
                        last_name: None,
                    })
                    .await?;
                tracing::info!(identity = %registered.id, "Bootstrap administrator created");
                self.set_admin(&email, true).await
            }
        }
    }

    async fn dummy_hash(&self) -> Result<String, AuthError> {
        if let Some(hash) = self.dummy_hash.get() {
            return Ok(hash.clone());
        }
        let hash = self.hash_blocking(DUMMY_PASSWORD.to_string()).await?;
        Ok(self.dummy_hash.get_or_init(|| hash).clone())
    }

    async fn hash_blocking(&self, password: String) -> Result<String, AuthError> {
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || password::hash_password(&password, cost))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
    }

    async fn verify_blocking(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let (password, hash) = (password.to_string(), hash.to_string());
        tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
    }
}

fn clean_name(name: Option<String>) -> Result<Option<String>, AuthError> {
    match name {
        Some(name) => {
            let name = sanitize_string(&name, NAME_MAX_LEN)?;
            Ok((!name.is_empty()).then_some(name))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::identity::MemoryIdentityStore;
    use crate::observability::security_events::testing::RecordingSink;
    use crate::security::input::InputError;

    const SECRET: &str = "test-secret-key-that-is-long-enough-123";

    struct Fixture {
        authority: TokenAuthority,
        store: Arc<MemoryIdentityStore>,
        clock: Arc<ManualClock>,
        events: Arc<RecordingSink>,
    }

    fn fixture_with_secret(secret: &str) -> Fixture {
        let config = AuthConfig {
            jwt_secret: secret.to_string(),
            bcrypt_cost: password::MIN_BCRYPT_COST,
            ..AuthConfig::default()
        };
        let store = Arc::new(MemoryIdentityStore::new(None));
        let clock = Arc::new(ManualClock::default());
        let events = Arc::new(RecordingSink::default());
        let authority = TokenAuthority::new(&config, store.clone(), clock.clone(), events.clone());
        Fixture {
            authority,
            store,
            clock,
            events,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_secret(SECRET)
    }

    fn new_identity(email: &str) -> NewIdentity {
        NewIdentity {
            email: email.into(),
            password: "Str0ng-Pass!".into(),
            first_name: Some("  Ada ".into()),
            last_name: None,
        }
    }

    #[tokio::test]
    async fn test_issue_then_verify_before_expiry() {
        let f = fixture();
        let identity = f.authority.register(new_identity("ada@example.com")).await.unwrap();

        let token = f.authority.issue_token(&identity, f.authority.token_ttl()).unwrap();
        f.clock.advance(Duration::minutes(29));

        let resolved = f.authority.verify_token(&token).await.unwrap();
        assert_eq!(resolved.id, identity.id);
    }

    #[tokio::test]
    async fn test_token_expires_after_ttl() {
        let f = fixture();
        let identity = f.authority.register(new_identity("ada@example.com")).await.unwrap();
        let token = f.authority.issue_token(&identity, Duration::minutes(30)).unwrap();

        f.clock.advance(Duration::minutes(30));
        assert!(matches!(f.authority.verify_token(&token).await, Err(AuthError::Expired)));
        assert_eq!(
            f.events.events(),
            vec![SecurityEvent::AuthenticationFailed {
                reason: "expired",
                subject: None
            }]
        );
    }

    #[tokio::test]
    async fn test_claims_carry_fixed_validity_window() {
        let f = fixture();
        let identity = f.authority.register(new_identity("ada@example.com")).await.unwrap();
        let token = f.authority.issue_token(&identity, f.authority.token_ttl()).unwrap();

        let claims = f.authority.decode_claims(&token).unwrap();
        assert_eq!(claims.sub, identity.id.to_string());
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[tokio::test]
    async fn test_out_of_range_validity_is_an_error() {
        let f = fixture();
        let identity = f.authority.register(new_identity("ada@example.com")).await.unwrap();
        assert!(matches!(
            f.authority.issue_token(&identity, Duration::MAX),
            Err(AuthError::Signing(_))
        ));

        let config = AuthConfig {
            jwt_secret: SECRET.into(),
            token_ttl_minutes: 10_000_000_000_000,
            bcrypt_cost: password::MIN_BCRYPT_COST,
            ..AuthConfig::default()
        };
        let huge = TokenAuthority::new(&config, f.store.clone(), f.clock.clone(), f.events.clone());
        assert!(matches!(
            huge.issue_token(&identity, huge.token_ttl()),
            Err(AuthError::Signing(_))
        ));
    }

    #[tokio::test]
    async fn test_foreign_secret_rejected() {
        let issuer = fixture_with_secret("another-secret-key-which-is-long-enough");
        let identity = issuer.authority.register(new_identity("ada@example.com")).await.unwrap();
        let token = issuer.authority.issue_token(&identity, Duration::minutes(30)).unwrap();

        let f = fixture();
        assert!(matches!(
            f.authority.verify_token(&token).await,
            Err(AuthError::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn test_tampered_payload_rejected() {
        let f = fixture();
        let identity = f.authority.register(new_identity("ada@example.com")).await.unwrap();
        let token = f.authority.issue_token(&identity, Duration::minutes(30)).unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let forged = Claims {
            sub: Uuid::new_v4().to_string(),
            iat: 0,
            exp: i64::MAX / 2,
        };
        let forged_token = encode(
            &Header::new(Algorithm::HS256),
            &forged,
            &EncodingKey::from_secret(b"attacker"),
        )
        .unwrap();
        parts[1] = forged_token.split('.').nth(1).unwrap().to_string();
        let tampered = parts.join(".");

        assert!(matches!(
            f.authority.verify_token(&tampered).await,
            Err(AuthError::InvalidSignature)
        ));
        assert!(matches!(
            f.authority.verify_token("not.a.token").await,
            Err(AuthError::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn test_unknown_subject() {
        let f = fixture();
        let ghost = Identity::new("ghost@example.com".into(), "x".into(), None, None, f.clock.now());
        let token = f.authority.issue_token(&ghost, Duration::minutes(30)).unwrap();

        assert!(matches!(
            f.authority.verify_token(&token).await,
            Err(AuthError::UnknownSubject)
        ));
    }

    #[tokio::test]
    async fn test_disabled_identity_fails_verification() {
        let f = fixture();
        let identity = f.authority.register(new_identity("ada@example.com")).await.unwrap();
        let token = f.authority.issue_token(&identity, Duration::minutes(30)).unwrap();

        f.authority.set_active("ada@example.com", false).await.unwrap();
        assert!(matches!(
            f.authority.verify_token(&token).await,
            Err(AuthError::InactiveAccount)
        ));
    }

    #[tokio::test]
    async fn test_require_admin() {
        let f = fixture();
        let identity = f.authority.register(new_identity("ada@example.com")).await.unwrap();
        assert!(matches!(
            TokenAuthority::require_admin(identity),
            Err(AuthError::InsufficientPrivilege)
        ));

        let promoted = f.authority.set_admin("ada@example.com", true).await.unwrap();
        assert!(TokenAuthority::require_admin(promoted).is_ok());
    }

    #[tokio::test]
    async fn test_register_validates_and_normalizes() {
        let f = fixture();
        let identity = f.authority.register(new_identity("Ada@Example.COM")).await.unwrap();
        assert_eq!(identity.email, "ada@example.com");
        assert_eq!(identity.first_name.as_deref(), Some("Ada"));
        assert!(identity.is_active);
        assert!(!identity.is_admin);
        assert_ne!(identity.password_hash, "Str0ng-Pass!");

        let dup = f.authority.register(new_identity("ADA@example.com")).await;
        assert!(matches!(dup, Err(AuthError::DuplicateEmail)));

        let mut weak = new_identity("bob@example.com");
        weak.password = "alllowercase1!".into();
        assert!(matches!(
            f.authority.register(weak).await,
            Err(AuthError::WeakPassword(password::PasswordRule::Uppercase))
        ));

        let bad = f.authority.register(new_identity("bob-at-example")).await;
        assert!(matches!(
            bad,
            Err(AuthError::Input(InputError::InvalidFormat { field: "email" }))
        ));
        assert_eq!(f.store.len(), 1);
    }

    #[tokio::test]
    async fn test_authenticate() {
        let f = fixture();
        f.authority.register(new_identity("ada@example.com")).await.unwrap();

        let ok = f.authority.authenticate("ADA@example.com", "Str0ng-Pass!").await;
        assert!(ok.is_ok());

        let wrong = f.authority.authenticate("ada@example.com", "Wr0ng-Pass!").await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));

        assert!(f.authority.dummy_hash.get().is_none());
        let unknown = f.authority.authenticate("bob@example.com", "Str0ng-Pass!").await;
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
        let dummy = f.authority.dummy_hash.get().cloned().unwrap();
        assert!(password::verify_password(DUMMY_PASSWORD, &dummy).unwrap());

        f.authority.set_active("ada@example.com", false).await.unwrap();
        let disabled = f.authority.authenticate("ada@example.com", "Str0ng-Pass!").await;
        assert!(matches!(disabled, Err(AuthError::InactiveAccount)));

        assert_eq!(f.events.count("authentication_failed"), 3);
    }

    #[tokio::test]
    async fn test_role_change_updates_timestamp() {
        let f = fixture();
        let identity = f.authority.register(new_identity("ada@example.com")).await.unwrap();

        f.clock.advance(Duration::minutes(5));
        let promoted = f.authority.set_admin("ada@example.com", true).await.unwrap();
        assert!(promoted.is_admin);
        assert_eq!(promoted.created_at, identity.created_at);
        assert_eq!(promoted.updated_at, identity.created_at + Duration::minutes(5));

        let missing = f.authority.set_admin("nobody@example.com", true).await;
        assert!(matches!(missing, Err(AuthError::NotFound)));
    }

    #[tokio::test]
    async fn test_bootstrap_admin_is_idempotent() {
        let f = fixture();
        let admin = BootstrapAdmin {
            email: "root@example.com".into(),
            password: "R00t-Passw0rd!".into(),
        };

        let first = f.authority.ensure_bootstrap_admin(&admin).await.unwrap();
        assert!(first.is_admin);
        let second = f.authority.ensure_bootstrap_admin(&admin).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(f.store.len(), 1);
    }
}
