use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::domain::{AuthSession, LoginInput, NewUser, RegisterInput, ResetPasswordInput, SessionProjection, TokenPair};
use super::errors::{AuthError, ConflictField};
use super::notification::{NotificationDispatcher, NotificationEvent, NotificationTransport};
use super::password::PasswordPolicy;
use super::repository::UserRepository;
use super::reset_session::ResetSessionManager;
use super::session_cache::SessionCache;
use super::token::{Audience, TokenClaims, TokenService};
use super::{user_agent, validation};
use crate::clock::Clock;
use crate::storage::ExpiringStore;

/// Auth service configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub session_ttl_secs: u64,
    pub reset_ttl_secs: u64,
    pub password: PasswordPolicy,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { session_ttl_secs: 15 * 60, reset_ttl_secs: 15 * 60, password: PasswordPolicy::default() }
    }
}

/// Auth business service independent of web framework
pub struct AuthService<R: UserRepository + ?Sized> {
    repo: Arc<R>,
    tokens: TokenService,
    sessions: SessionCache,
    resets: ResetSessionManager,
    notifier: NotificationDispatcher,
    password: PasswordPolicy,
    clock: Arc<dyn Clock>,
}

/// Tokens issued before the last password change are revoked. `iat` has whole-second
/// resolution, so the watermark is floored to the second as well.
fn revoked(claims: &TokenClaims, projection: &SessionProjection) -> bool {
    claims.iat < projection.password_changed_at.timestamp()
}

fn bearer(header: Option<&str>) -> Option<&str> {
    let value = header?.trim();
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl<R: UserRepository + ?Sized> AuthService<R> {
    pub fn new(
        repo: Arc<R>,
        tokens: TokenService,
        store: Arc<dyn ExpiringStore>,
        transport: Arc<dyn NotificationTransport>,
        clock: Arc<dyn Clock>,
        cfg: AuthConfig,
    ) -> Self {
        Self {
            repo,
            tokens,
            sessions: SessionCache::new(store.clone(), cfg.session_ttl_secs),
            resets: ResetSessionManager::new(store, cfg.reset_ttl_secs),
            notifier: NotificationDispatcher::new(transport),
            password: cfg.password,
            clock,
        }
    }

    fn issue_pair(&self, uid: Uuid) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.tokens.sign_access(uid).map_err(|e| AuthError::Token(e.to_string()))?,
            refresh_token: self.tokens.sign_refresh(uid).map_err(|e| AuthError::Token(e.to_string()))?,
        })
    }

    fn issue_access(&self, uid: Uuid) -> Result<String, AuthError> {
        self.tokens.sign_access(uid).map_err(|e| AuthError::Token(e.to_string()))
    }

    async fn cache_best_effort(&self, projection: &SessionProjection) {
        if let Err(e) = self.sessions.set(projection.uid, projection).await {
            warn!(uid = %projection.uid, error = %e, "cache_write_failed");
        }
    }

    /// Cached projection, or the store's record written back to the cache.
    async fn resolve(&self, uid: Uuid) -> Result<SessionProjection, AuthError> {
        match self.sessions.get(uid).await {
            Ok(Some(p)) => return Ok(p),
            Ok(None) => {}
            Err(e) => warn!(%uid, error = %e, "cache_read_failed"),
        }
        let user = self.repo.find_by_id(uid).await?.ok_or(AuthError::Unauthorized("User not found"))?;
        let projection = SessionProjection::from(&user);
        self.cache_best_effort(&projection).await;
        Ok(projection)
    }

    /// Verify a token for `aud` and return its live, non-revoked owner.
    async fn authenticate(&self, token: &str, aud: Audience) -> Result<SessionProjection, AuthError> {
        let claims = self.tokens.verify(token, aud)?;
        let uid = claims.subject().map_err(AuthError::from)?;
        let projection = self.resolve(uid).await?;
        if revoked(&claims, &projection) {
            debug!(%uid, "token_revoked_by_password_change");
            return Err(AuthError::Unauthorized("Session invalidated due to password change"));
        }
        Ok(projection)
    }

    /// Register a new user with a hashed password.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::auth::{AuthConfig, AuthService, MemoryTransport, MockUserRepository, RegisterInput, TokenConfig, TokenService};
    /// use service::clock::SystemClock;
    /// use service::storage::MemoryStore;
    ///
    /// let private = std::fs::read("tests/fixtures/jwt_private.pem").unwrap();
    /// let public = std::fs::read("tests/fixtures/jwt_public.pem").unwrap();
    /// let clock = Arc::new(SystemClock);
    /// let tokens = TokenService::from_pem(&private, &public, TokenConfig::default(), clock.clone()).unwrap();
    /// let svc = AuthService::new(
    ///     Arc::new(MockUserRepository::default()),
    ///     tokens,
    ///     Arc::new(MemoryStore::default()),
    ///     Arc::new(MemoryTransport::default()),
    ///     clock,
    ///     AuthConfig::default(),
    /// );
    /// let input = RegisterInput { username: "Alice".into(), email: "alice@example.com".into(), password: "Secret123".into() };
    /// let session = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(session.user.username, "alice");
    /// ```
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthSession, AuthError> {
        let (username, email) = validation::registration(&input.username, &input.email, &input.password)?;

        if self.repo.find_by_identifier(&email).await?.is_some() {
            return Err(AuthError::Conflict(ConflictField::Email));
        }
        if self.repo.find_by_identifier(&username).await?.is_some() {
            return Err(AuthError::Conflict(ConflictField::Username));
        }

        let password_hash = self.password.hash(&input.password).await?;
        let user = self.repo.create(NewUser { username, email, password_hash, created_at: self.clock.now() }).await?;
        let projection = SessionProjection::from(&user);
        self.cache_best_effort(&projection).await;

        let tokens = self.issue_pair(user.uid)?;
        info!(uid = %user.uid, "user_registered");
        Ok(AuthSession { user: projection, tokens })
    }

    /// Authenticate by email or username. A login alert is queued in the background.
    #[instrument(skip(self, input), fields(identifier = %input.identifier))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let identifier = validation::identifier("usernameOrEmail", &input.identifier)?;
        validation::password("password", &input.password)?;

        let user = self.repo.find_by_identifier(&identifier).await?.ok_or(AuthError::NotFound("User not found"))?;
        if !self.password.verify(&input.password, &user.password_hash).await? {
            return Err(AuthError::Unauthorized("Password mismatch"));
        }

        let projection = SessionProjection::from(&user);
        self.cache_best_effort(&projection).await;
        let tokens = self.issue_pair(user.uid)?;

        self.notifier.spawn(NotificationEvent::LoginAlert {
            to: user.email.clone(),
            user_info: user_agent::summarize(input.user_agent.as_deref()),
            timestamp: self.clock.now(),
        });
        info!(uid = %user.uid, "login_succeeded");
        Ok(AuthSession { user: projection, tokens })
    }

    /// New access token for a valid, non-revoked refresh token. The refresh token is not rotated.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let projection = self.authenticate(refresh_token, Audience::Refresh).await?;
        self.issue_access(projection.uid)
    }

    /// Nothing is revoked server-side; the subject is logged when the token still verifies.
    #[instrument(skip_all)]
    pub async fn logout(&self, refresh_token: Option<&str>) {
        let Some(token) = refresh_token else { return };
        if let Ok(uid) = self.tokens.verify(token, Audience::Refresh).and_then(|c| c.subject()) {
            info!(%uid, "logged_out");
        }
    }

    /// Open a reset session and wait for the reset-link mail to be queued.
    #[instrument(skip_all)]
    pub async fn forgot_password(&self, identifier: &str) -> Result<(), AuthError> {
        let identifier = validation::identifier("identifier", identifier)?;
        let user = self.repo.find_by_identifier(&identifier).await?.ok_or(AuthError::NotFound("User not found"))?;

        let session = self.resets.create(user.uid).await?;
        let event = NotificationEvent::ForgetPassword { to: user.email.clone(), session: session.clone(), username: user.username.clone() };
        if let Err(e) = self.notifier.send(&event).await {
            warn!(uid = %user.uid, error = %e, "notification_failed");
            if let Err(e) = self.resets.consume(&session).await {
                warn!(uid = %user.uid, error = %e, "reset_session_cleanup_failed");
            }
            return Err(AuthError::Notification(e.to_string()));
        }
        info!(uid = %user.uid, "reset_requested");
        Ok(())
    }

    /// `NotFound` unless the session is live. Does not consume it.
    #[instrument(skip_all)]
    pub async fn verify_reset_session(&self, session_id: &str) -> Result<(), AuthError> {
        match self.resets.verify(session_id).await? {
            Some(_) => Ok(()),
            None => Err(AuthError::NotFound("Reset Password Session not found")),
        }
    }

    /// Set a new password through a reset session, revoking every earlier token.
    #[instrument(skip_all)]
    pub async fn reset_password(&self, input: ResetPasswordInput) -> Result<String, AuthError> {
        validation::session_id(&input.session_id)?;
        validation::password("newPassword", &input.new_password)?;

        let uid = self
            .resets
            .verify(&input.session_id)
            .await?
            .ok_or(AuthError::Unauthorized("Invalid or expired session"))?;

        let password_hash = self.password.hash(&input.new_password).await?;
        let user = self.repo.update_password(uid, &password_hash, self.clock.now()).await?;
        self.cache_best_effort(&SessionProjection::from(&user)).await;
        self.resets.consume(&input.session_id).await?;

        info!(%uid, "password_reset");
        self.issue_access(uid)
    }

    /// Resolve the caller behind an `Authorization: Bearer` header.
    #[instrument(skip_all)]
    pub async fn verify_session(&self, authorization: Option<&str>) -> Result<SessionProjection, AuthError> {
        let token = bearer(authorization).ok_or(AuthError::Forbidden("No token provided"))?;
        self.authenticate(token, Audience::Access).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_parsing() {
        assert_eq!(bearer(Some("Bearer abc")), Some("abc"));
        assert_eq!(bearer(Some("bearer  abc ")), Some("abc"));
        assert_eq!(bearer(Some("Basic abc")), None);
        assert_eq!(bearer(Some("Bearer ")), None);
        assert_eq!(bearer(Some("abc")), None);
        assert_eq!(bearer(None), None);
    }
}
