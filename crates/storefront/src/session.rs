//! Session manager.
//!
//! Owns the bearer token and the cached user profile, both kept in the
//! durable store. The session moves through three states:
//!
//! ```text
//! Unauthenticated ──login/oauth──▶ TokenPresentUnverified ──profile──▶ Authenticated
//!        ▲                                  │                               │
//!        └────────── 401 / logout ──────────┴───────────── logout ──────────┘
//! ```
//!
//! Concurrent [`SessionManager::load_user_data`] calls share one in-flight
//! profile fetch. Every credential change bumps a generation counter, and a
//! fetch that resolves under a stale generation is discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::de::IgnoredAny;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use vdiamond_core::{BearerToken, Email, EmailError, UserProfile};

use crate::api::{
    ApiClient, GatewayError, LoginRequest, LoginResponse, MessageResponse, PendingRequest,
    RegisterRequest,
};
use crate::error::{add_breadcrumb, clear_sentry_user, report_gateway_error, set_sentry_user};
use crate::navigation::{Navigator, paths};
use crate::storage::{KeyValueStore, Repository, keys};

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";
const CONFIRM_PATH: &str = "/auth/confirm";
const LOGOUT_PATH: &str = "/auth/logout";
const OAUTH_LOGIN_PATH: &str = "/auth/google/login";

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No token.
    Unauthenticated,
    /// A token is held but the profile has not been confirmed yet.
    TokenPresentUnverified,
    /// Token and profile are both present.
    Authenticated,
}

/// Errors returned by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Validation(String),

    /// The backend accepted the credentials but returned no token.
    #[error("backend response did not include a token")]
    MissingToken,

    /// The stored token was rejected; credentials have been cleared.
    #[error("session expired")]
    Expired,

    /// The profile fetch failed for a reason other than 401. Credentials are
    /// kept.
    #[error("could not load profile: {0}")]
    ProfileFetch(Arc<GatewayError>),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl SessionError {
    /// A message suitable for showing to the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::ProfileFetch(e) => e.user_message(),
            Self::Gateway(e) => e.user_message(),
            Self::Expired => GatewayError::SessionExpired.user_message(),
            other => other.to_string(),
        }
    }
}

type ProfileFetch = Shared<BoxFuture<'static, Result<UserProfile, Arc<GatewayError>>>>;

/// The single in-flight profile fetch.
struct InFlight {
    id: u64,
    generation: u64,
    fetch: ProfileFetch,
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<BearerToken>,
    user: Option<UserProfile>,
    last_error: Option<String>,
}

/// Handle to the shared session.
///
/// Cheaply cloneable; all clones see the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    api: ApiClient,
    navigator: Arc<dyn Navigator>,
    token_repo: Repository<BearerToken>,
    user_repo: Repository<UserProfile>,
    state: RwLock<SessionState>,
    in_flight: Mutex<Option<InFlight>>,
    generation: AtomicU64,
    next_fetch_id: AtomicU64,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("status", &self.status())
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Restore the session from `durable`.
    ///
    /// A cached profile without a token is discarded.
    #[must_use]
    pub fn new(api: ApiClient, durable: Arc<dyn KeyValueStore>, navigator: Arc<dyn Navigator>) -> Self {
        let token_repo: Repository<BearerToken> = Repository::new(Arc::clone(&durable), keys::TOKEN);
        let user_repo: Repository<UserProfile> = Repository::new(durable, keys::USER);

        let token = token_repo.load().filter(|t| !t.is_blank());
        let mut user = user_repo.load();
        if token.is_none() && user.take().is_some() {
            tracing::warn!("discarding cached profile stored without a token");
            if let Err(e) = user_repo.clear() {
                tracing::warn!(error = %e, "failed to remove orphaned profile");
            }
        }
        if let Some(user) = &user {
            set_sentry_user(user);
        }

        Self {
            inner: Arc::new(SessionInner {
                api,
                navigator,
                token_repo,
                user_repo,
                state: RwLock::new(SessionState {
                    token,
                    user,
                    last_error: None,
                }),
                in_flight: Mutex::new(None),
                generation: AtomicU64::new(0),
                next_fetch_id: AtomicU64::new(0),
            }),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counter bumped on every credential change.
    pub(crate) fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    fn bump_generation(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        let state = self.read_state();
        match (&state.token, &state.user) {
            (None, _) => SessionStatus::Unauthenticated,
            (Some(_), None) => SessionStatus::TokenPresentUnverified,
            (Some(_), Some(_)) => SessionStatus::Authenticated,
        }
    }

    #[must_use]
    pub fn token(&self) -> Option<BearerToken> {
        self.read_state().token.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        self.read_state().user.clone()
    }

    /// Whether a bearer token is held.
    ///
    /// The cached profile is display data only and plays no part here, so a
    /// restored token counts as logged in before its profile has loaded.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read_state().token.is_some()
    }

    /// Whether a profile fetch is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Shopper-facing message from the most recent failed operation.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.read_state().last_error.clone()
    }

    fn set_error(&self, message: String) {
        self.write_state().last_error = Some(message);
    }

    // =========================================================================
    // Profile loading
    // =========================================================================

    /// Verify a restored token once at startup.
    ///
    /// # Errors
    ///
    /// See [`Self::load_user_data`].
    pub async fn initialize(&self) -> Result<(), SessionError> {
        if self.status() == SessionStatus::TokenPresentUnverified {
            tracing::debug!("token restored without profile, loading user");
            self.load_user_data().await?;
        }
        Ok(())
    }

    /// Fetch the profile for the held token.
    ///
    /// Does nothing without a token or when already authenticated.
    /// Concurrent callers share a single request and all see its outcome.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Expired`] if the token was rejected; credentials are
    ///   cleared.
    /// - [`SessionError::ProfileFetch`] for any other failure; the token is
    ///   kept.
    pub async fn load_user_data(&self) -> Result<(), SessionError> {
        let (token, generation) = {
            let state = self.read_state();
            if state.user.is_some() {
                return Ok(());
            }
            let Some(token) = state.token.clone() else {
                return Ok(());
            };
            (token, self.generation())
        };

        let (id, fetch) = self.join_or_start_fetch(token, generation);
        let result = fetch.await;
        self.finish_fetch(id, generation, result)
    }

    fn join_or_start_fetch(&self, token: BearerToken, generation: u64) -> (u64, ProfileFetch) {
        let mut slot = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(in_flight) = slot.as_ref()
            && in_flight.generation == generation
        {
            tracing::debug!(fetch_id = in_flight.id, "joining in-flight profile fetch");
            return (in_flight.id, in_flight.fetch.clone());
        }

        let id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
        let api = self.inner.api.clone();
        let fetch = async move { api.fetch_profile(&token).await.map_err(Arc::new) }
            .boxed()
            .shared();
        *slot = Some(InFlight {
            id,
            generation,
            fetch: fetch.clone(),
        });
        (id, fetch)
    }

    /// Apply a finished fetch. Only the first caller to get here for a given
    /// fetch writes state; the others just report the outcome.
    fn finish_fetch(
        &self,
        id: u64,
        generation: u64,
        result: Result<UserProfile, Arc<GatewayError>>,
    ) -> Result<(), SessionError> {
        let applies = {
            let mut slot = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if slot.as_ref().is_some_and(|f| f.id == id) {
                *slot = None;
                true
            } else {
                false
            }
        };
        let current = applies && self.generation() == generation;
        if applies && !current {
            tracing::debug!(fetch_id = id, "discarding profile fetched under stale credentials");
        }

        match result {
            Ok(profile) => {
                if current {
                    self.store_user(profile);
                }
                Ok(())
            }
            Err(e) if e.is_unauthorized() => {
                if current {
                    tracing::info!("stored token rejected, clearing session");
                    self.clear_credentials();
                    self.set_error(GatewayError::SessionExpired.user_message());
                }
                Err(SessionError::Expired)
            }
            Err(e) => {
                if current {
                    report_gateway_error(&e);
                    self.set_error(e.user_message());
                }
                Err(SessionError::ProfileFetch(e))
            }
        }
    }

    fn store_user(&self, profile: UserProfile) {
        if let Err(e) = self.inner.user_repo.save(&profile) {
            tracing::warn!(error = %e, "failed to persist user profile");
        }
        set_sentry_user(&profile);
        tracing::info!(user_id = %profile.id, "session authenticated");

        let mut state = self.write_state();
        state.user = Some(profile);
        state.last_error = None;
    }

    /// Replace the cached profile with one fetched by another component.
    ///
    /// Ignored if credentials changed since `generation` was read.
    pub(crate) fn adopt_profile(&self, generation: u64, profile: UserProfile) -> bool {
        if self.generation() != generation || self.token().is_none() {
            tracing::debug!("discarding profile fetched under stale credentials");
            return false;
        }
        self.store_user(profile);
        true
    }

    fn store_token(&self, token: BearerToken) {
        if let Err(e) = self.inner.token_repo.save(&token) {
            tracing::warn!(error = %e, "failed to persist token");
        }
        let mut state = self.write_state();
        state.token = Some(token);
        state.user = None;
        state.last_error = None;
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Sign in with email and password.
    ///
    /// The email is validated before any request is made.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidEmail`] or [`SessionError::Validation`] for bad
    ///   input.
    /// - [`SessionError::InvalidCredentials`] if the backend answers 401.
    /// - [`SessionError::Gateway`] for any other backend failure.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<(), SessionError> {
        let email = Email::parse(email)?;
        if password.expose_secret().is_empty() {
            return Err(SessionError::Validation("password is required".to_string()));
        }

        let request = PendingRequest::post(
            LOGIN_PATH,
            &LoginRequest {
                email: email.as_str(),
                password: password.expose_secret(),
            },
        )?;

        let response: LoginResponse = match self.inner.api.send(&request, None).await {
            Ok(response) => response,
            Err(GatewayError::Unauthorized) => {
                self.set_error(SessionError::InvalidCredentials.to_string());
                return Err(SessionError::InvalidCredentials);
            }
            Err(e) => {
                report_gateway_error(&e);
                self.set_error(e.user_message());
                return Err(e.into());
            }
        };

        if response.token.is_blank() {
            return Err(SessionError::MissingToken);
        }

        self.bump_generation();
        self.store_token(response.token);
        add_breadcrumb("auth", "Logged in", Some(&[("method", "password")]));

        match response.user {
            Some(user) => {
                self.store_user(user);
                Ok(())
            }
            None => self.load_user_data().await,
        }
    }

    /// Finish an OAuth redirect by adopting the token it delivered.
    ///
    /// # Errors
    ///
    /// [`SessionError::MissingToken`] for a blank token, otherwise see
    /// [`Self::load_user_data`].
    pub async fn complete_oauth(&self, token: BearerToken) -> Result<(), SessionError> {
        if token.is_blank() {
            return Err(SessionError::MissingToken);
        }

        self.bump_generation();
        self.store_token(token);
        add_breadcrumb("auth", "Logged in", Some(&[("method", "oauth")]));
        self.load_user_data().await
    }

    /// Create an account. Returns the backend's confirmation message.
    ///
    /// The session is not changed: new accounts must confirm their email
    /// before they can sign in.
    ///
    /// # Errors
    ///
    /// Validation errors for bad input, [`SessionError::Gateway`] if the
    /// backend rejects the registration.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<String, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::Validation("name is required".to_string()));
        }
        let email = Email::parse(email)?;
        if password.expose_secret().is_empty() {
            return Err(SessionError::Validation("password is required".to_string()));
        }

        let request = PendingRequest::post(
            REGISTER_PATH,
            &RegisterRequest {
                name,
                email: email.as_str(),
                password: password.expose_secret(),
            },
        )?;

        match self.inner.api.send::<MessageResponse>(&request, None).await {
            Ok(response) => {
                add_breadcrumb("auth", "Registered", None);
                Ok(response.message)
            }
            Err(e) => {
                report_gateway_error(&e);
                self.set_error(e.user_message());
                Err(e.into())
            }
        }
    }

    /// Confirm a new account's email with the token from the confirmation
    /// link, then send the shopper to the login page.
    ///
    /// Returns the backend's confirmation message. The session is not
    /// changed.
    ///
    /// # Errors
    ///
    /// [`SessionError::Validation`] for a missing token,
    /// [`SessionError::Gateway`] if the backend rejects it.
    #[instrument(skip_all)]
    pub async fn confirm_email(&self, token: &str) -> Result<String, SessionError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SessionError::Validation(
                "invalid confirmation link: no token provided".to_string(),
            ));
        }

        let request = PendingRequest::get(CONFIRM_PATH).with_query("token", token);
        match self.inner.api.send::<MessageResponse>(&request, None).await {
            Ok(response) => {
                add_breadcrumb("auth", "Email confirmed", None);
                self.inner.navigator.navigate(paths::LOGIN);
                Ok(response.message)
            }
            Err(e) => {
                report_gateway_error(&e);
                self.set_error(e.user_message());
                Err(e.into())
            }
        }
    }

    /// Backend URL that starts the Google OAuth flow.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be built from the base URL.
    pub fn oauth_login_url(&self) -> Result<Url, SessionError> {
        Ok(self.inner.api.url(OAUTH_LOGIN_PATH)?)
    }

    /// Sign out and go to the landing page.
    ///
    /// The backend call is best-effort; local credentials are cleared
    /// whatever it returns.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Some(token) = self.token() {
            let request = PendingRequest::new(Method::POST, LOGOUT_PATH);
            if let Err(e) = self.inner.api.send::<IgnoredAny>(&request, Some(&token)).await {
                tracing::warn!(error = %e, "backend logout failed, clearing local session anyway");
            }
        }

        self.clear_credentials();
        add_breadcrumb("auth", "Logged out", None);
        self.inner.navigator.navigate(paths::LANDING);
    }

    // =========================================================================
    // 401 recovery
    // =========================================================================

    /// Re-fetch the profile for the held token directly, bypassing the
    /// gateway's 401 handling.
    ///
    /// On success the cached profile is refreshed.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Unauthorized`] if there is no token or it is rejected,
    /// otherwise the fetch error.
    pub async fn recover(&self) -> Result<UserProfile, GatewayError> {
        let Some(token) = self.token() else {
            return Err(GatewayError::Unauthorized);
        };
        let generation = self.generation();

        let profile = self.inner.api.fetch_profile(&token).await?;
        if self.generation() == generation {
            self.store_user(profile.clone());
        }
        Ok(profile)
    }

    /// Clear credentials after an unrecoverable 401 and send the shopper to
    /// the login page with the expiry marker.
    pub fn force_logout(&self) {
        tracing::info!("session could not be recovered, forcing logout");
        self.clear_credentials();
        self.set_error(GatewayError::SessionExpired.user_message());
        self.inner.navigator.navigate(paths::SESSION_EXPIRED);
    }

    /// Drop token and profile from memory and durable storage.
    ///
    /// Any in-flight profile fetch is abandoned.
    pub fn clear_credentials(&self) {
        self.bump_generation();
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        {
            let mut state = self.write_state();
            state.token = None;
            state.user = None;
            state.last_error = None;
        }

        if let Err(e) = self.inner.token_repo.clear() {
            tracing::warn!(error = %e, "failed to remove stored token");
        }
        if let Err(e) = self.inner.user_repo.clear() {
            tracing::warn!(error = %e, "failed to remove stored profile");
        }
        clear_sentry_user();
    }
}
