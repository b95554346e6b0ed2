//! Request gateway.
//!
//! The single chokepoint for page-level backend calls. Attaches the session's
//! bearer token and applies the 401 policy:
//!
//! 1. On an authentication-flow page the 401 is returned as-is.
//! 2. Otherwise, with a token and a call not yet retried, the session is
//!    recovered once through a direct profile fetch and the call is
//!    resubmitted.
//! 3. Anything else clears credentials and redirects to the login page with
//!    the session-expiry marker.
//!
//! A call is resubmitted at most once.

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};

use crate::api::{ApiClient, GatewayError, PendingRequest, decode};
use crate::error::report_gateway_error;
use crate::navigation::{Navigator, is_auth_flow_path};
use crate::session::SessionManager;

/// Authenticated HTTP access to the backend.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct RequestGateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    api: ApiClient,
    session: SessionManager,
    navigator: Arc<dyn Navigator>,
}

impl std::fmt::Debug for RequestGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGateway")
            .field("api", &self.inner.api)
            .finish_non_exhaustive()
    }
}

impl RequestGateway {
    #[must_use]
    pub fn new(api: ApiClient, session: SessionManager, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                api,
                session,
                navigator,
            }),
        }
    }

    /// `GET path`.
    ///
    /// # Errors
    ///
    /// See [`Self::send`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        self.send(PendingRequest::get(path)).await
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`Self::send`].
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(PendingRequest::post(path, body)?).await
    }

    /// `PUT path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`Self::send`].
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(PendingRequest::put(path, body)?).await
    }

    /// `DELETE path`.
    ///
    /// # Errors
    ///
    /// See [`Self::send`].
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        self.send(PendingRequest::delete(path)).await
    }

    /// Send a prepared request under the 401 policy.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Unauthorized`] for a 401 on an authentication-flow
    ///   page.
    /// - [`GatewayError::SessionExpired`] when the session could not be
    ///   recovered. Credentials are cleared and the shopper redirected.
    /// - [`GatewayError::Status`] for other non-2xx responses.
    /// - Transport and decode errors otherwise.
    pub async fn send<T: DeserializeOwned>(&self, request: PendingRequest) -> Result<T, GatewayError> {
        let result = self.dispatch(request).await;
        if let Err(e) = &result {
            report_gateway_error(e);
        }
        result
    }

    async fn dispatch<T: DeserializeOwned>(&self, mut request: PendingRequest) -> Result<T, GatewayError> {
        let session = &self.inner.session;

        loop {
            let token = session.token();
            let response = self.inner.api.execute(&request, token.as_ref()).await?;

            match decode(response).await {
                Err(GatewayError::Unauthorized) => {}
                other => return other,
            }

            let current = self.inner.navigator.current_path();
            if is_auth_flow_path(&current) {
                tracing::debug!(page = %current, "401 on auth page, leaving it to the page");
                return Err(GatewayError::Unauthorized);
            }

            if token.is_some() && !request.is_retried() {
                match session.recover().await {
                    Ok(_) => {
                        tracing::info!(
                            request_id = %request.request_id(),
                            "session recovered, resubmitting request"
                        );
                        request = request.into_retry();
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "session recovery failed");
                    }
                }
            }

            session.force_logout();
            return Err(GatewayError::SessionExpired);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::{Value, json};
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::StorefrontClientConfig;
    use crate::navigation::MemoryNavigator;
    use crate::session::SessionStatus;
    use crate::storage::{MemoryStore, keys};

    struct Fixture {
        navigator: Arc<MemoryNavigator>,
        session: SessionManager,
        gateway: RequestGateway,
    }

    fn fixture(server: &MockServer, page: &str, token: Option<&str>) -> Fixture {
        let config =
            StorefrontClientConfig::new(Url::parse(&format!("{}/api/", server.uri())).unwrap());
        let api = ApiClient::new(&config).unwrap();
        let store = match token {
            Some(token) => MemoryStore::with_entry(keys::TOKEN, &format!("\"{token}\"")),
            None => MemoryStore::new(),
        };
        let navigator = Arc::new(MemoryNavigator::new(page));
        let session = SessionManager::new(api.clone(), Arc::new(store), navigator.clone());
        let gateway = RequestGateway::new(api, session.clone(), navigator.clone());
        Fixture {
            navigator,
            session,
            gateway,
        }
    }

    async fn mount_profile(server: &MockServer, status: u16, expected: u64) {
        let template = if status == 200 {
            ResponseTemplate::new(200).set_body_json(json!({"ID": 1, "email": "a@b.co"}))
        } else {
            ResponseTemplate::new(status)
        };
        Mock::given(method("GET"))
            .and(path("/api/user/me"))
            .respond_with(template)
            .expect(expected)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/wishlist"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["ring-1"])))
            .mount(&server)
            .await;

        let f = fixture(&server, "/account", Some("tok"));
        let items: Vec<String> = f.gateway.get("/wishlist").await.unwrap();
        assert_eq!(items, vec!["ring-1".to_string()]);
    }

    #[tokio::test]
    async fn test_auth_page_401_is_not_recovered() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/wishlist"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        mount_profile(&server, 200, 0).await;

        let f = fixture(&server, "/login?next=/account", Some("tok"));
        let err = f.gateway.get::<Value>("/wishlist").await.unwrap_err();
        assert!(matches!(err, GatewayError::Unauthorized));
        assert!(f.navigator.history().is_empty());
        assert!(f.session.token().is_some());
    }

    #[tokio::test]
    async fn test_recovery_resubmits_once() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/wishlist/ring-1"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/wishlist/ring-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"removed": true})))
            .expect(1)
            .mount(&server)
            .await;
        mount_profile(&server, 200, 1).await;

        let f = fixture(&server, "/account", Some("tok"));
        let body: Value = f.gateway.delete("/wishlist/ring-1").await.unwrap();
        assert_eq!(body, json!({"removed": true}));
        assert_eq!(f.session.status(), SessionStatus::Authenticated);
        assert!(f.navigator.history().is_empty());
    }

    #[tokio::test]
    async fn test_second_401_forces_logout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/wishlist"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;
        mount_profile(&server, 200, 1).await;

        let f = fixture(&server, "/account", Some("tok"));
        let err = f.gateway.get::<Value>("/wishlist").await.unwrap_err();
        assert!(matches!(err, GatewayError::SessionExpired));
        assert!(f.session.token().is_none());
        assert_eq!(
            f.navigator.last_navigation().as_deref(),
            Some("/login?session=expired")
        );
    }

    #[tokio::test]
    async fn test_no_token_401_forces_logout_without_recovery() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/wishlist"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        mount_profile(&server, 200, 0).await;

        let f = fixture(&server, "/product/ring-1", None);
        let err = f
            .gateway
            .post::<_, Value>("/wishlist", &json!({"id": "ring-1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::SessionExpired));
        assert_eq!(
            f.navigator.last_navigation().as_deref(),
            Some("/login?session=expired")
        );
    }

    #[tokio::test]
    async fn test_other_errors_keep_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/wishlist"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "nope"})))
            .mount(&server)
            .await;

        let f = fixture(&server, "/account", Some("tok"));
        let err = f.gateway.get::<Value>("/wishlist").await.unwrap_err();
        assert!(matches!(err, GatewayError::Status { status: 404, .. }));
        assert!(f.session.token().is_some());
    }
}
