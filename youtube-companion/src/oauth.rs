//! OAuth 2.0 management for YouTube API authentication.
//!
//! [`OAuthManager`] owns the single stored credential and moves it through its lifecycle:
//! authorization URL, code exchange, silent refresh once the access token has expired, and
//! revocation. Callers only ever see a usable credential or "not authorized".

use crate::token_store::{Credential, TokenStore, TokenStoreError};
use bytes::Bytes;
use eyre::Context;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, body};
use jiff::Timestamp;
use oauth2::basic::{BasicClient, BasicErrorResponseType, BasicTokenResponse};
use oauth2::url::Url;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, RefreshToken, RequestTokenError, Scope, TokenResponse, TokenUrl, reqwest,
};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc;

/// Google's consent page.
pub const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth2 token endpoint URL used for both code exchange and token refresh
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Manage videos and comments on the authorizing account.
pub const SCOPE: &str = "https://www.googleapis.com/auth/youtube.force-ssl";

/// Assumed access token lifetime when the token endpoint does not say.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("not authorized with YouTube")]
    NotAuthorized,
    #[error("refreshing the YouTube access token failed: {0}")]
    RefreshFailed(String),
    #[error("exchanging the authorization code failed: {0}")]
    Exchange(String),
    #[error("the token endpoint did not issue a refresh token")]
    MissingRefreshToken,
    #[error("invalid redirect URI: {0}")]
    InvalidRedirect(#[from] oauth2::url::ParseError),
    #[error(transparent)]
    Store(#[from] TokenStoreError),
}

/// Manages OAuth 2.0 authentication flows for YouTube API access.
///
/// The manager holds the OAuth client configuration together with the [`TokenStore`] that
/// persists the one credential the application acts with. It is constructed once and shared
/// (by reference or behind an `Arc`) with everything that needs to make authenticated calls.
#[derive(Debug)]
pub struct OAuthManager<S> {
    client_id: ClientId,
    client_secret: ClientSecret,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    http: reqwest::Client,
    store: S,
}

impl<S: TokenStore> OAuthManager<S> {
    /// Creates a manager that talks to Google's OAuth endpoints.
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded endpoint URLs are malformed or the HTTP client cannot be built
    /// (neither happens in practice).
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>, store: S) -> Self {
        let http = reqwest::ClientBuilder::new()
            // SSRF no thank you.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("building reqwest client should not fail");
        Self {
            client_id: ClientId::new(client_id.into()),
            client_secret: ClientSecret::new(client_secret.into()),
            auth_url: AuthUrl::new(AUTH_URL.to_string())
                .expect("Invalid authorization endpoint URL"),
            token_url: TokenUrl::new(TOKEN_URL.to_string()).expect("Invalid token endpoint URL"),
            http,
            store,
        }
    }

    /// Points the manager at different authorization and token endpoints.
    pub fn with_endpoints(
        mut self,
        auth_url: &str,
        token_url: &str,
    ) -> Result<Self, oauth2::url::ParseError> {
        self.auth_url = AuthUrl::new(auth_url.to_string())?;
        self.token_url = TokenUrl::new(token_url.to_string())?;
        Ok(self)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn client(&self) -> ConfiguredClient {
        BasicClient::new(self.client_id.clone())
            .set_client_secret(self.client_secret.clone())
            .set_auth_uri(self.auth_url.clone())
            .set_token_uri(self.token_url.clone())
    }

    /// Builds the consent URL the user must visit, along with the CSRF `state` it carries.
    ///
    /// Offline access is requested with a forced consent prompt so that Google issues a
    /// refresh token even when the account has authorized this client before.
    pub fn authorization_url(&self, redirect_uri: &str) -> Result<(Url, CsrfToken), AuthError> {
        let redirect = RedirectUrl::new(redirect_uri.to_string())?;
        Ok(self.authorization_url_with_state(redirect, CsrfToken::new_random()))
    }

    fn authorization_url_with_state(
        &self,
        redirect: RedirectUrl,
        state: CsrfToken,
    ) -> (Url, CsrfToken) {
        self.client()
            .set_redirect_uri(redirect)
            .authorize_url(move || state)
            .add_scope(Scope::new(SCOPE.to_string()))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url()
    }

    /// Exchanges an authorization code for a credential and persists it.
    ///
    /// `redirect_uri` must be the same URI that was used to build the authorization URL.
    #[tracing::instrument(skip(self, code))]
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Credential, AuthError> {
        let redirect = RedirectUrl::new(redirect_uri.to_string())?;
        let token = self
            .client()
            .set_redirect_uri(redirect)
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        // Google only hands out a refresh token on the first consent unless prompted again.
        let previous = self.store.load().await;
        let credential = credential_from_token(
            &token,
            previous.as_ref().map(Credential::refresh_token),
        )?;
        self.store.save(&credential).await?;

        tracing::info!(expires_at = %credential.expires_at(), "authorized with YouTube");
        Ok(credential)
    }

    /// Returns a credential whose access token is currently valid, refreshing it if needed.
    ///
    /// # Returns
    ///
    /// * `Ok(credential)` - stored credential, refreshed and re-persisted if it had expired
    /// * `Err(AuthError::NotAuthorized)` - nothing usable is stored
    /// * `Err(AuthError::RefreshFailed(_))` - the token endpoint refused to refresh
    pub async fn authorized_credential(&self) -> Result<Credential, AuthError> {
        let Some(credential) = self.store.load().await else {
            return Err(AuthError::NotAuthorized);
        };
        if !credential.is_expired_at(Timestamp::now()) {
            return Ok(credential);
        }

        tracing::debug!(
            expires_at = %credential.expires_at(),
            "access token expired, attempting refresh"
        );
        let refreshed = self.refresh(&credential).await?;
        if let Err(e) = self.store.save(&refreshed).await {
            // The fresh token still works for this call; the next one will refresh again.
            tracing::error!(error = %e, "failed to persist refreshed credential");
        }
        Ok(refreshed)
    }

    /// Like [`Self::authorized_credential`], but any failure reads as "not authorized".
    pub async fn current_credential(&self) -> Option<Credential> {
        match self.authorized_credential().await {
            Ok(credential) => Some(credential),
            Err(AuthError::NotAuthorized) => None,
            Err(e) => {
                tracing::warn!(error = %e, "no usable YouTube credential");
                None
            }
        }
    }

    pub async fn is_authorized(&self) -> bool {
        self.current_credential().await.is_some()
    }

    /// Forgets the stored credential, whatever state it was in.
    pub async fn revoke(&self) -> Result<(), AuthError> {
        self.store.clear().await?;
        tracing::info!("YouTube authorization revoked");
        Ok(())
    }

    /// Performs a complete interactive authorization.
    ///
    /// This method:
    /// 1. Starts a loopback listener on `listen_on` to receive the redirect
    /// 2. Opens the user's browser at the consent page
    /// 3. Exchanges the received authorization code and persists the credential
    pub async fn authenticate(
        &self,
        listen_on: SocketAddr,
        done_html: &'static str,
    ) -> eyre::Result<Credential> {
        let csrf = CsrfToken::new_random();
        let (redirect, eventually_code) = listen_for_redirect(listen_on, csrf.clone(), done_html)
            .await
            .context("set up redirect endpoint")?;
        let redirect_uri = redirect.as_str().to_string();

        let (auth_url, _) = self.authorization_url_with_state(redirect, csrf);
        tracing::info!(url = %auth_url, "asking user to follow OAuth flow");
        if let Err(e) = webbrowser::open(auth_url.as_str()) {
            tracing::warn!(error = %e, "could not open a browser, visit the URL manually");
        }

        let code = eventually_code
            .await
            .context("await user authorization code")?;
        let credential = self
            .exchange_code(code.secret(), &redirect_uri)
            .await
            .context("exchange authorization code for a credential")?;
        Ok(credential)
    }

    /// Trades the refresh token for a new access token.
    ///
    /// A response that omits the refresh token keeps the one we already had.
    async fn refresh(&self, credential: &Credential) -> Result<Credential, AuthError> {
        let refresh_token = RefreshToken::new(credential.refresh_token().to_string());
        match self
            .client()
            .exchange_refresh_token(&refresh_token)
            .request_async(&self.http)
            .await
        {
            Ok(token) => {
                let refreshed = credential_from_token(&token, Some(credential.refresh_token()))?;
                tracing::debug!(
                    expires_at = %refreshed.expires_at(),
                    "successfully refreshed OAuth token"
                );
                Ok(refreshed)
            }
            Err(ref e @ RequestTokenError::ServerResponse(ref sr))
                if matches!(sr.error(), BasicErrorResponseType::InvalidGrant) =>
            {
                tracing::warn!("OAuth refresh token considered invalid grant: {}", e);
                Err(AuthError::RefreshFailed(e.to_string()))
            }
            Err(e) => {
                tracing::error!(error = %e, "OAuth token refresh request failed");
                Err(AuthError::RefreshFailed(e.to_string()))
            }
        }
    }
}

fn credential_from_token(
    token: &BasicTokenResponse,
    fallback_refresh_token: Option<&str>,
) -> Result<Credential, AuthError> {
    let refresh_token = token
        .refresh_token()
        .map(|t| t.secret().as_str())
        .or(fallback_refresh_token)
        .ok_or(AuthError::MissingRefreshToken)?;
    let lifetime = token.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
    let expires_at = Timestamp::now()
        .checked_add(lifetime)
        .unwrap_or(Timestamp::MAX);
    Ok(Credential::new(
        token.access_token().secret().as_str(),
        refresh_token,
        expires_at,
    ))
}

/// Starts a loopback HTTP listener that waits for the OAuth redirect.
///
/// Requests whose `state` does not match `csrf`, or that carry no `code`, are answered with
/// `400` and otherwise ignored, so stray requests (say, for a favicon) do not end the flow.
///
/// # Returns
///
/// A tuple containing:
/// - The redirect URL to use in the OAuth flow
/// - A future that resolves to the authorization code once a valid redirect arrives
pub async fn listen_for_redirect(
    listen_on: SocketAddr,
    csrf: CsrfToken,
    done_html: &'static str,
) -> eyre::Result<(
    RedirectUrl,
    impl Future<Output = eyre::Result<AuthorizationCode>>,
)> {
    let socket = tokio::net::TcpListener::bind(listen_on)
        .await
        .context("bind to localhost")?;
    let addr = socket.local_addr().context("get local address")?;
    let url = RedirectUrl::new(format!("http://{}:{}", addr.ip(), addr.port()))
        .context("construct redirect url")?;

    let (got, mut gotten) = mpsc::channel(1);
    let server = tokio::spawn(async move {
        loop {
            let conn = match socket.accept().await {
                Ok((conn, _)) => hyper_util::rt::TokioIo::new(conn),
                Err(e) => {
                    tracing::warn!(error = %e, "redirect listener stopped accepting");
                    break;
                }
            };
            let csrf = csrf.clone();
            let got = got.clone();
            let service = service_fn(move |req: Request<body::Incoming>| {
                let query = req.uri().query().map(str::to_owned);
                let csrf = csrf.clone();
                let got = got.clone();
                async move {
                    Ok::<_, Infallible>(handle_redirect(query, &csrf, &got, done_html).await)
                }
            });
            tokio::spawn(async move {
                if let Err(e) = hyper::server::conn::http1::Builder::new()
                    .serve_connection(conn, service)
                    .await
                {
                    tracing::debug!(error = %e, "redirect connection ended with an error");
                }
            });
        }
    });

    Ok((url, async move {
        let code = gotten
            .recv()
            .await
            .ok_or_else(|| eyre::eyre!("redirect listener exited before receiving a code"));
        server.abort();
        code
    }))
}

async fn handle_redirect(
    query: Option<String>,
    csrf: &CsrfToken,
    got: &mpsc::Sender<AuthorizationCode>,
    done_html: &'static str,
) -> Response<Full<Bytes>> {
    let mut presented_state = None;
    let mut presented_code = None;
    let mut presented_error = None;
    for (k, v) in form_urlencoded::parse(query.as_deref().unwrap_or("").as_bytes()) {
        match &*k {
            "state" => presented_state = Some(v),
            "code" => presented_code = Some(v),
            "error" => presented_error = Some(v),
            _ => {}
        }
    }

    if presented_state.as_deref() != Some(csrf.secret().as_str()) {
        return bad_request("invalid state parameter");
    }
    let Some(code) = presented_code else {
        tracing::warn!(error = ?presented_error, "redirect carried no authorization code");
        return bad_request("no authorization code found");
    };
    if got
        .send(AuthorizationCode::new(code.into_owned()))
        .await
        .is_err()
    {
        return bad_request("authorization already completed");
    }
    Response::new(Full::new(Bytes::from_static(done_html.as_bytes())))
}

fn bad_request(message: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(message.as_bytes())));
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response
}
