//! Request builders and async operations for every API endpoint.
//!
//! # Design
//! `FlippingClient` holds only its configuration and a shared transport; it
//! carries no mutable state between calls and never stores a bearer token.
//! Each endpoint is split into a pure `build_*` method that produces an
//! `HttpRequest` and an operation method that dispatches it. Operations
//! start the exchange immediately and return a future, so a caller may fire
//! several calls and join them later.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::bridge::{dispatch, ResponseFuture, Transport};
use crate::config::ApiConfig;
use crate::error::{BuildError, ClassifiedError};
use crate::http::{HttpMethod, HttpRequest};
use crate::types::{Account, LoginRequest, SlotsUpdate, TokenResponse};

pub const ACCOUNT_PATH: &str = "account/self";
pub const ACCOUNT_REGISTRATION_PATH: &str = "account/register";
pub const TOKEN_REFRESH_PATH: &str = "auth/refresh";
pub const SLOT_UPDATE_PATH: &str = "ge/slots/update";
pub const TOKEN_PATH: &str = "auth/token";

/// Value of the client identification header sent with every request.
pub const USER_AGENT: &str = "FlippingUtilities";

/// Client for the trade-tracking API.
#[derive(Clone)]
pub struct FlippingClient {
    config: ApiConfig,
    transport: Arc<dyn Transport>,
}

impl FlippingClient {
    pub fn new(config: ApiConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Client using the process-wide configuration.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self::new(ApiConfig::global().clone(), transport)
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn build_fetch_accounts(&self, token: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.config.endpoint(ACCOUNT_PATH),
            headers: authenticated_headers(token),
            body: None,
        }
    }

    pub fn build_register_account(&self, token: &str, rsn: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!(
                "{}?rsn={}",
                self.config.endpoint(ACCOUNT_REGISTRATION_PATH),
                urlencoding::encode(rsn)
            ),
            headers: authenticated_headers(token),
            body: None,
        }
    }

    pub fn build_refresh_token(&self, token: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.config.endpoint(TOKEN_REFRESH_PATH),
            headers: authenticated_headers(token),
            body: None,
        }
    }

    pub fn build_update_slots(&self, token: &str, update: &SlotsUpdate) -> Result<HttpRequest, BuildError> {
        let body = serde_json::to_string(update)?;
        let mut headers = authenticated_headers(token);
        headers.push(json_content_type());
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: self.config.endpoint(SLOT_UPDATE_PATH),
            headers,
            body: Some(body),
        })
    }

    /// The only unauthenticated endpoint: trades a login token for an
    /// access token.
    pub fn build_exchange_login_token(&self, login_token: &str) -> Result<HttpRequest, BuildError> {
        let body = serde_json::to_string(&LoginRequest {
            token: login_token.to_string(),
        })?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: self.config.endpoint(TOKEN_PATH),
            headers: vec![client_header(), json_content_type()],
            body: Some(body),
        })
    }

    /// Accounts registered to the token's user.
    pub fn fetch_accounts(&self, token: &str) -> ResponseFuture<Vec<Account>> {
        dispatch(self.transport.as_ref(), self.build_fetch_accounts(token))
    }

    pub fn register_account(&self, token: &str, rsn: &str) -> ResponseFuture<Account> {
        dispatch(self.transport.as_ref(), self.build_register_account(token, rsn))
    }

    /// Trade `token` for a fresh access token.
    pub fn refresh_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<String, ClassifiedError>> + Send + 'static {
        access_token(dispatch(self.transport.as_ref(), self.build_refresh_token(token)))
    }

    /// Push slot snapshots; resolves to the number of slots the server ignored.
    pub fn update_slots(&self, token: &str, update: &SlotsUpdate) -> Result<ResponseFuture<i64>, BuildError> {
        Ok(dispatch(self.transport.as_ref(), self.build_update_slots(token, update)?))
    }

    pub fn exchange_login_token(
        &self,
        login_token: &str,
    ) -> Result<impl Future<Output = Result<String, ClassifiedError>> + Send + 'static, BuildError> {
        let request = self.build_exchange_login_token(login_token)?;
        Ok(access_token(dispatch(self.transport.as_ref(), request)))
    }
}

impl fmt::Debug for FlippingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlippingClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

async fn access_token(response: ResponseFuture<TokenResponse>) -> Result<String, ClassifiedError> {
    response.await.map(|token| token.access_token)
}

fn client_header() -> (String, String) {
    ("user-agent".to_string(), USER_AGENT.to_string())
}

fn json_content_type() -> (String, String) {
    ("content-type".to_string(), "application/json".to_string())
}

fn authenticated_headers(token: &str) -> Vec<(String, String)> {
    vec![
        client_header(),
        ("authorization".to_string(), format!("bearer {token}")),
    ]
}
