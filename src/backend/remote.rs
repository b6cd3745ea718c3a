//! HTTP client for a Supabase-compatible hosted service
//! (`/auth/v1`, `/rest/v1`, `/storage/v1`).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{
    AuthError, AuthEvent, AuthService, AuthSession, AuthState, AuthSubscription, AuthUser,
    Backend, BackendError, Connector, DataService, ObjectStorage, Procedures, Query, Row, Table,
    Upload, UserMetadata,
};

/// Shared HTTP pool and project credentials; `connect()` hands out per-session clients.
#[derive(Clone)]
pub struct RemoteConnector {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl RemoteConnector {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| transport("http", e))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }
}

impl Connector for RemoteConnector {
    fn connect(&self) -> Backend {
        let client = Arc::new(RemoteClient {
            inner: self.clone(),
            auth: AuthState::default(),
        });
        Backend {
            auth: client.clone(),
            data: client.clone(),
            storage: client.clone(),
            procedures: client,
        }
    }
}

pub struct RemoteClient {
    inner: RemoteConnector,
    auth: AuthState,
}

#[derive(Deserialize)]
struct RemoteUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

impl From<RemoteUser> for AuthUser {
    fn from(user: RemoteUser) -> Self {
        AuthUser {
            id: user.id,
            email: user.email.unwrap_or_default(),
            metadata: user.user_metadata,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: RemoteUser,
}

/// Sign-up answers with a session when confirmation is off, or with the bare user.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(RemoteUser),
}

fn transport(service: &'static str, e: reqwest::Error) -> BackendError {
    BackendError::Transport {
        service,
        message: e.to_string(),
    }
}

/// Pulls the human readable message out of an error body from any of the services.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}

async fn check(service: &'static str, response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        service,
        status: status.as_u16(),
        message: error_message(&body),
    })
}

fn filter_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

impl RemoteClient {
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let token = self
            .auth
            .access_token()
            .unwrap_or_else(|| self.inner.anon_key.clone());

        self.inner
            .http
            .request(method, format!("{}{}", self.inner.base_url, path))
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(token)
    }

    fn table_request(&self, method: Method, table: Table, query: &Query) -> RequestBuilder {
        let mut params: Vec<(String, String)> = query
            .filters
            .iter()
            .map(|f| (f.column.to_string(), format!("eq.{}", filter_value(&f.value))))
            .collect();

        if let Some(order) = &query.order {
            let dir = if order.descending { "desc" } else { "asc" };
            params.push(("order".to_string(), format!("{}.{}", order.column, dir)));
        }
        if let Some(limit) = query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        self.request(method, &format!("/rest/v1/{}", table.name()))
            .query(&params)
    }

    async fn rows(table: Table, response: Response) -> Result<Vec<Row>, BackendError> {
        response
            .json::<Vec<Row>>()
            .await
            .map_err(|e| BackendError::Decode {
                table: table.name(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl AuthService for RemoteClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let response = self
            .request(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| transport("auth", e))?;

        if matches!(
            response.status(),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED
        ) {
            debug!(status = %response.status(), "Sign-in rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let token: TokenResponse = check("auth", response)
            .await?
            .json()
            .await
            .map_err(|e| transport("auth", e))?;

        let session = AuthSession {
            access_token: token.access_token,
            user: token.user.into(),
        };
        self.auth.set(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<(), AuthError> {
        let response = self
            .request(Method::POST, "/auth/v1/signup")
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await
            .map_err(|e| transport("auth", e))?;

        let status = response.status();
        if status.is_client_error() {
            let message = error_message(&response.text().await.unwrap_or_default());
            if message.to_lowercase().contains("already registered") {
                return Err(AuthError::AlreadyRegistered);
            }
            return Err(AuthError::Rejected(message));
        }

        let body: SignUpResponse = check("auth", response)
            .await?
            .json()
            .await
            .map_err(|e| transport("auth", e))?;

        if let SignUpResponse::Session(token) = body {
            let session = AuthSession {
                access_token: token.access_token,
                user: token.user.into(),
            };
            self.auth.set(AuthEvent::SignedIn, Some(session));
        }
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let result = match self.auth.access_token() {
            Some(_) => self
                .request(Method::POST, "/auth/v1/logout")
                .send()
                .await
                .map_err(|e| transport("auth", e)),
            None => {
                self.auth.set(AuthEvent::SignedOut, None);
                return Ok(());
            }
        };

        // the local session is dropped even if the service could not be reached
        self.auth.set(AuthEvent::SignedOut, None);
        check("auth", result?).await.map(|_| ())
    }

    async fn current_user(&self) -> Result<Option<AuthUser>, BackendError> {
        if self.auth.access_token().is_none() {
            return Ok(None);
        }

        let response = self
            .request(Method::GET, "/auth/v1/user")
            .send()
            .await
            .map_err(|e| transport("auth", e))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }

        let user: RemoteUser = check("auth", response)
            .await?
            .json()
            .await
            .map_err(|e| transport("auth", e))?;
        Ok(Some(user.into()))
    }

    fn subscribe(&self) -> AuthSubscription {
        self.auth.subscribe()
    }
}

#[async_trait]
impl DataService for RemoteClient {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, BackendError> {
        let response = self
            .table_request(Method::GET, table, query)
            .query(&[("select", "*")])
            .send()
            .await
            .map_err(|e| transport("rest", e))?;

        Self::rows(table, check("rest", response).await?).await
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Row, BackendError> {
        let response = self
            .request(Method::POST, &format!("/rest/v1/{}", table.name()))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await
            .map_err(|e| transport("rest", e))?;

        Self::rows(table, check("rest", response).await?)
            .await?
            .into_iter()
            .next()
            .ok_or(BackendError::NoRows {
                table: table.name(),
            })
    }

    async fn update(&self, table: Table, query: &Query, patch: Row) -> Result<Row, BackendError> {
        let response = self
            .table_request(Method::PATCH, table, query)
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await
            .map_err(|e| transport("rest", e))?;

        Self::rows(table, check("rest", response).await?)
            .await?
            .into_iter()
            .next()
            .ok_or(BackendError::NoRows {
                table: table.name(),
            })
    }

    async fn delete(&self, table: Table, query: &Query) -> Result<(), BackendError> {
        if query.filters.is_empty() {
            warn!(table = table.name(), "Refusing unfiltered delete");
            return Err(BackendError::Status {
                service: "rest",
                status: 400,
                message: "DELETE requires a filter".to_string(),
            });
        }

        let response = self
            .table_request(Method::DELETE, table, query)
            .send()
            .await
            .map_err(|e| transport("rest", e))?;
        check("rest", response).await.map(|_| ())
    }
}

#[async_trait]
impl ObjectStorage for RemoteClient {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        file: &Upload,
        upsert: bool,
    ) -> Result<(), BackendError> {
        let response = self
            .request(Method::POST, &format!("/storage/v1/object/{bucket}/{path}"))
            .header("x-upsert", upsert.to_string())
            .header("content-type", &file.content_type)
            .body(file.bytes.clone())
            .send()
            .await
            .map_err(|e| transport("storage", e))?;
        check("storage", response).await.map(|_| ())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{bucket}/{path}",
            self.inner.base_url
        )
    }
}

#[async_trait]
impl Procedures for RemoteClient {
    async fn call(&self, name: &str, args: Value) -> Result<Value, BackendError> {
        let response = self
            .request(Method::POST, &format!("/rest/v1/rpc/{name}"))
            .json(&args)
            .send()
            .await
            .map_err(|e| transport("rpc", e))?;

        let body = check("rpc", response)
            .await?
            .text()
            .await
            .map_err(|e| transport("rpc", e))?;
        Ok(serde_json::from_str(&body).unwrap_or(Value::Null))
    }
}
