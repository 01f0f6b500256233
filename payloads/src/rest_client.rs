use std::cell::RefCell;

use crate::{
    AuthStore, AuthUser, DataStore, Filter, Query, Row, StoreError,
    requests::PasswordCredentials,
};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

type ReqwestResult = Result<reqwest::Response, reqwest::Error>;

/// A client for the hosted store's REST and auth endpoints.
///
/// Requests are authorized with the signed-in user's access token when one
/// is held, and with the project's anon key otherwise, so row-level security
/// sees the right identity.
pub struct RestClient {
    pub address: String,
    pub inner_client: reqwest::Client,
    anon_key: SecretString,
    access_token: RefCell<Option<SecretString>>,
}

#[derive(Deserialize)]
struct Session {
    access_token: String,
    user: AuthUser,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(Session),
    /// Returned when the project requires email confirmation first.
    Unconfirmed(AuthUser),
}

/// Helper methods for http actions
impl RestClient {
    pub fn new(address: impl Into<String>, anon_key: SecretString) -> Self {
        Self {
            address: address.into(),
            inner_client: reqwest::Client::new(),
            anon_key,
            access_token: RefCell::new(None),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", &self.address)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", &self.address)
    }

    fn bearer(&self) -> String {
        match &*self.access_token.borrow() {
            Some(token) => token.expose_secret().to_string(),
            None => self.anon_key.expose_secret().to_string(),
        }
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.inner_client
            .request(method, url)
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(self.bearer())
    }

    async fn write(
        &self,
        method: Method,
        url: String,
        params: &[(String, String)],
        body: &impl Serialize,
    ) -> ReqwestResult {
        self.request(method, url)
            .query(params)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
    }

    pub fn is_signed_in(&self) -> bool {
        self.access_token.borrow().is_some()
    }
}

impl RestClient {
    fn hold_session(&self, session: Session) -> AuthUser {
        *self.access_token.borrow_mut() =
            Some(SecretString::from(session.access_token));
        tracing::debug!(user_id = %session.user.id, "signed in");
        session.user
    }
}

impl AuthStore for RestClient {
    async fn sign_in(
        &self,
        credentials: &PasswordCredentials,
    ) -> Result<AuthUser, StoreError> {
        let response = self
            .request(Method::POST, self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(credentials)
            .send()
            .await?;
        let session: Session = ok_body(response).await?;
        Ok(self.hold_session(session))
    }

    async fn sign_up(
        &self,
        credentials: &PasswordCredentials,
    ) -> Result<Option<AuthUser>, StoreError> {
        let response = self
            .request(Method::POST, self.auth_url("signup"))
            .json(credentials)
            .send()
            .await?;
        match ok_body(response).await? {
            SignUpResponse::Session(session) => {
                Ok(Some(self.hold_session(session)))
            }
            SignUpResponse::Unconfirmed(user) => {
                tracing::debug!(user_id = %user.id, "awaiting email confirmation");
                Ok(None)
            }
        }
    }

    async fn sign_out(&self) -> Result<(), StoreError> {
        if !self.is_signed_in() {
            return Ok(());
        }
        let response = self
            .request(Method::POST, self.auth_url("logout"))
            .send()
            .await;
        *self.access_token.borrow_mut() = None;
        ok_empty(response?).await
    }
}

impl DataStore for RestClient {
    async fn select(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<Vec<Row>, StoreError> {
        query.check()?;
        let response = self
            .request(Method::GET, self.table_url(table))
            .query(&query.to_params())
            .send()
            .await?;
        ok_body(response).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let response = self
            .write(Method::POST, self.table_url(table), &[], &row)
            .await?;
        let rows: Vec<Row> = ok_body(response).await?;
        rows.into_iter().next().ok_or_else(|| {
            StoreError::Decode(format!("insert into {table} returned no row"))
        })
    }

    async fn update(
        &self,
        table: &str,
        id: &str,
        patch: Row,
    ) -> Result<Row, StoreError> {
        let params = Filter::new().eq("id", id).to_params();
        let response = self
            .write(Method::PATCH, self.table_url(table), &params, &patch)
            .await?;
        let rows: Vec<Row> = ok_body(response).await?;
        // Row-level security hides rows the user can't touch, so an empty
        // result means not found from this user's point of view.
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("{table} {id}")))
    }

    async fn delete(
        &self,
        table: &str,
        filter: &Filter,
    ) -> Result<(), StoreError> {
        filter.check()?;
        let response = self
            .request(Method::DELETE, self.table_url(table))
            .query(&filter.to_params())
            .send()
            .await?;
        ok_empty(response).await
    }

    async fn current_user(&self) -> Result<Option<AuthUser>, StoreError> {
        if !self.is_signed_in() {
            return Ok(None);
        }
        let response = self
            .request(Method::GET, self.auth_url("user"))
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        ok_body(response).await.map(Some)
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StoreError::Decode(e.to_string())
        } else {
            StoreError::Network(e.to_string())
        }
    }
}

/// Map an unsuccessful status to the store error taxonomy.
pub fn status_error(status: StatusCode, message: String) -> StoreError {
    match status {
        StatusCode::CONFLICT => StoreError::Conflict(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StoreError::Permission(message)
        }
        StatusCode::NOT_FOUND => StoreError::NotFound(message),
        _ => StoreError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Deserialize a successful request into the desired type, or return an
/// appropriate error.
pub async fn ok_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, StoreError> {
    if !response.status().is_success() {
        return Err(status_error(response.status(), response.text().await?));
    }
    Ok(response.json::<T>().await?)
}

/// Check that an empty response is OK, returning a StoreError if not.
pub async fn ok_empty(response: reqwest::Response) -> Result<(), StoreError> {
    if !response.status().is_success() {
        return Err(status_error(response.status(), response.text().await?));
    }
    Ok(())
}
