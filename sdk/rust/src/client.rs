use std::fmt;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug)]
pub enum SdkError {
    Http(reqwest::Error),
    /// The API answered with a non-success status.
    Api { status: StatusCode, detail: String },
    Decode(serde_json::Error),
}

impl fmt::Display for SdkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdkError::Http(e) => write!(f, "HTTP error: {}", e),
            SdkError::Api { status, detail } => write!(f, "API returned {}: {}", status, detail),
            SdkError::Decode(e) => write!(f, "Invalid response body: {}", e),
        }
    }
}

impl std::error::Error for SdkError {}

impl From<reqwest::Error> for SdkError {
    fn from(e: reqwest::Error) -> Self {
        SdkError::Http(e)
    }
}

impl SdkError {
    /// HTTP status for API failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SdkError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: Identity,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteForm {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_of_interest: Option<String>,
    pub project_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_budget: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub email: String,
    pub subscribed_at: String,
    pub updated_at: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedClients {
    pub clients: Vec<String>,
}

/// Typed client for the storefront API.
pub struct StorefrontClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    forwarded_for: Option<String>,
}

impl StorefrontClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            forwarded_for: None,
        }
    }

    /// Use `token` as the bearer credential on every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Send `X-Forwarded-For: <client>` so the gate keys on that identifier.
    pub fn with_forwarded_for(mut self, client: impl Into<String>) -> Self {
        self.forwarded_for = Some(client.into());
        self
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn prepare(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        match &self.forwarded_for {
            Some(client) => builder.header("X-Forwarded-For", client),
            None => builder,
        }
    }

    async fn parse<T: DeserializeOwned>(resp: Response) -> SdkResult<T> {
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(text);
            return Err(SdkError::Api { status, detail });
        }

        serde_json::from_str(&text).map_err(SdkError::Decode)
    }

    /// Unparsed GET, for callers that inspect status and headers themselves.
    pub async fn get_raw(&self, path: &str) -> Result<Response, reqwest::Error> {
        self.prepare(self.client.get(self.url(path))).send().await
    }

    pub async fn health(&self) -> SdkResult<Value> {
        let resp = self.get_raw("/api/health").await?;
        Self::parse(resp).await
    }

    pub async fn register(&self, registration: &Registration) -> SdkResult<Identity> {
        let resp = self
            .prepare(self.client.post(self.url("/api/auth/register")))
            .json(registration)
            .send()
            .await?;
        Self::parse(resp).await
    }

    /// Log in and keep the issued token for subsequent calls.
    pub async fn login(&mut self, email: &str, password: &str) -> SdkResult<LoginResponse> {
        let resp = self
            .prepare(self.client.post(self.url("/api/auth/login")))
            .form(&[("username", email), ("password", password)])
            .send()
            .await?;
        let login: LoginResponse = Self::parse(resp).await?;
        self.token = Some(login.access_token.clone());
        Ok(login)
    }

    pub async fn me(&self) -> SdkResult<Identity> {
        let resp = self.get_raw("/api/auth/me").await?;
        Self::parse(resp).await
    }

    pub async fn submit_contact(&self, form: &ContactForm) -> SdkResult<Value> {
        let resp = self
            .prepare(self.client.post(self.url("/api/contact")))
            .json(form)
            .send()
            .await?;
        Self::parse(resp).await
    }

    pub async fn submit_quote(&self, form: &QuoteForm) -> SdkResult<Value> {
        let resp = self
            .prepare(self.client.post(self.url("/api/quotes")))
            .json(form)
            .send()
            .await?;
        Self::parse(resp).await
    }

    pub async fn subscribe(&self, email: &str) -> SdkResult<Subscription> {
        self.newsletter("/api/newsletter/subscribe", email).await
    }

    pub async fn unsubscribe(&self, email: &str) -> SdkResult<Subscription> {
        self.newsletter("/api/newsletter/unsubscribe", email).await
    }

    async fn newsletter(&self, path: &str, email: &str) -> SdkResult<Subscription> {
        let resp = self
            .prepare(self.client.post(self.url(path)))
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;
        Self::parse(resp).await
    }

    pub async fn promote(&self, email: &str) -> SdkResult<Identity> {
        self.admin_user_action(email, "promote").await
    }

    pub async fn disable(&self, email: &str) -> SdkResult<Identity> {
        self.admin_user_action(email, "disable").await
    }

    pub async fn enable(&self, email: &str) -> SdkResult<Identity> {
        self.admin_user_action(email, "enable").await
    }

    async fn admin_user_action(&self, email: &str, action: &str) -> SdkResult<Identity> {
        let resp = self
            .prepare(self.client.post(self.url(&format!("/api/admin/users/{}/{}", email, action))))
            .send()
            .await?;
        Self::parse(resp).await
    }

    pub async fn blocked(&self) -> SdkResult<BlockedClients> {
        let resp = self.get_raw("/api/admin/security/blocked").await?;
        Self::parse(resp).await
    }

    pub async fn unblock(&self, client: &str) -> SdkResult<()> {
        let resp = self
            .prepare(self.client.delete(self.url(&format!("/api/admin/security/blocked/{}", client))))
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = resp.text().await?;
        Err(SdkError::Api { status, detail })
    }
}
