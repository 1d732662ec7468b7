use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::ApiError;
use crate::payload::SelectionPayload;

const USER_AGENT: &str = "acsform/0.1.0";
const MAX_REDIRECTS: usize = 5;

/// Body of a URL-generation response. The service sends either `api_url` or `error`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GenerateUrlResponse {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// The two endpoints the form session talks to.
#[async_trait]
pub trait FormApi: Send + Sync {
    async fn generate_url(&self, payload: &SelectionPayload)
        -> Result<GenerateUrlResponse, ApiError>;

    /// Returns the replacement document markup, whatever the HTTP status.
    async fn process_data(&self, payload: &SelectionPayload) -> Result<String, ApiError>;
}

pub struct WebClient {
    client: Client,
    generate_url: Url,
    process_data: Url,
    login: Url,
}

impl WebClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let base = Url::parse(&config.server_url)?;
        Ok(Self {
            client: builder.build()?,
            generate_url: base.join(&config.generate_url_path)?,
            process_data: base.join(&config.process_data_path)?,
            login: base.join(&config.login_path)?,
        })
    }

    /// Opens a server session; the cookie is kept for later requests.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.login.clone())
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let login: LoginResponse = match serde_json::from_str(&body) {
            Ok(login) => login,
            Err(_) if !status.is_success() => return Err(ApiError::Status { status, body }),
            Err(e) => return Err(e.into()),
        };
        if login.success {
            info!(username, "logged in");
            Ok(())
        } else {
            Err(ApiError::LoginRejected(
                login.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

#[async_trait]
impl FormApi for WebClient {
    async fn generate_url(
        &self,
        payload: &SelectionPayload,
    ) -> Result<GenerateUrlResponse, ApiError> {
        debug!(url = %self.generate_url, fields = payload.len(), "requesting API URL");
        let response = self
            .client
            .post(self.generate_url.clone())
            .json(payload)
            .send()
            .await?;

        // Error responses carry an {"error": ...} body, so the status is not checked here.
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, "URL generation responded");
        Ok(serde_json::from_str(&body)?)
    }

    async fn process_data(&self, payload: &SelectionPayload) -> Result<String, ApiError> {
        debug!(url = %self.process_data, "submitting for processing");
        let response = self
            .client
            .post(self.process_data.clone())
            .json(payload)
            .send()
            .await?;

        // Failures come back as an {"error": ...} body, which still replaces the page.
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(%status, %body, "processing responded with an error status");
        }
        Ok(body)
    }
}


#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub enum Reply<T> {
        Ok(T),
        Fail,
    }

    /// Scripted `FormApi` that records every payload it receives.
    #[derive(Default)]
    pub struct FakeApi {
        generate_replies: Mutex<VecDeque<Reply<GenerateUrlResponse>>>,
        process_replies: Mutex<VecDeque<Reply<String>>>,
        generate_calls: Mutex<Vec<SelectionPayload>>,
        process_calls: Mutex<Vec<SelectionPayload>>,
    }

    impl FakeApi {
        pub fn generating(response: GenerateUrlResponse) -> Self {
            let api = Self::default();
            api.generate_replies
                .lock()
                .unwrap()
                .push_back(Reply::Ok(response));
            api
        }

        pub fn generating_url(url: &str) -> Self {
            Self::generating(GenerateUrlResponse {
                api_url: Some(url.to_string()),
                error: None,
            })
        }

        pub fn then_processing(self, reply: Reply<String>) -> Self {
            self.process_replies.lock().unwrap().push_back(reply);
            self
        }

        pub fn generate_calls(&self) -> Vec<SelectionPayload> {
            self.generate_calls.lock().unwrap().clone()
        }

        pub fn process_calls(&self) -> Vec<SelectionPayload> {
            self.process_calls.lock().unwrap().clone()
        }

        fn server_error() -> ApiError {
            ApiError::Status {
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                body: r#"{"error": "boom"}"#.to_string(),
            }
        }
    }

    #[async_trait]
    impl FormApi for FakeApi {
        async fn generate_url(
            &self,
            payload: &SelectionPayload,
        ) -> Result<GenerateUrlResponse, ApiError> {
            self.generate_calls.lock().unwrap().push(payload.clone());
            match self.generate_replies.lock().unwrap().pop_front() {
                Some(Reply::Ok(response)) => Ok(response),
                _ => Err(Self::server_error()),
            }
        }

        async fn process_data(&self, payload: &SelectionPayload) -> Result<String, ApiError> {
            self.process_calls.lock().unwrap().push(payload.clone());
            match self.process_replies.lock().unwrap().pop_front() {
                Some(Reply::Ok(html)) => Ok(html),
                _ => Err(Self::server_error()),
            }
        }
    }
}
