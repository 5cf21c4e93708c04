//! Telegram adapter

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::errors::PlatformError;
use crate::domain::entities::{BotCommand, CommandScope, Update};
use crate::domain::traits::PlatformClient;

/// Telegram API base URL
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Telegram bot adapter speaking the Bot API over HTTPS.
pub struct TelegramAdapter {
    token: String,
    api_url: String,
    client: Client,
}

/// Bot identity as reported by `getMe`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    pub first_name: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl TelegramAdapter {
    pub fn new(token: impl Into<String>, api_url: Option<&str>) -> Self {
        Self {
            token: token.into(),
            api_url: api_url.unwrap_or(DEFAULT_API_URL).to_string(),
            client: Client::new(),
        }
    }

    /// Get the API URL for a method
    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    async fn call<T, B>(&self, method: &str, body: &B) -> Result<T, PlatformError>
    where
        T: serde::de::DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PlatformError::Api(format!(
                "{} failed: {}",
                method,
                response.status()
            )));
        }

        let data: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))?;
        if !data.ok {
            return Err(PlatformError::Api(
                data.description
                    .unwrap_or_else(|| format!("{method} failed")),
            ));
        }
        data.result
            .ok_or_else(|| PlatformError::Decode(format!("{method}: empty result")))
    }

    /// Fetch the bot identity; called once at startup.
    pub async fn me(&self) -> Result<BotIdentity, PlatformError> {
        self.call("getMe", &serde_json::json!({})).await
    }
}

#[async_trait]
impl PlatformClient for TelegramAdapter {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), PlatformError> {
        #[derive(Serialize)]
        struct SendMessage<'a> {
            chat_id: i64,
            text: &'a str,
        }

        let _message: serde_json::Value = self
            .call("sendMessage", &SendMessage { chat_id, text })
            .await?;
        Ok(())
    }

    async fn get_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<Vec<Update>, PlatformError> {
        #[derive(Serialize)]
        struct GetUpdates {
            offset: i64,
            timeout: u64,
        }

        self.call(
            "getUpdates",
            &GetUpdates {
                offset,
                timeout: timeout.as_secs(),
            },
        )
        .await
    }

    async fn set_commands(
        &self,
        scope: &CommandScope,
        locale: Option<&str>,
        commands: &[BotCommand],
    ) -> Result<(), PlatformError> {
        #[derive(Serialize)]
        struct SetMyCommands<'a> {
            commands: &'a [BotCommand],
            #[serde(skip_serializing_if = "Option::is_none")]
            scope: Option<&'a CommandScope>,
            #[serde(skip_serializing_if = "Option::is_none")]
            language_code: Option<&'a str>,
        }

        // The default scope is expressed by omitting the field on the wire.
        let scope_field = if *scope == CommandScope::Default {
            None
        } else {
            Some(scope)
        };
        let _ok: serde_json::Value = self
            .call(
                "setMyCommands",
                &SetMyCommands {
                    commands,
                    scope: scope_field,
                    language_code: locale,
                },
            )
            .await?;
        Ok(())
    }
}
