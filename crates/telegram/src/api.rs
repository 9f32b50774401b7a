use std::time::Duration;

use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keyboard::ReplyMarkup;

/// Extra time the HTTP client waits beyond the server-side long-poll window.
const POLL_GRACE_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("telegram request failed: {0}")]
    Http(reqwest::Error),
    #[error("telegram rejected `{method}` ({code}): {description}")]
    Rejected { method: &'static str, code: i64, description: String },
    #[error("telegram response to `{0}` carried no result")]
    MissingResult(&'static str),
    #[error("telegram file `{0}` has no download path")]
    MissingFilePath(String),
    #[error("could not encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ApiError {
    // Request URLs embed the bot token.
    fn from(error: reqwest::Error) -> Self {
        Self::Http(error.without_url())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub file_size: Option<u64>,
}

impl Message {
    /// Telegram sends every photo in several resolutions; the largest is kept.
    pub fn largest_photo(&self) -> Option<&PhotoSize> {
        self.photo.as_deref()?.iter().max_by_key(|size| {
            (size.file_size.unwrap_or(0), u64::from(size.width) * u64::from(size.height))
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct File {
    pub file_id: String,
    #[serde(default)]
    pub file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &'static str) -> Result<T, ApiError> {
        if !self.ok {
            return Err(ApiError::Rejected {
                method,
                code: self.error_code.unwrap_or_default(),
                description: self.description.unwrap_or_else(|| "no description".to_owned()),
            });
        }
        self.result.ok_or(ApiError::MissingResult(method))
    }
}

#[derive(Serialize)]
struct GetUpdatesRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    reply_markup: &'a ReplyMarkup,
}

#[derive(Serialize)]
struct GetFileRequest<'a> {
    file_id: &'a str,
}

/// Thin client for the handful of Bot API methods the bot uses.
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
    poll_timeout_secs: u64,
}

impl TelegramClient {
    pub fn new(
        base_url: impl Into<String>,
        token: SecretString,
        poll_timeout_secs: u64,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + POLL_GRACE_SECS))
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { http, base_url, token, poll_timeout_secs })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token.expose_secret(), method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.base_url, self.token.expose_secret(), file_path)
    }

    async fn call<B, T>(&self, method: &'static str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.http.post(self.method_url(method)).json(body).send().await?;
        let payload = response.json::<ApiResponse<T>>().await?;
        payload.into_result(method)
    }

    /// Long-polls for message updates newer than `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, ApiError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: self.poll_timeout_secs,
            allowed_updates: &["message"],
        };
        self.call("getUpdates", &request).await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: &ReplyMarkup,
    ) -> Result<(), ApiError> {
        let request = SendMessageRequest { chat_id, text, reply_markup: markup };
        self.call::<_, IgnoredAny>("sendMessage", &request).await?;
        Ok(())
    }

    pub async fn send_photo(
        &self,
        chat_id: i64,
        photo: Vec<u8>,
        caption: &str,
        markup: &ReplyMarkup,
    ) -> Result<(), ApiError> {
        let part = Part::bytes(photo).file_name("photo.jpg").mime_str("image/jpeg")?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_owned())
            .text("reply_markup", serde_json::to_string(markup)?)
            .part("photo", part);

        let response =
            self.http.post(self.method_url("sendPhoto")).multipart(form).send().await?;
        response.json::<ApiResponse<IgnoredAny>>().await?.into_result("sendPhoto")?;
        Ok(())
    }

    pub async fn get_file(&self, file_id: &str) -> Result<File, ApiError> {
        self.call("getFile", &GetFileRequest { file_id }).await
    }

    /// Resolves `file_id` and downloads its contents.
    pub async fn download(&self, file_id: &str) -> Result<Vec<u8>, ApiError> {
        let file = self.get_file(file_id).await?;
        let file_path = file.file_path.ok_or_else(|| ApiError::MissingFilePath(file.file_id))?;

        let response =
            self.http.get(self.file_url(&file_path)).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::{ApiError, ApiResponse, Message, TelegramClient, Update};

    fn client() -> TelegramClient {
        TelegramClient::new("https://api.example.test/", SecretString::from("1:abc".to_owned()), 30)
            .expect("build client")
    }

    #[test]
    fn urls_embed_token_and_trim_base() {
        let client = client();
        assert_eq!(client.method_url("getMe"), "https://api.example.test/bot1:abc/getMe");
        assert_eq!(
            client.file_url("photos/file_1.jpg"),
            "https://api.example.test/file/bot1:abc/photos/file_1.jpg"
        );
    }

    #[test]
    fn text_update_deserializes() {
        let update: Update = serde_json::from_str(
            r#"{"update_id": 10, "message": {"message_id": 1, "chat": {"id": 5},
                "from": {"id": 7, "is_bot": false, "username": "op"}, "text": "/start"}}"#,
        )
        .expect("parse update");

        let message = update.message.expect("message present");
        assert_eq!(update.update_id, 10);
        assert_eq!(message.text.as_deref(), Some("/start"));
        assert_eq!(message.from.map(|user| user.id), Some(7));
    }

    #[test]
    fn largest_photo_size_wins() {
        let message: Message = serde_json::from_str(
            r#"{"message_id": 1, "chat": {"id": 5}, "photo": [
                {"file_id": "small", "width": 90, "height": 90, "file_size": 1000},
                {"file_id": "large", "width": 1280, "height": 960, "file_size": 90000},
                {"file_id": "medium", "width": 320, "height": 240, "file_size": 12000}
            ]}"#,
        )
        .expect("parse message");

        assert_eq!(message.largest_photo().map(|size| size.file_id.as_str()), Some("large"));
    }

    #[test]
    fn rejected_response_keeps_description() {
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(
            r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#,
        )
        .expect("parse response");

        let error = response.into_result("getUpdates").expect_err("should be rejected");
        assert!(matches!(
            error,
            ApiError::Rejected { method: "getUpdates", code: 401, ref description }
                if description == "Unauthorized"
        ));
    }
}
