use anyhow::{Result, anyhow, bail};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;

const IMGUR_UPLOAD_URL: &str = "https://api.imgur.com/3/image";

/// Thin client for the image host. Failures reject the enclosing
/// operation; nothing is retried here.
pub struct ImgurClient {
    http: reqwest::Client,
    client_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImgurResponse {
    success: bool,
    data: Option<ImgurData>,
}

#[derive(Debug, Deserialize)]
struct ImgurData {
    link: Option<String>,
}

impl ImgurClient {
    pub fn new(client_id: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
        }
    }

    /// Upload a raw base64 payload (no data-URL prefix) and return the
    /// durable public URL.
    pub async fn upload_base64(&self, payload: &str) -> Result<String> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| anyhow!("IMGUR_CLIENT_ID is not configured"))?;

        let response = self
            .http
            .post(IMGUR_UPLOAD_URL)
            .header(AUTHORIZATION, format!("Client-ID {client_id}"))
            .form(&[("image", payload), ("type", "base64")])
            .send()
            .await?
            .error_for_status()?;

        let body: ImgurResponse = response.json().await?;
        if !body.success {
            bail!("image host rejected the upload");
        }
        body.data
            .and_then(|d| d.link)
            .ok_or_else(|| anyhow!("image host response carried no link"))
    }
}
