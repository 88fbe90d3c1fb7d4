use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::{EmbedError, EmbedResult, EmbeddingService};
use crate::settings::EmbeddingSettings;

/// OpenAI-compatible `/embeddings` endpoint, optionally mirroring vectors to a store URL.
pub struct HttpEmbeddingService {
    client: Client,
    api_base_url: String,
    model: String,
    api_key: String,
    store_url: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct StoreRequest<'a> {
    id: &'a str,
    vector: &'a [f32],
}

impl HttpEmbeddingService {
    pub fn from_settings(settings: &EmbeddingSettings) -> EmbedResult<Self> {
        let api_key = std::env::var(&settings.api_key_env).map_err(|_| {
            EmbedError::Config(format!(
                "environment variable {} is not set",
                settings.api_key_env
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|error| EmbedError::Config(error.to_string()))?;

        Ok(Self {
            client,
            api_base_url: settings.api_base_url.trim_end_matches('/').to_owned(),
            model: settings.model.clone(),
            api_key,
            store_url: settings.remote_store_url().map(str::to_owned),
        })
    }

    fn check_status(response: reqwest::blocking::Response) -> EmbedResult<reqwest::blocking::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        Err(EmbedError::RemoteService {
            status: status.as_u16(),
            body,
        })
    }
}

impl EmbeddingService for HttpEmbeddingService {
    fn compute_embedding(&self, text: &str) -> EmbedResult<Vec<f32>> {
        let url = format!("{}/embeddings", self.api_base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                input: text,
                model: &self.model,
            })
            .send()
            .map_err(|error| EmbedError::Network(error.to_string()))?;

        let parsed: EmbeddingResponse = Self::check_status(response)?
            .json()
            .map_err(|error| EmbedError::Decode(error.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .filter(|embedding| !embedding.is_empty())
            .ok_or_else(|| EmbedError::Decode("response contained no embedding".to_owned()))
    }

    fn persists_remotely(&self) -> bool {
        self.store_url.is_some()
    }

    fn persist_embedding(&self, document_id: &str, vector: &[f32]) -> EmbedResult<()> {
        let Some(url) = &self.store_url else {
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&StoreRequest {
                id: document_id,
                vector,
            })
            .send()
            .map_err(|error| EmbedError::Network(error.to_string()))?;
        Self::check_status(response)?;
        Ok(())
    }
}
