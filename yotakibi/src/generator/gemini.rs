// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::generator::{parse_generated, EmberGenerator, GeneratedEmber, GeneratorError};

/// Base URL of the generative-content REST API.
pub const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Instructions sent with every generation request.
pub const PROMPT: &str = r#"You live at "Yotakibi", a quiet website where people share short night diaries.
Write one fictional diary entry (an ember) and one passphrase (tinder) for it.

Rules:
1. Answer only with a JSON object {"content": "...", "passphrase": "..."}, without markdown.
2. The content is a short monologue of 20 to 80 characters, in Japanese or English. It is poetic,
   philosophical or about small joys and loneliness of everyday life. It does not address anyone
   and never reveals that it was written by an AI. Nothing aggressive, political or offensive.
3. The passphrase is a meaningful word or phrase, not random characters, for example
   "雨の匂い", "midnight_blue" or "1998年の夏".

Example:
{"content": "コンビニの帰り道、月がやけに綺麗で立ち止まった。", "passphrase": "MeltingIce"}
"#;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// Generator asking Google's Gemini models for embers.
#[derive(Clone)]
pub struct GeminiGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl fmt::Debug for GeminiGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiGenerator")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiGenerator {
    /// Returns a generator for the given model, fails without API key.
    pub fn new(api_key: &str, model: &str) -> Result<Self, GeneratorError> {
        if api_key.is_empty() {
            return Err(GeneratorError::MissingCredential);
        }

        Ok(Self {
            client: Client::new(),
            endpoint: GEMINI_ENDPOINT.to_owned(),
            api_key: api_key.to_owned(),
            model: model.to_owned(),
        })
    }

    /// Sends requests to another base URL.
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_owned();
        self
    }

    fn url(&self) -> String {
        format!("{}/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl EmberGenerator for GeminiGenerator {
    async fn generate(&self) -> Result<GeneratedEmber, GeneratorError> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: PROMPT }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        debug!("Request ember from model {}", self.model);

        let response = self
            .client
            .post(self.url())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Generator answered with status {}", status);
            return Err(GeneratorError::Status(status.as_u16()));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|err| GeneratorError::Malformed(err.without_url().to_string()))?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| GeneratorError::Malformed("no candidates in answer".into()))?;

        parse_generated(&text)
    }
}

#[cfg(test)]
mod tests {
    use std::net::{SocketAddr, TcpListener};

    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use crate::generator::{EmberGenerator, GeneratorError};

    use super::GeminiGenerator;

    /// Serves a fake Gemini API on a random local port and returns its base URL.
    fn fake_upstream(status: StatusCode, answer: Value) -> String {
        let router = Router::new().route(
            "/:model",
            post(
                move |Path(model): Path<String>,
                      headers: HeaderMap,
                      Json(body): Json<Value>| async move {
                    assert_eq!(model, "test-model:generateContent");
                    assert_eq!(headers["x-goog-api-key"], "secret");
                    assert_eq!(
                        body["generationConfig"]["responseMimeType"],
                        "application/json"
                    );
                    (status, Json(answer))
                },
            ),
        );

        let listener = TcpListener::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap()).unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::Server::from_tcp(listener)
                .unwrap()
                .serve(router.into_make_service())
                .await
                .unwrap();
        });

        format!("http://{}", address)
    }

    fn answer(text: &str) -> Value {
        json!({
            "candidates": [
                { "content": { "parts": [ { "text": text } ] } }
            ]
        })
    }

    #[test]
    fn requires_api_key() {
        assert!(matches!(
            GeminiGenerator::new("", "test-model"),
            Err(GeneratorError::MissingCredential)
        ));
    }

    #[tokio::test]
    async fn generates_ember() {
        let endpoint = fake_upstream(
            StatusCode::OK,
            answer(r#"{"content": "夜風が少し冷たい", "aikotoba": "north_wind"}"#),
        );
        let generator = GeminiGenerator::new("secret", "test-model")
            .unwrap()
            .with_endpoint(&endpoint);

        let ember = generator.generate().await.unwrap();
        assert_eq!(ember.content, "夜風が少し冷たい");
        assert_eq!(ember.passphrase, "north_wind");
    }

    #[tokio::test]
    async fn upstream_error_status() {
        let endpoint = fake_upstream(StatusCode::SERVICE_UNAVAILABLE, json!({}));
        let generator = GeminiGenerator::new("secret", "test-model")
            .unwrap()
            .with_endpoint(&endpoint);

        assert!(matches!(
            generator.generate().await,
            Err(GeneratorError::Status(503))
        ));
    }

    #[tokio::test]
    async fn upstream_without_candidates() {
        let endpoint = fake_upstream(StatusCode::OK, json!({ "candidates": [] }));
        let generator = GeminiGenerator::new("secret", "test-model")
            .unwrap()
            .with_endpoint(&endpoint);

        assert!(matches!(
            generator.generate().await,
            Err(GeneratorError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_upstream() {
        let generator = GeminiGenerator::new("secret", "test-model")
            .unwrap()
            .with_endpoint("http://127.0.0.1:1");

        assert!(matches!(
            generator.generate().await,
            Err(GeneratorError::Request(_))
        ));
    }

    #[tokio::test]
    async fn api_key_stays_out_of_errors() {
        let generator = GeminiGenerator::new("TOPSECRETKEY", "test-model")
            .unwrap()
            .with_endpoint("http://127.0.0.1:1");

        let err = generator.generate().await.unwrap_err();
        assert!(!err.to_string().contains("TOPSECRETKEY"));
        assert!(!format!("{:?}", err).contains("TOPSECRETKEY"));
        assert!(!format!("{:?}", generator).contains("TOPSECRETKEY"));
    }
}
