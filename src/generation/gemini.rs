//! Gemini `generateContent` REST client.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::GeminiConfig;

/// Base64 image payload returned inline by an image model. The declared
/// `mimeType` is ignored; stored images are always PNG.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InlineImage {
    pub data: String,
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Concatenated text of the first candidate, `None` when it has none.
    async fn generate_text(&self, prompt: &str) -> anyhow::Result<Option<String>>;
    /// First inline image of the first candidate.
    async fn generate_image(&self, prompt: &str) -> anyhow::Result<Option<InlineImage>>;
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineImage>,
}

impl GenerateResponse {
    fn parts(&self) -> impl Iterator<Item = &ResponsePart> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .into_iter()
            .flat_map(|c| c.parts.iter())
    }

    fn text(&self) -> Option<String> {
        let text: String = self.parts().filter_map(|p| p.text.as_deref()).collect();
        (!text.is_empty()).then_some(text)
    }

    fn first_image(&self) -> Option<InlineImage> {
        self.parts()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|d| !d.data.is_empty())
            .cloned()
    }
}

pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        generation_config: Option<serde_json::Value>,
    ) -> anyhow::Result<GenerateResponse> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config,
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("call {model}"))?
            .error_for_status()
            .with_context(|| format!("{model} returned an error status"))?
            .json::<GenerateResponse>()
            .await
            .with_context(|| format!("decode {model} response"))?;

        debug!(%model, candidates = response.candidates.len(), "generateContent done");
        Ok(response)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> anyhow::Result<Option<String>> {
        let res = self.generate(&self.config.text_model, prompt, None).await?;
        Ok(res.text())
    }

    async fn generate_image(&self, prompt: &str) -> anyhow::Result<Option<InlineImage>> {
        let res = self
            .generate(
                &self.config.image_model,
                prompt,
                Some(json!({ "responseModalities": ["TEXT", "IMAGE"] })),
            )
            .await?;
        Ok(res.first_image())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_concatenates_first_candidate_parts() {
        let res: GenerateResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [ { "text": "{\"title\":" }, { "text": "\"Soup\"}" } ] } },
                { "content": { "parts": [ { "text": "ignored" } ] } }
            ]
        }))
        .unwrap();
        assert_eq!(res.text().as_deref(), Some("{\"title\":\"Soup\"}"));
    }

    #[test]
    fn empty_response_has_no_text_or_image() {
        let res: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(res.text(), None);
        assert_eq!(res.first_image(), None);
    }

    #[test]
    fn first_image_skips_text_parts() {
        let res: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [
                { "text": "Here is your dish" },
                { "inlineData": { "mimeType": "image/png", "data": "iVBORw0KGgo=" } }
            ] } }]
        }))
        .unwrap();
        let image = res.first_image().unwrap();
        assert_eq!(image.data, "iVBORw0KGgo=");
    }

    #[test]
    fn request_body_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: "hi" }],
            }],
            generation_config: Some(json!({ "responseModalities": ["TEXT", "IMAGE"] })),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(value["generationConfig"]["responseModalities"][1], "IMAGE");
    }
}
