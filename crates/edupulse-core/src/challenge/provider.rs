//! Remote challenge generation with a local fallback.
//!
//! Talks to the Generative Language REST API: one `generateContent` call in
//! JSON mode picks the challenge, and counting challenges need a second
//! `predict` call on the image model. Any failure along the way, including a
//! failed image step, yields [`EngagementChallenge::fallback`].

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use indoc::indoc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::model::EngagementChallenge;
use crate::error::ChallengeError;
use crate::storage::ChallengeConfig;

const CHALLENGE_PROMPT: &str = indoc! {r#"
    You are an AI assistant designed to create a brief, engaging micro-challenge to help a distracted student re-focus.
    Choose one of the following challenge types: 'joke', 'fun_fact', or 'counting'.
    Based on your choice, create the content for the challenge.
    Return a single, valid JSON object with a "type" field and the corresponding content fields.

    The required structures are:
    - For 'joke': { "type": "joke", "question": "A short, classroom-appropriate joke question.", "punchline": "The punchline." }
    - For 'fun_fact': { "type": "fun_fact", "fact": "A surprising and interesting fun fact, in a single sentence." }
    - For 'counting': { "type": "counting", "imagePrompt": "A simple prompt for an AI image generator, e.g., 'Three cartoon robots waving'", "question": "A question asking to count the items.", "correctAnswer": a number between 2 and 9 }
"#};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// What the text model is asked to return.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum GeneratedChallenge {
    Joke {
        question: String,
        punchline: String,
    },
    FunFact {
        fact: String,
    },
    Counting {
        #[serde(rename = "imagePrompt")]
        image_prompt: String,
        question: String,
        #[serde(rename = "correctAnswer")]
        correct_answer: u32,
    },
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(rename = "bytesBase64Encoded")]
    bytes_base64: Option<String>,
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
}

struct Remote {
    client: Client,
    base_url: Url,
    api_key: String,
    text_model: String,
    image_model: String,
}

/// Produces challenges. Construction and generation never fail.
pub struct ChallengeProvider {
    remote: Option<Remote>,
}

impl ChallengeProvider {
    /// Provider that always returns the fallback.
    pub fn local() -> Self {
        Self { remote: None }
    }

    pub fn new(config: &ChallengeConfig) -> Self {
        if !config.has_remote_challenge_provider() {
            tracing::info!("no remote challenge provider configured, using fallback challenges");
            return Self::local();
        }
        match Remote::build(config) {
            Ok(remote) => Self {
                remote: Some(remote),
            },
            Err(err) => {
                tracing::warn!(%err, "remote challenge provider unavailable, using fallback challenges");
                Self::local()
            }
        }
    }

    pub fn has_remote_challenge_provider(&self) -> bool {
        self.remote.is_some()
    }

    pub async fn generate(&self) -> EngagementChallenge {
        match self.try_generate().await {
            Ok(challenge) => challenge,
            Err(ChallengeError::NotConfigured) => EngagementChallenge::fallback(),
            Err(err) => {
                tracing::warn!(%err, "challenge generation failed, using fallback");
                EngagementChallenge::fallback()
            }
        }
    }

    /// Remote generation without the fallback.
    pub async fn try_generate(&self) -> Result<EngagementChallenge, ChallengeError> {
        let remote = self.remote.as_ref().ok_or(ChallengeError::NotConfigured)?;
        match remote.generate_text().await? {
            GeneratedChallenge::Joke {
                question,
                punchline,
            } => Ok(EngagementChallenge::Joke {
                question,
                punchline,
            }),
            GeneratedChallenge::FunFact { fact } => Ok(EngagementChallenge::FunFact { fact }),
            GeneratedChallenge::Counting {
                image_prompt,
                question,
                correct_answer,
            } => {
                let image_url = remote.generate_image(&image_prompt).await?;
                Ok(EngagementChallenge::Counting {
                    question,
                    correct_answer,
                    image_url,
                })
            }
        }
    }
}

impl Remote {
    fn build(config: &ChallengeConfig) -> Result<Self, ChallengeError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ChallengeError::NotConfigured)?;
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            api_key,
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> Result<Url, ChallengeError> {
        Ok(self
            .base_url
            .join(&format!("v1beta/models/{model}:{method}"))?)
    }

    async fn generate_text(&self) -> Result<GeneratedChallenge, ChallengeError> {
        let url = self.endpoint(&self.text_model, "generateContent")?;
        let body = json!({
            "contents": [{ "parts": [{ "text": CHALLENGE_PROMPT }] }],
            "generationConfig": { "responseMimeType": "application/json" },
        });
        let resp = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ChallengeError::HttpStatus {
                stage: "text",
                status: status.as_u16(),
            });
        }

        let parsed: GenerateContentResponse = resp.json().await?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ChallengeError::Malformed {
                stage: "text",
                message: "no text in response".into(),
            });
        }
        serde_json::from_str(strip_code_fence(&text)).map_err(|e| ChallengeError::Malformed {
            stage: "text",
            message: e.to_string(),
        })
    }

    /// Returns a `data:` URL for the generated picture.
    async fn generate_image(&self, prompt: &str) -> Result<String, ChallengeError> {
        let url = self.endpoint(&self.image_model, "predict")?;
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": {
                "sampleCount": 1,
                "aspectRatio": "16:9",
                "outputOptions": { "mimeType": "image/png" },
            },
        });
        let resp = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ChallengeError::HttpStatus {
                stage: "image",
                status: status.as_u16(),
            });
        }

        let parsed: PredictResponse = resp.json().await?;
        let prediction = parsed
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| ChallengeError::ImageFailed("no image returned".into()))?;
        let encoded = prediction
            .bytes_base64
            .filter(|b| !b.is_empty())
            .ok_or_else(|| ChallengeError::ImageFailed("empty image payload".into()))?;
        // Reject garbage instead of handing a broken image to the UI.
        BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| ChallengeError::ImageFailed(e.to_string()))?;
        let mime = prediction.mime_type.unwrap_or_else(|| "image/png".into());
        Ok(format!("data:{mime};base64,{encoded}"))
    }
}

/// Models sometimes wrap JSON mode output in a markdown fence.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
