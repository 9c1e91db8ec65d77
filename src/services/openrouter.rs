use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Serialize};

use crate::models::Observation;
use crate::services::classifier::{ImageClassifier, ImageInput};

const API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

const LABEL_PROMPT: &str = "You are an image classifier. List what this photo shows as \
    ImageNet-style English labels (for example \"banana\", \"pizza\", \"golden_retriever\", \"laptop\"). \
    Return at most 15 labels, most likely first, each with a confidence between 0 and 1. \
    Answer ONLY with a JSON array in this exact format, no other text:\n\
    [{\"label\": \"banana\", \"confidence\": 0.92}]";

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        #[serde(rename = "type")]
        content_type: String,
        text: String,
    },
    ImageUrl {
        #[serde(rename = "type")]
        content_type: String,
        image_url: ImageData,
    },
}

#[derive(Debug, Serialize)]
struct ImageData {
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    content: String,
}

#[derive(Debug, Deserialize)]
struct LabelEntry {
    #[serde(alias = "identifier")]
    label: String,
    confidence: f64,
}

/// Classifies images with a vision model served through OpenRouter.
pub struct OpenRouterClassifier {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenRouterClassifier {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }

    fn build_request(&self, image: &ImageInput) -> ChatRequest {
        let base64_image = general_purpose::STANDARD.encode(&image.bytes);
        let data_url = format!("data:{};base64,{}", image.mime_type, base64_image);
        log::debug!("🔄 Base64 encoded size: {} bytes", base64_image.len());

        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        content_type: "text".to_string(),
                        text: LABEL_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        content_type: "image_url".to_string(),
                        image_url: ImageData { url: data_url },
                    },
                ],
            }],
            max_tokens: 500,
            temperature: 0.0,
        }
    }

    /// Extracts the label array from the model's answer, tolerating Markdown fences.
    fn parse_labels(content: &str) -> Result<Vec<Observation>> {
        let start = content.find('[');
        let end = content.rfind(']');
        let json = match (start, end) {
            (Some(start), Some(end)) if start < end => &content[start..=end],
            _ => anyhow::bail!("model answer contains no label array: {}", content),
        };

        let entries: Vec<LabelEntry> =
            serde_json::from_str(json).context("model answer is not a valid label array")?;

        let mut observations: Vec<Observation> = entries
            .into_iter()
            .filter_map(|entry| {
                let label = entry.label.trim();
                if label.is_empty() || !entry.confidence.is_finite() {
                    log::warn!("⚠️ Dropping malformed label entry {:?}", entry);
                    return None;
                }
                Some(Observation::new(label, entry.confidence.clamp(0.0, 1.0)))
            })
            .collect();

        observations.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(observations)
    }
}

#[async_trait::async_trait]
impl ImageClassifier for OpenRouterClassifier {
    async fn classify(&self, image: &ImageInput) -> Result<Vec<Observation>> {
        log::debug!("📸 Classifying {} image ({} bytes)", image.mime_type, image.bytes.len());

        let request = self.build_request(image);
        log::info!("🤖 Sending request to OpenRouter with model: {}", self.model);

        let response = self
            .client
            .post(API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", "https://github.com/calorie-lens")
            .header("X-Title", "Calorie Lens")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        log::debug!("📥 OpenRouter response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await?;
            log::error!("❌ OpenRouter API error response: {}", error_text);
            anyhow::bail!("OpenRouter API error ({}): {}", status, error_text);
        }

        let chat_response: ChatResponse = response.json().await?;
        let content = chat_response
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .context("OpenRouter returned no choices")?;
        log::debug!("💬 OpenRouter response content: {}", content);

        let observations = Self::parse_labels(content)?;
        log::info!("✅ Received {} labels", observations.len());
        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        let content = r#"[{"label": "pizza", "confidence": 0.4}, {"label": "cheese", "confidence": 0.85}]"#;
        let observations = OpenRouterClassifier::parse_labels(content).unwrap();

        assert_eq!(
            observations,
            vec![Observation::new("cheese", 0.85), Observation::new("pizza", 0.4)]
        );
    }

    #[test]
    fn test_parse_labels_in_code_fence() {
        let content = "Here you go:\n```json\n[\n  {\"identifier\": \"banana\", \"confidence\": 1.3},\n  {\"label\": \"  \", \"confidence\": 0.5},\n  {\"label\": \"plate\", \"confidence\": -0.2}\n]\n```";
        let observations = OpenRouterClassifier::parse_labels(content).unwrap();

        assert_eq!(
            observations,
            vec![Observation::new("banana", 1.0), Observation::new("plate", 0.0)]
        );
    }

    #[test]
    fn test_parse_labels_without_array() {
        assert!(OpenRouterClassifier::parse_labels("I see a banana.").is_err());
        assert!(OpenRouterClassifier::parse_labels("[not json]").is_err());
    }

    #[test]
    fn test_request_carries_data_url() {
        let classifier = OpenRouterClassifier::new("test_key".to_string(), "test_model".to_string());
        let image = ImageInput::from_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]).unwrap();

        let request = classifier.build_request(&image);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "test_model");
        assert_eq!(json["messages"][0]["content"][0]["type"], "text");
        assert_eq!(json["messages"][0]["content"][1]["type"], "image_url");
        assert_eq!(
            json["messages"][0]["content"][1]["image_url"]["url"],
            "data:image/jpeg;base64,/9j/4A=="
        );
    }
}
