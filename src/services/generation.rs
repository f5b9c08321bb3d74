//! Answer generation from retrieved chunks.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GenerationError;
use crate::models::{GenerationConfig, SearchResult};
use crate::utils::retry::{RetryConfig, with_retry};
use crate::utils::text::terms;

const SYSTEM_PROMPT: &str = "You answer questions using only the numbered context chunks you are given. \
If the context does not contain the answer, say that you don't know. Do not invent facts.";

/// Returned when nothing retrieved relates to the question.
pub const NO_ANSWER: &str = "I could not find relevant information in the indexed documents.";

/// Turns a question plus retrieved context into an answer.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(
        &self,
        question: &str,
        chunks: &[SearchResult],
    ) -> Result<String, GenerationError>;
}

/// User message: numbered chunks followed by the question.
pub fn build_prompt(question: &str, chunks: &[SearchResult]) -> String {
    let mut prompt = String::from("Context:\n");
    for (i, chunk) in chunks.iter().enumerate() {
        prompt.push_str(&format!("[{}] {}\n\n", i + 1, chunk.content.trim()));
    }
    if chunks.is_empty() {
        prompt.push_str("(no context retrieved)\n\n");
    }
    prompt.push_str("Question: ");
    prompt.push_str(question.trim());
    prompt
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions client.
pub struct ChatGenerator {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retry: RetryConfig,
}

impl ChatGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let api_key = config.api_key.as_deref().unwrap_or_default().trim();
        if api_key.is_empty() {
            return Err(GenerationError::ConnectionError(
                "missing OpenAI API key".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| GenerationError::ConnectionError(format!("invalid API key: {}", e)))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .default_headers(headers)
            .build()
            .map_err(|e| GenerationError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry: RetryConfig::new(config.max_retries),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout
                } else if e.is_connect() {
                    GenerationError::ConnectionError(e.to_string())
                } else {
                    GenerationError::RequestError(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::ServerError(format!(
                "status {}: {}",
                status.as_u16(),
                text
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| GenerationError::InvalidResponse("no choices returned".to_string()))
    }
}

#[async_trait]
impl AnswerGenerator for ChatGenerator {
    async fn generate(
        &self,
        question: &str,
        chunks: &[SearchResult],
    ) -> Result<String, GenerationError> {
        let prompt = build_prompt(question, chunks);
        debug!(model = %self.model, chunks = chunks.len(), "requesting completion");
        with_retry(&self.retry, "chat completion", || self.complete(&prompt))
            .await
            .into_result()
    }
}

static STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "did", "do", "does", "for", "from", "how",
    "in", "is", "it", "of", "on", "or", "that", "the", "this", "to", "was", "were", "what",
    "when", "where", "which", "who", "why", "with",
];

/// Offline generator that quotes the retrieved sentences sharing the most
/// content terms with the question.
#[derive(Debug, Clone)]
pub struct ExtractiveGenerator {
    max_sentences: usize,
}

impl ExtractiveGenerator {
    pub fn new(max_sentences: usize) -> Self {
        Self {
            max_sentences: max_sentences.max(1),
        }
    }

    fn content_terms(text: &str) -> HashSet<String> {
        terms(text)
            .filter(|t| !STOP_WORDS.contains(&t.as_str()))
            .collect()
    }
}

impl Default for ExtractiveGenerator {
    fn default() -> Self {
        Self::new(3)
    }
}

#[async_trait]
impl AnswerGenerator for ExtractiveGenerator {
    async fn generate(
        &self,
        question: &str,
        chunks: &[SearchResult],
    ) -> Result<String, GenerationError> {
        let wanted = Self::content_terms(question);
        if wanted.is_empty() || chunks.is_empty() {
            return Ok(NO_ANSWER.to_string());
        }

        // (overlap, position) for every sentence; position keeps reading order.
        let sentences: Vec<&str> = chunks
            .iter()
            .flat_map(|chunk| split_sentences(&chunk.content))
            .collect();
        let mut scored: Vec<(usize, usize)> = sentences
            .iter()
            .enumerate()
            .map(|(pos, sentence)| {
                let overlap = Self::content_terms(sentence)
                    .intersection(&wanted)
                    .count();
                (overlap, pos)
            })
            .filter(|(overlap, _)| *overlap > 0)
            .collect();

        if scored.is_empty() {
            return Ok(NO_ANSWER.to_string());
        }

        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(self.max_sentences);
        scored.sort_by_key(|(_, pos)| *pos);

        let mut seen = HashSet::new();
        let picked: Vec<&str> = scored
            .into_iter()
            .map(|(_, pos)| sentences[pos])
            .filter(|s| seen.insert(*s))
            .collect();
        Ok(picked.join(" "))
    }
}

/// Split on `.`, `!`, `?` followed by whitespace, and on newlines.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let boundary = match c {
            '\n' => Some(i),
            '.' | '!' | '?' => match chars.peek() {
                None => Some(i + c.len_utf8()),
                Some((_, next)) if next.is_whitespace() => Some(i + c.len_utf8()),
                _ => None,
            },
            _ => None,
        };
        if let Some(end) = boundary {
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str) -> SearchResult {
        SearchResult {
            chunk_id: "c".to_string(),
            document_id: "d".to_string(),
            source: "notes.txt".to_string(),
            content: content.to_string(),
            chunk_index: 0,
            score: 1.0,
        }
    }

    #[test]
    fn test_build_prompt_numbers_chunks() {
        let prompt = build_prompt(
            " What color is the sky? ",
            &[chunk("The sky is blue."), chunk("Grass is green.")],
        );
        assert!(prompt.starts_with("Context:\n[1] The sky is blue.\n\n[2] Grass is green."));
        assert!(prompt.ends_with("Question: What color is the sky?"));
    }

    #[test]
    fn test_chat_generator_endpoint() {
        assert!(ChatGenerator::new(&GenerationConfig::default()).is_err());

        let config = GenerationConfig {
            base_url: "http://localhost:11434/v1/".to_string(),
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let generator = ChatGenerator::new(&config).unwrap();
        assert_eq!(generator.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn test_chat_response_parsing() {
        let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":" Blue. "}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some(" Blue. "));
    }

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("Pi is 3.14 exactly. Really?\nYes!"),
            vec!["Pi is 3.14 exactly.", "Really?", "Yes!"]
        );
        assert!(split_sentences("  \n ").is_empty());
    }

    #[tokio::test]
    async fn test_extractive_picks_matching_sentence() {
        let generator = ExtractiveGenerator::default();
        let answer = generator
            .generate(
                "What color is the sky?",
                &[chunk("Grass is green. The sky is blue."), chunk("Water is wet.")],
            )
            .await
            .unwrap();
        assert_eq!(answer, "The sky is blue.");
    }

    #[tokio::test]
    async fn test_extractive_without_context() {
        let generator = ExtractiveGenerator::default();
        assert_eq!(generator.generate("Why?", &[chunk("x")]).await.unwrap(), NO_ANSWER);
        assert_eq!(
            generator.generate("What is rust?", &[]).await.unwrap(),
            NO_ANSWER
        );
        assert_eq!(
            generator
                .generate("What is rust?", &[chunk("Bananas are yellow.")])
                .await
                .unwrap(),
            NO_ANSWER
        );
    }
}
