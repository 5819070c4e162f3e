use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use futures::{
    stream::{self, BoxStream},
    StreamExt,
};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    constants::prompts::IMAGE_PROMPT_PREAMBLE,
    errors::{AppError, AppResult},
    models::domain::{Citation, Message, Role},
    services::chat_backend::{
        ChatBackend, ChatConnection, ChunkStream, GeneratedImage, ImageGenerator, OutgoingPart,
        StreamChunk,
    },
};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini REST client backing both the tutor chat and image generation.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    chat_model: String,
    image_model: String,
    enable_web_search: bool,
}

impl GeminiClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key: config.gemini_api_key.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            chat_model: config.chat_model.clone(),
            image_model: config.image_model.clone(),
            enable_web_search: config.enable_web_search,
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    async fn post<T: Serialize>(&self, url: String, body: &T) -> AppResult<reqwest::Response> {
        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, &body_text));
        }

        Ok(response)
    }
}

impl ChatBackend for GeminiClient {
    fn start_chat(&self, system_instruction: &str, priming: &[Message]) -> Arc<dyn ChatConnection> {
        let transcript = priming.iter().filter_map(Content::from_message).collect();

        Arc::new(GeminiChat {
            client: self.clone(),
            system_instruction: system_instruction.to_string(),
            transcript: Arc::new(Mutex::new(transcript)),
        })
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> AppResult<GeneratedImage> {
        let body = PredictRequest {
            instances: vec![PredictInstance {
                prompt: format!("{}{}", IMAGE_PROMPT_PREAMBLE, prompt),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: "16:9",
                output_options: OutputOptions {
                    mime_type: "image/jpeg",
                },
            },
        };

        let url = self.model_url(&self.image_model, "predict");
        let response: PredictResponse = self.post(url, &body).await?.json().await?;
        response.into_image()
    }
}

/// One multi-turn conversation held client side.
struct GeminiChat {
    client: GeminiClient,
    system_instruction: String,
    transcript: Arc<Mutex<Vec<Content>>>,
}

#[async_trait]
impl ChatConnection for GeminiChat {
    async fn send_stream(&self, parts: Vec<OutgoingPart>) -> AppResult<ChunkStream> {
        let user_turn = Content {
            role: "user",
            parts: parts.into_iter().map(Part::from).collect(),
        };

        let mut contents = self
            .transcript
            .lock()
            .map_err(|_| AppError::InternalError("Chat transcript lock poisoned".to_string()))?
            .clone();
        contents.push(user_turn.clone());

        let body = GenerateContentRequest {
            system_instruction: SystemInstruction {
                parts: vec![Part::Text {
                    text: self.system_instruction.clone(),
                }],
            },
            contents,
            tools: if self.client.enable_web_search {
                vec![Tool::default()]
            } else {
                Vec::new()
            },
        };

        let url = format!(
            "{}?alt=sse",
            self.client
                .model_url(&self.client.chat_model, "streamGenerateContent")
        );
        let response = self.client.post(url, &body).await?;

        let state = StreamState {
            bytes: response
                .bytes_stream()
                .map(|read| read.map(|bytes| bytes.to_vec()))
                .boxed(),
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            reply: String::new(),
            user_turn: Some(user_turn),
            transcript: Arc::clone(&self.transcript),
            done: false,
        };

        Ok(stream::unfold(state, next_chunk).boxed())
    }
}

struct StreamState {
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<StreamChunk>,
    reply: String,
    user_turn: Option<Content>,
    transcript: Arc<Mutex<Vec<Content>>>,
    done: bool,
}

impl StreamState {
    fn accept(&mut self, payloads: Vec<String>) -> AppResult<()> {
        for payload in payloads {
            if let Some(chunk) = decode_payload(&payload)? {
                self.reply.push_str(&chunk.text);
                self.pending.push_back(chunk);
            }
        }
        Ok(())
    }

    /// Commits the finished turn so the next send carries it as context.
    fn commit(&mut self) {
        let Some(user_turn) = self.user_turn.take() else {
            return;
        };
        match self.transcript.lock() {
            Ok(mut transcript) => {
                transcript.push(user_turn);
                transcript.push(Content {
                    role: "model",
                    parts: vec![Part::Text {
                        text: std::mem::take(&mut self.reply),
                    }],
                });
            }
            Err(_) => log::error!("Chat transcript lock poisoned; turn not recorded"),
        }
    }

    fn fail(mut self, err: AppError) -> Option<(AppResult<StreamChunk>, StreamState)> {
        self.pending.clear();
        self.done = true;
        Some((Err(err), self))
    }
}

async fn next_chunk(mut state: StreamState) -> Option<(AppResult<StreamChunk>, StreamState)> {
    loop {
        if let Some(chunk) = state.pending.pop_front() {
            return Some((Ok(chunk), state));
        }
        if state.done {
            return None;
        }

        match state.bytes.next().await {
            Some(Ok(bytes)) => {
                let payloads = state.decoder.push(&bytes);
                if let Err(err) = state.accept(payloads) {
                    return state.fail(err);
                }
            }
            Some(Err(err)) => return state.fail(err.into()),
            None => {
                let payloads = state.decoder.finish();
                if let Err(err) = state.accept(payloads) {
                    return state.fail(err);
                }
                state.done = true;
                state.commit();
            }
        }
    }
}

/// Incremental `text/event-stream` reader yielding `data:` payloads.
#[derive(Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            payloads.extend(data_payload(&line));
        }
        payloads
    }

    /// Flushes a trailing line that arrived without a newline.
    pub(crate) fn finish(&mut self) -> Vec<String> {
        let line = std::mem::take(&mut self.buffer);
        data_payload(&line).into_iter().collect()
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let data = line
        .trim_end_matches(['\r', '\n'])
        .strip_prefix("data:")?
        .trim_start();

    (!data.is_empty() && data != "[DONE]").then(|| data.to_string())
}

pub(crate) fn decode_payload(payload: &str) -> AppResult<Option<StreamChunk>> {
    let response: GenerateContentResponse = serde_json::from_str(payload)?;
    if let Some(error) = response.error {
        return Err(AppError::UpstreamError(error.describe()));
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Ok(None);
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    let citations = candidate
        .grounding_metadata
        .and_then(|metadata| metadata.grounding_chunks)
        .map(|chunks| {
            chunks
                .into_iter()
                .filter_map(|chunk| chunk.web)
                .filter_map(|web| {
                    let uri = web.uri?;
                    let title = web.title.unwrap_or_else(|| uri.clone());
                    Some(Citation { uri, title })
                })
                .collect::<Vec<_>>()
        });

    if text.is_empty() && citations.is_none() {
        return Ok(None);
    }
    Ok(Some(StreamChunk { text, citations }))
}

fn map_http_error(status: StatusCode, body: &str) -> AppError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| wrapper.error.describe())
        .unwrap_or_else(|_| body.to_string());

    AppError::UpstreamError(format!("Gemini API returned {}: {}", status.as_u16(), message))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

impl Content {
    fn from_message(message: &Message) -> Option<Self> {
        let text = message.plain_text();
        if text.is_empty() {
            return None;
        }
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "model",
        };
        Some(Content {
            role,
            parts: vec![Part::Text { text }],
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataPayload,
    },
}

impl From<OutgoingPart> for Part {
    fn from(part: OutgoingPart) -> Self {
        match part {
            OutgoingPart::Text(text) => Part::Text { text },
            OutgoingPart::InlineData { mime_type, data } => Part::InlineData {
                inline_data: InlineDataPayload { mime_type, data },
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataPayload {
    mime_type: String,
    data: String,
}

#[derive(Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ContentResponse>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    grounding_chunks: Option<Vec<GroundingChunk>>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

impl ErrorBody {
    fn describe(self) -> String {
        let message = self.message.unwrap_or_else(|| "unknown error".to_string());
        match self.status.filter(|s| !s.is_empty()) {
            Some(status) => format!("{}: {}", status, message),
            None => message,
        }
    }
}

#[derive(Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    aspect_ratio: &'static str,
    output_options: OutputOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputOptions {
    mime_type: &'static str,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

impl PredictResponse {
    fn into_image(self) -> AppResult<GeneratedImage> {
        self.predictions
            .into_iter()
            .find_map(|prediction| {
                prediction.bytes_base64_encoded.map(|data| GeneratedImage {
                    mime_type: prediction
                        .mime_type
                        .unwrap_or_else(|| "image/jpeg".to_string()),
                    data,
                })
            })
            .ok_or_else(|| AppError::UpstreamError("Image model returned no image".to_string()))
    }
}
