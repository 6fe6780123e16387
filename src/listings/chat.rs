//! OpenAI-compatible chat completions
//!
//! Several providers speak the same wire format, so a single blocking client
//! covers OpenAI, Cerebras, OpenRouter, and a local Ollama server. Streaming
//! responses arrive as server-sent events and are consumed line by line on
//! the thread that issued the request.

use std::env;
use std::io::{self, BufRead, BufReader, Read, Write};

use anyhow::{anyhow, Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde::{Deserialize, Serialize};
use tiktoken_rs::cl100k_base;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a chat transcript. The full transcript is replayed to the
/// provider on every request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Self {
            role,
            content: String::from(content),
        }
    }
}

/// Endpoint presets for the providers used across the examples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Provider {
    OpenAi,
    Cerebras,
    OpenRouter,
    Ollama,
}

impl Provider {
    pub fn base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Cerebras => "https://api.cerebras.ai/v1",
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
            Provider::Ollama => "http://localhost:11434/v1",
        }
    }

    /// Ollama runs without credentials, hence `None`.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some("OPENAI_API_KEY"),
            Provider::Cerebras => Some("CEREBRAS_API_KEY"),
            Provider::OpenRouter => Some("OPENROUTER_API_KEY"),
            Provider::Ollama => None,
        }
    }
}

/// Request body for `POST /chat/completions`.
///
/// Cerebras caps generation with `max_completion_tokens` while the other
/// providers use `max_tokens`; both are optional and omitted when unset.
#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(model: &str, messages: Vec<Message>) -> Self {
        Self {
            model: String::from(model),
            messages,
            temperature: None,
            max_tokens: None,
            max_completion_tokens: None,
            stream: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletion {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: Message,
    pub finish_reason: Option<String>,
}

/// One server-sent event of a streaming completion.
#[derive(Debug, Deserialize)]
pub struct CompletionChunk {
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModelList {
    pub data: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub owned_by: Option<String>,
}

pub struct ChatClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl ChatClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            base_url: String::from(base_url.trim_end_matches('/')),
            api_key: String::from(api_key),
        }
    }

    /// Builds a client for `provider`, reading its API key from the
    /// environment. Ollama gets a placeholder key since the wire format
    /// requires the header but the server ignores it.
    pub fn from_env(provider: Provider) -> Result<Self> {
        let api_key = match provider.api_key_env() {
            Some(var) => env::var(var).with_context(|| format!("{var} is not set"))?,
            None => String::from("ollama"),
        };
        Ok(Self::new(provider.base_url(), &api_key))
    }

    /// Non-streaming completion; returns the assistant's reply text.
    pub fn complete(&self, request: &ChatRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let response: ChatCompletion = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()?
            .error_for_status()?
            .json()?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("completion response contained no choices"))?;
        Ok(choice.message.content)
    }

    /// Streaming completion. Each content delta is handed to `on_delta` as it
    /// arrives; the accumulated reply is returned once the stream ends.
    pub fn complete_stream(
        &self,
        request: &ChatRequest,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            stream: true,
            ..request.clone()
        };
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?
            .error_for_status()?;
        read_sse_stream(response, on_delta)
    }

    /// `GET /models` — the provider's model catalog.
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/models", self.base_url);
        let list: ModelList = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(list.data)
    }
}

/// Consumes an SSE response body, forwarding content deltas to `on_delta` and
/// returning the concatenated reply. `data: [DONE]` terminates the stream;
/// comment and event lines are skipped, as are chunks without choices.
pub fn read_sse_stream<R: Read>(body: R, on_delta: &mut dyn FnMut(&str)) -> Result<String> {
    let mut full = String::new();
    for line in BufReader::new(body).lines() {
        let line = line?;
        let Some(data) = line.strip_prefix("data: ") else {
            continue;
        };
        let data = data.trim();
        if data.is_empty() {
            continue;
        }
        if data == "[DONE]" {
            break;
        }
        let chunk: CompletionChunk = serde_json::from_str(data)
            .with_context(|| format!("malformed stream chunk: {data}"))?;
        let Some(choice) = chunk.choices.first() else {
            continue;
        };
        if let Some(content) = &choice.delta.content {
            on_delta(content);
            full.push_str(content);
        }
    }
    Ok(full)
}

/// cl100k token count of the whole transcript; printed by the REPL so the
/// growth of the replayed context stays visible.
pub fn transcript_tokens(messages: &[Message]) -> Result<usize> {
    let bpe = cl100k_base()?;
    Ok(messages
        .iter()
        .map(|m| bpe.encode_with_special_tokens(&m.content).len())
        .sum())
}

/// Interactive loop shared by the provider chatbot examples. Reads a line,
/// appends it to the transcript, streams the reply to stdout, and appends the
/// reply before the next turn. The literal input `quit` ends the session.
pub fn chat_repl(client: &ChatClient, template: &ChatRequest) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut messages = template.messages.clone();

    println!("Chat started. Type 'quit' to exit.\n");
    loop {
        let line = match rl.readline("You: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") {
            println!("Ending the conversation.");
            break;
        }
        rl.add_history_entry(line)?;
        messages.push(Message::new(Role::User, line));

        let request = ChatRequest {
            messages: messages.clone(),
            ..template.clone()
        };
        print!("Assistant: ");
        io::stdout().flush()?;
        let reply = client.complete_stream(&request, &mut |delta| {
            print!("{delta}");
            let _ = io::stdout().flush();
        })?;
        println!("\n");
        messages.push(Message::new(Role::Assistant, &reply));
        let tokens = transcript_tokens(&messages)?;
        tracing::debug!(tokens, "transcript size");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use std::io::Cursor;

    #[fixture]
    pub fn transcript() -> Vec<Message> {
        vec![
            Message::new(Role::System, "You are a helpful assistant."),
            Message::new(Role::User, "Hello!"),
        ]
    }

    #[rstest]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), r#""system""#);
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            r#""assistant""#
        );
    }

    #[rstest]
    fn test_message_round_trip(transcript: Vec<Message>) {
        let json = serde_json::to_string(&transcript[1]).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"Hello!"}"#);

        let message: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(message.role, Role::User);
        assert_eq!(message.content, "Hello!");
    }

    #[rstest]
    fn test_chat_request_omits_unset_limits(transcript: Vec<Message>) {
        let request = ChatRequest::new("test-model", transcript);
        let value = serde_json::to_value(&request).unwrap();
        let body = value.as_object().unwrap();

        assert_eq!(body["model"], "test-model");
        assert_eq!(body["stream"], false);
        assert!(!body.contains_key("temperature"));
        assert!(!body.contains_key("max_tokens"));
        assert!(!body.contains_key("max_completion_tokens"));
    }

    #[rstest]
    fn test_chat_request_serializes_provider_specific_limit(transcript: Vec<Message>) {
        let request = ChatRequest {
            max_completion_tokens: Some(1000),
            ..ChatRequest::new("test-model", transcript)
        };
        let value = serde_json::to_value(&request).unwrap();
        let body = value.as_object().unwrap();

        assert_eq!(body["max_completion_tokens"], 1000);
        assert!(!body.contains_key("max_tokens"));
    }

    #[rstest]
    fn test_provider_presets() {
        assert_eq!(Provider::Ollama.base_url(), "http://localhost:11434/v1");
        assert_eq!(Provider::Ollama.api_key_env(), None);
        assert_eq!(
            Provider::Cerebras.api_key_env(),
            Some("CEREBRAS_API_KEY")
        );
    }

    #[rstest]
    fn test_read_sse_stream_accumulates_deltas() {
        let body = concat!(
            ": keep-alive\n",
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"},\"finish_reason\":null}]}\n",
            "\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"},\"finish_reason\":null}]}\n",
            "\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo!\"},\"finish_reason\":null}]}\n",
            "\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n",
            "data: {\"choices\":[]}\n",
            "data: [DONE]\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"},\"finish_reason\":null}]}\n",
        );

        let mut seen = Vec::new();
        let full = read_sse_stream(Cursor::new(body), &mut |delta| {
            seen.push(String::from(delta));
        })
        .unwrap();

        assert_eq!(full, "Hello!");
        assert_eq!(seen, vec!["Hel", "lo!"]);
    }

    #[rstest]
    fn test_read_sse_stream_rejects_malformed_chunk() {
        let body = "data: {not json}\n";
        let result = read_sse_stream(Cursor::new(body), &mut |_| {});
        assert!(result.is_err());
    }

    #[rstest]
    fn test_completion_response_parsing() {
        let json = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Once upon a time."},
                "finish_reason": "stop"
            }]
        }"#;
        let completion: ChatCompletion = serde_json::from_str(json).unwrap();

        assert_eq!(completion.choices.len(), 1);
        assert_eq!(
            completion.choices[0].message.content,
            "Once upon a time."
        );
        assert_eq!(
            completion.choices[0].finish_reason.as_deref(),
            Some("stop")
        );
    }

    #[rstest]
    fn test_model_list_parsing() {
        let json = r#"{
            "object": "list",
            "data": [
                {"id": "gpt-4.1", "object": "model", "owned_by": "openai"},
                {"id": "gpt-4.1-mini", "object": "model"}
            ]
        }"#;
        let list: ModelList = serde_json::from_str(json).unwrap();

        assert_eq!(list.data.len(), 2);
        assert_eq!(list.data[0].id, "gpt-4.1");
        assert_eq!(list.data[1].owned_by, None);
    }

    #[rstest]
    fn test_transcript_tokens_counts_all_turns(transcript: Vec<Message>) {
        let total = transcript_tokens(&transcript).unwrap();
        let head = transcript_tokens(&transcript[..1]).unwrap();

        assert!(total > head);
        assert!(head > 0);
    }
}
