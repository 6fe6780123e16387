//! LLM API examples
//!
//! The chatbot examples all speak the same OpenAI-compatible wire format and
//! differ only in provider preset and model name.

use crate::Example;
use anyhow::Result;

const COMPANION_PROMPT: &str = "You are an empathetic friend. Listen carefully, \
acknowledge how the user feels, and offer gentle, practical advice.";

/// # One-shot completion
///
/// #### Id
/// 01.01
///
/// #### CLI command
/// ```sh
/// cargo run example 01.01
/// ```
pub struct EG01;

impl Example for EG01 {
    fn description(&self) -> String {
        String::from("Single chat completion against the OpenAI API.")
    }

    fn main(&self) -> Result<()> {
        use crate::listings::chat::{ChatClient, ChatRequest, Message, Provider, Role};

        let client = ChatClient::from_env(Provider::OpenAi)?;
        let request = ChatRequest::new(
            "gpt-4.1",
            vec![Message::new(
                Role::User,
                "Write a one-sentence bedtime story about a unicorn.",
            )],
        );

        let reply = client.complete(&request)?;
        println!("{reply}");
        Ok(())
    }
}

/// # Model catalog
///
/// #### Id
/// 01.02
///
/// #### CLI command
/// ```sh
/// cargo run example 01.02
/// ```
pub struct EG02;

impl Example for EG02 {
    fn description(&self) -> String {
        String::from("List the models the OpenAI API exposes.")
    }

    fn main(&self) -> Result<()> {
        use crate::listings::chat::{ChatClient, Provider};

        let client = ChatClient::from_env(Provider::OpenAi)?;
        for model in client.list_models()? {
            println!("{}", model.id);
        }
        Ok(())
    }
}

/// # Streaming chatbot on Cerebras
///
/// #### Id
/// 01.03
///
/// #### CLI command
/// ```sh
/// cargo run example 01.03
/// ```
pub struct EG03;

impl Example for EG03 {
    fn description(&self) -> String {
        String::from("Interactive streaming chatbot against the Cerebras API.")
    }

    fn main(&self) -> Result<()> {
        use crate::listings::chat::{chat_repl, ChatClient, ChatRequest, Message, Provider, Role};

        // other options: llama-3.3-70b, qwen-3-32b, gpt-oss-120b
        let client = ChatClient::from_env(Provider::Cerebras)?;
        let request = ChatRequest {
            temperature: Some(0.7),
            // Cerebras uses max_completion_tokens instead of max_tokens
            max_completion_tokens: Some(1000),
            ..ChatRequest::new(
                "qwen-3-235b-a22b-instruct-2507",
                vec![Message::new(Role::System, COMPANION_PROMPT)],
            )
        };
        chat_repl(&client, &request)
    }
}

/// # Streaming chatbot on a local Ollama server
///
/// #### Id
/// 01.04
///
/// #### CLI command
/// ```sh
/// cargo run example 01.04
/// ```
pub struct EG04;

impl Example for EG04 {
    fn description(&self) -> String {
        String::from("Interactive streaming chatbot against a local Ollama server.")
    }

    fn main(&self) -> Result<()> {
        use crate::listings::chat::{chat_repl, ChatClient, ChatRequest, Message, Provider, Role};

        // requires an Ollama server on localhost:11434; check installed
        // models with `ollama list`
        let client = ChatClient::from_env(Provider::Ollama)?;
        let request = ChatRequest {
            temperature: Some(0.7),
            max_tokens: Some(1000),
            ..ChatRequest::new(
                "gpt-oss:20b",
                vec![Message::new(Role::System, COMPANION_PROMPT)],
            )
        };
        chat_repl(&client, &request)
    }
}

/// # Streaming chatbot on OpenRouter
///
/// #### Id
/// 01.05
///
/// #### CLI command
/// ```sh
/// cargo run example 01.05
/// ```
pub struct EG05;

impl Example for EG05 {
    fn description(&self) -> String {
        String::from("Interactive streaming chatbot against the OpenRouter API.")
    }

    fn main(&self) -> Result<()> {
        use crate::listings::chat::{chat_repl, ChatClient, ChatRequest, Message, Provider, Role};

        // model catalog: https://openrouter.ai/models
        let client = ChatClient::from_env(Provider::OpenRouter)?;
        let request = ChatRequest {
            temperature: Some(0.7),
            max_tokens: Some(1000),
            ..ChatRequest::new(
                "deepseek/deepseek-chat-v3.1:free",
                vec![Message::new(Role::System, COMPANION_PROMPT)],
            )
        };
        chat_repl(&client, &request)
    }
}
