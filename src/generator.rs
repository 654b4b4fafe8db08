use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::{LlmConfig, Provider};
use crate::runtime;

/// Single request/response text completion used to draft commit messages.
pub trait MessageDrafter: Send + Sync {
    fn draft(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

pub struct OpenAIGenerator {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAIGenerator {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    pub async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request_body = openai_body(&self.model, system_prompt, user_prompt);

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await
            .context("Failed to send request to OpenAI")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error: {}", error_text);
        }

        let response_json: Value = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .context("Invalid response format from OpenAI")?
            .trim()
            .to_string();

        Ok(clean_response(content))
    }
}

pub struct AnthropicGenerator {
    client: Client,
    api_key: String,
    model: String,
}

impl AnthropicGenerator {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    pub async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request_body = anthropic_body(&self.model, system_prompt, user_prompt);

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .context("Failed to send request to Anthropic")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            bail!("Anthropic API error: {}", error_text);
        }

        let response_json: Value = response
            .json()
            .await
            .context("Failed to parse Anthropic response")?;

        let content = response_json["content"][0]["text"]
            .as_str()
            .context("Invalid response format from Anthropic")?
            .trim()
            .to_string();

        Ok(clean_response(content))
    }
}

pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    pub async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let request_body = gemini_body(system_prompt, user_prompt);

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .context("Failed to send request to Gemini")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            bail!("Gemini API error: {}", error_text);
        }

        let response_json: Value = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        let content = response_json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .context("Invalid response format from Gemini")?
            .trim()
            .to_string();

        Ok(clean_response(content))
    }
}

fn openai_body(model: &str, system_prompt: &str, user_prompt: &str) -> Value {
    json!({
        "model": model,
        "messages": [
            {"role": "system", "content": system_prompt},
            {"role": "user", "content": user_prompt}
        ]
    })
}

fn anthropic_body(model: &str, system_prompt: &str, user_prompt: &str) -> Value {
    json!({
        "model": model,
        "max_tokens": 1024,
        "system": system_prompt,
        "messages": [
            {"role": "user", "content": user_prompt}
        ]
    })
}

fn gemini_body(system_prompt: &str, user_prompt: &str) -> Value {
    json!({
        "systemInstruction": {
            "parts": [ {"text": system_prompt} ]
        },
        "contents": [
            {
                "parts": [ {"text": user_prompt} ]
            }
        ]
    })
}

fn clean_response(content: String) -> String {
    content
        .replace("```git commit", "")
        .replace("```commit", "")
        .replace("```", "")
        .trim()
        .to_string()
}

pub enum Generator {
    OpenAI(OpenAIGenerator),
    Anthropic(AnthropicGenerator),
    Gemini(GeminiGenerator),
}

impl Generator {
    pub fn from_config(cfg: &LlmConfig) -> Self {
        let api_key = cfg.api_key.clone();
        let model = cfg.model.clone();
        match cfg.provider {
            Provider::OpenAI => Generator::OpenAI(OpenAIGenerator::new(api_key, model)),
            Provider::Anthropic => Generator::Anthropic(AnthropicGenerator::new(api_key, model)),
            Provider::Gemini => Generator::Gemini(GeminiGenerator::new(api_key, model)),
        }
    }

    pub async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        match self {
            Generator::OpenAI(g) => g.generate(system_prompt, user_prompt).await,
            Generator::Anthropic(g) => g.generate(system_prompt, user_prompt).await,
            Generator::Gemini(g) => g.generate(system_prompt, user_prompt).await,
        }
    }
}

impl MessageDrafter for Generator {
    fn draft(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        runtime::block_on(self.generate(system_prompt, user_prompt))
    }
}
