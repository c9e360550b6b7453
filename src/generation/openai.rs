//! OpenAI-compatible chat completions provider.
//!
//! Each role's model settings come from config. Requests ask for a JSON
//! object response, and the token cost is read from `usage.total_tokens`.
//! ureq is blocking, so every call runs on the blocking pool.

use crate::config::{ModelConfig, ModelConfigs};
use crate::generation::{
    Generation, GenerationError, GenerationRequest, GenerationService, OutputSchema,
};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Longest slice of an error body kept in a `Status` error.
const MAX_ERROR_BODY_CHARS: usize = 500;

pub struct OpenAiCompatService {
    models: ModelConfigs,
}

impl OpenAiCompatService {
    pub fn new(models: ModelConfigs) -> Self {
        Self { models }
    }
}

#[async_trait]
impl GenerationService for OpenAiCompatService {
    async fn invoke(&self, request: GenerationRequest) -> Result<Generation, GenerationError> {
        let settings = self.models.for_role(request.role).clone();
        let api_key = settings.resolve_api_key().ok_or_else(|| {
            GenerationError::Credentials(format!(
                "set {} or ADSCRIPT_API_KEY for role {}",
                settings.api_key_env, request.role
            ))
        })?;

        tokio::task::spawn_blocking(move || call_chat_completion(&settings, &api_key, &request))
            .await
            .map_err(|e| GenerationError::Transport(format!("generation task failed: {}", e)))?
    }
}

fn call_chat_completion(
    settings: &ModelConfig,
    api_key: &str,
    request: &GenerationRequest,
) -> Result<Generation, GenerationError> {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
        .http_status_as_error(false)
        .build()
        .into();

    let url = format!("{}/chat/completions", settings.base_url.trim_end_matches('/'));
    let body = build_request_body(settings, request);
    debug!(model = %settings.model, schema = %request.schema, "Sending chat completion request");

    let mut response = agent
        .post(&url)
        .header("Authorization", &format!("Bearer {}", api_key))
        .send_json(&body)
        .map_err(map_transport_error)?;

    let status = response.status().as_u16();
    let text = response
        .body_mut()
        .read_to_string()
        .map_err(map_transport_error)?;

    if !(200..300).contains(&status) {
        return Err(GenerationError::Status {
            code: status,
            body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }

    parse_completion(&text)
}

fn map_transport_error(error: ureq::Error) -> GenerationError {
    match error {
        ureq::Error::Timeout(_) => GenerationError::Timeout,
        other => GenerationError::Transport(other.to_string()),
    }
}

fn build_request_body(settings: &ModelConfig, request: &GenerationRequest) -> Value {
    let system = format!(
        "{}\n\n{}",
        request.system_prompt,
        format_instruction(request.schema)
    );
    let user = serde_json::to_string_pretty(&request.task_context)
        .unwrap_or_else(|_| request.task_context.to_string());
    json!({
        "model": settings.model,
        "temperature": settings.temperature,
        "response_format": {"type": "json_object"},
        "messages": [
            {"role": "system", "content": system},
            {"role": "user", "content": user}
        ]
    })
}

/// Tells the model which object to return.
fn format_instruction(schema: OutputSchema) -> String {
    format!(
        "Respond with a single JSON object of type {} containing exactly these fields: {}. Do not add any other fields.",
        schema.name(),
        schema.required_fields().join(", ")
    )
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u64,
}

fn parse_completion(text: &str) -> Result<Generation, GenerationError> {
    let completion: ChatCompletionResponse = serde_json::from_str(text)
        .map_err(|e| GenerationError::InvalidResponse(format!("bad envelope: {}", e)))?;

    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| GenerationError::InvalidResponse("no message content".to_string()))?;

    let token_cost = match completion.usage {
        Some(usage) => usage.total_tokens,
        None => {
            warn!("Provider response carried no usage block; recording zero tokens");
            0
        }
    };

    let output: Value = serde_json::from_str(&strip_code_fences(&content)).map_err(|e| {
        GenerationError::InvalidResponse(format!("message content is not JSON: {}", e))
    })?;

    Ok(Generation { output, token_cost })
}

/// Removes a surrounding markdown code fence if the model added one.
pub fn strip_code_fences(content: &str) -> String {
    match Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$") {
        Ok(re) => match re.captures(content).and_then(|c| c.get(1)) {
            Some(inner) => inner.as_str().to_string(),
            None => content.trim().to_string(),
        },
        Err(_) => content.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::ModelRole;

    fn settings() -> ModelConfig {
        ModelConfig {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://example.invalid/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.3,
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n[1]\n```  "), "[1]");
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_completion_reads_content_and_usage() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "```json\n{\"ok\": true}\n```"}}],
            "usage": {"prompt_tokens": 100, "completion_tokens": 23, "total_tokens": 123}
        });
        let generation = parse_completion(&body.to_string()).unwrap();
        assert_eq!(generation.output, json!({"ok": true}));
        assert_eq!(generation.token_cost, 123);
    }

    #[test]
    fn test_parse_completion_without_usage_costs_zero() {
        let body = json!({"choices": [{"message": {"content": "{}"}}]});
        assert_eq!(parse_completion(&body.to_string()).unwrap().token_cost, 0);
    }

    #[test]
    fn test_parse_completion_rejects_non_json_content() {
        let body = json!({"choices": [{"message": {"content": "Sure! Here is your script."}}]});
        assert!(matches!(
            parse_completion(&body.to_string()),
            Err(GenerationError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_completion_rejects_empty_choices() {
        let body = json!({"choices": []});
        assert!(matches!(
            parse_completion(&body.to_string()),
            Err(GenerationError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_request_body_carries_model_settings_and_context() {
        let request = GenerationRequest {
            role: ModelRole::ScriptGeneration,
            schema: OutputSchema::StaticScript,
            system_prompt: "Write an ad.".to_string(),
            task_context: json!({"campaign_goal": "leads"}),
        };
        let body = build_request_body(&settings(), &request);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["response_format"]["type"], "json_object");
        let system = body["messages"][0]["content"].as_str().unwrap();
        assert!(system.starts_with("Write an ad."));
        assert!(system.contains("StaticAdDraft"));
        assert!(system.contains("on_image_text"));
        let user = body["messages"][1]["content"].as_str().unwrap();
        assert!(user.contains("\"campaign_goal\": \"leads\""));
    }
}
