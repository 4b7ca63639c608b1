// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::config::consts::DEFAULT_SUMMARY_MAX_LENGTH;
use crate::config::loader::LlmConfig;
use crate::drivers::args;
use crate::engine::tokens::estimate_tokens;
use crate::errors::DriverError;
use crate::observability::messages::driver::LlmTokensEstimated;
use crate::observability::messages::StructuredLog;
use crate::packet::canonical::{canonicalize, display_value};
use crate::traits::{DispatchContext, Driver, LlmRequest, LlmService};

/// `llm.invoke|analyze|generate|summarize`.
///
/// Every method builds a prompt and funnels through a single
/// [`LlmService::invoke`] call. Token usage is estimated from the character
/// length of the prompt (plus context) and of the response, and recorded in
/// the run's token tracker.
pub struct LlmDriver {
    service: Option<Arc<dyn LlmService>>,
    config: LlmConfig,
}

impl LlmDriver {
    pub fn new(service: Option<Arc<dyn LlmService>>, config: LlmConfig) -> Self {
        Self { service, config }
    }

    async fn invoke(
        &self,
        method: &str,
        args: &Value,
        ctx: DispatchContext<'_>,
    ) -> Result<Value, DriverError> {
        let service = self
            .service
            .as_ref()
            .ok_or_else(|| DriverError::NotConfigured("llm".into()))?;

        let prompt = args::require_text(&format!("llm.{}", method), args, "prompt")?;
        let context = args::arg(args, "context").cloned();
        let chars_per_token = self.config.get_chars_per_token();

        let mut input_text = prompt.clone();
        if let Some(context) = &context {
            input_text.push_str(&canonicalize(context));
        }
        let input = estimate_tokens(&input_text, chars_per_token);

        let request = LlmRequest {
            prompt,
            json_schema: args::arg(args, "json_schema").cloned(),
            context,
            web_search: args::flag(args, "web_search"),
            model: args::arg(args, "model").map(display_value),
        };

        let response = tokio::select! {
            _ = ctx.cancel.cancelled() => return Err(DriverError::Cancelled),
            response = service.invoke(request) => response?,
        };

        let output = estimate_tokens(&display_value(&response), chars_per_token);
        let saved = if args::flag(args, "cached") { input } else { 0 };
        ctx.tokens.add_call(input, output, saved);

        LlmTokensEstimated {
            method,
            input,
            output,
            saved,
        }
        .log();

        Ok(json!({
            "response": response,
            "tokens": { "input": input, "output": output, "saved": saved },
        }))
    }
}

/// `{prompt, ...args}`: an explicit `prompt` argument overrides the built one.
fn with_prompt(prompt: String, args: &Value) -> Value {
    let mut merged = Map::new();
    merged.insert("prompt".into(), Value::String(prompt));
    if let Some(extra) = args.as_object() {
        merged.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    Value::Object(merged)
}

fn analyze_prompt(args: &Value) -> String {
    let data = args.get("data").unwrap_or(&Value::Null);
    let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| canonicalize(data));
    format!(
        "{}\n\nData to analyze:\n{}",
        args::text_or(args, "instruction", ""),
        pretty
    )
}

fn generate_prompt(args: &Value) -> String {
    let mut prompt = args::text_or(args, "template", "");
    if let Some(variables) = args::arg(args, "variables").and_then(Value::as_object) {
        for (name, value) in variables {
            prompt = prompt.replace(&format!("{{{{{}}}}}", name), &display_value(value));
        }
    }
    prompt
}

fn summarize_prompt(args: &Value) -> String {
    let max_length = args::arg(args, "max_length")
        .map(display_value)
        .unwrap_or_else(|| DEFAULT_SUMMARY_MAX_LENGTH.to_string());
    format!(
        "Summarize the following in {} words or less:\n\n{}",
        max_length,
        args::text_or(args, "text", "")
    )
}

#[async_trait]
impl Driver for LlmDriver {
    fn namespace(&self) -> &'static str {
        "llm"
    }

    fn methods(&self) -> &'static [&'static str] {
        &["invoke", "analyze", "generate", "summarize"]
    }

    async fn call(
        &self,
        method: &str,
        args: Value,
        ctx: DispatchContext<'_>,
    ) -> Result<Value, DriverError> {
        match method {
            "invoke" => self.invoke(method, &args, ctx).await,
            "analyze" => {
                let args = with_prompt(analyze_prompt(&args), &args);
                self.invoke(method, &args, ctx).await
            }
            "generate" => {
                let args = with_prompt(generate_prompt(&args), &args);
                self.invoke(method, &args, ctx).await
            }
            "summarize" => {
                let args = json!({ "prompt": summarize_prompt(&args) });
                self.invoke(method, &args, ctx).await
            }
            other => Err(DriverError::UnknownMethod {
                namespace: "llm".into(),
                method: other.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::stub::{DispatchFixture, ScriptedLlm};

    fn driver(llm: Arc<ScriptedLlm>) -> LlmDriver {
        LlmDriver::new(Some(llm), LlmConfig::default())
    }

    #[tokio::test]
    async fn test_invoke_estimates_and_records_tokens() {
        let llm = Arc::new(ScriptedLlm::replying(json!("abcdefgh")));
        let fixture = DispatchFixture::new();

        let out = driver(llm.clone())
            .call("invoke", json!({"prompt": "abcde", "cached": true}), fixture.ctx())
            .await
            .unwrap();

        assert_eq!(
            out,
            json!({"response": "abcdefgh", "tokens": {"input": 2, "output": 2, "saved": 2}})
        );
        let stats = fixture.tokens.stats();
        assert_eq!(stats.input_tokens, 2);
        assert_eq!(stats.output_tokens, 2);
        assert_eq!(stats.saved_tokens, 2);
        assert_eq!(stats.calls, 1);
    }

    #[tokio::test]
    async fn test_context_counts_towards_input() {
        let llm = Arc::new(ScriptedLlm::replying(json!({"ok": true})));
        let fixture = DispatchFixture::new();
        let out = driver(llm.clone())
            .call(
                "invoke",
                json!({"prompt": "abcd", "context": {"k": 1}, "web_search": true}),
                fixture.ctx(),
            )
            .await
            .unwrap();
        // "abcd" + {"k":1} is 11 chars; {"ok":true} is 11 chars
        assert_eq!(out["tokens"], json!({"input": 3, "output": 3, "saved": 0}));
        let request = llm.requests().pop().unwrap();
        assert!(request.web_search);
        assert_eq!(request.context, Some(json!({"k": 1})));
    }

    #[tokio::test]
    async fn test_prompt_builders() {
        let llm = Arc::new(ScriptedLlm::replying(json!("ok")));
        let fixture = DispatchFixture::new();
        let llm_driver = driver(llm.clone());

        llm_driver
            .call(
                "generate",
                json!({"template": "Hi {{name}}, {{name}}!", "variables": {"name": "Ada"}}),
                fixture.ctx(),
            )
            .await
            .unwrap();
        llm_driver
            .call("summarize", json!({"text": "long text"}), fixture.ctx())
            .await
            .unwrap();
        llm_driver
            .call(
                "analyze",
                json!({"instruction": "Count", "data": [1]}),
                fixture.ctx(),
            )
            .await
            .unwrap();

        let prompts: Vec<String> = llm.requests().into_iter().map(|r| r.prompt).collect();
        assert_eq!(
            prompts,
            vec![
                "Hi Ada, Ada!".to_string(),
                "Summarize the following in 100 words or less:\n\nlong text".to_string(),
                "Count\n\nData to analyze:\n[\n  1\n]".to_string(),
            ]
        );
        assert_eq!(fixture.tokens.stats().calls, 3);
    }

    #[tokio::test]
    async fn test_explicit_prompt_wins() {
        let llm = Arc::new(ScriptedLlm::replying(json!("ok")));
        let fixture = DispatchFixture::new();
        driver(llm.clone())
            .call(
                "analyze",
                json!({"instruction": "x", "data": 1, "prompt": "mine"}),
                fixture.ctx(),
            )
            .await
            .unwrap();
        assert_eq!(llm.requests()[0].prompt, "mine");
    }

    #[tokio::test]
    async fn test_unconfigured_service() {
        let fixture = DispatchFixture::new();
        let err = LlmDriver::new(None, LlmConfig::default())
            .call("invoke", json!({"prompt": "x"}), fixture.ctx())
            .await
            .unwrap_err();
        assert_eq!(err, DriverError::NotConfigured("llm".into()));
        assert_eq!(fixture.tokens.stats().calls, 0);
    }
}
