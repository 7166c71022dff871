//! AI-assisted config generation: which schema fields are eligible, the
//! completion request shape, and simulated progress reporting.
//!
//! Eligibility is declared inline in JSON-schema descriptions with an
//! `[ai key=value ...]` suffix tag. The progress simulation is a UX
//! smoothing device interpolated from per-field time estimates; it never
//! blocks or alters the real completion request.

use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::card::{resolve_template, Card, CardTemplate, ResolvedTemplate, TemplateContext};
use crate::config::{get_nested, merge_values, to_label};
use crate::error::{SiteError, SiteResult};

/// Default per-field generation estimate when the tag names no `seconds`.
const DEFAULT_ESTIMATED_MS: u64 = 4000;

fn ai_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[ai([^\]]*)\]").expect("valid ai tag regex"))
}

/// A field description with its inline tag extracted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedDescription {
    /// Description text with the tag stripped.
    pub description: String,
    /// Tag attributes, numeric values parsed as numbers.
    pub attributes: BTreeMap<String, Value>,
    pub has_tag: bool,
}

/// Extracts the `[ai key=value ...]` tag from a schema description.
pub fn parse_description(raw: &str) -> ParsedDescription {
    let Some(captures) = ai_tag_regex().captures(raw) else {
        return ParsedDescription {
            description: raw.trim().to_string(),
            attributes: BTreeMap::new(),
            has_tag: false,
        };
    };

    let mut attributes = BTreeMap::new();
    for pair in captures[1].split_whitespace() {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = match value.parse::<i64>() {
            Ok(n) => Value::Number(Number::from(n)),
            Err(_) => match value.parse::<f64>().ok().and_then(Number::from_f64) {
                Some(n) => Value::Number(n),
                None => Value::String(value.to_string()),
            },
        };
        attributes.insert(key.to_string(), value);
    }

    let description = ai_tag_regex().replace(raw, "").trim().to_string();
    ParsedDescription {
        description,
        attributes,
        has_tag: true,
    }
}

/// Per-field generation settings, derived from the schema tag and the
/// user's enable/prompt overrides.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputOptionGeneration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub estimated_ms: u64,
    pub cumulative_time: u64,
    pub is_user_enabled: bool,
    pub has_tag: bool,
}

/// Saved generation settings on a card.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_estimated_time: Option<u64>,
    pub user_prop_config: BTreeMap<String, InputOptionGeneration>,
}

/// Cross-references schema field tags with user overrides.
///
/// Only fields whose description carries the tag appear, whatever the user
/// overrides claim. Cumulative time runs over enabled fields in field order.
pub fn generate_json_prop_config(
    json_schema: Option<&Value>,
    user_prop_config: &BTreeMap<String, InputOptionGeneration>,
) -> BTreeMap<String, InputOptionGeneration> {
    let mut out = BTreeMap::new();
    let Some(properties) = json_schema
        .and_then(|s| s.get("properties"))
        .and_then(|p| p.as_object())
    else {
        return out;
    };

    let mut cumulative_time = 0u64;
    for (key, prop) in properties {
        let Some(description) = prop.get("description").and_then(|d| d.as_str()) else {
            continue;
        };
        let parsed = parse_description(description);
        if !parsed.has_tag {
            continue;
        }
        let estimated_ms = parsed
            .attributes
            .get("seconds")
            .and_then(|v| v.as_u64())
            .map(|s| s * 1000)
            .unwrap_or(DEFAULT_ESTIMATED_MS);

        let user = user_prop_config.get(key);
        let is_user_enabled = user.map(|u| u.is_user_enabled).unwrap_or(false);
        if is_user_enabled {
            cumulative_time += estimated_ms;
        }
        let prompt = user
            .and_then(|u| u.prompt.clone())
            .unwrap_or(parsed.description);

        out.insert(
            key.clone(),
            InputOptionGeneration {
                key: Some(key.clone()),
                label: Some(to_label(key)),
                prompt: Some(prompt),
                estimated_ms,
                cumulative_time,
                is_user_enabled,
                has_tag: true,
            },
        );
    }
    out
}

/// Builds the completion payload shape: only user-enabled tagged fields,
/// with the resolved prompt as each field's schema description.
pub fn generate_output_props(
    json_schema: Option<&Value>,
    json_prop_config: &BTreeMap<String, InputOptionGeneration>,
) -> Map<String, Value> {
    let mut out = Map::new();
    let Some(properties) = json_schema
        .and_then(|s| s.get("properties"))
        .and_then(|p| p.as_object())
    else {
        return out;
    };

    for (key, prop) in properties {
        let Some(config) = json_prop_config.get(key) else {
            continue;
        };
        if !config.is_user_enabled {
            continue;
        }
        let mut output = prop.clone();
        if let Some(map) = output.as_object_mut() {
            if let Some(prompt) = &config.prompt {
                map.insert("description".to_string(), Value::String(prompt.clone()));
            }
        }
        out.insert(key.clone(), output);
    }
    out
}

/// Whole-second estimate across enabled fields.
pub fn calculate_total_estimated_time_seconds(
    json_prop_config: &BTreeMap<String, InputOptionGeneration>,
) -> u64 {
    let total_ms: u64 = json_prop_config
        .values()
        .filter(|c| c.is_user_enabled)
        .map(|c| c.estimated_ms)
        .sum();
    total_ms / 1000
}

/// Reported progress of a generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressState {
    pub percent: u64,
    pub status: String,
}

/// Deterministic progress interpolation over the enabled fields' estimates.
///
/// Percent is elapsed over the total estimate with a floor of 3, capped at
/// 100. Status names the field whose cumulative window covers the elapsed
/// time, then `Wrapping up...` at 100, then `Complete!` once completed.
#[derive(Debug, Clone)]
pub struct ProgressSimulation {
    total_ms: u64,
    /// Enabled fields as (cumulative window end in ms, display label).
    windows: Vec<(u64, String)>,
    completed: bool,
}

impl ProgressSimulation {
    pub fn new(
        total_estimated_seconds: u64,
        json_prop_config: &BTreeMap<String, InputOptionGeneration>,
    ) -> Self {
        let mut windows: Vec<(u64, String)> = json_prop_config
            .values()
            .filter(|c| c.is_user_enabled)
            .map(|c| {
                let label = c
                    .label
                    .clone()
                    .or_else(|| c.key.clone())
                    .unwrap_or_default();
                (c.cumulative_time, label)
            })
            .collect();
        windows.sort_by_key(|(cumulative, _)| *cumulative);
        Self {
            total_ms: total_estimated_seconds * 1000,
            windows,
            completed: false,
        }
    }

    /// Marks the real request finished; all later states read `Complete!`.
    pub fn complete(&mut self) {
        self.completed = true;
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Progress state at a given elapsed time since the request started.
    pub fn state_at(&self, elapsed: Duration) -> ProgressState {
        if self.completed {
            return ProgressState {
                percent: 100,
                status: "Complete!".to_string(),
            };
        }
        let elapsed_ms = elapsed.as_millis() as u64;
        let percent = if self.total_ms == 0 {
            100
        } else {
            let raw = (elapsed_ms as f64 / self.total_ms as f64) * 100.0;
            (raw.round() as u64).clamp(3, 100)
        };
        if percent >= 100 {
            return ProgressState {
                percent: 100,
                status: "Wrapping up...".to_string(),
            };
        }
        let status = self
            .windows
            .iter()
            .find(|(cumulative, _)| elapsed_ms <= *cumulative)
            .map(|(_, label)| format!("Generating {label}"))
            .unwrap_or_else(|| "Wrapping up...".to_string());
        ProgressState { percent, status }
    }
}

/// Completion request handed to the external AI service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub run_prompt: String,
    pub output_format: Value,
}

/// Opaque AI completion collaborator.
pub trait CompletionService {
    fn get_card_completion(&mut self, request: &CompletionRequest) -> SiteResult<Value>;
}

/// Generation helper over one card and its resolved template.
pub struct CardGeneration<'a> {
    card: &'a Card,
    template: Option<ResolvedTemplate<'a>>,
    ctx: TemplateContext,
    saved: GenerationConfig,
}

impl<'a> CardGeneration<'a> {
    pub fn new(card: &'a Card, templates: &'a [CardTemplate], ctx: TemplateContext) -> Self {
        let saved: GenerationConfig =
            serde_json::from_value(card.generation.clone()).unwrap_or_default();
        Self {
            template: resolve_template(card, templates),
            card,
            ctx,
            saved,
        }
    }

    /// Per-field enable/prompt overrides from `userConfig.standard.ai.fields`.
    pub fn fields_user_config(&self) -> BTreeMap<String, InputOptionGeneration> {
        get_nested(&self.card.user_config, "standard.ai.fields")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    /// The template's config schema, if any.
    pub fn json_schema(&self) -> Option<Value> {
        self.template
            .as_ref()
            .and_then(|t| t.get().get_config(&self.ctx).schema)
    }

    pub fn json_prop_config(&self) -> BTreeMap<String, InputOptionGeneration> {
        generate_json_prop_config(self.json_schema().as_ref(), &self.fields_user_config())
    }

    pub fn output_props(&self) -> Map<String, Value> {
        generate_output_props(self.json_schema().as_ref(), &self.json_prop_config())
    }

    /// The schema narrowed to the completion payload shape.
    pub fn output_schema(&self) -> Option<Value> {
        let mut schema = self.json_schema()?;
        if let Some(map) = schema.as_object_mut() {
            map.insert(
                "properties".to_string(),
                Value::Object(self.output_props()),
            );
        }
        Some(schema)
    }

    /// Whole-second estimate across the enabled fields.
    pub fn total_estimated_time(&self) -> u64 {
        calculate_total_estimated_time_seconds(&self.json_prop_config())
    }

    /// User prompt, or a default derived from the card's title.
    pub fn prompt(&self) -> String {
        match &self.saved.prompt {
            Some(prompt) if !prompt.is_empty() => prompt.clone(),
            _ => {
                let title = match &self.card.title {
                    Some(title) if !title.is_empty() => title.clone(),
                    _ => to_label(&self.card.template_id),
                };
                format!("create content for the \"{title}\" website section")
            }
        }
    }

    /// Fresh progress simulation for this card's enabled fields.
    pub fn start_progress(&self) -> ProgressSimulation {
        ProgressSimulation::new(self.total_estimated_time(), &self.json_prop_config())
    }

    /// Runs the completion through the external service.
    ///
    /// Preconditions fail fast with typed errors before any external call.
    /// The progress simulation is completed whatever the outcome.
    pub fn get_completion(
        &self,
        service: &mut dyn CompletionService,
        progress: &mut ProgressSimulation,
    ) -> SiteResult<Value> {
        if self.template.is_none() {
            return Err(SiteError::generation("site and template required"));
        }
        let Some(output_schema) = self.output_schema() else {
            return Err(SiteError::generation("missing schema"));
        };
        let output_props = self.output_props();
        if output_props.is_empty() {
            return Err(SiteError::generation("no fields to generate"));
        }

        let request = CompletionRequest {
            run_prompt: self.prompt(),
            output_format: output_schema,
        };
        tracing::info!(card_id = %self.card.card_id, prompt = %request.run_prompt, "running completion");

        let result = service.get_card_completion(&request);
        progress.complete();
        result
    }
}

/// Deep-merges a completion result into a card's user config, key by key.
pub fn apply_changes(card: &mut Card, completion: &Value) {
    if completion.is_object() {
        merge_values(&mut card.user_config, completion);
    }
}
