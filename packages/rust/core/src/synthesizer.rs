//! Multi-locale content synthesis for a single catalog entry.
//!
//! One request per entry asks the generator for a JSON object holding
//! pros/cons/verdict in every supported locale plus a shared rating. The
//! reply is de-fenced, parsed leniently, and mapped onto an [`EnrichedEntry`].

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use comparekit_provider::{GenerationRequest, TextGenerator};
use comparekit_shared::{CatalogEntry, ComparekitError, EnrichedEntry, Locale, Result};

/// Number of pros/cons requested per locale.
pub const ITEMS_PER_LIST: usize = 3;

/// Default sampling temperature for synthesis requests.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Matches a fenced block, optionally tagged with a language.
static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").expect("valid fence regex")
});

/// Builds prompts, calls the generator, and parses replies.
pub struct Synthesizer<G> {
    generator: G,
    temperature: f32,
}

impl<G: TextGenerator> Synthesizer<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Generate and parse content for `entry`. Every failure is `SynthesisFailed`.
    #[instrument(skip_all, fields(tool = %entry.name))]
    pub async fn synthesize(&self, entry: &CatalogEntry) -> Result<EnrichedEntry> {
        let request = GenerationRequest {
            prompt: build_prompt(&entry.name),
            temperature: self.temperature,
        };

        let content = self
            .generator
            .generate(&request)
            .await
            .map_err(|e| {
                if e.is_per_entry() {
                    e
                } else {
                    ComparekitError::synthesis(e.to_string())
                }
            })?;

        debug!(chars = content.len(), "parsing generated content");
        parse_response(entry, &content)
    }
}

/// Key in the JSON payload for a field in `locale`.
fn payload_key(field: &str, locale: Locale) -> String {
    format!("{field}{}", locale.json_suffix())
}

/// Build the single instruction sent for `name`.
pub fn build_prompt(name: &str) -> String {
    let mut schema = Vec::new();
    for locale in Locale::ALL {
        let language = locale.display_name();
        schema.push(format!(
            "  \"{}\": [\"{ITEMS_PER_LIST} short pros in {language}\"],",
            payload_key("pros", locale)
        ));
        schema.push(format!(
            "  \"{}\": [\"{ITEMS_PER_LIST} short cons in {language}\"],",
            payload_key("cons", locale)
        ));
        schema.push(format!(
            "  \"{}\": \"One-line verdict in {language}\",",
            payload_key("verdict", locale)
        ));
    }
    schema.push("  \"rating\": \"4.7\"".to_string());

    let languages: Vec<&str> = Locale::ALL.iter().map(|l| l.display_name()).collect();

    format!(
        "Analyze the software product \"{name}\" for a comparison website.\n\
         Write {ITEMS_PER_LIST} short pros, {ITEMS_PER_LIST} short cons and a one-line verdict \
         in each of these languages: {}.\n\
         Give one overall rating from 1.0 to 5.0 as a decimal string, shared by all languages.\n\
         Return a single JSON object with exactly these keys:\n{{\n{}\n}}\n\
         JSON ONLY. No markdown.",
        languages.join(", "),
        schema.join("\n")
    )
}

/// Remove enclosing code-fence markup around the payload.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    if let Some(caps) = FENCED_BLOCK.captures(trimmed) {
        if let Some(body) = caps.get(1) {
            return body.as_str().trim();
        }
    }
    // Unterminated fence: drop the opening marker line only.
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
        return rest.trim();
    }
    trimmed
}

/// Parse a generator reply into an [`EnrichedEntry`] for `entry`.
///
/// Missing or mistyped fields default to empty; only an unparsable or
/// non-object payload fails the whole entry.
pub fn parse_response(entry: &CatalogEntry, content: &str) -> Result<EnrichedEntry> {
    let body = strip_code_fences(content);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ComparekitError::synthesis(format!("invalid JSON for '{}': {e}", entry.name)))?;

    let Value::Object(map) = value else {
        return Err(ComparekitError::synthesis(format!(
            "expected a JSON object for '{}'",
            entry.name
        )));
    };

    let mut enriched = EnrichedEntry::new(entry.clone(), rating_field(&map));
    for locale in Locale::ALL {
        let bundle = enriched.bundle_mut(locale);
        bundle.pros = list_field(&map, &payload_key("pros", locale));
        bundle.cons = list_field(&map, &payload_key("cons", locale));
        bundle.verdict = text_field(&map, &payload_key("verdict", locale));
    }
    Ok(enriched)
}

fn rating_field(map: &Map<String, Value>) -> String {
    match map.get("rating") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        _ => String::new(),
    }
}

fn list_field(map: &Map<String, Value>, key: &str) -> Vec<String> {
    let items: Vec<String> = match map.get(key) {
        Some(Value::Array(items)) => items.iter().filter_map(item_text).collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    };
    items
        .iter()
        .map(|s| clean_item(s))
        .filter(|s| !s.is_empty())
        .collect()
}

fn item_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Trim and keep the list separator out of a pros/cons item.
fn clean_item(text: &str) -> String {
    text.trim().replace('|', "/")
}
