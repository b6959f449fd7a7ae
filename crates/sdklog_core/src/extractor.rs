// extractor.rs: pull SDK-embedded key/values out of a record's message text
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::error::{ExtractError, SdkLogError};
use crate::record::Properties;

/// Key whose value replaces the display message when the SDK message is JSON.
pub const AZ_SDK_MESSAGE_KEY: &str = "az.sdk.message";
pub const PARTITION_ID_KEY: &str = "partitionId";
/// Keys whose `<partition>_<suffix>` values also yield a `partitionId` property.
pub const PARTITION_SOURCE_KEYS: [&str; 2] = ["linkName", "connectionId"];

const NULL: &str = "null";

static BRACKET_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z_][\w.\-]*)\[([^\[\]]*)\]").unwrap());
static QUOTED_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z_][\w.\-]*):\s*'([^']*)'").unwrap());

/// Result of a successful extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub display: String,
    pub properties: Properties,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractStrategy {
    /// The message is (or ends with) a JSON object.
    #[default]
    Json,
    /// The message carries inline `key[value]` / `key: 'value'` tokens.
    Pattern,
}

impl ExtractStrategy {
    pub fn extract(&self, message: &str) -> Result<Extraction, ExtractError> {
        match self {
            ExtractStrategy::Json => extract_json(message),
            ExtractStrategy::Pattern => Ok(extract_pattern(message)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractStrategy::Json => "json",
            ExtractStrategy::Pattern => "pattern",
        }
    }
}

impl FromStr for ExtractStrategy {
    type Err = SdkLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExtractStrategy::Json),
            "pattern" => Ok(ExtractStrategy::Pattern),
            other => Err(SdkLogError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Render a JSON value the way it is stored in record properties.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => NULL.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// Reads the first JSON object in `text`; anything after it is ignored.
fn first_object(text: &str) -> Result<Map<String, Value>, ExtractError> {
    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<Map<String, Value>>();
    match stream.next() {
        Some(Ok(map)) => Ok(map),
        Some(Err(e)) => Err(ExtractError::NotJson(e)),
        None => Err(ExtractError::Empty),
    }
}

/// Parse the message as a JSON object. On failure retry from the first `{`, which
/// recovers messages carrying stray leading characters (e.g. `"- - {...}"`).
pub fn extract_json(message: &str) -> Result<Extraction, ExtractError> {
    let map = match first_object(message) {
        Ok(map) => map,
        Err(first) => match message.find('{') {
            Some(i) if i > 0 => first_object(&message[i..])?,
            _ => return Err(first),
        },
    };

    let display = map.get(AZ_SDK_MESSAGE_KEY).map(display_value).unwrap_or_else(|| message.to_string());
    let mut properties = Properties::with_capacity(map.len());
    for (k, v) in map.iter() {
        properties.insert(k.clone(), display_value(v));
    }
    Ok(Extraction { display, properties })
}

fn derive_partition(key: &str, value: &str) -> Option<String> {
    if !PARTITION_SOURCE_KEYS.contains(&key) {
        return None;
    }
    value.find('_').map(|i| value[..i].to_string())
}

/// Scan legacy SDK text for `name[value]` and `name: 'value'` tokens. Matched spans are
/// removed from the display message, which is then space-collapsed and trimmed. Text
/// without any token is returned untouched, so a message the SDK did not format keeps
/// its own spacing.
pub fn extract_pattern(message: &str) -> Extraction {
    let mut properties = Properties::new();
    let mut removed: Vec<(usize, usize)> = Vec::new();

    for re in [&*BRACKET_PAIR, &*QUOTED_PAIR] {
        for caps in re.captures_iter(message) {
            let Some(whole) = caps.get(0) else { continue };
            let key = caps[1].trim();
            let value = caps[2].trim();
            properties.entry(key.to_string()).or_insert_with(|| value.to_string());
            if let Some(partition) = derive_partition(key, value) {
                properties.entry(PARTITION_ID_KEY.to_string()).or_insert(partition);
            }
            removed.push((whole.start(), whole.end()));
        }
    }

    if removed.is_empty() {
        return Extraction { display: message.to_string(), properties };
    }

    removed.sort_unstable();
    let mut display = String::with_capacity(message.len());
    let mut spans = removed.iter().peekable();
    for (i, ch) in message.char_indices() {
        while spans.peek().is_some_and(|&&(_, end)| end <= i) {
            spans.next();
        }
        if spans.peek().is_some_and(|&&(start, _)| start <= i) {
            continue;
        }
        if ch == ' ' && display.ends_with(' ') {
            continue;
        }
        display.push(ch);
    }

    Extraction { display: display.trim().to_string(), properties }
}
