//! Provider payload normalization
//!
//! Each [`ResponseKind`] has one documented flat shape. Providers are loose
//! about field names, so the readers below accept the common variants.

use serde_json::{Map, Value, json};

use crate::error::{Result, RouterError};

use super::definition::{ResponseKind, Tool};

/// Parameter key the handler stores the geocoded display name under
pub const RESOLVED_LOCATION_KEY: &str = "resolved_location";

/// Headline cap for news responses
const MAX_HEADLINES: usize = 5;

/// Convert a raw provider payload into the tool's response shape
pub fn normalize(tool: &Tool, params: &Map<String, Value>, raw: Value) -> Result<Map<String, Value>> {
    if let Some(error) = raw.get("error") {
        return Err(RouterError::provider(&tool.name, format!("provider reported error: {}", error)));
    }

    let value = match tool.response {
        ResponseKind::Weather => weather(tool, params, &raw)?,
        ResponseKind::Crypto => crypto(tool, params, &raw)?,
        ResponseKind::News => news(tool, params, &raw)?,
        ResponseKind::Joke => joke(tool, &raw)?,
        ResponseKind::Quote => quote(tool, &raw)?,
        ResponseKind::Raw => match raw {
            Value::Object(_) => raw,
            other => json!({ "data": other }),
        },
    };

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(RouterError::provider(&tool.name, "normalized payload is not an object")),
    }
}

fn first_of<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| raw.get(*k)).filter(|v| !v.is_null())
}

fn string_param<'a>(params: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

fn weather(tool: &Tool, params: &Map<String, Value>, raw: &Value) -> Result<Value> {
    let current = raw.get("current_weather").unwrap_or(raw);

    let temperature = first_of(current, &["temperature", "temp"])
        .and_then(Value::as_f64)
        .ok_or_else(|| RouterError::provider(&tool.name, "payload has no temperature"))?;

    let condition = match first_of(current, &["condition", "cond", "description"]).and_then(Value::as_str) {
        Some(text) => text.to_string(),
        None => first_of(current, &["weathercode", "weather_code"])
            .and_then(Value::as_u64)
            .map(|code| wmo_description(code).to_string())
            .ok_or_else(|| RouterError::provider(&tool.name, "payload has no condition"))?,
    };

    let location = raw
        .get("location")
        .and_then(Value::as_str)
        .or_else(|| string_param(params, RESOLVED_LOCATION_KEY))
        .or_else(|| string_param(params, "location"))
        .unwrap_or_default();

    Ok(json!({
        "temperature": temperature,
        "condition": condition,
        "location": location,
    }))
}

/// WMO weather interpretation codes as used by open-meteo
pub fn wmo_description(code: u64) -> &'static str {
    match code {
        0 => "Clear Sky",
        1 => "Mainly Clear",
        2 => "Partly Cloudy",
        3 => "Overcast",
        45 | 48 => "Fog",
        51 | 53 | 55 => "Drizzle",
        56 | 57 => "Freezing Drizzle",
        61 | 63 | 65 => "Rain",
        66 | 67 => "Freezing Rain",
        71 | 73 | 75 => "Snow",
        77 => "Snow Grains",
        80..=82 => "Rain Showers",
        85 | 86 => "Snow Showers",
        95 => "Thunderstorm",
        96 | 99 => "Thunderstorm With Hail",
        _ => "Unknown",
    }
}

fn crypto(tool: &Tool, params: &Map<String, Value>, raw: &Value) -> Result<Value> {
    let coin = string_param(params, "coin").unwrap_or_default().to_lowercase();

    // coingecko: {"bitcoin": {"usd": 65000.0}}
    let price = raw
        .get(&coin)
        .and_then(|c| c.get("usd"))
        .or_else(|| first_of(raw, &["price_usd", "price", "usd"]))
        .and_then(Value::as_f64)
        .ok_or_else(|| RouterError::provider(&tool.name, format!("no USD price for '{}'", coin)))?;

    Ok(json!({ "coin": coin, "price_usd": price }))
}

fn news(tool: &Tool, params: &Map<String, Value>, raw: &Value) -> Result<Value> {
    let items = first_of(raw, &["data", "articles", "headlines"])
        .or(Some(raw))
        .and_then(Value::as_array)
        .ok_or_else(|| RouterError::provider(&tool.name, "payload has no articles"))?;

    let headlines: Vec<Value> = items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            other => other.get("title").and_then(Value::as_str).map(String::from),
        })
        .take(MAX_HEADLINES)
        .map(Value::String)
        .collect();

    let category = raw
        .get("category")
        .and_then(Value::as_str)
        .or_else(|| string_param(params, "category"))
        .unwrap_or("all");

    Ok(json!({ "category": category, "headlines": headlines }))
}

fn joke(tool: &Tool, raw: &Value) -> Result<Value> {
    let setup = first_of(raw, &["setup", "joke"]).and_then(Value::as_str);
    let Some(setup) = setup else {
        return Err(RouterError::provider(&tool.name, "payload has no joke"));
    };
    let punchline = first_of(raw, &["punchline", "delivery"]).and_then(Value::as_str).unwrap_or_default();
    Ok(json!({ "setup": setup, "punchline": punchline }))
}

fn quote(tool: &Tool, raw: &Value) -> Result<Value> {
    // zenquotes answers with a one-element list of {q, a}
    let entry = raw.as_array().and_then(|a| a.first()).unwrap_or(raw);
    let text = first_of(entry, &["content", "quote", "q"])
        .and_then(Value::as_str)
        .ok_or_else(|| RouterError::provider(&tool.name, "payload has no quote"))?;
    let author = first_of(entry, &["author", "a"]).and_then(Value::as_str).unwrap_or("Unknown");
    Ok(json!({ "quote": text, "author": author }))
}
