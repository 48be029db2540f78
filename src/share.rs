//! Shareable setup encoding
//!
//! A sandbox setup (config plus normalized entity positions) packed into a
//! flat `key=value&key=value` string with short keys, suitable for a URL
//! query or fragment. Decoding never fails: unknown keys are ignored and bad
//! values fall back to defaults.

use glam::DVec2;
use serde_json::{Map, Value};

use crate::config::{EntityLayout, SimConfig, read_f64};

/// Short key to config field name
const CONFIG_KEYS: &[(&str, &str)] = &[
    ("a", "arena"),
    ("r", "arena_radius"),
    ("h", "avg_hit"),
    ("s", "projectile_speed"),
    ("si", "projectile_speed_increase"),
    ("n", "base_projectiles"),
    ("w", "whirlwind_stages"),
    ("d", "projectile_duration"),
    ("pr", "projectile_radius"),
    ("tr", "target_radius"),
    ("ms", "max_seals"),
    ("sf", "seal_frequency"),
    ("sfi", "seal_frequency_increase"),
    ("st", "seal_threshold"),
    ("b", "barrage_count"),
    ("bt", "barrage_interval"),
    ("p", "pierce"),
    ("f", "fork"),
    ("c", "chain"),
    ("sp", "split"),
    ("fc", "fork_chance"),
    ("po", "pierce_only"),
    ("hg", "hit_group_policy"),
];

/// Short key to corridor dimension name (nested under `corridor`)
const CORRIDOR_KEYS: &[(&str, &str)] = &[
    ("cbw", "bar_width"),
    ("cbh", "bar_height"),
    ("csw", "stem_width"),
    ("csl", "stem_length"),
];

fn share_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some((if *b { "1" } else { "0" }).to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Pull the short keys present in `raw` out under their long names
fn pick(raw: &Map<String, Value>, keys: &[(&str, &str)]) -> Map<String, Value> {
    keys.iter()
        .filter_map(|&(short, long)| raw.get(short).map(|v| (long.to_string(), v.clone())))
        .collect()
}

/// Encode a setup as `key=value` pairs joined by `&`
pub fn encode(config: &SimConfig, layout: &EntityLayout) -> String {
    let fields = match serde_json::to_value(config) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) | Err(_) => {
            log::warn!("Config could not be serialized for sharing");
            Map::new()
        }
    };

    let mut pairs: Vec<String> = CONFIG_KEYS
        .iter()
        .filter_map(|&(short, long)| {
            let value = share_value(fields.get(long)?)?;
            Some(format!("{short}={value}"))
        })
        .collect();

    if let Some(corridor) = fields.get("corridor").and_then(Value::as_object) {
        pairs.extend(CORRIDOR_KEYS.iter().filter_map(|&(short, long)| {
            let value = share_value(corridor.get(long)?)?;
            Some(format!("{short}={value}"))
        }));
    }

    for (short, value) in [
        ("cx", layout.caster.x),
        ("cy", layout.caster.y),
        ("tx", layout.target.x),
        ("ty", layout.target.y),
    ] {
        pairs.push(format!("{short}={value}"));
    }

    pairs.join("&")
}

/// Decode a setup; a leading `?` or `#` is ignored
pub fn decode(encoded: &str) -> (SimConfig, EntityLayout) {
    let raw: Map<String, Value> = encoded
        .trim()
        .trim_start_matches(['?', '#'])
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), Value::String(v.trim().to_string())))
        .collect();

    let mut fields = pick(&raw, CONFIG_KEYS);
    let corridor = pick(&raw, CORRIDOR_KEYS);
    if !corridor.is_empty() {
        fields.insert("corridor".to_string(), Value::Object(corridor));
    }
    let config = SimConfig::from_json_value(&Value::Object(fields));

    let d = EntityLayout::default();
    let layout = EntityLayout {
        caster: DVec2::new(
            read_f64(&raw, "cx", d.caster.x),
            read_f64(&raw, "cy", d.caster.y),
        ),
        target: DVec2::new(
            read_f64(&raw, "tx", d.target.x),
            read_f64(&raw, "ty", d.target.y),
        ),
    };

    (config, layout)
}
