//! Persona — who the responder speaks as.
//!
//! A persona always carries the four required fields (`name`, `context`,
//! `personality`, `style`). Override layers add free-form attributes and the
//! three optional detail blocks.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field names the resolver treats as first-class.
pub const REQUIRED_FIELDS: [&str; 4] = ["name", "context", "personality", "style"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,

    /// Role template key, e.g. `financial_advisor`
    pub context: String,

    /// Free text; its first word selects the personality template
    pub personality: String,

    /// Communication style key, e.g. `formal`, `empatik`
    pub style: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_details: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality_details: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_details: Option<Value>,

    /// Everything else a profile supplies (gender, background, goals, ...)
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Default for Persona {
    fn default() -> Self {
        let mut attributes = Map::new();
        attributes.insert("gender".into(), Value::String("netral".into()));
        attributes.insert(
            "background".into(),
            Value::String("memiliki pengetahuan luas tentang investasi".into()),
        );
        attributes.insert(
            "goals".into(),
            Value::String("membantu pengguna dalam menemukan investasi yang tepat".into()),
        );

        Self {
            name: "CS JTRADE".into(),
            context: "investment_advisor".into(),
            personality: "ramah dan profesional".into(),
            style: "formal".into(),
            context_details: None,
            personality_details: None,
            style_details: None,
            attributes,
        }
    }
}

impl Persona {
    /// Merge a partial record over this persona.
    ///
    /// Required fields are replaced only by string values (other JSON values
    /// are stringified); the detail blocks are replaced wholesale; any other
    /// key lands in `attributes`.
    pub fn merge(&mut self, overrides: &Map<String, Value>) {
        for (key, value) in overrides {
            match key.as_str() {
                "name" => self.name = value_to_text(value),
                "context" => self.context = value_to_text(value),
                "personality" => self.personality = value_to_text(value),
                "style" => self.style = value_to_text(value),
                "context_details" => self.context_details = Some(value.clone()),
                "personality_details" => self.personality_details = Some(value.clone()),
                "style_details" => self.style_details = Some(value.clone()),
                _ => {
                    self.attributes.insert(key.clone(), value.clone());
                }
            }
        }
    }

    /// First word of `personality`, lower-cased — the personality template key.
    pub fn personality_key(&self) -> String {
        self.personality
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }

    /// Lower-cased `style` — the style template key.
    pub fn style_key(&self) -> String {
        self.style.trim().to_lowercase()
    }

    /// Look up a free-form attribute as text.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
