// Serializers for form definition files

use anyhow::Result;
use std::path::Path;

use crate::domain::element::Form;

/// Strategy trait for form file formats
pub trait FormSerializer: Send + Sync {
    fn serialize(&self, forms: &[Form]) -> Result<String>;
    fn deserialize(&self, content: &str) -> Result<Vec<Form>>;
    fn file_extension(&self) -> &'static str;
    fn content_type(&self) -> &'static str;
}

/// YAML serializer (hand-written form files)
pub struct YamlSerializer;

impl FormSerializer for YamlSerializer {
    fn serialize(&self, forms: &[Form]) -> Result<String> {
        Ok(serde_yaml::to_string(forms)?)
    }

    fn deserialize(&self, content: &str) -> Result<Vec<Form>> {
        Ok(serde_yaml::from_str(content)?)
    }

    fn file_extension(&self) -> &'static str {
        "yml"
    }

    fn content_type(&self) -> &'static str {
        "application/x-yaml"
    }
}

/// JSON serializer (same shape the backend API returns)
pub struct JsonSerializer;

impl FormSerializer for JsonSerializer {
    fn serialize(&self, forms: &[Form]) -> Result<String> {
        Ok(serde_json::to_string_pretty(forms)?)
    }

    fn deserialize(&self, content: &str) -> Result<Vec<Form>> {
        Ok(serde_json::from_str(content)?)
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

/// Pick a serializer from the file extension; anything but `.json` is YAML
pub fn for_path(path: &Path) -> Box<dyn FormSerializer> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => Box::new(JsonSerializer),
        _ => Box::new(YamlSerializer),
    }
}
