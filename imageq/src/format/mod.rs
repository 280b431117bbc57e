pub use libimageq::config::OutputFormat;
use serde::Serialize;

/// Print an error message to stderr
pub fn error(message: &str) {
    eprintln!("Error: {}", message);
}

/// Print a warning message to stderr
pub fn warning(message: &str) {
    eprintln!("warning: {}", message);
}

/// Trait for types that can be formatted for CLI output
pub trait Formattable: Serialize {
    /// Format the type for pretty (human-readable) output
    fn format_pretty(&self) -> String;
}

/// Format a single item for output
pub fn format_output<T: Formattable>(item: &T, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Pretty => Ok(item.format_pretty()),
        OutputFormat::Json => serde_json::to_string_pretty(item)
            .map_err(|e| format!("Failed to serialize to JSON: {}", e)),
        OutputFormat::Yaml => {
            serde_yaml::to_string(item).map_err(|e| format!("Failed to serialize to YAML: {}", e))
        }
    }
}

/// Serialize a list of items; pretty output is left to the caller
pub fn format_structured<T: Serialize>(items: &[T], format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json | OutputFormat::Pretty => serde_json::to_string_pretty(items)
            .map_err(|e| format!("Failed to serialize to JSON: {}", e)),
        OutputFormat::Yaml => {
            serde_yaml::to_string(items).map_err(|e| format!("Failed to serialize to YAML: {}", e))
        }
    }
}
