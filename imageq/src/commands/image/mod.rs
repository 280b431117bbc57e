use crate::format::Formattable;
use libimageq::ImageInfo;
use libimageq::format::{format_date, format_size};
use libimageq::ranking::parse_version;
use serde::Serialize;
use tabled::Tabled;

pub mod handlers;

const UNKNOWN: &str = "unknown";

impl Formattable for ImageInfo {
    fn format_pretty(&self) -> String {
        let size = self.size.map(format_size);
        let date = self.tag_date.as_deref().map(format_date);
        let rows = [
            ("Name", self.name.as_str()),
            ("Description", self.description.as_str()),
            ("Tag", self.latest_tag.as_str()),
            ("Created", date.as_deref().unwrap_or(UNKNOWN)),
            ("Size", size.as_deref().unwrap_or(UNKNOWN)),
            ("Digest", self.manifest_digest.as_deref().unwrap_or(UNKNOWN)),
            ("Registry", self.registry.as_str()),
            ("Reference", self.full_image_ref.as_str()),
        ];

        rows.iter()
            .map(|(label, value)| format!("{:<12} {}", format!("{}:", label), value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One row of the `tags` table
#[derive(Debug, Serialize, Tabled, PartialEq, Eq)]
pub struct TagRow {
    #[tabled(rename = "TAG")]
    pub tag: String,
    #[tabled(rename = "VERSION")]
    pub version: String,
}

impl TagRow {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            version: parse_version(tag)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Answer of the `latest` command
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LatestTag {
    pub image: String,
    pub tag: String,
}

impl Formattable for LatestTag {
    fn format_pretty(&self) -> String {
        self.tag.clone()
    }
}

/// Answer of the `browse` command
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct BrowseLink {
    pub image: String,
    pub url: String,
}

impl Formattable for BrowseLink {
    fn format_pretty(&self) -> String {
        self.url.clone()
    }
}
