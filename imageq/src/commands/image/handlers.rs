use super::{BrowseLink, LatestTag, TagRow};
use crate::format::{self, OutputFormat};
use libimageq::{ImageQuery, TagInfo, Transport};
use libimageq::ranking::is_versioned;
use tabled::Table;
use tabled::settings::Style;
use tracing::{debug, info};

/// Rendered command output and the warnings to print beside it
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Output {
    pub text: String,
    pub warnings: Vec<String>,
}

impl From<String> for Output {
    fn from(text: String) -> Self {
        Self {
            text,
            warnings: Vec::new(),
        }
    }
}

/// Handle the show command
pub fn show<T: Transport>(
    query: &mut ImageQuery<T>,
    image: &str,
    format: OutputFormat,
) -> Result<Output, String> {
    info!("Showing image: {}", image);
    let (info, warnings) = query.show(image).map_err(|e| e.to_string())?.into_parts();
    debug!("Descriptor cache: {:?}", query.cache_stats());

    Ok(Output {
        text: format::format_output(&info, format)?,
        warnings,
    })
}

/// Handle the tags command (list tags for a specific image)
pub fn tags<T: Transport>(
    query: &ImageQuery<T>,
    image: &str,
    semver_only: bool,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<Output, String> {
    info!("Listing tags for image: {}", image);
    let mut tags: Vec<TagInfo> = query.tags(image).map_err(|e| e.to_string())?;

    if semver_only {
        tags.retain(|tag| is_versioned(&tag.name));
    }
    if let Some(limit) = limit {
        tags.truncate(limit);
    }

    let text = match format {
        OutputFormat::Pretty if tags.is_empty() => format!("No tags found for image '{}'.", image),
        OutputFormat::Pretty => {
            let rows: Vec<TagRow> = tags.iter().map(|tag| TagRow::new(&tag.name)).collect();
            Table::new(&rows).with(Style::empty()).to_string()
        }
        _ => format::format_structured(&tags, format)?,
    };

    Ok(text.into())
}

/// Handle the latest command
pub fn latest<T: Transport>(
    query: &ImageQuery<T>,
    image: &str,
    format: OutputFormat,
) -> Result<Output, String> {
    info!("Finding latest version of image: {}", image);
    let tag = query.latest(image).map_err(|e| e.to_string())?;
    let latest = LatestTag {
        image: image.to_string(),
        tag,
    };

    Ok(format::format_output(&latest, format)?.into())
}

/// Handle the browse command
pub fn browse<T: Transport>(
    query: &ImageQuery<T>,
    image: &str,
    format: OutputFormat,
) -> Result<Output, String> {
    let link = BrowseLink {
        image: image.to_string(),
        url: query.browse_url(image),
    };

    Ok(format::format_output(&link, format)?.into())
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
