//! Basic usage example for the libimageq library.
//!
//! Resolves a few references offline, then queries the public registries.
//!
//! Run with: cargo run --example basic_usage -- [image]

use libimageq::family::{browse_url, display_name};
use libimageq::format::{format_date, format_size};
use libimageq::{ImageQuery, resolve};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("libimageq {} - Basic Usage Example\n", libimageq::version());

    for raw in ["nginx", "bitnami/redis:7.2", "ghcr.io/actions/checkout:v4"] {
        let reference = resolve(raw);
        println!("{}", raw);
        println!("  registry: {}", display_name(&reference));
        println!("  browse:   {}\n", browse_url(&reference));
    }

    let image = std::env::args().nth(1).unwrap_or_else(|| "alpine".to_string());
    let mut query = ImageQuery::connect()?;

    match query.latest(&image) {
        Ok(latest) => println!("Latest version of {}: {}", image, latest),
        Err(e) => eprintln!("Could not determine latest version: {}", e),
    }

    let info = query.show(&image)?;
    println!("\n{}", info.value.full_image_ref);
    println!("  {}", info.value.description);
    if let Some(size) = info.value.size {
        println!("  size: {}", format_size(size));
    }
    if let Some(date) = &info.value.tag_date {
        println!("  date: {}", format_date(date));
    }
    for warning in &info.diagnostics {
        eprintln!("  warning: {}", warning);
    }

    Ok(())
}
