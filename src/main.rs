//! Amnesia Anchor CLI
//!
//! Usage:
//!   amnesia-anchor apply <package.opf> <chapter.xhtml> <chapter-href> <annotations.json>
//!   amnesia-anchor locate <package.opf> <chapter.xhtml> <chapter-href> <quote>

use std::env;
use std::fs;

use anyhow::{bail, Context};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use amnesia_anchor::dom::Document;
use amnesia_anchor::{AnchorConfig, AnchorService, Annotation, Package};

const USAGE: &str = "usage: amnesia-anchor <apply|locate> <package.opf> <chapter.xhtml> <chapter-href> <annotations.json|quote>";

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AnchorConfig::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let [command, package_path, chapter_path, chapter_href, input] = args.as_slice() else {
        bail!(USAGE);
    };

    let package = Package::from_path(package_path)
        .with_context(|| format!("Failed to load package {}", package_path))?;
    let mut chapter = Document::from_path(chapter_path)
        .with_context(|| format!("Failed to load chapter {}", chapter_path))?;
    let service = AnchorService::from_config(&config);

    match command.as_str() {
        "apply" => {
            let json = fs::read_to_string(input)
                .with_context(|| format!("Failed to read annotations {}", input))?;
            let annotations: Vec<Annotation> =
                serde_json::from_str(&json).context("Invalid annotations file")?;

            let report = service.apply_all(&annotations, &package, &mut chapter, chapter_href);
            for failed in &report.failed {
                tracing::warn!("Annotation {} not shown: {}", failed.id, failed.error);
            }
            println!("{}", chapter.serialize()?);
        }
        "locate" => {
            let spine_index = package
                .spine_index(chapter_href)
                .with_context(|| format!("{} is not in the spine", chapter_href))?;
            let annotation = service.create_from_quote(&chapter, input, chapter_href, spine_index)?;
            tracing::info!("Created annotation {}", annotation.selector());
            println!("{}", serde_json::to_string_pretty(&annotation)?);
        }
        other => bail!("Unknown command {:?}\n{}", other, USAGE),
    }

    Ok(())
}
