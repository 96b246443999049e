//! Subcommand handlers.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::Deserialize;
use serde_json::json;
use spider_generator::{
    render as render_source, write_spider, AttributeRecord, BaseType, DefinitionMetadata,
    GeneratorConfig, Platform, Registry, SpiderDefinition, SpiderGenerator,
};

/// Where a generated spider goes.
pub enum Output {
    Stdout,
    /// Output directory; `None` uses the configured one.
    Dir(Option<PathBuf>),
}

/// On-disk form of a spider declaration for `spidergen render`.
#[derive(Debug, Deserialize)]
pub struct DefinitionFile {
    pub class_name: String,
    #[serde(default)]
    pub bases: Vec<BaseType>,
    #[serde(default)]
    pub attributes: AttributeRecord,
    #[serde(default)]
    pub metadata: DefinitionMetadata,
}

impl DefinitionFile {
    pub fn into_definition(self) -> SpiderDefinition {
        let mut builder = SpiderDefinition::builder(self.class_name);
        for base in self.bases {
            builder = builder.base(base);
        }
        builder
            .attributes(self.attributes)
            .metadata(self.metadata)
            .build()
    }
}

pub async fn generate(
    config: Option<&Path>,
    url: &str,
    platform: Option<Platform>,
    metadata: DefinitionMetadata,
    output: Output,
    json: bool,
) -> anyhow::Result<()> {
    let config = GeneratorConfig::resolve(config)?;
    tracing::debug!("effective config: {config:?}");
    let output_dir = config.output_dir.clone();
    let generator = SpiderGenerator::from_config(config)?;

    let spider = match platform {
        Some(platform) => generator.generate_for(platform, url, metadata).await?,
        None => match generator.generate(url, metadata).await? {
            Some(spider) => spider,
            None => bail!("no supported store finder found on {url}"),
        },
    };

    let written = match output {
        Output::Stdout => None,
        Output::Dir(dir) => {
            let dir = dir.unwrap_or(output_dir);
            Some(
                write_spider(&spider.definition, &dir)
                    .with_context(|| format!("writing spider to {}", dir.display()))?,
            )
        }
    };

    if json {
        let report = json!({
            "platform": spider.platform,
            "class_name": spider.definition.class_name(),
            "attributes": spider.definition.attributes(),
            "path": written.as_ref().map(|p| p.display().to_string()),
            "source": spider.source,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match written {
            Some(path) => println!(
                "{} ({}) -> {}",
                spider.definition.class_name(),
                spider.platform,
                path.display()
            ),
            None => println!("{}", spider.source),
        }
    }
    Ok(())
}

pub async fn detect(
    config: Option<&Path>,
    urls: &[String],
    concurrency: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let mut config = GeneratorConfig::resolve(config)?;
    if let Some(n) = concurrency {
        config.concurrency = n.max(1);
    }
    tracing::info!("probing {} sites, {} at a time", urls.len(), config.concurrency);
    let reports = SpiderGenerator::from_config(config)?.detect_many(urls).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }
    for report in &reports {
        let outcome = match (&report.platform, &report.error) {
            (Some(platform), _) => platform.to_string(),
            (None, Some(error)) => format!("error: {error}"),
            (None, None) => "-".to_string(),
        };
        println!("{}\t{outcome}", report.url);
    }
    Ok(())
}

pub fn render(path: &Path) -> anyhow::Result<()> {
    println!("{}", render_file(path)?);
    Ok(())
}

fn render_file(path: &Path) -> anyhow::Result<String> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let file: DefinitionFile = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(render_source(&file.into_definition()))
}

pub fn platforms(json: bool) -> anyhow::Result<()> {
    let registry = Registry::default();
    let rows: Vec<(Platform, BaseType)> = registry
        .iter()
        .map(|finder| (finder.platform(), finder.base_type()))
        .collect();

    if json {
        let list: Vec<_> = rows
            .iter()
            .map(|(platform, base)| json!({ "platform": platform, "base": base }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else {
        for (platform, base) in &rows {
            println!("{:<12} {}.{}", platform.as_str(), base.module, base.name);
        }
    }
    Ok(())
}
