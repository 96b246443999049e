//! spidergen: generate store locator spiders from the command line.

mod commands;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use spider_generator::Platform;

#[derive(Parser, Debug)]
#[command(
    name = "spidergen",
    about = "Detect embedded store finders and generate spiders for them",
    version
)]
struct Cli {
    /// Path to a JSON config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect the store finder on a site and generate its spider.
    Generate {
        /// Store locator page URL.
        url: String,

        /// Skip detection and assume this platform.
        #[arg(long, value_parser = parse_platform)]
        platform: Option<Platform>,

        #[arg(long)]
        brand: Option<String>,

        /// Brand Wikidata identifier. The brand is ignored without it.
        #[arg(long)]
        brand_wikidata: Option<String>,

        #[arg(long)]
        operator: Option<String>,

        /// Operator Wikidata identifier. The operator is ignored without it.
        #[arg(long)]
        operator_wikidata: Option<String>,

        /// Spider name, replacing the one derived from the domain.
        #[arg(long)]
        spider_key: Option<String>,

        /// Directory the spider is written to (defaults to the config's).
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Print the source instead of writing it.
        #[arg(long)]
        stdout: bool,
    },

    /// Report which store finder each site embeds.
    Detect {
        /// Site URLs to probe.
        #[arg(required = true)]
        urls: Vec<String>,

        /// Sites probed at once.
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Render a spider from a JSON definition file.
    Render {
        /// Definition file: class_name, bases, attributes, metadata.
        definition: PathBuf,
    },

    /// List the built-in store finder platforms.
    Platforms,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   spidergen completions bash > ~/.local/share/bash-completion/completions/spidergen
    ///   spidergen completions zsh > ~/.zfunc/_spidergen
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn parse_platform(name: &str) -> Result<Platform, String> {
    Platform::from_name(name).ok_or_else(|| format!("unknown platform: {name}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Generate {
            url,
            platform,
            brand,
            brand_wikidata,
            operator,
            operator_wikidata,
            spider_key,
            output_dir,
            stdout,
        } => {
            let metadata = spider_generator::DefinitionMetadata {
                brand,
                brand_wikidata,
                operator,
                operator_wikidata,
                spider_key,
                extracted_attributes: None,
            };
            let target = if stdout {
                commands::Output::Stdout
            } else {
                commands::Output::Dir(output_dir)
            };
            commands::generate(config, &url, platform, metadata, target, cli.json).await?;
        }

        Commands::Detect { urls, concurrency } => {
            commands::detect(config, &urls, concurrency, cli.json).await?;
        }

        Commands::Render { definition } => {
            commands::render(&definition)?;
        }

        Commands::Platforms => {
            commands::platforms(cli.json)?;
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "spidergen", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from([
            "spidergen",
            "generate",
            "https://www.acme.example/stores",
            "--platform",
            "Woosmap",
            "--brand",
            "Acme",
            "--brand-wikidata",
            "Q1",
            "--stdout",
            "--json",
        ])
        .unwrap();

        assert!(cli.json);
        let Commands::Generate {
            url,
            platform,
            brand_wikidata,
            stdout,
            ..
        } = cli.command
        else {
            panic!("expected generate");
        };
        assert_eq!(url, "https://www.acme.example/stores");
        assert_eq!(platform, Some(Platform::Woosmap));
        assert_eq!(brand_wikidata.as_deref(), Some("Q1"));
        assert!(stdout);
    }

    #[test]
    fn test_unknown_platform_rejected() {
        let result = Cli::try_parse_from([
            "spidergen",
            "generate",
            "https://acme.example",
            "--platform",
            "nowhere",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_detect_requires_urls() {
        assert!(Cli::try_parse_from(["spidergen", "detect"]).is_err());
    }
}
