use danmerge::cli::{Cli, Commands, ConfigAction};
use danmerge::comment::parse_comments;
use danmerge::config::CombineConfig;
use danmerge::error::{DanmergeError, Result};
use danmerge::pipeline;
use danmerge::rules::RuleCache;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "danmerge.toml";

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Combine {
            input,
            output,
            pretty,
        } => {
            cmd_combine(cli.config, &input, output, pretty)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose {
        "danmerge=debug"
    } else {
        "danmerge=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Keep stdout clean for JSON output
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_combine(
    config_path: Option<PathBuf>,
    input: &Path,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<()> {
    let config = load_config(config_path)?;

    let content = std::fs::read_to_string(input).map_err(|e| DanmergeError::Io {
        source: e,
        context: format!("Failed to read input file: {:?}", input),
    })?;
    let comments = parse_comments(&content)?;

    tracing::info!(comments = comments.len(), "starting combine run");

    let cache = RuleCache::new();
    let result = pipeline::combine(&comments, &config, &cache);

    tracing::info!(
        representatives = result.representatives.len(),
        merged_identical = result.stats.merged_identical,
        merged_edit_distance = result.stats.merged_edit_distance,
        merged_pinyin = result.stats.merged_pinyin,
        merged_cosine = result.stats.merged_cosine,
        "combine run finished"
    );

    let json = if pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    }
    .map_err(|e| DanmergeError::Json {
        source: e,
        context: "Failed to serialize combine output".to_string(),
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, json).map_err(|e| DanmergeError::Io {
                source: e,
                context: format!("Failed to write output file: {:?}", path),
            })?;
            tracing::info!(path = ?path, "output written");
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
        }
        ConfigAction::Validate { file } => {
            let path =
                file.or(config_path).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
            let config = CombineConfig::load(&path)?;
            println!("✓ Configuration is valid");
            if !config.combine.enable_combine {
                println!("  Note: combining is disabled (enable_combine = false)");
            }
        }
        ConfigAction::Init { path, force } => {
            let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| DanmergeError::Io {
                        source: e,
                        context: format!("Failed to create config directory: {:?}", parent),
                    })?;
                }
            }

            let config = CombineConfig::default();
            config.save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<CombineConfig> {
    match config_path {
        Some(path) => CombineConfig::load(&path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                CombineConfig::load(default)
            } else {
                tracing::debug!("no config file found, using defaults");
                Ok(CombineConfig::default())
            }
        }
    }
}
