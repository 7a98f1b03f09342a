//! sdkgen CLI entrypoint
//! Parses command-line arguments and dispatches to the core generator.

// Internal imports (std, crate)
use std::path::{Path, PathBuf};

// External imports (alphabetized)
use anyhow::{bail, Context};
use clap::Parser;
use sdkgen_core::codegen::{generate, GenerateOptions, GeneratedSdk, Language};
use sdkgen_core::convert::fix_conversion;
use sdkgen_core::search::{criteria_from_names, search_all};
use sdkgen_core::{ApiModel, CodeGen, Config, SpecDocument};
use tokio::fs;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Placeholder in document paths replaced by each API version
const VERSION_PLACEHOLDER: &str = "{version}";

#[derive(Parser)]
#[command(name = "sdkgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Generate SDK source for every configured language and API version
    Generate {
        /// Config file (YAML, JSON or TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Path to the OpenAPI 3 document
        ///
        /// `{version}` is replaced by each API version
        /// Example: --spec-path specs/api-{version}.json
        #[arg(long)]
        spec_path: Option<String>,
        /// Path to the Swagger 2 document the OpenAPI one was converted from
        #[arg(long)]
        swagger_path: Option<String>,
        /// Output directory for generated code
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Target languages (python, typescript)
        #[arg(long = "language", value_delimiter = ',')]
        languages: Vec<String>,
        /// API versions to generate
        #[arg(long = "api-version", value_delimiter = ',')]
        api_versions: Vec<String>,
        /// Package name of the generated SDK
        #[arg(long)]
        package_name: Option<String>,
    },
    /// Search methods and types of an API document with a regular expression
    Search {
        /// Path to the OpenAPI 3 document
        spec_path: PathBuf,
        /// Case-insensitive regular expression
        pattern: String,
        /// What to search (method, type, name, description, argument,
        /// property, title, activityType, status, response). Default: all
        #[arg(long, value_delimiter = ',')]
        criteria: Vec<String>,
    },
    /// Replay Swagger 2 collection formats and body requiredness onto a converted OpenAPI 3 document
    Convert {
        /// Converted OpenAPI 3 document
        #[arg(long)]
        openapi: PathBuf,
        /// Original Swagger 2 document
        #[arg(long)]
        swagger: PathBuf,
        /// Where to write the fixed document (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Generate {
            config,
            spec_path,
            swagger_path,
            output_dir,
            languages,
            api_versions,
            package_name,
        } => {
            let mut config = match (config, spec_path.as_ref()) {
                (Some(path), _) => Config::from_file(&path)
                    .await
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                (None, Some(spec)) => Config::new(spec.clone(), "sdk"),
                (None, None) => bail!("either --config or --spec-path is required"),
            };
            if let Some(spec) = spec_path {
                config.spec_path = spec;
            }
            if swagger_path.is_some() {
                config.swagger_path = swagger_path;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir.to_string_lossy().to_string();
            }
            if !languages.is_empty() {
                config.languages = languages;
            }
            if !api_versions.is_empty() {
                config.api_versions = api_versions;
            }
            if let Some(name) = package_name {
                config.package_name = name;
            }
            run_generate(&config).await?;
        }
        Commands::Search {
            spec_path,
            pattern,
            criteria,
        } => {
            let criteria = if criteria.is_empty() {
                search_all()
            } else {
                criteria_from_names(&criteria).map_err(|e| anyhow::anyhow!(e))?
            };
            let doc = SpecDocument::from_file(&spec_path)
                .await
                .context("Failed to load API document")?;
            let mut model = ApiModel::load(doc);
            model.load_dynamic_types();

            let result = model.search(&pattern, &criteria);
            if result.is_error() {
                bail!(result.message);
            }
            for (tag, methods) in &result.tags {
                println!("{}", if tag.is_empty() { "(untagged)" } else { tag });
                for method in methods.values() {
                    println!(
                        "  {} {} {}",
                        method.operation_id, method.http_method, method.endpoint
                    );
                }
            }
            if !result.types.is_empty() {
                println!("types");
                for name in result.types.keys() {
                    println!("  {name}");
                }
            }
            println!(
                "{} methods, {} types",
                result.method_count(),
                result.types.len()
            );
        }
        Commands::Convert {
            openapi,
            swagger,
            output,
        } => {
            let mut doc = SpecDocument::from_file(&openapi)
                .await
                .context("Failed to load OpenAPI document")?;
            let swagger = SpecDocument::from_file(&swagger)
                .await
                .context("Failed to load Swagger document")?;
            let fixes = fix_conversion(&mut doc.json, swagger.as_json());
            for fix in &fixes {
                info!("{fix}");
            }
            let content = serde_json::to_string_pretty(doc.as_json())?;
            match output {
                Some(path) => {
                    fs::write(&path, content)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("{} fixes written to {}", fixes.len(), path.display());
                }
                None => println!("{content}"),
            }
        }
    }
    Ok(())
}

/// Generate every (API version, language) pair, continuing past failures
async fn run_generate(config: &Config) -> anyhow::Result<()> {
    // unknown languages stop the run before anything is generated
    let languages = config.languages()?;
    let versions: Vec<Option<&str>> = if config.api_versions.is_empty() {
        vec![None]
    } else {
        config.api_versions.iter().map(|v| Some(v.as_str())).collect()
    };

    let mut failures = Vec::new();
    for version in versions {
        let model = match load_model(config, version).await {
            Ok(model) => model,
            Err(e) => {
                error!("API {}: {e:#}", version.unwrap_or("default"));
                failures.push(format!("{}: {e:#}", version.unwrap_or("default")));
                continue;
            }
        };
        let version = match version {
            Some(v) => v.to_string(),
            None if !model.version().is_empty() => model.version().to_string(),
            None => "latest".to_string(),
        };

        for language in &languages {
            let backend = language.backend();
            // each pass gets its own model so derived types stay per backend
            let mut pass = model.clone();
            let options = GenerateOptions::new(version.as_str(), config.package_name.as_str());
            let outcome = match generate(&mut pass, backend.as_ref(), &options) {
                Ok(sdk) => write_sdk(config, *language, backend.as_ref(), &version, &sdk).await,
                Err(e) => Err(anyhow::Error::new(e)),
            };
            match outcome {
                Ok(dir) => println!("Generated {language} SDK {version} in {}", dir.display()),
                Err(e) => {
                    error!("{language} {version}: {e:#}");
                    failures.push(format!("{language} {version}: {e:#}"));
                }
            }
        }
    }

    if !failures.is_empty() {
        bail!(
            "{} generation pass(es) failed:\n{}",
            failures.len(),
            failures.join("\n")
        );
    }
    Ok(())
}

fn for_version(path: &str, version: Option<&str>) -> String {
    match version {
        Some(v) => path.replace(VERSION_PLACEHOLDER, v),
        None => path.to_string(),
    }
}

async fn load_model(config: &Config, version: Option<&str>) -> anyhow::Result<ApiModel> {
    let spec_path = for_version(&config.spec_path, version);
    let mut doc = SpecDocument::from_file(&spec_path)
        .await
        .with_context(|| format!("Failed to load API document {spec_path}"))?;

    if let Some(swagger_path) = &config.swagger_path {
        let swagger_path = for_version(swagger_path, version);
        let swagger = SpecDocument::from_file(&swagger_path)
            .await
            .with_context(|| format!("Failed to load Swagger document {swagger_path}"))?;
        let fixes = fix_conversion(&mut doc.json, swagger.as_json());
        info!("Applied {} conversion fixes from {swagger_path}", fixes.len());
    }

    let mut model = ApiModel::load(doc);
    model.retain_methods(&config.include_operations, &config.exclude_operations);
    for diagnostic in model.diagnostics() {
        warn!("{diagnostic}");
    }
    Ok(model)
}

async fn write_sdk(
    config: &Config,
    language: Language,
    backend: &dyn CodeGen,
    version: &str,
    sdk: &GeneratedSdk,
) -> anyhow::Result<PathBuf> {
    let dir = Path::new(&config.output_dir)
        .join(language.as_str())
        .join(version);
    fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let ext = backend.file_extension();
    let mut files = vec![("methods", &sdk.methods), ("models", &sdk.models)];
    if let Some(streams) = &sdk.streams {
        files.push(("streams", streams));
    }
    for (name, content) in files {
        let path = dir.join(format!("{name}.{ext}"));
        fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(dir)
}
