// ABOUTME: Command-line shell around the snaptest library.
// ABOUTME: Drives batch runs, related generation, hallucination checks, and settings.

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use snaptest::batch::log::{LogLevel, LogLine};
use snaptest::batch::{self, BatchKind, BatchOptions};
use snaptest::chat::ChatClient;
use snaptest::constants;
use snaptest::detail::Detail;
use snaptest::hallucination;
use snaptest::media;
use snaptest::related;
use snaptest::settings::SettingsStore;
use snaptest::settings::model::{ModelProvider, catalog};

#[derive(Parser)]
#[command(name = "snaptest", version, about = constants::DESCRIPTION)]
struct Cli {
    /// Settings file to use instead of the per-user default.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate content descriptions for screenshots in a folder.
    Content {
        folder: PathBuf,
        /// Process only these file names; omit to scan the whole folder.
        #[arg(long)]
        images: Vec<String>,
        #[arg(long, default_value = ".")]
        log_dir: PathBuf,
    },
    /// Generate test code for screenshots in a folder.
    Code {
        folder: PathBuf,
        #[arg(long)]
        images: Vec<String>,
        #[arg(long, default_value = ".")]
        log_dir: PathBuf,
        /// Skip uploading annotated source files with the prompt.
        #[arg(long)]
        no_upload_code: bool,
    },
    /// Generate one shared description across related screenshots (2-5 images).
    RelatedContent { images: Vec<PathBuf> },
    /// Generate one shared set of test code across related screenshots (2-5 images).
    RelatedCode { images: Vec<PathBuf> },
    /// Flag hallucinated test code for one screenshot.
    Hallucinate { image: PathBuf },
    /// Show image metadata and sidecar annotations.
    Inspect { image: PathBuf },
    /// Read or update model settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the active configuration (keys are never shown).
    Show,
    /// List the vision-capable models per provider.
    Models,
    SetProvider { provider: String },
    SetKey { provider: String, key: String },
    SetHost { provider: String, host: String },
    SetModel { provider: String, model: String },
    SetTemperature { temperature: f64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let store = match cli.settings.clone() {
        Some(path) => SettingsStore::open(path),
        None => SettingsStore::open_default(),
    };

    match cli.command {
        Command::Content {
            folder,
            images,
            log_dir,
        } => run_batch(&store, BatchKind::Content, folder, images, log_dir, true).await,
        Command::Code {
            folder,
            images,
            log_dir,
            no_upload_code,
        } => {
            run_batch(
                &store,
                BatchKind::Code,
                folder,
                images,
                log_dir,
                !no_upload_code,
            )
            .await
        }
        Command::RelatedContent { images } => {
            run_related(&store, BatchKind::Content, images).await
        }
        Command::RelatedCode { images } => run_related(&store, BatchKind::Code, images).await,
        Command::Hallucinate { image } => run_hallucinate(&store, image).await,
        Command::Inspect { image } => run_inspect(&image),
        Command::Config { action } => run_config(&store, action),
    }
}

async fn run_batch(
    store: &SettingsStore,
    kind: BatchKind,
    folder: PathBuf,
    images: Vec<String>,
    log_dir: PathBuf,
    upload_code: bool,
) -> Result<()> {
    let client = Arc::new(ChatClient::from_store(store));
    let mut options = BatchOptions::new(kind, folder);
    options.selection = if images.is_empty() { None } else { Some(images) };
    options.system_prompt = match kind {
        BatchKind::Content => store.content_prompt(),
        BatchKind::Code => store.code_prompt(),
    };
    options.upload_code = upload_code && store.upload_code_enabled();
    options.log_dir = log_dir;

    let mut handle = batch::start_batch(client, options)?;

    let printer = handle.console().map(|mut console| {
        tokio::spawn(async move {
            while let Some(line) = console.recv().await {
                print_line(&line);
            }
        })
    });

    let aborter = handle.aborter();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            aborter.abort();
        }
    });

    let summary = handle.wait().await;
    interrupt.abort();
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    println!(
        "Succeed: {}\nFailed: {}\nCanceled: {}",
        summary.counts.finished, summary.counts.failed, summary.counts.canceled
    );
    println!("Task log file is saved to {}", summary.log_path.display());
    Ok(())
}

async fn run_related(store: &SettingsStore, kind: BatchKind, images: Vec<PathBuf>) -> Result<()> {
    let client = ChatClient::from_store(store);
    let prompt = match kind {
        BatchKind::Content => store.content_prompt(),
        BatchKind::Code => store.code_prompt(),
    };
    let context = images
        .first()
        .map(|image| Detail::load_or_default(&Detail::sidecar_path(image)).context_text())
        .unwrap_or_default();
    let context = (!context.is_empty()).then_some(context.as_str());

    let response = related::generate(&client, kind, &prompt, &images, context).await?;
    println!("{}", response);
    println!("Updated {} sidecar files.", images.len());
    Ok(())
}

async fn run_hallucinate(store: &SettingsStore, image: PathBuf) -> Result<()> {
    let client = ChatClient::from_store(store);
    let flags =
        hallucination::detect(&client, &image, constants::PROMPT_HALLUCINATION).await?;
    if flags.is_empty() {
        println!("No code blocks to check.");
        return Ok(());
    }

    let detail = Detail::load_or_default(&Detail::sidecar_path(&image));
    for (index, flagged) in flags.iter().enumerate() {
        let language = detail
            .code
            .get(index)
            .map(|block| block.language.as_str())
            .unwrap_or("unknown");
        let verdict = if *flagged {
            "hallucination suspected"
        } else {
            "looks grounded"
        };
        println!("block {} ({}): {}", index, language, verdict);
    }
    Ok(())
}

fn run_inspect(image: &PathBuf) -> Result<()> {
    let info = media::analyze_image_file(image);
    println!("{}", serde_json::to_string_pretty(&info)?);

    let sidecar = Detail::sidecar_path(image);
    if sidecar.is_file() {
        let detail = Detail::load_or_default(&sidecar);
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        println!("No sidecar annotations at {}", sidecar.display());
    }
    Ok(())
}

fn run_config(store: &SettingsStore, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let settings = store.read_model_settings();
            println!("settings file: {}", store.path().display());
            println!("provider: {}", settings.provider);
            println!("temperature: {}", settings.temperature);
            let providers = [
                ("OpenAI", &settings.openai),
                ("Claude", &settings.claude),
                ("SiliconFlow", &settings.siliconflow),
            ];
            for (name, config) in providers {
                let host = if config.api_host.is_empty() {
                    "(default)"
                } else {
                    config.api_host.as_str()
                };
                let key = if config.api_key.is_empty() { "not set" } else { "set" };
                println!("{}: model={} host={} key={}", name, config.model, host, key);
            }
        }
        ConfigAction::Models => {
            println!("OpenAI: {}", catalog::OPENAI.join(", "));
            println!("Claude: {}", catalog::CLAUDE.join(", "));
            println!("SiliconFlow: {}", catalog::SILICONFLOW.join(", "));
        }
        ConfigAction::SetProvider { provider } => {
            let provider = parse_provider(&provider)?;
            let mut settings = store.read_model_settings();
            settings.provider = provider;
            store.write_model_settings(&settings)?;
            println!("provider set to {}", provider);
        }
        ConfigAction::SetKey { provider, key } => {
            let provider = parse_provider(&provider)?;
            store.set_provider_credentials(provider, Some(&key), None, None)?;
            println!("{} api key stored (encrypted)", provider);
        }
        ConfigAction::SetHost { provider, host } => {
            let provider = parse_provider(&provider)?;
            store.set_provider_credentials(provider, None, Some(&host), None)?;
            println!("{} api host set to {}", provider, host);
        }
        ConfigAction::SetModel { provider, model } => {
            let provider = parse_provider(&provider)?;
            store.set_provider_credentials(provider, None, None, Some(&model))?;
            println!("{} model set to {}", provider, model);
        }
        ConfigAction::SetTemperature { temperature } => {
            let mut settings = store.read_model_settings();
            settings.temperature = temperature;
            store.write_model_settings(&settings)?;
            println!(
                "temperature set to {}",
                store.read_model_settings().temperature
            );
        }
    }
    Ok(())
}

fn parse_provider(name: &str) -> Result<ModelProvider> {
    name.parse::<ModelProvider>().map_err(|err| anyhow!(err))
}

fn print_line(line: &LogLine) {
    let color = match line.level {
        LogLevel::Trace => "\x1b[90m",
        LogLevel::Info => "",
        LogLevel::Success => "\x1b[32m",
        LogLevel::Warning => "\x1b[33m",
        LogLevel::Error => "\x1b[31m",
    };
    if color.is_empty() {
        println!("{}", line.message);
    } else {
        println!("{}{}\x1b[0m", color, line.message);
    }
}
