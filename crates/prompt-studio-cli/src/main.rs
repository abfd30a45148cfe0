//! Command-line prompt workbench powered by prompt-studio.
//!
//! Exposes the editor's operations as subcommands. Reads the API key from
//! the `GEMINI_API_KEY` environment variable; structured prompts travel as
//! JSON on stdin/stdout so commands can be piped into each other.
//!
//! # Examples
//!
//! ```sh
//! # Derive the structured form of a prompt
//! prompt-studio deconstruct "A satirical cartoon of a senator"
//!
//! # Compile a structured prompt (JSON on stdin) back to raw text
//! prompt-studio deconstruct "A cat on a mat" | prompt-studio compile
//!
//! # Analyze, vary, generate
//! prompt-studio analyze "A cat on a mat"
//! prompt-studio vary "A cat on a mat"
//! prompt-studio generate "A cat on a mat" --out cat.jpg
//!
//! # Manage saved favorites
//! prompt-studio saved list
//! prompt-studio saved add "A cat on a mat"
//! prompt-studio saved remove <id>
//! ```

use std::io::Read;
use std::path::PathBuf;

use base64::Engine;
use clap::{Parser, Subcommand};
use prompt_studio::prelude::*;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Command-line prompt workbench for image generation.
#[derive(Parser)]
#[command(name = "prompt-studio", version)]
struct Cli {
    /// Path of the favorites file.
    #[arg(long, default_value = ".prompt-studio/favorites.json", global = true)]
    favorites: PathBuf,

    /// Retries for transient API failures.
    #[arg(long, default_value_t = 2, global = true)]
    retries: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Infer the structured form of a raw prompt (JSON on stdout).
    Deconstruct {
        /// The raw prompt text.
        prompt: String,
    },

    /// Compile a structured prompt (JSON on stdin) to its raw form.
    Compile,

    /// Analyze a raw prompt into tags and rewrite candidates (JSON on stdout).
    Analyze {
        /// The raw prompt text.
        prompt: String,
    },

    /// Produce creative variations of a raw prompt (JSON on stdout).
    Vary {
        /// The raw prompt text.
        prompt: String,
    },

    /// Generate an image for a raw prompt.
    Generate {
        /// The raw prompt text.
        prompt: String,

        /// Where to write the image. Without this, the data URL is printed.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Manage saved favorite prompts.
    Saved {
        #[command(subcommand)]
        action: SavedAction,
    },
}

#[derive(Subcommand)]
enum SavedAction {
    /// List saved prompts, newest first.
    List,
    /// Save a raw prompt (its structured form is derived via the API).
    Add {
        /// The raw prompt text.
        prompt: String,
    },
    /// Remove a saved prompt by id.
    Remove {
        /// The id shown by `saved list`.
        id: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    // `compile` and `saved list`/`saved remove` are offline; everything
    // else needs a client.
    match cli.command {
        Command::Compile => {
            let prompt = read_structured_stdin()?;
            println!("{}", compile(&prompt));
            Ok(())
        }
        Command::Saved {
            action: SavedAction::List,
        } => {
            let store = FavoritesStore::new(&cli.favorites)?;
            for item in store.items() {
                println!("{}\t{}\t{}", item.id, item.name, item.raw_prompt);
            }
            Ok(())
        }
        Command::Saved {
            action: SavedAction::Remove { id },
        } => {
            let mut store = FavoritesStore::new(&cli.favorites)?;
            if store.remove(&id)? {
                println!("Removed {id}");
            } else {
                println!("No saved prompt with id {id}");
            }
            Ok(())
        }
        Command::Deconstruct { prompt } => {
            let client = make_client(cli.retries)?;
            let structured = client.deconstruct_prompt(&prompt).await?;
            print_json(&structured)
        }
        Command::Analyze { prompt } => {
            let client = make_client(cli.retries)?;
            let report = client.analyze_prompt(&prompt).await?;
            print_json(&report)
        }
        Command::Vary { prompt } => {
            let client = make_client(cli.retries)?;
            let variations = client.variation_prompts(&prompt).await?;
            print_json(&variations)
        }
        Command::Generate { prompt, out } => {
            let client = make_client(cli.retries)?;
            let favorites = FavoritesStore::new(&cli.favorites)?;
            let mut session = Session::new(client, favorites, prompt);
            session.generate().await;

            if let Some(notice) = session.notice() {
                return Err(notice.to_string());
            }
            let item = session
                .generations()
                .first()
                .ok_or_else(|| "No image in generation history".to_string())?;

            match out {
                Some(path) => {
                    write_data_url(&item.image_url, &path)?;
                    println!("Wrote {}", path.display());
                }
                None => println!("{}", item.image_url),
            }
            Ok(())
        }
        Command::Saved {
            action: SavedAction::Add { prompt },
        } => {
            let client = make_client(cli.retries)?;
            let mut store = FavoritesStore::new(&cli.favorites)?;
            let trimmed = prompt.trim().to_string();
            if trimmed.is_empty() {
                return Err("Cannot save an empty prompt.".to_string());
            }
            if store.contains_raw(&trimmed) {
                return Err("This prompt is already saved.".to_string());
            }
            let structured = client.deconstruct_prompt(&trimmed).await?;
            let name = SavedPromptItem::derived_name(&trimmed);
            let item = SavedPromptItem::new(name, trimmed, structured);
            let id = item.id.clone();
            store.add(item)?;
            println!("Saved {id}");
            Ok(())
        }
    }
}

fn make_client(retries: u32) -> Result<GeminiClient, String> {
    let api_key = std::env::var("GEMINI_API_KEY")
        .map_err(|_| "GEMINI_API_KEY environment variable is not set".to_string())?;
    Ok(GeminiClient::new(api_key)?.with_retries(retries))
}

fn read_structured_stdin() -> Result<StructuredPrompt, String> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| format!("Failed to read stdin: {e}"))?;
    serde_json::from_str(&input).map_err(|e| format!("Invalid structured prompt JSON: {e}"))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize output: {e}"))?;
    println!("{json}");
    Ok(())
}

/// Decode a `data:<mime>;base64,<payload>` URL and write the bytes to disk.
fn write_data_url(data_url: &str, path: &PathBuf) -> Result<(), String> {
    let payload = data_url
        .split_once(";base64,")
        .map(|(_, p)| p)
        .ok_or_else(|| "Image is not a base64 data URL".to_string())?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| format!("Failed to decode image data: {e}"))?;
    std::fs::write(path, bytes).map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
    Ok(())
}
