use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use study_buddy::GenerateRequest;
use study_buddy::client::{FlashcardUi, HttpApi, UiSurface};
use study_buddy::config::Config;
use study_buddy::generate::create_generator;
use study_buddy::http::{AppState, serve};
use study_buddy::storage::CardStore;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)] // Read from `Cargo.toml`
#[command(arg_required_else_help = true, disable_help_subcommand = true)]
struct Args {
    /// Base URL of a running study-buddy server
    #[arg(short, long, value_name = "URL", global = true, default_value = "http://127.0.0.1:5000")]
    server: String,

    /// Verbosity level (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Listen address, overriding the configured one
        #[arg(long, value_name = "ADDR")]
        bind: Option<std::net::SocketAddr>,
    },

    /// Generate flashcards from notes in a file (or stdin)
    Generate {
        /// Path to a plain-text notes file; reads stdin when omitted
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Subject label stored with the generated cards
        #[arg(long, value_name = "SUBJECT")]
        subject: Option<String>,

        /// How many cards to ask for
        #[arg(long, value_name = "N")]
        num_cards: Option<usize>,
    },

    /// List flashcards stored on the server
    Cards {
        /// Session token from `POST /auth/login`
        #[arg(long, value_name = "TOKEN")]
        token: Option<String>,
    },

    /// Export stored flashcards
    Export {
        /// Export format (json or pdf)
        #[arg(value_name = "FORMAT", default_value = "json")]
        format: String,
    },
}

/// Terminal rendition of the flashcard page: status messages go to
/// stderr so piped card output stays clean.
struct ConsoleSurface;

impl UiSurface for ConsoleSurface {
    fn set_status(&mut self, status: &str) {
        eprintln!("{status}");
    }

    fn clear_cards(&mut self) {}

    fn append_card(&mut self, text: &str) {
        println!("{text}\n");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging based on verbosity
    let filter = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("study_buddy={}", filter).parse()?),
        )
        .with_ansi(false)
        .init();

    match args.command {
        Command::Serve { bind } => {
            let mut config = Config::load()?;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            let store = if config.server.database_path == ":memory:" {
                CardStore::open_in_memory()?
            } else {
                CardStore::open(&config.server.database_path)?
            };
            let generator = create_generator(&config)?;
            let state = AppState {
                config: Arc::new(config),
                store,
                generator,
            };
            serve(state).await?;
        }
        Command::Generate {
            file,
            subject,
            num_cards,
        } => {
            let notes = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read notes from {}", path.display()))?,
                None => std::io::read_to_string(std::io::stdin())
                    .context("failed to read notes from stdin")?,
            };
            let request = GenerateRequest {
                notes,
                subject,
                num_cards,
            };
            let ui = FlashcardUi::new(HttpApi::new(&args.server)?);
            ui.generate_with(request, &mut ConsoleSurface).await;
        }
        Command::Cards { token } => {
            let api = HttpApi::new(&args.server)?;
            let listing = api.list_cards(token.as_deref()).await?;
            if listing.flashcards.is_empty() {
                println!("No flashcards stored yet.");
            } else {
                for card in &listing.flashcards {
                    println!("[{}] {}", card.subject, card.question);
                    println!("    {}\n", card.answer);
                }
            }
        }
        Command::Export { format } => {
            let api = HttpApi::new(&args.server)?;
            let exported = api.export(&format).await?;
            println!("{}", serde_json::to_string_pretty(&exported)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_is_an_error() {
        assert!(Args::try_parse_from(["study-buddy"]).is_err());
    }

    #[test]
    fn verbosity_flags_accumulate() {
        let args = Args::try_parse_from(["study-buddy", "-vv", "serve"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert!(matches!(args.command, Command::Serve { bind: None }));
    }

    #[test]
    fn serve_accepts_a_bind_override() {
        let args =
            Args::try_parse_from(["study-buddy", "serve", "--bind", "0.0.0.0:8080"]).unwrap();
        match args.command {
            Command::Serve { bind } => {
                assert_eq!(bind, Some("0.0.0.0:8080".parse().unwrap()));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn the_server_url_has_a_default() {
        let args = Args::try_parse_from(["study-buddy", "cards"]).unwrap();
        assert_eq!(args.server, "http://127.0.0.1:5000");
        assert_eq!(args.verbose, 0);
        assert!(matches!(args.command, Command::Cards { token: None }));
    }

    #[test]
    fn generate_takes_file_subject_and_count() {
        let args = Args::try_parse_from([
            "study-buddy",
            "--server",
            "http://localhost:9000",
            "generate",
            "notes.txt",
            "--subject",
            "Biology",
            "--num-cards",
            "4",
        ])
        .unwrap();
        assert_eq!(args.server, "http://localhost:9000");
        match args.command {
            Command::Generate {
                file,
                subject,
                num_cards,
            } => {
                assert_eq!(file, Some(PathBuf::from("notes.txt")));
                assert_eq!(subject.as_deref(), Some("Biology"));
                assert_eq!(num_cards, Some(4));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn export_defaults_to_json() {
        let args = Args::try_parse_from(["study-buddy", "export"]).unwrap();
        match args.command {
            Command::Export { format } => assert_eq!(format, "json"),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
