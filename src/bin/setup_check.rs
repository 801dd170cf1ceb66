use anyhow::Result;
use study_buddy::config::Config;
use study_buddy::generate::create_generator;
use study_buddy::storage::CardStore;

const ENV_TEMPLATE: &str = "\
# OpenAI API Configuration
# Get your API key from: https://platform.openai.com/
OPENAI_API_KEY=your_openai_api_key_here
OPENAI_MODEL=gpt-3.5-turbo

# Server Configuration (optional)
STUDY_HTTP_BIND=127.0.0.1:5000
STUDY_DB_PATH=study_buddy.db
STUDY_REQUIRE_AUTH=false
";

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    println!("study-buddy setup check");
    println!("=======================");

    let config = Config::load()?;
    println!(
        "Config loaded: bind {} database '{}'",
        config.server.bind, config.server.database_path
    );

    match config.openai_key() {
        Some(_) => println!("OpenAI API key configured, model '{}'", config.openai.model),
        None => {
            println!("OpenAI API key not configured, generation runs in demo mode");
            println!("  1. Get an API key from https://platform.openai.com/");
            println!("  2. Put OPENAI_API_KEY=your_key_here in .env");
        }
    }

    let store = if config.server.database_path == ":memory:" {
        CardStore::open_in_memory()?
    } else {
        CardStore::open(&config.server.database_path)?
    };
    let counts = store.counts().await?;
    println!(
        "Database reachable: {} flashcards, {} sessions, {} users",
        counts.flashcards, counts.sessions, counts.users
    );

    let generator = create_generator(&config)?;
    println!("Card generator: {}", generator.name());

    if std::path::Path::new(".env").exists() {
        println!(".env file already exists");
    } else {
        std::fs::write(".env", ENV_TEMPLATE)?;
        println!(".env template created, edit it with your actual credentials");
    }

    println!();
    println!("Run the server with: study-buddy serve");

    Ok(())
}
