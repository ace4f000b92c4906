//! gpt-session CLI entry point

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use anyhow::Result;

use gpt_session::{config, ui, ChatClient};

#[derive(Parser)]
#[command(name = "gpt-session")]
#[command(about = "Ask questions through a browser-authenticated chat session")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// The question to ask
        #[arg(required = true)]
        question: Vec<String>,
    },

    /// Ask questions interactively in one thread
    Chat,

    /// Enter session credentials and verify them
    Login {
        /// Ignore stored credentials and prompt for new ones
        #[arg(long)]
        clean: bool,
    },

    /// Remove stored credentials
    Logout,

    /// Show configuration status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Setup Global Ctrl+C handler
    let exit_flag = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let r = exit_flag.clone();

    ctrlc::set_handler(move || {
        if r.load(std::sync::atomic::Ordering::SeqCst) {
            println!("\n👋 Bye!");
            std::process::exit(0);
        } else {
            println!("\n⚠️  Press Ctrl+C again to exit");
            r.store(true, std::sync::atomic::Ordering::SeqCst);

            // Reset flag after 3 seconds
            let r2 = r.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_secs(3));
                r2.store(false, std::sync::atomic::Ordering::SeqCst);
            });
        }
    }).ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ask { question } => {
            let (client, config) = login(false).await?;
            let question = question.join(" ");
            let mut repl = gpt_session::repl::Repl::new(client, config.answer_timeout());
            match repl.run_once(&question).await {
                Ok(answer) => println!("{}", answer),
                Err(e) => {
                    if let Some(details) = e.details() {
                        eprintln!("{}", details);
                    }
                    return Err(e.into());
                }
            }
        }

        Commands::Chat => {
            let (client, config) = login(false).await?;
            ui::print_header(&config.model, &config.base_url);
            println!("Interactive mode (type 'exit' to quit)");
            let mut repl = gpt_session::repl::Repl::new(client, config.answer_timeout());
            repl.run_interactive().await?;
        }

        Commands::Login { clean } => {
            login(clean).await?;
            ui::print_success("Authenticated.");
            println!("  Credentials saved to {:?}", config::config_path());
        }

        Commands::Logout => {
            config::reset()?;
        }

        Commands::Status => {
            let config = config::load()?;
            println!("Config: {:?}", config::config_path());
            println!("Base URL: {}", config.base_url);
            println!("Model: {}", config.model);
            println!(
                "Credentials: {}",
                if config.has_credentials() { "✓" } else { "not set (run 'gpt-session login')" }
            );
        }
    }

    Ok(())
}

/// Prompt until the credentials yield an access token
///
/// Returns the authenticated client together with the saved config.
async fn login(clean: bool) -> Result<(ChatClient, config::Config)> {
    let mut config = config::ensure_credentials(clean)?;

    loop {
        let client = ChatClient::from_config(&config)?;
        match client.ensure_auth().await {
            Ok(()) => {
                config::save(&config)?;
                return Ok((client, config));
            }
            Err(e) if e.is_unauthorized() => {
                ui::print_warning("The provider rejected those credentials. Please enter them again.");
                config.credentials = config::prompt_credentials(&config.credentials.without_secrets())?;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
