use clap::error::ErrorKind;
use clap::Parser;
use log::{error, info};
use server::config::{ServerConfig, WordOrder, DEFAULT_BACKLOG};
use server::dictionary::Dictionary;
use server::network::Server;
use shared::{DEFAULT_PORT, MAX_BUF, MAX_GUESSES, MAX_NAME};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Word list, one word per line
    dictionary: PathBuf,

    /// Address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Listen backlog
    #[arg(long, default_value_t = DEFAULT_BACKLOG)]
    backlog: u32,

    /// Guesses per round
    #[arg(short = 'g', long, default_value_t = MAX_GUESSES)]
    max_guesses: u32,

    /// Longest accepted name line in bytes, terminator included
    #[arg(long, default_value_t = MAX_NAME)]
    name_capacity: usize,

    /// Longest accepted guess line in bytes, terminator included
    #[arg(long, default_value_t = MAX_BUF)]
    line_capacity: usize,

    /// How each round's word is chosen
    #[arg(long, value_enum, default_value_t = WordOrder::Random)]
    word_order: WordOrder,
}

/// Help and version output exit with 0; any other parse failure is a usage error
fn is_usage_error(kind: ErrorKind) -> bool {
    !matches!(kind, ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
}

impl Args {
    fn config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            backlog: self.backlog,
            name_capacity: self.name_capacity,
            line_capacity: self.line_capacity,
            max_guesses: self.max_guesses,
            word_order: self.word_order,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if !is_usage_error(e.kind()) => e.exit(),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let size = Dictionary::file_length(&args.dictionary)?;
    info!("Dictionary {} is {} bytes", args.dictionary.display(), size);
    let config = args.config();
    let dictionary = Dictionary::load(&args.dictionary, config.word_order)?;

    let mut server = Server::new(config, dictionary).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
