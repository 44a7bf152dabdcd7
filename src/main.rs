use std::path::PathBuf;

use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use setlist::{cli, config, error};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with Spotify API
    Auth,

    /// Create or refresh a playlist from a song list
    Sync(SyncArgs),

    /// Export playlists to text files
    Export(ExportArgs),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct SyncArgs {
    /// Song list: a `.json` playlist request or one `Artist - Title` per line
    #[clap(long, short)]
    pub file: PathBuf,

    /// Playlist name (defaults to the JSON name or the file name)
    #[clap(long, short)]
    pub name: Option<String>,

    /// Playlist description
    #[clap(long, short)]
    pub description: Option<String>,

    /// Always create a new playlist instead of refreshing one with the same name
    #[clap(long)]
    pub create: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ExportArgs {
    /// Output directory for the exported files
    #[clap(long, short)]
    pub dir: PathBuf,

    /// Export only the playlist with this exact name
    #[clap(long, short)]
    pub playlist: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    if let Command::Completions(opt) = &cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(opt.shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    let config = match config::Config::from_env() {
        Ok(config) => config,
        Err(e) => error!("Invalid configuration: {}", e),
    };

    let result = match cli.command {
        Command::Auth => cli::auth(&config).await,
        Command::Sync(args) => {
            cli::sync(
                &config,
                cli::SyncOptions {
                    file: &args.file,
                    name: args.name,
                    description: args.description,
                    force_create: args.create,
                },
            )
            .await
        }
        Command::Export(args) => cli::export(&config, &args.dir, args.playlist).await,
        Command::Completions(_) => Ok(()),
    };

    if let Err(e) = result {
        error!("{}", e);
    }
}
