use std::path::PathBuf;

use clap::{
    ArgAction, CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use cloudmeta::{cli, config, error};

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
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Look up artist metadata
    Artist(ArtistOptions),

    /// Look up album metadata
    Album(AlbumOptions),

    /// Look up track metadata
    Track(TrackOptions),

    #[clap(about = "Fetch synced lyrics for a track")]
    Lyrics(LyricsOptions),

    /// Maintain the response cache
    Cache(CacheOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct ArtistOptions {
    /// Artist name as stored in the library
    pub name: String,

    /// MusicBrainz id already known for the artist
    #[clap(long)]
    pub mbid: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct AlbumOptions {
    /// Album name
    pub name: String,

    /// Album version, e.g. "Deluxe Edition"
    #[clap(long)]
    pub version: Option<String>,

    /// Album artist; can be repeated
    #[clap(long = "artist", action = ArgAction::Append, num_args = 1)]
    pub artists: Vec<String>,

    /// MusicBrainz release group id already known for the album
    #[clap(long)]
    pub release_group: Option<String>,

    /// Album track with its local file (TITLE=PATH); can be repeated
    #[clap(
        long = "track",
        value_parser = cli::parse_track_file,
        action = ArgAction::Append,
        num_args = 1
    )]
    pub tracks: Vec<(String, PathBuf)>,

    /// Write tags into the track files regardless of configuration
    #[clap(long)]
    pub write_tags: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct TrackOptions {
    /// Track title
    pub name: String,

    /// Track version, e.g. "Live"
    #[clap(long)]
    pub version: Option<String>,

    /// Track artist; can be repeated
    #[clap(long = "artist", action = ArgAction::Append, num_args = 1)]
    pub artists: Vec<String>,

    /// Album the track belongs to
    #[clap(long)]
    pub album: Option<String>,

    /// MusicBrainz recording id
    #[clap(long)]
    pub mbid: Option<String>,

    /// Local audio file of the track
    #[clap(long)]
    pub file: Option<PathBuf>,

    /// Write tags into the file regardless of configuration
    #[clap(long)]
    pub write_tags: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct LyricsOptions {
    /// Track title
    pub name: String,

    /// Track artist
    #[clap(long)]
    pub artist: String,
}

#[derive(Parser, Debug, Clone)]
pub struct CacheOptions {
    #[command(subcommand)]
    pub command: CacheSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CacheSubcommand {
    /// Remove every cached response
    Clear,
    /// Remove only expired responses
    Purge,
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

    match cli.command {
        Command::Artist(opt) => cli::artist(opt.name, opt.mbid).await,
        Command::Album(opt) => {
            cli::album(cli::AlbumArgs {
                name: opt.name,
                version: opt.version,
                artists: opt.artists,
                release_group: opt.release_group,
                tracks: opt.tracks,
                write_tags: opt.write_tags,
            })
            .await
        }
        Command::Track(opt) => {
            cli::track(cli::TrackArgs {
                name: opt.name,
                version: opt.version,
                artists: opt.artists,
                album: opt.album,
                mbid: opt.mbid,
                file: opt.file,
                write_tags: opt.write_tags,
            })
            .await
        }
        Command::Lyrics(opt) => cli::lyrics(opt.name, opt.artist).await,
        Command::Cache(opt) => match opt.command {
            CacheSubcommand::Clear => cli::clear_cache().await,
            CacheSubcommand::Purge => cli::purge_cache().await,
        },
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
