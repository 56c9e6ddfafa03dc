use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use dialoguer::{Input, Select};

use crate::config::{self, Config, SpotifyConfig};
use crate::core::dispatcher::Dispatcher;
use crate::models::{ActionKind, LaunchMode, SongAction, SongRecord};
use crate::sources::billboard::BillboardClient;

#[derive(Parser)]
#[command(name = "topsongs", about = "Billboard Hot 100 with Spotify and YouTube links")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Run the GUI
    #[arg(long)]
    pub gui: bool,

    /// Where to open Spotify links when no player session is available
    #[arg(long, value_enum, global = true)]
    pub launcher: Option<LaunchMode>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the current chart
    Chart {
        /// Number of songs
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Open a chart entry on the chart website
    Open { rank: u32 },
    /// Play a song on the first available Spotify device
    Play { rank: u32 },
    /// Open a song's artist in Spotify
    Artist { rank: u32 },
    /// Open a song's music video on YouTube
    Video { rank: u32 },
    /// Start a Spotify player (app or website) for playback to target
    Player {
        #[arg(value_enum)]
        mode: LaunchMode,
    },
    /// Pick songs and actions interactively
    Browse {
        /// Number of songs
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Set Spotify credentials
    Config,
}

pub fn run(cli: Cli) -> Result<()> {
    let mut cfg = config::load_config();
    if let Some(mode) = cli.launcher {
        cfg.spotify.launcher = mode;
    }

    match cli.command {
        Some(Commands::Chart { limit }) => cmd_chart(&cfg, limit),
        Some(Commands::Open { rank }) => cmd_action(&cfg, ActionKind::OpenChart, rank),
        Some(Commands::Play { rank }) => cmd_action(&cfg, ActionKind::PlayTrack, rank),
        Some(Commands::Artist { rank }) => cmd_action(&cfg, ActionKind::OpenArtist, rank),
        Some(Commands::Video { rank }) => cmd_action(&cfg, ActionKind::OpenVideo, rank),
        Some(Commands::Player { mode }) => cmd_player(&cfg, mode),
        Some(Commands::Browse { limit }) => cmd_browse(&cfg, limit),
        Some(Commands::Config) => cmd_config(),
        None => {
            if cli.gui {
                #[cfg(feature = "gui")]
                {
                    crate::gui::launch(cfg)
                }
                #[cfg(not(feature = "gui"))]
                {
                    bail!("GUI support is not enabled. Rebuild with: cargo build --features gui");
                }
            } else {
                println!("Usage: topsongs <COMMAND> or topsongs --gui");
                println!("Run topsongs --help for more information.");
                Ok(())
            }
        }
    }
}

fn fetch_chart(cfg: &Config, limit: usize) -> Result<Vec<SongRecord>> {
    let client = BillboardClient::with_url(cfg.chart.url.clone())?;
    let songs = client.fetch(limit);
    if songs.is_empty() {
        bail!("could not load the chart from {}", client.url());
    }
    Ok(songs)
}

fn cmd_chart(cfg: &Config, limit: Option<usize>) -> Result<()> {
    let songs = fetch_chart(cfg, limit.unwrap_or(cfg.chart.limit))?;

    let mut table = Table::new();
    table.set_header(vec!["#", "Title", "Artist"]);
    for song in &songs {
        table.add_row(vec![
            Cell::new(song.rank),
            Cell::new(&song.title),
            Cell::new(&song.artist),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn cmd_action(cfg: &Config, kind: ActionKind, rank: u32) -> Result<()> {
    if rank == 0 {
        bail!("ranks start at 1");
    }
    let mut songs = fetch_chart(cfg, rank as usize)?;
    let index = songs
        .iter()
        .position(|s| s.rank == rank)
        .with_context(|| format!("#{} is not on the chart", rank))?;

    let dispatcher = Dispatcher::from_config(cfg)?;
    println!("{}", songs[index].summary());
    let outcome = dispatcher.dispatch(&mut songs, SongAction::new(kind, index))?;
    println!("{}", outcome);
    Ok(())
}

fn cmd_player(cfg: &Config, mode: LaunchMode) -> Result<()> {
    let dispatcher = Dispatcher::from_config(cfg)?;
    println!("{}", dispatcher.open_player(mode.surface())?);
    Ok(())
}

fn cmd_browse(cfg: &Config, limit: Option<usize>) -> Result<()> {
    let mut limit = limit.unwrap_or(cfg.chart.limit);
    let mut dispatcher = Dispatcher::from_config(cfg)?;
    let mut songs = fetch_chart(cfg, limit)?;

    loop {
        let mut items: Vec<String> = songs.iter().map(SongRecord::summary).collect();
        let refresh = items.len();
        items.push("Refresh chart".to_string());
        items.push(format!("Switch to {}", dispatcher.mode().toggled().label()));
        items.push("Quit".to_string());

        let selection = Select::new()
            .with_prompt(format!("Top {} ({})", songs.len(), dispatcher.mode().label()))
            .items(&items)
            .default(0)
            .interact()?;

        if selection == refresh {
            limit = Input::new()
                .with_prompt("Number of songs")
                .with_initial_text(limit.to_string())
                .validate_with(|n: &usize| if *n > 0 { Ok(()) } else { Err("must be at least 1") })
                .interact_text()?;
            // Every cached reference goes with the old list.
            songs = fetch_chart(cfg, limit)?;
            continue;
        }
        if selection == refresh + 1 {
            dispatcher.set_mode(dispatcher.mode().toggled());
            continue;
        }
        if selection > refresh + 1 {
            return Ok(());
        }

        let actions: Vec<&str> = ActionKind::ALL.iter().map(|k| k.label()).collect();
        let choice = Select::new()
            .with_prompt(format!("  {}", songs[selection].summary()))
            .items(&actions)
            .default(0)
            .interact()?;

        let action = SongAction::new(ActionKind::ALL[choice], selection);
        match dispatcher.dispatch(&mut songs, action) {
            Ok(outcome) => println!("  {}\n", outcome),
            Err(e) => println!("  {}\n", e),
        }
    }
}

fn cmd_config() -> Result<()> {
    let mut cfg = config::load_config_file();

    println!("Spotify API settings");
    println!("(Create an app at https://developer.spotify.com/dashboard)\n");

    let client_id: String = Input::new()
        .with_prompt("Client ID")
        .with_initial_text(cfg.spotify.client_id.clone().unwrap_or_default())
        .interact_text()?;

    let client_secret: String = Input::new()
        .with_prompt("Client Secret")
        .with_initial_text(cfg.spotify.client_secret.clone().unwrap_or_default())
        .interact_text()?;

    let access_token: String = Input::new()
        .with_prompt("User access token (optional, for playback)")
        .with_initial_text(cfg.spotify.access_token.clone().unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;

    let modes = [LaunchMode::App, LaunchMode::Website];
    let current = modes
        .iter()
        .position(|m| *m == cfg.spotify.launcher)
        .unwrap_or(0);
    let mode = Select::new()
        .with_prompt("Open Spotify links in")
        .items(&modes.iter().map(|m| m.label()).collect::<Vec<_>>())
        .default(current)
        .interact()?;

    cfg.spotify = SpotifyConfig {
        client_id: Some(client_id),
        client_secret: Some(client_secret),
        access_token: Some(access_token).filter(|t| !t.trim().is_empty()),
        launcher: modes[mode],
    };

    config::save_config(&cfg)?;
    println!("\nSettings saved.");
    Ok(())
}
