use std::path::PathBuf;
use std::time::Duration;
use tunelist::config;
use tunelist::core::PlaylistCore;
use tunelist::model::{PersistedState, PlaybackMode};

const LOAD_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Default)]
struct CliArgs {
    mode: Option<PlaybackMode>,
    forget: bool,
    seed: Option<u64>,
    folders: Vec<PathBuf>,
    save: Option<PathBuf>,
    playlist: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = parse_args(std::env::args().skip(1).collect())?;

    let state = initial_state(&args, config::load_state()?);
    let mut core = match args.seed {
        Some(seed) => PlaylistCore::seeded(state, seed),
        None => PlaylistCore::from_persisted(state),
    };

    match &args.playlist {
        Some(path) => core.load_extern(path),
        None if args.folders.is_empty() => core.load_autosave()?,
        None => {}
    }
    for folder in &args.folders {
        core.load_folder(folder);
    }
    if !core.wait_for_loader(LOAD_TIMEOUT) {
        anyhow::bail!("timed out while loading tracks");
    }
    if core.status.starts_with("Load failed") {
        anyhow::bail!("{}", core.status);
    }

    let mut position = 0;
    while let Some(track) = core.goto_next() {
        position += 1;
        match &track.artist {
            Some(artist) => println!("{position:>4}  {artist} - {}", track.title),
            None => println!("{position:>4}  {}", track.title),
        }
    }

    let total = core.total_duration_seconds();
    println!(
        "{} tracks, {}:{:02}:{:02} ({} order)",
        core.collection().len(),
        total / 3600,
        (total / 60) % 60,
        total % 60,
        core.mode().label()
    );

    if let Some(path) = &args.save {
        core.save_playlist(path)?;
    }
    if !args.forget {
        core.exit()?;
    }
    Ok(())
}

/// Persisted options with the command line's overrides applied.
fn initial_state(args: &CliArgs, persisted: PersistedState) -> PersistedState {
    PersistedState {
        playback_mode: args.mode.unwrap_or(persisted.playback_mode),
        ..persisted
    }
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--shuffle" => out.mode = Some(PlaybackMode::Shuffle),
            "--sequential" => out.mode = Some(PlaybackMode::Sequential),
            "--forget" => out.forget = true,
            "--seed" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--seed requires a number");
                };
                out.seed = Some(
                    value
                        .trim()
                        .parse()
                        .map_err(|_| anyhow::anyhow!("--seed expects an unsigned integer, got {value}"))?,
                );
            }
            "--folder" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--folder requires a directory");
                };
                out.folders.push(PathBuf::from(value));
            }
            "--save" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--save requires a file path");
                };
                out.save = Some(PathBuf::from(value));
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other if other.starts_with('-') => anyhow::bail!("unknown argument {other}"),
            other => {
                if out.playlist.is_some() {
                    anyhow::bail!("only one playlist file may be given");
                }
                out.playlist = Some(PathBuf::from(other));
            }
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("tunelist [OPTIONS] [PLAYLIST]");
    println!("  --shuffle         Print tracks in shuffle order");
    println!("  --sequential      Print tracks in playlist order");
    println!("  --forget          Do not autosave the playlist and options on exit");
    println!("  --seed N          Fixed seed for shuffle weights");
    println!("  --folder DIR      Add audio files below DIR (repeatable)");
    println!("  --save FILE       Write the playlist in sequential order");
    println!("Without PLAYLIST or --folder the autosaved playlist is used.");
    println!("Without --shuffle or --sequential the saved order mode is used.");
}
