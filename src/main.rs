use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use phork::engine::{Output, OutputBlock};
use phork::world::validate_world;
use phork::{EngineConfig, GameState, fallback_world, load_world_from_file};

/// Play a Phork text adventure.
#[derive(Parser, Debug)]
#[command(name = "phork", version, about)]
struct Cli {
    /// World file (TOML). Without one, a small built-in world is used.
    #[arg(long)]
    world: Option<PathBuf>,

    /// Engine configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for combat and NPC movement rolls.
    #[arg(long)]
    seed: Option<u64>,

    /// Start with carry limits lifted.
    #[arg(long)]
    demo: bool,

    /// Where `save` and `restore` go when no file is named.
    #[arg(long)]
    save: Option<PathBuf>,
}

fn flush_output(out: Output) {
    let mut printed_anything = false;
    let mut started_events = false;

    for block in out.blocks {
        match block {
            OutputBlock::Title(t) => {
                println!("\n{}", t);
                printed_anything = true;
            }
            OutputBlock::Text(line) => {
                println!("{}", line);
                printed_anything = true;
            }
            OutputBlock::Event(ev) => {
                if !started_events {
                    if printed_anything {
                        println!(); // visual separation before first event
                    }
                    started_events = true;
                }
                println!("{}", ev);
                printed_anything = true;
            }
            OutputBlock::Exits(exits) => {
                println!("\n{}", exits);
                printed_anything = true;
            }
        }
    }
}

fn load_config(cli: &Cli) -> Result<EngineConfig, String> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path).map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?,
        None => EngineConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.demo {
        config.demo_mode = true;
    }
    if let Some(save) = &cli.save {
        config.save_path = save.clone();
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<(), String> {
    let config = load_config(&cli)?;

    let world = match &cli.world {
        Some(path) => {
            let w = load_world_from_file(path)
                .map_err(|e| format!("Failed to load world file '{}': {e}", path.display()))?;
            println!("Using world file: {}", path.display());
            w
        }
        None => fallback_world(),
    };

    let problems = validate_world(&world);
    if !problems.is_empty() {
        for p in &problems {
            warn!(problem = %p.message, "world validation");
        }
        return Err(format!("World '{}' has {} problem(s); see the log for details.", world.id, problems.len()));
    }

    println!("Welcome to {}!", world.name);
    if !world.desc.trim().is_empty() {
        println!("{}", world.desc.trim());
    }
    println!();
    println!("Type 'help' for a list of commands, 'quit' to exit.\n");

    let mut game = GameState::new(world, config);
    match game.initialize() {
        Some(out) => flush_output(out),
        None => return Err(format!("start_room '{}' not found.", game.world.start_room)),
    }

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().map_err(|e| e.to_string())?;

        let mut input = String::new();
        let bytes_read = stdin.read_line(&mut input).map_err(|e| e.to_string())?;
        if bytes_read == 0 {
            println!("\nGoodbye.");
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let (out, quit) = game.step(input);
        flush_output(out);
        if quit {
            break;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}
