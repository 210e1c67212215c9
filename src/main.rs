use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kfjc_trivia::config::{Cli, Command};
use kfjc_trivia::importer::Importer;
use kfjc_trivia::play::Game;
use kfjc_trivia::questions::{build_registry, make_all_questions, sorted_codes};
use kfjc_trivia::{db, server, users, AppState, Settings};

fn import(conn: &mut rusqlite::Connection, data_dir: &Path, settings: &Settings) -> Result<()> {
    let reports = Importer::new(settings.chunk_size)
        .import_all_tables(conn, data_dir)
        .with_context(|| format!("importing station data from {}", data_dir.display()))?;
    for report in &reports {
        println!("{report}");
    }
    Ok(())
}

fn seed_questions(conn: &rusqlite::Connection, settings: &Settings) -> Result<()> {
    let stored = make_all_questions(conn, settings, &mut rand::thread_rng())
        .context("generating questions")?;
    println!("Stored {stored} new questions");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout belongs to the terminal game
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("kfjc_trivia=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;

    if let Command::List = cli.command {
        let registry = build_registry();
        println!("Available question codes:");
        for code in sorted_codes(&registry) {
            println!(" - {code}: {}", registry[code].description);
        }
        return Ok(());
    }

    let mut conn = db::open(&cli.database)
        .with_context(|| format!("opening database {}", cli.database.display()))?;

    match cli.command {
        Command::Serve { bind } => {
            info!("Starting KFJC Trivia Robot v{}", env!("CARGO_PKG_VERSION"));
            let state = AppState::new(conn, settings);
            server::serve(state, &bind).await?;
        }
        Command::Import { data_dir } => import(&mut conn, &data_dir, &settings)?,
        Command::SeedQuestions => seed_questions(&conn, &settings)?,
        Command::Reset => {
            db::reset(&conn)?;
            println!("All tables dropped and recreated");
        }
        Command::Rebuild { data_dir } => {
            db::reset(&conn)?;
            import(&mut conn, &data_dir, &settings)?;
            seed_questions(&conn, &settings)?;
        }
        Command::Play { username } => {
            let user = match username {
                Some(name) => Some(
                    users::get_user_by_username(&conn, &name)?
                        .with_context(|| format!("no player named {name}"))?,
                ),
                None => None,
            };
            let stdin = io::stdin();
            Game::new(&conn, &settings, user, stdin.lock(), io::stdout()).run()?;
        }
        Command::List => {}
    }

    Ok(())
}
