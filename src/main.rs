mod access;
mod barcode;
mod circulation;
mod cli;
mod commands;
mod config;
mod database;
mod isbn;
mod lookup;
mod pagination;
mod roster;
mod upload;

use anyhow::Result;
use clap::Parser;
use cli::{BookCommands, ClassroomCommands, Cli, Commands, LevelCommands, LoanCommands, UserCommands};
use commands::Session;
use config::Config;

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let db_path = config.database_path(cli.db.as_deref())?;
    let session = Session {
        config,
        db_path,
        username: cli.user,
        password: cli.password,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Books { command } => match command {
            BookCommands::Find {
                isbns,
                title,
                direct,
                json,
            } => {
                commands::books::find(&session, &isbns, title.as_deref(), direct, json)?;
            }
            BookCommands::Add {
                isbns,
                title,
                pick,
                direct,
                yes,
            } => {
                commands::books::add(&session, &isbns, title.as_deref(), pick, direct, yes)?;
            }
            BookCommands::List { page, json } => {
                commands::books::list(&session, page, json)?;
            }
            BookCommands::Show { id, json } => {
                commands::books::show(&session, id, json)?;
            }
            BookCommands::Search { text, json } => {
                commands::books::search(&session, &text, json)?;
            }
            BookCommands::Terms => {
                commands::books::terms(&session)?;
            }
            BookCommands::SetLevel { id, level } => {
                commands::books::set_level(&session, id, &level)?;
            }
        },
        Commands::Levels { command } => match command {
            LevelCommands::Add {
                level,
                age_min,
                age_max,
            } => {
                commands::levels::add(&session, &level, age_min, age_max)?;
            }
            LevelCommands::List => {
                commands::levels::list(&session)?;
            }
        },
        Commands::Classrooms { command } => match command {
            ClassroomCommands::Import { file } => {
                commands::classrooms::import(&session, &file)?;
            }
            ClassroomCommands::List => {
                commands::classrooms::list(&session)?;
            }
            ClassroomCommands::Pupils { name } => {
                commands::classrooms::pupils(&session, &name)?;
            }
        },
        Commands::Users { command } => match command {
            UserCommands::Add {
                username,
                new_password,
                classroom,
                admin,
            } => {
                commands::users::add(
                    &session,
                    &username,
                    new_password.as_deref(),
                    classroom.as_deref(),
                    admin,
                )?;
            }
            UserCommands::List => {
                commands::users::list(&session)?;
            }
            UserCommands::Whoami => {
                commands::users::whoami(&session)?;
            }
        },
        Commands::Loans { command } => match command {
            LoanCommands::Record {
                book,
                pupil,
                barcode,
            } => {
                commands::loans::record(&session, book, pupil, &barcode)?;
            }
            LoanCommands::Return { book, barcode } => {
                commands::loans::return_book(&session, book, &barcode)?;
            }
            LoanCommands::List { page } => {
                commands::loans::list(&session, page)?;
            }
        },
        Commands::Scan { image, json } => {
            commands::scan::run(&session, &image, json)?;
        }
    }

    Ok(())
}
