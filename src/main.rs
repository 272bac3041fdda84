use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn try_main() -> anyhow::Result<()> {
    sitecatalog::logging::init().context("init logging")?;

    let cli = sitecatalog::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        sitecatalog::cli::Command::Books(args) => {
            sitecatalog::commands::books(args).context("books")?;
        }
        sitecatalog::cli::Command::Details(args) => {
            sitecatalog::commands::details(args).context("details")?;
        }
        sitecatalog::cli::Command::Chapters(args) => {
            sitecatalog::commands::chapters(args).context("chapters")?;
        }
        sitecatalog::cli::Command::Pages(args) => {
            sitecatalog::commands::pages(args).context("pages")?;
        }
        sitecatalog::cli::Command::Search(args) => {
            sitecatalog::commands::search(args).context("search")?;
        }
    }

    Ok(())
}
