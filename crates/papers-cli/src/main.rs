//! `papers`: command-line front end for the papers database.
//!
//! # Usage
//!
//! ```text
//! papers import papers.xlsx --out papers.db
//! papers search neural networks --year 2015
//! papers edit 12 --set status=read
//! papers rename --scheme sequential --execute --rename-pdfs
//! ```

mod cli;
mod commands;
mod logging;
mod output;
mod settings;

use std::io;

use anyhow::Context as _;
use clap::Parser;
use cli::{Cli, Command};
use commands::Context;
use papers_pdf::SystemOpener;
use settings::SettingsStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  let settings_path = match cli.settings {
    Some(path) => path,
    None => SettingsStore::default_path().context("could not determine a settings directory")?,
  };
  let mut settings = SettingsStore::load(settings_path).context("failed to load settings")?;

  logging::init(settings.settings().log_dir.as_deref())?;
  tracing::debug!(path = %settings.path().display(), "loaded settings");

  let mut out = io::stdout().lock();
  match cli.command {
    Command::Import(args) => commands::import(args, cli.db, &mut settings, &mut out).await,
    Command::Config(action) => commands::config(action, &mut settings, &mut out),
    command => {
      let db_path = commands::resolve_db_path(cli.db, settings.settings());
      let store = commands::open_store(&db_path, &mut settings).await?;
      let opener = SystemOpener::detect();
      Context {
        store:    &store,
        settings: &mut settings,
        db_path:  &db_path,
        opener:   &opener,
        out:      &mut out,
      }
      .run(command)
      .await
    }
  }
}
