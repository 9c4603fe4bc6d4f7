mod app;
mod commands;
mod config;
mod error;
mod event;
mod fetch;
mod logging;
mod mirror;
mod model;
mod query;
mod server;
mod store;
mod ui;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::mirror::{MirrorCache, SqliteMirror};

#[derive(Parser, Debug)]
#[command(name = "spadesk")]
#[command(about = "Spa bookings and administration over Firestore, with a local mirror cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./spadesk.yaml, then $XDG_CONFIG_HOME/spadesk/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
  /// Run the HTTP API, booking status page and web client
  Serve {
    /// Listen address, overriding server.addr
    #[arg(long)]
    addr: Option<SocketAddr>,
  },
  /// Terminal admin dashboard (default)
  Dashboard,
  /// Drop every mirrored row
  ResetMirror,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let command = args.command.unwrap_or(Cmd::Dashboard);

  // The dashboard owns the terminal, so it logs to a file
  let _guard = match command {
    Cmd::Dashboard => Some(logging::init_file(&logging::default_log_dir()?)?),
    _ => {
      logging::init_stdout()?;
      None
    }
  };

  let mut config = config::Config::load(args.config.as_deref())?;

  match command {
    Cmd::Serve { addr } => {
      if let Some(addr) = addr {
        config.server.addr = addr;
      }
      let client = fetch::SpaClient::from_config(&config)?;
      server::serve(&config.server, client).await?;
    }
    Cmd::Dashboard => {
      let client = fetch::SpaClient::from_config(&config)?;
      let mut app = app::App::new(&config, client);
      app.run().await?;
    }
    Cmd::ResetMirror => {
      let path = match config.cache.mirror_path {
        Some(path) => path,
        None => SqliteMirror::default_path()?,
      };
      SqliteMirror::open(&path)?.reset()?;
      tracing::info!(path = %path.display(), "Mirror reset");
    }
  }

  Ok(())
}
