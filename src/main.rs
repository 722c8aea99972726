use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;

use tunnel_lining::config::Config;
use tunnel_lining::core::live_link::{LiveLink, listener_script};
use tunnel_lining::core::manifest::Manifest;
use tunnel_lining::core::session::Session;
use tunnel_lining::render::snapshot::{SceneSnapshot, export_script};
use tunnel_lining::tunnel::cleanup;

/// Drives Blender over the Live-Link: tunnel lining generation and batch
/// rendering
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    cmd: Command,

    /// JSON configuration file; built-in defaults otherwise
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    /// Also write the generated script to this file
    #[clap(short, long, global = true)]
    out: Option<PathBuf>,

    /// Do not send the script to Blender
    #[clap(long, global = true)]
    no_send: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the segmented tunnel lining
    Tunnel {
        /// Record of what the last run created
        #[clap(short, long, default_value = "tunnel_manifest.json")]
        manifest: PathBuf,
    },

    /// Remove everything the last tunnel run created
    Teardown {
        #[clap(short, long, default_value = "tunnel_manifest.json")]
        manifest: PathBuf,
    },

    /// Render every eligible camera of the scene described by a snapshot
    Render {
        /// Scene snapshot written by `snapshot-script`
        #[clap(short, long)]
        snapshot: PathBuf,

        /// Only render cameras whose view name contains this
        #[clap(long, env = "CAMERAS")]
        cameras: Option<String>,
    },

    /// Print the Python that exports a scene snapshot
    SnapshotScript {
        /// Where Blender should write the snapshot
        #[clap(short, long, default_value = "scene_snapshot.json")]
        path: String,
    },

    /// Print the Live-Link listener to run once inside Blender
    ListenerScript,
}

/// Writes and/or sends the finished script; returns whether it reached
/// Blender.
fn deliver(session: &Session, args: &Args, config: &Config) -> Result<bool> {
    if let Some(out) = &args.out {
        std::fs::write(out, session.script())
            .with_context(|| format!("failed to write script to {}", out.display()))?;
        info!("script written to {}", out.display());
    }
    if args.no_send {
        return Ok(false);
    }
    session.send(&LiveLink::new(&config.live_link))?;
    Ok(true)
}

fn remove_manifest(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            Err(e).with_context(|| format!("failed to remove {}", path.display()))
        }
        _ => Ok(()),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match &args.cmd {
        Command::Tunnel { manifest } => {
            let previous = Manifest::load(manifest)?;
            let mut session = Session::new();
            tunnel_lining::tunnel::generate(&mut session, &config.tunnel, previous.as_ref())?;
            if deliver(&session, &args, &config)? {
                session.manifest().save(manifest)?;
                info!("manifest saved to {}", manifest.display());
            }
        }
        Command::Teardown { manifest } => {
            let previous = Manifest::load(manifest)?;
            let mut session = Session::new();
            cleanup::emit(&mut session, previous.as_ref());
            if deliver(&session, &args, &config)? {
                remove_manifest(manifest)?;
            }
        }
        Command::Render { snapshot, cameras } => {
            let snapshot = SceneSnapshot::load(snapshot)?;
            let mut session = Session::new();
            let plan = tunnel_lining::render::generate(
                &mut session,
                &snapshot,
                &config.render,
                cameras.as_deref(),
            )?;
            for job in &plan.jobs {
                info!(
                    "{}: {} samples, frame end {}, {:?}",
                    job.object, job.samples, job.frame_end, job.mode
                );
            }
            deliver(&session, &args, &config)?;
        }
        Command::SnapshotScript { path } => print!("{}", export_script(path)),
        Command::ListenerScript => print!("{}", listener_script(&config.live_link)),
    }
    Ok(())
}
