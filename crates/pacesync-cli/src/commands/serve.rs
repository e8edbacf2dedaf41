//! Serve command handler
//!
//! Runs the engine until Ctrl-C. The terminal doubles as the drop area:
//! when a device asks for it, a file dragged onto the terminal (which
//! pastes its path) or a typed path is relayed to that device.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tracing::{info, warn};

use pacesync_core::sync::{server, ShellEvent, ShellMode};
use pacesync_core::{
    Config, Engine, EngineHandle, EngineOptions, RaceStatQuery, RestartPolicy,
};

use crate::logging::init_logging;
use crate::output::Output;

/// Command-line overrides for the serve command
#[derive(Debug, Default)]
pub struct ServeArgs {
    pub root: Option<PathBuf>,
    pub port: Option<u16>,
    pub bind: Option<String>,
}

/// Run the sync server
pub async fn run(config_path: Option<&PathBuf>, args: ServeArgs, output: &Output) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config, Some("info"));

    if let Some(root) = args.root {
        config.folder_path = Some(root);
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }

    let listener = server::bind(&config.bind_address, config.port).await?;
    let port = listener.local_addr()?.port();
    let ws_url = server::ws_url(port);

    let options = EngineOptions {
        install_root: config.folder_path.clone(),
        policy: config.redelivery,
        restart: RestartPolicy::default(),
        ws_url: Some(ws_url.clone()),
    };
    let (engine, mut handle) = Engine::new(options, Arc::new(RaceStatQuery));
    let engine_task = tokio::spawn(engine.run(listener));

    output.message(&format!("Devices can connect to {}", ws_url));
    if config.folder_path.is_none() {
        output.message("No folder configured. Set one with: pacesync config set folder_path <DIR>");
    }

    let stdin = BufReader::new(tokio::io::stdin()).lines();
    run_shell(tokio::signal::ctrl_c(), &mut handle, Some(stdin), output).await?;

    handle.shutdown();
    engine_task.await.context("Engine task failed")?;
    output.success("Server stopped");
    Ok(())
}

/// Relay status, shell events and dropped paths until `shutdown` resolves
/// or the engine goes away
async fn run_shell<F, R>(
    shutdown: F,
    handle: &mut EngineHandle,
    stdin: Option<Lines<BufReader<R>>>,
    output: &Output,
) -> Result<()>
where
    F: Future,
    R: AsyncRead + Unpin,
{
    let mut status = handle.subscribe_status();
    let mut shell_events = handle
        .take_shell_events()
        .context("Shell events already taken")?;
    let mut stdin = stdin;
    let mut mode = ShellMode::Normal;

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = status.borrow_and_update().clone();
                info!(
                    "{} device(s) connected, {} file(s) sent",
                    snapshot.connected_devices.len(),
                    snapshot.sent_files.len()
                );
                if output.is_json() {
                    output.print_status(&snapshot);
                }
            }
            Some(ShellEvent::SwitchMode(next)) = shell_events.recv() => {
                mode = next;
                if mode == ShellMode::DragDrop {
                    output.message("Drop a file onto this terminal and press Enter (empty line cancels)");
                }
            }
            line = next_line(&mut stdin) => match line {
                Ok(Some(line)) => {
                    if mode != ShellMode::DragDrop {
                        continue;
                    }
                    let path = line.trim().trim_matches(|c| c == '"' || c == '\'');
                    if path.is_empty() {
                        handle.leave_drag_area();
                    } else {
                        handle.file_dropped(path);
                    }
                }
                // stdin closed; keep serving without a drop area
                Ok(None) => stdin = None,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    stdin = None;
                }
            },
        }
    }

    Ok(())
}

async fn next_line<R: AsyncRead + Unpin>(
    stdin: &mut Option<Lines<BufReader<R>>>,
) -> std::io::Result<Option<String>> {
    match stdin {
        Some(lines) => lines.next_line().await,
        None => std::future::pending().await,
    }
}
