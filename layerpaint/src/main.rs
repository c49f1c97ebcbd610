#![warn(clippy::pedantic)]

use std::sync::Arc;

use anyhow::Result as AnyResult;
use layerpaint_core::{
    config::QueueConfig,
    queue::ListenerError,
    render::{canvas::CanvasSurface, Renderer},
};

pub mod global;
pub mod script;

/// Draws every new state of a document on its own thread, until the document is closed.
/// Returns how many frames were drawn.
fn spawn_render_worker(
    mut canvas: CanvasSurface,
) -> std::io::Result<std::thread::JoinHandle<usize>> {
    std::thread::Builder::new()
        .name("Render worker".to_owned())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread().build() {
                Ok(runtime) => runtime,
                Err(e) => {
                    log::error!("Render runtime failed to start:\n{e:?}");
                    return 0;
                }
            };
            runtime.block_on(async {
                let mut frames = 0;
                loop {
                    match canvas.next_frame().await {
                        Ok(frame) => {
                            frames += 1;
                            log::trace!("Drew {} at {}", frame.document(), frame.version());
                        }
                        Err(ListenerError::DocumentClosed) => break frames,
                    }
                }
            })
        })
}

/// Play one script start to finish, storing the output if it names one.
fn play(path: &std::path::Path, config: &QueueConfig, renderer: &Arc<Renderer>) -> AnyResult<()> {
    let script = script::Script::load(path)?;
    let queue = script.open(config)?;
    let document = queue.id();
    let worker = spawn_render_worker(CanvasSurface::new(queue.listen(), renderer.clone()))?;

    script.play(&queue)?;
    if let Some(output) = script.output() {
        queue.save(output)?;
    }
    let version = queue.version();
    // Closes the document, letting the worker finish.
    drop(queue);
    let frames = worker
        .join()
        .map_err(|_| anyhow::anyhow!("render worker panicked"))?;
    renderer.evict(document);
    log::info!(
        "Played {} ({} steps) to {version}, drew {frames} frame(s)",
        path.display(),
        script.edit.len()
    );
    Ok(())
}

fn main() -> AnyResult<()> {
    let has_term = std::io::IsTerminal::is_terminal(&std::io::stdin());
    // Log to a terminal, if available. Else, log to "log.out" in the working directory.
    if has_term {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        let _ = simple_logging::log_to_file("log.out", log::LevelFilter::Debug);
    }

    let settings = global::Settings::get();
    log::debug!("Using {:?}", settings.queue);
    if !settings.should_save() {
        log::warn!("Leaving the unreadable settings file untouched");
    } else if let Err(e) = settings.save() {
        log::warn!("Failed to save settings:\n{e:?}");
    }

    let played_any = {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
        // Args are a simple list of scripts to play, each with its own document.
        let paths: Vec<std::path::PathBuf> = std::env::args_os().skip(1).map(Into::into).collect();
        // Did we have at least one success? No paths is a success.
        let had_success: std::sync::atomic::AtomicBool = paths.is_empty().into();
        let renderer = Arc::new(Renderer::new());
        paths.into_par_iter().for_each(|path| {
            match play(&path, &settings.queue, &renderer) {
                Err(e) => {
                    log::error!("failed to play {path:?}: {e:#}");
                }
                Ok(()) => {
                    had_success.store(true, std::sync::atomic::Ordering::Relaxed);
                }
            }
        });

        had_success.into_inner()
    };
    if !played_any {
        anyhow::bail!("Failed to play any provided script.");
    }
    Ok(())
}
