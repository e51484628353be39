//! Pipeline manager: thread lifecycle, signal-driven shutdown, ordered
//! cleanup.

use crate::camera::camera_loop;
use crate::context::Context;
use crate::display::display_loop;
use crate::processor::{FrameProcessor, processor_loop};
use crate::source::{FrameSink, FrameSource};
use crate::PipelineError;
use core_shmem::{Access, STATE_SEM_NAME, STATE_SHM_NAME, StateRegion};
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};

/// Poll cadence of the supervising main thread.
const SUPERVISE_INTERVAL: Duration = Duration::from_millis(100);

/// Written by the signal handler, read by the supervisor. This is the one
/// process-wide cell the async-signal context forces on us; everything
/// else lives in the per-run [`Context`].
static SIGNAL_EXIT: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_exit_signal(_sig: std::ffi::c_int) {
    SIGNAL_EXIT.store(true, Ordering::Release);
}

fn install_signal_handlers() -> Result<(), PipelineError> {
    let action = SigAction::new(
        SigHandler::Handler(handle_exit_signal),
        SaFlags::empty(),
        SigSet::all(),
    );
    for sig in [Signal::SIGINT, Signal::SIGHUP, Signal::SIGTERM] {
        // SAFETY: the handler only stores to an atomic.
        unsafe { sigaction(sig, &action) }.map_err(PipelineError::Signals)?;
    }
    Ok(())
}

/// Region names, injectable so tests can run against private regions.
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    pub state_shm: String,
    pub state_sem: String,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            state_shm: STATE_SHM_NAME.to_string(),
            state_sem: STATE_SEM_NAME.to_string(),
        }
    }
}

/// Optional teardown supplied by the binary, run last during cleanup.
pub type UserDeinit = Box<dyn FnOnce() + Send>;

struct Worker {
    name: &'static str,
    handle: JoinHandle<()>,
}

fn spawn_worker(
    name: &'static str,
    job: impl FnOnce() + Send + 'static,
) -> Result<Worker, PipelineError> {
    let handle = thread::Builder::new()
        .name(name.to_string())
        .spawn(job)
        .map_err(|source| PipelineError::Spawn { name, source })?;
    Ok(Worker { name, handle })
}

/// Run the camera producer: source frames into the `STATE` region until
/// shutdown.
pub fn run_camera(source: Box<dyn FrameSource>) -> Result<(), PipelineError> {
    run_camera_with(ManagerOptions::default(), source, None)
}

pub fn run_camera_with(
    options: ManagerOptions,
    mut source: Box<dyn FrameSource>,
    user_deinit: Option<UserDeinit>,
) -> Result<(), PipelineError> {
    install_signal_handlers()?;
    let ctx = Arc::new(Context::new());
    let state = Arc::new(StateRegion::open_named(
        &options.state_shm,
        &options.state_sem,
        Access::ReadWrite,
    )?);

    let camera = {
        let ctx = ctx.clone();
        let state = state.clone();
        spawn_worker("camera", move || camera_loop(&ctx, &state, source.as_mut()))?
    };

    supervise(&ctx, &state, vec![camera], user_deinit);
    Ok(())
}

/// Run the frame processor, optionally with a debug display pipeline.
pub fn run_processor(
    processor: Box<dyn FrameProcessor>,
    sink: Option<Box<dyn FrameSink>>,
    user_deinit: Option<UserDeinit>,
) -> Result<(), PipelineError> {
    run_processor_with(ManagerOptions::default(), processor, sink, user_deinit)
}

pub fn run_processor_with(
    options: ManagerOptions,
    mut processor: Box<dyn FrameProcessor>,
    sink: Option<Box<dyn FrameSink>>,
    user_deinit: Option<UserDeinit>,
) -> Result<(), PipelineError> {
    install_signal_handlers()?;
    let ctx = Arc::new(Context::new());
    let state = Arc::new(StateRegion::open_named(
        &options.state_shm,
        &options.state_sem,
        Access::ReadOnly,
    )?);

    let mut workers = Vec::new();
    // Cleanup stops the display first, so it is pushed first.
    if let Some(mut sink) = sink {
        let ctx = ctx.clone();
        workers.push(spawn_worker("display", move || {
            display_loop(&ctx, sink.as_mut())
        })?);
    }
    {
        let ctx = ctx.clone();
        let state = state.clone();
        workers.push(spawn_worker("proc", move || {
            processor_loop(&ctx, &state, processor.as_mut())
        })?);
    }

    supervise(&ctx, &state, workers, user_deinit);
    Ok(())
}

/// Sleep in 100 ms ticks until any thread or a signal requests exit, then
/// clean up exactly once, in order: release abandoned semaphores, join
/// the workers (display before processor before camera), drop the shared
/// context, run the user deinit. Every step runs regardless of earlier
/// failures.
fn supervise(
    ctx: &Arc<Context>,
    state: &Arc<StateRegion>,
    workers: Vec<Worker>,
    user_deinit: Option<UserDeinit>,
) {
    loop {
        if SIGNAL_EXIT.load(Ordering::Acquire) {
            info!(target: "pipeline.mgr", "exit signal observed");
            ctx.shutdown.request();
        }
        if ctx.shutdown.requested() {
            break;
        }
        thread::sleep(SUPERVISE_INTERVAL);
    }

    info!(target: "pipeline.mgr", "cleaning up before termination");
    state.release_if_held();

    for worker in workers {
        match worker.handle.join() {
            Ok(()) => info!(target: "pipeline.mgr", thread = worker.name, "worker joined"),
            Err(_) => {
                error!(target: "pipeline.mgr", thread = worker.name, "worker panicked")
            }
        }
    }

    if let Some(deinit) = user_deinit {
        deinit();
    }
    if Arc::strong_count(ctx) > 1 {
        warn!(target: "pipeline.mgr", "context still referenced after cleanup");
    }
    info!(target: "pipeline.mgr", "cleanup complete");
}
