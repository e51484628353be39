//! pland entrypoint: mode selection, logging, and pipeline wiring.

use anyhow::{Context as _, Result};
use clap::{CommandFactory, Parser};
use core_config::{Config, SegmentConfig};
use core_draw::DrawQueue;
use core_frame::{Frame, HEIGHT, WIDTH};
use core_geom::Point;
use core_pipeline::{
    CountingSink, FrameProcessor, TestPatternSource, run_camera, run_processor,
};
use core_planner::{Plan, PlanSink, Planner};
use core_shmem::{Access, PlanRegion};
use std::path::PathBuf;
use std::sync::Once;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments: exactly one mode flag.
#[derive(Parser, Debug)]
#[command(name = "pland", version, about = "Scale-car perception and path planning daemon")]
struct Args {
    /// Run the processor with the debug display pipeline.
    #[arg(long = "proc-test", alias = "pt", group = "mode")]
    proc_test: bool,
    /// Run the processor headless (no debug display).
    #[arg(long = "proc-real", alias = "pr", group = "mode")]
    proc_real: bool,
    /// Run only the camera producer.
    #[arg(long = "camera", alias = "c", group = "mode")]
    camera: bool,
    /// Optional configuration file path (overrides discovery of `pland.toml`).
    #[arg(long = "config")]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    ProcTest,
    ProcReal,
    Camera,
    Help,
}

impl Args {
    fn mode(&self) -> Mode {
        if self.proc_test {
            Mode::ProcTest
        } else if self.proc_real {
            Mode::ProcReal
        } else if self.camera {
            Mode::Camera
        } else {
            Mode::Help
        }
    }
}

fn configure_logging() -> Result<Option<WorkerGuard>> {
    // Append to log.txt in the working directory; restarts keep history.
    let file_appender = tracing_appender::rolling::never(".", "log.txt");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(nb_writer)
        .with_ansi(false)
        .try_init()
    {
        Ok(()) => Ok(Some(guard)),
        Err(_) => {
            // Global subscriber already installed (tests); drop the guard
            // so the writer shuts down.
            Ok(None)
        }
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            error!(target: "runtime.panic", ?panic_info, "panic");
            default_panic(panic_info);
        }));
    });
}

/// The per-frame computation wired into the processor pipeline:
/// segmentation, planning, plan publication, overlay drain.
struct PlandProcessor {
    seg_cfg: SegmentConfig,
    planner: Planner,
    queue: DrawQueue,
    plan_region: PlanRegion,
    last_plan: Option<Plan>,
}

impl PlandProcessor {
    fn new(config: &Config, draw_enabled: bool) -> Result<Self> {
        let plan_region = PlanRegion::open(Access::ReadWrite)
            .context("failed to map the plan region")?;
        let planner = Planner::new(config.file.planner.clone(), config.file.finish.clone());
        Ok(Self {
            seg_cfg: config.file.segment.clone(),
            planner,
            queue: DrawQueue::new(draw_enabled),
            plan_region,
            last_plan: None,
        })
    }
}

impl FrameProcessor for PlandProcessor {
    fn process(&mut self, frame: &mut Frame, fps: u16) -> anyhow::Result<()> {
        core_segment::pre_process(frame, &self.seg_cfg);
        let plan = self.planner.step(frame, &mut self.queue);
        self.plan_region
            .publish_plan(&plan)
            .context("failed to publish the plan")?;
        if self.last_plan.map(|p| p.lap_of_honor) != Some(plan.lap_of_honor) {
            info!(target: "runtime", lap_of_honor = plan.lap_of_honor, "finish flag changed");
        }
        self.last_plan = Some(plan);

        self.queue
            .push_number(fps, Point::new(10, HEIGHT as u16 - 50), 4);
        self.queue.drain(frame);
        Ok(())
    }
}

fn run(args: &Args, config: &mut Config) -> Result<()> {
    config.apply_frame_bounds(WIDTH as u16, HEIGHT as u16);

    match args.mode() {
        Mode::Help => {
            Args::command().print_help()?;
            Ok(())
        }
        Mode::Camera => {
            // The capture backend is an external collaborator; without
            // one attached, the built-in test pattern feeds the state
            // region so downstream consumers can be exercised.
            info!(target: "runtime", "starting camera pipeline with the built-in test pattern");
            run_camera(Box::new(TestPatternSource::new()))?;
            Ok(())
        }
        Mode::ProcReal | Mode::ProcTest => {
            let debug_display = args.mode() == Mode::ProcTest;
            let draw_enabled = debug_display || config.file.draw.enabled;
            let processor = PlandProcessor::new(config, draw_enabled)?;
            let sink = if debug_display {
                Some(Box::new(CountingSink::new(30)) as Box<dyn core_pipeline::FrameSink>)
            } else {
                None
            };
            let deinit: core_pipeline::UserDeinit =
                Box::new(|| info!(target: "runtime", "planner shut down"));
            info!(
                target: "runtime",
                debug_display,
                draw_enabled,
                "starting processor pipeline"
            );
            run_processor(Box::new(processor), sink, Some(deinit))?;
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let _log_guard = configure_logging()?;
    install_panic_hook();

    let args = Args::parse();
    let mut config = core_config::load_from(args.config.clone())?;
    info!(
        target: "runtime",
        mode = ?args.mode(),
        config_override = args.config.is_some(),
        "startup"
    );

    run(&args, &mut config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_flags_parse() {
        let args = Args::try_parse_from(["pland", "--proc-test"]).unwrap();
        assert_eq!(args.mode(), Mode::ProcTest);
        let args = Args::try_parse_from(["pland", "--pr"]).unwrap();
        assert_eq!(args.mode(), Mode::ProcReal);
        let args = Args::try_parse_from(["pland", "--camera"]).unwrap();
        assert_eq!(args.mode(), Mode::Camera);
        let args = Args::try_parse_from(["pland"]).unwrap();
        assert_eq!(args.mode(), Mode::Help);
    }

    #[test]
    fn mode_flags_are_mutually_exclusive() {
        assert!(Args::try_parse_from(["pland", "--proc-test", "--camera"]).is_err());
        assert!(Args::try_parse_from(["pland", "--pt", "--pr"]).is_err());
    }

    #[test]
    fn config_override_is_accepted() {
        let args =
            Args::try_parse_from(["pland", "--proc-real", "--config", "/tmp/pland.toml"]).unwrap();
        assert_eq!(args.config.as_deref(), Some(std::path::Path::new("/tmp/pland.toml")));
    }
}
