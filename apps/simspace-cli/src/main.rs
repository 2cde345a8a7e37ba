use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use simspace_common::MotionType;
use simspace_input::{Action, BINDINGS, Key, dispatch};
use simspace_kernel::{Agent, BackendFactory, Integration, ReferenceSimulator, SimulationBackend};
use simspace_tools::{
    CheckPlan, RunLabel, RunPlan, Tolerance, TimelineFile, TrajectoryConsistencyChecker, Verdict,
    record_run,
};

/// Template spawned by the spawn key.
const SPAWN_TEMPLATE: &str = "mini_soccer_ball";

#[derive(Parser)]
#[command(name = "simspace-cli", about = "CLI tool for simspace operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a scenario evolves the same at a fine and a coarse timestep
    Check {
        /// YAML check plan (simulator, scenario, check sections)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Simulated seconds per run
        #[arg(long)]
        duration: Option<f64>,
        /// Fine timestep in seconds
        #[arg(long)]
        dt: Option<f64>,
        /// Coarse timestep as a multiple of the fine one
        #[arg(long)]
        ratio: Option<u32>,
        /// Maximum translation delta in metres
        #[arg(long)]
        tolerance: Option<f32>,
        /// Integrate each step directly instead of in fixed substeps
        #[arg(long)]
        direct: bool,
    },
    /// Record one run of a scenario to a timeline file
    Record {
        /// Output timeline file (JSON)
        #[arg(short, long)]
        out: PathBuf,
        /// YAML check plan supplying the simulator and scenario
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Timestep in seconds
        #[arg(long, default_value = "0.1")]
        dt: f64,
        /// Record a checkpoint every N steps
        #[arg(long, default_value = "1")]
        sample_every: u64,
        /// Simulated seconds
        #[arg(long, default_value = "3.0")]
        duration: f64,
    },
    /// Compare two recorded timeline files
    Compare {
        a: PathBuf,
        b: PathBuf,
        /// Maximum translation delta in metres
        #[arg(long, default_value = "0.001")]
        tolerance: f32,
    },
    /// Print the key bindings
    Bindings,
    /// List object template handles available to a simulation
    Templates {
        /// Only list handles containing this text
        #[arg(default_value = "")]
        search: String,
        /// YAML check plan supplying the simulator configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Drive the default agent with a sequence of keys
    Act {
        /// Keys to press, in order (e.g. w w a h)
        keys: Vec<String>,
        /// YAML check plan supplying the simulator and scenario
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Seconds of physics stepped after each key
        #[arg(long, default_value = "0.016666666666666666")]
        dt: f64,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Check {
            config,
            duration,
            dt,
            ratio,
            tolerance,
            direct,
        } => {
            let mut plan = load_plan(config.as_deref())?;
            if let Some(duration) = duration {
                plan.check.duration = duration;
            }
            if let Some(dt) = dt {
                plan.check.fine_timestep = dt;
            }
            if let Some(ratio) = ratio {
                plan.check.ratio = ratio;
            }
            if let Some(tolerance) = tolerance {
                plan.check.tolerance = tolerance;
            }
            if direct {
                plan.simulator.physics.integration = Integration::Direct;
            }

            tracing::debug!(check = ?plan.check, objects = plan.scenario.len(), "check plan loaded");
            let checker = TrajectoryConsistencyChecker::new(plan.check.clone())?;
            let report =
                checker.check(&ReferenceSimulator::new(), &plan.simulator, &plan.scenario)?;
            for (label, timeline) in [("fine", &report.fine), ("coarse", &report.coarse)] {
                if let Some(t) = timeline {
                    println!(
                        "{label}: dt={} sample_every={} ({}s) checkpoints={}",
                        t.timestep(),
                        t.sample_every(),
                        t.sample_interval(),
                        t.len()
                    );
                }
            }
            println!("{}", report.verdict);
            Ok(ExitCode::from(exit_code(&report.verdict)))
        }
        Commands::Record {
            out,
            config,
            dt,
            sample_every,
            duration,
        } => {
            let plan = load_plan(config.as_deref())?;
            let run = RunPlan {
                label: RunLabel::Fine,
                timestep: dt,
                sample_every,
                duration,
                time_tolerance: plan.check.time_tolerance,
                max_steps: RunPlan::default_step_limit(duration, dt, sample_every),
            };
            let mut world = ReferenceSimulator::new()
                .acquire(&plan.simulator)
                .context("acquiring simulation")?;
            let timeline = record_run(&mut world, &plan.scenario, &run)?;
            let file = TimelineFile::new(&plan.scenario, timeline);
            file.save(&out)
                .with_context(|| format!("writing {}", out.display()))?;
            println!(
                "Recorded {} checkpoints to {} (scenario {})",
                file.timeline.len(),
                out.display(),
                &file.scenario_fingerprint[..12]
            );
            Ok(ExitCode::SUCCESS)
        }
        Commands::Compare { a, b, tolerance } => {
            let fa = TimelineFile::load(&a).with_context(|| format!("reading {}", a.display()))?;
            let fb = TimelineFile::load(&b).with_context(|| format!("reading {}", b.display()))?;
            let tolerance = Tolerance {
                translation: tolerance,
                ..Tolerance::default()
            };
            match fa.compare(&fb, &tolerance)? {
                Ok(agreement) => {
                    println!("Match: {agreement}");
                    Ok(ExitCode::SUCCESS)
                }
                Err(divergence) => {
                    println!("Diverged: {divergence}");
                    Ok(ExitCode::from(1))
                }
            }
        }
        Commands::Bindings => {
            for (key, action) in BINDINGS {
                println!("{:>5}  {action}", key.to_string());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Templates { search, config } => {
            let plan = load_plan(config.as_deref())?;
            let world = ReferenceSimulator::new()
                .acquire(&plan.simulator)
                .context("acquiring simulation")?;
            let handles = world.templates().template_handles(&search);
            for handle in &handles {
                println!("{handle}");
            }
            println!("{} templates", handles.len());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Act { keys, config, dt } => {
            let plan = load_plan(config.as_deref())?;
            let mut world = ReferenceSimulator::new()
                .acquire(&plan.simulator)
                .context("acquiring simulation")?;
            plan.scenario.apply(&mut world)?;
            let mut agent = Agent::new(
                plan.simulator
                    .default_agent_config()
                    .cloned()
                    .unwrap_or_default(),
            );

            for raw in &keys {
                let key: Key = raw.parse()?;
                match dispatch(key) {
                    Action::Agent(action) => {
                        let outcome = agent.act(action.name(), &mut world)?;
                        println!("{key}: {} -> {outcome:?}", action.name());
                    }
                    Action::SpawnObject => {
                        let id = world.add_object(SPAWN_TEMPLATE)?;
                        world.set_motion_type(id, MotionType::Dynamic)?;
                        let at = agent.transform_point(glam::Vec3::new(0.1, 1.5, -1.5));
                        world.set_translation(id, at)?;
                        println!("{key}: spawned {SPAWN_TEMPLATE} {id} at {at}");
                    }
                    Action::Noop => println!("{key}: unbound"),
                }
                world.step_world(dt)?;
            }

            let state = agent.state();
            println!(
                "Agent: position={} yaw={:.1} pitch={:.1} holding={}",
                state.position,
                state.yaw_deg,
                state.pitch_deg,
                agent
                    .grabbed()
                    .map_or_else(|| "nothing".to_owned(), |id| id.to_string())
            );
            println!(
                "World: t={:.3}s objects={} hash={:#x}",
                world.world_time(),
                world.object_count(),
                world.state_hash()
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Process exit code for a check verdict: skips count as success.
fn exit_code(verdict: &Verdict) -> u8 {
    match verdict {
        Verdict::Pass(_) | Verdict::Skipped { .. } => 0,
        Verdict::Fail(_) => 1,
        Verdict::Inconclusive(_) => 2,
    }
}

fn load_plan(path: Option<&Path>) -> anyhow::Result<CheckPlan> {
    match path {
        Some(path) => {
            CheckPlan::load(path).with_context(|| format!("loading plan {}", path.display()))
        }
        None => Ok(CheckPlan::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simspace_tools::{Agreement, Divergence, RunError};

    #[test]
    fn exit_codes_follow_verdict() {
        assert_eq!(exit_code(&Verdict::Pass(Agreement::default())), 0);
        assert_eq!(
            exit_code(&Verdict::Skipped {
                reason: "scene missing".into()
            }),
            0
        );
        assert_eq!(
            exit_code(&Verdict::Fail(Divergence::CheckpointCount { a: 7, b: 6 })),
            1
        );
        assert_eq!(
            exit_code(&Verdict::Inconclusive(RunError::DurationNotReached {
                run: RunLabel::Coarse,
                target: 3.0,
                world_time: 0.0,
                steps: 14,
            })),
            2
        );
    }

    #[test]
    fn cli_parses_check_overrides() {
        let cli = Cli::try_parse_from([
            "simspace-cli", "-v", "check", "--dt", "0.05", "--ratio", "4", "--direct",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Check {
                dt, ratio, direct, ..
            } => {
                assert_eq!(dt, Some(0.05));
                assert_eq!(ratio, Some(4));
                assert!(direct);
            }
            _ => panic!("expected check"),
        }
    }
}
