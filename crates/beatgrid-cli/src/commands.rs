//! Subcommand implementations

use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use beatgrid_core::{
    grid_lines, select_range, EditSession, GridLineKind, LaneSelection, NoteStore, NoteTransform,
    TransformChain,
};
use beatgrid_services::native::write_wav;
use beatgrid_services::{default_output_info, AudioBackend, NativeBackend, PlaybackEngine};
use tracing::info;

use crate::config::AppConfig;
use crate::EditArgs;

/// How far ahead `play` schedules notes
const LOOKAHEAD_SECS: f64 = 0.1;
const SCHEDULER_TICK: Duration = Duration::from_millis(25);

fn lane_selection(lanes: &[String]) -> LaneSelection {
    if lanes.is_empty() {
        return LaneSelection::All;
    }
    LaneSelection::only(lanes.iter().cloned())
}

fn load_pattern(path: &Path) -> anyhow::Result<NoteStore> {
    NoteStore::load(path).with_context(|| format!("reading pattern {}", path.display()))
}

pub fn print_grid(
    config: &AppConfig,
    duration: f64,
    grid: Option<f64>,
    beats_per_bar: Option<u32>,
) -> anyhow::Result<()> {
    let grid = grid.unwrap_or_else(|| config.grid.grid_secs());
    let beats_per_bar = beats_per_bar.unwrap_or(config.grid.beats_per_bar);

    for line in grid_lines(duration, grid, beats_per_bar)? {
        let marker = match line.kind {
            GridLineKind::Bar => "bar",
            GridLineKind::Beat => "beat",
            GridLineKind::Subdivision => "sub",
        };
        println!("{:>10.4}  {}", line.time, marker);
    }
    Ok(())
}

/// Build the transform chain requested on the command line.
pub(crate) fn build_chain(config: &AppConfig, args: &EditArgs) -> anyhow::Result<TransformChain> {
    let grid = args.grid.unwrap_or_else(|| config.grid.grid_secs());
    let lanes = lane_selection(&args.lanes);
    let mut chain = TransformChain::with_seed(args.seed);

    if let Some(strength) = args.quantize {
        chain.add(NoteTransform::Quantize { strength, grid });
    }
    if let Some(amount) = args.swing {
        chain.add(NoteTransform::Swing { amount, grid });
    }
    if let Some(amount) = args.humanize {
        chain.add(NoteTransform::Humanize {
            amount,
            timing_variation: config.humanize.timing,
            velocity_variation: config.humanize.velocity,
        });
    }
    if let Some(values) = &args.move_range {
        let [start, end, offset] = values[..] else {
            bail!("--move takes START END OFFSET");
        };
        chain.add(NoteTransform::MoveRange { start, end, offset, lanes: lanes.clone() });
    }
    if let Some(values) = &args.delete {
        let [start, end] = values[..] else {
            bail!("--delete takes START END");
        };
        chain.add(NoteTransform::DeleteRange { start, end, lanes });
    }
    Ok(chain)
}

/// Each requested transform is committed as its own undoable step.
pub fn edit(config: &AppConfig, args: &EditArgs) -> anyhow::Result<()> {
    let store = load_pattern(&args.pattern)?;
    let chain = build_chain(config, args)?;
    let mut session = EditSession::new(store, config.history_size)?;

    let mut rng = chain.rng();
    for step in chain.steps.iter().filter(|s| !s.bypass) {
        session.apply(step.transform.name(), |s| step.transform.apply(s, &mut rng))?;
    }

    for _ in 0..args.undo {
        if !session.undo() {
            break;
        }
    }

    let output = args.output.as_deref().unwrap_or(&args.pattern);
    session.current().save(output)?;
    info!(
        edits = chain.len(),
        history = session.history().len(),
        output = %output.display(),
        "Pattern saved"
    );
    Ok(())
}

pub fn select(pattern: &Path, start: f64, end: f64, lanes: &[String]) -> anyhow::Result<()> {
    let store = load_pattern(pattern)?;
    let selected = select_range(&store, start, end, &lane_selection(lanes));
    println!("{}", serde_json::to_string_pretty(&selected)?);
    Ok(())
}

pub fn render(config: &AppConfig, pattern: &Path, output: &Path, tail: f64) -> anyhow::Result<()> {
    let store = load_pattern(pattern)?;
    if config.kit.is_empty() {
        bail!("no kit configured; add a [kit] table to the config file");
    }

    let backend = NativeBackend::new(config.sample_rate);
    let mut engine = PlaybackEngine::new(backend, config.kit.clone());
    let length = store.end_time() + tail.max(0.0);
    let scheduled = engine.schedule_window(&store, 0.0, f64::INFINITY, &0.0);

    let samples = engine.backend_mut().render_offline(length);
    write_wav(output, &samples, config.sample_rate)
        .with_context(|| format!("writing {}", output.display()))?;

    info!(scheduled, seconds = length, output = %output.display(), "Rendered pattern");
    Ok(())
}

pub fn play(config: &AppConfig, pattern: &Path, tail: f64) -> anyhow::Result<()> {
    let store = load_pattern(pattern)?;
    let (device, sample_rate, _) = default_output_info()?;
    info!(device = %device, sample_rate, "Using output device");

    let mut engine = PlaybackEngine::new(NativeBackend::new(sample_rate), config.kit.clone());
    engine.backend_mut().start_output()?;

    let origin = engine.backend().now();
    let end = store.end_time() + tail.max(0.0);
    let mut scheduled_until = 0.0;

    loop {
        let transport_now = engine.backend().now() - origin;
        if transport_now >= end {
            break;
        }
        let horizon = transport_now + LOOKAHEAD_SECS;
        if horizon > scheduled_until {
            engine.schedule_window(&store, scheduled_until, horizon, &transport_now);
            scheduled_until = horizon;
        }
        thread::sleep(SCHEDULER_TICK);
    }

    engine.stop();
    engine.backend_mut().stop_output();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::{Cli, Command};

    fn edit_args(argv: &[&str]) -> EditArgs {
        let mut full = vec!["beatgrid", "edit", "pattern.json"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Command::Edit(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_build_chain_order_and_defaults() {
        let args = edit_args(&[
            "--quantize", "1.0", "--swing", "0.5", "--delete", "0", "1", "--lanes", "kick,snare",
        ]);
        let chain = build_chain(&AppConfig::default(), &args).unwrap();

        assert_eq!(chain.description(), "Quantize + Swing + Delete");
        assert_eq!(
            chain.steps[0].transform,
            NoteTransform::Quantize { strength: 1.0, grid: 0.125 }
        );
        assert_eq!(
            chain.steps[2].transform,
            NoteTransform::DeleteRange {
                start: 0.0,
                end: 1.0,
                lanes: LaneSelection::only(["kick", "snare"]),
            }
        );
    }

    #[test]
    fn test_move_accepts_negative_offset() {
        let args = edit_args(&["--move", "1", "2", "-0.5"]);
        let chain = build_chain(&AppConfig::default(), &args).unwrap();
        assert_eq!(
            chain.steps[0].transform,
            NoteTransform::MoveRange {
                start: 1.0,
                end: 2.0,
                offset: -0.5,
                lanes: LaneSelection::All,
            }
        );
    }

    #[test]
    fn test_edit_writes_output_and_undo() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        let output = dir.path().join("out.json");
        std::fs::write(&input, r#"{"kick":[{"time":1.1,"velocity":100,"lane":"kick"}]}"#).unwrap();

        let mut args = edit_args(&["--quantize", "1", "--grid", "0.25", "--move", "0", "5", "1"]);
        args.pattern = input.clone();
        args.output = Some(output.clone());
        edit(&AppConfig::default(), &args).unwrap();
        assert_eq!(NoteStore::load(&output).unwrap().lane("kick").unwrap()[0].time, 2.0);

        args.undo = 1;
        edit(&AppConfig::default(), &args).unwrap();
        assert_eq!(NoteStore::load(&output).unwrap().lane("kick").unwrap()[0].time, 1.0);
    }

    #[test]
    fn test_render_requires_kit() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        std::fs::write(&input, "{}").unwrap();
        assert!(render(&AppConfig::default(), &input, &dir.path().join("out.wav"), 0.5).is_err());
    }
}
