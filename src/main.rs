// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{error::Error, io, path::PathBuf, thread};

use clap::{crate_version, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use keysampler::{
    batch::{validate_filter, Batch, BatchConfig},
    config::{Overrides, Profile},
    instrument,
    notes::parse_note_list,
    writer::WavFileWriter,
};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Render per-note audio samples from a local instrument plugin."
)]
struct Cli {
    /// Path to the instrument plugin. Use builtin:sine, builtin:saw or builtin:square for
    /// the built in synthesizer.
    plugin: String,
    /// Name of the plugin within the instrument file (if multiple plugins are present).
    #[arg(short, long)]
    plugin_name: Option<String>,
    /// Output subfolder name (defaults to plugin name).
    #[arg(short, long)]
    output: Option<String>,
    /// Maximum duration in seconds (default: 12.0).
    #[arg(short = 't', long)]
    max_duration: Option<f64>,
    /// Duration in seconds for which the note should be held (defaults to full duration).
    #[arg(short = 'd', long)]
    note_duration: Option<f64>,
    /// Comma-separated list of MIDI note numbers to render (default: all notes).
    #[arg(short, long)]
    notes: Option<String>,
    /// Don't trim silence at the start and end of samples.
    #[arg(short = 's', long)]
    keep_silence: bool,
    /// Maximum number of attempts if output is silent (default: 3).
    #[arg(short = 'a', long)]
    max_attempts: Option<usize>,
    /// Render sample rate in Hz (default: 44100).
    #[arg(long)]
    sample_rate: Option<u32>,
    /// Path to a YAML render profile.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Start rendering without waiting for the editor to be closed.
    #[arg(long)]
    no_editor: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Bad note numbers are rejected before the plugin is even loaded.
    let filter = cli.notes.as_deref().map(parse_note_list).transpose()?;
    if let Some(filter) = &filter {
        validate_filter(filter)?;
    }

    let profile = match &cli.config {
        Some(path) => Profile::load(path)?,
        None => Profile::default(),
    };
    let settings = profile.resolve(&Overrides {
        max_duration: cli.max_duration,
        note_duration: cli.note_duration,
        sample_rate: cli.sample_rate,
        max_attempts: cli.max_attempts,
        keep_silence: cli.keep_silence,
    })?;

    let instrument = instrument::load(&cli.plugin, cli.plugin_name.as_deref())?;
    let label = instrument::plugin_label(&cli.plugin, cli.plugin_name.as_deref());
    let writer = WavFileWriter::new(settings.output_format);
    let config = BatchConfig::new(&label, cli.output.as_deref(), settings);
    let mut batch = Batch::new(instrument, writer, config)?;

    let (closed_tx, closed_rx) = crossbeam_channel::bounded(1);
    if cli.no_editor || !batch.has_editor() {
        closed_tx.send(())?;
    } else {
        println!("Press Enter once you have closed the editor.");
        thread::spawn(move || {
            let mut line = String::new();
            let _ = io::stdin().read_line(&mut line);
            let _ = closed_tx.send(());
        });
    }
    batch.edit(closed_rx)?;

    let paths = batch.render_all(filter.as_ref())?;
    info!(
        count = paths.len(),
        output_dir = ?batch.config().output_dir(),
        "Rendering complete."
    );

    Ok(())
}
