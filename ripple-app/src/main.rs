//! Ripple - live host for the texture engine
//!
//! Runs the default input through the engine to the default output and takes
//! parameter changes from the console.

mod config;
mod console;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Receiver;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ripple_audio::{
    parse_value, Interaction, Meters, ParamId, Params, RippleEngine, NUM_LFOS, NUM_RIPPLE_BANDS,
};

use crate::console::{ConsoleCommand, HELP};

/// Largest block the engine is prepared for; longer callbacks are split
const MAX_BLOCK_SIZE: usize = 4096;

/// Input-to-output bridge length in seconds
const BRIDGE_SECONDS: f32 = 0.1;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let params = Arc::new(Params::new());
    let state_path = config::state_path();
    if let Err(e) = config::load_state_if_present(&params, &state_path) {
        warn!("{:#}", e);
    }

    let engine = RippleEngine::new(params.clone());
    let meters = engine.meters().clone();
    let interaction = engine.interaction().clone();

    // Streams stop when dropped
    let _streams = start_audio(engine)?;

    let (cmd_tx, cmd_rx) = crossbeam_channel::bounded(64);
    let _console = console::spawn_reader(cmd_tx).context("Failed to start console thread")?;
    println!("Ripple running. Type 'help' for commands.");

    let control = Control {
        params: params.clone(),
        meters,
        interaction,
        state_path: state_path.clone(),
    };
    run_control_loop(&control, &cmd_rx);

    if let Err(e) = config::save_state(&params, &state_path) {
        error!("{:#}", e);
    }
    info!("Shutting down");
    Ok(())
}

/// Open default devices, prepare the engine and start both streams
fn start_audio(mut engine: RippleEngine) -> anyhow::Result<(cpal::Stream, cpal::Stream)> {
    let host = cpal::default_host();
    let output = host
        .default_output_device()
        .context("No audio output device found")?;
    let input = host
        .default_input_device()
        .context("No audio input device found")?;

    let out_supported = output
        .default_output_config()
        .context("Failed to get output config")?;
    let in_supported = input
        .default_input_config()
        .context("Failed to get input config")?;
    if out_supported.sample_format() != cpal::SampleFormat::F32
        || in_supported.sample_format() != cpal::SampleFormat::F32
    {
        bail!(
            "Unsupported sample format (input {:?}, output {:?}); f32 required",
            in_supported.sample_format(),
            out_supported.sample_format()
        );
    }

    let out_config: cpal::StreamConfig = out_supported.into();
    let mut in_config: cpal::StreamConfig = in_supported.into();
    // Run the input at the output rate so the bridge needs no resampling
    in_config.sample_rate = out_config.sample_rate;

    let sample_rate = out_config.sample_rate.0;
    let out_channels = out_config.channels as usize;
    let in_channels = in_config.channels as usize;
    if in_channels == 0 || out_channels == 0 {
        bail!("Device reports zero channels");
    }

    engine
        .prepare(sample_rate as f64, MAX_BLOCK_SIZE)
        .context("Failed to prepare engine")?;
    info!(
        output = %output.name().unwrap_or_default(),
        input = %input.name().unwrap_or_default(),
        sample_rate,
        in_channels,
        out_channels,
        latency = engine.latency_samples(),
        "Audio devices opened"
    );

    // Pre-allocated bridge in output-channel layout
    let frames = ((sample_rate as f32 * BRIDGE_SECONDS) as usize).max(MAX_BLOCK_SIZE);
    let capacity = frames * out_channels;
    let (mut producer, mut consumer) = HeapRb::<f32>::new(capacity).split();

    let input_stream = input
        .build_input_stream(
            &in_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for frame in data.chunks_exact(in_channels) {
                    for ch in 0..out_channels {
                        // Overrun drops the newest samples
                        let _ = producer.try_push(frame[ch.min(in_channels - 1)]);
                    }
                }
            },
            |err| error!("Audio input error: {}", err),
            None,
        )
        .context("Failed to create input stream")?;

    let output_stream = output
        .build_output_stream(
            &out_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let filled = consumer.pop_slice(data);
                // Underrun: pad with silence
                data[filled..].fill(0.0);
                engine.process_interleaved(data, out_channels);
            },
            |err| error!("Audio output error: {}", err),
            None,
        )
        .context("Failed to create output stream")?;

    input_stream.play().context("Failed to start input")?;
    output_stream.play().context("Failed to start output")?;

    Ok((input_stream, output_stream))
}

/// Control-thread handles on the shared engine state
struct Control {
    params: Arc<Params>,
    meters: Arc<Meters>,
    interaction: Arc<Interaction>,
    state_path: PathBuf,
}

fn run_control_loop(control: &Control, cmd_rx: &Receiver<ConsoleCommand>) {
    loop {
        match cmd_rx.recv() {
            Ok(ConsoleCommand::Quit) | Err(_) => break,
            Ok(cmd) => control.handle(cmd),
        }
    }
}

impl Control {
    fn handle(&self, cmd: ConsoleCommand) {
        match cmd {
            ConsoleCommand::Set { id, value } => self.set(&id, &value),
            ConsoleCommand::Get(id) => match ParamId::from_id(&id) {
                Ok(param) => println!("{}", self.describe(param)),
                Err(e) => println!("{}", e),
            },
            ConsoleCommand::List => {
                for param in ParamId::ALL {
                    println!("{}", self.describe(param));
                }
            }
            ConsoleCommand::Meters => self.print_meters(),
            ConsoleCommand::Bypass(on) => {
                self.params.set(ParamId::Bypass, if on { 1.0 } else { 0.0 });
                info!(bypass = on, "Bypass changed");
            }
            ConsoleCommand::Touch { y, radius } => self.interaction.set(y, radius, true),
            ConsoleCommand::Release => self.interaction.release(),
            ConsoleCommand::Save(path) => {
                let path = path.unwrap_or_else(|| self.state_path.clone());
                if let Err(e) = config::save_state(&self.params, &path) {
                    error!("{:#}", e);
                }
            }
            ConsoleCommand::Load(path) => {
                let path = path.unwrap_or_else(|| self.state_path.clone());
                match config::load_state(&self.params, &path) {
                    Ok(report) if !report.is_current_version() => println!(
                        "Loaded {} values from a state with another version",
                        report.applied
                    ),
                    Ok(report) => println!("Loaded {} values", report.applied),
                    Err(e) => error!("{:#}", e),
                }
            }
            ConsoleCommand::Help => println!("{}", HELP),
            ConsoleCommand::Quit => {}
        }
    }

    fn set(&self, id: &str, value: &str) {
        let param = match ParamId::from_id(id) {
            Ok(p) => p,
            Err(e) => {
                println!("{}", e);
                return;
            }
        };
        match parse_value(param, value) {
            Ok(v) => {
                self.params.set(param, v);
                info!(param = param.id(), value = v, "Parameter set");
                println!("{}", self.describe(param));
            }
            Err(e) => println!("{}", e),
        }
    }

    fn describe(&self, param: ParamId) -> String {
        let info = param.info();
        format!(
            "{:<20} {:<20} {}",
            info.id,
            info.name,
            info.format(self.params.get(param))
        )
    }

    fn print_meters(&self) {
        let to_db = |level: f32| {
            if level > 0.0 {
                20.0 * level.log10()
            } else {
                f32::NEG_INFINITY
            }
        };
        println!(
            "in {:>7.1} dB   out {:>7.1} dB",
            to_db(self.meters.input_level()),
            to_db(self.meters.output_level())
        );

        let mut lfos = [0.0f32; NUM_LFOS];
        self.meters.lfo_values(&mut lfos);
        let lfo_line: Vec<String> = lfos.iter().map(|v| format!("{:.2}", v)).collect();
        println!("lfo {}", lfo_line.join(" "));

        let mut bands = [0.0f32; NUM_RIPPLE_BANDS];
        self.meters.ripple_bands(&mut bands);
        const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
        let bars: String = bands
            .iter()
            .map(|g| BARS[((g.clamp(0.0, 1.0) * 7.0).round() as usize).min(7)])
            .collect();
        println!("bands {}", bars);
    }
}
