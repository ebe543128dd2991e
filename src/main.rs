use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{Parser, Subcommand};
use manchester_link::line::{EdgeWorker, LoopbackLine, SimulatedLink};
use manchester_link::phy::{Frame, LinkConfig, Pacer, PhyDecoder, PhyEncoder};
use manchester_link::ui::progress::{ProgressManager, templates};
use manchester_link::ui::{print_banner, print_link_summary, print_stats};
use manchester_link::utils::logging::init_logging;
use rand::Rng;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON link configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Transfer speed in bits per second, overrides the config file
    #[arg(short, long, global = true)]
    bps: Option<u32>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send frames over a virtual-time line and decode them
    Simulate {
        #[arg(short, long, default_value = "HELLO")]
        text: String,
        /// Edge jitter as a fraction of the half-period
        #[arg(short, long, default_value_t = 0.0)]
        jitter: f64,
        /// Random bytes put on the line before the first frame
        #[arg(long, default_value_t = 0)]
        noise_bytes: usize,
        #[arg(long, default_value_t = 1)]
        repeat: usize,
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
    /// Send frames in real time through a threaded receiver
    Loopback {
        #[arg(short, long, default_value = "HELLO")]
        text: String,
        /// Number of frames, 0 runs until Ctrl-C
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
    /// Print the edge trace of one frame as JSON
    Trace {
        #[arg(short, long, default_value = "HELLO")]
        text: String,
    },
}

fn load_config(cli: &Cli) -> Result<LinkConfig, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => LinkConfig::from_file(path)?,
        None => LinkConfig::default(),
    };
    if let Some(bps) = cli.bps {
        config.transfer_speed = bps;
    }
    config.validate()?;
    Ok(config)
}

fn simulate(
    config: &LinkConfig,
    text: &str,
    jitter: f64,
    noise_bytes: usize,
    repeat: usize,
    seed: u64,
) -> Result<(), Box<dyn Error>> {
    let timing = config.timing()?;
    let half_period = timing.half_period_ns() as i64;
    let jitter_ns = (timing.half_period_ns() as f64 * jitter.max(0.0)) as u64;
    let mut link = SimulatedLink::new(config)?.with_jitter(jitter_ns, seed);

    if noise_bytes > 0 {
        let mut rng = rand::rng();
        let noise: Vec<u8> = (0..noise_bytes).map(|_| rng.random()).collect();
        link.send_raw(&noise);
        link.idle_ns(half_period * i64::from(config.inter_frame_gap));
        info!("Put {} noise bytes on the line", noise_bytes);
    }

    for _ in 0..repeat {
        link.send(text.as_bytes())?;
    }
    info!(
        "Line carried {} edges over {:.3} s of virtual time",
        link.events().len(),
        link.events().last().map_or(0, |e| e.timestamp_ns) as f64 / 1e9
    );

    let progress = ProgressManager::new();
    progress.create_bar("recv", repeat as u64, templates::RECEIVER, "decoding")?;
    let mut decoder = PhyDecoder::new(timing, config.frame_format()?);
    let mut frames = Vec::new();
    for event in link.events() {
        if let Some(payload) = decoder.process_edge(event.edge, event.timestamp_ns) {
            progress.inc("recv", 1)?;
            frames.push(payload);
        }
    }
    progress.finish("recv", "done")?;
    for (i, payload) in frames.iter().enumerate() {
        println!("[{}] {}", i, String::from_utf8_lossy(payload));
    }
    if frames.len() != repeat {
        warn!("Received {} of {} frames", frames.len(), repeat);
    }
    print_stats(&decoder.stats(), Some(decoder.desync_count()));
    Ok(())
}

fn loopback(config: &LinkConfig, text: &str, count: usize) -> Result<(), Box<dyn Error>> {
    const BAR: &str = "send";
    let timing = config.timing()?;
    let format = config.frame_format()?;
    let frame = Frame::build_with_format(format, text.as_bytes())?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

    let worker = EdgeWorker::spawn(PhyDecoder::new(timing, format));
    let events = worker
        .sender()
        .ok_or("edge worker is not accepting events")?;
    let mut line = LoopbackLine::new(events);
    let mut encoder = PhyEncoder::new(timing, format, Pacer::new(timing.half_period()))
        .with_sync_bytes(config.sync_bytes)
        .with_inter_frame_gap(config.inter_frame_gap);

    let progress = ProgressManager::new();
    let bits_per_frame = encoder.bits_for_payload(frame.payload().len()) as u64;
    let mut sent = 0usize;
    let mut received = 0usize;

    // one bar, rewound for each frame
    progress.create_bar(BAR, bits_per_frame, templates::SENDER, text)?;
    while running.load(Ordering::SeqCst) && (count == 0 || sent < count) {
        progress.restart(BAR, &format!("frame {}", sent))?;
        encoder.send_frame_observed(&frame, &mut |level| line.drive(level), |n| {
            let _ = progress.set_position(BAR, n as u64);
        })?;
        sent += 1;

        match worker.frames().recv_timeout(Duration::from_secs(1)) {
            Ok(payload) => {
                received += 1;
                progress.set_message(
                    BAR,
                    &format!("frame {}: {}", sent - 1, String::from_utf8_lossy(&payload)),
                )?;
            }
            Err(_) => {
                progress.set_message(BAR, &format!("frame {}: lost", sent - 1))?;
                warn!("Frame {} was not received", sent);
            }
        }
    }
    progress.finish(BAR, &format!("{}/{} received", received, sent))?;

    drop(line);
    let stats = worker.finish();
    println!("Sent {} frame(s), received {}", sent, received);
    print_stats(&stats, None);
    Ok(())
}

fn trace(config: &LinkConfig, text: &str) -> Result<(), Box<dyn Error>> {
    let mut link = SimulatedLink::new(config)?;
    link.send(text.as_bytes())?;
    println!("{}", serde_json::to_string_pretty(link.events())?);
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Simulate {
            text,
            jitter,
            noise_bytes,
            repeat,
            seed,
        } => {
            print_banner();
            print_link_summary(&config);
            simulate(&config, &text, jitter, noise_bytes, repeat, seed)
        }
        Commands::Loopback { text, count } => {
            print_banner();
            print_link_summary(&config);
            loopback(&config, &text, count)
        }
        Commands::Trace { text } => trace(&config, &text),
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
