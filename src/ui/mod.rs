pub mod progress;

use crate::phy::{DecoderStats, LinkConfig};

pub fn print_banner() {
    println!("manchester-link");
}

pub fn print_link_summary(config: &LinkConfig) {
    let half_period = config
        .timing()
        .map(|t| format!("{} ns", t.half_period_ns()))
        .unwrap_or_else(|e| format!("invalid ({})", e));
    println!(
        "  speed {} bps, half-period {}, preamble {:#x}/{}B",
        config.transfer_speed, half_period, config.preamble, config.preamble_width
    );
}

pub fn print_stats(stats: &DecoderStats, desyncs: Option<u64>) {
    println!(
        "  bits {}, frames ok {}, checksum failures {}",
        stats.bits, stats.frames_ok, stats.checksum_failures
    );
    if let Some(desyncs) = desyncs {
        println!("  clock lock lost {} time(s)", desyncs);
    }
}
