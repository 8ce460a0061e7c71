use anyhow::{Context, Result};
use colored::*;
use vm::{Engine, Registers, Statistics, StopReason, Tally};

const WORDS_PER_LINE: u32 = 8;

pub fn print_stop(reason: StopReason, stats: &Statistics) {
    let label = match reason {
        StopReason::Requested => "stop requested".green(),
        StopReason::Metered => "instruction budget spent".yellow(),
        StopReason::IterationLimit => "iteration limit reached".yellow(),
    };
    println!(
        "{} {} after {} instructions ({} ticks)",
        "■".bold(),
        label,
        stats.instructions,
        stats.ticks
    );
}

pub fn print_registers(regs: &Registers) {
    println!("{}", "Registers".bold().blue());
    println!(
        "  psb {:<4} running {:<5} wdc {} xts 0x{:04x} mp {}",
        regs.psb, regs.running, regs.wdc, regs.xts, regs.mp
    );
    println!(
        "  pc 0x{:04x} lf 0x{:04x} gf 0x{:08x} gfi {} cb 0x{:08x} mds 0x{:08x}",
        regs.pc, regs.lf, regs.gf, regs.gfi, regs.cb, regs.mds
    );
    let stack: Vec<String> = regs.live_stack().iter().map(|w| format!("{w:04x}")).collect();
    println!("  stack [{}]", stack.join(" "));
}

pub fn print_tally(tally: &Tally) {
    println!("{}", "Statistics".bold().blue());
    println!(
        "  instructions {} traps {} faults {} switches {} idle {}",
        tally.instructions, tally.traps, tally.faults, tally.process_switches, tally.idle_passes
    );
}

/// Parse `ADDRESS:COUNT`, address in hex (optional `0x`), count in decimal.
pub fn parse_dump(spec: &str) -> Result<(u32, u32)> {
    let (address, count) = spec
        .split_once(':')
        .with_context(|| format!("Dump range {spec:?} is not ADDRESS:COUNT"))?;
    let address = address.trim_start_matches("0x");
    let address = u32::from_str_radix(address, 16).with_context(|| format!("Bad dump address {address:?}"))?;
    let count = count.parse().with_context(|| format!("Bad dump count {count:?}"))?;
    Ok((address, count))
}

/// One line of a dump; unmapped words show as `????`.
pub fn format_line(address: u32, words: &[Option<u16>]) -> String {
    let cells: Vec<String> = words
        .iter()
        .map(|word| match word {
            Some(word) => hex::encode(word.to_be_bytes()),
            None => "????".to_string(),
        })
        .collect();
    format!("{address:08x}: {}", cells.join(" "))
}

/// Dump `count` virtual words starting at `start`.
pub fn dump_words(engine: &mut Engine, start: u32, count: u32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut address = start;
    let end = start.saturating_add(count);
    while address < end {
        let run = WORDS_PER_LINE.min(end - address);
        let words: Vec<Option<u16>> = (address..address + run).map(|a| engine.fetch(a).ok()).collect();
        lines.push(format_line(address, &words));
        address += run;
    }
    lines
}
