use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::{Path, PathBuf};
use vm::{Counters, HostInterface, Memory, Metering, Statistics};

mod machine;
mod report;

use machine::MachineFile;

/// Boot a Mesa processor image and run it
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Machine description (JSON)
    machine: PathBuf,

    /// Stop after this many passes of the interpreter loop
    #[arg(short, long)]
    max_iterations: Option<u64>,

    /// Stop after this many instructions
    #[arg(short, long)]
    budget: Option<u64>,

    /// Write a snapshot here when the run ends
    #[arg(short, long)]
    save: Option<PathBuf>,

    /// Dump virtual words after the run, as ADDRESS:COUNT (hex address)
    #[arg(short, long)]
    dump: Vec<String>,

    /// Trace every instruction, trap and process switch
    #[arg(short, long)]
    verbose: bool,
}

/// Prints panel codes as they are posted.
#[derive(Debug, Default)]
struct Console {
    checkpoints: u64,
}

impl HostInterface for Console {
    fn accept_mp(&mut self, code: u16) {
        println!("{} {}", "MP".bold().yellow(), code);
    }

    fn on_checkpoint(&mut self, _memory: &Memory, stats: &Statistics, refresh: bool) {
        self.checkpoints += 1;
        if refresh {
            println!("checkpoint {}: {} instructions", self.checkpoints, stats.instructions);
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let machine = MachineFile::load(&args.machine)?;
    let base = args.machine.parent().unwrap_or(Path::new("."));
    let counters = match args.budget {
        Some(budget) => Counters::with_budget(budget),
        None => Counters::default(),
    };
    let meter: Box<dyn Metering> = Box::new(counters.clone());
    let mut engine = machine::build(&machine, base)?
        .with_metering(meter)
        .with_host(Box::new(Console::default()));
    engine.verbose |= args.verbose;

    println!(
        "{} {:?} model, {} real pages",
        "Mesa".bold().blue(),
        engine.config().architecture,
        engine.mem.real_pages()
    );

    match &machine.snapshot {
        Some(path) => {
            let snapshot = machine::read_snapshot(&base.join(path))?;
            engine.restore(&snapshot).context("Snapshot does not fit this machine")?;
        }
        None => engine.boot().context("Boot failed")?,
    }
    if machine.interrupts != 0 {
        engine.wakeups().post_interrupts(machine.interrupts);
    }

    let outcome = match args.max_iterations {
        Some(limit) => engine.run_for(limit),
        None => engine.run(),
    };

    println!();
    report::print_registers(&engine.regs);
    report::print_tally(&counters.tally());
    for spec in &args.dump {
        let (start, count) = report::parse_dump(spec)?;
        for line in report::dump_words(&mut engine, start, count) {
            println!("  {line}");
        }
    }
    if let Some(path) = &args.save {
        machine::write_snapshot(path, &engine.snapshot())?;
        println!("📝 Snapshot written to: {}", path.display());
    }

    let reason = outcome.context("Engine stopped on an error")?;
    report::print_stop(reason, &engine.statistics());
    Ok(())
}
