use anyhow::{Context, Result};
use clap::Parser;
use evict_reload::affinity;
use evict_reload::cli::Cli;
use evict_reload::error::BootstrapError;
use evict_reload::target::MonitoredTarget;
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Run the probe loop on the host's cache primitives
#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
fn probe(target: &MonitoredTarget, args: &Cli) -> Result<()> {
    use evict_reload::primitives::HardwareProbe;
    use evict_reload::probe::ProbeLoop;
    use evict_reload::report::ReportWriter;
    use std::io;

    let mut reports = ReportWriter::new(io::stdout().lock(), args.format);
    let mut probe = ProbeLoop::new(target, HardwareProbe::new(), args.probe_config());
    probe
        .run(&mut reports)
        .context("Failed to write hit report")?;
    Ok(())
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn probe(_target: &MonitoredTarget, _args: &Cli) -> Result<()> {
    anyhow::bail!("No cycle counter or cache flush primitives for this architecture");
}

fn run(args: &Cli) -> Result<()> {
    let target = MonitoredTarget::open(&args.path, args.target_offset())?;
    println!("{}", target.banner());

    if let Some(cpu) = args.cpu {
        if let Err(err) = affinity::pin_current_thread(cpu) {
            let allowed = affinity::allowed_cpus().unwrap_or_default();
            eprintln!(
                "Warning: could not pin to CPU {} ({}), running unpinned; allowed CPUs: {:?}",
                cpu, err, allowed
            );
            warn!(cpu, %err, ?allowed, "could not pin probe thread, running unpinned");
        }
    }

    probe(&target, args)
}

fn main() -> ExitCode {
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(err) if err.use_stderr() => {
            let _ = err.print();
            return ExitCode::from(BootstrapError::Usage(err.to_string()).exit_code());
        }
        Err(err) => {
            // --help / --version
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
    };

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            let code = err
                .downcast_ref::<BootstrapError>()
                .map_or(1, BootstrapError::exit_code);
            ExitCode::from(code)
        }
    }
}
