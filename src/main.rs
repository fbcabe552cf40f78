use anyhow::Context;
use clap::Parser;
use jvmprof::cli::{Cli, Command};
use jvmprof::commands::PollOptions;
use jvmprof::cpu::NoiseFilter;
use jvmprof::error::exit_code;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS as u8),
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(err) = e.downcast_ref::<jvmprof::Error>() {
                ExitCode::from(err.exit_code() as u8)
            } else {
                ExitCode::from(exit_code::GENERAL_ERROR as u8)
            }
        }
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.validate()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("Invalid arguments")?;

    init_logging(cli.verbose);

    if let Some(Command::Completions { shell }) = cli.command {
        use clap::CommandFactory;
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "jvmprof", &mut std::io::stdout());
        return Ok(());
    }

    // Resolve the target JVM
    let pid = match (cli.pid, &cli.process) {
        (Some(pid), _) => pid,
        (_, Some(name)) => jvmprof::process::find_jvm_by_name(name)?,
        _ => unreachable!("validated in cli"),
    };
    let info = jvmprof::process::ProcessInfo::new(pid)?;
    let tools = jvmprof::jdk::JdkTools::locate()?;
    eprintln!("Profiling {} (PID {})", info.display_name(), info.pid());

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl-C handler")?;

    let opts = PollOptions {
        interval: cli.interval,
        iterations: cli.iterations,
        top: cli.top,
    };

    match cli.command {
        Some(Command::Memory { deltas }) => {
            jvmprof::commands::memory::run(&info, &tools, &opts, deltas, running)?;
        }
        Some(Command::Completions { .. }) => unreachable!("handled above"),
        None => {
            let filter = NoiseFilter::with_extra(&cli.filter_prefix);
            jvmprof::commands::profile::run(&info, &tools, &opts, filter, running)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
