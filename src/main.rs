use clap::Parser;
use shell_local::cli::Cli;
use shell_local::communicator::LocalCommunicatorFactory;
use shell_local::config::load_raw;
use shell_local::error::Result;
use shell_local::ui::{ConsoleUi, Ui};
use shell_local::Provisioner;
use std::process::ExitCode;

/// Exit code used when the run is interrupted with Ctrl-C.
const INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let ui = ConsoleUi::default();

    match run(&cli, &ui).await {
        Ok(Outcome::Completed) => ExitCode::SUCCESS,
        Ok(Outcome::Interrupted) => {
            ui.error("Interrupted; the local command was terminated.");
            ExitCode::from(INTERRUPTED)
        }
        Err(e) => {
            ui.error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

enum Outcome {
    Completed,
    Interrupted,
}

async fn run(cli: &Cli, ui: &dyn Ui) -> Result<Outcome> {
    let mut raws = cli
        .configs
        .iter()
        .map(|path| load_raw(path))
        .collect::<Result<Vec<_>>>()?;
    raws.push(cli.override_blob()?);

    let mut provisioner = Provisioner::new();
    provisioner.prepare(&raws)?;

    let factory = LocalCommunicatorFactory::new();
    let outcome = {
        let run = provisioner.provision(ui, &factory);
        tokio::select! {
            result = run => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        }
    };

    match outcome {
        Some(result) => result.map(|()| Outcome::Completed),
        None => {
            provisioner.cancel();
            Ok(Outcome::Interrupted)
        }
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}
