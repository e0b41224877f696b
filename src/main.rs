use clap::Parser;
use std::process::ExitCode;
use trellis::cli::{run_cli, Cli};
use trellis::logging::init_logging;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_logging(&config.log) {
        eprintln!("warning: {err:#}");
    }

    let mut stdout = std::io::stdout().lock();
    match run_cli(&cli, &config, &mut stdout) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
