use std::{error::Error, fs, path::PathBuf, process::ExitCode};

use clap::Parser;
use log::info;

#[derive(Parser)]
#[command(name = "pasc")]
#[command(about = "Compiles a Pascal program to stack machine code")]
#[command(version)]
struct Cli {
    /// Pascal source file. The output is written to `<program name>.out`.
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("failed to run: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the program compiled.
fn run(cli: &Cli) -> Result<bool, Box<dyn Error>> {
    let src = fs::read_to_string(&cli.input)
        .map_err(|e| format!("could not read {}: {e}", cli.input.display()))?;

    let compiled = match pasc::compile(&src) {
        Ok(compiled) => compiled,
        Err(error) => {
            eprint!("{}", error.render(&src));
            return Ok(false);
        }
    };

    let out = PathBuf::from(format!("{}.out", compiled.program_name));
    fs::write(&out, &compiled.code)?;
    info!("wrote {}", out.display());
    Ok(true)
}
