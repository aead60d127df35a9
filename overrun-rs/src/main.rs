use std::process::ExitCode;

use overrun::cli::{self, CliArgs};
use overrun::{Args, Builder, Config, Error, ExecError, RunOptions};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    // RUST_LOG=overrun=debug shows rendered commands.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("overrun: {e}");
            eprintln!("{}", cli::USAGE);
            return ExitCode::from(2);
        }
    };
    if args.help {
        println!("{}", cli::USAGE);
        return ExitCode::SUCCESS;
    }

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("overrun: {e}");
            match e {
                Error::Exec(ExecError::NonZeroExit { code, .. }) => exit_code(code),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(args: CliArgs) -> Result<ExitCode, Error> {
    let config = Config::from_environment();

    let mut values = Args::new();
    for a in &args.args {
        values.push(a.as_str());
    }
    for (name, value) in &args.defines {
        values.set(name.as_str(), value.as_str());
    }

    let mut cmd = Builder::with_config(args.template.as_str(), &config)
        .shell(args.shell)
        .warn_uncalled(!args.dry_run)
        .format(&values)?;

    if args.dry_run {
        println!("{cmd}");
        return Ok(ExitCode::SUCCESS);
    }

    let mut opts = RunOptions::new().verbose(args.verbose).quiet(args.quiet);
    if args.check {
        opts = opts.check(true);
    }

    if args.read {
        let out = cmd.read(&opts)?;
        println!("{out}");
        return Ok(ExitCode::SUCCESS);
    }

    let done = cmd.run(&opts)?;
    Ok(exit_code(done.code()))
}

/// Mirror the child's exit status; signals and out-of-range codes become 1.
fn exit_code(code: Option<i32>) -> ExitCode {
    match code.map(u8::try_from) {
        Some(Ok(c)) => ExitCode::from(c),
        _ => ExitCode::FAILURE,
    }
}
