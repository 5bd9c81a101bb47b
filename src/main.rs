use clap::Parser;
use servo_spindle::{app::App, output::GpioOutputFactory, settings::Settings};
use std::{io, process};

const SETTINGS_PATH: &str = "./settings.yaml";

/// Drives a spindle servo from a G-code stream on stdin, echoing it to stdout.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// settings file, created with defaults when missing
    #[arg(long, default_value = SETTINGS_PATH)]
    settings: String,

    /// use the mock output instead of hardware
    #[arg(long)]
    dev_mode: bool,

    /// debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter(None, log::LevelFilter::Debug);
    } else if std::env::var_os("RUST_LOG").is_none() {
        builder.filter(None, log::LevelFilter::Info);
    }
    builder.target(env_logger::Target::Stderr);
    builder.init();

    let mut app = App::new(GpioOutputFactory);
    match Settings::from_file(&args.settings) {
        Ok(mut settings) => {
            settings.dev_mode |= args.dev_mode;
            app.configure(&settings);
        }
        Err(e) => log::error!("spindle disabled, {}: {}", args.settings, e),
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    if let Err(e) = app.run(stdin.lock(), stdout.lock()) {
        log::error!("line stream failed: {}", e);
        process::exit(1);
    }
}
