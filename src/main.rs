use clap::Parser;
use leakguard::cli::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let exit_code = cli.run()?;
    std::process::exit(exit_code);
}
