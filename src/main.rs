#[cfg(not(feature = "cli"))]
compile_error!("The `inno-query` binary requires the `cli` feature. Build with `--features cli`.");

use clap::Parser;
use std::io::Write;
use std::process;

use idbq::cli;
use idbq::cli::app::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8) {
    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "idbq=warn",
            1 => "idbq=debug",
            _ => "idbq=trace",
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match cli::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let stdout = std::io::stdout();
    let mut writer: Box<dyn Write> = Box::new(stdout.lock());

    let result = match cli.command {
        Commands::Info { file, schema } => cli::info::execute(
            &cli::info::InfoOptions { file, schema },
            &config,
            &mut writer,
        ),

        Commands::Page { file, page } => cli::page::execute(
            &cli::page::PageOptions { file, page },
            &config,
            &mut writer,
        ),

        Commands::Get { file, schema, key } => cli::query::execute_get(
            &cli::query::GetOptions { file, schema, key },
            &config,
            &mut writer,
        ),

        Commands::Scan {
            file,
            schema,
            filters,
            columns,
        } => cli::query::execute_scan(
            &cli::query::ScanOptions {
                file,
                schema,
                filters,
                columns,
            },
            &config,
            &mut writer,
        ),

        Commands::Range {
            file,
            schema,
            from,
            to,
            columns,
        } => cli::query::execute_range(
            &cli::query::RangeOptions {
                file,
                schema,
                from,
                to,
                columns,
            },
            &config,
            &mut writer,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
