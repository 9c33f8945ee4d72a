//! Webmake CLI - assemble website HTML, CSS and JavaScript from source fragments.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "webmake")]
#[command(about = "Assemble website HTML, CSS and JavaScript from source fragments")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to webmake.toml config file
    #[arg(short, long, default_value = "webmake.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a webmake.toml and sample sources
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Build HTML, JavaScript and CSS targets
    Build {
        /// Build HTML entries, expanding includes tagged with FILTER
        #[arg(long, value_name = "FILTER", num_args = 0..=1, default_missing_value = "")]
        html: Option<String>,

        /// Build JavaScript bundles
        #[arg(long, value_name = "MODE", num_args = 0..=1, default_missing_value = "cat")]
        js: Option<JsModeArg>,

        /// Build stylesheets
        #[arg(long)]
        css: bool,

        /// Output directory (overrides settings.out)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Version for «V» and versioned CSS/JS names
        #[arg(long)]
        asset_version: Option<String>,
    },
}

/// JavaScript bundling mode.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum JsModeArg {
    /// Concatenate sources
    Cat,
    /// Minify with the Closure Compiler
    Cc,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    // Execute command
    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(&cli.config, yes)?;
        }
        Commands::Build {
            html,
            js,
            css,
            out,
            asset_version,
        } => {
            let options = commands::build::BuildOptions {
                html,
                js: js.map(|mode| match mode {
                    JsModeArg::Cat => webmake_build::JsMode::Concat,
                    JsModeArg::Cc => webmake_build::JsMode::Closure,
                }),
                css,
                out,
                asset_version,
            };
            commands::build::run(&cli.config, options)?;
        }
    }

    Ok(())
}
