use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use webby::config::AppConfig;
use webby::routing::{RouteTarget, Verb};
use webby::{app, Kernel};

#[derive(Parser)]
#[command(name = "webby-cli")]
#[command(about = "Console runner for a Webby application", long_about = None)]
struct Cli {
    /// Config file; defaults are used when absent.
    #[arg(short, long, default_value = "webby.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch a command through the console pipeline
    Run {
        /// Command segments: module [directory] [command] [args...]
        segments: Vec<String>,
    },
    /// List the route table for a verb
    Routes {
        #[arg(short, long, default_value = "get")]
        verb: String,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        match webby::load_config(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        AppConfig::default()
    };

    webby::observability::init_logging(&config.observability.log_level);

    match cli.command {
        Commands::Run { segments } => run_command(config, &segments),
        Commands::Routes { verb } => list_routes(config, &verb),
        Commands::Config => print_config(&config),
    }
}

fn run_command(config: AppConfig, segments: &[String]) -> ExitCode {
    let kernel = match Kernel::builder(config)
        .routes(app::routes)
        .controllers(app::controllers)
        .middleware(app::middleware)
        .build()
    {
        Ok(k) => k,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let response = kernel.handle_cli(segments);
    println!("{}", response.body);
    if response.status < 400 {
        ExitCode::SUCCESS
    } else {
        eprintln!("Command failed with status {}", response.status);
        ExitCode::FAILURE
    }
}

fn list_routes(config: AppConfig, verb: &str) -> ExitCode {
    let Some(verb) = Verb::parse(verb) else {
        eprintln!("Error: unknown verb `{verb}`");
        return ExitCode::FAILURE;
    };

    let kernel = match Kernel::builder(config).routes(app::routes).build() {
        Ok(k) => k,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let table = kernel.routes_for(verb, None);
    for route in table.entries() {
        let target = match &route.target {
            RouteTarget::Path(p) => p.clone(),
            RouteTarget::Callback(_) => "<callback>".to_string(),
        };
        let name = route.name.as_deref().unwrap_or("-");
        println!("{:<40} {:<40} {}", route.pattern, target, name);
    }
    ExitCode::SUCCESS
}

fn print_config(config: &AppConfig) -> ExitCode {
    match serde_json::to_string_pretty(config) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
