//! frontend-intel CLI entry point

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use frontend_intel::cli::Command;
use frontend_intel::config::LOG_ENV;
use frontend_intel::{
    report, Cli, Config, Dialect, IntelError, OrchestrationService, OutputFormat, ProcessRequest,
    SourceUnit,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

/// Logs go to stderr so JSON on stdout stays clean
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> frontend_intel::Result<String> {
    let file = cli.command.file().clone();

    // 1. Check file exists and is a supported dialect
    if !file.exists() {
        return Err(IntelError::FileNotFound {
            path: file.display().to_string(),
        });
    }
    let dialect = Dialect::from_path(&file).map_err(|_| IntelError::UnsupportedLanguage {
        extension: extension_of(&file),
    })?;

    // 2. Load config and source
    let config = Config::load(cli.config.as_deref())?;
    let content = fs::read_to_string(&file)?;
    let path = file.display().to_string();
    tracing::debug!(path = %path, dialect = dialect.name(), bytes = content.len(), "read source");

    // 3. Build the request
    let mut request = ProcessRequest::new(path.clone(), content.clone(), cli.command.operation());
    let mut apply = false;
    match &cli.command {
        Command::Analyze {
            no_metrics,
            no_patterns,
            ..
        } => {
            request.options.analyze.include_metrics = !no_metrics;
            request.options.analyze.include_patterns = !no_patterns;
        }
        Command::Refactor(args) => {
            apply = args.apply;
            request.options.refactor = Some(args.operation.clone().into());
            request.options.dry_run = Some(!args.apply);
        }
        Command::Optimize { .. } | Command::Full { .. } => {}
    }

    // 4. Process
    let service = OrchestrationService::new(config);
    let result = service.process(request).await?;

    // 5. Commit when asked to
    if apply {
        if let Some(plan) = &result.plan {
            let unit = SourceUnit::with_dialect(path.clone(), content, dialect);
            let updated = plan.commit(&unit)?;
            if !plan.is_noop() {
                fs::write(&file, updated.text())?;
            }
            tracing::info!(path = %path, edits = plan.edits.len(), "refactoring applied");
        }
    }

    // 6. Render
    match cli.format {
        OutputFormat::Json => serde_json::to_string_pretty(&result).map_err(|e| IntelError::Serialization {
            message: e.to_string(),
        }),
        OutputFormat::Text => Ok(report::format_result(&result)),
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_string()
}
