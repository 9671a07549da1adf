//! CLI argument definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::refactor::{RefactorOperation, Selection};
use crate::service::Operation;

/// Static analysis, optimization hints and safe refactorings for TS/JS
#[derive(Parser, Debug)]
#[command(name = "frontend-intel")]
#[command(about = "Frontend code intelligence: complexity, React patterns, optimizations and safe refactorings")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output format
    #[arg(short, long, default_value = "text", value_enum, global = true)]
    pub format: OutputFormat,

    /// Config file (defaults to $FRONTEND_INTEL_CONFIG, then the user config dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Metrics, functions, components, patterns and hints
    Analyze {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Leave out the metrics section
        #[arg(long)]
        no_metrics: bool,

        /// Leave out rule patterns
        #[arg(long)]
        no_patterns: bool,
    },

    /// Ranked optimization suggestions
    Optimize {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Analysis, suggestions and dry-run plans for whole-file hints
    Full {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Preview or apply one refactoring
    Refactor(RefactorArgs),
}

#[derive(Args, Debug)]
pub struct RefactorArgs {
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Write the result back to FILE instead of previewing it
    #[arg(long)]
    pub apply: bool,

    #[command(subcommand)]
    pub operation: RefactorCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum RefactorCommand {
    /// Move complete statements into a new function
    ExtractFunction {
        #[arg(long)]
        start: usize,
        #[arg(long)]
        end: usize,
        #[arg(long)]
        name: String,
    },
    /// Move a JSX subtree into a new component
    ExtractComponent {
        #[arg(long)]
        start: usize,
        #[arg(long)]
        end: usize,
        #[arg(long)]
        name: String,
    },
    /// Toggle between function declaration and arrow function
    ConvertFunctionStyle {
        /// Byte offset inside the function
        #[arg(long)]
        at: usize,
    },
    RenameSymbol {
        /// Byte offset of the binding or any of its references
        #[arg(long)]
        at: usize,
        #[arg(long = "to")]
        new_name: String,
    },
    ExtractVariable {
        #[arg(long)]
        start: usize,
        #[arg(long)]
        end: usize,
        #[arg(long)]
        name: Option<String>,
    },
    InlineVariable {
        #[arg(long)]
        at: usize,
    },
    OrganizeImports,
    RemoveDeadCode,
}

impl From<RefactorCommand> for RefactorOperation {
    fn from(cmd: RefactorCommand) -> Self {
        match cmd {
            RefactorCommand::ExtractFunction { start, end, name } => Self::ExtractFunction {
                selection: Selection::new(start, end),
                name,
            },
            RefactorCommand::ExtractComponent { start, end, name } => Self::ExtractComponent {
                selection: Selection::new(start, end),
                name,
            },
            RefactorCommand::ConvertFunctionStyle { at } => Self::ConvertFunctionStyle { position: at },
            RefactorCommand::RenameSymbol { at, new_name } => Self::RenameSymbol { position: at, new_name },
            RefactorCommand::ExtractVariable { start, end, name } => Self::ExtractVariable {
                selection: Selection::new(start, end),
                name,
            },
            RefactorCommand::InlineVariable { at } => Self::InlineVariable { position: at },
            RefactorCommand::OrganizeImports => Self::OrganizeImports,
            RefactorCommand::RemoveDeadCode => Self::RemoveDeadCode,
        }
    }
}

/// Output format options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Text,
    /// Pretty JSON of the full result
    Json,
}

impl Command {
    pub fn file(&self) -> &PathBuf {
        match self {
            Self::Analyze { file, .. } | Self::Optimize { file } | Self::Full { file } => file,
            Self::Refactor(args) => &args.file,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::Analyze { .. } => Operation::Analyze,
            Self::Optimize { .. } => Operation::Optimize,
            Self::Full { .. } => Operation::FullAnalysis,
            Self::Refactor(_) => Operation::Refactor,
        }
    }
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
