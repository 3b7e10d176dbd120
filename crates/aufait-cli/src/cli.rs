use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "aufait",
    about = "Aufait: reconcile package-publish events into build/test jobs",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// TOML config file (default: .aufait/config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Path to jobs JSONL
    #[arg(long, global = true)]
    pub jobs: Option<String>,

    /// Path to repositories JSONL
    #[arg(long, global = true)]
    pub repositories: Option<String>,

    /// Log filter, e.g. `info` or `aufait_engine=debug` (RUST_LOG wins)
    #[arg(long, global = true)]
    pub log: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile one package-publish event into job mutations
    Hook {
        /// Published package name
        package: String,

        /// Published version
        #[arg(value_name = "VERSION")]
        published_version: String,

        /// Actor recorded on the request scope
        #[arg(long, default_value = "hook")]
        actor: String,

        /// Print the plan without writing the jobs file
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Job store operations
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// Repository store operations
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },
}

#[derive(Subcommand)]
pub enum JobCommands {
    /// List jobs in id order
    List {
        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long, default_value_t = 100)]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one job
    Get {
        /// Job ID
        id: u64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count jobs
    Count {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete one job
    Delete {
        /// Job ID
        id: u64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move a job along the execution lifecycle
    Transition {
        /// Job ID
        id: u64,

        /// Target state
        #[arg(value_enum)]
        state: JobStateArg,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum RepoCommands {
    /// Register a repository
    Add {
        /// Repository name
        name: String,

        /// Declared constraint as `package=constraint` (repeatable)
        #[arg(long = "dep")]
        deps: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one repository
    Get {
        /// Repository name
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List repositories in name order
    List {
        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long, default_value_t = 100)]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count repositories
    Count {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete one repository
    Delete {
        /// Repository name
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Merge declared constraints into existing repositories
    Patch {
        /// JSON array of repositories to patch
        #[arg(long)]
        file: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Lifecycle targets an executor may request. Only reconciliation locks a job.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum JobStateArg {
    InProgress,
    Completed,
    Failed,
}
