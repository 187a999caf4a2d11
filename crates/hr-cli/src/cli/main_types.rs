use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "hr-cli")]
#[command(about = "Command line front end for the HR administration backend")]
#[command(version)]
#[command(after_help = "Examples:
  hr-cli config set --url https://proj.example.test --anon-key <KEY>
  hr-cli cost-center list                 # Active cost centers
  hr-cli cost-center watch                # Live listing, Ctrl-C to stop
  hr-cli audit-log list --limit 20        # Administrators only
  hr-cli me                               # Your employee record
  hr-cli employee upload employees.json   # Bulk upsert

Environment Variables:
  HR_URL            Backend project URL
  HR_ANON_KEY       Public API key
  HR_ACCESS_TOKEN   Access token of the signed-in user")]
pub struct Cli {
    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Custom configuration directory path
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Access token of the signed-in user
    #[arg(long, global = true, env = "HR_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configuration management (show, set)
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Manage cost centers
    CostCenter {
        #[command(subcommand)]
        command: CostCenterCommands,
    },
    /// Browse the audit log (administrators)
    AuditLog {
        #[command(subcommand)]
        command: AuditLogCommands,
    },
    /// Show your own employee record
    Me(OutputArgs),
    /// Roles and role permissions
    Role {
        #[command(subcommand)]
        command: RoleCommands,
    },
    /// Create, update, upload and deactivate employees
    Employee {
        #[command(subcommand)]
        command: EmployeeCommands,
    },
    /// Environment promotion progress
    Promotion {
        #[command(subcommand)]
        command: PromotionCommands,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the current configuration
    Show,
    /// Set configuration values
    #[command(after_help = "Examples:
  hr-cli config set --url http://localhost:54321
  hr-cli config set --anon-key eyJhbGciOi...")]
    Set {
        /// Backend project URL
        #[arg(long)]
        url: Option<String>,
        /// Public (anon) API key
        #[arg(long)]
        anon_key: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum CostCenterCommands {
    /// List active cost centers
    List(OutputArgs),
    /// Create a cost center
    Create {
        /// Unique short code, e.g. CC-100
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Update fields of a cost center
    Update {
        id: Uuid,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Deactivate a cost center (the record is kept)
    Delete { id: Uuid },
    /// Keep the listing on screen and refresh it on every change
    Watch,
}

#[derive(Subcommand, Debug)]
pub enum AuditLogCommands {
    /// List audit log entries
    List {
        /// Maximum number of entries to show
        #[arg(long, default_value = "50")]
        limit: usize,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum RoleCommands {
    /// Request a new role
    Create {
        /// Lowercase name with underscores, e.g. payroll_officer
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Show which role holds which permission
    Permissions(OutputArgs),
    /// Grant or revoke a permission
    #[command(after_help = "Examples:
  hr-cli role toggle hr_staff cost_centers.update")]
    Toggle {
        /// Role name, e.g. hr_staff
        role: String,
        /// Permission key, e.g. cost_centers.update
        permission: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum EmployeeCommands {
    /// Create or update one employee by employee id
    Upsert(EmployeeArgs),
    /// Upsert every employee in a JSON file
    Upload {
        /// JSON array of employee records
        file: PathBuf,
        /// Validate only, send nothing
        #[arg(long)]
        dry_run: bool,
    },
    /// Check a JSON upload file without sending it
    Validate { file: PathBuf },
    /// Set an employee's status to inactive
    Delete { employee_id: String },
}

#[derive(Args, Debug, Clone, Default)]
pub struct EmployeeArgs {
    pub employee_id: String,
    /// Treat as an edit of an existing employee
    #[arg(long)]
    pub edit: bool,
    #[arg(long)]
    pub english_name: Option<String>,
    #[arg(long)]
    pub arabic_name: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub position: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub personal_email: Option<String>,
    #[arg(long)]
    pub work_phone: Option<String>,
    #[arg(long)]
    pub nationality: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub date_of_joining: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub birth_date: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum PromotionCommands {
    /// Render a simulated promotion run
    Demo {
        /// Step that should fail, by id
        #[arg(long)]
        fail_step: Option<String>,
    },
}
