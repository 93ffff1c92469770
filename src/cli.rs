use clap::Parser;

/// Every option falls back to an environment variable, so a `.env` file is
/// usually all a scheduled run needs.
#[derive(Debug, Parser)]
#[command(name = "canvas-notion-sync")]
#[command(about = "Upsert due Canvas assignments and quizzes into a Notion database")]
#[command(version)]
pub struct Cli {
    /// Canvas instance root, e.g. https://canvas.asu.edu
    #[arg(long, env = "CANVAS_BASE_URL", value_name = "URL")]
    pub canvas_base_url: Option<String>,

    /// Canvas personal access token
    #[arg(long, env = "CANVAS_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub canvas_token: Option<String>,

    /// Notion integration token
    #[arg(long, env = "NOTION_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub notion_token: Option<String>,

    /// Target Notion database
    #[arg(long, env = "NOTION_DATABASE_ID", value_name = "ID")]
    pub notion_database_id: Option<String>,

    /// Comma separated Canvas course IDs
    #[arg(long, env = "COURSE_IDS", value_name = "IDS")]
    pub course_ids: Option<String>,

    /// Class names to show instead of the Canvas course code, e.g. `224756:CSE 485,231655:CSE 412`
    #[arg(long, env = "COURSE_NAME_OVERRIDES", value_name = "ID:NAME,...")]
    pub course_name_overrides: Option<String>,

    /// IANA timezone used for the Due and Time columns
    #[arg(long, env = "TIMEZONE", default_value = "America/Phoenix")]
    pub timezone: String,

    /// Skip items due more than this many days ahead
    #[arg(long, env = "LOOKAHEAD_DAYS", default_value_t = 120)]
    pub lookahead_days: u32,

    /// Skip items that were due more than this many days ago
    #[arg(long, env = "LOOKBACK_DAYS", default_value_t = 7)]
    pub lookback_days: u32,

    /// Also sync items without a due date
    #[arg(long, env = "INCLUDE_UNDATED")]
    pub include_undated: bool,

    /// Log the planned writes without touching Notion
    #[arg(long)]
    pub dry_run: bool,

    /// Per-request timeout
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Retries for rate limits and transient failures
    #[arg(long, env = "MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Pause between Notion writes
    #[arg(long, env = "WRITE_DELAY_MS", default_value_t = 150)]
    pub write_delay_ms: u64,
}
