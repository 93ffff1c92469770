use std::collections::HashMap;
use std::time::Duration;

use chrono_tz::Tz;
use reqwest::Url;

use crate::canvas::CanvasConfig;
use crate::cli::Cli;
use crate::error::AppError;
use crate::notion::{NOTION_API, NotionConfig};
use crate::retry::RetryPolicy;
use crate::services::SyncOptions;

/// Upper bound for `--lookahead-days` and `--lookback-days` (about a century).
const MAX_WINDOW_DAYS: u32 = 36_500;

/// Validated settings for one run. Built before any network call.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub canvas: CanvasConfig,
    pub notion: NotionConfig,
    pub sync: SyncOptions,
}

impl SyncConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, AppError> {
        let canvas_base_url = parse_base_url(&required(cli.canvas_base_url, "--canvas-base-url", "CANVAS_BASE_URL")?)?;
        let canvas_token = required(cli.canvas_token, "--canvas-token", "CANVAS_TOKEN")?;
        let notion_token = required(cli.notion_token, "--notion-token", "NOTION_TOKEN")?;
        let notion_database_id =
            required(cli.notion_database_id, "--notion-database-id", "NOTION_DATABASE_ID")?;
        let course_ids = parse_course_ids(&required(cli.course_ids, "--course-ids", "COURSE_IDS")?)?;
        let course_name_overrides =
            parse_overrides(cli.course_name_overrides.as_deref().unwrap_or_default())?;

        let timezone: Tz = cli.timezone.trim().parse().map_err(|_| {
            AppError::Config(format!(
                "TIMEZONE `{}` is not an IANA timezone name (e.g. America/Phoenix)",
                cli.timezone
            ))
        })?;

        if cli.http_timeout_secs == 0 {
            return Err(AppError::Config(
                "--http-timeout-secs / HTTP_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        let lookahead_days = window_days(cli.lookahead_days, "--lookahead-days", "LOOKAHEAD_DAYS")?;
        let lookback_days = window_days(cli.lookback_days, "--lookback-days", "LOOKBACK_DAYS")?;
        let timeout = Duration::from_secs(cli.http_timeout_secs);
        let retry = RetryPolicy::with_max_retries(cli.max_retries);

        Ok(Self {
            canvas: CanvasConfig {
                base_url: canvas_base_url,
                access_token: canvas_token,
                timeout,
                retry,
            },
            notion: NotionConfig {
                api_base: NOTION_API.to_string(),
                api_token: notion_token,
                database_id: notion_database_id,
                timeout,
                retry,
            },
            sync: SyncOptions {
                course_ids,
                course_name_overrides,
                timezone,
                lookahead_days,
                lookback_days,
                include_undated: cli.include_undated,
                dry_run: cli.dry_run,
                write_delay: Duration::from_millis(cli.write_delay_ms),
            },
        })
    }
}

fn window_days(days: u32, flag: &str, env: &str) -> Result<i64, AppError> {
    if days > MAX_WINDOW_DAYS {
        return Err(AppError::Config(format!(
            "{} / {} must be at most {} days, got {}",
            flag, env, MAX_WINDOW_DAYS, days
        )));
    }
    Ok(i64::from(days))
}

fn required(value: Option<String>, flag: &str, env: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Config(format!("{} is not set (pass {} or set it in .env)", env, flag)))
}

fn parse_base_url(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim_end_matches('/');
    let url = Url::parse(trimmed)
        .map_err(|e| AppError::Config(format!("CANVAS_BASE_URL `{}` is not a valid URL: {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(AppError::Config(format!(
            "CANVAS_BASE_URL `{}` must be an http(s) URL",
            raw
        )));
    }
    Ok(trimmed.to_string())
}

fn parse_course_ids(raw: &str) -> Result<Vec<u64>, AppError> {
    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id = part
            .parse::<u64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| AppError::Config(format!("COURSE_IDS entry `{}` is not a Canvas course id", part)))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    if ids.is_empty() {
        return Err(AppError::Config(
            "COURSE_IDS is empty. Add a comma separated list of Canvas course IDs".to_string(),
        ));
    }
    Ok(ids)
}

fn parse_overrides(raw: &str) -> Result<HashMap<u64, String>, AppError> {
    let mut overrides = HashMap::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let parsed = part.split_once(':').and_then(|(id, name)| {
            let id = id.trim().parse::<u64>().ok()?;
            let name = name.trim();
            (!name.is_empty()).then(|| (id, name.to_string()))
        });
        let (id, name) = parsed.ok_or_else(|| {
            AppError::Config(format!(
                "COURSE_NAME_OVERRIDES entry `{}` must look like `224756:CSE 485`",
                part
            ))
        })?;
        overrides.insert(id, name);
    }
    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const BASE: [&str; 11] = [
        "canvas-notion-sync",
        "--canvas-base-url",
        "https://canvas.example.edu/",
        "--canvas-token",
        "canvas-secret",
        "--notion-token",
        "notion-secret",
        "--notion-database-id",
        "db123",
        "--course-ids",
        "224756, 231655,224756",
    ];

    fn cli(extra: &[&str]) -> Cli {
        let args: Vec<&str> = BASE.iter().copied().chain(extra.iter().copied()).collect();
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn builds_config_from_flags() {
        let config = SyncConfig::from_cli(cli(&[
            "--course-name-overrides",
            "224756:CSE 485, 231655:CSE 412",
            "--timezone",
            "America/New_York",
        ]))
        .unwrap();

        assert_eq!(config.canvas.base_url, "https://canvas.example.edu");
        assert_eq!(config.notion.database_id, "db123");
        assert_eq!(config.sync.course_ids, vec![224756, 231655]);
        assert_eq!(
            config.sync.course_name_overrides.get(&231655).map(String::as_str),
            Some("CSE 412")
        );
        assert_eq!(config.sync.timezone, chrono_tz::America::New_York);
        assert_eq!(config.sync.lookahead_days, 120);
        assert_eq!(config.sync.lookback_days, 7);
        assert!(!config.sync.dry_run);
        assert_eq!(config.canvas.timeout, Duration::from_secs(30));
        assert_eq!(config.notion.retry.max_retries, 3);
    }

    #[test]
    fn missing_value_names_the_env_var() {
        let mut parsed = cli(&[]);
        parsed.notion_token = None;
        let err = SyncConfig::from_cli(parsed).unwrap_err();
        assert!(matches!(&err, AppError::Config(msg) if msg.contains("NOTION_TOKEN")));

        let mut blank = cli(&[]);
        blank.canvas_token = Some("   ".to_string());
        let err = SyncConfig::from_cli(blank).unwrap_err();
        assert!(matches!(&err, AppError::Config(msg) if msg.contains("CANVAS_TOKEN")));
    }

    #[test]
    fn rejects_bad_base_url() {
        let mut parsed = cli(&[]);
        parsed.canvas_base_url = Some("canvas.example.edu".to_string());
        assert!(matches!(SyncConfig::from_cli(parsed), Err(AppError::Config(_))));

        let mut parsed = cli(&[]);
        parsed.canvas_base_url = Some("ftp://canvas.example.edu".to_string());
        assert!(matches!(SyncConfig::from_cli(parsed), Err(AppError::Config(_))));
    }

    #[test]
    fn rejects_bad_course_ids() {
        assert!(parse_course_ids("12,abc").is_err());
        assert!(parse_course_ids("0").is_err());
        assert!(parse_course_ids(" , ").is_err());
        assert_eq!(parse_course_ids("5,,6").unwrap(), vec![5, 6]);
    }

    #[test]
    fn rejects_bad_overrides_and_timezone() {
        assert!(parse_overrides("224756").is_err());
        assert!(parse_overrides("abc:Name").is_err());
        assert!(parse_overrides("12:").is_err());
        assert!(parse_overrides("").unwrap().is_empty());
        assert_eq!(
            parse_overrides("12:Intro: Part 2").unwrap().get(&12).map(String::as_str),
            Some("Intro: Part 2")
        );

        let mut parsed = cli(&[]);
        parsed.timezone = "Mars/Olympus".to_string();
        assert!(matches!(SyncConfig::from_cli(parsed), Err(AppError::Config(_))));
    }

    #[test]
    fn oversized_window_is_a_config_error() {
        let parsed = cli(&["--lookahead-days", "4294967295"]);
        let err = SyncConfig::from_cli(parsed).unwrap_err();
        assert!(matches!(&err, AppError::Config(msg) if msg.contains("LOOKAHEAD_DAYS")));

        let parsed = cli(&["--lookback-days", "36501"]);
        let err = SyncConfig::from_cli(parsed).unwrap_err();
        assert!(matches!(&err, AppError::Config(msg) if msg.contains("--lookback-days")));

        let config = SyncConfig::from_cli(cli(&["--lookahead-days", "36500"])).unwrap();
        assert_eq!(config.sync.lookahead_days, 36500);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let parsed = cli(&["--http-timeout-secs", "0"]);
        assert!(matches!(SyncConfig::from_cli(parsed), Err(AppError::Config(_))));
    }
}
