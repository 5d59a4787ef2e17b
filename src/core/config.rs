use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: fotobonus.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "fotobonus.log".to_string()));

/// Spreadsheet ID of the loyalty workbook
/// Read from GSSHEETID environment variable
pub static SHEET_ID: Lazy<Option<String>> = Lazy::new(|| env::var("GSSHEETID").ok().filter(|s| !s.is_empty()));

/// OAuth bearer token for the Google Sheets API
/// Read from GSHEETS_TOKEN environment variable
pub static SHEETS_TOKEN: Lazy<Option<String>> = Lazy::new(|| env::var("GSHEETS_TOKEN").ok().filter(|s| !s.is_empty()));

/// Base URL of the Sheets API, overridable for local testing
/// Read from SHEETS_API_BASE environment variable
pub static SHEETS_API_BASE: Lazy<String> =
    Lazy::new(|| env::var("SHEETS_API_BASE").unwrap_or_else(|_| "https://sheets.googleapis.com".to_string()));

/// Parses a comma-separated list of Telegram IDs, skipping anything unparseable.
pub fn parse_admin_ids(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .collect()
}

/// Admin user IDs (comma-separated)
/// Read from ADMIN_IDS environment variable
pub static ADMIN_IDS: Lazy<Vec<i64>> = Lazy::new(|| {
    env::var("ADMIN_IDS")
        .ok()
        .map(|raw| parse_admin_ids(&raw))
        .unwrap_or_default()
});

/// Network configuration
pub mod network {
    use super::Duration;

    /// Timeout for Telegram API requests (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Retry configuration
pub mod retry {
    use super::Duration;

    /// Maximum number of retries for dispatcher reconnection
    pub const MAX_DISPATCHER_RETRIES: u32 = 5;

    /// Delay between dispatcher retry attempts (in seconds)
    pub const DISPATCHER_RETRY_DELAY_SECS: u64 = 5;

    /// Dispatcher retry delay duration
    pub fn dispatcher_delay() -> Duration {
        Duration::from_secs(DISPATCHER_RETRY_DELAY_SECS)
    }

    /// Base for exponential backoff calculation
    pub const EXPONENTIAL_BACKOFF_BASE: u64 = 2;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_ids_basic() {
        assert_eq!(parse_admin_ids("1,2,3"), vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_admin_ids_with_spaces_and_junk() {
        assert_eq!(parse_admin_ids(" 42 , foo, 7,"), vec![42, 7]);
    }

    #[test]
    fn test_parse_admin_ids_empty() {
        assert!(parse_admin_ids("").is_empty());
    }
}
