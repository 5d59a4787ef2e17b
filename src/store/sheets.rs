//! Google Sheets implementation of the record store
//!
//! Talks to the Sheets v4 `values` REST API through reqwest. Every lookup is
//! a full-range fetch plus a linear scan, exactly what the backing service
//! offers; the scan never leaks past the [`RecordStore`] trait.
//!
//! Credentials come from the environment (`GSSHEETID`, `GSHEETS_TOKEN`).
//! When they are missing the store still constructs, but every operation
//! returns [`StoreError::NotConfigured`] so the bot keeps serving replies
//! instead of crashing.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{RecordStore, StoreError};
use crate::core::config;
use crate::loyalty::model::{Customer, IdentityLink, TransactionRecord};
use crate::loyalty::tier::Tier;
use async_trait::async_trait;

/// Worksheet holding customer rows
pub const CLIENTS_TABLE: &str = "clients";
/// Worksheet holding the append-only transaction log
pub const TX_TABLE: &str = "transactions";
/// Worksheet holding Telegram-user-to-phone links
pub const LINKS_TABLE: &str = "links";

const CLIENTS_HEADER: [&str; 6] = ["phone", "name", "created_at", "turnover", "bonus_balance", "level"];
const TX_HEADER: [&str; 6] = ["phone", "type", "amount", "bonus_delta", "ts", "comment"];
const LINKS_HEADER: [&str; 4] = ["telegram_id", "phone", "name", "linked_at"];

struct SheetsConfig {
    base_url: String,
    sheet_id: String,
    token: String,
}

/// Record store backed by a Google Sheets workbook.
pub struct SheetsStore {
    client: Client,
    config: Option<SheetsConfig>,
}

/// Response shape of `values/{range}` GET
#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

fn cell_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Lenient numeric parse for sheet cells: blank or garbage reads as zero,
/// the same way the workbook treats an empty cell.
fn parse_cell_f64(s: &str) -> f64 {
    s.trim().replace(',', ".").parse().unwrap_or(0.0)
}

fn cell(row: &[String], idx: usize) -> String {
    row.get(idx).cloned().unwrap_or_default()
}

fn customer_to_row(c: &Customer) -> Vec<String> {
    vec![
        c.phone.clone(),
        c.name.clone(),
        c.created_at.clone(),
        c.turnover.to_string(),
        c.bonus_balance.to_string(),
        c.tier.as_str().to_string(),
    ]
}

fn customer_from_row(row: &[String]) -> Customer {
    Customer {
        phone: cell(row, 0).trim().to_string(),
        name: cell(row, 1),
        created_at: cell(row, 2),
        turnover: parse_cell_f64(&cell(row, 3)),
        bonus_balance: parse_cell_f64(&cell(row, 4)),
        tier: Tier::parse(&cell(row, 5)),
    }
}

fn link_to_row(l: &IdentityLink) -> Vec<String> {
    vec![
        l.telegram_id.to_string(),
        l.phone.clone(),
        l.display_name.clone(),
        l.linked_at.clone(),
    ]
}

fn link_from_row(row: &[String]) -> IdentityLink {
    IdentityLink {
        telegram_id: cell(row, 0).trim().parse().unwrap_or(0),
        phone: cell(row, 1).trim().to_string(),
        display_name: cell(row, 2),
        linked_at: cell(row, 3),
    }
}

impl SheetsStore {
    /// Builds the store from `GSSHEETID` / `GSHEETS_TOKEN` / `SHEETS_API_BASE`.
    ///
    /// Missing credentials produce an unconfigured store that fails each
    /// operation with [`StoreError::NotConfigured`] instead of refusing to
    /// start the bot.
    pub fn from_env() -> Self {
        let config = match ((*config::SHEET_ID).clone(), (*config::SHEETS_TOKEN).clone()) {
            (Some(sheet_id), Some(token)) => Some(SheetsConfig {
                base_url: config::SHEETS_API_BASE.clone(),
                sheet_id,
                token,
            }),
            _ => {
                log::warn!("No Sheets credentials in env (GSSHEETID / GSHEETS_TOKEN); record store is unavailable");
                None
            }
        };

        Self {
            client: Client::new(),
            config,
        }
    }

    /// Explicit constructor, used by tests pointing at a local API stub.
    pub fn new(base_url: &str, sheet_id: &str, token: &str) -> Self {
        Self {
            client: Client::new(),
            config: Some(SheetsConfig {
                base_url: base_url.to_string(),
                sheet_id: sheet_id.to_string(),
                token: token.to_string(),
            }),
        }
    }

    /// Whether credentials were present at construction time.
    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    fn config(&self) -> Result<&SheetsConfig, StoreError> {
        self.config.as_ref().ok_or(StoreError::NotConfigured)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::Api { status, body })
        }
    }

    /// Fetches all rows of a range, header row included.
    async fn values_get(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let cfg = self.config()?;
        let url = format!("{}/v4/spreadsheets/{}/values/{}", cfg.base_url, cfg.sheet_id, range);
        let response = self.client.get(&url).bearer_auth(&cfg.token).send().await?;
        let value_range: ValueRange = Self::check(response).await?.json().await?;

        Ok(value_range
            .values
            .iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    async fn values_append(&self, table: &str, row: Vec<String>) -> Result<(), StoreError> {
        let cfg = self.config()?;
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}!A1:append?valueInputOption=RAW",
            cfg.base_url, cfg.sheet_id, table
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&cfg.token)
            .json(&json!({ "values": [row] }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn values_update(&self, range: &str, rows: Vec<Vec<String>>) -> Result<(), StoreError> {
        let cfg = self.config()?;
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}?valueInputOption=RAW",
            cfg.base_url, cfg.sheet_id, range
        );
        let response = self
            .client
            .put(&url)
            .bearer_auth(&cfg.token)
            .json(&json!({ "values": rows }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn add_sheet(&self, title: &str) -> Result<(), StoreError> {
        let cfg = self.config()?;
        let url = format!("{}/v4/spreadsheets/{}:batchUpdate", cfg.base_url, cfg.sheet_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&cfg.token)
            .json(&json!({
                "requests": [{ "addSheet": { "properties": { "title": title } } }]
            }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Linear scan for the sheet row whose `key_col` cell equals `key`.
    /// Returns the 1-based sheet row number and the row contents.
    async fn find_row(&self, table: &str, key_col: usize, key: &str) -> Result<Option<(usize, Vec<String>)>, StoreError> {
        let rows = self.values_get(table).await?;
        // Row 1 is the header
        for (idx, row) in rows.iter().enumerate().skip(1) {
            if cell(row, key_col).trim() == key {
                return Ok(Some((idx + 1, row.clone())));
            }
        }
        Ok(None)
    }

    async fn ensure_table(&self, table: &str, header: &[&str]) -> Result<(), StoreError> {
        let header_row: Vec<String> = header.iter().map(|s| s.to_string()).collect();
        match self.values_get(&format!("{}!1:1", table)).await {
            Ok(rows) if rows.is_empty() => {
                self.values_update(&format!("{}!A1", table), vec![header_row]).await?;
            }
            Ok(_) => {}
            // A missing worksheet surfaces as a 400 "Unable to parse range"
            Err(StoreError::Api { status, .. }) if status == reqwest::StatusCode::BAD_REQUEST => {
                log::info!("Creating missing worksheet '{}'", table);
                self.add_sheet(table).await?;
                self.values_update(&format!("{}!A1", table), vec![header_row]).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SheetsStore {
    async fn ensure_tables(&self) -> Result<(), StoreError> {
        self.ensure_table(CLIENTS_TABLE, &CLIENTS_HEADER).await?;
        self.ensure_table(TX_TABLE, &TX_HEADER).await?;
        self.ensure_table(LINKS_TABLE, &LINKS_HEADER).await?;
        Ok(())
    }

    async fn find_customer(&self, phone: &str) -> Result<Option<Customer>, StoreError> {
        let found = self.find_row(CLIENTS_TABLE, 0, phone.trim()).await?;
        Ok(found.map(|(_, row)| customer_from_row(&row)))
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        self.values_append(CLIENTS_TABLE, customer_to_row(customer)).await
    }

    async fn update_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        match self.find_row(CLIENTS_TABLE, 0, customer.phone.trim()).await? {
            Some((row_idx, _)) => {
                let range = format!("{}!A{}:F{}", CLIENTS_TABLE, row_idx, row_idx);
                self.values_update(&range, vec![customer_to_row(customer)]).await
            }
            // Row vanished between read and write; append rather than drop the state
            None => self.values_append(CLIENTS_TABLE, customer_to_row(customer)).await,
        }
    }

    async fn append_transaction(&self, tx: &TransactionRecord) -> Result<(), StoreError> {
        self.values_append(
            TX_TABLE,
            vec![
                tx.phone.clone(),
                tx.kind.as_str().to_string(),
                tx.amount.to_string(),
                tx.bonus_delta.to_string(),
                tx.at.clone(),
                tx.comment.clone(),
            ],
        )
        .await
    }

    async fn find_link(&self, telegram_id: i64) -> Result<Option<IdentityLink>, StoreError> {
        let key = telegram_id.to_string();
        let found = self.find_row(LINKS_TABLE, 0, &key).await?;
        Ok(found.map(|(_, row)| link_from_row(&row)))
    }

    async fn upsert_link(&self, link: &IdentityLink) -> Result<(), StoreError> {
        let key = link.telegram_id.to_string();
        match self.find_row(LINKS_TABLE, 0, &key).await? {
            Some((row_idx, _)) => {
                let range = format!("{}!A{}:D{}", LINKS_TABLE, row_idx, row_idx);
                self.values_update(&range, vec![link_to_row(link)]).await
            }
            None => self.values_append(LINKS_TABLE, link_to_row(link)).await,
        }
    }
}
