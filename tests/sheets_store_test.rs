//! Sheets adapter tests against a stubbed values API
//!
//! `SheetsStore::new` points the adapter at a local wiremock server, the
//! same seam `SHEETS_API_BASE` offers in production. Covers the row-offset
//! arithmetic of the linear scan, update-vs-append on a vanished row and
//! worksheet auto-creation on the 400 "no such range" response.

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fotobonus::loyalty::{Tier, TransactionRecord, TxKind};
use fotobonus::store::{RecordStore, SheetsStore};

const SHEET: &str = "wb1";

fn store_for(server: &MockServer) -> SheetsStore {
    SheetsStore::new(&server.uri(), SHEET, "test-token")
}

/// Header plus two data rows, the way the values API returns them.
fn clients_payload() -> serde_json::Value {
    json!({
        "range": "clients!A1:F1000",
        "majorDimension": "ROWS",
        "values": [
            ["phone", "name", "created_at", "turnover", "bonus_balance", "level"],
            ["+79001234567", "Анна", "2026-01-15T10:00:00", "9800", "120", "base"],
            ["+79007654321", "Борис", "2026-02-01T09:30:00", "31000", "500", "gold"],
        ]
    })
}

async fn mount_clients_get(server: &MockServer, payload: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path_regex(format!("/v4/spreadsheets/{}/values/clients$", SHEET)))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload))
        .mount(server)
        .await;
}

#[tokio::test]
async fn find_customer_scans_past_the_header() {
    let server = MockServer::start().await;
    mount_clients_get(&server, clients_payload()).await;
    let store = store_for(&server);

    let customer = store.find_customer("+79007654321").await.unwrap().unwrap();
    assert_eq!(customer.name, "Борис");
    assert_eq!(customer.turnover, 31000.0);
    assert_eq!(customer.tier, Tier::Gold);

    // The header cell "phone" is never treated as a data row
    assert!(store.find_customer("phone").await.unwrap().is_none());
    assert!(store.find_customer("+70000000000").await.unwrap().is_none());
}

#[tokio::test]
async fn update_rewrites_the_matching_sheet_row() {
    let server = MockServer::start().await;
    mount_clients_get(&server, clients_payload()).await;

    // Борис sits on sheet row 3: header is row 1, Анна row 2
    Mock::given(method("PUT"))
        .and(path_regex("/values/clients!A3:F3$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let mut customer = store.find_customer("+79007654321").await.unwrap().unwrap();
    customer.bonus_balance = 450.0;
    store.update_customer(&customer).await.unwrap();
}

#[tokio::test]
async fn update_appends_when_the_row_vanished() {
    let server = MockServer::start().await;
    // Only the header is left; the customer row was deleted under us
    mount_clients_get(
        &server,
        json!({
            "range": "clients!A1:F1",
            "majorDimension": "ROWS",
            "values": [["phone", "name", "created_at", "turnover", "bonus_balance", "level"]]
        }),
    )
    .await;

    Mock::given(method("POST"))
        .and(path_regex("/values/clients!A1:append$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let mut customer = fotobonus::loyalty::Customer::new("+79001234567", "Анна");
    customer.turnover = 10250.0;
    customer.tier = Tier::Silver;
    store.update_customer(&customer).await.unwrap();
}

#[tokio::test]
async fn ensure_tables_creates_missing_worksheets() {
    let server = MockServer::start().await;

    // A missing worksheet surfaces as 400 on the header-row probe
    Mock::given(method("GET"))
        .and(path_regex("/values/[a-z]+!1:1$"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Unable to parse range"))
        .expect(3)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex(":batchUpdate$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(3)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path_regex("/values/[a-z]+!A1$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(3)
        .mount(&server)
        .await;

    let store = store_for(&server);
    store.ensure_tables().await.unwrap();
}

#[tokio::test]
async fn transaction_rows_carry_kind_and_delta() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex("/values/transactions!A1:append$"))
        .and(body_string_contains("redeem"))
        .and(body_string_contains("-20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    store
        .append_transaction(&TransactionRecord::new(
            "+79001234567",
            TxKind::Redeem,
            0.0,
            -20.0,
            "Списание бонусов",
        ))
        .await
        .unwrap();
}
