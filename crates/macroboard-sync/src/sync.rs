use crate::api::HttpClient;
use crate::config::{ColumnMap, Config};
use crate::endp::fred::{Fred, SeriesValue};
use crate::endp::monday::{Item, Monday};
use crate::report::RunSummary;
use crate::routing::Route;
use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use serde_json::{json, Map, Value};
use tokio_stream::{self as stream, StreamExt};
use tracing::{debug, error, info};

//////////////////////////////////////////////////////////////////////////////////////
//
// One full pass over the board: enumerate, fetch, route, write, report
//
//////////////////////////////////////////////////////////////////////////////////////

pub const SOURCE_LABEL: &str = "FRED";

pub async fn run(http_client: &HttpClient, cfg: &Config, dry_run: bool) -> Result<RunSummary> {
    let items = Monday::items(http_client, cfg).await?;
    info!("{} rows enumerated from board {}", items.len(), cfg.board_id);

    let mut summary = RunSummary::default();
    let mut stream = stream::iter(items);
    while let Some(item) = stream.next().await {
        let symbol = symbol_of(&item, &cfg.columns.symbol);
        if symbol.is_empty() {
            // blank symbol means the row is maintained by hand
            debug!("[{}] no symbol; skipped", item.name);
            summary.record_skip();
            continue;
        }

        match sync_row(http_client, cfg, &item, &symbol, dry_run).await {
            Ok(update) => {
                println!(
                    "{} {symbol} -> {} ({})",
                    "✓".green(),
                    update.value,
                    update.dated,
                );
                summary.record_update();
            }
            Err(e) => {
                println!("{} {symbol} failed: {e:#}", "✗".red());
                error!("[{}] {symbol} ({}) failed: {e:#}", item.name, item.id);
                summary.record_failure(&item, &symbol, &e);
            }
        }
    }

    Ok(summary)
}

/// Sync a single row; every error in here is recoverable and only fails the
/// row itself.
async fn sync_row(
    http_client: &HttpClient,
    cfg: &Config,
    item: &Item,
    symbol: &str,
    dry_run: bool,
) -> Result<RowUpdate> {
    let latest = Fred::latest(http_client, cfg, symbol).await?;
    let route = cfg.routing.route(symbol, item.group_title());
    let update = RowUpdate::compose(item, symbol, route, &latest, &cfg.columns);
    debug!(
        "[{}] {symbol} routed to {route:?}; delta {:?}",
        item.name, update.delta
    );

    if dry_run {
        info!("dry run; row {} left untouched", item.id);
        return Ok(update);
    }

    Monday::update_item(http_client, cfg, &item.id, &update.values).await?;
    Ok(update)
}

fn symbol_of(item: &Item, column: &str) -> String {
    item.text_of(column)
        .unwrap_or_default()
        .trim()
        .to_uppercase()
}

//////////////////////////////////////////////////////////////////////////////////////

/// Everything written to one row, composed in full before the mutation goes
/// out.
#[derive(Debug)]
pub struct RowUpdate {
    pub values: Map<String, Value>,
    pub value: f64,
    pub delta: Option<f64>,
    pub dated: String,
}

impl RowUpdate {
    /// Route, round, diff against the previous cell text, and lay out the
    /// column values of the batched write.
    ///
    /// The non-target column is always cleared so a row never shows stale
    /// data in both columns at once.
    pub fn compose(
        item: &Item,
        symbol: &str,
        route: Route,
        latest: &SeriesValue,
        columns: &ColumnMap,
    ) -> Self {
        let (target, cleared, value, delta_places) = match route {
            Route::Rate => (&columns.rate, &columns.index, round_to(latest.value, 2), 2),
            Route::Index => (&columns.index, &columns.rate, latest.value, 6),
        };

        let previous = parse_previous(item.text_of(target).unwrap_or_default());
        let delta = previous.map(|prev| round_to(value - prev, delta_places));

        let dated = if latest.dated.is_empty() {
            Utc::now().format("%Y-%m-%d").to_string()
        } else {
            latest.dated.clone()
        };

        let mut values = Map::new();
        values.insert(target.clone(), Value::String(value.to_string()));
        values.insert(cleared.clone(), Value::String(String::new()));
        values.insert(columns.date.clone(), json!({ "date": &dated }));
        values.insert(
            columns.source.clone(),
            Value::String(SOURCE_LABEL.to_string()),
        );
        values.insert(columns.symbol.clone(), Value::String(symbol.to_string()));
        if let (Some(delta_column), Some(delta)) = (&columns.delta, delta) {
            values.insert(delta_column.clone(), Value::String(delta.to_string()));
        }

        RowUpdate {
            values,
            value,
            delta,
            dated,
        }
    }
}

/// Previous cell text as a number: `"4.50%"` -> `4.5`, `"1,234.56"` ->
/// `1234.56`. Anything unparseable means no delta.
fn parse_previous(text: &str) -> Option<f64> {
    let cleaned = text.trim().trim_end_matches('%').replace(',', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endp::monday::{ColumnText, Group};

    fn columns(delta: Option<&str>) -> ColumnMap {
        ColumnMap {
            symbol: "symbol".to_string(),
            rate: "current_rate".to_string(),
            index: "current_index".to_string(),
            date: "last_updated".to_string(),
            source: "source".to_string(),
            delta: delta.map(|id| id.to_string()),
        }
    }

    fn item(symbol: Option<&str>, group: Option<&str>, cells: &[(&str, &str)]) -> Item {
        let mut column_values = vec![ColumnText {
            id: "symbol".to_string(),
            text: symbol.map(|s| s.to_string()),
        }];
        column_values.extend(cells.iter().map(|(id, text)| ColumnText {
            id: id.to_string(),
            text: Some(text.to_string()),
        }));
        Item {
            id: "123".to_string(),
            name: "10Y Treasury".to_string(),
            group: group.map(|title| Group {
                title: title.to_string(),
            }),
            column_values,
        }
    }

    fn latest(value: f64, dated: &str) -> SeriesValue {
        SeriesValue {
            value,
            dated: dated.to_string(),
        }
    }

    #[test]
    fn rate_update_writes_every_configured_column() {
        let row = item(Some("DGS10"), Some("Rates"), &[("current_rate", "4.20")]);
        let update = RowUpdate::compose(
            &row,
            "DGS10",
            Route::Rate,
            &latest(4.35, "2024-03-01"),
            &columns(Some("delta")),
        );

        assert_eq!(update.values["current_rate"], "4.35");
        assert_eq!(update.values["current_index"], "");
        assert_eq!(update.values["last_updated"], json!({ "date": "2024-03-01" }));
        assert_eq!(update.values["source"], "FRED");
        assert_eq!(update.values["symbol"], "DGS10");
        assert_eq!(update.values["delta"], "0.15");
        assert_eq!(update.delta, Some(0.15));
    }

    #[test]
    fn index_update_clears_the_rate_column() {
        let row = item(Some("SP500"), Some("Index"), &[("current_index", "5,137.08")]);
        let update = RowUpdate::compose(
            &row,
            "SP500",
            Route::Index,
            &latest(5254.35, "2024-03-28"),
            &columns(None),
        );

        assert_eq!(update.values["current_index"], "5254.35");
        assert_eq!(update.values["current_rate"], "");
        assert_eq!(update.delta, Some(117.27));
        // no delta column configured, so none goes out
        assert!(!update.values.contains_key("delta"));
    }

    #[test]
    fn rate_values_are_rounded_to_two_places() {
        let row = item(Some("DGS10"), None, &[]);
        let update = RowUpdate::compose(
            &row,
            "DGS10",
            Route::Rate,
            &latest(4.8349, "2024-03-01"),
            &columns(None),
        );
        assert_eq!(update.value, 4.83);
        assert_eq!(update.values["current_rate"], "4.83");
    }

    #[test]
    fn percent_suffixed_previous_text_still_yields_a_delta() {
        let row = item(Some("DGS10"), None, &[("current_rate", "4.50%")]);
        let update = RowUpdate::compose(
            &row,
            "DGS10",
            Route::Rate,
            &latest(4.83, "2024-03-01"),
            &columns(Some("delta")),
        );
        assert_eq!(update.delta, Some(0.33));
        assert_eq!(update.values["delta"], "0.33");
    }

    #[test]
    fn unparseable_previous_text_means_no_delta() {
        for previous in ["", "n/a", "--"] {
            let row = item(Some("DGS10"), None, &[("current_rate", previous)]);
            let update = RowUpdate::compose(
                &row,
                "DGS10",
                Route::Rate,
                &latest(4.83, "2024-03-01"),
                &columns(Some("delta")),
            );
            assert_eq!(update.delta, None, "{previous:?}");
            assert!(!update.values.contains_key("delta"), "{previous:?}");
        }
    }

    #[test]
    fn index_deltas_are_rounded_to_six_places() {
        let row = item(Some("CPIAUCSL"), None, &[("current_index", "310.326")]);
        let update = RowUpdate::compose(
            &row,
            "CPIAUCSL",
            Route::Index,
            &latest(310.32847712, "2024-03-01"),
            &columns(Some("delta")),
        );
        assert_eq!(update.delta, Some(0.002477));
    }

    #[test]
    fn missing_observation_date_falls_back_to_today() {
        let row = item(Some("DGS10"), None, &[]);
        let update = RowUpdate::compose(
            &row,
            "DGS10",
            Route::Rate,
            &latest(4.83, ""),
            &columns(None),
        );
        assert!(!update.dated.is_empty());
        assert_eq!(update.values["last_updated"], json!({ "date": &update.dated }));
    }

    #[test]
    fn parse_previous_handles_board_text_shapes() {
        assert_eq!(parse_previous("4.50%"), Some(4.5));
        assert_eq!(parse_previous("1,234.56"), Some(1234.56));
        assert_eq!(parse_previous(" 4.20 "), Some(4.2));
        assert_eq!(parse_previous("-0.25%"), Some(-0.25));
        assert_eq!(parse_previous(""), None);
        assert_eq!(parse_previous("pending"), None);
    }

    #[test]
    fn blank_and_whitespace_symbols_normalize_to_empty() {
        let blank = item(Some("   "), None, &[]);
        assert_eq!(symbol_of(&blank, "symbol"), "");

        let missing = item(None, None, &[]);
        assert_eq!(symbol_of(&missing, "symbol"), "");

        let lower = item(Some(" dgs10 "), None, &[]);
        assert_eq!(symbol_of(&lower, "symbol"), "DGS10");
    }
}
