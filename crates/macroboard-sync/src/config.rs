use crate::routing::RoutingPolicy;
use anyhow::{Context, Result};
use dotenv::var;

/// Column ids of the board, keyed by their role in the sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub symbol: String,
    pub rate: String,
    pub index: String,
    pub date: String,
    pub source: String,
    pub delta: Option<String>,
}

impl ColumnMap {
    /// Column ids requested from the board read, in a fixed order.
    pub fn requested(&self) -> Vec<String> {
        let mut ids = vec![
            self.symbol.clone(),
            self.rate.clone(),
            self.index.clone(),
            self.date.clone(),
            self.source.clone(),
        ];
        if let Some(delta) = &self.delta {
            ids.push(delta.clone());
        }
        ids
    }
}

/// Everything a run needs, read once at startup.
///
/// Components take `&Config`; nothing reaches into the environment after
/// this is built.
#[derive(Debug, Clone)]
pub struct Config {
    pub monday_api_key: String,
    pub fred_api_key: String,
    pub board_id: i64,
    pub columns: ColumnMap,
    pub routing: RoutingPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let monday_api_key = var("MONDAY_API_KEY").context("MONDAY_API_KEY not set")?;
        let fred_api_key = var("FRED_API_KEY").context("FRED_API_KEY not set")?;
        let board_id = var("BOARD_ID")
            .context("BOARD_ID not set")?
            .parse::<i64>()
            .context("BOARD_ID is not a number")?;

        let columns = ColumnMap {
            symbol: var("MONDAY_COL_SYMBOL").unwrap_or_else(|_| "symbol".to_string()),
            rate: var("MONDAY_COL_RATE").unwrap_or_else(|_| "current_rate".to_string()),
            index: var("MONDAY_COL_INDEX").unwrap_or_else(|_| "current_index".to_string()),
            date: var("MONDAY_COL_DATE").unwrap_or_else(|_| "last_updated".to_string()),
            source: var("MONDAY_COL_SOURCE").unwrap_or_else(|_| "source".to_string()),
            delta: var("MONDAY_COL_DELTA").ok().filter(|id| !id.is_empty()),
        };

        Ok(Config {
            monday_api_key,
            fred_api_key,
            board_id,
            columns,
            routing: RoutingPolicy::from_env()?,
        })
    }
}
