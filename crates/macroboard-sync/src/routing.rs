use anyhow::{bail, Result};
use dotenv::var;
use lazy_static::lazy_static;

lazy_static! {
    /// Default table of rate-like symbol fragments.
    ///
    /// Routing policy is data, not logic; a deployment overrides the whole
    /// table with `RATE_KEYWORDS`.
    pub static ref RATE_KEYWORDS: Vec<&'static str> = vec![
        "DGS",        // constant-maturity treasuries
        "TB3",        // treasury bills
        "SOFR",
        "EFFR",
        "OBFR",
        "DPRIME",
        "MPRIME",
        "FEDFUNDS",
        "DFF",
        "MORTGAGE",
        "UNRATE",
        "DRSFRMACBS", // mortgage delinquencies
        "DRTSCILM",   // lending standards
        "RATE",
    ];
}

/// Which of the two destination columns receives a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Rate,
    Index,
}

/// How rows are classified; one strategy per deployment, never mixed within a
/// run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingPolicy {
    /// A symbol containing any fragment of the table routes to the rate
    /// column; everything else routes to the index column.
    Keywords { table: Vec<String> },

    /// Rows grouped under this label route to the index column; everything
    /// else (unlabeled included) routes to the rate column.
    Groups { index_label: String },
}

impl RoutingPolicy {
    /// `ROUTING_STRATEGY` selects the policy (default `keywords`);
    /// `RATE_KEYWORDS` and `INDEX_GROUP` feed it.
    pub fn from_env() -> Result<Self> {
        let strategy = var("ROUTING_STRATEGY").unwrap_or_else(|_| "keywords".to_string());
        match strategy.to_lowercase().as_str() {
            "keywords" => {
                let table = match var("RATE_KEYWORDS") {
                    Ok(csv) => csv
                        .split(',')
                        .map(|kw| kw.trim().to_uppercase())
                        .filter(|kw| !kw.is_empty())
                        .collect(),
                    Err(_) => RATE_KEYWORDS.iter().map(|kw| kw.to_string()).collect(),
                };
                Ok(Self::Keywords { table })
            }
            "groups" => Ok(Self::Groups {
                index_label: var("INDEX_GROUP").unwrap_or_else(|_| "Index".to_string()),
            }),
            other => bail!("unknown ROUTING_STRATEGY: {other}"),
        }
    }

    /// Classify one row. Pure; the same inputs always land on the same
    /// column.
    pub fn route(&self, symbol: &str, group: Option<&str>) -> Route {
        match self {
            Self::Keywords { table } => {
                let symbol = symbol.to_uppercase();
                if table.iter().any(|kw| symbol.contains(kw.as_str())) {
                    Route::Rate
                } else {
                    Route::Index
                }
            }
            Self::Groups { index_label } => match group {
                Some(label) if label.eq_ignore_ascii_case(index_label) => Route::Index,
                _ => Route::Rate,
            },
        }
    }
}
