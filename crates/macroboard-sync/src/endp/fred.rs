use crate::api::{Http, HttpClient};
use crate::config::Config;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, trace};

//////////////////////////////////////////////////////////////////////////////////////
//
// Latest observations from FRED, per series
//
//////////////////////////////////////////////////////////////////////////////////////

static ENDPOINT: &str = "https://api.stlouisfed.org/fred/series/observations";

// Observations come back newest-first; a valid value further back than this
// window is not worth reporting.
const OBSERVATION_LIMIT: usize = 25;

pub struct Fred;

impl Fred {
    /// Most recent observation of `series` whose value is not a missing-data
    /// marker.
    pub async fn latest(
        http_client: &HttpClient,
        cfg: &Config,
        series: &str,
    ) -> Result<SeriesValue> {
        let url = format!(
            "{ENDPOINT}?series_id={series}&api_key={key}&file_type=json&sort_order=desc&limit={OBSERVATION_LIMIT}",
            key = cfg.fred_api_key,
        );
        trace!("fetching observations for {series}");
        let data = Self::fetch(http_client, &url).await.map_err(|e| {
            error!("observation fetch failed for {series}");
            e
        })?;
        first_valid(data, series)
    }
}

#[async_trait]
impl Http<Observations> for Fred {
    async fn fetch(http_client: &HttpClient, url: &String) -> Result<Observations> {
        Ok(http_client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }
}

//////////////////////////////////////////////////////////////////////////////////////

/// A dated value, parsed; what the sync consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesValue {
    pub value: f64,
    pub dated: String,
}

#[derive(Debug, Deserialize)]
pub struct Observations {
    #[serde(rename = "observations")]
    pub inner: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
pub struct Observation {
    #[serde(rename = "date")]
    pub dated: String,
    pub value: String,
}

// "" and "." both mean "no observation recorded for this date".
fn is_missing(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == "."
}

/// First non-missing entry of a newest-first observation window.
fn first_valid(data: Observations, series: &str) -> Result<SeriesValue> {
    for obs in &data.inner {
        if is_missing(&obs.value) {
            trace!("skipping missing observation for {series} on {}", obs.dated);
            continue;
        }
        let value = obs
            .value
            .trim()
            .parse::<f64>()
            .with_context(|| format!("bad observation value for {series}: {:?}", obs.value))?;
        return Ok(SeriesValue {
            value,
            dated: obs.dated.clone(),
        });
    }
    bail!("no valid observation for {series} in the last {OBSERVATION_LIMIT} entries")
}
