use crate::api::HttpClient;
use crate::config::Config;
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, trace};

//////////////////////////////////////////////////////////////////////////////////////
//
// Board rows from monday.com: a paginated read and a per-row batched write
//
//////////////////////////////////////////////////////////////////////////////////////

static ENDPOINT: &str = "https://api.monday.com/v2";

const PAGE_LIMIT: i64 = 100;

static ITEMS_QUERY: &str = "
    query ($board: [ID!], $limit: Int!, $columns: [String!]) {
        boards (ids: $board) {
            items_page (limit: $limit) {
                cursor
                items {
                    id
                    name
                    group { title }
                    column_values (ids: $columns) { id text }
                }
            }
        }
    }
";

static NEXT_PAGE_QUERY: &str = "
    query ($cursor: String!, $limit: Int!, $columns: [String!]) {
        next_items_page (cursor: $cursor, limit: $limit) {
            cursor
            items {
                id
                name
                group { title }
                column_values (ids: $columns) { id text }
            }
        }
    }
";

static UPDATE_MUTATION: &str = "
    mutation ($board: ID!, $item: ID!, $values: JSON!) {
        change_multiple_column_values (board_id: $board, item_id: $item, column_values: $values) {
            id
        }
    }
";

pub struct Monday;

impl Monday {
    /// Every row of the board, fully paginated before returning.
    ///
    /// Any failure here is fatal to the run; the complete row set is a
    /// precondition for updating anything.
    pub async fn items(http_client: &HttpClient, cfg: &Config) -> Result<Vec<Item>> {
        let columns = cfg.columns.requested();
        let variables = json!({
            "board": [cfg.board_id.to_string()],
            "limit": PAGE_LIMIT,
            "columns": &columns,
        });
        let first: BoardsData = Self::post(http_client, cfg, ITEMS_QUERY, variables).await?;
        let Some(board) = first.boards.into_iter().next() else {
            bail!("board {} not found", cfg.board_id);
        };

        let mut page = board.items_page;
        let mut items = Vec::new();
        loop {
            debug!("page of {} rows received", page.items.len());
            items.append(&mut page.items);

            let Some(cursor) = page.cursor else { break };
            let variables = json!({
                "cursor": cursor,
                "limit": PAGE_LIMIT,
                "columns": &columns,
            });
            let next: NextPageData =
                Self::post(http_client, cfg, NEXT_PAGE_QUERY, variables).await?;
            page = next.next_items_page;
        }

        Ok(items)
    }

    /// One atomic multi-column write to a single row; the column values go up
    /// as one JSON-encoded argument.
    pub async fn update_item(
        http_client: &HttpClient,
        cfg: &Config,
        item_id: &str,
        values: &Map<String, Value>,
    ) -> Result<()> {
        let variables = json!({
            "board": cfg.board_id.to_string(),
            "item": item_id,
            "values": serde_json::to_string(values)?,
        });
        let ack: MutationData = Self::post(http_client, cfg, UPDATE_MUTATION, variables).await?;
        trace!("row {} written", ack.change_multiple_column_values.id);
        Ok(())
    }

    /// POST one GraphQL document and unwrap the response envelope.
    async fn post<D>(
        http_client: &HttpClient,
        cfg: &Config,
        query: &str,
        variables: Value,
    ) -> Result<D>
    where
        D: DeserializeOwned,
    {
        let body = json!({ "query": query, "variables": variables });
        let envelope: Envelope<D> = http_client
            .post(ENDPOINT)
            .header("Authorization", &cfg.monday_api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("undecodable monday.com response")?;
        unwrap_envelope(envelope)
    }
}

// An errors array in the envelope counts the same as a failed request, even
// under HTTP 200.
fn unwrap_envelope<D>(envelope: Envelope<D>) -> Result<D> {
    if !envelope.errors.is_empty() {
        let messages = envelope
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        bail!("monday.com returned errors: {messages}");
    }
    envelope.data.context("monday.com response had no data")
}

//////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct BoardsData {
    boards: Vec<BoardPage>,
}

#[derive(Debug, Deserialize)]
struct BoardPage {
    items_page: ItemsPage,
}

#[derive(Debug, Deserialize)]
struct NextPageData {
    next_items_page: ItemsPage,
}

#[derive(Debug, Deserialize)]
pub struct ItemsPage {
    pub cursor: Option<String>,
    pub items: Vec<Item>,
}

/// One row of the board, with the texts of the columns the read asked for.
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub group: Option<Group>,
    #[serde(default)]
    pub column_values: Vec<ColumnText>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Group {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnText {
    pub id: String,
    pub text: Option<String>,
}

impl Item {
    /// Text of one of the row's columns, if the board returned it.
    pub fn text_of(&self, column: &str) -> Option<&str> {
        self.column_values
            .iter()
            .find(|cv| cv.id == column)
            .and_then(|cv| cv.text.as_deref())
    }

    pub fn group_title(&self) -> Option<&str> {
        self.group.as_ref().map(|g| g.title.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct MutationData {
    change_multiple_column_values: Mutated,
}

#[derive(Debug, Deserialize)]
struct Mutated {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    static ITEMS_PAGE: &str = r#"{
        "data": {
            "boards": [{
                "items_page": {
                    "cursor": "MSw5NzI4",
                    "items": [{
                        "id": "123",
                        "name": "10Y Treasury",
                        "group": { "title": "Rates" },
                        "column_values": [
                            { "id": "symbol", "text": "DGS10" },
                            { "id": "current_rate", "text": "4.20" },
                            { "id": "current_index", "text": null }
                        ]
                    }]
                }
            }]
        }
    }"#;

    #[test]
    fn items_page_deserializes() {
        let envelope: Envelope<BoardsData> = serde_json::from_str(ITEMS_PAGE).unwrap();
        let data = unwrap_envelope(envelope).unwrap();
        let page = &data.boards[0].items_page;
        assert_eq!(page.cursor.as_deref(), Some("MSw5NzI4"));

        let item = &page.items[0];
        assert_eq!(item.id, "123");
        assert_eq!(item.group_title(), Some("Rates"));
        assert_eq!(item.text_of("symbol"), Some("DGS10"));
        assert_eq!(item.text_of("current_rate"), Some("4.20"));
        assert_eq!(item.text_of("current_index"), None);
        assert_eq!(item.text_of("missing_column"), None);
    }

    #[test]
    fn final_page_has_no_cursor() {
        let raw = r#"{
            "data": {
                "next_items_page": { "cursor": null, "items": [] }
            }
        }"#;
        let envelope: Envelope<NextPageData> = serde_json::from_str(raw).unwrap();
        let data = unwrap_envelope(envelope).unwrap();
        assert!(data.next_items_page.cursor.is_none());
    }

    #[test]
    fn graphql_errors_fail_the_call() {
        let raw = r#"{
            "errors": [
                { "message": "not authorized" },
                { "message": "board locked" }
            ]
        }"#;
        let envelope: Envelope<BoardsData> = serde_json::from_str(raw).unwrap();
        let err = unwrap_envelope(envelope).unwrap_err();
        assert!(err.to_string().contains("not authorized"));
        assert!(err.to_string().contains("board locked"));
    }

    #[test]
    fn empty_data_is_an_error() {
        let envelope: Envelope<BoardsData> = serde_json::from_str(r#"{}"#).unwrap();
        assert!(unwrap_envelope(envelope).is_err());
    }
}
