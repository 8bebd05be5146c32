use crate::error::{Result, SchemascopeError};
use crate::neo4j::{DbCredentials, GraphConnector, GraphSession, Row};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Request body for the transactional endpoint
#[derive(Serialize)]
struct TxRequest<'a> {
    statements: Vec<TxStatement<'a>>,
}

#[derive(Serialize)]
struct TxStatement<'a> {
    statement: &'a str,
    parameters: &'a Value,
    #[serde(rename = "resultDataContents")]
    result_data_contents: [&'static str; 1],
}

/// Response body from the transactional endpoint
#[derive(Deserialize)]
struct TxResponse {
    #[serde(default)]
    commit: Option<String>,
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Deserialize)]
struct TxResult {
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Deserialize)]
struct TxRow {
    #[serde(default)]
    row: Row,
}

#[derive(Deserialize)]
struct TxError {
    code: String,
    message: String,
}

/// Connector for the Neo4j transactional HTTP API.
///
/// Each session is one explicit transaction; closing it rolls the
/// transaction back, which is all a read-only cycle needs.
pub struct Neo4jHttpConnector {
    client: Client,
    defaults: DbCredentials,
}

impl Neo4jHttpConnector {
    /// Create a connector. `defaults` fill whatever a request leaves unset.
    pub fn new(defaults: DbCredentials, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SchemascopeError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, defaults })
    }
}

#[async_trait]
impl GraphConnector for Neo4jHttpConnector {
    async fn connect(&self, credentials: &DbCredentials) -> Result<Box<dyn GraphSession>> {
        let creds = credentials.or(&self.defaults);
        let uri = creds
            .uri
            .as_deref()
            .ok_or_else(|| SchemascopeError::InvalidInput("No graph store URI given".to_string()))?;
        let database = creds.database.as_deref().unwrap_or("neo4j");
        let user = creds.user.clone().unwrap_or_default();
        let password = creds.password.clone();

        let base = http_base_url(uri)?;
        let begin_url = base
            .join(&format!("db/{}/tx", database))
            .map_err(|e| SchemascopeError::InvalidInput(format!("Invalid database name: {}", e)))?;

        log::info!("Opening graph store transaction at {}", begin_url);

        let response = self
            .client
            .post(begin_url.clone())
            .basic_auth(&user, password.as_deref())
            .json(&TxRequest { statements: Vec::new() })
            .send()
            .await
            .map_err(|e| SchemascopeError::Connection(format!("Network error: {}", e)))?;

        let status = response.status();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);
        let body = read_tx_response(response, status).await?;

        let tx_url = match (location, body.commit) {
            (Some(location), _) => location,
            (None, Some(commit)) => commit.trim_end_matches("/commit").to_string(),
            (None, None) => {
                return Err(SchemascopeError::Parse(
                    "Transaction opened without a location".to_string(),
                ))
            }
        };

        Ok(Box::new(Neo4jHttpSession {
            client: self.client.clone(),
            tx_url,
            user,
            password,
            closed: false,
        }))
    }
}

/// One open transaction
struct Neo4jHttpSession {
    client: Client,
    tx_url: String,
    user: String,
    password: Option<String>,
    closed: bool,
}

#[async_trait]
impl GraphSession for Neo4jHttpSession {
    async fn run(&mut self, statement: &str, parameters: Value) -> Result<Vec<Row>> {
        if self.closed {
            return Err(SchemascopeError::Connection("Session already closed".to_string()));
        }

        let request = TxRequest {
            statements: vec![TxStatement {
                statement,
                parameters: &parameters,
                result_data_contents: ["row"],
            }],
        };

        let response = self
            .client
            .post(&self.tx_url)
            .basic_auth(&self.user, self.password.as_deref())
            .json(&request)
            .send()
            .await
            .map_err(|e| SchemascopeError::Connection(format!("Network error: {}", e)))?;

        let status = response.status();
        let body = read_tx_response(response, status).await?;

        Ok(body
            .results
            .into_iter()
            .next()
            .map(|result| result.data.into_iter().map(|d| d.row).collect())
            .unwrap_or_default())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let response = self
            .client
            .delete(&self.tx_url)
            .basic_auth(&self.user, self.password.as_deref())
            .send()
            .await
            .map_err(|e| SchemascopeError::Connection(format!("Failed to close transaction: {}", e)))?;

        // 404: the server already expired the transaction
        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            return Err(SchemascopeError::Connection(format!(
                "Failed to close transaction: HTTP {}",
                response.status()
            )));
        }

        log::debug!("Closed graph store transaction {}", self.tx_url);
        Ok(())
    }
}

impl Drop for Neo4jHttpSession {
    fn drop(&mut self) {
        if !self.closed {
            log::warn!(
                "Graph store transaction {} dropped without close; the server will expire it",
                self.tx_url
            );
        }
    }
}

/// Check the status and decode a transactional response body.
async fn read_tx_response(response: reqwest::Response, status: StatusCode) -> Result<TxResponse> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SchemascopeError::Connection(format!(
            "Graph store rejected the credentials (HTTP {})",
            status
        )));
    }

    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        return Err(SchemascopeError::Connection(format!(
            "Graph store error {}: {}",
            status, body
        )));
    }

    let body: TxResponse = response
        .json()
        .await
        .map_err(|e| SchemascopeError::Parse(format!("Failed to parse response: {}", e)))?;

    check_errors(&body.errors)?;
    Ok(body)
}

/// Security errors mean the cycle never really connected.
fn check_errors(errors: &[TxError]) -> Result<()> {
    match errors.first() {
        None => Ok(()),
        Some(err) if err.code.starts_with("Neo.ClientError.Security") => Err(
            SchemascopeError::Connection(format!("{}: {}", err.code, err.message)),
        ),
        Some(err) => Err(SchemascopeError::Query(format!("{}: {}", err.code, err.message))),
    }
}

/// Resolve the HTTP base URL for a store URI.
///
/// Bolt URIs (`bolt://`, `neo4j://`, and their `+s`/`+ssc` variants) are
/// mapped onto the HTTP connector of the same host; the default Bolt port
/// becomes the default HTTP(S) port.
pub fn http_base_url(uri: &str) -> Result<Url> {
    let parsed = Url::parse(uri)
        .map_err(|e| SchemascopeError::InvalidInput(format!("Invalid store URI {}: {}", uri, e)))?;

    let (scheme, default_port) = match parsed.scheme() {
        "http" => ("http", 7474),
        "https" => ("https", 7473),
        "bolt" | "neo4j" => ("http", 7474),
        "bolt+s" | "bolt+ssc" | "neo4j+s" | "neo4j+ssc" => ("https", 7473),
        other => {
            return Err(SchemascopeError::InvalidInput(format!(
                "Unsupported store URI scheme: {}",
                other
            )))
        }
    };

    let host = parsed
        .host_str()
        .ok_or_else(|| SchemascopeError::InvalidInput(format!("Store URI has no host: {}", uri)))?;

    let port = match parsed.port() {
        Some(7687) | None => default_port,
        Some(port) => port,
    };

    let path = parsed.path().trim_end_matches('/');
    Url::parse(&format!("{}://{}:{}{}/", scheme, host, port, path))
        .map_err(|e| SchemascopeError::InvalidInput(format!("Invalid store URI {}: {}", uri, e)))
}
