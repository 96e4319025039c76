//! Operations backed by remote HTTP endpoints

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use arrow::compute::concat_batches;
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::error::ArrowError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::runtime::Handle;
use url::Url;

use super::Operation;
use crate::error::{Error, Result};
use crate::fetch::FetchResult;
use crate::types::Params;

/// Default per-request HTTP timeout
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Rows sampled for CSV schema inference
const CSV_INFER_RECORDS: usize = 1000;

/// Body encoding of a remote endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Json,
    Csv,
}

/// Catalog declaration of one HTTP operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSpec {
    pub name: String,
    /// Endpoint; params are appended as query pairs
    pub url: String,
    #[serde(default)]
    pub format: ResponseFormat,
    #[serde(default)]
    pub description: String,
    /// Per-request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl OperationSpec {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            format: ResponseFormat::default(),
            description: String::new(),
            timeout_secs: None,
        }
    }
}

/// `GET url?<params>` decoded as JSON or CSV
///
/// The async client is driven with `Handle::block_on`, which is only legal off
/// the runtime's worker threads. The worker pool guarantees that.
pub struct HttpOperation {
    name: String,
    url: Url,
    format: ResponseFormat,
    description: String,
    timeout: Duration,
    client: reqwest::Client,
    handle: Handle,
}

impl std::fmt::Debug for HttpOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpOperation")
            .field("name", &self.name)
            .field("url", &self.url.as_str())
            .field("format", &self.format)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpOperation {
    /// # Errors
    ///
    /// Returns `Error::Config` if the URL does not parse.
    pub fn new(spec: &OperationSpec, client: reqwest::Client, handle: Handle) -> Result<Self> {
        let url = Url::parse(&spec.url).map_err(|e| {
            Error::Config(format!("operation '{}': invalid url '{}': {e}", spec.name, spec.url))
        })?;

        Ok(Self {
            name: spec.name.clone(),
            url,
            format: spec.format,
            description: spec.description.clone(),
            timeout: spec
                .timeout_secs
                .map_or(DEFAULT_OPERATION_TIMEOUT, Duration::from_secs),
            client,
            handle,
        })
    }

    /// Endpoint URL with `params` appended as query pairs
    #[must_use]
    pub fn request_url(&self, params: &Params) -> Url {
        let mut url = self.url.clone();
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, &query_value(value));
            }
        }
        url
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl Operation for HttpOperation {
    fn invoke(&self, params: &Params) -> anyhow::Result<FetchResult> {
        let url = self.request_url(params);
        tracing::debug!(operation = %self.name, url = %url, "Invoking HTTP operation");

        let body = self
            .handle
            .block_on(async {
                self.client
                    .get(url.clone())
                    .timeout(self.timeout)
                    .send()
                    .await?
                    .error_for_status()?
                    .bytes()
                    .await
            })
            .with_context(|| format!("GET {url}"))?;

        decode(self.format, &body).with_context(|| format!("decoding response of '{}'", self.name))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Decode a response body
///
/// # Errors
///
/// Fails on malformed JSON or CSV.
pub fn decode(format: ResponseFormat, body: &[u8]) -> anyhow::Result<FetchResult> {
    match format {
        ResponseFormat::Json => {
            if body.iter().all(u8::is_ascii_whitespace) {
                return Ok(FetchResult::Empty);
            }
            let value: Value = serde_json::from_slice(body)?;
            Ok(FetchResult::from_json(value))
        }
        ResponseFormat::Csv => decode_csv(body),
    }
}

fn decode_csv(body: &[u8]) -> anyhow::Result<FetchResult> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(FetchResult::Empty);
    }

    let (schema, _) = Format::default()
        .with_header(true)
        .infer_schema(Cursor::new(body), Some(CSV_INFER_RECORDS))?;
    let schema = Arc::new(schema);

    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_header(true)
        .build(Cursor::new(body))?;
    let batches = reader.collect::<std::result::Result<Vec<_>, ArrowError>>()?;

    if batches.is_empty() {
        return Ok(FetchResult::Empty);
    }
    Ok(FetchResult::Tabular(concat_batches(&schema, &batches)?))
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;

    use arrow::datatypes::DataType;
    use serde_json::json;

    use super::*;

    fn serve_once(
        status: &str,
        content_type: &str,
        body: &str,
    ) -> (String, std::thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request_line = String::new();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            stream.write_all(response.as_bytes()).unwrap();
            request_line
        });
        (format!("http://{addr}/data"), handle)
    }

    fn operation(url: &str, format: ResponseFormat) -> HttpOperation {
        let spec = OperationSpec {
            format,
            description: "test".to_string(),
            ..OperationSpec::new("test_op", url)
        };
        HttpOperation::new(&spec, reqwest::Client::new(), Handle::current()).unwrap()
    }

    fn params(pairs: &[(&str, Value)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_decode_json_shapes() {
        assert_eq!(decode(ResponseFormat::Json, b"").unwrap(), FetchResult::Empty);
        assert_eq!(
            decode(ResponseFormat::Json, b"null").unwrap(),
            FetchResult::Empty
        );
        assert_eq!(
            decode(ResponseFormat::Json, br#"{"pe": 12.5}"#).unwrap().shape(),
            "mapping"
        );
        assert_eq!(
            decode(ResponseFormat::Json, br#"[{"a": 1}]"#).unwrap().shape(),
            "record_list"
        );
    }

    #[test]
    fn test_decode_json_invalid() {
        assert!(decode(ResponseFormat::Json, b"{not json").is_err());
    }

    #[test]
    fn test_decode_csv_infers_types() {
        let body = b"date,symbol,close\n2024-01-02,000001,10.5\n2024-01-03,000001,10.7\n";
        let result = decode(ResponseFormat::Csv, body).unwrap();
        let batch = result.as_tabular().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(0).name(), "date");
        assert_eq!(batch.schema().field(0).data_type(), &DataType::Date32);
        assert_eq!(batch.schema().field(2).data_type(), &DataType::Float64);
    }

    #[test]
    fn test_decode_csv_header_only() {
        let result = decode(ResponseFormat::Csv, b"a,b\n").unwrap();
        match result {
            FetchResult::Empty => {}
            FetchResult::Tabular(batch) => assert_eq!(batch.num_rows(), 0),
            other => panic!("unexpected shape {}", other.shape()),
        }
        assert_eq!(decode(ResponseFormat::Csv, b"  \n").unwrap(), FetchResult::Empty);
    }

    #[tokio::test]
    async fn test_request_url_appends_params() {
        let op = operation("http://example.com/api/hist", ResponseFormat::Json);
        let url = op.request_url(&params(&[
            ("symbol", json!("000001")),
            ("limit", json!(5)),
            ("adjust", Value::Null),
        ]));
        assert_eq!(
            url.as_str(),
            "http://example.com/api/hist?adjust=&limit=5&symbol=000001"
        );
        assert_eq!(
            op.request_url(&Params::new()).as_str(),
            "http://example.com/api/hist"
        );
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let err = HttpOperation::new(
            &OperationSpec::new("bad", "::nope"),
            reqwest::Client::new(),
            runtime.handle().clone(),
        )
        .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_spec_from_toml() {
        let spec: OperationSpec = toml::from_str(
            r#"
            name = "stock_zh_a_hist"
            url = "http://localhost:8080/hist"
            format = "csv"
            timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(spec.format, ResponseFormat::Csv);
        assert_eq!(spec.timeout_secs, Some(5));
        assert!(spec.description.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_invoke_json_endpoint() {
        let (url, server) = serve_once("200 OK", "application/json", r#"[{"code":"600000"}]"#);
        let op = Arc::new(operation(&url, ResponseFormat::Json));

        let result = tokio::task::spawn_blocking(move || {
            op.invoke(&params(&[("market", json!("sh"))]))
        })
        .await
        .unwrap()
        .unwrap();

        let request_line = server.join().unwrap();
        assert!(request_line.starts_with("GET /data?market=sh "));
        let FetchResult::RecordList(records) = result else {
            panic!("expected record list");
        };
        assert_eq!(records[0]["code"], json!("600000"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_invoke_http_error_fails() {
        let (url, server) = serve_once("503 Service Unavailable", "text/plain", "busy");
        let op = Arc::new(operation(&url, ResponseFormat::Json));

        let err = tokio::task::spawn_blocking(move || op.invoke(&Params::new()))
            .await
            .unwrap()
            .unwrap_err();

        server.join().unwrap();
        assert!(format!("{err:#}").contains("503"));
    }
}
