use std::collections::HashSet;

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{ReadFilter, RowLookup, WideColumnStore};
use crate::errors::StoreError;
use crate::ingest::row_gen::Row;

pub const ADMIN_ENDPOINT: &str = "https://bigtableadmin.googleapis.com";
pub const DATA_ENDPOINT: &str = "https://bigtable.googleapis.com";

lazy_static! {
    static ref RT: tokio::runtime::Runtime = tokio::runtime::Runtime::new().unwrap();
}

/// Cloud Bigtable client speaking the HTTP/JSON flavour of the admin and data
/// APIs. Calls block the calling thread on a shared runtime, so the store can
/// be used from plain worker threads.
pub struct BigtableStore {
    client: reqwest::Client,
    admin_endpoint: String,
    data_endpoint: String,
    instance_path: String,
    token: Option<String>,
}

impl BigtableStore {
    pub fn new(
        project: &str,
        instance: &str,
        admin_endpoint: &str,
        data_endpoint: &str,
        token: Option<String>,
    ) -> BigtableStore {
        let client = {
            let _guard = RT.enter();
            reqwest::Client::new()
        };
        BigtableStore {
            client,
            admin_endpoint: admin_endpoint.trim_end_matches('/').to_string(),
            data_endpoint: data_endpoint.trim_end_matches('/').to_string(),
            instance_path: format!("projects/{}/instances/{}", project, instance),
            token,
        }
    }

    fn table_path(&self, table: &str) -> String {
        format!("{}/tables/{}", self.instance_path, table)
    }

    fn call<B: Serialize>(&self, method: Method, url: &str, body: Option<&B>) -> Result<Value, StoreError> {
        log::trace!("{} {}", method, url);
        let mut request = self.client.request(method, url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        RT.block_on(async move {
            let response = request
                .send()
                .await
                .map_err(|err| StoreError::Transport(err.to_string()))?;
            let status = response.status();
            let bytes = response
                .bytes()
                .await
                .map_err(|err| StoreError::Transport(err.to_string()))?;
            if !status.is_success() {
                return Err(decode_error(status, &bytes));
            }
            if bytes.iter().all(|b| b.is_ascii_whitespace()) {
                return Ok(Value::Null);
            }
            serde_json::from_slice(&bytes).map_err(|err| StoreError::Decode(err.to_string()))
        })
    }
}

impl WideColumnStore for BigtableStore {
    fn delete_table(&self, table: &str) -> Result<(), StoreError> {
        let url = format!("{}/v2/{}", self.admin_endpoint, self.table_path(table));
        self.call::<()>(Method::DELETE, &url, None)?;
        Ok(())
    }

    fn create_table(&self, table: &str) -> Result<(), StoreError> {
        let url = format!("{}/v2/{}/tables", self.admin_endpoint, self.instance_path);
        let body = CreateTableRequest {
            table_id: table,
            table: Empty {},
        };
        self.call(Method::POST, &url, Some(&body))?;
        Ok(())
    }

    fn create_column_family(&self, table: &str, family: &str) -> Result<(), StoreError> {
        let url = format!(
            "{}/v2/{}:modifyColumnFamilies",
            self.admin_endpoint,
            self.table_path(table)
        );
        let body = ModifyColumnFamiliesRequest {
            modifications: vec![Modification {
                id: family,
                create: Empty {},
            }],
        };
        self.call(Method::POST, &url, Some(&body))?;
        Ok(())
    }

    fn bulk_write(&self, table: &str, rows: &[Row]) -> Result<Vec<Option<StoreError>>, StoreError> {
        let url = format!("{}/v2/{}:mutateRows", self.data_endpoint, self.table_path(table));
        let response = self.call(Method::POST, &url, Some(&mutate_rows_request(rows)))?;
        row_statuses(rows.len(), stream_messages(response)?)
    }

    fn point_read(
        &self,
        table: &str,
        keys: &[String],
        filter: ReadFilter,
    ) -> Result<Vec<RowLookup>, StoreError> {
        // An empty row set reads the whole table.
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/v2/{}:readRows", self.data_endpoint, self.table_path(table));
        let response = self.call(Method::POST, &url, Some(&read_rows_request(keys, filter)))?;
        let found = found_keys(stream_messages(response)?)?;
        Ok(keys
            .iter()
            .map(|key| RowLookup {
                key: key.clone(),
                found: found.contains(key),
            })
            .collect())
    }
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct Empty {}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreateTableRequest<'a> {
    table_id: &'a str,
    table: Empty,
}

#[derive(Serialize, Debug)]
struct ModifyColumnFamiliesRequest<'a> {
    modifications: Vec<Modification<'a>>,
}

#[derive(Serialize, Debug)]
struct Modification<'a> {
    id: &'a str,
    create: Empty,
}

#[derive(Serialize, Debug)]
struct MutateRowsRequest {
    entries: Vec<MutateRowsEntry>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct MutateRowsEntry {
    row_key: String,
    mutations: Vec<Mutation>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Mutation {
    set_cell: SetCell,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SetCell {
    family_name: String,
    column_qualifier: String,
    // int64 fields travel as strings in proto3 JSON
    timestamp_micros: String,
    value: String,
}

#[derive(Deserialize, Debug)]
struct MutateRowsResponse {
    #[serde(default)]
    entries: Vec<EntryStatus>,
}

#[derive(Deserialize, Debug)]
struct EntryStatus {
    #[serde(default, deserialize_with = "int64")]
    index: i64,
    #[serde(default)]
    status: Option<RpcStatus>,
}

#[derive(Deserialize, Debug, Default)]
struct RpcStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ReadRowsRequest {
    rows: RowSet,
    filter: RowFilter,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RowSet {
    row_keys: Vec<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RowFilter {
    cells_per_column_limit_filter: i32,
}

#[derive(Deserialize, Debug)]
struct ReadRowsResponse {
    #[serde(default)]
    chunks: Vec<CellChunk>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CellChunk {
    #[serde(default)]
    row_key: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

fn int64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Int64 {
        Number(i64),
        Text(String),
    }
    match Int64::deserialize(deserializer)? {
        Int64::Number(n) => Ok(n),
        Int64::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

fn mutate_rows_request(rows: &[Row]) -> MutateRowsRequest {
    MutateRowsRequest {
        entries: rows
            .iter()
            .map(|row| MutateRowsEntry {
                row_key: STANDARD.encode(row.key.as_bytes()),
                mutations: vec![Mutation {
                    set_cell: SetCell {
                        family_name: row.mutation.family.clone(),
                        column_qualifier: STANDARD.encode(row.mutation.column.as_bytes()),
                        timestamp_micros: row.mutation.timestamp_micros.to_string(),
                        value: STANDARD.encode(&row.mutation.value),
                    },
                }],
            })
            .collect(),
    }
}

fn read_rows_request(keys: &[String], filter: ReadFilter) -> ReadRowsRequest {
    let cells_per_column_limit_filter = match filter {
        ReadFilter::LatestVersion => 1,
    };
    ReadRowsRequest {
        rows: RowSet {
            row_keys: keys.iter().map(|k| STANDARD.encode(k.as_bytes())).collect(),
        },
        filter: RowFilter {
            cells_per_column_limit_filter,
        },
    }
}

/// Server-streaming methods answer with a JSON array of messages.
fn stream_messages<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, StoreError> {
    let values = match value {
        Value::Null => vec![],
        Value::Array(values) => values,
        other => vec![other],
    };
    values
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(|err| StoreError::Decode(err.to_string())))
        .collect()
}

fn row_statuses(
    len: usize,
    messages: Vec<MutateRowsResponse>,
) -> Result<Vec<Option<StoreError>>, StoreError> {
    let mut statuses = vec![None; len];
    let mut reported = vec![false; len];
    for entry in messages.into_iter().flat_map(|m| m.entries) {
        let index = usize::try_from(entry.index)
            .ok()
            .filter(|&i| i < len)
            .ok_or_else(|| StoreError::Decode(format!("entry index {} out of range", entry.index)))?;
        reported[index] = true;
        let status = entry.status.unwrap_or_default();
        if status.code != 0 {
            statuses[index] = Some(StoreError::Status {
                code: status.code,
                message: status.message,
            });
        }
    }
    if let Some(missing) = reported.iter().position(|r| !r) {
        return Err(StoreError::Decode(format!("no status reported for entry {}", missing)));
    }
    Ok(statuses)
}

fn found_keys(messages: Vec<ReadRowsResponse>) -> Result<HashSet<String>, StoreError> {
    let mut keys = HashSet::new();
    for chunk in messages.into_iter().flat_map(|m| m.chunks) {
        if let Some(encoded) = chunk.row_key {
            let bytes = STANDARD
                .decode(encoded.as_bytes())
                .map_err(|err| StoreError::Decode(err.to_string()))?;
            keys.insert(String::from_utf8_lossy(&bytes).into_owned());
        }
    }
    Ok(keys)
}

fn decode_error(status: StatusCode, body: &[u8]) -> StoreError {
    let (status_name, message) = match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.status, envelope.error.message),
        Err(_) => (String::new(), String::from_utf8_lossy(body).into_owned()),
    };
    if status == StatusCode::NOT_FOUND || status_name == "NOT_FOUND" {
        return StoreError::NotFound(message);
    }
    StoreError::Status {
        code: status.as_u16() as i32,
        message: if status_name.is_empty() {
            message
        } else {
            format!("{}: {}", status_name, message)
        },
    }
}
