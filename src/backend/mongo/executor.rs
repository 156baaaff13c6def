//! MongoDB executor - runs document commands against a live database

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::Client;
use serde_json::Value;

use crate::backend::mongo::command::{DocumentCommand, DocumentOp};
use crate::backend::{BackendQuery, ExecError, ExecOutcome, ExecResult, Executor, Row};

/// Executor over a MongoDB database handle
pub struct MongoExecutor {
    client: Client,
    database: mongodb::Database,
}

impl MongoExecutor {
    /// Connect to MongoDB and verify the connection
    pub async fn connect(uri: &str, database: &str) -> ExecResult<Self> {
        let client = Client::with_uri_str(uri).await?;
        let database = client.database(database);
        database.run_command(doc! { "ping": 1 }).await?;
        Ok(Self { client, database })
    }

    /// The underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn command<'q>(&self, query: &'q BackendQuery) -> ExecResult<&'q DocumentCommand> {
        match query {
            BackendQuery::Document(cmd) => Ok(cmd),
            BackendQuery::Sql(_) => Err(ExecError::WrongBackend { expected: "postgres" }),
        }
    }
}

#[async_trait]
impl Executor for MongoExecutor {
    async fn execute_query(&self, query: &BackendQuery) -> ExecResult<Vec<Row>> {
        let cmd = self.command(query)?;
        let coll = self.database.collection::<Document>(&cmd.collection);

        let documents = match cmd.operation {
            DocumentOp::Find => {
                let opts = cmd
                    .options
                    .clone()
                    .ok_or_else(|| ExecError::Decode("find without options".to_string()))?;
                // The driver treats limit 0 as "no limit"; a zero-limit page
                // must come back empty instead.
                if opts.limit == 0 {
                    return Ok(Vec::new());
                }

                let mut find = coll
                    .find(cmd.filter.clone().unwrap_or_default())
                    .limit(opts.limit)
                    .skip(opts.skip);
                if let Some(sort) = opts.sort {
                    find = find.sort(sort);
                }
                find.await?.try_collect::<Vec<Document>>().await?
            }
            DocumentOp::Aggregate => {
                let pipeline = cmd
                    .pipeline
                    .clone()
                    .ok_or_else(|| ExecError::Decode("aggregate without pipeline".to_string()))?;
                if pipeline_limit_is_zero(&pipeline) {
                    return Ok(Vec::new());
                }
                coll.aggregate(pipeline)
                    .await?
                    .try_collect::<Vec<Document>>()
                    .await?
            }
            _ => {
                return Err(ExecError::Decode(format!(
                    "operation {:?} does not return rows",
                    cmd.operation
                )));
            }
        };

        Ok(documents.iter().map(document_to_row).collect())
    }

    async fn execute_command(&self, query: &BackendQuery) -> ExecResult<ExecOutcome> {
        let cmd = self.command(query)?;
        let coll = self.database.collection::<Document>(&cmd.collection);

        let affected_rows = match cmd.operation {
            DocumentOp::Insert => {
                let document = cmd
                    .document
                    .clone()
                    .ok_or_else(|| ExecError::Decode("insert without document".to_string()))?;
                coll.insert_one(document).await?;
                1
            }
            DocumentOp::Update => {
                let filter = cmd.filter.clone().unwrap_or_default();
                let update = cmd
                    .update
                    .clone()
                    .ok_or_else(|| ExecError::Decode("update without document".to_string()))?;
                coll.update_many(filter, update).await?.modified_count
            }
            DocumentOp::Delete => {
                let filter = cmd.filter.clone().unwrap_or_default();
                coll.delete_many(filter).await?.deleted_count
            }
            _ => {
                return Err(ExecError::Decode(format!(
                    "operation {:?} is not a command",
                    cmd.operation
                )));
            }
        };

        Ok(ExecOutcome { affected_rows })
    }

    async fn ping(&self) -> ExecResult<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

/// A `$limit: 0` stage means the page is empty; the server rejects the
/// stage outright, so it never reaches the driver.
fn pipeline_limit_is_zero(pipeline: &[Document]) -> bool {
    pipeline.iter().any(|stage| {
        matches!(
            stage.get("$limit"),
            Some(Bson::Int64(0)) | Some(Bson::Int32(0))
        )
    })
}

/// Decode a BSON document into the uniform row shape
fn document_to_row(document: &Document) -> Row {
    let mut row = Row::new();
    for (key, value) in document {
        row.insert(key.clone(), bson_to_json(value));
    }
    row
}

fn bson_to_json(value: &Bson) -> Value {
    match value {
        Bson::Null => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(i) => Value::from(*i as i64),
        Bson::Int64(i) => Value::from(*i),
        Bson::Double(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::String(s) => Value::String(s.clone()),
        Bson::Array(items) => Value::Array(items.iter().map(bson_to_json).collect()),
        Bson::Document(doc) => Value::Object(
            doc.iter()
                .map(|(k, v)| (k.clone(), bson_to_json(v)))
                .collect(),
        ),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => Value::String(
            dt.try_to_rfc3339_string()
                .unwrap_or_else(|_| dt.timestamp_millis().to_string()),
        ),
        Bson::Decimal128(d) => Value::String(d.to_string()),
        Bson::Binary(binary) => {
            Value::String(String::from_utf8_lossy(&binary.bytes).into_owned())
        }
        other => other.clone().into_relaxed_extjson(),
    }
}
