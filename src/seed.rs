//! Bulk creation of PPP secrets from tabular records.
//!
//! Records come from a [`RecordSource`]: an in-memory table, or a JSON file
//! holding an array of flat objects. Each record names a user, a password and
//! the PPPoE server the user belongs to; the secret gets that server's
//! default profile (`<server>-dflt-Prof`) and the `pppoe` service.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::Value;

use crate::error::{Result, RouterOsError};
use crate::ops;
use crate::protocol::AttributeMap;
use crate::router::OperationError;
use crate::session::Session;
use crate::transport::Stream;

/// One input row, column name to value.
pub type Record = BTreeMap<String, String>;

/// Service assigned to seeded secrets.
pub const SEED_SERVICE: &str = "pppoe";

/// Suffix appended to the server name to form the profile name.
pub const PROFILE_SUFFIX: &str = "-dflt-Prof";

/// A table of records.
///
/// Loading is synchronous and may block on file I/O. Load before connecting
/// (as [`Router::seed_ppp_secrets`](crate::Router::seed_ppp_secrets) does), or
/// from `spawn_blocking` when a runtime thread must not stall.
pub trait RecordSource {
    /// Load every record, in order.
    fn records(&self) -> Result<Vec<Record>>;
}

/// Records held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource(pub Vec<Record>);

impl RecordSource for MemorySource {
    fn records(&self) -> Result<Vec<Record>> {
        Ok(self.0.clone())
    }
}

/// Records read from a JSON file: an array of flat objects.
///
/// Strings are taken as-is, other scalars are stringified, `null` becomes an
/// empty string. Arrays and objects as values are rejected.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    /// File holding the JSON array.
    pub path: PathBuf,
}

impl JsonFileSource {
    /// Create a source reading `path` on each [`records`](RecordSource::records) call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for JsonFileSource {
    /// Reads the whole file with blocking I/O.
    fn records(&self) -> Result<Vec<Record>> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            RouterOsError::Config(format!("{}: {e}", self.path.display()))
        })?;
        let value: Value = serde_json::from_str(&text)?;
        let Value::Array(rows) = value else {
            return Err(RouterOsError::Config(format!(
                "{}: expected a JSON array of records",
                self.path.display()
            )));
        };

        rows.into_iter()
            .enumerate()
            .map(|(index, row)| flatten_row(index, row))
            .collect()
    }
}

fn flatten_row(index: usize, row: Value) -> Result<Record> {
    let Value::Object(fields) = row else {
        return Err(RouterOsError::Config(format!(
            "record {index}: expected a JSON object"
        )));
    };

    fields
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(RouterOsError::Config(format!(
                        "record {index}: column '{key}' is not a scalar"
                    )))
                }
            };
            Ok((key, text))
        })
        .collect()
}

/// Column names to read from each record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedColumns {
    /// PPP user name column.
    pub user: String,
    /// PPP password column.
    pub password: String,
    /// PPPoE server name column.
    pub server: String,
}

impl Default for SeedColumns {
    fn default() -> Self {
        Self {
            user: "ppp_user_name".to_string(),
            password: "ppp_password".to_string(),
            server: "pppoe_server".to_string(),
        }
    }
}

/// A secret to create, extracted from one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretSeed {
    /// Secret (user) name.
    pub name: String,
    /// Secret password.
    pub password: String,
    /// PPPoE server the user belongs to.
    pub server: String,
}

impl SecretSeed {
    /// Extract a seed; a missing column is a config error.
    pub fn from_record(record: &Record, columns: &SeedColumns) -> Result<Self> {
        let column = |name: &str| {
            record
                .get(name)
                .cloned()
                .ok_or_else(|| RouterOsError::Config(format!("record is missing column '{name}'")))
        };
        Ok(Self {
            name: column(&columns.user)?,
            password: column(&columns.password)?,
            server: column(&columns.server)?,
        })
    }

    /// Profile name derived from the server name.
    pub fn profile(&self) -> String {
        format!("{}{}", self.server, PROFILE_SUFFIX)
    }

    /// Attributes sent alongside name and password.
    pub fn extra_attributes(&self) -> AttributeMap {
        AttributeMap::from([
            ("profile".to_string(), self.profile()),
            ("service".to_string(), SEED_SERVICE.to_string()),
        ])
    }
}

/// Result of a seeding run.
#[derive(Debug, Clone, Default)]
pub struct SeedSummary {
    /// Secrets created.
    pub created: usize,
    /// Per-record failures, keyed by user name (or `record <n>` when the
    /// record had no user name).
    pub failed: Vec<(String, OperationError)>,
}

/// Load `source`, then create one PPP secret per record.
///
/// The source is loaded synchronously on the calling task; see
/// [`RecordSource`]. Use [`seed_records`] with records loaded ahead of time
/// to keep file I/O off the runtime.
pub async fn seed_ppp_secrets<S, R>(
    session: &mut Session<S>,
    source: &R,
    columns: &SeedColumns,
) -> Result<SeedSummary>
where
    S: Stream,
    R: RecordSource + ?Sized,
{
    let records = source.records()?;
    seed_records(session, &records, columns).await
}

/// Create one PPP secret per loaded record.
///
/// Bad records and trapped commands are collected in the summary and the run
/// continues. A transport failure ends the run with `Err`.
pub async fn seed_records<S: Stream>(
    session: &mut Session<S>,
    records: &[Record],
    columns: &SeedColumns,
) -> Result<SeedSummary> {
    tracing::debug!(records = records.len(), "seeding ppp secrets");

    let mut summary = SeedSummary::default();
    for (index, record) in records.iter().enumerate() {
        let label = record
            .get(&columns.user)
            .cloned()
            .unwrap_or_else(|| format!("record {index}"));

        let seed = match SecretSeed::from_record(record, columns) {
            Ok(seed) => seed,
            Err(e) => {
                tracing::warn!(%label, error = %e, "skipping record");
                summary.failed.push((label, OperationError::from(e)));
                continue;
            }
        };

        match ops::create_ppp_secret(session, &seed.name, &seed.password, &seed.extra_attributes())
            .await
        {
            Ok(_) => summary.created += 1,
            Err(e) if e.is_transport() => return Err(e),
            Err(e) => {
                tracing::warn!(%label, error = %e, "secret not created");
                summary.failed.push((label, OperationError::from(e)));
            }
        }
    }

    tracing::debug!(
        created = summary.created,
        failed = summary.failed.len(),
        "seeding finished"
    );
    Ok(summary)
}
