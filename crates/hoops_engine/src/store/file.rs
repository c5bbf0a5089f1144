use std::path::PathBuf;

use hoops_core::{coerce, normalize, EntityKind, Frame, Value};
use hoops_logging::hoops_info;
use serde_json::{Map, Number, Value as Json};

use super::{StorageBackend, StoreError, WriteMode};
use crate::persist::AtomicFileWriter;

/// One JSON-lines file per entity kind.
///
/// Append is read-existing, concatenate, rewrite-whole-file; there is no
/// true incremental append.
#[derive(Debug, Clone)]
pub struct FileStore {
    writer: AtomicFileWriter,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
        }
    }

    pub fn file_name(kind: EntityKind) -> String {
        format!("{}.jsonl", kind.default_table())
    }

    pub fn path(&self, kind: EntityKind) -> PathBuf {
        self.writer.path_of(&Self::file_name(kind))
    }

    /// Reads back the canonical frame for `kind`; a missing file is empty.
    pub fn load(&self, kind: EntityKind) -> Result<Frame, StoreError> {
        let schema = kind.schema();
        let columns = schema.column_names();
        let mut frame = Frame::new(columns.iter().copied());
        for line in self.writer.read_lines(&Self::file_name(kind))? {
            let record: Map<String, Json> = serde_json::from_str(&line)?;
            let row = columns
                .iter()
                .map(|name| record.get(*name).map(from_json).unwrap_or_default())
                .collect();
            frame.push_row(row);
        }
        coerce(&mut frame, schema);
        Ok(frame)
    }
}

#[async_trait::async_trait]
impl StorageBackend for FileStore {
    async fn save(
        &self,
        kind: EntityKind,
        frame: &Frame,
        mode: WriteMode,
    ) -> Result<usize, StoreError> {
        if frame.is_empty() {
            return Ok(0);
        }
        let batch = normalize(frame, kind)?.frame;
        let written = batch.len();
        if written == 0 {
            return Ok(0);
        }

        let combined = match mode {
            WriteMode::Replace => batch,
            WriteMode::Append => {
                let mut existing = self.load(kind)?;
                existing.concat(batch);
                existing
            }
        };

        let lines = combined
            .rows()
            .iter()
            .map(|row| to_json_line(combined.columns(), row))
            .collect::<Result<Vec<_>, _>>()?;
        let path = self.writer.write_lines(&Self::file_name(kind), lines)?;
        hoops_info!(
            "Persisted {} {} rows into {} ({})",
            written,
            kind,
            path.display(),
            mode.as_str()
        );
        Ok(written)
    }

    fn target(&self, kind: EntityKind) -> String {
        self.path(kind).display().to_string()
    }
}

fn to_json_line(columns: &[String], row: &[Value]) -> Result<String, serde_json::Error> {
    let record: Map<String, Json> = columns
        .iter()
        .zip(row)
        .map(|(name, value)| (name.clone(), to_json(value)))
        .collect();
    serde_json::to_string(&record)
}

fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Text(s) => Json::String(s.clone()),
        Value::Int(v) => Json::Number((*v).into()),
        Value::Float(v) => Number::from_f64(*v).map(Json::Number).unwrap_or(Json::Null),
        Value::Date(d) => Json::String(d.format("%Y-%m-%d").to_string()),
    }
}

fn from_json(value: &Json) -> Value {
    match value {
        Json::Null => Value::Null,
        Json::String(s) => Value::text(s.as_str()),
        Json::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float))
            .unwrap_or_default(),
        Json::Bool(b) => Value::Text(b.to_string()),
        other => Value::Text(other.to_string()),
    }
}
