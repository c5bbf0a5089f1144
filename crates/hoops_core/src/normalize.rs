use hoops_logging::{hoops_debug, hoops_warn};
use thiserror::Error;

use crate::keys;
use crate::schema::{names, ColumnKind, EntityKind, TableSchema};
use crate::{Frame, Value};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("{kind} batch is missing required columns: {}", missing.join(", "))]
    MissingColumns {
        kind: EntityKind,
        missing: Vec<String>,
    },
}

/// Canonical batch plus the number of rows rejected for null required values.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOutcome {
    pub frame: Frame,
    pub dropped_rows: usize,
}

/// Converts a harvested batch into the canonical layout of `kind`.
///
/// Rename passes run first and in order. The batch is then projected onto the
/// schema column order (keys first), coerced to the declared storage types,
/// stripped of rows with null required values, and finally keyed.
pub fn normalize(raw: &Frame, kind: EntityKind) -> Result<NormalizeOutcome, NormalizeError> {
    let schema = kind.schema();
    let mut frame = raw.clone();
    for pass in kind.rename_passes() {
        frame.rename(pass);
    }

    let missing = schema.validate(&frame);
    if !missing.is_empty() {
        return Err(NormalizeError::MissingColumns { kind, missing });
    }

    let unknown: Vec<&String> = frame
        .columns()
        .iter()
        .filter(|c| schema.column(c).is_none())
        .collect();
    if !unknown.is_empty() {
        hoops_debug!("Dropping {} non-canonical {} columns: {:?}", unknown.len(), kind, unknown);
    }

    let mut frame = frame.select(&schema.column_names());
    coerce(&mut frame, schema);

    let before = frame.len();
    let required: Vec<usize> = schema
        .required_columns()
        .into_iter()
        .filter(|name| !schema.key_columns.contains(name))
        .filter_map(|name| frame.column_index(name))
        .collect();
    frame.retain_rows(|_, row| required.iter().all(|&idx| !row[idx].is_null()));
    let dropped_rows = before - frame.len();
    if dropped_rows > 0 {
        hoops_warn!("Dropped {} {} rows with missing required values", dropped_rows, kind);
    }

    derive_keys(&mut frame, kind);
    Ok(NormalizeOutcome {
        frame,
        dropped_rows,
    })
}

/// Coerces every cell to the storage type declared for its column.
pub fn coerce(frame: &mut Frame, schema: &TableSchema) {
    let kinds: Vec<ColumnKind> = frame
        .columns()
        .iter()
        .map(|c| schema.column(c).map(|col| col.kind).unwrap_or(ColumnKind::Text))
        .collect();
    for row in frame.rows_mut() {
        for (cell, kind) in row.iter_mut().zip(&kinds) {
            *cell = coerce_value(std::mem::take(cell), *kind);
        }
    }
}

fn coerce_value(value: Value, kind: ColumnKind) -> Value {
    if value.is_null() {
        return value;
    }
    match kind {
        ColumnKind::Text => match value {
            Value::Text(_) => value,
            other => Value::from_option(other.as_text()),
        },
        ColumnKind::Int => value
            .as_int()
            .or_else(|| value.as_float().map(|f| f.round() as i64))
            .map(Value::Int)
            .unwrap_or(Value::Null),
        ColumnKind::Float => value.as_float().map(Value::Float).unwrap_or(Value::Null),
        ColumnKind::Date => value.as_date().map(Value::Date).unwrap_or(Value::Null),
    }
}

fn text_at<'a>(frame: &'a Frame, row: usize, column: &str) -> &'a str {
    frame
        .get(row, column)
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn derive_keys(frame: &mut Frame, kind: EntityKind) {
    let rows = 0..frame.len();
    match kind {
        EntityKind::Unit => {
            let ids = rows
                .map(|i| {
                    keys::season_id(text_at(frame, i, names::SEASON), text_at(frame, i, names::LEAGUE))
                })
                .map(Value::Text)
                .collect();
            frame.set_column(names::SEASON_ID, ids);
        }
        EntityKind::Listing => {
            let mut season_ids = Vec::with_capacity(frame.len());
            let mut game_ids = Vec::with_capacity(frame.len());
            for i in rows {
                let season = text_at(frame, i, names::SEASON);
                let league = text_at(frame, i, names::LEAGUE_NAME);
                season_ids.push(Value::Text(keys::season_id(season, league)));
                let game = frame
                    .get(i, names::GAME_DATE)
                    .and_then(Value::as_date)
                    .map(|date| {
                        keys::game_id(
                            date,
                            text_at(frame, i, names::TEAM_NAME_HOME),
                            text_at(frame, i, names::TEAM_NAME_VISITORS),
                            season,
                            league,
                        )
                    })
                    .unwrap_or_else(|| keys::UNKNOWN_SEGMENT.to_string());
                game_ids.push(Value::Text(game));
            }
            frame.set_column(names::SEASON_ID, season_ids);
            frame.set_column(names::GAME_ID, game_ids);
        }
        EntityKind::Detail => {
            let mut game_ids = Vec::with_capacity(frame.len());
            let mut line_ids = Vec::with_capacity(frame.len());
            for i in rows {
                let game = keys::game_id_from_url(
                    frame.get(i, names::DATE_URL).and_then(Value::as_str),
                    text_at(frame, i, names::SEASON),
                    text_at(frame, i, names::LEAGUE_NAME),
                );
                line_ids.push(Value::Text(keys::boxscore_id(
                    &game,
                    text_at(frame, i, names::PLAYER_NAME),
                    text_at(frame, i, names::TEAM),
                )));
                game_ids.push(Value::Text(game));
            }
            frame.set_column(names::GAME_ID, game_ids);
            frame.set_column(names::BOXSCORE_ID, line_ids);
        }
    }
}
