use chrono::NaiveDate;
use hoops_core::schema::{names, BOXSCORES_SCHEMA, SCHEDULES_SCHEMA, SEASONS_SCHEMA};
use hoops_core::{normalize, EntityKind, Frame, NormalizeError, Value};
use pretty_assertions::assert_eq;

fn frame(columns: &[&str], rows: Vec<Vec<Value>>) -> Frame {
    let mut frame = Frame::new(columns.iter().copied());
    for row in rows {
        frame.push_row(row);
    }
    frame
}

fn schedule_frame() -> Frame {
    frame(
        &[
            "Date", "Team", "PTS", "Opp", "PTS.1", "OT", "Notes", "Date URL", "Season", "League",
            "Schedule URL",
        ],
        vec![vec![
            Value::Date(NaiveDate::from_ymd_opt(2025, 10, 3).unwrap()),
            "Real Madrid".into(),
            "88".into(),
            "Olympiacos".into(),
            "91".into(),
            "OT".into(),
            Value::Null,
            "https://example.com/boxscores/202510030RMA.html".into(),
            "2025-26".into(),
            "EuroLeague".into(),
            "https://example.com/el/2026-schedule.html".into(),
        ]],
    )
}

#[test]
fn seasons_get_keyed_and_ordered() {
    let raw = frame(
        &["Season", "League", "Season URL", "League URL", "Schedule URL", "Lg"],
        vec![vec![
            "2024-25".into(),
            "EuroLeague".into(),
            "https://example.com/el/2025.html".into(),
            "https://example.com/el/".into(),
            "https://example.com/el/2025-schedule.html".into(),
            "EL".into(),
        ]],
    );

    let outcome = normalize(&raw, EntityKind::Unit).unwrap();

    assert_eq!(outcome.frame.columns(), SEASONS_SCHEMA.column_names().as_slice());
    assert_eq!(
        outcome.frame.get(0, names::SEASON_ID),
        Some(&Value::Text("2024_25_EuroLeague".into()))
    );
    assert_eq!(
        outcome.frame.get(0, names::SCHEDULE_URL),
        Some(&Value::Text("https://example.com/el/2025-schedule.html".into()))
    );
    assert_eq!(outcome.dropped_rows, 0);
}

#[test]
fn schedule_passes_apply_in_order() {
    let outcome = normalize(&schedule_frame(), EntityKind::Listing).unwrap();
    let frame = &outcome.frame;

    assert_eq!(frame.columns(), SCHEDULES_SCHEMA.column_names().as_slice());
    assert_eq!(frame.get(0, names::TEAM_NAME_HOME), Some(&Value::Text("Real Madrid".into())));
    assert_eq!(frame.get(0, names::TEAM_NAME_VISITORS), Some(&Value::Text("Olympiacos".into())));
    assert_eq!(frame.get(0, "TeamHomePoints"), Some(&Value::Int(88)));
    assert_eq!(frame.get(0, "TeamVisitorsPoints"), Some(&Value::Int(91)));
    assert_eq!(frame.get(0, "HasGoneOvertime"), Some(&Value::Text("OT".into())));
    assert_eq!(
        frame.get(0, names::GAME_ID),
        Some(&Value::Text("20251003_Real_Madrid_Olympiacos_2025_26_EuroLeague".into()))
    );
    assert_eq!(
        frame.get(0, names::SEASON_ID),
        Some(&Value::Text("2025_26_EuroLeague".into()))
    );
}

#[test]
fn rows_with_null_required_values_are_dropped() {
    let mut raw = schedule_frame();
    let mut orphan = raw.rows()[0].clone();
    orphan[1] = Value::Null;
    raw.push_row(orphan);

    let outcome = normalize(&raw, EntityKind::Listing).unwrap();

    assert_eq!(outcome.frame.len(), 1);
    assert_eq!(outcome.dropped_rows, 1);
}

#[test]
fn missing_required_columns_are_reported() {
    let raw = frame(&["Season"], vec![vec!["2024-25".into()]]);

    let err = normalize(&raw, EntityKind::Unit).unwrap_err();

    assert_eq!(
        err,
        NormalizeError::MissingColumns {
            kind: EntityKind::Unit,
            missing: vec!["Missing required column: League".to_string()],
        }
    );
}

#[test]
fn boxscore_lines_key_off_the_page_url() {
    let raw = frame(
        &[
            "Starters", "MP", "FG", "FG%", "PTS", "TeamRole", "Team", "Date", "Season", "League",
            "Schedule URL", "Date URL",
        ],
        vec![vec![
            "Sergio Llull".into(),
            "24:10".into(),
            "5".into(),
            ".455".into(),
            "14".into(),
            "Home".into(),
            "Real Madrid".into(),
            Value::Date(NaiveDate::from_ymd_opt(2025, 10, 3).unwrap()),
            "2025-26".into(),
            "EuroLeague".into(),
            "https://example.com/el/2026-schedule.html".into(),
            "https://example.com/boxscores/202510030RMA.html".into(),
        ]],
    );

    let outcome = normalize(&raw, EntityKind::Detail).unwrap();
    let frame = &outcome.frame;

    assert_eq!(frame.columns(), BOXSCORES_SCHEMA.column_names().as_slice());
    assert_eq!(
        frame.get(0, names::GAME_ID),
        Some(&Value::Text("202510030RMA_2025_26_EuroLeague".into()))
    );
    assert_eq!(
        frame.get(0, names::BOXSCORE_ID),
        Some(&Value::Text(
            "202510030RMA_2025_26_EuroLeague_Sergio_Llull_Real_Madrid".into()
        ))
    );
    assert_eq!(frame.get(0, names::PLAYER_NAME), Some(&Value::Text("Sergio Llull".into())));
    assert_eq!(frame.get(0, "FieldGoalsMade"), Some(&Value::Int(5)));
    assert_eq!(frame.get(0, "FieldGoalPercentage"), Some(&Value::Float(0.455)));
    assert_eq!(frame.get(0, "Assists"), Some(&Value::Null));
}

#[test]
fn same_player_in_two_games_gets_two_keys() {
    let line = |url: &str| -> Vec<Value> {
        vec![
            "Sergio Llull".into(),
            "Real Madrid".into(),
            "Home".into(),
            Value::Date(NaiveDate::from_ymd_opt(2025, 10, 3).unwrap()),
            "2025-26".into(),
            "EuroLeague".into(),
            url.into(),
        ]
    };
    let raw = frame(
        &["Player", "Team", "TeamRole", "Date", "Season", "League", "Date URL"],
        vec![
            line("https://example.com/boxscores/A.html"),
            line("https://example.com/boxscores/B.html"),
        ],
    );

    let frame = normalize(&raw, EntityKind::Detail).unwrap().frame;

    assert_eq!(
        frame.column(names::GAME_ID).unwrap(),
        vec![
            &Value::Text("A_2025_26_EuroLeague".into()),
            &Value::Text("B_2025_26_EuroLeague".into()),
        ]
    );
    assert_eq!(
        frame.get(1, names::DATE_URL),
        Some(&Value::Text("https://example.com/boxscores/B.html".into()))
    );
    assert_ne!(frame.get(0, names::BOXSCORE_ID), frame.get(1, names::BOXSCORE_ID));
}
