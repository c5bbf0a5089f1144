use chrono::NaiveDate;
use hoops_core::{
    boxscore_id, game_id, game_id_from_url, normalize_segment, season_id, UNKNOWN_SEGMENT,
};

#[test]
fn season_id_is_stable_across_calls() {
    let first = season_id("2024-25", "EuroLeague");
    let second = season_id("2024-25", "EuroLeague");
    assert_eq!(first, second);
    assert_eq!(first, "2024_25_EuroLeague");
}

#[test]
fn season_id_differs_for_different_labels() {
    assert_ne!(season_id("2024-25", "EuroLeague"), season_id("2023-24", "EuroLeague"));
    assert_ne!(season_id("2024-25", "EuroLeague"), season_id("2024-25", "EuroCup"));
}

#[test]
fn diacritics_fold_to_ascii() {
    assert_eq!(normalize_segment("Müller", None), "Muller");
    assert_eq!(normalize_segment("Dončić", None), "Doncic");
    assert_eq!(normalize_segment("Olympiacos B.C.", None), "Olympiacos_BC");
}

#[test]
fn empty_segment_becomes_sentinel() {
    assert_eq!(normalize_segment("", None), UNKNOWN_SEGMENT);
    assert_eq!(normalize_segment("   ", None), UNKNOWN_SEGMENT);
    assert_eq!(normalize_segment("???", Some(5)), UNKNOWN_SEGMENT);
    assert_eq!(normalize_segment("東京", None), UNKNOWN_SEGMENT);
}

#[test]
fn truncation_bounds_segment_length() {
    assert_eq!(normalize_segment("Real Madrid Baloncesto", Some(8)), "Real_Mad");
    assert_eq!(normalize_segment("abc", Some(20)), "abc");
}

#[test]
fn game_id_uses_compact_date_and_bounded_teams() {
    let date = NaiveDate::from_ymd_opt(2025, 10, 3).unwrap();
    let id = game_id(
        date,
        "Partizan Mozzart Bet Belgrade",
        "Anadolu Efes",
        "2025-26",
        "EuroLeague",
    );
    assert_eq!(id, "20251003_Partizan_Mozzart_Bet_Anadolu_Efes_2025_26_EuroLeague");
}

#[test]
fn game_id_from_url_uses_page_stem() {
    assert_eq!(
        game_id_from_url(
            Some("https://example.com/boxscores/202410030AAA.html"),
            "2024-25",
            "EuroLeague"
        ),
        "202410030AAA_2024_25_EuroLeague"
    );
    assert_eq!(
        game_id_from_url(None, "2024-25", "EuroLeague"),
        "Unknown_2024_25_EuroLeague"
    );
}

#[test]
fn boxscore_id_truncates_player_and_team() {
    let id = boxscore_id(
        "G1",
        "Giannis Sina Ugo Antetokounmpo Junior",
        "Milwaukee Bucks",
    );
    assert_eq!(id, "G1_Giannis_Sina_Ugo_Antetokounmpo_Milwaukee_Bucks");
}
