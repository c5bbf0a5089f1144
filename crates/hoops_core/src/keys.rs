//! Deterministic composite keys.
//!
//! Keys are pure functions of business fields: harvesting the same season,
//! game or player line twice always yields the same key, which is what makes
//! append-mode writes and re-runs safe.

use chrono::NaiveDate;
use unicode_normalization::UnicodeNormalization;

/// Substituted whenever a key segment normalizes to nothing.
pub const UNKNOWN_SEGMENT: &str = "Unknown";

/// Maximum length of a team / participant segment.
pub const TEAM_SEGMENT_LEN: usize = 20;

/// Maximum length of a player / line-item segment.
pub const PLAYER_SEGMENT_LEN: usize = 30;

const SEPARATOR: char = '_';

/// Reduces `text` to an ASCII key segment.
///
/// Diacritics are stripped through compatibility decomposition, spaces and
/// hyphens become `_`, anything else that is not alphanumeric is dropped.
pub fn normalize_segment(text: &str, max_len: Option<usize>) -> String {
    let mut out: String = text
        .trim()
        .nfkd()
        .filter(char::is_ascii)
        .filter_map(|c| match c {
            ' ' | '-' => Some(SEPARATOR),
            c if c.is_ascii_alphanumeric() || c == SEPARATOR => Some(c),
            _ => None,
        })
        .collect();
    if let Some(max) = max_len {
        out.truncate(max);
    }
    if out.is_empty() {
        UNKNOWN_SEGMENT.to_string()
    } else {
        out
    }
}

fn join(segments: &[&str]) -> String {
    segments.join("_")
}

/// `SeasonID` from the season label and league name.
pub fn season_id(season: &str, league: &str) -> String {
    join(&[
        &normalize_segment(season, None),
        &normalize_segment(league, None),
    ])
}

/// `GameID` from the full business tuple of a schedule row.
pub fn game_id(date: NaiveDate, home: &str, visitors: &str, season: &str, league: &str) -> String {
    let date = date.format("%Y%m%d").to_string();
    join(&[
        &date[..date.len().min(8)],
        &normalize_segment(home, Some(TEAM_SEGMENT_LEN)),
        &normalize_segment(visitors, Some(TEAM_SEGMENT_LEN)),
        &season_id(season, league),
    ])
}

/// `GameID` derived from a boxscore page URL.
///
/// The last path segment without its extension identifies a game uniquely,
/// so boxscore lines can be keyed without the full schedule row at hand.
pub fn game_id_from_url(date_url: Option<&str>, season: &str, league: &str) -> String {
    let stem = date_url
        .map(url_stem)
        .map(|stem| normalize_segment(stem, None))
        .unwrap_or_else(|| UNKNOWN_SEGMENT.to_string());
    join(&[&stem, &season_id(season, league)])
}

/// `BoxscoreID` from the owning game key, the player and the team.
pub fn boxscore_id(game_id: &str, player: &str, team: &str) -> String {
    join(&[
        game_id,
        &normalize_segment(player, Some(PLAYER_SEGMENT_LEN)),
        &normalize_segment(team, Some(TEAM_SEGMENT_LEN)),
    ])
}

fn url_stem(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.trim_end_matches('/').rsplit('/').next().unwrap_or(path);
    match last.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => last,
    }
}
