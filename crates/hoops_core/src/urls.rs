use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static TRAILING_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})\.html?$").expect("trailing year regex"));

/// Year token at the end of a season page URL (`.../2024.html` -> `2024`).
pub fn season_year_from_url(season_url: &str) -> Option<&str> {
    let path = season_url.split(['?', '#']).next().unwrap_or(season_url);
    TRAILING_YEAR
        .captures(path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Derives a season's schedule page from its season URL and league URL.
///
/// `None` when either URL is absent or the season URL carries no year.
pub fn build_schedule_url(season_url: Option<&str>, league_url: Option<&str>) -> Option<String> {
    let year = season_year_from_url(season_url?)?;
    let mut league = league_url?.trim_end_matches('/');
    if league.ends_with(".html") || league.ends_with(".htm") {
        league = league.rsplit_once('/').map(|(dir, _)| dir).unwrap_or(league);
    }
    if league.is_empty() {
        return None;
    }
    Some(format!("{league}/{year}-schedule.html"))
}

/// Resolves an `href` found in a table cell against the site base URL.
pub fn resolve_href(base: &Url, href: &str) -> Option<String> {
    let trimmed = href.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("javascript:") {
        return None;
    }
    if let Ok(url) = Url::parse(trimmed) {
        return Some(url.into());
    }
    base.join(trimmed).ok().map(Into::into)
}
