//! The three-level walk: season index -> season schedules -> game boxscores.
//!
//! Only the season index is essential. A schedule or boxscore page that
//! cannot be fetched or parsed is logged, counted and skipped.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use hoops_core::schema::names;
use hoops_core::{
    build_schedule_url, parse_event_date, resolve_href, EntityKind, Frame, Value,
};
use hoops_logging::{hoops_debug, hoops_error, hoops_info, hoops_warn};
use thiserror::Error;
use url::Url;

use crate::events::{EventSink, HarvestEvent, LogEventSink, Stage};
use crate::extract::{extract_primary_table, extract_table, find_column, parse_page, TableData};
use crate::locate::{default_strategies, locate_role_tables, RoleTableStrategy};
use crate::store::{StorageBackend, WriteMode};
use crate::{ExtractError, FetchError, Fetcher, Role};

pub const DEFAULT_BASE_URL: &str = "https://www.basketball-reference.com";
pub const DEFAULT_START_PATH: &str = "/international/years/";

const SEASON_CANDIDATES: &[&str] = &["Season"];
const LEAGUE_CANDIDATES: &[&str] = &["League", "Leagues"];
const DATE_CANDIDATES: &[&str] = &["Date"];

/// Columns of a harvested season row.
pub const UNIT_COLUMNS: &[&str] = &[
    names::SEASON,
    names::raw::SEASON_URL,
    names::LEAGUE,
    names::raw::LEAGUE_URL,
    names::raw::SCHEDULE_URL,
];

/// Columns of a harvested schedule row, after the first schedule rename pass.
pub const LISTING_COLUMNS: &[&str] = &[
    names::DATE,
    names::raw::HOME,
    "HomePoints",
    names::raw::VISITORS,
    "VisitorsPoints",
    "HasGoneOvertime",
    "Notes",
    names::DATE_URL,
    names::SEASON,
    names::LEAGUE,
    names::raw::SCHEDULE_URL,
];

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("failed to fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("failed to parse {url}")]
    Extract {
        url: String,
        #[source]
        source: ExtractError,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitReport {
    pub rows: usize,
    pub dropped_missing_labels: usize,
    pub without_listing_url: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingReport {
    pub units_attempted: usize,
    pub units_skipped: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailReport {
    pub pages_fetched: usize,
    pub pages_skipped: usize,
    pub listings_without_tables: usize,
    pub rows: usize,
    pub rows_flushed: usize,
    pub flush_failures: usize,
    pub fallback_assignments: usize,
}

#[derive(Debug, Clone)]
enum CachedPage {
    Tables(Vec<(Role, Frame)>),
    Failed,
}

/// Boxscore pages seen during one run, keyed by URL.
///
/// Owned by the caller and passed into [`Harvester::harvest_details`]; drop
/// it at the end of the run. Failed pages are remembered too, so each URL is
/// fetched at most once.
#[derive(Debug, Default)]
pub struct DetailCache {
    pages: HashMap<String, CachedPage>,
}

impl DetailCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.pages.contains_key(url)
    }
}

/// A schedule's boxscore tables, parsed from one page.
struct ParsedBoxscore {
    tables: Vec<(Role, Frame)>,
    fallbacks: Vec<(Role, &'static str)>,
}

pub struct Harvester {
    fetcher: Box<dyn Fetcher>,
    base_url: Url,
    start_path: String,
    max_units: Option<usize>,
    strategies: Vec<Box<dyn RoleTableStrategy>>,
    events: Box<dyn EventSink>,
}

impl Harvester {
    pub fn new(fetcher: impl Fetcher + 'static, base_url: Url) -> Self {
        Self {
            fetcher: Box::new(fetcher),
            base_url,
            start_path: DEFAULT_START_PATH.to_string(),
            max_units: None,
            strategies: default_strategies(),
            events: Box::new(LogEventSink),
        }
    }

    pub fn with_start_path(mut self, path: impl Into<String>) -> Self {
        self.start_path = path.into();
        self
    }

    /// Walk at most `max` seasons, in page order.
    pub fn with_max_units(mut self, max: Option<usize>) -> Self {
        self.max_units = max;
        self
    }

    pub fn with_strategies(mut self, strategies: Vec<Box<dyn RoleTableStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_events(mut self, events: impl EventSink + 'static) -> Self {
        self.events = Box::new(events);
        self
    }

    pub fn start_url(&self) -> String {
        resolve_href(&self.base_url, &self.start_path)
            .unwrap_or_else(|| self.base_url.to_string())
    }

    fn resolve(&self, href: Option<&str>) -> Value {
        Value::from_option(href.and_then(|h| resolve_href(&self.base_url, h)))
    }

    /// Fetches the season index and parses it; the run cannot continue
    /// without it.
    pub async fn harvest_units(&self) -> Result<(Frame, UnitReport), HarvestError> {
        let url = self.start_url();
        hoops_info!("Starting season harvest from {}", url);
        self.events.emit(HarvestEvent::StageStarted {
            stage: Stage::Units,
            items: 1,
        });
        let html = self
            .fetcher
            .fetch(&url)
            .await
            .map_err(|source| HarvestError::Fetch {
                url: url.clone(),
                source,
            })?;
        self.parse_units(&html)
            .map_err(|source| HarvestError::Extract { url, source })
    }

    /// Season rows from the index page: labels, their page URLs and the
    /// derived schedule URL.
    pub fn parse_units(&self, html: &str) -> Result<(Frame, UnitReport), ExtractError> {
        let TableData { values, links } = extract_primary_table(html)?;
        let season_col = find_column(&values, names::SEASON, SEASON_CANDIDATES)?;
        let league_col = find_column(&values, names::LEAGUE, LEAGUE_CANDIDATES)?;
        let link_cols = match &links {
            Some(links) => Some((
                find_column(links, names::raw::SEASON_URL, SEASON_CANDIDATES)?,
                find_column(links, names::raw::LEAGUE_URL, LEAGUE_CANDIDATES)?,
            )),
            None => None,
        };

        let mut frame = Frame::new(UNIT_COLUMNS.iter().copied());
        let mut report = UnitReport::default();
        for row in 0..values.len() {
            if self.max_units.is_some_and(|max| frame.len() >= max) {
                break;
            }
            let season = values.get(row, season_col).cloned().unwrap_or_default();
            let league = values.get(row, league_col).cloned().unwrap_or_default();
            if season.is_null() || league.is_null() {
                report.dropped_missing_labels += 1;
                continue;
            }
            let (season_url, league_url) = match (&links, link_cols) {
                (Some(links), Some((season_link, league_link))) => (
                    self.resolve(links.get(row, season_link).and_then(Value::as_str)),
                    self.resolve(links.get(row, league_link).and_then(Value::as_str)),
                ),
                _ => (Value::Null, Value::Null),
            };
            let schedule_url = Value::from_option(build_schedule_url(
                season_url.as_str(),
                league_url.as_str(),
            ));
            if schedule_url.is_null() {
                report.without_listing_url += 1;
            }
            frame.push_row(vec![season, season_url, league, league_url, schedule_url]);
        }

        report.rows = frame.len();

        if report.dropped_missing_labels > 0 {
            self.events.emit(HarvestEvent::RowsDropped {
                stage: Stage::Units,
                reason: "missing season or league label",
                count: report.dropped_missing_labels,
            });
        }
        hoops_info!("Parsed {} season rows with schedule URLs", report.rows);
        Ok((frame, report))
    }

    /// Fetches every season's schedule; failing seasons are skipped.
    pub async fn harvest_listings(&self, units: &Frame) -> (Frame, ListingReport) {
        let mut combined = Frame::new(LISTING_COLUMNS.iter().copied());
        let mut report = ListingReport::default();
        self.events.emit(HarvestEvent::StageStarted {
            stage: Stage::Listings,
            items: units.len(),
        });

        for row in 0..units.len() {
            let text = |column: &str| {
                units
                    .get(row, column)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            let schedule_url = text(names::raw::SCHEDULE_URL);
            if schedule_url.is_empty() {
                continue;
            }
            let (season, league) = (text(names::SEASON), text(names::LEAGUE));
            report.units_attempted += 1;
            hoops_info!("Harvesting schedule for {} {} ({})", league, season, schedule_url);

            match self.harvest_listing(&season, &league, &schedule_url).await {
                Ok((frame, dropped)) => {
                    hoops_info!(
                        "Harvested {} schedule rows for {} {}",
                        frame.len(),
                        league,
                        season
                    );
                    report.rows_kept += frame.len();
                    report.rows_dropped += dropped;
                    combined.concat(frame);
                }
                Err(err) => {
                    hoops_error!(
                        "Failed to harvest schedule for {} {}: {}",
                        league,
                        season,
                        error_chain(&err)
                    );
                    report.units_skipped += 1;
                    self.events.emit(HarvestEvent::ItemSkipped {
                        stage: Stage::Listings,
                        url: schedule_url,
                        reason: err.to_string(),
                    });
                }
            }
        }

        if report.rows_dropped > 0 {
            self.events.emit(HarvestEvent::RowsDropped {
                stage: Stage::Listings,
                reason: "unparseable date",
                count: report.rows_dropped,
            });
        }
        hoops_info!(
            "Aggregated {} schedule rows across {} seasons ({} skipped)",
            combined.len(),
            report.units_attempted,
            report.units_skipped
        );
        (combined, report)
    }

    /// One season's schedule rows plus the count of rows dropped for an
    /// unparseable date.
    pub async fn harvest_listing(
        &self,
        season: &str,
        league: &str,
        schedule_url: &str,
    ) -> Result<(Frame, usize), HarvestError> {
        let html = self
            .fetcher
            .fetch(schedule_url)
            .await
            .map_err(|source| HarvestError::Fetch {
                url: schedule_url.to_string(),
                source,
            })?;
        self.parse_listing(&html, season, league, schedule_url)
            .map_err(|source| HarvestError::Extract {
                url: schedule_url.to_string(),
                source,
            })
    }

    /// Keeps rows whose date parses, in page order, and tags them with
    /// their season.
    pub fn parse_listing(
        &self,
        html: &str,
        season: &str,
        league: &str,
        schedule_url: &str,
    ) -> Result<(Frame, usize), ExtractError> {
        let TableData { values, links } = extract_primary_table(html)?;
        let date_col = find_column(&values, names::DATE, DATE_CANDIDATES)?;
        let date_links = links
            .as_ref()
            .and_then(|links| find_column(links, names::raw::DATE_URL, DATE_CANDIDATES).ok());

        let mut dates = Vec::new();
        let mut date_urls = Vec::new();
        let mut keep = Vec::with_capacity(values.len());
        for row in 0..values.len() {
            let parsed = values
                .get(row, date_col)
                .and_then(Value::as_str)
                .and_then(parse_event_date);
            keep.push(parsed.is_some());
            if let Some(date) = parsed {
                dates.push(Value::Date(date));
                let href = match (&links, date_links) {
                    (Some(links), Some(col)) => links.get(row, col).and_then(Value::as_str),
                    _ => None,
                };
                date_urls.push(self.resolve(href));
            }
        }
        let dropped = keep.iter().filter(|k| !**k).count();

        let mut flags = keep.into_iter();
        let mut frame = values;
        frame.retain_rows(|_, _| flags.next().unwrap_or(false));
        frame.rename(&[(date_col, names::DATE)]);
        let mut frame = frame.select(hoops_core::schema::SCHEDULE_RAW_COLUMNS);
        frame.set_column(names::DATE, dates);
        frame.set_column(names::raw::DATE_URL, date_urls);
        frame.fill_column(names::SEASON, Value::text(season));
        frame.fill_column(names::LEAGUE, Value::text(league));
        frame.fill_column(names::raw::SCHEDULE_URL, Value::text(schedule_url));
        frame.rename(hoops_core::schema::SCHEDULE_RAW_RENAME);
        Ok((frame, dropped))
    }

    /// Fetches each distinct boxscore page once and tags its tables.
    ///
    /// With a `sink`, each game's rows are saved right after extraction and
    /// not kept: the returned frame is empty and `DetailReport::rows` counts
    /// what was harvested. The first successful save replaces, every later
    /// one appends. A page shared by several listings is tagged once, for
    /// the first listing that references it.
    pub async fn harvest_details(
        &self,
        listings: &Frame,
        cache: &mut DetailCache,
        sink: Option<&dyn StorageBackend>,
    ) -> (Frame, DetailReport) {
        let mut combined = Frame::default();
        let mut report = DetailReport::default();
        let mut next_mode = WriteMode::Replace;
        let mut tagged: HashSet<String> = HashSet::new();
        self.events.emit(HarvestEvent::StageStarted {
            stage: Stage::Details,
            items: listings.len(),
        });

        for row in 0..listings.len() {
            let cell = |column: &str| listings.get(row, column).cloned().unwrap_or_default();
            let Some(date_url) = cell(names::DATE_URL).as_text() else {
                continue;
            };

            if !cache.contains(&date_url) {
                hoops_info!(
                    "Harvesting boxscore for {} vs {} on {} ({})",
                    cell(names::raw::HOME),
                    cell(names::raw::VISITORS),
                    cell(names::DATE),
                    date_url
                );
                let page = match self.fetcher.fetch(&date_url).await {
                    Ok(html) => {
                        report.pages_fetched += 1;
                        let parsed = self.parse_boxscore(&html);
                        for (role, strategy) in parsed.fallbacks {
                            report.fallback_assignments += 1;
                            self.events.emit(HarvestEvent::FallbackUsed {
                                url: date_url.clone(),
                                role,
                                strategy,
                            });
                        }
                        CachedPage::Tables(parsed.tables)
                    }
                    Err(err) => {
                        hoops_error!(
                            "Failed to fetch boxscore {} for {} vs {}: {}",
                            date_url,
                            cell(names::raw::HOME),
                            cell(names::raw::VISITORS),
                            error_chain(&err)
                        );
                        report.pages_skipped += 1;
                        self.events.emit(HarvestEvent::ItemSkipped {
                            stage: Stage::Details,
                            url: date_url.clone(),
                            reason: err.to_string(),
                        });
                        CachedPage::Failed
                    }
                };
                cache.pages.insert(date_url.clone(), page);
            }

            if !tagged.insert(date_url.clone()) {
                hoops_debug!("Boxscore {} already tagged for an earlier listing", date_url);
                continue;
            }

            let tables = match cache.pages.get(&date_url) {
                Some(CachedPage::Tables(tables)) if !tables.is_empty() => tables,
                Some(CachedPage::Failed) => continue,
                _ => {
                    hoops_warn!("No boxscore tables found for {}", date_url);
                    report.listings_without_tables += 1;
                    continue;
                }
            };

            let mut game = Frame::default();
            for role in Role::ALL {
                let team_column = match role {
                    Role::Visitors => names::raw::VISITORS,
                    Role::Home => names::raw::HOME,
                };
                let team = cell(team_column);
                if team.is_null() {
                    continue;
                }
                let Some((_, table)) = tables.iter().find(|(r, _)| *r == role) else {
                    continue;
                };
                let mut lines = table.clone();
                lines.fill_column(names::TEAM_ROLE, Value::text(role.as_str()));
                lines.fill_column(names::TEAM, team);
                lines.fill_column(names::DATE, cell(names::DATE));
                lines.fill_column(names::SEASON, cell(names::SEASON));
                lines.fill_column(names::LEAGUE, cell(names::LEAGUE));
                lines.fill_column(names::raw::SCHEDULE_URL, cell(names::raw::SCHEDULE_URL));
                lines.fill_column(names::DATE_URL, Value::text(date_url.as_str()));
                game.concat(lines);
            }
            if game.is_empty() {
                report.listings_without_tables += 1;
                continue;
            }

            report.rows += game.len();
            let Some(sink) = sink else {
                combined.concat(game);
                continue;
            };
            match sink.save(EntityKind::Detail, &game, next_mode).await {
                Ok(rows) => {
                    report.rows_flushed += rows;
                    self.events.emit(HarvestEvent::RowsPersisted {
                        kind: EntityKind::Detail,
                        rows,
                        mode: next_mode,
                    });
                    next_mode = WriteMode::Append;
                }
                Err(err) => {
                    hoops_error!(
                        "Failed to persist boxscore rows for {}: {}",
                        date_url,
                        error_chain(&err)
                    );
                    report.flush_failures += 1;
                }
            }
        }

        if report.pages_skipped > 0 {
            hoops_info!(
                "Skipped {} boxscore pages due to fetch errors",
                report.pages_skipped
            );
        }
        hoops_info!("Collected {} boxscore rows", report.rows);
        (combined, report)
    }

    fn parse_boxscore(&self, html: &str) -> ParsedBoxscore {
        let document = parse_page(html);
        let matches = locate_role_tables(&document, &self.strategies);
        let fallbacks = matches
            .iter()
            .filter(|m| m.tier > 0)
            .map(|m| (m.role, m.strategy))
            .collect();
        let tables = matches
            .into_iter()
            .map(|m| (m.role, extract_table(m.table).values))
            .collect();
        ParsedBoxscore { tables, fallbacks }
    }
}

/// Schedule rows played on `date`.
pub fn filter_listings_by_date(listings: &Frame, date: NaiveDate) -> Frame {
    let mut filtered = listings.clone();
    let Some(idx) = filtered.column_index(names::DATE) else {
        return Frame::new(listings.columns().iter().cloned());
    };
    filtered.retain_rows(|_, row| row[idx].as_date() == Some(date));
    filtered
}

/// Renders an error with its `source()` chain.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
