//! Canonical column sets, rename passes and table layouts for the three
//! persisted entities.
//!
//! Every storage backend and the normalizer reference these definitions, so
//! column naming lives in exactly one place.

use std::fmt;

use crate::Frame;

/// Storage type of a canonical column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Int,
    Float,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub description: &'static str,
}

const fn col(name: &'static str, kind: ColumnKind, description: &'static str) -> Column {
    Column {
        name,
        kind,
        nullable: true,
        description,
    }
}

const fn required(name: &'static str, kind: ColumnKind, description: &'static str) -> Column {
    Column {
        name,
        kind,
        nullable: false,
        description,
    }
}

/// The three entities of the harvest hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A season within a league.
    Unit,
    /// A scheduled game belonging to a season.
    Listing,
    /// One player line of a game's box score.
    Detail,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Unit, EntityKind::Listing, EntityKind::Detail];

    pub fn schema(self) -> &'static TableSchema {
        match self {
            EntityKind::Unit => &SEASONS_SCHEMA,
            EntityKind::Listing => &SCHEDULES_SCHEMA,
            EntityKind::Detail => &BOXSCORES_SCHEMA,
        }
    }

    /// Ordered rename passes applied by the normalizer.
    pub fn rename_passes(self) -> &'static [&'static [(&'static str, &'static str)]] {
        match self {
            EntityKind::Unit => &[SEASON_RENAME],
            EntityKind::Listing => &[SCHEDULE_RAW_RENAME, SCHEDULE_RENAME],
            EntityKind::Detail => &[BOXSCORE_RAW_RENAME, BOXSCORE_RENAME],
        }
    }

    /// Default table / file stem for this entity.
    pub fn default_table(self) -> &'static str {
        match self {
            EntityKind::Unit => "seasons",
            EntityKind::Listing => "schedules",
            EntityKind::Detail => "boxscores",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Unit => "season",
            EntityKind::Listing => "schedule",
            EntityKind::Detail => "boxscore",
        })
    }
}

#[derive(Debug)]
pub struct TableSchema {
    pub kind: EntityKind,
    /// Primary key first, then foreign keys.
    pub key_columns: &'static [&'static str],
    pub columns: &'static [Column],
    pub description: &'static str,
}

impl TableSchema {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn required_columns(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| !c.nullable)
            .map(|c| c.name)
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Required columns missing from `frame`.
    pub fn validate(&self, frame: &Frame) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !c.nullable && !self.key_columns.contains(&c.name))
            .filter(|c| !frame.has_column(c.name))
            .map(|c| format!("Missing required column: {}", c.name))
            .collect()
    }
}

// Column names shared across the module and its callers.
pub mod names {
    pub const SEASON_ID: &str = "SeasonID";
    pub const SEASON: &str = "Season";
    pub const SEASON_URL: &str = "SeasonURL";
    pub const LEAGUE: &str = "League";
    pub const LEAGUE_URL: &str = "LeagueURL";
    pub const SCHEDULE_URL: &str = "ScheduleURL";

    pub const GAME_ID: &str = "GameID";
    pub const GAME_DATE: &str = "GameDate";
    pub const TEAM_NAME_HOME: &str = "TeamNameHome";
    pub const TEAM_NAME_VISITORS: &str = "TeamNameVisitors";
    pub const DATE_URL: &str = "DateURL";
    pub const LEAGUE_NAME: &str = "LeagueName";

    pub const BOXSCORE_ID: &str = "BoxscoreID";
    pub const PLAYER_NAME: &str = "PlayerName";
    pub const TEAM_ROLE: &str = "TeamRole";
    pub const TEAM: &str = "Team";
    pub const DATE: &str = "Date";

    /// Raw labels used by the harvester before normalization.
    pub mod raw {
        pub const SEASON_URL: &str = "Season URL";
        pub const LEAGUE_URL: &str = "League URL";
        pub const SCHEDULE_URL: &str = "Schedule URL";
        pub const DATE_URL: &str = "Date URL";
        pub const HOME: &str = "Home";
        pub const VISITORS: &str = "Visitors";
    }
}

use ColumnKind::{Date, Float, Int, Text};

static SEASON_COLUMNS: [Column; 6] = [
    required(names::SEASON_ID, Text, "Deterministic season key"),
    required(names::SEASON, Text, "Season label (e.g. '2024-25')"),
    col(names::SEASON_URL, Text, "URL to the season page"),
    required(names::LEAGUE, Text, "League name (e.g. 'EuroLeague')"),
    col(names::LEAGUE_URL, Text, "URL to the league page"),
    col(names::SCHEDULE_URL, Text, "URL to the season schedule page"),
];

static SCHEDULE_COLUMNS: [Column; 13] = [
    required(names::GAME_ID, Text, "Deterministic game key"),
    required(names::SEASON_ID, Text, "Owning season key"),
    required(names::GAME_DATE, Date, "Game date"),
    required(names::TEAM_NAME_HOME, Text, "Home team name"),
    col("TeamHomePoints", Int, "Home team score"),
    required(names::TEAM_NAME_VISITORS, Text, "Visiting team name"),
    col("TeamVisitorsPoints", Int, "Visiting team score"),
    col("HasGoneOvertime", Text, "Overtime indicator"),
    col("Notes", Text, "Additional game notes"),
    col(names::DATE_URL, Text, "URL to the boxscore page"),
    required(names::SEASON, Text, "Season label"),
    required(names::LEAGUE_NAME, Text, "League name"),
    col(names::SCHEDULE_URL, Text, "URL to the schedule page"),
];

static BOXSCORE_COLUMNS: [Column; 29] = [
    required(names::BOXSCORE_ID, Text, "Deterministic boxscore line key"),
    required(names::GAME_ID, Text, "Owning game key, derived from the boxscore URL"),
    col(names::PLAYER_NAME, Text, "Player name"),
    col("MinutesPlayed", Text, "Minutes played"),
    col("FieldGoalsMade", Int, "Field goals made"),
    col("FieldGoalsAttempted", Int, "Field goals attempted"),
    col("FieldGoalPercentage", Float, "Field goal percentage"),
    col("ThreePointMade", Int, "Three-pointers made"),
    col("ThreePointAttempted", Int, "Three-pointers attempted"),
    col("ThreePointPercentage", Float, "Three-point percentage"),
    col("FreeThrowsMade", Int, "Free throws made"),
    col("FreeThrowsAttempted", Int, "Free throws attempted"),
    col("FreeThrowPercentage", Float, "Free throw percentage"),
    col("OffensiveRebounds", Int, "Offensive rebounds"),
    col("DefensiveRebounds", Int, "Defensive rebounds"),
    col("TotalRebounds", Int, "Total rebounds"),
    col("Assists", Int, "Assists"),
    col("Steals", Int, "Steals"),
    col("Blocks", Int, "Blocks"),
    col("Turnovers", Int, "Turnovers"),
    col("PersonalFouls", Int, "Personal fouls"),
    col("Points", Int, "Points scored"),
    required(names::TEAM_ROLE, Text, "Home or Visitors"),
    required(names::TEAM, Text, "Team name"),
    required(names::DATE, Date, "Game date"),
    required(names::SEASON, Text, "Season label"),
    required(names::LEAGUE_NAME, Text, "League name"),
    col(names::SCHEDULE_URL, Text, "URL to the schedule page"),
    col(names::DATE_URL, Text, "URL to the boxscore page"),
];

pub static SEASONS_SCHEMA: TableSchema = TableSchema {
    kind: EntityKind::Unit,
    key_columns: &[names::SEASON_ID],
    columns: &SEASON_COLUMNS,
    description: "Basketball seasons and their associated leagues",
};

pub static SCHEDULES_SCHEMA: TableSchema = TableSchema {
    kind: EntityKind::Listing,
    key_columns: &[names::GAME_ID, names::SEASON_ID],
    columns: &SCHEDULE_COLUMNS,
    description: "Game schedules with dates, teams, and scores",
};

pub static BOXSCORES_SCHEMA: TableSchema = TableSchema {
    kind: EntityKind::Detail,
    key_columns: &[names::BOXSCORE_ID, names::GAME_ID],
    columns: &BOXSCORE_COLUMNS,
    description: "Player-level boxscore statistics per game",
};

pub const SEASON_RENAME: &[(&str, &str)] = &[
    (names::raw::SEASON_URL, names::SEASON_URL),
    (names::raw::LEAGUE_URL, names::LEAGUE_URL),
    (names::raw::SCHEDULE_URL, names::SCHEDULE_URL),
];

/// First schedule pass: source table headers to intermediate names.
pub const SCHEDULE_RAW_RENAME: &[(&str, &str)] = &[
    ("Team", names::raw::HOME),
    ("PTS", "HomePoints"),
    ("Opp", names::raw::VISITORS),
    ("PTS.1", "VisitorsPoints"),
    ("OT", "HasGoneOvertime"),
    (names::raw::DATE_URL, names::DATE_URL),
];

/// Second schedule pass: intermediate names to canonical names.
pub const SCHEDULE_RENAME: &[(&str, &str)] = &[
    ("Date", names::GAME_DATE),
    (names::raw::HOME, names::TEAM_NAME_HOME),
    ("HomePoints", "TeamHomePoints"),
    (names::raw::VISITORS, names::TEAM_NAME_VISITORS),
    ("VisitorsPoints", "TeamVisitorsPoints"),
    (names::LEAGUE, names::LEAGUE_NAME),
    (names::raw::SCHEDULE_URL, names::SCHEDULE_URL),
];

/// Source column order of a schedule table, before any renaming.
pub const SCHEDULE_RAW_COLUMNS: &[&str] =
    &["Date", "Team", "PTS", "Opp", "PTS.1", "OT", "Notes", names::raw::DATE_URL];

/// Some boxscore pages label the player column by lineup group.
pub const BOXSCORE_RAW_RENAME: &[(&str, &str)] = &[
    ("Starters", "Player"),
    (names::raw::DATE_URL, names::DATE_URL),
];

pub const BOXSCORE_RENAME: &[(&str, &str)] = &[
    ("Player", names::PLAYER_NAME),
    ("MP", "MinutesPlayed"),
    ("FG", "FieldGoalsMade"),
    ("FGA", "FieldGoalsAttempted"),
    ("FG%", "FieldGoalPercentage"),
    ("3P", "ThreePointMade"),
    ("3PA", "ThreePointAttempted"),
    ("3P%", "ThreePointPercentage"),
    ("FT", "FreeThrowsMade"),
    ("FTA", "FreeThrowsAttempted"),
    ("FT%", "FreeThrowPercentage"),
    ("ORB", "OffensiveRebounds"),
    ("DRB", "DefensiveRebounds"),
    ("TRB", "TotalRebounds"),
    ("AST", "Assists"),
    ("STL", "Steals"),
    ("BLK", "Blocks"),
    ("TOV", "Turnovers"),
    ("PF", "PersonalFouls"),
    ("PTS", "Points"),
    (names::raw::SCHEDULE_URL, names::SCHEDULE_URL),
    (names::LEAGUE, names::LEAGUE_NAME),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_columns_lead_every_schema() {
        for kind in EntityKind::ALL {
            let schema = kind.schema();
            let names = schema.column_names();
            assert_eq!(&names[..schema.key_columns.len()], schema.key_columns);
        }
    }

    #[test]
    fn boxscore_vocabulary_targets_schema_columns() {
        for (_, to) in BOXSCORE_RENAME {
            assert!(BOXSCORES_SCHEMA.column(to).is_some(), "{to} not in schema");
        }
    }
}
