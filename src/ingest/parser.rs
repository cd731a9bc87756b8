//! Record parser.
//!
//! Turns the pretty-printed per-match blocks produced by the scrapers into
//! `Quote`s. A block looks like:
//!
//! ```text
//! 18:00  Sub  24.10.  [France 1]
//! Havre  vs  Brest   (ID: 4471)
//! 1=2.10   X=3.40   2=3.60
//! 0-2=1.95   2+=1.30   3+=2.05
//! GG=1.80   IGG=1.95   GG&3+=2.60
//! ```
//!
//! Blocks are separated by a line of `=` characters. A malformed block yields
//! a `ParseError` and never fails the rest of the dump.

use chrono::{Datelike, NaiveDate, NaiveTime};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::debug;

use crate::types::{MarketKey, Quote};

/// Teams line must show up within this many lines after the header.
const TEAMS_LOOKAHEAD: usize = 3;

/// Dates further than this from the reference date are moved to the
/// neighbouring year (a December run seeing "02.01." means next January).
const YEAR_WINDOW_DAYS: i64 = 180;

static RE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*={5,}\s*$").unwrap());
static RE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<time>\d{1,2}:\d{2})(?:\s+(?P<day>\p{L}{2,4}\.?))?(?:\s+(?P<date>\d{1,2}\.\d{1,2}\.?))?(?:\s+\[(?P<league>[^\]]*)\])?\s*$",
    )
    .unwrap()
});
static RE_TIME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?P<time>\d{1,2}:\d{2})\b").unwrap());
static RE_VS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bvs\b\.?").unwrap());
static RE_MATCH_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(ID:\s*(?P<id>[^)]*)\)").unwrap());
static RE_KEY_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s|])(?P<key>(?:IGG|GG)(?:&\d+\+)?|X|\d+(?:-\d+)?\+?)=(?P<val>[^\s|]*)").unwrap()
});

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a block produced no quote.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Block is empty")]
    Empty,

    #[error("Missing header line, got: {0}")]
    MissingHeader(String),

    #[error("Bad kickoff time: {0}")]
    BadTime(String),

    #[error("Missing teams line")]
    MissingTeams,

    #[error("No odds lines after teams line")]
    NoOdds,
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Header {
    time: NaiveTime,
    day: Option<String>,
    date: Option<NaiveDate>,
    league: Option<String>,
}

#[derive(Debug, Clone)]
struct Teams {
    home: String,
    away: String,
    match_id: Option<String>,
}

#[derive(Debug)]
enum State {
    SeekingHeader,
    HaveHeader { header: Header, skipped: usize },
    HaveTeams { header: Header, teams: Teams },
    CollectingOdds {
        header: Header,
        teams: Teams,
        markets: BTreeMap<MarketKey, f64>,
    },
}

/// Result of parsing a whole dump from one bookmaker.
#[derive(Debug, Clone, Default)]
pub struct ParsedDump {
    pub quotes: Vec<Quote>,
    /// Non-blank blocks encountered.
    pub blocks_seen: usize,
    /// Blocks that produced no quote.
    pub malformed: usize,
}

/// Stateless block parser bound to a reference date for year inference.
#[derive(Debug, Clone, Copy)]
pub struct RecordParser {
    reference_date: NaiveDate,
}

impl RecordParser {
    pub fn new(reference_date: NaiveDate) -> Self {
        Self { reference_date }
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    /// Parse every block in a dump. Malformed blocks are logged and counted.
    pub fn parse_dump(&self, bookmaker: &str, text: &str) -> ParsedDump {
        let mut out = ParsedDump::default();

        for block in split_blocks(text) {
            out.blocks_seen += 1;
            match self.parse_block(bookmaker, &block) {
                Ok(quote) => out.quotes.push(quote),
                Err(e) => {
                    debug!(bookmaker, error = %e, "Dropping malformed block");
                    out.malformed += 1;
                }
            }
        }

        out
    }

    /// Parse a single block into a `Quote`.
    pub fn parse_block(&self, bookmaker: &str, block: &str) -> Result<Quote, ParseError> {
        let mut state = State::SeekingHeader;

        for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
            state = match state {
                State::SeekingHeader => State::HaveHeader {
                    header: self.parse_header(line)?,
                    skipped: 0,
                },
                State::HaveHeader { header, skipped } => match parse_teams(line) {
                    Some(teams) => State::HaveTeams { header, teams },
                    None if skipped + 1 >= TEAMS_LOOKAHEAD => return Err(ParseError::MissingTeams),
                    None => State::HaveHeader {
                        header,
                        skipped: skipped + 1,
                    },
                },
                State::HaveTeams { header, teams } => {
                    let mut markets = BTreeMap::new();
                    if collect_odds(line, &mut markets) {
                        State::CollectingOdds {
                            header,
                            teams,
                            markets,
                        }
                    } else {
                        State::HaveTeams { header, teams }
                    }
                }
                State::CollectingOdds {
                    header,
                    teams,
                    mut markets,
                } => {
                    collect_odds(line, &mut markets);
                    State::CollectingOdds {
                        header,
                        teams,
                        markets,
                    }
                }
            };
        }

        match state {
            State::SeekingHeader => Err(ParseError::Empty),
            State::HaveHeader { .. } => Err(ParseError::MissingTeams),
            State::HaveTeams { .. } => Err(ParseError::NoOdds),
            State::CollectingOdds {
                header,
                teams,
                markets,
            } => Ok(Quote {
                bookmaker: bookmaker.to_string(),
                kickoff_time: header.time,
                kickoff_date: header.date,
                day: header.day,
                league: header.league,
                home: teams.home,
                away: teams.away,
                match_id: teams.match_id,
                markets,
            }),
        }
    }

    fn parse_header(&self, line: &str) -> Result<Header, ParseError> {
        if let Some(caps) = RE_HEADER.captures(line) {
            let time = parse_time(&caps["time"])?;
            let date = caps
                .name("date")
                .and_then(|m| parse_day_month(m.as_str()))
                .and_then(|(day, month)| infer_date(day, month, self.reference_date));
            return Ok(Header {
                time,
                day: caps.name("day").map(|m| m.as_str().to_string()),
                date,
                league: caps
                    .name("league")
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|l| !l.is_empty()),
            });
        }

        // Headers with trailing noise still carry a usable kickoff time.
        let caps = RE_TIME
            .captures(line)
            .ok_or_else(|| ParseError::MissingHeader(line.to_string()))?;
        Ok(Header {
            time: parse_time(&caps["time"])?,
            day: None,
            date: None,
            league: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Line helpers
// ---------------------------------------------------------------------------

/// Split a dump into non-blank blocks on separator lines.
pub fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if RE_SEPARATOR.is_match(line) {
            if !current.trim().is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    if !current.trim().is_empty() {
        blocks.push(current);
    }

    blocks
}

fn parse_time(raw: &str) -> Result<NaiveTime, ParseError> {
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| ParseError::BadTime(raw.to_string()))
}

/// `"24.10."` → `(24, 10)`
fn parse_day_month(raw: &str) -> Option<(u32, u32)> {
    let mut parts = raw.trim_end_matches('.').split('.');
    let day = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    Some((day, month))
}

/// Pick the year that puts `day.month` within the window of the reference
/// date, trying the reference year first. Falls back to the closest year
/// where the date exists (`29.02.` only exists in leap years).
pub fn infer_date(day: u32, month: u32, reference: NaiveDate) -> Option<NaiveDate> {
    let year = reference.year();
    let candidates: Vec<NaiveDate> = [year, year - 1, year + 1]
        .into_iter()
        .filter_map(|y| NaiveDate::from_ymd_opt(y, month, day))
        .collect();
    let distance = |date: &NaiveDate| (*date - reference).num_days().abs();

    candidates
        .iter()
        .find(|date| distance(*date) <= YEAR_WINDOW_DAYS)
        .or_else(|| candidates.iter().min_by_key(|date| distance(*date)))
        .copied()
}

fn parse_teams(line: &str) -> Option<Teams> {
    if !RE_VS.is_match(line) {
        return None;
    }

    let match_id = RE_MATCH_ID
        .captures(line)
        .map(|c| c["id"].trim().to_string())
        .filter(|id| !id.is_empty());
    let stripped = RE_MATCH_ID.replace_all(line, " ");

    let parts: Vec<&str> = RE_VS.split(&stripped).collect();
    if parts.len() != 2 {
        return None;
    }

    let clean = |s: &str| s.trim_matches(|c: char| c.is_whitespace() || c == '-').to_string();
    let home = clean(parts[0]);
    let away = clean(parts[1]);
    if home.is_empty() || away.is_empty() {
        return None;
    }

    Some(Teams {
        home,
        away,
        match_id,
    })
}

/// Collect `KEY=value` pairs from one line. Returns whether the line held
/// any recognised pair, populated or not.
fn collect_odds(line: &str, markets: &mut BTreeMap<MarketKey, f64>) -> bool {
    let mut seen = false;

    for caps in RE_KEY_VALUE.captures_iter(line) {
        let Ok(key) = caps["key"].parse::<MarketKey>() else {
            continue;
        };
        seen = true;
        if let Some(value) = parse_odd(&caps["val"]) {
            markets.insert(key, value);
        }
    }

    seen
}

/// `-`, `None`, empty, non-numeric, non-finite and non-positive values all
/// mean "not offered".
pub fn parse_odd(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "-" || raw.eq_ignore_ascii_case("none") {
        return None;
    }
    let value: f64 = raw.replace(',', ".").parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
