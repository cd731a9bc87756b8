//! Match correlator.
//!
//! Clusters quotes from different bookmakers into groups that denote one
//! real fixture. Greedy, single pass, stable input order: each unassigned
//! quote opens a group and claims every later unassigned quote with the
//! same kickoff time whose home and away teams both match the opener's.
//! Membership is tested against the opener only, so clustering is not a
//! transitive closure.

use chrono::NaiveTime;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

use super::normalize::{canonicalize, CanonicalName};
use crate::types::Quote;

/// Quotes believed to denote one real match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchGroup {
    /// 1-based, in order of group opening.
    pub id: usize,
    pub quotes: Vec<Quote>,
}

impl MatchGroup {
    /// The quote that opened the group.
    pub fn opener(&self) -> Option<&Quote> {
        self.quotes.first()
    }

    pub fn kickoff_time(&self) -> Option<NaiveTime> {
        self.opener().map(|q| q.kickoff_time)
    }

    pub fn description(&self) -> String {
        self.opener()
            .map(Quote::description)
            .unwrap_or_default()
    }

    pub fn home(&self) -> &str {
        self.opener().map(|q| q.home.as_str()).unwrap_or_default()
    }

    pub fn away(&self) -> &str {
        self.opener().map(|q| q.away.as_str()).unwrap_or_default()
    }

    /// Distinct bookmakers, sorted.
    pub fn bookmakers(&self) -> BTreeSet<&str> {
        self.quotes.iter().map(|q| q.bookmaker.as_str()).collect()
    }

    /// Listed by at least two different bookmakers.
    pub fn is_paired(&self) -> bool {
        self.bookmakers().len() >= 2
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

struct Keyed {
    home: CanonicalName,
    away: CanonicalName,
}

/// Cluster quotes into match groups. O(n²) in the number of quotes.
pub fn correlate(quotes: Vec<Quote>) -> Vec<MatchGroup> {
    let total = quotes.len();
    let keys: Vec<Keyed> = quotes
        .iter()
        .map(|q| Keyed {
            home: canonicalize(&q.home),
            away: canonicalize(&q.away),
        })
        .collect();

    let mut used = vec![false; total];
    let mut clusters: Vec<Vec<usize>> = Vec::new();

    for i in 0..total {
        if used[i] {
            continue;
        }
        used[i] = true;
        let mut members = vec![i];

        for j in (i + 1)..total {
            if used[j] || quotes[j].kickoff_time != quotes[i].kickoff_time {
                continue;
            }
            if keys[i].home.shares_token_with(&keys[j].home)
                && keys[i].away.shares_token_with(&keys[j].away)
            {
                debug!(
                    opener = %quotes[i].description(),
                    opener_bookmaker = %quotes[i].bookmaker,
                    candidate = %quotes[j].description(),
                    candidate_bookmaker = %quotes[j].bookmaker,
                    "Quote joins group"
                );
                used[j] = true;
                members.push(j);
            }
        }

        clusters.push(members);
    }

    let mut slots: Vec<Option<Quote>> = quotes.into_iter().map(Some).collect();
    let groups: Vec<MatchGroup> = clusters
        .into_iter()
        .enumerate()
        .map(|(n, members)| MatchGroup {
            id: n + 1,
            quotes: members.into_iter().filter_map(|i| slots[i].take()).collect(),
        })
        .collect();

    info!(
        quotes = total,
        groups = groups.len(),
        paired = groups.iter().filter(|g| g.is_paired()).count(),
        "Correlation complete"
    );

    groups
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
