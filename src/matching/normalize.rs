//! Team-name normalisation and alias resolution.
//!
//! Bookmakers spell the same club many ways ("Red Star Belgrade",
//! "FK Crvena Zvezda", "Crvena Zvezda Beograd"). Names are folded to plain
//! lower-case ASCII, resolved through a static alias table and reduced to
//! a token list. Two names denote the same team when their token sets
//! share a meaningful word.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonical club name → spellings seen across bookmakers.
const TEAM_ALIASES: &[(&str, &[&str])] = &[
    ("Villarreal", &["Villareal", "Vila Real", "Villarreal CF"]),
    ("Dinamo Moscow", &["Dynamo Moscow", "Dinamo Moskva", "Dinamo M.", "FC Dynamo Moscow"]),
    ("CSKA Moscow", &["CSKA Moskva", "CSKA M.", "PFC CSKA Moscow"]),
    ("Spartak Moscow", &["Spartak Moskva", "Spartak M.", "FC Spartak Moscow"]),
    ("Lokomotiv Moscow", &["Lokomotiv Moskva", "Lokomotiv M.", "FC Lokomotiv Moscow"]),
    ("Brondby", &["Brøndby", "Brondby IF", "Broendby IF"]),
    ("Nordsjaelland", &["Nordsjalland", "Nordsjaelland FC"]),
    ("Hajduk Split", &["Hajduk", "HNK Hajduk Split"]),
    ("Dinamo Zagreb", &["Dinamo", "GNK Dinamo Zagreb"]),
    ("Soenderjyske", &["Sonderjyske", "Soenderjyske FK"]),
    (
        "Crvena Zvezda",
        &["Red Star", "Red Star Belgrade", "Crvena Zvezda Beograd", "FK Crvena Zvezda"],
    ),
    ("Partizan", &["FK Partizan", "Partizan Beograd"]),
    ("Atletico Madrid", &["Atl Madrid", "Atletico de Madrid", "Atlético Madrid"]),
    ("Athletic Bilbao", &["Athletic Club", "Ath Bilbao", "Athl. Bilbao"]),
    ("Inter", &["Inter Milan", "Inter Milano", "Internazionale", "FC Internazionale"]),
    ("AC Milan", &["Milan", "A.C. Milan"]),
    ("Manchester United", &["Man Utd", "Manchester Utd", "Man United", "Man. United"]),
    ("Manchester City", &["Man City", "Manchester C", "Man. City"]),
    ("Newcastle United", &["Newcastle Utd"]),
    ("Sporting CP", &["Sporting Lisbon", "Sporting Clube de Portugal"]),
    ("Marseille", &["Olympique Marseille", "OM", "O. Marseille"]),
    ("Real Betis", &["Betis", "Real Betis Balompie"]),
    ("Sevilla", &["Sevilla FC"]),
    ("Bayern Munich", &["Bayern Munchen", "Bayern München", "FC Bayern"]),
    ("Koln", &["Cologne", "1. FC Koln", "1. FC Köln", "FC Koln", "FC Köln"]),
    ("Fenerbahce", &["Fenerbahçe", "Fener"]),
    ("Besiktas", &["Beşiktaş", "Besiktas JK"]),
    ("Galatasaray", &["Gala", "Galata", "Galatasaray SK"]),
    ("AIK", &["AIK Stockholm"]),
    ("Rangers", &["Glasgow Rangers"]),
    ("Celtic", &["Celtic Glasgow"]),
    ("LASK Linz", &["LASK"]),
];

/// Generic club-type abbreviations and articles. Age grades, women and
/// reserve markers stay as tokens so they remain visible to the women
/// filter; overlap matching still joins "Partizan U19" with "Partizan".
const STOPWORDS: &[&str] = &[
    "fc", "fk", "cf", "sc", "ac", "bc", "ud", "cd", "sd", "ad", "ca", "afc", "pfc", "sk", "sv",
    "ss", "ks", "ik", "if", "nk", "hnk", "gnk", "jk", "the", "club", "de", "of", "al",
];

const WOMEN_TOKENS: &[&str] = &["women", "womens", "wom", "zene", "zenske"];

/// Shortest token that can carry identity on its own.
const MIN_SHARED_TOKEN_LEN: usize = 2;

static STOPWORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOPWORDS.iter().copied().collect());

/// Phrase key → canonical name, built once on first use.
static ALIAS_INDEX: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    let mut index = HashMap::new();
    for (canonical, aliases) in TEAM_ALIASES {
        for form in std::iter::once(canonical).chain(aliases.iter()) {
            index.insert(phrase_key(form), *canonical);
        }
    }
    index
});

// ---------------------------------------------------------------------------
// Canonical names
// ---------------------------------------------------------------------------

/// Normalised form of a team name. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalName {
    /// Folded phrase after alias resolution, e.g. `"crvena zvezda"`.
    pub phrase: String,
    /// Distinct non-stopword tokens in order of appearance.
    pub tokens: Vec<String>,
}

impl CanonicalName {
    /// Tokens long enough to identify a team.
    pub fn meaningful_tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens
            .iter()
            .map(String::as_str)
            .filter(|t| t.chars().count() >= MIN_SHARED_TOKEN_LEN)
    }

    /// True when the two names share at least one meaningful token.
    pub fn shares_token_with(&self, other: &CanonicalName) -> bool {
        self.meaningful_tokens()
            .any(|t| other.tokens.iter().any(|o| o == t))
    }
}

/// Fold, resolve aliases, tokenise and drop stopwords.
pub fn canonicalize(name: &str) -> CanonicalName {
    let key = phrase_key(name);

    let resolved = ALIAS_INDEX
        .get(&key)
        .or_else(|| ALIAS_INDEX.get(&strip_stopwords(&key)))
        .map(|canonical| phrase_key(canonical))
        .unwrap_or(key);

    let mut tokens: Vec<String> = Vec::new();
    for token in resolved.split(' ').filter(|t| !t.is_empty()) {
        if STOPWORD_SET.contains(token) || tokens.iter().any(|t| t == token) {
            continue;
        }
        tokens.push(token.to_string());
    }

    CanonicalName {
        phrase: resolved,
        tokens,
    }
}

/// Reflexive and symmetric for any name with a token of two or more
/// characters. Not transitive.
pub fn same_team(a: &str, b: &str) -> bool {
    canonicalize(a).shares_token_with(&canonicalize(b))
}

/// Whether the name marks a women's fixture (`Women`, `Wom.`, `(W)`).
pub fn has_women_marker(name: &str) -> bool {
    if name.to_lowercase().contains("(w)") {
        return true;
    }
    phrase_key(name)
        .split(' ')
        .any(|t| WOMEN_TOKENS.contains(&t))
}

// ---------------------------------------------------------------------------
// Folding helpers
// ---------------------------------------------------------------------------

/// Lower-case and strip diacritics, including letters that do not
/// decompose under NFKD.
pub fn fold_diacritics(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.to_lowercase().nfkd().filter(|c| !is_combining_mark(*c)) {
        match c {
            'ø' => out.push('o'),
            'đ' | 'ð' => out.push('d'),
            'ł' => out.push('l'),
            'ß' => out.push_str("ss"),
            'æ' => out.push_str("ae"),
            'œ' => out.push_str("oe"),
            'ı' => out.push('i'),
            'þ' => out.push_str("th"),
            other => out.push(other),
        }
    }
    out
}

/// Folded phrase with punctuation collapsed to single spaces.
fn phrase_key(s: &str) -> String {
    fold_diacritics(s)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_stopwords(key: &str) -> String {
    key.split(' ')
        .filter(|t| !STOPWORD_SET.contains(t))
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
