//! Canned reply selection.
//!
//! Input text is lowercased and checked for substring membership against
//! ordered keyword groups. The first group that matches picks a reply from its
//! pool; no match falls through to the default pool.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

pub const GREETING: &str =
    "Hello! I'm your FPL assistant. How can I help you with your Fantasy Premier League team today?";

const GREETING_POOL: &[&str] = &[
    GREETING,
    "Hi there! Ready to dominate your FPL league? What would you like to know?",
    "Welcome to your FPL companion! Ask me anything about transfers, captains, or strategy!",
];

const TRANSFERS_POOL: &[&str] = &[
    "For transfers, consider players with good fixtures, form, and value. Who are you thinking of bringing in?",
    "Transfer tips: Look at upcoming fixtures, player form over the last 4-6 games, and injury news. What's your current dilemma?",
    "Smart transfers win leagues! Check fixture difficulty, player ownership, and price changes. What position needs strengthening?",
];

const CAPTAIN_POOL: &[&str] = &[
    "Captain choice is crucial! Look for players with good fixtures, home advantage, and recent form. Who are your options?",
    "For captaincy, consider: fixture difficulty, player form, penalty takers, and differential potential. What's your shortlist?",
    "The captain gets double points, so choose wisely! Premium players with good fixtures are usually safe bets.",
];

const FIXTURES_POOL: &[&str] = &[
    "Fixture analysis is key! Green fixtures (2-3 difficulty) are ideal for captains and transfers. Which gameweek are you planning for?",
    "Good fixtures can make or break your gameweek. Look 3-4 weeks ahead for transfer planning. Need help with any specific teams?",
    "Fixture difficulty ratings help identify the best players to target. Which teams have caught your eye?",
];

const SALAH_POOL: &[&str] = &[
    "Salah is always a premium option! He's consistent, takes penalties, and Liverpool usually have good attacking returns. Consider his fixtures and recent form.",
];

const HAALAND_POOL: &[&str] = &[
    "Haaland is the ultimate premium striker! His goal-scoring record is incredible, but he can be rotated. Check Pep's press conferences for hints!",
];

const WILDCARD_POOL: &[&str] = &[
    "Wildcard timing is crucial! Use it when you need major team changes, during international breaks, or before double gameweeks. Have you identified your targets?",
];

const DEFAULT_POOL: &[&str] = &[
    "That's an interesting question! For specific FPL advice, try asking about transfers, captains, fixtures, or player recommendations.",
    "I'd love to help with that! Could you be more specific about your FPL question? I can help with team selection, transfers, and strategy.",
    "Great question! I'm here to help with all things FPL. What specific aspect of your team would you like to discuss?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Greeting,
    Transfers,
    Captain,
    Fixtures,
    Salah,
    Haaland,
    Wildcard,
    Default,
}

impl Category {
    /// Keyword groups in match order. `Default` is not listed; it is the fallback.
    pub const ORDERED: [Category; 7] = [
        Category::Greeting,
        Category::Transfers,
        Category::Captain,
        Category::Fixtures,
        Category::Salah,
        Category::Haaland,
        Category::Wildcard,
    ];

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Category::Greeting => &["hello", "hi", "hey"],
            Category::Transfers => &["transfer", "buy", "sell"],
            Category::Captain => &["captain", "armband"],
            Category::Fixtures => &["fixture", "match", "game"],
            Category::Salah => &["salah"],
            Category::Haaland => &["haaland"],
            Category::Wildcard => &["wildcard"],
            Category::Default => &[],
        }
    }

    pub fn pool(self) -> &'static [&'static str] {
        match self {
            Category::Greeting => GREETING_POOL,
            Category::Transfers => TRANSFERS_POOL,
            Category::Captain => CAPTAIN_POOL,
            Category::Fixtures => FIXTURES_POOL,
            Category::Salah => SALAH_POOL,
            Category::Haaland => HAALAND_POOL,
            Category::Wildcard => WILDCARD_POOL,
            Category::Default => DEFAULT_POOL,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponsePolicy;

impl ResponsePolicy {
    pub fn classify(&self, text: &str) -> Category {
        let lowered = text.to_lowercase();
        Category::ORDERED
            .into_iter()
            .find(|category| category.keywords().iter().any(|kw| lowered.contains(kw)))
            .unwrap_or(Category::Default)
    }

    pub fn respond<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> &'static str {
        let category = self.classify(text);
        pick(category.pool(), rng)
    }
}

/// Uniform pick from a non-empty pool.
pub(crate) fn pick<R: Rng + ?Sized>(pool: &'static [&'static str], rng: &mut R) -> &'static str {
    pool.choose(rng).copied().unwrap_or(GREETING)
}
