//! Disc golf rounds: scorecards, the leaderboard and per-player throwing stats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::pct;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hole {
    pub number: u32,
    pub par: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HoleScore {
    pub hole: u32,
    pub strokes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub putts_attempted: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub putts_made: Option<u32>,
    /// `None` when the hole has no fairway to hit, or the player didn't record it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fairway_hit: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub player: String,
    #[serde(default, deserialize_with = "crate::exercise::null_as_default")]
    pub scores: Vec<HoleScore>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscGolfRound {
    pub id: String,
    pub course_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "crate::exercise::null_as_default")]
    pub holes: Vec<Hole>,
    #[serde(default, deserialize_with = "crate::exercise::null_as_default")]
    pub scorecards: Vec<Scorecard>,
}

impl DiscGolfRound {
    pub fn course_par(&self) -> u32 {
        self.holes.iter().map(|hole| hole.par).sum()
    }

    pub fn leaderboard(&self) -> Vec<Standing> {
        leaderboard(&self.holes, &self.scorecards)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Standing {
    pub player: String,
    pub strokes: u32,
    /// Par of the holes this player has a score on.
    pub par: u32,
    pub holes_played: usize,
}

impl Standing {
    pub fn to_par(&self) -> i64 {
        i64::from(self.strokes) - i64::from(self.par)
    }
}

/// Standings sorted by score to par, best first. Ties keep scorecard order.
///
/// Scores on hole numbers the course doesn't have are ignored.
pub fn leaderboard(holes: &[Hole], scorecards: &[Scorecard]) -> Vec<Standing> {
    let mut standings: Vec<Standing> = scorecards
        .iter()
        .map(|card| {
            let mut standing = Standing {
                player: card.player.clone(),
                strokes: 0,
                par: 0,
                holes_played: 0,
            };
            for score in &card.scores {
                let Some(hole) = holes.iter().find(|hole| hole.number == score.hole) else {
                    log::warn!("{} has a score on unknown hole {}", card.player, score.hole);
                    continue;
                };
                standing.strokes += score.strokes;
                standing.par += hole.par;
                standing.holes_played += 1;
            }
            standing
        })
        .collect();
    standings.sort_by_key(Standing::to_par);
    standings
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ratio {
    pub made: u32,
    pub attempted: u32,
}

impl Ratio {
    pub fn percent(&self) -> u32 {
        pct(self.made, self.attempted)
    }
}

pub fn putting_stats(card: &Scorecard) -> Ratio {
    card.scores.iter().fold(Ratio::default(), |acc, score| Ratio {
        made: acc.made + score.putts_made.unwrap_or(0),
        attempted: acc.attempted + score.putts_attempted.unwrap_or(0),
    })
}

/// Fairways hit out of the holes where it was recorded.
pub fn fairway_stats(card: &Scorecard) -> Ratio {
    let recorded = card.scores.iter().filter_map(|score| score.fairway_hit);
    recorded.fold(Ratio::default(), |acc, hit| Ratio {
        made: acc.made + u32::from(hit),
        attempted: acc.attempted + 1,
    })
}
