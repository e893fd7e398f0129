//! Cricket Live — scoreboard text
//!
//! Pure rendering of provider matches into Telegram HTML messages.
//! Two modes: a compact multi-match board (`format_compact`) and a detailed
//! single-match card (`format_single`).

use chrono::{DateTime, Utc};
use cricket_feed::{InningsScore, Match};

pub const NO_LIVE_MATCHES: &str = "❌ No live matches right now. Check back later!";

/// Live matches shown on the compact board
pub const COMPACT_LIVE_LIMIT: usize = 5;
/// Non-live matches shown under the live block
pub const COMPACT_OTHER_LIMIT: usize = 3;
pub const TEAM_NAME_CHARS: usize = 20;
pub const STATUS_CHARS: usize = 50;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━";

// ====================================================================
// Classification
// ====================================================================

pub fn is_live(m: &Match) -> bool {
    let status = m.status.to_lowercase();
    if status.contains("live") || status.contains("innings") {
        return true;
    }
    !m.score.is_empty() && !status.contains("won") && !status.contains("match not started")
}

/// Innings belonging to `teams[team_index]`.
///
/// The first innings whose label contains the team's first name token
/// (case-insensitive) wins; when no label matches, the innings at the same
/// position as the team is used.
pub fn team_score(m: &Match, team_index: usize) -> Option<&InningsScore> {
    let team = m.teams.get(team_index)?;
    let token = team.split_whitespace().next().unwrap_or("").to_lowercase();

    if !token.is_empty() {
        if let Some(innings) = m
            .score
            .iter()
            .find(|s| s.inning.to_lowercase().contains(&token))
        {
            return Some(innings);
        }
    }

    m.score.get(team_index)
}

// ====================================================================
// Rendering
// ====================================================================

pub fn format_compact(matches: &[Match]) -> String {
    format_compact_at(matches, Utc::now())
}

/// `format_compact` with an explicit "updated at" time.
pub fn format_compact_at(matches: &[Match], now: DateTime<Utc>) -> String {
    if matches.is_empty() {
        return NO_LIVE_MATCHES.to_string();
    }

    let (live, other): (Vec<&Match>, Vec<&Match>) = matches.iter().partition(|m| is_live(m));

    let mut msg = String::from("🏏 <b>LIVE CRICKET SCORES</b>\n");
    msg.push_str(&format!("🕐 Updated: {}\n\n", now.format("%H:%M:%S UTC")));

    msg.push_str("🔴 <b>LIVE</b>\n");
    if live.is_empty() {
        msg.push_str("No match in progress right now.\n");
    }
    for m in live.iter().take(COMPACT_LIVE_LIMIT) {
        msg.push_str(&format_mini(m));
        msg.push('\n');
    }

    if !other.is_empty() {
        msg.push_str("\n📋 <b>OTHER MATCHES</b>\n");
        for m in other.iter().take(COMPACT_OTHER_LIMIT) {
            msg.push_str(&format_mini(m));
            msg.push('\n');
        }
    }

    msg.push_str("\n🔄 /live for auto-updates • /score for scorecards");
    msg
}

pub fn format_mini(m: &Match) -> String {
    let mut line = String::from("🏏 ");
    for idx in 0..2 {
        if idx == 1 {
            line.push_str(" vs ");
        }
        let name = m.teams.get(idx).map(String::as_str).unwrap_or("TBA");
        line.push_str(&format!("<b>{}</b>", escape_html(&truncate(name, TEAM_NAME_CHARS))));
        if let Some(s) = team_score(m, idx) {
            line.push(' ');
            line.push_str(&score_text(s));
        }
    }

    let status = truncate(m.status.trim(), STATUS_CHARS);
    if !status.is_empty() {
        line.push_str(&format!("\n   <i>{}</i>", escape_html(&status)));
    }
    line
}

pub fn format_single(m: &Match) -> String {
    let marker = if is_live(m) { "🔴 <b>LIVE</b>" } else { "⚪ <b>NOT LIVE</b>" };

    let mut msg = format!("{RULE}\n{marker}");
    if !m.match_type.is_empty() {
        msg.push_str(&format!(" • {}", escape_html(&m.match_type.to_uppercase())));
    }
    msg.push_str(&format!("\n{RULE}\n🏆 <b>{}</b>\n", escape_html(&m.name)));
    if !m.venue.is_empty() {
        msg.push_str(&format!("📍 {}\n", escape_html(&m.venue)));
    }
    msg.push('\n');

    for (idx, team) in m.teams.iter().take(2).enumerate() {
        let score = team_score(m, idx)
            .map(score_text)
            .unwrap_or_else(|| "Yet to bat".to_string());
        msg.push_str(&format!("🏏 <b>{}</b>: {}\n", escape_html(team), score));
    }

    msg.push_str(&format!("\n📊 <b>Status:</b> {}\n{RULE}", escape_html(&m.status)));
    msg
}

fn score_text(s: &InningsScore) -> String {
    format!("{}/{} ({:.1} ov)", s.runs, s.wickets, s.overs)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Escapes the three characters Telegram's HTML parse mode reserves.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
