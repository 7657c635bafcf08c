// types.rs — Fixed-layout record types shared across the engine.
//
// The two tables are append-only event logs; rows are created once and never
// mutated, so every field is declared up front and missing optional fields
// resolve to the documented defaults at append time.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Venue sentinel meaning "applies at every venue".
pub const VENUE_ALL: &str = "ALL";

/// Outcome default for procedural entries with no recorded result.
pub const OUTCOME_UNKNOWN: &str = "unknown";

/// Outcome default for episodic events where an outcome does not apply.
/// Distinct from [`OUTCOME_UNKNOWN`] on purpose — the two tables carry
/// different sentinel strings.
pub const OUTCOME_NOT_APPLICABLE: &str = "N/A";

/// Regime label used when a lesson arrives without one.
pub const REGIME_UNKNOWN: &str = "UNKNOWN";

/// Distance reported when no memory is available: disconnected engine, empty
/// table, or a failed search.
pub const NO_MATCH_DISTANCE: f32 = 999.0;

// ─── Events ───────────────────────────────────────────────────────────────────

/// Categorical tag of an episodic event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Trade,
    Veto,
    Halt,
    #[default]
    Unknown,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Trade => "TRADE",
            EventKind::Veto => "VETO",
            EventKind::Halt => "HALT",
            EventKind::Unknown => "UNKNOWN",
        }
    }

    /// Parse a stored tag. Unrecognized strings collapse to `Unknown` so old
    /// rows written by newer builds stay readable.
    pub fn parse(s: &str) -> Self {
        match s {
            "TRADE" => EventKind::Trade,
            "VETO" => EventKind::Veto,
            "HALT" => EventKind::Halt,
            _ => EventKind::Unknown,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Write requests ───────────────────────────────────────────────────────────

/// Write request for one standard operating procedure.
///
/// `narrative` is required; everything else defaults at append time:
/// `timestamp` = now (epoch seconds), `regime` = `"UNKNOWN"`,
/// `venue` = `"ALL"`, `outcome` = `"unknown"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddSopRequest {
    pub narrative: String,
    pub regime: Option<String>,
    pub venue: Option<String>,
    pub outcome: Option<String>,
    /// Epoch seconds.
    pub timestamp: Option<i64>,
}

impl AddSopRequest {
    pub fn new(narrative: impl Into<String>) -> Self {
        Self {
            narrative: narrative.into(),
            regime: None,
            venue: None,
            outcome: None,
            timestamp: None,
        }
    }
}

/// Write request for one episodic checkpoint (trade, veto, halt).
///
/// The embedding source is `vector_text` when present, otherwise `payload`;
/// a checkpoint with neither is a failed write. Defaults at append time:
/// `timestamp` = now (epoch milliseconds), `kind` = `UNKNOWN`,
/// `outcome` = `"N/A"`, `venue` = `"ALL"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    pub kind: Option<EventKind>,
    /// Opaque serialized event state; the engine never interprets it beyond
    /// substring search.
    pub payload: Option<String>,
    pub outcome: Option<String>,
    pub venue: Option<String>,
    /// Preferred embedding source text.
    pub vector_text: Option<String>,
    /// Epoch milliseconds.
    pub timestamp: Option<i64>,
}

impl Checkpoint {
    /// Checkpoint for a structured event, with `payload` serialized to its
    /// stored JSON string form.
    pub fn from_payload<T: serde::Serialize>(
        kind: EventKind,
        payload: &T,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            kind: Some(kind),
            payload: Some(serde_json::to_string(payload)?),
            ..Self::default()
        })
    }
}

// ─── Read results ─────────────────────────────────────────────────────────────

/// One episodic row as returned by a biopsy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodicRecord {
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub kind: EventKind,
    pub payload: String,
    pub outcome: String,
    pub venue: String,
    /// The text the event's vector was computed from.
    pub reasoning: String,
}

/// Result of a venue-biased regime search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeMatch {
    /// `"{regime} ({narrative})"`, or `None` when no memory is available.
    pub label: Option<String>,
    pub distance: f32,
}

impl RegimeMatch {
    /// The "no prior memory" sentinel.
    pub fn none() -> Self {
        Self {
            label: None,
            distance: NO_MATCH_DISTANCE,
        }
    }

    pub fn is_match(&self) -> bool {
        self.label.is_some()
    }
}

/// Time/ID window for a forensic episodic dump.
///
/// The timestamp window applies only when both bounds are present (inclusive
/// on both ends). `trade_id` additionally restricts to rows whose payload
/// contains it as a substring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BiopsyQuery {
    pub trade_id: Option<String>,
    /// Inclusive lower bound, epoch milliseconds.
    pub start_ms: Option<i64>,
    /// Inclusive upper bound, epoch milliseconds.
    pub end_ms: Option<i64>,
}

impl BiopsyQuery {
    pub fn window(start_ms: i64, end_ms: i64) -> Self {
        Self {
            trade_id: None,
            start_ms: Some(start_ms),
            end_ms: Some(end_ms),
        }
    }

    pub fn trade(trade_id: impl Into<String>) -> Self {
        Self {
            trade_id: Some(trade_id.into()),
            start_ms: None,
            end_ms: None,
        }
    }
}

/// One ranked procedural candidate coming back from the vector search,
/// ascending-distance order preserved from the store.
#[derive(Debug, Clone)]
pub struct SopHit {
    pub regime: String,
    pub narrative: String,
    pub venue: String,
    pub distance: f32,
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_round_trips() {
        for kind in [
            EventKind::Trade,
            EventKind::Veto,
            EventKind::Halt,
            EventKind::Unknown,
        ] {
            assert_eq!(EventKind::parse(kind.as_str()), kind);
        }
    }

    #[test]
    fn unrecognized_kind_collapses_to_unknown() {
        assert_eq!(EventKind::parse("LIQUIDATION"), EventKind::Unknown);
        assert_eq!(EventKind::parse(""), EventKind::Unknown);
    }

    #[test]
    fn no_match_sentinel() {
        let m = RegimeMatch::none();
        assert!(!m.is_match());
        assert_eq!(m.distance, NO_MATCH_DISTANCE);
    }

    #[test]
    fn outcome_sentinels_stay_distinct() {
        assert_ne!(OUTCOME_UNKNOWN, OUTCOME_NOT_APPLICABLE);
    }

    #[test]
    fn checkpoint_from_payload_serializes_json() {
        #[derive(serde::Serialize)]
        struct Fill {
            trade_id: &'static str,
            qty: f64,
        }
        let checkpoint = Checkpoint::from_payload(
            EventKind::Trade,
            &Fill {
                trade_id: "T-7",
                qty: 0.25,
            },
        )
        .unwrap();
        assert_eq!(checkpoint.kind, Some(EventKind::Trade));
        assert!(checkpoint.payload.unwrap().contains("\"trade_id\":\"T-7\""));
    }
}
