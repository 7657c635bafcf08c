// retrieval.rs — The venue bias cascade.
//
// A pure nearest-neighbor search would let a highly similar but
// venue-irrelevant memory win over a less similar but venue-correct one, so
// selection runs three tiers over the ranked candidates:
//
//   1. exact venue match (only when a specific venue was requested)
//   2. universal fallback (rows tagged "ALL")
//   3. closest candidate of any venue
//
// Candidates arrive sorted by ascending distance from the store; selection
// never re-orders them, so equal-distance ties resolve to store order.

use crate::types::{SopHit, VENUE_ALL};

/// Pick the best candidate for `venue` out of a ranked list.
///
/// Returns `None` only for an empty candidate list.
pub fn select_venue_biased<'a>(candidates: &'a [SopHit], venue: &str) -> Option<&'a SopHit> {
    if venue != VENUE_ALL {
        if let Some(hit) = candidates.iter().find(|h| h.venue == venue) {
            return Some(hit);
        }
    }
    if let Some(hit) = candidates.iter().find(|h| h.venue == VENUE_ALL) {
        return Some(hit);
    }
    candidates.first()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
