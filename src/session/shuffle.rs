//! Next-track selection under shuffle.
//!
//! Recently played indices are kept out of the draw whenever at least one
//! other candidate exists; selection among the rest is uniformly random.
//! The RNG is injected so callers can seed it.

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::error::SessionError;

/// How many recently played tracks are excluded from the draw.
pub(crate) const HISTORY_CAP: usize = 5;

/// Pick the next index for a catalog of `len` tracks.
///
/// `recent` is newest-first; only the first `min(HISTORY_CAP, len - 1)`
/// entries count. When every index would be excluded (tiny catalogs) the
/// selection falls back to sequential advance.
pub(crate) fn pick_next<R: Rng>(
    len: usize,
    current: Option<usize>,
    recent: &[usize],
    rng: &mut R,
) -> Result<usize, SessionError> {
    if len == 0 {
        return Err(SessionError::EmptyCatalog);
    }
    if len == 1 {
        return Ok(0);
    }

    let cap = HISTORY_CAP.min(len - 1);
    let excluded = &recent[..cap.min(recent.len())];

    let eligible: Vec<usize> = (0..len)
        .filter(|&i| Some(i) != current && !excluded.contains(&i))
        .collect();

    match eligible.choose(rng) {
        Some(&i) => Ok(i),
        None => Ok(current.map(|c| (c + 1) % len).unwrap_or(0)),
    }
}
