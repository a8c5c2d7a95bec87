//! Complete-cycle detection over a deviation series.
//!
//! A threshold crossing alone is not a tradeable opportunity: the position
//! opened on the excursion can only be closed at break-even once the
//! deviation returns to the neutral band around parity. The scan here counts
//! only those completed round trips, which prevents overcounting excursions
//! that never resolve.

/// Count complete excursions: deviation rose above the threshold, then
/// returned to the neutral band.
///
/// Two states. IDLE: no unresolved excursion. ARMED: the threshold was
/// breached since the last neutral return. An `above` row arms the scan
/// (staying armed while the excursion persists); a `neutral` row while armed
/// completes one cycle and disarms. Rows satisfying neither flag leave the
/// state unchanged.
pub fn count_complete_cycles(above: &[bool], neutral: &[bool]) -> u64 {
    debug_assert_eq!(above.len(), neutral.len());

    let mut cycles = 0u64;
    let mut armed = false;

    for (&is_above, &is_neutral) in above.iter().zip(neutral.iter()) {
        if is_above {
            armed = true;
        } else if is_neutral && armed {
            cycles += 1;
            armed = false;
        }
    }

    cycles
}

/// Sign with an exact-zero third state, so a pass that lands exactly on zero
/// is a crossing for neither neighbor. (`f64::signum` maps +0.0 to +1.0 and
/// would double-count such a pass.)
fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

/// Count true sign flips between consecutive defined rows.
///
/// A crossing is `sign(dev[i]) * sign(dev[i-1]) < 0`. Undefined rows are not
/// bridged: only adjacent rows that are both defined can form a crossing, and
/// the first row has no predecessor.
pub fn zero_crossings(deviation: &[Option<f64>]) -> u64 {
    deviation
        .windows(2)
        .filter(|w| match (w[0], w[1]) {
            (Some(prev), Some(curr)) => sign(prev) * sign(curr) < 0,
            _ => false,
        })
        .count() as u64
}

/// True when the series ends outside the threshold band: the most recent
/// excursion is still open, so the last counted cycle understates what a
/// live follow-up would see.
pub fn pattern_break(deviation: &[Option<f64>], threshold_pct: f64) -> bool {
    deviation
        .iter()
        .rev()
        .flatten()
        .next()
        .map(|last| last.abs() > threshold_pct)
        .unwrap_or(false)
}
