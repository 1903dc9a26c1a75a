//! Clock-skew correction: cube timestamps drift from the host clock over a
//! long solve, so moves recovered from history (which carry no host
//! timestamp) need their `cube_ts` refit onto the host's timeline.

use crate::event::MoveEvent;

/// Fits cube-clock timestamps onto the host clock's timeline via ordinary
/// least squares, and reports the clock skew between the two.
pub struct TimestampFitter;

impl TimestampFitter {
    /// Return a copy of `moves` with `cube_ts` gap-filled and linearly
    /// refit against `host_ts`. Moves whose `cube_ts` was already present
    /// are still subject to the same affine correction, so a consumer can
    /// always trust the overall sequence for relative timing.
    pub fn fit(moves: &[MoveEvent]) -> Vec<MoveEvent> {
        if moves.is_empty() {
            return Vec::new();
        }

        let mut cube_ts: Vec<Option<i64>> = moves.iter().map(|m| m.cube_ts).collect();
        fill_gaps(&mut cube_ts);

        let pairs: Vec<(f64, f64)> = cube_ts
            .iter()
            .zip(moves.iter())
            .filter_map(|(c, m)| match (c, m.host_ts) {
                (Some(c), Some(h)) => Some((*c as f64, h as f64)),
                _ => None,
            })
            .collect();

        let (slope, intercept) = ols(&pairs);

        let first = cube_ts[0].unwrap_or(0) as f64;
        let offset = slope * first + intercept;

        moves
            .iter()
            .zip(cube_ts.iter())
            .map(|(m, c)| {
                let fitted = c.map(|c| (slope * c as f64 + intercept - offset).round() as i64);
                MoveEvent {
                    cube_ts: fitted,
                    ..m.clone()
                }
            })
            .collect()
    }

    /// Clock skew of the cube relative to the host, as a signed percentage
    /// with millesimal precision (e.g. `1.000` means the cube clock runs 1%
    /// fast relative to the host).
    pub fn skew(moves: &[MoveEvent]) -> f64 {
        let pairs: Vec<(f64, f64)> = moves
            .iter()
            .filter_map(|m| match (m.host_ts, m.cube_ts) {
                (Some(h), Some(c)) => Some((h as f64, c as f64)),
                _ => None,
            })
            .collect();
        if pairs.is_empty() {
            return 0.0;
        }
        let (slope, _) = ols(&pairs);
        ((slope - 1.0) * 100_000.0).round() / 1_000.0
    }
}

/// Fill `None` entries in a run using neighboring known timestamps, walking
/// tail-to-head then head-to-tail so both sides of a gap contribute.
fn fill_gaps(cube_ts: &mut [Option<i64>]) {
    for i in (0..cube_ts.len().saturating_sub(1)).rev() {
        if cube_ts[i].is_none() {
            if let Some(next) = cube_ts[i + 1] {
                cube_ts[i] = Some(next - 50);
            }
        }
    }
    for i in 1..cube_ts.len() {
        if cube_ts[i].is_none() {
            if let Some(prev) = cube_ts[i - 1] {
                cube_ts[i] = Some(prev + 50);
            }
        }
    }
}

/// Ordinary least squares fit of `y = slope * x + intercept` over `(x, y)`
/// pairs. Degenerate inputs fall back to an identity-ish mapping rather than
/// dividing by zero.
fn ols(pairs: &[(f64, f64)]) -> (f64, f64) {
    let n = pairs.len() as f64;
    if pairs.is_empty() {
        return (1.0, 0.0);
    }
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let var_x: f64 = pairs.iter().map(|(x, _)| (x - mean_x).powi(2)).sum::<f64>() / n;
    let cov_xy: f64 = pairs
        .iter()
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum::<f64>()
        / n;

    let slope = if var_x.abs() < 1e-3 {
        1.0
    } else {
        cov_xy / var_x
    };
    let intercept = if pairs.is_empty() {
        0.0
    } else {
        mean_y - slope * mean_x
    };
    (slope, intercept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Direction, Face};

    fn mv(serial: u8, host_ts: Option<i64>, cube_ts: Option<i64>) -> MoveEvent {
        MoveEvent {
            face: Face::U,
            direction: Direction::Clockwise,
            serial,
            host_ts,
            cube_ts,
        }
    }

    #[test]
    fn perfectly_linear_input_preserves_relative_spacing() {
        let moves = vec![
            mv(0, Some(1000), Some(2000)),
            mv(1, Some(1100), Some(2100)),
            mv(2, Some(1200), Some(2200)),
        ];
        let fitted = TimestampFitter::fit(&moves);
        let deltas: Vec<i64> = fitted
            .windows(2)
            .map(|w| w[1].cube_ts.unwrap() - w[0].cube_ts.unwrap())
            .collect();
        assert_eq!(deltas, vec![100, 100]);
    }

    #[test]
    fn empty_input_yields_zero_skew() {
        assert_eq!(TimestampFitter::skew(&[]), 0.0);
    }

    #[test]
    fn faster_cube_clock_yields_positive_skew() {
        let moves: Vec<MoveEvent> = (0..20)
            .map(|i| mv(i as u8, Some(i * 1000), Some((i as f64 * 1010.0) as i64)))
            .collect();
        let skew = TimestampFitter::skew(&moves);
        assert!((skew - 1.0).abs() < 0.5, "skew was {skew}");
    }
}
