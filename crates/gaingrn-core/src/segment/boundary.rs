use super::{SseKind, SseRecord};
use serde::{Deserialize, Serialize};

/// Start of the domain and the residue separating the helical subdomain A from the
/// strand subdomain B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubdomainBoundary {
    pub domain_start: i32,
    pub boundary: i32,
}

/// Locates the A/B subdomain boundary from a smoothed helix/strand signal.
///
/// Helix residues score -1, strand residues +1 and everything else `coil_weight`.
/// The signal is summed over a sliding window and split at its sign changes; the most
/// C-terminal block holding at least `domain_threshold` helix residues is subdomain A.
/// The boundary sits midway between the last helix residue of that block and the first
/// strand that follows.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryDetector {
    pub window: usize,
    pub domain_threshold: usize,
    pub coil_weight: f64,
}

impl Default for BoundaryDetector {
    fn default() -> Self {
        BoundaryDetector {
            window: 50,
            domain_threshold: 50,
            coil_weight: 0.0,
        }
    }
}

impl BoundaryDetector {
    /// Returns `None` when no helical block is large enough or the signal has no sign change.
    pub fn detect(&self, records: &[SseRecord]) -> Option<SubdomainBoundary> {
        let first = records.iter().map(|rec| rec.residue).min()?;
        let last = records.iter().map(|rec| rec.residue).max()?;
        let n = (last - first + 1) as usize;

        let mut scored = vec![self.coil_weight; n];
        for rec in records {
            let idx = (rec.residue - first) as usize;
            match rec.state.kind() {
                Some(SseKind::Helix) => scored[idx] = -1.0,
                Some(SseKind::Strand) => scored[idx] = 1.0,
                None => {}
            }
        }
        let has_helix = scored.iter().any(|&v| v == -1.0);
        let has_strand = scored.iter().any(|&v| v == 1.0);
        if !has_helix || !has_strand {
            return None;
        }

        let signal = self.smooth(&scored);
        let changes = sign_changes(&signal)?;

        let helical_counts: Vec<usize> = changes
            .windows(2)
            .map(|pair| scored[pair[0]..pair[1]].iter().filter(|&&v| v == -1.0).count())
            .collect();
        let block = helical_counts
            .iter()
            .rposition(|&count| count >= self.domain_threshold)?;
        let (gain_start, initial) = (changes[block], changes[block + 1]);

        let mut sheet_start = initial;
        if scored[sheet_start] == 1.0 {
            while sheet_start > 0 && scored[sheet_start] == 1.0 {
                sheet_start -= 1;
            }
        } else {
            while sheet_start + 1 < n && scored[sheet_start] != 1.0 {
                sheet_start += 1;
            }
        }

        let mut helix_end = initial;
        if scored[helix_end] != -1.0 {
            while helix_end > 0 && scored[helix_end] != -1.0 {
                helix_end -= 1;
            }
        } else {
            while helix_end + 1 < n && scored[helix_end] == -1.0 {
                helix_end += 1;
            }
        }

        let boundary = (helix_end + sheet_start) / 2;
        Some(SubdomainBoundary {
            domain_start: first + gain_start as i32,
            boundary: first + boundary as i32,
        })
    }

    /// Window sum centred like a `same`-mode convolution with a box kernel.
    fn smooth(&self, scored: &[f64]) -> Vec<f64> {
        let n = scored.len() as i64;
        let width = self.window.max(1) as i64;
        let half = (width - 1) / 2;
        let mut prefix = Vec::with_capacity(scored.len() + 1);
        prefix.push(0.0);
        for value in scored {
            let total = prefix.last().copied().unwrap_or(0.0) + value;
            prefix.push(total);
        }
        (0..n)
            .map(|i| {
                let hi = (i + half).min(n - 1);
                let lo = (i + half - (width - 1)).max(0);
                if lo > hi {
                    0.0
                } else {
                    prefix[(hi + 1) as usize] - prefix[lo as usize]
                }
            })
            .collect()
    }
}

/// Indices where the sign differs from the previous position (wrapping at index 0).
/// Zero values inherit the sign of their predecessor.
fn sign_changes(signal: &[f64]) -> Option<Vec<usize>> {
    let mut signs: Vec<i8> = signal
        .iter()
        .map(|&v| {
            if v > 0.0 {
                1
            } else if v < 0.0 {
                -1
            } else {
                0
            }
        })
        .collect();
    if signs.iter().all(|&s| s == 0) {
        return None;
    }
    while signs.contains(&0) {
        let rolled: Vec<i8> = (0..signs.len())
            .map(|i| signs[(i + signs.len() - 1) % signs.len()])
            .collect();
        for (sign, prev) in signs.iter_mut().zip(rolled) {
            if *sign == 0 {
                *sign = prev;
            }
        }
    }
    let changes: Vec<usize> = (0..signs.len())
        .filter(|&i| signs[(i + signs.len() - 1) % signs.len()] != signs[i])
        .collect();
    if changes.is_empty() {
        None
    } else {
        Some(changes)
    }
}
