//! Global pairwise alignment with affine gap penalties (Gotoh's algorithm).
//!
//! The default penalties are tuned for reconciling two sequences of the same
//! protein: opening a gap is expensive, so internal mismatches are preferred
//! over gaps unless a true insertion or deletion exists, while extending an
//! accepted gap stays cheap enough to span missing regions.

const MATCH_SCORE: f64 = 10.0;
const MISMATCH_SCORE: f64 = -15.0;

/// Gap penalties of a pairwise alignment (both negative).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapPenalties {
    /// Cost of opening a gap.
    pub open: f64,
    /// Cost per gap column.
    pub extend: f64,
}

impl Default for GapPenalties {
    fn default() -> Self {
        Self {
            open: -900.0,
            extend: -50.0,
        }
    }
}

/// Two gap-padded sequences of equal column count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairwiseAlignment {
    pub a: String,
    pub b: String,
}

/// The three affine-gap DP states: a substitution column, a gap in `b`
/// (consuming a residue of `a`), and a gap in `a`.
#[derive(Clone, Copy, PartialEq)]
enum State {
    Sub,
    GapInB,
    GapInA,
}

fn best_of_three(sub: f64, gap_b: f64, gap_a: f64) -> (f64, State) {
    if sub >= gap_b && sub >= gap_a {
        (sub, State::Sub)
    } else if gap_b >= gap_a {
        (gap_b, State::GapInB)
    } else {
        (gap_a, State::GapInA)
    }
}

/// Aligns two sequences globally, returning the gap-padded pair.
///
/// Each DP state carries its own backpointer, so the traceback reproduces
/// an optimal-score path even when a cell's best substitution and best gap
/// continuations come from different predecessor states.
pub fn global_align(a: &str, b: &str, gaps: GapPenalties) -> PairwiseAlignment {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let n = a_chars.len();
    let m = b_chars.len();

    const NEG_INF: f64 = f64::NEG_INFINITY;
    let size = (n + 1) * (m + 1);
    let idx = |i: usize, j: usize| i * (m + 1) + j;

    // match_m: best score ending in a substitution column.
    // gap_a / gap_b: best score ending with a gap in a / in b.
    let mut match_m = vec![NEG_INF; size];
    let mut gap_a = vec![NEG_INF; size];
    let mut gap_b = vec![NEG_INF; size];
    // Predecessor state of each cell, one matrix per state.
    let mut from_sub = vec![State::Sub; size];
    let mut from_gap_b = vec![State::Sub; size];
    let mut from_gap_a = vec![State::Sub; size];

    match_m[idx(0, 0)] = 0.0;
    for i in 1..=n {
        gap_b[idx(i, 0)] = gaps.open + gaps.extend * i as f64;
        if i > 1 {
            from_gap_b[idx(i, 0)] = State::GapInB;
        }
    }
    for j in 1..=m {
        gap_a[idx(0, j)] = gaps.open + gaps.extend * j as f64;
        if j > 1 {
            from_gap_a[idx(0, j)] = State::GapInA;
        }
    }

    for i in 1..=n {
        for j in 1..=m {
            let sub = if a_chars[i - 1] == b_chars[j - 1] {
                MATCH_SCORE
            } else {
                MISMATCH_SCORE
            };
            let prev = idx(i - 1, j - 1);
            let (diag, diag_state) = best_of_three(match_m[prev], gap_b[prev], gap_a[prev]);
            match_m[idx(i, j)] = diag + sub;
            from_sub[idx(i, j)] = diag_state;

            let up = idx(i - 1, j);
            let (open_base, open_state) = if match_m[up] >= gap_a[up] {
                (match_m[up], State::Sub)
            } else {
                (gap_a[up], State::GapInA)
            };
            let opened = open_base + gaps.open + gaps.extend;
            let extended = gap_b[up] + gaps.extend;
            if opened >= extended {
                gap_b[idx(i, j)] = opened;
                from_gap_b[idx(i, j)] = open_state;
            } else {
                gap_b[idx(i, j)] = extended;
                from_gap_b[idx(i, j)] = State::GapInB;
            }

            let left = idx(i, j - 1);
            let (open_base, open_state) = if match_m[left] >= gap_b[left] {
                (match_m[left], State::Sub)
            } else {
                (gap_b[left], State::GapInB)
            };
            let opened = open_base + gaps.open + gaps.extend;
            let extended = gap_a[left] + gaps.extend;
            if opened >= extended {
                gap_a[idx(i, j)] = opened;
                from_gap_a[idx(i, j)] = open_state;
            } else {
                gap_a[idx(i, j)] = extended;
                from_gap_a[idx(i, j)] = State::GapInA;
            }
        }
    }

    let end = idx(n, m);
    let (_, mut state) = best_of_three(match_m[end], gap_b[end], gap_a[end]);

    let mut aligned_a = Vec::new();
    let mut aligned_b = Vec::new();
    let mut i = n;
    let mut j = m;
    while i > 0 || j > 0 {
        match state {
            State::Sub => {
                aligned_a.push(a_chars[i - 1]);
                aligned_b.push(b_chars[j - 1]);
                state = from_sub[idx(i, j)];
                i -= 1;
                j -= 1;
            }
            State::GapInB => {
                aligned_a.push(a_chars[i - 1]);
                aligned_b.push('-');
                state = from_gap_b[idx(i, j)];
                i -= 1;
            }
            State::GapInA => {
                aligned_a.push('-');
                aligned_b.push(b_chars[j - 1]);
                state = from_gap_a[idx(i, j)];
                j -= 1;
            }
        }
    }
    aligned_a.reverse();
    aligned_b.reverse();

    PairwiseAlignment {
        a: aligned_a.into_iter().collect(),
        b: aligned_b.into_iter().collect(),
    }
}

/// Fractional sequence identity over an aligned pair: identical columns
/// where neither side is a gap, divided by all columns where neither side
/// is a gap. Returns 0 when no such column exists.
pub fn sequence_identity(aligned: &PairwiseAlignment) -> f64 {
    let mut matches = 0usize;
    let mut identities = 0usize;
    for (ca, cb) in aligned.a.chars().zip(aligned.b.chars()) {
        if ca != '-' && cb != '-' {
            matches += 1;
            if ca == cb {
                identities += 1;
            }
        }
    }
    if matches == 0 {
        0.0
    } else {
        identities as f64 / matches as f64
    }
}
