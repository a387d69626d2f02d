//! Needleman-Wunsch global alignment, single working row.
//!
//! Memory is bounded to O(min(len1, len2)): only one DP row of length
//! `short + 1` is kept, and the caller always orders the inputs as
//! (longer, shorter) before invoking the kernel. The score is symmetric
//! under sequence swap, so the ordering never changes the result.

use crate::compute::{acquire, RowAllocator};
use crate::scoring::{Score, ScoringTable};
use crate::sequence::PADDING;

/// Computes the global alignment score of `one` against `two` into the
/// provided row buffer, which must hold `two.len() + 1` cells.
///
/// Row cell `j` of iteration `i` is the best score aligning `one[..=i]`
/// against `two[..j]`. A padding sentinel on `one` stops the scan early; a
/// padded column of `two` copies its left neighbor, so the final cell always
/// reflects the logical end of the shorter sequence.
pub fn global_align(one: &[u8], two: &[u8], table: &ScoringTable, row: &mut [Score]) -> Score {
    let width = two.len();
    debug_assert_eq!(row.len(), width + 1);

    let penalty = table.penalty;

    // 0-th row: pure gap cost down the first alignment boundary.
    for (j, cell) in row.iter_mut().enumerate() {
        *cell = -(penalty * j as Score);
    }

    for (i, &a) in one.iter().enumerate() {
        if a == PADDING {
            break;
        }

        let mut diag = row[0];
        row[0] = -penalty * (i as Score + 1);

        for j in 1..=width {
            let b = two[j - 1];
            let value = if b != PADDING {
                (diag + table.substitution(a, b))
                    .max(row[j - 1] - penalty)
                    .max(row[j] - penalty)
            } else {
                row[j - 1]
            };
            diag = row[j];
            row[j] = value;
        }
    }

    row[width]
}

/// Aligns one workpair: orders the buffers as (longer, shorter), borrows a
/// DP row from the allocator and runs the kernel.
pub fn score_pair(one: &[u8], two: &[u8], table: &ScoringTable, rows: &dyn RowAllocator) -> Score {
    let (longer, shorter) = if one.len() >= two.len() {
        (one, two)
    } else {
        (two, one)
    };

    let mut row = acquire(rows, shorter.len() + 1);
    global_align(longer, shorter, table, row.as_mut_slice())
}
