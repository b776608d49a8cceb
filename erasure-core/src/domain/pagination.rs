// erasure-core/src/domain/pagination.rs

/// One page of a full-table scan: `(offset, fetch_size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub fetch_size: u64,
}

/// Splits `nlines` rows into consecutive pages of at most `batch_size` rows.
/// The last page holds the remainder; a zero batch size yields no pages.
pub fn offsets_and_fetch_sizes(nlines: u64, batch_size: u64) -> impl Iterator<Item = Page> {
    let step = batch_size.max(1);
    let count = if batch_size == 0 { 0 } else { nlines.div_ceil(batch_size) };
    (0..count).map(move |i| {
        let offset = i * step;
        Page {
            offset,
            fetch_size: step.min(nlines - offset),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(nlines: u64, batch: u64) -> Vec<(u64, u64)> {
        offsets_and_fetch_sizes(nlines, batch)
            .map(|p| (p.offset, p.fetch_size))
            .collect()
    }

    #[test]
    fn test_remainder_page() {
        assert_eq!(pairs(100, 30), vec![(0, 30), (30, 30), (60, 30), (90, 10)]);
        assert_eq!(pairs(25, 10), vec![(0, 10), (10, 10), (20, 5)]);
    }

    #[test]
    fn test_exact_multiple() {
        assert_eq!(pairs(20, 10), vec![(0, 10), (10, 10)]);
    }

    #[test]
    fn test_edge_sizes() {
        assert!(pairs(0, 10).is_empty());
        assert!(pairs(10, 0).is_empty());
        assert_eq!(pairs(3, 100), vec![(0, 3)]);
    }

    #[test]
    fn test_pages_never_exceed_row_count() {
        for nlines in 0..50 {
            for batch in 1..12 {
                let total: u64 = offsets_and_fetch_sizes(nlines, batch)
                    .map(|p| p.fetch_size)
                    .sum();
                assert_eq!(total, nlines);
            }
        }
    }
}
