//! Fingerprint scorer: similarity of one reference record to the query.

use crate::utils::types::{CandidateScore, ReferenceRecord, SignalObservation};

/// Score `record` against `query`.
///
/// Every observation of the record is matched against the first query
/// observation carrying the same id; later query duplicates are ignored and
/// record duplicates each match on their own. Returns `None` when the record
/// shares no signal with the query, so no candidate ever carries a ratio
/// derived from a zero overlap.
pub fn score(record: &ReferenceRecord, query: &[SignalObservation]) -> Option<CandidateScore> {
    let mut overlap_count = 0usize;
    let mut strength_diff_sum = 0u64;

    for observed in &record.fingerprint {
        if let Some(probe) = query.iter().find(|q| q.id == observed.id) {
            overlap_count += 1;
            strength_diff_sum += strength_diff(observed.strength, probe.strength);
        }
    }

    if overlap_count == 0 {
        return None;
    }

    let average_diff = strength_diff_sum as f64 / overlap_count as f64;
    Some(CandidateScore {
        record_id: record.id,
        label: record.label.clone(),
        overlap_count,
        strength_diff_sum,
        average_diff,
        ratio: average_diff / overlap_count as f64,
    })
}

#[inline]
fn strength_diff(a: i32, b: i32) -> u64 {
    (i64::from(a) - i64::from(b)).unsigned_abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(id: &str, strength: i32) -> SignalObservation {
        SignalObservation::new(id, strength)
    }

    #[test]
    fn test_full_and_partial_overlap() {
        let query = vec![obs("w1", -51), obs("w2", -61)];

        let a = ReferenceRecord::new(1, "A", vec![obs("w1", -50), obs("w2", -60)]);
        let sa = score(&a, &query).unwrap();
        assert_eq!(sa.overlap_count, 2);
        assert_eq!(sa.strength_diff_sum, 2);
        assert!((sa.average_diff - 1.0).abs() < 1e-12);
        assert!((sa.ratio - 0.5).abs() < 1e-12);

        let b = ReferenceRecord::new(2, "B", vec![obs("w1", -52), obs("w3", -70)]);
        let sb = score(&b, &query).unwrap();
        assert_eq!(sb.overlap_count, 1);
        assert_eq!(sb.strength_diff_sum, 1);
        assert!((sb.ratio - 1.0).abs() < 1e-12);
        assert_eq!(sb.label, "B");
        assert_eq!(sb.record_id, 2);
    }

    #[test]
    fn test_zero_overlap_is_excluded() {
        let record = ReferenceRecord::new(7, "lobby", vec![obs("x1", -40)]);
        assert!(score(&record, &[obs("w1", -40)]).is_none());
        assert!(score(&record, &[]).is_none());
        assert!(score(&ReferenceRecord::new(8, "empty", vec![]), &[obs("x1", -40)]).is_none());
    }

    #[test]
    fn test_first_query_duplicate_wins() {
        // Only the first "w1" in the query is ever consulted.
        let query = vec![obs("w1", -50), obs("w1", -90)];
        let record = ReferenceRecord::new(1, "A", vec![obs("w1", -52)]);
        let s = score(&record, &query).unwrap();
        assert_eq!(s.overlap_count, 1);
        assert_eq!(s.strength_diff_sum, 2);
    }

    #[test]
    fn test_record_duplicates_match_independently() {
        let query = vec![obs("w1", -50)];
        let record = ReferenceRecord::new(1, "A", vec![obs("w1", -55), obs("w1", -45)]);
        let s = score(&record, &query).unwrap();
        assert_eq!(s.overlap_count, 2);
        assert_eq!(s.strength_diff_sum, 10);
        assert!((s.average_diff - 5.0).abs() < 1e-12);
        assert!((s.ratio - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_overlap_bounded_by_record_size() {
        let query = vec![obs("a", -1), obs("b", -2), obs("c", -3), obs("d", -4)];
        let record = ReferenceRecord::new(1, "A", vec![obs("a", -1), obs("z", -9), obs("c", -3)]);
        let s = score(&record, &query).unwrap();
        assert!(s.overlap_count <= record.fingerprint.len());
        assert_eq!(s.overlap_count, 2);
        assert_eq!(s.strength_diff_sum, 0);
        assert_eq!(s.ratio, 0.0);
    }

    #[test]
    fn test_extreme_strengths_do_not_overflow() {
        let query = vec![obs("w", i32::MIN)];
        let record = ReferenceRecord::new(1, "A", vec![obs("w", i32::MAX)]);
        let s = score(&record, &query).unwrap();
        assert_eq!(s.strength_diff_sum, u32::MAX as u64);
    }
}
