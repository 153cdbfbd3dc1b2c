//! Row bounding and the response envelope.

use crate::database::{FieldInfo, RawQueryResult, Row};
use serde::{Deserialize, Serialize};

/// Default cap on returned rows.
pub const DEFAULT_MAX_ROWS: usize = 1000;

/// Successful query response.
///
/// `row_count == min(total_row_count, max_rows)` and
/// `was_limited == total_row_count > max_rows` always hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub total_row_count: usize,
    pub was_limited: bool,
    pub fields: Vec<FieldInfo>,
}

impl ResultEnvelope {
    /// Envelope for a statement that produced nothing.
    pub fn empty() -> Self {
        shape(RawQueryResult::empty(), DEFAULT_MAX_ROWS)
    }

    /// Re-apply the row bound, keeping the original total.
    ///
    /// Bounding an already shaped envelope with the same `max_rows` returns it
    /// unchanged.
    pub fn bound(self, max_rows: usize) -> Self {
        let total_row_count = self.total_row_count.max(self.rows.len());
        let mut rows = self.rows;
        rows.truncate(max_rows);
        Self {
            row_count: rows.len(),
            rows,
            total_row_count,
            was_limited: total_row_count > max_rows,
            fields: self.fields,
        }
    }
}

/// Truncate rows to `max_rows`, preserving order and recording the full count.
pub fn shape(raw: RawQueryResult, max_rows: usize) -> ResultEnvelope {
    let total_row_count = raw.rows.len();
    let mut rows = raw.rows;
    rows.truncate(max_rows);
    ResultEnvelope {
        row_count: rows.len(),
        rows,
        total_row_count,
        was_limited: total_row_count > max_rows,
        fields: raw.fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::numbered_rows;
    use crate::database::CellValue;

    #[test]
    fn test_truncates_and_reports_total() {
        let envelope = shape(numbered_rows(1500), 1000);
        assert_eq!(envelope.row_count, 1000);
        assert_eq!(envelope.total_row_count, 1500);
        assert!(envelope.was_limited);
        assert_eq!(envelope.rows.len(), 1000);
    }

    #[test]
    fn test_preserves_order() {
        let envelope = shape(numbered_rows(10), 3);
        let ids: Vec<_> = envelope.rows.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![CellValue::Int(0), CellValue::Int(1), CellValue::Int(2)]);
    }

    #[test]
    fn test_exact_limit_is_not_limited() {
        let envelope = shape(numbered_rows(1000), 1000);
        assert_eq!(envelope.row_count, 1000);
        assert!(!envelope.was_limited);
    }

    #[test]
    fn test_counts_invariant() {
        for (total, max) in [(0, 5), (4, 5), (5, 5), (6, 5), (100, 1)] {
            let envelope = shape(numbered_rows(total), max);
            assert_eq!(envelope.row_count, total.min(max));
            assert_eq!(envelope.total_row_count, total);
            assert_eq!(envelope.was_limited, total > max);
        }
    }

    #[test]
    fn test_bound_is_idempotent() {
        let once = shape(numbered_rows(1500), 1000);
        let twice = once.clone().bound(1000);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_fields_pass_through_in_order() {
        let raw = RawQueryResult::new(
            vec![],
            vec![FieldInfo::new("b", 25), FieldInfo::new("a", 23)],
        );
        let envelope = shape(raw, 10);
        assert_eq!(envelope.fields[0].name, "b");
        assert_eq!(envelope.fields[1].data_type_id, 23);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(ResultEnvelope::empty()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "rows": [],
                "rowCount": 0,
                "totalRowCount": 0,
                "wasLimited": false,
                "fields": []
            })
        );
    }
}
