use std::cmp::Ordering;

use byteorder::{ByteOrder, LittleEndian};

use crate::heap::error::HeapFileError;

/// Comparison operator of a scan predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
}

/// Typed value a scanned field is compared against. The variant fixes the
/// interpretation of the record bytes once, at scan configuration time.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i32),
    Float(f32),
    Bytes(Vec<u8>),
}

/// Byte-level predicate over records: extract `length` bytes at `offset`,
/// interpret them per the filter value's variant, compare with `op`.
#[derive(Debug, Clone)]
pub struct ScanFilter {
    offset: usize,
    length: usize,
    value: FilterValue,
    op: CompareOp,
}

impl ScanFilter {
    pub fn new(
        offset: usize,
        length: usize,
        value: FilterValue,
        op: CompareOp,
    ) -> Result<Self, HeapFileError> {
        if length < 1 {
            return Err(HeapFileError::BadScanParam(
                "filter length must be at least 1".into(),
            ));
        }
        match &value {
            FilterValue::Int(_) if length != size_of::<i32>() => {
                return Err(HeapFileError::BadScanParam(format!(
                    "integer filter requires length {}, got {length}",
                    size_of::<i32>()
                )));
            }
            FilterValue::Float(_) if length != size_of::<f32>() => {
                return Err(HeapFileError::BadScanParam(format!(
                    "float filter requires length {}, got {length}",
                    size_of::<f32>()
                )));
            }
            FilterValue::Bytes(b) if b.len() < length => {
                return Err(HeapFileError::BadScanParam(format!(
                    "byte filter value has {} bytes, need at least {length}",
                    b.len()
                )));
            }
            _ => {}
        }

        Ok(Self {
            offset,
            length,
            value,
            op,
        })
    }

    /// Whether `record` satisfies the predicate. A record too short to hold
    /// the filtered field never matches.
    pub fn matches(&self, record: &[u8]) -> bool {
        let end = self.offset + self.length;
        if record.len() < end {
            return false;
        }
        let field = &record[self.offset..end];

        let ord = match &self.value {
            FilterValue::Int(v) => LittleEndian::read_i32(field).cmp(v),
            FilterValue::Float(v) => match LittleEndian::read_f32(field).partial_cmp(v) {
                Some(ord) => ord,
                // NaN on either side compares with nothing
                None => return false,
            },
            FilterValue::Bytes(v) => field.cmp(&v[..self.length]),
        };

        match self.op {
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ge => ord != Ordering::Less,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ne => ord != Ordering::Equal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_record(v: i32) -> Vec<u8> {
        let mut rec = vec![0u8; 8];
        LittleEndian::write_i32(&mut rec[4..8], v);
        rec
    }

    #[test]
    fn int_comparisons() {
        let filter = ScanFilter::new(4, 4, FilterValue::Int(10), CompareOp::Lt).unwrap();
        assert!(filter.matches(&int_record(9)));
        assert!(!filter.matches(&int_record(10)));

        let filter = ScanFilter::new(4, 4, FilterValue::Int(10), CompareOp::Ge).unwrap();
        assert!(filter.matches(&int_record(10)));
        assert!(filter.matches(&int_record(11)));
        assert!(!filter.matches(&int_record(-3)));
    }

    #[test]
    fn byte_comparison_truncates_to_length() {
        let filter =
            ScanFilter::new(0, 3, FilterValue::Bytes(b"abcdef".to_vec()), CompareOp::Eq).unwrap();
        assert!(filter.matches(b"abcXYZ"));
        assert!(!filter.matches(b"abd"));
    }

    #[test]
    fn short_record_never_matches() {
        let filter = ScanFilter::new(4, 4, FilterValue::Int(0), CompareOp::Ne).unwrap();
        assert!(!filter.matches(&[0u8; 7]));
        assert!(!filter.matches(&[]));
    }

    #[test]
    fn bad_params_rejected() {
        assert!(matches!(
            ScanFilter::new(0, 0, FilterValue::Int(1), CompareOp::Eq),
            Err(HeapFileError::BadScanParam(_))
        ));
        assert!(matches!(
            ScanFilter::new(0, 8, FilterValue::Int(1), CompareOp::Eq),
            Err(HeapFileError::BadScanParam(_))
        ));
        assert!(matches!(
            ScanFilter::new(0, 2, FilterValue::Float(1.0), CompareOp::Eq),
            Err(HeapFileError::BadScanParam(_))
        ));
        assert!(matches!(
            ScanFilter::new(0, 4, FilterValue::Bytes(b"ab".to_vec()), CompareOp::Eq),
            Err(HeapFileError::BadScanParam(_))
        ));
    }

    #[test]
    fn float_nan_matches_nothing() {
        let mut rec = vec![0u8; 4];
        LittleEndian::write_f32(&mut rec, f32::NAN);
        for op in [CompareOp::Lt, CompareOp::Le, CompareOp::Eq, CompareOp::Ge, CompareOp::Gt, CompareOp::Ne] {
            let filter = ScanFilter::new(0, 4, FilterValue::Float(1.0), op).unwrap();
            assert!(!filter.matches(&rec));
        }
    }
}
