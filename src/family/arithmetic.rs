use std::fmt;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::common::LabelSet;
use crate::family::{Family, SampleFamily};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    /// IEEE-754 semantics throughout: x/0 is ±inf, 0/0 is NaN.
    #[inline]
    pub fn apply(&self, left: f64, right: f64) -> f64 {
        match self {
            BinaryOp::Add => left + right,
            BinaryOp::Sub => left - right,
            BinaryOp::Mul => left * right,
            BinaryOp::Div => left / right,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl SampleFamily {
    pub fn plus(&self, value: f64) -> SampleFamily {
        self.map_values(|v| v + value)
    }

    pub fn minus(&self, value: f64) -> SampleFamily {
        self.map_values(|v| v - value)
    }

    pub fn multiply(&self, value: f64) -> SampleFamily {
        self.map_values(|v| v * value)
    }

    pub fn div(&self, value: f64) -> SampleFamily {
        self.map_values(|v| v / value)
    }

    pub fn negative(&self) -> SampleFamily {
        self.map_values(|v| -v)
    }

    /// Applies `op` with `value` as the right operand.
    pub fn scalar_op(&self, op: BinaryOp, value: f64) -> SampleFamily {
        self.map_values(|v| op.apply(v, value))
    }

    /// Combines two families series by series. See [`BinaryOp`] for the value rule
    /// and the individual `*_family` methods for how `Empty` operands behave.
    pub fn binary_op(&self, op: BinaryOp, other: &SampleFamily) -> SampleFamily {
        use SampleFamily::*;
        match (op, self, other) {
            (_, Empty, Empty) => Empty,
            (BinaryOp::Mul, Empty, _) | (BinaryOp::Mul, _, Empty) => Empty,
            (BinaryOp::Add, Empty, right) => right.clone(),
            (BinaryOp::Add, left, Empty) => left.clone(),
            (BinaryOp::Sub, Empty, right) => right.negative(),
            (BinaryOp::Sub, left, Empty) => left.clone(),
            (BinaryOp::Div, Empty, right) => right.map_values(|v| 0.0 / v),
            (BinaryOp::Div, left, Empty) => left.div(0.0),
            (_, Populated(left), Populated(right)) => join(op, left, right),
        }
    }

    pub fn plus_family(&self, other: &SampleFamily) -> SampleFamily {
        self.binary_op(BinaryOp::Add, other)
    }

    /// `Empty - F` is `-F`.
    pub fn minus_family(&self, other: &SampleFamily) -> SampleFamily {
        self.binary_op(BinaryOp::Sub, other)
    }

    /// `Empty` on either side yields `Empty`.
    pub fn multiply_family(&self, other: &SampleFamily) -> SampleFamily {
        self.binary_op(BinaryOp::Mul, other)
    }

    /// `Empty / F` is `0 / F` and `F / Empty` is `F / 0`, both element-wise.
    pub fn div_family(&self, other: &SampleFamily) -> SampleFamily {
        self.binary_op(BinaryOp::Div, other)
    }
}

/// Inner join on exact label-set equality. Left timestamps, labels and context win.
fn join(op: BinaryOp, left: &Family, right: &Family) -> SampleFamily {
    let mut index: AHashMap<&LabelSet, f64> = AHashMap::with_capacity(right.len());
    for sample in right.samples() {
        // first occurrence wins on duplicate series
        index.entry(sample.labels.as_ref()).or_insert(sample.value);
    }

    let samples: Vec<_> = left
        .samples()
        .iter()
        .filter_map(|s| {
            index
                .get(s.labels.as_ref())
                .map(|&rv| s.with_value(op.apply(s.value, rv)))
        })
        .collect();

    trace!(
        op = op.as_str(),
        left = left.len(),
        right = right.len(),
        matched = samples.len(),
        "joined sample families"
    );
    SampleFamily::from_parts(left.context().clone(), samples)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::tests::{family, family_at, labels, values, DEFAULT_TIMESTAMP};

    fn left() -> SampleFamily {
        family_at(vec![
            (vec![("m", "GET")], 1_000, 100.0),
            (vec![("m", "POST")], 2_000, 50.0),
            (vec![("m", "PUT")], 3_000, 7.0),
        ])
    }

    fn right() -> SampleFamily {
        family_at(vec![
            (vec![("m", "POST")], 9_000, 10.0),
            (vec![("m", "GET")], 9_000, 4.0),
            (vec![("m", "DELETE")], 9_000, 1.0),
        ])
    }

    #[test_case(BinaryOp::Add, 3.0 ; "plus")]
    #[test_case(BinaryOp::Sub, 3.0 ; "minus")]
    #[test_case(BinaryOp::Mul, 3.0 ; "multiply")]
    #[test_case(BinaryOp::Div, 3.0 ; "div")]
    #[test_case(BinaryOp::Div, -0.5 ; "div by negative")]
    fn test_scalar_ops_are_elementwise(op: BinaryOp, c: f64) {
        let f = left();
        let result = f.scalar_op(op, c);
        assert_eq!(result.len(), f.len());
        for (out, orig) in result.samples().iter().zip(f.samples()) {
            assert_eq!(out.value, op.apply(orig.value, c));
            assert_eq!(out.labels, orig.labels);
            assert_eq!(out.timestamp, orig.timestamp);
        }
    }

    #[test]
    fn test_named_scalar_ops() {
        let f = left();
        assert_eq!(values(&f.plus(1.0)), vec![101.0, 51.0, 8.0]);
        assert_eq!(values(&f.minus(1.0)), vec![99.0, 49.0, 6.0]);
        assert_eq!(values(&f.multiply(2.0)), vec![200.0, 100.0, 14.0]);
        assert_eq!(values(&f.div(2.0)), vec![50.0, 25.0, 3.5]);
        assert_eq!(values(&f.negative()), vec![-100.0, -50.0, -7.0]);
    }

    #[test]
    fn test_scalar_division_by_zero_follows_ieee() {
        let f = family(vec![
            (vec![("s", "pos")], 1.0),
            (vec![("s", "neg")], -1.0),
            (vec![("s", "zero")], 0.0),
        ]);
        let result = f.div(0.0);
        let v = values(&result);
        assert_eq!(v[0], f64::INFINITY);
        assert_eq!(v[1], f64::NEG_INFINITY);
        assert!(v[2].is_nan());
    }

    #[test]
    fn test_scalar_ops_on_empty() {
        assert!(SampleFamily::Empty.plus(1.0).is_empty());
        assert!(SampleFamily::Empty.negative().is_empty());
    }

    #[test]
    fn test_join_matches_exact_label_sets() {
        let result = left().plus_family(&right());
        assert_eq!(result.len(), 2);
        let s = &result.samples()[0];
        assert_eq!(*s.labels, labels(&[("m", "GET")]));
        assert_eq!(s.value, 104.0);
        // left timestamp is kept
        assert_eq!(s.timestamp, 1_000);
        assert_eq!(result.samples()[1].value, 60.0);
        assert_eq!(result.samples()[1].timestamp, 2_000);
    }

    #[test]
    fn test_join_does_not_match_subsets() {
        let l = family(vec![(vec![("m", "GET"), ("code", "200")], 1.0)]);
        let r = family(vec![(vec![("m", "GET")], 1.0)]);
        assert!(l.plus_family(&r).is_empty());
    }

    #[test]
    fn test_join_without_matches_is_empty() {
        let l = family(vec![(vec![("m", "GET")], 100.0)]);
        let r = family(vec![(vec![("m", "POST")], 1.0)]);
        assert_eq!(l.plus_family(&r), SampleFamily::Empty);
    }

    #[test]
    fn test_join_keeps_left_context() {
        let l = left().downsampling(crate::family::DownsamplingType::Max);
        let result = l.multiply_family(&right());
        assert_eq!(result.context(), l.context());
        assert_eq!(values(&result), vec![400.0, 500.0]);
    }

    #[test]
    fn test_join_uses_first_duplicate_on_right() {
        let l = family(vec![(vec![("m", "GET")], 10.0)]);
        let r = family(vec![(vec![("m", "GET")], 1.0), (vec![("m", "GET")], 2.0)]);
        assert_eq!(values(&l.minus_family(&r)), vec![9.0]);
    }

    #[test]
    fn test_family_division_by_zero() {
        let l = family(vec![(vec![("m", "GET")], 10.0)]);
        let r = family(vec![(vec![("m", "GET")], 0.0)]);
        assert_eq!(values(&l.div_family(&r)), vec![f64::INFINITY]);
    }

    #[test]
    fn test_empty_operand_table() {
        let f = left();
        let empty = SampleFamily::Empty;

        for op in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div] {
            assert!(empty.binary_op(op, &empty).is_empty(), "{op}");
        }

        assert_eq!(empty.plus_family(&f), f);
        assert_eq!(f.plus_family(&empty), f);

        assert_eq!(values(&empty.minus_family(&f)), vec![-100.0, -50.0, -7.0]);
        assert_eq!(f.minus_family(&empty), f);

        assert!(empty.multiply_family(&f).is_empty());
        assert!(f.multiply_family(&empty).is_empty());

        let zero_over = empty.div_family(&f);
        assert_eq!(values(&zero_over), vec![0.0, 0.0, 0.0]);
        assert_eq!(zero_over.samples()[0].timestamp, 1_000);

        let over_zero = f.div_family(&empty);
        assert_eq!(values(&over_zero), vec![f64::INFINITY; 3]);
    }

    #[test]
    fn test_operators_do_not_mutate_inputs() {
        let f = family(vec![(vec![("m", "GET")], 5.0)]);
        let _ = f.plus(1.0).multiply_family(&f);
        assert_eq!(values(&f), vec![5.0]);
        assert_eq!(f.samples()[0].timestamp, DEFAULT_TIMESTAMP);
    }
}
