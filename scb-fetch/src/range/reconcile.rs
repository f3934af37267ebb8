//! Range reconciliation
//!
//! The sheet provider echoes its own canonical range strings: it prepends
//! the sheet name, quotes it, and may widen the end column of a request.
//! The [`Reconciler`] maps each requested range back to the echoed matrix.
//!
//! Matching, in order:
//! 1. Exact: the echoed reference (sheet qualifier removed) equals the
//!    requested reference, and the sheets agree when the request names one.
//! 2. Fallback, overlay ranges only: start column, start row and end row
//!    agree even though the echoed end column differs.
//!
//! Each echoed entry is claimed by at most one distinct request. A range
//! with no match resolves to an empty matrix and is logged; it never fails
//! the fetch.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::batch::{RangeRole, RoleTaggedRange};
use super::{parse_range, split_sheet, RangeAddress};

/// Row-major cell values
pub type Matrix = Vec<Vec<String>>;

/// One `(range, values)` pair as returned by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoedRange {
    pub range: String,
    pub values: Matrix,
}

impl EchoedRange {
    pub fn new(range: impl Into<String>, values: Matrix) -> Self {
        Self {
            range: range.into(),
            values,
        }
    }
}

/// Normalized comparison key: unquoted sheet and upper-cased reference
#[derive(Debug, Clone, PartialEq, Eq)]
struct RangeKey {
    sheet: Option<String>,
    reference: String,
}

impl RangeKey {
    fn of(range: &str) -> Self {
        let (sheet, reference) = split_sheet(range.trim());
        Self {
            sheet,
            reference: reference.replace('$', "").to_ascii_uppercase(),
        }
    }

    fn sheet_matches(&self, echoed: &RangeKey) -> bool {
        match (&self.sheet, &echoed.sheet) {
            (None, _) => true,
            (Some(wanted), Some(got)) => wanted.eq_ignore_ascii_case(got),
            (Some(_), None) => false,
        }
    }

    fn matches_exactly(&self, echoed: &RangeKey) -> bool {
        self.reference == echoed.reference && self.sheet_matches(echoed)
    }
}

/// Maps provider echoes back to requested ranges
pub struct Reconciler {
    echoed: Vec<(RangeKey, Option<RangeAddress>, EchoedRange)>,
    claimed: Vec<bool>,
}

/// Matrices resolved per role
#[derive(Debug, Default)]
pub struct ReconciledRanges {
    matrices: HashMap<RangeRole, Matrix>,
    misses: Vec<RangeRole>,
}

impl ReconciledRanges {
    /// Matrix for `role`; empty when the range was not matched
    pub fn get(&self, role: RangeRole) -> &[Vec<String>] {
        self.matrices.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Roles whose range matched no echoed entry
    pub fn misses(&self) -> &[RangeRole] {
        &self.misses
    }
}

impl Reconciler {
    pub fn new(echoed: Vec<EchoedRange>) -> Self {
        let claimed = vec![false; echoed.len()];
        let echoed = echoed
            .into_iter()
            .map(|e| (RangeKey::of(&e.range), parse_range(&e.range).ok(), e))
            .collect();
        Self { echoed, claimed }
    }

    /// Resolve every requested range
    ///
    /// Roles that share a range string share its matrix.
    pub fn reconcile(mut self, requested: &[RoleTaggedRange]) -> ReconciledRanges {
        // Distinct range strings, in request order, with their roles
        let mut distinct: Vec<(&RoleTaggedRange, Vec<RangeRole>)> = Vec::new();
        for tagged in requested {
            match distinct.iter_mut().find(|(first, _)| first.range == tagged.range) {
                Some((_, roles)) => roles.push(tagged.role),
                None => distinct.push((tagged, vec![tagged.role])),
            }
        }

        let mut resolved: Vec<Option<usize>> = distinct
            .iter()
            .map(|(tagged, _)| self.match_exact(tagged))
            .collect();

        for (slot, (tagged, roles)) in resolved.iter_mut().zip(&distinct) {
            if slot.is_none() && roles.iter().any(|r| r.is_overlay()) {
                *slot = self.match_widened(tagged);
            }
        }

        let mut out = ReconciledRanges::default();
        for (slot, (tagged, roles)) in resolved.into_iter().zip(distinct) {
            match slot {
                Some(index) => {
                    let values = &self.echoed[index].2.values;
                    for role in roles {
                        out.matrices.insert(role, values.clone());
                    }
                }
                None => {
                    warn!(
                        range = %tagged.range,
                        role = %tagged.role,
                        "No echoed range matches request, treating column as blank"
                    );
                    out.misses.extend(roles);
                }
            }
        }
        out
    }

    /// Exact reference match; prefers an unclaimed entry
    fn match_exact(&mut self, tagged: &RoleTaggedRange) -> Option<usize> {
        let wanted = RangeKey::of(&tagged.range);
        let candidates: Vec<usize> = self
            .echoed
            .iter()
            .enumerate()
            .filter(|(_, (key, _, _))| wanted.matches_exactly(key))
            .map(|(i, _)| i)
            .collect();

        let index = candidates
            .iter()
            .copied()
            .find(|&i| !self.claimed[i])
            .or_else(|| candidates.first().copied())?;

        self.claimed[index] = true;
        debug!(
            range = %tagged.range,
            echoed = %self.echoed[index].2.range,
            "Matched echoed range"
        );
        Some(index)
    }

    /// Same start column and rows, end column allowed to differ
    fn match_widened(&mut self, tagged: &RoleTaggedRange) -> Option<usize> {
        let wanted = tagged.address.as_ref()?;
        let wanted_key = RangeKey::of(&tagged.range);

        let index = self.echoed.iter().enumerate().position(|(i, (key, address, _))| {
            !self.claimed[i]
                && wanted_key.sheet_matches(key)
                && address.as_ref().is_some_and(|got| {
                    got.column == wanted.column
                        && got.start_row == wanted.start_row
                        && got.end_row == wanted.end_row
                })
        })?;

        self.claimed[index] = true;
        debug!(
            range = %tagged.range,
            echoed = %self.echoed[index].2.range,
            "Matched widened echoed range"
        );
        Some(index)
    }
}
