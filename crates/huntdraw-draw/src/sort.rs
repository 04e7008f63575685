use std::cmp::Ordering;

use crate::error::DrawError;
use crate::types::{Applicant, DrawSort, SortDirection, SortField, SortRule};

/// Composite applicant comparator built from a [`DrawSort`].
#[derive(Debug, Clone)]
pub struct ApplicantComparator {
  rules: Vec<SortRule>,
}

impl ApplicantComparator {
  /// Fails when the sort has no rules. With `use_points` off, point-balance
  /// rules are dropped.
  pub fn new(sort: &DrawSort, use_points: bool) -> Result<Self, DrawError> {
    if sort.rules.is_empty() {
      return Err(DrawError::MissingSortRules);
    }
    let rules = sort
      .rules
      .iter()
      .copied()
      .filter(|rule| use_points || rule.field != SortField::PointBalance)
      .collect();
    Ok(Self { rules })
  }

  pub fn rules(&self) -> &[SortRule] {
    &self.rules
  }

  pub fn compare(&self, a: &Applicant, b: &Applicant) -> Ordering {
    self
      .rules
      .iter()
      .map(|rule| {
        let ordering = compare_field(rule.field, a, b);
        match rule.direction {
          SortDirection::Asc => ordering,
          SortDirection::Desc => ordering.reverse(),
        }
      })
      .find(|ordering| ordering.is_ne())
      .unwrap_or(Ordering::Equal)
  }

  /// Stable sort in comparator order.
  pub fn sort(&self, applicants: &mut [Applicant]) {
    applicants.sort_by(|a, b| self.compare(a, b));
  }
}

fn compare_field(field: SortField, a: &Applicant, b: &Applicant) -> Ordering {
  match field {
    SortField::ApplicationNumber => locale_compare(&a.application_number, &b.application_number),
    SortField::Residency => locale_compare(a.residency.as_str(), b.residency.as_str()),
    SortField::Age => a.age.cmp(&b.age),
    SortField::PointBalance => a.point_balance.cmp(&b.point_balance),
  }
}

/// Case-insensitive ordering, falling back to exact ordering on a tie.
pub(crate) fn locale_compare(a: &str, b: &str) -> Ordering {
  a.to_lowercase()
    .cmp(&b.to_lowercase())
    .then_with(|| a.cmp(b))
}
