//! Round-by-round allocation.
//!
//! Each round buckets the applicants still waiting by their choice at that
//! ordinal. Buckets only read shared state, so they run in parallel; their
//! [`QuotaDelta`]s and awards are applied once the whole round is done.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::sort::ApplicantComparator;
use crate::types::{Applicant, DrawOutcome, HuntCode, QuotaRule, Residency};

/// Choice ordinals tried, in order.
pub const CHOICE_ORDINALS: std::ops::RangeInclusive<u32> = 1..=4;

/// Quota rules in force for one draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveRules {
  pub non_resident_cap: bool,
  pub wp_res: bool,
}

impl ActiveRules {
  pub fn from_flags(flags: &[QuotaRule]) -> Self {
    Self {
      non_resident_cap: flags.contains(&QuotaRule::NonResidentCapEnforcement),
      wp_res: flags.contains(&QuotaRule::WpResQuota),
    }
  }
}

/// Applicants whose choice at `choice_ordinal` is one hunt code.
#[derive(Debug)]
pub struct DrawBucket<'a> {
  pub hunt_code: &'a HuntCode,
  /// Indices into the round's applicant slice.
  pub applicants: Vec<usize>,
  pub choice_ordinal: u32,
}

/// What one bucket takes out of its hunt code's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaDelta {
  pub awarded: u32,
  pub resident_awarded: u32,
  pub non_resident_awarded: u32,
  /// Awards charged to the non-resident hard-cap pool.
  pub non_resident_pool_used: u32,
  /// Awards charged to the reservation pool.
  pub reserved_used: u32,
}

#[derive(Debug)]
pub struct BucketOutcome {
  pub code_index: usize,
  pub delta: QuotaDelta,
  /// Applicant indices admitted, in admission order.
  pub awarded: Vec<usize>,
}

/// Group waiting applicants by their choice at `choice_ordinal`.
///
/// Blank choices and codes not taking part in the draw are skipped. Buckets
/// are keyed by code index so iteration order is stable.
pub fn bucket_applicants<'a>(
  codes: &'a [HuntCode],
  code_index: &HashMap<&str, usize>,
  applicants: &[Applicant],
  choice_ordinal: u32,
) -> BTreeMap<usize, DrawBucket<'a>> {
  let mut buckets: BTreeMap<usize, DrawBucket<'a>> = BTreeMap::new();
  for (index, applicant) in applicants.iter().enumerate() {
    if applicant.is_awarded() {
      continue;
    }
    let Some(&code) = applicant
      .choice(choice_ordinal)
      .and_then(|choice| code_index.get(choice))
    else {
      continue;
    };
    buckets
      .entry(code)
      .or_insert_with(|| DrawBucket {
        hunt_code: &codes[code],
        applicants: Vec::new(),
        choice_ordinal,
      })
      .applicants
      .push(index);
  }
  buckets
}

/// Allocate one bucket against its code's current counters.
pub fn allocate_bucket(
  code_index: usize,
  bucket: &DrawBucket<'_>,
  applicants: &[Applicant],
  comparator: &ApplicantComparator,
  rules: ActiveRules,
) -> BucketOutcome {
  let code = bucket.hunt_code;
  let nr_capped = rules.non_resident_cap && code.non_residents.has_hard_cap;
  let reserved = rules.wp_res && code.wp_res.is_alloc_enabled;

  let mut balance = code.quota_balance_in_this_draw.unwrap_or(0);
  let mut nr_balance = code.non_residents.quota_balance.unwrap_or(0);
  let mut reserved_balance = code.wp_res.quota_balance.unwrap_or(0);

  let mut order = bucket.applicants.clone();
  order.sort_by(|&a, &b| comparator.compare(&applicants[a], &applicants[b]));

  let mut delta = QuotaDelta::default();
  let mut awarded = Vec::new();
  for index in order {
    if balance == 0 {
      break;
    }
    let applicant = &applicants[index];
    if applicant.is_awarded() {
      continue;
    }

    let resident = applicant.residency == Residency::Resident;
    if rules.wp_res && !(resident && reserved_balance > 0) {
      continue;
    }
    if nr_capped && !resident && nr_balance == 0 {
      continue;
    }

    balance -= 1;
    delta.awarded += 1;
    if resident {
      delta.resident_awarded += 1;
    } else {
      delta.non_resident_awarded += 1;
      if nr_capped {
        nr_balance -= 1;
        delta.non_resident_pool_used += 1;
      }
    }
    if reserved {
      reserved_balance -= 1;
      delta.reserved_used += 1;
    }
    awarded.push(index);
  }

  BucketOutcome {
    code_index,
    delta,
    awarded,
  }
}

impl HuntCode {
  /// Apply a bucket's tallies to the running counters.
  pub fn apply_delta(&mut self, delta: &QuotaDelta, rules: ActiveRules) {
    self.quota_awarded_in_this_draw = Some(add(self.quota_awarded_in_this_draw, delta.awarded));
    self.total_quota_awarded = Some(add(self.total_quota_awarded, delta.awarded));
    self.quota_balance_in_this_draw = Some(sub(self.quota_balance_in_this_draw, delta.awarded));
    self.quota_balance = Some(sub(self.quota_balance, delta.awarded));

    self.residents.quota_awarded_in_this_draw = Some(add(
      self.residents.quota_awarded_in_this_draw,
      delta.resident_awarded,
    ));
    self.residents.total_quota_awarded =
      Some(add(self.residents.total_quota_awarded, delta.resident_awarded));

    self.non_residents.quota_awarded_in_this_draw = Some(add(
      self.non_residents.quota_awarded_in_this_draw,
      delta.non_resident_awarded,
    ));
    self.non_residents.total_quota_awarded = Some(add(
      self.non_residents.total_quota_awarded,
      delta.non_resident_awarded,
    ));
    if rules.non_resident_cap && self.non_residents.has_hard_cap {
      self.non_residents.quota_balance = Some(sub(
        self.non_residents.quota_balance,
        delta.non_resident_pool_used,
      ));
    }

    if rules.wp_res && self.wp_res.is_alloc_enabled {
      self.wp_res.quota_balance = Some(sub(self.wp_res.quota_balance, delta.reserved_used));
      self.wp_res.quota_awarded_in_this_draw =
        Some(add(self.wp_res.quota_awarded_in_this_draw, delta.reserved_used));
    }
  }
}

fn add(counter: Option<u32>, n: u32) -> u32 {
  counter.unwrap_or(0).saturating_add(n)
}

fn sub(counter: Option<u32>, n: u32) -> u32 {
  counter.unwrap_or(0).saturating_sub(n)
}

/// Run every round. `codes` and `applicants` are updated in place between
/// rounds; rounds never overlap.
pub fn allocate(
  codes: &mut [HuntCode],
  applicants: &mut [Applicant],
  comparator: &ApplicantComparator,
  rules: ActiveRules,
) {
  for ordinal in CHOICE_ORDINALS {
    let outcomes = run_round(codes, applicants, comparator, rules, ordinal);

    let mut round_awarded = 0;
    for outcome in outcomes {
      let code = &mut codes[outcome.code_index];
      code.apply_delta(&outcome.delta, rules);
      for index in outcome.awarded {
        let applicant = &mut applicants[index];
        applicant.draw_outcome = Some(DrawOutcome::Awarded);
        applicant.choice_ordinal_awarded = Some(ordinal);
        applicant.choice_awarded = Some(code.code.clone());
        round_awarded += 1;
      }
    }
    info!(round = ordinal, awarded = round_awarded, "draw round complete");
  }

  for applicant in applicants.iter_mut().filter(|a| !a.is_awarded()) {
    applicant.draw_outcome = Some(DrawOutcome::NotAwarded);
    applicant.choice_ordinal_awarded = None;
    applicant.choice_awarded = None;
  }
}

fn run_round(
  codes: &[HuntCode],
  applicants: &[Applicant],
  comparator: &ApplicantComparator,
  rules: ActiveRules,
  ordinal: u32,
) -> Vec<BucketOutcome> {
  let code_index: HashMap<&str, usize> = codes
    .iter()
    .enumerate()
    .map(|(i, c)| (c.code.as_str(), i))
    .collect();

  let buckets: Vec<(usize, DrawBucket<'_>)> =
    bucket_applicants(codes, &code_index, applicants, ordinal)
      .into_iter()
      .collect();

  buckets
    .par_iter()
    .map(|(index, bucket)| {
      let outcome = allocate_bucket(*index, bucket, applicants, comparator, rules);
      debug!(
        round = ordinal,
        hunt_code = %bucket.hunt_code.code,
        applicants = bucket.applicants.len(),
        awarded = outcome.awarded.len(),
        "allocated bucket"
      );
      outcome
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{DrawSort, NonResidentPool, SortDirection, SortField, SortRule};

  fn comparator() -> ApplicantComparator {
    let sort = DrawSort {
      rules: vec![SortRule::new(
        SortField::PointBalance,
        SortDirection::Desc,
      )],
    };
    ApplicantComparator::new(&sort, true).unwrap()
  }

  fn code(code: &str, balance: u32) -> HuntCode {
    HuntCode {
      code: code.to_string(),
      is_valid: true,
      is_in_draw: true,
      total_quota: Some(balance),
      quota_balance: Some(balance),
      total_quota_in_this_draw: Some(balance),
      quota_balance_in_this_draw: Some(balance),
      quota_awarded_in_this_draw: Some(0),
      total_quota_awarded: Some(0),
      ..HuntCode::default()
    }
  }

  fn applicant(number: &str, residency: Residency, points: u32, choices: &[&str]) -> Applicant {
    Applicant {
      application_number: number.to_string(),
      age: 40,
      residency,
      point_balance: points,
      choices: choices.iter().map(|c| c.to_string()).collect(),
      draw_outcome: None,
      choice_ordinal_awarded: None,
      choice_awarded: None,
    }
  }

  #[test]
  fn test_buckets_skip_blank_and_unknown_choices() {
    let codes = vec![code("A", 1), code("B", 1)];
    let index: HashMap<&str, usize> = [("A", 0), ("B", 1)].into_iter().collect();
    let applicants = vec![
      applicant("1", Residency::Resident, 0, &["A"]),
      applicant("2", Residency::Resident, 0, &["Z"]),
      applicant("3", Residency::Resident, 0, &[""]),
      applicant("4", Residency::Resident, 0, &["B"]),
      applicant("5", Residency::Resident, 0, &["A"]),
    ];

    let buckets = bucket_applicants(&codes, &index, &applicants, 1);
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[&0].applicants, vec![0, 4]);
    assert_eq!(buckets[&1].applicants, vec![3]);
    assert_eq!(buckets[&1].choice_ordinal, 1);
  }

  #[test]
  fn test_bucket_awards_in_sort_order_until_empty() {
    let codes = vec![code("A", 2)];
    let applicants = vec![
      applicant("low", Residency::Resident, 1, &["A"]),
      applicant("high", Residency::Resident, 9, &["A"]),
      applicant("mid", Residency::NonResident, 5, &["A"]),
    ];
    let bucket = DrawBucket {
      hunt_code: &codes[0],
      applicants: vec![0, 1, 2],
      choice_ordinal: 1,
    };

    let outcome = allocate_bucket(0, &bucket, &applicants, &comparator(), ActiveRules::default());
    assert_eq!(outcome.awarded, vec![1, 2]);
    assert_eq!(
      outcome.delta,
      QuotaDelta {
        awarded: 2,
        resident_awarded: 1,
        non_resident_awarded: 1,
        ..QuotaDelta::default()
      }
    );
  }

  #[test]
  fn test_bucket_respects_non_resident_pool() {
    let mut capped = code("A", 3);
    capped.non_residents = NonResidentPool {
      has_hard_cap: true,
      cap_percent: Some(34),
      total_quota: Some(1),
      quota_balance: Some(1),
      ..NonResidentPool::default()
    };
    let codes = vec![capped];
    let applicants = vec![
      applicant("nr1", Residency::NonResident, 9, &["A"]),
      applicant("nr2", Residency::NonResident, 8, &["A"]),
      applicant("r1", Residency::Resident, 1, &["A"]),
    ];
    let bucket = DrawBucket {
      hunt_code: &codes[0],
      applicants: vec![0, 1, 2],
      choice_ordinal: 1,
    };
    let rules = ActiveRules {
      non_resident_cap: true,
      wp_res: false,
    };

    let outcome = allocate_bucket(0, &bucket, &applicants, &comparator(), rules);
    assert_eq!(outcome.awarded, vec![0, 2]);
    assert_eq!(outcome.delta.non_resident_pool_used, 1);
  }

  #[test]
  fn test_apply_delta_saturates() {
    let mut hunt_code = code("A", 1);
    hunt_code.apply_delta(
      &QuotaDelta {
        awarded: 3,
        resident_awarded: 3,
        ..QuotaDelta::default()
      },
      ActiveRules::default(),
    );
    assert_eq!(hunt_code.quota_balance, Some(0));
    assert_eq!(hunt_code.quota_balance_in_this_draw, Some(0));
    assert_eq!(hunt_code.quota_awarded_in_this_draw, Some(3));
    assert_eq!(hunt_code.residents.total_quota_awarded, Some(3));
  }

  #[test]
  fn test_later_round_uses_next_choice() {
    let mut codes = vec![code("A", 1), code("B", 1)];
    let mut applicants = vec![
      applicant("1", Residency::Resident, 9, &["A", "B"]),
      applicant("2", Residency::Resident, 5, &["A", "B"]),
      applicant("3", Residency::Resident, 1, &["A", "B"]),
    ];

    allocate(&mut codes, &mut applicants, &comparator(), ActiveRules::default());

    assert_eq!(applicants[0].choice_awarded.as_deref(), Some("A"));
    assert_eq!(applicants[0].choice_ordinal_awarded, Some(1));
    assert_eq!(applicants[1].choice_awarded.as_deref(), Some("B"));
    assert_eq!(applicants[1].choice_ordinal_awarded, Some(2));
    assert_eq!(applicants[2].draw_outcome, Some(DrawOutcome::NotAwarded));
    assert_eq!(applicants[2].choice_awarded, None);
  }
}
