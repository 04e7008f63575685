//! Input preparation before allocation, and merging results back afterwards.

use std::collections::{HashMap, HashSet};

use crate::types::{Applicant, DrawConfig, DrawOutcome, HuntCode, QuotaRule};

/// Codes that take part in the draw, with "in this draw" counters seeded
/// and sub-pools derived.
pub fn sanitize_hunt_codes(codes: &[HuntCode], config: &DrawConfig) -> Vec<HuntCode> {
  let wp_res = config.has(QuotaRule::WpResQuota);
  let nr_cap = config.has(QuotaRule::NonResidentCapEnforcement);

  let mut seen = HashSet::new();
  codes
    .iter()
    .filter(|code| code.is_valid && code.is_in_draw)
    .filter(|code| !wp_res || code.wp_res.is_alloc_enabled)
    .filter_map(|code| code.total_quota.map(|total| (code, total)))
    // A repeated code only takes part once.
    .filter(|&(code, _)| seen.insert(code.code.as_str()))
    .map(|(code, total)| {
      let mut code = seed_counters(code, total);
      derive_sub_pools(&mut code, nr_cap, wp_res);
      code
    })
    .collect()
}

fn seed_counters(code: &HuntCode, total: u32) -> HuntCode {
  let balance = code.quota_balance.unwrap_or(total);

  let mut seeded = code.clone();
  seeded.quota_balance = Some(balance);
  seeded.total_quota_in_this_draw = Some(balance);
  seeded.quota_balance_in_this_draw = Some(balance);
  seeded.quota_awarded_in_this_draw = Some(0);
  seeded.total_quota_awarded = Some(code.total_quota_awarded.unwrap_or(0));

  seeded.non_residents.total_quota = None;
  seeded.non_residents.quota_balance = None;
  seeded.non_residents.quota_awarded_in_this_draw = Some(0);
  seeded.non_residents.total_quota_awarded =
    Some(code.non_residents.total_quota_awarded.unwrap_or(0));

  seeded.residents.quota_awarded_in_this_draw = Some(0);
  seeded.residents.total_quota_awarded = Some(code.residents.total_quota_awarded.unwrap_or(0));

  seeded.wp_res.total_quota = None;
  seeded.wp_res.quota_balance = None;
  seeded.wp_res.quota_awarded_in_this_draw = None;
  seeded
}

/// Both pools are sized from the seeded balance, before the reservation
/// override replaces it.
fn derive_sub_pools(code: &mut HuntCode, nr_cap: bool, wp_res: bool) {
  let balance = code.quota_balance_in_this_draw.unwrap_or(0);

  if nr_cap && code.non_residents.has_hard_cap {
    let pool = capped_pool(code.non_residents.cap_percent, balance);
    code.non_residents.total_quota = Some(pool);
    code.non_residents.quota_balance = Some(pool);
  }

  if wp_res && code.wp_res.is_alloc_enabled {
    let pool = capped_pool(code.wp_res.cap_percent, balance);
    code.wp_res.total_quota = Some(pool);
    code.wp_res.quota_balance = Some(pool);
    code.wp_res.quota_awarded_in_this_draw = Some(0);
    code.total_quota_in_this_draw = Some(pool);
    code.quota_balance_in_this_draw = Some(pool);
  }
}

/// `floor(cap_percent * balance / 100)`.
pub fn capped_pool(cap_percent: Option<u32>, balance: u32) -> u32 {
  let pool = u64::from(cap_percent.unwrap_or(0)) * u64::from(balance) / 100;
  u32::try_from(pool).unwrap_or(u32::MAX)
}

/// Applicants taking part: not already awarded, on the allowlist when one
/// is set, with outcome fields cleared.
pub fn filter_applicants(applicants: &[Applicant], config: &DrawConfig) -> Vec<Applicant> {
  let allowlist: Option<HashSet<&str>> = config
    .applicants_allowlist
    .as_ref()
    .map(|list| list.iter().map(|n| n.trim()).collect());

  applicants
    .iter()
    .filter(|a| a.draw_outcome != Some(DrawOutcome::Awarded))
    .filter(|a| {
      allowlist
        .as_ref()
        .is_none_or(|list| list.contains(a.application_number.trim()))
    })
    .map(|a| {
      let mut applicant = a.clone();
      applicant.reset_outcome();
      applicant
    })
    .collect()
}

/// Every original row, with quota and sub-pool fields taken from the drawn
/// row of the same code, sorted by code.
pub fn merge_hunt_codes(originals: &[HuntCode], drawn: &[HuntCode]) -> Vec<HuntCode> {
  let by_code: HashMap<&str, &HuntCode> = drawn.iter().map(|c| (c.code.as_str(), c)).collect();

  let mut merged: Vec<HuntCode> = originals
    .iter()
    .map(|original| match by_code.get(original.code.as_str()) {
      Some(drawn) => with_quota_fields(original, drawn),
      None => original.clone(),
    })
    .collect();
  merged.sort_by(|a, b| a.code.cmp(&b.code));
  merged
}

fn with_quota_fields(original: &HuntCode, drawn: &HuntCode) -> HuntCode {
  let mut row = original.clone();
  row.total_quota = drawn.total_quota;
  row.quota_balance = drawn.quota_balance;
  row.total_quota_in_this_draw = drawn.total_quota_in_this_draw;
  row.quota_balance_in_this_draw = drawn.quota_balance_in_this_draw;
  row.quota_awarded_in_this_draw = drawn.quota_awarded_in_this_draw;
  row.total_quota_awarded = drawn.total_quota_awarded;

  row.non_residents.total_quota = drawn.non_residents.total_quota;
  row.non_residents.quota_balance = drawn.non_residents.quota_balance;
  row.non_residents.quota_awarded_in_this_draw = drawn.non_residents.quota_awarded_in_this_draw;
  row.non_residents.total_quota_awarded = drawn.non_residents.total_quota_awarded;

  row.residents = drawn.residents.clone();

  row.wp_res.total_quota = drawn.wp_res.total_quota;
  row.wp_res.quota_balance = drawn.wp_res.quota_balance;
  row.wp_res.quota_awarded_in_this_draw = drawn.wp_res.quota_awarded_in_this_draw;
  row
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{NonResidentPool, ReservedPool, Residency};

  fn code(code: &str, total: Option<u32>) -> HuntCode {
    HuntCode {
      code: code.to_string(),
      description: format!("{} description", code),
      is_valid: true,
      is_in_draw: true,
      total_quota: total,
      ..HuntCode::default()
    }
  }

  #[test]
  fn test_sanitize_filters_ineligible_codes() {
    let mut invalid = code("B", Some(5));
    invalid.is_valid = false;
    let mut out_of_draw = code("C", Some(5));
    out_of_draw.is_in_draw = false;

    let codes = vec![code("A", Some(5)), invalid, out_of_draw, code("D", None)];
    let sanitized = sanitize_hunt_codes(&codes, &DrawConfig::default());

    let kept: Vec<&str> = sanitized.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(kept, vec!["A"]);
  }

  #[test]
  fn test_sanitize_seeds_from_balance() {
    let mut with_balance = code("A", Some(10));
    with_balance.quota_balance = Some(4);
    with_balance.quota_awarded_in_this_draw = Some(3);

    let sanitized = sanitize_hunt_codes(
      &[with_balance, code("B", Some(7))],
      &DrawConfig::default(),
    );

    assert_eq!(sanitized[0].quota_balance_in_this_draw, Some(4));
    assert_eq!(sanitized[0].total_quota_in_this_draw, Some(4));
    assert_eq!(sanitized[0].quota_awarded_in_this_draw, Some(0));
    assert_eq!(sanitized[1].quota_balance, Some(7));
    assert_eq!(sanitized[1].quota_balance_in_this_draw, Some(7));
  }

  #[test]
  fn test_non_resident_cap() {
    let mut capped = code("A", Some(10));
    capped.non_residents = NonResidentPool {
      has_hard_cap: true,
      cap_percent: Some(20),
      ..NonResidentPool::default()
    };

    let config = DrawConfig::default().with_rule(QuotaRule::NonResidentCapEnforcement);
    let sanitized = sanitize_hunt_codes(&[capped.clone()], &config);
    assert_eq!(sanitized[0].non_residents.total_quota, Some(2));
    assert_eq!(sanitized[0].non_residents.quota_balance, Some(2));

    // Without the rule the pool is not derived.
    let sanitized = sanitize_hunt_codes(&[capped], &DrawConfig::default());
    assert_eq!(sanitized[0].non_residents.quota_balance, None);
  }

  #[test]
  fn test_reserved_pool_overrides_draw_balance() {
    let mut reserved = code("A", Some(15));
    reserved.wp_res = ReservedPool {
      is_alloc_enabled: true,
      cap_percent: Some(30),
      ..ReservedPool::default()
    };
    let plain = code("B", Some(15));

    let config = DrawConfig::default().with_rule(QuotaRule::WpResQuota);
    let sanitized = sanitize_hunt_codes(&[reserved, plain], &config);

    assert_eq!(sanitized.len(), 1);
    assert_eq!(sanitized[0].wp_res.total_quota, Some(4));
    assert_eq!(sanitized[0].total_quota_in_this_draw, Some(4));
    assert_eq!(sanitized[0].quota_balance_in_this_draw, Some(4));
    assert_eq!(sanitized[0].quota_balance, Some(15));
  }

  #[test]
  fn test_capped_pool_floors() {
    assert_eq!(capped_pool(Some(20), 10), 2);
    assert_eq!(capped_pool(Some(33), 10), 3);
    assert_eq!(capped_pool(None, 10), 0);
    assert_eq!(capped_pool(Some(100), u32::MAX), u32::MAX);
  }

  #[test]
  fn test_filter_applicants() {
    let applicant = |number: &str, outcome| Applicant {
      application_number: number.to_string(),
      age: 30,
      residency: Residency::Resident,
      point_balance: 0,
      choices: vec!["A".to_string()],
      draw_outcome: outcome,
      choice_ordinal_awarded: Some(1),
      choice_awarded: Some("A".to_string()),
    };
    let applicants = vec![
      applicant("1", Some(DrawOutcome::Awarded)),
      applicant("2", Some(DrawOutcome::NotAwarded)),
      applicant("3", None),
    ];

    let kept = filter_applicants(&applicants, &DrawConfig::default());
    assert_eq!(kept.len(), 2);
    assert!(kept.iter().all(|a| a.draw_outcome.is_none()));
    assert!(kept.iter().all(|a| a.choice_awarded.is_none()));

    let config = DrawConfig {
      applicants_allowlist: Some(vec!["3".to_string()]),
      ..DrawConfig::default()
    };
    let kept = filter_applicants(&applicants, &config);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].application_number, "3");
  }

  #[test]
  fn test_merge_preserves_every_row() {
    let mut drawn = code("B", Some(10));
    drawn.description = "changed".to_string();
    drawn.quota_balance = Some(9);
    drawn.quota_awarded_in_this_draw = Some(1);

    let originals = vec![code("C", Some(3)), code("B", Some(10)), code("A", None)];
    let merged = merge_hunt_codes(&originals, &[drawn]);

    let codes: Vec<&str> = merged.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["A", "B", "C"]);
    assert_eq!(merged[1].description, "B description");
    assert_eq!(merged[1].quota_balance, Some(9));
    assert_eq!(merged[1].quota_awarded_in_this_draw, Some(1));
    assert_eq!(merged[0], originals[2]);
    assert_eq!(merged[2], originals[0]);
  }
}
