use std::collections::{BTreeSet, HashSet};

use tracing::info;

use crate::allocation::{ActiveRules, CHOICE_ORDINALS, allocate};
use crate::error::DrawError;
use crate::sanitize::{filter_applicants, merge_hunt_codes, sanitize_hunt_codes};
use crate::sort::ApplicantComparator;
use crate::types::{Applicant, DrawConfig, DrawResult, DrawSort, HuntCode, QuotaRule};

/// Run a draw over raw hunt-code and applicant rows.
///
/// Inputs are not modified. Fails before any allocation when the sort has
/// no rules.
pub fn run_draw(
  hunt_codes: &[HuntCode],
  applicants: &[Applicant],
  sort: &DrawSort,
  config: &DrawConfig,
) -> Result<DrawResult, DrawError> {
  let comparator = ApplicantComparator::new(sort, config.use_points)?;
  let rules = ActiveRules::from_flags(&config.quota_rule_flags);

  let mut codes = sanitize_hunt_codes(hunt_codes, config);
  let mut participants = filter_applicants(applicants, config);
  let used = hunt_codes_used(&codes, &participants);

  info!(
    hunt_codes = codes.len(),
    applicants = participants.len(),
    "starting draw"
  );

  allocate(&mut codes, &mut participants, &comparator, rules);
  comparator.sort(&mut participants);

  if rules.wp_res && !config.has(QuotaRule::FlowQuota) {
    drop_unused_reservations(&mut codes);
  }

  let awarded = participants.iter().filter(|a| a.is_awarded()).count();
  info!(awarded, not_awarded = participants.len() - awarded, "draw complete");

  Ok(DrawResult {
    hunt_code_results: merge_hunt_codes(hunt_codes, &codes),
    applicant_results: participants,
    hunt_codes_used_in_draw: used,
  })
}

/// Reserved quota left unused does not return to the general pool.
fn drop_unused_reservations(codes: &mut [HuntCode]) {
  for code in codes.iter_mut().filter(|c| c.wp_res.is_alloc_enabled) {
    let unused = code.wp_res.quota_balance.unwrap_or(0);
    code.quota_balance = Some(code.quota_balance.unwrap_or(0).saturating_sub(unused));
    code.wp_res.quota_balance = Some(0);
  }
}

/// Sanitized codes named in any participant's choices, sorted.
fn hunt_codes_used(codes: &[HuntCode], applicants: &[Applicant]) -> Vec<String> {
  let known: HashSet<&str> = codes.iter().map(|c| c.code.as_str()).collect();
  applicants
    .iter()
    .flat_map(|a| CHOICE_ORDINALS.filter_map(move |ordinal| a.choice(ordinal)))
    .filter(|choice| known.contains(choice))
    .map(str::to_string)
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}
