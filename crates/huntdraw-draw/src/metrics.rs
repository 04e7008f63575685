//! Summary metrics over a draw's results.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::allocation::CHOICE_ORDINALS;
use crate::types::{Applicant, DrawResult, HuntCode, Residency};

/// `round(100 * part / total, 2)`, or `0` when `total` is `0`.
pub fn percent(part: u64, total: u64) -> f64 {
  if total == 0 {
    return 0.0;
  }
  (100.0 * part as f64 / total as f64 * 100.0).round() / 100.0
}

/// Quota sums over a set of hunt codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaTotals {
  pub quota: u64,
  pub awarded: u64,
  pub balance: u64,
  pub resident_awarded: u64,
  pub non_resident_awarded: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantTotals {
  pub applicants: u64,
  pub residents: u64,
  pub non_residents: u64,
  pub awarded: u64,
  pub not_awarded: u64,
  /// Awards per choice ordinal, first choice first.
  pub awarded_by_choice: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawMetrics {
  /// Codes used in this draw, "this draw" counters.
  pub this_draw: QuotaTotals,
  /// Every valid in-draw code, overall counters.
  pub all_time: QuotaTotals,
  pub applicants: ApplicantTotals,
}

/// One exported `metric,value` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
  pub metric: String,
  pub value: String,
}

impl DrawMetrics {
  pub fn from_result(result: &DrawResult) -> Self {
    let used: HashSet<&str> = result
      .hunt_codes_used_in_draw
      .iter()
      .map(String::as_str)
      .collect();
    let eligible = || {
      result
        .hunt_code_results
        .iter()
        .filter(|c| c.is_valid && c.is_in_draw)
    };

    Self {
      this_draw: eligible()
        .filter(|c| used.contains(c.code.as_str()))
        .fold(QuotaTotals::default(), |totals, code| {
          totals.add_this_draw(code)
        }),
      all_time: eligible().fold(QuotaTotals::default(), |totals, code| totals.add_all_time(code)),
      applicants: ApplicantTotals::from_applicants(&result.applicant_results),
    }
  }

  /// Flatten into `metric,value` rows, counts first and percentages after.
  pub fn rows(&self) -> Vec<MetricRow> {
    let mut rows = Vec::new();
    let mut push = |metric: String, value: String| rows.push(MetricRow { metric, value });

    for (scope, totals) in [("this_draw", &self.this_draw), ("all_time", &self.all_time)] {
      push(format!("{}_quota", scope), totals.quota.to_string());
      push(format!("{}_awarded", scope), totals.awarded.to_string());
      push(format!("{}_balance", scope), totals.balance.to_string());
      push(
        format!("{}_resident_awarded", scope),
        totals.resident_awarded.to_string(),
      );
      push(
        format!("{}_non_resident_awarded", scope),
        totals.non_resident_awarded.to_string(),
      );
      push(
        format!("{}_awarded_percent", scope),
        percent(totals.awarded, totals.quota).to_string(),
      );
      push(
        format!("{}_resident_awarded_percent", scope),
        percent(totals.resident_awarded, totals.awarded).to_string(),
      );
      push(
        format!("{}_non_resident_awarded_percent", scope),
        percent(totals.non_resident_awarded, totals.awarded).to_string(),
      );
    }

    let applicants = &self.applicants;
    push("applicants".to_string(), applicants.applicants.to_string());
    push("applicants_resident".to_string(), applicants.residents.to_string());
    push(
      "applicants_non_resident".to_string(),
      applicants.non_residents.to_string(),
    );
    push("applicants_awarded".to_string(), applicants.awarded.to_string());
    push(
      "applicants_not_awarded".to_string(),
      applicants.not_awarded.to_string(),
    );
    push(
      "applicants_awarded_percent".to_string(),
      percent(applicants.awarded, applicants.applicants).to_string(),
    );
    for (ordinal, &awarded) in CHOICE_ORDINALS.zip(&applicants.awarded_by_choice) {
      push(format!("awarded_choice_{}", ordinal), awarded.to_string());
      push(
        format!("awarded_choice_{}_percent", ordinal),
        percent(awarded, applicants.awarded).to_string(),
      );
    }

    rows
  }
}

impl QuotaTotals {
  fn add_this_draw(self, code: &HuntCode) -> Self {
    Self {
      quota: self.quota + count(code.total_quota_in_this_draw),
      awarded: self.awarded + count(code.quota_awarded_in_this_draw),
      balance: self.balance + count(code.quota_balance_in_this_draw),
      resident_awarded: self.resident_awarded + count(code.residents.quota_awarded_in_this_draw),
      non_resident_awarded: self.non_resident_awarded
        + count(code.non_residents.quota_awarded_in_this_draw),
    }
  }

  fn add_all_time(self, code: &HuntCode) -> Self {
    Self {
      quota: self.quota + count(code.total_quota),
      awarded: self.awarded + count(code.total_quota_awarded),
      balance: self.balance + count(code.quota_balance),
      resident_awarded: self.resident_awarded + count(code.residents.total_quota_awarded),
      non_resident_awarded: self.non_resident_awarded
        + count(code.non_residents.total_quota_awarded),
    }
  }
}

fn count(counter: Option<u32>) -> u64 {
  u64::from(counter.unwrap_or(0))
}

impl ApplicantTotals {
  fn from_applicants(applicants: &[Applicant]) -> Self {
    let mut totals = Self {
      awarded_by_choice: vec![0; CHOICE_ORDINALS.count()],
      ..Self::default()
    };
    for applicant in applicants {
      totals.applicants += 1;
      match applicant.residency {
        Residency::Resident => totals.residents += 1,
        Residency::NonResident => totals.non_residents += 1,
      }
      if !applicant.is_awarded() {
        totals.not_awarded += 1;
        continue;
      }
      totals.awarded += 1;
      let slot = applicant
        .choice_ordinal_awarded
        .and_then(|ordinal| usize::try_from(ordinal).ok()?.checked_sub(1))
        .and_then(|index| totals.awarded_by_choice.get_mut(index));
      if let Some(slot) = slot {
        *slot += 1;
      }
    }
    totals
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::DrawOutcome;

  #[test]
  fn test_percent() {
    assert_eq!(percent(0, 0), 0.0);
    assert_eq!(percent(5, 0), 0.0);
    assert_eq!(percent(1, 3), 33.33);
    assert_eq!(percent(2, 3), 66.67);
    assert_eq!(percent(1, 8), 12.5);
    assert_eq!(percent(4, 4), 100.0);
  }

  fn code(code: &str, in_draw: bool, awarded: u32, quota: u32) -> HuntCode {
    HuntCode {
      code: code.to_string(),
      is_valid: true,
      is_in_draw: in_draw,
      total_quota: Some(quota),
      quota_balance: Some(quota - awarded),
      total_quota_in_this_draw: Some(quota),
      quota_balance_in_this_draw: Some(quota - awarded),
      quota_awarded_in_this_draw: Some(awarded),
      total_quota_awarded: Some(awarded),
      ..HuntCode::default()
    }
  }

  fn applicant(residency: Residency, ordinal: Option<u32>) -> Applicant {
    Applicant {
      application_number: "1".to_string(),
      age: 30,
      residency,
      point_balance: 0,
      choices: Vec::new(),
      draw_outcome: Some(if ordinal.is_some() {
        DrawOutcome::Awarded
      } else {
        DrawOutcome::NotAwarded
      }),
      choice_ordinal_awarded: ordinal,
      choice_awarded: None,
    }
  }

  #[test]
  fn test_metrics_scopes() {
    let result = DrawResult {
      hunt_code_results: vec![code("A", true, 2, 4), code("B", true, 0, 6), code("C", false, 9, 9)],
      applicant_results: vec![
        applicant(Residency::Resident, Some(1)),
        applicant(Residency::NonResident, Some(2)),
        applicant(Residency::Resident, None),
      ],
      hunt_codes_used_in_draw: vec!["A".to_string()],
    };

    let metrics = DrawMetrics::from_result(&result);
    assert_eq!(metrics.this_draw.quota, 4);
    assert_eq!(metrics.this_draw.awarded, 2);
    assert_eq!(metrics.all_time.quota, 10);
    assert_eq!(metrics.all_time.balance, 8);
    assert_eq!(metrics.applicants.awarded, 2);
    assert_eq!(metrics.applicants.not_awarded, 1);
    assert_eq!(metrics.applicants.awarded_by_choice, vec![1, 1, 0, 0]);

    let rows = metrics.rows();
    let value = |name: &str| {
      rows
        .iter()
        .find(|row| row.metric == name)
        .map(|row| row.value.as_str())
    };
    assert_eq!(value("this_draw_awarded_percent"), Some("50"));
    assert_eq!(value("all_time_awarded_percent"), Some("20"));
    assert_eq!(value("applicants_awarded_percent"), Some("66.67"));
    assert_eq!(value("awarded_choice_4_percent"), Some("0"));
  }
}
