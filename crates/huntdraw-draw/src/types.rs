use serde::{Deserialize, Serialize};

/// A permit category with its quota and sub-pools.
///
/// Counters are `None` when the source data left them blank. The draw seeds
/// and fills the ones it needs during sanitization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HuntCode {
  pub code: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub is_valid: bool,
  #[serde(default)]
  pub is_in_draw: bool,
  pub total_quota: Option<u32>,
  pub quota_balance: Option<u32>,
  pub total_quota_in_this_draw: Option<u32>,
  pub quota_balance_in_this_draw: Option<u32>,
  pub quota_awarded_in_this_draw: Option<u32>,
  pub total_quota_awarded: Option<u32>,
  #[serde(default)]
  pub non_residents: NonResidentPool,
  #[serde(default)]
  pub residents: ResidentTally,
  #[serde(default)]
  pub wp_res: ReservedPool,
}

/// Non-resident share of a code, optionally hard-capped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonResidentPool {
  #[serde(default)]
  pub has_hard_cap: bool,
  pub cap_percent: Option<u32>,
  pub total_quota: Option<u32>,
  pub quota_balance: Option<u32>,
  pub quota_awarded_in_this_draw: Option<u32>,
  pub total_quota_awarded: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentTally {
  pub quota_awarded_in_this_draw: Option<u32>,
  pub total_quota_awarded: Option<u32>,
}

/// Reservation pool used when the `WpResQuota` rule is on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservedPool {
  #[serde(default)]
  pub is_alloc_enabled: bool,
  pub cap_percent: Option<u32>,
  pub total_quota: Option<u32>,
  pub quota_balance: Option<u32>,
  pub quota_awarded_in_this_draw: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Residency {
  #[serde(alias = "R", alias = "resident")]
  Resident,
  #[serde(alias = "NR", alias = "nonResident", alias = "non_resident")]
  NonResident,
}

impl Residency {
  pub fn as_str(&self) -> &'static str {
    match self {
      Residency::Resident => "Resident",
      Residency::NonResident => "NonResident",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawOutcome {
  Awarded,
  NotAwarded,
}

/// One application, ranking up to four hunt codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Applicant {
  pub application_number: String,
  pub age: u32,
  pub residency: Residency,
  #[serde(default)]
  pub point_balance: u32,
  /// Hunt codes in preference order. Blank entries are kept so ordinals
  /// line up with the columns they came from.
  #[serde(default)]
  pub choices: Vec<String>,
  #[serde(default)]
  pub draw_outcome: Option<DrawOutcome>,
  #[serde(default)]
  pub choice_ordinal_awarded: Option<u32>,
  #[serde(default)]
  pub choice_awarded: Option<String>,
}

impl Applicant {
  pub fn is_awarded(&self) -> bool {
    self.draw_outcome == Some(DrawOutcome::Awarded)
  }

  /// The trimmed, non-blank choice at a 1-based ordinal.
  pub fn choice(&self, ordinal: u32) -> Option<&str> {
    let index = usize::try_from(ordinal).ok()?.checked_sub(1)?;
    self
      .choices
      .get(index)
      .map(|c| c.trim())
      .filter(|c| !c.is_empty())
  }

  pub(crate) fn reset_outcome(&mut self) {
    self.draw_outcome = None;
    self.choice_ordinal_awarded = None;
    self.choice_awarded = None;
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
  ApplicationNumber,
  Age,
  Residency,
  PointBalance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
  #[serde(alias = "asc", alias = "ASC")]
  Asc,
  #[serde(alias = "desc", alias = "DESC")]
  Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRule {
  pub field: SortField,
  pub direction: SortDirection,
}

impl SortRule {
  pub fn new(field: SortField, direction: SortDirection) -> Self {
    Self { field, direction }
  }
}

/// Ordered sort rules; later rules break ties of earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawSort {
  #[serde(default)]
  pub rules: Vec<SortRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuotaRule {
  FlowQuota,
  NonResidentCapEnforcement,
  WpResQuota,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawConfig {
  #[serde(default = "default_use_points")]
  pub use_points: bool,
  /// Blob key of the [`DrawSort`] document.
  #[serde(default)]
  pub sort_ref: Option<String>,
  #[serde(default)]
  pub quota_rule_flags: Vec<QuotaRule>,
  /// When set, only these application numbers take part.
  #[serde(default)]
  pub applicants_allowlist: Option<Vec<String>>,
}

fn default_use_points() -> bool {
  true
}

impl Default for DrawConfig {
  fn default() -> Self {
    Self {
      use_points: true,
      sort_ref: None,
      quota_rule_flags: Vec::new(),
      applicants_allowlist: None,
    }
  }
}

impl DrawConfig {
  pub fn has(&self, rule: QuotaRule) -> bool {
    self.quota_rule_flags.contains(&rule)
  }

  pub fn with_rule(mut self, rule: QuotaRule) -> Self {
    if !self.has(rule) {
      self.quota_rule_flags.push(rule);
    }
    self
  }
}

/// Output of one draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawResult {
  /// Every input hunt-code row, sorted by code.
  pub hunt_code_results: Vec<HuntCode>,
  pub applicant_results: Vec<Applicant>,
  pub hunt_codes_used_in_draw: Vec<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_choice_skips_blank() {
    let applicant = Applicant {
      application_number: "1".to_string(),
      age: 30,
      residency: Residency::Resident,
      point_balance: 0,
      choices: vec![" ".to_string(), " H1 ".to_string()],
      draw_outcome: None,
      choice_ordinal_awarded: None,
      choice_awarded: None,
    };
    assert_eq!(applicant.choice(1), None);
    assert_eq!(applicant.choice(2), Some("H1"));
    assert_eq!(applicant.choice(3), None);
    assert_eq!(applicant.choice(0), None);
  }

  #[test]
  fn test_config_defaults() {
    let config: DrawConfig = serde_json::from_str("{}").unwrap();
    assert!(config.use_points);
    assert!(config.quota_rule_flags.is_empty());

    let config: DrawConfig = serde_json::from_str(
      r#"{"usePoints": false, "quotaRuleFlags": ["WpResQuota"], "sortRef": "s.json"}"#,
    )
    .unwrap();
    assert!(!config.use_points);
    assert!(config.has(QuotaRule::WpResQuota));
    assert!(!config.has(QuotaRule::FlowQuota));
  }

  #[test]
  fn test_sort_rule_aliases() {
    let sort: DrawSort = serde_json::from_str(
      r#"{"rules": [{"field": "age", "direction": "asc"}, {"field": "pointBalance", "direction": "DESC"}]}"#,
    )
    .unwrap();
    assert_eq!(
      sort.rules,
      vec![
        SortRule::new(SortField::Age, SortDirection::Asc),
        SortRule::new(SortField::PointBalance, SortDirection::Desc),
      ]
    );
  }
}
