//! CSV encoding of draw inputs and results.
//!
//! Hunt-code rows are flat, one column per counter, with booleans written as
//! `Y`/`N`. Blank cells read back as `None`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::DrawError;
use crate::metrics::MetricRow;
use crate::types::{
  Applicant, DrawOutcome, HuntCode, NonResidentPool, ReservedPool, ResidentTally, Residency,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct HuntCodeRow {
  code: String,
  #[serde(default)]
  description: String,
  #[serde(with = "yes_no")]
  is_valid: bool,
  #[serde(with = "yes_no")]
  is_in_draw: bool,
  total_quota: Option<u32>,
  quota_balance: Option<u32>,
  total_quota_in_this_draw: Option<u32>,
  quota_balance_in_this_draw: Option<u32>,
  quota_awarded_in_this_draw: Option<u32>,
  total_quota_awarded: Option<u32>,
  #[serde(with = "yes_no")]
  nr_has_hard_cap: bool,
  nr_cap_percent: Option<u32>,
  nr_total_quota: Option<u32>,
  nr_quota_balance: Option<u32>,
  nr_quota_awarded_in_this_draw: Option<u32>,
  nr_total_quota_awarded: Option<u32>,
  res_quota_awarded_in_this_draw: Option<u32>,
  res_total_quota_awarded: Option<u32>,
  #[serde(with = "yes_no")]
  wp_res_is_alloc_enabled: bool,
  wp_res_cap_percent: Option<u32>,
  wp_res_total_quota: Option<u32>,
  wp_res_quota_balance: Option<u32>,
  wp_res_quota_awarded_in_this_draw: Option<u32>,
}

impl From<&HuntCode> for HuntCodeRow {
  fn from(code: &HuntCode) -> Self {
    Self {
      code: code.code.clone(),
      description: code.description.clone(),
      is_valid: code.is_valid,
      is_in_draw: code.is_in_draw,
      total_quota: code.total_quota,
      quota_balance: code.quota_balance,
      total_quota_in_this_draw: code.total_quota_in_this_draw,
      quota_balance_in_this_draw: code.quota_balance_in_this_draw,
      quota_awarded_in_this_draw: code.quota_awarded_in_this_draw,
      total_quota_awarded: code.total_quota_awarded,
      nr_has_hard_cap: code.non_residents.has_hard_cap,
      nr_cap_percent: code.non_residents.cap_percent,
      nr_total_quota: code.non_residents.total_quota,
      nr_quota_balance: code.non_residents.quota_balance,
      nr_quota_awarded_in_this_draw: code.non_residents.quota_awarded_in_this_draw,
      nr_total_quota_awarded: code.non_residents.total_quota_awarded,
      res_quota_awarded_in_this_draw: code.residents.quota_awarded_in_this_draw,
      res_total_quota_awarded: code.residents.total_quota_awarded,
      wp_res_is_alloc_enabled: code.wp_res.is_alloc_enabled,
      wp_res_cap_percent: code.wp_res.cap_percent,
      wp_res_total_quota: code.wp_res.total_quota,
      wp_res_quota_balance: code.wp_res.quota_balance,
      wp_res_quota_awarded_in_this_draw: code.wp_res.quota_awarded_in_this_draw,
    }
  }
}

impl From<HuntCodeRow> for HuntCode {
  fn from(row: HuntCodeRow) -> Self {
    Self {
      code: row.code,
      description: row.description,
      is_valid: row.is_valid,
      is_in_draw: row.is_in_draw,
      total_quota: row.total_quota,
      quota_balance: row.quota_balance,
      total_quota_in_this_draw: row.total_quota_in_this_draw,
      quota_balance_in_this_draw: row.quota_balance_in_this_draw,
      quota_awarded_in_this_draw: row.quota_awarded_in_this_draw,
      total_quota_awarded: row.total_quota_awarded,
      non_residents: NonResidentPool {
        has_hard_cap: row.nr_has_hard_cap,
        cap_percent: row.nr_cap_percent,
        total_quota: row.nr_total_quota,
        quota_balance: row.nr_quota_balance,
        quota_awarded_in_this_draw: row.nr_quota_awarded_in_this_draw,
        total_quota_awarded: row.nr_total_quota_awarded,
      },
      residents: ResidentTally {
        quota_awarded_in_this_draw: row.res_quota_awarded_in_this_draw,
        total_quota_awarded: row.res_total_quota_awarded,
      },
      wp_res: ReservedPool {
        is_alloc_enabled: row.wp_res_is_alloc_enabled,
        cap_percent: row.wp_res_cap_percent,
        total_quota: row.wp_res_total_quota,
        quota_balance: row.wp_res_quota_balance,
        quota_awarded_in_this_draw: row.wp_res_quota_awarded_in_this_draw,
      },
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ApplicantRow {
  application_number: String,
  age: u32,
  residency: Residency,
  #[serde(default)]
  point_balance: u32,
  choice1: Option<String>,
  choice2: Option<String>,
  choice3: Option<String>,
  choice4: Option<String>,
  #[serde(default)]
  draw_outcome: Option<DrawOutcome>,
  #[serde(default)]
  choice_ordinal_awarded: Option<u32>,
  #[serde(default)]
  choice_awarded: Option<String>,
}

impl From<&Applicant> for ApplicantRow {
  fn from(applicant: &Applicant) -> Self {
    let choice = |ordinal: u32| applicant.choice(ordinal).map(str::to_string);
    Self {
      application_number: applicant.application_number.clone(),
      age: applicant.age,
      residency: applicant.residency,
      point_balance: applicant.point_balance,
      choice1: choice(1),
      choice2: choice(2),
      choice3: choice(3),
      choice4: choice(4),
      draw_outcome: applicant.draw_outcome,
      choice_ordinal_awarded: applicant.choice_ordinal_awarded,
      choice_awarded: applicant.choice_awarded.clone(),
    }
  }
}

impl From<ApplicantRow> for Applicant {
  fn from(row: ApplicantRow) -> Self {
    let mut choices: Vec<String> = [row.choice1, row.choice2, row.choice3, row.choice4]
      .into_iter()
      .map(Option::unwrap_or_default)
      .collect();
    while choices.last().is_some_and(|c| c.trim().is_empty()) {
      choices.pop();
    }
    Self {
      application_number: row.application_number,
      age: row.age,
      residency: row.residency,
      point_balance: row.point_balance,
      choices,
      draw_outcome: row.draw_outcome,
      choice_ordinal_awarded: row.choice_ordinal_awarded,
      choice_awarded: row.choice_awarded,
    }
  }
}

pub fn read_hunt_codes(data: &[u8]) -> Result<Vec<HuntCode>, DrawError> {
  read_rows::<HuntCodeRow>(data).map(|rows| rows.into_iter().map(HuntCode::from).collect())
}

pub fn write_hunt_codes(codes: &[HuntCode]) -> Result<Vec<u8>, DrawError> {
  write_rows(codes.iter().map(HuntCodeRow::from))
}

pub fn read_applicants(data: &[u8]) -> Result<Vec<Applicant>, DrawError> {
  read_rows::<ApplicantRow>(data).map(|rows| rows.into_iter().map(Applicant::from).collect())
}

pub fn write_applicants(applicants: &[Applicant]) -> Result<Vec<u8>, DrawError> {
  write_rows(applicants.iter().map(ApplicantRow::from))
}

pub fn write_metrics(rows: &[MetricRow]) -> Result<Vec<u8>, DrawError> {
  write_rows(rows.iter())
}

fn read_rows<T: DeserializeOwned>(data: &[u8]) -> Result<Vec<T>, DrawError> {
  let mut reader = csv::ReaderBuilder::new()
    .trim(csv::Trim::All)
    .from_reader(data);
  let rows = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
  Ok(rows)
}

fn write_rows<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<Vec<u8>, DrawError> {
  let mut writer = csv::Writer::from_writer(Vec::new());
  for row in rows {
    writer.serialize(row)?;
  }
  writer
    .into_inner()
    .map_err(|e| DrawError::Io(e.into_error()))
}

mod yes_no {
  use serde::{Deserialize, Deserializer, Serializer, de};

  pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "Y" } else { "N" })
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = String::deserialize(deserializer)?;
    match value.trim().to_ascii_uppercase().as_str() {
      "Y" | "YES" | "TRUE" | "1" => Ok(true),
      "N" | "NO" | "FALSE" | "0" | "" => Ok(false),
      other => Err(de::Error::custom(format!("expected Y or N, got '{}'", other))),
    }
  }
}
