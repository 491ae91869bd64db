//! Flattened CSV export of every subject and its full weight history.
//!
//! Change columns follow a stricter rule than the in-app history: they are
//! left blank whenever the predecessor's weight is not positive, instead of
//! reporting a 0 % change.

use crate::{Error, Result, history::WeightHistory, subject::Subject};

pub const HEADER: [&str; 12] = [
  "Subject ID",
  "Group",
  "Subgroup",
  "Birth Date",
  "Sex",
  "Breed",
  "Status",
  "Termination Date",
  "Weight (kg)",
  "Weight Date",
  "Weight Change (kg)",
  "Weight Change (%)",
];

/// Placeholder in the weight column for subjects never weighed.
pub const NO_WEIGHTS: &str = "No weights recorded";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One CSV line, already rendered to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
  pub subject_id:        String,
  pub group:             String,
  pub subgroup:          String,
  pub birth_date:        String,
  pub sex:               String,
  pub breed:             String,
  pub status:            String,
  pub termination_date:  String,
  pub weight:            String,
  pub weight_date:       String,
  pub weight_change:     String,
  pub weight_change_pct: String,
}

impl ExportRow {
  fn fields(&self) -> [&str; 12] {
    [
      self.subject_id.as_str(),
      self.group.as_str(),
      self.subgroup.as_str(),
      self.birth_date.as_str(),
      self.sex.as_str(),
      self.breed.as_str(),
      self.status.as_str(),
      self.termination_date.as_str(),
      self.weight.as_str(),
      self.weight_date.as_str(),
      self.weight_change.as_str(),
      self.weight_change_pct.as_str(),
    ]
  }
}

fn round2(v: f64) -> f64 { (v * 100.0).round() / 100.0 }

/// Render a number with at least one decimal place (`80.0`, `12.5`).
fn format_number(v: f64) -> String {
  if v.is_finite() && v.fract() == 0.0 { format!("{v:.1}") } else { v.to_string() }
}

/// Rows for one subject: one per observation, oldest first, or a single
/// placeholder row when there are none.
pub fn export_rows(
  subject: &Subject,
  group_name: Option<&str>,
  subgroup_name: Option<&str>,
  history: &WeightHistory,
) -> Vec<ExportRow> {
  let base = ExportRow {
    subject_id:        subject.subject_id.clone(),
    group:             group_name.unwrap_or_default().to_owned(),
    subgroup:          subgroup_name.unwrap_or_default().to_owned(),
    birth_date:        subject.birth_date.format(DATE_FORMAT).to_string(),
    sex:               subject.sex.clone(),
    breed:             subject.breed.clone(),
    status:            subject.status.to_string(),
    termination_date:  subject
      .terminated_on
      .map(|d| d.format(DATE_FORMAT).to_string())
      .unwrap_or_default(),
    weight:            String::new(),
    weight_date:       String::new(),
    weight_change:     String::new(),
    weight_change_pct: String::new(),
  };

  if history.is_empty() {
    return vec![ExportRow { weight: NO_WEIGHTS.to_owned(), ..base }];
  }

  history
    .oldest_first()
    .iter()
    .map(|entry| {
      // The percentage is taken from the already rounded change.
      let (change, pct) = match (entry.previous, entry.diff) {
        (Some(prev), Some(diff)) if prev > 0.0 => {
          let diff = round2(diff);
          (format_number(diff), format_number(round2(diff / prev * 100.0)))
        }
        _ => (String::new(), String::new()),
      };
      ExportRow {
        weight: format_number(entry.value),
        weight_date: entry.date.format(DATE_FORMAT).to_string(),
        weight_change: change,
        weight_change_pct: pct,
        ..base.clone()
      }
    })
    .collect()
}

/// Render rows as CSV. The header line is always present.
pub fn write_csv<I>(rows: I) -> Result<Vec<u8>>
where
  I: IntoIterator<Item = ExportRow>,
{
  let mut writer = csv::Writer::from_writer(Vec::new());
  writer.write_record(HEADER)?;
  for row in rows {
    writer.write_record(row.fields())?;
  }
  writer.into_inner().map_err(|e| Error::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::{
    history::tests::obs,
    subject::{NewSubject, SubjectStatus},
  };

  fn subject() -> Subject {
    NewSubject {
      subject_id:  "P-1".into(),
      birth_date:  NaiveDate::from_ymd_opt(2024, 11, 5).unwrap(),
      sex:         "F".into(),
      breed:       "Berkshire".into(),
      notes:       None,
      group_id:    None,
      subgroup_id: None,
    }
    .into_subject()
  }

  #[test]
  fn unweighed_subject_yields_one_placeholder_row() {
    let rows = export_rows(&subject(), Some("North"), None, &WeightHistory::default());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].weight, NO_WEIGHTS);
    assert_eq!(rows[0].group, "North");
    assert_eq!(rows[0].birth_date, "2024-11-05");
    assert!(rows[0].weight_date.is_empty());
    assert!(rows[0].weight_change.is_empty());
  }

  #[test]
  fn one_row_per_observation_oldest_first() {
    let history = WeightHistory::build(vec![obs(3, 12.5), obs(1, 10.0), obs(2, 11.0)]);
    let rows = export_rows(&subject(), None, None, &history);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].weight_date, "2025-01-01");
    assert_eq!(rows[0].weight_change, "");
    assert_eq!(rows[0].weight, "10.0");
    assert_eq!(rows[1].weight_change, "1.0");
    assert_eq!(rows[1].weight_change_pct, "10.0");
    assert_eq!(rows[2].weight, "12.5");
    assert_eq!(rows[2].weight_change, "1.5");
    assert_eq!(rows[2].weight_change_pct, "13.64");
  }

  #[test]
  fn percent_comes_from_rounded_change() {
    let history = WeightHistory::build(vec![obs(1, 7.0), obs(2, 7.333)]);
    let rows = export_rows(&subject(), None, None, &history);
    assert_eq!(rows[0].weight, "7.0");
    assert_eq!(rows[1].weight, "7.333");
    assert_eq!(rows[1].weight_change, "0.33");
    // 0.33 / 7 rather than 0.333 / 7.
    assert_eq!(rows[1].weight_change_pct, "4.71");
  }

  #[test]
  fn whole_numbers_keep_one_decimal() {
    assert_eq!(format_number(80.0), "80.0");
    assert_eq!(format_number(-5.0), "-5.0");
    assert_eq!(format_number(0.0), "0.0");
    assert_eq!(format_number(13.64), "13.64");
  }

  #[test]
  fn zero_predecessor_blanks_change_columns() {
    let history = WeightHistory::build(vec![obs(1, 0.0), obs(2, 5.0)]);
    // The in-app view reports a 0 % change here.
    assert_eq!(history.oldest_first()[1].pct, Some(0.0));

    let rows = export_rows(&subject(), None, None, &history);
    assert_eq!(rows[1].weight_change, "");
    assert_eq!(rows[1].weight_change_pct, "");
  }

  #[test]
  fn terminated_subject_carries_date_and_status() {
    let mut s = subject();
    s.status = SubjectStatus::Terminated;
    s.terminated_on = NaiveDate::from_ymd_opt(2025, 2, 1);
    let rows = export_rows(&s, None, None, &WeightHistory::default());
    assert_eq!(rows[0].status, "TERMINATED");
    assert_eq!(rows[0].termination_date, "2025-02-01");
  }

  #[test]
  fn csv_always_has_header() {
    let bytes = write_csv(Vec::new()).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert_eq!(text.lines().count(), 1);
    assert!(text.starts_with("Subject ID,Group,Subgroup"));

    let rows = export_rows(&subject(), Some("Barn, East"), None, &WeightHistory::default());
    let text = String::from_utf8(write_csv(rows).unwrap()).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("\"Barn, East\""));
  }
}
