//! Per-group statistics.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  group::Group,
  observation::WeightObservation,
  subject::{Subject, SubjectStatus},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
  pub group_id:               Uuid,
  pub group_name:             String,
  pub total:                  usize,
  pub active:                 usize,
  pub terminated:             usize,
  /// Mean of each member's most recent observation; `None` when no member
  /// has been weighed.
  pub average_current_weight: Option<f64>,
}

/// The observation with the greatest date. Among several on that date the
/// first one in `observations` wins.
pub fn latest_observation<'a, I>(observations: I) -> Option<&'a WeightObservation>
where
  I: IntoIterator<Item = &'a WeightObservation>,
{
  observations.into_iter().fold(None, |best, obs| match best {
    Some(b) if b.date >= obs.date => Some(b),
    _ => Some(obs),
  })
}

/// Summarise `group` from the subjects and observations given.
///
/// Subjects outside the group are ignored, as are observations whose subject
/// is not a member.
pub fn group_stats(
  group: &Group,
  subjects: &[Subject],
  observations: &[WeightObservation],
) -> GroupStats {
  let members: Vec<&Subject> = subjects
    .iter()
    .filter(|s| s.group_id == Some(group.group_id))
    .collect();

  let mut by_subject: HashMap<&str, Vec<&WeightObservation>> = members
    .iter()
    .map(|s| (s.subject_id.as_str(), Vec::new()))
    .collect();
  for obs in observations {
    if let Some(list) = by_subject.get_mut(obs.subject_id.as_str()) {
      list.push(obs);
    }
  }

  // Sum in member order.
  let current: Vec<f64> = members
    .iter()
    .filter_map(|s| by_subject.get(s.subject_id.as_str()))
    .filter_map(|list| latest_observation(list.iter().copied()))
    .map(|obs| obs.value)
    .collect();

  let average_current_weight = if current.is_empty() {
    None
  } else {
    Some(current.iter().sum::<f64>() / current.len() as f64)
  };

  let active = members
    .iter()
    .filter(|s| s.status == SubjectStatus::Active)
    .count();

  GroupStats {
    group_id: group.group_id,
    group_name: group.name.clone(),
    total: members.len(),
    active,
    terminated: members.len() - active,
    average_current_weight,
  }
}

/// [`group_stats`] for every group in `groups`, in the same order.
pub fn farm_stats(
  groups: &[Group],
  subjects: &[Subject],
  observations: &[WeightObservation],
) -> Vec<GroupStats> {
  groups
    .iter()
    .map(|g| group_stats(g, subjects, observations))
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::subject::NewSubject;

  fn barn(name: &str) -> Group {
    Group { group_id: Uuid::new_v4(), name: name.into() }
  }

  fn pig(id: &str, group: &Group) -> Subject {
    NewSubject {
      subject_id:  id.into(),
      birth_date:  NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
      sex:         "M".into(),
      breed:       "Landrace".into(),
      notes:       None,
      group_id:    Some(group.group_id),
      subgroup_id: None,
    }
    .into_subject()
  }

  fn weigh(subject: &str, day: u32, value: f64) -> WeightObservation {
    WeightObservation {
      observation_id: Uuid::new_v4(),
      subject_id: subject.into(),
      date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
      value,
    }
  }

  #[test]
  fn averages_latest_weight_per_subject() {
    let g = barn("North");
    let subjects = vec![pig("A", &g), pig("B", &g)];
    let observations = vec![
      weigh("A", 1, 50.0),
      weigh("A", 9, 80.0),
      weigh("B", 3, 90.0),
      weigh("B", 2, 10.0),
    ];

    let stats = group_stats(&g, &subjects, &observations);
    assert_eq!(stats.total, 2);
    assert_eq!(stats.average_current_weight, Some(85.0));
  }

  #[test]
  fn average_is_stable_across_calls() {
    let g = barn("North");
    let values = [0.1, 0.7, 1e16, 0.2, -1e16, 0.3, 3.3];
    let ids: Vec<String> = (0..values.len()).map(|i| format!("P-{i}")).collect();
    let subjects: Vec<Subject> = ids.iter().map(|id| pig(id, &g)).collect();
    let observations: Vec<WeightObservation> = ids
      .iter()
      .zip(values)
      .map(|(id, v)| weigh(id, 1, v))
      .collect();

    let expected = values.iter().sum::<f64>() / values.len() as f64;
    for _ in 0..20 {
      let stats = group_stats(&g, &subjects, &observations);
      assert_eq!(stats.average_current_weight, Some(expected));
    }
  }

  #[test]
  fn unweighed_members_are_ignored_in_average() {
    let g = barn("North");
    let subjects = vec![pig("A", &g), pig("B", &g)];
    let observations = vec![weigh("A", 1, 70.0)];

    let stats = group_stats(&g, &subjects, &observations);
    assert_eq!(stats.average_current_weight, Some(70.0));
  }

  #[test]
  fn no_observations_means_no_average() {
    let g = barn("Empty");
    let subjects = vec![pig("A", &g)];

    let stats = group_stats(&g, &subjects, &[]);
    assert_eq!(stats.total, 1);
    assert_eq!(stats.average_current_weight, None);

    let empty = group_stats(&g, &[], &[]);
    assert_eq!(empty.total, 0);
    assert_eq!(empty.average_current_weight, None);
  }

  #[test]
  fn counts_by_status_within_group_only() {
    let north = barn("North");
    let south = barn("South");
    let mut done = pig("A", &north);
    done.status = SubjectStatus::Terminated;
    let subjects = vec![done, pig("B", &north), pig("C", &south)];
    let observations = vec![weigh("C", 1, 500.0), weigh("B", 1, 40.0)];

    let all = farm_stats(&[north.clone(), south], &subjects, &observations);
    assert_eq!(all[0].group_name, "North");
    assert_eq!((all[0].total, all[0].active, all[0].terminated), (2, 1, 1));
    assert_eq!(all[0].average_current_weight, Some(40.0));
    assert_eq!(all[1].total, 1);
  }

  #[test]
  fn latest_prefers_first_among_equal_dates() {
    let first = weigh("A", 4, 1.0);
    let second = weigh("A", 4, 2.0);
    let older = weigh("A", 1, 3.0);
    let list = [older, first.clone(), second];
    assert_eq!(latest_observation(&list), Some(&first));
    let none: &[WeightObservation] = &[];
    assert_eq!(latest_observation(none), None);
  }
}
