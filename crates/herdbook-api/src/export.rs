//! `GET /export/csv` — every visible subject with its full weight history.

use std::collections::HashMap;

use axum::{
  extract::State,
  http::header,
  response::IntoResponse,
};
use chrono::Local;
use herdbook_core::{
  access::{Capability, authorize},
  export::{export_rows, write_csv},
  history::WeightHistory,
  observation::WeightObservation,
  store::{FarmStore, SubjectQuery},
};
use uuid::Uuid;

use crate::{AppState, auth::CurrentActor, error::ApiError, visible_group};

/// `herdbook_complete_data_YYYYMMDD.csv`, dated today.
pub fn export_filename() -> String {
  format!("herdbook_complete_data_{}.csv", Local::now().format("%Y%m%d"))
}

pub async fn csv<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
) -> Result<impl IntoResponse, ApiError>
where
  S: FarmStore + Clone + 'static,
{
  authorize(&actor, Capability::Export)?;
  let query = SubjectQuery {
    group_id: visible_group(&actor, None)?,
    ..Default::default()
  };

  let store = state.store.as_ref();
  let subjects = store.list_subjects(&query).await.map_err(ApiError::store)?;
  let observations = store
    .list_observations_matching(&query)
    .await
    .map_err(ApiError::store)?;

  let group_names: HashMap<Uuid, String> = store
    .list_groups()
    .await
    .map_err(ApiError::store)?
    .into_iter()
    .map(|g| (g.group_id, g.name))
    .collect();
  let subgroup_names: HashMap<Uuid, String> = store
    .list_subgroups(None)
    .await
    .map_err(ApiError::store)?
    .into_iter()
    .map(|s| (s.subgroup_id, s.name))
    .collect();

  let mut by_subject: HashMap<String, Vec<WeightObservation>> = HashMap::new();
  for obs in observations {
    by_subject.entry(obs.subject_id.clone()).or_default().push(obs);
  }

  let rows = subjects.iter().flat_map(|subject| {
    let history =
      WeightHistory::build(by_subject.remove(&subject.subject_id).unwrap_or_default());
    export_rows(
      subject,
      subject.group_id.and_then(|id| group_names.get(&id)).map(String::as_str),
      subject
        .subgroup_id
        .and_then(|id| subgroup_names.get(&id))
        .map(String::as_str),
      &history,
    )
  });
  let body = write_csv(rows)?;

  tracing::info!(subjects = subjects.len(), by = %actor.username, "csv export");
  Ok((
    [
      (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
      (
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{}\"", export_filename()),
      ),
    ],
    body,
  ))
}
