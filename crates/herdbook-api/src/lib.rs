//! JSON REST API for Herdbook.
//!
//! Exposes an axum [`Router`] backed by any [`herdbook_core::store::FarmStore`].
//! Every request authenticates with HTTP Basic credentials; the resolved
//! [`Actor`] is passed to each handler, which checks it against
//! [`herdbook_core::access::authorize`] before touching the store.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = herdbook_api::router(AppState::new(store));
//! ```

pub mod actors;
pub mod auth;
pub mod error;
pub mod export;
pub mod groups;
pub mod subjects;
pub mod weights;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use herdbook_core::{
  access::{Capability, authorize},
  actor::{Actor, Scope},
  store::FarmStore,
};
use uuid::Uuid;

pub use auth::hash_password;
pub use error::ApiError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState<S> {
  pub store: Arc<S>,
}

impl<S> AppState<S> {
  pub fn new(store: S) -> Self { Self { store: Arc::new(store) } }
}

/// Narrow a requested group filter to what `actor` may see.
///
/// Non-admins are pinned to their own group and refused if they ask for
/// another one, or if they have no group at all. `None` in the result means
/// "every group".
pub(crate) fn visible_group(
  actor: &Actor,
  requested: Option<Uuid>,
) -> Result<Option<Uuid>, ApiError> {
  let group = match actor.scope() {
    Scope::Group(own) => Some(requested.unwrap_or(own)),
    Scope::Everything | Scope::Nothing => requested,
  };
  authorize(actor, Capability::View { group })?;
  Ok(group)
}

/// Build the full application router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: FarmStore + Clone + 'static,
{
  Router::new()
    // Actors
    .route("/me", get(actors::me))
    .route("/actors", get(actors::list::<S>).post(actors::create::<S>))
    .route("/actors/{id}", delete(actors::delete_one::<S>))
    // Barns and sections
    .route("/groups", get(groups::list::<S>).post(groups::create::<S>))
    .route("/groups/{id}", get(groups::get_one::<S>))
    .route(
      "/groups/{id}/subgroups",
      get(groups::list_subgroups::<S>).post(groups::create_subgroup::<S>),
    )
    .route("/groups/{id}/stats", get(groups::stats_one::<S>))
    .route("/stats", get(groups::stats_all::<S>))
    // Subjects
    .route("/subjects", get(subjects::list::<S>).post(subjects::create::<S>))
    .route(
      "/subjects/{id}",
      get(subjects::get_one::<S>).delete(subjects::delete_one::<S>),
    )
    .route("/subjects/{id}/assign", post(subjects::assign::<S>))
    .route("/subjects/{id}/notes", put(subjects::set_notes::<S>))
    .route("/subjects/{id}/terminate", post(subjects::terminate::<S>))
    // Weights
    .route(
      "/subjects/{id}/weights",
      get(weights::history::<S>).post(weights::record::<S>),
    )
    .route("/subjects/{id}/chart", get(weights::chart::<S>))
    // Export
    .route("/export/csv", get(export::csv::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::body::Body;
  use axum::http::{Request, StatusCode, header};
  use base64::Engine as _;
  use base64::engine::general_purpose::STANDARD as B64;
  use chrono::NaiveDate;
  use herdbook_core::{
    actor::{NewActor, Role},
    observation::NewObservation,
    subject::NewSubject,
  };
  use herdbook_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  const PASSWORD: &str = "pw";

  struct Farm {
    state:  AppState<SqliteStore>,
    barn_a: Uuid,
    barn_b: Uuid,
  }

  /// Two barns; an admin, a farmer and a helper in barn A, and a helper with
  /// no barn. Everyone shares [`PASSWORD`].
  async fn farm() -> Farm {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let barn_a = store.create_group("Barn A".into()).await.unwrap().group_id;
    let barn_b = store.create_group("Barn B".into()).await.unwrap().group_id;

    let hash = hash_password(PASSWORD).unwrap();
    for (username, role, group_id) in [
      ("admin", Role::Admin, None),
      ("fran", Role::Farmer, Some(barn_a)),
      ("hal", Role::Helper, Some(barn_a)),
      ("drifter", Role::Helper, None),
    ] {
      store
        .add_actor(NewActor {
          username: username.into(),
          password_hash: hash.clone(),
          role,
          group_id,
        })
        .await
        .unwrap();
    }

    Farm { state: AppState::new(store), barn_a, barn_b }
  }

  fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap()
  }

  async fn add_pig(farm: &Farm, id: &str, group_id: Option<Uuid>) {
    farm
      .state
      .store
      .add_subject(NewSubject {
        subject_id: id.into(),
        birth_date: date(1, 1),
        sex: "F".into(),
        breed: "Duroc".into(),
        notes: None,
        group_id,
        subgroup_id: None,
      })
      .await
      .unwrap();
  }

  async fn weigh(farm: &Farm, id: &str, day: u32, value: f64) {
    farm
      .state
      .store
      .record_observation(NewObservation {
        subject_id: id.into(),
        date: date(2, day),
        value,
      })
      .await
      .unwrap();
  }

  fn auth_header(user: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{PASSWORD}")))
  }

  async fn send(
    farm: &Farm,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
      builder = builder.header(header::AUTHORIZATION, auth_header(user));
    }
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    router(farm.state.clone())
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap()
  }

  async fn body_bytes(res: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(res.into_body(), usize::MAX)
      .await
      .unwrap()
      .to_vec()
  }

  async fn json_body(res: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(res).await).unwrap()
  }

  // ── Authentication ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn missing_credentials_are_challenged() {
    let farm = farm().await;
    let res = send(&farm, "GET", "/me", None, None).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
      res.headers().get(header::WWW_AUTHENTICATE).unwrap(),
      "Basic realm=\"herdbook\""
    );
  }

  #[tokio::test]
  async fn wrong_password_is_rejected() {
    let farm = farm().await;
    let req = Request::builder()
      .uri("/me")
      .header(
        header::AUTHORIZATION,
        format!("Basic {}", B64.encode("fran:nope")),
      )
      .body(Body::empty())
      .unwrap();
    let res = router(farm.state.clone()).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn me_reports_role_and_barn() {
    let farm = farm().await;
    let res = send(&farm, "GET", "/me", Some("fran"), None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let me = json_body(res).await;
    assert_eq!(me["role"], "FARMER");
    assert_eq!(me["group_id"], json!(farm.barn_a));
    assert!(me.get("password_hash").is_none());
  }

  // ── Access ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn farmer_cannot_see_other_barns() {
    let farm = farm().await;
    add_pig(&farm, "B-1", Some(farm.barn_b)).await;

    let res = send(&farm, "GET", "/subjects/B-1", Some("fran"), None).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let uri = format!("/subjects?group_id={}", farm.barn_b);
    let res = send(&farm, "GET", &uri, Some("fran"), None).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn subject_list_is_confined_to_own_barn() {
    let farm = farm().await;
    add_pig(&farm, "A-1", Some(farm.barn_a)).await;
    add_pig(&farm, "B-1", Some(farm.barn_b)).await;
    add_pig(&farm, "LOOSE", None).await;

    let res = send(&farm, "GET", "/subjects", Some("hal"), None).await;
    let ids: Vec<Value> = json_body(res).await.as_array().unwrap().clone();
    assert_eq!(ids.len(), 1);
    assert_eq!(ids[0]["subject_id"], "A-1");

    let res = send(&farm, "GET", "/subjects", Some("admin"), None).await;
    assert_eq!(json_body(res).await.as_array().unwrap().len(), 3);

    let res = send(&farm, "GET", "/subjects", Some("drifter"), None).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn helper_records_weights_but_cannot_add_subjects() {
    let farm = farm().await;
    add_pig(&farm, "A-1", Some(farm.barn_a)).await;

    let body = json!({
      "subject_id": "A-2",
      "birth_date": "2025-01-01",
      "sex": "M",
      "breed": "Landrace",
      "group_id": farm.barn_a,
    });
    let res = send(&farm, "POST", "/subjects", Some("hal"), Some(body)).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let body = json!({ "value": 81.5, "date": "2025-02-01" });
    let res = send(&farm, "POST", "/subjects/A-1/weights", Some("hal"), Some(body)).await;
    assert_eq!(res.status(), StatusCode::CREATED);
  }

  #[tokio::test]
  async fn farmer_cannot_move_subject_out_of_barn() {
    let farm = farm().await;
    add_pig(&farm, "A-1", Some(farm.barn_a)).await;
    let body = json!({ "group_id": farm.barn_b });
    let res = send(&farm, "POST", "/subjects/A-1/assign", Some("fran"), Some(body)).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
  }

  // ── Subjects ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn unknown_subject_is_404() {
    let farm = farm().await;
    let res = send(&farm, "GET", "/subjects/NOPE", Some("admin"), None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(json_body(res).await["error"].is_string());
  }

  #[tokio::test]
  async fn create_then_duplicate_conflicts() {
    let farm = farm().await;
    let body = json!({
      "subject_id": "A-9",
      "birth_date": "2025-01-01",
      "sex": "F",
      "breed": "Duroc",
      "group_id": farm.barn_a,
    });
    let res = send(&farm, "POST", "/subjects", Some("fran"), Some(body.clone())).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(json_body(res).await["status"], "ACTIVE");

    let res = send(&farm, "POST", "/subjects", Some("fran"), Some(body)).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn terminating_twice_conflicts() {
    let farm = farm().await;
    add_pig(&farm, "A-1", Some(farm.barn_a)).await;
    let body = json!({ "date": "2025-03-01" });

    let res = send(&farm, "POST", "/subjects/A-1/terminate", Some("fran"), Some(body.clone()))
      .await;
    assert_eq!(res.status(), StatusCode::OK);
    let subject = json_body(res).await;
    assert_eq!(subject["status"], "TERMINATED");
    assert_eq!(subject["terminated_on"], "2025-03-01");

    let res = send(&farm, "POST", "/subjects/A-1/terminate", Some("fran"), Some(body)).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
  }

  // ── Weights ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn history_is_newest_first_with_changes() {
    let farm = farm().await;
    add_pig(&farm, "A-1", Some(farm.barn_a)).await;
    weigh(&farm, "A-1", 3, 90.0).await;
    weigh(&farm, "A-1", 1, 80.0).await;

    let res = send(&farm, "GET", "/subjects/A-1/weights", Some("hal"), None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let history = json_body(res).await;
    assert_eq!(history[0]["date"], "2025-02-03");
    assert_eq!(history[0]["value"], 90.0);
    assert_eq!(history[0]["diff"], 10.0);
    assert_eq!(history[0]["pct"], 12.5);
    assert_eq!(history[1]["date"], "2025-02-01");
    assert!(history[1]["diff"].is_null());
    assert!(history[1].get("previous").is_none());

    let res = send(&farm, "GET", "/subjects/A-1", Some("hal"), None).await;
    let detail = json_body(res).await;
    assert_eq!(detail["subject_id"], "A-1");
    assert_eq!(detail["weights"], history);
  }

  #[tokio::test]
  async fn zero_predecessor_yields_zero_percent() {
    let farm = farm().await;
    add_pig(&farm, "A-1", Some(farm.barn_a)).await;
    weigh(&farm, "A-1", 1, 0.0).await;
    weigh(&farm, "A-1", 2, 50.0).await;

    let res = send(&farm, "GET", "/subjects/A-1/weights", Some("admin"), None).await;
    let history = json_body(res).await;
    assert_eq!(history[0]["diff"], 50.0);
    assert_eq!(history[0]["pct"], 0.0);
  }

  #[tokio::test]
  async fn negative_weight_is_rejected() {
    let farm = farm().await;
    add_pig(&farm, "A-1", Some(farm.barn_a)).await;
    let body = json!({ "value": -1.0, "date": "2025-02-01" });
    let res = send(&farm, "POST", "/subjects/A-1/weights", Some("fran"), Some(body)).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn chart_is_oldest_first() {
    let farm = farm().await;
    add_pig(&farm, "A-1", Some(farm.barn_a)).await;
    weigh(&farm, "A-1", 5, 95.0).await;
    weigh(&farm, "A-1", 1, 80.0).await;

    let res = send(&farm, "GET", "/subjects/A-1/chart", Some("fran"), None).await;
    let chart = json_body(res).await;
    assert_eq!(chart["label"], "Weight Progress for A-1");
    assert_eq!(chart["points"][0]["value"], 80.0);
    assert_eq!(chart["points"][1]["value"], 95.0);
  }

  // ── Stats ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn barn_stats_average_latest_weights() {
    let farm = farm().await;
    add_pig(&farm, "A-1", Some(farm.barn_a)).await;
    add_pig(&farm, "A-2", Some(farm.barn_a)).await;
    add_pig(&farm, "A-3", Some(farm.barn_a)).await;
    weigh(&farm, "A-1", 1, 60.0).await;
    weigh(&farm, "A-1", 2, 80.0).await;
    weigh(&farm, "A-2", 1, 90.0).await;

    let uri = format!("/groups/{}/stats", farm.barn_a);
    let res = send(&farm, "GET", &uri, Some("fran"), None).await;
    let stats = json_body(res).await;
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["active"], 3);
    assert_eq!(stats["average_current_weight"], 85.0);

    let res = send(&farm, "GET", "/stats", Some("admin"), None).await;
    let all = json_body(res).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
    assert!(all[1]["average_current_weight"].is_null());
  }

  // ── Export ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn csv_export_rows_and_blank_policy() {
    let farm = farm().await;
    add_pig(&farm, "A-1", Some(farm.barn_a)).await;
    add_pig(&farm, "B-1", Some(farm.barn_b)).await;
    weigh(&farm, "A-1", 1, 0.0).await;
    weigh(&farm, "A-1", 2, 50.0).await;
    weigh(&farm, "A-1", 3, 60.0).await;

    let res = send(&farm, "GET", "/export/csv", Some("admin"), None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let disposition = res
      .headers()
      .get(header::CONTENT_DISPOSITION)
      .unwrap()
      .to_str()
      .unwrap()
      .to_owned();
    assert!(disposition.contains("herdbook_complete_data_"));

    let text = String::from_utf8(body_bytes(res).await).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("Subject ID,Group,Subgroup"));
    assert!(lines[1].ends_with(",0.0,2025-02-01,,"));
    assert!(lines[2].ends_with(",50.0,2025-02-02,,"));
    assert!(lines[3].ends_with(",60.0,2025-02-03,10.0,20.0"));
    assert!(lines[4].starts_with("B-1,Barn B,"));
    assert!(lines[4].contains("No weights recorded"));
  }

  #[tokio::test]
  async fn farmer_export_is_scoped_and_helper_is_refused() {
    let farm = farm().await;
    add_pig(&farm, "A-1", Some(farm.barn_a)).await;
    add_pig(&farm, "B-1", Some(farm.barn_b)).await;

    let res = send(&farm, "GET", "/export/csv", Some("fran"), None).await;
    let text = String::from_utf8(body_bytes(res).await).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("A-1,Barn A,"));

    let res = send(&farm, "GET", "/export/csv", Some("hal"), None).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
  }

  // ── Actors ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn admin_manages_actors_but_not_itself() {
    let farm = farm().await;

    let res = send(&farm, "GET", "/me", Some("admin"), None).await;
    let admin_id = json_body(res).await["actor_id"].as_str().unwrap().to_owned();
    let uri = format!("/actors/{admin_id}");
    let res = send(&farm, "DELETE", &uri, Some("admin"), None).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = json!({
      "username": "newbie",
      "password": "s3cret",
      "role": "HELPER",
      "group_id": farm.barn_b,
    });
    let res = send(&farm, "POST", "/actors", Some("admin"), Some(body.clone())).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = send(&farm, "POST", "/actors", Some("admin"), Some(body)).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = send(&farm, "GET", "/actors", Some("fran"), None).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
  }
}
