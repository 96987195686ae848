use std::sync::Arc;
use std::convert::Infallible;
use warp::Filter;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::Rejection;
use serde::{Deserialize, Serialize};
use crate::records::{AppointmentChanges, NewAppointment};
use crate::schedule::filter::{DateFilter, StatusFilter, TimelineQuery};
use crate::schedule::query::{QueryEngine, QueryError};
use crate::schedule::time::parse_date;
use crate::storage::{Appointment, AppointmentStatus, SourceError};

const MAX_BODY_BYTES: u64 = 16 * 1024;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Optional narrowing of the plain appointment list.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListParams {
    /// Calendar day, `YYYY-MM-DD`.
    pub date: Option<String>,
    pub status: Option<String>,
}

/// Query string of the timeline endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelineParams {
    pub date_filter: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    /// Calendar day, `YYYY-MM-DD`.
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CalendarParams {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub selected: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TodayView {
    count: usize,
    appointments: Vec<Appointment>,
}

type ApiReply = WithStatus<Json>;

pub struct RestApi {
    engine: Arc<QueryEngine>,
}

impl RestApi {
    pub fn new(engine: Arc<QueryEngine>) -> Self {
        RestApi { engine }
    }

    pub fn routes(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let cors = warp::cors()
            .allow_any_origin()
            .allow_headers(vec!["content-type"])
            .allow_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"]);

        self.list_appointments()
            .or(self.today_appointments())
            .or(self.timeline())
            .or(self.get_appointment())
            .or(self.create_appointment())
            .or(self.reload())
            .or(self.update_appointment())
            .or(self.cancel_appointment())
            .or(self.update_status())
            .or(self.calendar())
            .recover(handle_rejection)
            .with(cors)
            .with(warp::trace::request())
    }

    fn list_appointments(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let engine = Arc::clone(&self.engine);

        warp::path!("api" / "appointments")
            .and(warp::get())
            .and(warp::query::<ListParams>())
            .map(move |params: ListParams| {
                let date = match params.date.as_deref().filter(|d| !d.is_empty()) {
                    Some(raw) => match parse_date(raw) {
                        Some(day) => Some(day),
                        None => return failure(StatusCode::BAD_REQUEST, format!("Invalid date: {}", raw)),
                    },
                    None => None,
                };
                let status = params
                    .status
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .map(|s| AppointmentStatus::from(s.to_lowercase()));

                success(StatusCode::OK, "Appointments listed", &engine.list(date, status.as_ref()))
            })
    }

    fn get_appointment(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let engine = Arc::clone(&self.engine);

        warp::path!("api" / "appointments" / i64)
            .and(warp::get())
            .map(move |id: i64| match engine.get(id) {
                Some(appointment) => success(StatusCode::OK, "Appointment found", &appointment),
                None => failure(StatusCode::NOT_FOUND, format!("Appointment {} not found", id)),
            })
    }

    fn today_appointments(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let engine = Arc::clone(&self.engine);

        warp::path!("api" / "appointments" / "today")
            .and(warp::get())
            .map(move || {
                let appointments = engine.today();
                let view = TodayView {
                    count: appointments.len(),
                    appointments,
                };
                success(StatusCode::OK, "Today's appointments", &view)
            })
    }

    fn timeline(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let engine = Arc::clone(&self.engine);

        warp::path!("api" / "appointments" / "timeline")
            .and(warp::get())
            .and(warp::query::<TimelineParams>())
            .map(move |params: TimelineParams| {
                // The front desk opens on today's view.
                let date_filter = params
                    .date_filter
                    .as_deref()
                    .map(DateFilter::parse)
                    .unwrap_or(DateFilter::Today);
                let status = params
                    .status
                    .as_deref()
                    .map(StatusFilter::parse)
                    .unwrap_or_default();
                let mut query = TimelineQuery::new(date_filter, status, params.search.unwrap_or_default());

                if let Some(raw) = params.date.as_deref().filter(|d| !d.is_empty()) {
                    match parse_date(raw) {
                        Some(day) => query = query.on_day(day),
                        None => return failure(StatusCode::BAD_REQUEST, format!("Invalid date: {}", raw)),
                    }
                }

                success(StatusCode::OK, "Timeline", &engine.timeline(&query))
            })
    }

    fn create_appointment(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let engine = Arc::clone(&self.engine);

        warp::path!("api" / "appointments")
            .and(warp::post())
            .and(warp::body::content_length_limit(MAX_BODY_BYTES))
            .and(warp::body::json())
            .and_then(move |booking: NewAppointment| {
                let engine = Arc::clone(&engine);
                async move {
                    let reply = match engine.create(booking).await {
                        Ok(id) => success(
                            StatusCode::CREATED,
                            "Appointment scheduled",
                            &serde_json::json!({ "scheduleId": id }),
                        ),
                        Err(err) => query_failure("create appointment", err),
                    };
                    Ok::<ApiReply, Infallible>(reply)
                }
            })
    }

    fn reload(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let engine = Arc::clone(&self.engine);

        warp::path!("api" / "appointments" / "reload")
            .and(warp::post())
            .and_then(move || {
                let engine = Arc::clone(&engine);
                async move {
                    let reply = match engine.reload().await {
                        Ok(count) => success(
                            StatusCode::OK,
                            "Appointments reloaded",
                            &serde_json::json!({ "count": count }),
                        ),
                        Err(err) => query_failure("reload appointments", err),
                    };
                    Ok::<ApiReply, Infallible>(reply)
                }
            })
    }

    fn update_appointment(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let engine = Arc::clone(&self.engine);

        warp::path!("api" / "appointments" / i64)
            .and(warp::put())
            .and(warp::body::content_length_limit(MAX_BODY_BYTES))
            .and(warp::body::json())
            .and_then(move |id: i64, changes: AppointmentChanges| {
                let engine = Arc::clone(&engine);
                async move {
                    let reply = match engine.update(id, changes).await {
                        Ok(()) => success(StatusCode::OK, "Appointment updated", &engine.store().get(id)),
                        Err(err) => query_failure("update appointment", err),
                    };
                    Ok::<ApiReply, Infallible>(reply)
                }
            })
    }

    fn cancel_appointment(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let engine = Arc::clone(&self.engine);

        warp::path!("api" / "appointments" / i64)
            .and(warp::delete())
            .and_then(move |id: i64| {
                let engine = Arc::clone(&engine);
                async move {
                    let reply = match engine.cancel(id).await {
                        Ok(()) => success(
                            StatusCode::OK,
                            "Appointment cancelled",
                            &serde_json::json!({ "cancelled": id }),
                        ),
                        Err(err) => query_failure("cancel appointment", err),
                    };
                    Ok::<ApiReply, Infallible>(reply)
                }
            })
    }

    fn update_status(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let engine = Arc::clone(&self.engine);

        warp::path!("api" / "appointments" / i64 / "status")
            .and(warp::patch())
            .and(warp::body::content_length_limit(MAX_BODY_BYTES))
            .and(warp::body::json())
            .map(move |id: i64, change: StatusChange| {
                let status = AppointmentStatus::from(change.status.as_str());
                if !status.is_known() {
                    return failure(StatusCode::BAD_REQUEST, format!("Unknown status: {}", change.status));
                }
                if engine.update_status(id, status) {
                    success(StatusCode::OK, "Status updated", &engine.store().get(id))
                } else {
                    failure(StatusCode::NOT_FOUND, "Could not update status")
                }
            })
    }

    fn calendar(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let engine = Arc::clone(&self.engine);

        warp::path!("api" / "calendar")
            .and(warp::get())
            .and(warp::query::<CalendarParams>())
            .map(move |params: CalendarParams| {
                let selected = match params.selected.as_deref().filter(|s| !s.is_empty()) {
                    Some(raw) => match parse_date(raw) {
                        Some(day) => Some(day),
                        None => return failure(StatusCode::BAD_REQUEST, format!("Invalid date: {}", raw)),
                    },
                    None => None,
                };

                let grid = match (params.year, params.month) {
                    (Some(year), Some(month)) => engine.calendar(year, month, selected),
                    (None, None) => Ok(engine.current_month(selected)),
                    _ => {
                        return failure(StatusCode::BAD_REQUEST, "year and month must be given together")
                    }
                };

                match grid {
                    Ok(grid) => success(StatusCode::OK, "Calendar", &grid),
                    Err(err) => query_failure("render calendar", err),
                }
            })
    }
}

fn respond(code: StatusCode, response: &ApiResponse) -> ApiReply {
    warp::reply::with_status(warp::reply::json(response), code)
}

fn success<T: Serialize>(code: StatusCode, message: &str, data: &T) -> ApiReply {
    match serde_json::to_value(data) {
        Ok(value) => respond(
            code,
            &ApiResponse {
                status: "success".to_string(),
                message: message.to_string(),
                data: Some(value),
            },
        ),
        Err(e) => failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode response: {}", e),
        ),
    }
}

fn failure(code: StatusCode, message: impl Into<String>) -> ApiReply {
    respond(
        code,
        &ApiResponse {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        },
    )
}

fn query_failure(action: &str, err: QueryError) -> ApiReply {
    let code = match &err {
        QueryError::Records(_) | QueryError::InvalidMonth { .. } => StatusCode::BAD_REQUEST,
        QueryError::Source(SourceError::Rejected(_)) => StatusCode::BAD_REQUEST,
        QueryError::Source(SourceError::NotFound(_)) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if code.is_server_error() {
        tracing::error!(error = %err, "failed to {}", action);
    } else {
        tracing::debug!(error = %err, "rejected request to {}", action);
    }
    failure(code, format!("Failed to {}: {}", action, err))
}

async fn handle_rejection(err: Rejection) -> Result<ApiReply, Infallible> {
    let reply = if err.is_not_found() {
        failure(StatusCode::NOT_FOUND, "Not found")
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        failure(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e))
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        failure(StatusCode::BAD_REQUEST, format!("Invalid query string: {}", e))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        failure(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        failure(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        tracing::error!(rejection = ?err, "unhandled rejection");
        failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };
    Ok(reply)
}
