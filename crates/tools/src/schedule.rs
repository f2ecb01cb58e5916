//! Pickup scheduling tool.
//!
//! Offers a pickup slot a fixed number of days out and records it in an
//! [`AppointmentBook`]. Repeated calls book repeated appointments.

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use pawline_core::error::ToolError;
use pawline_core::tool::{ParameterKind, Tool, ToolParameter};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

pub const SCHEDULE_TOOL: &str = "schedule";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Appointment {
    pub dog_id: i64,
    pub dog_name: String,
    pub at: DateTime<Utc>,
}

/// Appointments booked by this process, in booking order.
#[derive(Debug, Clone, Default)]
pub struct AppointmentBook {
    entries: Arc<Mutex<Vec<Appointment>>>,
}

impl AppointmentBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<Appointment> {
        self.entries.lock().await.clone()
    }

    async fn record(&self, appointment: Appointment) {
        self.entries.lock().await.push(appointment);
    }
}

pub struct ScheduleTool {
    pickup_delay_days: i64,
    book: AppointmentBook,
}

impl ScheduleTool {
    pub fn new(pickup_delay_days: i64, book: AppointmentBook) -> Self {
        Self {
            pickup_delay_days,
            book,
        }
    }

    /// The pickup instant for a booking made at `now`.
    fn pickup_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ToolError> {
        Duration::try_days(self.pickup_delay_days)
            .and_then(|delay| now.checked_add_signed(delay))
            .ok_or_else(|| ToolError::ExecutionFailed {
                tool_name: SCHEDULE_TOOL.into(),
                reason: format!(
                    "a pickup {} days out is not a representable date",
                    self.pickup_delay_days
                ),
            })
    }
}

fn integer_arg(arguments: &serde_json::Value, key: &str) -> Option<i64> {
    let value = &arguments[key];
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

#[async_trait]
impl Tool for ScheduleTool {
    fn name(&self) -> &str {
        SCHEDULE_TOOL
    }

    fn description(&self) -> &str {
        "schedule an appointment to pick up or adopt a dog at a Pooch Palace location"
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![
            ToolParameter::required("dogId", ParameterKind::Integer, "the id of the dog"),
            ToolParameter::required("dogName", ParameterKind::String, "the name of the dog"),
        ]
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let dog_id = integer_arg(&arguments, "dogId")
            .ok_or_else(|| ToolError::invalid_arguments(SCHEDULE_TOOL, "dogId must be an integer"))?;
        let dog_name = arguments["dogName"]
            .as_str()
            .ok_or_else(|| ToolError::invalid_arguments(SCHEDULE_TOOL, "dogName must be a string"))?
            .to_string();

        let at = self.pickup_at(Utc::now())?;
        let when = at.to_rfc3339_opts(SecondsFormat::Secs, true);
        info!("scheduling {dog_id}/{dog_name} at {when}");

        self.book
            .record(Appointment {
                dog_id,
                dog_name,
                at,
            })
            .await;

        Ok(serde_json::Value::String(when))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawline_core::tool::ToolRegistry;

    #[tokio::test]
    async fn books_three_days_out() {
        let book = AppointmentBook::new();
        let tool = ScheduleTool::new(3, book.clone());
        let before = Utc::now();

        let out = tool
            .execute(serde_json::json!({"dogId": 42, "dogName": "Rex"}))
            .await
            .unwrap();
        let when = DateTime::parse_from_rfc3339(out.as_str().unwrap())
            .unwrap()
            .with_timezone(&Utc);

        let delta = when - before;
        assert!(delta >= Duration::days(3) - Duration::seconds(1));
        assert!(delta <= Duration::days(3) + Duration::seconds(5));

        let booked = book.all().await;
        assert_eq!(booked.len(), 1);
        assert_eq!(booked[0].dog_id, 42);
        assert_eq!(booked[0].dog_name, "Rex");
    }

    #[tokio::test]
    async fn unrepresentable_delay_fails_without_booking() {
        let book = AppointmentBook::new();
        let tool = ScheduleTool::new(i64::MAX, book.clone());

        let err = tool
            .execute(serde_json::json!({"dogId": 42, "dogName": "Rex"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
        assert!(book.all().await.is_empty());
    }

    #[tokio::test]
    async fn repeated_calls_book_twice() {
        let book = AppointmentBook::new();
        let tool = ScheduleTool::new(1, book.clone());
        for _ in 0..2 {
            tool.execute(serde_json::json!({"dogId": 45, "dogName": "Prancer"}))
                .await
                .unwrap();
        }
        assert_eq!(book.all().await.len(), 2);
    }

    #[tokio::test]
    async fn registry_rejects_bad_arguments() {
        let mut registry = ToolRegistry::new();
        registry
            .declare(Arc::new(ScheduleTool::new(3, AppointmentBook::new())))
            .unwrap();

        let missing = registry
            .invoke(SCHEDULE_TOOL, serde_json::json!({"dogName": "Rex"}))
            .await
            .unwrap_err();
        assert!(matches!(missing, ToolError::InvalidArguments { .. }));

        let mistyped = registry
            .invoke(
                SCHEDULE_TOOL,
                serde_json::json!({"dogId": "forty-two", "dogName": "Rex"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(mistyped, ToolError::InvalidArguments { .. }));

        let extra_keys_ok = registry
            .invoke(
                SCHEDULE_TOOL,
                serde_json::json!({"dogId": 42.0, "dogName": "Rex", "note": "morning"}),
            )
            .await;
        assert!(extra_keys_ok.is_ok());
    }
}
