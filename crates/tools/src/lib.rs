//! Tool provider for pawline.
//!
//! Declares the scheduling tool in a [`ToolRegistry`] and serves it to
//! assistants over the line protocol (see [`server::ToolServer`]).

pub mod schedule;
pub mod server;

use pawline_core::error::ToolError;
use pawline_core::tool::ToolRegistry;
use std::sync::Arc;

pub use schedule::{Appointment, AppointmentBook, SCHEDULE_TOOL, ScheduleTool};
pub use server::ToolServer;

/// Registry with every tool this provider offers.
///
/// Returns the appointment book alongside so callers can inspect bookings.
pub fn default_registry(pickup_delay_days: i64) -> Result<(ToolRegistry, AppointmentBook), ToolError> {
    let book = AppointmentBook::new();
    let mut registry = ToolRegistry::new();
    registry.declare(Arc::new(ScheduleTool::new(pickup_delay_days, book.clone())))?;
    Ok((registry, book))
}
