//! The `book_table` tool: asks the human for another date when the
//! requested one is full.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::error::Result;
use crate::mcp::context::{Elicitation, ToolContext};
use crate::mcp::handler::{get_int_arg, get_string_arg, success_result, ToolHandler};
use crate::mcp::protocol::{Tool, ToolResult};

/// The date with no free tables.
pub const UNAVAILABLE_DATE: &str = "2024-12-25";

/// Suggested alternative when the human does not pick one.
pub const DEFAULT_ALTERNATIVE_DATE: &str = "2024-12-26";

fn default_alternative_date() -> String {
    DEFAULT_ALTERNATIVE_DATE.to_string()
}

/// What the human is asked when the date is full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPreferences {
    pub check_alternative: bool,
    #[serde(default = "default_alternative_date")]
    pub alternative_date: String,
}

impl BookingPreferences {
    /// Elicitation schema for this form.
    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "checkAlternative": {
                    "type": "boolean",
                    "title": "Check Alternative",
                    "description": "Would you like to check another date?"
                },
                "alternativeDate": {
                    "type": "string",
                    "title": "Alternative Date",
                    "description": "Alternative date (YYYY-MM-DD)",
                    "default": DEFAULT_ALTERNATIVE_DATE
                }
            },
            "required": ["checkAlternative"]
        })
    }
}

/// Turn the human's answer into the booking outcome.
///
/// The alternative date is passed through as typed.
pub fn booking_outcome(elicitation: Elicitation<BookingPreferences>) -> String {
    match elicitation.data {
        Some(prefs) if elicitation.accepted() => {
            if prefs.check_alternative {
                format!("[SUCCESS] Booked for {}", prefs.alternative_date)
            } else {
                "[CANCELLED] No booking made".to_string()
            }
        }
        _ => "[CANCELLED] Booking cancelled".to_string(),
    }
}

/// Book table tool.
pub struct BookTableTool;

impl BookTableTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BookTableTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for BookTableTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "book_table".to_string(),
            title: None,
            description: "Book a table with date availability check.".to_string(),
            input_schema: crate::tool_schema!(required: ["date", "time", "party_size"],
                "date": { "type": "string" },
                "time": { "type": "string" },
                "party_size": { "type": "integer" }
            ),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>, ctx: &ToolContext) -> Result<ToolResult> {
        let date = get_string_arg(&args, "date")?;
        let time = get_string_arg(&args, "time")?;
        let party_size = get_int_arg(&args, "party_size")?;

        if date != UNAVAILABLE_DATE {
            return Ok(success_result(format!(
                "[SUCCESS] Booked for {} at {}",
                date, time
            )));
        }

        let message = format!(
            "No tables available for {} on {}. Would you like to try another date?",
            party_size, date
        );
        let elicitation = ctx
            .elicit::<BookingPreferences>(message, BookingPreferences::schema())
            .await?;

        Ok(success_result(booking_outcome(elicitation)))
    }
}
