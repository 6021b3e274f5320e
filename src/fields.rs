//! The six-field data-entry record and its submit-time projection.
//!
//! [`FormFields`] is the editing representation: every field is free text,
//! exactly as a host UI holds it. [`SheetRow`] is the projection built at
//! submit time, with `quantity` parsed to a number; its serialized form is
//! the exact JSON body posted to the spreadsheet endpoint, so the serde
//! renames here ARE the wire format.

use crate::error::RelayError;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// The data-entry record while it is being edited.
///
/// All fields are strings; `quantity` is only required to parse as a
/// number once the record is submitted (see [`FormFields::to_row`]).
/// `order_number` and `ticket_number` are optional free text.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFields {
    pub date: String,
    pub article: String,
    pub client: String,
    pub order_number: String,
    pub ticket_number: String,
    pub quantity: String,
}

impl FormFields {
    /// Project the record into the spreadsheet row posted on submit.
    ///
    /// # Errors
    /// Returns [`RelayError::ValidationFailed`] when `quantity` does not
    /// parse as a whole number. This runs before any network call, so a
    /// bad quantity never reaches either service.
    pub fn to_row(&self) -> Result<SheetRow, RelayError> {
        let quantity =
            self.quantity
                .trim()
                .parse::<i64>()
                .map_err(|_| RelayError::ValidationFailed {
                    errors: vec![format!(
                        "Quantity must be a whole number, got '{}'",
                        self.quantity
                    )],
                })?;

        Ok(SheetRow {
            date: self.date.clone(),
            article: self.article.clone(),
            client: self.client.clone(),
            order_number: self.order_number.clone(),
            ticket_number: self.ticket_number.clone(),
            quantity,
        })
    }

    /// The file name the assembled PDF is delivered under:
    /// `<orderNumber>.pdf` when an order number is present, otherwise
    /// `submission_<unix millis>.pdf`.
    pub fn document_name(&self) -> String {
        if self.order_number.is_empty() {
            format!("submission_{}.pdf", Utc::now().timestamp_millis())
        } else {
            format!("{}.pdf", self.order_number)
        }
    }

    /// Reset every field to empty, as after a successful submission.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// The submit-time projection of [`FormFields`].
///
/// Serialized with camelCase keys (`orderNumber`, `ticketNumber`); this
/// struct's JSON form is the spreadsheet request body verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRow {
    pub date: String,
    pub article: String,
    pub client: String,
    pub order_number: String,
    pub ticket_number: String,
    pub quantity: i64,
}
