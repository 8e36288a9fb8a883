//! Delivery recipient details collected at checkout.

use serde::{Deserialize, Serialize};

/// Which recipient field failed validation.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientError {
    #[error("recipient name is required")]
    MissingName,
    #[error("recipient phone is required")]
    MissingPhone,
    #[error("delivery address is required")]
    MissingAddress,
}

/// Name, phone and address for an order.
///
/// Pre-filled from the account profile and editable before submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub phone: String,
    pub address: String,
}

impl Recipient {
    /// Create a recipient from its three fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            address: address.into(),
        }
    }

    /// Check that every field is non-blank.
    ///
    /// # Errors
    ///
    /// Returns the first missing field, in name, phone, address order.
    pub fn validate(&self) -> Result<(), RecipientError> {
        if self.name.trim().is_empty() {
            return Err(RecipientError::MissingName);
        }
        if self.phone.trim().is_empty() {
            return Err(RecipientError::MissingPhone);
        }
        if self.address.trim().is_empty() {
            return Err(RecipientError::MissingAddress);
        }
        Ok(())
    }

    /// Copy with surrounding whitespace removed from every field.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self::new(self.name.trim(), self.phone.trim(), self.address.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reports_first_blank_field() {
        assert_eq!(
            Recipient::new(" ", "", "").validate(),
            Err(RecipientError::MissingName)
        );
        assert_eq!(
            Recipient::new("An", "", "1 Main St").validate(),
            Err(RecipientError::MissingPhone)
        );
        assert_eq!(
            Recipient::new("An", "0901", "\t").validate(),
            Err(RecipientError::MissingAddress)
        );
        assert!(Recipient::new("An", "0901", "1 Main St").validate().is_ok());
    }

    #[test]
    fn test_trimmed() {
        let r = Recipient::new(" An ", " 0901", "1 Main St ").trimmed();
        assert_eq!(r, Recipient::new("An", "0901", "1 Main St"));
    }
}
