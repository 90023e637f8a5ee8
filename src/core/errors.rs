use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub title: String,
    pub description: String,
}

#[derive(Error, Debug, Clone, Serialize, PartialEq)]
pub enum TrackerError {
    #[error("Invalid input for field `{0}`: {1:?}")]
    InvalidInput(String, FieldError),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("Expense {0} not found")]
    ExpenseNotFound(String),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Email is required")]
    MissingEmail,
    #[error("Email {0} already registered")]
    EmailAlreadyRegistered(String),
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("No expenses to chart")]
    NoChartData,
    #[error("Internal server error: {0}")]
    InternalServerError(String),
    #[error("Logging error: {0}")]
    LoggingError(String),
}

/// Coarse classification used when rendering failures to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCategory {
    Validation,
    PermissionDenied,
    Unavailable,
    Unauthenticated,
    Unknown,
}

impl TrackerError {
    pub fn invalid_input(field: &str, title: &str, description: &str) -> Self {
        TrackerError::InvalidInput(
            field.to_string(),
            FieldError {
                field: field.to_string(),
                title: title.to_string(),
                description: description.to_string(),
            },
        )
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            TrackerError::InvalidInput(..)
            | TrackerError::MissingEmail
            | TrackerError::InvalidEmail(_) => ErrorCategory::Validation,
            TrackerError::PermissionDenied(_) => ErrorCategory::PermissionDenied,
            TrackerError::Unavailable(_) => ErrorCategory::Unavailable,
            TrackerError::Unauthenticated(_) => ErrorCategory::Unauthenticated,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Message shown next to the add-expense form.
    pub fn add_expense_message(&self) -> String {
        match self {
            TrackerError::InvalidInput(_, field) => field.description.clone(),
            TrackerError::PermissionDenied(_) => {
                "Failed to add expense. Permission denied. Please check the data store security rules."
                    .to_string()
            }
            TrackerError::Unavailable(_) => {
                "Failed to add expense. Service temporarily unavailable. Please try again.".to_string()
            }
            TrackerError::Unauthenticated(_) => "Failed to add expense. Please sign in again.".to_string(),
            other => format!("Failed to add expense. Error: {}", other),
        }
    }

    pub fn delete_expense_message(&self) -> String {
        match self.category() {
            ErrorCategory::Unauthenticated => "Failed to delete expense. Please sign in again.".to_string(),
            _ => "Failed to delete expense. Please try again.".to_string(),
        }
    }

    /// Message shown in place of the expense list after a feed error.
    pub fn feed_message(&self) -> String {
        format!("Error loading expenses: {}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_failures_render_categorized_messages() {
        let denied = TrackerError::PermissionDenied("rules".to_string());
        assert_eq!(denied.category(), ErrorCategory::PermissionDenied);
        assert!(denied.add_expense_message().contains("Permission denied"));

        let down = TrackerError::Unavailable("offline".to_string());
        assert!(down.add_expense_message().contains("temporarily unavailable"));

        let signed_out = TrackerError::Unauthenticated("no session".to_string());
        assert!(signed_out.add_expense_message().ends_with("Please sign in again."));

        let other = TrackerError::Backend("disk on fire".to_string());
        assert_eq!(other.category(), ErrorCategory::Unknown);
        assert_eq!(
            other.add_expense_message(),
            "Failed to add expense. Error: Backend error: disk on fire"
        );
    }

    #[test]
    fn validation_message_is_the_field_description() {
        let err = TrackerError::invalid_input("amount", "Invalid Amount", "Please enter a valid amount");
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.add_expense_message(), "Please enter a valid amount");
    }
}
