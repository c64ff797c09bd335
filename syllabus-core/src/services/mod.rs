//! Service layer for business logic
//!
//! [`LoginProtectionService`] enforces the lockout policy against a login
//! attempt repository. [`ContentValidationService`] runs the validator
//! registry over course content.

pub mod content_validation;
pub mod login_protection;

pub use content_validation::ContentValidationService;
pub use login_protection::{AttemptResult, LoginProtectionService};
