use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

/// Form posted by the login page.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoginForm {
    /// OpenID identifier or provider URL typed by the user.
    #[serde(rename = "openIdIdentifier", default)]
    pub open_id_identifier: Option<String>,
}

impl LoginForm {
    /// Trimmed identifier, if one was supplied.
    pub fn identifier(&self) -> Option<&str> {
        self.open_id_identifier
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

impl Validate for LoginForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.identifier().is_none() {
            let mut err = ValidationError::new("required");
            err.message = Some("An OpenID identifier is required".into());
            errors.add("openIdIdentifier", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
