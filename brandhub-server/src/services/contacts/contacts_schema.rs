use serde::Deserialize;
use validator::Validate;

use crate::utils::validation::trimmed;

pub const CONTACT_ERROR: &str = "Both subject and message are required";

#[derive(Debug, Deserialize, Validate)]
pub struct ContactForm {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 200, message = "subject must be 1 to 200 characters"))]
    pub subject: String,

    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
}
