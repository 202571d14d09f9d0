use serde::Deserialize;
use validator::Validate;

use crate::utils::validation::trimmed;

pub const REGISTER_ERROR: &str = "All fields (email, password, firstname, surname) are required";
pub const LOGIN_ERROR: &str = "Both email and password are required";

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUser {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(
        length(min = 1, max = 50, message = "email is required"),
        email(message = "Enter a valid email address")
    )]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,

    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 50, message = "firstname is required"))]
    pub firstname: String,

    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 50, message = "surname is required"))]
    pub surname: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct Login {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct Refresh {
    #[serde(default)]
    #[validate(length(min = 1, message = "refresh is required"))]
    pub refresh: String,
}
