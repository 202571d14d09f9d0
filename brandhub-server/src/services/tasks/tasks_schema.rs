use brandhub_core::HubError;
use brandhub_store::Task;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::utils::validation::{trimmed, trimmed_opt};

pub const TASK_ERROR: &str = "Invalid task data";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTask {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 200, message = "saved_search must be 1 to 200 characters"))]
    pub saved_search: String,

    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub min_price: Option<f64>,

    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub max_price: Option<f64>,

    #[validate(length(max = 100))]
    pub postcode: Option<String>,

    #[validate(range(min = 0, message = "must not be negative"))]
    pub radius: Option<i64>,

    pub active: Option<bool>,
}

impl CreateTask {
    pub fn into_task(self, userid: u64) -> Task {
        let mut task = Task::new(userid, self.saved_search);
        task.min_price = self.min_price;
        task.max_price = self.max_price;
        task.postcode = self.postcode;
        task.radius = self.radius;
        if let Some(active) = self.active {
            task.active = active;
        }
        task
    }
}

/// Partial update. The task id travels next to these fields and is read
/// separately.
#[derive(Debug, Deserialize, Validate)]
pub struct PatchTask {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 200, message = "saved_search must be 1 to 200 characters"))]
    pub saved_search: Option<String>,

    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub min_price: Option<f64>,

    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub max_price: Option<f64>,

    #[validate(length(max = 100))]
    pub postcode: Option<String>,

    #[validate(range(min = 0, message = "must not be negative"))]
    pub radius: Option<i64>,

    pub active: Option<bool>,
}

impl PatchTask {
    pub fn apply(self, task: &mut Task) {
        if let Some(s) = self.saved_search {
            task.saved_search = s;
        }
        if self.min_price.is_some() {
            task.min_price = self.min_price;
        }
        if self.max_price.is_some() {
            task.max_price = self.max_price;
        }
        if self.postcode.is_some() {
            task.postcode = self.postcode;
        }
        if self.radius.is_some() {
            task.radius = self.radius;
        }
        if let Some(active) = self.active {
            task.active = active;
        }
    }
}

/// `min_price` may not exceed `max_price` once both are set.
pub fn check_price_range(task: &Task) -> Result<(), HubError> {
    match (task.min_price, task.max_price) {
        (Some(min), Some(max)) if min > max => Err(HubError::bad_request(TASK_ERROR).with_errors(
            json!({ "min_price": ["Minimum price cannot be greater than maximum price"] }),
        )),
        _ => Ok(()),
    }
}
