pub mod contacts_schema;
pub mod contacts_service;

pub use contacts_service::ContactUsEndpoint;
