use rocket::Request;
use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use serde_json::json;
use std::fmt;

/// Errors the registry surfaces at its boundary. Each variant maps to one
/// HTTP status in the control surface (§6/§7).
#[derive(Debug)]
pub enum RegistryError {
    /// Malformed/missing fields, bad IP, out-of-range port.
    Validation(String),
    /// No such service name, or name exists but the given id does not.
    NotFound(String),
    /// Name exists but every instance is stale or not UP.
    NoLiveInstance(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Validation(msg) => write!(f, "{}", msg),
            RegistryError::NotFound(msg) => write!(f, "{}", msg),
            RegistryError::NoLiveInstance(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RegistryError {}

impl<'r, 'o: 'r> Responder<'r, 'o> for RegistryError {
    fn respond_to(self, request: &'r Request<'_>) -> rocket::response::Result<'o> {
        let status = match &self {
            RegistryError::Validation(_) => Status::BadRequest,
            RegistryError::NotFound(_) | RegistryError::NoLiveInstance(_) => Status::NotFound,
        };
        let body = Json(json!({ "error": self.to_string() }));
        rocket::response::status::Custom(status, body).respond_to(request)
    }
}
