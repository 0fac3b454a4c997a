use super::error::RegistryError;
use super::model::Instance;
use super::selector::Selector;
use super::store::{RegisterRequest, Store};
use rocket::State;
use rocket::serde::json::{Json, Value, json};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Mounts every route this module serves. Grounded on
/// `conreg-server/src/discovery/server/api.rs::routes`.
pub fn routes() -> Vec<rocket::Route> {
    routes![
        register_service,
        get_service_instances,
        list_all_services,
        heartbeat,
        service_stats,
        pick_instance,
    ]
}

#[derive(Debug, Deserialize)]
pub struct RegisterServiceReq {
    pub name: String,
    pub id: String,
    pub hostname: String,
    pub ip: String,
    /// Wide enough to accept any integer Rocket's JSON layer will
    /// deserialize (negatives, values over `u16::MAX`), so an out-of-range
    /// port reaches `Store::validate` as a normal 400, rather than Rocket
    /// rejecting the body at deserialization time with a bare 422.
    pub port: i64,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl From<RegisterServiceReq> for RegisterRequest {
    fn from(req: RegisterServiceReq) -> Self {
        RegisterRequest {
            name: req.name,
            id: req.id,
            hostname: req.hostname,
            ip: req.ip,
            port: req.port,
            version: req.version,
            metadata: req.metadata,
        }
    }
}

#[post("/services", data = "<req>")]
fn register_service(
    store: &State<Store>,
    req: Json<RegisterServiceReq>,
) -> Result<Value, RegistryError> {
    let instance = store.register(req.into_inner().into())?;
    Ok(json!({ "message": "service registered", "service": instance }))
}

#[get("/services/<name>")]
fn get_service_instances(store: &State<Store>, name: &str) -> Result<Value, RegistryError> {
    let instances = store.get_live(name)?;
    Ok(json!({ "services": instances }))
}

#[get("/services")]
fn list_all_services(store: &State<Store>) -> Value {
    let all: HashMap<String, Vec<Instance>> = store.list_all();
    json!({ "services": all })
}

#[put("/services/<name>/<id>/heartbeat")]
fn heartbeat(store: &State<Store>, name: &str, id: &str) -> Result<Value, RegistryError> {
    store.heartbeat(name, id)?;
    Ok(json!({ "message": "heartbeat recorded" }))
}

#[get("/services/<name>/stats")]
fn service_stats(store: &State<Store>, name: &str) -> Result<Value, RegistryError> {
    let stats = store.stats_for(name)?;
    Ok(json!({
        "stats": {
            "total_instances": stats.total_instances,
            "healthy_instances": stats.healthy_instances,
            "unhealthy_instances": stats.unhealthy_instances,
            "average_uptime": stats.average_uptime_secs,
            "last_update_time": stats.last_update_time,
        }
    }))
}

#[get("/services/<name>/instance")]
fn pick_instance(
    store: &State<Store>,
    selector: &State<Arc<dyn Selector>>,
    name: &str,
) -> Result<Value, RegistryError> {
    let instances = store.get_live(name)?;
    let picked = selector.select(name, &instances).clone();
    Ok(json!({ "service": picked }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::selector::SelectorKind;
    use rocket::http::{ContentType, Status};
    use rocket::local::blocking::Client;

    fn client() -> Client {
        let rocket = rocket::build()
            .manage(Store::new(std::time::Duration::from_secs(30)))
            .manage(SelectorKind::Random.build())
            .mount("/", routes());
        Client::tracked(rocket).expect("valid rocket instance")
    }

    #[test]
    fn register_with_port_over_u16_max_is_400_not_422() {
        let client = client();
        let response = client
            .post("/services")
            .header(ContentType::JSON)
            .body(r#"{"name":"api","id":"1","hostname":"h1","ip":"10.0.0.1","port":70000}"#)
            .dispatch();

        assert_eq!(response.status(), Status::BadRequest);
        let body = response.into_string().unwrap();
        assert!(body.contains("invalid port"), "body was: {}", body);
    }

    #[test]
    fn register_with_negative_port_is_400() {
        let client = client();
        let response = client
            .post("/services")
            .header(ContentType::JSON)
            .body(r#"{"name":"api","id":"1","hostname":"h1","ip":"10.0.0.1","port":-1}"#)
            .dispatch();

        assert_eq!(response.status(), Status::BadRequest);
    }

    #[test]
    fn register_then_fetch_round_trips_over_http() {
        let client = client();
        let register = client
            .post("/services")
            .header(ContentType::JSON)
            .body(r#"{"name":"api","id":"1","hostname":"h1","ip":"10.0.0.1","port":8080}"#)
            .dispatch();
        assert_eq!(register.status(), Status::Ok);

        let fetch = client.get("/services/api").dispatch();
        assert_eq!(fetch.status(), Status::Ok);
        let body = fetch.into_string().unwrap();
        assert!(body.contains("\"status\":\"UP\""), "body was: {}", body);
    }
}
