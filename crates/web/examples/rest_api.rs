use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use femto_web::{ApiOutcome, ApiRequest, Resource, Server};
use http::StatusCode;
use serde_json::{Value, json};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// The customers "database": id → record.
#[derive(Default)]
struct Db {
    customers: Mutex<DbInner>,
}

#[derive(Default)]
struct DbInner {
    records: BTreeMap<String, Value>,
    next_id: u32,
}

/// Collection endpoint: list all customers, add one.
struct CustomersList(std::sync::Arc<Db>);

#[async_trait]
impl Resource for CustomersList {
    async fn get(&self, _request: ApiRequest) -> ApiOutcome {
        let inner = self.0.customers.lock().expect("db lock");
        ApiOutcome::ok(&inner.records)
    }

    async fn post(&self, request: ApiRequest) -> ApiOutcome {
        let mut inner = self.0.customers.lock().expect("db lock");
        let id = inner.next_id.to_string();
        inner.next_id += 1;
        inner.records.insert(id, Value::Object(request.data().clone()));
        ApiOutcome::with_status(json!({ "message": "created" }), StatusCode::CREATED)
    }
}

/// Detail endpoint: one customer by id.
struct Customer(std::sync::Arc<Db>);

fn not_found() -> ApiOutcome {
    ApiOutcome::with_status(json!({ "message": "no such customer" }), StatusCode::NOT_FOUND)
}

#[async_trait]
impl Resource for Customer {
    async fn get(&self, request: ApiRequest) -> ApiOutcome {
        let Some(id) = request.param("user_id") else { return not_found() };
        let inner = self.0.customers.lock().expect("db lock");
        match inner.records.get(id) {
            Some(record) => ApiOutcome::ok(record),
            None => not_found(),
        }
    }

    async fn put(&self, request: ApiRequest) -> ApiOutcome {
        let Some(id) = request.param("user_id") else { return not_found() };
        let mut inner = self.0.customers.lock().expect("db lock");
        if !inner.records.contains_key(id) {
            return not_found();
        }
        inner.records.insert(id.to_owned(), Value::Object(request.data().clone()));
        ApiOutcome::ok(json!({ "message": "updated" }))
    }

    async fn delete(&self, request: ApiRequest) -> ApiOutcome {
        let Some(id) = request.param("user_id") else { return not_found() };
        let mut inner = self.0.customers.lock().expect("db lock");
        match inner.records.remove(id) {
            Some(_) => ApiOutcome::ok(json!({ "message": "successfully deleted" })),
            None => not_found(),
        }
    }
}

// To test your server run in a terminal:
// - Get all customers:
//       curl http://localhost:8081/customers
// - Get detailed information about a particular customer:
//       curl http://localhost:8081/customers/1
// - Add a customer:
//       curl http://localhost:8081/customers -X POST -d "firstname=Maggie&lastname=Stone" -H "Content-Type: application/x-www-form-urlencoded"
// - Update a customer:
//       curl http://localhost:8081/customers/2 -X PUT -d "firstname=Margo" -H "Content-Type: application/x-www-form-urlencoded"
// - Delete a customer:
//       curl http://localhost:8081/customers/1 -X DELETE
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let db = std::sync::Arc::new(Db::default());
    // seed a couple of fake customers
    {
        let mut inner = db.customers.lock().expect("db lock");
        inner.records.insert("1".into(), json!({ "firstname": "Alex", "lastname": "River" }));
        inner.records.insert("2".into(), json!({ "firstname": "Lannie", "lastname": "Fox" }));
        inner.next_id = 3;
    }

    let server = Server::builder()
        .address("0.0.0.0:8081")
        .resource("/customers", CustomersList(std::sync::Arc::clone(&db)))
        .resource("/customers/<user_id>", Customer(std::sync::Arc::clone(&db)))
        .build()
        .expect("server configuration");

    if let Err(e) = server.run().await {
        tracing::error!(cause = %e, "server error");
    }
}
