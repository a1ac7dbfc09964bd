use huddle_core::Request;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

/// Every request the loopback room server answered, in arrival order.
#[derive(Clone, Default)]
pub struct ServerLog {
    requests: Arc<Mutex<Vec<Request>>>,
}

impl ServerLog {
    pub fn record(&self, request: &Request) -> Result<Value, String> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(json!({}))
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.method.clone())
            .collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.methods().iter().filter(|m| *m == method).count()
    }

    /// Producer ids named in requests of `method`.
    pub fn producer_ids(&self, method: &str) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .filter_map(|r| r.data["producerId"].as_str().map(str::to_owned))
            .collect()
    }
}
