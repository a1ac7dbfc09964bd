use serde::{Serialize, de::DeserializeOwned};

/// Typed body of a request or notification, keyed by its wire method name.
pub trait Payload: Serialize + DeserializeOwned + Send + Sync + 'static {
    const METHOD: &'static str;
}
