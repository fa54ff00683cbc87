//! Realtime-database adapter.
//!
//! Implements [`RemoteStorePort`] against a Firebase Realtime Database.
//!
//! - **`target_os = "espidf"`**: REST over HTTPS with the ESP-IDF HTTP
//!   client: `GET`/`PUT <db>/<path>.json?auth=<token>`.  The server answers
//!   `null` for a missing path.
//! - **`not(target_os = "espidf")`**: an in-memory [`DocumentTree`] with a
//!   switchable "online" flag for host-side simulation.
//!
//! [`DocumentTree`] is compiled on both targets; integration tests build
//! their mock store on top of it.

use log::info;
use serde_json::{Map, Value};

use crate::app::ports::{RemoteStorePort, StoreError};

// ───────────────────────────────────────────────────────────────
// DocumentTree
// ───────────────────────────────────────────────────────────────

/// Path-addressed JSON tree with realtime-database write semantics:
/// setting a path creates intermediate objects, and setting `null` removes it.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentTree {
    root: Value,
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Turn `node` into an object (dropping any scalar) and borrow its map.
fn force_object(node: &mut Value) -> Option<&mut Map<String, Value>> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    node.as_object_mut()
}

impl DocumentTree {
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// Value at `path`, or `None` if any segment is missing.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut node = &self.root;
        for seg in segments(path) {
            node = node.as_object()?.get(seg)?;
        }
        (!node.is_null()).then_some(node)
    }

    /// Replace the value at `path`.  `Value::Null` deletes it.
    pub fn set(&mut self, path: &str, value: Value) {
        let segs: Vec<&str> = segments(path).collect();
        let Some((last, parents)) = segs.split_last() else {
            self.root = if value.is_null() {
                Value::Object(Map::new())
            } else {
                value
            };
            return;
        };

        let mut node = &mut self.root;
        for seg in parents {
            let Some(map) = force_object(node) else { return };
            node = map
                .entry((*seg).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        let Some(map) = force_object(node) else { return };
        if value.is_null() {
            map.remove(*last);
        } else {
            map.insert((*last).to_string(), value);
        }
    }

    pub fn delete(&mut self, path: &str) {
        self.set(path, Value::Null);
    }

    pub fn root(&self) -> &Value {
        &self.root
    }
}

// ───────────────────────────────────────────────────────────────
// RtdbAdapter
// ───────────────────────────────────────────────────────────────

/// Largest response body accepted from the database.
#[cfg(target_os = "espidf")]
const MAX_BODY: usize = 8 * 1024;

#[cfg(target_os = "espidf")]
const HTTP_TIMEOUT_MS: u64 = 5_000;

pub struct RtdbAdapter {
    online: bool,
    #[cfg(target_os = "espidf")]
    base_url: String,
    #[cfg(target_os = "espidf")]
    auth_token: String,
    #[cfg(target_os = "espidf")]
    conn: Option<esp_idf_svc::http::client::EspHttpConnection>,
    #[cfg(not(target_os = "espidf"))]
    tree: DocumentTree,
}

impl RtdbAdapter {
    pub fn new(database_url: &str, auth_token: &str) -> Self {
        #[cfg(target_os = "espidf")]
        info!("RtdbAdapter: {}", database_url);

        #[cfg(not(target_os = "espidf"))]
        {
            let _ = auth_token;
            info!("RtdbAdapter: simulation backend ({})", database_url);
        }

        Self {
            online: false,
            #[cfg(target_os = "espidf")]
            base_url: database_url.trim_end_matches('/').to_string(),
            #[cfg(target_os = "espidf")]
            auth_token: auth_token.to_string(),
            #[cfg(target_os = "espidf")]
            conn: None,
            #[cfg(not(target_os = "espidf"))]
            tree: DocumentTree::new(),
        }
    }

    /// Mark the network link up or down.  Requests fail fast while down.
    pub fn set_online(&mut self, online: bool) {
        if online != self.online {
            info!("RtdbAdapter: {}", if online { "online" } else { "offline" });
        }
        self.online = online;
        #[cfg(target_os = "espidf")]
        if !online {
            self.conn = None;
        }
    }

    /// Simulation only: the backing tree.
    #[cfg(not(target_os = "espidf"))]
    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    /// Simulation only: mutable backing tree, for playing the remote actor.
    #[cfg(not(target_os = "espidf"))]
    pub fn tree_mut(&mut self) -> &mut DocumentTree {
        &mut self.tree
    }

    #[cfg(target_os = "espidf")]
    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}.json?auth={}",
            self.base_url,
            path.trim_start_matches('/'),
            self.auth_token
        )
    }

    #[cfg(target_os = "espidf")]
    fn connection(
        &mut self,
    ) -> Result<&mut esp_idf_svc::http::client::EspHttpConnection, StoreError> {
        use esp_idf_svc::http::client::{Configuration, EspHttpConnection};

        if self.conn.is_none() {
            let conn = EspHttpConnection::new(&Configuration {
                timeout: Some(core::time::Duration::from_millis(HTTP_TIMEOUT_MS)),
                crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
                ..Default::default()
            })
            .map_err(|e| {
                log::warn!("RtdbAdapter: HTTP client init failed: {}", e);
                StoreError::Transport
            })?;
            self.conn = Some(conn);
        }
        self.conn.as_mut().ok_or(StoreError::Transport)
    }

    /// One request/response exchange.  Drops the connection on any failure
    /// so the next call starts from a fresh socket.
    #[cfg(target_os = "espidf")]
    fn exchange(
        &mut self,
        method: esp_idf_svc::http::Method,
        path: &str,
        body: Option<&[u8]>,
    ) -> Result<Vec<u8>, StoreError> {
        let url = self.url(path);
        let result = Self::exchange_on(self.connection()?, method, &url, body);
        if result.is_err() {
            self.conn = None;
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn exchange_on(
        conn: &mut esp_idf_svc::http::client::EspHttpConnection,
        method: esp_idf_svc::http::Method,
        url: &str,
        body: Option<&[u8]>,
    ) -> Result<Vec<u8>, StoreError> {
        let len = body.map_or(0, <[u8]>::len).to_string();
        let headers = [
            ("accept", "application/json"),
            ("content-type", "application/json"),
            ("content-length", len.as_str()),
        ];
        conn.initiate_request(method, url, &headers)
            .map_err(|_| StoreError::Transport)?;

        if let Some(mut remaining) = body {
            while !remaining.is_empty() {
                let n = conn.write(remaining).map_err(|_| StoreError::Transport)?;
                if n == 0 {
                    return Err(StoreError::Transport);
                }
                remaining = &remaining[n..];
            }
        }

        conn.initiate_response().map_err(|_| StoreError::Transport)?;
        let status = conn.status();

        let mut out = Vec::new();
        let mut buf = [0u8; 512];
        loop {
            let n = conn.read(&mut buf).map_err(|_| StoreError::Transport)?;
            if n == 0 {
                break;
            }
            if out.len() + n > MAX_BODY {
                return Err(StoreError::Decode);
            }
            out.extend_from_slice(&buf[..n]);
        }

        if !(200..300).contains(&status) {
            return Err(StoreError::Http(status));
        }
        Ok(out)
    }
}

impl RemoteStorePort for RtdbAdapter {
    fn is_ready(&self) -> bool {
        self.online
    }

    #[cfg(target_os = "espidf")]
    fn get(&mut self, path: &str) -> Result<Option<Value>, StoreError> {
        if !self.online {
            return Err(StoreError::NotReady);
        }
        let body = self.exchange(esp_idf_svc::http::Method::Get, path, None)?;
        let value: Value = serde_json::from_slice(&body).map_err(|_| StoreError::Decode)?;
        Ok((!value.is_null()).then_some(value))
    }

    #[cfg(target_os = "espidf")]
    fn set(&mut self, path: &str, value: &Value) -> Result<(), StoreError> {
        if !self.online {
            return Err(StoreError::NotReady);
        }
        let body = serde_json::to_vec(value).map_err(|_| StoreError::Decode)?;
        self.exchange(esp_idf_svc::http::Method::Put, path, Some(&body))
            .map(|_| ())
    }

    #[cfg(not(target_os = "espidf"))]
    fn get(&mut self, path: &str) -> Result<Option<Value>, StoreError> {
        if !self.online {
            return Err(StoreError::NotReady);
        }
        Ok(self.tree.get(path).cloned())
    }

    #[cfg(not(target_os = "espidf"))]
    fn set(&mut self, path: &str, value: &Value) -> Result<(), StoreError> {
        if !self.online {
            return Err(StoreError::NotReady);
        }
        self.tree.set(path, value.clone());
        Ok(())
    }
}
