use std::collections::HashMap;

/// Error code filed when a renderable's pose cannot be resolved.
pub const MISSING_TRANSFORM: &str = "MISSING_TRANSFORM";

/// Per-renderable keyed error state consumed by the error-display layer.
///
/// Keys are an opaque renderable path plus a fixed error code. `report` and
/// `clear` return whether the registry changed, so the caller knows when to
/// push an update downstream.
#[derive(Debug, Default)]
pub struct PoseDiagnostics {
    errors: HashMap<String, HashMap<&'static str, String>>,
}

impl PoseDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files (or refreshes) an error for `path`. Returns `true` when the
    /// message is new or different.
    pub fn report(&mut self, path: &str, code: &'static str, message: String) -> bool {
        if let Some(by_code) = self.errors.get_mut(path) {
            match by_code.get(code) {
                Some(existing) if *existing == message => false,
                _ => {
                    by_code.insert(code, message);
                    true
                }
            }
        } else {
            self.errors
                .insert(path.to_owned(), HashMap::from([(code, message)]));
            true
        }
    }

    /// Removes an error for `path`. Returns `true` when one was present.
    pub fn clear(&mut self, path: &str, code: &'static str) -> bool {
        let Some(by_code) = self.errors.get_mut(path) else {
            return false;
        };
        let removed = by_code.remove(code).is_some();
        if by_code.is_empty() {
            self.errors.remove(path);
        }
        removed
    }

    pub fn message(&self, path: &str, code: &'static str) -> Option<&str> {
        self.errors
            .get(path)
            .and_then(|by_code| by_code.get(code))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.values().map(HashMap::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &'static str, &str)> {
        self.errors.iter().flat_map(|(path, by_code)| {
            by_code
                .iter()
                .map(move |(code, message)| (path.as_str(), *code, message.as_str()))
        })
    }
}
