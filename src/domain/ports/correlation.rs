//! Request-scoped storage for correlation ids.

use std::collections::HashMap;

/// Minimal get/set capability over a request-scoped context.
///
/// Web frameworks implement this over their per-request extension maps;
/// non-web callers can use a plain `HashMap<String, String>`.
pub trait CorrelationContext {
    /// Value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`.
    fn set(&mut self, key: &str, value: String);
}

impl CorrelationContext for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashmap_context_round_trip() {
        let mut ctx: HashMap<String, String> = HashMap::new();
        assert_eq!(CorrelationContext::get(&ctx, "trace_log_id"), None);

        CorrelationContext::set(&mut ctx, "trace_log_id", "abc".to_string());
        assert_eq!(
            CorrelationContext::get(&ctx, "trace_log_id"),
            Some("abc".to_string())
        );
    }
}
