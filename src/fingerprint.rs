//! Content fingerprints for invocations
//!
//! Lets the executor's logs be matched against the invocation the
//! validator accepted.

use crate::models::Invocation;
use sha2::{Digest, Sha256};
use std::io::Write;

/// Compute SHA256 hash of an invocation.
/// Streams the JSON form straight into the hasher.
pub fn fingerprint(invocation: &Invocation) -> String {
    let mut hasher = Sha256::new();

    // BTreeMap parameters serialize in key order, so equal invocations hash equally
    if serde_json::to_writer(&mut HashWriter(&mut hasher), invocation).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParamValue;

    #[test]
    fn test_fingerprint_is_order_independent_and_content_sensitive() {
        let a = Invocation::new("news.company")
            .with("symbol", ParamValue::Text("TSLA".into()))
            .with("limit", ParamValue::Integer(5));
        let b = Invocation::new("news.company")
            .with("limit", ParamValue::Integer(5))
            .with("symbol", ParamValue::Text("TSLA".into()));
        let c = Invocation::new("news.company").with("symbol", ParamValue::Text("AAPL".into()));

        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_ne!(fingerprint(&a), fingerprint(&c));
        assert_eq!(fingerprint(&a).len(), 64);
    }
}
