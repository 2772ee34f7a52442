use crate::tipset::blake2b_256;

/// Builds a stable identifier from an ordered list of parts.
/// Each part is length-prefixed before hashing, so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn build_id<S: AsRef<str>>(parts: &[S]) -> String {
    let mut buf = Vec::new();
    for p in parts {
        let p = p.as_ref().as_bytes();
        buf.extend_from_slice(&(p.len() as u64).to_be_bytes());
        buf.extend_from_slice(p);
    }
    hex::encode(blake2b_256(&buf))
}
