//! Configuration access port trait.

/// Read-only access to sectioned key/value configuration.
///
/// `get_string` distinguishes a missing key from a present one; the typed
/// getters fall back to the caller's default when the key is absent or does
/// not parse. Validation that needs to tell those cases apart probes with
/// `get_string` first.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
}
