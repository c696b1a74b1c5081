//! `key.path=value` override parsing.

use tracing::debug;

use crate::value::Value;
use crate::values::Values;

/// Parses `key.path=value` override entries into a store.
///
/// Each entry is split on the first `=`. The key is a dotted path and is
/// nested into tables, so `image.tag=1.27` yields `{image: {tag: "1.27"}}`.
/// Values are kept as strings. Entries that are empty, have no `=`, or have
/// an empty key are skipped. When two entries target the same path the later
/// one wins.
///
/// ```
/// use yamltpl_values::{parse_overrides, Value};
///
/// let values = parse_overrides(["image.tag=1.27", "broken", "", "cmd=a=b"]);
/// assert_eq!(values.path_value("image.tag").unwrap(), &Value::from("1.27"));
/// assert_eq!(values.path_value("cmd").unwrap(), &Value::from("a=b"));
/// assert_eq!(values.len(), 2);
/// ```
pub fn parse_overrides<I, S>(entries: I) -> Values
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut values = Values::new();
    for entry in entries {
        let entry = entry.as_ref();
        let Some((key, value)) = entry.split_once('=') else {
            if !entry.is_empty() {
                debug!(entry, "skipping override without '='");
            }
            continue;
        };
        if key.is_empty() {
            debug!(entry, "skipping override with empty key");
            continue;
        }
        values.set_path(key, Value::from(value));
    }
    values
}
