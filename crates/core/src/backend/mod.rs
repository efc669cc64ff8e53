//! In-process storage backends
//!
//! Both backends emulate S3 listing semantics: keys are ordered lexicographically,
//! grouped into common prefixes at the request delimiter, and paged with a
//! continuation token naming the last key or prefix returned.

mod local;
mod memory;

pub use local::LocalClient;
pub use memory::MemoryClient;

use crate::entry::RawRecord;
use crate::traits::{ListPage, ListRequest};

/// Page size used when a request does not set one, matching S3
const DEFAULT_MAX_KEYS: usize = 1000;

/// Build one listing page from object records sorted by key
pub(crate) fn group_page(objects: impl IntoIterator<Item = RawRecord>, request: &ListRequest) -> ListPage {
    let max_keys = request
        .max_keys
        .filter(|m| *m > 0)
        .map(|m| m as usize)
        .unwrap_or(DEFAULT_MAX_KEYS);

    let mut prefixes = Vec::new();
    let mut contents = Vec::new();
    let mut last: Option<String> = None;
    let mut truncated = false;
    let mut count = 0;

    for record in objects {
        let RawRecord::Object { key, .. } = &record else {
            continue;
        };
        let Some(rest) = key.strip_prefix(request.prefix.as_str()) else {
            continue;
        };

        let common_prefix = if request.delimiter.is_empty() {
            None
        } else {
            rest.find(request.delimiter.as_str()).map(|i| {
                format!(
                    "{}{}",
                    request.prefix,
                    &rest[..i + request.delimiter.len()]
                )
            })
        };
        let sort_key = common_prefix.as_deref().unwrap_or(key.as_str());

        if let Some(token) = &request.continuation_token
            && sort_key <= token.as_str()
        {
            continue;
        }
        // Keys sharing a prefix are contiguous, so one comparison dedups them
        if last.as_deref() == Some(sort_key) {
            continue;
        }
        if count == max_keys {
            truncated = true;
            break;
        }

        count += 1;
        last = Some(sort_key.to_string());
        match common_prefix {
            Some(prefix) => prefixes.push(RawRecord::KeyPrefix { prefix }),
            None => contents.push(record),
        }
    }

    prefixes.extend(contents);
    ListPage {
        records: prefixes,
        failures: Vec::new(),
        next_token: if truncated { last } else { None },
    }
}
