use serde_json::Value;

use crate::node::{collect_refs, escape_segment, set_ref};

/// Prefix substitution rule for `$ref` values.
///
/// A reference starting with `base_uri` (at a path or fragment boundary) gets
/// that prefix replaced by `mapped_base_uri`. When only one side is a JSON
/// pointer fragment (`#/...`), the file part of the reference is folded into
/// the pointer or the pointer is appended as a fragment, respectively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefMapping {
    pub base_uri: String,
    pub mapped_base_uri: String,
}

impl RefMapping {
    pub fn new(base_uri: impl Into<String>, mapped_base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            mapped_base_uri: mapped_base_uri.into(),
        }
    }

    #[must_use]
    pub fn matches(&self, reference: &str) -> bool {
        self.remainder(reference).is_some()
    }

    fn remainder<'a>(&self, reference: &'a str) -> Option<&'a str> {
        let rest = reference.strip_prefix(self.base_uri.as_str())?;
        let at_boundary = rest.is_empty()
            || rest.starts_with('/')
            || rest.starts_with('#')
            || self.base_uri.ends_with('/');
        at_boundary.then_some(rest)
    }

    /// Rewrite `reference`, or `None` if this mapping does not apply.
    ///
    /// Plain-name fragments (`file.json#anchor`) cannot be folded into a
    /// pointer and are left unmapped.
    #[must_use]
    pub fn map(&self, reference: &str) -> Option<String> {
        let rest = self.remainder(reference)?;
        let base_is_pointer = self.base_uri.starts_with('#');
        let mapped_is_pointer = self.mapped_base_uri.starts_with('#');

        let mapped = match (base_is_pointer, mapped_is_pointer) {
            (false, true) => {
                let (path, fragment) = rest.split_once('#').unwrap_or((rest, ""));
                if !fragment.is_empty() && !fragment.starts_with('/') {
                    tracing::warn!(
                        reference,
                        anchor = fragment,
                        "cannot map anchor reference into a json pointer"
                    );
                    return None;
                }
                let path: String = path
                    .split('/')
                    .filter(|s| !s.is_empty())
                    .map(|s| format!("/{}", escape_segment(s)))
                    .collect();
                format!("{}{path}{fragment}", self.mapped_base_uri)
            }
            (true, false) if !rest.is_empty() => {
                if self.mapped_base_uri.contains('#') {
                    format!("{}{rest}", self.mapped_base_uri)
                } else {
                    format!("{}#{rest}", self.mapped_base_uri)
                }
            }
            _ => format!("{}{rest}", self.mapped_base_uri),
        };
        Some(mapped)
    }
}

/// Apply the first matching mapping to every `$ref` of `root`.
///
/// Returns the number of rewritten references.
pub fn update_references(root: &mut Value, mappings: &[RefMapping]) -> usize {
    let rewrites: Vec<_> = collect_refs(root)
        .into_iter()
        .filter_map(|node| {
            let mapped = mappings.iter().find_map(|m| m.map(&node.reference))?;
            (mapped != node.reference).then_some((node.location, mapped))
        })
        .collect();

    let mut count = 0;
    for (location, reference) in rewrites {
        if set_ref(root, &location, reference) {
            count += 1;
        }
    }
    count
}
