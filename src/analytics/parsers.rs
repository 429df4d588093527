use log::warn;

use crate::domain::RankedPage;
use crate::errors::PathError;

/// Position of the drug id in `/<catalog-kind>/<item-id>/<subresource>`
const ITEM_ID_SEGMENT: usize = 2;

/// What to do with a page whose path does not carry a drug id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedPathPolicy {
    /// Fail the whole report
    Abort,
    /// Log and drop the page, keeping the order of the rest
    Skip,
}

/// Extract the drug id from a page path such as `/medicine/123/reviews`.
///
/// The id is the literal third `/`-separated segment. Query strings and
/// other decorations are not stripped.
pub fn extract_item_id(path: &str) -> Result<String, PathError> {
    let segment = path
        .split('/')
        .nth(ITEM_ID_SEGMENT)
        .ok_or_else(|| PathError::TooFewSegments {
            path: path.to_string(),
        })?;

    if segment.is_empty() {
        return Err(PathError::EmptyItemId {
            path: path.to_string(),
        });
    }

    Ok(segment.to_string())
}

/// Map ranked pages to drug ids, preserving rank order.
pub fn resolve_item_ids(
    pages: &[RankedPage],
    policy: MalformedPathPolicy,
) -> Result<Vec<String>, PathError> {
    let mut item_ids = Vec::with_capacity(pages.len());

    for page in pages {
        match extract_item_id(&page.page_path) {
            Ok(item_id) => item_ids.push(item_id),
            Err(e) if policy == MalformedPathPolicy::Skip => {
                warn!("Skipping rank {}: {}", page.rank + 1, e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(item_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::page;

    #[test]
    fn test_item_id_is_third_segment() {
        assert_eq!(extract_item_id("/medicine/123/reviews").unwrap(), "123");
        assert_eq!(extract_item_id("/medicine/abc-9").unwrap(), "abc-9");
    }

    #[test]
    fn test_segment_is_taken_literally() {
        assert_eq!(
            extract_item_id("/medicine/123?tab=reviews").unwrap(),
            "123?tab=reviews"
        );
    }

    #[test]
    fn test_short_paths_are_rejected() {
        assert_eq!(
            extract_item_id("/medicine"),
            Err(PathError::TooFewSegments {
                path: "/medicine".to_string()
            })
        );
        assert!(matches!(
            extract_item_id("/"),
            Err(PathError::TooFewSegments { .. })
        ));
        assert!(matches!(
            extract_item_id(""),
            Err(PathError::TooFewSegments { .. })
        ));
    }

    #[test]
    fn test_empty_item_segment_is_rejected() {
        assert!(matches!(
            extract_item_id("/medicine/"),
            Err(PathError::EmptyItemId { .. })
        ));
        assert!(matches!(
            extract_item_id("/medicine//reviews"),
            Err(PathError::EmptyItemId { .. })
        ));
    }

    #[test]
    fn test_abort_policy_fails_on_first_malformed_path() {
        let pages = vec![page(0, "/medicine/1/reviews"), page(1, "/medicine")];

        let result = resolve_item_ids(&pages, MalformedPathPolicy::Abort);

        assert!(matches!(result, Err(PathError::TooFewSegments { .. })));
    }

    #[test]
    fn test_skip_policy_drops_malformed_and_keeps_order() {
        let pages = vec![
            page(0, "/medicine/3/reviews"),
            page(1, "/medicine/"),
            page(2, "/medicine/1/reviews"),
        ];

        let ids = resolve_item_ids(&pages, MalformedPathPolicy::Skip).unwrap();

        assert_eq!(ids, vec!["3", "1"]);
    }
}
