use std::future::Future;

use crate::{error::CatalogError, types::Page};

/// Bounded offset/limit traversal over a remote list endpoint.
///
/// Pages are requested with increasing offsets until a page comes back
/// shorter than `page_size` (end of data) or `max_items` have been
/// gathered. Reaching the cap is not an error: the items collected so far
/// are returned, truncated to `max_items`. There are no retries here; the
/// first failing fetch aborts the traversal.
///
/// The cap counts remote entries scanned, so a page full of entries the
/// adapter filters out still moves the traversal towards its bound.
#[derive(Debug, Clone, Copy)]
pub struct PaginatedCollector {
    page_size: u32,
    max_items: usize,
}

impl PaginatedCollector {
    pub fn new(page_size: u32, max_items: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            max_items,
        }
    }

    pub async fn collect<T, F, Fut>(&self, mut fetch: F) -> Result<Vec<T>, CatalogError>
    where
        F: FnMut(u32, u32) -> Fut,
        Fut: Future<Output = Result<Page<T>, CatalogError>>,
    {
        let mut items: Vec<T> = Vec::new();
        let mut scanned: usize = 0;

        while scanned < self.max_items {
            let page = fetch(scanned as u32, self.page_size).await?;
            let received = page.received;
            items.extend(page.items);
            scanned += received;

            if received < self.page_size as usize {
                break;
            }
        }

        items.truncate(self.max_items);
        Ok(items)
    }
}
