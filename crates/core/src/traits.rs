//! Lister trait definition
//!
//! Decouples callers from the HTTP transport so listings can be mocked in
//! tests of code built on top of this crate.

use async_trait::async_trait;

use crate::error::Result;
use crate::listing::{ListRequest, ListResult};

/// A storage backend that can list directories
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Lister: Send + Sync {
    /// List one page of a directory.
    ///
    /// Performs exactly one request; follow [`ListResult::next_request`] to
    /// fetch further pages.
    async fn list(&self, request: &ListRequest) -> Result<ListResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::{EntryKind, FileEntry};

    async fn count_entries(lister: &dyn Lister, first: ListRequest) -> Result<usize> {
        let mut request = Some(first);
        let mut total = 0;
        while let Some(current) = request {
            let page = lister.list(&current).await?;
            total += page.entries.len();
            request = page.next_request(&current);
        }
        Ok(total)
    }

    fn entry(name: &str) -> FileEntry {
        FileEntry {
            kind: EntryKind::File,
            name: name.into(),
            size: 1,
            md5: String::new(),
            mtime: 0,
        }
    }

    #[tokio::test]
    async fn test_paging_through_mock_lister() {
        let mut lister = MockLister::new();
        lister
            .expect_list()
            .withf(|req| req.resume.is_none())
            .times(1)
            .returning(|_| {
                Ok(ListResult {
                    entries: vec![entry("123/a"), entry("123/b")],
                    resume: "/123/b".into(),
                })
            });
        lister
            .expect_list()
            .withf(|req| req.resume.as_deref() == Some("/123/b"))
            .times(1)
            .returning(|_| {
                Ok(ListResult {
                    entries: vec![entry("123/c")],
                    resume: String::new(),
                })
            });

        let total = count_entries(&lister, ListRequest::new(123, "grp").max_entries(2))
            .await
            .unwrap();
        assert_eq!(total, 3);
    }
}
