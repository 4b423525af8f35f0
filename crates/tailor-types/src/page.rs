//! Pagination types for listing projections.

use serde::{Deserialize, Serialize};

/// Requested page of a listing. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
	pub page: u32,
	#[serde(alias = "pageSize")]
	pub page_size: u32,
}

impl PageRequest {
	pub fn new(page: u32, page_size: u32) -> Self {
		Self { page, page_size }
	}

	/// Number of records skipped before this page.
	pub fn offset(&self) -> usize {
		(self.page.saturating_sub(1) as usize).saturating_mul(self.page_size as usize)
	}
}

/// One page of a filtered listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
	pub items: Vec<T>,
	/// Number of records matching the filter across all pages.
	pub total: u64,
	pub page: u32,
	pub page_size: u32,
	pub total_pages: u32,
}

impl<T> Page<T> {
	/// Cuts one page out of the complete, already ordered result set.
	pub fn from_sorted(all: Vec<T>, request: PageRequest) -> Self {
		let total = all.len() as u64;
		let page_size = request.page_size.max(1);
		let total_pages = total.div_ceil(page_size as u64) as u32;
		let items = all
			.into_iter()
			.skip(request.offset())
			.take(page_size as usize)
			.collect();

		Self {
			items,
			total,
			page: request.page,
			page_size,
			total_pages,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_pages_cover_the_result_set() {
		let all: Vec<u32> = (1..=5).collect();

		let first = Page::from_sorted(all.clone(), PageRequest::new(1, 2));
		assert_eq!(first.items, vec![1, 2]);
		assert_eq!(first.total, 5);
		assert_eq!(first.total_pages, 3);

		let last = Page::from_sorted(all.clone(), PageRequest::new(3, 2));
		assert_eq!(last.items, vec![5]);

		let beyond = Page::from_sorted(all, PageRequest::new(4, 2));
		assert!(beyond.items.is_empty());
		assert_eq!(beyond.total, 5);
	}

	#[test]
	fn test_page_size_alias() {
		let request: PageRequest = serde_json::from_str(r#"{"page":2,"pageSize":20}"#).unwrap();
		assert_eq!(request, PageRequest::new(2, 20));
		assert_eq!(request.offset(), 20);
	}
}
