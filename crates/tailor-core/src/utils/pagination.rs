//! Validation of listing requests.

use tailor_config::WorkflowConfig;
use tailor_types::PageRequest;

/// Rejects zero page numbers or sizes and clamps the size to the configured maximum.
pub fn normalize_page(request: PageRequest, workflow: &WorkflowConfig) -> Result<PageRequest, String> {
	if request.page == 0 {
		return Err("page must be at least 1".to_string());
	}
	if request.page_size == 0 {
		return Err("page_size must be at least 1".to_string());
	}
	Ok(PageRequest::new(
		request.page,
		request.page_size.min(workflow.max_page_size),
	))
}
