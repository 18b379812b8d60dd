//! Page arithmetic for book and loan listings

/// Where a listing page starts, after clamping the requested page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-indexed page actually shown
    pub page: i64,
    pub total_pages: i64,
    pub per_page: i64,
    /// Row offset for LIMIT/OFFSET
    pub offset: i64,
}

/// Clamp `requested_page` into [1, total_pages] and compute its offset.
///
/// An empty result set still has a page 1 with offset 0.
pub fn calculate_pagination(total_results: i64, requested_page: i64, per_page: i64) -> Pagination {
    let per_page = per_page.max(1);
    let total_pages = (total_results.max(0) + per_page - 1) / per_page;
    let page = requested_page.max(1).min(total_pages.max(1));

    Pagination {
        page,
        total_pages,
        per_page,
        offset: (page - 1) * per_page,
    }
}
