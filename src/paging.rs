use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page actually served.
    pub page: usize,
    pub page_count: usize,
    pub total: usize,
}

pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 { 0 } else { total.div_ceil(page_size) }
}

/// Page the served request lands on: out-of-range pages reset to 1.
pub fn resolve_page(requested: usize, total: usize, page_size: usize) -> usize {
    let count = page_count(total, page_size);
    if requested == 0 || requested > count { 1 } else { requested }
}

pub fn paginate<T: Clone>(results: &[T], requested: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total = results.len();
    let page = resolve_page(requested, total, page_size);
    let start = (page - 1) * page_size;
    let items = results.iter().skip(start).take(page_size).cloned().collect();
    Page { items, page, page_count: page_count(total, page_size), total }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(95, 30), 4);
        assert_eq!(page_count(90, 30), 3);
        assert_eq!(page_count(0, 30), 0);
    }

    #[test]
    fn out_of_range_page_resets() {
        let data: Vec<usize> = (0..95).collect();
        let p = paginate(&data, 5, 30);
        assert!(p.page >= 1 && p.page <= p.page_count);
        assert_eq!(p.page, 1);
        assert_eq!(p.items.first(), Some(&0));

        let last = paginate(&data, 4, 30);
        assert_eq!(last.items.len(), 5);
        assert_eq!(last.items[0], 90);
    }

    #[test]
    fn empty_results_serve_an_empty_first_page() {
        let data: Vec<usize> = Vec::new();
        let p = paginate(&data, 3, 30);
        assert_eq!(p.page, 1);
        assert_eq!(p.page_count, 0);
        assert!(p.items.is_empty());
    }
}
