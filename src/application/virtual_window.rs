// Virtual window - Visible index range of a long, fixed-row-height list
use serde::Serialize;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportWindow {
    pub start_index: usize,
    pub end_index: usize,
}

impl ViewportWindow {
    /// Indices to materialize. Empty when scrolled past the last item.
    pub fn range(&self) -> Range<usize> {
        let end = self.end_index + 1;
        self.start_index.min(end)..end
    }

    pub fn is_empty(&self) -> bool {
        self.range().is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VirtualWindow {
    pub item_height: f64,
    pub container_height: f64,
    pub overscan: usize,
}

impl VirtualWindow {
    pub fn new(item_height: f64, container_height: f64, overscan: usize) -> Self {
        Self {
            item_height,
            container_height,
            overscan,
        }
    }

    /// `None` when there is nothing to show.
    pub fn compute(&self, item_count: usize, scroll_top: f64) -> Option<ViewportWindow> {
        compute_window(
            item_count,
            scroll_top,
            self.item_height,
            self.container_height,
            self.overscan,
        )
    }

    /// Full scrollable extent, so the host scrollbar reflects the true size.
    pub fn total_height(&self, item_count: usize) -> f64 {
        item_count as f64 * self.item_height
    }

    pub fn visible_items<'a, T>(&self, items: &'a [T], scroll_top: f64) -> Vec<(usize, &'a T)> {
        match self.compute(items.len(), scroll_top) {
            Some(window) => window
                .range()
                .map(|index| (index, &items[index]))
                .collect(),
            None => Vec::new(),
        }
    }
}

pub fn compute_window(
    item_count: usize,
    scroll_top: f64,
    item_height: f64,
    container_height: f64,
    overscan: usize,
) -> Option<ViewportWindow> {
    if item_count == 0 || item_height <= 0.0 {
        return None;
    }

    let first_visible = (scroll_top.max(0.0) / item_height).floor() as usize;
    let visible_count = (container_height.max(0.0) / item_height).ceil() as usize;

    let start_index = first_visible.saturating_sub(overscan);
    let end_index = (item_count - 1).min(start_index + visible_count + 2 * overscan);

    Some(ViewportWindow {
        start_index,
        end_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> VirtualWindow {
        VirtualWindow::new(40.0, 400.0, 5)
    }

    #[test]
    fn test_mid_list_window() {
        let window = table().compute(1000, 2000.0).unwrap();
        assert_eq!(window, ViewportWindow { start_index: 45, end_index: 65 });
        assert_eq!(window.range().len(), 21);
    }

    #[test]
    fn test_top_of_list() {
        let window = table().compute(1000, 0.0).unwrap();
        assert_eq!(window, ViewportWindow { start_index: 0, end_index: 20 });
    }

    #[test]
    fn test_scrolled_past_end() {
        let window = table().compute(1000, 1_000_000.0).unwrap();
        assert_eq!(window.start_index, 24_995);
        assert_eq!(window.end_index, 999);
        assert!(window.is_empty());
        assert!(table().visible_items(&vec![0u8; 1000], 1_000_000.0).is_empty());
    }

    #[test]
    fn test_last_page_is_clamped() {
        let window = table().compute(1000, 39_600.0).unwrap();
        assert_eq!(window, ViewportWindow { start_index: 985, end_index: 999 });
    }

    #[test]
    fn test_short_list() {
        let window = table().compute(3, 0.0).unwrap();
        assert_eq!(window.range(), 0..3);
    }

    #[test]
    fn test_empty_list() {
        assert!(table().compute(0, 0.0).is_none());
        assert!(table().visible_items::<u8>(&[], 100.0).is_empty());
        assert_eq!(table().total_height(0), 0.0);
    }

    #[test]
    fn test_visible_items_carry_indices() {
        let items: Vec<u32> = (0..100).collect();
        let visible = table().visible_items(&items, 400.0);
        assert_eq!(visible.first(), Some(&(5, &5)));
        assert_eq!(visible.last(), Some(&(25, &25)));
        assert_eq!(table().total_height(items.len()), 4000.0);
    }
}
