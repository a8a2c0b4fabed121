//! 列表页（首页 / 分类 / 列表 / 搜索）共用的分页与分区逻辑。

use crate::api::models::{Comic, ListPage, Pagination};

pub const HERO_COUNT: usize = 5;
pub const NEW_COUNT: usize = 20;

/// `ceil(total_items / per_page)`；服务端没给每页数量时用 `fallback`。
pub fn total_pages(pagination: &Pagination, fallback: u32) -> u32 {
    let per_page = pagination
        .total_items_per_page
        .filter(|n| *n > 0)
        .unwrap_or(fallback)
        .max(1);
    pagination.total_items.div_ceil(per_page)
}

/// 当前页（从 1 开始）与总页数。总页数未知时为 0，此时只能停在第 1 页。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: u32,
    total: u32,
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Pager {
    pub fn new(page: u32) -> Self {
        Self {
            page: page.max(1),
            total: 0,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// 读取服务端分页；当前页超出新的总页数时回到最后一页，返回是否被夹住。
    pub fn update(&mut self, list: &ListPage, fallback: u32) -> bool {
        self.set_total(total_pages(&list.params.pagination, fallback))
    }

    pub fn set_total(&mut self, total: u32) -> bool {
        self.total = total;
        if total > 0 && self.page > total {
            self.page = total;
            return true;
        }
        false
    }

    /// 只接受 `1..=total` 内且不同于当前页的页码，返回是否发生变化。
    pub fn set_page(&mut self, page: u32) -> bool {
        if page == 0 || page > self.total || page == self.page {
            return false;
        }
        self.page = page;
        true
    }

    pub fn next(&mut self) -> bool {
        self.set_page(self.page.saturating_add(1))
    }

    pub fn prev(&mut self) -> bool {
        self.set_page(self.page.saturating_sub(1))
    }

    pub fn label(&self) -> String {
        if self.total == 0 {
            format!("Trang {}", self.page)
        } else {
            format!("Trang {}/{}", self.page, self.total)
        }
    }
}

/// 首页分区：焦点（前 5）、最新更新（前 20）、全部。
#[derive(Debug, Clone, Copy)]
pub struct HomeSections<'a> {
    pub hero: &'a [Comic],
    pub newest: &'a [Comic],
    pub all: &'a [Comic],
}

impl<'a> HomeSections<'a> {
    pub fn new(page: &'a ListPage) -> Self {
        let items = page.items.as_slice();
        Self {
            hero: &items[..items.len().min(HERO_COUNT)],
            newest: &items[..items.len().min(NEW_COUNT)],
            all: items,
        }
    }
}

/// 列表中的一行：名称 · 状态 · 最新章。
pub fn summary_line(comic: &Comic) -> String {
    let latest = comic
        .latest_chapter_name()
        .map(|c| format!(" · Chương {c}"))
        .unwrap_or_default();
    format!("{} · {}{}", comic.name, comic.status.label(), latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::ListParams;

    fn pagination(total_items: u32, per_page: Option<u32>) -> Pagination {
        Pagination {
            total_items,
            total_items_per_page: per_page,
            current_page: 1,
        }
    }

    #[test]
    fn ceil_division_with_fallback() {
        assert_eq!(total_pages(&pagination(50, Some(24)), 24), 3);
        assert_eq!(total_pages(&pagination(48, Some(24)), 24), 2);
        assert_eq!(total_pages(&pagination(50, None), 24), 3);
        assert_eq!(total_pages(&pagination(50, Some(0)), 10), 5);
        assert_eq!(total_pages(&pagination(0, Some(24)), 24), 0);
    }

    #[test]
    fn page_four_of_three_is_rejected() {
        let mut pager = Pager::new(1);
        pager.set_total(total_pages(&pagination(50, Some(24)), 24));
        assert!(pager.set_page(3));
        assert!(!pager.set_page(4));
        assert_eq!(pager.page(), 3);
        assert!(!pager.next());
        assert!(pager.prev());
        assert_eq!(pager.page(), 2);
        assert!(!pager.set_page(0));
        assert!(!pager.set_page(2));
    }

    #[test]
    fn unknown_total_pins_first_page() {
        let mut pager = Pager::default();
        assert!(!pager.next());
        assert!(!pager.prev());
        assert_eq!(pager.label(), "Trang 1");
    }

    #[test]
    fn update_reads_server_pagination() {
        let list = ListPage {
            params: ListParams {
                pagination: pagination(100, Some(24)),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut pager = Pager::new(2);
        pager.update(&list, 24);
        assert_eq!(pager.total(), 5);
        assert_eq!(pager.label(), "Trang 2/5");
    }

    #[test]
    fn out_of_range_page_falls_back_to_last() {
        let mut pager = Pager::new(10);
        assert!(pager.set_total(3));
        assert_eq!(pager.page(), 3);
        assert_eq!(pager.label(), "Trang 3/3");
        assert!(pager.prev());
        assert_eq!(pager.page(), 2);
        assert!(pager.next());

        let mut unknown = Pager::new(10);
        assert!(!unknown.set_total(0));
        assert_eq!(unknown.page(), 10);
    }

    #[test]
    fn home_sections_slice_prefixes() {
        let items: Vec<Comic> = (0..25)
            .map(|i| Comic {
                slug: format!("c{i}"),
                ..Default::default()
            })
            .collect();
        let page = ListPage {
            items,
            ..Default::default()
        };
        let s = HomeSections::new(&page);
        assert_eq!(s.hero.len(), 5);
        assert_eq!(s.newest.len(), 20);
        assert_eq!(s.all.len(), 25);

        let short = ListPage {
            items: page.items[..3].to_vec(),
            ..Default::default()
        };
        let s = HomeSections::new(&short);
        assert_eq!(s.hero.len(), 3);
        assert_eq!(s.newest.len(), 3);
    }
}
