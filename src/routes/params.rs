use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        normalize_page(self.page, self.per_page, 20)
    }
}

/// Clamp a 1-based page request; returns `(page, per_page, offset)`.
pub fn normalize_page(page: Option<i64>, per_page: Option<i64>, default_size: i64) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(default_size).clamp(1, 100);
    let offset = (page - 1).saturating_mul(per_page);
    (page, per_page, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        assert_eq!(Pagination::default().normalize(), (1, 20, 0));
        let p = Pagination {
            page: Some(3),
            per_page: Some(10),
        };
        assert_eq!(p.normalize(), (3, 10, 20));
        let p = Pagination {
            page: Some(0),
            per_page: Some(1000),
        };
        assert_eq!(p.normalize(), (1, 100, 0));
        let p = Pagination {
            page: Some(i64::MAX),
            per_page: Some(5),
        };
        assert_eq!(p.normalize(), (i64::MAX, 5, i64::MAX));
    }

    #[test]
    fn custom_default_page_size() {
        assert_eq!(normalize_page(None, None, 5), (1, 5, 0));
        assert_eq!(normalize_page(Some(2), None, 5), (2, 5, 5));
    }
}
