use serde::Serialize;

/// Envelope for every mutating endpoint: `{success, message?, data}`.
#[derive(Serialize, Debug, Clone)]
pub struct MutationResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T: Serialize> MutationResponse<T> {
    pub fn ok(data: T) -> Self {
        MutationResponse { success: true, message: None, data }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        MutationResponse {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

/// Envelope for every list endpoint.
#[derive(Serialize, Debug, Clone)]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T: Serialize> Page<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if page_size > 0 {
            (total as f64 / page_size as f64).ceil() as i64
        } else {
            0
        };
        Page { items, total, page, page_size, total_pages }
    }
}

/// Upper bound on `page`; keeps `(page - 1) * page_size` far from overflow
/// for any accepted page_size.
const MAX_PAGE: i64 = 1_000_000;

/// Clamp raw query paging params: page in 1..=1_000_000, page_size in 1..=100.
pub fn clamp_paging(page: Option<i64>, page_size: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).clamp(1, MAX_PAGE);
    let page_size = page_size.unwrap_or(25).clamp(1, 100);
    (page, page_size)
}
