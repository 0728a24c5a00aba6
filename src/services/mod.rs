pub mod account_service;
pub mod admin_service;
pub mod auth_service;
pub mod category_service;
pub mod order_service;
pub mod product_service;
pub mod review_service;
pub mod wishlist_service;

/// `%term%` for ILIKE, with the LIKE wildcards in `term` escaped.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
