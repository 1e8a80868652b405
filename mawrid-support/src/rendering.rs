//! Text rendering for resolution diagnostics.
//!
//! Identities carry full `std::any::type_name` strings, which are noisy
//! in error output. These helpers trim them down and join them into
//! readable chains.

/// Renders a resolution chain as a single line.
///
/// # Examples
/// ```
/// use mawrid_support::rendering::render_chain;
///
/// let chain = vec!["Mailer", "SmtpClient", "Mailer"];
/// assert_eq!(render_chain(&chain), "Mailer → SmtpClient → Mailer");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Shortens a fully qualified type name for display.
///
/// Every path segment is dropped, generic arguments included.
///
/// ```
/// use mawrid_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("app::mail::SmtpClient"), "SmtpClient");
/// assert_eq!(
///     shorten_type_name("alloc::sync::Arc<dyn app::mail::Mailer>"),
///     "Arc<dyn Mailer>"
/// );
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';' => {
                result.push_str(&segment);
                result.push(ch);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }

    result.push_str(&segment);
    result
}
