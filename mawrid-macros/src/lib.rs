//! Procedural macros for Mawrid.
//!
//! * `#[derive(Injectable)]` - builds a struct from the injector and adds
//!   it to the link-time constructor table

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod injectable;

/// Derives `mawrid::Injectable` and submits a constructor entry.
///
/// Field rules:
/// * `Arc<T>` - resolves `Identity::<T>::of()`
/// * `Option<Arc<T>>` - same, `None` when not found
/// * `#[mawrid(key = "k")]` - resolves `Identity::<T>::named("k")` instead
/// * `#[mawrid(default)]` - `Default::default()`, nothing resolved
///
/// Any other field type is a compile error. `#[mawrid(no_link)]` on the
/// struct skips the link-time entry, so the type is only constructible
/// through a table it is registered in.
///
/// ```ignore
/// #[derive(Injectable)]
/// struct Checkout {
///     payments: Arc<dyn PaymentGateway>,
///     #[mawrid(key = "currency")]
///     currency: Arc<String>,
///     audit: Option<Arc<AuditLog>>,
///     #[mawrid(default)]
///     attempts: AtomicU32,
/// }
/// ```
#[proc_macro_derive(Injectable, attributes(mawrid))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    injectable::expand(&input)
        .unwrap_or_else(|err| err.write_errors())
        .into()
}
