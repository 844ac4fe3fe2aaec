use thiserror::Error;

use crate::source::FetchError;

/// Fatal for a page load: the catalog would be incomplete without the sheet.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("required sheet `{sheet}` could not be loaded after {attempts} attempt(s)")]
    RequiredSheet {
        sheet: String,
        attempts: u32,
        #[source]
        source: FetchError,
    },
}
