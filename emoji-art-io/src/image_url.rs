//! Unwrapping image-search result links.

use url::Url;

/// Query parameter image search links carry the real image URL in.
const IMAGE_URL_PARAM: &str = "imgurl";

/// The image a dropped URL points at.
///
/// Search result links such as
/// `https://www.google.com/imgres?imgurl=https%3A%2F%2Fexample.com%2Fcat.png`
/// wrap the image URL in an `imgurl` query parameter; that URL is returned
/// percent-decoded. Anything else is returned unchanged.
#[must_use]
pub fn image_url(url: &Url) -> Url {
    url.query_pairs()
        .find(|(key, _)| key == IMAGE_URL_PARAM)
        .and_then(|(_, value)| Url::parse(&value).ok())
        .unwrap_or_else(|| url.clone())
}
