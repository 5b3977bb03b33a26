/// Builds the URL slug used in category and product paths.
///
/// Separator characters (spaces, commas, ampersands) become dashes and
/// anything else that is not URL-safe is dropped, so
/// `"Atta, Rice & Dal"` turns into `"Atta--Rice---Dal"` exactly like the
/// storefront's links.
pub fn url_slug(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | ',' | '&' => '-',
            other => other,
        })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect()
}
