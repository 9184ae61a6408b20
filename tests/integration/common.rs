use shelfwatch::config::{parse_config, Config};

/// Minimal product page body; padded past the block-page size threshold
pub fn product_page(price_html: &str, availability: &str) -> String {
    let filler = "<p>Opis produktu, parametry techniczne i warunki gwarancji.</p>\n".repeat(20);
    format!(
        r#"<!DOCTYPE html>
<html lang="pl">
<head><title>Produkt</title></head>
<body>
<h1>Słuchawki bezprzewodowe</h1>
<span class="price">{}</span>
<div class="availability">{}</div>
{}
</body>
</html>"#,
        price_html, availability, filler
    )
}

/// A site config that fetches directly, with every pacing delay disabled
pub fn direct_config(listing_url: &str, dataset_path: &str, stats_dir: &str) -> Config {
    parse_config(&format!(
        r#"
[fetch]
request-timeout = 5
connect-timeout = 2

[egress]
listing-url = "{listing_url}"
listing-retry-delay = 0
degraded-delay = 0

[dataset]
path = "{dataset_path}"
save-base-delay = 0

[supervisor]
stats-dir = "{stats_dir}"

[[site]]
name = "x-shop"
use-egress-pool = false
min-sleep = 0
max-sleep = 0
between-items-delay = 0
between-retries-delay = 0
rate-limit-retries = 1
rate-limit-base-delay = 0
price-selector = "span.price"
stock-selector = "div.availability"
out-of-stock-markers = ["Produkt niedostępny"]
"#
    ))
    .unwrap()
}
