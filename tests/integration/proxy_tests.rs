use crate::common::product_page;
use shelfwatch::config::{parse_config, FetchConfig};
use shelfwatch::driver::GenericDriver;
use shelfwatch::egress::HttpListingSource;
use shelfwatch::session::{build_http_client, FetchSession, HttpFetcher, SessionSettings};
use shelfwatch::{EgressCandidate, SessionOutcome, StockStatus, WorkItem};
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Product host only reachable through a forward proxy
const SHOP: &str = "http://shop.example";

fn listing_row(port: u16) -> String {
    format!(
        r#"<html><body><table class="table table-striped table-bordered"><tbody>
<tr><td>127.0.0.1</td><td>{port}</td><td>PL</td><td>Poland</td><td>elite proxy</td><td>no</td><td>yes</td><td>1 min ago</td></tr>
</tbody></table></body></html>"#
    )
}

#[tokio::test]
async fn test_public_candidate_forwards_over_plain_http() {
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("through proxy"))
        .expect(1)
        .mount(&proxy)
        .await;

    let fetch = FetchConfig {
        request_timeout: 5,
        connect_timeout: 2,
        user_agents: Vec::new(),
    };
    let candidate = EgressCandidate::public(format!("127.0.0.1:{}", proxy.address().port()));
    let client = build_http_client(&fetch, Some(&candidate)).unwrap();

    let response = client.get(format!("{}/p/1", SHOP)).send().await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "through proxy");
}

#[tokio::test]
async fn test_blocked_preferred_rotates_to_public_candidate() {
    // Preferred egress answers everything with a block
    let preferred = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(403))
        .mount(&preferred)
        .await;

    // Serves the listing directly and forwards product requests as a proxy
    let public = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/listing"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_row(public.address().port())))
        .mount(&public)
        .await;
    for i in 1..=2 {
        Mock::given(method("GET"))
            .and(path(format!("/p/{}", i)))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(product_page("129,00 zł", "Dostępny")),
            )
            .mount(&public)
            .await;
    }

    let config = parse_config(&format!(
        r#"
[fetch]
request-timeout = 5
connect-timeout = 2

[egress]
preferred-address = "127.0.0.1:{preferred_port}"
listing-url = "http://127.0.0.1:{public_port}/listing"
min-viable = 1
listing-retry-delay = 0

[dataset]
path = "./unused.db"

[[site]]
name = "x-shop"
min-sleep = 0
max-sleep = 0
between-items-delay = 0
between-retries-delay = 0
price-selector = "span.price"
stock-selector = "div.availability"
out-of-stock-markers = ["Produkt niedostępny"]
"#,
        preferred_port = preferred.address().port(),
        public_port = public.address().port(),
    ))
    .unwrap();
    let site = config.site("x-shop").unwrap();

    let items: Vec<WorkItem> = (1..=2)
        .map(|i| WorkItem::new(format!("{}/p/{}", SHOP, i), format!("BN-{}", i), "x-shop"))
        .collect();

    let listing = HttpListingSource::new(config.egress.listing_url.clone(), &config.fetch).unwrap();
    let mut session = FetchSession::new(
        SessionSettings::for_site(&config, site),
        HttpFetcher::new(config.fetch.clone()),
        listing,
        GenericDriver::from_site(site).unwrap(),
    );

    let report = session.run(&items).await;

    assert_eq!(report.outcome, SessionOutcome::Completed);
    assert_eq!(report.refreshes, 0);
    assert_eq!(report.results.len(), 2);
    assert!(report
        .results
        .iter()
        .all(|r| r.price == "129.00" && r.stock_status == StockStatus::InStock));

    // One blocked attempt on the preferred egress, then the public one sticks
    assert_eq!(report.fetches, 3);
    assert_eq!(preferred.received_requests().await.unwrap().len(), 1);
}
