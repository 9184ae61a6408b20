use crate::common::{direct_config, product_page};
use shelfwatch::driver::GenericDriver;
use shelfwatch::egress::HttpListingSource;
use shelfwatch::session::{FetchSession, HttpFetcher, SessionSettings};
use shelfwatch::{SessionOutcome, StockStatus, WorkItem};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_direct_session_against_product_pages() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount(
        &server,
        "/p/1",
        ResponseTemplate::new(200).set_body_string(product_page("129,00 zł", "Dostępny")),
    )
    .await;
    mount(
        &server,
        "/p/2",
        ResponseTemplate::new(200)
            .set_body_string(product_page("1 299,99 zł", "Produkt niedostępny")),
    )
    .await;
    mount(&server, "/p/3", ResponseTemplate::new(404)).await;
    mount(&server, "/p/4", ResponseTemplate::new(429)).await;
    mount(
        &server,
        "/p/5",
        ResponseTemplate::new(200).set_body_string("<html>Request headers: user-agent: test</html>"),
    )
    .await;

    let config = direct_config(&format!("{}/listing", base), "./unused.db", "./stats");
    let site = config.site("x-shop").unwrap();

    let items: Vec<WorkItem> = (1..=5)
        .map(|i| WorkItem::new(format!("{}/p/{}", base, i), format!("BN-{}", i), "x-shop"))
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
    assert_eq!(report.results.len(), 5);
    assert_eq!(report.refreshes, 0);
    assert_eq!(report.skipped, 0);

    let by_id = |id: &str| {
        report
            .results
            .iter()
            .find(|r| r.identifier == id)
            .unwrap()
            .clone()
    };

    let found = by_id("BN-1");
    assert_eq!(found.price, "129.00");
    assert_eq!(found.stock_status, StockStatus::InStock);
    assert_eq!(found.url, format!("{}/p/1", base));

    let sold_out = by_id("BN-2");
    assert_eq!(sold_out.price, "0.00");
    assert_eq!(sold_out.stock_status, StockStatus::OutStock);

    // Confirmed gone
    assert!(by_id("BN-3").is_confirmed_negative());

    // Rate limit budget of one retry spent
    assert!(by_id("BN-4").is_confirmed_negative());

    // Block page on the direct route
    assert!(by_id("BN-5").is_unknown());

    // 1 + 1 + 1 + (1 + 1 retry) + 1
    assert_eq!(report.fetches, 6);
}

#[tokio::test]
async fn test_unreachable_listing_falls_back_to_degraded_batch() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount(&server, "/listing", ResponseTemplate::new(503)).await;
    for i in 1..=8 {
        mount(
            &server,
            &format!("/p/{}", i),
            ResponseTemplate::new(200).set_body_string(product_page("49,90 zł", "Dostępny")),
        )
        .await;
    }

    let mut config = direct_config(&format!("{}/listing", base), "./unused.db", "./stats");
    config.sites[0].use_egress_pool = true;
    let site = config.site("x-shop").unwrap();

    let items: Vec<WorkItem> = (1..=8)
        .map(|i| WorkItem::new(format!("{}/p/{}", base, i), format!("BN-{}", i), "x-shop"))
        .collect();

    let listing = HttpListingSource::new(config.egress.listing_url.clone(), &config.fetch).unwrap();
    let mut session = FetchSession::new(
        SessionSettings::for_site(&config, site),
        HttpFetcher::new(config.fetch.clone()),
        listing,
        GenericDriver::from_site(site).unwrap(),
    );

    let report = session.run(&items).await;

    assert_eq!(report.results.len(), 5);
    assert_eq!(report.skipped, 3);
    assert!(report.results.iter().all(|r| r.price == "49.90"));
    assert!(!report.is_complete());
}
