use rand::rngs::StdRng;
use rand::SeedableRng;
use shelfwatch::egress::{EgressError, EgressPool, HttpListingSource, ListingSource, PoolSettings};
use shelfwatch::{EgressCandidate, EgressOrigin, EgressScheme};
use shelfwatch::config::FetchConfig;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn listing_page(rows: &[(&str, &str, &str)]) -> String {
    let body: String = rows
        .iter()
        .map(|(ip, port, https)| {
            format!(
                "<tr><td>{ip}</td><td>{port}</td><td>PL</td><td>Poland</td><td>elite proxy</td><td>no</td><td>{https}</td><td>1 min ago</td></tr>\n"
            )
        })
        .collect();

    format!(
        r#"<html><body>
<table class="table table-striped table-bordered">
<thead><tr><th>IP Address</th><th>Port</th><th>Code</th><th>Country</th><th>Anonymity</th><th>Google</th><th>Https</th><th>Last Checked</th></tr></thead>
<tbody>
{body}</tbody>
</table>
</body></html>"#
    )
}

fn settings(min_viable: usize) -> PoolSettings {
    PoolSettings {
        preferred: EgressCandidate::preferred("192.168.101.27:8080", EgressScheme::Http),
        max_candidates: 100,
        min_viable,
        listing_attempts: 3,
        listing_retry_delay: Duration::ZERO,
    }
}

fn fetch_config() -> FetchConfig {
    FetchConfig {
        request_timeout: 5,
        connect_timeout: 2,
        user_agents: Vec::new(),
    }
}

#[tokio::test]
async fn test_pool_from_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/listing"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[
            ("10.0.0.1", "3128", "yes"),
            ("10.0.0.2", "8080", "no"),
            ("10.0.0.3", "80", "yes"),
            ("10.0.0.1", "3128", "yes"),
            ("192.168.101.27", "8080", "yes"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let source = HttpListingSource::new(format!("{}/listing", server.uri()), &fetch_config()).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    let pool = EgressPool::acquire(&source, &settings(3), &mut rng).await.unwrap();

    assert_eq!(pool.len(), 3);
    let first = pool.get(0).unwrap();
    assert_eq!(first.origin, EgressOrigin::Preferred);
    assert_eq!(first.scheme, EgressScheme::Http);

    let mut public: Vec<&str> = pool.candidates()[1..]
        .iter()
        .map(|c| c.address.as_str())
        .collect();
    public.sort();
    assert_eq!(public, vec!["10.0.0.1:3128", "10.0.0.3:80"]);
    assert!(pool.candidates()[1..]
        .iter()
        .all(|c| c.origin == EgressOrigin::Public && c.scheme == EgressScheme::Https));
}

#[tokio::test]
async fn test_short_listing_retried_then_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/listing"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(listing_page(&[("10.0.0.1", "3128", "yes")])),
        )
        .expect(3)
        .mount(&server)
        .await;

    let source = HttpListingSource::new(format!("{}/listing", server.uri()), &fetch_config()).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    let pool = EgressPool::acquire(&source, &settings(5), &mut rng).await.unwrap();

    // Degraded pool accepted after the listing attempts are spent
    assert_eq!(pool.len(), 2);
}

#[tokio::test]
async fn test_listing_error_status_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/listing"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let source = HttpListingSource::new(format!("{}/listing", server.uri()), &fetch_config()).unwrap();

    assert!(matches!(
        source.fetch_listing().await,
        Err(EgressError::ListingUnavailable(_))
    ));

    let mut rng = StdRng::seed_from_u64(5);
    assert!(matches!(
        EgressPool::acquire(&source, &settings(1), &mut rng).await,
        Err(EgressError::ListingUnavailable(_))
    ));
}
