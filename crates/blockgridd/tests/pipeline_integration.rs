//! Pipeline regression tests.
//!
//! Assembles the whole stack the way standalone mode does, minus the
//! child processes: several workers on consecutive loopback ports, the
//! REST router over the dispatch layer, and multiply traffic end to end.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tower::ServiceExt;

use blockgrid_api::{ApiState, build_router};
use blockgrid_core::{Block, DispatchConfig};
use blockgrid_worker::BlockOpsService;

const BOUNDARY: &str = "blockgridd-test-boundary";

/// Bind `count` consecutive loopback ports and serve a worker on each,
/// returning the base port. Retries until a free run is found.
async fn spawn_fleet(count: usize) -> u16 {
    'attempt: for _ in 0..50 {
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = probe.local_addr().unwrap().port();
        drop(probe);

        let mut listeners = Vec::new();
        for i in 0..count {
            match TcpListener::bind(("127.0.0.1", base + i as u16)).await {
                Ok(l) => listeners.push(l),
                Err(_) => continue 'attempt,
            }
        }
        for listener in listeners {
            tokio::spawn(async move {
                tonic::transport::Server::builder()
                    .add_service(BlockOpsService::new().into_service())
                    .serve_with_incoming(TcpListenerStream::new(listener))
                    .await
                    .unwrap();
            });
        }
        return base;
    }
    panic!("could not bind a run of {count} consecutive ports");
}

/// Router addressing a fleet of `count` live workers at `base`. The
/// pool cap matches the fleet so growth never dials a dead ordinal.
fn fleet_router(base: u16, count: usize) -> axum::Router {
    let dispatch = DispatchConfig {
        worker_host: "127.0.0.1".to_string(),
        worker_base_port: base,
        max_pool_size: count,
        ..DispatchConfig::default()
    };
    build_router(ApiState { dispatch })
}

fn file_part(name: &str, contents: &str) -> String {
    format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
         filename=\"{name}.txt\"\r\nContent-Type: text/plain\r\n\r\n{contents}\r\n"
    )
}

fn multiply_request(a: &str, b: &str) -> Request<Body> {
    let body = format!(
        "{}{}--{BOUNDARY}--\r\n",
        file_part("A", a),
        file_part("B", b)
    );
    Request::builder()
        .method("POST")
        .uri("/multiply")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Render a block the way an upload file holds it.
fn matrix_text(block: &Block) -> String {
    block
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn filled(dim: usize, f: impl Fn(usize, usize) -> f64) -> Block {
    let rows = (0..dim)
        .map(|r| (0..dim).map(|c| f(r, c)).collect())
        .collect();
    Block::from_rows(rows).unwrap()
}

#[tokio::test]
async fn eight_by_eight_through_the_whole_stack() {
    let base = spawn_fleet(3).await;
    let router = fleet_router(base, 3);

    let a = filled(8, |r, c| (r * 8 + c) as f64);
    let b = filled(8, |r, c| ((r + 1) * (c + 3) % 11) as f64);

    let req = multiply_request(&matrix_text(&a), &matrix_text(&b));
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["dimension"], 8);
    assert_eq!(
        json["data"]["matrix"],
        serde_json::to_value(a.multiply(&b).rows()).unwrap()
    );
}

#[tokio::test]
async fn concurrent_requests_each_get_their_own_pool() {
    let base = spawn_fleet(3).await;
    let router = fleet_router(base, 3);

    let a = filled(4, |r, c| (r + c) as f64);
    let b = filled(4, |r, c| (r * 4 + c) as f64);
    let expected = serde_json::to_value(a.multiply(&b).rows()).unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let router = router.clone();
        let req = multiply_request(&matrix_text(&a), &matrix_text(&b));
        handles.push(tokio::spawn(
            async move { router.oneshot(req).await.unwrap() },
        ));
    }

    for handle in handles {
        let resp = handle.await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["data"]["matrix"], expected);
    }
}
