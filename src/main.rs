use jsbox::{ApiRequest, ResponseBody, SandboxService, ServiceConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== jsbox sandbox service ===\n");

    let mut config = ServiceConfig::default();
    if let Ok(dir) = std::env::var("JSBOX_REFERENCES") {
        config.reference_dir = dir.into();
    }
    let service = SandboxService::new(config);

    let samples: &[(&str, &str)] = &[
        (
            "hello world",
            r#"function main() {
    console.log("Hello from the sandbox!");
    console.log("sha256:", crypto.sha256("hello"));
}"#,
        ),
        ("compile error", "function main( { return; }"),
        (
            "runtime fault",
            r#"function main() { throw new Error("deliberate failure"); }"#,
        ),
    ];

    for (label, source) in samples {
        let request = ApiRequest::plain_text(*source);

        let compiled = service.compile(&request).await;
        println!("[{}] compile -> {}", label, compiled.status);

        let ran = service.run(&request).await;
        match &ran.body {
            ResponseBody::Empty => println!("[{}] run -> {} (empty)", label, ran.status),
            ResponseBody::Text(text) => {
                println!("[{}] run -> {}\n{}", label, ran.status, text)
            }
            ResponseBody::Error(body) => println!(
                "[{}] run -> {} {:?}: {}",
                label, ran.status, body.error_code, body.error_message
            ),
        }
        println!();
    }

    let stats = service.stats().await;
    println!(
        "[OK] {} requests handled ({} succeeded, {} failed)",
        stats.total_requests, stats.succeeded, stats.failed
    );
}
