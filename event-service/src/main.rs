use gather_event_service::routes::create_router;
use lambda_http::Error;
use log::info;
use std::env;

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting Event Service");
    let router = create_router().await;

    if env::var("AWS_LAMBDA_RUNTIME_API").is_ok() {
        info!("Running inside Lambda");
        return lambda_http::run(router).await;
    }

    let port = env::var("PORT").unwrap_or_else(|_| "8000".to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
