#[tokio::main]
async fn main() {
    if let Err(error) = dayplanner::run().await {
        tracing::error!(error = %error, "day planner server failed");
        eprintln!("dayplanner: {error}");
        std::process::exit(1);
    }
}
