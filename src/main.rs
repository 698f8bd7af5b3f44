#[tokio::main]
async fn main() -> std::io::Result<()> {
    square_sync::run_with_config().await
}
