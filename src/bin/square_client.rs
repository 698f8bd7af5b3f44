use square_sync::interface_adapters::net::PeerError;

#[tokio::main]
async fn main() -> Result<(), PeerError> {
    square_sync::run_client_with_config().await
}
