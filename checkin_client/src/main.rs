#[tokio::main]
async fn main() {
    checkin_client::run().await;
}
