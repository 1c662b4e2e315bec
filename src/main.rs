#[tokio::main]
async fn main() {
    wheel_spin_bot_lib::run().await
}
