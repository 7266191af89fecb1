#[tokio::main]
async fn main() {
    if let Err(e) = agroplan_lib::run().await {
        eprintln!("agroplan-studio: {}", e);
        std::process::exit(1);
    }
}
