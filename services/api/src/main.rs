use delay_guard_api::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("delay-guard error: {err}");
        std::process::exit(1);
    }
}
