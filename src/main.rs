fn main() {
    if let Err(e) = handpilot_lib::run() {
        tracing::error!("{:#}", e);
        eprintln!("handpilot: {:#}", e);
        std::process::exit(1);
    }
}
