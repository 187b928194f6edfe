fn main() {
    if let Err(e) = seva_lib::run() {
        tracing::error!("{e}");
        eprintln!("seva-health: {e}");
        std::process::exit(1);
    }
}
