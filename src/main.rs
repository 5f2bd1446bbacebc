fn main() {
    if let Err(err) = deckr::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
