fn main() {
    if let Err(err) = treeroute::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
