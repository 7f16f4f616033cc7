fn main() {
    if let Err(err) = finratio::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
