use rclisp::cmdline;

fn main() {
    pretty_env_logger::init();
    std::process::exit(cmdline::launch())
}
