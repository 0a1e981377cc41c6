mod audio;
mod config;
mod error;
mod library;
mod persist;
mod runtime;
mod session;
mod ui;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run()
}
