use parkkv::server::{Server, ServerConfig};

fn main() {
    tracing_subscriber::fmt::init();

    let config = match ServerConfig::from_args(std::env::args()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("parkkv: {}", error);
            eprintln!("usage: parkkv [port]");
            std::process::exit(2);
        }
    };

    let mut server = match Server::bind(&config) {
        Ok(server) => server,
        Err(error) => {
            eprintln!("parkkv: failed to bind port {}: {}", config.port, error);
            std::process::exit(1);
        }
    };

    if let Err(error) = server.run() {
        tracing::error!("event loop failed: {}", error);
        std::process::exit(1);
    }
}
