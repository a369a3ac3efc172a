use env_logger::Env;
use log::debug;
use tokio::io::{AsyncBufReadExt, BufReader};

use rusty_chat::client::{ClientSession, SessionEnd};
use rusty_chat::config::ClientConfig;

const EXIT_SUCCESS: i32 = 0;
const EXIT_FAILURE: i32 = 1;

#[tokio::main]
async fn main() {
    let dotenv_result = dotenvy::dotenv();
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    if let Err(e) = dotenv_result {
        debug!("No .env file loaded: {}", e);
    }

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(EXIT_FAILURE);
        }
    };

    let session = match ClientSession::connect(&config).await {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Failed to connect to {}:{}: {}", config.host, config.port, e);
            std::process::exit(EXIT_FAILURE);
        }
    };

    println!("Enter your name: ");
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut name = String::new();
    match stdin.read_line(&mut name).await {
        Ok(0) => std::process::exit(EXIT_SUCCESS),
        Ok(_) => {}
        Err(e) => {
            eprintln!("Failed to read name: {}", e);
            std::process::exit(EXIT_FAILURE);
        }
    }

    // Exit explicitly: the blocking stdin reader would otherwise keep the runtime alive
    match session.run(name.trim(), stdin, tokio::io::stdout()).await {
        Ok(SessionEnd::Quit) => {
            println!("quiting...");
            std::process::exit(EXIT_SUCCESS);
        }
        Ok(SessionEnd::InputClosed) | Ok(SessionEnd::Disconnected) => {
            std::process::exit(EXIT_SUCCESS);
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(EXIT_FAILURE);
        }
    }
}
