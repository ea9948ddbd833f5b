use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

mod app;
mod args;
mod auth;
mod backend;
mod credentials;
mod feedback;
mod forms;
mod handlers;
#[cfg(test)]
mod mock;
mod routes;
mod session;
mod user;
mod view;

use crate::app::App;
use crate::args::Args;
use crate::backend::Backend;
use crate::credentials::Credentials;
use crate::session::{SessionKeys, MIN_SECRET_LEN};

#[tokio::main]
async fn main() -> ExitCode {
    let filters = env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();

    let args = Args::parse();

    let addr = match args.addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("invalid address: {e}");
            return ExitCode::FAILURE;
        }
    };

    let keys = match SessionKeys::new(args.secret_key(), args.secure()) {
        Ok(keys) => keys,
        Err(_) => {
            error!("secret key must be at least {MIN_SECRET_LEN} bytes");
            return ExitCode::FAILURE;
        }
    };

    let credentials = match Credentials::new() {
        Ok(credentials) => credentials,
        Err(()) => return ExitCode::FAILURE,
    };

    let backend = match Backend::new(args.database_url()).await {
        Ok(backend) => backend,
        Err(e) => {
            error!("couldn't open database {}: {e}", args.database_url());
            return ExitCode::FAILURE;
        }
    };

    let app = Arc::new(App::new(backend, credentials));
    let routes = routes::routes(app, keys);

    info!("listening on {addr}");
    warp::serve(routes).run(addr).await;

    ExitCode::SUCCESS
}
