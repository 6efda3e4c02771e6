use std::{env, net::{SocketAddr, ToSocketAddrs as _}};

use sea_orm::ConnectOptions;
use tracing::{info, warn};

use crate::hash::HashAlgorithm;

pub struct Config {
    pub host_address: SocketAddr,

    pub database_opt: ConnectOptions,

    pub jwt_key: String,

    pub hash_algorithm: HashAlgorithm,
}

pub fn load() -> Config {
    Config {
        host_address: load_host_address(),
        database_opt: load_database_opt().into(),
        jwt_key: load_jwt_key(),
        hash_algorithm: load_hash_algorithm(),
    }
}

/// Read before the subscriber exists, so nothing is logged here
pub fn log_file() -> String {
    env::var("LOG_FILE").unwrap_or_else(|_| "trace.log".to_string())
}

fn load_host_address() -> SocketAddr {
    info!("Loading environment `HOST_ADDRESS`");

    let var = env::var("HOST_ADDRESS").unwrap_or_else(|_| "127.0.0.1:0".to_string());

    var.to_socket_addrs()
        .expect("`HOST_ADDRESS` is not in a valid format").nth(0)
        .expect("unable to resolve host from `HOST_ADDRESS`")
}

fn load_database_opt() -> impl Into<ConnectOptions> {
    info!("Loading environment `DATABASE_URL`");

    env::var("DATABASE_URL").expect("Environment `DATABASE_URL` is required to be set")
}

fn load_jwt_key() -> String {
    info!("Loading environment `JWT_SECRET`");

    env::var("JWT_SECRET").expect("Environment `JWT_SECRET` is required to be set")
}

fn load_hash_algorithm() -> HashAlgorithm {
    info!("Loading environment `HASH_ALGORITHM`");

    let Ok(var) = env::var("HASH_ALGORITHM") else {
        return HashAlgorithm::default()
    };

    var.parse().unwrap_or_else(|_| {
        warn!(value = %var, "unknown `HASH_ALGORITHM`, falling back to sha256");
        HashAlgorithm::default()
    })
}
