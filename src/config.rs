use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,

    pub db_connection_url: String,
    pub jwt_secret: String,

    pub problem_archive_url: String,
}

pub fn build() -> Config {
    let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

    let server_port = env::var("SERVER_PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .expect("SERVER_PORT must be a valid port number");

    let db_connection_url = env::var("DATABASE_URL").expect("DATABASE_URL is required");
    let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET is required");

    let problem_archive_url = env::var("PROBLEM_ARCHIVE_URL")
        .unwrap_or_else(|_| "https://codeforces.com/api/problemset.problems".to_string());

    return Config {
        server_host,
        server_port,

        db_connection_url,
        jwt_secret,

        problem_archive_url,
    };
}
