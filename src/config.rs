use std::path::PathBuf;

/// Runtime configuration, read once at startup from the environment (a
/// `.env` file is honored via dotenv).
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_file: PathBuf,
    pub upload_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let port = dotenv::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(4000);
        let data_file = dotenv::var("DATA_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/data.json"));
        let upload_dir = dotenv::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/uploads"));

        Self { port, data_file, upload_dir }
    }
}
