use crate::util::common::{get_bool_from_env_or, get_env_or, load_dotenv};

pub mod db;

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Basic app info
    pub app_name: String,
    pub app_version: String,

    pub db: DBConfig,
}

#[derive(Debug, Clone)]
pub struct DBConfig {
    pub url: String,
    pub pool_size: u32,
    pub auto_migrate: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        load_dotenv();

        let app_name = get_env_or("APP_NAME", "Blogme".to_string()).unwrap();
        let app_version = get_env_or("APP_VERSION", "1.0.0".to_string()).unwrap();

        AppConfig {
            app_name,
            app_version,

            db: DBConfig::from_env(),
        }
    }
}

impl DBConfig {
    pub fn from_env() -> Self {
        load_dotenv();

        let url = get_env_or("DATABASE_URL", "sqlite:blogme.db".to_string()).unwrap();
        let pool_size = get_env_or("DATABASE_POOL_SIZE", 5).unwrap();
        let auto_migrate = get_bool_from_env_or("DATABASE_AUTO_MIGRATE", true).unwrap();

        DBConfig {
            url,
            pool_size,
            auto_migrate,
        }
    }
}
