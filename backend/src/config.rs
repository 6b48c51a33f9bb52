use dotenv::dotenv;
use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub categories: Vec<String>,
    pub weather_api_key: String,
    pub weather_base_url: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv().ok(); // Load .env file if present
        Ok(Self {
            port: env::var("PORT").unwrap_or_else(|_| "8080".to_string()).parse()?,
            jwt_secret: env::var("JWT_SECRET")?,
            token_ttl_hours: env::var("TOKEN_TTL_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()?,
            categories: parse_categories(
                &env::var("PRODUCT_CATEGORIES").unwrap_or_else(|_| DEFAULT_CATEGORIES.to_string()),
            ),
            weather_api_key: env::var("OPENWEATHER_API_KEY")
                .unwrap_or_else(|_| "demo_key".to_string()),
            weather_base_url: env::var("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org".to_string()),
        })
    }
}

// The category taxonomy is deployment-configured rather than a fixed enum.
const DEFAULT_CATEGORIES: &str = "crops,tools,medications";

fn parse_categories(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}
