use serde::{Deserialize, Serialize};

/// City reported when the caller doesn't name one
pub const DEFAULT_CITY: &str = "San Francisco";

/// Simulated weather conditions for a city.
///
/// Only `city` depends on the input; every other field is a fixed sample value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city: String,
    pub temperature: String,
    pub condition: String,
    pub humidity: String,
    pub wind_speed: String,
    pub timestamp: String,
}

/// Get current weather for a city (simulated data)
#[inline]
pub fn get_weather(city: &str) -> WeatherReport {
    WeatherReport {
        city: city.to_string(),
        temperature: "22°C".to_string(),
        condition: "Partly cloudy".to_string(),
        humidity: "65%".to_string(),
        wind_speed: "15 km/h".to_string(),
        timestamp: "2024-01-15T10:30:00Z".to_string(),
    }
}
