//! Current conditions from OpenWeatherMap.

use serde::Deserialize;

use crate::chatbot::lookup::LookupError;

pub const WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Deserialize)]
struct Report {
    #[serde(default)]
    weather: Vec<Condition>,
    main: Readings,
    wind: Wind,
}

#[derive(Deserialize)]
struct Condition {
    description: String,
}

#[derive(Deserialize)]
struct Readings {
    temp: f64,
    humidity: f64,
}

#[derive(Deserialize)]
struct Wind {
    speed: f64,
}

/// Capitalize each word of an English city name.
fn title_case(city: &str) -> String {
    city.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn format_weather(city: &str, body: &str) -> Result<String, LookupError> {
    let report: Report = serde_json::from_str(body).map_err(|e| LookupError::Parse(e.to_string()))?;
    let condition = report.weather.first().ok_or(LookupError::NotFound)?;
    Ok(format!(
        "📍 สภาพอากาศวันนี้ที่ {}\n🌤️ {}\n🌡️ อุณหภูมิ: {}°C\n💧 ความชื้น: {}%\n💨 ลม: {} m/s",
        title_case(city),
        condition.description,
        report.main.temp,
        report.main.humidity,
        report.wind.speed,
    ))
}
